//! Completes every performance record with the time representation the export did not carry.

use log::{debug, info};

use crate::config::*;
use crate::time_codec::{format_signed_time, format_time};

/// Derives actual times from relative times, or the reverse, using the best times.
///
/// A record without a time, or at a control without a best time, ends up with both
/// representations missing. The per-athlete series are rebuilt afterwards.
pub fn reconcile(dataset: &mut Dataset) {
    info!(
        "reconcile: deriving {} times for {} athletes and {} controls",
        match dataset.time_data_type {
            TimeDataType::Relative => TimeDataType::Actual,
            TimeDataType::Actual => TimeDataType::Relative,
        },
        dataset.results.len(),
        dataset.number_of_controls
    );

    let number_of_controls = dataset.number_of_controls;
    for athlete in dataset.results.iter_mut() {
        for control in athlete.controls.iter_mut() {
            let index = control.control.index(number_of_controls);
            for metric in Metric::ALL {
                let best = dataset.best.get(metric).best(index);
                let record = control.record_mut(metric);
                match dataset.time_data_type {
                    TimeDataType::Relative => actual_from_relative(record, best),
                    TimeDataType::Actual => relative_from_actual(record, best),
                }
            }
        }
        athlete.project_series();
        debug!(
            "reconcile: {}: split times {:?}",
            athlete.name, athlete.split.actual_times
        );
    }
}

fn actual_from_relative(record: &mut PerformanceRecord, best: TimeValue) {
    record.actual_time_in_seconds = best + record.relative_time_in_seconds;
    if record.actual_time_in_seconds.is_missing() {
        record.relative_time_in_seconds = TimeValue::Missing;
        record.relative_time.clear();
    }
    record.actual_time = format_time(record.actual_time_in_seconds, MinimumUnit::Seconds, false);
}

fn relative_from_actual(record: &mut PerformanceRecord, best: TimeValue) {
    record.relative_time_in_seconds = record.actual_time_in_seconds - best;
    if record.relative_time_in_seconds.is_missing() {
        record.actual_time_in_seconds = TimeValue::Missing;
        record.actual_time.clear();
    }
    record.relative_time = format_signed_time(record.relative_time_in_seconds);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    const RELATIVE: &str = "h1\nh2\n\
        1\tAlice\t5.30\t\t1.00\t(1)\t0.10\t(2)\t2.20\t(1)\tAlice\t\n\
        \tOK A\t\t\t1.00\t(1)\t3.10\t(1)\t5.30\t(1)\tOK A\t\n\
        2\tBob\t6.00\t0.30\t0.30\t(2)\t2.00\t(1)\t0.10\t(2)\tBob\t\n\
        \tOK B\t\t\t0.30\t(2)\t0.20\t(2)\t0.30\t(2)\tOK B\t\n\
        \tCarl\tmp\t\t\t\t0.05\t(3)\t1.00\t(3)\tCarl\t\n\
        \tOK C\t\t\t\t\t\t\t1.10\t(3)\tOK C\t\n";

    // The same race, exported with actual times.
    const ACTUAL: &str = "h1\nh2\n\
        1\tAlice\t5.30\t\t1.00\t(1)\t2.10\t(2)\t2.20\t(1)\tAlice\t\n\
        \tOK A\t\t\t1.00\t(1)\t3.10\t(1)\t5.30\t(1)\tOK A\t\n\
        2\tBob\t6.00\t0.30\t1.30\t(2)\t2.00\t(1)\t2.30\t(2)\tBob\t\n\
        \tOK B\t\t\t1.30\t(2)\t3.30\t(2)\t6.00\t(2)\tOK B\t\n\
        \tCarl\tmp\t\t\t\t2.05\t(3)\t3.20\t(3)\tCarl\t\n\
        \tOK C\t\t\t\t\t\t\t6.40\t(3)\tOK C\t\n";

    fn reconciled(text: &str, time_data_type: TimeDataType) -> Dataset {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut builder = Builder::new(&AnalysisConfig::with_time_data_type(time_data_type));
        builder.add_text(text).unwrap();
        let mut dataset = builder.finish();
        reconcile(&mut dataset);
        dataset
    }

    #[test]
    fn actual_is_best_plus_relative() {
        for (text, time_data_type) in [
            (RELATIVE, TimeDataType::Relative),
            (ACTUAL, TimeDataType::Actual),
        ] {
            let dataset = reconciled(text, time_data_type);
            for athlete in dataset.results.iter() {
                for control in athlete.controls.iter() {
                    let index = control.control.index(dataset.number_of_controls);
                    for metric in Metric::ALL {
                        let record = control.record(metric);
                        assert_eq!(
                            record.actual_time_in_seconds.is_missing(),
                            record.relative_time_in_seconds.is_missing()
                        );
                        if let Some(actual) = record.actual_time_in_seconds.seconds() {
                            let best = dataset.best.get(metric).best(index).seconds().unwrap();
                            let relative = record.relative_time_in_seconds.seconds().unwrap();
                            assert_eq!(actual, best + relative);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn both_directions_agree() {
        let from_relative = reconciled(RELATIVE, TimeDataType::Relative);
        let from_actual = reconciled(ACTUAL, TimeDataType::Actual);
        assert_eq!(from_relative.best, from_actual.best);
        for (a, b) in from_relative.results.iter().zip(from_actual.results.iter()) {
            for metric in Metric::ALL {
                assert_eq!(
                    a.series(metric).actual_times_in_seconds,
                    b.series(metric).actual_times_in_seconds,
                    "{} {:?}",
                    a.name,
                    metric
                );
                assert_eq!(
                    a.series(metric).relative_times_in_seconds,
                    b.series(metric).relative_times_in_seconds,
                    "{} {:?}",
                    a.name,
                    metric
                );
            }
        }
    }

    #[test]
    fn best_is_the_fastest_time() {
        for (text, time_data_type) in [
            (RELATIVE, TimeDataType::Relative),
            (ACTUAL, TimeDataType::Actual),
        ] {
            let dataset = reconciled(text, time_data_type);
            for index in 0..=dataset.number_of_controls {
                for metric in Metric::ALL {
                    let records: Vec<&PerformanceRecord> = dataset
                        .results
                        .iter()
                        .map(|a| a.controls[index].record(metric))
                        .collect();
                    let fastest = records
                        .iter()
                        .filter_map(|r| r.actual_time_in_seconds.seconds())
                        .min();
                    let best = dataset.best.get(metric).best(index);
                    assert_eq!(best.seconds(), fastest, "{:?} {}", metric, index);
                    for r in records.iter() {
                        if let Some(relative) = r.relative_time_in_seconds.seconds() {
                            assert!(relative >= 0, "{:?} {}: {}", metric, index, relative);
                        }
                        if r.place == Place::Ranked(1) {
                            assert_eq!(r.actual_time_in_seconds, best);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn formatted_times() {
        let dataset = reconciled(RELATIVE, TimeDataType::Relative);
        let bob = &dataset.results[1];
        assert_eq!(bob.split.actual_times, vec!["1:30", "3:30", "6:00"]);
        assert_eq!(bob.leg.actual_times, vec!["1:30", "2:00", "2:30"]);

        let dataset = reconciled(ACTUAL, TimeDataType::Actual);
        let bob = &dataset.results[1];
        assert_eq!(bob.split.relative_times, vec!["30", "20", "30"]);
    }

    #[test]
    fn missing_stays_missing() {
        for (text, time_data_type) in [
            (RELATIVE, TimeDataType::Relative),
            (ACTUAL, TimeDataType::Actual),
        ] {
            let dataset = reconciled(text, time_data_type);
            let carl = &dataset.results[2];
            assert_eq!(carl.leg.relative_times_in_seconds[0], TimeValue::Missing);
            assert_eq!(carl.leg.actual_times_in_seconds[0], TimeValue::Missing);
            assert_eq!(carl.split.actual_times_in_seconds[1], TimeValue::Missing);
            assert_eq!(carl.split.actual_times[1], "");
            assert_eq!(carl.leg.actual_times_in_seconds[1], TimeValue::Seconds(125));
        }
    }

    #[test]
    fn series_follow_controls() {
        let dataset = reconciled(RELATIVE, TimeDataType::Relative);
        for athlete in dataset.results.iter() {
            assert_eq!(athlete.leg.len(), dataset.number_of_controls + 1);
            assert_eq!(athlete.split.len(), dataset.number_of_controls + 1);
            assert_eq!(athlete.leg.places[1], athlete.controls[1].leg.place);
        }
    }

    #[test]
    fn negative_relative_time() {
        let mut record = PerformanceRecord {
            actual_time_in_seconds: TimeValue::Seconds(50),
            ..PerformanceRecord::default()
        };
        relative_from_actual(&mut record, TimeValue::Seconds(60));
        assert_eq!(record.relative_time_in_seconds, TimeValue::Seconds(-10));
        assert_eq!(record.relative_time, "-10");
    }

    #[test]
    fn no_best_time_clears_both() {
        let mut record = PerformanceRecord {
            relative_time_in_seconds: TimeValue::Seconds(12),
            ..PerformanceRecord::default()
        };
        actual_from_relative(&mut record, TimeValue::Missing);
        assert_eq!(record.actual_time_in_seconds, TimeValue::Missing);
        assert_eq!(record.relative_time_in_seconds, TimeValue::Missing);
    }
}
