//! Per-athlete and cross-athlete statistics computed from reconciled times.

use log::{debug, info};

use crate::config::*;
use crate::time_codec::format_time;

/// Bounds of the minor and major mistakes, in percent of the best leg time.
const MINOR_MISTAKE_PERCENT: f64 = 15.0;
const MAJOR_MISTAKE_PERCENT: f64 = 30.0;

/// Rounds to one decimal, halves rounded up.
fn round1(x: f64) -> f64 {
    (x * 10.0 + 0.5).floor() / 10.0
}

fn exceeds(relative: i64, best: i64, percent: f64) -> bool {
    relative as f64 > best as f64 * percent / 100.0
}

/// The relative time as a percentage of the best time. Undefined when either time is missing
/// or the best time is zero.
pub fn percentage_of_best(relative: TimeValue, best: TimeValue) -> Option<f64> {
    match (relative, best) {
        (TimeValue::Seconds(r), TimeValue::Seconds(b)) if b != 0 => {
            Some(round1(r as f64 * 100.0 / b as f64))
        }
        _ => None,
    }
}

/// Classifies a leg. A leg without a time, or without a best time, is not classified.
pub fn classify_mistake(relative: TimeValue, best: TimeValue) -> Option<Mistake> {
    let (r, b) = (relative.seconds()?, best.seconds()?);
    Some(if exceeds(r, b, MAJOR_MISTAKE_PERCENT) {
        Mistake::Major
    } else if exceeds(r, b, MINOR_MISTAKE_PERCENT) {
        Mistake::Minor
    } else {
        Mistake::NoMistake
    })
}

/// The index in `PERCENTAGE_BOUNDS` of the bucket holding this relative time, or `None` when it
/// is at least 128% of the best time, negative or missing.
fn percentage_bucket(relative: TimeValue, best: TimeValue) -> Option<usize> {
    let (r, b) = (relative.seconds()? as f64, best.seconds()? as f64);
    PERCENTAGE_BOUNDS.windows(2).position(|bounds| {
        r >= b * bounds[0] as f64 / 100.0 && r < b * bounds[1] as f64 / 100.0
    })
}

fn is_above_128_percent(relative: TimeValue, best: TimeValue) -> bool {
    match (relative, best) {
        (TimeValue::Seconds(r), TimeValue::Seconds(b)) => r as f64 >= b as f64 * 128.0 / 100.0,
        _ => false,
    }
}

/// Average (rounded to one decimal) and median of the defined percentages.
pub fn loss_summary(percentages: &[Option<f64>]) -> (Option<f64>, Option<f64>) {
    let mut sorted: Vec<f64> = percentages.iter().flatten().cloned().collect();
    if sorted.is_empty() {
        return (None, None);
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let average = round1(sorted.iter().sum::<f64>() / n as f64);
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    (Some(average), Some(median))
}

fn second_best_table(dataset: &Dataset) -> SecondBestTable {
    let sorted_relatives = |metric: Metric| -> Vec<Vec<i64>> {
        (0..=dataset.number_of_controls)
            .map(|index| {
                let mut times: Vec<i64> = dataset
                    .results
                    .iter()
                    .filter_map(|a| a.controls.get(index))
                    .filter_map(|c| c.record(metric).relative_time_in_seconds.seconds())
                    .filter(|t| *t >= 0)
                    .collect();
                times.sort_unstable();
                times
            })
            .collect()
    };
    SecondBestTable {
        leg: sorted_relatives(Metric::Leg),
        split: sorted_relatives(Metric::Split),
    }
}

fn minimize(record: &mut PerformanceRecord, best: TimeValue, runner_up: Option<i64>) {
    record.actual_time_minimized = format_time(
        best + record.relative_time_in_seconds,
        MinimumUnit::Minutes,
        false,
    );
    record.relative_time_minimized = match record.relative_time_in_seconds {
        TimeValue::Seconds(r) if r > 0 => RelativeDisplay::Behind(format!(
            "+{}",
            format_time(TimeValue::Seconds(r), MinimumUnit::Seconds, false)
        )),
        TimeValue::Seconds(0) => match runner_up {
            Some(gap) if gap > 0 => RelativeDisplay::AheadOfRunnerUp(format!(
                "-{}",
                format_time(TimeValue::Seconds(gap), MinimumUnit::Seconds, false)
            )),
            _ => RelativeDisplay::Level,
        },
        _ => RelativeDisplay::Unavailable,
    };
    record.percentage_of_best = percentage_of_best(record.relative_time_in_seconds, best);
}

fn athlete_stats(athlete: &Athlete, best_legs: &BestTimes) -> AthleteStats {
    let mut stats = AthleteStats::default();

    for place in athlete.leg.places.iter().filter_map(|p| p.rank()) {
        match place {
            1 => stats.leg_first_place += 1,
            2 => stats.leg_second_place += 1,
            3 => stats.leg_third_place += 1,
            4..=6 => stats.leg_4_6_place += 1,
            7..=12 => stats.leg_7_12_place += 1,
            _ => {}
        }
    }

    for (index, relative) in athlete.leg.relative_times_in_seconds.iter().enumerate() {
        let best = best_legs.best(index);
        let mistake = classify_mistake(*relative, best);
        match mistake {
            Some(Mistake::NoMistake) => stats.leg_no_mistake += 1,
            Some(Mistake::Minor) => stats.leg_minor_mistake += 1,
            Some(Mistake::Major) => stats.leg_major_mistake += 1,
            None => {}
        }
        stats.leg_mistakes.push(mistake);

        if let Some(bucket) = percentage_bucket(*relative, best) {
            stats.leg_within_percent[bucket] += 1;
        }
        if is_above_128_percent(*relative, best) {
            stats.leg_above_128_percent += 1;
        }
    }

    let (average, median) = loss_summary(&athlete.leg.times_percentages);
    stats.average_percentage_loss = average;
    stats.median_percentage_loss = median;
    stats
}

fn chart(athlete: &Athlete, best_splits: &BestTimes, number_of_controls: usize) -> Vec<ChartPoint> {
    athlete
        .controls
        .iter()
        .map(|control| {
            let index = control.control.index(number_of_controls);
            let relative = control.split.relative_time_in_seconds;
            let time = match relative {
                TimeValue::Seconds(r) if r >= 0 => Some(format_time(
                    best_splits.best(index) + relative,
                    MinimumUnit::Hours,
                    true,
                )),
                _ => None,
            };
            ChartPoint {
                time,
                label: control.control.label(),
            }
        })
        .collect()
}

fn per_athlete(results: &[Athlete], f: impl Fn(&AthleteStats) -> usize) -> Vec<usize> {
    results.iter().map(|a| f(&a.stats)).collect()
}

fn aggregated(results: &[Athlete]) -> Aggregated {
    let mut within: [Vec<usize>; 8] = Default::default();
    for (bucket, sequence) in within.iter_mut().enumerate() {
        *sequence = per_athlete(results, |s| s.leg_within_percent[bucket]);
    }
    Aggregated {
        names: results.iter().map(|a| a.name.clone()).collect(),
        place: PlaceAggregates {
            leg_first_places: per_athlete(results, |s| s.leg_first_place),
            leg_second_places: per_athlete(results, |s| s.leg_second_place),
            leg_third_places: per_athlete(results, |s| s.leg_third_place),
            leg_4_6_places: per_athlete(results, |s| s.leg_4_6_place),
            leg_7_12_places: per_athlete(results, |s| s.leg_7_12_place),
        },
        mistake: MistakeAggregates {
            leg_no_mistakes: per_athlete(results, |s| s.leg_no_mistake),
            leg_minor_mistakes: per_athlete(results, |s| s.leg_minor_mistake),
            leg_major_mistakes: per_athlete(results, |s| s.leg_major_mistake),
            leg_within_percent: within,
            leg_above_128_percent: per_athlete(results, |s| s.leg_above_128_percent),
        },
        average_percentage_loss: results
            .iter()
            .map(|a| a.stats.average_percentage_loss)
            .collect(),
        median_percentage_loss: results
            .iter()
            .map(|a| a.stats.median_percentage_loss)
            .collect(),
    }
}

/// Computes the display fields, the statistics of every athlete and the aggregated sequences.
///
/// Must run after [crate::reconcile::reconcile]: the runner-up gaps need the relative times of
/// every athlete.
pub fn aggregate(dataset: &mut Dataset) {
    info!(
        "aggregate: computing statistics for {} athletes",
        dataset.results.len()
    );
    dataset.second_best = second_best_table(dataset);

    let number_of_controls = dataset.number_of_controls;
    for athlete in dataset.results.iter_mut() {
        for control in athlete.controls.iter_mut() {
            let index = control.control.index(number_of_controls);
            for metric in Metric::ALL {
                let best = dataset.best.get(metric).best(index);
                let runner_up = dataset.second_best.runner_up(metric, index);
                minimize(control.record_mut(metric), best, runner_up);
            }
        }
        athlete.project_series();
        athlete.stats = athlete_stats(athlete, &dataset.best.leg);
        athlete.chart = chart(athlete, &dataset.best.split, number_of_controls);
        debug!(
            "aggregate: {}: average loss {:?}%, median loss {:?}%",
            athlete.name, athlete.stats.average_percentage_loss, athlete.stats.median_percentage_loss
        );
    }

    dataset.aggregated = aggregated(&dataset.results);

    let optimal = dataset
        .best
        .leg
        .times_in_seconds
        .iter()
        .fold(TimeValue::Seconds(0), |acc, t| acc + *t);
    dataset.best.optimal_total_time_in_seconds = optimal;
    dataset.best.optimal_total_time = format_time(optimal, MinimumUnit::Minutes, false);
    info!(
        "aggregate: optimal total time {:?}",
        dataset.best.optimal_total_time
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::reconcile::reconcile;

    fn row(fields: &[&str]) -> String {
        fields.join("\t")
    }

    fn race() -> Dataset {
        let _ = env_logger::builder().is_test(true).try_init();
        let lines = [
            "Class H21".to_string(),
            "Pl\tName\tTime".to_string(),
            row(&[
                "1", "Anna", "3.00", "", "1.00", "(1)", "1.00", "(1)", "1.00", "(1)", "Anna", "",
            ]),
            row(&[
                "", "OK A", "", "", "1.00", "(1)", "2.00", "(1)", "3.00", "(1)", "OK A", "",
            ]),
            row(&[
                "2", "Britt", "3.45", "0.45", "1.00", "(1)", "0.30", "(2)", "0.15", "(2)", "Britt",
                "",
            ]),
            row(&[
                "", "OK B", "", "", "1.00", "(1)", "0.30", "(2)", "0.45", "(2)", "OK B", "",
            ]),
            row(&["", "Carl", "dns", "", "", "", "", "", "", "", "Carl", ""]),
            row(&["", "OK C", "", "", "", "", "", "", "", "", "OK C", ""]),
        ];
        let mut builder = Builder::new(&AnalysisConfig::DEFAULT);
        for line in lines.iter() {
            builder.add_line(line).unwrap();
        }
        let mut dataset = builder.finish();
        reconcile(&mut dataset);
        aggregate(&mut dataset);
        dataset
    }

    #[test]
    fn rounding() {
        assert_eq!(round1(16.666), 16.7);
        assert_eq!(round1(2.25), 2.3);
        assert_eq!(round1(-2.25), -2.2);
        assert_eq!(round1(50.0), 50.0);
    }

    #[test]
    fn percentages() {
        let best = TimeValue::Seconds(60);
        assert_eq!(percentage_of_best(TimeValue::Seconds(30), best), Some(50.0));
        assert_eq!(percentage_of_best(TimeValue::Seconds(10), best), Some(16.7));
        assert_eq!(percentage_of_best(TimeValue::Missing, best), None);
        assert_eq!(
            percentage_of_best(TimeValue::Seconds(10), TimeValue::Seconds(0)),
            None
        );
    }

    #[test]
    fn mistakes() {
        let s = TimeValue::Seconds;
        assert_eq!(classify_mistake(s(10), s(50)), Some(Mistake::Minor));
        assert_eq!(classify_mistake(s(20), s(50)), Some(Mistake::Major));
        // 16.7% is above the minor bound.
        assert_eq!(classify_mistake(s(10), s(60)), Some(Mistake::Minor));
        assert_eq!(classify_mistake(s(9), s(60)), Some(Mistake::NoMistake));
        assert_eq!(classify_mistake(s(15), s(50)), Some(Mistake::Minor));
        assert_eq!(classify_mistake(s(7), s(50)), Some(Mistake::NoMistake));
        assert_eq!(classify_mistake(s(0), s(50)), Some(Mistake::NoMistake));
        assert_eq!(classify_mistake(TimeValue::Missing, s(50)), None);
        assert_eq!(classify_mistake(s(10), TimeValue::Missing), None);
    }

    #[test]
    fn buckets() {
        let s = TimeValue::Seconds;
        assert_eq!(percentage_bucket(s(0), s(100)), Some(0));
        assert_eq!(percentage_bucket(s(1), s(100)), Some(1));
        assert_eq!(percentage_bucket(s(3), s(100)), Some(2));
        assert_eq!(percentage_bucket(s(127), s(100)), Some(7));
        assert_eq!(percentage_bucket(s(128), s(100)), None);
        assert_eq!(percentage_bucket(TimeValue::Missing, s(100)), None);
        assert!(is_above_128_percent(s(128), s(100)));
        assert!(!is_above_128_percent(s(127), s(100)));
    }

    #[test]
    fn average_and_median() {
        let (average, median) = loss_summary(&[Some(0.0), Some(50.0), Some(25.0)]);
        assert_eq!(average, Some(25.0));
        assert_eq!(median, Some(25.0));

        let (average, median) = loss_summary(&[Some(40.0), Some(10.0), None, Some(30.0), Some(20.0)]);
        assert_eq!(average, Some(25.0));
        assert_eq!(median, Some(25.0));

        assert_eq!(loss_summary(&[None, None]), (None, None));
        assert_eq!(loss_summary(&[]), (None, None));
    }

    #[test]
    fn leg_statistics() {
        let dataset = race();
        let britt = &dataset.results[1];
        assert_eq!(britt.leg.times_percentages, vec![Some(0.0), Some(50.0), Some(25.0)]);
        assert_eq!(britt.stats.average_percentage_loss, Some(25.0));
        assert_eq!(britt.stats.median_percentage_loss, Some(25.0));
        assert_eq!(
            britt.stats.leg_mistakes,
            vec![
                Some(Mistake::NoMistake),
                Some(Mistake::Major),
                Some(Mistake::Minor)
            ]
        );
        assert_eq!(britt.stats.leg_first_place, 1);
        assert_eq!(britt.stats.leg_second_place, 2);
        assert_eq!(britt.stats.leg_within_percent, [1, 0, 0, 0, 0, 1, 1, 0]);
        assert_eq!(britt.stats.leg_above_128_percent, 0);

        let anna = &dataset.results[0];
        assert_eq!(anna.stats.leg_first_place, 3);
        assert_eq!(anna.stats.leg_no_mistake, 3);
        assert_eq!(anna.stats.average_percentage_loss, Some(0.0));
    }

    #[test]
    fn athlete_without_times() {
        let dataset = race();
        let carl = &dataset.results[2];
        assert_eq!(carl.total_time, TotalTime::DidNotStart);
        assert_eq!(carl.stats.leg_mistakes, vec![None, None, None]);
        assert_eq!(carl.stats.leg_no_mistake, 0);
        assert_eq!(carl.stats.average_percentage_loss, None);
        assert_eq!(carl.stats.median_percentage_loss, None);
        assert!(carl.chart.iter().all(|p| p.time.is_none()));
        assert_eq!(carl.leg.actual_times_minimized, vec!["", "", ""]);
        assert_eq!(
            carl.leg.relative_times_minimized,
            vec![RelativeDisplay::Unavailable; 3]
        );
    }

    #[test]
    fn runner_up_gaps() {
        let dataset = race();
        assert_eq!(dataset.second_best.leg, vec![vec![0, 0], vec![0, 30], vec![0, 15]]);
        let anna = &dataset.results[0];
        assert_eq!(
            anna.leg.relative_times_minimized,
            vec![
                RelativeDisplay::Level,
                RelativeDisplay::AheadOfRunnerUp("-30".to_string()),
                RelativeDisplay::AheadOfRunnerUp("-15".to_string()),
            ]
        );
        let britt = &dataset.results[1];
        assert_eq!(
            britt.split.relative_times_minimized[2],
            RelativeDisplay::Behind("+45".to_string())
        );
        assert_eq!(britt.split.actual_times_minimized, vec!["1:00", "2:30", "3:45"]);
    }

    #[test]
    fn split_chart() {
        let dataset = race();
        let britt = &dataset.results[1];
        assert_eq!(
            britt.chart,
            vec![
                ChartPoint {
                    time: Some("00:01:00".to_string()),
                    label: "Control 1".to_string()
                },
                ChartPoint {
                    time: Some("00:02:30".to_string()),
                    label: "Control 2".to_string()
                },
                ChartPoint {
                    time: Some("00:03:45".to_string()),
                    label: "Finish".to_string()
                },
            ]
        );
    }

    #[test]
    fn aggregated_sequences() {
        let dataset = race();
        let aggregated = &dataset.aggregated;
        assert_eq!(aggregated.names, vec!["Anna", "Britt", "Carl"]);
        assert_eq!(aggregated.place.leg_first_places, vec![3, 1, 0]);
        assert_eq!(aggregated.mistake.leg_major_mistakes, vec![0, 1, 0]);
        assert_eq!(
            aggregated.series("averagePercentageLoss"),
            Some(vec![Some(0.0), Some(25.0), None])
        );
        assert_eq!(aggregated.series("legWithin32Percent"), Some(vec![Some(0.0), Some(1.0), Some(0.0)]));
    }

    #[test]
    fn optimal_total_time() {
        let dataset = race();
        assert_eq!(dataset.best.optimal_total_time_in_seconds, TimeValue::Seconds(180));
        assert_eq!(dataset.best.optimal_total_time, "3:00");
    }
}
