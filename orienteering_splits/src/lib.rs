//! Analysis of the split times of orienteering races, as exported by WinSplits Online.
//!
//! The analysis runs in three stages, each one completing before the next one starts:
//! the export is parsed by a [builder::Builder], the missing time representation is derived
//! by [reconcile::reconcile] and the statistics are computed by [stats::aggregate].
//! [run_analysis] runs all of them.
//!
//! See the [manual] for the input format and the meaning of the output fields.

mod config;
pub mod builder;
pub mod manual;
pub mod reconcile;
pub mod stats;
pub mod time_codec;

use log::{info, warn};

pub use crate::config::*;

/// Runs the complete analysis of a WinSplits text export.
///
/// Structural problems of individual rows do not stop the analysis: they are reported in
/// [Dataset::mismatches]. A time, place or position field that cannot be read is an error.
///
/// ```
/// use orienteering_splits::{run_analysis, AnalysisConfig, RelativeDisplay, TimeValue};
///
/// let export = "Class H21\nPl\tName\tTime\tDiff\n\
///     1\tAlice\t5.00\t\t1.00\t(1)\t2.00\t(1)\t2.00\t(1)\tAlice\t\n\
///     \tClub1\t\t\t1.00\t(1)\t3.00\t(1)\t5.00\t(1)\tClub1\t\n\
///     2\tBob\t5.30\t0.30\t0.10\t(2)\t0.20\t(2)\t0.00\t(1)\tBob\t\n\
///     \tClub2\t\t\t0.10\t(2)\t0.30\t(2)\t0.30\t(2)\tClub2\t\n";
/// let dataset = run_analysis(export, &AnalysisConfig::DEFAULT)?;
///
/// let bob = &dataset.results[1];
/// assert_eq!(bob.split.actual_times, vec!["1:10", "3:30", "5:30"]);
/// assert_eq!(bob.leg.relative_times_minimized[0], RelativeDisplay::Behind("+10".to_string()));
/// assert_eq!(dataset.best.optimal_total_time_in_seconds, TimeValue::Seconds(300));
/// # Ok::<(), orienteering_splits::AnalysisError>(())
/// ```
pub fn run_analysis(raw: &str, config: &AnalysisConfig) -> Result<Dataset, AnalysisError> {
    info!(
        "run_analysis: {} bytes of {} times",
        raw.len(),
        config.time_data_type
    );
    let mut builder = builder::Builder::new(config);
    builder.add_text(raw)?;
    let mut dataset = builder.finish();
    if !dataset.mismatches.is_empty() {
        warn!(
            "run_analysis: {} rows did not have the expected shape",
            dataset.mismatches.len()
        );
    }

    reconcile::reconcile(&mut dataset);
    stats::aggregate(&mut dataset);
    info!(
        "run_analysis: {} athletes, {} controls",
        dataset.number_of_participants, dataset.number_of_controls
    );
    Ok(dataset)
}
