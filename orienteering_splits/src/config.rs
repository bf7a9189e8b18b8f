// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

pub use crate::time_codec::{MinimumUnit, TimeValue};

/// Which representation the time fields of the export hold.
///
/// WinSplits Online can export either the time behind the fastest athlete at each control
/// (relative times) or the plain elapsed times (actual times), depending on the checkboxes
/// ticked before exporting.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TimeDataType {
    Relative,
    Actual,
}

impl TimeDataType {
    /// Reads `RELATIVE` or `ACTUAL`, in any case.
    pub fn parse(s: &str) -> Option<TimeDataType> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RELATIVE" => Some(TimeDataType::Relative),
            "ACTUAL" => Some(TimeDataType::Actual),
            _ => None,
        }
    }
}

impl Display for TimeDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeDataType::Relative => write!(f, "RELATIVE"),
            TimeDataType::Actual => write!(f, "ACTUAL"),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AnalysisConfig {
    pub time_data_type: TimeDataType,
    /// Number of non-blank lines at the top of the export that are not athlete rows.
    pub header_lines: usize,
}

impl AnalysisConfig {
    pub const DEFAULT: AnalysisConfig = AnalysisConfig {
        time_data_type: TimeDataType::Relative,
        header_lines: 2,
    };

    pub fn with_time_data_type(time_data_type: TimeDataType) -> AnalysisConfig {
        AnalysisConfig {
            time_data_type,
            ..AnalysisConfig::DEFAULT
        }
    }
}

// ******** Output data structures *********

/// The two ways of timing a control.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Metric {
    /// Time between the previous control and this one.
    Leg,
    /// Time from the start to this control.
    Split,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Leg, Metric::Split];
}

/// A rank at a control or in the final results.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Place {
    NoPlace,
    Ranked(u32),
}

impl Place {
    pub fn rank(self) -> Option<u32> {
        match self {
            Place::NoPlace => None,
            Place::Ranked(r) => Some(r),
        }
    }

    pub fn is_first(self) -> bool {
        self == Place::Ranked(1)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ControlId {
    /// Numbered from 1.
    Control(usize),
    Finish,
}

impl ControlId {
    /// Position of this control in the per-control tables (the finish comes last).
    pub fn index(self, number_of_controls: usize) -> usize {
        match self {
            ControlId::Control(n) => n - 1,
            ControlId::Finish => number_of_controls,
        }
    }

    pub fn label(self) -> String {
        match self {
            ControlId::Control(n) => format!("Control {}", n),
            ControlId::Finish => "Finish".to_string(),
        }
    }
}

/// The display form of a relative time.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RelativeDisplay {
    /// No time available (missing, or faster than the recorded best).
    Unavailable,
    /// The athlete is behind the best time, e.g. `+1:05`.
    Behind(String),
    /// The athlete holds the best time; shows how far behind the runner-up is, e.g. `-0:12`.
    AheadOfRunnerUp(String),
    /// The athlete holds the best time and nobody else has a later time.
    Level,
}

impl Display for RelativeDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelativeDisplay::Unavailable => Ok(()),
            RelativeDisplay::Behind(s) | RelativeDisplay::AheadOfRunnerUp(s) => write!(f, "{}", s),
            RelativeDisplay::Level => write!(f, "0"),
        }
    }
}

/// The performance of one athlete at one control, for one metric.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct PerformanceRecord {
    /// The field as read from the export.
    pub original_time: String,
    pub relative_time: String,
    pub relative_time_in_seconds: TimeValue,
    pub relative_time_minimized: RelativeDisplay,
    pub actual_time: String,
    pub actual_time_in_seconds: TimeValue,
    pub actual_time_minimized: String,
    /// Relative time as a percentage of the best time, rounded to one decimal.
    pub percentage_of_best: Option<f64>,
    pub place: Place,
}

impl Default for RelativeDisplay {
    fn default() -> RelativeDisplay {
        RelativeDisplay::Unavailable
    }
}

impl Default for Place {
    fn default() -> Place {
        Place::NoPlace
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Control {
    pub control: ControlId,
    pub leg: PerformanceRecord,
    pub split: PerformanceRecord,
}

impl Control {
    pub fn new(control: ControlId) -> Control {
        Control {
            control,
            leg: PerformanceRecord::default(),
            split: PerformanceRecord::default(),
        }
    }

    pub fn record(&self, metric: Metric) -> &PerformanceRecord {
        match metric {
            Metric::Leg => &self.leg,
            Metric::Split => &self.split,
        }
    }

    pub fn record_mut(&mut self, metric: Metric) -> &mut PerformanceRecord {
        match metric {
            Metric::Leg => &mut self.leg,
            Metric::Split => &mut self.split,
        }
    }
}

/// Per-control series of one metric for one athlete.
///
/// This is a projection of the athlete's controls: index `i` always corresponds to
/// `controls[i]`. It is rebuilt from the controls, never edited directly.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Series {
    pub relative_times: Vec<String>,
    pub relative_times_in_seconds: Vec<TimeValue>,
    pub relative_times_minimized: Vec<RelativeDisplay>,
    pub places: Vec<Place>,
    pub times_percentages: Vec<Option<f64>>,
    pub actual_times: Vec<String>,
    pub actual_times_in_seconds: Vec<TimeValue>,
    pub actual_times_minimized: Vec<String>,
}

impl Series {
    pub fn project(controls: &[Control], metric: Metric) -> Series {
        let records: Vec<&PerformanceRecord> = controls.iter().map(|c| c.record(metric)).collect();
        Series {
            relative_times: records.iter().map(|r| r.relative_time.clone()).collect(),
            relative_times_in_seconds: records.iter().map(|r| r.relative_time_in_seconds).collect(),
            relative_times_minimized: records
                .iter()
                .map(|r| r.relative_time_minimized.clone())
                .collect(),
            places: records.iter().map(|r| r.place).collect(),
            times_percentages: records.iter().map(|r| r.percentage_of_best).collect(),
            actual_times: records.iter().map(|r| r.actual_time.clone()).collect(),
            actual_times_in_seconds: records.iter().map(|r| r.actual_time_in_seconds).collect(),
            actual_times_minimized: records
                .iter()
                .map(|r| r.actual_time_minimized.clone())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.relative_times_in_seconds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relative_times_in_seconds.is_empty()
    }
}

/// The total time of an athlete, or the reason there is none.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TotalTime {
    Finished(TimeValue),
    Disqualified,
    MissingPunch,
    DidNotStart,
}

impl TotalTime {
    /// The status keyword used by WinSplits, if this is not a finishing time.
    pub fn status(self) -> Option<&'static str> {
        match self {
            TotalTime::Finished(_) => None,
            TotalTime::Disqualified => Some("dsq"),
            TotalTime::MissingPunch => Some("mp"),
            TotalTime::DidNotStart => Some("dns"),
        }
    }

    pub fn seconds(self) -> TimeValue {
        match self {
            TotalTime::Finished(t) => t,
            _ => TimeValue::Missing,
        }
    }
}

impl Default for TotalTime {
    fn default() -> TotalTime {
        TotalTime::Finished(TimeValue::Missing)
    }
}

/// Mistake classification of a leg, relative to the best leg time.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Mistake {
    /// Lost at most 15% of the best time.
    NoMistake,
    /// Lost more than 15% but at most 30%.
    Minor,
    /// Lost more than 30%.
    Major,
}

/// Lower bounds (inclusive) of the percentage buckets; each bucket ends where the next begins.
pub const PERCENTAGE_BOUNDS: [u32; 9] = [0, 1, 2, 4, 8, 16, 32, 64, 128];

/// Derived leg statistics of one athlete.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct AthleteStats {
    pub leg_first_place: usize,
    pub leg_second_place: usize,
    pub leg_third_place: usize,
    pub leg_4_6_place: usize,
    pub leg_7_12_place: usize,
    /// Classification of every leg, `None` when the leg has no time.
    pub leg_mistakes: Vec<Option<Mistake>>,
    pub leg_no_mistake: usize,
    pub leg_minor_mistake: usize,
    pub leg_major_mistake: usize,
    /// Number of legs within each `[PERCENTAGE_BOUNDS[k], PERCENTAGE_BOUNDS[k + 1])` bucket.
    pub leg_within_percent: [usize; 8],
    pub leg_above_128_percent: usize,
    pub average_percentage_loss: Option<f64>,
    pub median_percentage_loss: Option<f64>,
}

/// One point of the split-time chart of an athlete.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ChartPoint {
    /// Split time as `hh:mm:ss`, or `None` when the athlete has no time at this control.
    pub time: Option<String>,
    pub label: String,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Athlete {
    pub position: Place,
    pub name: String,
    pub club: String,
    pub total_time: TotalTime,
    pub diff_total_time: TotalTime,
    /// One entry per control, the finish last.
    pub controls: Vec<Control>,
    pub leg: Series,
    pub split: Series,
    pub chart: Vec<ChartPoint>,
    pub stats: AthleteStats,
}

impl Athlete {
    pub fn series(&self, metric: Metric) -> &Series {
        match metric {
            Metric::Leg => &self.leg,
            Metric::Split => &self.split,
        }
    }

    /// Rebuilds both series from the controls.
    pub fn project_series(&mut self) {
        self.leg = Series::project(&self.controls, Metric::Leg);
        self.split = Series::project(&self.controls, Metric::Split);
    }
}

/// The fastest time at every control for one metric.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct BestTimes {
    /// The field of the winning row, as read.
    pub times_original: Vec<Option<String>>,
    /// Formatted with at least minutes.
    pub times: Vec<String>,
    pub times_in_seconds: Vec<TimeValue>,
}

impl BestTimes {
    pub fn with_len(len: usize) -> BestTimes {
        BestTimes {
            times_original: vec![None; len],
            times: vec![String::new(); len],
            times_in_seconds: vec![TimeValue::Missing; len],
        }
    }

    pub fn best(&self, index: usize) -> TimeValue {
        self.times_in_seconds
            .get(index)
            .cloned()
            .unwrap_or(TimeValue::Missing)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct BestTimeTable {
    pub leg: BestTimes,
    pub split: BestTimes,
    /// Sum of the best leg times.
    pub optimal_total_time_in_seconds: TimeValue,
    pub optimal_total_time: String,
}

impl BestTimeTable {
    pub fn get(&self, metric: Metric) -> &BestTimes {
        match metric {
            Metric::Leg => &self.leg,
            Metric::Split => &self.split,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> &mut BestTimes {
        match metric {
            Metric::Leg => &mut self.leg,
            Metric::Split => &mut self.split,
        }
    }
}

/// For every control, all the non-negative relative times recorded there, in ascending order.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SecondBestTable {
    pub leg: Vec<Vec<i64>>,
    pub split: Vec<Vec<i64>>,
}

impl SecondBestTable {
    pub fn get(&self, metric: Metric) -> &Vec<Vec<i64>> {
        match metric {
            Metric::Leg => &self.leg,
            Metric::Split => &self.split,
        }
    }

    /// The second entry of the sorted relative times at this control, i.e. the gap between
    /// the control winner and the next athlete. Ties are not collapsed.
    pub fn runner_up(&self, metric: Metric, index: usize) -> Option<i64> {
        self.get(metric)
            .get(index)
            .and_then(|times| times.get(1))
            .cloned()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct PlaceAggregates {
    pub leg_first_places: Vec<usize>,
    pub leg_second_places: Vec<usize>,
    pub leg_third_places: Vec<usize>,
    pub leg_4_6_places: Vec<usize>,
    pub leg_7_12_places: Vec<usize>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MistakeAggregates {
    pub leg_no_mistakes: Vec<usize>,
    pub leg_minor_mistakes: Vec<usize>,
    pub leg_major_mistakes: Vec<usize>,
    /// One sequence per percentage bucket, in the order of `PERCENTAGE_BOUNDS`.
    pub leg_within_percent: [Vec<usize>; 8],
    pub leg_above_128_percent: Vec<usize>,
}

/// Per-athlete statistics laid out as sequences aligned with `Dataset::results`.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Aggregated {
    pub names: Vec<String>,
    pub place: PlaceAggregates,
    pub mistake: MistakeAggregates,
    pub average_percentage_loss: Vec<Option<f64>>,
    pub median_percentage_loss: Vec<Option<f64>>,
}

impl Aggregated {
    /// Names of the numeric statistics, as accepted by [Aggregated::series].
    pub const STATISTICS: [&'static str; 19] = [
        "legFirstPlaces",
        "legSecondPlaces",
        "legThirdPlaces",
        "leg4_6Places",
        "leg7_12Places",
        "legNoMistakes",
        "legMinorMistakes",
        "legMajorMistakes",
        "legWithin1Percent",
        "legWithin2Percent",
        "legWithin4Percent",
        "legWithin8Percent",
        "legWithin16Percent",
        "legWithin32Percent",
        "legWithin64Percent",
        "legWithin128Percent",
        "legAbove128Percent",
        "averagePercentageLoss",
        "medianPercentageLoss",
    ];

    /// Looks up a numeric statistic by name.
    pub fn series(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let counts = |v: &Vec<usize>| -> Option<Vec<Option<f64>>> {
            Some(v.iter().map(|c| Some(*c as f64)).collect())
        };
        match name {
            "legFirstPlaces" => counts(&self.place.leg_first_places),
            "legSecondPlaces" => counts(&self.place.leg_second_places),
            "legThirdPlaces" => counts(&self.place.leg_third_places),
            "leg4_6Places" => counts(&self.place.leg_4_6_places),
            "leg7_12Places" => counts(&self.place.leg_7_12_places),
            "legNoMistakes" => counts(&self.mistake.leg_no_mistakes),
            "legMinorMistakes" => counts(&self.mistake.leg_minor_mistakes),
            "legMajorMistakes" => counts(&self.mistake.leg_major_mistakes),
            "legAbove128Percent" => counts(&self.mistake.leg_above_128_percent),
            "averagePercentageLoss" => Some(self.average_percentage_loss.clone()),
            "medianPercentageLoss" => Some(self.median_percentage_loss.clone()),
            _ => {
                let bucket = PERCENTAGE_BOUNDS[1..]
                    .iter()
                    .position(|b| name == format!("legWithin{}Percent", b))?;
                counts(&self.mistake.leg_within_percent[bucket])
            }
        }
    }
}

/// Which of the two rows of an athlete a diagnostic refers to.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RowKind {
    /// First row: position, name, times, leg times.
    Leg,
    /// Second row: club and split times.
    Split,
}

/// A row that did not have the expected shape. Parsing continues past these.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum StructuralMismatch {
    /// The trailing field does not repeat the name (leg row) or the club (split row).
    Echo {
        lineno: usize,
        row: RowKind,
        expected: String,
        found: String,
    },
    /// Fields were left over, or were missing, after reading the row.
    Width {
        lineno: usize,
        row: RowKind,
        consumed: usize,
        columns: usize,
    },
    /// The export ended after the leg row of an athlete; the athlete was dropped.
    UnpairedLegRow { lineno: usize, name: String },
}

impl Display for StructuralMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructuralMismatch::Echo {
                lineno,
                row,
                expected,
                found,
            } => write!(
                f,
                "line {}: {:?} row ends with {:?}, expected {:?}",
                lineno, row, found, expected
            ),
            StructuralMismatch::Width {
                lineno,
                row,
                consumed,
                columns,
            } => write!(
                f,
                "line {}: {:?} row has {} columns but {} were read",
                lineno, row, columns, consumed
            ),
            StructuralMismatch::UnpairedLegRow { lineno, name } => write!(
                f,
                "line {}: no split row for {:?}, athlete dropped",
                lineno, name
            ),
        }
    }
}

/// The complete result of an analysis.
#[derive(PartialEq, Debug, Clone)]
pub struct Dataset {
    pub time_data_type: TimeDataType,
    pub number_of_participants: usize,
    /// Zero when the export contains no athlete row.
    pub number_of_controls: usize,
    /// `Start`, `Control 1` .. `Control N`, `Finish`.
    pub control_labels: Vec<String>,
    pub best: BestTimeTable,
    pub second_best: SecondBestTable,
    /// In the order of the export.
    pub results: Vec<Athlete>,
    pub aggregated: Aggregated,
    pub mismatches: Vec<StructuralMismatch>,
}

/// Errors that prevent the analysis from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AnalysisError {
    MalformedTime { lineno: usize, text: String },
    MalformedPlace { lineno: usize, text: String },
    MalformedPosition { lineno: usize, text: String },
}

impl Error for AnalysisError {}

impl Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::MalformedTime { lineno, text } => {
                write!(f, "line {}: malformed time field {:?}", lineno, text)
            }
            AnalysisError::MalformedPlace { lineno, text } => {
                write!(f, "line {}: malformed place field {:?}", lineno, text)
            }
            AnalysisError::MalformedPosition { lineno, text } => {
                write!(f, "line {}: malformed position {:?}", lineno, text)
            }
        }
    }
}
