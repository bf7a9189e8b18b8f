use log::{debug, info, warn};

pub use crate::config::*;
use crate::time_codec::{format_time, parse_leading_int, parse_time};

/// Reads the tab-separated fields of one row from left to right.
struct FieldCursor<'a> {
    fields: Vec<&'a str>,
    index: usize,
}

impl<'a> FieldCursor<'a> {
    fn new(line: &'a str) -> FieldCursor<'a> {
        FieldCursor {
            fields: line.split('\t').collect(),
            index: 0,
        }
    }

    /// Past the end of the row, fields read as empty.
    fn next_field(&mut self) -> &'a str {
        let field = self.fields.get(self.index).copied().unwrap_or("");
        self.index += 1;
        field
    }

    fn skip(&mut self, count: usize) {
        self.index += count;
    }

    /// True when nothing but an optional empty trailing column is left.
    fn at_row_end(&self) -> bool {
        match self.fields.get(self.index..) {
            Some(rest) => rest.len() <= 1 && rest.iter().all(|f| f.is_empty()),
            None => false,
        }
    }
}

/// Number of controls (finish excluded) carried by a row with this many columns.
///
/// A row holds 4 leading fields, a time/place pair per control and for the finish, the echoed
/// name or club, and usually an empty column after the final tab.
fn controls_in_row(columns: usize) -> Option<usize> {
    if columns >= 9 {
        Some((columns - 7) / 2)
    } else {
        None
    }
}

fn new_controls(number_of_controls: usize) -> Vec<Control> {
    (1..=number_of_controls)
        .map(ControlId::Control)
        .chain(std::iter::once(ControlId::Finish))
        .map(Control::new)
        .collect()
}

fn read_time(text: &str, lineno: usize) -> Result<TimeValue, AnalysisError> {
    parse_time(text).map_err(|_| AnalysisError::MalformedTime {
        lineno,
        text: text.to_string(),
    })
}

/// `(12)` reads as 12, an empty field as no place.
fn read_place(text: &str, lineno: usize) -> Result<Place, AnalysisError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Place::NoPlace);
    }
    let inner = trimmed.strip_prefix('(').unwrap_or(trimmed);
    let inner = inner.strip_suffix(')').unwrap_or(inner);
    parse_leading_int(inner)
        .and_then(|p| u32::try_from(p).ok())
        .map(Place::Ranked)
        .ok_or(AnalysisError::MalformedPlace {
            lineno,
            text: text.to_string(),
        })
}

fn read_position(text: &str, lineno: usize) -> Result<Place, AnalysisError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Place::NoPlace);
    }
    parse_leading_int(trimmed)
        .and_then(|p| u32::try_from(p).ok())
        .map(Place::Ranked)
        .ok_or(AnalysisError::MalformedPosition {
            lineno,
            text: text.to_string(),
        })
}

fn read_total_time(text: &str, lineno: usize) -> Result<TotalTime, AnalysisError> {
    let trimmed = text.trim();
    let status = [
        ("dsq", TotalTime::Disqualified),
        ("mp", TotalTime::MissingPunch),
        ("dns", TotalTime::DidNotStart),
    ]
    .into_iter()
    .find(|(keyword, _)| trimmed.eq_ignore_ascii_case(keyword));
    match status {
        Some((_, total)) => Ok(total),
        None => read_time(trimmed, lineno).map(TotalTime::Finished),
    }
}

/// An athlete whose leg row has been read, waiting for the split row.
#[derive(Debug, Clone)]
struct PendingAthlete {
    lineno: usize,
    position: String,
    total_time: String,
    diff_total_time: String,
    name: String,
    controls: Vec<Control>,
}

#[derive(Debug, Clone)]
enum RowState {
    AwaitingLegRow,
    AwaitingSplitRow(PendingAthlete),
}

/// Parses a WinSplits Online text export, line by line.
///
/// Every athlete spans two rows: the first one carries the position, name, total times and leg
/// times, the second one the club and split times. The best time at each control is collected
/// while parsing, from the rows placed first at that control.
///
/// ```
/// use orienteering_splits::builder::Builder;
/// use orienteering_splits::{AnalysisConfig, TimeDataType, TimeValue};
///
/// let mut builder = Builder::new(&AnalysisConfig::with_time_data_type(TimeDataType::Relative));
/// builder.add_text("Class H21\nPos\tName\n")?;
/// builder.add_line("1\tAlice\t5.00\t\t1.00\t(1)\t2.00\t(1)\t3.00\t(1)\tAlice\t")?;
/// builder.add_line("\tClub1\t\t\t1.00\t(1)\t3.00\t(1)\t6.00\t(1)\tClub1\t")?;
/// let dataset = builder.finish();
///
/// assert_eq!(dataset.number_of_controls, 2);
/// assert_eq!(dataset.results[0].name, "Alice");
/// assert_eq!(dataset.best.split.times_in_seconds[2], TimeValue::Seconds(360));
/// # Ok::<(), orienteering_splits::AnalysisError>(())
/// ```
pub struct Builder {
    config: AnalysisConfig,
    lineno: usize,
    header_lines_left: usize,
    number_of_controls: Option<usize>,
    state: RowState,
    best: BestTimeTable,
    results: Vec<Athlete>,
    mismatches: Vec<StructuralMismatch>,
}

impl Builder {
    pub fn new(config: &AnalysisConfig) -> Builder {
        Builder {
            config: config.clone(),
            lineno: 0,
            header_lines_left: config.header_lines,
            number_of_controls: None,
            state: RowState::AwaitingLegRow,
            best: BestTimeTable::default(),
            results: Vec::new(),
            mismatches: Vec::new(),
        }
    }

    /// Adds all the lines of a text. A leading byte order mark is ignored.
    pub fn add_text(&mut self, text: &str) -> Result<(), AnalysisError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        for line in text.split('\n') {
            self.add_line(line)?;
        }
        Ok(())
    }

    /// Adds one physical line of the export.
    ///
    /// Blank lines, the header lines and lines without enough columns are skipped.
    pub fn add_line(&mut self, line: &str) -> Result<(), AnalysisError> {
        self.lineno += 1;
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            return Ok(());
        }
        if self.header_lines_left > 0 {
            self.header_lines_left -= 1;
            debug!("add_line: line {}: skipping header {:?}", self.lineno, line);
            return Ok(());
        }

        let lineno = self.lineno;
        let mut cursor = FieldCursor::new(line);
        let number_of_controls = match controls_in_row(cursor.fields.len()) {
            Some(n) => *self.number_of_controls.get_or_insert_with(|| {
                info!("add_line: line {}: found {} controls", lineno, n);
                n
            }),
            None => {
                debug!(
                    "add_line: line {}: skipping row with {} columns",
                    self.lineno,
                    cursor.fields.len()
                );
                return Ok(());
            }
        };
        if self.best.leg.times_in_seconds.is_empty() {
            self.best.leg = BestTimes::with_len(number_of_controls + 1);
            self.best.split = BestTimes::with_len(number_of_controls + 1);
        }

        match std::mem::replace(&mut self.state, RowState::AwaitingLegRow) {
            RowState::AwaitingLegRow => {
                let pending = self.read_leg_row(&mut cursor, number_of_controls)?;
                let name = pending.name.clone();
                self.check_row_end(&mut cursor, RowKind::Leg, &name);
                self.state = RowState::AwaitingSplitRow(pending);
            }
            RowState::AwaitingSplitRow(pending) => {
                let athlete = self.read_split_row(&mut cursor, pending)?;
                let club = athlete.club.clone();
                self.check_row_end(&mut cursor, RowKind::Split, &club);
                debug!(
                    "add_line: line {}: athlete {:?} ({:?})",
                    self.lineno, athlete.name, athlete.position
                );
                self.results.push(athlete);
            }
        }
        Ok(())
    }

    fn read_leg_row(
        &mut self,
        cursor: &mut FieldCursor,
        number_of_controls: usize,
    ) -> Result<PendingAthlete, AnalysisError> {
        let position = cursor.next_field().to_string();
        let name = cursor.next_field().to_string();
        let total_time = cursor.next_field().to_string();
        let diff_total_time = cursor.next_field().to_string();
        let mut controls = new_controls(number_of_controls);
        self.read_times(cursor, &mut controls, Metric::Leg)?;
        Ok(PendingAthlete {
            lineno: self.lineno,
            position,
            total_time,
            diff_total_time,
            name,
            controls,
        })
    }

    fn read_split_row(
        &mut self,
        cursor: &mut FieldCursor,
        pending: PendingAthlete,
    ) -> Result<Athlete, AnalysisError> {
        cursor.skip(1);
        let club = cursor.next_field().to_string();
        cursor.skip(2);
        let mut controls = pending.controls;
        self.read_times(cursor, &mut controls, Metric::Split)?;

        Ok(Athlete {
            position: read_position(&pending.position, pending.lineno)?,
            name: pending.name,
            club,
            total_time: read_total_time(&pending.total_time, pending.lineno)?,
            diff_total_time: read_total_time(&pending.diff_total_time, pending.lineno)?,
            controls,
            leg: Series::default(),
            split: Series::default(),
            chart: Vec::new(),
            stats: AthleteStats::default(),
        })
    }

    /// Reads one time/place pair per control into the records of the given metric.
    fn read_times(
        &mut self,
        cursor: &mut FieldCursor,
        controls: &mut [Control],
        metric: Metric,
    ) -> Result<(), AnalysisError> {
        let lineno = self.lineno;
        for (index, control) in controls.iter_mut().enumerate() {
            let time = cursor.next_field();
            let place = read_place(cursor.next_field(), lineno)?;

            let record = control.record_mut(metric);
            record.original_time = time.to_string();
            record.place = place;
            match self.config.time_data_type {
                // The athlete placed first has no time behind the best one. Its field holds
                // the best time itself.
                TimeDataType::Relative if place.is_first() => {
                    record.relative_time_in_seconds = TimeValue::Seconds(0);
                    record.relative_time = format_time(
                        record.relative_time_in_seconds,
                        MinimumUnit::Seconds,
                        false,
                    );
                }
                TimeDataType::Relative => {
                    record.relative_time = time.to_string();
                    record.relative_time_in_seconds = read_time(time, lineno)?;
                }
                TimeDataType::Actual => {
                    record.actual_time = time.to_string();
                    record.actual_time_in_seconds = read_time(time, lineno)?;
                }
            }

            if place.is_first() {
                self.record_best_time(metric, index, time)?;
            }
        }
        Ok(())
    }

    /// The first row placed first at a control sets the best time there. Later ones are ignored.
    fn record_best_time(
        &mut self,
        metric: Metric,
        index: usize,
        time: &str,
    ) -> Result<(), AnalysisError> {
        let seconds = read_time(time, self.lineno)?;
        let best = self.best.get_mut(metric);
        if best.times_original[index].is_some() || seconds.is_missing() {
            return Ok(());
        }
        debug!(
            "record_best_time: {:?} {}: {:?} ({:?})",
            metric, index, time, seconds
        );
        best.times_original[index] = Some(time.to_string());
        best.times[index] = format_time(seconds, MinimumUnit::Minutes, false);
        best.times_in_seconds[index] = seconds;
        Ok(())
    }

    /// The last field must repeat the name or club, and close the row.
    fn check_row_end(&mut self, cursor: &mut FieldCursor, row: RowKind, expected: &str) {
        let found = cursor.next_field();
        if found != expected {
            warn!(
                "check_row_end: line {}: {:?} row ends with {:?} instead of {:?}",
                self.lineno, row, found, expected
            );
            self.mismatches.push(StructuralMismatch::Echo {
                lineno: self.lineno,
                row,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        if !cursor.at_row_end() {
            warn!(
                "check_row_end: line {}: {:?} row has {} columns, {} were read",
                self.lineno,
                row,
                cursor.fields.len(),
                cursor.index
            );
            self.mismatches.push(StructuralMismatch::Width {
                lineno: self.lineno,
                row,
                consumed: cursor.index,
                columns: cursor.fields.len(),
            });
        }
    }

    /// Ends the parse. The returned dataset carries the parsed rows and the best times only.
    pub fn finish(mut self) -> Dataset {
        if let RowState::AwaitingSplitRow(pending) =
            std::mem::replace(&mut self.state, RowState::AwaitingLegRow)
        {
            warn!(
                "finish: line {}: no split row for {:?}, dropping the athlete",
                pending.lineno, pending.name
            );
            self.mismatches.push(StructuralMismatch::UnpairedLegRow {
                lineno: pending.lineno,
                name: pending.name,
            });
        }

        let number_of_controls = self.number_of_controls.unwrap_or(0);
        let control_labels: Vec<String> = if self.number_of_controls.is_some() {
            std::iter::once("Start".to_string())
                .chain(new_controls(number_of_controls).iter().map(|c| c.control.label()))
                .collect()
        } else {
            Vec::new()
        };
        info!(
            "finish: parsed {} times for {} athletes and {} controls",
            self.config.time_data_type,
            self.results.len(),
            number_of_controls
        );

        Dataset {
            time_data_type: self.config.time_data_type,
            number_of_participants: self.results.len(),
            number_of_controls,
            control_labels,
            best: self.best,
            second_best: SecondBestTable::default(),
            results: self.results,
            aggregated: Aggregated::default(),
            mismatches: self.mismatches,
        }
    }
}
