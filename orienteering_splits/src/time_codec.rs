//! Conversion between the time strings found in WinSplits Online exports and second counts.
//!
//! WinSplits writes times either as `h:mm.ss` or as `m.ss`. Times rendered back for display use
//! colons only (`h:mm:ss`, `m:ss` or `ss`), and both notations are accepted when parsing.

use std::error::Error;
use std::fmt::Display;
use std::ops::{Add, Sub};

/// A time in seconds, or the absence of a time.
///
/// A missing time is never confused with zero: any arithmetic involving a missing time
/// yields a missing time. So does arithmetic that would overflow.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Default)]
pub enum TimeValue {
    #[default]
    Missing,
    Seconds(i64),
}

impl TimeValue {
    pub fn seconds(self) -> Option<i64> {
        match self {
            TimeValue::Missing => None,
            TimeValue::Seconds(s) => Some(s),
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, TimeValue::Missing)
    }
}

impl From<Option<i64>> for TimeValue {
    fn from(o: Option<i64>) -> TimeValue {
        o.map(TimeValue::Seconds).unwrap_or(TimeValue::Missing)
    }
}

impl Add for TimeValue {
    type Output = TimeValue;
    fn add(self, rhs: TimeValue) -> TimeValue {
        match (self, rhs) {
            (TimeValue::Seconds(a), TimeValue::Seconds(b)) => a.checked_add(b).into(),
            _ => TimeValue::Missing,
        }
    }
}

impl Sub for TimeValue {
    type Output = TimeValue;
    fn sub(self, rhs: TimeValue) -> TimeValue {
        match (self, rhs) {
            (TimeValue::Seconds(a), TimeValue::Seconds(b)) => a.checked_sub(b).into(),
            _ => TimeValue::Missing,
        }
    }
}

/// The largest unit that is always written by [format_time], even when it is zero.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum MinimumUnit {
    Seconds,
    Minutes,
    Hours,
}

/// A time field that could not be read.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct InvalidTime(pub String);

impl Error for InvalidTime {}

impl Display for InvalidTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid time {:?}", self.0)
    }
}

/// Reads the leading integer of a field, ignoring whatever follows the digits.
///
/// `" 12)"` reads as 12, `"+3"` as 3. Returns `None` when no digit is found.
pub(crate) fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Larger second counts are rejected, which keeps sums over a whole course far from overflowing.
pub const MAX_TIME_SECONDS: i64 = 1_000_000_000;

fn parse_unit(s: &str, text: &str) -> Result<i64, InvalidTime> {
    match parse_leading_int(s) {
        Some(x) if x >= 0 => Ok(x),
        _ => Err(InvalidTime(text.to_string())),
    }
}

/// Weighs hours, minutes and seconds into a second count no larger than [MAX_TIME_SECONDS].
fn total_seconds(hours: i64, minutes: i64, seconds: i64, text: &str) -> Result<i64, InvalidTime> {
    hours
        .checked_mul(3600)
        .zip(minutes.checked_mul(60))
        .and_then(|(h, m)| h.checked_add(m))
        .and_then(|hm| hm.checked_add(seconds))
        .filter(|total| *total <= MAX_TIME_SECONDS)
        .ok_or_else(|| InvalidTime(text.to_string()))
}

/// Parses a time field into a second count.
///
/// An empty field is a missing time. The hour, minute and second fields are not range-checked:
/// `1.75` reads as 135 seconds. Only a total above [MAX_TIME_SECONDS] is an error.
pub fn parse_time(text: &str) -> Result<TimeValue, InvalidTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(TimeValue::Missing);
    }
    let (negative, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let total = if unsigned.contains('.') {
        // WinSplits notation: [h:]m.ss
        let (hours, mm_ss) = match unsigned.split_once(':') {
            Some((h, rest)) => (
                parse_unit(h, text)?,
                rest.split(':').next().unwrap_or_default(),
            ),
            None => (0, unsigned),
        };
        let mut ms = mm_ss.split('.');
        let minutes = parse_unit(ms.next().unwrap_or_default(), text)?;
        let seconds = parse_unit(ms.next().unwrap_or_default(), text)?;
        total_seconds(hours, minutes, seconds, text)?
    } else {
        // Display notation: [[h:]m:]s
        let units = unsigned
            .split(':')
            .map(|u| parse_unit(u, text))
            .collect::<Result<Vec<i64>, InvalidTime>>()?;
        match units.as_slice() {
            [s] => total_seconds(0, 0, *s, text)?,
            [m, s] => total_seconds(0, *m, *s, text)?,
            [h, m, s] => total_seconds(*h, *m, *s, text)?,
            _ => return Err(InvalidTime(text.to_string())),
        }
    };

    Ok(TimeValue::Seconds(if negative { -total } else { total }))
}

fn format_unit(n: u64, zero_padded: bool) -> String {
    if zero_padded {
        format!("{:02}", n)
    } else {
        n.to_string()
    }
}

/// Formats a time as colon-separated units, without any sign.
///
/// Hours and minutes are only written when they are non-zero, or when `minimum` requires them.
/// Every unit after the first one is zero-padded; `double_digits` pads the first one as well.
/// A missing time formats as the empty string, and negative times format as their magnitude.
///
/// ```
/// use orienteering_splits::time_codec::{format_time, MinimumUnit, TimeValue};
///
/// assert_eq!(format_time(TimeValue::Seconds(75), MinimumUnit::Seconds, false), "1:15");
/// assert_eq!(format_time(TimeValue::Seconds(75), MinimumUnit::Hours, true), "00:01:15");
/// assert_eq!(format_time(TimeValue::Missing, MinimumUnit::Minutes, false), "");
/// ```
pub fn format_time(value: TimeValue, minimum: MinimumUnit, double_digits: bool) -> String {
    let mut rest = match value {
        TimeValue::Missing => return String::new(),
        TimeValue::Seconds(s) => s.unsigned_abs(),
    };

    let mandatory_hours = minimum == MinimumUnit::Hours;
    let mandatory_minutes = mandatory_hours || minimum == MinimumUnit::Minutes;

    let mut result = String::new();
    if mandatory_hours || rest >= 3600 {
        let hours = rest / 3600;
        rest -= hours * 3600;
        result.push_str(&format_unit(hours, double_digits));
        result.push(':');
    }
    if mandatory_minutes || rest >= 60 || !result.is_empty() {
        let minutes = rest / 60;
        rest -= minutes * 60;
        let padded = double_digits || !result.is_empty();
        result.push_str(&format_unit(minutes, padded));
        result.push(':');
    }
    let padded = double_digits || !result.is_empty();
    result.push_str(&format_unit(rest, padded));
    result
}

/// Like [format_time] with the `seconds` minimum, but keeps a leading `-` for negative times.
pub fn format_signed_time(value: TimeValue) -> String {
    match value {
        TimeValue::Seconds(s) if s < 0 => {
            format!("-{}", format_time(value, MinimumUnit::Seconds, false))
        }
        _ => format_time(value, MinimumUnit::Seconds, false),
    }
}
