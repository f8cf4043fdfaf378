use crate::error::CycleError;
use crate::feed::{RawSample, RawValue};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Fewest points any metric can be derived from.
pub const MIN_POINTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub time: DateTime<Utc>,
    pub weight: f64,
}

/// Time-ordered points with at least [`MIN_POINTS`] entries.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSeries {
    points: Vec<Point>,
}

impl PointSeries {
    /// Stable-sorts by time so equal timestamps keep arrival order.
    pub fn new(mut points: Vec<Point>) -> Result<Self, CycleError> {
        if points.len() < MIN_POINTS {
            return Err(CycleError::InsufficientData {
                valid: points.len(),
                required: MIN_POINTS,
            });
        }
        points.sort_by_key(|point| point.time);
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn weights(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.weight).collect()
    }

    pub fn latest(&self) -> &Point {
        &self.points[self.points.len() - 1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropReason {
    MissingValue,
    UnparseableValue,
    NonFiniteValue,
    ZeroValue,
    BadTimestamp,
}

/// Turns raw feed entries into a [`PointSeries`]. Bad samples are sensor
/// noise: they are dropped, never reported as errors.
pub fn clean(raw: &[RawSample]) -> Result<PointSeries, CycleError> {
    let mut points = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;

    for sample in raw {
        match to_point(sample) {
            Ok(point) => points.push(point),
            Err(reason) => {
                dropped += 1;
                tracing::debug!(?reason, timestamp = %sample.timestamp, "dropping sample");
            }
        }
    }

    tracing::debug!(kept = points.len(), dropped, "cleaned feed samples");
    PointSeries::new(points)
}

fn to_point(sample: &RawSample) -> Result<Point, DropReason> {
    let weight = match &sample.value {
        RawValue::Missing => return Err(DropReason::MissingValue),
        RawValue::Number(value) => *value,
        RawValue::Text(text) => parse_leading_float(text).ok_or(DropReason::UnparseableValue)?,
    };
    if !weight.is_finite() {
        return Err(DropReason::NonFiniteValue);
    }
    if weight == 0.0 {
        return Err(DropReason::ZeroValue);
    }
    let time = parse_timestamp(&sample.timestamp).ok_or(DropReason::BadTimestamp)?;
    Ok(Point { time, weight })
}

/// RFC 3339 first; an ISO-8601 timestamp without an offset is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Lenient number parsing: skips leading whitespace and reads the longest
/// numeric prefix, so `"412.5 g"` is 412.5 and `"g412"` is rejected.
pub fn parse_leading_float(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let mut mantissa_digits = 0;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
        mantissa_digits += 1;
    }
    if bytes.get(end) == Some(&b'.') {
        end += 1;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
            mantissa_digits += 1;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse::<f64>().ok()
}
