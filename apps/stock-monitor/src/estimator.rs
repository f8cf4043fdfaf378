use crate::cleaner::{PointSeries, MIN_POINTS};
use crate::error::CycleError;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DaysRemaining {
    Finite(f64),
    /// No measurable consumption, so no depletion date can be projected.
    Unbounded,
}

impl fmt::Display for DaysRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaysRemaining::Finite(days) => write!(f, "{days:.2} days"),
            DaysRemaining::Unbounded => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionMetrics {
    pub latest_weight: f64,
    pub avg_consumption_per_index: f64,
    pub days_remaining: DaysRemaining,
    pub last_update_time: DateTime<Utc>,
}

/// Least-squares slope of `values` against their index.
///
/// The index stands in for elapsed time, which is only accurate when the
/// channel is sampled at a roughly fixed cadence. Irregular polling biases
/// the rate; switching to wall-clock time would change the forecast formula.
pub fn index_slope(values: &[f64]) -> Option<f64> {
    if values.len() < MIN_POINTS {
        return None;
    }
    let n = values.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for (idx, value) in values.iter().enumerate() {
        let x = idx as f64;
        sum_x += x;
        sum_y += value;
        sum_xy += x * value;
        sum_xx += x * x;
    }
    let denom = n * sum_xx - sum_x * sum_x;
    if denom <= 0.0 {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    slope.is_finite().then_some(slope)
}

pub fn estimate(series: &PointSeries) -> Result<ConsumptionMetrics, CycleError> {
    let weights = series.weights();
    let slope = index_slope(&weights).ok_or(CycleError::InsufficientData {
        valid: weights.len(),
        required: MIN_POINTS,
    })?;

    // Weight is expected to fall, so only the magnitude is a consumption rate.
    let avg_consumption_per_index = slope.abs();
    let latest = series.latest();
    let days_remaining = if avg_consumption_per_index == 0.0 {
        DaysRemaining::Unbounded
    } else {
        let days = latest.weight / avg_consumption_per_index;
        if days.is_finite() {
            DaysRemaining::Finite(days)
        } else {
            DaysRemaining::Unbounded
        }
    };

    Ok(ConsumptionMetrics {
        latest_weight: latest.weight,
        avg_consumption_per_index,
        days_remaining,
        last_update_time: latest.time,
    })
}
