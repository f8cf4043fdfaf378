use crate::cleaner::PointSeries;
use crate::format::{round2, DisplayZone};

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalUsage {
    pub label: String,
    pub percent_used: f64,
}

/// Share of capacity consumed between each pair of consecutive points,
/// labelled by the later point's time of day. Refills come out negative and
/// are kept that way.
pub fn interval_usage(
    series: &PointSeries,
    total_capacity: f64,
    zone: &DisplayZone,
) -> Vec<IntervalUsage> {
    series
        .points()
        .windows(2)
        .map(|pair| {
            let (prev, curr) = (pair[0], pair[1]);
            IntervalUsage {
                label: zone.time_of_day(curr.time),
                percent_used: round2((prev.weight - curr.weight) / total_capacity * 100.0),
            }
        })
        .collect()
}
