use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Slot {
    CurrentWeight,
    AvgConsumption,
    DaysRemaining,
    LastUpdate,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::CurrentWeight => "current-weight",
            Slot::AvgConsumption => "avg-consumption",
            Slot::DaysRemaining => "days-remaining",
            Slot::LastUpdate => "last-update",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChartId {
    Weight,
    PercentUsed,
}

impl ChartId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartId::Weight => "weight",
            ChartId::PercentUsed => "percent-used",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Inline,
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub dataset_label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Named-slot render surface the monitor writes its results to.
pub trait Presenter {
    fn set_text(&mut self, slot: Slot, value: String);
    fn show_alert(&mut self, kind: AlertKind, message: String);
    fn hide_alert(&mut self, kind: AlertKind);
    fn render_series(&mut self, chart: ChartId, series: ChartSeries);
}
