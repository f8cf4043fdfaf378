use crate::alert::REFILL_REMINDER;
use crate::presenter::{AlertKind, ChartId, ChartSeries, Presenter, Slot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub type SharedBoard = Arc<Mutex<DashboardBoard>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertSurfaces {
    pub inline: Option<String>,
    pub full: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
}

/// In-memory dashboard: the last rendered state of every slot, chart and
/// alert surface, served as JSON by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardBoard {
    pub session: Option<SessionInfo>,
    pub slots: BTreeMap<&'static str, String>,
    pub charts: BTreeMap<&'static str, ChartSeries>,
    pub alerts: AlertSurfaces,
    pub last_rendered_at: Option<DateTime<Utc>>,
}

impl DashboardBoard {
    pub fn shared() -> SharedBoard {
        Arc::new(Mutex::new(Self::default()))
    }

    /// Wipes everything rendered so far, as a fresh page would.
    pub fn reset(&mut self, session: SessionInfo) {
        *self = Self {
            session: Some(session),
            ..Self::default()
        };
    }

    pub fn mark_rendered(&mut self, at: DateTime<Utc>) {
        self.last_rendered_at = Some(at);
    }

    /// Closing the full-screen alert leaves a standing inline reminder.
    /// Returns false, changing nothing, when no full-screen alert is up.
    pub fn dismiss_full_alert(&mut self) -> bool {
        if self.alerts.full.is_none() {
            return false;
        }
        self.hide_alert(AlertKind::Full);
        self.show_alert(AlertKind::Inline, REFILL_REMINDER.to_string());
        true
    }

    pub fn text(&self, slot: Slot) -> Option<&str> {
        self.slots.get(slot.as_str()).map(String::as_str)
    }

    pub fn chart(&self, chart: ChartId) -> Option<&ChartSeries> {
        self.charts.get(chart.as_str())
    }
}

impl Presenter for DashboardBoard {
    fn set_text(&mut self, slot: Slot, value: String) {
        self.slots.insert(slot.as_str(), value);
    }

    fn show_alert(&mut self, kind: AlertKind, message: String) {
        match kind {
            AlertKind::Inline => self.alerts.inline = Some(message),
            AlertKind::Full => self.alerts.full = Some(message),
        }
    }

    fn hide_alert(&mut self, kind: AlertKind) {
        match kind {
            AlertKind::Inline => self.alerts.inline = None,
            AlertKind::Full => self.alerts.full = None,
        }
    }

    fn render_series(&mut self, chart: ChartId, series: ChartSeries) {
        self.charts.insert(chart.as_str(), series);
    }
}
