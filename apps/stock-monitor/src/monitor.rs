use crate::alert::{self, AlertDecision, AlertState, InlineAlert};
use crate::board::{SessionInfo, SharedBoard};
use crate::cleaner::{self, PointSeries};
use crate::config::Config;
use crate::error::CycleError;
use crate::estimator::{self, ConsumptionMetrics};
use crate::feed::{FeedClient, RawSample};
use crate::presenter::{AlertKind, ChartId, ChartSeries, Presenter, Slot};
use crate::usage::{self, IntervalUsage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

const PERCENT_CHART_LABEL: &str = "Percentage Used Per Day (%)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    ManualRefresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    Queued,
    /// A refresh was already pending; it will pick up the newest data.
    Coalesced,
    Closed,
}

#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::Sender<Trigger>,
    stats: Arc<MonitorStats>,
}

impl MonitorHandle {
    /// At most one trigger waits behind the cycle in flight.
    pub fn channel(stats: Arc<MonitorStats>) -> (Self, mpsc::Receiver<Trigger>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx, stats }, rx)
    }

    pub fn stats(&self) -> Arc<MonitorStats> {
        self.stats.clone()
    }

    pub fn request_refresh(&self) -> RefreshOutcome {
        match self.tx.try_send(Trigger::ManualRefresh) {
            Ok(()) => RefreshOutcome::Queued,
            Err(TrySendError::Full(_)) => {
                self.stats.triggers_coalesced.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("refresh already pending; coalescing trigger");
                RefreshOutcome::Coalesced
            }
            Err(TrySendError::Closed(_)) => RefreshOutcome::Closed,
        }
    }
}

#[derive(Debug)]
pub struct MonitorStats {
    pub cycles_completed: AtomicU64,
    pub cycles_failed: AtomicU64,
    pub session_resets: AtomicU64,
    pub triggers_coalesced: AtomicU64,
    pub last_success_unix_ms: AtomicU64,
    pub last_error: Mutex<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorStatsSnapshot {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub session_resets: u64,
    pub triggers_coalesced: u64,
    pub last_success_unix_ms: Option<u64>,
    pub last_error: Option<String>,
}

impl MonitorStats {
    pub fn new() -> Self {
        Self {
            cycles_completed: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            session_resets: AtomicU64::new(0),
            triggers_coalesced: AtomicU64::new(0),
            last_success_unix_ms: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }

    fn record_success(&self, at: DateTime<Utc>) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.last_success_unix_ms
            .store(at.timestamp_millis().max(0) as u64, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = None;
        }
    }

    fn record_failure(&self, err: &CycleError) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = Some(err.to_string());
        }
    }

    pub fn snapshot(&self) -> MonitorStatsSnapshot {
        let last_success = self.last_success_unix_ms.load(Ordering::Relaxed);
        MonitorStatsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            session_resets: self.session_resets.load(Ordering::Relaxed),
            triggers_coalesced: self.triggers_coalesced.load(Ordering::Relaxed),
            last_success_unix_ms: (last_success > 0).then_some(last_success),
            last_error: self
                .last_error
                .lock()
                .ok()
                .and_then(|guard| guard.clone()),
        }
    }
}

impl Default for MonitorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything that survives between cycles. A reload replaces the session
/// wholesale, which also re-arms the one-shot alert.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub alert: AlertState,
}

impl Session {
    pub fn start() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            alert: AlertState::default(),
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            started_at: self.started_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub series: PointSeries,
    pub metrics: ConsumptionMetrics,
    pub usage: Vec<IntervalUsage>,
    pub alert: AlertDecision,
}

/// Runs the pure part of a cycle. Nothing in the session changes unless the
/// samples yield a usable series.
pub fn compute_cycle(
    config: &Config,
    session: &mut Session,
    raw: &[RawSample],
) -> Result<CycleOutput, CycleError> {
    let series = cleaner::clean(raw)?;
    let metrics = estimator::estimate(&series)?;
    let usage = usage::interval_usage(&series, config.total_capacity, &config.display_zone);
    let alert = alert::evaluate(
        &mut session.alert,
        metrics.latest_weight,
        config.total_capacity,
        config.low_threshold_percent,
    );
    Ok(CycleOutput {
        series,
        metrics,
        usage,
        alert,
    })
}

pub fn render_cycle<P: Presenter + ?Sized>(presenter: &mut P, config: &Config, output: &CycleOutput) {
    let unit = config.weight_unit.as_str();
    let metrics = &output.metrics;

    presenter.set_text(
        Slot::CurrentWeight,
        format!("{:.2} {unit}", metrics.latest_weight),
    );
    presenter.set_text(
        Slot::AvgConsumption,
        format!("{:.2} {unit}/day", metrics.avg_consumption_per_index),
    );
    presenter.set_text(Slot::DaysRemaining, metrics.days_remaining.to_string());
    presenter.set_text(
        Slot::LastUpdate,
        config.display_zone.timestamp(metrics.last_update_time),
    );

    match &output.alert.inline {
        InlineAlert::Show(message) => presenter.show_alert(AlertKind::Inline, message.clone()),
        InlineAlert::Hide => presenter.hide_alert(AlertKind::Inline),
    }
    if let Some(message) = &output.alert.full_screen {
        presenter.show_alert(AlertKind::Full, message.clone());
    }

    presenter.render_series(
        ChartId::PercentUsed,
        ChartSeries {
            dataset_label: PERCENT_CHART_LABEL.to_string(),
            labels: output.usage.iter().map(|entry| entry.label.clone()).collect(),
            values: output.usage.iter().map(|entry| entry.percent_used).collect(),
        },
    );
    presenter.render_series(
        ChartId::Weight,
        ChartSeries {
            dataset_label: format!("Weight ({unit})"),
            labels: output
                .series
                .points()
                .iter()
                .map(|point| config.display_zone.time_of_day(point.time))
                .collect(),
            values: output.series.weights(),
        },
    );
}

pub struct Monitor {
    config: Config,
    feed: FeedClient,
    board: SharedBoard,
    stats: Arc<MonitorStats>,
}

impl Monitor {
    pub fn new(config: Config, feed: FeedClient, board: SharedBoard, stats: Arc<MonitorStats>) -> Self {
        Self {
            config,
            feed,
            board,
            stats,
        }
    }

    /// Fresh session with a blank board, the equivalent of a page load.
    pub fn begin_session(&self) -> Session {
        let session = Session::start();
        self.board
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset(session.info());
        tracing::info!(session = %session.id, "started monitor session");
        session
    }

    pub async fn poll_once(&self, session: &mut Session, trigger: Trigger) -> Result<(), CycleError> {
        let span = tracing::info_span!("cycle", session = %session.id, trigger = ?trigger);
        async {
            let result = match self.feed.fetch().await {
                Ok(raw) => {
                    tracing::debug!(samples = raw.len(), "fetched channel feed");
                    self.apply_samples(session, &raw)
                }
                Err(err) => Err(err),
            };
            if let Err(err) = &result {
                self.stats.record_failure(err);
                tracing::warn!(error = %err, kind = err.kind(), "polling cycle aborted; keeping previous dashboard");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Computes and renders one cycle. The board is only touched once the
    /// whole computation has succeeded.
    pub fn apply_samples(&self, session: &mut Session, raw: &[RawSample]) -> Result<(), CycleError> {
        let output = compute_cycle(&self.config, session, raw)?;
        let now = Utc::now();
        {
            let mut board = self.board.lock().unwrap_or_else(PoisonError::into_inner);
            render_cycle(&mut *board, &self.config, &output);
            board.mark_rendered(now);
        }
        self.stats.record_success(now);

        tracing::info!(
            points = output.series.points().len(),
            latest_weight = output.metrics.latest_weight,
            rate = output.metrics.avg_consumption_per_index,
            days_remaining = %output.metrics.days_remaining,
            percent_remaining = output.alert.percent_remaining,
            low = output.alert.is_low(),
            "dashboard updated"
        );
        if output.alert.full_screen.is_some() {
            tracing::warn!(
                percent_remaining = output.alert.percent_remaining,
                "stock dropped below low threshold"
            );
        }
        Ok(())
    }

    /// Serializes every trigger through one task so cycles never interleave.
    /// The reload timer tears the session down and starts over.
    pub async fn run(self, mut rx: mpsc::Receiver<Trigger>) {
        let mut session = self.begin_session();
        // Failures are already logged and counted by poll_once.
        self.poll_once(&mut session, Trigger::Startup).await.ok();

        let period = self.config.reload_interval();
        let mut reload = tokio::time::interval_at(Instant::now() + period, period);
        reload.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = reload.tick() => {
                    self.stats.session_resets.fetch_add(1, Ordering::Relaxed);
                    tracing::info!(previous = %session.id, "reload interval elapsed; resetting session");
                    session = self.begin_session();
                    self.poll_once(&mut session, Trigger::Startup).await.ok();
                }
                trigger = rx.recv() => {
                    match trigger {
                        Some(trigger) => {
                            self.poll_once(&mut session, trigger).await.ok();
                        }
                        None => {
                            tracing::info!("trigger channel closed; monitor stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}
