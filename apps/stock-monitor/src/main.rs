mod alert;
mod board;
mod cleaner;
mod config;
mod error;
mod estimator;
mod feed;
mod format;
mod http;
mod monitor;
mod presenter;
mod usage;

use crate::board::DashboardBoard;
use crate::config::Config;
use crate::feed::FeedClient;
use crate::monitor::{Monitor, MonitorHandle, MonitorStats};
use anyhow::{Context, Result};
use std::sync::Arc;

fn init_tracing(config: &Config) -> Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime::Tokio, trace::Config as OTelTraceConfig, Resource};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,stock_monitor=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    if let Some(endpoint) = &config.otlp_endpoint {
        let endpoint = normalize_otlp_http_endpoint(endpoint);
        let exporter = opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(endpoint);
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(OTelTraceConfig::default().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "stock-monitor"),
            ])))
            .install_batch(Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

fn normalize_otlp_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.contains("/v1/traces") {
        return trimmed.to_string();
    }
    format!("{}/v1/traces", trimmed.trim_end_matches('/'))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config)?;

    let feed = FeedClient::new(&config)?;
    tracing::info!(
        channel = %config.channel_id,
        field = config.field_index,
        results = config.results,
        capacity = config.total_capacity,
        reload_ms = config.reload_interval_ms,
        "stock-monitor starting"
    );

    let board = DashboardBoard::shared();
    let stats = Arc::new(MonitorStats::new());
    let (handle, rx) = MonitorHandle::channel(stats.clone());

    let monitor = Monitor::new(config.clone(), feed, board.clone(), stats);
    let monitor_handle = tokio::spawn(monitor.run(rx));

    let app = http::router(http::HttpState {
        board,
        monitor: handle,
    });
    let listener = tokio::net::TcpListener::bind(&config.http_bind)
        .await
        .with_context(|| format!("failed to bind dashboard listener on {}", config.http_bind))?;
    tracing::info!(bind = %config.http_bind, "stock-monitor HTTP listening");
    let http_handle = tokio::spawn(async move { axum::serve(listener, app).await });

    tokio::select! {
        res = monitor_handle => {
            if let Err(err) = res { tracing::error!(error=%err, "monitor task failed"); }
        }
        res = http_handle => {
            match res {
                Ok(Err(err)) => tracing::error!(error=%err, "HTTP server exited"),
                Err(err) => tracing::error!(error=%err, "HTTP task failed"),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
