use crate::format::DisplayZone;
use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.thingspeak.com";
const DEFAULT_FIELD_INDEX: u32 = 1;
const DEFAULT_RESULTS: u32 = 200;
const DEFAULT_TOTAL_CAPACITY: f64 = 500.0;
const DEFAULT_LOW_THRESHOLD_PERCENT: f64 = 20.0;
const DEFAULT_WEIGHT_UNIT: &str = "g";
const DEFAULT_RELOAD_INTERVAL_MS: u64 = 15_000;
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_HTTP_BIND: &str = "127.0.0.1:9102";

fn setup_config_path() -> Option<PathBuf> {
    env_optional("STOCK_MONITOR_SETUP_CONFIG_PATH").map(PathBuf::from)
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SetupConfigOverrides {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    field_index: Option<u32>,
    #[serde(default)]
    read_api_key: Option<String>,
    #[serde(default)]
    results: Option<u32>,
    #[serde(default)]
    total_capacity: Option<f64>,
    #[serde(default)]
    low_threshold_percent: Option<f64>,
    #[serde(default)]
    weight_unit: Option<String>,
    #[serde(default)]
    reload_interval_ms: Option<u64>,
    #[serde(default)]
    fetch_timeout_ms: Option<u64>,
    #[serde(default)]
    display_utc_offset: Option<String>,
    #[serde(default)]
    http_bind: Option<String>,
}

fn load_setup_config_overrides(path: &Path) -> Option<SetupConfigOverrides> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "stock-monitor failed to read setup config; using env defaults"
            );
            return None;
        }
    };
    let mut bytes = contents.into_bytes();
    match simd_json::serde::from_slice(&mut bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "stock-monitor failed to parse setup config; using env defaults"
            );
            None
        }
    }
}

/// Setup-file values only win for keys whose env var is unset or blank.
fn apply_setup_overrides(config: &mut Config, overrides: &SetupConfigOverrides) {
    let env_allows = |key: &str| env_optional(key).is_none();
    let non_blank = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if env_allows("STOCK_MONITOR_BASE_URL") {
        if let Some(value) = non_blank(&overrides.base_url) {
            config.base_url = value;
        }
    }
    if env_allows("STOCK_MONITOR_CHANNEL_ID") {
        if let Some(value) = non_blank(&overrides.channel_id) {
            config.channel_id = value;
        }
    }
    if env_allows("STOCK_MONITOR_FIELD_INDEX") {
        if let Some(value) = overrides.field_index.filter(|v| *v != 0) {
            config.field_index = value;
        }
    }
    if env_allows("STOCK_MONITOR_READ_API_KEY") {
        if let Some(value) = overrides.read_api_key.as_deref() {
            let trimmed = value.trim();
            config.read_api_key = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
    }
    if env_allows("STOCK_MONITOR_RESULTS") {
        if let Some(value) = overrides.results.filter(|v| *v != 0) {
            config.results = value;
        }
    }
    if env_allows("STOCK_MONITOR_TOTAL_CAPACITY") {
        if let Some(value) = overrides.total_capacity {
            config.total_capacity = value;
        }
    }
    if env_allows("STOCK_MONITOR_LOW_THRESHOLD_PERCENT") {
        if let Some(value) = overrides.low_threshold_percent {
            config.low_threshold_percent = value;
        }
    }
    if env_allows("STOCK_MONITOR_WEIGHT_UNIT") {
        if let Some(value) = non_blank(&overrides.weight_unit) {
            config.weight_unit = value;
        }
    }
    if env_allows("STOCK_MONITOR_RELOAD_INTERVAL_MS") {
        if let Some(value) = overrides.reload_interval_ms.filter(|v| *v != 0) {
            config.reload_interval_ms = value;
        }
    }
    if env_allows("STOCK_MONITOR_FETCH_TIMEOUT_MS") {
        if let Some(value) = overrides.fetch_timeout_ms.filter(|v| *v != 0) {
            config.fetch_timeout_ms = value;
        }
    }
    if env_allows("STOCK_MONITOR_DISPLAY_UTC_OFFSET") {
        if let Some(raw) = non_blank(&overrides.display_utc_offset) {
            match DisplayZone::parse_offset(&raw) {
                Some(zone) => config.display_zone = zone,
                None => tracing::warn!(
                    value = %raw,
                    "ignoring invalid display_utc_offset in setup config"
                ),
            }
        }
    }
    if env_allows("STOCK_MONITOR_HTTP_BIND") {
        if let Some(value) = non_blank(&overrides.http_bind) {
            config.http_bind = value;
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub channel_id: String,
    pub field_index: u32,
    pub read_api_key: Option<String>,
    pub results: u32,
    pub total_capacity: f64,
    pub low_threshold_percent: f64,
    pub weight_unit: String,
    pub reload_interval_ms: u64,
    pub fetch_timeout_ms: u64,
    pub display_zone: DisplayZone,
    pub http_bind: String,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Defaults for every tunable; `channel_id` has no sensible default.
    pub fn with_channel(channel_id: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            channel_id: channel_id.into(),
            field_index: DEFAULT_FIELD_INDEX,
            read_api_key: None,
            results: DEFAULT_RESULTS,
            total_capacity: DEFAULT_TOTAL_CAPACITY,
            low_threshold_percent: DEFAULT_LOW_THRESHOLD_PERCENT,
            weight_unit: DEFAULT_WEIGHT_UNIT.to_string(),
            reload_interval_ms: DEFAULT_RELOAD_INTERVAL_MS,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            display_zone: DisplayZone::Local,
            http_bind: DEFAULT_HTTP_BIND.to_string(),
            otlp_endpoint: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let mut config = Self::with_channel(env_optional("STOCK_MONITOR_CHANNEL_ID").unwrap_or_default());

        if let Some(value) = env_optional("STOCK_MONITOR_BASE_URL") {
            config.base_url = value;
        }
        config.field_index = env_parsed("STOCK_MONITOR_FIELD_INDEX").unwrap_or(DEFAULT_FIELD_INDEX);
        config.read_api_key = env_optional("STOCK_MONITOR_READ_API_KEY");
        config.results = env_parsed("STOCK_MONITOR_RESULTS").unwrap_or(DEFAULT_RESULTS);
        config.total_capacity =
            env_parsed("STOCK_MONITOR_TOTAL_CAPACITY").unwrap_or(DEFAULT_TOTAL_CAPACITY);
        config.low_threshold_percent = env_parsed("STOCK_MONITOR_LOW_THRESHOLD_PERCENT")
            .unwrap_or(DEFAULT_LOW_THRESHOLD_PERCENT);
        if let Some(value) = env_optional("STOCK_MONITOR_WEIGHT_UNIT") {
            config.weight_unit = value;
        }
        config.reload_interval_ms =
            env_parsed("STOCK_MONITOR_RELOAD_INTERVAL_MS").unwrap_or(DEFAULT_RELOAD_INTERVAL_MS);
        config.fetch_timeout_ms =
            env_parsed("STOCK_MONITOR_FETCH_TIMEOUT_MS").unwrap_or(DEFAULT_FETCH_TIMEOUT_MS);
        if let Some(raw) = env_optional("STOCK_MONITOR_DISPLAY_UTC_OFFSET") {
            config.display_zone = DisplayZone::parse_offset(&raw).with_context(|| {
                format!("invalid STOCK_MONITOR_DISPLAY_UTC_OFFSET {raw:?}; expected e.g. +05:30")
            })?;
        }
        if let Some(value) = env_optional("STOCK_MONITOR_HTTP_BIND") {
            config.http_bind = value;
        }
        config.otlp_endpoint = env_optional("OTEL_EXPORTER_OTLP_ENDPOINT");

        if let Some(path) = setup_config_path() {
            if let Some(overrides) = load_setup_config_overrides(&path) {
                apply_setup_overrides(&mut config, &overrides);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel_id.trim().is_empty() {
            bail!("STOCK_MONITOR_CHANNEL_ID is required (or present as channel_id in the setup config)");
        }
        if self.base_url.trim().is_empty() {
            bail!("STOCK_MONITOR_BASE_URL must not be blank");
        }
        if self.field_index == 0 {
            bail!("field index must be >= 1");
        }
        if self.results == 0 {
            bail!("results limit must be >= 1");
        }
        if !self.total_capacity.is_finite() || self.total_capacity <= 0.0 {
            bail!("total capacity must be a positive number, got {}", self.total_capacity);
        }
        if !(self.low_threshold_percent > 0.0 && self.low_threshold_percent <= 100.0) {
            bail!(
                "low threshold percent must be within (0, 100], got {}",
                self.low_threshold_percent
            );
        }
        if self.reload_interval_ms == 0 {
            bail!("reload interval must be > 0");
        }
        Ok(())
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_millis(self.reload_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms.max(1))
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_optional(key)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable env value; using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate_once_channel_is_set() {
        let config = Config::with_channel("3179656");
        assert!(config.validate().is_ok());
        assert_eq!(config.results, 200);
        assert_eq!(config.reload_interval(), Duration::from_secs(15));
        assert!((config.total_capacity - 500.0).abs() < f64::EPSILON);
        assert!((config.low_threshold_percent - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_rejects_blank_channel_and_bad_ranges() {
        assert!(Config::with_channel("  ").validate().is_err());

        let mut config = Config::with_channel("1");
        config.total_capacity = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::with_channel("1");
        config.low_threshold_percent = 120.0;
        assert!(config.validate().is_err());

        let mut config = Config::with_channel("1");
        config.results = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn setup_file_overrides_apply_to_unset_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "channel_id": "42",
                "read_api_key": "  KEY123 ",
                "total_capacity": 750.0,
                "results": 50,
                "display_utc_offset": "+02:00",
                "weight_unit": "  "
            }}"#
        )
        .unwrap();

        let overrides = load_setup_config_overrides(file.path()).expect("overrides parse");
        let mut config = Config::with_channel("");
        apply_setup_overrides(&mut config, &overrides);

        assert_eq!(config.channel_id, "42");
        assert_eq!(config.read_api_key.as_deref(), Some("KEY123"));
        assert_eq!(config.results, 50);
        assert!((config.total_capacity - 750.0).abs() < f64::EPSILON);
        assert_eq!(config.weight_unit, "g");
        assert_eq!(config.display_zone, DisplayZone::parse_offset("+02:00").unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unparseable_setup_file_is_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_setup_config_overrides(file.path()).is_none());
        assert!(load_setup_config_overrides(Path::new("/nonexistent/stock-monitor.json")).is_none());
    }
}
