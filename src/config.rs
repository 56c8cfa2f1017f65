//! Application configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial (or
//! missing) file still yields a working setup.

use airboard_sync::{AggregatorConfig, DEFAULT_LOCK_TIMEOUT, Domain, ProducerConfig};
use airboard_weather::WeatherClientConfig;
use log::{info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = "airboard";
const CONFIG_FILE: &str = "config.json";
const WEATHER_KEY_ENV: &str = "AIRBOARD_WEATHER_KEY";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sensor: SensorSettings,
    pub clock: ClockSettings,
    pub weather: WeatherSettings,
    pub network: NetworkSettings,
    pub display: DisplaySettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// JSON file holding the latest SCD41 measurement
    pub measurement_path: PathBuf,
    pub period_ms: u64,
    /// The SCD41 needs one full measurement interval before its first reading
    pub warm_up_ms: u64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            measurement_path: PathBuf::from("/run/airboard/scd41.json"),
            period_ms: 5_000,
            warm_up_ms: 5_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    /// Local offset from UTC, e.g. 540 for JST
    pub utc_offset_minutes: i32,
    pub period_ms: u64,
    pub sync_retries: u32,
    pub sync_retry_interval_ms: u64,
    /// Publish the local clock with `synced = false` instead of skipping
    pub publish_unsynced: bool,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 9 * 60,
            period_ms: 10_000,
            sync_retries: 10,
            sync_retry_interval_ms: 2_000,
            publish_unsynced: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    #[serde(flatten)]
    pub client: WeatherClientConfig,
    pub period_ms: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            client: WeatherClientConfig::default(),
            period_ms: 30 * 60 * 1_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Host:port probed with a TCP connect to decide the link is up
    pub probe_addr: String,
    pub probe_timeout_ms: u64,
    pub retry_interval_ms: u64,
    /// How long startup waits for the link before starting producers anyway
    pub gate_timeout_ms: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            probe_addr: "1.1.1.1:53".to_string(),
            probe_timeout_ms: 1_000,
            retry_interval_ms: 2_000,
            gate_timeout_ms: 20_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub bootstrap_timeout_ms: u64,
    pub steady_timeout_ms: u64,
    pub lock_timeout_ms: u64,
    /// Settle delay after a weather dispatch; `null` disables it
    pub weather_settle_ms: Option<u64>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            bootstrap_timeout_ms: 5_000,
            steady_timeout_ms: 30_000,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
            weather_settle_ms: Some(500),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or the default location when `None`.
    /// Falls back to defaults when the file is missing or invalid.
    pub fn load(path: Option<PathBuf>) -> Self {
        let path = path.or_else(default_path);
        let mut config = match path {
            Some(path) => Self::load_file(&path),
            None => Self::default(),
        };
        config.apply_env();
        config
    }

    fn load_file(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                info!("No config at {} ({}), using defaults", path.display(), e);
                return Self::default();
            }
        };
        match Self::from_json(&text) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Invalid config {}: {}. Using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(WEATHER_KEY_ENV) {
            if !key.trim().is_empty() {
                self.weather.client.api_key = key.trim().to_string();
            }
        }
    }

    pub fn sensor_producer(&self) -> ProducerConfig {
        ProducerConfig::with_period(ms(self.sensor.period_ms))
            .warm_up(ms(self.sensor.warm_up_ms))
            .lock_timeout(ms(self.display.lock_timeout_ms))
    }

    pub fn clock_producer(&self) -> ProducerConfig {
        ProducerConfig::with_period(ms(self.clock.period_ms))
            .lock_timeout(ms(self.display.lock_timeout_ms))
    }

    pub fn weather_producer(&self) -> ProducerConfig {
        ProducerConfig::with_period(ms(self.weather.period_ms))
            .lock_timeout(ms(self.display.lock_timeout_ms))
    }

    pub fn aggregator(&self) -> AggregatorConfig {
        let mut config = AggregatorConfig {
            bootstrap_timeout: ms(self.display.bootstrap_timeout_ms),
            steady_timeout: ms(self.display.steady_timeout_ms),
            lock_timeout: ms(self.display.lock_timeout_ms),
            ..AggregatorConfig::default()
        };
        config.settle.clear();
        if let Some(settle) = self.display.weather_settle_ms {
            config.settle.insert(Domain::Weather, ms(settle));
        }
        config
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[inline]
fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
