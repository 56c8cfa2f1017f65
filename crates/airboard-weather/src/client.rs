//! Blocking HTTP client for current weather conditions.

use crate::error::WeatherError;
use crate::payload::parse_current;
use airboard_sync::{WeatherSnapshot, monotonic_ms};
use log::{debug, info};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com/v1/current.json";

/// Where and how to query the weather service.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WeatherClientConfig {
    pub base_url: String,
    pub api_key: String,
    /// Location query, e.g. "Tokyo"
    pub city: String,
    pub timeout_ms: u64,
}

impl Default for WeatherClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            city: "Tokyo".to_string(),
            timeout_ms: 10_000,
        }
    }
}

pub struct WeatherClient {
    agent: ureq::Agent,
    config: WeatherClientConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherClientConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build();
        Self { agent, config }
    }

    pub fn config(&self) -> &WeatherClientConfig {
        &self.config
    }

    /// Fetch and decode the current conditions.
    pub fn fetch(&self) -> Result<WeatherSnapshot, WeatherError> {
        let response = self
            .agent
            .get(&self.config.base_url)
            .query("key", &self.config.api_key)
            .query("q", &self.config.city)
            .query("aqi", "no")
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => WeatherError::Status(code),
                ureq::Error::Transport(t) => WeatherError::Transport(t.to_string()),
            })?;

        let status = response.status();
        if status != 200 {
            return Err(WeatherError::Status(status));
        }

        let body = response.into_string()?;
        debug!("Weather data retrieved ({} bytes)", body.len());

        let snapshot = parse_current(&body, monotonic_ms())?;
        info!(
            "Weather: {:.1}°C (feels like {:.1}°C), {}, humidity {}%, wind {:.1} km/h",
            snapshot.temperature,
            snapshot.feels_like,
            snapshot.condition,
            snapshot.humidity,
            snapshot.wind_speed
        );
        Ok(snapshot)
    }
}
