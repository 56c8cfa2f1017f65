//! Weather service.
//!
//! Wraps the airboard-weather client as a producer data source. Transport
//! failures, bad status codes and malformed payloads all skip the cycle.

use airboard_sync::{AcquisitionError, DataSource, Domain, Snapshot};
use airboard_weather::{WeatherClient, WeatherClientConfig};

pub struct WeatherSource {
    client: WeatherClient,
}

impl WeatherSource {
    pub fn new(config: WeatherClientConfig) -> Self {
        Self {
            client: WeatherClient::new(config),
        }
    }
}

impl DataSource for WeatherSource {
    fn domain(&self) -> Domain {
        Domain::Weather
    }

    fn setup(&mut self) -> Result<(), AcquisitionError> {
        if self.client.config().api_key.trim().is_empty() {
            return Err(AcquisitionError::Setup(
                "no weather API key configured (set AIRBOARD_WEATHER_KEY)".into(),
            ));
        }
        Ok(())
    }

    fn acquire(&mut self) -> Result<Snapshot, AcquisitionError> {
        Ok(self.client.fetch()?.into())
    }
}
