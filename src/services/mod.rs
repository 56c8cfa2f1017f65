//! Data services for the air board.
//!
//! Each producer runs on its own thread with its own single-threaded tokio
//! runtime. Producers share nothing but the store and the readiness bus.
//!
//! - `sensor` - SCD41 CO2 / temperature / humidity
//! - `clock` - local wall-clock time and sync status
//! - `weather` - current conditions from the weather API
//! - `network` - link probe and startup gate

pub mod clock;
pub mod network;
pub mod sensor;
pub mod weather;

use crate::config::AppConfig;
use airboard_sync::{DataSource, Producer, ProducerConfig, ReadinessEventBus, SharedStateStore};
use log::{error, info};
use std::sync::Arc;
use std::thread;

/// Start all producers.
/// Call this once from main, after the network gate.
pub fn start_all(
    config: &AppConfig,
    store: Arc<SharedStateStore>,
    bus: Arc<ReadinessEventBus>,
) -> std::io::Result<()> {
    info!("Starting producers...");

    spawn_producer(
        sensor::SensorSource::new(sensor::FileSensorDriver::new(
            config.sensor.measurement_path.clone(),
        )),
        config.sensor_producer(),
        store.clone(),
        bus.clone(),
    )?;
    spawn_producer(
        clock::ClockSource::new(
            clock::SystemClock::new(config.clock.utc_offset_minutes),
            config.clock.clone(),
        ),
        config.clock_producer(),
        store.clone(),
        bus.clone(),
    )?;
    spawn_producer(
        weather::WeatherSource::new(config.weather.client.clone()),
        config.weather_producer(),
        store,
        bus,
    )?;

    Ok(())
}

/// Run a producer forever on a dedicated thread.
pub fn spawn_producer<S: DataSource + 'static>(
    source: S,
    config: ProducerConfig,
    store: Arc<SharedStateStore>,
    bus: Arc<ReadinessEventBus>,
) -> std::io::Result<()> {
    let domain = source.domain();
    let producer = Producer::new(source, store, bus, config);

    thread::Builder::new()
        .name(format!("{}-producer", domain))
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create tokio runtime for {} producer: {}", domain, e);
                    return;
                }
            };
            rt.block_on(producer.run());
        })?;

    info!("Started {} producer", domain);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use airboard_sync::{
        AcquisitionError, DEFAULT_LOCK_TIMEOUT, Domain, ReadyFlag, ReadySet, SensorSnapshot,
        Snapshot, WaitMode,
    };
    use std::time::Duration;

    struct Counter(u16);

    impl DataSource for Counter {
        fn domain(&self) -> Domain {
            Domain::Sensor
        }

        fn acquire(&mut self) -> Result<Snapshot, AcquisitionError> {
            self.0 += 1;
            Ok(SensorSnapshot {
                co2_ppm: self.0,
                ..SensorSnapshot::default()
            }
            .into())
        }
    }

    #[tokio::test]
    async fn test_spawned_producer_publishes() {
        let store = Arc::new(SharedStateStore::new());
        let bus = Arc::new(ReadinessEventBus::new());
        spawn_producer(
            Counter(0),
            ProducerConfig::with_period(Duration::from_millis(10)),
            store.clone(),
            bus.clone(),
        )
        .unwrap();

        let outcome = bus
            .wait(ReadyFlag::SensorReady, WaitMode::All, Duration::from_secs(5), true)
            .await;
        assert_eq!(outcome.observed, ReadySet::from(ReadyFlag::SensorReady));

        let Snapshot::Sensor(snapshot) = store
            .read_copy(Domain::Sensor, DEFAULT_LOCK_TIMEOUT)
            .await
            .unwrap()
        else {
            panic!("wrong domain");
        };
        assert!(snapshot.co2_ppm >= 1);
    }
}
