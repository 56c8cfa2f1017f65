//! Ambient sensor service (SCD41: CO2, temperature, humidity).
//!
//! The I2C side lives outside this process; a measurement helper drops the
//! latest reading as JSON into a file which `FileSensorDriver` picks up:
//!
//! `{"co2_ppm": 850, "temperature": 24.3, "humidity": 55.0, "data_ready": true}`

use airboard_sync::{AcquisitionError, DataSource, Domain, SensorSnapshot, Snapshot, monotonic_ms};
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Raw measurement as produced by the sensor.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorReading {
    pub co2_ppm: u16,
    pub temperature: f32,
    pub humidity: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("sensor unavailable: {0}")]
    Unavailable(String),

    #[error("measurement not ready")]
    NotReady,

    #[error("bad measurement: {0}")]
    Malformed(String),
}

impl From<DriverError> for AcquisitionError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::NotReady => AcquisitionError::NotReady,
            other => AcquisitionError::Driver(other.to_string()),
        }
    }
}

/// Hardware-facing side of the sensor.
pub trait SensorDriver: Send {
    fn init(&mut self) -> Result<(), DriverError>;
    fn read(&mut self) -> Result<SensorReading, DriverError>;
}

#[derive(Deserialize)]
struct Measurement {
    co2_ppm: u16,
    temperature: f32,
    humidity: f32,
    #[serde(default = "default_ready")]
    data_ready: bool,
}

fn default_ready() -> bool {
    true
}

/// Reads the measurement file written by the sensor helper.
pub struct FileSensorDriver {
    path: PathBuf,
}

impl FileSensorDriver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SensorDriver for FileSensorDriver {
    fn init(&mut self) -> Result<(), DriverError> {
        fs::metadata(&self.path)
            .map(|_| ())
            .map_err(|e| DriverError::Unavailable(format!("{}: {}", self.path.display(), e)))
    }

    fn read(&mut self) -> Result<SensorReading, DriverError> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| DriverError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        let measurement: Measurement =
            serde_json::from_str(&text).map_err(|e| DriverError::Malformed(e.to_string()))?;
        if !measurement.data_ready {
            return Err(DriverError::NotReady);
        }
        Ok(SensorReading {
            co2_ppm: measurement.co2_ppm,
            temperature: measurement.temperature,
            humidity: measurement.humidity,
        })
    }
}

/// Producer-side adapter stamping readings with a non-decreasing capture time.
pub struct SensorSource<D: SensorDriver> {
    driver: D,
    last_captured_at_ms: u64,
}

impl<D: SensorDriver> SensorSource<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            last_captured_at_ms: 0,
        }
    }

    fn stamp(&mut self, now_ms: u64) -> u64 {
        self.last_captured_at_ms = self.last_captured_at_ms.max(now_ms);
        self.last_captured_at_ms
    }
}

impl<D: SensorDriver> DataSource for SensorSource<D> {
    fn domain(&self) -> Domain {
        Domain::Sensor
    }

    fn setup(&mut self) -> Result<(), AcquisitionError> {
        self.driver.init()?;
        info!("Sensor driver initialized");
        Ok(())
    }

    fn acquire(&mut self) -> Result<Snapshot, AcquisitionError> {
        let reading = self.driver.read()?;
        let captured_at_ms = self.stamp(monotonic_ms());
        debug!(
            "CO2: {} ppm, Temperature: {:.1}°C, Humidity: {:.1}%",
            reading.co2_ppm, reading.temperature, reading.humidity
        );
        Ok(SensorSnapshot {
            co2_ppm: reading.co2_ppm,
            temperature: reading.temperature,
            humidity: reading.humidity,
            captured_at_ms,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("airboard-{}-{}.json", name, std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_reads_measurement_file() {
        let path = temp_file(
            "ok",
            r#"{"co2_ppm": 850, "temperature": 24.3, "humidity": 55.0, "data_ready": true}"#,
        );
        let mut source = SensorSource::new(FileSensorDriver::new(&path));
        source.setup().unwrap();
        let Snapshot::Sensor(snapshot) = source.acquire().unwrap() else {
            panic!("wrong domain");
        };
        assert_eq!(snapshot.co2_ppm, 850);
        assert_eq!(snapshot.temperature, 24.3);
        assert_eq!(snapshot.humidity, 55.0);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_not_ready_is_transient() {
        let path = temp_file(
            "not-ready",
            r#"{"co2_ppm": 0, "temperature": 0, "humidity": 0, "data_ready": false}"#,
        );
        let mut source = SensorSource::new(FileSensorDriver::new(&path));
        assert_eq!(source.acquire(), Err(AcquisitionError::NotReady));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_fails_setup() {
        let mut source = SensorSource::new(FileSensorDriver::new("/nonexistent/scd41.json"));
        assert!(matches!(source.setup(), Err(AcquisitionError::Driver(_))));
        assert!(matches!(source.acquire(), Err(AcquisitionError::Driver(_))));
    }

    #[test]
    fn test_capture_time_never_goes_back() {
        let mut source = SensorSource::new(FileSensorDriver::new("/unused"));
        assert_eq!(source.stamp(100), 100);
        assert_eq!(source.stamp(90), 100);
        assert_eq!(source.stamp(150), 150);
    }
}
