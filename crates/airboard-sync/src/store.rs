//! Per-domain guarded snapshot storage.
//!
//! Each domain owns one slot behind its own lock. Callers never see the lock:
//! a slot only offers `write` (replace the whole value) and `read_copy`
//! (clone it out), both bounded by a lock timeout. No operation here touches
//! more than one slot, so any number of producers plus one reader cannot
//! deadlock.

use crate::error::StoreError;
use crate::types::{Domain, SensorSnapshot, Snapshot, TimeSnapshot, WeatherSnapshot};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Lock bound used by producers and the aggregator unless configured otherwise.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// Guarded container for the latest value of one domain.
#[derive(Debug)]
pub struct DomainSlot<T> {
    domain: Domain,
    value: Mutex<T>,
}

impl<T: Clone + Default> DomainSlot<T> {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            value: Mutex::new(T::default()),
        }
    }

    /// Replace the stored value. On timeout nothing is written.
    pub async fn write(&self, value: T, lock_timeout: Duration) -> Result<(), StoreError> {
        let mut guard = timeout(lock_timeout, self.value.lock())
            .await
            .map_err(|_| self.lock_timeout(lock_timeout))?;
        *guard = value;
        Ok(())
    }

    /// Clone the stored value out.
    pub async fn read_copy(&self, lock_timeout: Duration) -> Result<T, StoreError> {
        let guard = timeout(lock_timeout, self.value.lock())
            .await
            .map_err(|_| self.lock_timeout(lock_timeout))?;
        Ok(guard.clone())
    }

    /// Hold the lock directly, simulating a slow writer.
    #[cfg(test)]
    pub(crate) async fn hold(&self) -> tokio::sync::MutexGuard<'_, T> {
        self.value.lock().await
    }

    fn lock_timeout(&self, waited: Duration) -> StoreError {
        StoreError::LockTimeout {
            domain: self.domain,
            waited,
        }
    }
}

/// One slot per domain, all default-valued at construction.
#[derive(Debug)]
pub struct SharedStateStore {
    pub sensor: DomainSlot<SensorSnapshot>,
    pub time: DomainSlot<TimeSnapshot>,
    pub weather: DomainSlot<WeatherSnapshot>,
}

impl Default for SharedStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStateStore {
    pub fn new() -> Self {
        Self {
            sensor: DomainSlot::new(Domain::Sensor),
            time: DomainSlot::new(Domain::Time),
            weather: DomainSlot::new(Domain::Weather),
        }
    }

    /// Write a snapshot into the slot of its own domain.
    pub async fn write(&self, snapshot: Snapshot, lock_timeout: Duration) -> Result<(), StoreError> {
        match snapshot {
            Snapshot::Sensor(value) => self.sensor.write(value, lock_timeout).await,
            Snapshot::Time(value) => self.time.write(value, lock_timeout).await,
            Snapshot::Weather(value) => self.weather.write(value, lock_timeout).await,
        }
    }

    /// Copy the current snapshot of `domain`.
    pub async fn read_copy(
        &self,
        domain: Domain,
        lock_timeout: Duration,
    ) -> Result<Snapshot, StoreError> {
        Ok(match domain {
            Domain::Sensor => self.sensor.read_copy(lock_timeout).await?.into(),
            Domain::Time => self.time.read_copy(lock_timeout).await?.into(),
            Domain::Weather => self.weather.read_copy(lock_timeout).await?.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::{Duration, Instant, sleep};

    #[tokio::test]
    async fn test_starts_with_defaults() {
        let store = SharedStateStore::new();
        let snapshot = store
            .read_copy(Domain::Weather, DEFAULT_LOCK_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(snapshot, Snapshot::Weather(WeatherSnapshot::default()));
    }

    #[tokio::test]
    async fn test_write_replaces_whole_snapshot() {
        let store = SharedStateStore::new();
        let first = SensorSnapshot {
            co2_ppm: 850,
            temperature: 24.3,
            humidity: 55.0,
            captured_at_ms: 10,
        };
        store
            .write(first.clone().into(), DEFAULT_LOCK_TIMEOUT)
            .await
            .unwrap();
        let second = SensorSnapshot {
            co2_ppm: 1200,
            ..SensorSnapshot::default()
        };
        store
            .write(second.clone().into(), DEFAULT_LOCK_TIMEOUT)
            .await
            .unwrap();

        let read = store.read_copy(Domain::Sensor, DEFAULT_LOCK_TIMEOUT).await.unwrap();
        assert_eq!(read, Snapshot::Sensor(second));
        // Other domains untouched
        let time = store.read_copy(Domain::Time, DEFAULT_LOCK_TIMEOUT).await.unwrap();
        assert_eq!(time, Snapshot::Time(TimeSnapshot::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_times_out_while_writer_holds_lock() {
        let store = Arc::new(SharedStateStore::new());
        let holder = {
            let store = store.clone();
            tokio::spawn(async move {
                let _guard = store.sensor.hold().await;
                sleep(Duration::from_millis(500)).await;
            })
        };
        tokio::task::yield_now().await;

        let started = Instant::now();
        let result = store.read_copy(Domain::Sensor, DEFAULT_LOCK_TIMEOUT).await;
        assert_eq!(
            result,
            Err(StoreError::LockTimeout {
                domain: Domain::Sensor,
                waited: DEFAULT_LOCK_TIMEOUT,
            })
        );
        assert!(started.elapsed() < Duration::from_millis(500));

        // Another domain stays available meanwhile
        assert!(store.read_copy(Domain::Time, DEFAULT_LOCK_TIMEOUT).await.is_ok());

        holder.await.unwrap();
        assert!(store.read_copy(Domain::Sensor, DEFAULT_LOCK_TIMEOUT).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_write_is_skipped() {
        let store = Arc::new(SharedStateStore::new());
        let guard = store.weather.hold().await;
        let result = store
            .write(
                WeatherSnapshot {
                    humidity: 70,
                    ..WeatherSnapshot::default()
                }
                .into(),
                DEFAULT_LOCK_TIMEOUT,
            )
            .await;
        assert!(matches!(result, Err(StoreError::LockTimeout { domain: Domain::Weather, .. })));
        drop(guard);

        let read = store.read_copy(Domain::Weather, DEFAULT_LOCK_TIMEOUT).await.unwrap();
        assert_eq!(read, Snapshot::Weather(WeatherSnapshot::default()));
    }

    #[test]
    fn test_reader_never_sees_torn_snapshot() {
        let store = Arc::new(SharedStateStore::new());
        let rounds = 2_000u16;

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                    .unwrap();
                rt.block_on(async {
                    for i in 1..=rounds {
                        // Every field derived from the same counter
                        let value = SensorSnapshot {
                            co2_ppm: i,
                            temperature: i as f32,
                            humidity: i as f32 / 2.0,
                            captured_at_ms: i as u64,
                        };
                        let _ = store.write(value.into(), Duration::from_secs(1)).await;
                    }
                });
            })
        };

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let mut last = 0u64;
            while last < rounds as u64 {
                let Ok(Snapshot::Sensor(read)) =
                    store.read_copy(Domain::Sensor, Duration::from_secs(1)).await
                else {
                    panic!("read failed");
                };
                assert_eq!(read.temperature, read.co2_ppm as f32);
                assert_eq!(read.humidity, read.co2_ppm as f32 / 2.0);
                assert_eq!(read.captured_at_ms, read.co2_ppm as u64);
                assert!(read.captured_at_ms >= last);
                last = read.captured_at_ms;
                tokio::task::yield_now().await;
            }
        });

        writer.join().unwrap();
    }
}
