//! Wall-clock time service.
//!
//! Network time sync is handled by the OS. Until it has run, the clock of a
//! board without an RTC sits near the epoch, so a reading before
//! `SYNCED_SINCE_YEAR` is treated as not yet synchronized.

use crate::config::ClockSettings;
use airboard_sync::{AcquisitionError, DataSource, Domain, Snapshot, TimeSnapshot};
use chrono::{DateTime, Datelike, FixedOffset, Offset, TimeZone, Timelike, Utc};
use log::{info, warn};
use std::thread;
use std::time::Duration;

const SYNCED_SINCE_YEAR: i32 = 2024;

/// The clock has not been synchronized yet. Carries the local reading anyway.
#[derive(Clone, Debug, PartialEq)]
pub struct Unsynced {
    pub local: TimeSnapshot,
}

pub trait TimeSource: Send {
    fn now(&self) -> Result<TimeSnapshot, Unsynced>;
}

/// System clock in a fixed local offset.
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(utc_offset_minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| {
            warn!("Invalid UTC offset {} min, using UTC", utc_offset_minutes);
            Utc.fix()
        });
        Self { offset }
    }
}

impl TimeSource for SystemClock {
    fn now(&self) -> Result<TimeSnapshot, Unsynced> {
        classify(Utc::now().with_timezone(&self.offset))
    }
}

/// Split a local time into snapshot fields and decide whether it looks synced.
pub fn classify<Tz: TimeZone>(now: DateTime<Tz>) -> Result<TimeSnapshot, Unsynced> {
    let synced = now.year() >= SYNCED_SINCE_YEAR;
    let snapshot = TimeSnapshot {
        wall_clock: now.timestamp(),
        year: now.year(),
        month: now.month(),
        day: now.day(),
        hour: now.hour(),
        minute: now.minute(),
        second: now.second(),
        synced,
    };
    if synced {
        Ok(snapshot)
    } else {
        Err(Unsynced { local: snapshot })
    }
}

/// Producer-side adapter. Once synced, `synced` stays true for the run.
pub struct ClockSource<T: TimeSource> {
    source: T,
    settings: ClockSettings,
    synced: bool,
}

impl<T: TimeSource> ClockSource<T> {
    pub fn new(source: T, settings: ClockSettings) -> Self {
        Self {
            source,
            settings,
            synced: false,
        }
    }
}

impl<T: TimeSource> DataSource for ClockSource<T> {
    fn domain(&self) -> Domain {
        Domain::Time
    }

    /// Give time sync a bounded head start. Never fails.
    fn setup(&mut self) -> Result<(), AcquisitionError> {
        let retries = self.settings.sync_retries;
        for attempt in 1..=retries {
            if self.source.now().is_ok() {
                return Ok(());
            }
            info!("Waiting for system time to be set... ({}/{})", attempt, retries);
            thread::sleep(Duration::from_millis(self.settings.sync_retry_interval_ms));
        }
        if self.source.now().is_err() {
            warn!("System time still not synchronized, continuing");
        }
        Ok(())
    }

    fn acquire(&mut self) -> Result<Snapshot, AcquisitionError> {
        let mut snapshot = match self.source.now() {
            Ok(snapshot) => {
                if !self.synced {
                    info!("Time synchronized!");
                }
                self.synced = true;
                snapshot
            }
            Err(Unsynced { local }) if self.synced || self.settings.publish_unsynced => local,
            Err(_) => return Err(AcquisitionError::Unsynced),
        };
        snapshot.synced = self.synced;
        Ok(snapshot.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct FakeClock {
        readings: Mutex<VecDeque<DateTime<FixedOffset>>>,
    }

    impl FakeClock {
        fn new(readings: &[&str]) -> Self {
            let readings = readings
                .iter()
                .map(|r| DateTime::parse_from_rfc3339(r).unwrap())
                .collect();
            Self {
                readings: Mutex::new(readings),
            }
        }
    }

    impl TimeSource for FakeClock {
        fn now(&self) -> Result<TimeSnapshot, Unsynced> {
            let mut readings = self.readings.lock().unwrap();
            let next = if readings.len() > 1 {
                readings.pop_front().unwrap()
            } else {
                *readings.front().unwrap()
            };
            classify(next)
        }
    }

    fn settings(publish_unsynced: bool) -> ClockSettings {
        ClockSettings {
            sync_retries: 0,
            publish_unsynced,
            ..ClockSettings::default()
        }
    }

    fn time(snapshot: Snapshot) -> TimeSnapshot {
        match snapshot {
            Snapshot::Time(t) => t,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_fields() {
        let now = DateTime::parse_from_rfc3339("2025-03-14T09:26:53+09:00").unwrap();
        let snapshot = classify(now).unwrap();
        assert_eq!(
            (snapshot.year, snapshot.month, snapshot.day),
            (2025, 3, 14)
        );
        assert_eq!(
            (snapshot.hour, snapshot.minute, snapshot.second),
            (9, 26, 53)
        );
        assert_eq!(snapshot.wall_clock, now.timestamp());
        assert!(snapshot.synced);
    }

    #[test]
    fn test_epoch_clock_is_unsynced() {
        let boot = DateTime::parse_from_rfc3339("1970-01-01T09:00:12+09:00").unwrap();
        let err = classify(boot).unwrap_err();
        assert!(!err.local.synced);
        assert_eq!(err.local.second, 12);
    }

    #[test]
    fn test_synced_is_sticky() {
        let clock = FakeClock::new(&[
            "1970-01-01T09:00:00+09:00",
            "2025-01-01T00:00:00+09:00",
            "1970-01-01T09:00:30+09:00",
        ]);
        let mut source = ClockSource::new(clock, settings(true));

        assert!(!time(source.acquire().unwrap()).synced);
        assert!(time(source.acquire().unwrap()).synced);
        // Clock reads implausible again, flag does not revert
        assert!(time(source.acquire().unwrap()).synced);
    }

    #[test]
    fn test_unsynced_skips_when_not_published() {
        let clock = FakeClock::new(&["1970-01-01T09:00:00+09:00"]);
        let mut source = ClockSource::new(clock, settings(false));
        assert_eq!(source.acquire(), Err(AcquisitionError::Unsynced));
    }

    #[test]
    fn test_setup_never_fails() {
        let clock = FakeClock::new(&["1970-01-01T09:00:00+09:00"]);
        let mut source = ClockSource::new(
            clock,
            ClockSettings {
                sync_retries: 2,
                sync_retry_interval_ms: 1,
                ..ClockSettings::default()
            },
        );
        assert!(source.setup().is_ok());
    }

    #[test]
    fn test_system_clock_uses_offset() {
        let clock = SystemClock::new(540);
        let snapshot = match clock.now() {
            Ok(s) => s,
            Err(Unsynced { local }) => local,
        };
        assert!(snapshot.hour < 24);
        assert!((1..=12).contains(&snapshot.month));
    }
}
