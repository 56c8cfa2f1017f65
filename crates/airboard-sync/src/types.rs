//! Core types for airboard-sync

use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

/// One independent unit of data with its own lock and readiness flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    Sensor,
    Time,
    Weather,
}

impl Domain {
    /// Fixed dispatch order used by the aggregator.
    pub const ALL: [Domain; 3] = [Domain::Sensor, Domain::Time, Domain::Weather];

    /// Readiness flag raised when this domain publishes.
    #[inline]
    pub fn flag(self) -> ReadyFlag {
        match self {
            Domain::Sensor => ReadyFlag::SensorReady,
            Domain::Time => ReadyFlag::TimeReady,
            Domain::Weather => ReadyFlag::WeatherReady,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Sensor => "sensor",
            Domain::Time => "time",
            Domain::Weather => "weather",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named readiness bits on the event bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReadyFlag {
    SensorReady,
    TimeReady,
    WeatherReady,
    NetworkReady,
}

impl ReadyFlag {
    #[inline]
    const fn bit(self) -> u8 {
        match self {
            ReadyFlag::SensorReady => 1 << 0,
            ReadyFlag::TimeReady => 1 << 1,
            ReadyFlag::WeatherReady => 1 << 2,
            ReadyFlag::NetworkReady => 1 << 3,
        }
    }
}

const ALL_FLAGS: [ReadyFlag; 4] = [
    ReadyFlag::SensorReady,
    ReadyFlag::TimeReady,
    ReadyFlag::WeatherReady,
    ReadyFlag::NetworkReady,
];

/// A set of readiness flags.
///
/// Used both as the wait mask and as the set of bits a wait observed, so
/// "observed is a subset of mask" is expressed with the same type.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReadySet(u8);

impl ReadySet {
    pub const EMPTY: ReadySet = ReadySet(0);
    /// Sensor, time and weather. Excludes `NetworkReady`.
    pub const ALL_DOMAINS: ReadySet = ReadySet(
        ReadyFlag::SensorReady.bit() | ReadyFlag::TimeReady.bit() | ReadyFlag::WeatherReady.bit(),
    );

    pub fn of(flags: &[ReadyFlag]) -> Self {
        flags.iter().fold(Self::EMPTY, |set, flag| set.with(*flag))
    }

    #[inline]
    pub fn with(self, flag: ReadyFlag) -> Self {
        ReadySet(self.0 | flag.bit())
    }

    #[inline]
    pub fn insert(&mut self, flag: ReadyFlag) {
        self.0 |= flag.bit();
    }

    /// Removes every flag in `other`.
    #[inline]
    pub fn remove_all(&mut self, other: ReadySet) {
        self.0 &= !other.0;
    }

    #[inline]
    pub fn contains(self, flag: ReadyFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn intersection(self, other: ReadySet) -> ReadySet {
        ReadySet(self.0 & other.0)
    }

    #[inline]
    pub fn is_superset(self, other: ReadySet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn iter(self) -> impl Iterator<Item = ReadyFlag> {
        ALL_FLAGS.into_iter().filter(move |flag| self.contains(*flag))
    }

    /// Domains whose flags are in this set, in dispatch order.
    pub fn domains(self) -> impl Iterator<Item = Domain> {
        Domain::ALL
            .into_iter()
            .filter(move |domain| self.contains(domain.flag()))
    }
}

impl From<ReadyFlag> for ReadySet {
    fn from(flag: ReadyFlag) -> Self {
        ReadySet::EMPTY.with(flag)
    }
}

impl fmt::Debug for ReadySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Latest ambient sensor measurement.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SensorSnapshot {
    pub co2_ppm: u16,
    /// Degrees Celsius
    pub temperature: f32,
    /// Relative humidity, percent
    pub humidity: f32,
    /// Monotonic milliseconds since process start
    pub captured_at_ms: u64,
}

/// Latest wall-clock reading.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeSnapshot {
    /// Unix seconds
    pub wall_clock: i64,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub synced: bool,
}

/// Latest weather report.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeatherSnapshot {
    /// Degrees Celsius
    pub temperature: f32,
    /// Degrees Celsius
    pub feels_like: f32,
    /// Percent
    pub humidity: i32,
    pub condition: Condition,
    /// km/h
    pub wind_speed: f32,
    /// Monotonic milliseconds since process start
    pub updated_at_ms: u64,
}

/// Weather condition text, at most [`Condition::MAX_LEN`] bytes.
///
/// Always holds a valid string: empty input becomes [`Condition::UNKNOWN`]
/// and long input is cut on a char boundary.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Condition(String);

impl Condition {
    pub const MAX_LEN: usize = 63;
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn new(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::unknown();
        }
        let mut end = text.len().min(Self::MAX_LEN);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        Condition(text[..end].to_string())
    }

    pub fn unknown() -> Self {
        Condition(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::unknown()
    }
}

impl From<Option<&str>> for Condition {
    fn from(text: Option<&str>) -> Self {
        text.map(Condition::new).unwrap_or_default()
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A whole snapshot of one domain.
#[derive(Clone, Debug, PartialEq)]
pub enum Snapshot {
    Sensor(SensorSnapshot),
    Time(TimeSnapshot),
    Weather(WeatherSnapshot),
}

impl Snapshot {
    #[inline]
    pub fn domain(&self) -> Domain {
        match self {
            Snapshot::Sensor(_) => Domain::Sensor,
            Snapshot::Time(_) => Domain::Time,
            Snapshot::Weather(_) => Domain::Weather,
        }
    }
}

impl From<SensorSnapshot> for Snapshot {
    fn from(value: SensorSnapshot) -> Self {
        Snapshot::Sensor(value)
    }
}

impl From<TimeSnapshot> for Snapshot {
    fn from(value: TimeSnapshot) -> Self {
        Snapshot::Time(value)
    }
}

impl From<WeatherSnapshot> for Snapshot {
    fn from(value: WeatherSnapshot) -> Self {
        Snapshot::Weather(value)
    }
}

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// Monotonic milliseconds since the first call in this process.
pub fn monotonic_ms() -> u64 {
    PROCESS_START.get_or_init(Instant::now).elapsed().as_millis() as u64
}
