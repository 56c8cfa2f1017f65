//! Text display panel.
//!
//! Keeps the latest formatted labels per domain and redraws the whole board
//! on every render. Output errors are logged and otherwise ignored.

use airboard_sync::{
    BootstrapStatus, Domain, SensorSnapshot, Sink, Snapshot, TimeSnapshot, WeatherSnapshot,
};
use chrono::NaiveDate;
use log::{debug, warn};
use std::io::Write;

/// CO2 level above which the reading is flagged.
pub const CO2_HIGH_PPM: u16 = 1000;

const PLACEHOLDER: &str = "--";

/// Formatted labels, as the panel would show them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoardLabels {
    pub co2: Option<String>,
    pub co2_high: bool,
    pub temperature: Option<String>,
    pub humidity: Option<String>,
    pub time: Option<String>,
    pub date: Option<String>,
    pub time_synced: bool,
    pub weather: Option<String>,
}

impl BoardLabels {
    pub fn apply(&mut self, snapshot: &Snapshot) {
        match snapshot {
            Snapshot::Sensor(s) => self.apply_sensor(s),
            Snapshot::Time(t) => self.apply_time(t),
            Snapshot::Weather(w) => self.apply_weather(w),
        }
    }

    fn apply_sensor(&mut self, sensor: &SensorSnapshot) {
        self.co2 = Some(sensor.co2_ppm.to_string());
        self.co2_high = sensor.co2_ppm > CO2_HIGH_PPM;
        self.temperature = Some(format!("{:.1}", sensor.temperature));
        self.humidity = Some(format!("{:.1}", sensor.humidity));
    }

    fn apply_time(&mut self, time: &TimeSnapshot) {
        let datetime = NaiveDate::from_ymd_opt(time.year, time.month, time.day)
            .and_then(|date| date.and_hms_opt(time.hour, time.minute, time.second));
        match datetime {
            Some(dt) => {
                self.time = Some(dt.format("%I:%M %p").to_string());
                self.date = Some(dt.format("%Y/%m/%d").to_string());
                self.time_synced = time.synced;
            }
            None => debug!("Ignoring invalid time snapshot {:?}", time),
        }
    }

    fn apply_weather(&mut self, weather: &WeatherSnapshot) {
        self.weather = Some(format!(
            "{:.1}°C (feels {:.1}°C) {}, {}%, {:.1} km/h",
            weather.temperature,
            weather.feels_like,
            weather.condition,
            weather.humidity,
            weather.wind_speed
        ));
    }

    /// Render the board as text lines.
    pub fn lines(&self) -> Vec<String> {
        let label = |value: &Option<String>| value.clone().unwrap_or_else(|| PLACEHOLDER.to_string());
        let co2_marker = if self.co2_high { " !" } else { "" };
        let sync_marker = if self.time_synced { "" } else { " *" };
        vec![
            format!("{} {}{}", label(&self.time), label(&self.date), sync_marker),
            format!("CO2  {} ppm{}", label(&self.co2), co2_marker),
            format!("Temp {} °C", label(&self.temperature)),
            format!("Hum  {} %", label(&self.humidity)),
            format!("Out  {}", label(&self.weather)),
        ]
    }
}

/// Sink drawing the board to any writer (stdout in production).
pub struct TextDisplay<W: Write + Send> {
    out: W,
    labels: BoardLabels,
}

impl<W: Write + Send> TextDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            labels: BoardLabels::default(),
        }
    }

    pub fn labels(&self) -> &BoardLabels {
        &self.labels
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    fn draw(&mut self, lines: &[String]) {
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(self.out, "{}", line))
            .and_then(|_| writeln!(self.out))
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!("Display write failed: {}", e);
        }
    }
}

impl<W: Write + Send> Sink for TextDisplay<W> {
    fn render(&mut self, snapshot: &Snapshot) {
        self.labels.apply(snapshot);
        let lines = self.labels.lines();
        self.draw(&lines);
    }

    fn readiness(&mut self, status: &BootstrapStatus) {
        let line = if status.ready {
            "Starting... all sources ready".to_string()
        } else {
            let missing: Vec<&str> = status.missing().into_iter().map(Domain::as_str).collect();
            format!("Starting... waiting for {}", missing.join(", "))
        };
        self.draw(&[line]);
    }
}
