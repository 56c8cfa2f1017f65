//! weatherapi.com `current.json` payload decoding.
//!
//! Only `current.temp_c` and `current.humidity` are required. The rest fall
//! back: `feelslike_c` to the temperature, `wind_kph` to 0, and the
//! condition text to "Unknown".

use crate::error::WeatherError;
use airboard_sync::{Condition, WeatherSnapshot};
use serde_json::Value;

/// Decode a response body into a snapshot stamped with `updated_at_ms`.
pub fn parse_current(body: &str, updated_at_ms: u64) -> Result<WeatherSnapshot, WeatherError> {
    if body.trim().is_empty() {
        return Err(WeatherError::EmptyBody);
    }

    let root: Value = serde_json::from_str(body)?;
    let current = root
        .get("current")
        .ok_or_else(|| WeatherError::Payload("'current' object not found".into()))?;

    let (Some(temperature), Some(humidity)) = (number(current, "temp_c"), number(current, "humidity"))
    else {
        return Err(WeatherError::Payload("required fields missing".into()));
    };

    let feels_like = number(current, "feelslike_c").unwrap_or(temperature);
    let wind_speed = number(current, "wind_kph").unwrap_or(0.0);
    let condition = Condition::from(
        current
            .get("condition")
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str),
    );

    Ok(WeatherSnapshot {
        temperature: temperature as f32,
        feels_like: feels_like as f32,
        humidity: humidity as i32,
        condition,
        wind_speed: wind_speed as f32,
        updated_at_ms,
    })
}

#[inline]
fn number(object: &Value, key: &str) -> Option<f64> {
    object.get(key).and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "location": {"name": "Tokyo"},
        "current": {
            "temp_c": 21.4,
            "feelslike_c": 20.9,
            "humidity": 64,
            "wind_kph": 11.2,
            "condition": {"text": "Partly cloudy", "code": 1003}
        }
    }"#;

    #[test]
    fn test_parse_full_payload() {
        let snapshot = parse_current(FULL, 42).unwrap();
        assert_eq!(snapshot.temperature, 21.4);
        assert_eq!(snapshot.feels_like, 20.9);
        assert_eq!(snapshot.humidity, 64);
        assert_eq!(snapshot.wind_speed, 11.2);
        assert_eq!(snapshot.condition.as_str(), "Partly cloudy");
        assert_eq!(snapshot.updated_at_ms, 42);
    }

    #[test]
    fn test_optional_fields_fall_back() {
        let body = r#"{"current": {"temp_c": 5.5, "humidity": 80, "condition": {"code": 1}}}"#;
        let snapshot = parse_current(body, 0).unwrap();
        assert_eq!(snapshot.feels_like, 5.5);
        assert_eq!(snapshot.wind_speed, 0.0);
        assert_eq!(snapshot.condition.as_str(), "Unknown");
    }

    #[test]
    fn test_long_condition_is_bounded() {
        let text = "Moderate or heavy rain with thunder in area with occasional gusts and hail";
        let body = format!(
            r#"{{"current": {{"temp_c": 1, "humidity": 2, "condition": {{"text": "{}"}}}}}}"#,
            text
        );
        let snapshot = parse_current(&body, 0).unwrap();
        assert_eq!(snapshot.condition.as_str().len(), Condition::MAX_LEN);
        assert!(text.starts_with(snapshot.condition.as_str()));
    }

    #[test]
    fn test_missing_required_fields() {
        let body = r#"{"current": {"temp_c": 5.5}}"#;
        assert!(matches!(parse_current(body, 0), Err(WeatherError::Payload(_))));

        let body = r#"{"current": {"temp_c": "warm", "humidity": 10}}"#;
        assert!(matches!(parse_current(body, 0), Err(WeatherError::Payload(_))));

        let body = r#"{"error": {"code": 2006, "message": "API key is invalid."}}"#;
        assert!(matches!(parse_current(body, 0), Err(WeatherError::Payload(_))));
    }

    #[test]
    fn test_rejects_empty_and_malformed_bodies() {
        assert!(matches!(parse_current("", 0), Err(WeatherError::EmptyBody)));
        assert!(matches!(parse_current("{not json", 0), Err(WeatherError::Json(_))));
    }
}
