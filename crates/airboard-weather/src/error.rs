//! Error types for airboard-weather

use airboard_sync::AcquisitionError;

/// Weather client errors. The producer treats all of them the same way.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("empty response body")]
    EmptyBody,

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<WeatherError> for AcquisitionError {
    fn from(e: WeatherError) -> Self {
        AcquisitionError::Http(e.to_string())
    }
}
