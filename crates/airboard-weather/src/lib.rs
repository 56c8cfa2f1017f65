//! airboard-weather - current-conditions client for the air board
//!
//! Features:
//! - Single reusable HTTP agent with a request timeout
//! - Lenient payload decoding with documented fallbacks
//! - Errors convert into the producer's acquisition error

pub mod client;
pub mod error;
pub mod payload;

pub use client::{DEFAULT_BASE_URL, WeatherClient, WeatherClientConfig};
pub use error::WeatherError;
pub use payload::parse_current;
