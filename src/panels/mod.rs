//! Display panels fed by the aggregator.

pub mod display;

pub use display::TextDisplay;
