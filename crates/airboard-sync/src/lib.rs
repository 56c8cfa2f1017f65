//! airboard-sync - shared state and readiness signaling for the air board
//!
//! Features:
//! - One guarded slot per data domain, timeout-bounded reads and writes
//! - Typed readiness flags with bounded all/any waits and partial clear
//! - Periodic producer loop, one per domain
//! - Aggregator with a bootstrap gate and a steady-state dispatch loop

pub mod aggregator;
pub mod error;
pub mod producer;
pub mod readiness;
pub mod store;
pub mod types;

pub use aggregator::{Aggregator, AggregatorConfig, BootstrapStatus, Sink, StepReport};
pub use error::{AcquisitionError, StoreError};
pub use producer::{CycleOutcome, DataSource, Producer, ProducerConfig};
pub use readiness::{ReadinessEventBus, WaitMode, WaitOutcome};
pub use store::{DEFAULT_LOCK_TIMEOUT, DomainSlot, SharedStateStore};
pub use types::{
    Condition, Domain, ReadyFlag, ReadySet, SensorSnapshot, Snapshot, TimeSnapshot,
    WeatherSnapshot, monotonic_ms,
};
