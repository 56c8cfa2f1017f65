//! Periodic producer loop shared by every domain.
//!
//! A producer owns one data source. After a one-time setup it repeatedly
//! acquires a reading, writes it into its own store slot and raises its own
//! readiness flag. Failures of any kind skip the cycle: nothing is written
//! and no flag is raised, and the next attempt happens one period later.

use crate::error::{AcquisitionError, StoreError};
use crate::readiness::ReadinessEventBus;
use crate::store::{DEFAULT_LOCK_TIMEOUT, SharedStateStore};
use crate::types::{Domain, Snapshot};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// External collaborator feeding one domain.
pub trait DataSource: Send {
    /// Domain this source publishes into.
    fn domain(&self) -> Domain;

    /// One-time initialization (bus setup, measurement start, ...).
    fn setup(&mut self) -> Result<(), AcquisitionError> {
        Ok(())
    }

    /// Take one reading. The returned snapshot must belong to `domain()`.
    fn acquire(&mut self) -> Result<Snapshot, AcquisitionError>;
}

#[derive(Clone, Debug)]
pub struct ProducerConfig {
    /// Sleep between cycles
    pub period: Duration,
    /// Delay between setup and the first reading
    pub warm_up: Duration,
    pub lock_timeout: Duration,
}

impl ProducerConfig {
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            warm_up: Duration::ZERO,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn warm_up(mut self, warm_up: Duration) -> Self {
        self.warm_up = warm_up;
        self
    }

    pub fn lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

/// What happened in one producer cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Published,
    SourceFailed(AcquisitionError),
    LockTimedOut(StoreError),
}

pub struct Producer<S: DataSource> {
    source: S,
    store: Arc<SharedStateStore>,
    bus: Arc<ReadinessEventBus>,
    config: ProducerConfig,
}

impl<S: DataSource> Producer<S> {
    pub fn new(
        source: S,
        store: Arc<SharedStateStore>,
        bus: Arc<ReadinessEventBus>,
        config: ProducerConfig,
    ) -> Self {
        Self {
            source,
            store,
            bus,
            config,
        }
    }

    pub fn domain(&self) -> Domain {
        self.source.domain()
    }

    /// Run setup, then cycle forever.
    pub async fn run(mut self) {
        self.init().await;
        loop {
            self.run_cycle().await;
            sleep(self.config.period).await;
        }
    }

    /// Setup until it succeeds, then wait out the warm-up delay.
    pub async fn init(&mut self) {
        let domain = self.domain();
        loop {
            match self.source.setup() {
                Ok(()) => break,
                Err(e) => {
                    warn!("{} producer setup failed: {}. Retrying in {:?}", domain, e, self.config.period);
                    sleep(self.config.period).await;
                }
            }
        }
        info!("{} producer initialized", domain);
        if !self.config.warm_up.is_zero() {
            debug!("{} producer warming up for {:?}", domain, self.config.warm_up);
            sleep(self.config.warm_up).await;
        }
    }

    /// Acquire, write and signal once.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let domain = self.domain();

        let snapshot = match self.source.acquire() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to read {} data: {}", domain, e);
                return CycleOutcome::SourceFailed(e);
            }
        };

        if snapshot.domain() != domain {
            let e = AcquisitionError::Driver(format!(
                "source returned a {} snapshot",
                snapshot.domain()
            ));
            warn!("Discarding {} reading: {}", domain, e);
            return CycleOutcome::SourceFailed(e);
        }

        if let Err(e) = self.store.write(snapshot, self.config.lock_timeout).await {
            warn!("Skipping {} update: {}", domain, e);
            return CycleOutcome::LockTimedOut(e);
        }

        self.bus.set(domain.flag());
        debug!("{} snapshot published", domain);
        CycleOutcome::Published
    }
}
