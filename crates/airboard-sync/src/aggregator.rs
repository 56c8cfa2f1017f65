//! The single consumer: waits on the readiness bus and feeds the sink.
//!
//! Two phases, in order:
//! - bootstrap: poll until every domain has published at least once
//! - steady state: wake on any domain, copy its snapshot out and render it

use crate::readiness::{ReadinessEventBus, WaitMode};
use crate::store::{DEFAULT_LOCK_TIMEOUT, SharedStateStore};
use crate::types::{Domain, ReadySet, Snapshot};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Rendering side of the aggregator. Calls are one-way.
pub trait Sink: Send {
    fn render(&mut self, snapshot: &Snapshot);

    /// Bootstrap progress, reported on every bootstrap wake.
    fn readiness(&mut self, _status: &BootstrapStatus) {}
}

/// One bootstrap poll result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapStatus {
    /// 1-based poll counter
    pub attempt: u64,
    pub observed: ReadySet,
    pub ready: bool,
}

impl BootstrapStatus {
    /// Domains that have not published yet.
    pub fn missing(&self) -> Vec<Domain> {
        Domain::ALL
            .into_iter()
            .filter(|domain| !self.observed.contains(domain.flag()))
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    pub bootstrap_timeout: Duration,
    pub steady_timeout: Duration,
    pub lock_timeout: Duration,
    /// Per-domain delay after dispatch before the next wait.
    pub settle: HashMap<Domain, Duration>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            bootstrap_timeout: Duration::from_secs(5),
            steady_timeout: Duration::from_secs(30),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            settle: HashMap::from([(Domain::Weather, Duration::from_millis(500))]),
        }
    }
}

/// Result of one steady-state iteration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub dispatched: Vec<Domain>,
    /// Observed but not readable within the lock timeout
    pub skipped: Vec<Domain>,
    pub timed_out: bool,
}

pub struct Aggregator<K: Sink> {
    store: Arc<SharedStateStore>,
    bus: Arc<ReadinessEventBus>,
    sink: K,
    config: AggregatorConfig,
}

impl<K: Sink> Aggregator<K> {
    pub fn new(
        store: Arc<SharedStateStore>,
        bus: Arc<ReadinessEventBus>,
        sink: K,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            store,
            bus,
            sink,
            config,
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Bootstrap, then step forever.
    pub async fn run(mut self) {
        self.bootstrap().await;
        loop {
            self.step().await;
        }
    }

    /// Hold until every domain has published once. No retry bound.
    pub async fn bootstrap(&mut self) -> BootstrapStatus {
        let mut attempt = 0u64;
        loop {
            attempt += 1;
            let outcome = self
                .bus
                .wait(
                    ReadySet::ALL_DOMAINS,
                    WaitMode::All,
                    self.config.bootstrap_timeout,
                    false,
                )
                .await;

            let status = BootstrapStatus {
                attempt,
                observed: outcome.observed,
                ready: outcome.is_ready(),
            };
            self.sink.readiness(&status);

            if status.ready {
                // Clear before copying: a publish racing the copy stays
                // flagged for the next step.
                self.bus.clear(ReadySet::ALL_DOMAINS);
                info!("All domains ready after {} poll(s)", attempt);
                let mut report = StepReport::default();
                self.dispatch(ReadySet::ALL_DOMAINS, &mut report).await;
                return status;
            }
            info!(
                "Waiting for domains (poll {}): ready={:?}, missing={:?}",
                attempt,
                status.observed,
                status.missing()
            );
        }
    }

    /// One steady-state wake: dispatch every observed domain exactly once.
    pub async fn step(&mut self) -> StepReport {
        let outcome = self
            .bus
            .wait(
                ReadySet::ALL_DOMAINS,
                WaitMode::Any,
                self.config.steady_timeout,
                true,
            )
            .await;

        let mut report = StepReport {
            timed_out: outcome.timed_out,
            ..StepReport::default()
        };
        if outcome.timed_out {
            debug!("No domain published within {:?}", self.config.steady_timeout);
            return report;
        }

        self.dispatch(outcome.observed, &mut report).await;
        self.settle(&report.dispatched).await;
        report
    }

    /// Copy out and render each domain in `observed`, in fixed order.
    async fn dispatch(&mut self, observed: ReadySet, report: &mut StepReport) {
        for domain in observed.domains() {
            match self.store.read_copy(domain, self.config.lock_timeout).await {
                Ok(snapshot) => {
                    debug!("Dispatching {} snapshot", domain);
                    self.sink.render(&snapshot);
                    report.dispatched.push(domain);
                }
                Err(e) => {
                    warn!("Skipping {} dispatch: {}", domain, e);
                    report.skipped.push(domain);
                }
            }
        }
    }

    /// Settle hooks run after the whole wake was dispatched, so a slow
    /// domain never delays the others. The wake already consumed the flags;
    /// a publish landing during the delay stays set for the next step.
    async fn settle(&self, dispatched: &[Domain]) {
        let delay = dispatched
            .iter()
            .filter_map(|domain| self.config.settle.get(domain))
            .max()
            .copied()
            .unwrap_or(Duration::ZERO);
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}
