//! airboard - ambient sensor, clock and weather board
//!
//! One thread per data producer plus the aggregator on the main thread,
//! talking only through the shared store and the readiness bus.

mod config;
mod panels;
mod services;

use airboard_sync::{Aggregator, ReadinessEventBus, SharedStateStore};
use config::AppConfig;
use log::info;
use panels::TextDisplay;
use services::network;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting airboard...");

    let config = AppConfig::load(std::env::args().nth(1).map(PathBuf::from));

    let store = Arc::new(SharedStateStore::new());
    let bus = Arc::new(ReadinessEventBus::new());

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    // Time and weather need the link; wait for it, but not forever
    network::start_monitor(config.network.clone(), bus.clone())?;
    let gate = Duration::from_millis(config.network.gate_timeout_ms);
    if rt.block_on(network::wait_for_link(&bus, gate)) {
        info!("Network ready");
    }

    services::start_all(&config, store.clone(), bus.clone())?;

    let display = TextDisplay::new(std::io::stdout());
    let aggregator = Aggregator::new(store, bus, display, config.aggregator());

    info!("airboard running.");
    rt.block_on(aggregator.run());

    Ok(())
}
