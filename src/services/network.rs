//! Network link monitoring.
//!
//! Link bring-up belongs to the OS; this service only probes reachability
//! with a TCP connect and raises `NetworkReady` on the event bus whenever the
//! link comes up.

use crate::config::NetworkSettings;
use airboard_sync::{ReadinessEventBus, ReadyFlag, WaitMode};
use log::{debug, info, warn};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Poll interval once the link is known to be up.
const CONNECTED_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Whether `addr` accepts a TCP connection within `timeout`.
pub fn probe(addr: &str, timeout: Duration) -> bool {
    let addrs = match addr.to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            debug!("Cannot resolve probe address {}: {}", addr, e);
            return false;
        }
    };
    addrs
        .into_iter()
        .any(|socket| TcpStream::connect_timeout(&socket, timeout).is_ok())
}

/// Start the link monitor thread.
pub fn start_monitor(
    settings: NetworkSettings,
    bus: Arc<ReadinessEventBus>,
) -> std::io::Result<()> {
    info!("Starting network monitor (probe {})...", settings.probe_addr);

    thread::Builder::new()
        .name("network-monitor".to_string())
        .spawn(move || monitor_loop(settings, bus))?;
    Ok(())
}

fn monitor_loop(settings: NetworkSettings, bus: Arc<ReadinessEventBus>) {
    let timeout = Duration::from_millis(settings.probe_timeout_ms);
    let retry = Duration::from_millis(settings.retry_interval_ms);
    let mut connected = false;

    loop {
        let up = probe(&settings.probe_addr, timeout);
        if up && !connected {
            info!("Network link is up");
            bus.set(ReadyFlag::NetworkReady);
        } else if !up && connected {
            warn!("Network link lost");
        }
        connected = up;
        thread::sleep(if connected {
            CONNECTED_POLL_INTERVAL
        } else {
            retry
        });
    }
}

/// Startup gate: wait for the link, bounded by `gate_timeout`.
/// Returns whether the link came up in time.
pub async fn wait_for_link(bus: &ReadinessEventBus, gate_timeout: Duration) -> bool {
    let outcome = bus
        .wait(ReadyFlag::NetworkReady, WaitMode::All, gate_timeout, true)
        .await;
    if outcome.timed_out {
        warn!(
            "Network not ready after {:?}; starting producers anyway",
            gate_timeout
        );
    }
    outcome.is_ready()
}
