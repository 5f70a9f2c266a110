// =============================================================================
// Liveness Watchdog — force-terminates the process when the monitor stalls
// =============================================================================
//
// The monitor loop touches a shared heartbeat at the start and end of every
// cycle. The watchdog runs on its own OS thread — deliberately not a tokio
// task, so it keeps ticking even if the async runtime itself is wedged —
// and polls that heartbeat on a short interval. Once the heartbeat is older
// than the configured timeout the process is aborted on the spot: no
// draining, no retries. An external supervisor owns the restart.
//
// The heartbeat is a single epoch-millis AtomicU64. Relaxed ordering is
// enough — nothing else is published through it.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{error, info};

/// How often the watchdog samples the heartbeat.
const WATCHDOG_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Current UNIX timestamp in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_millis() as u64
}

/// Shared liveness timestamp. Written only by the monitor loop, read only
/// by the watchdog thread.
#[derive(Clone)]
pub struct Heartbeat(Arc<AtomicU64>);

impl Heartbeat {
    /// Create a heartbeat seeded with the current time, so the watchdog
    /// grace period starts at spawn rather than at epoch.
    pub fn new() -> Self {
        Self(Arc::new(AtomicU64::new(now_millis())))
    }

    /// Record that the monitor loop is alive right now.
    pub fn touch(&self) {
        self.0.store(now_millis(), Ordering::Relaxed);
    }

    /// Millisecond timestamp of the last touch.
    pub fn last_millis(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a heartbeat last touched at `last_millis` counts as stalled at
/// `now`. Strictly-greater: a heartbeat exactly `timeout` old is still alive.
pub fn is_stalled(last_millis: u64, now: u64, timeout: Duration) -> bool {
    now.saturating_sub(last_millis) > timeout.as_millis() as u64
}

/// Spawn the watchdog thread. Never joins in normal operation.
pub fn spawn_watchdog(heartbeat: Heartbeat, timeout: Duration) -> std::thread::JoinHandle<()> {
    info!(
        timeout_secs = timeout.as_secs(),
        poll_secs = WATCHDOG_POLL_INTERVAL.as_secs(),
        "watchdog started"
    );

    std::thread::Builder::new()
        .name("sentinel-watchdog".to_string())
        .spawn(move || loop {
            std::thread::sleep(WATCHDOG_POLL_INTERVAL);

            let last = heartbeat.last_millis();
            let now = now_millis();
            if is_stalled(last, now, timeout) {
                error!(
                    last_beat_ms = last,
                    now_ms = now,
                    stale_ms = now.saturating_sub(last),
                    timeout_ms = timeout.as_millis() as u64,
                    "monitor heartbeat stalled — aborting process for supervisor restart"
                );
                std::process::abort();
            }
        })
        .expect("failed to spawn watchdog thread")
}

// =============================================================================
// Tests
// =============================================================================
