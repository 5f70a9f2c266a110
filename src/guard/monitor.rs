// =============================================================================
// Monitor Loop — drift-compensated polling over the decision pipeline
// =============================================================================
//
// Runs forever at a target cadence. Each cycle:
//   1. Touch the heartbeat, fetch a position snapshot.
//   2. On fetch failure: skip decisioning, PRESERVE trailing state. A bad
//      cycle must never be mistaken for a flat account.
//   3. On a confirmed-empty snapshot: clear all trailing state.
//   4. Otherwise: per non-blacklisted position, update the high-water mark,
//      classify the tier, and act on the close/hold verdict. A failure on
//      one symbol never blocks the rest.
//   5. Touch the heartbeat again, then sleep whatever is left of the
//      interval; if the cycle overran, skip the sleep and warn.
//
// The loop owns the TrailingStore outright. Collaborators come in through
// the three traits below so the cycle logic can be driven by in-memory
// fakes in tests.
// =============================================================================

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::config::SentinelConfig;
use crate::guard::decision::{decide, Decision};
use crate::guard::tier::classify;
use crate::guard::trailing::TrailingStore;
use crate::types::{Position, Side};
use crate::watchdog::Heartbeat;

/// Positions beyond this absolute profit get a status line every cycle.
const STATUS_LOG_THRESHOLD_PCT: f64 = 5.0;

// =============================================================================
// Collaborator seams
// =============================================================================

/// Supplies one snapshot of open positions per call.
///
/// `Err` means the cycle is degraded (network/API trouble) and the caller
/// must keep its state; `Ok(vec![])` means the account is confirmed flat.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn fetch_positions(&self) -> Result<Vec<Position>>;
}

/// Executes full-size reduce-only market closes.
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    async fn close_position(
        &self,
        symbol: &str,
        size: f64,
        side: Side,
        reason: &str,
    ) -> Result<serde_json::Value>;
}

/// Best-effort alert delivery. Implementations swallow their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}

// =============================================================================
// Cycle
// =============================================================================

/// What a single cycle did, for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Snapshot fetch failed; trailing state untouched.
    Degraded,
    /// Confirmed-empty snapshot; trailing state cleared.
    Flat,
    /// Snapshot processed.
    Evaluated { open: usize, closed: usize },
}

/// Run one monitoring cycle against the given collaborators.
pub async fn run_cycle(
    source: &dyn PositionSource,
    executor: &dyn OrderExecutor,
    notifier: &dyn Notifier,
    store: &mut TrailingStore,
    config: &SentinelConfig,
) -> CycleOutcome {
    let positions = match source.fetch_positions().await {
        Ok(positions) => positions,
        Err(e) => {
            warn!(
                error = %e,
                tracked = store.len(),
                "snapshot fetch failed — skipping this cycle, trailing state preserved"
            );
            return CycleOutcome::Degraded;
        }
    };

    if positions.is_empty() {
        store.reset_all();
        return CycleOutcome::Flat;
    }

    let mut seen: HashSet<String> = HashSet::with_capacity(positions.len());
    let mut closed = 0usize;

    for position in &positions {
        if config.blacklist.contains(&position.symbol) {
            debug!(symbol = %position.symbol, "blacklisted — skipped");
            continue;
        }
        seen.insert(position.symbol.clone());

        let peak = store.observe(&position.symbol, position.profit_pct);
        let tier = classify(peak, config);

        if position.profit_pct.abs() > STATUS_LOG_THRESHOLD_PCT {
            info!(
                symbol = %position.symbol,
                side = %position.side,
                profit = format!("{:.2}%", position.profit_pct),
                peak = format!("{:.2}%", peak),
                tier = %tier,
                "watching"
            );
        }

        match decide(position, peak, tier, config) {
            Decision::Hold => {}
            Decision::Close(reason) => {
                info!(
                    symbol = %position.symbol,
                    side = %position.side,
                    size = position.size,
                    peak = format!("{:.2}%", peak),
                    current = format!("{:.2}%", position.profit_pct),
                    reason = %reason,
                    "close triggered"
                );

                match executor
                    .close_position(&position.symbol, position.size, position.side, &reason)
                    .await
                {
                    Ok(_) => {
                        closed += 1;
                        store.evict(&position.symbol);
                        seen.remove(&position.symbol);
                        let msg =
                            format!("{} {} closed: {}", position.symbol, position.side, reason);
                        info!(symbol = %position.symbol, "position closed");
                        notifier.notify(&msg).await;
                    }
                    Err(e) => {
                        // State stays so the same decision fires again next
                        // cycle.
                        error!(
                            symbol = %position.symbol,
                            error = %e,
                            "close order failed — will retry next cycle"
                        );
                        notifier
                            .notify(&format!(
                                "close order FAILED for {} ({}): {}",
                                position.symbol, reason, e
                            ))
                            .await;
                    }
                }
            }
        }
    }

    // Entries for symbols that left the book without us closing them
    // (manual close, liquidation) must not outlive the position.
    store.retain_symbols(&seen);

    CycleOutcome::Evaluated {
        open: positions.len(),
        closed,
    }
}

// =============================================================================
// Loop
// =============================================================================

/// Run the monitor forever. Only external process termination (including
/// the watchdog's abort) ends it.
pub async fn run_monitor(
    source: Arc<dyn PositionSource>,
    executor: Arc<dyn OrderExecutor>,
    notifier: Arc<dyn Notifier>,
    config: SentinelConfig,
    heartbeat: Heartbeat,
) {
    let interval = Duration::from_secs(config.monitor_interval_secs);
    let mut store = TrailingStore::new();

    info!(
        interval_secs = config.monitor_interval_secs,
        blacklist = config.blacklist.len(),
        "position monitor started"
    );

    loop {
        heartbeat.touch();
        let started = Instant::now();

        let outcome = run_cycle(
            source.as_ref(),
            executor.as_ref(),
            notifier.as_ref(),
            &mut store,
            &config,
        )
        .await;

        heartbeat.touch();
        let elapsed = started.elapsed();
        debug!(
            ?outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            tracked = store.len(),
            "cycle complete"
        );

        if elapsed >= interval {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                interval_ms = interval.as_millis() as u64,
                "cycle overran the monitor interval — skipping sleep"
            );
        } else {
            tokio::time::sleep(interval - elapsed).await;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
