// =============================================================================
// Perp Sentinel — Main Entry Point
// =============================================================================
//
// Unattended trailing-stop guard for a Hyperliquid perpetuals account.
// Watches open positions at a fixed cadence, ratchets a per-symbol profit
// high-water mark, and flattens any position that retraces past its tier's
// trigger or breaches the hard stop-loss floor. A watchdog thread aborts
// the whole process if the monitor loop ever stops heartbeating; the
// supervisor (systemd, docker, etc.) is expected to restart it.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod alert;
mod config;
mod guard;
mod hyperliquid;
mod types;
mod watchdog;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::alert::WebhookNotifier;
use crate::config::SentinelConfig;
use crate::guard::monitor::run_monitor;
use crate::hyperliquid::{ExchangeClient, InfoClient};
use crate::watchdog::{spawn_watchdog, Heartbeat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║            Perp Sentinel — Starting Up                  ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("SENTINEL_CONFIG").unwrap_or_else(|_| "sentinel_config.json".into());
    let mut config = SentinelConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        SentinelConfig::default()
    });
    config.apply_env();
    config.validate().context("invalid configuration")?;

    info!(
        api_url = %config.api_url,
        leverage = config.leverage,
        hard_stop = config.hard_stop_loss_pct,
        tiers = format!(
            "{} / {} / {}",
            config.low_profit_threshold,
            config.tier1_profit_threshold,
            config.tier2_profit_threshold
        ),
        interval_secs = config.monitor_interval_secs,
        blacklist = config.blacklist.len(),
        "configuration validated"
    );

    // ── 2. Exchange clients ──────────────────────────────────────────────
    let private_key = std::env::var("HYPERLIQUID_PRIVATE_KEY")
        .context("missing HYPERLIQUID_PRIVATE_KEY env var")?;

    let info_client = InfoClient::new(&config)?;
    let exchange = ExchangeClient::connect(&config, &private_key, info_client.clone())
        .await
        .context("failed to connect to the exchange")?;

    // ── 3. Alerting ──────────────────────────────────────────────────────
    let notifier = WebhookNotifier::new(
        config.webhook_url.clone(),
        Duration::from_secs(config.http_timeout_secs),
    );
    if config.webhook_url.is_none() {
        warn!("no webhook configured — close alerts will only reach the log");
    }

    // ── 4. Liveness watchdog ─────────────────────────────────────────────
    let heartbeat = Heartbeat::new();
    spawn_watchdog(
        heartbeat.clone(),
        Duration::from_secs(config.watchdog_timeout_secs),
    );

    // ── 5. Monitor loop (runs forever) ───────────────────────────────────
    run_monitor(
        Arc::new(info_client),
        Arc::new(exchange),
        Arc::new(notifier),
        config,
        heartbeat,
    )
    .await;

    unreachable!("monitor loop never returns");
}
