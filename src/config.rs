// =============================================================================
// Sentinel Configuration — tier thresholds, retracements, and loop timing
// =============================================================================
//
// Loaded once at startup from a JSON file. Every field carries a
// `#[serde(default)]` so that adding new fields never breaks loading an
// older config file. Secrets (wallet address, private key) come from the
// environment, never from this file.
//
// `validate()` must pass before any subsystem spawns: the tier thresholds
// are meaningless unless strictly increasing, and the watchdog timeout must
// sit well above the worst network round-trip or the process would abort
// itself on every slow cycle.
// =============================================================================

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_api_url() -> String {
    "https://api.hyperliquid.xyz".to_string()
}

fn default_leverage() -> f64 {
    10.0
}

fn default_hard_stop_loss_pct() -> f64 {
    10.0
}

fn default_low_retracement() -> f64 {
    0.5
}

fn default_tier1_retracement() -> f64 {
    0.3
}

fn default_tier2_retracement() -> f64 {
    0.15
}

fn default_low_profit_threshold() -> f64 {
    5.0
}

fn default_tier1_profit_threshold() -> f64 {
    15.0
}

fn default_tier2_profit_threshold() -> f64 {
    30.0
}

fn default_monitor_interval_secs() -> u64 {
    4
}

fn default_watchdog_timeout_secs() -> u64 {
    60
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_close_slippage() -> f64 {
    0.02
}

// =============================================================================
// SentinelConfig
// =============================================================================

/// Full sentinel configuration.
///
/// The tier ladder works on return-on-margin percentages: once a position's
/// high-water mark crosses `low_profit_threshold` it enters low protection,
/// then `tier1_profit_threshold` and `tier2_profit_threshold` in turn. Each
/// tier gives back at most its retracement fraction of the peak before the
/// position is closed, so retracements are expected to shrink tier by tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Hyperliquid REST base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Account wallet address (0x...). Overridable via env.
    #[serde(default)]
    pub wallet_address: String,

    /// Optional webhook URL for close/failure alerts.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Account-wide leverage used to estimate margin per position. The
    /// exchange is never asked for per-symbol leverage, so mixed-leverage
    /// accounts will see a skewed profit percentage on the odd symbols.
    #[serde(default = "default_leverage")]
    pub leverage: f64,

    /// Unconditional loss floor in percent (positive number; a position at
    /// or below `-hard_stop_loss_pct` is closed regardless of tier).
    #[serde(default = "default_hard_stop_loss_pct")]
    pub hard_stop_loss_pct: f64,

    /// Retracement fraction allowed in the low-protection tier.
    #[serde(default = "default_low_retracement")]
    pub low_retracement: f64,

    /// Retracement fraction allowed in tier 1.
    #[serde(default = "default_tier1_retracement")]
    pub tier1_retracement: f64,

    /// Retracement fraction allowed in tier 2.
    #[serde(default = "default_tier2_retracement")]
    pub tier2_retracement: f64,

    /// Peak profit (percent) at which low protection engages.
    #[serde(default = "default_low_profit_threshold")]
    pub low_profit_threshold: f64,

    /// Peak profit (percent) at which tier 1 engages.
    #[serde(default = "default_tier1_profit_threshold")]
    pub tier1_profit_threshold: f64,

    /// Peak profit (percent) at which tier 2 engages.
    #[serde(default = "default_tier2_profit_threshold")]
    pub tier2_profit_threshold: f64,

    /// Symbols the sentinel must never touch.
    #[serde(default)]
    pub blacklist: HashSet<String>,

    /// Target monitoring cadence in seconds.
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,

    /// Heartbeat staleness beyond which the watchdog aborts the process.
    #[serde(default = "default_watchdog_timeout_secs")]
    pub watchdog_timeout_secs: u64,

    /// Per-request HTTP timeout. Must stay below the watchdog timeout so a
    /// hung call surfaces as a fetch error before the watchdog fires.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Slippage tolerance applied to close orders (fraction of mark price).
    #[serde(default = "default_close_slippage")]
    pub close_slippage: f64,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        serde_json::from_str("{}").expect("default config deserializes from empty object")
    }
}

impl SentinelConfig {
    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Apply environment overrides for secrets and the webhook.
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("HYPERLIQUID_WALLET_ADDRESS") {
            if !addr.trim().is_empty() {
                self.wallet_address = addr.trim().to_string();
            }
        }
        if let Ok(url) = std::env::var("SENTINEL_WEBHOOK_URL") {
            if !url.trim().is_empty() {
                self.webhook_url = Some(url.trim().to_string());
            }
        }
    }

    /// Validate cross-field invariants. Called once at startup; the process
    /// must not run with a config that fails here.
    pub fn validate(&self) -> Result<()> {
        if !(self.low_profit_threshold < self.tier1_profit_threshold
            && self.tier1_profit_threshold < self.tier2_profit_threshold)
        {
            bail!(
                "tier thresholds must be strictly increasing: low={} tier1={} tier2={}",
                self.low_profit_threshold,
                self.tier1_profit_threshold,
                self.tier2_profit_threshold
            );
        }

        for (name, r) in [
            ("low_retracement", self.low_retracement),
            ("tier1_retracement", self.tier1_retracement),
            ("tier2_retracement", self.tier2_retracement),
        ] {
            if !(r > 0.0 && r < 1.0) {
                bail!("{name} must be in (0, 1), got {r}");
            }
        }
        if self.low_retracement <= self.tier1_retracement
            || self.tier1_retracement <= self.tier2_retracement
        {
            // Not fatal, but the trailing stop loosens as profit grows,
            // which inverts the intended ratchet.
            warn!(
                low = self.low_retracement,
                tier1 = self.tier1_retracement,
                tier2 = self.tier2_retracement,
                "retracements do not tighten tier by tier"
            );
        }

        if self.leverage <= 0.0 {
            bail!("leverage must be positive, got {}", self.leverage);
        }
        if self.hard_stop_loss_pct <= 0.0 {
            bail!(
                "hard_stop_loss_pct must be positive, got {}",
                self.hard_stop_loss_pct
            );
        }
        if self.monitor_interval_secs == 0 {
            bail!("monitor_interval_secs must be positive");
        }
        if !(self.close_slippage > 0.0 && self.close_slippage < 1.0) {
            bail!("close_slippage must be in (0, 1), got {}", self.close_slippage);
        }

        // The watchdog exists to catch a stalled scheduler, not to race a
        // single slow-but-bounded cycle.
        let cycle_ceiling = self.monitor_interval_secs + 2 * self.http_timeout_secs;
        if self.watchdog_timeout_secs <= cycle_ceiling {
            bail!(
                "watchdog_timeout_secs ({}) must exceed monitor_interval_secs + 2 * http_timeout_secs ({})",
                self.watchdog_timeout_secs,
                cycle_ceiling
            );
        }

        if self.wallet_address.trim().is_empty() {
            bail!("wallet_address is required (config file or HYPERLIQUID_WALLET_ADDRESS)");
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SentinelConfig {
        let mut config = SentinelConfig::default();
        config.wallet_address = "0xabc".to_string();
        config
    }

    #[test]
    fn defaults_load_from_empty_object() {
        let config: SentinelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.leverage, 10.0);
        assert_eq!(config.monitor_interval_secs, 4);
        assert_eq!(config.close_slippage, 0.02);
        assert!(config.blacklist.is_empty());
        assert!(config.low_profit_threshold < config.tier1_profit_threshold);
    }

    #[test]
    fn default_config_passes_validation_with_wallet() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn unordered_thresholds_rejected() {
        let mut config = valid_config();
        config.tier1_profit_threshold = config.tier2_profit_threshold;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("strictly increasing"), "got: {err}");
    }

    #[test]
    fn retracement_out_of_range_rejected() {
        let mut config = valid_config();
        config.low_retracement = 1.0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.tier2_retracement = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn undersized_watchdog_timeout_rejected() {
        let mut config = valid_config();
        config.watchdog_timeout_secs = config.monitor_interval_secs + config.http_timeout_secs;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("watchdog_timeout_secs"), "got: {err}");
    }

    #[test]
    fn missing_wallet_rejected() {
        let mut config = valid_config();
        config.wallet_address = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn blacklist_parses_as_set() {
        let config: SentinelConfig =
            serde_json::from_str(r#"{"blacklist": ["DOGE", "PEPE", "DOGE"]}"#).unwrap();
        assert_eq!(config.blacklist.len(), 2);
        assert!(config.blacklist.contains("DOGE"));
    }
}
