// =============================================================================
// Hyperliquid Exchange Client — signed reduce-only close orders
// =============================================================================
//
// A "market" close on this exchange is an aggressive IOC limit order priced
// `slippage` away from the current mid, flagged reduce-only so it can never
// flip the position. Orders are addressed by asset index, not symbol, and
// both price and size travel as strings with exchange-mandated precision:
// at most 5 significant figures for the price, and per-asset `szDecimals`
// for the size (price decimals are capped at 6 - szDecimals for perps).
//
// The asset table comes from one `meta` query at connect time. Actions are
// signed with the account's Ethereum key.
// =============================================================================

use std::collections::HashMap;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::SentinelConfig;
use crate::guard::monitor::OrderExecutor;
use crate::hyperliquid::client::{num_field, InfoClient};
use crate::types::Side;

/// Maximum significant figures accepted in an order price.
const PRICE_SIG_FIGS: i32 = 5;

/// Price decimals cap for perpetuals: decimals <= MAX_DECIMALS - szDecimals.
const MAX_PRICE_DECIMALS: u32 = 6;

/// Per-asset order metadata from the `meta` universe.
#[derive(Debug, Clone, Copy)]
struct AssetMeta {
    index: u32,
    sz_decimals: u32,
}

/// Write-side Hyperliquid client bound to one wallet.
pub struct ExchangeClient {
    http: reqwest::Client,
    base_url: String,
    wallet: LocalWallet,
    info: InfoClient,
    slippage: f64,
    assets: HashMap<String, AssetMeta>,
}

impl ExchangeClient {
    /// Build the client and load the asset universe. An asset that lists
    /// after connect is unknown to this instance; a close for it fails and
    /// is retried by the monitor on a later cycle.
    pub async fn connect(
        config: &SentinelConfig,
        private_key: &str,
        info: InfoClient,
    ) -> Result<Self> {
        let key = private_key.strip_prefix("0x").unwrap_or(private_key);
        let wallet =
            LocalWallet::from_str(key).context("invalid HYPERLIQUID_PRIVATE_KEY")?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        let meta = info.meta().await.context("failed to load asset universe")?;
        let assets = parse_universe(&meta)?;

        info!(assets = assets.len(), "exchange client connected");

        Ok(Self {
            http,
            base_url: config.api_url.clone(),
            wallet,
            info,
            slippage: config.close_slippage,
            assets,
        })
    }

    /// Current UNIX timestamp in milliseconds, used as the action nonce.
    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX epoch")
            .as_millis() as u64
    }

    /// Sign `{action, nonce}` with the wallet key and return the signature
    /// object the exchange endpoint expects.
    async fn sign_action(&self, action: &Value, nonce: u64) -> Result<Value> {
        let message = json!({ "action": action, "nonce": nonce });
        let message_str =
            serde_json::to_string(&message).context("failed to encode action for signing")?;

        let signature = self
            .wallet
            .sign_message(message_str.as_bytes())
            .await
            .context("failed to sign exchange action")?;

        Ok(json!({
            "r": format!("{:#066x}", signature.r),
            "s": format!("{:#066x}", signature.s),
            "v": signature.v,
        }))
    }

    /// POST a signed action to /exchange and verify the response status.
    async fn post_action(&self, action: Value) -> Result<Value> {
        let nonce = Self::timestamp_ms();
        let signature = self.sign_action(&action, nonce).await?;
        let body = json!({
            "action": action,
            "nonce": nonce,
            "signature": signature,
        });

        let url = format!("{}/exchange", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("POST /exchange request failed")?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .context("failed to parse /exchange response")?;

        if !status.is_success() {
            anyhow::bail!("POST /exchange returned {status}: {body}");
        }
        if body.get("status").and_then(|s| s.as_str()) != Some("ok") {
            anyhow::bail!("exchange rejected the action: {body}");
        }
        // A transport-level "ok" can still carry a per-order error.
        if let Some(err) = body["response"]["data"]["statuses"]
            .as_array()
            .and_then(|statuses| {
                statuses
                    .iter()
                    .find_map(|s| s.get("error").and_then(|e| e.as_str()))
            })
        {
            anyhow::bail!("order rejected: {err}");
        }

        Ok(body)
    }
}

/// Parse the `meta` universe into an asset table keyed by coin name.
fn parse_universe(meta: &Value) -> Result<HashMap<String, AssetMeta>> {
    let universe = meta
        .get("universe")
        .and_then(|v| v.as_array())
        .context("meta response missing 'universe' array")?;

    let mut assets = HashMap::with_capacity(universe.len());
    for (index, entry) in universe.iter().enumerate() {
        let Some(name) = entry.get("name").and_then(|v| v.as_str()) else {
            continue;
        };
        let sz_decimals = entry
            .get("szDecimals")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;
        assets.insert(
            name.to_string(),
            AssetMeta {
                index: index as u32,
                sz_decimals,
            },
        );
    }
    Ok(assets)
}

/// Aggressive limit price for a close: sell below the mark to flatten a
/// long, buy above it to flatten a short.
fn slippage_price(mark: f64, side: Side, slippage: f64) -> f64 {
    match side {
        Side::Long => mark * (1.0 - slippage),
        Side::Short => mark * (1.0 + slippage),
    }
}

fn round_to_significant(value: f64, sig_figs: i32) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(sig_figs - 1 - magnitude);
    (value * factor).round() / factor
}

fn format_trimmed(value: f64, decimals: u32) -> String {
    let s = format!("{:.*}", decimals as usize, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Wire format for an order price: 5 significant figures, decimals capped
/// by the asset's size precision.
fn format_price(px: f64, sz_decimals: u32) -> String {
    let decimals = MAX_PRICE_DECIMALS.saturating_sub(sz_decimals);
    let px = round_to_significant(px, PRICE_SIG_FIGS);
    let factor = 10f64.powi(decimals as i32);
    format_trimmed((px * factor).round() / factor, decimals)
}

/// Wire format for an order size, in the asset's own precision.
fn format_size(size: f64, sz_decimals: u32) -> String {
    let factor = 10f64.powi(sz_decimals as i32);
    format_trimmed((size * factor).round() / factor, sz_decimals)
}

/// The order object for a full reduce-only IOC close.
fn close_order(asset: u32, is_buy: bool, px: &str, sz: &str) -> Value {
    json!({
        "a": asset,
        "b": is_buy,
        "p": px,
        "s": sz,
        "r": true,
        "t": { "limit": { "tif": "Ioc" } },
    })
}

#[async_trait]
impl OrderExecutor for ExchangeClient {
    async fn close_position(
        &self,
        symbol: &str,
        size: f64,
        side: Side,
        reason: &str,
    ) -> Result<Value> {
        let asset = self
            .assets
            .get(symbol)
            .copied()
            .with_context(|| format!("unknown asset {symbol}"))?;

        let mids = self.info.all_mids().await?;
        let mark = mids
            .get(symbol)
            .and_then(num_field)
            .filter(|m| *m > 0.0)
            .with_context(|| format!("no mark price for {symbol}"))?;

        // Flattening is the opposite-side order.
        let is_buy = side == Side::Short;
        let px = format_price(slippage_price(mark, side, self.slippage), asset.sz_decimals);
        let sz = format_size(size, asset.sz_decimals);

        info!(
            symbol,
            %side,
            size = %sz,
            limit_px = %px,
            mark,
            reason,
            "submitting reduce-only close order"
        );

        let action = json!({
            "type": "order",
            "orders": [close_order(asset.index, is_buy, &px, &sz)],
            "grouping": "na",
        });

        let body = self.post_action(action).await?;
        debug!(symbol, "close order accepted");
        Ok(body)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slippage_prices_cross_the_spread() {
        // Closing a long sells under the mark; closing a short buys over it.
        assert!((slippage_price(100.0, Side::Long, 0.02) - 98.0).abs() < 1e-9);
        assert!((slippage_price(100.0, Side::Short, 0.02) - 102.0).abs() < 1e-9);
    }

    #[test]
    fn round_to_significant_five_figures() {
        assert_eq!(round_to_significant(61_234.567, 5), 61_235.0);
        assert_eq!(round_to_significant(0.012345678, 5), 0.012346);
        assert_eq!(round_to_significant(2.0, 5), 2.0);
        assert_eq!(round_to_significant(0.0, 5), 0.0);
    }

    #[test]
    fn price_formatting_respects_sig_figs_and_decimals() {
        // Large price: 5 significant figures, no decimals needed.
        assert_eq!(format_price(61_234.567, 3), "61235");
        // Small price: decimals capped at 6 - szDecimals.
        assert_eq!(format_price(0.0123456, 0), "0.012346");
        assert_eq!(format_price(0.0123456, 2), "0.0123");
        // Trailing zeros trimmed.
        assert_eq!(format_price(98.0, 3), "98");
    }

    #[test]
    fn size_formatting_uses_asset_precision() {
        assert_eq!(format_size(0.5, 5), "0.5");
        assert_eq!(format_size(2.0, 1), "2");
        assert_eq!(format_size(1.23456789, 4), "1.2346");
        assert_eq!(format_size(150.0, 0), "150");
    }

    #[test]
    fn close_order_is_reduce_only_ioc() {
        let order = close_order(7, true, "102", "0.5");
        assert_eq!(order["a"], 7);
        assert_eq!(order["b"], true);
        assert_eq!(order["p"], "102");
        assert_eq!(order["s"], "0.5");
        assert_eq!(order["r"], true);
        assert_eq!(order["t"]["limit"]["tif"], "Ioc");
    }

    #[test]
    fn universe_parses_into_indexed_assets() {
        let meta = json!({
            "universe": [
                { "name": "BTC", "szDecimals": 5 },
                { "name": "ETH", "szDecimals": 4 },
                { "name": "SOL", "szDecimals": 2 }
            ]
        });
        let assets = parse_universe(&meta).unwrap();
        assert_eq!(assets.len(), 3);
        assert_eq!(assets["ETH"].index, 1);
        assert_eq!(assets["SOL"].sz_decimals, 2);
    }

    #[test]
    fn missing_universe_is_an_error() {
        assert!(parse_universe(&json!({})).is_err());
    }
}
