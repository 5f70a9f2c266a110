// =============================================================================
// Hyperliquid Info Client — position snapshots from the public /info API
// =============================================================================
//
// Two POST /info queries per snapshot: `clearinghouseState` for the
// account's open positions (signed size, entry price, unrealized PnL in
// USDC) and `allMids` for a mark price per coin. Both are unauthenticated.
//
// The join into `Position` rows is a pure function so the field mapping and
// the margin math can be tested against fixture JSON. Numeric fields arrive
// as strings on this API; `num_field` tolerates either representation.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::config::SentinelConfig;
use crate::guard::monitor::PositionSource;
use crate::types::{Position, Side};

/// Read-only Hyperliquid REST client for one account.
#[derive(Clone)]
pub struct InfoClient {
    http: reqwest::Client,
    base_url: String,
    wallet_address: String,
    leverage: f64,
}

impl InfoClient {
    pub fn new(config: &SentinelConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_url.clone(),
            wallet_address: config.wallet_address.clone(),
            leverage: config.leverage,
        })
    }

    /// POST one /info query and return the JSON response.
    async fn info(&self, body: Value) -> Result<Value> {
        let url = format!("{}/info", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("POST /info request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("POST /info returned {status}");
        }

        resp.json().await.context("failed to parse /info response")
    }

    /// Account clearinghouse state (positions, margin summary).
    #[instrument(skip(self), name = "hyperliquid::user_state")]
    pub async fn user_state(&self) -> Result<Value> {
        self.info(json!({
            "type": "clearinghouseState",
            "user": self.wallet_address,
        }))
        .await
        .context("clearinghouseState query failed")
    }

    /// Mid price per coin for the whole market. One call covers every open
    /// position, so there is no per-symbol polling.
    #[instrument(skip(self), name = "hyperliquid::all_mids")]
    pub async fn all_mids(&self) -> Result<Value> {
        self.info(json!({ "type": "allMids" }))
            .await
            .context("allMids query failed")
    }

    /// Exchange metadata (asset universe with size decimals).
    pub async fn meta(&self) -> Result<Value> {
        self.info(json!({ "type": "meta" }))
            .await
            .context("meta query failed")
    }
}

/// Read a numeric field that the API may encode as a number or a string.
pub(crate) fn num_field(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Join a clearinghouse state with the mid map into position rows.
///
/// Entries with zero size or no resolvable mark price are dropped here and
/// never reach the decision engine. A malformed entry is skipped with a
/// warning rather than failing the whole snapshot.
pub fn parse_positions(user_state: &Value, mids: &Value, leverage: f64) -> Vec<Position> {
    let raw = user_state
        .get("assetPositions")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut positions = Vec::with_capacity(raw.len());

    for item in &raw {
        let Some(pos) = item.get("position") else {
            warn!("assetPositions entry without a position object — skipped");
            continue;
        };
        let Some(coin) = pos.get("coin").and_then(|v| v.as_str()) else {
            warn!("position entry without a coin — skipped");
            continue;
        };

        let (Some(szi), Some(entry_price), Some(pnl_quote)) = (
            pos.get("szi").and_then(num_field),
            pos.get("entryPx").and_then(num_field),
            pos.get("unrealizedPnl").and_then(num_field),
        ) else {
            warn!(coin, "position entry with malformed numeric fields — skipped");
            continue;
        };

        if szi == 0.0 {
            continue;
        }

        let current_price = mids.get(coin).and_then(num_field).unwrap_or(0.0);
        if current_price == 0.0 {
            warn!(coin, "no mark price in allMids — position skipped this cycle");
            continue;
        }

        let size = szi.abs();
        positions.push(Position {
            symbol: coin.to_string(),
            side: Side::from_signed_size(szi),
            size,
            entry_price,
            current_price,
            profit_pct: Position::profit_pct(size, entry_price, pnl_quote, leverage),
            pnl_quote,
        });
    }

    positions
}

#[async_trait]
impl PositionSource for InfoClient {
    async fn fetch_positions(&self) -> Result<Vec<Position>> {
        let user_state = self.user_state().await?;
        let mids = self.all_mids().await?;

        let positions = parse_positions(&user_state, &mids, self.leverage);
        debug!(count = positions.len(), "snapshot fetched");
        Ok(positions)
    }
}

// =============================================================================
// Tests
// =============================================================================
