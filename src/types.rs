// =============================================================================
// Shared types used across the sentinel
// =============================================================================

use serde::{Deserialize, Serialize};

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Derive the side from the exchange's signed size.
    pub fn from_signed_size(szi: f64) -> Self {
        if szi > 0.0 {
            Self::Long
        } else {
            Self::Short
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// One open position as seen in a single polling snapshot. Derived fresh
/// every cycle and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    /// Absolute position size in coin units.
    pub size: f64,
    pub entry_price: f64,
    /// Mark price at snapshot time.
    pub current_price: f64,
    /// Return on margin, in percent.
    pub profit_pct: f64,
    /// Unrealized PnL in the quote currency (USDC).
    pub pnl_quote: f64,
}

impl Position {
    /// Return on margin in percent, with margin estimated from the
    /// account-wide leverage: `margin = size * entry / leverage`.
    ///
    /// A zero margin (zero size or zero entry price) yields 0 rather than
    /// dividing by it.
    pub fn profit_pct(size: f64, entry_price: f64, pnl_quote: f64, leverage: f64) -> f64 {
        let margin = size.abs() * entry_price / leverage;
        if margin > 0.0 {
            pnl_quote / margin * 100.0
        } else {
            0.0
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_from_signed_size() {
        assert_eq!(Side::from_signed_size(1.5), Side::Long);
        assert_eq!(Side::from_signed_size(-0.02), Side::Short);
    }

    #[test]
    fn side_display() {
        assert_eq!(Side::Long.to_string(), "LONG");
        assert_eq!(Side::Short.to_string(), "SHORT");
    }

    #[test]
    fn profit_pct_from_margin() {
        // size 1, entry 1000, leverage 10 -> margin 100; pnl 25 -> 25%.
        let pct = Position::profit_pct(1.0, 1000.0, 25.0, 10.0);
        assert!((pct - 25.0).abs() < 1e-9);
    }

    #[test]
    fn profit_pct_negative_pnl() {
        // margin = 2 * 500 / 10 = 100 -> -10%.
        let pct = Position::profit_pct(2.0, 500.0, -10.0, 10.0);
        assert!((pct + 10.0).abs() < 1e-9);
    }

    #[test]
    fn profit_pct_zero_margin_guard() {
        assert_eq!(Position::profit_pct(0.0, 1000.0, 25.0, 10.0), 0.0);
        assert_eq!(Position::profit_pct(1.0, 0.0, 25.0, 10.0), 0.0);
    }
}
