// =============================================================================
// Stop Decision Engine — close/hold verdict for one position
// =============================================================================
//
// Pure function of (position, peak, tier, config). The tiered trailing stop
// is checked first; the hard stop-loss is checked afterwards even when a
// tier is active, because a position can fall from any tier straight through
// the loss floor between two polls. Neither check mutates anything — the
// caller owns eviction and order placement.
// =============================================================================

use crate::config::SentinelConfig;
use crate::guard::tier::{retracement, Tier};
use crate::types::Position;

/// Verdict for a single position in a single cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Hold,
    /// Close the full position via market order, for the given reason.
    Close(String),
}

/// Decide whether `position` should be closed this cycle.
///
/// Checks, first match wins:
///   1. tiered trailing stop — profit retraced to or past
///      `peak * (1 - retracement)`;
///   2. hard stop-loss — profit at or below `-hard_stop_loss_pct`,
///      regardless of tier;
///   3. hold.
pub fn decide(
    position: &Position,
    high_water_mark_pct: f64,
    tier: Tier,
    config: &SentinelConfig,
) -> Decision {
    if let Some(fraction) = retracement(tier, config) {
        let trigger = high_water_mark_pct * (1.0 - fraction);
        if position.profit_pct <= trigger {
            return Decision::Close(format!(
                "tiered trailing stop: tier={}, peak={:.2}%, current={:.2}%",
                tier, high_water_mark_pct, position.profit_pct
            ));
        }
    }

    if position.profit_pct <= -config.hard_stop_loss_pct {
        return Decision::Close(format!(
            "hard stop-loss: current={:.2}%",
            position.profit_pct
        ));
    }

    Decision::Hold
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::tier::classify;
    use crate::types::Side;

    /// Defaults match the reference scenario: thresholds 5 / 15 / 30,
    /// retracements 0.5 / 0.3 / 0.15, hard stop 10.
    fn config() -> SentinelConfig {
        SentinelConfig::default()
    }

    fn position(profit_pct: f64) -> Position {
        Position {
            symbol: "BTC".to_string(),
            side: Side::Long,
            size: 0.5,
            entry_price: 60_000.0,
            current_price: 61_000.0,
            profit_pct,
            pnl_quote: 0.0,
        }
    }

    #[test]
    fn tier_escalation_then_trigger() {
        let config = config();
        // Peaks after profit path 3, 8, 20, 18 are 3, 8, 20, 20.
        // At profit 18 with peak 20: tier 1, trigger 20 * 0.7 = 14 -> hold.
        let tier = classify(20.0, &config);
        assert_eq!(tier, Tier::Tier1);
        assert_eq!(decide(&position(18.0), 20.0, tier, &config), Decision::Hold);

        // Next tick at 13 <= 14 -> tiered close.
        match decide(&position(13.0), 20.0, tier, &config) {
            Decision::Close(reason) => {
                assert!(reason.contains("tiered trailing stop"), "got: {reason}");
                assert!(reason.contains("TIER_1"), "got: {reason}");
            }
            Decision::Hold => panic!("expected close at 13% with trigger 14%"),
        }
    }

    #[test]
    fn trigger_is_inclusive() {
        let config = config();
        // Peak 20, tier 1, trigger exactly 14.
        assert!(matches!(
            decide(&position(14.0), 20.0, Tier::Tier1, &config),
            Decision::Close(_)
        ));
        assert_eq!(
            decide(&position(14.01), 20.0, Tier::Tier1, &config),
            Decision::Hold
        );
    }

    #[test]
    fn hard_stop_fires_without_any_tier() {
        let config = config();
        // Peak 2 never reached a tier; profit collapses to -11 with hard
        // stop at 10.
        let tier = classify(2.0, &config);
        assert_eq!(tier, Tier::None);
        match decide(&position(-11.0), 2.0, tier, &config) {
            Decision::Close(reason) => {
                assert!(reason.contains("hard stop-loss"), "got: {reason}");
            }
            Decision::Hold => panic!("expected hard stop close at -11%"),
        }
    }

    #[test]
    fn tiered_check_runs_before_the_floor() {
        let config = config();
        // Peak 6, low tier, trigger 3.0. A crash to -12 passes both checks;
        // the tiered reason wins because it is evaluated first.
        let verdict = decide(&position(-12.0), 6.0, Tier::LowProtect, &config);
        assert!(
            matches!(verdict, Decision::Close(ref r) if r.contains("tiered trailing stop")),
            "got: {verdict:?}"
        );
    }

    #[test]
    fn floor_is_inclusive() {
        let config = config();
        let verdict = decide(&position(-10.0), -1.0, Tier::None, &config);
        assert!(matches!(verdict, Decision::Close(ref r) if r.contains("hard stop-loss")));
        assert_eq!(
            decide(&position(-9.99), -1.0, Tier::None, &config),
            Decision::Hold
        );
    }

    #[test]
    fn tier2_trigger_is_tighter_than_tier1() {
        let config = config();
        // Peak 40: tier 2, trigger 40 * 0.85 = 34.
        let tier = classify(40.0, &config);
        assert_eq!(tier, Tier::Tier2);
        assert!(matches!(
            decide(&position(34.0), 40.0, tier, &config),
            Decision::Close(_)
        ));
        assert_eq!(decide(&position(35.0), 40.0, tier, &config), Decision::Hold);
    }

    #[test]
    fn low_protect_halves_the_peak() {
        let config = config();
        // Peak 8: low protection, trigger 8 * 0.5 = 4.
        let tier = classify(8.0, &config);
        assert_eq!(tier, Tier::LowProtect);
        assert_eq!(decide(&position(4.5), 8.0, tier, &config), Decision::Hold);
        assert!(matches!(
            decide(&position(4.0), 8.0, tier, &config),
            Decision::Close(_)
        ));
    }

    #[test]
    fn decide_is_deterministic() {
        let config = config();
        let pos = position(18.0);
        let first = decide(&pos, 20.0, Tier::Tier1, &config);
        let second = decide(&pos, 20.0, Tier::Tier1, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn healthy_position_holds() {
        let config = config();
        assert_eq!(
            decide(&position(1.0), 1.0, classify(1.0, &config), &config),
            Decision::Hold
        );
        assert_eq!(
            decide(&position(50.0), 50.0, classify(50.0, &config), &config),
            Decision::Hold
        );
    }
}
