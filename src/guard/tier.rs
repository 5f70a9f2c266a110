// =============================================================================
// Tier Classifier — maps a high-water-mark profit into a protection tier
// =============================================================================
//
// Tiers are keyed on the peak profit, never the instantaneous profit, so a
// position can only climb the ladder. Thresholds are inclusive lower bounds
// checked from the top down; with strictly increasing thresholds exactly one
// tier applies to any real input.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::config::SentinelConfig;

/// Protection tier for an open position, ordered weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Below every threshold — only the hard stop applies.
    None,
    /// Low-profit retracement protection.
    LowProtect,
    /// First trailing-stop tier.
    Tier1,
    /// Second, tightest trailing-stop tier.
    Tier2,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::LowProtect => write!(f, "LOW_PROTECT"),
            Self::Tier1 => write!(f, "TIER_1"),
            Self::Tier2 => write!(f, "TIER_2"),
        }
    }
}

/// Classify a high-water-mark profit percentage into its tier.
pub fn classify(high_water_mark_pct: f64, config: &SentinelConfig) -> Tier {
    if high_water_mark_pct >= config.tier2_profit_threshold {
        Tier::Tier2
    } else if high_water_mark_pct >= config.tier1_profit_threshold {
        Tier::Tier1
    } else if high_water_mark_pct >= config.low_profit_threshold {
        Tier::LowProtect
    } else {
        Tier::None
    }
}

/// Retracement fraction allowed for a tier, or `None` for `Tier::None`.
pub fn retracement(tier: Tier, config: &SentinelConfig) -> Option<f64> {
    match tier {
        Tier::None => None,
        Tier::LowProtect => Some(config.low_retracement),
        Tier::Tier1 => Some(config.tier1_retracement),
        Tier::Tier2 => Some(config.tier2_retracement),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SentinelConfig {
        // Defaults: thresholds 5 / 15 / 30, retracements 0.5 / 0.3 / 0.15.
        SentinelConfig::default()
    }

    #[test]
    fn below_lowest_threshold_is_none() {
        let config = config();
        assert_eq!(classify(-50.0, &config), Tier::None);
        assert_eq!(classify(0.0, &config), Tier::None);
        assert_eq!(classify(4.99, &config), Tier::None);
    }

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        let config = config();
        assert_eq!(classify(5.0, &config), Tier::LowProtect);
        assert_eq!(classify(15.0, &config), Tier::Tier1);
        assert_eq!(classify(30.0, &config), Tier::Tier2);
    }

    #[test]
    fn highest_matching_tier_wins() {
        let config = config();
        assert_eq!(classify(14.99, &config), Tier::LowProtect);
        assert_eq!(classify(29.0, &config), Tier::Tier1);
        assert_eq!(classify(1000.0, &config), Tier::Tier2);
    }

    #[test]
    fn classify_is_monotone_in_the_peak() {
        let config = config();
        let samples = [-20.0, 0.0, 4.9, 5.0, 10.0, 15.0, 22.0, 30.0, 95.0];
        for window in samples.windows(2) {
            let (a, b) = (window[0], window[1]);
            assert!(
                classify(a, &config) <= classify(b, &config),
                "classify({a}) > classify({b})"
            );
        }
    }

    #[test]
    fn retracement_tightens_tier_by_tier() {
        let config = config();
        let low = retracement(Tier::LowProtect, &config).unwrap();
        let t1 = retracement(Tier::Tier1, &config).unwrap();
        let t2 = retracement(Tier::Tier2, &config).unwrap();
        assert!(low > t1 && t1 > t2, "retracements should shrink: {low} {t1} {t2}");
        assert_eq!(retracement(Tier::None, &config), None);
    }

    #[test]
    fn tier_display_names() {
        assert_eq!(Tier::None.to_string(), "NONE");
        assert_eq!(Tier::LowProtect.to_string(), "LOW_PROTECT");
        assert_eq!(Tier::Tier1.to_string(), "TIER_1");
        assert_eq!(Tier::Tier2.to_string(), "TIER_2");
    }
}
