use std::fmt;

use serde::{Deserialize, Serialize};

/// Batch card creation never processes more than this many items in
/// one request, even for tiers with an unlimited per-deck card limit.
pub const MAX_BATCH_CARDS: usize = 500;

/// Subscription tier of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Starter,
    Pro,
    Enterprise,
}

impl Tier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Starter => "starter",
            Tier::Pro => "pro",
            Tier::Enterprise => "enterprise",
        }
    }

    /// Parses a tier name. Unknown names fall back to the default
    /// (free) tier so limit resolution always succeeds.
    #[must_use]
    pub fn parse(s: &str) -> Tier {
        match s {
            "starter" => Tier::Starter,
            "pro" => Tier::Pro,
            "enterprise" => Tier::Enterprise,
            _ => Tier::Free,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource limit. The wire format uses -1 for "unlimited"; inside
/// the engine that sentinel is a tagged variant so quota arithmetic
/// can never touch it by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Unlimited,
    Bounded(i64),
}

impl Limit {
    /// Decodes the wire sentinel: any negative value means unlimited.
    #[must_use]
    pub const fn from_sentinel(raw: i64) -> Limit {
        if raw < 0 {
            Limit::Unlimited
        } else {
            Limit::Bounded(raw)
        }
    }

    /// Encodes back to the wire sentinel.
    #[must_use]
    pub const fn sentinel(self) -> i64 {
        match self {
            Limit::Unlimited => -1,
            Limit::Bounded(n) => n,
        }
    }

    /// True if one more item fits under this limit given the current
    /// count.
    #[must_use]
    pub const fn allows(self, current: i64) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Bounded(max) => current < max,
        }
    }

    /// Caps a requested item count, leaving unlimited requests alone.
    #[must_use]
    pub fn cap(self, requested: usize) -> usize {
        match self {
            Limit::Unlimited => requested,
            Limit::Bounded(max) => requested.min(usize::try_from(max).unwrap_or(0)),
        }
    }
}

/// Resolved quota limits for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub max_decks: Limit,
    pub max_cards_per_deck: Limit,
}

impl TierLimits {
    /// Built-in defaults, lazily materialized into the store on first
    /// resolution so operators can override them per deployment.
    #[must_use]
    pub const fn defaults(tier: Tier) -> TierLimits {
        let (max_decks, max_cards_per_deck) = match tier {
            Tier::Free => (Limit::Bounded(3), Limit::Bounded(50)),
            Tier::Starter => (Limit::Bounded(10), Limit::Bounded(200)),
            Tier::Pro => (Limit::Bounded(50), Limit::Bounded(500)),
            Tier::Enterprise => (Limit::Unlimited, Limit::Unlimited),
        };
        TierLimits {
            max_decks,
            max_cards_per_deck,
        }
    }

    /// Largest batch-create request this tier will process; unlimited
    /// card limits still get a finite cap to bound single-request work.
    #[must_use]
    pub fn batch_cap(self) -> usize {
        match self.max_cards_per_deck {
            Limit::Unlimited => MAX_BATCH_CARDS,
            Limit::Bounded(n) => usize::try_from(n).unwrap_or(0).min(MAX_BATCH_CARDS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_round_trip() {
        assert_eq!(Limit::from_sentinel(-1), Limit::Unlimited);
        assert_eq!(Limit::from_sentinel(0), Limit::Bounded(0));
        assert_eq!(Limit::from_sentinel(7), Limit::Bounded(7));
        assert_eq!(Limit::Unlimited.sentinel(), -1);
        assert_eq!(Limit::Bounded(7).sentinel(), 7);
    }

    #[test]
    fn test_allows() {
        assert!(Limit::Unlimited.allows(0));
        assert!(Limit::Unlimited.allows(1_000_000));
        assert!(Limit::Bounded(3).allows(2));
        assert!(!Limit::Bounded(3).allows(3));
        assert!(!Limit::Bounded(0).allows(0));
    }

    #[test]
    fn test_tier_parse_fallback() {
        assert_eq!(Tier::parse("pro"), Tier::Pro);
        assert_eq!(Tier::parse("enterprise"), Tier::Enterprise);
        assert_eq!(Tier::parse("platinum"), Tier::Free);
        assert_eq!(Tier::parse(""), Tier::Free);
    }

    #[test]
    fn test_batch_cap() {
        assert_eq!(TierLimits::defaults(Tier::Free).batch_cap(), 50);
        assert_eq!(TierLimits::defaults(Tier::Enterprise).batch_cap(), MAX_BATCH_CARDS);
    }
}
