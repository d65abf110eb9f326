use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::MatcherConfig;
use crate::model::{non_empty, ObservedFact, OrderRecord};
use crate::store::LedgerState;

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    OrderId,
    TrackingId,
    ItemId,
    FuzzyName,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderId => write!(f, "order_id"),
            Self::TrackingId => write!(f, "tracking_id"),
            Self::ItemId => write!(f, "item_id"),
            Self::FuzzyName => write!(f, "fuzzy_name"),
        }
    }
}

pub type TierFn = fn(&ObservedFact, &LedgerState, &MatcherConfig) -> Option<String>;

pub struct Tier {
    pub tier: MatchTier,
    pub rule: TierFn,
}

/// Precedence order. The first tier that returns a key wins.
pub const TIERS: [Tier; 4] = [
    Tier { tier: MatchTier::OrderId, rule: match_order_id },
    Tier { tier: MatchTier::TrackingId, rule: match_tracking_id },
    Tier { tier: MatchTier::ItemId, rule: match_item_id },
    Tier { tier: MatchTier::FuzzyName, rule: match_fuzzy_name },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub key: String,
    pub tier: MatchTier,
}

fn tier_enabled(tier: MatchTier, config: &MatcherConfig) -> bool {
    match tier {
        MatchTier::OrderId | MatchTier::TrackingId => true,
        MatchTier::ItemId => config.item_id_tier,
        MatchTier::FuzzyName => config.fuzzy_name_tier,
    }
}

/// Resolve the existing record a fact belongs to, if any.
pub fn find_match(
    fact: &ObservedFact,
    state: &LedgerState,
    config: &MatcherConfig,
) -> Option<Match> {
    for t in &TIERS {
        if !tier_enabled(t.tier, config) {
            continue;
        }
        if let Some(key) = (t.rule)(fact, state, config) {
            debug!(tier = %t.tier, key = %key, "matched existing record");
            return Some(Match { key, tier: t.tier });
        }
    }
    None
}

/// Tier 1: exact order id.
pub fn match_order_id(
    fact: &ObservedFact,
    state: &LedgerState,
    _config: &MatcherConfig,
) -> Option<String> {
    let id = fact.order_id_str()?;
    state
        .orders
        .iter()
        .find(|(_, r)| non_empty(&r.order_id) == Some(id))
        .map(|(k, _)| k.clone())
}

/// Tier 2: tracking id, case-insensitive. The index is consulted before the
/// record scan; an index entry only counts if its record still exists.
pub fn match_tracking_id(
    fact: &ObservedFact,
    state: &LedgerState,
    _config: &MatcherConfig,
) -> Option<String> {
    let id = fact.tracking_id_str()?;
    state
        .tracking_get(id)
        .map(|(_, entry)| entry.key.as_str())
        .filter(|key| state.orders.contains_key(*key))
        .map(str::to_string)
        .or_else(|| {
            state
                .orders
                .iter()
                .find(|(_, r)| r.tracking_matches(id))
                .map(|(k, _)| k.clone())
        })
}

/// Tier 3: opaque item id stored on the record or embedded in its key.
pub fn match_item_id(
    fact: &ObservedFact,
    state: &LedgerState,
    _config: &MatcherConfig,
) -> Option<String> {
    let id = fact.item_id_str()?;
    state
        .orders
        .iter()
        .find(|(k, r)| non_empty(&r.item_id) == Some(id) || k.contains(id))
        .map(|(k, _)| k.clone())
}

/// Tier 4: prefix containment between first item names, either direction.
pub fn match_fuzzy_name(
    fact: &ObservedFact,
    state: &LedgerState,
    config: &MatcherConfig,
) -> Option<String> {
    let name = fact.primary_item_name()?;
    let prefix = char_prefix(name, config.fuzzy_prefix_len);
    state
        .orders
        .iter()
        .find(|(_, r)| {
            r.first_item_name().is_some_and(|existing| {
                existing.contains(prefix)
                    || name.contains(char_prefix(existing, config.fuzzy_prefix_len))
            })
        })
        .map(|(k, _)| k.clone())
}

fn char_prefix(s: &str, chars: usize) -> &str {
    match s.char_indices().nth(chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ---------------------------------------------------------------------------
// Key generation
// ---------------------------------------------------------------------------

/// How strongly a key identifies an order. Promotion only ever moves a
/// record to a strictly stronger key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyStrength {
    Synthetic,
    Tracking,
    OrderId,
}

/// Whether a fact came from a single capture or a bulk page scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyContext {
    Single,
    Bulk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedKey {
    pub key: String,
    pub strength: KeyStrength,
}

/// Key for a fact with no existing match: order id, then tracking id, then a
/// synthetic `{source}-...` key.
pub fn generate_key(
    fact: &ObservedFact,
    ctx: KeyContext,
    state: &LedgerState,
    now: DateTime<Utc>,
) -> GeneratedKey {
    if let Some(id) = fact.order_id_str() {
        return GeneratedKey { key: id.to_string(), strength: KeyStrength::OrderId };
    }
    if let Some(id) = fact.tracking_id_str() {
        return GeneratedKey { key: id.to_string(), strength: KeyStrength::Tracking };
    }

    let slug = fact.primary_item_name().map(slugify).filter(|s| !s.is_empty());
    let key = match (ctx, slug) {
        // Re-scanning the same listing must land on the same key.
        (KeyContext::Bulk, Some(slug)) => format!("{}-{slug}", fact.source),
        _ => {
            let base = format!("{}-{}", fact.source, now.timestamp_millis());
            let mut key = base.clone();
            let mut n = 1;
            while state.orders.contains_key(&key) {
                key = format!("{base}-{n}");
                n += 1;
            }
            key
        }
    };
    GeneratedKey { key, strength: KeyStrength::Synthetic }
}

/// Strength of the key a record is currently stored under.
pub fn key_strength(key: &str, record: &OrderRecord) -> KeyStrength {
    if non_empty(&record.order_id) == Some(key) {
        KeyStrength::OrderId
    } else if record.tracking_matches(key) {
        KeyStrength::Tracking
    } else {
        KeyStrength::Synthetic
    }
}

/// First 30 characters with everything but `[A-Za-z0-9_]` removed.
pub fn slugify(name: &str) -> String {
    name.chars()
        .take(30)
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
