//! Fact → record reconciliation.
//!
//! Pure over a `LedgerState`: the caller owns locking and persistence. Every
//! function here mutates the state it is handed and nothing else.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::LedgerConfig;
use crate::matcher::{find_match, generate_key, key_strength, match_tracking_id, KeyContext};
use crate::model::{non_empty, ObservedFact, OrderRecord, TrackingRef};
use crate::store::LedgerState;

/// What a single reconcile did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub key: String,
    pub created: bool,
    /// Key the record lived under before being promoted to `key`.
    pub promoted_from: Option<String>,
    /// Keys of records folded into this one and removed.
    pub absorbed: Vec<String>,
}

/// Merge one fact into `state`. Returns `None` when the fact is skipped
/// (disabled source, or nothing to key a record on).
pub fn reconcile_into(
    state: &mut LedgerState,
    fact: &ObservedFact,
    config: &LedgerConfig,
    ctx: KeyContext,
    now: DateTime<Utc>,
) -> Option<Reconciled> {
    if !config.sources.is_enabled(fact.source) {
        debug!(source = %fact.source, "source disabled, fact skipped");
        return None;
    }
    if !fact.is_reconcilable() {
        debug!(source = %fact.source, "fact has no order id, tracking id or item name");
        return None;
    }

    let existing = find_match(fact, state, &config.matcher);
    let generated = generate_key(fact, ctx, state, now);

    let mut created = false;
    let mut promoted_from = None;

    // Take the record out of the store while it is being rebuilt; it goes
    // back in under `target_key` once merged.
    let (target_key, mut record) = match existing.and_then(|m| {
        let rec = state.delete(&m.key)?;
        Some((m.key, rec))
    }) {
        Some((old_key, mut rec)) => {
            apply_fact(&mut rec, fact);
            // The old key is judged against the merged record.
            if generated.key != old_key && generated.strength > key_strength(&old_key, &rec) {
                if let Some(resident) = state.delete(&generated.key) {
                    fold_missing(&mut rec, &resident);
                }
                let moved = state.retarget_tracking(&old_key, &generated.key);
                debug!(from = %old_key, to = %generated.key, index_entries = moved, "promoted record key");
                promoted_from = Some(old_key);
                (generated.key, rec)
            } else {
                (old_key, rec)
            }
        }
        None => {
            let mut rec = match state.delete(&generated.key) {
                Some(rec) => rec,
                None => {
                    created = true;
                    OrderRecord::new(generated.key.clone(), fact.source, now)
                }
            };
            apply_fact(&mut rec, fact);
            (generated.key, rec)
        }
    };

    record.source = fact.source;
    record.last_updated = now;

    let absorbed = absorb_same_shipment(state, fact, config, &target_key, &mut record);
    release_tracking_claims(state, fact, &target_key);

    state.put(target_key.clone(), record);

    if let Some(tracking_id) = fact.tracking_id_str() {
        let carrier = fact.carrier.or_else(|| state.get(&target_key).and_then(|r| r.carrier));
        state.tracking_put(
            tracking_id,
            TrackingRef {
                key: target_key.clone(),
                carrier,
                source: fact.source,
                item_id: fact.item_id_str().map(str::to_string),
                captured_at: now,
            },
        );
    }

    Some(Reconciled {
        key: target_key,
        created,
        promoted_from,
        absorbed,
    })
}

/// Non-destructive partial update: present incoming values overwrite, absent
/// ones never erase. Items are replaced wholesale, and only by a non-empty list.
pub fn apply_fact(record: &mut OrderRecord, fact: &ObservedFact) {
    if let Some(id) = fact.order_id_str() {
        record.order_id = Some(id.to_string());
    }
    if let Some(id) = fact.tracking_id_str() {
        record.tracking_id = Some(id.to_string());
    }
    if let Some(carrier) = fact.carrier {
        record.carrier = Some(carrier);
    }
    if let Some(id) = fact.item_id_str() {
        record.item_id = Some(id.to_string());
    }
    if let Some(total) = fact.total_cents {
        record.total_cents = Some(total);
    }
    if let Some(date) = fact.order_date {
        record.order_date = Some(date);
    }
    if !fact.items.is_empty() {
        record.items = fact.items.clone();
    }
}

/// Fill gaps in `target` from `other`. Values already on `target` win.
pub fn fold_missing(target: &mut OrderRecord, other: &OrderRecord) {
    if non_empty(&target.order_id).is_none() {
        target.order_id = other.order_id.clone();
    }
    if non_empty(&target.tracking_id).is_none() {
        target.tracking_id = other.tracking_id.clone();
    }
    if target.carrier.is_none() {
        target.carrier = other.carrier;
    }
    if non_empty(&target.item_id).is_none() {
        target.item_id = other.item_id.clone();
    }
    if target.total_cents.is_none() {
        target.total_cents = other.total_cents;
    }
    if target.order_date.is_none() {
        target.order_date = other.order_date;
    }
    if target.items.is_empty() {
        target.items = other.items.clone();
    }
}

/// A fact carrying both an order id and a tracking id proves that a separate
/// record found by that tracking id is the same shipment. Fold it in if it is
/// stored under a weaker key and does not name a different order.
fn absorb_same_shipment(
    state: &mut LedgerState,
    fact: &ObservedFact,
    config: &LedgerConfig,
    target_key: &str,
    record: &mut OrderRecord,
) -> Vec<String> {
    let mut absorbed = Vec::new();
    if fact.tracking_id_str().is_none() {
        return absorbed;
    }
    let target_strength = key_strength(target_key, record);

    while let Some(other_key) = match_tracking_id(fact, state, &config.matcher) {
        if other_key == target_key {
            break;
        }
        let Some(other) = state.get(&other_key) else { break };
        let compatible = match (non_empty(&other.order_id), non_empty(&record.order_id)) {
            (Some(theirs), Some(ours)) => theirs == ours,
            _ => true,
        };
        if !compatible || key_strength(&other_key, other) >= target_strength {
            break;
        }
        let Some(other) = state.delete(&other_key) else { break };
        fold_missing(record, &other);
        state.retarget_tracking(&other_key, target_key);
        debug!(absorbed = %other_key, into = %target_key, "merged duplicate record");
        absorbed.push(other_key);
    }
    absorbed
}

/// A tracking id belongs to one shipment. Any other record still claiming
/// the fact's tracking id loses it to the record just written.
fn release_tracking_claims(state: &mut LedgerState, fact: &ObservedFact, target_key: &str) {
    let Some(tracking_id) = fact.tracking_id_str() else { return };
    for (key, rec) in state.orders.iter_mut() {
        if key != target_key && rec.tracking_matches(tracking_id) {
            debug!(key = %key, tracking_id, "tracking id reassigned to another record");
            rec.tracking_id = None;
        }
    }
}
