//! The owned ledger handle.
//!
//! Every mutation runs as one critical section: writers queue on a fair
//! mutex around the backend, build the next state from the current snapshot,
//! persist it, and only then publish it. Readers clone the published `Arc`
//! and never wait on a writer's persist.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::{FairMutex, RwLock};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::lookup;
use crate::matcher::KeyContext;
use crate::model::{Item, ManualEntry, ObservedFact, OrderRecord, Source};
use crate::persist::Persist;
use crate::reconcile::reconcile_into;
use crate::store::LedgerState;
use crate::summary::{self, LedgerStats};

/// Result of a bulk page scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// One entry per input fact, `None` where the fact was skipped.
    pub keys: Vec<Option<String>>,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

pub struct Ledger<B: Persist> {
    config: LedgerConfig,
    writer: FairMutex<B>,
    state: RwLock<Arc<LedgerState>>,
}

impl<B: Persist> Ledger<B> {
    pub fn open(mut backend: B, config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        let state = backend.load()?;
        info!(
            orders = state.orders.len(),
            tracking = state.tracking_map.len(),
            manual = state.manual_entries.len(),
            "ledger opened"
        );
        Ok(Self {
            config,
            writer: FairMutex::new(backend),
            state: RwLock::new(Arc::new(state)),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Consistent point-in-time view of the whole store.
    pub fn snapshot(&self) -> Arc<LedgerState> {
        Arc::clone(&self.state.read())
    }

    /// Run `mutate` against a copy of the current state, persist, publish.
    /// A copy that comes back unchanged is neither saved nor published.
    fn commit<T>(
        &self,
        op: &'static str,
        mutate: impl FnOnce(&mut LedgerState) -> T,
    ) -> LedgerResult<T> {
        let mut backend = self.writer.lock();
        let current = self.snapshot();
        let mut next = LedgerState::clone(&current);
        let out = mutate(&mut next);
        if next == *current {
            return Ok(out);
        }
        if let Err(e) = backend.save(&next) {
            warn!(op, error = %e, "persist failed, previous state kept");
            return Err(e);
        }
        *self.state.write() = Arc::new(next);
        Ok(out)
    }

    // === Reconciliation ===

    /// Merge one captured fact. `Ok(None)` means the fact was skipped.
    pub fn reconcile(&self, fact: &ObservedFact) -> LedgerResult<Option<String>> {
        let config = &self.config;
        let outcome = self.commit("reconcile", |state| {
            reconcile_into(state, fact, config, KeyContext::Single, Utc::now())
        })?;
        Ok(outcome.map(|r| {
            info!(
                key = %r.key,
                source = %fact.source,
                created = r.created,
                promoted_from = r.promoted_from.as_deref().unwrap_or(""),
                absorbed = r.absorbed.len(),
                "fact reconciled"
            );
            r.key
        }))
    }

    /// Merge an ordered page scan in a single critical section and a single
    /// persist.
    pub fn reconcile_batch(&self, facts: &[ObservedFact]) -> LedgerResult<BatchOutcome> {
        let config = &self.config;
        let outcome = self.commit("reconcile_batch", |state| {
            let now = Utc::now();
            let mut outcome = BatchOutcome::default();
            for fact in facts {
                match reconcile_into(state, fact, config, KeyContext::Bulk, now) {
                    Some(r) => {
                        if r.created {
                            outcome.created += 1;
                        } else {
                            outcome.updated += 1;
                        }
                        outcome.keys.push(Some(r.key));
                    }
                    None => {
                        outcome.skipped += 1;
                        outcome.keys.push(None);
                    }
                }
            }
            outcome
        })?;
        info!(
            created = outcome.created,
            updated = outcome.updated,
            skipped = outcome.skipped,
            "page scan reconciled"
        );
        Ok(outcome)
    }

    // === Manual entries and deletion ===

    /// Store a user-typed record under its tracking number.
    pub fn add_manual(&self, entry: ManualEntry) -> LedgerResult<String> {
        let tracking = entry.tracking_id.trim().to_string();
        if tracking.is_empty() {
            return Err(LedgerError::InvalidManualEntry(
                "tracking number is required".into(),
            ));
        }
        let description = match entry.description.trim() {
            "" => "Manual entry".to_string(),
            d => d.to_string(),
        };

        let mut item = Item::new(description, entry.quantity);
        item.price_cents = entry.value_cents;

        let mut record = OrderRecord::new(tracking.clone(), Source::Manual, Utc::now());
        record.tracking_id = Some(tracking.clone());
        record.items.push(item);
        record.total_cents = entry.value_cents;

        self.commit("add_manual", |state| {
            state.manual_entries.insert(tracking.clone(), record);
        })?;
        info!(key = %tracking, "manual entry saved");
        Ok(tracking)
    }

    /// Remove a record from both orders and manual entries, along with the
    /// index entries pointing at it. Returns whether anything was removed.
    pub fn delete(&self, key: &str) -> LedgerResult<bool> {
        let existed = self.commit("delete", |state| {
            let order = state.delete(key).is_some();
            let manual = state.manual_entries.remove(key).is_some();
            state.drop_tracking_for(key);
            order || manual
        })?;
        if existed {
            info!(key, "record deleted");
        }
        Ok(existed)
    }

    pub fn clear_all(&self) -> LedgerResult<()> {
        self.commit("clear_all", |state| {
            *state = LedgerState::default();
        })?;
        info!("ledger cleared");
        Ok(())
    }

    // === Reads ===

    /// Record under `key` in the merged view.
    pub fn get(&self, key: &str) -> Option<OrderRecord> {
        self.snapshot().lookup_merged(key).cloned()
    }

    pub fn find_by_tracking(&self, tracking_id: &str) -> Option<OrderRecord> {
        lookup::find_by_tracking(&self.snapshot(), tracking_id).cloned()
    }

    pub fn known_tracking<S: AsRef<str>>(&self, tracking_ids: &[S]) -> Vec<String> {
        lookup::known_tracking(&self.snapshot(), tracking_ids)
    }

    pub fn list(&self) -> Vec<OrderRecord> {
        summary::list(&self.snapshot())
    }

    pub fn search(&self, query: &str) -> Vec<OrderRecord> {
        summary::search(&self.snapshot(), query)
    }

    pub fn stats(&self) -> LedgerStats {
        summary::compute_stats(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Carrier;
    use crate::persist::MemoryBackend;

    /// Backend whose saves fail once `fail` is set.
    struct FlakyBackend {
        fail: bool,
    }

    impl Persist for FlakyBackend {
        fn load(&mut self) -> LedgerResult<LedgerState> {
            Ok(LedgerState::default())
        }

        fn save(&mut self, _state: &LedgerState) -> LedgerResult<()> {
            if self.fail {
                Err(LedgerError::Persist("quota exceeded".into()))
            } else {
                Ok(())
            }
        }
    }

    fn ledger() -> Ledger<MemoryBackend> {
        Ledger::open(MemoryBackend::new(), LedgerConfig::default()).unwrap()
    }

    #[test]
    fn skipped_fact_does_not_persist() {
        let ledger = ledger();
        let key = ledger.reconcile(&ObservedFact::new(Source::Ebay)).unwrap();
        assert!(key.is_none());
        assert_eq!(ledger.writer.lock().saves(), 0);
    }

    #[test]
    fn failed_save_keeps_previous_state() {
        let ledger = Ledger::open(FlakyBackend { fail: false }, LedgerConfig::default()).unwrap();
        ledger
            .reconcile(&ObservedFact::new(Source::Amazon).order_id("111-1").item(Item::new("Lamp", 1)))
            .unwrap();
        let before = ledger.snapshot();

        ledger.writer.lock().fail = true;
        let err = ledger
            .reconcile(&ObservedFact::new(Source::Amazon).order_id("111-1").tracking_id("1Z1"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Persist(_)));
        assert_eq!(*ledger.snapshot(), *before);
        assert!(ledger.find_by_tracking("1Z1").is_none());
        assert!(ledger.delete("111-1").is_err());
        assert!(ledger.get("111-1").is_some());
    }

    #[test]
    fn batch_counts() {
        let ledger = ledger();
        ledger
            .reconcile(&ObservedFact::new(Source::Ebay).order_id("12-34567-89012"))
            .unwrap();
        let outcome = ledger
            .reconcile_batch(&[
                ObservedFact::new(Source::Ebay)
                    .order_id("12-34567-89012")
                    .tracking_id("9400100000000000000001")
                    .carrier(Carrier::Usps),
                ObservedFact::new(Source::Ebay).item(Item::new("Brass Desk Bell", 1)),
                ObservedFact::new(Source::Ebay),
            ])
            .unwrap();
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(
            outcome.keys,
            vec![
                Some("12-34567-89012".to_string()),
                Some("ebay-BrassDeskBell".to_string()),
                None
            ]
        );
    }

    #[test]
    fn manual_entries_are_separate() {
        let ledger = ledger();
        let key = ledger
            .add_manual(ManualEntry {
                tracking_id: " LX123456789DE ".into(),
                description: String::new(),
                quantity: 0,
                value_cents: Some(1500),
            })
            .unwrap();
        assert_eq!(key, "LX123456789DE");
        let snap = ledger.snapshot();
        assert!(snap.orders.is_empty());
        let rec = &snap.manual_entries["LX123456789DE"];
        assert_eq!(rec.items[0].name, "Manual entry");
        assert_eq!(rec.items[0].quantity, 1);
        assert_eq!(ledger.find_by_tracking("lx123456789de").unwrap().total_cents, Some(1500));
        assert_eq!(ledger.stats().manual, 1);
    }

    #[test]
    fn manual_entry_requires_tracking() {
        let err = ledger()
            .add_manual(ManualEntry {
                tracking_id: "  ".into(),
                description: "Gift".into(),
                quantity: 1,
                value_cents: None,
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidManualEntry(_)));
    }

    #[test]
    fn delete_and_clear() {
        let ledger = ledger();
        ledger
            .reconcile(&ObservedFact::new(Source::Amazon).order_id("111-1").tracking_id("1Z1"))
            .unwrap();
        assert!(ledger.delete("111-1").unwrap());
        assert!(!ledger.delete("111-1").unwrap());
        assert!(ledger.snapshot().tracking_map.is_empty());

        ledger
            .reconcile(&ObservedFact::new(Source::Amazon).order_id("111-2"))
            .unwrap();
        ledger.clear_all().unwrap();
        assert_eq!(ledger.stats(), LedgerStats::default());
    }

    #[test]
    fn open_loads_backend_state() {
        let mut seeded = LedgerState::default();
        let mut rec = OrderRecord::new("111-9", Source::Amazon, Utc::now());
        rec.tracking_id = Some("1Z9".into());
        seeded.put("111-9", rec);

        let ledger = Ledger::open(MemoryBackend::with_state(seeded), LedgerConfig::default()).unwrap();
        assert_eq!(ledger.find_by_tracking("1z9").unwrap().key, "111-9");
        assert_eq!(ledger.writer.lock().saves(), 0);
    }

    #[test]
    fn open_rejects_invalid_config() {
        let mut config = LedgerConfig::default();
        config.matcher.fuzzy_prefix_len = 0;
        assert!(Ledger::open(MemoryBackend::new(), config).is_err());
    }
}
