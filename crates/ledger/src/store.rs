//! In-memory record store: the three keyed mappings the ledger persists.
//!
//! Maps are `BTreeMap` so matcher scans ("first match wins") are
//! deterministic across runs and across a save/load round trip.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{OrderRecord, TrackingRef};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    #[serde(default)]
    pub orders: BTreeMap<String, OrderRecord>,
    #[serde(default)]
    pub tracking_map: BTreeMap<String, TrackingRef>,
    /// User-entered records. Overlaid on `orders` at read time, never
    /// physically merged into it.
    #[serde(default)]
    pub manual_entries: BTreeMap<String, OrderRecord>,
}

impl LedgerState {
    // === Orders ===

    pub fn get(&self, key: &str) -> Option<&OrderRecord> {
        self.orders.get(key)
    }

    /// Insert or replace. The record's `key` field is forced to `key`.
    pub fn put(&mut self, key: impl Into<String>, mut record: OrderRecord) {
        let key = key.into();
        record.key = key.clone();
        self.orders.insert(key, record);
    }

    pub fn delete(&mut self, key: &str) -> Option<OrderRecord> {
        self.orders.remove(key)
    }

    pub fn all(&self) -> &BTreeMap<String, OrderRecord> {
        &self.orders
    }

    // === Tracking index ===

    /// Case-insensitive lookup. Returns the id as stored alongside the entry.
    pub fn tracking_get(&self, tracking_id: &str) -> Option<(&str, &TrackingRef)> {
        if let Some((id, entry)) = self.tracking_map.get_key_value(tracking_id) {
            return Some((id.as_str(), entry));
        }
        self.tracking_map
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(tracking_id))
            .map(|(id, entry)| (id.as_str(), entry))
    }

    /// Upsert, last writer wins. Any entry whose id differs only in case is
    /// replaced so one tracking number never has two entries.
    pub fn tracking_put(&mut self, tracking_id: impl Into<String>, entry: TrackingRef) {
        let tracking_id = tracking_id.into();
        self.tracking_map
            .retain(|id, _| !id.eq_ignore_ascii_case(&tracking_id));
        self.tracking_map.insert(tracking_id, entry);
    }

    pub fn tracking_delete(&mut self, tracking_id: &str) -> Option<TrackingRef> {
        let stored = self.tracking_get(tracking_id)?.0.to_string();
        self.tracking_map.remove(&stored)
    }

    pub fn tracking_all(&self) -> &BTreeMap<String, TrackingRef> {
        &self.tracking_map
    }

    /// Point every index entry referencing `from` at `to`. Returns how many moved.
    pub fn retarget_tracking(&mut self, from: &str, to: &str) -> usize {
        let mut moved = 0;
        for entry in self.tracking_map.values_mut() {
            if entry.key == from {
                entry.key = to.to_string();
                moved += 1;
            }
        }
        moved
    }

    /// Drop index entries referencing `key`. Returns how many were removed.
    pub fn drop_tracking_for(&mut self, key: &str) -> usize {
        let before = self.tracking_map.len();
        self.tracking_map.retain(|_, entry| entry.key != key);
        before - self.tracking_map.len()
    }

    // === Merged read view ===

    /// Record under `key` in the merged view; a manual entry shadows an order.
    pub fn lookup_merged(&self, key: &str) -> Option<&OrderRecord> {
        self.manual_entries.get(key).or_else(|| self.orders.get(key))
    }

    /// `orders` overlaid by `manual_entries`.
    pub fn merged_view(&self) -> BTreeMap<&str, &OrderRecord> {
        let mut view: BTreeMap<&str, &OrderRecord> = self
            .orders
            .iter()
            .map(|(k, r)| (k.as_str(), r))
            .collect();
        for (k, r) in &self.manual_entries {
            view.insert(k.as_str(), r);
        }
        view
    }
}
