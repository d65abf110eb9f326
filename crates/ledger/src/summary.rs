use std::cmp::Ordering;

use serde::Serialize;

use crate::model::{non_empty, OrderRecord, Source};
use crate::store::LedgerState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    /// Records in the merged view.
    pub orders: usize,
    pub with_tracking: usize,
    pub manual: usize,
}

/// Compute summary counts over the merged view.
pub fn compute_stats(state: &LedgerState) -> LedgerStats {
    let view = state.merged_view();
    LedgerStats {
        orders: view.len(),
        with_tracking: view.values().filter(|r| r.has_tracking()).count(),
        manual: state.manual_entries.len(),
    }
}

/// Merged view, most recently updated first. Ties fall back to the newer
/// order date, then the key.
pub fn list(state: &LedgerState) -> Vec<OrderRecord> {
    let mut records: Vec<OrderRecord> = state.merged_view().into_values().cloned().collect();
    records.sort_by(recency);
    records
}

fn recency(a: &OrderRecord, b: &OrderRecord) -> Ordering {
    b.last_updated
        .cmp(&a.last_updated)
        .then_with(|| b.order_date.cmp(&a.order_date))
        .then_with(|| a.key.cmp(&b.key))
}

/// Case-insensitive substring search over order id, tracking id, carrier and
/// item names. An empty query returns everything.
pub fn search(state: &LedgerState, query: &str) -> Vec<OrderRecord> {
    let query = query.trim().to_lowercase();
    let mut hits = list(state);
    if !query.is_empty() {
        hits.retain(|r| searchable_text(r).contains(&query));
    }
    hits
}

fn searchable_text(record: &OrderRecord) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(id) = non_empty(&record.order_id) {
        parts.push(id);
    }
    if let Some(id) = non_empty(&record.tracking_id) {
        parts.push(id);
    }
    if let Some(carrier) = record.carrier {
        parts.push(carrier.label());
    }
    parts.extend(record.items.iter().map(|i| i.name.as_str()));
    parts.join(" ").to_lowercase()
}

/// Heading for a record: its order id, else the key unless it is a
/// synthetic `{source}-...` key, else the source label.
pub fn display_label(record: &OrderRecord) -> String {
    if let Some(id) = non_empty(&record.order_id) {
        return id.to_string();
    }
    let synthetic = [Source::Amazon, Source::Ebay, Source::Manual]
        .iter()
        .any(|s| record.key.starts_with(&format!("{}-", s.as_str())));
    if !record.key.is_empty() && !synthetic {
        return record.key.clone();
    }
    record.source.label().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Carrier, Item};
    use chrono::{Duration, Utc};

    fn state() -> LedgerState {
        let now = Utc::now();
        let mut state = LedgerState::default();

        let mut a = OrderRecord::new("111-1", Source::Amazon, now - Duration::hours(2));
        a.order_id = Some("111-1".into());
        a.items.push(Item::new("USB Cable", 2));
        state.put("111-1", a);

        let mut b = OrderRecord::new("ebay-VintageLens", Source::Ebay, now);
        b.tracking_id = Some("9400111".into());
        b.carrier = Some(Carrier::Usps);
        b.items.push(Item::new("Vintage Lens", 1));
        state.put("ebay-VintageLens", b);

        let mut m = OrderRecord::new("1ZMANUAL", Source::Manual, now - Duration::hours(1));
        m.tracking_id = Some("1ZMANUAL".into());
        state.manual_entries.insert("1ZMANUAL".into(), m);
        state
    }

    #[test]
    fn stats_counts() {
        let stats = compute_stats(&state());
        assert_eq!(stats, LedgerStats { orders: 3, with_tracking: 2, manual: 1 });
    }

    #[test]
    fn list_most_recent_first() {
        let keys: Vec<String> = list(&state()).into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["ebay-VintageLens", "1ZMANUAL", "111-1"]);
    }

    #[test]
    fn search_fields() {
        let s = state();
        assert_eq!(search(&s, "usps")[0].key, "ebay-VintageLens");
        assert_eq!(search(&s, "usb cable")[0].key, "111-1");
        assert_eq!(search(&s, "1zman").len(), 1);
        assert_eq!(search(&s, "").len(), 3);
        assert!(search(&s, "nothing like this").is_empty());
    }

    #[test]
    fn labels() {
        let s = state();
        assert_eq!(display_label(s.get("111-1").unwrap()), "111-1");
        assert_eq!(display_label(s.get("ebay-VintageLens").unwrap()), "eBay Order");
        assert_eq!(display_label(&s.manual_entries["1ZMANUAL"]), "1ZMANUAL");
    }
}
