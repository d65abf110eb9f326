use crate::model::OrderRecord;
use crate::store::LedgerState;

/// Record for a tracking number, case-insensitive, over orders plus manual
/// entries. The tracking index is authoritative; the record scan only
/// covers entries written without one.
pub fn find_by_tracking<'a>(state: &'a LedgerState, tracking_id: &str) -> Option<&'a OrderRecord> {
    let id = tracking_id.trim();
    if id.is_empty() {
        return None;
    }

    state
        .tracking_map
        .iter()
        .filter(|(indexed, _)| indexed.eq_ignore_ascii_case(id))
        .find_map(|(_, entry)| state.lookup_merged(&entry.key))
        .or_else(|| {
            state
                .merged_view()
                .into_values()
                .find(|r| r.tracking_matches(id))
        })
}

/// The subset of `tracking_ids` (e.g. every number visible on a page) that the
/// ledger already knows about, in input order.
pub fn known_tracking<S: AsRef<str>>(state: &LedgerState, tracking_ids: &[S]) -> Vec<String> {
    tracking_ids
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .filter(|t| state.tracking_get(t).is_some() || find_by_tracking(state, t).is_some())
        .map(str::to_string)
        .collect()
}
