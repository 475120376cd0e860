//! Deterministic per-field merge used to combine multiple pages' extracted
//! values into one record. No gateway involvement.

use serde::{Deserialize, Serialize};
use serde_json::map::Entry;
use serde_json::{Map, Value};

/// What to do when both sides hold present, non-mergeable values for the
/// same key (scalar/scalar or mismatched container types).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Earlier pages take precedence: the established value is kept.
    #[default]
    FirstWins,
    /// Later pages may overwrite established values.
    LastWins,
}

/// An absent value never overwrites anything and is never written into the
/// result. The gateway is instructed to emit the `"NA"` sentinel for fields
/// it cannot find.
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == "NA",
        _ => false,
    }
}

/// Merge `incoming` into `base`, preferring present values.
///
/// - absent incoming values are skipped;
/// - keys missing from `base` (or holding an absent value) adopt the
///   incoming value;
/// - map/map recurses, list/list appends the incoming list's non-absent
///   elements;
/// - any other present/present conflict is resolved by `policy`.
///
/// The operation is not commutative under `FirstWins`: folding pages in
/// document order is what gives earlier pages precedence.
pub fn merge_preferring_present(
    mut base: Map<String, Value>,
    incoming: Map<String, Value>,
    policy: ConflictPolicy,
) -> Map<String, Value> {
    for (key, value) in incoming {
        if is_absent(&value) {
            continue;
        }
        match base.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if is_absent(existing) {
                    *existing = value;
                } else {
                    merge_present(existing, value, policy);
                }
            }
        }
    }
    base
}

fn merge_present(existing: &mut Value, incoming: Value, policy: ConflictPolicy) {
    match (existing, incoming) {
        (Value::Object(base), Value::Object(incoming)) => {
            let merged = merge_preferring_present(std::mem::take(base), incoming, policy);
            *base = merged;
        }
        (Value::Array(base), Value::Array(incoming)) => {
            base.extend(incoming.into_iter().filter(|v| !is_absent(v)));
        }
        (existing, incoming) => {
            if policy == ConflictPolicy::LastWins {
                *existing = incoming;
            }
        }
    }
}

/// Left-to-right fold of per-page data maps, seeded with an empty map.
/// Page order, not completion order, determines merge precedence.
pub fn fold_page_data(
    pages: impl IntoIterator<Item = Map<String, Value>>,
    policy: ConflictPolicy,
) -> Map<String, Value> {
    pages.into_iter().fold(Map::new(), |merged, page| {
        merge_preferring_present(merged, page, policy)
    })
}
