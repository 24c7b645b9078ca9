//! Named character reference lookup.

mod table;

use table::NAMED_REFS;

/// Replacement text for a named reference, given without `&` and `;`.
pub fn lookup(name: &str) -> Option<&'static str> {
    NAMED_REFS
        .binary_search_by(|(key, _)| (*key).cmp(name))
        .ok()
        .map(|idx| NAMED_REFS[idx].1)
}

pub fn is_named_ref(name: &str) -> bool {
    lookup(name).is_some()
}
