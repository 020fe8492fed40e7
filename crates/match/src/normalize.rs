use std::sync::OnceLock;

use regex::Regex;

/// Embedded subscriber numbers as they appear next to counterparty names.
fn re_phone() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\b\d{9,10}\b").expect("invalid regex"))
}

/// Trim, lowercase, strip embedded phone numbers, collapse whitespace.
pub(crate) fn normalize_name(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    let stripped = re_phone().replace_all(&lowered, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NameMatch {
    Exact,
    Partial,
    None,
}

/// Compare two already-normalized names. Exact equality matches at any
/// (non-empty) length; substring containment in either direction requires
/// both sides to clear `min_partial_len`, so very short names never match
/// partially.
pub(crate) fn compare_names(a: &str, b: &str, min_partial_len: usize) -> NameMatch {
    if a.is_empty() || b.is_empty() {
        return NameMatch::None;
    }
    if a == b {
        return NameMatch::Exact;
    }
    if a.len() >= min_partial_len
        && b.len() >= min_partial_len
        && (a.contains(b) || b.contains(a))
    {
        return NameMatch::Partial;
    }
    NameMatch::None
}
