use pesaflow_core::StoredTransaction;

const UNCATEGORIZED: &str = "Uncategorized";

/// Infer the most probable category for a counterparty by majority vote
/// over transaction history.
///
/// Matching is exact on the normalized (trimmed, lowercased) name — no
/// substring matching here, unlike the duplicate detector. "Uncategorized"
/// is excluded from the vote whenever any other category is present. Ties
/// resolve to the first-seen category.
pub fn resolve_category(recipient: &str, history: &[StoredTransaction]) -> Option<String> {
    let target = recipient.trim().to_lowercase();
    if target.is_empty() {
        return None;
    }

    // Vec-based tally keeps first-seen order, which the tie-break depends on.
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for tx in history {
        let Some(name) = tx.recipient.as_deref() else {
            continue;
        };
        if name.trim().to_lowercase() != target {
            continue;
        }
        match tally.iter_mut().find(|(cat, _)| *cat == tx.category.as_str()) {
            Some((_, count)) => *count += 1,
            None => tally.push((tx.category.as_str(), 1)),
        }
    }

    let has_named_category = tally
        .iter()
        .any(|(cat, _)| !cat.eq_ignore_ascii_case(UNCATEGORIZED));

    let mut winner: Option<(&str, usize)> = None;
    for &(cat, count) in &tally {
        if has_named_category && cat.eq_ignore_ascii_case(UNCATEGORIZED) {
            continue;
        }
        match winner {
            Some((_, best)) if count <= best => {}
            _ => winner = Some((cat, count)),
        }
    }

    winner.map(|(cat, _)| cat.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn tx(recipient: &str, category: &str) -> StoredTransaction {
        StoredTransaction {
            id: 0,
            amount: Decimal::from(100),
            recipient: Some(recipient.to_string()),
            category: category.to_string(),
            reference: None,
            timestamp: None,
        }
    }

    #[test]
    fn majority_vote_wins() {
        let history = vec![
            tx("Naivas", "Food"),
            tx("Naivas", "Food"),
            tx("Naivas", "Uncategorized"),
        ];
        assert_eq!(resolve_category("Naivas", &history).as_deref(), Some("Food"));
    }

    #[test]
    fn uncategorized_excluded_when_alternatives_exist() {
        // Even a losing named category beats "Uncategorized".
        let history = vec![
            tx("Naivas", "Uncategorized"),
            tx("Naivas", "Uncategorized"),
            tx("Naivas", "Food"),
        ];
        assert_eq!(resolve_category("Naivas", &history).as_deref(), Some("Food"));
    }

    #[test]
    fn uncategorized_returned_when_it_is_all_there_is() {
        let history = vec![tx("Naivas", "Uncategorized")];
        assert_eq!(
            resolve_category("Naivas", &history).as_deref(),
            Some("Uncategorized")
        );
    }

    #[test]
    fn empty_recipient_is_none() {
        assert_eq!(resolve_category("", &[tx("Naivas", "Food")]), None);
        assert_eq!(resolve_category("   ", &[tx("Naivas", "Food")]), None);
    }

    #[test]
    fn no_matching_history_is_none() {
        assert_eq!(resolve_category("Quickmart", &[tx("Naivas", "Food")]), None);
    }

    #[test]
    fn matching_is_exact_not_substring() {
        let history = vec![tx("Naivas Westlands", "Food")];
        assert_eq!(resolve_category("Naivas", &history), None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let history = vec![tx("NAIVAS", "Food")];
        assert_eq!(resolve_category("naivas", &history).as_deref(), Some("Food"));
    }

    #[test]
    fn tie_among_named_categories_keeps_first_seen() {
        let history = vec![
            tx("Naivas", "Food"),
            tx("Naivas", "Household"),
            tx("Naivas", "Household"),
            tx("Naivas", "Food"),
        ];
        assert_eq!(resolve_category("Naivas", &history).as_deref(), Some("Food"));
    }

    #[test]
    fn history_with_missing_recipient_is_skipped() {
        let mut anonymous = tx("ignored", "Food");
        anonymous.recipient = None;
        assert_eq!(resolve_category("ignored", &[anonymous]), None);
    }
}
