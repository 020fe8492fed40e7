use serde::{Deserialize, Serialize};

use pesaflow_core::{ParsedTransaction, StoredTransaction};

use crate::config::DuplicateConfig;
use crate::normalize::{compare_names, normalize_name, NameMatch};

/// Ranked duplicate confidence. Derived ordering is total:
/// `None < Possible < Likely < Exact`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateConfidence {
    None,
    Possible,
    Likely,
    Exact,
}

impl std::fmt::Display for DuplicateConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateConfidence::None => write!(f, "none"),
            DuplicateConfidence::Possible => write!(f, "possible"),
            DuplicateConfidence::Likely => write!(f, "likely"),
            DuplicateConfidence::Exact => write!(f, "exact"),
        }
    }
}

/// One candidate that matched, with the signals that made it match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub transaction_id: i64,
    pub confidence: DuplicateConfidence,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub is_duplicate: bool,
    /// Sorted by confidence, descending; stable within a tier.
    pub matches: Vec<DuplicateMatch>,
    pub highest_confidence: DuplicateConfidence,
}

pub struct DuplicateDetector {
    config: DuplicateConfig,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DuplicateConfig::default())
    }
}

impl DuplicateDetector {
    pub fn new(config: DuplicateConfig) -> Self {
        Self { config }
    }

    /// Compare a newly parsed transaction against previously stored ones.
    /// Advisory only — the caller decides what to do with each tier.
    pub fn detect(
        &self,
        parsed: &ParsedTransaction,
        existing: &[StoredTransaction],
    ) -> DuplicateReport {
        let parsed_name = parsed.recipient.as_deref().map(normalize_name);
        let parsed_reference = parsed.reference.as_deref().map(normalize_reference);

        let mut matches: Vec<DuplicateMatch> = existing
            .iter()
            .filter_map(|candidate| {
                self.score_candidate(
                    parsed,
                    parsed_name.as_deref(),
                    parsed_reference.as_deref(),
                    candidate,
                )
            })
            .collect();

        matches.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        let highest_confidence = matches
            .first()
            .map(|m| m.confidence)
            .unwrap_or(DuplicateConfidence::None);

        DuplicateReport {
            is_duplicate: !matches.is_empty(),
            matches,
            highest_confidence,
        }
    }

    fn score_candidate(
        &self,
        parsed: &ParsedTransaction,
        parsed_name: Option<&str>,
        parsed_reference: Option<&str>,
        candidate: &StoredTransaction,
    ) -> Option<DuplicateMatch> {
        // Reference equality is authoritative; fuzzy signals are skipped.
        if let (Some(a), Some(b)) = (
            parsed_reference,
            candidate.reference.as_deref().map(normalize_reference),
        ) {
            if a == b {
                return Some(DuplicateMatch {
                    transaction_id: candidate.id,
                    confidence: DuplicateConfidence::Exact,
                    reasons: vec!["reference code matches".to_string()],
                });
            }
        }

        let amount_ok = (parsed.amount - candidate.amount).abs() < self.config.amount_tolerance;
        let date_ok = match (parsed.timestamp, candidate.timestamp) {
            (Some(a), Some(b)) => (a - b).num_days().abs() <= self.config.date_window_days,
            _ => false,
        };
        let recipient_ok = match (parsed_name, candidate.recipient.as_deref()) {
            (Some(a), Some(b)) => {
                compare_names(a, &normalize_name(b), self.config.min_recipient_len)
                    != NameMatch::None
            }
            _ => false,
        };

        let confidence = match (amount_ok, date_ok, recipient_ok) {
            (true, true, true) => DuplicateConfidence::Likely,
            (true, true, false) | (true, false, true) => DuplicateConfidence::Possible,
            _ => return None,
        };

        let mut reasons = Vec::new();
        if amount_ok {
            reasons.push("amount matches".to_string());
        }
        if date_ok {
            reasons.push("date matches".to_string());
        }
        if recipient_ok {
            reasons.push("recipient matches".to_string());
        }

        Some(DuplicateMatch {
            transaction_id: candidate.id,
            confidence,
            reasons,
        })
    }
}

fn normalize_reference(s: &str) -> String {
    s.trim().to_lowercase()
}
