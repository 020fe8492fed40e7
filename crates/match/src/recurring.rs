use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pesaflow_core::{Frequency, ParsedTransaction, RecurringObligation};

use crate::config::RecurringConfig;
use crate::normalize::{compare_names, normalize_name, NameMatch};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for MatchConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchConfidence::Low => write!(f, "low"),
            MatchConfidence::Medium => write!(f, "medium"),
            MatchConfidence::High => write!(f, "high"),
        }
    }
}

/// Best recurring-obligation match for one parsed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringMatch {
    pub confidence: MatchConfidence,
    pub obligation_id: Option<i64>,
    /// Inferred expense name — the obligation's name, or the resolved
    /// recipient when nothing matched.
    pub name: String,
    pub expected_amount: Decimal,
    pub last_paid: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    /// 0–100, rounded to the nearest integer.
    pub score: u32,
}

pub struct RecurringMatcher {
    config: RecurringConfig,
}

impl Default for RecurringMatcher {
    fn default() -> Self {
        Self::new(RecurringConfig::default())
    }
}

impl RecurringMatcher {
    pub fn new(config: RecurringConfig) -> Self {
        Self { config }
    }

    /// Score every obligation and return the best one, or a zero-score
    /// low-confidence result when none clears the minimum. `as_of` is the
    /// caller's "today" — injected so the computation stays pure.
    ///
    /// Ties keep the first-seen obligation.
    pub fn match_transaction(
        &self,
        parsed: &ParsedTransaction,
        resolved_recipient: &str,
        suggested_category: Option<&str>,
        obligations: &[RecurringObligation],
        as_of: NaiveDate,
    ) -> RecurringMatch {
        let target = normalize_name(resolved_recipient);

        let mut best: Option<(f64, &RecurringObligation)> = None;
        for obligation in obligations {
            let score = self.score_obligation(&target, parsed, suggested_category, obligation, as_of);
            if score < self.config.min_score {
                continue;
            }
            match best {
                Some((best_score, _)) if score <= best_score => {}
                _ => best = Some((score, obligation)),
            }
        }

        match best {
            Some((score, obligation)) => {
                let rounded = score.round() as u32;
                RecurringMatch {
                    confidence: confidence_for(rounded),
                    obligation_id: Some(obligation.id),
                    name: obligation.name.clone(),
                    expected_amount: obligation.expected_amount,
                    last_paid: obligation.last_paid,
                    frequency: obligation.frequency,
                    score: rounded,
                }
            }
            None => RecurringMatch {
                confidence: MatchConfidence::Low,
                obligation_id: None,
                name: resolved_recipient.to_string(),
                expected_amount: parsed.amount,
                last_paid: None,
                frequency: None,
                score: 0,
            },
        }
    }

    fn score_obligation(
        &self,
        target: &str,
        parsed: &ParsedTransaction,
        suggested_category: Option<&str>,
        obligation: &RecurringObligation,
        as_of: NaiveDate,
    ) -> f64 {
        let mut score = 0.0;

        // Counterparty identity is the strongest behavioral signal.
        match compare_names(
            target,
            &normalize_name(&obligation.recipient),
            self.config.min_recipient_len,
        ) {
            NameMatch::Exact => score += 40.0,
            NameMatch::Partial => score += 20.0,
            NameMatch::None => {}
        }

        if let Some(category) = suggested_category {
            if category.eq_ignore_ascii_case(&obligation.category) {
                score += 20.0;
            }
        }

        score += self.amount_points(parsed.amount, obligation.expected_amount);
        score += self.due_score(obligation, as_of) * 20.0;

        score
    }

    fn amount_points(&self, amount: Decimal, expected: Decimal) -> f64 {
        if expected.is_zero() {
            return if amount.is_zero() { 20.0 } else { 0.0 };
        }
        let ratio = ((amount - expected).abs() / expected.abs())
            .to_f64()
            .unwrap_or(f64::MAX);
        if ratio <= self.config.tight_amount_pct {
            20.0
        } else if ratio <= self.config.loose_amount_pct {
            10.0
        } else {
            0.0
        }
    }

    /// How overdue the obligation is, scaled 0.0–1.0. Neutral 0.5 when the
    /// payment history is unknown. The grace window keeps an almost-due
    /// obligation competitive without outranking an overdue one.
    fn due_score(&self, obligation: &RecurringObligation, as_of: NaiveDate) -> f64 {
        let (Some(last_paid), Some(frequency)) = (obligation.last_paid, obligation.frequency)
        else {
            return 0.5;
        };
        let interval = frequency.interval_days() as f64;
        let days_since = (as_of - last_paid).num_days() as f64;
        if days_since < 0.0 {
            return 0.0;
        }
        if days_since >= interval {
            1.0
        } else if days_since >= interval * (1.0 - self.config.grace_fraction) {
            0.8
        } else {
            0.6 * (days_since / interval)
        }
    }
}

fn confidence_for(score: u32) -> MatchConfidence {
    if score >= 80 {
        MatchConfidence::High
    } else if score >= 60 {
        MatchConfidence::Medium
    } else {
        MatchConfidence::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parsed(amount: i64) -> ParsedTransaction {
        ParsedTransaction::bare(Decimal::from(amount), "test")
    }

    fn obligation(
        id: i64,
        recipient: &str,
        amount: i64,
        last_paid: Option<NaiveDate>,
        frequency: Option<Frequency>,
    ) -> RecurringObligation {
        RecurringObligation {
            id,
            name: recipient.to_string(),
            recipient: recipient.to_string(),
            expected_amount: Decimal::from(amount),
            category: "Bills".to_string(),
            last_paid,
            frequency,
        }
    }

    #[test]
    fn overdue_monthly_subscription_matches() {
        let matcher = RecurringMatcher::default();
        let as_of = date(2024, 2, 2);
        let result = matcher.match_transaction(
            &parsed(1100),
            "Netflix",
            None,
            &[obligation(7, "Netflix", 1000, Some(date(2024, 1, 1)), Some(Frequency::Monthly))],
            as_of,
        );
        // Recipient 40 + amount 20 (diff 100 is exactly 10%) + due 20.
        assert_eq!(result.score, 80);
        assert_eq!(result.confidence, MatchConfidence::High);
        assert_eq!(result.obligation_id, Some(7));
        assert_eq!(result.name, "Netflix");
        assert_eq!(result.frequency, Some(Frequency::Monthly));
    }

    #[test]
    fn no_obligations_is_zero_score_low() {
        let matcher = RecurringMatcher::default();
        let result = matcher.match_transaction(&parsed(500), "Netflix", None, &[], date(2024, 1, 1));
        assert_eq!(result.score, 0);
        assert_eq!(result.confidence, MatchConfidence::Low);
        assert!(result.obligation_id.is_none());
        assert_eq!(result.name, "Netflix");
        assert_eq!(result.expected_amount, Decimal::from(500));
    }

    #[test]
    fn below_minimum_score_is_no_match() {
        let matcher = RecurringMatcher::default();
        // Unrelated recipient, wrong amount, unknown schedule: 10 points.
        let result = matcher.match_transaction(
            &parsed(99),
            "Totally Unrelated",
            None,
            &[obligation(1, "Netflix", 1000, None, None)],
            date(2024, 1, 1),
        );
        assert_eq!(result.score, 0);
        assert!(result.obligation_id.is_none());
    }

    #[test]
    fn amount_tolerance_boundaries() {
        let matcher = RecurringMatcher::default();
        let expected = Decimal::from(2500);
        // Exact amount.
        assert_eq!(matcher.amount_points(Decimal::from(2500), expected), 20.0);
        // Exactly 10% off is still the tight tier (inclusive).
        assert_eq!(matcher.amount_points(Decimal::from(2750), expected), 20.0);
        // One unit past 10% drops to the loose tier.
        assert_eq!(matcher.amount_points(Decimal::from(2751), expected), 10.0);
        // Past 20% scores nothing.
        assert_eq!(matcher.amount_points(Decimal::from(3001), expected), 0.0);
    }

    #[test]
    fn recipient_similarity_is_monotonic() {
        let matcher = RecurringMatcher::default();
        let obligations = |name: &str| {
            vec![obligation(1, name, 1000, Some(date(2024, 1, 1)), Some(Frequency::Monthly))]
        };
        let as_of = date(2024, 2, 2);
        let none = matcher
            .match_transaction(&parsed(1000), "Zuku Fiber", None, &obligations("Netflix"), as_of)
            .score;
        let partial = matcher
            .match_transaction(&parsed(1000), "Netflix Kenya", None, &obligations("Netflix"), as_of)
            .score;
        let exact = matcher
            .match_transaction(&parsed(1000), "Netflix", None, &obligations("Netflix"), as_of)
            .score;
        assert!(none <= partial);
        assert!(partial <= exact);
    }

    #[test]
    fn category_match_adds_twenty() {
        let matcher = RecurringMatcher::default();
        let obligations =
            vec![obligation(1, "Netflix", 1000, Some(date(2024, 1, 1)), Some(Frequency::Monthly))];
        let as_of = date(2024, 2, 2);
        let without = matcher
            .match_transaction(&parsed(1000), "Netflix", None, &obligations, as_of)
            .score;
        let with = matcher
            .match_transaction(&parsed(1000), "Netflix", Some("Bills"), &obligations, as_of)
            .score;
        assert_eq!(with, without + 20);
        assert_eq!(with, 100);
    }

    #[test]
    fn due_score_neutral_when_schedule_unknown() {
        let matcher = RecurringMatcher::default();
        let ob = obligation(1, "Netflix", 1000, None, None);
        assert_eq!(matcher.due_score(&ob, date(2024, 1, 1)), 0.5);
        let ob = obligation(1, "Netflix", 1000, Some(date(2024, 1, 1)), None);
        assert_eq!(matcher.due_score(&ob, date(2024, 2, 1)), 0.5);
    }

    #[test]
    fn due_score_tiers() {
        let matcher = RecurringMatcher::default();
        let ob = |last: NaiveDate| obligation(1, "x", 0, Some(last), Some(Frequency::Monthly));
        let as_of = date(2024, 1, 31);
        // 31 days since — overdue.
        assert_eq!(matcher.due_score(&ob(date(2023, 12, 31)), as_of), 1.0);
        // 25 days since — inside the 20% grace window (24..30).
        assert_eq!(matcher.due_score(&ob(date(2024, 1, 6)), as_of), 0.8);
        // 15 days since — halfway, linear ramp: 0.6 * 0.5.
        assert!((matcher.due_score(&ob(date(2024, 1, 16)), as_of) - 0.3).abs() < 1e-9);
        // Paid "in the future" clamps to zero.
        assert_eq!(matcher.due_score(&ob(date(2024, 2, 10)), as_of), 0.0);
    }

    #[test]
    fn ties_keep_first_seen_obligation() {
        let matcher = RecurringMatcher::default();
        let obligations = vec![
            obligation(1, "Netflix", 1000, Some(date(2024, 1, 1)), Some(Frequency::Monthly)),
            obligation(2, "Netflix", 1000, Some(date(2024, 1, 1)), Some(Frequency::Monthly)),
        ];
        let result = matcher.match_transaction(
            &parsed(1000),
            "Netflix",
            None,
            &obligations,
            date(2024, 2, 2),
        );
        assert_eq!(result.obligation_id, Some(1));
    }

    #[test]
    fn short_name_partial_guard_applies() {
        let matcher = RecurringMatcher::default();
        // "Jo" must not partial-match "John's Rent"; only the neutral due
        // score remains, which is below the minimum.
        let result = matcher.match_transaction(
            &parsed(1),
            "Jo",
            None,
            &[obligation(1, "John's Rent", 20000, None, None)],
            date(2024, 1, 1),
        );
        assert!(result.obligation_id.is_none());
        assert_eq!(result.score, 0);
    }

    #[test]
    fn score_confidence_tiers() {
        assert_eq!(confidence_for(100), MatchConfidence::High);
        assert_eq!(confidence_for(80), MatchConfidence::High);
        assert_eq!(confidence_for(79), MatchConfidence::Medium);
        assert_eq!(confidence_for(60), MatchConfidence::Medium);
        assert_eq!(confidence_for(59), MatchConfidence::Low);
        assert_eq!(confidence_for(40), MatchConfidence::Low);
    }
}
