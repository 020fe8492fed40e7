use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

use pesaflow_core::{ParsedTransaction, TransactionType};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no monetary amount found in message")]
    NoAmount,
}

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        pub(crate) fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Phrasing templates. `amount` is mandatory in each; `recipient` stops at
// the next sentence boundary or the "on <date>" clause.
re!(re_withdraw,
    r"(?i)\bwithdraw(?:n|al)?\s+Ksh\.?\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)\s+from\s+(?P<recipient>[^.]+?)(?:\s+on\s+\d|\s*\.|\s*$)");
re!(re_give_cash,
    r"(?i)\bgive\s+Ksh\.?\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)\s+cash\s+to\s+(?P<recipient>[^.]+?)(?:\s+on\s+\d|\s*\.|\s*$)");
re!(re_deposited,
    r"(?i)\bdeposit(?:ed)?\s+Ksh\.?\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)(?:\s+(?:to|at)\s+(?P<recipient>[^.]+?))?(?:\s+on\s+\d|\s*\.|\s*$)");
re!(re_airtime,
    r"(?i)\bbought\s+Ksh\.?\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)\s+of\s+airtime");
re!(re_buy_goods,
    r"(?i)\bbought\s+goods\s+(?:worth|of)\s+Ksh\.?\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)\s+from\s+(?P<recipient>[^.]+?)(?:\s+on\s+\d|\s*\.|\s*$)");
re!(re_paid_to,
    r"(?i)\bKsh\.?\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)\s+paid\s+to\s+(?P<recipient>[^.]+?)(?:\s+on\s+\d|\s*\.|\s*$)");
re!(re_sent_amount_first,
    r"(?i)\bKsh\.?\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)\s+sent\s+to\s+(?P<recipient>[^.]+?)(?:\s+on\s+\d|\s*\.|\s*$)");
re!(re_sent,
    r"(?i)\bsent\s+Ksh\.?\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)\s+to\s+(?P<recipient>[^.]+?)(?:\s+on\s+\d|\s*\.|\s*$)");
re!(re_received,
    r"(?i)\breceived?\s+Ksh\.?\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)\s+from\s+(?P<recipient>[^.]+?)(?:\s+on\s+\d|\s*\.|\s*$)");

// Field extractors applied to the whole message, independent of phrasing.
re!(re_any_amount,
    r"(?i)\bKsh\.?\s*([\d,]+(?:\.\d{1,2})?)");
re!(re_balance,
    r"(?i)\b(?:M-?PESA\s+)?balance\s+(?:is|was)\s+Ksh\.?\s*([\d,]+(?:\.\d{1,2})?)");
re!(re_fee,
    r"(?i)\btransaction\s+cost,?\s+Ksh\.?\s*([\d,]+(?:\.\d{1,2})?)");
re!(re_reference_confirmed,
    r"^\s*([A-Z0-9]{10})\s+(?i:confirmed)");
re!(re_reference_token,
    r"\b([A-Z0-9]{10})\b");
re!(re_datetime,
    r"(?i)\bon\s+(\d{1,2})/(\d{1,2})/(\d{2,4})(?:\s+at\s+(\d{1,2}):(\d{2})\s*([ap])\.?m\.?)?");

/// One phrasing rule: a pattern plus the transaction type it implies.
/// Evaluated in table order; the first pattern that matches wins.
struct Template {
    kind: TransactionType,
    pattern: fn() -> &'static Regex,
}

const TEMPLATES: &[Template] = &[
    Template { kind: TransactionType::Withdraw, pattern: re_withdraw },
    Template { kind: TransactionType::Deposit, pattern: re_give_cash },
    Template { kind: TransactionType::Deposit, pattern: re_deposited },
    Template { kind: TransactionType::Buy, pattern: re_airtime },
    Template { kind: TransactionType::Buy, pattern: re_buy_goods },
    Template { kind: TransactionType::Buy, pattern: re_paid_to },
    Template { kind: TransactionType::Send, pattern: re_sent_amount_first },
    Template { kind: TransactionType::Send, pattern: re_sent },
    Template { kind: TransactionType::Receive, pattern: re_received },
];

/// Parse a single free-text mobile-money message.
///
/// Errors only when no monetary amount is locatable anywhere in the text.
/// A message matching none of the known phrasings still parses to a record
/// with whatever the field extractors find.
pub fn parse_message(text: &str) -> Result<ParsedTransaction, ParseError> {
    let (amount, recipient, transaction_type) = match match_template(text) {
        Some((amount, recipient, kind)) => (amount, recipient, Some(kind)),
        None => (fallback_amount(text).ok_or(ParseError::NoAmount)?, None, None),
    };

    Ok(ParsedTransaction {
        amount,
        recipient,
        transaction_type,
        reference: extract_reference(text),
        balance: extract_balance(text),
        fee: extract_fee(text),
        timestamp: extract_timestamp(text),
        raw_message: text.to_string(),
    })
}

fn match_template(text: &str) -> Option<(Decimal, Option<String>, TransactionType)> {
    for template in TEMPLATES {
        let Some(caps) = (template.pattern)().captures(text) else {
            continue;
        };
        let Some(amount) = caps.name("amount").and_then(|m| parse_amount_str(m.as_str())) else {
            continue;
        };
        let recipient = caps
            .name("recipient")
            .map(|m| clean_name(m.as_str()))
            .filter(|name| !name.is_empty());
        return Some((amount, recipient, template.kind));
    }
    None
}

/// First currency amount that is not the stated balance or fee figure.
fn fallback_amount(text: &str) -> Option<Decimal> {
    let taken: Vec<std::ops::Range<usize>> = [re_balance(), re_fee()]
        .iter()
        .filter_map(|re| re.find(text).map(|m| m.range()))
        .collect();

    re_any_amount()
        .captures_iter(text)
        .filter_map(|c| {
            let whole = c.get(0)?.range();
            let value = parse_amount_str(c.get(1)?.as_str())?;
            Some((whole, value))
        })
        .find(|(r, _)| !taken.iter().any(|t| t.start <= r.start && r.end <= t.end))
        .map(|(_, value)| value)
}

// ── Field extractors ─────────────────────────────────────────────────────────

pub(crate) fn extract_reference(text: &str) -> Option<String> {
    if let Some(c) = re_reference_confirmed().captures(text) {
        return Some(c.get(1)?.as_str().to_string());
    }
    // Standalone token fallback: 10 chars, must mix letters and digits so
    // plain words and plain numbers never qualify.
    re_reference_token()
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|t| looks_like_reference(t))
        .map(|t| t.to_string())
}

pub(crate) fn looks_like_reference(token: &str) -> bool {
    token.len() == 10
        && token.chars().any(|c| c.is_ascii_digit())
        && token.chars().any(|c| c.is_ascii_uppercase())
        && token.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn extract_balance(text: &str) -> Option<Decimal> {
    let c = re_balance().captures(text)?;
    parse_amount_str(c.get(1)?.as_str())
}

fn extract_fee(text: &str) -> Option<Decimal> {
    let c = re_fee().captures(text)?;
    parse_amount_str(c.get(1)?.as_str())
}

/// Day-first slash date with an optional 12-hour clock, e.g.
/// "on 15/1/24 at 10:30 AM". A date without a time parses to midnight.
pub(crate) fn extract_timestamp(text: &str) -> Option<NaiveDateTime> {
    for c in re_datetime().captures_iter(text) {
        let day: u32 = c.get(1)?.as_str().parse().ok()?;
        let month: u32 = c.get(2)?.as_str().parse().ok()?;
        let year = expand_year(c.get(3)?.as_str().parse().ok()?);
        let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
            continue;
        };
        let time = match (c.get(4), c.get(5), c.get(6)) {
            (Some(h), Some(m), Some(half)) => {
                let hour: u32 = h.as_str().parse().ok()?;
                let minute: u32 = m.as_str().parse().ok()?;
                to_24h(hour, half.as_str()).and_then(|h24| NaiveTime::from_hms_opt(h24, minute, 0))
            }
            _ => NaiveTime::from_hms_opt(0, 0, 0),
        };
        if let Some(time) = time {
            return Some(NaiveDateTime::new(date, time));
        }
    }
    None
}

fn to_24h(hour: u32, half: &str) -> Option<u32> {
    if hour == 0 || hour > 12 {
        return None;
    }
    let pm = half.eq_ignore_ascii_case("p");
    Some(match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    })
}

pub(crate) fn expand_year(y: i32) -> i32 {
    if y < 100 {
        2000 + y
    } else {
        y
    }
}

// ── Amount and name helpers ───────────────────────────────────────────────────

pub(crate) fn parse_amount_str(s: &str) -> Option<Decimal> {
    let clean = s.replace(',', "");
    Decimal::from_str(&clean).ok()
}

pub(crate) fn clean_name(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
