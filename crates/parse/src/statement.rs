use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;

use pesaflow_core::{ParsedTransaction, TransactionType};

use crate::message::{
    clean_name, expand_year, looks_like_reference, parse_amount_str, parse_message,
};

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_record_start, r"^([A-Z0-9]{10})\b");
re!(re_money, r"-?[\d,]+\.\d{2}\b");
re!(re_iso_datetime,
    r"\b(\d{4})-(\d{2})-(\d{2})(?:[ T](\d{2}):(\d{2}):(\d{2}))?\b");
re!(re_slash_date, r"\b(\d{1,2})/(\d{1,2})/(\d{2,4})\b");

// Ledger-export furniture: page breaks, repeated column headers, preamble.
re!(re_page_marker, r"(?i)^page\s+\d+(\s+of\s+\d+)?$");
re!(re_column_header, r"(?i)^receipt\s+no\b");
re!(re_preamble,
    r"(?i)^(m-?pesa\s+statement|statement\s+period|customer\s+name|mobile\s+number|email|date\s+of\s+statement|disclaimer)\b");

// Details-column phrasings. Recipient runs to the status token or the first
// money column.
re!(re_row_received,
    r"(?i)\bfunds\s+received\s+from\s+(?P<recipient>.+?)(?:\s+(?:completed|failed)\b|\s+-?[\d,]+\.\d{2}|\s*$)");
re!(re_row_transfer,
    r"(?i)\bcustomer\s+transfer(?:\s+of\s+funds)?\s+to\s+(?P<recipient>.+?)(?:\s+(?:completed|failed)\b|\s+-?[\d,]+\.\d{2}|\s*$)");
re!(re_row_merchant,
    r"(?i)\bmerchant\s+payment(?:\s+online)?\s+to\s+(?P<recipient>.+?)(?:\s+(?:completed|failed)\b|\s+-?[\d,]+\.\d{2}|\s*$)");
re!(re_row_paybill,
    r"(?i)\bpay\s*bill(?:\s+online)?\s+to\s+(?P<recipient>.+?)(?:\s+(?:completed|failed)\b|\s+-?[\d,]+\.\d{2}|\s*$)");
re!(re_row_withdrawal,
    r"(?i)\bcustomer\s+withdrawal\s+(?:at|from)\s+(?P<recipient>.+?)(?:\s+(?:completed|failed)\b|\s+-?[\d,]+\.\d{2}|\s*$)");
re!(re_row_deposit,
    r"(?i)\bdeposit\s+of\s+funds\s+at\s+(?P<recipient>.+?)(?:\s+(?:completed|failed)\b|\s+-?[\d,]+\.\d{2}|\s*$)");
re!(re_row_airtime, r"(?i)\bairtime\s+purchase\b");

struct RowRule {
    kind: TransactionType,
    pattern: fn() -> &'static Regex,
}

const ROW_RULES: &[RowRule] = &[
    RowRule { kind: TransactionType::Receive, pattern: re_row_received },
    RowRule { kind: TransactionType::Send, pattern: re_row_transfer },
    RowRule { kind: TransactionType::Buy, pattern: re_row_merchant },
    RowRule { kind: TransactionType::Buy, pattern: re_row_paybill },
    RowRule { kind: TransactionType::Withdraw, pattern: re_row_withdrawal },
    RowRule { kind: TransactionType::Deposit, pattern: re_row_deposit },
    RowRule { kind: TransactionType::Buy, pattern: re_row_airtime },
];

/// Parse a multi-transaction exported statement.
///
/// Never fails: a statement with zero recognizable transactions returns an
/// empty vec. Records come back in document order. Segments that yield no
/// amount are dropped individually.
pub fn parse_statement(text: &str) -> Vec<ParsedTransaction> {
    let mut records: Vec<String> = Vec::new();
    let mut current: Option<String> = None;
    let mut saw_marker = false;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || is_furniture(line) {
            continue;
        }
        if is_record_start(line) {
            saw_marker = true;
            if let Some(record) = current.take() {
                records.push(record);
            }
            current = Some(line.to_string());
        } else if let Some(record) = current.as_mut() {
            // Wrapped detail line — belongs to the open record.
            record.push(' ');
            record.push_str(line);
        }
    }
    if let Some(record) = current.take() {
        records.push(record);
    }

    // No receipt-row markers at all: treat the text as a message dump.
    if !saw_marker {
        return parse_message_dump(text);
    }

    let total = records.len();
    let parsed: Vec<ParsedTransaction> = records
        .iter()
        .filter_map(|record| {
            let tx = parse_record(record);
            if tx.is_none() {
                tracing::debug!(segment = %record, "dropping statement row without amount");
            }
            tx
        })
        .collect();
    tracing::debug!(rows = total, parsed = parsed.len(), "statement parse complete");
    parsed
}

fn is_furniture(line: &str) -> bool {
    re_page_marker().is_match(line)
        || re_column_header().is_match(line)
        || re_preamble().is_match(line)
}

fn is_record_start(line: &str) -> bool {
    let Some(m) = re_record_start().captures(line).and_then(|c| c.get(1)) else {
        return false;
    };
    if !looks_like_reference(m.as_str()) {
        return false;
    }
    // SMS confirmations also open with a receipt code ("SAB… Confirmed.");
    // those belong to the message grammar, not the row grammar.
    let rest = line[m.end()..].trim_start();
    !rest
        .get(..9)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("confirmed"))
}

fn parse_record(record: &str) -> Option<ParsedTransaction> {
    let amounts: Vec<Decimal> = re_money()
        .find_iter(record)
        .filter_map(|m| parse_amount_str(m.as_str()))
        .collect();

    // Withdrawn-column figures are printed negative; amounts are stored
    // absolute, direction lives in the transaction type.
    let amount = amounts.first()?.abs();
    let balance = if amounts.len() >= 2 {
        amounts.last().map(|d| d.abs())
    } else {
        None
    };

    let reference = record
        .split_whitespace()
        .next()
        .filter(|t| looks_like_reference(t))
        .map(String::from);

    let (transaction_type, recipient) = classify_row(record);

    Some(ParsedTransaction {
        amount,
        recipient,
        transaction_type,
        reference,
        balance,
        fee: None,
        timestamp: extract_row_timestamp(record),
        raw_message: record.to_string(),
    })
}

fn classify_row(record: &str) -> (Option<TransactionType>, Option<String>) {
    for rule in ROW_RULES {
        if let Some(caps) = (rule.pattern)().captures(record) {
            let recipient = caps
                .name("recipient")
                .map(|m| clean_name(m.as_str()))
                .filter(|name| !name.is_empty());
            return (Some(rule.kind), recipient);
        }
    }
    (None, None)
}

/// ISO completion time ("2024-01-15 10:30:45") preferred, day-first slash
/// date as the fallback.
fn extract_row_timestamp(record: &str) -> Option<NaiveDateTime> {
    if let Some(c) = re_iso_datetime().captures(record) {
        let year: i32 = c.get(1)?.as_str().parse().ok()?;
        let month: u32 = c.get(2)?.as_str().parse().ok()?;
        let day: u32 = c.get(3)?.as_str().parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = match (c.get(4), c.get(5), c.get(6)) {
            (Some(h), Some(m), Some(s)) => NaiveTime::from_hms_opt(
                h.as_str().parse().ok()?,
                m.as_str().parse().ok()?,
                s.as_str().parse().ok()?,
            ),
            _ => NaiveTime::from_hms_opt(0, 0, 0),
        }?;
        return Some(NaiveDateTime::new(date, time));
    }

    let c = re_slash_date().captures(record)?;
    let day: u32 = c.get(1)?.as_str().parse().ok()?;
    let month: u32 = c.get(2)?.as_str().parse().ok()?;
    let year = expand_year(c.get(3)?.as_str().parse().ok()?);
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(NaiveDateTime::new(date, NaiveTime::from_hms_opt(0, 0, 0)?))
}

fn parse_message_dump(text: &str) -> Vec<ParsedTransaction> {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .filter_map(|chunk| {
            let one_line = chunk.split_whitespace().collect::<Vec<_>>().join(" ");
            match parse_message(&one_line) {
                Ok(tx) => Some(tx),
                Err(err) => {
                    tracing::debug!(%err, "dropping unparseable message chunk");
                    None
                }
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
