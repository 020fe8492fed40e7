use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Semantic direction of money movement in a mobile-money message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Send,
    Receive,
    Buy,
    Withdraw,
    Deposit,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Send => write!(f, "send"),
            TransactionType::Receive => write!(f, "receive"),
            TransactionType::Buy => write!(f, "buy"),
            TransactionType::Withdraw => write!(f, "withdraw"),
            TransactionType::Deposit => write!(f, "deposit"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send" => Ok(TransactionType::Send),
            "receive" => Ok(TransactionType::Receive),
            "buy" => Ok(TransactionType::Buy),
            "withdraw" => Ok(TransactionType::Withdraw),
            "deposit" => Ok(TransactionType::Deposit),
            other => Err(format!("Unknown transaction type: '{other}'")),
        }
    }
}

/// One structured transaction extracted from free text.
///
/// Produced once per parse call and never mutated. `amount` is the only
/// field the parsers guarantee; everything else degrades to `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedTransaction {
    /// Non-negative monetary value, currency prefix stripped.
    pub amount: Decimal,
    pub recipient: Option<String>,
    pub transaction_type: Option<TransactionType>,
    /// Receipt code issued by the mobile-money system, e.g. "SAB12CD34E".
    pub reference: Option<String>,
    /// Post-transaction account balance, informational only.
    pub balance: Option<Decimal>,
    /// Transaction cost stated in the message, when present.
    pub fee: Option<Decimal>,
    /// Absent when the text carries no parseable date; the caller
    /// substitutes "now".
    pub timestamp: Option<NaiveDateTime>,
    /// Original input text, retained for audit.
    pub raw_message: String,
}

impl ParsedTransaction {
    /// A record with only the mandatory fields populated — what an
    /// unrecognized phrasing with a locatable amount parses to.
    pub fn bare(amount: Decimal, raw_message: impl Into<String>) -> Self {
        ParsedTransaction {
            amount,
            recipient: None,
            transaction_type: None,
            reference: None,
            balance: None,
            fee: None,
            timestamp: None,
            raw_message: raw_message.into(),
        }
    }
}

/// A durable transaction owned by the persistence layer. The matchers only
/// ever read collections of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: i64,
    pub amount: Decimal,
    pub recipient: Option<String>,
    pub category: String,
    pub reference: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
}
