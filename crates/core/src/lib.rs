pub mod recurring;
pub mod transaction;

pub use recurring::{Frequency, RecurringObligation};
pub use transaction::{ParsedTransaction, StoredTransaction, TransactionType};
