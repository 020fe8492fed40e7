pub mod message;
pub mod statement;

pub use message::{parse_message, ParseError};
pub use statement::parse_statement;
