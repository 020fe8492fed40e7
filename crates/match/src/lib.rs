pub mod category;
pub mod config;
pub mod duplicate;
pub mod recurring;
pub(crate) mod normalize;

pub use category::resolve_category;
pub use config::{ConfigError, DuplicateConfig, MatchConfig, RecurringConfig};
pub use duplicate::{DuplicateConfidence, DuplicateDetector, DuplicateMatch, DuplicateReport};
pub use recurring::{MatchConfidence, RecurringMatch, RecurringMatcher};
