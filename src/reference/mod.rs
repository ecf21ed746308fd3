pub mod categories;
pub mod stats;

pub use categories::{CategoryMap, UNKNOWN_CATEGORY};
pub use stats::{StatsBook, SymbolStats};
