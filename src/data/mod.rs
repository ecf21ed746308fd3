pub mod bar;
pub mod table;

pub use bar::{Bar, OhlcvSeries};
pub use table::FeatureTable;
