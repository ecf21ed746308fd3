pub mod features;
pub mod radar;
pub mod snapshot;

pub use features::LightFeatures;
pub use radar::{ConfidenceTier, RadarEntry, RadarScanner};
pub use snapshot::{ScanSnapshot, SnapshotStore};
