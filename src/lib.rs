pub mod data;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod policy;
pub mod reference;
pub mod risk;
pub mod scan;
pub mod strategy;
pub mod utils;

// Re-export commonly used types
pub use data::{Bar, FeatureTable, OhlcvSeries};
pub use error::{Result, SignalError, Stage};
pub use features::{
    FeatureAssembler, FeatureSet, FeatureSetVersion, FeatureSpec, FeatureVector, Normalization,
};
pub use pipeline::{SignalOrchestrator, SignalReport};
pub use policy::{Action, ActionStyle, MlpPolicy, Policy, PolicyEvaluator, ReshapeMode, SignalResult};
pub use reference::{CategoryMap, StatsBook, SymbolStats};
pub use risk::{estimate_time_to_target, RiskLevels};
pub use scan::{RadarEntry, RadarScanner, ScanSnapshot, SnapshotStore};
pub use strategy::{FeatureEngine, StructureScorer, SwingStructureScorer, VwapMode};
pub use utils::{Config, PipelineMetrics};
