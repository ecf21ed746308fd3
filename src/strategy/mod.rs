pub mod engine;
pub mod indicators;
pub mod signals;

pub use engine::FeatureEngine;
pub use indicators::{ClassicIndicators, VwapMode};
pub use signals::{FlowProxies, StructureDetectors, StructureScorer, SwingStructureScorer, VolumeProfile};
