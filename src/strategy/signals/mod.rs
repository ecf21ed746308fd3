pub mod flow;
pub mod profile;
pub mod structure;

pub use flow::FlowProxies;
pub use profile::{ProfileLevels, VolumeProfile};
pub use structure::{StructureDetectors, StructureScorer, SwingStructureScorer};
