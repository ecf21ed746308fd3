pub mod assembler;
pub mod set;

pub use assembler::{FeatureAssembler, FeatureVector};
pub use set::{Anchors, FeatureFamily, FeatureSet, FeatureSetVersion, FeatureSpec, Normalization};
