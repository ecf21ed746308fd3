pub mod orchestrator;

pub use orchestrator::{SignalOrchestrator, SignalReport};
pub use crate::risk::estimate_time_to_target;
