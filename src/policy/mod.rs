pub mod action;
pub mod evaluator;
pub mod explain;
pub mod model;

pub use action::{Action, ActionStyle, SignalResult};
pub use evaluator::{argmax, softmax, EvaluatorState, PolicyEvaluator, ReshapeMode};
pub use explain::FALLBACK_MARKER;
pub use model::{Activation, DenseLayer, MlpPolicy, Policy};
