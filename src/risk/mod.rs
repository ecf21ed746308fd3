pub mod levels;

pub use levels::{
    atr_multiple_levels, estimate_time_to_target, floor_levels, policy_levels, RiskLevels,
};
