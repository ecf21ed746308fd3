use crate::policy::Action;
use crate::utils::rolling::safe_div;
use serde::Serialize;

/// Absolute stop-loss / take-profit prices. Both 0 when there is no position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RiskLevels {
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl RiskLevels {
    pub const NONE: RiskLevels = RiskLevels {
        stop_loss: 0.0,
        take_profit: 0.0,
    };

    pub fn is_none(&self) -> bool {
        self.stop_loss == 0.0 && self.take_profit == 0.0
    }

    /// Reward over risk measured from `entry`; 0 without levels
    pub fn reward_risk(&self, entry: f64) -> f64 {
        if self.is_none() {
            return 0.0;
        }
        safe_div(
            (self.take_profit - entry).abs(),
            (entry - self.stop_loss).abs(),
            0.0,
        )
    }

    /// Move to target as a percentage of `entry`; 0 without levels
    pub fn expected_roi_pct(&self, entry: f64) -> f64 {
        if self.is_none() {
            return 0.0;
        }
        safe_div((self.take_profit - entry).abs() * 100.0, entry, 0.0)
    }
}

/// De-normalize policy offsets into prices, never closer than `floor_pct`
/// of the close.
///
/// Algorithm:
/// 1. Offsets are ATR multiples; their sign is ignored
/// 2. Long: stop = min(close - |sl| * atr, close * (1 - floor)),
///    target = max(close + |tp| * atr, close * (1 + floor))
/// 3. Short mirrors long; Hold has no levels
///
/// Prices are not rounded, so the floor holds for sub-dollar quotes too.
pub fn policy_levels(
    action: Action,
    close: f64,
    atr: f64,
    sl_offset: f64,
    tp_offset: f64,
    floor_pct: f64,
) -> RiskLevels {
    let stop_distance = sl_offset.abs() * atr;
    let target_distance = tp_offset.abs() * atr;

    match action {
        Action::Long => RiskLevels {
            stop_loss: (close - stop_distance).min(close * (1.0 - floor_pct)),
            take_profit: (close + target_distance).max(close * (1.0 + floor_pct)),
        },
        Action::Short => RiskLevels {
            stop_loss: (close + stop_distance).max(close * (1.0 + floor_pct)),
            take_profit: (close - target_distance).min(close * (1.0 - floor_pct)),
        },
        Action::Hold => RiskLevels::NONE,
    }
}

/// Levels at only the percentage floor, used when no offsets exist
pub fn floor_levels(action: Action, close: f64, floor_pct: f64) -> RiskLevels {
    policy_levels(action, close, 0.0, 0.0, 0.0, floor_pct)
}

/// Fixed ATR multiples around `price` (scan path)
pub fn atr_multiple_levels(
    action: Action,
    price: f64,
    atr: f64,
    stop_multiple: f64,
    target_multiple: f64,
) -> RiskLevels {
    match action {
        Action::Long => RiskLevels {
            stop_loss: price - stop_multiple * atr,
            take_profit: price + target_multiple * atr,
        },
        Action::Short => RiskLevels {
            stop_loss: price + stop_multiple * atr,
            take_profit: price - target_multiple * atr,
        },
        Action::Hold => RiskLevels::NONE,
    }
}

/// Display-only estimate of how long price needs to reach `target`.
///
/// days = floor(|target - price| / (0.8 * atr)); under one day reads
/// "Intradía", otherwise a "{days}-{days+2} Días" range. Without a
/// usable ATR the estimate is "Intradía".
pub fn estimate_time_to_target(price: f64, target: f64, atr: f64) -> String {
    let days = safe_div((target - price).abs(), 0.8 * atr, 0.0).floor();
    if days < 1.0 {
        "Intradía".to_string()
    } else {
        let days = days as u64;
        format!("{}-{} Días", days, days + 2)
    }
}
