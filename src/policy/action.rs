use crate::risk::RiskLevels;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete trading decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Long,
    Short,
    Hold,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Long, Action::Short, Action::Hold];

    pub fn label(&self, style: ActionStyle) -> &'static str {
        match (self, style) {
            (Action::Long, ActionStyle::LongShort) => "LONG",
            (Action::Long, ActionStyle::BuySell) => "BUY",
            (Action::Short, ActionStyle::LongShort) => "SHORT",
            (Action::Short, ActionStyle::BuySell) => "SELL",
            (Action::Hold, _) => "HOLD",
        }
    }

    pub fn is_directional(&self) -> bool {
        !matches!(self, Action::Hold)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label(ActionStyle::LongShort))
    }
}

/// Vocabulary used when rendering actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStyle {
    LongShort,
    #[default]
    BuySell,
}

/// The record every caller serializes:
/// `{action, confidence, stop_loss, take_profit, explanation}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalResult {
    pub action: String,
    pub confidence: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub explanation: String,
    #[serde(skip)]
    pub decision: Action,
}

impl SignalResult {
    pub fn new(
        decision: Action,
        style: ActionStyle,
        confidence: f64,
        levels: RiskLevels,
        explanation: String,
    ) -> Self {
        Self {
            action: decision.label(style).to_string(),
            confidence,
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            explanation,
            decision,
        }
    }

    /// HOLD with zero confidence and no levels
    pub fn neutral(style: ActionStyle, explanation: &str) -> Self {
        Self::new(Action::Hold, style, 0.0, RiskLevels::NONE, explanation.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_by_style() {
        assert_eq!(Action::Long.label(ActionStyle::BuySell), "BUY");
        assert_eq!(Action::Short.label(ActionStyle::LongShort), "SHORT");
        assert_eq!(Action::Hold.label(ActionStyle::BuySell), "HOLD");
    }

    #[test]
    fn test_serialized_shape() {
        let result = SignalResult::neutral(ActionStyle::BuySell, "waiting");
        let json = serde_json::to_value(&result).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, ["action", "confidence", "explanation", "stop_loss", "take_profit"]);
        assert_eq!(json["action"], "HOLD");
    }
}
