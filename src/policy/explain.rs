use crate::features::Anchors;
use crate::policy::action::{Action, ActionStyle};

/// Prefix carried by every explanation of a fallback decision
pub const FALLBACK_MARKER: &str = "[fallback]";

/// Templated rationale for a decision, a pure function of its inputs.
///
/// Checked in order: bullish FVG reading (> 0.5, the flag or the strength
/// in ATRs depending on the set) for longs, bearish order
/// block (< -0.5) for shorts, a break of structure agreeing with the
/// action, then a generic line.
pub fn explain(action: Action, style: ActionStyle, vector: &[f64], anchors: Option<&Anchors>) -> String {
    let label = action.label(style);
    if action == Action::Hold {
        return "Mixed conditions without clear liquidity; the policy recommends waiting.".to_string();
    }

    let at = |index: Option<usize>| index.and_then(|i| vector.get(i).copied()).unwrap_or(0.0);
    let fvg = at(anchors.and_then(|a| a.fvg));
    let order_block = at(anchors.and_then(|a| a.order_block));
    let structure = at(anchors.and_then(|a| a.market_structure));

    if action == Action::Long && fvg > 0.5 {
        return format!("{}: price is retesting a freshly formed bullish fair value gap.", label);
    }
    if action == Action::Short && order_block < -0.5 {
        return format!("{}: an unmitigated bearish order block sits just above price.", label);
    }
    match (action, structure) {
        (Action::Long, s) if s > 0.5 => {
            format!("{}: close broke above the prior structure high.", label)
        }
        (Action::Short, s) if s < -0.5 => {
            format!("{}: close broke below the prior structure low.", label)
        }
        _ => format!("{}: driven by recent order-flow and momentum features.", label),
    }
}

/// Explanation for a decision taken without a loaded policy
pub fn explain_fallback(action: Action, style: ActionStyle, reason: &str) -> String {
    format!(
        "{} Policy unavailable ({}); {} is a placeholder decision, not a model output.",
        FALLBACK_MARKER,
        reason,
        action.label(style)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors() -> Anchors {
        Anchors {
            close: 0,
            atr: 3,
            fvg: Some(4),
            order_block: Some(5),
            market_structure: Some(6),
        }
    }

    #[test]
    fn test_bullish_fvg_template() {
        let vector = [100.0, 60.0, 0.5, 1.0, 1.0, 0.0, 0.0];
        let text = explain(Action::Long, ActionStyle::BuySell, &vector, Some(&anchors()));
        assert!(text.starts_with("BUY"));
        assert!(text.contains("fair value gap"));
    }

    #[test]
    fn test_fvg_strength_anchor_threshold() {
        use crate::features::{FeatureSet, FeatureSetVersion};

        let anchors = FeatureSet::standard(FeatureSetVersion::SmcV17).anchors().unwrap();
        let mut vector = vec![0.0; 17];
        // flag says active, strength is weak
        vector[4] = 1.0;
        vector[16] = 0.3;
        let weak = explain(Action::Long, ActionStyle::BuySell, &vector, Some(&anchors));
        assert!(!weak.contains("fair value gap"));

        vector[16] = 0.8;
        let strong = explain(Action::Long, ActionStyle::BuySell, &vector, Some(&anchors));
        assert!(strong.contains("fair value gap"));
    }

    #[test]
    fn test_bearish_order_block_template() {
        let vector = [100.0, 40.0, -0.5, 1.0, 0.0, -1.0, 0.0];
        let text = explain(Action::Short, ActionStyle::LongShort, &vector, Some(&anchors()));
        assert!(text.starts_with("SHORT"));
        assert!(text.contains("order block"));
    }

    #[test]
    fn test_structure_and_generic_templates() {
        let vector = [100.0, 60.0, 0.5, 1.0, 0.0, 0.0, 1.0];
        let text = explain(Action::Long, ActionStyle::BuySell, &vector, Some(&anchors()));
        assert!(text.contains("structure high"));

        let text = explain(Action::Short, ActionStyle::BuySell, &vector, None);
        assert!(text.contains("momentum"));
    }

    #[test]
    fn test_deterministic() {
        let vector = [100.0, 60.0, 0.5, 1.0, 1.0, 0.0, 0.0];
        let first = explain(Action::Long, ActionStyle::BuySell, &vector, Some(&anchors()));
        let second = explain(Action::Long, ActionStyle::BuySell, &vector, Some(&anchors()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_fallback_carries_marker() {
        let text = explain_fallback(Action::Hold, ActionStyle::BuySell, "no weights configured");
        assert!(text.contains(FALLBACK_MARKER));
    }
}
