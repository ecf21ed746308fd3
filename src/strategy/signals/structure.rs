use crate::data::FeatureTable;
use crate::error::{Result, Stage};
use crate::utils::rolling::{rolling_max, rolling_min, safe_div, shift};
use std::fmt::Debug;
use std::sync::Arc;

/// Price-structure detectors working on candle shapes only.
///
/// Columns produced:
/// - fvg / fvg_active - fair value gaps at the middle bar / one bar later
/// - fvg_strength - gap span across the last triplet in ATRs
/// - order_block / order_block_active - marked bar / bar completing the impulse
/// - market_structure - break of the prior rolling high (+1) or low (-1)
/// - structure_score - swing-sequence score in [-1, 1]
#[derive(Debug, Clone)]
pub struct StructureDetectors {
    /// Consecutive same-colour bars that make an impulse (default 4)
    pub order_block_lookback: usize,

    /// Rolling watermark window for breaks of structure (default 50)
    pub structure_window: usize,

    scorer: Arc<dyn StructureScorer>,
}

impl StructureDetectors {
    pub fn new(
        order_block_lookback: usize,
        structure_window: usize,
        scorer: Arc<dyn StructureScorer>,
    ) -> Self {
        Self {
            order_block_lookback,
            structure_window,
            scorer,
        }
    }

    /// Append the structure columns listed on the type.
    ///
    /// Requires the `atr` column from the indicator stage.
    pub fn apply(&self, table: &mut FeatureTable) -> Result<()> {
        let stage = Stage::Structure;
        let atr = table.column(stage, "atr")?.to_vec();
        let open = table.column(stage, "open")?.to_vec();
        let high = table.column(stage, "high")?.to_vec();
        let low = table.column(stage, "low")?.to_vec();
        let close = table.column(stage, "close")?.to_vec();

        let fvg = fair_value_gaps(&high, &low);
        let fvg_active = activate(&fvg, 1);
        let (order_block, order_block_active) =
            order_blocks(&open, &close, self.order_block_lookback);
        let score = self.scorer.score(&high, &low, &close);

        table.insert("fvg", fvg)?;
        table.insert("fvg_active", fvg_active)?;
        table.insert("fvg_strength", fvg_strength(&high, &low, &atr))?;
        table.insert("order_block", order_block)?;
        table.insert("order_block_active", order_block_active)?;
        table.insert(
            "market_structure",
            market_structure(&high, &low, &close, self.structure_window),
        )?;
        table.insert("structure_score", score)?;

        Ok(())
    }
}

/// Three-bar fair value gaps, flagged on the middle bar.
///
/// For a triplet ending at `i`: bullish (+1) when high[i-2] < low[i],
/// bearish (-1) when low[i-2] > high[i].
pub fn fair_value_gaps(high: &[f64], low: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; high.len()];
    for i in 2..high.len() {
        if high[i - 2] < low[i] {
            out[i - 1] = 1.0;
        } else if low[i - 2] > high[i] {
            out[i - 1] = -1.0;
        }
    }
    out
}

/// (high[i-1] - low[i-2]) / atr[i]: how far the middle bar pushed past
/// the first bar's low, in ATRs. 0 for the first two bars and when ATR is 0.
pub fn fvg_strength(high: &[f64], low: &[f64], atr: &[f64]) -> Vec<f64> {
    (0..high.len())
        .map(|i| match i {
            0 | 1 => 0.0,
            _ => safe_div(high[i - 1] - low[i - 2], atr[i], 0.0),
        })
        .collect()
}

/// Move flags `bars` rows later, zero-filling the head
pub fn activate(flags: &[f64], bars: usize) -> Vec<f64> {
    shift(flags, bars)
        .into_iter()
        .map(|v| if v.is_nan() { 0.0 } else { v })
        .collect()
}

/// Order blocks: the last opposite-coloured bar before `lookback`
/// consecutive impulse bars.
///
/// Returns (flag at the marked bar, same flag on the bar that completes
/// the impulse). A bearish bar before a bullish impulse is +1, a bullish
/// (or doji) bar before a bearish impulse is -1.
pub fn order_blocks(open: &[f64], close: &[f64], lookback: usize) -> (Vec<f64>, Vec<f64>) {
    let n = close.len();
    let mut marked = vec![0.0; n];
    let mut active = vec![0.0; n];
    if lookback == 0 {
        return (marked, active);
    }

    for i in lookback..n {
        let candidate = i - lookback;
        let candidate_bearish = close[candidate] < open[candidate];

        let bullish_impulse = (candidate + 1..=i).all(|j| close[j] > open[j]);
        let bearish_impulse = (candidate + 1..=i).all(|j| close[j] < open[j]);

        if candidate_bearish && bullish_impulse {
            marked[candidate] = 1.0;
            active[i] = 1.0;
        }
        if !candidate_bearish && bearish_impulse {
            marked[candidate] = -1.0;
            active[i] = -1.0;
        }
    }

    (marked, active)
}

/// Break of structure against watermarks from the `window` bars strictly
/// before the current one. 0 until the window is full.
pub fn market_structure(high: &[f64], low: &[f64], close: &[f64], window: usize) -> Vec<f64> {
    let high_watermark = shift(&rolling_max(high, window), 1);
    let low_watermark = shift(&rolling_min(low, window), 1);

    (0..close.len())
        .map(|i| {
            if close[i] < low_watermark[i] {
                -1.0
            } else if close[i] > high_watermark[i] {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Scalar structure score per bar in [-1, 1].
///
/// Implementations must be pure functions of the history they are given.
pub trait StructureScorer: Send + Sync + Debug {
    fn score(&self, high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64>;
}

/// Break / change-of-character score from the swing-point sequence.
///
/// Algorithm:
/// 1. A swing high (low) is a bar whose high (low) is strictly above
///    (below) the `strength` bars on each side; it is known `strength`
///    bars after it prints
/// 2. For each bar, take the swings known by then inside the trailing
///    `window`
/// 3. Score = mean of sign(change) across successive swing highs and
///    successive swing lows. Higher highs and higher lows push to +1,
///    lower highs and lower lows to -1; no comparisons gives 0
#[derive(Debug, Clone)]
pub struct SwingStructureScorer {
    pub strength: usize,
    pub window: usize,
}

impl Default for SwingStructureScorer {
    fn default() -> Self {
        Self {
            strength: 2,
            window: 50,
        }
    }
}

impl SwingStructureScorer {
    pub fn new(strength: usize, window: usize) -> Self {
        Self { strength, window }
    }

    fn swings(&self, values: &[f64], is_high: bool) -> Vec<usize> {
        let k = self.strength.max(1);
        if values.len() < 2 * k + 1 {
            return Vec::new();
        }

        (k..values.len() - k)
            .filter(|&j| {
                (j - k..j).chain(j + 1..=j + k).all(|m| {
                    if is_high {
                        values[j] > values[m]
                    } else {
                        values[j] < values[m]
                    }
                })
            })
            .collect()
    }

    fn sequence_votes(values: &[f64], swings: &[usize]) -> (f64, usize) {
        let votes: f64 = swings
            .windows(2)
            .map(|pair| {
                let change = values[pair[1]] - values[pair[0]];
                if change > 0.0 {
                    1.0
                } else if change < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            })
            .sum();
        (votes, swings.len().saturating_sub(1))
    }
}

impl StructureScorer for SwingStructureScorer {
    fn score(&self, high: &[f64], low: &[f64], _close: &[f64]) -> Vec<f64> {
        let k = self.strength.max(1);
        let swing_highs = self.swings(high, true);
        let swing_lows = self.swings(low, false);

        (0..high.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(self.window);
                let visible = |swings: &[usize]| -> Vec<usize> {
                    swings
                        .iter()
                        .copied()
                        .filter(|&j| j >= start && j + k <= i)
                        .collect()
                };

                let (high_votes, high_count) = Self::sequence_votes(high, &visible(&swing_highs));
                let (low_votes, low_count) = Self::sequence_votes(low, &visible(&swing_lows));

                let comparisons = high_count + low_count;
                if comparisons == 0 {
                    0.0
                } else {
                    ((high_votes + low_votes) / comparisons as f64).clamp(-1.0, 1.0)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullish_fvg_on_middle_bar_only() {
        // bar 2 low (12) clears bar 0 high (11)
        let high = [11.0, 13.0, 14.0, 14.5, 15.0];
        let low = [9.0, 10.5, 12.0, 12.8, 13.9];
        let fvg = fair_value_gaps(&high, &low);

        assert_eq!(fvg[1], 1.0);
        // bars 3 and 4 overlap their i-2 bars
        assert_eq!(fvg.iter().filter(|&&v| v != 0.0).count(), 1);

        let active = activate(&fvg, 1);
        assert_eq!(active[2], 1.0);
        assert_eq!(active.iter().filter(|&&v| v != 0.0).count(), 1);
    }

    #[test]
    fn test_bearish_fvg() {
        let high = [20.0, 19.0, 17.0];
        let low = [18.0, 16.5, 16.0];
        assert_eq!(fair_value_gaps(&high, &low), vec![0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_fvg_strength_in_atrs() {
        let high = [11.0, 13.0, 14.0, 14.5];
        let low = [9.0, 10.5, 12.0, 12.8];
        let atr = [2.0, 2.0, 2.0, 0.0];
        let out = fvg_strength(&high, &low, &atr);

        assert_eq!(&out[..2], &[0.0, 0.0]);
        // (13 - 9) / 2
        assert_eq!(out[2], 2.0);
        // zero ATR
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn test_apply_requires_atr() {
        use crate::data::{Bar, OhlcvSeries};
        use crate::error::SignalError;
        use chrono::{TimeZone, Utc};

        let bars = (0..5)
            .map(|i| {
                let c = 10.0 + i as f64;
                Bar::new(Utc.timestamp_opt(i * 60, 0).unwrap(), c, c + 1.0, c - 1.0, c, 10.0)
            })
            .collect();
        let mut table = FeatureTable::from_series(&OhlcvSeries::new(bars).unwrap());
        let detectors = StructureDetectors::new(4, 50, Arc::new(SwingStructureScorer::default()));

        assert!(matches!(
            detectors.apply(&mut table),
            Err(SignalError::MissingColumn { ref column, .. }) if column == "atr"
        ));

        table.insert("atr", vec![1.0; 5]).unwrap();
        detectors.apply(&mut table).unwrap();
        let strength = table.column(Stage::Structure, "fvg_strength").unwrap();
        // each middle bar tops the first bar's low by 3 on an ATR of 1
        assert_eq!(&strength[2..], &[3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_short_series_has_no_gaps() {
        assert_eq!(fair_value_gaps(&[1.0, 2.0], &[0.5, 1.5]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_bullish_order_block_marks_bearish_bar() {
        // bearish bar, then four bullish bars
        let open = [10.0, 10.0, 9.5, 10.0, 10.5, 11.0];
        let close = [10.2, 9.5, 10.0, 10.5, 11.0, 11.5];
        let (marked, active) = order_blocks(&open, &close, 4);

        assert_eq!(marked, vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(active, vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_bearish_order_block_marks_bullish_bar() {
        let open = [10.0, 10.5, 10.0, 9.5, 9.0];
        let close = [10.5, 10.0, 9.5, 9.0, 8.5];
        let (marked, active) = order_blocks(&open, &close, 4);

        assert_eq!(marked[0], -1.0);
        assert_eq!(active[4], -1.0);
    }

    #[test]
    fn test_market_structure_break_up_and_down() {
        let high = [10.0, 11.0, 10.5, 12.0, 9.0];
        let low = [9.0, 10.0, 9.5, 11.0, 8.0];
        let close = [9.5, 10.5, 10.0, 11.8, 8.2];
        let out = market_structure(&high, &low, &close, 3);

        // watermarks need 3 prior bars
        assert_eq!(&out[..3], &[0.0, 0.0, 0.0]);
        assert_eq!(out[3], 1.0);
        assert_eq!(out[4], -1.0);
    }

    #[test]
    fn test_swing_score_rising_zigzag_is_positive() {
        // zigzag with higher highs and higher lows
        let mut high = Vec::new();
        let mut low = Vec::new();
        for cycle in 0..8 {
            let base = cycle as f64 * 2.0;
            for (h, l) in [(base + 1.0, base), (base + 2.0, base + 1.0), (base + 3.0, base + 2.0),
                           (base + 2.0, base + 1.0), (base + 1.5, base + 0.5)] {
                high.push(h);
                low.push(l);
            }
        }
        let close = high.clone();
        let scores = SwingStructureScorer::new(2, 50).score(&high, &low, &close);

        assert!(*scores.last().unwrap() > 0.5);
        assert!(scores.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_swing_score_is_deterministic() {
        let high: Vec<f64> = (0..80).map(|i| 100.0 + ((i * 7) % 11) as f64).collect();
        let low: Vec<f64> = high.iter().map(|h| h - 2.0).collect();
        let scorer = SwingStructureScorer::default();

        let first = scorer.score(&high, &low, &high);
        let second = scorer.score(&high, &low, &high);
        assert_eq!(first, second);
    }

    #[test]
    fn test_swing_score_flat_is_zero() {
        let flat = vec![10.0; 30];
        let scores = SwingStructureScorer::default().score(&flat, &flat, &flat);
        assert!(scores.iter().all(|&s| s == 0.0));
    }
}
