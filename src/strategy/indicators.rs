use crate::data::FeatureTable;
use crate::error::{Result, Stage};
use crate::utils::rolling::{rolling_mean, safe_div};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relative Strength Index over closes.
///
/// Algorithm:
/// 1. Per-bar delta split into gains and (positive) losses; first bar is 0/0
/// 2. Trailing mean of each over `period`, using whatever bars exist
/// 3. RSI = 100 - 100 / (1 + gain / loss)
///
/// Zero average loss gives 100 when there were gains and 0 for a flat window.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());

    for i in 0..closes.len() {
        let delta = if i == 0 { 0.0 } else { closes[i] - closes[i - 1] };
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    let avg_gain = rolling_mean(&gains, period, 1);
    let avg_loss = rolling_mean(&losses, period, 1);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&gain, &loss)| {
            if loss == 0.0 {
                if gain > 0.0 {
                    100.0
                } else {
                    0.0
                }
            } else {
                100.0 - 100.0 / (1.0 + gain / loss)
            }
        })
        .collect()
}

/// Exponential moving average, alpha = 2 / (period + 1), seeded with the
/// first value and no bias adjustment
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period.max(1) as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &value in values {
        let next = match prev {
            None => value,
            Some(p) => alpha * value + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }

    out
}

/// Simple moving average over a full window, `NaN` until the window fills
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    rolling_mean(values, period, period)
}

/// True range; the first bar has no previous close and uses high - low
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    (0..high.len())
        .map(|i| {
            let hl = high[i] - low[i];
            if i == 0 {
                return hl;
            }
            let hc = (high[i] - close[i - 1]).abs();
            let lc = (low[i] - close[i - 1]).abs();
            hl.max(hc).max(lc)
        })
        .collect()
}

/// Average true range as the EMA of the true range
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    ema(&true_range(high, low, close), period)
}

/// How VWAP accumulates across the series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VwapMode {
    /// One running total over the whole series
    #[default]
    Cumulative,
    /// Totals reset whenever the UTC calendar date changes
    Session,
}

/// Volume-weighted average of the typical price (h + l + c) / 3.
///
/// While no volume has traded the close is used, so the distance to VWAP is 0.
pub fn vwap(
    timestamps: &[DateTime<Utc>],
    high: &[f64],
    low: &[f64],
    close: &[f64],
    volume: &[f64],
    mode: VwapMode,
) -> Vec<f64> {
    let mut out = Vec::with_capacity(close.len());
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;

    for i in 0..close.len() {
        if mode == VwapMode::Session
            && i > 0
            && timestamps[i].date_naive() != timestamps[i - 1].date_naive()
        {
            cum_pv = 0.0;
            cum_vol = 0.0;
        }

        let typical = (high[i] + low[i] + close[i]) / 3.0;
        cum_pv += typical * volume[i];
        cum_vol += volume[i];

        out.push(safe_div(cum_pv, cum_vol, close[i]));
    }

    out
}

/// (value - reference) / atr per row, 0 where ATR is zero or undefined
pub fn atr_distance(values: &[f64], reference: &[f64], atr: &[f64]) -> Vec<f64> {
    values
        .iter()
        .zip(reference)
        .zip(atr)
        .map(|((&v, &r), &a)| safe_div(v - r, a, 0.0))
        .collect()
}

/// Classic indicator stage: RSI, fast/slow EMA, ATR, VWAP and the
/// ATR-normalised distances to both EMAs and VWAP.
#[derive(Debug, Clone)]
pub struct ClassicIndicators {
    pub rsi_period: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub atr_period: usize,
    pub vwap_mode: VwapMode,
}

impl Default for ClassicIndicators {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            ema_fast: 20,
            ema_slow: 50,
            atr_period: 14,
            vwap_mode: VwapMode::Cumulative,
        }
    }
}

impl ClassicIndicators {
    /// Append `rsi ema_fast ema_slow atr vwap ema_fast_dist ema_slow_dist dist_to_vwap`
    pub fn apply(&self, table: &mut FeatureTable) -> Result<()> {
        let stage = Stage::Indicators;
        let high = table.column(stage, "high")?.to_vec();
        let low = table.column(stage, "low")?.to_vec();
        let close = table.column(stage, "close")?.to_vec();
        let volume = table.column(stage, "volume")?.to_vec();

        let ema_fast = ema(&close, self.ema_fast);
        let ema_slow = ema(&close, self.ema_slow);
        let atr_values = atr(&high, &low, &close, self.atr_period);
        let vwap_values = vwap(table.timestamps(), &high, &low, &close, &volume, self.vwap_mode);

        let ema_fast_dist = atr_distance(&close, &ema_fast, &atr_values);
        let ema_slow_dist = atr_distance(&close, &ema_slow, &atr_values);
        let dist_to_vwap = atr_distance(&close, &vwap_values, &atr_values);

        table.insert("rsi", rsi(&close, self.rsi_period))?;
        table.insert("ema_fast", ema_fast)?;
        table.insert("ema_slow", ema_slow)?;
        table.insert("atr", atr_values)?;
        table.insert("vwap", vwap_values)?;
        table.insert("ema_fast_dist", ema_fast_dist)?;
        table.insert("ema_slow_dist", ema_slow_dist)?;
        table.insert("dist_to_vwap", dist_to_vwap)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rsi_uptrend_is_100() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let values = rsi(&closes, 14);
        assert_eq!(values[0], 0.0);
        assert!(values[1..].iter().all(|&v| v == 100.0));
    }

    #[test]
    fn test_rsi_bounds_on_mixed_series() {
        let closes = [100.0, 102.0, 101.0, 103.0, 99.0, 98.0, 104.0, 104.0, 97.0];
        for value in rsi(&closes, 3) {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_known_value() {
        // gains 0,2,0 / losses 0,0,1 over window 3 -> rs = 2 -> rsi = 66.67
        let values = rsi(&[10.0, 12.0, 11.0], 3);
        assert!((values[2] - 66.666_666).abs() < 1e-3);
    }

    #[test]
    fn test_ema_seeded_from_first_value() {
        let values = ema(&[10.0, 20.0, 20.0], 3);
        assert_eq!(values[0], 10.0);
        assert_eq!(values[1], 15.0);
        assert_eq!(values[2], 17.5);
    }

    #[test]
    fn test_true_range_first_bar_uses_high_low() {
        let tr = true_range(&[11.0, 15.0], &[9.0, 12.0], &[10.0, 14.0]);
        assert_eq!(tr[0], 2.0);
        // gap up: |15 - 10| beats 15 - 12
        assert_eq!(tr[1], 5.0);
    }

    #[test]
    fn test_atr_non_negative() {
        let high = [11.0, 12.0, 11.5, 13.0];
        let low = [9.0, 10.5, 10.0, 11.0];
        let close = [10.0, 11.0, 11.0, 12.5];
        assert!(atr(&high, &low, &close, 14).iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_distance_zero_when_atr_zero() {
        let out = atr_distance(&[10.0, 11.0], &[9.0, 9.5], &[0.0, 0.0]);
        assert_eq!(out, vec![0.0, 0.0]);
    }

    #[test]
    fn test_vwap_session_reset() {
        let day = |d: i64, h: u32| Utc.timestamp_opt(1_704_067_200 + d * 86_400 + h as i64 * 3_600, 0).unwrap();
        let ts = [day(0, 10), day(0, 11), day(1, 10)];
        let high = [10.0, 20.0, 30.0];
        let low = high;
        let close = high;
        let volume = [1.0, 1.0, 1.0];

        let cumulative = vwap(&ts, &high, &low, &close, &volume, VwapMode::Cumulative);
        let session = vwap(&ts, &high, &low, &close, &volume, VwapMode::Session);

        assert_eq!(cumulative[2], 20.0);
        assert_eq!(session[1], 15.0);
        assert_eq!(session[2], 30.0);
    }

    #[test]
    fn test_vwap_without_volume_tracks_close() {
        let ts = [Utc.timestamp_opt(0, 0).unwrap()];
        let out = vwap(&ts, &[11.0], &[9.0], &[10.5], &[0.0], VwapMode::Cumulative);
        assert_eq!(out, vec![10.5]);
    }

    #[test]
    fn test_slow_ema_distance_is_atr_scaled() {
        use crate::data::{Bar, OhlcvSeries};

        let bars = (0..60)
            .map(|i| {
                let c = 100.0 + i as f64;
                Bar::new(Utc.timestamp_opt(i as i64 * 3_600, 0).unwrap(), c - 0.5, c + 0.5, c - 1.0, c, 1_000.0)
            })
            .collect();
        let mut table = FeatureTable::from_series(&OhlcvSeries::new(bars).unwrap());
        ClassicIndicators::default().apply(&mut table).unwrap();

        let last = |name: &str| table.latest(Stage::Indicators, name).unwrap().unwrap();
        let expected = (last("close") - last("ema_slow")) / last("atr");
        assert!((last("ema_slow_dist") - expected).abs() < 1e-12);
        // the slow average lags further behind a steady climb
        assert!(last("ema_slow_dist") > last("ema_fast_dist"));
        assert!(last("ema_fast_dist") > 0.0);
    }
}
