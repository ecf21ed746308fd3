use crate::data::FeatureTable;
use crate::error::{Result, Stage};
use crate::utils::rolling::{rolling_mean, safe_div};

/// Candle-aggregate order-flow proxies.
///
/// None of these see real trades: aggressor side, relative activity and
/// stop runs are all inferred from OHLCV bars.
///
/// Proxies:
/// 1. delta_proxy - whole bar volume signed by candle colour
/// 2. rvol - volume against its trailing mean
/// 3. imbalance_proxy - body share of the bar range
/// 4. liquidity_sweep - long wick (vs ATR) printed on elevated volume
#[derive(Debug, Clone)]
pub struct FlowProxies {
    /// Bars in the relative-volume baseline (typically 20)
    pub rvol_period: usize,

    /// Wick length, in ATRs, that counts as a sweep (default 0.5)
    pub sweep_atr_multiple: f64,

    /// Relative volume a sweep must exceed (default 1.2)
    pub sweep_rvol_threshold: f64,
}

impl Default for FlowProxies {
    fn default() -> Self {
        Self {
            rvol_period: 20,
            sweep_atr_multiple: 0.5,
            sweep_rvol_threshold: 1.2,
        }
    }
}

impl FlowProxies {
    pub fn new(rvol_period: usize, sweep_atr_multiple: f64, sweep_rvol_threshold: f64) -> Self {
        Self {
            rvol_period,
            sweep_atr_multiple,
            sweep_rvol_threshold,
        }
    }

    /// Append `delta_proxy rvol imbalance_proxy liquidity_sweep`.
    ///
    /// Requires the `atr` column from the indicator stage.
    pub fn apply(&self, table: &mut FeatureTable) -> Result<()> {
        let stage = Stage::OrderFlow;
        let atr = table.column(stage, "atr")?.to_vec();
        let open = table.column(stage, "open")?.to_vec();
        let high = table.column(stage, "high")?.to_vec();
        let low = table.column(stage, "low")?.to_vec();
        let close = table.column(stage, "close")?.to_vec();
        let volume = table.column(stage, "volume")?.to_vec();

        let rvol = relative_volume(&volume, self.rvol_period);
        let sweep = liquidity_sweep(
            &open,
            &high,
            &low,
            &close,
            &atr,
            &rvol,
            self.sweep_atr_multiple,
            self.sweep_rvol_threshold,
        );

        table.insert("delta_proxy", delta_proxy(&open, &close, &volume))?;
        table.insert("rvol", rvol)?;
        table.insert("imbalance_proxy", imbalance_proxy(&open, &high, &low, &close))?;
        table.insert("liquidity_sweep", sweep)?;

        Ok(())
    }
}

/// Volume attributed entirely to buyers when close >= open, else to sellers.
///
/// Doji bars (close == open) are classified as buying.
pub fn delta_proxy(open: &[f64], close: &[f64], volume: &[f64]) -> Vec<f64> {
    (0..close.len())
        .map(|i| {
            let up_volume = if close[i] >= open[i] { volume[i] } else { 0.0 };
            let down_volume = if close[i] < open[i] { volume[i] } else { 0.0 };
            up_volume - down_volume
        })
        .collect()
}

/// volume / trailing mean volume; 1.0 (neutral) during warm-up or when
/// the baseline is zero
pub fn relative_volume(volume: &[f64], period: usize) -> Vec<f64> {
    let baseline = rolling_mean(volume, period, period);
    volume
        .iter()
        .zip(&baseline)
        .map(|(&v, &avg)| safe_div(v, avg, 1.0))
        .collect()
}

/// |close - open| / (high - low), 0 for a zero-range bar
pub fn imbalance_proxy(open: &[f64], high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    (0..close.len())
        .map(|i| safe_div((close[i] - open[i]).abs(), high[i] - low[i], 0.0).clamp(0.0, 1.0))
        .collect()
}

/// 1.0 where either wick exceeds `atr_multiple * ATR` and rvol exceeds
/// `rvol_threshold`, else 0.0
#[allow(clippy::too_many_arguments)]
pub fn liquidity_sweep(
    open: &[f64],
    high: &[f64],
    low: &[f64],
    close: &[f64],
    atr: &[f64],
    rvol: &[f64],
    atr_multiple: f64,
    rvol_threshold: f64,
) -> Vec<f64> {
    (0..close.len())
        .map(|i| {
            let upper_wick = high[i] - open[i].max(close[i]);
            let lower_wick = open[i].min(close[i]) - low[i];
            let reach = atr_multiple * atr[i];

            let long_wick = upper_wick > reach || lower_wick > reach;
            if long_wick && rvol[i] > rvol_threshold {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}
