use crate::data::FeatureTable;
use crate::error::{Result, Stage};
use crate::strategy::indicators::{rsi, sma, true_range};
use crate::strategy::signals::flow::relative_volume;
use crate::utils::rolling::{finite_or, rolling_std, safe_div};

/// Columns for the light watch-list scan.
///
/// Columns produced:
/// - log_ret - ln(close / previous close), 0 on the first bar
/// - vol_regime - short over long rolling std of log_ret, 1.0 when undefined
/// - dist_sma50 / dist_sma200 - (close - SMA) / SMA, NaN until the SMA fills
/// - vol_rel - volume over its trailing mean, 1.0 when undefined
/// - rsi_norm - (RSI - 50) / 50
/// - range_atr - simple mean of the true range, used for scan levels
#[derive(Debug, Clone)]
pub struct LightFeatures {
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub vol_short: usize,
    pub vol_long: usize,
    pub rvol_period: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
}

impl Default for LightFeatures {
    fn default() -> Self {
        Self {
            sma_fast: 50,
            sma_slow: 200,
            vol_short: 20,
            vol_long: 60,
            rvol_period: 20,
            rsi_period: 14,
            atr_period: 14,
        }
    }
}

impl LightFeatures {
    pub fn with_atr_period(atr_period: usize) -> Self {
        Self {
            atr_period,
            ..Self::default()
        }
    }

    pub fn apply(&self, table: &mut FeatureTable) -> Result<()> {
        let stage = Stage::Scan;
        let high = table.column(stage, "high")?.to_vec();
        let low = table.column(stage, "low")?.to_vec();
        let close = table.column(stage, "close")?.to_vec();
        let volume = table.column(stage, "volume")?.to_vec();

        let log_ret: Vec<f64> = (0..close.len())
            .map(|i| match i {
                0 => 0.0,
                _ => finite_or((close[i] / close[i - 1]).ln(), 0.0),
            })
            .collect();

        let vol_short = rolling_std(&log_ret, self.vol_short);
        let vol_long = rolling_std(&log_ret, self.vol_long);
        let vol_regime = vol_short
            .iter()
            .zip(&vol_long)
            .map(|(&s, &l)| safe_div(s, l, 1.0))
            .collect();

        let sma_distance = |period: usize| -> Vec<f64> {
            close
                .iter()
                .zip(sma(&close, period))
                .map(|(&c, avg)| if avg.is_nan() { f64::NAN } else { safe_div(c - avg, avg, 0.0) })
                .collect()
        };

        let rsi_norm = rsi(&close, self.rsi_period)
            .into_iter()
            .map(|r| (r - 50.0) / 50.0)
            .collect();

        table.insert("log_ret", log_ret)?;
        table.insert("vol_regime", vol_regime)?;
        table.insert("dist_sma50", sma_distance(self.sma_fast))?;
        table.insert("dist_sma200", sma_distance(self.sma_slow))?;
        table.insert("vol_rel", relative_volume(&volume, self.rvol_period))?;
        table.insert("rsi_norm", rsi_norm)?;
        table.insert("range_atr", sma(&true_range(&high, &low, &close), self.atr_period))?;

        Ok(())
    }
}
