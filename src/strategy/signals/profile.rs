use crate::data::FeatureTable;
use crate::error::{Result, Stage};
use serde::Serialize;

/// Coarse volume-profile levels for one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileLevels {
    /// Close of the bar with the largest volume
    pub poc: f64,
    /// Highest high in the window
    pub vah: f64,
    /// Lowest low in the window
    pub val: f64,
}

/// Volume-profile proxy over the trailing `window` bars.
///
/// This is not a volume-at-price histogram: the point of control is the
/// close of the heaviest bar and the value area is the window's range.
#[derive(Debug, Clone)]
pub struct VolumeProfile {
    pub window: usize,
}

impl Default for VolumeProfile {
    fn default() -> Self {
        Self { window: 100 }
    }
}

impl VolumeProfile {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// Levels for the window ending at `end` (inclusive); shorter at the start
    pub fn levels_at(
        &self,
        high: &[f64],
        low: &[f64],
        close: &[f64],
        volume: &[f64],
        end: usize,
    ) -> ProfileLevels {
        let start = (end + 1).saturating_sub(self.window.max(1));

        let mut heaviest = start;
        let mut vah = high[start];
        let mut val = low[start];
        for i in start..=end {
            // strict comparison keeps the earliest bar on ties
            if volume[i] > volume[heaviest] {
                heaviest = i;
            }
            vah = vah.max(high[i]);
            val = val.min(low[i]);
        }

        ProfileLevels {
            poc: close[heaviest],
            vah,
            val,
        }
    }

    /// Append `poc vah val dist_to_poc dist_to_vah dist_to_val`.
    ///
    /// Distances are raw price differences (close - level); ATR scaling
    /// happens in the feature assembler.
    pub fn apply(&self, table: &mut FeatureTable) -> Result<()> {
        let stage = Stage::Structure;
        let high = table.column(stage, "high")?.to_vec();
        let low = table.column(stage, "low")?.to_vec();
        let close = table.column(stage, "close")?.to_vec();
        let volume = table.column(stage, "volume")?.to_vec();

        let levels: Vec<ProfileLevels> = (0..close.len())
            .map(|end| self.levels_at(&high, &low, &close, &volume, end))
            .collect();

        let dist = |pick: fn(&ProfileLevels) -> f64| -> Vec<f64> {
            close.iter().zip(&levels).map(|(c, l)| c - pick(l)).collect()
        };
        let dist_to_poc = dist(|l| l.poc);
        let dist_to_vah = dist(|l| l.vah);
        let dist_to_val = dist(|l| l.val);

        table.insert("poc", levels.iter().map(|l| l.poc).collect())?;
        table.insert("vah", levels.iter().map(|l| l.vah).collect())?;
        table.insert("val", levels.iter().map(|l| l.val).collect())?;
        table.insert("dist_to_poc", dist_to_poc)?;
        table.insert("dist_to_vah", dist_to_vah)?;
        table.insert("dist_to_val", dist_to_val)?;

        Ok(())
    }
}
