use crate::data::FeatureTable;
use crate::error::{Result, SignalError, Stage};
use crate::features::set::{FeatureSet, Normalization};
use crate::utils::rolling::{fill_forward_then_zero, finite_or, safe_div};
use serde::Serialize;

/// Fixed-width vector built from the most recent row of a feature table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub feature_set: String,
    pub values: Vec<f64>,
    /// True when produced without enough history (all zeros)
    pub degraded: bool,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Selects, cleans and normalizes the configured columns.
///
/// Algorithm:
/// 1. Look up every configured column; an absent one is a configuration error
/// 2. Forward-fill each column, then zero-fill the leading gap
/// 3. Take the last row and apply the declared normalization
/// 4. Replace anything non-finite with 0
#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    set: FeatureSet,
}

impl FeatureAssembler {
    pub fn new(set: FeatureSet) -> Self {
        Self { set }
    }

    pub fn feature_set(&self) -> &FeatureSet {
        &self.set
    }

    pub fn width(&self) -> usize {
        self.set.width()
    }

    /// Fail fast when the table lacks a configured column
    pub fn validate(&self, table: &FeatureTable) -> Result<()> {
        let needs_atr = self
            .set
            .features
            .iter()
            .any(|f| f.normalization == Normalization::AtrScaled);

        let missing = self
            .set
            .features
            .iter()
            .map(|f| f.column.as_str())
            .chain(needs_atr.then_some("atr"))
            .find(|column| !table.contains(column));

        match missing {
            Some(column) => Err(SignalError::UnknownFeature {
                feature_set: self.set.name.clone(),
                feature: column.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// All-zero vector flagged as degraded
    pub fn zero_vector(&self) -> FeatureVector {
        FeatureVector {
            feature_set: self.set.name.clone(),
            values: vec![0.0; self.width()],
            degraded: true,
        }
    }

    pub fn assemble(&self, table: &FeatureTable) -> Result<FeatureVector> {
        if table.is_empty() {
            return Ok(self.zero_vector());
        }
        self.validate(table)?;

        let stage = Stage::Assembler;
        let atr = match table.contains("atr") {
            true => fill_forward_then_zero(table.column(stage, "atr")?),
            false => Vec::new(),
        };
        let latest_atr = atr.last().copied().unwrap_or(0.0);

        let mut values = Vec::with_capacity(self.width());
        for spec in &self.set.features {
            let column = fill_forward_then_zero(table.column(stage, &spec.column)?);
            let last = column.last().copied().unwrap_or(0.0);

            let value = match spec.normalization {
                Normalization::Raw => last,
                Normalization::AtrScaled => safe_div(last, latest_atr, 0.0),
                Normalization::MinMax { window } => {
                    let tail = &column[column.len().saturating_sub(window.max(1))..];
                    let min = tail.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = tail.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    safe_div(last - min, max - min, 0.0)
                }
                Normalization::Centered { center, scale } => safe_div(last - center, scale, 0.0),
            };
            values.push(finite_or(value, 0.0));
        }

        Ok(FeatureVector {
            feature_set: self.set.name.clone(),
            values,
            degraded: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Bar, OhlcvSeries};
    use crate::features::set::{FeatureFamily, FeatureSpec};
    use chrono::{TimeZone, Utc};

    fn base_table(closes: &[f64]) -> FeatureTable {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::new(Utc.timestamp_opt(i as i64 * 60, 0).unwrap(), c, c + 1.0, c - 1.0, c, 100.0 + i as f64)
            })
            .collect();
        FeatureTable::from_series(&OhlcvSeries::new(bars).unwrap())
    }

    fn set(features: Vec<FeatureSpec>) -> FeatureSet {
        FeatureSet::new("test", FeatureFamily::Smc, features)
    }

    #[test]
    fn test_zero_rows_gives_zero_vector() {
        let assembler = FeatureAssembler::new(set(vec![FeatureSpec::raw("close"), FeatureSpec::raw("rsi")]));
        let vector = assembler.assemble(&FeatureTable::default()).unwrap();

        assert_eq!(vector.values, vec![0.0, 0.0]);
        assert!(vector.degraded);
    }

    #[test]
    fn test_unknown_feature_fails_fast() {
        let table = base_table(&[10.0, 11.0]);
        let assembler = FeatureAssembler::new(set(vec![FeatureSpec::raw("close"), FeatureSpec::raw("smc_magic")]));

        match assembler.assemble(&table) {
            Err(SignalError::UnknownFeature { feature, feature_set }) => {
                assert_eq!(feature, "smc_magic");
                assert_eq!(feature_set, "test");
            }
            other => panic!("expected UnknownFeature, got {:?}", other),
        }
    }

    #[test]
    fn test_atr_scaling_requires_atr_column() {
        let table = base_table(&[10.0, 11.0]);
        let assembler = FeatureAssembler::new(set(vec![FeatureSpec::atr_scaled("close")]));
        assert!(matches!(
            assembler.validate(&table),
            Err(SignalError::UnknownFeature { ref feature, .. }) if feature == "atr"
        ));
    }

    #[test]
    fn test_forward_fill_then_zero() {
        let mut table = base_table(&[10.0, 11.0, 12.0]);
        table.insert("late", vec![f64::NAN, f64::NAN, f64::NAN]).unwrap();
        table.insert("gappy", vec![1.0, 2.0, f64::NAN]).unwrap();

        let assembler = FeatureAssembler::new(set(vec![FeatureSpec::raw("late"), FeatureSpec::raw("gappy")]));
        let vector = assembler.assemble(&table).unwrap();
        assert_eq!(vector.values, vec![0.0, 2.0]);
        assert!(!vector.degraded);
    }

    #[test]
    fn test_normalizations() {
        let mut table = base_table(&[10.0, 14.0, 12.0]);
        table.insert("atr", vec![1.0, 2.0, 4.0]).unwrap();
        table.insert("dist", vec![0.0, 0.0, 2.0]).unwrap();

        let assembler = FeatureAssembler::new(set(vec![
            FeatureSpec::atr_scaled("dist"),
            FeatureSpec::new("close", Normalization::MinMax { window: 100 }),
            FeatureSpec::new("close", Normalization::MinMax { window: 1 }),
            FeatureSpec::new("close", Normalization::Centered { center: 10.0, scale: 4.0 }),
            FeatureSpec::new("close", Normalization::Centered { center: 10.0, scale: 0.0 }),
        ]));
        let vector = assembler.assemble(&table).unwrap();

        assert_eq!(vector.values, vec![0.5, 0.5, 0.0, 0.5, 0.0]);
    }
}
