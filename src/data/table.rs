use crate::data::OhlcvSeries;
use crate::error::{Result, SignalError, Stage};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Column-oriented working table, one row per input bar.
///
/// Columns are appended by each pipeline stage and never replaced within
/// a run. Undefined values (warm-up rows of rolling windows) are `NaN`.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    timestamps: Vec<DateTime<Utc>>,
    columns: HashMap<String, Vec<f64>>,
    order: Vec<String>,
}

impl FeatureTable {
    /// Copy the bars into the base `open high low close volume` columns
    pub fn from_series(series: &OhlcvSeries) -> Self {
        let bars = series.bars();
        let mut table = Self {
            timestamps: bars.iter().map(|b| b.timestamp).collect(),
            columns: HashMap::new(),
            order: Vec::new(),
        };

        let base: [(&str, fn(&crate::data::Bar) -> f64); 5] = [
            ("open", |b| b.open),
            ("high", |b| b.high),
            ("low", |b| b.low),
            ("close", |b| b.close),
            ("volume", |b| b.volume),
        ];
        for (name, field) in base {
            table.columns.insert(name.to_string(), bars.iter().map(field).collect());
            table.order.push(name.to_string());
        }

        table
    }

    pub fn rows(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in the order they were computed
    pub fn column_names(&self) -> &[String] {
        &self.order
    }

    /// Borrow a computed column, or fail with an ordering error naming the stage
    pub fn column(&self, stage: Stage, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| SignalError::MissingColumn {
                stage,
                column: name.to_string(),
                rows: self.rows(),
            })
    }

    /// Add a freshly computed column
    pub fn insert(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if self.columns.contains_key(name) {
            return Err(SignalError::DuplicateColumn {
                column: name.to_string(),
            });
        }
        debug_assert_eq!(values.len(), self.rows(), "column {} has wrong length", name);

        self.columns.insert(name.to_string(), values);
        self.order.push(name.to_string());
        Ok(())
    }

    /// Value of a column on the most recent row
    pub fn latest(&self, stage: Stage, name: &str) -> Result<Option<f64>> {
        Ok(self.column(stage, name)?.last().copied())
    }
}
