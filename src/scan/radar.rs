use crate::data::{FeatureTable, OhlcvSeries};
use crate::error::{Result, SignalError, Stage};
use crate::features::{FeatureAssembler, FeatureSet, FeatureSetVersion};
use crate::policy::{argmax, softmax, Action, ActionStyle, MlpPolicy, Policy};
use crate::reference::{CategoryMap, StatsBook};
use crate::risk::{atr_multiple_levels, estimate_time_to_target};
use crate::scan::features::LightFeatures;
use crate::utils::config::ScanConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Light policy outputs: `[neutral, long, short]`
const LIGHT_ACTIONS: [Action; 3] = [Action::Hold, Action::Long, Action::Short];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// HIGH above an edge of 5, MEDIUM above 0, LOW otherwise
    pub fn from_edge(edge: f64) -> Self {
        if edge > 5.0 {
            ConfidenceTier::High
        } else if edge > 0.0 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

/// One actionable row of the watch-list radar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarEntry {
    pub symbol: String,
    pub category: String,
    pub signal: String,
    pub price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub rr_ratio: f64,
    pub expected_roi_pct: f64,
    pub probability: f64,
    pub confidence_tier: ConfidenceTier,
    pub win_rate: f64,
    pub edge: f64,
    pub duration: String,
}

/// Cheap fleet-wide screen over the light feature set.
///
/// Algorithm:
/// 1. Skip series shorter than `min_bars`
/// 2. Build the 6-wide light vector from the latest bar
/// 3. Deterministic argmax over the policy's `[neutral, long, short]`
/// 4. Long/short get stop/target at fixed multiples of the mean true range
///
/// Without a policy every symbol is neutral.
pub struct RadarScanner {
    config: ScanConfig,
    features: LightFeatures,
    assembler: FeatureAssembler,
    policy: Option<Arc<dyn Policy>>,
    categories: CategoryMap,
    stats: StatsBook,
}

impl RadarScanner {
    pub fn new(
        config: ScanConfig,
        policy: Option<Arc<dyn Policy>>,
        categories: CategoryMap,
        stats: StatsBook,
    ) -> Result<Self> {
        let assembler = FeatureAssembler::new(FeatureSet::standard(FeatureSetVersion::LightV6));

        match &policy {
            Some(p) if p.input_width() != assembler.width() => {
                return Err(SignalError::WidthMismatch {
                    expected: p.input_width(),
                    actual: assembler.width(),
                });
            }
            Some(p) if p.output_width() < LIGHT_ACTIONS.len() => {
                return Err(SignalError::WeightsFormat(format!(
                    "scan policy emits {} scores, {} required",
                    p.output_width(),
                    LIGHT_ACTIONS.len()
                )));
            }
            Some(p) => info!(model_version = %p.version(), "Scan policy ready"),
            None => warn!("No scan policy loaded, every symbol resolves to NEUTRAL"),
        }

        let features = LightFeatures::with_atr_period(config.atr_period);
        check_columns(&features, &assembler)?;

        Ok(Self {
            features,
            config,
            assembler,
            policy,
            categories,
            stats,
        })
    }

    /// Build from configuration; unreadable reference files or weights are
    /// logged and replaced by empty defaults
    pub fn from_config(config: &ScanConfig) -> Self {
        let policy = config.weights_path.as_ref().and_then(|path| {
            MlpPolicy::from_path(path)
                .map(|p| Arc::new(p) as Arc<dyn Policy>)
                .map_err(|e| warn!(path = %path.display(), error = %e, "Scan weights unavailable"))
                .ok()
        });

        let stats = match &config.stats_path {
            Some(path) => StatsBook::from_path(path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Stats unavailable, annotating with zeros");
                StatsBook::new()
            }),
            None => StatsBook::new(),
        };

        let categories = match &config.categories_path {
            Some(path) => CategoryMap::from_path(path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Category overrides unavailable");
                CategoryMap::default()
            }),
            None => CategoryMap::default(),
        };

        match Self::new(config.clone(), policy, categories.clone(), stats.clone()) {
            Ok(scanner) => scanner,
            Err(e) => {
                warn!(error = %e, "Scan policy rejected");
                Self {
                    config: config.clone(),
                    features: LightFeatures::with_atr_period(config.atr_period),
                    assembler: FeatureAssembler::new(FeatureSet::standard(FeatureSetVersion::LightV6)),
                    policy: None,
                    categories,
                    stats,
                }
            }
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Decision and its probability for one light vector
    pub fn decide(&self, vector: &[f64]) -> (Action, f64) {
        match &self.policy {
            Some(policy) => {
                let scores = policy.score(vector);
                let probabilities = softmax(&scores[..LIGHT_ACTIONS.len()]);
                let (index, probability) = argmax(&probabilities);
                (LIGHT_ACTIONS[index], probability)
            }
            None => (Action::Hold, 0.0),
        }
    }

    /// Entry for one symbol; `None` when skipped or neutral
    pub fn scan_symbol(&self, symbol: &str, series: &OhlcvSeries) -> Result<Option<RadarEntry>> {
        if series.len() < self.config.min_bars {
            debug!(symbol, rows = series.len(), required = self.config.min_bars, "Series too short for scan");
            return Ok(None);
        }

        let mut table = FeatureTable::from_series(series);
        self.features.apply(&mut table)?;
        let vector = self.assembler.assemble(&table)?;

        let (action, probability) = self.decide(&vector.values);
        if !action.is_directional() {
            return Ok(None);
        }

        let price = table.latest(Stage::Scan, "close")?.unwrap_or(0.0);
        let atr = table
            .latest(Stage::Scan, "range_atr")?
            .filter(|a| a.is_finite())
            .unwrap_or(0.0);
        let levels = atr_multiple_levels(
            action,
            price,
            atr,
            self.config.stop_atr_multiple,
            self.config.target_atr_multiple,
        );
        let stats = self.stats.get(symbol);

        Ok(Some(RadarEntry {
            symbol: symbol.to_string(),
            category: self.categories.category(symbol).to_string(),
            signal: action.label(ActionStyle::LongShort).to_string(),
            price,
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            rr_ratio: levels.reward_risk(price),
            expected_roi_pct: levels.expected_roi_pct(price),
            probability,
            confidence_tier: ConfidenceTier::from_edge(stats.edge),
            win_rate: stats.win_rate,
            edge: stats.edge,
            duration: estimate_time_to_target(price, levels.take_profit, atr),
        }))
    }

    /// Scan already-loaded series; per-symbol failures are logged and skipped
    pub fn scan<'a, I>(&self, batch: I) -> Vec<RadarEntry>
    where
        I: IntoIterator<Item = (&'a str, &'a OhlcvSeries)>,
    {
        batch
            .into_iter()
            .filter_map(|(symbol, series)| match self.scan_symbol(symbol, series) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(symbol, error = %e, "Scan failed for symbol");
                    None
                }
            })
            .collect()
    }
}

/// Every column the assembler reads must come out of the light stage
fn check_columns(features: &LightFeatures, assembler: &FeatureAssembler) -> Result<()> {
    let mut table = FeatureTable::from_series(&OhlcvSeries::default());
    features.apply(&mut table)?;
    assembler.validate(&table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Bar;
    use crate::reference::SymbolStats;
    use chrono::{TimeZone, Utc};

    struct Fixed(Vec<f64>);

    impl Policy for Fixed {
        fn input_width(&self) -> usize {
            6
        }
        fn output_width(&self) -> usize {
            self.0.len()
        }
        fn score(&self, _input: &[f64]) -> Vec<f64> {
            self.0.clone()
        }
        fn version(&self) -> &str {
            "fixed"
        }
    }

    fn series(n: usize) -> OhlcvSeries {
        let bars = (0..n)
            .map(|i| {
                let c = 100.0 + i as f64 * 0.5;
                Bar::new(Utc.timestamp_opt(i as i64 * 86_400, 0).unwrap(), c, c + 1.0, c - 1.0, c, 1_000.0)
            })
            .collect();
        OhlcvSeries::new(bars).unwrap()
    }

    fn scanner(scores: Option<Vec<f64>>, stats: StatsBook) -> RadarScanner {
        let policy = scores.map(|s| Arc::new(Fixed(s)) as Arc<dyn Policy>);
        RadarScanner::new(ScanConfig::default(), policy, CategoryMap::default(), stats).unwrap()
    }

    #[test]
    fn test_long_entry_levels_and_annotations() {
        let stats = StatsBook::new();
        stats.insert("SPY", SymbolStats { win_rate: 62.0, edge: 6.5 });
        let scanner = scanner(Some(vec![0.0, 3.0, 0.0]), stats);

        let entry = scanner.scan_symbol("SPY", &series(80)).unwrap().unwrap();
        assert_eq!(entry.signal, "LONG");
        assert_eq!(entry.category, "Index ETF");
        assert_eq!(entry.confidence_tier, ConfidenceTier::High);
        assert_eq!(entry.win_rate, 62.0);

        // true range is 2 on every bar
        assert!((entry.stop_loss - (entry.price - 4.0)).abs() < 1e-9);
        assert!((entry.take_profit - (entry.price + 6.0)).abs() < 1e-9);
        assert!((entry.rr_ratio - 1.5).abs() < 1e-9);
        assert_eq!(entry.duration, "3-5 Días");
    }

    #[test]
    fn test_short_entry_mirrors() {
        let scanner = scanner(Some(vec![0.0, 0.0, 3.0]), StatsBook::new());
        let entry = scanner.scan_symbol("XYZ", &series(80)).unwrap().unwrap();
        assert_eq!(entry.signal, "SHORT");
        assert_eq!(entry.category, "Other");
        assert_eq!(entry.confidence_tier, ConfidenceTier::Low);
        assert!(entry.stop_loss > entry.price && entry.take_profit < entry.price);
    }

    #[test]
    fn test_neutral_and_short_series_yield_nothing() {
        let neutral = scanner(Some(vec![3.0, 0.0, 0.0]), StatsBook::new());
        assert!(neutral.scan_symbol("SPY", &series(80)).unwrap().is_none());

        let eager = scanner(Some(vec![0.0, 3.0, 0.0]), StatsBook::new());
        assert!(eager.scan_symbol("SPY", &series(59)).unwrap().is_none());
    }

    #[test]
    fn test_no_policy_is_all_neutral() {
        let scanner = scanner(None, StatsBook::new());
        let s = series(80);
        assert!(scanner.scan([("SPY", &s), ("QQQ", &s)]).is_empty());
    }

    #[test]
    fn test_rejects_wrong_width_policy() {
        struct Wide;
        impl Policy for Wide {
            fn input_width(&self) -> usize {
                12
            }
            fn output_width(&self) -> usize {
                3
            }
            fn score(&self, _input: &[f64]) -> Vec<f64> {
                vec![0.0; 3]
            }
            fn version(&self) -> &str {
                "wide"
            }
        }

        let result = RadarScanner::new(
            ScanConfig::default(),
            Some(Arc::new(Wide)),
            CategoryMap::default(),
            StatsBook::new(),
        );
        assert!(matches!(result, Err(SignalError::WidthMismatch { .. })));
    }

    #[test]
    fn test_column_check() {
        use crate::features::{FeatureFamily, FeatureSpec};

        let features = LightFeatures::default();
        let light = FeatureAssembler::new(FeatureSet::standard(FeatureSetVersion::LightV6));
        check_columns(&features, &light).unwrap();

        let smc = FeatureAssembler::new(FeatureSet::new(
            "smc_on_light",
            FeatureFamily::Smc,
            vec![FeatureSpec::raw("log_ret"), FeatureSpec::raw("fvg_active")],
        ));
        assert!(matches!(
            check_columns(&features, &smc),
            Err(SignalError::UnknownFeature { ref feature, .. }) if feature == "fvg_active"
        ));
    }

    #[test]
    fn test_tiers() {
        assert_eq!(ConfidenceTier::from_edge(5.0), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_edge(5.1), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_edge(0.0), ConfidenceTier::Low);
    }
}
