use crate::data::{FeatureTable, OhlcvSeries};
use crate::error::{Result, SignalError, Stage};
use crate::features::{FeatureAssembler, FeatureFamily, FeatureVector};
use crate::scan::features::LightFeatures;
use crate::strategy::indicators::ClassicIndicators;
use crate::strategy::signals::{
    FlowProxies, StructureDetectors, StructureScorer, SwingStructureScorer, VolumeProfile,
};
use crate::utils::config::FeatureConfig;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs the feature stages in dependency order over a private copy of the
/// series.
///
/// Stage order for the SMC family:
/// 1. Classic indicators (RSI, EMAs, ATR, VWAP, distances)
/// 2. Order-flow proxies (need ATR)
/// 3. Price-structure detectors
/// 4. Volume-profile levels
///
/// Holds no per-call state; one engine can serve any number of symbols.
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    config: FeatureConfig,
    indicators: ClassicIndicators,
    flow: FlowProxies,
    structure: StructureDetectors,
    profile: VolumeProfile,
    light: LightFeatures,
}

impl FeatureEngine {
    pub fn new(config: FeatureConfig) -> Self {
        let scorer = Arc::new(SwingStructureScorer::new(
            config.swing_strength,
            config.structure_window,
        ));
        Self::with_scorer(config, scorer)
    }

    /// Engine with a caller-supplied structure scorer
    pub fn with_scorer(config: FeatureConfig, scorer: Arc<dyn StructureScorer>) -> Self {
        let indicators = ClassicIndicators {
            rsi_period: config.rsi_period,
            ema_fast: config.ema_fast,
            ema_slow: config.ema_slow,
            atr_period: config.atr_period,
            vwap_mode: config.vwap_mode,
        };
        let flow = FlowProxies::new(
            config.rvol_period,
            config.sweep_atr_multiple,
            config.sweep_rvol_threshold,
        );
        let structure = StructureDetectors::new(
            config.order_block_lookback,
            config.structure_window,
            scorer,
        );
        let profile = VolumeProfile::new(config.volume_profile_window);
        let light = LightFeatures {
            rsi_period: config.rsi_period,
            ..LightFeatures::default()
        };

        Self {
            config,
            indicators,
            flow,
            structure,
            profile,
            light,
        }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Full SMC enrichment of a fresh table built from `series`
    pub fn enrich(&self, series: &OhlcvSeries) -> Result<FeatureTable> {
        let mut table = FeatureTable::from_series(series);

        self.indicators.apply(&mut table)?;
        self.flow.apply(&mut table)?;
        self.structure.apply(&mut table)?;
        self.profile.apply(&mut table)?;

        debug!(rows = table.rows(), columns = table.column_names().len(), "Table enriched");
        Ok(table)
    }

    /// Light-scan enrichment of a fresh table built from `series`
    pub fn enrich_light(&self, series: &OhlcvSeries) -> Result<FeatureTable> {
        let mut table = FeatureTable::from_series(series);
        self.light.apply(&mut table)?;
        Ok(table)
    }

    /// Enrichment for a feature family
    pub fn enrich_for(&self, series: &OhlcvSeries, family: FeatureFamily) -> Result<FeatureTable> {
        match family {
            FeatureFamily::Smc => self.enrich(series),
            FeatureFamily::Light => self.enrich_light(series),
        }
    }

    /// Fail with `UnknownFeature` unless every column the assembler reads
    /// is produced by the enrichment of its family.
    ///
    /// Runs the stages over an empty series, so it costs nothing per bar.
    pub fn check_assembler(&self, assembler: &FeatureAssembler) -> Result<()> {
        let table = self.enrich_for(&OhlcvSeries::default(), assembler.feature_set().family)?;
        assembler.validate(&table)
    }

    /// Enrich for the assembler's feature family and assemble the vector.
    ///
    /// With fewer than `min_bars` bars the result is the degraded zero
    /// vector, or `InsufficientData` in strict mode. A misconfigured set
    /// fails either way.
    pub fn feature_vector(
        &self,
        series: &OhlcvSeries,
        assembler: &FeatureAssembler,
    ) -> Result<FeatureVector> {
        let rows = series.len();
        if rows < self.config.min_bars {
            self.check_assembler(assembler)?;
            if self.config.strict {
                return Err(SignalError::InsufficientData {
                    stage: Stage::Indicators,
                    rows,
                    required: self.config.min_bars,
                });
            }
            warn!(
                rows,
                required = self.config.min_bars,
                feature_set = %assembler.feature_set().name,
                "Not enough bars, returning zero vector"
            );
            return Ok(assembler.zero_vector());
        }

        let table = self.enrich_for(series, assembler.feature_set().family)?;
        assembler.assemble(&table)
    }
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}
