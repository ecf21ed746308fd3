use crate::data::OhlcvSeries;
use crate::error::Result;
use crate::features::{FeatureAssembler, FeatureSet};
use crate::policy::{PolicyEvaluator, SignalResult};
use crate::reference::{CategoryMap, StatsBook, SymbolStats};
use crate::strategy::FeatureEngine;
use crate::utils::config::Config;
use crate::utils::metrics::PipelineMetrics;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

/// Everything a caller needs to display one deep query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalReport {
    pub symbol: String,
    pub category: String,
    pub feature_set: String,
    pub model_version: String,
    /// Not enough history: HOLD with zero confidence and no levels
    pub degraded: bool,
    pub signal: SignalResult,
    pub stats: SymbolStats,
}

/// Single-symbol deep path: features, assembly, policy decision.
///
/// Feature columns and width compatibility between assembler and policy
/// are settled at construction, so evaluation never trips over them. Each call is
/// independent; the orchestrator can be shared across threads.
pub struct SignalOrchestrator {
    engine: FeatureEngine,
    assembler: FeatureAssembler,
    evaluator: PolicyEvaluator,
    categories: CategoryMap,
    stats: StatsBook,
    metrics: Option<PipelineMetrics>,
}

impl SignalOrchestrator {
    pub fn new(
        engine: FeatureEngine,
        assembler: FeatureAssembler,
        evaluator: PolicyEvaluator,
        categories: CategoryMap,
        stats: StatsBook,
    ) -> Result<Self> {
        engine.check_assembler(&assembler)?;
        evaluator.check_width(assembler.width())?;

        Ok(Self {
            engine,
            assembler,
            evaluator,
            categories,
            stats,
            metrics: None,
        })
    }

    /// Wire every component from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let set = FeatureSet::standard(config.features.feature_set);
        let evaluator = PolicyEvaluator::initialize(&config.policy, set.anchors());

        let stats = match &config.scan.stats_path {
            Some(path) => StatsBook::from_path(path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Stats unavailable, annotating with zeros");
                StatsBook::new()
            }),
            None => StatsBook::new(),
        };
        let categories = match &config.scan.categories_path {
            Some(path) => CategoryMap::from_path(path)?,
            None => CategoryMap::default(),
        };

        let orchestrator = Self::new(
            FeatureEngine::new(config.features.clone()),
            FeatureAssembler::new(set),
            evaluator,
            categories,
            stats,
        )?;

        if config.metrics.enabled {
            Ok(orchestrator.with_metrics(PipelineMetrics::new()?))
        } else {
            Ok(orchestrator)
        }
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&PipelineMetrics> {
        self.metrics.as_ref()
    }

    pub fn evaluator(&self) -> &PolicyEvaluator {
        &self.evaluator
    }

    pub fn assembler(&self) -> &FeatureAssembler {
        &self.assembler
    }

    pub fn evaluate(&self, symbol: &str, series: &OhlcvSeries) -> Result<SignalReport> {
        let started = Instant::now();
        let vector = self.engine.feature_vector(series, &self.assembler)?;

        let signal = if vector.degraded {
            if let Some(metrics) = &self.metrics {
                metrics.record_degraded();
            }
            SignalResult::neutral(
                self.evaluator.style(),
                "Not enough price history for a decision.",
            )
        } else {
            let signal = self.evaluator.evaluate(&vector.values)?;
            if let Some(metrics) = &self.metrics {
                metrics.record_signal(&signal.action, !self.evaluator.is_loaded());
            }
            signal
        };

        if let Some(metrics) = &self.metrics {
            metrics.observe_seconds(started.elapsed().as_secs_f64());
        }

        info!(
            symbol,
            action = %signal.action,
            confidence = signal.confidence,
            degraded = vector.degraded,
            "Signal evaluated"
        );

        Ok(SignalReport {
            symbol: symbol.to_string(),
            category: self.categories.category(symbol).to_string(),
            feature_set: vector.feature_set,
            model_version: self.evaluator.model_version().to_string(),
            degraded: vector.degraded,
            signal,
            stats: self.stats.get(symbol),
        })
    }
}
