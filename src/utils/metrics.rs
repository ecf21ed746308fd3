use crate::error::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Pipeline counters on a private registry (one per orchestrator)
#[derive(Clone)]
pub struct PipelineMetrics {
    registry: Registry,
    signals: IntCounterVec,
    fallback_signals: IntCounter,
    degraded_outputs: IntCounter,
    pipeline_seconds: Histogram,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let signals = IntCounterVec::new(
            Opts::new("smc_signals_total", "Signals emitted by action"),
            &["action"],
        )?;
        let fallback_signals = IntCounter::new(
            "smc_fallback_signals_total",
            "Signals answered without a loaded policy",
        )?;
        let degraded_outputs = IntCounter::new(
            "smc_degraded_outputs_total",
            "Zero-vector outputs for series below the minimum length",
        )?;
        let pipeline_seconds = Histogram::with_opts(
            HistogramOpts::new("smc_pipeline_seconds", "Feature and decision latency")
                .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]),
        )?;

        registry.register(Box::new(signals.clone()))?;
        registry.register(Box::new(fallback_signals.clone()))?;
        registry.register(Box::new(degraded_outputs.clone()))?;
        registry.register(Box::new(pipeline_seconds.clone()))?;

        Ok(Self {
            registry,
            signals,
            fallback_signals,
            degraded_outputs,
            pipeline_seconds,
        })
    }

    pub fn record_signal(&self, action: &str, fallback: bool) {
        self.signals.with_label_values(&[action]).inc();
        if fallback {
            self.fallback_signals.inc();
        }
    }

    pub fn record_degraded(&self) {
        self.degraded_outputs.inc();
    }

    pub fn observe_seconds(&self, seconds: f64) {
        self.pipeline_seconds.observe(seconds);
    }

    pub fn signal_count(&self, action: &str) -> u64 {
        self.signals.with_label_values(&[action]).get()
    }

    pub fn degraded_count(&self) -> u64 {
        self.degraded_outputs.get()
    }

    /// Prometheus text exposition
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
