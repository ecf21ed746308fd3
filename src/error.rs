use thiserror::Error;

/// Pipeline stage that raised an error, carried for actionable messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Series,
    Indicators,
    OrderFlow,
    Structure,
    Assembler,
    Policy,
    Scan,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Series => "series",
            Stage::Indicators => "indicators",
            Stage::OrderFlow => "order-flow",
            Stage::Structure => "structure",
            Stage::Assembler => "assembler",
            Stage::Policy => "policy",
            Stage::Scan => "scan",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the feature and decision pipeline.
///
/// Numeric degeneracies (ATR of zero, flat volume windows) never appear
/// here: they are replaced by neutral values where they occur.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("{stage}: insufficient data ({rows} bars, {required} required)")]
    InsufficientData {
        stage: Stage,
        rows: usize,
        required: usize,
    },

    #[error("series: bar {index} is invalid: {reason}")]
    InvalidSeries { index: usize, reason: String },

    #[error("{stage}: column '{column}' has not been computed yet (table has {rows} rows)")]
    MissingColumn {
        stage: Stage,
        column: String,
        rows: usize,
    },

    #[error("column '{column}' was already computed in this run")]
    DuplicateColumn { column: String },

    #[error("feature set {feature_set}: feature '{feature}' is not present in the table")]
    UnknownFeature { feature_set: String, feature: String },

    #[error("policy expects a vector of width {expected}, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("policy unavailable: {0}")]
    PolicyUnavailable(String),

    #[error("malformed policy weights: {0}")]
    WeightsFormat(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, SignalError>;
