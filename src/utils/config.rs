use crate::error::SignalError;
use crate::features::FeatureSetVersion;
use crate::policy::{ActionStyle, ReshapeMode};
use crate::strategy::VwapMode;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub features: FeatureConfig,
    pub policy: PolicyConfig,
    pub scan: ScanConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub environment: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
        }
    }
}

/// Feature pipeline parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub feature_set: FeatureSetVersion,
    /// Below this many bars the pipeline degrades to a zero vector
    pub min_bars: usize,
    pub rsi_period: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub atr_period: usize,
    pub rvol_period: usize,
    pub volume_profile_window: usize,
    pub structure_window: usize,
    pub order_block_lookback: usize,
    pub sweep_atr_multiple: f64,
    pub sweep_rvol_threshold: f64,
    pub swing_strength: usize,
    pub vwap_mode: VwapMode,
    /// Raise InsufficientData instead of degrading
    pub strict: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            feature_set: FeatureSetVersion::SmcV12,
            min_bars: 50,
            rsi_period: 14,
            ema_fast: 20,
            ema_slow: 50,
            atr_period: 14,
            rvol_period: 20,
            volume_profile_window: 100,
            structure_window: 50,
            order_block_lookback: 4,
            sweep_atr_multiple: 0.5,
            sweep_rvol_threshold: 1.2,
            swing_strength: 2,
            vwap_mode: VwapMode::Cumulative,
            strict: false,
        }
    }
}

/// Policy evaluator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// JSON weights document; absent means fallback mode
    pub weights_path: Option<PathBuf>,
    pub input_width: usize,
    pub reshape: ReshapeMode,
    /// Minimum stop/target distance as a fraction of price
    pub risk_floor_pct: f64,
    pub fallback_confidence_min: f64,
    pub fallback_confidence_max: f64,
    /// Makes fallback decisions a pure function of the vector
    pub fallback_seed: Option<u64>,
    pub action_style: ActionStyle,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            weights_path: None,
            input_width: 12,
            reshape: ReshapeMode::Strict,
            risk_floor_pct: 0.02,
            fallback_confidence_min: 0.5,
            fallback_confidence_max: 0.65,
            fallback_seed: None,
            action_style: ActionStyle::BuySell,
        }
    }
}

/// Watch-list scan parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub watchlist: Vec<String>,
    pub min_bars: usize,
    pub atr_period: usize,
    pub stop_atr_multiple: f64,
    pub target_atr_multiple: f64,
    /// Delay between symbols, for the data provider's rate limits
    pub pacing_ms: u64,
    pub weights_path: Option<PathBuf>,
    pub stats_path: Option<PathBuf>,
    pub categories_path: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            watchlist: [
                "SPY", "QQQ", "IWM", "BTC-USD", "ETH-USD", "GGAL.BA", "YPF.BA", "AAPL", "NVDA",
                "GLD", "HYG",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_bars: 60,
            atr_period: 14,
            stop_atr_multiple: 2.0,
            target_atr_multiple: 3.0,
            pacing_ms: 500,
            weights_path: None,
            stats_path: None,
            categories_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub output: String,
    pub file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: "pretty".to_string(),
            file_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env`, then the file named by `CONFIG_FILE` (optional), then
    /// `SMC__SECTION__KEY` environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let path = std::env::var("CONFIG_FILE")
            .unwrap_or_else(|_| "config/default.toml".to_string());

        let config: Config = ::config::Config::builder()
            .add_source(::config::File::with_name(&path).required(false))
            .add_source(::config::Environment::with_prefix("SMC").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values no pipeline stage can work with
    pub fn validate(&self) -> std::result::Result<(), SignalError> {
        let f = &self.features;
        let periods = [
            ("rsi_period", f.rsi_period),
            ("ema_fast", f.ema_fast),
            ("ema_slow", f.ema_slow),
            ("atr_period", f.atr_period),
            ("rvol_period", f.rvol_period),
            ("volume_profile_window", f.volume_profile_window),
            ("structure_window", f.structure_window),
            ("order_block_lookback", f.order_block_lookback),
            ("swing_strength", f.swing_strength),
            ("scan.atr_period", self.scan.atr_period),
            ("policy.input_width", self.policy.input_width),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, value)| *value == 0) {
            return Err(SignalError::Config(format!("{} must be positive", name)));
        }

        let p = &self.policy;
        if p.reshape == ReshapeMode::Strict && f.feature_set.width() != p.input_width {
            return Err(SignalError::Config(format!(
                "feature set {} is {} wide but the policy input is {} (strict reshape)",
                f.feature_set,
                f.feature_set.width(),
                p.input_width
            )));
        }
        if !(p.risk_floor_pct > 0.0 && p.risk_floor_pct < 0.5) {
            return Err(SignalError::Config(format!(
                "risk_floor_pct must be in (0, 0.5), got {}",
                p.risk_floor_pct
            )));
        }
        if !(0.0..=1.0).contains(&p.fallback_confidence_min)
            || !(0.0..=1.0).contains(&p.fallback_confidence_max)
            || p.fallback_confidence_min > p.fallback_confidence_max
        {
            return Err(SignalError::Config(format!(
                "fallback confidence range [{}, {}] is invalid",
                p.fallback_confidence_min, p.fallback_confidence_max
            )));
        }

        Ok(())
    }
}
