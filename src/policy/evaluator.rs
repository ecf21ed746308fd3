use crate::error::{Result, SignalError};
use crate::features::Anchors;
use crate::policy::action::{Action, ActionStyle, SignalResult};
use crate::policy::explain::{explain, explain_fallback};
use crate::policy::model::{MlpPolicy, Policy};
use crate::risk::{floor_levels, policy_levels, RiskLevels};
use crate::utils::config::PolicyConfig;
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Score slots of a deep policy: `[long, short, hold, sl_offset, tp_offset]`
const DISCRETE_OUTPUTS: usize = 3;
const SL_SLOT: usize = 3;
const TP_SLOT: usize = 4;

/// What to do when the vector width differs from the policy's input width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReshapeMode {
    /// Reject with `WidthMismatch`
    #[default]
    Strict,
    /// Zero-pad or truncate at the end
    Lenient,
}

/// Terminal state reached at initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluatorState {
    Loaded,
    Unloaded { reason: String },
}

/// Maps feature vectors to decisions.
///
/// Loaded: real inference through the policy. Unloaded: every call
/// answers with a labelled fallback decision. The state is fixed when
/// the evaluator is built; reloading means building a new one.
pub struct PolicyEvaluator {
    policy: Option<Arc<dyn Policy>>,
    state: EvaluatorState,
    config: PolicyConfig,
    anchors: Option<Anchors>,
}

impl std::fmt::Debug for PolicyEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEvaluator")
            .field("state", &self.state)
            .field("model_version", &self.model_version())
            .field("anchors", &self.anchors)
            .finish()
    }
}

impl PolicyEvaluator {
    /// Attempt the weights load once; failures, including weights whose
    /// input width differs from `input_width`, land in `Unloaded`
    pub fn initialize(config: &PolicyConfig, anchors: Option<Anchors>) -> Self {
        let loaded = match &config.weights_path {
            None => Err(SignalError::PolicyUnavailable("no weights configured".to_string())),
            Some(path) => MlpPolicy::from_path(path)
                .and_then(|p| match p.input_width() == config.input_width {
                    true => Ok(p),
                    false => Err(SignalError::WidthMismatch {
                        expected: config.input_width,
                        actual: p.input_width(),
                    }),
                })
                .map_err(|e| SignalError::PolicyUnavailable(format!("{}: {}", path.display(), e))),
        };

        match loaded.and_then(|p| Self::from_policy(Arc::new(p), config, anchors)) {
            Ok(evaluator) => {
                info!(
                    model_version = %evaluator.model_version(),
                    input_width = evaluator.input_width().unwrap_or(0),
                    "Policy loaded"
                );
                evaluator
            }
            Err(e) => {
                warn!(reason = %e, "Policy unavailable, answering in fallback mode");
                Self::unloaded(config, anchors, &e.to_string())
            }
        }
    }

    /// Loaded evaluator around any policy
    pub fn from_policy(
        policy: Arc<dyn Policy>,
        config: &PolicyConfig,
        anchors: Option<Anchors>,
    ) -> Result<Self> {
        if policy.output_width() < DISCRETE_OUTPUTS {
            return Err(SignalError::WeightsFormat(format!(
                "policy emits {} scores, at least {} required",
                policy.output_width(),
                DISCRETE_OUTPUTS
            )));
        }

        Ok(Self {
            policy: Some(policy),
            state: EvaluatorState::Loaded,
            config: config.clone(),
            anchors,
        })
    }

    /// Fallback-only evaluator
    pub fn unloaded(config: &PolicyConfig, anchors: Option<Anchors>, reason: &str) -> Self {
        Self {
            policy: None,
            state: EvaluatorState::Unloaded {
                reason: reason.to_string(),
            },
            config: config.clone(),
            anchors,
        }
    }

    pub fn state(&self) -> &EvaluatorState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == EvaluatorState::Loaded
    }

    pub fn model_version(&self) -> &str {
        self.policy.as_ref().map(|p| p.version()).unwrap_or("fallback")
    }

    pub fn input_width(&self) -> Option<usize> {
        self.policy.as_ref().map(|p| p.input_width())
    }

    pub fn style(&self) -> ActionStyle {
        self.config.action_style
    }

    /// Configuration-time width check. Always passes when unloaded or lenient.
    pub fn check_width(&self, width: usize) -> Result<()> {
        match (self.input_width(), self.config.reshape) {
            (Some(expected), ReshapeMode::Strict) if expected != width => {
                Err(SignalError::WidthMismatch {
                    expected,
                    actual: width,
                })
            }
            _ => Ok(()),
        }
    }

    /// Fit `vector` to the policy input width per the reshape mode
    pub fn reshape(&self, vector: &[f64]) -> Result<Vec<f64>> {
        let Some(expected) = self.input_width() else {
            return Ok(vector.to_vec());
        };
        if vector.len() == expected {
            return Ok(vector.to_vec());
        }
        self.check_width(vector.len())?;

        debug!(from = vector.len(), to = expected, "Reshaping feature vector");
        let mut input = vector.to_vec();
        input.resize(expected, 0.0);
        Ok(input)
    }

    /// Decide on one vector. Only a strict width mismatch can fail.
    pub fn evaluate(&self, vector: &[f64]) -> Result<SignalResult> {
        let policy = match &self.policy {
            Some(policy) => policy,
            None => return Ok(self.fallback(vector)),
        };

        let input = self.reshape(vector)?;
        let scores = policy.score(&input);
        let probabilities = softmax(&scores[..DISCRETE_OUTPUTS]);
        let (index, confidence) = argmax(&probabilities);
        let action = Action::ALL[index];

        let levels = match self.anchor_prices(vector) {
            Some((close, atr)) if scores.len() > TP_SLOT => policy_levels(
                action,
                close,
                atr,
                scores[SL_SLOT],
                scores[TP_SLOT],
                self.config.risk_floor_pct,
            ),
            Some((close, _)) => floor_levels(action, close, self.config.risk_floor_pct),
            None => RiskLevels::NONE,
        };

        let style = self.config.action_style;
        Ok(SignalResult::new(
            action,
            style,
            confidence,
            levels,
            explain(action, style, vector, self.anchors.as_ref()),
        ))
    }

    fn anchor_prices(&self, vector: &[f64]) -> Option<(f64, f64)> {
        let anchors = self.anchors.as_ref()?;
        Some((*vector.get(anchors.close)?, *vector.get(anchors.atr)?))
    }

    /// Placeholder decision: random action, confidence drawn from the
    /// configured range, floor-only levels.
    fn fallback(&self, vector: &[f64]) -> SignalResult {
        let mut rng: Box<dyn RngCore> = match self.config.fallback_seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(vector_seed(seed, vector))),
            None => Box::new(thread_rng()),
        };

        let action = Action::ALL[rng.gen_range(0..Action::ALL.len())];
        let (low, high) = (
            self.config.fallback_confidence_min,
            self.config.fallback_confidence_max,
        );
        let confidence = if high > low { rng.gen_range(low..=high) } else { low };

        let levels = match self.anchor_prices(vector) {
            Some((close, _)) if close > 0.0 => {
                floor_levels(action, close, self.config.risk_floor_pct)
            }
            _ => RiskLevels::NONE,
        };

        let reason = match &self.state {
            EvaluatorState::Unloaded { reason } => reason.as_str(),
            EvaluatorState::Loaded => "not loaded",
        };

        let style = self.config.action_style;
        SignalResult::new(
            action,
            style,
            confidence,
            levels,
            explain_fallback(action, style, reason),
        )
    }
}

/// Seed derived from the configured seed and the vector's exact bits
fn vector_seed(seed: u64, vector: &[f64]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    for value in vector {
        hasher.update(value.to_bits().to_le_bytes());
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Numerically stable normalized exponential
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

/// Index and value of the largest entry; first wins on ties
pub fn argmax(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best })
}
