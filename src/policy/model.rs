use crate::error::{Result, SignalError};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Opaque decision function: fixed-width vector in, raw scores out.
///
/// Implementations are read-only after construction and shared across
/// concurrent evaluations.
pub trait Policy: Send + Sync {
    fn input_width(&self) -> usize;
    fn output_width(&self) -> usize;
    fn score(&self, input: &[f64]) -> Vec<f64>;
    fn version(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    #[default]
    Linear,
}

/// Fully connected layer; `weights[out][in]`
#[derive(Debug, Clone)]
pub struct DenseLayer {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    activation: Activation,
}

impl DenseLayer {
    pub fn new(weights: Vec<Vec<f64>>, bias: Vec<f64>, activation: Activation) -> Result<Self> {
        if weights.is_empty() || weights.len() != bias.len() {
            return Err(SignalError::WeightsFormat(format!(
                "layer has {} weight rows and {} biases",
                weights.len(),
                bias.len()
            )));
        }
        let inputs = weights[0].len();
        if inputs == 0 || weights.iter().any(|row| row.len() != inputs) {
            return Err(SignalError::WeightsFormat(
                "weight rows must share one non-zero width".to_string(),
            ));
        }
        if weights.iter().flatten().chain(&bias).any(|w| !w.is_finite()) {
            return Err(SignalError::WeightsFormat("non-finite weight".to_string()));
        }

        Ok(Self {
            weights,
            bias,
            activation,
        })
    }

    pub fn inputs(&self) -> usize {
        self.weights[0].len()
    }

    pub fn outputs(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| {
                let z = row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b;
                match self.activation {
                    Activation::Relu => z.max(0.0),
                    Activation::Linear => z,
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct WeightsDocument {
    version: Option<String>,
    layers: Vec<LayerDocument>,
}

#[derive(Debug, Deserialize)]
struct LayerDocument {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    #[serde(default)]
    activation: Activation,
}

/// Multi-layer perceptron loaded from a JSON weights document:
///
/// ```json
/// { "version": "v3", "layers": [ { "weights": [[..]], "bias": [..], "activation": "relu" } ] }
/// ```
///
/// Without a `version` the model is named by the first 12 hex characters
/// of the document's SHA-256.
#[derive(Debug, Clone)]
pub struct MlpPolicy {
    layers: Vec<DenseLayer>,
    version: String,
}

impl MlpPolicy {
    pub fn new(layers: Vec<DenseLayer>, version: &str) -> Result<Self> {
        if layers.is_empty() {
            return Err(SignalError::WeightsFormat("no layers".to_string()));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].outputs() != pair[1].inputs() {
                return Err(SignalError::WeightsFormat(format!(
                    "layer {} emits {} values but layer {} expects {}",
                    i,
                    pair[0].outputs(),
                    i + 1,
                    pair[1].inputs()
                )));
            }
        }

        Ok(Self {
            layers,
            version: version.to_string(),
        })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let document: WeightsDocument = serde_json::from_slice(bytes)?;
        let version = document
            .version
            .unwrap_or_else(|| hex::encode(Sha256::digest(bytes))[..12].to_string());

        let layers = document
            .layers
            .into_iter()
            .map(|l| DenseLayer::new(l.weights, l.bias, l.activation))
            .collect::<Result<Vec<_>>>()?;

        Self::new(layers, &version)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }
}

impl Policy for MlpPolicy {
    fn input_width(&self) -> usize {
        self.layers[0].inputs()
    }

    fn output_width(&self) -> usize {
        self.layers[self.layers.len() - 1].outputs()
    }

    fn score(&self, input: &[f64]) -> Vec<f64> {
        self.layers
            .iter()
            .fold(input.to_vec(), |activations, layer| layer.forward(&activations))
    }

    fn version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LAYER: &str = r#"{
        "layers": [
            { "weights": [[1.0, -1.0], [0.5, 0.5]], "bias": [0.0, -1.0], "activation": "relu" },
            { "weights": [[2.0, 0.0], [0.0, 3.0], [1.0, 1.0]], "bias": [0.0, 0.0, 1.0] }
        ]
    }"#;

    #[test]
    fn test_forward_pass() {
        let policy = MlpPolicy::from_json(TWO_LAYER.as_bytes()).unwrap();
        assert_eq!(policy.input_width(), 2);
        assert_eq!(policy.output_width(), 3);

        // hidden = relu([3 - 1, 2 - 1]) = [2, 1]
        assert_eq!(policy.score(&[3.0, 1.0]), vec![4.0, 3.0, 4.0]);
        // hidden = relu([-2, -1]) = [0, 0]
        assert_eq!(policy.score(&[-1.0, 1.0]), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_version_from_digest() {
        let policy = MlpPolicy::from_json(TWO_LAYER.as_bytes()).unwrap();
        assert_eq!(policy.version().len(), 12);
        assert!(policy.version().chars().all(|c| c.is_ascii_hexdigit()));

        let again = MlpPolicy::from_json(TWO_LAYER.as_bytes()).unwrap();
        assert_eq!(policy.version(), again.version());
    }

    #[test]
    fn test_explicit_version() {
        let doc = r#"{"version": "ppo-7", "layers": [{"weights": [[1.0]], "bias": [0.0]}]}"#;
        assert_eq!(MlpPolicy::from_json(doc.as_bytes()).unwrap().version(), "ppo-7");
    }

    #[test]
    fn test_rejects_mismatched_layers() {
        let doc = r#"{"layers": [
            {"weights": [[1.0, 1.0]], "bias": [0.0]},
            {"weights": [[1.0, 1.0]], "bias": [0.0]}
        ]}"#;
        assert!(matches!(
            MlpPolicy::from_json(doc.as_bytes()),
            Err(SignalError::WeightsFormat(_))
        ));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let doc = r#"{"layers": [{"weights": [[1.0, 1.0], [1.0]], "bias": [0.0, 0.0]}]}"#;
        assert!(MlpPolicy::from_json(doc.as_bytes()).is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            MlpPolicy::from_json(b"{not json"),
            Err(SignalError::Json(_))
        ));
    }
}
