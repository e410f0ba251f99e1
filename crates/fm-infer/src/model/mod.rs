//! Frozen classifier weights and their forward passes.
//!
//! Three model kinds share the [`EmotionModel`] contract: a linear layer, a
//! ReLU MLP, and a single-step transformer encoder. All of them sum in a
//! fixed sequential order so scores are reproducible bit for bit.

mod linear;
mod mlp;
mod transformer;

pub use linear::LinearModel;
pub use mlp::MlpModel;
pub use transformer::{EncoderLayer, TransformerModel, TransformerWeights};

use fm_core::error::PipelineError;
use fm_core::traits::EmotionModel;
use serde::{Deserialize, Serialize};

/// Version du format de poids supportée.
pub const WEIGHTS_VERSION: u32 = 1;

/// Hyperparamètres du modèle, tels qu'écrits par l'entraînement.
///
/// `dropout` is recorded for completeness and ignored at inference.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Hyperparams {
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub n_layers: usize,
    pub n_heads: usize,
    #[serde(default)]
    pub dropout: f32,
    pub n_classes: usize,
}

/// Couche dense, poids en row-major `[out_dim][in_dim]`.
///
/// # Example
/// ```
/// use fm_infer::model::Dense;
/// let d = Dense::new(2, 1, vec![1.0, 2.0], vec![0.5]);
/// let mut out = [0.0];
/// d.apply(&[3.0, 4.0], &mut out);
/// assert_eq!(out, [11.5]);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Dense {
    pub in_dim: usize,
    pub out_dim: usize,
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
}

impl Dense {
    #[must_use]
    pub fn new(in_dim: usize, out_dim: usize, weight: Vec<f32>, bias: Vec<f32>) -> Self {
        Self {
            in_dim,
            out_dim,
            weight,
            bias,
        }
    }

    /// All-zero layer, handy for tests and for fixing scores through the bias.
    #[must_use]
    pub fn zeros(in_dim: usize, out_dim: usize) -> Self {
        Self::new(in_dim, out_dim, vec![0.0; in_dim * out_dim], vec![0.0; out_dim])
    }

    /// Check declared and stored shapes against the expected `in_dim → out_dim`.
    ///
    /// # Errors
    /// [`PipelineError::DimensionMismatch`] naming the layer.
    pub fn check(&self, name: &str, in_dim: usize, out_dim: usize) -> Result<(), PipelineError> {
        if self.in_dim != in_dim {
            return Err(PipelineError::mismatch(format!("{name} input"), in_dim, self.in_dim));
        }
        if self.out_dim != out_dim {
            return Err(PipelineError::mismatch(format!("{name} output"), out_dim, self.out_dim));
        }
        if self.weight.len() != in_dim * out_dim {
            return Err(PipelineError::mismatch(
                format!("{name} weight"),
                in_dim * out_dim,
                self.weight.len(),
            ));
        }
        if self.bias.len() != out_dim {
            return Err(PipelineError::mismatch(format!("{name} bias"), out_dim, self.bias.len()));
        }
        Ok(())
    }

    /// `out = W·x + b`. Shapes must have passed [`Dense::check`].
    #[inline]
    pub fn apply(&self, x: &[f32], out: &mut [f32]) {
        debug_assert_eq!(x.len(), self.in_dim);
        debug_assert_eq!(out.len(), self.out_dim);
        for ((slot, row), b) in out
            .iter_mut()
            .zip(self.weight.chunks_exact(self.in_dim))
            .zip(&self.bias)
        {
            let mut acc = *b;
            for (w, xi) in row.iter().zip(x) {
                acc += w * xi;
            }
            *slot = acc;
        }
    }
}

/// Normalisation de couche (eps 1e-5, variance biaisée).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LayerNorm {
    pub gamma: Vec<f32>,
    pub beta: Vec<f32>,
    pub eps: f32,
}

impl LayerNorm {
    /// Identity-initialised norm (gamma 1, beta 0).
    #[must_use]
    pub fn identity(dim: usize) -> Self {
        Self {
            gamma: vec![1.0; dim],
            beta: vec![0.0; dim],
            eps: 1e-5,
        }
    }

    /// # Errors
    /// [`PipelineError::DimensionMismatch`] naming the layer.
    pub fn check(&self, name: &str, dim: usize) -> Result<(), PipelineError> {
        if self.gamma.len() != dim {
            return Err(PipelineError::mismatch(format!("{name} gamma"), dim, self.gamma.len()));
        }
        if self.beta.len() != dim {
            return Err(PipelineError::mismatch(format!("{name} beta"), dim, self.beta.len()));
        }
        Ok(())
    }

    #[inline]
    pub fn apply(&self, x: &mut [f32]) {
        let n = x.len() as f32;
        let mean = x.iter().sum::<f32>() / n;
        let var = x.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
        let inv = 1.0 / (var + self.eps).sqrt();
        for ((v, g), b) in x.iter_mut().zip(&self.gamma).zip(&self.beta) {
            *v = (*v - mean) * inv * g + b;
        }
    }
}

#[inline]
pub(crate) fn relu(x: &mut [f32]) {
    for v in x {
        *v = v.max(0.0);
    }
}

/// Paramètres figés d'un des trois types de modèle.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum ModelWeights {
    Linear(Dense),
    /// Dense layers, ReLU between consecutive layers.
    Mlp(Vec<Dense>),
    Transformer(TransformerWeights),
}

/// Blob de poids versionné, tel que persisté par l'entraînement.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ClassifierWeights {
    pub version: u32,
    pub model: ModelWeights,
}

impl ClassifierWeights {
    #[must_use]
    pub fn new(model: ModelWeights) -> Self {
        Self {
            version: WEIGHTS_VERSION,
            model,
        }
    }

    /// Check every tensor against `hyper` and build the forward-pass model.
    ///
    /// # Errors
    /// [`PipelineError::Artifact`] for an unsupported version or inconsistent
    /// hyperparameters, [`PipelineError::DimensionMismatch`] for a tensor of
    /// the wrong shape.
    pub fn build(self, hyper: &Hyperparams) -> Result<Box<dyn EmotionModel>, PipelineError> {
        if self.version != WEIGHTS_VERSION {
            return Err(PipelineError::Artifact(format!(
                "weights version {} unsupported (expected {WEIGHTS_VERSION})",
                self.version
            )));
        }
        if hyper.n_classes == 0 {
            return Err(PipelineError::Artifact("n_classes must be > 0".into()));
        }
        let model: Box<dyn EmotionModel> = match self.model {
            ModelWeights::Linear(dense) => Box::new(LinearModel::new(dense, hyper)?),
            ModelWeights::Mlp(layers) => Box::new(MlpModel::new(layers, hyper)?),
            ModelWeights::Transformer(weights) => Box::new(TransformerModel::new(weights, hyper)?),
        };
        log::info!(
            "Modèle {} construit : {} → {} classes",
            model.name(),
            model.input_dim(),
            model.n_classes()
        );
        Ok(model)
    }
}
