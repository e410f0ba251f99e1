use fm_core::error::PipelineError;
use fm_core::traits::EmotionModel;
use serde::{Deserialize, Serialize};

use super::{Dense, Hyperparams, LayerNorm, relu};

/// One post-norm encoder layer applied to a single token.
///
/// With one token the attention softmax is exactly 1 for every head, so the
/// attention block reduces to `out_proj(value(x))`. Query and key
/// projections never influence the output and are not stored.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct EncoderLayer {
    pub value: Dense,
    pub out_proj: Dense,
    pub norm1: LayerNorm,
    /// `hidden → 4·hidden`.
    pub ff1: Dense,
    /// `4·hidden → hidden`.
    pub ff2: Dense,
    pub norm2: LayerNorm,
}

impl EncoderLayer {
    /// Identity-normed layer with zero projections.
    #[must_use]
    pub fn zeros(hidden: usize) -> Self {
        Self {
            value: Dense::zeros(hidden, hidden),
            out_proj: Dense::zeros(hidden, hidden),
            norm1: LayerNorm::identity(hidden),
            ff1: Dense::zeros(hidden, hidden * 4),
            ff2: Dense::zeros(hidden * 4, hidden),
            norm2: LayerNorm::identity(hidden),
        }
    }

    fn check(&self, i: usize, hidden: usize) -> Result<(), PipelineError> {
        self.value.check(&format!("layer {i} value"), hidden, hidden)?;
        self.out_proj.check(&format!("layer {i} out_proj"), hidden, hidden)?;
        self.norm1.check(&format!("layer {i} norm1"), hidden)?;
        self.ff1.check(&format!("layer {i} ff1"), hidden, hidden * 4)?;
        self.ff2.check(&format!("layer {i} ff2"), hidden * 4, hidden)?;
        self.norm2.check(&format!("layer {i} norm2"), hidden)
    }
}

/// Poids de l'encodeur : projection d'entrée, couches, tête de classification.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TransformerWeights {
    pub input_proj: Dense,
    pub layers: Vec<EncoderLayer>,
    pub fc: Dense,
}

/// Encodeur transformer appliqué à un seul pas de temps.
///
/// `input_proj → [self-attn + add & norm → feed-forward ReLU + add & norm] × n_layers → fc`.
/// Dropout is an identity at inference and is not applied.
pub struct TransformerModel {
    weights: TransformerWeights,
    hidden: usize,
}

impl TransformerModel {
    /// # Errors
    /// [`PipelineError::Artifact`] when `hidden_dim` is not a multiple of
    /// `n_heads` or the layer count disagrees with `n_layers`;
    /// [`PipelineError::DimensionMismatch`] for a tensor of the wrong shape.
    pub fn new(weights: TransformerWeights, hyper: &Hyperparams) -> Result<Self, PipelineError> {
        let hidden = hyper.hidden_dim;
        if hyper.n_heads == 0 || hidden == 0 || hidden % hyper.n_heads != 0 {
            return Err(PipelineError::Artifact(format!(
                "hidden_dim {hidden} is not divisible by n_heads {}",
                hyper.n_heads
            )));
        }
        if weights.layers.len() != hyper.n_layers {
            return Err(PipelineError::Artifact(format!(
                "transformer has {} layers, hyperparameters say {}",
                weights.layers.len(),
                hyper.n_layers
            )));
        }
        weights.input_proj.check("input_proj", hyper.input_dim, hidden)?;
        for (i, layer) in weights.layers.iter().enumerate() {
            layer.check(i, hidden)?;
        }
        weights.fc.check("fc", hidden, hyper.n_classes)?;
        Ok(Self { weights, hidden })
    }
}

impl EmotionModel for TransformerModel {
    fn input_dim(&self) -> usize {
        self.weights.input_proj.in_dim
    }

    fn n_classes(&self) -> usize {
        self.weights.fc.out_dim
    }

    fn forward(&self, input: &[f32], scores: &mut [f32]) {
        let h = self.hidden;
        let mut x = vec![0.0; h];
        let mut v = vec![0.0; h];
        let mut branch = vec![0.0; h];
        let mut ff = vec![0.0; h * 4];

        self.weights.input_proj.apply(input, &mut x);
        for layer in &self.weights.layers {
            layer.value.apply(&x, &mut v);
            layer.out_proj.apply(&v, &mut branch);
            add_assign(&mut x, &branch);
            layer.norm1.apply(&mut x);

            layer.ff1.apply(&x, &mut ff);
            relu(&mut ff);
            layer.ff2.apply(&ff, &mut branch);
            add_assign(&mut x, &branch);
            layer.norm2.apply(&mut x);
        }
        self.weights.fc.apply(&x, scores);
    }

    fn name(&self) -> &'static str {
        "transformer"
    }
}

#[inline]
fn add_assign(x: &mut [f32], y: &[f32]) {
    for (a, b) in x.iter_mut().zip(y) {
        *a += b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hyper() -> Hyperparams {
        Hyperparams {
            input_dim: 3,
            hidden_dim: 4,
            n_layers: 2,
            n_heads: 2,
            dropout: 0.3,
            n_classes: 2,
        }
    }

    fn seeded(rng: &mut fastrand::Rng, in_dim: usize, out_dim: usize) -> Dense {
        let mut r = || rng.f32() - 0.5;
        let weight = (0..in_dim * out_dim).map(|_| r()).collect();
        let bias = (0..out_dim).map(|_| r()).collect();
        Dense::new(in_dim, out_dim, weight, bias)
    }

    fn random_weights(seed: u64) -> TransformerWeights {
        let mut rng = fastrand::Rng::with_seed(seed);
        let layers = (0..2)
            .map(|_| EncoderLayer {
                value: seeded(&mut rng, 4, 4),
                out_proj: seeded(&mut rng, 4, 4),
                norm1: LayerNorm::identity(4),
                ff1: seeded(&mut rng, 4, 16),
                ff2: seeded(&mut rng, 16, 4),
                norm2: LayerNorm::identity(4),
            })
            .collect();
        TransformerWeights {
            input_proj: seeded(&mut rng, 3, 4),
            layers,
            fc: seeded(&mut rng, 4, 2),
        }
    }

    #[test]
    fn forward_is_bit_reproducible() {
        let model = TransformerModel::new(random_weights(3), &hyper()).unwrap();
        let input = [0.3, -1.2, 2.0];
        let mut a = [0.0; 2];
        let mut b = [0.0; 2];
        model.forward(&input, &mut a);
        model.forward(&input, &mut b);
        assert_eq!(a.map(f32::to_bits), b.map(f32::to_bits));
        assert!(a.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn zero_layers_reduce_to_fc_bias() {
        let mut w = TransformerWeights {
            input_proj: Dense::zeros(3, 4),
            layers: vec![EncoderLayer::zeros(4), EncoderLayer::zeros(4)],
            fc: Dense::zeros(4, 2),
        };
        w.fc.bias = vec![1.5, -0.5];
        let model = TransformerModel::new(w, &hyper()).unwrap();
        let mut scores = [0.0; 2];
        model.forward(&[1.0, 2.0, 3.0], &mut scores);
        assert_eq!(scores, [1.5, -0.5]);
    }

    #[test]
    fn heads_must_divide_hidden() {
        let mut h = hyper();
        h.n_heads = 3;
        assert!(matches!(
            TransformerModel::new(random_weights(1), &h).err(),
            Some(PipelineError::Artifact(_))
        ));
    }

    #[test]
    fn layer_count_must_match() {
        let mut h = hyper();
        h.n_layers = 1;
        assert!(matches!(
            TransformerModel::new(random_weights(1), &h).err(),
            Some(PipelineError::Artifact(_))
        ));
    }

    #[test]
    fn bad_ff_shape_is_reported() {
        let mut w = random_weights(2);
        w.layers[1].ff1 = Dense::zeros(4, 8);
        assert_eq!(
            TransformerModel::new(w, &hyper()).err(),
            Some(PipelineError::mismatch("layer 1 ff1 output", 16, 8))
        );
    }
}
