use fm_core::error::PipelineError;
use fm_core::traits::EmotionModel;

use super::{Dense, Hyperparams, relu};

/// Perceptron multicouche : `n_layers` couches cachées de largeur `hidden_dim`,
/// ReLU entre chaque couche, puis projection vers `n_classes`.
pub struct MlpModel {
    layers: Vec<Dense>,
    widest: usize,
}

impl MlpModel {
    /// # Errors
    /// [`PipelineError::Artifact`] if the layer count disagrees with `n_layers`,
    /// [`PipelineError::DimensionMismatch`] for a layer of the wrong shape.
    pub fn new(layers: Vec<Dense>, hyper: &Hyperparams) -> Result<Self, PipelineError> {
        if layers.len() != hyper.n_layers + 1 {
            return Err(PipelineError::Artifact(format!(
                "mlp has {} layers, expected n_layers + 1 = {}",
                layers.len(),
                hyper.n_layers + 1
            )));
        }
        if hyper.n_layers > 0 && hyper.hidden_dim == 0 {
            return Err(PipelineError::Artifact("mlp hidden_dim must be > 0".into()));
        }
        let last = layers.len() - 1;
        for (i, layer) in layers.iter().enumerate() {
            let in_dim = if i == 0 { hyper.input_dim } else { hyper.hidden_dim };
            let out_dim = if i == last { hyper.n_classes } else { hyper.hidden_dim };
            layer.check(&format!("mlp layer {i}"), in_dim, out_dim)?;
        }
        let widest = layers.iter().map(|l| l.out_dim).max().unwrap_or(0);
        Ok(Self { layers, widest })
    }
}

impl EmotionModel for MlpModel {
    fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, |l| l.in_dim)
    }

    fn n_classes(&self) -> usize {
        self.layers.last().map_or(0, |l| l.out_dim)
    }

    fn forward(&self, input: &[f32], scores: &mut [f32]) {
        let Some((last, hidden)) = self.layers.split_last() else {
            return;
        };
        let mut current: Vec<f32> = input.to_vec();
        let mut next = vec![0.0; self.widest];
        for layer in hidden {
            let out = &mut next[..layer.out_dim];
            layer.apply(&current, out);
            relu(out);
            current.clear();
            current.extend_from_slice(out);
        }
        last.apply(&current, scores);
    }

    fn name(&self) -> &'static str {
        "mlp"
    }
}
