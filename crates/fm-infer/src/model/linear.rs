use fm_core::error::PipelineError;
use fm_core::traits::EmotionModel;

use super::{Dense, Hyperparams};

/// `scores = W·x + b`.
pub struct LinearModel {
    layer: Dense,
}

impl LinearModel {
    /// # Errors
    /// [`PipelineError::DimensionMismatch`] if the layer is not `input_dim → n_classes`.
    pub fn new(layer: Dense, hyper: &Hyperparams) -> Result<Self, PipelineError> {
        layer.check("linear", hyper.input_dim, hyper.n_classes)?;
        Ok(Self { layer })
    }
}

impl EmotionModel for LinearModel {
    fn input_dim(&self) -> usize {
        self.layer.in_dim
    }

    fn n_classes(&self) -> usize {
        self.layer.out_dim
    }

    fn forward(&self, input: &[f32], scores: &mut [f32]) {
        self.layer.apply(input, scores);
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}
