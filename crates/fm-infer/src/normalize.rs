use fm_core::error::PipelineError;
use fm_core::landmarks::FeatureVector;

/// Transformation affine figée (mean/std) calculée à l'entraînement.
///
/// Invariant: `mean.len() == std.len()`, every `std[i]` finite and `> 0`,
/// every `mean[i]` finite.
///
/// # Example
/// ```
/// use fm_infer::NormalizationParams;
/// assert!(NormalizationParams::new(vec![0.0; 3], vec![1.0; 3]).is_ok());
/// assert!(NormalizationParams::new(vec![0.0; 3], vec![1.0, 0.0, 1.0]).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizationParams {
    mean: Box<[f32]>,
    std: Box<[f32]>,
}

impl NormalizationParams {
    /// # Errors
    /// [`PipelineError::DimensionMismatch`] on unequal lengths,
    /// [`PipelineError::Artifact`] on a non-positive or non-finite entry.
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self, PipelineError> {
        if mean.len() != std.len() {
            return Err(PipelineError::mismatch(
                "normalization mean/std",
                mean.len(),
                std.len(),
            ));
        }
        if let Some((i, s)) = std
            .iter()
            .enumerate()
            .find(|(_, s)| !(s.is_finite() && **s > 0.0))
        {
            return Err(PipelineError::Artifact(format!(
                "std[{i}] = {s}, must be finite and > 0"
            )));
        }
        if let Some((i, m)) = mean.iter().enumerate().find(|(_, m)| !m.is_finite()) {
            return Err(PipelineError::Artifact(format!(
                "mean[{i}] = {m}, must be finite"
            )));
        }
        Ok(Self {
            mean: mean.into_boxed_slice(),
            std: std.into_boxed_slice(),
        })
    }

    /// Zero mean, unit std.
    #[must_use]
    pub fn identity(dim: usize) -> Self {
        Self {
            mean: vec![0.0; dim].into_boxed_slice(),
            std: vec![1.0; dim].into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    #[must_use]
    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    #[must_use]
    pub fn std(&self) -> &[f32] {
        &self.std
    }
}

/// `out[i] = (features[i] - mean[i]) / std[i]`.
///
/// # Errors
/// [`PipelineError::DimensionMismatch`] if the vector and the parameters differ in length.
///
/// # Example
/// ```
/// use fm_core::landmarks::FeatureVector;
/// use fm_infer::{normalize, NormalizationParams};
/// let params = NormalizationParams::new(vec![1.0, 2.0], vec![2.0, 4.0]).unwrap();
/// let out = normalize(&FeatureVector::from_values(vec![3.0, 2.0]), &params).unwrap();
/// assert_eq!(out.as_slice(), &[1.0, 0.0]);
/// ```
pub fn normalize(
    features: &FeatureVector,
    params: &NormalizationParams,
) -> Result<FeatureVector, PipelineError> {
    if features.len() != params.dim() {
        return Err(PipelineError::mismatch(
            "features vs normalization params",
            params.dim(),
            features.len(),
        ));
    }
    let out = features
        .as_slice()
        .iter()
        .zip(params.mean.iter().zip(params.std.iter()))
        .map(|(x, (m, s))| (x - m) / s)
        .collect();
    Ok(FeatureVector::from_values(out))
}
