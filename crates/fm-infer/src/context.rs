use fm_core::error::PipelineError;
use fm_core::landmarks::{FEATURE_DIM, LandmarkSet};
use fm_core::traits::EmotionModel;
use serde_json::Value;

use crate::classifier::{Classification, Classifier, LabelTable};
use crate::model::{ClassifierWeights, Hyperparams};
use crate::normalize::{NormalizationParams, normalize};
use crate::validate::validate;

/// Contexte d'inférence immuable, chargé une fois au démarrage.
///
/// Holds the normalization parameters, the frozen model and the label
/// table, checked to be mutually consistent. Share it as `Arc<ModelContext>`.
pub struct ModelContext {
    hyper: Hyperparams,
    params: NormalizationParams,
    classifier: Classifier,
}

impl ModelContext {
    /// Assemble a context from already-built parts.
    ///
    /// # Errors
    /// [`PipelineError::DimensionMismatch`] when any of `input_dim`, the
    /// normalization length, the model shapes, `n_classes` and the label
    /// count disagree.
    pub fn new(
        hyper: Hyperparams,
        params: NormalizationParams,
        model: Box<dyn EmotionModel>,
        labels: LabelTable,
    ) -> Result<Self, PipelineError> {
        if hyper.input_dim != FEATURE_DIM {
            return Err(PipelineError::mismatch(
                "hyperparams input_dim vs landmark features",
                FEATURE_DIM,
                hyper.input_dim,
            ));
        }
        if params.dim() != hyper.input_dim {
            return Err(PipelineError::mismatch(
                "normalization params vs input_dim",
                hyper.input_dim,
                params.dim(),
            ));
        }
        if model.input_dim() != hyper.input_dim {
            return Err(PipelineError::mismatch(
                "model input vs input_dim",
                hyper.input_dim,
                model.input_dim(),
            ));
        }
        if model.n_classes() != hyper.n_classes {
            return Err(PipelineError::mismatch(
                "model outputs vs n_classes",
                hyper.n_classes,
                model.n_classes(),
            ));
        }
        if labels.len() != hyper.n_classes {
            return Err(PipelineError::mismatch(
                "label table vs n_classes",
                hyper.n_classes,
                labels.len(),
            ));
        }
        let classifier = Classifier::new(model, labels)?;
        Ok(Self {
            hyper,
            params,
            classifier,
        })
    }

    /// Build the model from `weights`, then assemble as [`ModelContext::new`].
    ///
    /// # Errors
    /// Same as [`ClassifierWeights::build`] and [`ModelContext::new`].
    pub fn from_weights(
        hyper: Hyperparams,
        params: NormalizationParams,
        weights: ClassifierWeights,
        labels: LabelTable,
    ) -> Result<Self, PipelineError> {
        let model = weights.build(&hyper)?;
        Self::new(hyper, params, model, labels)
    }

    #[must_use]
    pub fn hyperparams(&self) -> &Hyperparams {
        &self.hyper
    }

    #[must_use]
    pub fn labels(&self) -> &LabelTable {
        self.classifier.labels()
    }

    #[must_use]
    pub fn model_name(&self) -> &'static str {
        self.classifier.model_name()
    }

    /// Normalize then classify a validated landmark set.
    ///
    /// # Errors
    /// [`PipelineError::NumericInstability`] for non-finite scores;
    /// dimension errors cannot happen once the context is built.
    pub fn infer(&self, landmarks: &LandmarkSet) -> Result<Classification, PipelineError> {
        let normalized = normalize(&landmarks.to_features(), &self.params)?;
        self.classifier.classify(&normalized)
    }

    /// Validate a raw landmark object (`{index, points}`) then [`ModelContext::infer`].
    ///
    /// Nothing past the validator runs when validation fails.
    ///
    /// # Errors
    /// [`PipelineError::Validation`] for malformed input, otherwise as [`ModelContext::infer`].
    pub fn infer_json(&self, landmarks: &Value) -> Result<Classification, PipelineError> {
        let set = validate(landmarks)?;
        self.infer(&set)
    }
}
