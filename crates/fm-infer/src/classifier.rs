use std::sync::Arc;

use fm_core::emotion::EmotionObservation;
use fm_core::error::PipelineError;
use fm_core::landmarks::FeatureVector;
use fm_core::traits::EmotionModel;

/// Table des labels : l'index `i` correspond au score `i`.
///
/// # Example
/// ```
/// use fm_infer::LabelTable;
/// let labels = LabelTable::new(vec!["Angry".into(), "Happy".into()]).unwrap();
/// assert_eq!(labels.get(1).as_deref(), Some("Happy"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct LabelTable {
    labels: Vec<Arc<str>>,
}

impl LabelTable {
    /// # Errors
    /// [`PipelineError::Artifact`] for an empty table or an empty label.
    pub fn new(labels: Vec<String>) -> Result<Self, PipelineError> {
        if labels.is_empty() {
            return Err(PipelineError::Artifact("label table is empty".into()));
        }
        if let Some(i) = labels.iter().position(|l| l.trim().is_empty()) {
            return Err(PipelineError::Artifact(format!("label {i} is empty")));
        }
        Ok(Self {
            labels: labels.into_iter().map(Arc::from).collect(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Arc<str>> {
        self.labels.get(index).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(AsRef::as_ref)
    }
}

/// Result of one forward pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub index: usize,
    pub label: Arc<str>,
    pub scores: Vec<f32>,
    /// Softmax probability of `index`.
    pub confidence: f32,
}

impl Classification {
    #[must_use]
    pub fn into_observation(self, sequence: u64, session: u64) -> EmotionObservation {
        EmotionObservation::new(self.label, sequence, session).with_confidence(self.confidence)
    }
}

/// Modèle figé + table des labels, partagés en lecture seule entre workers.
pub struct Classifier {
    model: Box<dyn EmotionModel>,
    labels: LabelTable,
}

impl Classifier {
    /// # Errors
    /// [`PipelineError::DimensionMismatch`] if the model's output size differs
    /// from the label count.
    pub fn new(model: Box<dyn EmotionModel>, labels: LabelTable) -> Result<Self, PipelineError> {
        if model.n_classes() != labels.len() {
            return Err(PipelineError::mismatch(
                "model outputs vs label table",
                labels.len(),
                model.n_classes(),
            ));
        }
        Ok(Self { model, labels })
    }

    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.model.input_dim()
    }

    #[must_use]
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    #[must_use]
    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    /// Forward pass, argmax, label lookup.
    ///
    /// # Errors
    /// [`PipelineError::DimensionMismatch`] for an input of the wrong length,
    /// [`PipelineError::NumericInstability`] if any score is NaN or infinite.
    pub fn classify(&self, normalized: &FeatureVector) -> Result<Classification, PipelineError> {
        if normalized.len() != self.model.input_dim() {
            return Err(PipelineError::mismatch(
                "classifier input",
                self.model.input_dim(),
                normalized.len(),
            ));
        }
        let mut scores = vec![0.0; self.model.n_classes()];
        self.model.forward(normalized.as_slice(), &mut scores);
        let index = argmax(&scores)?;
        let label = self
            .labels
            .get(index)
            .ok_or_else(|| PipelineError::mismatch("label lookup", index + 1, self.labels.len()))?;
        let confidence = softmax_at(&scores, index);
        Ok(Classification {
            index,
            label,
            scores,
            confidence,
        })
    }
}

/// Index of the highest score, lowest index on ties.
///
/// # Errors
/// [`PipelineError::NumericInstability`] on the first NaN/Inf score, and for
/// an empty slice.
///
/// # Example
/// ```
/// use fm_infer::classifier::argmax;
/// assert_eq!(argmax(&[1.0, 3.0, 3.0]).unwrap(), 1);
/// assert!(argmax(&[1.0, f32::NAN]).is_err());
/// ```
pub fn argmax(scores: &[f32]) -> Result<usize, PipelineError> {
    if let Some((index, &value)) = scores.iter().enumerate().find(|(_, s)| !s.is_finite()) {
        return Err(PipelineError::NumericInstability { index, value });
    }
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if best.is_none_or(|(_, b)| s > b) {
            best = Some((i, s));
        }
    }
    best.map(|(i, _)| i).ok_or(PipelineError::NumericInstability {
        index: 0,
        value: f32::NAN,
    })
}

/// Numerically stable softmax probability of one entry (scores are finite).
fn softmax_at(scores: &[f32], index: usize) -> f32 {
    let max = scores[index];
    let denom: f32 = scores.iter().map(|s| (s - max).exp()).sum();
    1.0 / denom
}
