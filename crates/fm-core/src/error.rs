use thiserror::Error;

use crate::landmarks::LANDMARK_COUNT;

/// Malformed or insufficient landmark input.
///
/// The `Display` text is returned verbatim to the caller, so every variant
/// names the failing field or count.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The request has no `landmarks` key, or it is not a single object.
    #[error("Invalid data format. Expected 'landmarks' key with a single object, got: {got}")]
    MissingLandmarks {
        /// Preview of what was received.
        got: String,
    },

    /// The landmark object is a list, not an object, or lacks `points`.
    #[error("Invalid landmark format. Expected object with 'points' key, got: {got}")]
    InvalidLandmark {
        /// Preview of what was received.
        got: String,
    },

    /// `points` is present but not a sequence.
    #[error("Landmark 'points' must be a list, got: {got}")]
    PointsNotSequence {
        /// Preview of what was received.
        got: String,
    },

    /// Fewer than 468 points.
    #[error("Landmark has {count} points, expected at least {}", LANDMARK_COUNT)]
    TooFewPoints {
        /// Number of points received.
        count: usize,
    },

    /// A point among the first 468 lacks a numeric `x`, `y` or `z`.
    #[error("Invalid point format at index {index}: expected numeric 'x', 'y', 'z', got: {got}")]
    InvalidPoint {
        /// Position of the point in `points`.
        index: usize,
        /// Preview of what was received.
        got: String,
    },
}

/// Erreurs du pipeline landmarks → émotion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Input rejected by the validator (client error).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Artifact or vector dimensions disagree.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Which pair of dimensions disagreed.
        context: String,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// A score came out NaN or infinite.
    #[error("Numeric instability: score {index} is {value}")]
    NumericInstability {
        /// Index of the first non-finite score.
        index: usize,
        /// The offending value.
        value: f32,
    },

    /// Unexpected failure inside a concurrent classification task.
    #[error("Classification task failed: {0}")]
    TaskFailure(String),

    /// Artifact content is invalid (non-positive std, bad hyperparameters...).
    #[error("Invalid model artifact: {0}")]
    Artifact(String),
}

impl PipelineError {
    /// `true` when the caller sent bad input (4xx), `false` for internal failures (5xx).
    ///
    /// # Example
    /// ```
    /// use fm_core::error::{PipelineError, ValidationError};
    /// let e = PipelineError::from(ValidationError::TooFewPoints { count: 3 });
    /// assert!(e.is_client_error());
    /// assert!(!PipelineError::TaskFailure("boom".into()).is_client_error());
    /// ```
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Shorthand for a [`PipelineError::DimensionMismatch`].
    #[must_use]
    pub fn mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_few_points_message_is_exact() {
        let e = ValidationError::TooFewPoints { count: 467 };
        assert_eq!(e.to_string(), "Landmark has 467 points, expected at least 468");
    }

    #[test]
    fn validation_is_transparent_through_pipeline_error() {
        let e = PipelineError::from(ValidationError::TooFewPoints { count: 0 });
        assert_eq!(e.to_string(), "Landmark has 0 points, expected at least 468");
    }

    #[test]
    fn only_validation_is_client_error() {
        assert!(!PipelineError::mismatch("mean", 1404, 3).is_client_error());
        assert!(
            !PipelineError::NumericInstability {
                index: 0,
                value: f32::NAN
            }
            .is_client_error()
        );
    }
}
