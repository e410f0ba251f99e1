use std::fmt;
use std::sync::Arc;

/// Texte affiché quand aucun visage n'est suivi.
pub const NO_FACE_TEXT: &str = "No Face Detected";

/// One classification result, handed from a worker to the smoother.
///
/// # Example
/// ```
/// use fm_core::emotion::EmotionObservation;
/// let obs = EmotionObservation::new("Happy", 7, 0);
/// assert_eq!(&*obs.label, "Happy");
/// assert!(obs.confidence.is_none());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct EmotionObservation {
    /// Class name, shared with the label table.
    pub label: Arc<str>,
    /// Softmax probability of the winning class, when known.
    pub confidence: Option<f32>,
    /// Frame counter value at submission.
    pub sequence: u64,
    /// Smoother session the frame was submitted under.
    pub session: u64,
}

impl EmotionObservation {
    #[must_use]
    pub fn new(label: impl Into<Arc<str>>, sequence: u64, session: u64) -> Self {
        Self {
            label: label.into(),
            confidence: None,
            sequence,
            session,
        }
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Stabilized output of the smoother, as shown to the presentation layer.
///
/// `NoFace` is a regular output (empty window), not an error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StableEmotion {
    #[default]
    NoFace,
    Label(Arc<str>),
}

impl StableEmotion {
    /// Label name, `None` for [`StableEmotion::NoFace`].
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::NoFace => None,
            Self::Label(l) => Some(l),
        }
    }

    #[must_use]
    pub fn is_no_face(&self) -> bool {
        matches!(self, Self::NoFace)
    }
}

impl fmt::Display for StableEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFace => f.write_str(NO_FACE_TEXT),
            Self::Label(l) => f.write_str(l),
        }
    }
}
