//! Mélange d'émotions : projette une émotion de base sur une sous-catégorie
//! plus nuancée, par tirage pondéré.
//!
//! La source aléatoire est injectée ([`UnitRandom`]) pour que les tests
//! soient déterministes.

/// Weights of the three sub-categories, most likely first.
pub const BLEND_WEIGHTS: [f64; 3] = [0.6, 0.3, 0.1];

/// Uniform random source over `[0, 1)`.
pub trait UnitRandom {
    fn next_unit(&mut self) -> f64;
}

impl UnitRandom for fastrand::Rng {
    fn next_unit(&mut self) -> f64 {
        self.f64()
    }
}

/// Base emotions that have sub-categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaseEmotion {
    Happy,
    Sad,
    Angry,
    Fear,
    Surprise,
    Neutral,
}

impl BaseEmotion {
    /// Case-insensitive lookup; `None` for labels without a blend entry.
    ///
    /// # Example
    /// ```
    /// use fm_core::blend::BaseEmotion;
    /// assert_eq!(BaseEmotion::parse("Happy"), Some(BaseEmotion::Happy));
    /// assert_eq!(BaseEmotion::parse("Disgust"), None);
    /// ```
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "happy" => Some(Self::Happy),
            "sad" => Some(Self::Sad),
            "angry" => Some(Self::Angry),
            "fear" => Some(Self::Fear),
            "surprise" => Some(Self::Surprise),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    /// Sub-categories, aligned with [`BLEND_WEIGHTS`].
    #[must_use]
    pub fn subcategories(self) -> [&'static str; 3] {
        match self {
            Self::Happy => ["joyful", "excited", "content"],
            Self::Sad => ["depressed", "gloomy", "melancholy"],
            Self::Angry => ["frustrated", "irritated", "outraged"],
            Self::Fear => ["anxious", "nervous", "panicked"],
            Self::Surprise => ["shocked", "startled", "amazed"],
            Self::Neutral => ["calm", "composed", "relaxed"],
        }
    }
}

/// Weighted pick of a sub-category for `label`.
///
/// Returns `None` when the label has no entry; the caller keeps it as is.
///
/// # Example
/// ```
/// use fm_core::blend::{blend, UnitRandom};
/// struct Fixed(f64);
/// impl UnitRandom for Fixed { fn next_unit(&mut self) -> f64 { self.0 } }
/// assert_eq!(blend("happy", &mut Fixed(0.0)), Some("joyful"));
/// assert_eq!(blend("happy", &mut Fixed(0.95)), Some("content"));
/// assert_eq!(blend("Disgust", &mut Fixed(0.5)), None);
/// ```
pub fn blend(label: &str, rng: &mut impl UnitRandom) -> Option<&'static str> {
    let subs = BaseEmotion::parse(label)?.subcategories();
    let r = rng.next_unit();
    let mut cumulative = 0.0;
    for (sub, w) in subs.into_iter().zip(BLEND_WEIGHTS) {
        cumulative += w;
        if r < cumulative {
            return Some(sub);
        }
    }
    // r ~ 1.0 with float rounding
    Some(subs[subs.len() - 1])
}
