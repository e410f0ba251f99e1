use crate::frame::Frame;

/// Passe avant figée : features normalisées → scores bruts.
///
/// Implémenté par : `LinearModel`, `MlpModel`, `TransformerModel` (fm-infer).
///
/// CONTRAT : déterministe, sans effet de bord, sans aléatoire (pas de dropout
/// à l'inférence). Même poids + même entrée = mêmes scores au bit près.
///
/// # Example
/// ```
/// use fm_core::traits::EmotionModel;
///
/// struct Constant;
/// impl EmotionModel for Constant {
///     fn input_dim(&self) -> usize { 2 }
///     fn n_classes(&self) -> usize { 2 }
///     fn forward(&self, _input: &[f32], scores: &mut [f32]) { scores.copy_from_slice(&[0.0, 1.0]); }
///     fn name(&self) -> &'static str { "constant" }
/// }
/// let mut s = [0.0; 2];
/// Constant.forward(&[0.0, 0.0], &mut s);
/// assert_eq!(s, [0.0, 1.0]);
/// ```
pub trait EmotionModel: Send + Sync {
    /// Length of the expected input vector.
    fn input_dim(&self) -> usize;

    /// Number of scores written by [`EmotionModel::forward`].
    fn n_classes(&self) -> usize;

    /// Writes exactly `n_classes()` scores into `scores`.
    ///
    /// Callers guarantee `input.len() == input_dim()` and
    /// `scores.len() == n_classes()`.
    fn forward(&self, input: &[f32], scores: &mut [f32]);

    /// Nom lisible pour les logs.
    fn name(&self) -> &'static str;
}

/// Fournit des frames au contrôleur de dispatch.
///
/// Implémenté par : `JsonlSource` (fm-source).
///
/// # Example
/// ```
/// use fm_core::traits::FrameSource;
/// use fm_core::frame::Frame;
///
/// struct Empty;
/// impl FrameSource for Empty {
///     fn next_frame(&mut self) -> Option<Frame> { None }
///     fn is_live(&self) -> bool { false }
/// }
/// assert!(Empty.next_frame().is_none());
/// ```
pub trait FrameSource: Send + 'static {
    /// Next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Option<Frame>;

    /// Indique si la source est infinie (capture) ou finie (fichier).
    fn is_live(&self) -> bool;
}
