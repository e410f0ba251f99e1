use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration complète du pipeline, hot-rechargeable (sections dispatch/blend).
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use fm_core::config::AppConfig;
/// let config = AppConfig::default();
/// assert_eq!(config.smoothing.window, 5);
/// assert_eq!(config.dispatch.frame_skip, 3);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    pub artifacts: ArtifactPaths,
    pub smoothing: SmoothingConfig,
    pub dispatch: DispatchConfig,
    pub blend: BlendConfig,
}

/// Emplacement des trois artefacts du modèle.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ArtifactPaths {
    /// Dossier contenant les artefacts.
    pub dir: PathBuf,
    /// Hyperparamètres (JSON).
    pub hyperparams: String,
    /// Poids figés (bincode, ou JSON si l'extension est `.json`).
    pub weights: String,
    /// Paire mean/std (JSON).
    pub normalization: String,
    /// Table des labels (JSON, tableau de chaînes).
    pub labels: String,
}

impl ArtifactPaths {
    #[must_use]
    pub fn hyperparams_path(&self) -> PathBuf {
        self.dir.join(&self.hyperparams)
    }

    #[must_use]
    pub fn weights_path(&self) -> PathBuf {
        self.dir.join(&self.weights)
    }

    #[must_use]
    pub fn normalization_path(&self) -> PathBuf {
        self.dir.join(&self.normalization)
    }

    #[must_use]
    pub fn labels_path(&self) -> PathBuf {
        self.dir.join(&self.labels)
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("backend"),
            hyperparams: "model_hyperparams.json".into(),
            weights: "emotion_model.bin".into(),
            normalization: "normalization.json".into(),
            labels: "labels.json".into(),
        }
    }
}

/// Order in which observations enter the smoothing window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum WindowOrdering {
    /// Completion order of the classification tasks.
    #[default]
    Arrival,
    /// Frame sequence order; stale results are dropped.
    Sequence,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SmoothingConfig {
    /// Capacité de la fenêtre de vote [1, 64].
    pub window: usize,
    pub ordering: WindowOrdering,
    /// Consecutive no-face frames before a reset. None = `window`.
    pub no_face_reset_frames: Option<usize>,
}

impl SmoothingConfig {
    /// Number of consecutive no-face frames tolerated before the session resets.
    #[must_use]
    pub fn reset_after(&self) -> usize {
        self.no_face_reset_frames.unwrap_or(self.window)
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: 5,
            ordering: WindowOrdering::Arrival,
            no_face_reset_frames: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// Classifier une frame sur K [1, 120].
    pub frame_skip: u32,
    /// Nombre de workers de classification [1, 32].
    pub workers: usize,
    /// Jobs en attente au-delà desquels les frames sont abandonnées [1, 256].
    pub queue_capacity: usize,
    /// Âge maximal d'un résultat avant qu'il soit jeté [10, 10000] ms.
    pub task_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            frame_skip: 3,
            workers: 2,
            queue_capacity: 4,
            task_timeout_ms: 250,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct BlendConfig {
    pub enabled: bool,
    pub seed: u64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: 42,
        }
    }
}

impl AppConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization and CLI overrides.
    pub fn clamp_all(&mut self) {
        self.smoothing.window = self.smoothing.window.clamp(1, 64);
        if let Some(n) = self.smoothing.no_face_reset_frames.as_mut() {
            *n = (*n).max(1);
        }
        self.dispatch.frame_skip = self.dispatch.frame_skip.clamp(1, 120);
        self.dispatch.workers = self.dispatch.workers.clamp(1, 32);
        self.dispatch.queue_capacity = self.dispatch.queue_capacity.clamp(1, 256);
        self.dispatch.task_timeout_ms = self.dispatch.task_timeout_ms.clamp(10, 10_000);
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    artifacts: Option<ArtifactsSection>,
    smoothing: Option<SmoothingSection>,
    dispatch: Option<DispatchSection>,
    blend: Option<BlendSection>,
}

#[derive(Deserialize)]
struct ArtifactsSection {
    dir: Option<PathBuf>,
    hyperparams: Option<String>,
    weights: Option<String>,
    normalization: Option<String>,
    labels: Option<String>,
}

#[derive(Deserialize)]
struct SmoothingSection {
    window: Option<usize>,
    ordering: Option<WindowOrdering>,
    no_face_reset_frames: Option<usize>,
}

#[derive(Deserialize)]
struct DispatchSection {
    frame_skip: Option<u32>,
    workers: Option<usize>,
    queue_capacity: Option<usize>,
    task_timeout_ms: Option<u64>,
}

#[derive(Deserialize)]
struct BlendSection {
    enabled: Option<bool>,
    seed: Option<u64>,
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// Relative artifact directories are resolved against the config file's directory.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use fm_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    let mut config = parse_config(&content)
        .with_context(|| format!("Erreur de parsing TOML dans {}", path.display()))?;

    if config.artifacts.dir.is_relative()
        && let Some(parent) = path.parent()
    {
        config.artifacts.dir = parent.join(&config.artifacts.dir);
    }
    Ok(config)
}

/// Parse TOML text over the defaults.
///
/// # Errors
/// Returns an error on invalid TOML or mistyped fields.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let file: ConfigFile = toml::from_str(content)?;
    let mut config = AppConfig::default();

    if let Some(a) = file.artifacts {
        if let Some(v) = a.dir {
            config.artifacts.dir = v;
        }
        if let Some(v) = a.hyperparams {
            config.artifacts.hyperparams = v;
        }
        if let Some(v) = a.weights {
            config.artifacts.weights = v;
        }
        if let Some(v) = a.normalization {
            config.artifacts.normalization = v;
        }
        if let Some(v) = a.labels {
            config.artifacts.labels = v;
        }
    }

    if let Some(s) = file.smoothing {
        if let Some(v) = s.window {
            config.smoothing.window = v;
        }
        if let Some(v) = s.ordering {
            config.smoothing.ordering = v;
        }
        if s.no_face_reset_frames.is_some() {
            config.smoothing.no_face_reset_frames = s.no_face_reset_frames;
        }
    }

    if let Some(d) = file.dispatch {
        if let Some(v) = d.frame_skip {
            config.dispatch.frame_skip = v;
        }
        if let Some(v) = d.workers {
            config.dispatch.workers = v;
        }
        if let Some(v) = d.queue_capacity {
            config.dispatch.queue_capacity = v;
        }
        if let Some(v) = d.task_timeout_ms {
            config.dispatch.task_timeout_ms = v;
        }
    }

    if let Some(b) = file.blend {
        if let Some(v) = b.enabled {
            config.blend.enabled = v;
        }
        if let Some(v) = b.seed {
            config.blend.seed = v;
        }
    }

    config.clamp_all();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(parse_config("").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_sections_override_defaults() {
        let config = parse_config(
            r#"
            [smoothing]
            ordering = "Sequence"

            [dispatch]
            frame_skip = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.smoothing.window, 5);
        assert_eq!(config.smoothing.ordering, WindowOrdering::Sequence);
        assert_eq!(config.dispatch.frame_skip, 5);
        assert_eq!(config.dispatch.workers, 2);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = parse_config(
            r"
            [smoothing]
            window = 0
            [dispatch]
            frame_skip = 0
            workers = 1000
            ",
        )
        .unwrap();
        assert_eq!(config.smoothing.window, 1);
        assert_eq!(config.dispatch.frame_skip, 1);
        assert_eq!(config.dispatch.workers, 32);
    }

    #[test]
    fn reset_after_defaults_to_window() {
        let mut s = SmoothingConfig::default();
        assert_eq!(s.reset_after(), 5);
        s.no_face_reset_frames = Some(12);
        assert_eq!(s.reset_after(), 12);
    }

    #[test]
    fn relative_artifact_dir_resolves_against_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facemood.toml");
        std::fs::write(&path, "[artifacts]\ndir = \"model\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.artifacts.dir, dir.path().join("model"));
        assert_eq!(
            config.artifacts.labels_path(),
            dir.path().join("model").join("labels.json")
        );
    }

    #[test]
    fn shipped_default_toml_matches_defaults() {
        let config = parse_config(include_str!("../../../config/default.toml")).unwrap();
        let expected = AppConfig {
            artifacts: ArtifactPaths {
                dir: PathBuf::from("../backend"),
                ..ArtifactPaths::default()
            },
            ..AppConfig::default()
        };
        assert_eq!(config, expected);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(parse_config("[dispatch\nframe_skip = 3").is_err());
    }
}
