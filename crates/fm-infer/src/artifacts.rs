//! Chargement des trois artefacts produits par l'entraînement :
//! hyperparamètres + poids figés, paire mean/std, table des labels.

use std::path::Path;

use anyhow::{Context, Result};
use fm_core::config::ArtifactPaths;
use serde::{Deserialize, Serialize};

use crate::classifier::LabelTable;
use crate::context::ModelContext;
use crate::model::{ClassifierWeights, Hyperparams};
use crate::normalize::NormalizationParams;

/// On-disk layout of the normalization artifact.
#[derive(Debug, Deserialize, Serialize)]
pub struct NormalizationFile {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_hyperparams(path: &Path) -> Result<Hyperparams> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Hyperparamètres invalides dans {}", path.display()))
}

/// # Errors
/// Returns an error if the file cannot be read, parsed, or holds a non-positive std.
pub fn load_normalization(path: &Path) -> Result<NormalizationParams> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    let file: NormalizationFile = serde_json::from_str(&text)
        .with_context(|| format!("JSON mean/std invalide dans {}", path.display()))?;
    NormalizationParams::new(file.mean, file.std)
        .with_context(|| format!("Paramètres de normalisation corrompus : {}", path.display()))
}

/// # Errors
/// Returns an error if the file cannot be read or is not a non-empty array of strings.
pub fn load_labels(path: &Path) -> Result<LabelTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    let labels: Vec<String> = serde_json::from_str(&text)
        .with_context(|| format!("Table de labels invalide dans {}", path.display()))?;
    Ok(LabelTable::new(labels)?)
}

/// Read the weights blob: bincode, or JSON when the extension is `.json`.
///
/// # Errors
/// Returns an error if the file cannot be read or decoded.
pub fn load_weights(path: &Path) -> Result<ClassifierWeights> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Impossible de lire {}", path.display()))?;
    if is_json(path) {
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Poids JSON invalides dans {}", path.display()))
    } else {
        bincode::deserialize(&bytes)
            .with_context(|| format!("Poids bincode invalides dans {}", path.display()))
    }
}

/// Write the weights blob in the format chosen by the extension.
///
/// # Errors
/// Returns an error if encoding or writing fails.
pub fn save_weights(path: &Path, weights: &ClassifierWeights) -> Result<()> {
    let bytes = if is_json(path) {
        serde_json::to_vec(weights)?
    } else {
        bincode::serialize(weights)?
    };
    std::fs::write(path, bytes).with_context(|| format!("Impossible d'écrire {}", path.display()))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Load and cross-check all artifacts.
///
/// # Errors
/// Returns an error if any artifact is missing, corrupt, or dimensionally
/// inconsistent with the others. The process must not start in that case.
///
/// # Example
/// ```no_run
/// use fm_core::config::ArtifactPaths;
/// use fm_infer::artifacts::load_context;
/// let ctx = load_context(&ArtifactPaths::default()).unwrap();
/// println!("{} classes", ctx.labels().len());
/// ```
pub fn load_context(paths: &ArtifactPaths) -> Result<ModelContext> {
    let hyper = load_hyperparams(&paths.hyperparams_path())?;
    let params = load_normalization(&paths.normalization_path())?;
    let labels = load_labels(&paths.labels_path())?;
    let weights = load_weights(&paths.weights_path())?;
    log::info!(
        "Artefacts chargés depuis {} (input_dim={}, hidden_dim={}, n_layers={}, n_heads={}, n_classes={})",
        paths.dir.display(),
        hyper.input_dim,
        hyper.hidden_dim,
        hyper.n_layers,
        hyper.n_heads,
        hyper.n_classes
    );
    ModelContext::from_weights(hyper, params, weights, labels)
        .context("Artefacts du modèle incohérents entre eux")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::{EMOTIONS, hyper};
    use crate::model::{Dense, ModelWeights};
    use fm_core::landmarks::FEATURE_DIM;

    fn write_artifacts(dir: &Path, weights_name: &str, n_labels: usize) -> ArtifactPaths {
        let paths = ArtifactPaths {
            dir: dir.to_path_buf(),
            weights: weights_name.into(),
            ..ArtifactPaths::default()
        };
        std::fs::write(
            paths.hyperparams_path(),
            serde_json::to_string(&hyper(6)).unwrap(),
        )
        .unwrap();
        let norm = NormalizationFile {
            mean: vec![0.0; FEATURE_DIM],
            std: vec![1.0; FEATURE_DIM],
        };
        std::fs::write(paths.normalization_path(), serde_json::to_string(&norm).unwrap())
            .unwrap();
        let labels: Vec<&str> = EMOTIONS.iter().take(n_labels).copied().collect();
        std::fs::write(paths.labels_path(), serde_json::to_string(&labels).unwrap()).unwrap();
        let mut dense = Dense::zeros(FEATURE_DIM, 6);
        dense.bias = vec![0.0, 0.0, 0.0, 3.0, 0.0, 0.0];
        save_weights(
            &paths.weights_path(),
            &ClassifierWeights::new(ModelWeights::Linear(dense)),
        )
        .unwrap();
        paths
    }

    #[test]
    fn loads_consistent_bincode_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), "emotion_model.bin", 6);
        let ctx = load_context(&paths).unwrap();
        assert_eq!(ctx.labels().len(), 6);
        assert_eq!(ctx.model_name(), "linear");
    }

    #[test]
    fn loads_json_weights() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), "emotion_model.json", 6);
        assert!(load_context(&paths).is_ok());
    }

    #[test]
    fn refuses_label_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), "emotion_model.bin", 5);
        let err = load_context(&paths).err().unwrap();
        assert!(format!("{err:#}").contains("label table vs n_classes"));
    }

    #[test]
    fn refuses_zero_std() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), "emotion_model.bin", 6);
        let mut std = vec![1.0; FEATURE_DIM];
        std[100] = 0.0;
        let norm = NormalizationFile {
            mean: vec![0.0; FEATURE_DIM],
            std,
        };
        std::fs::write(paths.normalization_path(), serde_json::to_string(&norm).unwrap())
            .unwrap();
        let err = load_context(&paths).err().unwrap();
        assert!(format!("{err:#}").contains("std[100]"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths {
            dir: dir.path().to_path_buf(),
            ..ArtifactPaths::default()
        };
        let err = load_context(&paths).err().unwrap();
        assert!(err.to_string().contains("model_hyperparams.json"));
    }
}
