use std::path::PathBuf;

use clap::Parser;
use fm_core::config::{AppConfig, WindowOrdering};

/// facemood: emotion classification from 468-point face meshes.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Répertoire des artefacts du modèle (remplace [artifacts].dir).
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Requêtes JSON, une par ligne ("-" pour stdin). Réponses en JSON lines.
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// Flux de frames JSON lines ("-" pour stdin) passé au dispatcher.
    #[arg(long)]
    pub stream: Option<PathBuf>,

    /// Charger et vérifier les artefacts puis quitter.
    #[arg(long, default_value_t = false)]
    pub check: bool,

    /// Analyser une frame sur N.
    #[arg(long)]
    pub frame_skip: Option<u32>,

    /// Nombre de workers de classification.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Taille de la fenêtre de lissage.
    #[arg(long)]
    pub window: Option<usize>,

    /// Ordre de la fenêtre : arrival, sequence.
    #[arg(long)]
    pub ordering: Option<String>,

    /// Activer le mélange en sous-catégories d'émotion.
    #[arg(long, default_value_t = false)]
    pub blend: bool,

    /// Graine du tirage de mélange.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Cadence de relecture du flux (frames/s). Sans valeur : aussi vite que possible.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Fichier de sortie. Défaut : stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Mode d'exécution choisi en ligne de commande.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Request(PathBuf),
    Stream(PathBuf),
    Check,
}

impl Cli {
    /// Validate that exactly one mode is provided.
    ///
    /// # Errors
    /// Returns an error if zero or more than one mode is specified.
    pub fn validate_mode(&self) -> anyhow::Result<Mode> {
        let count = usize::from(self.request.is_some())
            + usize::from(self.stream.is_some())
            + usize::from(self.check);

        if count == 0 {
            anyhow::bail!("Aucun mode spécifié. Utilisez --request, --stream, ou --check.");
        }
        if count > 1 {
            anyhow::bail!("Un seul mode à la fois. Spécifiez --request, --stream, OU --check.");
        }
        Ok(match (&self.request, &self.stream) {
            (Some(path), _) => Mode::Request(path.clone()),
            (None, Some(path)) => Mode::Stream(path.clone()),
            (None, None) => Mode::Check,
        })
    }

    /// Apply command-line overrides on top of a file config, then clamp.
    ///
    /// Also re-applied after every hot reload so flags keep precedence.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(ref dir) = self.artifacts {
            config.artifacts.dir.clone_from(dir);
        }
        if let Some(v) = self.frame_skip {
            config.dispatch.frame_skip = v;
        }
        if let Some(v) = self.workers {
            config.dispatch.workers = v;
        }
        if let Some(v) = self.window {
            config.smoothing.window = v;
        }
        if let Some(ref ordering) = self.ordering {
            config.smoothing.ordering = match ordering.to_ascii_lowercase().as_str() {
                "arrival" => WindowOrdering::Arrival,
                "sequence" => WindowOrdering::Sequence,
                _ => {
                    log::warn!("Ordre inconnu '{ordering}', utilisation du défaut.");
                    config.smoothing.ordering
                }
            };
        }
        if self.blend {
            config.blend.enabled = true;
        }
        if let Some(v) = self.seed {
            config.blend.seed = v;
        }
        config.clamp_all();
    }
}
