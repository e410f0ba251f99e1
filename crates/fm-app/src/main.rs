use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use clap::Parser;
use fm_core::config::AppConfig;
use fm_infer::ModelContext;
use fm_source::JsonlSource;

pub mod cli;
pub mod dispatch;
pub mod hotreload;
pub mod pipeline;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Valider le mode
    let mode = cli.validate_mode()?;

    // 4. Charger la config + overrides CLI
    let mut config = resolve_config(&cli)?;
    cli.apply_overrides(&mut config);

    // 5. Charger les artefacts (refus de démarrer si incohérents)
    let ctx = Arc::new(
        fm_infer::artifacts::load_context(&config.artifacts)
            .context("Chargement des artefacts du modèle")?,
    );

    match mode {
        cli::Mode::Check => {
            print_check(&ctx);
            Ok(())
        }
        cli::Mode::Request(path) => {
            let input = open_input(&path)?;
            let mut out = open_output(cli.output.as_deref())?;
            pipeline::run_predict(&ctx, input, &mut out)?;
            Ok(())
        }
        cli::Mode::Stream(path) => run_stream_mode(&cli, &path, ctx, config),
    }
}

fn run_stream_mode(
    cli: &cli::Cli,
    path: &Path,
    ctx: Arc<ModelContext>,
    config: AppConfig,
) -> Result<()> {
    let config = Arc::new(ArcSwap::from_pointee(config));

    // Hot-reload config (thread interne notify)
    let _watcher = if cli.config.exists() {
        let reload_cli = cli.clone();
        match hotreload::spawn_config_watcher(&cli.config, &config, move |c: &mut AppConfig| {
            reload_cli.apply_overrides(c);
        }) {
            Ok(w) => Some(w),
            Err(e) => {
                log::warn!("Hot-reload indisponible : {e}");
                None
            }
        }
    } else {
        None
    };

    // Ctrl+C : arrêt propre, la file est vidée et les workers joints
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    ctrlc::set_handler(move || stop_handler.store(true, Ordering::Relaxed))
        .context("Impossible d'installer le handler Ctrl+C")?;

    let mut out = open_output(cli.output.as_deref())?;
    let stats = if path == Path::new("-") {
        pipeline::run_stream(JsonlSource::stdin(), cli.fps, ctx, config, &mut out, &stop)?
    } else {
        let source = JsonlSource::open(path)?;
        pipeline::run_stream(source, cli.fps, ctx, config, &mut out, &stop)?
    };
    if stats.dropped > 0 || stats.failed > 0 {
        log::warn!(
            "{} frames ignorées (file pleine), {} classifications échouées",
            stats.dropped,
            stats.failed
        );
    }
    Ok(())
}

fn print_check(ctx: &ModelContext) {
    let hyper = ctx.hyperparams();
    let labels: Vec<&str> = ctx.labels().iter().collect();
    println!(
        "Artefacts OK : modèle {} (input_dim={}, hidden_dim={}, n_layers={}, n_heads={}), {} classes : {}",
        ctx.model_name(),
        hyper.input_dim,
        hyper.hidden_dim,
        hyper.n_layers,
        hyper.n_heads,
        labels.len(),
        labels.join(", ")
    );
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(std::io::stdin().lock()));
    }
    let file =
        File::open(path).with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file =
                File::create(p).with_context(|| format!("Impossible de créer {}", p.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(std::io::stdout().lock()))),
    }
}

/// Config file when present, defaults otherwise.
fn resolve_config(cli: &cli::Cli) -> Result<AppConfig> {
    if cli.config.exists() {
        fm_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(AppConfig::default())
    }
}
