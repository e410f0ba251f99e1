use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use fm_core::blend::blend;
use fm_core::config::AppConfig;
use fm_core::emotion::{EmotionObservation, StableEmotion};
use fm_core::error::PipelineError;
use fm_core::frame::Frame;
use fm_infer::ModelContext;
use fm_smooth::SharedSmoother;
use serde::Serialize;
use serde_json::Value;

/// Une frame soumise à la classification.
struct Job {
    sequence: u64,
    session: u64,
    landmarks: Value,
    submitted_at: Instant,
}

/// Compteurs du dispatcher, partagés avec les workers.
#[derive(Default)]
struct DispatchStats {
    submitted: AtomicU64,
    dropped: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
}

/// Snapshot of the dispatch counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Frames read from the source.
    pub frames: u64,
    /// Frames handed to the worker queue.
    pub submitted: u64,
    /// Frames selected for analysis but dropped on a full queue.
    pub dropped: u64,
    /// Classifications pushed to the smoother.
    pub completed: u64,
    /// Classification errors and caught panics.
    pub failed: u64,
    /// Results older than the task timeout.
    pub timed_out: u64,
    /// Results discarded by the smoother (closed session or stale frame).
    pub discarded: u64,
    /// Smoother resets after a run of no-face frames.
    pub resets: u64,
}

/// Contrôleur de dispatch : compteur de frames, throttle, pool de workers.
///
/// Only every `frame_skip`-th frame with a face is submitted; submission
/// never blocks (`try_send` on a bounded queue, excess frames dropped).
/// Workers classify, optionally blend, and push to the shared smoother in
/// completion order. Every frame gets the last stabilized label back.
pub struct Dispatcher {
    config: Arc<ArcSwap<AppConfig>>,
    smoother: Arc<SharedSmoother>,
    stats: Arc<DispatchStats>,
    job_tx: Option<flume::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    frames: u64,
    no_face_run: usize,
    resets: u64,
    window: usize,
}

impl Dispatcher {
    /// Spawn the worker pool. Pool size and queue capacity are read once here.
    ///
    /// # Errors
    /// Returns an error if a worker thread cannot be spawned.
    pub fn new(ctx: Arc<ModelContext>, config: Arc<ArcSwap<AppConfig>>) -> Result<Self> {
        let snapshot = config.load_full();
        let smoother = Arc::new(SharedSmoother::new(&snapshot.smoothing));
        let stats = Arc::new(DispatchStats::default());
        let (job_tx, job_rx) = flume::bounded(snapshot.dispatch.queue_capacity);

        let mut workers = Vec::with_capacity(snapshot.dispatch.workers);
        for id in 0..snapshot.dispatch.workers {
            let worker = Worker {
                id,
                ctx: Arc::clone(&ctx),
                config: Arc::clone(&config),
                smoother: Arc::clone(&smoother),
                stats: Arc::clone(&stats),
                rng: fastrand::Rng::with_seed(snapshot.blend.seed.wrapping_add(id as u64)),
            };
            let rx = job_rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("fm-worker-{id}"))
                .spawn(move || worker.run(&rx))
                .with_context(|| format!("Impossible de lancer le worker {id}"))?;
            workers.push(handle);
        }
        log::info!(
            "Dispatcher prêt : {} workers, file de {}, 1 frame sur {}",
            snapshot.dispatch.workers,
            snapshot.dispatch.queue_capacity,
            snapshot.dispatch.frame_skip
        );

        Ok(Self {
            config,
            smoother,
            stats,
            job_tx: Some(job_tx),
            workers,
            frames: 0,
            no_face_run: 0,
            resets: 0,
            window: snapshot.smoothing.window,
        })
    }

    #[must_use]
    pub fn smoother(&self) -> &Arc<SharedSmoother> {
        &self.smoother
    }

    /// Handle one frame and return the label to present for it.
    pub fn on_frame(&mut self, frame: Frame) -> StableEmotion {
        let config = self.config.load();
        if config.smoothing.window != self.window {
            self.window = config.smoothing.window;
            self.smoother.reconfigure(&config.smoothing);
        }

        let sequence = self.frames;
        self.frames += 1;

        if !frame.has_face() {
            self.no_face_run += 1;
            if self.no_face_run == config.smoothing.reset_after() + 1 {
                let session = self.smoother.reset();
                self.resets += 1;
                log::debug!(
                    "{} frames sans visage, nouvelle session {session}",
                    self.no_face_run
                );
            }
            return StableEmotion::NoFace;
        }
        self.no_face_run = 0;

        // 3e, 6e, 9e frame... pour frame_skip = 3
        let skip = u64::from(config.dispatch.frame_skip.max(1));
        if self.frames % skip == 0
            && let Some(landmarks) = frame.landmarks
        {
            self.submit(Job {
                sequence,
                session: self.smoother.session(),
                landmarks,
                submitted_at: Instant::now(),
            });
        }
        (*self.smoother.current()).clone()
    }

    fn submit(&self, job: Job) {
        let Some(tx) = self.job_tx.as_ref() else {
            return;
        };
        let sequence = job.sequence;
        match tx.try_send(job) {
            Ok(()) => {
                self.stats.submitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(flume::TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("File pleine, frame {sequence} ignorée");
            }
            Err(flume::TrySendError::Disconnected(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("Plus aucun worker actif, frame {sequence} ignorée");
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames: self.frames,
            submitted: self.stats.submitted.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
            completed: self.stats.completed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            timed_out: self.stats.timed_out.load(Ordering::Relaxed),
            discarded: self.smoother.discarded(),
            resets: self.resets,
        }
    }

    /// Close the queue, let the workers drain it, and join them.
    pub fn shutdown(mut self) -> StatsSnapshot {
        self.join_workers();
        self.stats()
    }

    fn join_workers(&mut self) {
        drop(self.job_tx.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("Un worker s'est terminé en panique");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.join_workers();
    }
}

struct Worker {
    id: usize,
    ctx: Arc<ModelContext>,
    config: Arc<ArcSwap<AppConfig>>,
    smoother: Arc<SharedSmoother>,
    stats: Arc<DispatchStats>,
    rng: fastrand::Rng,
}

impl Worker {
    fn run(mut self, rx: &flume::Receiver<Job>) {
        log::debug!("Worker {} démarré", self.id);
        while let Ok(job) = rx.recv() {
            self.handle(job);
        }
        log::debug!("Worker {} arrêté", self.id);
    }

    fn handle(&mut self, job: Job) {
        let config = self.config.load();
        let timeout = Duration::from_millis(config.dispatch.task_timeout_ms);
        if job.submitted_at.elapsed() > timeout {
            self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
            log::debug!("Frame {} expirée avant traitement", job.sequence);
            return;
        }

        let ctx = &self.ctx;
        let outcome = catch_unwind(AssertUnwindSafe(|| ctx.infer_json(&job.landmarks)))
            .unwrap_or_else(|payload| Err(PipelineError::TaskFailure(panic_message(&*payload))));
        let classification = match outcome {
            Ok(c) => c,
            Err(PipelineError::TaskFailure(msg)) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                log::error!("Panique pendant la classification de la frame {}: {msg}", job.sequence);
                return;
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("Classification de la frame {} échouée : {e}", job.sequence);
                return;
            }
        };

        if job.submitted_at.elapsed() > timeout {
            self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
            log::debug!("Résultat de la frame {} arrivé trop tard", job.sequence);
            return;
        }

        let mut obs: EmotionObservation = classification.into_observation(job.sequence, job.session);
        if config.blend.enabled
            && let Some(sub) = blend(&obs.label, &mut self.rng)
        {
            obs.label = Arc::from(sub);
        }
        let stable = self.smoother.push(obs);
        self.stats.completed.fetch_add(1, Ordering::Relaxed);
        log::debug!("Frame {} classée, émotion stable : {stable}", job.sequence);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic sans message".into())
}
