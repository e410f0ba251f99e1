use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use fm_core::config::SmoothingConfig;
use fm_core::emotion::{EmotionObservation, StableEmotion};

use crate::smoother::TemporalSmoother;

/// Lisseur partagé entre le dispatcher et les workers.
///
/// Push, eviction and recompute run under one `Mutex`; the stabilized
/// label is republished through an `ArcSwap` so readers never lock.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use fm_core::config::SmoothingConfig;
/// use fm_core::emotion::EmotionObservation;
/// use fm_smooth::SharedSmoother;
///
/// let smoother = Arc::new(SharedSmoother::new(&SmoothingConfig::default()));
/// smoother.push(EmotionObservation::new("Neutral", 0, smoother.session()));
/// assert_eq!(smoother.current().label(), Some("Neutral"));
/// ```
pub struct SharedSmoother {
    inner: Mutex<TemporalSmoother>,
    snapshot: ArcSwap<StableEmotion>,
    session: AtomicU64,
}

impl SharedSmoother {
    #[must_use]
    pub fn new(config: &SmoothingConfig) -> Self {
        let smoother = TemporalSmoother::new(config);
        let session = smoother.session();
        Self {
            inner: Mutex::new(smoother),
            snapshot: ArcSwap::from_pointee(StableEmotion::NoFace),
            session: AtomicU64::new(session),
        }
    }

    /// Session new submissions must be tagged with.
    #[must_use]
    pub fn session(&self) -> u64 {
        self.session.load(Ordering::Acquire)
    }

    /// Last published label, without locking.
    #[must_use]
    pub fn current(&self) -> Arc<StableEmotion> {
        self.snapshot.load_full()
    }

    pub fn push(&self, obs: EmotionObservation) -> StableEmotion {
        let mut guard = self.lock();
        let out = guard.push(obs);
        self.snapshot.store(Arc::new(out.clone()));
        out
    }

    /// Immediate reset; in-flight results of the previous session will be
    /// discarded on arrival.
    pub fn reset(&self) -> u64 {
        let mut guard = self.lock();
        let session = guard.reset();
        self.session.store(session, Ordering::Release);
        self.snapshot.store(Arc::new(StableEmotion::NoFace));
        session
    }

    pub fn reconfigure(&self, config: &SmoothingConfig) {
        let mut guard = self.lock();
        guard.reconfigure(config);
        self.snapshot.store(Arc::new(guard.current().clone()));
    }

    #[must_use]
    pub fn discarded(&self) -> u64 {
        self.lock().discarded()
    }

    #[must_use]
    pub fn window_len(&self) -> usize {
        self.lock().window().len()
    }

    // A panic in another holder leaves the window consistent: every
    // mutation completes before anything that could unwind.
    fn lock(&self) -> MutexGuard<'_, TemporalSmoother> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
