use fm_core::config::SmoothingConfig;
use fm_core::emotion::{EmotionObservation, StableEmotion};

use crate::window::SmoothingWindow;

/// Cycle de vie du lisseur.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmootherState {
    /// No observation since creation or the last reset.
    Empty,
    /// Some observations, fewer than the window capacity.
    Filling,
    /// Window at capacity; each push evicts the oldest entry.
    Stable,
}

/// Lisseur temporel : vote majoritaire sur les N derniers labels.
///
/// Observations carry the session they were submitted under; every
/// [`TemporalSmoother::reset`] opens a new session and results from an
/// older one are discarded.
///
/// # Example
/// ```
/// use fm_core::config::SmoothingConfig;
/// use fm_core::emotion::{EmotionObservation, StableEmotion};
/// use fm_smooth::TemporalSmoother;
///
/// let mut s = TemporalSmoother::new(&SmoothingConfig::default());
/// assert_eq!(s.current(), &StableEmotion::NoFace);
/// let out = s.push(EmotionObservation::new("Happy", 0, s.session()));
/// assert_eq!(out.label(), Some("Happy"));
/// ```
#[derive(Clone, Debug)]
pub struct TemporalSmoother {
    window: SmoothingWindow,
    session: u64,
    current: StableEmotion,
    discarded: u64,
}

impl TemporalSmoother {
    #[must_use]
    pub fn new(config: &SmoothingConfig) -> Self {
        Self {
            window: SmoothingWindow::new(config.window, config.ordering),
            session: 0,
            current: StableEmotion::NoFace,
            discarded: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> SmootherState {
        if self.window.is_empty() {
            SmootherState::Empty
        } else if self.window.is_full() {
            SmootherState::Stable
        } else {
            SmootherState::Filling
        }
    }

    #[must_use]
    pub fn session(&self) -> u64 {
        self.session
    }

    #[must_use]
    pub fn current(&self) -> &StableEmotion {
        &self.current
    }

    #[must_use]
    pub fn window(&self) -> &SmoothingWindow {
        &self.window
    }

    /// Observations dropped so far: closed session or stale frame.
    #[must_use]
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Add an observation and return the stabilized label.
    ///
    /// A discarded observation leaves the window untouched and the current
    /// label is returned as is.
    pub fn push(&mut self, obs: EmotionObservation) -> StableEmotion {
        if obs.session != self.session {
            log::debug!(
                "Résultat de la session {} ignoré (session courante {})",
                obs.session,
                self.session
            );
            self.discarded += 1;
            return self.current.clone();
        }
        let sequence = obs.sequence;
        if !self.window.push(obs) {
            log::debug!("Résultat périmé ignoré (frame {sequence})");
            self.discarded += 1;
            return self.current.clone();
        }
        self.current = self
            .window
            .majority()
            .map_or(StableEmotion::NoFace, StableEmotion::Label);
        self.current.clone()
    }

    /// Clear the window and open a new session. Returns the new session id.
    pub fn reset(&mut self) -> u64 {
        self.window.clear();
        self.session += 1;
        self.current = StableEmotion::NoFace;
        log::debug!("Lisseur réinitialisé, session {}", self.session);
        self.session
    }

    /// Apply a new window size from a reloaded config.
    ///
    /// Shrinking evicts the oldest entries; the ordering policy is fixed at
    /// construction.
    pub fn reconfigure(&mut self, config: &SmoothingConfig) {
        if config.window == self.window.capacity() {
            return;
        }
        self.window.set_capacity(config.window);
        if let Some(label) = self.window.majority() {
            self.current = StableEmotion::Label(label);
        }
        log::info!("Fenêtre de lissage redimensionnée à {}", self.window.capacity());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fm_core::config::WindowOrdering;

    fn smoother() -> TemporalSmoother {
        TemporalSmoother::new(&SmoothingConfig::default())
    }

    fn push(s: &mut TemporalSmoother, label: &str, seq: u64) -> StableEmotion {
        let session = s.session();
        s.push(EmotionObservation::new(label, seq, session))
    }

    #[test]
    fn state_machine_transitions() {
        let mut s = smoother();
        assert_eq!(s.state(), SmootherState::Empty);
        push(&mut s, "A", 0);
        assert_eq!(s.state(), SmootherState::Filling);
        for i in 1..5 {
            push(&mut s, "A", i);
        }
        assert_eq!(s.state(), SmootherState::Stable);
        push(&mut s, "B", 5);
        assert_eq!(s.state(), SmootherState::Stable);
        assert_eq!(s.window().len(), 5);
        s.reset();
        assert_eq!(s.state(), SmootherState::Empty);
    }

    #[test]
    fn empty_reports_no_face() {
        assert_eq!(smoother().current(), &StableEmotion::NoFace);
    }

    #[test]
    fn reference_sequences() {
        let mut s = smoother();
        let mut last = StableEmotion::NoFace;
        for (i, l) in ["A", "A", "B", "A", "B"].into_iter().enumerate() {
            last = push(&mut s, l, i as u64);
        }
        assert_eq!(last.label(), Some("A"));

        let mut s = smoother();
        for (i, l) in ["A", "A", "B", "B", "C"].into_iter().enumerate() {
            push(&mut s, l, i as u64);
        }
        assert_eq!(push(&mut s, "C", 5).label(), Some("C"));
    }

    #[test]
    fn push_after_reset_reports_single_label() {
        let mut s = smoother();
        for i in 0..5 {
            push(&mut s, "Angry", i);
        }
        s.reset();
        assert_eq!(s.current(), &StableEmotion::NoFace);
        assert_eq!(push(&mut s, "Happy", 6).label(), Some("Happy"));
        assert_eq!(s.window().len(), 1);
    }

    #[test]
    fn results_from_a_closed_session_are_discarded() {
        let mut s = smoother();
        let old = s.session();
        push(&mut s, "Sad", 0);
        let new = s.reset();
        assert!(new > old);
        let out = s.push(EmotionObservation::new("Sad", 1, old));
        assert_eq!(out, StableEmotion::NoFace);
        assert!(s.window().is_empty());
        assert_eq!(s.discarded(), 1);
    }

    #[test]
    fn stale_frame_keeps_current_label() {
        let config = SmoothingConfig {
            window: 2,
            ordering: WindowOrdering::Sequence,
            no_face_reset_frames: None,
        };
        let mut s = TemporalSmoother::new(&config);
        push(&mut s, "Fear", 10);
        push(&mut s, "Fear", 11);
        assert_eq!(push(&mut s, "Happy", 2).label(), Some("Fear"));
        assert_eq!(s.discarded(), 1);
    }

    #[test]
    fn reconfigure_resizes_window() {
        let mut s = smoother();
        for (i, l) in ["A", "A", "A", "B", "B"].into_iter().enumerate() {
            push(&mut s, l, i as u64);
        }
        assert_eq!(s.current().label(), Some("A"));
        s.reconfigure(&SmoothingConfig {
            window: 2,
            ..SmoothingConfig::default()
        });
        assert_eq!(s.current().label(), Some("B"));
        assert_eq!(s.state(), SmootherState::Stable);
    }
}
