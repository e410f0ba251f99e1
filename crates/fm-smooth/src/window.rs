use std::collections::VecDeque;
use std::sync::Arc;

use fm_core::config::WindowOrdering;
use fm_core::emotion::EmotionObservation;

/// Fenêtre glissante bornée des derniers labels.
///
/// In [`WindowOrdering::Arrival`] mode the front is the oldest push. In
/// [`WindowOrdering::Sequence`] mode entries are kept sorted by frame
/// sequence, so the front is the oldest frame.
///
/// # Example
/// ```
/// use fm_core::config::WindowOrdering;
/// use fm_core::emotion::EmotionObservation;
/// use fm_smooth::SmoothingWindow;
///
/// let mut w = SmoothingWindow::new(5, WindowOrdering::Arrival);
/// for (i, l) in ["A", "A", "B", "A", "B"].into_iter().enumerate() {
///     w.push(EmotionObservation::new(l, i as u64, 0));
/// }
/// assert_eq!(w.majority().as_deref(), Some("A"));
/// ```
#[derive(Clone, Debug)]
pub struct SmoothingWindow {
    entries: VecDeque<EmotionObservation>,
    capacity: usize,
    ordering: WindowOrdering,
}

impl SmoothingWindow {
    /// A zero capacity is raised to 1.
    #[must_use]
    pub fn new(capacity: usize, ordering: WindowOrdering) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
            ordering,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn ordering(&self) -> WindowOrdering {
        self.ordering
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Labels from front (oldest) to back (newest).
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|o| &*o.label)
    }

    /// Insert an observation, evicting the oldest entry past capacity.
    ///
    /// Returns `false` when the observation is dropped: only in sequence
    /// mode, for a frame older than every member of a full window.
    pub fn push(&mut self, obs: EmotionObservation) -> bool {
        match self.ordering {
            WindowOrdering::Arrival => self.entries.push_back(obs),
            WindowOrdering::Sequence => {
                if self.is_full()
                    && self
                        .entries
                        .front()
                        .is_some_and(|oldest| obs.sequence < oldest.sequence)
                {
                    return false;
                }
                let at = self.entries.partition_point(|e| e.sequence <= obs.sequence);
                self.entries.insert(at, obs);
            }
        }
        self.evict();
        true
    }

    /// Change the capacity, evicting the oldest entries if it shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Most frequent label; ties go to the most recent label among the tied set.
    #[must_use]
    pub fn majority(&self) -> Option<Arc<str>> {
        let mut counts: Vec<(&Arc<str>, usize)> = Vec::with_capacity(self.entries.len());
        for obs in &self.entries {
            match counts.iter_mut().find(|(l, _)| **l == obs.label) {
                Some((_, n)) => *n += 1,
                None => counts.push((&obs.label, 1)),
            }
        }
        let best = counts.iter().map(|&(_, n)| n).max()?;
        // newest → oldest: the first label reaching `best` is the most recent
        self.entries.iter().rev().find_map(|obs| {
            counts
                .iter()
                .any(|&(l, n)| n == best && *l == obs.label)
                .then(|| Arc::clone(&obs.label))
        })
    }

    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(label: &str, seq: u64) -> EmotionObservation {
        EmotionObservation::new(label, seq, 0)
    }

    fn arrival(labels: &[&str]) -> SmoothingWindow {
        let mut w = SmoothingWindow::new(5, WindowOrdering::Arrival);
        for (i, l) in labels.iter().enumerate() {
            assert!(w.push(obs(l, i as u64)));
        }
        w
    }

    #[test]
    fn majority_of_reference_window() {
        assert_eq!(arrival(&["A", "A", "B", "A", "B"]).majority().as_deref(), Some("A"));
    }

    #[test]
    fn eviction_then_tie_goes_to_most_recent() {
        let mut w = arrival(&["A", "A", "B", "B", "C"]);
        w.push(obs("C", 5));
        assert_eq!(w.labels().collect::<Vec<_>>(), ["A", "B", "B", "C", "C"]);
        assert_eq!(w.majority().as_deref(), Some("C"));
    }

    #[test]
    fn size_is_bounded() {
        let mut w = SmoothingWindow::new(5, WindowOrdering::Arrival);
        for i in 0..20 {
            w.push(obs(if i % 3 == 0 { "A" } else { "B" }, i));
            assert!(w.len() <= 5);
            if i >= 4 {
                assert_eq!(w.len(), 5);
            }
        }
    }

    #[test]
    fn empty_window_has_no_majority() {
        assert_eq!(SmoothingWindow::new(5, WindowOrdering::Arrival).majority(), None);
    }

    #[test]
    fn arrival_keeps_completion_order() {
        let mut w = SmoothingWindow::new(3, WindowOrdering::Arrival);
        for (l, s) in [("A", 9), ("B", 3), ("C", 6)] {
            w.push(obs(l, s));
        }
        assert_eq!(w.labels().collect::<Vec<_>>(), ["A", "B", "C"]);
    }

    #[test]
    fn sequence_mode_sorts_and_drops_stale() {
        let mut w = SmoothingWindow::new(3, WindowOrdering::Sequence);
        for (l, s) in [("A", 9), ("B", 3), ("C", 6)] {
            assert!(w.push(obs(l, s)));
        }
        assert_eq!(w.labels().collect::<Vec<_>>(), ["B", "C", "A"]);
        // older than everything in a full window
        assert!(!w.push(obs("D", 1)));
        assert_eq!(w.len(), 3);
        // in the middle: evicts the oldest frame
        assert!(w.push(obs("E", 7)));
        assert_eq!(w.labels().collect::<Vec<_>>(), ["C", "E", "A"]);
    }

    #[test]
    fn sequence_tie_prefers_latest_frame() {
        let mut w = SmoothingWindow::new(4, WindowOrdering::Sequence);
        // completion order B(12), A(3), A(6), B(9); by frame: A A B B
        for (l, s) in [("B", 12), ("A", 3), ("A", 6), ("B", 9)] {
            w.push(obs(l, s));
        }
        assert_eq!(w.majority().as_deref(), Some("B"));
    }

    #[test]
    fn shrinking_capacity_evicts_oldest() {
        let mut w = arrival(&["A", "B", "C", "D", "E"]);
        w.set_capacity(2);
        assert_eq!(w.labels().collect::<Vec<_>>(), ["D", "E"]);
        w.set_capacity(0);
        assert_eq!(w.capacity(), 1);
    }
}
