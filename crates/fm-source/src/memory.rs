use std::collections::VecDeque;

use fm_core::frame::Frame;
use fm_core::traits::FrameSource;

/// Source en mémoire : rejoue une liste de frames préparées.
///
/// # Example
/// ```
/// use fm_core::frame::Frame;
/// use fm_core::traits::FrameSource;
/// use fm_source::MemorySource;
///
/// let mut source = MemorySource::new(vec![Frame::no_face(0), Frame::no_face(1)]);
/// assert_eq!(source.next_frame().map(|f| f.index), Some(0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<Frame>,
}

impl MemorySource {
    #[must_use]
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    fn is_live(&self) -> bool {
        false
    }
}
