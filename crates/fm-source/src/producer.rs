use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use fm_core::frame::Frame;
use fm_core::traits::FrameSource;

/// Profondeur du canal source → dispatcher.
pub const SOURCE_CHANNEL_DEPTH: usize = 3;

/// Spawn the producer thread that drains `source` into a bounded channel.
///
/// With `fps`, frames are paced to that rate; without it the thread runs
/// as fast as the consumer accepts frames. The thread ends when the source
/// is exhausted or the receiver is dropped.
///
/// # Errors
/// Returns an error if the thread cannot be spawned.
///
/// # Example
/// ```
/// use fm_core::frame::Frame;
/// use fm_source::{MemorySource, spawn_source_thread};
///
/// let rx = spawn_source_thread(MemorySource::new(vec![Frame::no_face(0)]), None).unwrap();
/// assert_eq!(rx.iter().count(), 1);
/// ```
pub fn spawn_source_thread<S: FrameSource>(
    mut source: S,
    fps: Option<u32>,
) -> Result<flume::Receiver<Frame>> {
    let (frame_tx, frame_rx) = flume::bounded(SOURCE_CHANNEL_DEPTH);
    let frame_duration = fps
        .filter(|&f| f > 0)
        .map(|f| Duration::from_secs(1) / f);

    std::thread::Builder::new()
        .name("fm-source".into())
        .spawn(move || {
            let live = source.is_live();
            log::info!("Source démarrée (live={live}, fps={fps:?})");
            let mut sent = 0u64;
            loop {
                let start = Instant::now();
                let Some(frame) = source.next_frame() else {
                    break;
                };
                if frame_tx.send(frame).is_err() {
                    log::debug!("Récepteur fermé, arrêt de la source");
                    break;
                }
                sent += 1;
                if let Some(target) = frame_duration {
                    let sleep_dur = target.saturating_sub(start.elapsed());
                    if !sleep_dur.is_zero() {
                        std::thread::sleep(sleep_dur);
                    }
                }
            }
            log::info!("Source terminée après {sent} frames");
        })
        .context("Impossible de lancer le thread source")?;

    Ok(frame_rx)
}
