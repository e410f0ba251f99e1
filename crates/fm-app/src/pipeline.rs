use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use fm_core::config::AppConfig;
use fm_core::frame::FaceRegion;
use fm_core::traits::FrameSource;
use fm_infer::{ModelContext, PredictBody, predict_str};
use rayon::prelude::*;
use serde::Serialize;

use crate::dispatch::{Dispatcher, StatsSnapshot};

/// Délai max d'attente d'une frame avant de revérifier le signal d'arrêt.
const STOP_POLL: Duration = Duration::from_millis(100);

/// Une ligne de sortie du mode stream.
#[derive(Serialize)]
struct StreamLine {
    frame: u64,
    face: Option<FaceRegion>,
    emotion: String,
}

/// Une ligne de sortie du mode request : code HTTP + corps.
#[derive(Serialize)]
struct ResponseLine<'a> {
    code: u16,
    #[serde(flatten)]
    body: &'a PredictBody,
}

/// Drive a frame source through the dispatcher, one output line per frame.
///
/// Stops when the source is exhausted or `stop` is raised, then drains and
/// joins the workers.
///
/// # Errors
/// Returns an error if the source thread or workers cannot start, or on
/// output write failure.
pub fn run_stream<S: FrameSource>(
    source: S,
    fps: Option<u32>,
    ctx: Arc<ModelContext>,
    config: Arc<ArcSwap<AppConfig>>,
    out: &mut impl Write,
    stop: &AtomicBool,
) -> Result<StatsSnapshot> {
    let mut dispatcher = Dispatcher::new(ctx, config)?;
    let frame_rx = fm_source::spawn_source_thread(source, fps)?;

    while !stop.load(Ordering::Relaxed) {
        let frame = match frame_rx.recv_timeout(STOP_POLL) {
            Ok(frame) => frame,
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        };
        let index = frame.index;
        let face = frame.face.filter(|f| !f.is_empty());
        let emotion = dispatcher.on_frame(frame);
        let line = StreamLine {
            frame: index,
            face,
            emotion: emotion.to_string(),
        };
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out).context("Écriture de la sortie impossible")?;
    }
    if stop.load(Ordering::Relaxed) {
        log::info!("Arrêt demandé, vidage de la file");
    }
    out.flush()?;

    let stats = dispatcher.shutdown();
    log::info!(
        "Flux terminé : {} frames, {} soumises, {} ignorées (file pleine), {} classées, {} échecs, {} expirées, {} périmées, {} resets",
        stats.frames,
        stats.submitted,
        stats.dropped,
        stats.completed,
        stats.failed,
        stats.timed_out,
        stats.discarded,
        stats.resets
    );
    Ok(stats)
}

/// Answer one JSON request per input line, in input order.
///
/// Requests are classified in parallel; responses are written as
/// `{"code": 200|400|500, ...body}` lines. Blank lines are skipped.
/// Returns the number of requests answered.
///
/// # Errors
/// Returns an error on input read or output write failure.
pub fn run_predict(ctx: &ModelContext, input: impl BufRead, out: &mut impl Write) -> Result<usize> {
    let lines: Vec<String> = input
        .lines()
        .collect::<std::io::Result<_>>()
        .context("Lecture des requêtes impossible")?;
    let requests: Vec<&str> = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();

    let responses: Vec<_> = requests.par_iter().map(|r| predict_str(ctx, r)).collect();

    for resp in &responses {
        let line = ResponseLine {
            code: resp.status.code(),
            body: &resp.body,
        };
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out).context("Écriture de la sortie impossible")?;
    }
    out.flush()?;
    log::info!("{} requêtes traitées", responses.len());
    Ok(responses.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fm_core::frame::Frame;
    use fm_core::landmarks::FEATURE_DIM;
    use fm_infer::model::{Dense, ModelWeights};
    use fm_infer::{ClassifierWeights, Hyperparams, LabelTable, NormalizationParams};
    use fm_source::{JsonlSource, MemorySource};
    use serde_json::{Value, json};

    fn context() -> Arc<ModelContext> {
        let mut dense = Dense::zeros(FEATURE_DIM, 6);
        dense.bias = vec![0.1, 0.2, 5.0, 0.0, 0.3, 0.1];
        let hyper = Hyperparams {
            input_dim: FEATURE_DIM,
            hidden_dim: 8,
            n_layers: 0,
            n_heads: 1,
            dropout: 0.0,
            n_classes: 6,
        };
        let labels = ["Angry", "Disgust", "Fear", "Happy", "Neutral", "Sad"]
            .map(String::from)
            .to_vec();
        Arc::new(
            ModelContext::from_weights(
                hyper,
                NormalizationParams::identity(FEATURE_DIM),
                ClassifierWeights::new(ModelWeights::Linear(dense)),
                LabelTable::new(labels).unwrap(),
            )
            .unwrap(),
        )
    }

    fn points(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({"x": 0.25 + (i % 2) as f64 * 0.5, "y": 0.25 + (i % 3) as f64 * 0.25, "z": 0.0}))
            .collect()
    }

    fn output_lines(buf: &[u8]) -> Vec<Value> {
        std::str::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn predict_keeps_input_order_and_codes() {
        let ok = json!({"landmarks": {"index": 0, "points": points(468)}}).to_string();
        let short = json!({"landmarks": {"index": 0, "points": points(467)}}).to_string();
        let input = format!("{ok}\n\n{short}\nnot json\n{ok}\n");
        let mut out = Vec::new();
        let n = run_predict(&context(), input.as_bytes(), &mut out).unwrap();
        assert_eq!(n, 4);
        let lines = output_lines(&out);
        assert_eq!(lines[0], json!({"code": 200, "status": "success", "emotion": "Fear"}));
        assert_eq!(
            lines[1],
            json!({"code": 400, "error": "Landmark has 467 points, expected at least 468"})
        );
        assert_eq!(lines[2]["code"], 400);
        assert_eq!(lines[3]["emotion"], "Fear");
    }

    #[test]
    fn stream_writes_one_line_per_frame() {
        let face_line = json!({"index": 0, "points": points(468), "width": 640, "height": 480});
        let mut text = String::new();
        for i in 0..6 {
            let mut l = face_line.clone();
            l["index"] = json!(i);
            text.push_str(&l.to_string());
            text.push('\n');
        }
        text.push_str("{\"index\": 6}\n");
        let source = JsonlSource::from_reader(std::io::Cursor::new(text.into_bytes()));
        let config = Arc::new(ArcSwap::from_pointee(AppConfig::default()));
        let stop = AtomicBool::new(false);
        let mut out = Vec::new();
        let stats = run_stream(source, None, context(), config, &mut out, &stop).unwrap();

        let lines = output_lines(&out);
        assert_eq!(lines.len(), 7);
        assert_eq!(stats.frames, 7);
        assert_eq!(stats.submitted + stats.dropped, 2);
        assert_eq!(lines[0]["face"], json!({"x_min": 160, "y_min": 120, "x_max": 480, "y_max": 360}));
        assert_eq!(lines[6], json!({"frame": 6, "face": null, "emotion": "No Face Detected"}));
        for line in &lines[..6] {
            let emotion = line["emotion"].as_str().unwrap();
            assert!(emotion == "Fear" || emotion == "No Face Detected");
        }
    }

    #[test]
    fn raised_stop_flag_ends_the_stream() {
        let frames: Vec<Frame> = (0..100).map(Frame::no_face).collect();
        let config = Arc::new(ArcSwap::from_pointee(AppConfig::default()));
        let stop = AtomicBool::new(true);
        let mut out = Vec::new();
        let stats =
            run_stream(MemorySource::new(frames), None, context(), config, &mut out, &stop).unwrap();
        assert_eq!(stats.frames, 0);
        assert!(out.is_empty());
    }
}
