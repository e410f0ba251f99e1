//! Forward-pass and end-to-end predict benchmarks.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fm_core::landmarks::FEATURE_DIM;
use fm_infer::model::{Dense, EncoderLayer, LayerNorm, TransformerWeights};
use fm_infer::{ClassifierWeights, Hyperparams, LabelTable, ModelContext, ModelWeights};
use fm_infer::{NormalizationParams, predict};
use serde_json::{Value, json};

const HIDDEN: usize = 128;
const LAYERS: usize = 2;
const CLASSES: usize = 6;

fn seeded(rng: &mut fastrand::Rng, in_dim: usize, out_dim: usize) -> Dense {
    let scale = 1.0 / (in_dim as f32).sqrt();
    let weight = (0..in_dim * out_dim).map(|_| (rng.f32() - 0.5) * scale).collect();
    let bias = (0..out_dim).map(|_| (rng.f32() - 0.5) * scale).collect();
    Dense::new(in_dim, out_dim, weight, bias)
}

fn transformer_context() -> Option<ModelContext> {
    let mut rng = fastrand::Rng::with_seed(7);
    let layers = (0..LAYERS)
        .map(|_| EncoderLayer {
            value: seeded(&mut rng, HIDDEN, HIDDEN),
            out_proj: seeded(&mut rng, HIDDEN, HIDDEN),
            norm1: LayerNorm::identity(HIDDEN),
            ff1: seeded(&mut rng, HIDDEN, HIDDEN * 4),
            ff2: seeded(&mut rng, HIDDEN * 4, HIDDEN),
            norm2: LayerNorm::identity(HIDDEN),
        })
        .collect();
    let weights = TransformerWeights {
        input_proj: seeded(&mut rng, FEATURE_DIM, HIDDEN),
        layers,
        fc: seeded(&mut rng, HIDDEN, CLASSES),
    };
    let hyper = Hyperparams {
        input_dim: FEATURE_DIM,
        hidden_dim: HIDDEN,
        n_layers: LAYERS,
        n_heads: 4,
        dropout: 0.3,
        n_classes: CLASSES,
    };
    let labels = ["Angry", "Disgust", "Fear", "Happy", "Neutral", "Sad"]
        .map(String::from)
        .to_vec();
    ModelContext::from_weights(
        hyper,
        NormalizationParams::identity(FEATURE_DIM),
        ClassifierWeights::new(ModelWeights::Transformer(weights)),
        LabelTable::new(labels).ok()?,
    )
    .ok()
}

fn request() -> Value {
    let points: Vec<Value> = (0..468)
        .map(|i| json!({"x": (i % 17) as f64 / 17.0, "y": (i % 23) as f64 / 23.0, "z": -0.02}))
        .collect();
    json!({"landmarks": {"index": 0, "points": points}})
}

fn bench_predict(c: &mut Criterion) {
    let Some(ctx) = transformer_context() else {
        return;
    };
    let req = request();
    let Ok(landmarks) = fm_infer::validate_request(&req) else {
        return;
    };

    c.bench_function("transformer_infer_h128_l2", |b| {
        b.iter(|| ctx.infer(black_box(&landmarks)));
    });
    c.bench_function("predict_json_468pts", |b| {
        b.iter(|| predict(&ctx, black_box(&req)));
    });
    c.bench_function("validate_468pts", |b| {
        b.iter(|| fm_infer::validate_request(black_box(&req)));
    });
}

criterion_group!(benches, bench_predict);
criterion_main!(benches);
