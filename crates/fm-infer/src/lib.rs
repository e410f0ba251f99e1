//! Landmark validation, normalization and frozen-model inference for facemood.

pub mod artifacts;
pub mod classifier;
pub mod context;
pub mod model;
pub mod normalize;
pub mod predict;
pub mod validate;

pub use classifier::{Classification, Classifier, LabelTable};
pub use context::ModelContext;
pub use model::{ClassifierWeights, Hyperparams, ModelWeights};
pub use normalize::{NormalizationParams, normalize};
pub use predict::{PredictBody, PredictResponse, ResponseStatus, predict, predict_str};
pub use validate::{validate, validate_request};
