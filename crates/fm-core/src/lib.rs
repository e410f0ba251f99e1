//! Types, traits, errors and configuration shared by the facemood workspace.
//!
//! This crate holds everything the inference, smoothing and dispatch crates
//! agree on: landmark and feature types, observations, the error taxonomy,
//! the model/source traits and the TOML configuration.

pub mod blend;
pub mod config;
pub mod emotion;
pub mod error;
pub mod frame;
pub mod landmarks;
pub mod traits;

pub use config::AppConfig;
pub use emotion::{EmotionObservation, StableEmotion};
pub use error::{PipelineError, ValidationError};
pub use frame::{FaceRegion, Frame};
pub use landmarks::{FEATURE_DIM, FeatureVector, LANDMARK_COUNT, LandmarkSet, Point3D};
