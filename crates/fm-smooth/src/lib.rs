//! Majority-vote smoothing of per-frame emotion labels.

pub mod shared;
pub mod smoother;
pub mod window;

pub use shared::SharedSmoother;
pub use smoother::{SmootherState, TemporalSmoother};
pub use window::SmoothingWindow;
