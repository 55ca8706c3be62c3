//! Gaze Stabilization
//!
//! Turns noisy per-frame gaze observations into a smoothed estimate:
//! - observation validation (non-finite and stuck-origin coordinates)
//! - adaptive outlier rejection against the rolling history average
//! - EMA smoothing with a raw bypass
//! - a multi-criterion fixation gate used by calibration and dwell

mod config;
mod error;
mod gate;
mod smoother;
mod stabilizer;
mod validator;

pub use config::{GateConfig, SmoothingMode, StabilizerConfig};
pub use error::FilterError;
pub use gate::{GateCheck, StabilityGate, StabilityReport};
pub use smoother::PointSmoother;
pub use stabilizer::{GazeEstimate, GazeObservation, GazeStabilizer, SampleOutcome, StabilizerStats};
pub use validator::ObservationValidator;
