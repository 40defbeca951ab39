//! Maximum-likelihood parameter generation (MLPG) for statistical parametric
//! speech synthesis.
//!
//! Given per-frame Gaussian statistics over static and dynamic (delta)
//! features, this crate solves the banded maximum-likelihood problem whose
//! solution is a smooth static-feature trajectory — the parameter-generation
//! step of HMM-based text-to-speech, shared by the training-side generator
//! and the runtime engine.
//!
//! For details of the algorithm, please refer to
//! <https://doi.org/10.1109/ICASSP.2000.861820>.

mod util;

pub mod mlpg;
pub mod model;
pub mod trajectory;

pub use mlpg::{GenerationError, TrajectoryGenerator};
pub use model::{MeanVari, StreamParameter, Window, WindowSet};
pub use trajectory::Trajectory;
