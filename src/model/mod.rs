//! Model-side data consumed by the generator: regression windows and
//! per-frame Gaussian statistics.

mod mean_vari;
mod parser;
mod stream_parameter;
mod window;

pub use mean_vari::MeanVari;
#[cfg(feature = "windef")]
pub use parser::parse_window_row;
pub use parser::{CoefficientFormat, WindowError, read_window};
pub use stream_parameter::{StreamParameter, StreamParameterError};
pub use window::{Window, WindowSet};

/// Global-variance statistics for one stream.
#[derive(Debug, Clone)]
pub struct GvParameter {
    /// Target variance distribution, one component per static dimension.
    pub mean_vari: Vec<MeanVari>,
    /// Per-frame switch; frames with the switch off keep their
    /// maximum-likelihood value.
    pub switch: Vec<bool>,
}
