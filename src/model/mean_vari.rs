//! Normal distribution parameter.

use serde::{Deserialize, Serialize};

/// Mean and variance (or, once inverted, mean and precision) of one Gaussian
/// component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanVari {
    /// Mean
    pub mean: f64,
    /// Variance
    pub vari: f64,
}

impl MeanVari {
    pub fn new(mean: f64, vari: f64) -> Self {
        Self { mean, vari }
    }

    /// Inverted variance. Degenerate variances are floored: a near-infinite
    /// variance yields zero precision, a near-zero variance a large finite
    /// precision.
    pub fn precision(&self) -> f64 {
        if self.vari.abs() > 1e19 {
            0.0
        } else if self.vari.abs() < 1e-19 {
            1e38
        } else {
            1.0 / self.vari
        }
    }

    /// This component with its variance inverted into a precision.
    pub fn to_precision(&self) -> Self {
        Self {
            mean: self.mean,
            vari: self.precision(),
        }
    }

    /// This component with zero precision, so that it no longer constrains
    /// the solution. Used to decouple dynamic features at voicing boundaries.
    pub fn decoupled(&self) -> Self {
        Self {
            mean: self.mean,
            vari: 0.0,
        }
    }
}
