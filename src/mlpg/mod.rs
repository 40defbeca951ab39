//! Maximum-likelihood trajectory generation.
//!
//! For every static dimension in turn, the generator assembles the banded
//! normal equations combining the static and dynamic window constraints,
//! solves them, and writes one column of the output trajectory.

use crate::{
    model::{GvParameter, MeanVari, StreamParameter, WindowSet},
    trajectory::Trajectory,
};

mod mask;
mod matrix;

pub use mask::VoicingMask;
pub use matrix::{GlobalVariance, NormalEquations};

/// Output value for frames outside voiced regions.
const UNVOICED: f64 = 0.0;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("parameter stream has no frames or no dimensions")]
    EmptyStream,
    #[error(
        "frame vectors have {got} components, expected {expected} ({vector_length} x {num_windows})"
    )]
    VectorSizeMismatch {
        vector_length: usize,
        num_windows: usize,
        expected: usize,
        got: usize,
    },
    #[error(
        "global-variance statistics sized for {got_dims} dimensions / {got_frames} frames, stream has {vector_length} / {frames}"
    )]
    GvSizeMismatch {
        vector_length: usize,
        frames: usize,
        got_dims: usize,
        got_frames: usize,
    },
    #[error("normal equations lost positive definiteness at frame {frame}")]
    NotPositiveDefinite { frame: usize },
}

/// Trajectory generator for one parameter stream.
///
/// A generator borrows its window set and owns no per-utterance state, so one
/// instance can generate any number of streams of the same layout.
pub struct TrajectoryGenerator<'a> {
    vector_length: usize,
    windows: &'a WindowSet,
    gv: Option<GvParameter>,
    gv_weight: f64,
}

impl<'a> TrajectoryGenerator<'a> {
    pub fn new(vector_length: usize, windows: &'a WindowSet) -> Self {
        Self {
            vector_length,
            windows,
            gv: None,
            gv_weight: 1.0,
        }
    }

    /// Enable global-variance refinement with the given weight.
    pub fn with_gv(mut self, gv: GvParameter, gv_weight: f64) -> Self {
        self.gv = Some(gv);
        self.gv_weight = gv_weight;
        self
    }

    /// Generate the maximum-likelihood static trajectory for `stream`.
    ///
    /// Unvoiced frames do not enter the solve at all: voiced frames are
    /// compacted into a shorter sequence, the dynamic constraints that would
    /// bridge a voicing boundary are dropped, and unvoiced output frames are
    /// written as 0.
    pub fn generate(&self, stream: &StreamParameter) -> Result<Trajectory, GenerationError> {
        let total_frame = stream.len();
        if total_frame == 0 || self.vector_length == 0 {
            return Err(GenerationError::EmptyStream);
        }
        let expected = self.vector_length * self.windows.size();
        let got = stream.frames()[0].len();
        if got != expected {
            return Err(GenerationError::VectorSizeMismatch {
                vector_length: self.vector_length,
                num_windows: self.windows.size(),
                expected,
                got,
            });
        }
        if let Some(gv) = &self.gv {
            if gv.mean_vari.len() != self.vector_length || gv.switch.len() != total_frame {
                return Err(GenerationError::GvSizeMismatch {
                    vector_length: self.vector_length,
                    frames: total_frame,
                    got_dims: gv.mean_vari.len(),
                    got_frames: gv.switch.len(),
                });
            }
        }

        let mask = match stream.voiced() {
            Some(voiced) => VoicingMask::new(voiced.to_vec()),
            None => VoicingMask::all_voiced(total_frame),
        };
        let boundaries = mask.boundary_distances();

        let mut pars = vec![vec![UNVOICED; self.vector_length]; total_frame];
        if mask.voiced_frames() == 0 {
            return Ok(Trajectory::new(pars, stream.voiced().map(<[bool]>::to_vec)));
        }

        for vector_index in 0..self.vector_length {
            let parameters: Vec<Vec<MeanVari>> = self
                .windows
                .iter()
                .enumerate()
                .map(|(window_index, window)| {
                    let m = self.vector_length * window_index + vector_index;

                    stream
                        .frames()
                        .iter()
                        .map(|frame| frame[m].to_precision())
                        .zip(&boundaries)
                        .map(|(stat, (left, right))| {
                            let crosses_left = *left < window.left_width();
                            let crosses_right = *right < window.right_width();

                            // dynamic constraints must not bridge a voicing boundary
                            if (crosses_left || crosses_right) && window_index != 0 {
                                stat.decoupled()
                            } else {
                                stat
                            }
                        })
                        .zip(mask.flags())
                        .filter_map(|(stat, voiced)| voiced.then_some(stat))
                        .collect()
                })
                .collect();

            let mut eqs = NormalEquations::build(self.windows, &parameters);
            let par = match &self.gv {
                Some(gv) => {
                    let eqs_before = eqs.clone();
                    let par = eqs.solve()?;
                    let switch: Vec<bool> = gv
                        .switch
                        .iter()
                        .zip(mask.flags())
                        .filter_map(|(sw, voiced)| voiced.then_some(*sw))
                        .collect();
                    let MeanVari { mean, vari } = gv.mean_vari[vector_index];
                    GlobalVariance::new(eqs_before, par, &switch).apply(mean * self.gv_weight, vari)
                }
                None => eqs.solve()?,
            };

            for (row, value) in pars.iter_mut().zip(mask.fill(par, UNVOICED)) {
                row[vector_index] = value;
            }
        }

        Ok(Trajectory::new(pars, stream.voiced().map(<[bool]>::to_vec)))
    }
}
