//! Banded normal equations of the MLPG problem and their solver.
//!
//! For details, please refer to <https://doi.org/10.1109/ICASSP.2000.861820>.

use crate::{
    model::{MeanVari, WindowSet},
    util::boxed_slice,
};

use super::GenerationError;

const W1: f64 = 1.0;
const W2: f64 = 1.0;

/// The weighted normal equations `W^T U^{-1} W c = W^T U^{-1} mu` for one
/// static dimension. Only the upper band of the symmetric matrix is stored,
/// row-major, with the diagonal in column 0 of each band row.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    win_size: usize,
    length: usize,
    width: usize,
    wuw: Box<[f64]>,
    wum: Box<[f64]>,
}

impl NormalEquations {
    /// Accumulate `W^T U^{-1} W` and `W^T U^{-1} mu` from per-window frame
    /// statistics. `parameters[i][t]` holds the mean and precision of window
    /// i at frame t. Window rows reaching outside the sequence are skipped,
    /// as are zero coefficients; a zeroed precision removes a row entirely,
    /// which is what decouples segments at voicing boundaries.
    pub fn build(windows: &WindowSet, parameters: &[Vec<MeanVari>]) -> Self {
        let length = parameters[0].len();
        let width = windows.max_width() * 2 + 1;
        let mut wum = boxed_slice![0.0; length];
        let mut wuw = boxed_slice![0.0; width * length];

        for t in 0..length {
            for (i, window) in windows.iter().enumerate() {
                // window row s = t + j touches column t through its tap at -j
                for j in -(window.right_width() as isize)..=(window.left_width() as isize) {
                    let s = t as isize + j;
                    if s < 0 || s >= length as isize {
                        continue;
                    }
                    let tap = window.tap(-j);
                    if tap == 0.0 {
                        continue;
                    }

                    let MeanVari {
                        mean,
                        vari: precision,
                    } = parameters[i][s as usize];
                    let wu = tap * precision;
                    wum[t] += wu * mean;

                    for k in 0..width.min(length - t) {
                        let pair = window.tap(k as isize - j);
                        if pair != 0.0 {
                            wuw[width * t + k] += wu * pair;
                        }
                    }
                }
            }
        }

        Self {
            win_size: windows.size(),
            length,
            width,
            wuw,
            wum,
        }
    }

    /// Factorize in place and run the substitutions, returning the
    /// maximum-likelihood trajectory for this dimension.
    pub fn solve(&mut self) -> Result<Box<[f64]>, GenerationError> {
        self.factorize()?;
        Ok(self.substitute())
    }

    /// Banded LDL factorization. The diagonal factor replaces column 0 of
    /// each band row, the unit-triangular multipliers the remaining columns.
    fn factorize(&mut self) -> Result<(), GenerationError> {
        for t in 0..self.length {
            let mut diagonal = self.wuw[self.width * t];
            for i in 1..self.width.min(t + 1) {
                let l = self.wuw[self.width * (t - i) + i];
                diagonal -= l * l * self.wuw[self.width * (t - i)];
            }
            // Positive precisions make the system positive definite; a
            // non-positive (or NaN) pivot means degenerate input statistics.
            if !(diagonal > 0.0) {
                return Err(GenerationError::NotPositiveDefinite { frame: t });
            }
            self.wuw[self.width * t] = diagonal;

            for i in 1..self.width {
                let mut value = self.wuw[self.width * t + i];
                for j in 1..(self.width - i).min(t + 1) {
                    value -= self.wuw[self.width * (t - j) + j]
                        * self.wuw[self.width * (t - j) + i + j]
                        * self.wuw[self.width * (t - j)];
                }
                self.wuw[self.width * t + i] = value / diagonal;
            }
        }
        Ok(())
    }

    /// Forward then backward substitution through the factorized band.
    fn substitute(&self) -> Box<[f64]> {
        let mut g = boxed_slice![0.0; self.length];
        for t in 0..self.length {
            let mut value = self.wum[t];
            for i in 1..self.width.min(t + 1) {
                value -= self.wuw[self.width * (t - i) + i] * g[t - i];
            }
            g[t] = value;
        }

        let mut par = boxed_slice![0.0; self.length];
        for t in (0..self.length).rev() {
            let mut value = g[t] / self.wuw[self.width * t];
            for i in 1..self.width.min(self.length - t) {
                value -= self.wuw[self.width * t + i] * par[t + i];
            }
            par[t] = value;
        }

        par
    }
}

/// Gradient refinement of a solved trajectory toward a target variance.
#[derive(Debug, Clone)]
pub struct GlobalVariance<'a> {
    par: Box<[f64]>,
    switch: &'a [bool],
    active: usize,

    eqs: NormalEquations,
}

impl<'a> GlobalVariance<'a> {
    /// `eqs` must hold the normal equations before factorization.
    pub fn new(eqs: NormalEquations, par: Box<[f64]>, switch: &'a [bool]) -> Self {
        let active = switch.iter().filter(|sw| **sw).count();
        Self {
            par,
            switch,
            active,
            eqs,
        }
    }

    /// Refine the trajectory and return it.
    pub fn apply(mut self, gv_mean: f64, gv_vari: f64) -> Box<[f64]> {
        self.refine(gv_mean, gv_vari);
        self.par
    }

    /// Mean and variance of the trajectory over the switched-on frames.
    fn measure(&self) -> (f64, f64) {
        let mean = self
            .par
            .iter()
            .zip(self.switch)
            .filter(|(_, sw)| **sw)
            .map(|(p, _)| *p)
            .sum::<f64>()
            / self.active as f64;
        let vari = self
            .par
            .iter()
            .zip(self.switch)
            .filter(|(_, sw)| **sw)
            .map(|(p, _)| (*p - mean) * (*p - mean))
            .sum::<f64>()
            / self.active as f64;

        (mean, vari)
    }

    /// Rescale deviations from the mean so the measured variance matches the
    /// target.
    fn rescale(&mut self, gv_mean: f64) {
        let (mean, vari) = self.measure();
        let ratio = (gv_mean / vari).sqrt();
        self.par
            .iter_mut()
            .zip(self.switch)
            .filter(|(_, sw)| **sw)
            .for_each(|(p, _)| *p = ratio * (*p - mean) + mean);
    }

    /// HMM-likelihood term of the objective and its gradient.
    fn likelihood_derivative(&self) -> (f64, Box<[f64]>) {
        let (length, width) = (self.eqs.length, self.eqs.width);
        let mut g = boxed_slice![0.0; length];

        #[allow(clippy::needless_range_loop)]
        for t in 0..length {
            g[t] = self.eqs.wuw[width * t] * self.par[t];
            for i in 1..width {
                if t + i < length {
                    g[t] += self.eqs.wuw[width * t + i] * self.par[t + i];
                }
                if t + 1 > i {
                    g[t] += self.eqs.wuw[width * (t - i) + i] * self.par[t - i];
                }
            }
        }

        let w = 1.0 / ((self.eqs.win_size * length) as f64);
        let mut obj = 0.0;

        #[allow(clippy::needless_range_loop)]
        for t in 0..length {
            obj += W1 * w * self.par[t] * (self.eqs.wum[t] - 0.5 * g[t]);
        }

        (obj, g)
    }

    fn update(&mut self, g: &[f64], step: f64, mean: f64, vari: f64, gv_mean: f64, gv_vari: f64) {
        let (length, width) = (self.eqs.length, self.eqs.width);

        let w = 1.0 / ((self.eqs.win_size * length) as f64);
        let dv = -2.0 * gv_vari * (vari - gv_mean) / length as f64;

        #[allow(clippy::needless_range_loop)]
        for t in 0..length {
            let h = -W1 * w * self.eqs.wuw[width * t]
                - W2 * 2.0 / (length * length) as f64
                    * ((length - 1) as f64 * gv_vari * (vari - gv_mean)
                        + 2.0 * gv_vari * (self.par[t] - mean) * (self.par[t] - mean));
            let delta = if self.switch[t] {
                1.0 / h * (W1 * w * (-g[t] + self.eqs.wum[t]) + W2 * dv * (self.par[t] - mean))
            } else {
                1.0 / h * (W1 * w * (-g[t] + self.eqs.wum[t]))
            };

            self.par[t] += step * delta;
        }
    }

    fn refine(&mut self, gv_mean: f64, gv_vari: f64) {
        const MAX_ITERATION: usize = 5;
        const STEP_INIT: f64 = 0.1;
        const STEP_DEC: f64 = 0.5;
        const STEP_INC: f64 = 1.2;

        if self.active == 0 {
            return;
        }

        let mut step = STEP_INIT;
        let mut prev = 0.0;
        self.rescale(gv_mean);
        for i in 1..=MAX_ITERATION {
            let (mean, vari) = self.measure();

            let gv_obj = -0.5 * W2 * vari * gv_vari * (vari - 2.0 * gv_mean);
            let (hmm_obj, g) = self.likelihood_derivative();
            let obj = -(hmm_obj + gv_obj);

            if i > 1 {
                if obj > prev {
                    step *= STEP_DEC;
                } else if obj < prev {
                    step *= STEP_INC;
                }
            }

            self.update(&g, step, mean, vari, gv_mean, gv_vari);

            prev = obj;
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::{GlobalVariance, NormalEquations};
    use crate::{
        mlpg::GenerationError,
        model::{MeanVari, Window, WindowSet},
    };

    fn precisions(stats: &[(f64, f64)]) -> Vec<MeanVari> {
        stats.iter().map(|&(m, p)| MeanVari::new(m, p)).collect()
    }

    #[test]
    fn static_only_reproduces_means() {
        let windows = WindowSet::new(vec![Window::identity()]);
        let means = [0.3, -1.2, 4.5, 0.0, 2.25];
        let parameters =
            vec![precisions(&means.map(|m| (m, 0.7)))];

        let par = NormalEquations::build(&windows, &parameters)
            .solve()
            .unwrap();

        assert_eq!(par.len(), means.len());
        for (value, mean) in par.iter().zip(&means) {
            assert_abs_diff_eq!(*value, *mean, epsilon = 1.0e-12);
        }
    }

    #[test]
    fn delta_smoothing_golden() {
        let windows = WindowSet::new(vec![
            Window::identity(),
            Window::new(vec![-0.5, 0.0, 0.5]),
        ]);
        let parameters = vec![
            precisions(&[(1.0, 1.0), (2.0, 1.0), (3.0, 1.0), (4.0, 1.0), (2.0, 1.0)]),
            precisions(&[(0.0, 1.0); 5]),
        ];

        let par = NormalEquations::build(&windows, &parameters)
            .solve()
            .unwrap();

        // solution of the 5x5 banded system, exact in rationals
        let expected = [46.0, 64.0, 90.0, 104.0, 74.0].map(|v| v / 35.0);
        for (value, expected) in par.iter().zip(&expected) {
            assert_abs_diff_eq!(*value, *expected, epsilon = 1.0e-12);
        }
    }

    #[test]
    fn right_biased_window_is_supported() {
        // an even tap count spans [-1, 0]: a backward difference
        let windows = WindowSet::new(vec![
            Window::identity(),
            Window::new(vec![-1.0, 1.0]),
        ]);
        let parameters = vec![
            precisions(&[(0.5, 1.0), (1.5, 1.0), (1.0, 1.0), (2.5, 1.0)]),
            precisions(&[(0.0, 2.0); 4]),
        ];

        let eqs = NormalEquations::build(&windows, &parameters);
        let reference = cholesky_reference(&eqs);
        let par = eqs.clone().solve().unwrap();

        assert_eq!(par.len(), 4);
        for (value, expected) in par.iter().zip(&reference) {
            assert!(value.is_finite());
            assert_abs_diff_eq!(*value, *expected, epsilon = 1.0e-9);
        }
    }

    #[test]
    fn zero_precision_is_rejected() {
        let windows = WindowSet::new(vec![Window::identity()]);
        let parameters = vec![precisions(&[(1.0, 1.0), (2.0, 0.0), (3.0, 1.0)])];

        let result = NormalEquations::build(&windows, &parameters).solve();
        assert!(matches!(
            result,
            Err(GenerationError::NotPositiveDefinite { frame: 1 })
        ));
    }

    /// Banded Cholesky (square-root) factorization and substitutions, the
    /// alternative formulation of the same solve. Used to cross-check the
    /// LDL path.
    fn cholesky_reference(eqs: &NormalEquations) -> Vec<f64> {
        let (length, width) = (eqs.length, eqs.width);
        let mut r = eqs.wuw.to_vec();

        for t in 0..length {
            let mut diagonal = r[width * t];
            for i in 1..width.min(t + 1) {
                let u = r[width * (t - i) + i];
                diagonal -= u * u;
            }
            let diagonal = diagonal.sqrt();
            r[width * t] = diagonal;

            for i in 1..width {
                let mut value = r[width * t + i];
                for j in 1..(width - i).min(t + 1) {
                    value -= r[width * (t - j) + j] * r[width * (t - j) + i + j];
                }
                r[width * t + i] = value / diagonal;
            }
        }

        let mut g = vec![0.0; length];
        for t in 0..length {
            let mut value = eqs.wum[t];
            for i in 1..width.min(t + 1) {
                value -= r[width * (t - i) + i] * g[t - i];
            }
            g[t] = value / r[width * t];
        }

        let mut par = vec![0.0; length];
        for t in (0..length).rev() {
            let mut value = g[t];
            for i in 1..width.min(length - t) {
                value -= r[width * t + i] * par[t + i];
            }
            par[t] = value / r[width * t];
        }

        par
    }

    #[test]
    fn ldl_matches_cholesky() {
        let windows = WindowSet::new(vec![
            Window::identity(),
            Window::new(vec![-0.5, 0.0, 0.5]),
            Window::new(vec![1.0, -2.0, 1.0]),
        ]);
        let length = 8;
        let statics: Vec<(f64, f64)> = (0..length)
            .map(|t| ((t as f64 * 0.8).sin() * 2.0, 0.5 + 0.1 * t as f64))
            .collect();
        let deltas: Vec<(f64, f64)> = (0..length).map(|t| (0.0, 1.5 - 0.05 * t as f64)).collect();
        let accels: Vec<(f64, f64)> = (0..length).map(|_| (0.0, 0.9)).collect();
        let parameters = vec![
            precisions(&statics),
            precisions(&deltas),
            precisions(&accels),
        ];

        let eqs = NormalEquations::build(&windows, &parameters);
        let reference = cholesky_reference(&eqs);
        let par = eqs.clone().solve().unwrap();

        for (value, expected) in par.iter().zip(&reference) {
            assert_abs_diff_eq!(*value, *expected, epsilon = 1.0e-9);
        }
    }

    #[test]
    fn gv_with_all_switches_off_is_identity() {
        let windows = WindowSet::new(vec![
            Window::identity(),
            Window::new(vec![-0.5, 0.0, 0.5]),
        ]);
        let parameters = vec![
            precisions(&[(1.0, 1.0), (3.0, 1.0), (2.0, 1.0), (0.0, 1.0)]),
            precisions(&[(0.0, 1.0); 4]),
        ];

        let eqs = NormalEquations::build(&windows, &parameters);
        let par = eqs.clone().solve().unwrap();

        let switch = [false; 4];
        let refined = GlobalVariance::new(eqs, par.clone(), &switch).apply(1.0, 1.0);
        assert_eq!(refined, par);
    }

    #[test]
    fn gv_moves_variance_toward_target() {
        let windows = WindowSet::new(vec![
            Window::identity(),
            Window::new(vec![-0.5, 0.0, 0.5]),
        ]);
        let statics: Vec<(f64, f64)> = (0..12)
            .map(|t| (if t % 2 == 0 { 1.0 } else { -1.0 }, 1.0))
            .collect();
        let parameters = vec![precisions(&statics), precisions(&[(0.0, 1.0); 12])];

        let eqs = NormalEquations::build(&windows, &parameters);
        let par = eqs.clone().solve().unwrap();

        let measure = |par: &[f64]| {
            let mean = par.iter().sum::<f64>() / par.len() as f64;
            par.iter().map(|p| (p - mean) * (p - mean)).sum::<f64>() / par.len() as f64
        };

        let before = measure(&par);
        let target = before * 4.0;
        let switch = [true; 12];
        let refined = GlobalVariance::new(eqs, par, &switch).apply(target, 1.0);
        let after = measure(&refined);

        assert!(refined.iter().all(|value| value.is_finite()));
        assert!((after - target).abs() < (before - target).abs());
    }
}
