use serde::{Deserialize, Serialize};

/// Ordered set of regression windows for one stream. Window 0 is the static
/// (identity) window; the following windows hold delta coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSet {
    windows: Vec<Window>,
}

impl WindowSet {
    pub fn new(windows: Vec<Window>) -> Self {
        Self { windows }
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = &Window> {
        self.windows.iter()
    }
    pub fn size(&self) -> usize {
        self.windows.len()
    }
    /// Band half-width of the normal-equation matrix built from this set.
    pub fn max_width(&self) -> usize {
        self.windows.iter().map(Window::width).max().unwrap_or(0) / 2
    }
}

/// One regression window. The coefficient at array index k applies at the
/// signed frame offset `k - width / 2`, so an odd number of coefficients
/// spans `[-L, L]` and an even number spans `[-L, L - 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    coefficients: Box<[f64]>,
}

impl Window {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self {
            coefficients: coefficients.into(),
        }
    }

    /// The static window: a single unit tap at offset zero.
    pub fn identity() -> Self {
        Self::new(vec![1.0])
    }

    /// Coefficient at a signed frame offset, or 0.0 outside the window
    /// extent.
    #[inline]
    pub fn tap(&self, offset: isize) -> f64 {
        let index = offset + self.left_width() as isize;
        if index < 0 || index >= self.width() as isize {
            0.0
        } else {
            self.coefficients[index as usize]
        }
    }

    /// Iterate over (signed offset, coefficient) pairs.
    pub fn taps(&self) -> impl '_ + Iterator<Item = (isize, f64)> {
        let left = self.left_width() as isize;
        self.coefficients
            .iter()
            .enumerate()
            .map(move |(index, coef)| (index as isize - left, *coef))
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.coefficients.len()
    }
    /// Number of taps left of the center.
    #[inline]
    pub fn left_width(&self) -> usize {
        self.width() / 2
    }
    /// Number of taps right of the center.
    #[inline]
    pub fn right_width(&self) -> usize {
        self.width() - self.left_width() - 1
    }
}
