//! Window-definition loading.
//!
//! Delta windows arrive either as flat binary files of IEEE floats (the
//! legacy tool format) or, with the `windef` feature, as text rows of the
//! form `3 -0.5 0.0 0.5`.

use std::{fs::File, io::Read, path::Path};

use byteorder::{NativeEndian, ReadBytesExt};

use super::window::{Window, WindowSet};

/// Element type of a binary window-definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoefficientFormat {
    /// IEEE single-precision floats.
    #[default]
    Single,
    /// IEEE double-precision floats.
    Double,
}

impl CoefficientFormat {
    fn element_size(self) -> usize {
        match self {
            Self::Single => size_of::<f32>(),
            Self::Double => size_of::<f64>(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("failed to read window definition: {0}")]
    Io(#[from] std::io::Error),
    #[error("window definition is {0} bytes, not a positive multiple of {1}")]
    InvalidByteCount(usize, usize),
    #[cfg(feature = "windef")]
    #[error("failed to parse window definition row: {0}")]
    Text(String),
}

/// Read one window from a flat sequence of native-endian floats.
pub fn read_window(
    mut reader: impl Read,
    format: CoefficientFormat,
) -> Result<Window, WindowError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let element_size = format.element_size();
    if bytes.is_empty() || bytes.len() % element_size != 0 {
        return Err(WindowError::InvalidByteCount(bytes.len(), element_size));
    }

    let mut data = &bytes[..];
    let len = bytes.len() / element_size;
    let coefficients = match format {
        CoefficientFormat::Single => (0..len)
            .map(|_| data.read_f32::<NativeEndian>().map(f64::from))
            .collect::<Result<_, _>>()?,
        CoefficientFormat::Double => (0..len)
            .map(|_| data.read_f64::<NativeEndian>())
            .collect::<Result<_, _>>()?,
    };

    Ok(Window::new(coefficients))
}

impl WindowSet {
    /// Load a window set from delta-window coefficient files. The static
    /// window is synthesized; the files supply windows 1 onward.
    pub fn load<P: AsRef<Path>>(
        paths: &[P],
        format: CoefficientFormat,
    ) -> Result<Self, WindowError> {
        let mut windows = Vec::with_capacity(paths.len() + 1);
        windows.push(Window::identity());
        for path in paths {
            windows.push(read_window(File::open(path)?, format)?);
        }
        Ok(Self::new(windows))
    }
}

#[cfg(feature = "windef")]
mod text {
    use nom::{
        IResult, Parser,
        character::complete::{digit1, space1},
        combinator::map,
        error::{ErrorKind, ParseError},
        multi::many_m_n,
        number::complete::double,
        sequence::preceded,
    };

    use super::{Window, WindowError};

    /// Parse one window-definition row: the coefficient count followed by
    /// that many coefficients.
    pub fn parse_window_row(i: &str) -> IResult<&str, Window> {
        let (i, n) = digit1(i)?;
        let Ok(n) = n.parse::<usize>() else {
            return Err(nom::Err::Error(nom::error::Error::from_error_kind(
                n,
                ErrorKind::Digit,
            )));
        };
        map(many_m_n(n, n, preceded(space1, double)), Window::new).parse(i)
    }

    impl Window {
        /// Build a window from a complete definition row.
        pub fn from_definition(row: &str) -> Result<Self, WindowError> {
            match parse_window_row(row.trim_end()) {
                Ok(("", window)) => Ok(window),
                Ok((rest, _)) => Err(WindowError::Text(format!("trailing input {rest:?}"))),
                Err(err) => Err(WindowError::Text(err.to_string())),
            }
        }
    }
}

#[cfg(feature = "windef")]
pub use text::parse_window_row;
