//! Generated parameter trajectory and its flat binary representation.

use std::io::{Read, Write};

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

/// Generated static-feature sequence, frame-major: one row of `order` values
/// per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    par: Vec<Vec<f64>>,
    voiced: Option<Vec<bool>>,
}

#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("failed to read trajectory: {0}")]
    Io(#[from] std::io::Error),
    #[error("trajectory data is {0} bytes, not a multiple of the {1}-byte frame")]
    TruncatedFrame(usize, usize),
    #[error("frame order must be at least 1")]
    ZeroOrder,
}

impl Trajectory {
    pub fn new(par: Vec<Vec<f64>>, voiced: Option<Vec<bool>>) -> Self {
        Self { par, voiced }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.par.len()
    }
    pub fn is_empty(&self) -> bool {
        self.par.is_empty()
    }
    /// Number of static dimensions per frame.
    pub fn order(&self) -> usize {
        self.par.first().map_or(0, Vec::len)
    }

    pub fn get(&self, frame: usize, dim: usize) -> f64 {
        self.par[frame][dim]
    }
    pub fn frames(&self) -> &[Vec<f64>] {
        &self.par
    }

    /// Whether a frame is voiced. Streams generated without voicing flags
    /// are voiced everywhere.
    pub fn is_voiced(&self, frame: usize) -> bool {
        self.voiced.as_ref().is_none_or(|voiced| voiced[frame])
    }
    pub fn voiced(&self) -> Option<&[bool]> {
        self.voiced.as_deref()
    }

    /// Write the legacy flat binary form: native-endian IEEE-754
    /// single-precision floats, no header, one frame after another.
    pub fn dump(&self, mut writer: impl Write) -> std::io::Result<()> {
        for frame in &self.par {
            for &value in frame {
                writer.write_f32::<NativeEndian>(value as f32)?;
            }
        }
        Ok(())
    }

    /// Read a flat binary trajectory of `order` values per frame. Voicing
    /// information is not part of the format.
    pub fn load(mut reader: impl Read, order: usize) -> Result<Self, TrajectoryError> {
        if order == 0 {
            return Err(TrajectoryError::ZeroOrder);
        }

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let frame_size = order * size_of::<f32>();
        if bytes.len() % frame_size != 0 {
            return Err(TrajectoryError::TruncatedFrame(bytes.len(), frame_size));
        }

        let mut data = &bytes[..];
        let par = (0..bytes.len() / frame_size)
            .map(|_| {
                (0..order)
                    .map(|_| data.read_f32::<NativeEndian>().map(f64::from))
                    .collect::<Result<_, _>>()
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { par, voiced: None })
    }
}

#[cfg(test)]
mod tests {
    use super::{Trajectory, TrajectoryError};

    #[test]
    fn round_trip_preserves_bits() {
        let trajectory = Trajectory::new(
            vec![
                vec![1.0, -2.5, 0.0],
                vec![f64::MIN_POSITIVE, 3.25e-7, -0.0],
                vec![1234.5678, -9.0e8, 42.0],
            ],
            None,
        );

        let mut bytes = Vec::new();
        trajectory.dump(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 3 * 3 * size_of::<f32>());

        let restored = Trajectory::load(&bytes[..], 3).unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.order(), 3);
        for (frame, restored_frame) in trajectory.frames().iter().zip(restored.frames()) {
            for (value, restored_value) in frame.iter().zip(restored_frame) {
                assert_eq!(
                    (*value as f32).to_bits(),
                    (*restored_value as f32).to_bits()
                );
            }
        }

        let mut again = Vec::new();
        restored.dump(&mut again).unwrap();
        assert_eq!(bytes, again);
    }

    #[test]
    fn truncated_data_is_rejected() {
        let result = Trajectory::load(&[0u8; 10][..], 1);
        assert!(matches!(result, Err(TrajectoryError::TruncatedFrame(10, 4))));
    }

    #[test]
    fn zero_order_is_rejected() {
        let result = Trajectory::load(&[][..], 0);
        assert!(matches!(result, Err(TrajectoryError::ZeroOrder)));
    }
}
