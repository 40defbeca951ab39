//! Per-frame statistics of one parameter stream.

use super::MeanVari;

/// Gaussian statistics for every frame of one stream, static and dynamic
/// components stacked. Component `window_index * vector_length + dim` of a
/// frame belongs to window `window_index` and static dimension `dim`.
#[derive(Debug, Clone)]
pub struct StreamParameter {
    frames: Vec<Vec<MeanVari>>,
    voiced: Option<Vec<bool>>,
}

#[derive(Debug, thiserror::Error)]
pub enum StreamParameterError {
    #[error("frame {frame} has {got} components, expected {expected}")]
    FrameLength {
        frame: usize,
        expected: usize,
        got: usize,
    },
    #[error("{got} voicing flags for {expected} frames")]
    VoicingLength { expected: usize, got: usize },
}

impl StreamParameter {
    /// Create a stream of frame statistics. Every frame must have
    /// `vector_size` components, the vector length times the window count.
    pub fn new(
        frames: Vec<Vec<MeanVari>>,
        vector_size: usize,
    ) -> Result<Self, StreamParameterError> {
        for (frame, stats) in frames.iter().enumerate() {
            if stats.len() != vector_size {
                return Err(StreamParameterError::FrameLength {
                    frame,
                    expected: vector_size,
                    got: stats.len(),
                });
            }
        }
        Ok(Self {
            frames,
            voiced: None,
        })
    }

    /// Attach per-frame voiced flags, for streams such as log-F0 that are
    /// undefined in unvoiced regions.
    pub fn with_voicing(mut self, voiced: Vec<bool>) -> Result<Self, StreamParameterError> {
        if voiced.len() != self.frames.len() {
            return Err(StreamParameterError::VoicingLength {
                expected: self.frames.len(),
                got: voiced.len(),
            });
        }
        self.voiced = Some(voiced);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
    pub fn frames(&self) -> &[Vec<MeanVari>] {
        &self.frames
    }
    pub fn voiced(&self) -> Option<&[bool]> {
        self.voiced.as_deref()
    }
}
