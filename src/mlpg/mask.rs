/// Per-frame voicing flags, with helpers for compacting a sequence around
/// its unvoiced regions and re-expanding it afterwards.
pub struct VoicingMask(Vec<bool>);

impl FromIterator<bool> for VoicingMask {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl VoicingMask {
    pub fn new(mask: Vec<bool>) -> Self {
        Self(mask)
    }
    /// Mask of a stream that has pitch everywhere.
    pub fn all_voiced(len: usize) -> Self {
        Self(vec![true; len])
    }
    pub fn flags(&self) -> &[bool] {
        &self.0
    }
    /// Number of voiced frames, the length of the compacted sequence.
    pub fn voiced_frames(&self) -> usize {
        self.0.iter().filter(|voiced| **voiced).count()
    }
    /// Re-expand a compacted sequence to full length, yielding `default` at
    /// unvoiced frames.
    pub fn fill<'a, T: 'a + Clone>(
        &'a self,
        compacted: impl 'a + IntoIterator<Item = T>,
        default: T,
    ) -> impl 'a + Iterator<Item = T> {
        let mut iter = compacted.into_iter();
        self.0.iter().map(move |&voiced| {
            if voiced {
                iter.next()
                    .expect("compacted sequence must have one item per voiced frame")
            } else {
                default.clone()
            }
        })
    }
    /// For every frame, the distance to the nearest unvoiced frame or
    /// sequence edge on each side. Unvoiced frames report (0, 0).
    pub fn boundary_distances(&self) -> Vec<(usize, usize)> {
        if self.0.is_empty() {
            return vec![];
        }

        let mut result = vec![(0, 0); self.0.len()];

        let mut left = 0;
        for (frame, voiced) in self.0.iter().enumerate() {
            if *voiced {
                result[frame].0 = frame - left;
            } else {
                // the segment restarts after this frame
                left = frame + 1;
            }
        }

        let mut right = self.0.len() - 1;
        for (frame, voiced) in self.0.iter().enumerate().rev() {
            if *voiced {
                result[frame].1 = right - frame;
            } else {
                if frame == 0 {
                    break;
                }
                right = frame - 1;
            }
        }

        result
    }
}
