use crate::core::error::{BakeError, Result};
use crate::core::geometry::VertexSample;

/// A named animation sequence as seen by the baker.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    pub name: String,
    /// Length in seconds.
    pub duration: f32,
    pub looping: bool,
}

impl ClipInfo {
    pub fn new(name: impl Into<String>, duration: f32, looping: bool) -> Self {
        Self {
            name: name.into(),
            duration,
            looping,
        }
    }

    /// Rejects durations that cannot be sampled.
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(BakeError::InvalidClip {
                clip: self.name.clone(),
                reason: format!("duration {} is not a finite non-negative value", self.duration),
            });
        }
        Ok(())
    }
}

/// The unit of work for one clip.
///
/// Owns the frame-major sample buffer for the duration of one bake; it is
/// dropped once the two textures have been written.
#[derive(Debug)]
pub struct ClipBake {
    pub clip: ClipInfo,
    pub frame_count: usize,
    pub vertex_count: usize,
    pub samples: Vec<VertexSample>,
}

impl ClipBake {
    pub fn new(clip: ClipInfo, frame_count: usize, vertex_count: usize) -> Self {
        Self {
            clip,
            frame_count,
            vertex_count,
            samples: Vec::new(),
        }
    }

    /// True once the buffer holds exactly one sample per (frame, vertex).
    pub fn is_complete(&self) -> bool {
        self.samples.len() == self.frame_count * self.vertex_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_bad_durations() {
        assert!(ClipInfo::new("ok", 1.0, true).validate().is_ok());
        assert!(ClipInfo::new("zero", 0.0, false).validate().is_ok());
        assert!(matches!(
            ClipInfo::new("neg", -1.0, false).validate(),
            Err(BakeError::InvalidClip { .. })
        ));
        assert!(ClipInfo::new("nan", f32::NAN, false).validate().is_err());
        assert!(ClipInfo::new("inf", f32::INFINITY, false).validate().is_err());
    }
}
