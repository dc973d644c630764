use crate::core::error::{BakeError, Result};
use crate::core::geometry::VertexSample;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::packer::FrameSnapshot;
use crate::scene::clip::ClipInfo;
use crate::scene::evaluator::PoseEvaluator;
use log::{debug, trace};

/// Seconds between baked frames before rounding up to a power of two.
pub const DEFAULT_SAMPLE_INTERVAL: f32 = 0.05;

/// Upper bound on sampled frames per clip, before rounding.
pub const MAX_FRAMES: usize = 1 << 24;

/// Frames to bake for `clip`: `nextPowerOfTwo(floor(duration / interval))`,
/// at least 1. Clips needing more than `MAX_FRAMES` are `InvalidClip`.
pub fn frame_count(clip: &ClipInfo, sample_interval: f32) -> Result<usize> {
    clip.validate()?;
    if !sample_interval.is_finite() || sample_interval <= 0.0 {
        return Err(BakeError::InvalidClip {
            clip: clip.name.clone(),
            reason: format!("sample interval {} must be positive", sample_interval),
        });
    }
    let raw = (clip.duration / sample_interval).floor();
    if !raw.is_finite() || raw > MAX_FRAMES as f32 {
        return Err(BakeError::InvalidClip {
            clip: clip.name.clone(),
            reason: format!(
                "{}s at {}s per frame exceeds {} frames",
                clip.duration, sample_interval, MAX_FRAMES
            ),
        });
    }
    (raw as usize)
        .checked_next_power_of_two()
        .ok_or_else(|| BakeError::InvalidClip {
            clip: clip.name.clone(),
            reason: format!("frame count {} has no power of two", raw),
        })
}

/// Normalized time of frame `index` out of `frame_count`. Always below 1.0.
#[inline]
pub fn frame_time(index: usize, frame_count: usize) -> f32 {
    index as f32 / frame_count as f32
}

/// Drives a pose evaluator through a clip and snapshots each frame.
#[derive(Debug, Clone, Default)]
pub struct PoseSampler {
    cancel: CancelToken,
}

impl PoseSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: CancelToken) -> Self {
        Self { cancel }
    }

    /// Samples `frame_count` frames at normalized times `i / frame_count`.
    ///
    /// The clip is primed with one settle step at time 0 before the first
    /// frame. Each frame is requested, committed, then read back. Any frame
    /// that does not yield exactly `vertex_count` positions and normals fails
    /// the whole clip; no partial result is returned.
    pub fn sample<E: PoseEvaluator + ?Sized>(
        &self,
        evaluator: &mut E,
        clip: &ClipInfo,
        frame_count: usize,
        vertex_count: usize,
    ) -> Result<Vec<FrameSnapshot>> {
        debug!(
            "Sampling clip '{}': {} frames x {} vertices",
            clip.name, frame_count, vertex_count
        );

        evaluator.request_time(clip, 0.0)?;
        evaluator.commit()?;

        let mut frames = Vec::with_capacity(frame_count);
        for i in 0..frame_count {
            if self.cancel.is_cancelled() {
                return Err(BakeError::Cancelled);
            }

            let t = frame_time(i, frame_count);
            evaluator.request_time(clip, t)?;
            evaluator.commit()?;
            trace!("Frame {}/{} at t={:.4}", i + 1, frame_count, t);

            frames.push(read_back(evaluator, vertex_count)?);
        }

        Ok(frames)
    }
}

fn read_back<E: PoseEvaluator + ?Sized>(evaluator: &E, vertex_count: usize) -> Result<FrameSnapshot> {
    let positions = evaluator.evaluated_positions();
    let normals = evaluator.evaluated_normals();

    for len in [positions.len(), normals.len()] {
        if len != vertex_count {
            return Err(BakeError::TopologyMismatch {
                expected: vertex_count,
                actual: len,
            });
        }
    }

    Ok(positions
        .iter()
        .zip(normals)
        .map(|(p, n)| VertexSample::new(*p, *n))
        .collect())
}
