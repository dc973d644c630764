use crate::core::error::{BakeError, Result};
use crate::core::geometry::VertexSample;

/// One frame's worth of samples, in vertex order.
pub type FrameSnapshot = Vec<VertexSample>;

/// Flattens per-frame snapshots into one frame-major buffer.
///
/// Sample `(f, v)` lands at `f * vertex_count + v`, the index the
/// rearrangement kernel reads. Every frame must hold exactly
/// `vertex_count` samples.
pub fn pack(frames: &[FrameSnapshot], vertex_count: usize) -> Result<Vec<VertexSample>> {
    let mut linear = Vec::with_capacity(frames.len() * vertex_count);
    for frame in frames {
        if frame.len() != vertex_count {
            return Err(BakeError::TopologyMismatch {
                expected: vertex_count,
                actual: frame.len(),
            });
        }
        linear.extend_from_slice(frame);
    }
    Ok(linear)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::sample_index;
    use nalgebra::Vector3;

    fn tagged(frame: usize, vertex: usize) -> VertexSample {
        VertexSample::new(
            Vector3::new(vertex as f32, frame as f32, 0.0),
            Vector3::new(0.0, 0.0, (frame * 100 + vertex) as f32),
        )
    }

    #[test]
    fn pack_is_frame_major() {
        let (frames, verts) = (3, 5);
        let snapshots: Vec<FrameSnapshot> = (0..frames)
            .map(|f| (0..verts).map(|v| tagged(f, v)).collect())
            .collect();

        let linear = pack(&snapshots, verts).unwrap();
        assert_eq!(linear.len(), frames * verts);
        for f in 0..frames {
            for v in 0..verts {
                assert_eq!(linear[sample_index(f, v, verts)], tagged(f, v));
            }
        }
        // Consecutive entries walk vertices first, not frames.
        assert_eq!(linear[1], tagged(0, 1));
        assert_eq!(linear[verts], tagged(1, 0));
    }

    #[test]
    fn pack_rejects_short_frame() {
        let snapshots = vec![vec![tagged(0, 0); 4], vec![tagged(1, 0); 3]];
        let err = pack(&snapshots, 4).unwrap_err();
        assert!(matches!(
            err,
            BakeError::TopologyMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn pack_empty_is_empty() {
        assert!(pack(&[], 7).unwrap().is_empty());
    }
}
