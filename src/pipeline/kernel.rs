use crate::core::geometry::{VertexSample, sample_index};
use crate::core::texture::{HalfTexture, encode_vec3};
use crate::pipeline::layout::{DispatchSize, WorkGroupSize};
use rayon::prelude::*;

/// Compute kernels a device can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Copies a frame-major sample buffer into position/normal textures.
    VertexFrameRearrange,
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::VertexFrameRearrange => "vertex_frame_rearrange",
        }
    }
}

/// What one dispatch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    /// Work items launched (groups x threads per group).
    pub invocations: u64,
    /// Texels written to each output texture.
    pub writes: u64,
}

/// Kernel body for the work item at global id `(x, y, z)`.
///
/// Returns the buffer index to copy into texel `(x, y)`, or `None` when the
/// id falls outside `[0, vertex_count) x [0, frame_count)` or off the z = 0
/// slice. Out-of-range items must not write.
#[inline(always)]
pub fn texel_source(
    x: usize,
    y: usize,
    z: usize,
    vertex_count: usize,
    frame_count: usize,
) -> Option<usize> {
    if z != 0 || x >= vertex_count || y >= frame_count {
        return None;
    }
    Some(sample_index(y, x, vertex_count))
}

/// Runs the rearrangement over the dispatched grid on the CPU.
///
/// Each output row belongs to exactly one global y, so rows are processed
/// in parallel without synchronisation. Callers must ensure both textures
/// share dimensions that cover the `vertex_count x frame_count` grid.
pub fn rearrange(
    samples: &[VertexSample],
    vertex_count: usize,
    positions: &mut HalfTexture,
    normals: &mut HalfTexture,
    work_group: WorkGroupSize,
    groups: DispatchSize,
) -> DispatchStats {
    let frame_count = samples.len().checked_div(vertex_count).unwrap_or(0);
    let grid_x = groups.x as usize * work_group.x as usize;
    let grid_y = groups.y as usize * work_group.y as usize;
    let grid_z = groups.z as usize * work_group.z as usize;
    let invocations = (grid_x * grid_y * grid_z) as u64;

    let width = positions.width;
    if width == 0 {
        return DispatchStats {
            invocations,
            writes: 0,
        };
    }
    // Rows and columns past the texture edge hold only no-op work items.
    let rows = grid_y.min(positions.height);
    let cols = grid_x.min(width);

    let writes = positions
        .texels
        .par_chunks_mut(width)
        .zip(normals.texels.par_chunks_mut(width))
        .take(rows)
        .enumerate()
        .map(|(y, (pos_row, nrm_row))| {
            let mut written = 0u64;
            for z in 0..grid_z {
                for x in 0..cols {
                    if let Some(idx) = texel_source(x, y, z, vertex_count, frame_count) {
                        let sample = &samples[idx];
                        pos_row[x] = encode_vec3(&sample.position);
                        nrm_row[x] = encode_vec3(&sample.normal);
                        written += 1;
                    }
                }
            }
            written
        })
        .sum();

    DispatchStats {
        invocations,
        writes,
    }
}
