use nalgebra::{Point3, Vector3};

/// Represents a single bind-pose vertex of the source mesh.
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    /// Position in local object space.
    pub position: Point3<f32>,
    /// Normal vector in local object space.
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// One deformed vertex captured at one frame.
///
/// The layout matches the structured buffer the rearrangement kernel reads:
/// six tightly packed floats, position first.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct VertexSample {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
}

impl VertexSample {
    /// Stride of one sample in the linear buffer, in bytes.
    pub const STRIDE: usize = std::mem::size_of::<[f32; 6]>();

    pub fn new(position: Vector3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// Index of the sample for `(frame, vertex)` in a frame-major linear buffer.
#[inline(always)]
pub fn sample_index(frame: usize, vertex: usize, vertex_count: usize) -> usize {
    frame * vertex_count + vertex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_stride_is_six_floats() {
        assert_eq!(VertexSample::STRIDE, 24);
        assert_eq!(std::mem::size_of::<VertexSample>(), VertexSample::STRIDE);
    }

    #[test]
    fn sample_index_is_frame_major() {
        assert_eq!(sample_index(0, 0, 10), 0);
        assert_eq!(sample_index(0, 9, 10), 9);
        assert_eq!(sample_index(1, 0, 10), 10);
        assert_eq!(sample_index(3, 7, 10), 37);
    }
}
