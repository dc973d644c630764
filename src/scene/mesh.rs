use crate::core::geometry::Vertex;
use nalgebra::{Point3, Vector3};
use std::f32::consts::TAU;

/// The bind-pose mesh that the evaluator deforms.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// List of vertices.
    pub vertices: Vec<Vertex>,
    /// List of indices defining triangles (3 indices per triangle).
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Creates an open cylinder standing on the origin along +Y.
    ///
    /// `segments` vertices per ring, `rings` rings from y = 0 to y = height.
    /// Normals point radially outward.
    pub fn create_test_column(radius: f32, height: f32, segments: usize, rings: usize) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut vertices = Vec::with_capacity(segments * rings);
        for ring in 0..rings {
            let y = height * ring as f32 / (rings - 1) as f32;
            for seg in 0..segments {
                let angle = TAU * seg as f32 / segments as f32;
                let (s, c) = angle.sin_cos();
                vertices.push(Vertex::new(
                    Point3::new(radius * c, y, radius * s),
                    Vector3::new(c, 0.0, s),
                ));
            }
        }

        // Two CCW triangles per quad between consecutive rings.
        let mut indices = Vec::with_capacity((rings - 1) * segments * 6);
        for ring in 0..rings - 1 {
            for seg in 0..segments {
                let a = (ring * segments + seg) as u32;
                let b = (ring * segments + (seg + 1) % segments) as u32;
                let c = a + segments as u32;
                let d = b + segments as u32;
                indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }

        Self::new(vertices, indices)
    }
}
