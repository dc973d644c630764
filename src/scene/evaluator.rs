use crate::core::error::Result;
use crate::scene::clip::ClipInfo;
use nalgebra::Vector3;

/// Deforms a mesh for a clip at a normalized time.
///
/// Evaluators are stateful and frame-stepped, so changing the time is a
/// two-phase protocol:
/// 1. `request_time` records the clip and normalized time (`0.0..=1.0`).
/// 2. `commit` performs the evaluation step. Only after it returns are
///    `evaluated_positions` / `evaluated_normals` valid for the request.
///
/// Reading before `commit` yields the previously committed pose. Calling
/// `commit` with nothing pending is a no-op settle step.
pub trait PoseEvaluator {
    /// Number of vertices in the deformed mesh.
    ///
    /// Fails with `EvaluatorUnavailable` when no mesh is bound.
    fn vertex_count(&self) -> Result<usize>;

    fn request_time(&mut self, clip: &ClipInfo, normalized_time: f32) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    /// Deformed positions in stable vertex order.
    fn evaluated_positions(&self) -> &[Vector3<f32>];

    /// Deformed normals in stable vertex order.
    fn evaluated_normals(&self) -> &[Vector3<f32>];
}
