use crate::core::error::{BakeError, Result};
use crate::core::geometry::VertexSample;
use crate::core::texture::{HalfTexture, Texel};
use crate::pipeline::kernel::{self, DispatchStats, Kernel};
use crate::pipeline::layout::{DispatchSize, WorkGroupSize};
use log::{debug, trace};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Largest group count a dispatch may request on any axis.
pub const MAX_GROUPS_PER_AXIS: u32 = 65_535;

/// Counts device resources so release on every exit path can be checked.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    live_targets: AtomicUsize,
    live_buffers: AtomicUsize,
    targets_created: AtomicUsize,
    buffers_created: AtomicUsize,
}

impl ResourceLedger {
    pub fn live_targets(&self) -> usize {
        self.live_targets.load(Ordering::Acquire)
    }

    pub fn live_buffers(&self) -> usize {
        self.live_buffers.load(Ordering::Acquire)
    }

    pub fn targets_created(&self) -> usize {
        self.targets_created.load(Ordering::Acquire)
    }

    pub fn buffers_created(&self) -> usize {
        self.buffers_created.load(Ordering::Acquire)
    }

    /// True when nothing allocated through this ledger is still alive.
    pub fn is_clear(&self) -> bool {
        self.live_targets() == 0 && self.live_buffers() == 0
    }
}

/// A writable texture owned by one clip bake. Released on drop.
#[derive(Debug)]
pub struct RenderTarget {
    label: String,
    texture: HalfTexture,
    ledger: Arc<ResourceLedger>,
}

impl RenderTarget {
    /// Registers a new target with `ledger`.
    pub fn new(label: impl Into<String>, texture: HalfTexture, ledger: Arc<ResourceLedger>) -> Self {
        ledger.live_targets.fetch_add(1, Ordering::AcqRel);
        ledger.targets_created.fetch_add(1, Ordering::AcqRel);
        Self {
            label: label.into(),
            texture,
            ledger,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn texture(&self) -> &HalfTexture {
        &self.texture
    }

    pub fn texture_mut(&mut self) -> &mut HalfTexture {
        &mut self.texture
    }

    pub fn clear(&mut self, value: Texel) {
        self.texture.clear(value);
    }

    /// Copies the contents out and releases the target.
    pub fn into_texture(mut self) -> HalfTexture {
        std::mem::replace(&mut self.texture, HalfTexture::new(0, 0))
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        self.ledger.live_targets.fetch_sub(1, Ordering::AcqRel);
        trace!("Released render target '{}'", self.label);
    }
}

/// The linear sample buffer bound as kernel input. Released on drop.
#[derive(Debug)]
pub struct SampleBuffer {
    data: Vec<VertexSample>,
    ledger: Arc<ResourceLedger>,
}

impl SampleBuffer {
    pub fn new(data: Vec<VertexSample>, ledger: Arc<ResourceLedger>) -> Self {
        ledger.live_buffers.fetch_add(1, Ordering::AcqRel);
        ledger.buffers_created.fetch_add(1, Ordering::AcqRel);
        Self { data, ledger }
    }

    pub fn as_slice(&self) -> &[VertexSample] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len() * VertexSample::STRIDE
    }
}

impl Drop for SampleBuffer {
    fn drop(&mut self) {
        self.ledger.live_buffers.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Resources bound to one `VertexFrameRearrange` dispatch.
pub struct RearrangeBindings<'a> {
    pub samples: &'a SampleBuffer,
    pub vertex_count: usize,
    pub out_position: &'a mut RenderTarget,
    pub out_normal: &'a mut RenderTarget,
}

/// The parallel dispatch collaborator.
///
/// Dispatch is blocking: when it returns `Ok`, every texel write is visible.
pub trait ComputeDevice {
    /// Threads per group declared by `kernel`.
    fn work_group_size(&self, kernel: Kernel) -> WorkGroupSize;

    /// Allocates a cleared `width x height` target.
    fn create_render_target(&self, label: &str, width: usize, height: usize) -> Result<RenderTarget>;

    fn create_sample_buffer(&self, samples: Vec<VertexSample>) -> Result<SampleBuffer>;

    fn dispatch(
        &self,
        kernel: Kernel,
        bindings: RearrangeBindings<'_>,
        groups: DispatchSize,
    ) -> Result<DispatchStats>;

    fn ledger(&self) -> &Arc<ResourceLedger>;
}

/// Runs kernels on the rayon thread pool.
#[derive(Debug, Clone)]
pub struct CpuDevice {
    work_group: WorkGroupSize,
    max_texture_size: usize,
    max_buffer_len: usize,
    ledger: Arc<ResourceLedger>,
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new(WorkGroupSize::default())
    }
}

impl CpuDevice {
    pub fn new(work_group: WorkGroupSize) -> Self {
        Self {
            work_group,
            max_texture_size: 16_384,
            max_buffer_len: 1 << 28,
            ledger: Arc::new(ResourceLedger::default()),
        }
    }

    /// Largest width or height a render target may have.
    pub fn with_max_texture_size(mut self, size: usize) -> Self {
        self.max_texture_size = size;
        self
    }

    /// Largest sample count a buffer may hold.
    pub fn with_max_buffer_len(mut self, len: usize) -> Self {
        self.max_buffer_len = len;
        self
    }

    fn validate(&self, bindings: &RearrangeBindings<'_>, groups: DispatchSize) -> Result<usize> {
        let wg = self.work_group;
        if wg.is_degenerate() {
            return Err(BakeError::dispatch(format!(
                "work group {}x{}x{} has an empty axis",
                wg.x, wg.y, wg.z
            )));
        }
        for (axis, count) in [("x", groups.x), ("y", groups.y), ("z", groups.z)] {
            if count == 0 || count > MAX_GROUPS_PER_AXIS {
                return Err(BakeError::dispatch(format!(
                    "group count {} on axis {} outside 1..={}",
                    count, axis, MAX_GROUPS_PER_AXIS
                )));
            }
        }

        let vertex_count = bindings.vertex_count;
        if vertex_count == 0 || bindings.samples.len() % vertex_count != 0 {
            return Err(BakeError::dispatch(format!(
                "buffer of {} samples does not divide into rows of {} vertices",
                bindings.samples.len(),
                vertex_count
            )));
        }
        let frame_count = bindings.samples.len() / vertex_count;

        let pos = bindings.out_position.texture();
        let nrm = bindings.out_normal.texture();
        if pos.width != nrm.width || pos.height != nrm.height {
            return Err(BakeError::dispatch(format!(
                "output targets differ in size: {}x{} vs {}x{}",
                pos.width, pos.height, nrm.width, nrm.height
            )));
        }
        if pos.width < vertex_count || pos.height < frame_count {
            return Err(BakeError::dispatch(format!(
                "output {}x{} cannot hold {} vertices x {} frames",
                pos.width, pos.height, vertex_count, frame_count
            )));
        }

        let grid_x = groups.x as usize * wg.x as usize;
        let grid_y = groups.y as usize * wg.y as usize;
        if grid_x < vertex_count || grid_y < frame_count {
            return Err(BakeError::dispatch(format!(
                "grid {}x{} does not cover {} vertices x {} frames",
                grid_x, grid_y, vertex_count, frame_count
            )));
        }
        Ok(frame_count)
    }
}

impl ComputeDevice for CpuDevice {
    fn work_group_size(&self, _kernel: Kernel) -> WorkGroupSize {
        self.work_group
    }

    fn create_render_target(&self, label: &str, width: usize, height: usize) -> Result<RenderTarget> {
        if width == 0 || height == 0 {
            return Err(BakeError::allocation(format!(
                "render target '{}' has zero size {}x{}",
                label, width, height
            )));
        }
        if width > self.max_texture_size || height > self.max_texture_size {
            return Err(BakeError::allocation(format!(
                "render target '{}' {}x{} exceeds max texture size {}",
                label, width, height, self.max_texture_size
            )));
        }
        debug!("Allocating render target '{}' ({}x{})", label, width, height);
        Ok(RenderTarget::new(
            label,
            HalfTexture::new(width, height),
            Arc::clone(&self.ledger),
        ))
    }

    fn create_sample_buffer(&self, samples: Vec<VertexSample>) -> Result<SampleBuffer> {
        if samples.len() > self.max_buffer_len {
            return Err(BakeError::allocation(format!(
                "sample buffer of {} entries exceeds limit {}",
                samples.len(),
                self.max_buffer_len
            )));
        }
        Ok(SampleBuffer::new(samples, Arc::clone(&self.ledger)))
    }

    fn dispatch(
        &self,
        kernel: Kernel,
        bindings: RearrangeBindings<'_>,
        groups: DispatchSize,
    ) -> Result<DispatchStats> {
        let frame_count = self.validate(&bindings, groups)?;
        debug!(
            "Dispatching '{}' with groups {}x{}x{} over {} vertices x {} frames",
            kernel.name(),
            groups.x,
            groups.y,
            groups.z,
            bindings.vertex_count,
            frame_count
        );

        let stats = match kernel {
            Kernel::VertexFrameRearrange => kernel::rearrange(
                bindings.samples.as_slice(),
                bindings.vertex_count,
                bindings.out_position.texture_mut(),
                bindings.out_normal.texture_mut(),
                self.work_group,
                groups,
            ),
        };
        trace!(
            "Dispatch finished: {} invocations, {} writes",
            stats.invocations, stats.writes
        );
        Ok(stats)
    }

    fn ledger(&self) -> &Arc<ResourceLedger> {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::texture::CLEAR_TEXEL;
    use nalgebra::Vector3;

    #[test]
    fn targets_and_buffers_release_on_drop() {
        let device = CpuDevice::default();
        {
            let _a = device.create_render_target("a", 4, 4).unwrap();
            let _b = device
                .create_sample_buffer(vec![VertexSample::default(); 4])
                .unwrap();
            assert_eq!(device.ledger().live_targets(), 1);
            assert_eq!(device.ledger().live_buffers(), 1);
        }
        assert!(device.ledger().is_clear());
        assert_eq!(device.ledger().targets_created(), 1);
    }

    #[test]
    fn into_texture_releases_target_and_keeps_contents() {
        let device = CpuDevice::default();
        let mut target = device.create_render_target("t", 2, 2).unwrap();
        target.texture_mut().texels[0][0] = half::f16::ONE;
        let tex = target.into_texture();
        assert_eq!(tex.texels[0][0], half::f16::ONE);
        assert_eq!(tex.texels[1], CLEAR_TEXEL);
        assert!(device.ledger().is_clear());
    }

    #[test]
    fn oversized_target_is_an_allocation_failure() {
        let device = CpuDevice::default().with_max_texture_size(64);
        let err = device.create_render_target("big", 128, 4).unwrap_err();
        assert!(matches!(err, BakeError::AllocationFailure(_)));
        assert!(device.ledger().is_clear());
    }

    #[test]
    fn dispatch_rejects_zero_groups_and_small_targets() {
        let device = CpuDevice::new(WorkGroupSize::new(8, 8, 1));
        let buffer = device
            .create_sample_buffer(vec![VertexSample::new(Vector3::x(), Vector3::y()); 8])
            .unwrap();
        let mut pos = device.create_render_target("p", 4, 2).unwrap();
        let mut nrm = device.create_render_target("n", 4, 2).unwrap();

        let err = device
            .dispatch(
                Kernel::VertexFrameRearrange,
                RearrangeBindings {
                    samples: &buffer,
                    vertex_count: 4,
                    out_position: &mut pos,
                    out_normal: &mut nrm,
                },
                DispatchSize::new(0, 1, 1),
            )
            .unwrap_err();
        assert!(matches!(err, BakeError::DispatchFailure(_)));

        // 8 samples as 2 vertices x 4 frames does not fit a 4x2 target.
        let err = device
            .dispatch(
                Kernel::VertexFrameRearrange,
                RearrangeBindings {
                    samples: &buffer,
                    vertex_count: 2,
                    out_position: &mut pos,
                    out_normal: &mut nrm,
                },
                DispatchSize::new(1, 1, 1),
            )
            .unwrap_err();
        assert!(matches!(err, BakeError::DispatchFailure(_)));

        let stats = device
            .dispatch(
                Kernel::VertexFrameRearrange,
                RearrangeBindings {
                    samples: &buffer,
                    vertex_count: 4,
                    out_position: &mut pos,
                    out_normal: &mut nrm,
                },
                DispatchSize::new(1, 1, 1),
            )
            .unwrap();
        assert_eq!(stats.writes, 8);
        assert_eq!(stats.invocations, 64);
    }

    fn dispatch_two_by_two(device: &CpuDevice, groups: DispatchSize) -> Result<DispatchStats> {
        let buffer = device
            .create_sample_buffer(vec![VertexSample::new(Vector3::x(), Vector3::y()); 4])
            .unwrap();
        let mut pos = device.create_render_target("p", 2, 2).unwrap();
        let mut nrm = device.create_render_target("n", 2, 2).unwrap();
        device.dispatch(
            Kernel::VertexFrameRearrange,
            RearrangeBindings {
                samples: &buffer,
                vertex_count: 2,
                out_position: &mut pos,
                out_normal: &mut nrm,
            },
            groups,
        )
    }

    #[test]
    fn empty_work_group_axis_is_a_dispatch_failure() {
        for wg in [
            WorkGroupSize::new(8, 8, 0),
            WorkGroupSize::new(0, 8, 1),
            WorkGroupSize::new(8, 0, 1),
        ] {
            let device = CpuDevice::new(wg);
            let err = dispatch_two_by_two(&device, DispatchSize::new(1, 1, 1)).unwrap_err();
            assert!(matches!(err, BakeError::DispatchFailure(_)), "{:?}", wg);
            assert!(device.ledger().is_clear());
        }
    }

    #[test]
    fn grid_must_cover_every_sample() {
        let device = CpuDevice::new(WorkGroupSize::new(1, 1, 1));
        let err = dispatch_two_by_two(&device, DispatchSize::new(1, 2, 1)).unwrap_err();
        assert!(matches!(err, BakeError::DispatchFailure(_)));

        let stats = dispatch_two_by_two(&device, DispatchSize::new(2, 2, 1)).unwrap();
        assert_eq!(stats.writes, 4);
    }
}
