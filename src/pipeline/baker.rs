use crate::core::error::{BakeError, Result};
use crate::core::texture::CLEAR_TEXEL;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::device::{ComputeDevice, RearrangeBindings};
use crate::pipeline::kernel::{DispatchStats, Kernel};
use crate::pipeline::layout::{TextureLayout, plan};
use crate::pipeline::packer::pack;
use crate::pipeline::sampler::{DEFAULT_SAMPLE_INTERVAL, PoseSampler, frame_count};
use crate::scene::asset::{BakedAnimationAsset, SharedAssets};
use crate::scene::clip::{ClipBake, ClipInfo};
use crate::scene::evaluator::PoseEvaluator;
use log::{debug, info, warn};

/// Receives finished assets. Implementations own on-disk persistence.
pub trait AssetSink {
    fn persist(&mut self, asset: BakedAnimationAsset, shared: &SharedAssets) -> Result<()>;
}

/// Keeps every asset in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub assets: Vec<BakedAnimationAsset>,
}

impl AssetSink for MemorySink {
    fn persist(&mut self, asset: BakedAnimationAsset, _shared: &SharedAssets) -> Result<()> {
        self.assets.push(asset);
        Ok(())
    }
}

/// Per-clip bake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeState {
    Init,
    Sampling,
    Packing,
    Dispatching,
    Done,
}

#[derive(Debug)]
pub enum ClipStatus {
    Done {
        frame_count: usize,
        layout: TextureLayout,
        stats: DispatchStats,
    },
    /// `stage` is the last state entered. `Done` means the textures were
    /// produced but the sink rejected them.
    Failed { stage: BakeState, error: BakeError },
}

#[derive(Debug)]
pub struct ClipOutcome {
    pub clip: String,
    pub status: ClipStatus,
}

impl ClipOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self.status, ClipStatus::Done { .. })
    }
}

/// Result of a whole run, one outcome per attempted clip in input order.
#[derive(Debug, Default)]
pub struct BakeReport {
    pub outcomes: Vec<ClipOutcome>,
    /// Set when the run stopped early; clips after the last outcome were
    /// never started.
    pub cancelled: bool,
}

impl BakeReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_done()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

#[derive(Debug, Clone)]
pub struct BakeSettings {
    /// Prefix for texture and object names.
    pub name: String,
    /// Seconds between frames before power-of-two rounding.
    pub sample_interval: f32,
    pub shared: SharedAssets,
}

impl Default for BakeSettings {
    fn default() -> Self {
        Self {
            name: "Baked".to_string(),
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            shared: SharedAssets::default(),
        }
    }
}

/// Drives sampling, packing and dispatch clip by clip.
///
/// Clips are baked strictly in order; clip N+1 starts only after clip N is
/// done or failed. A failed clip releases its render targets and sample
/// buffer and produces no asset.
pub struct Baker<'a, D: ComputeDevice + ?Sized> {
    device: &'a D,
    settings: BakeSettings,
    cancel: CancelToken,
}

impl<'a, D: ComputeDevice + ?Sized> Baker<'a, D> {
    pub fn new(device: &'a D, settings: BakeSettings) -> Self {
        Self {
            device,
            settings,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &BakeSettings {
        &self.settings
    }

    /// Bakes every clip and hands successful assets to `sink`.
    ///
    /// Fails as a whole only when the evaluator has no mesh to bake; clip
    /// failures are recorded in the report.
    pub fn bake_all<E, S>(
        &self,
        evaluator: &mut E,
        clips: &[ClipInfo],
        sink: &mut S,
    ) -> Result<BakeReport>
    where
        E: PoseEvaluator + ?Sized,
        S: AssetSink + ?Sized,
    {
        let vertex_count = evaluator.vertex_count()?;
        if vertex_count == 0 {
            return Err(BakeError::EvaluatorUnavailable(
                "mesh has no vertices".to_string(),
            ));
        }
        info!(
            "Baking {} clip(s) of '{}' ({} vertices)",
            clips.len(),
            self.settings.name,
            vertex_count
        );

        let mut report = BakeReport::default();
        for clip in clips {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let mut state = BakeState::Init;
            let status = match self.bake_clip(evaluator, clip, vertex_count, &mut state) {
                Ok((asset, stats)) => {
                    let frame_count = asset.frame_count;
                    let layout = asset.layout;
                    match sink.persist(asset, &self.settings.shared) {
                        Ok(()) => {
                            info!(
                                "Clip '{}' baked: {} frames into {}x{}",
                                clip.name, frame_count, layout.width, layout.height
                            );
                            ClipStatus::Done {
                                frame_count,
                                layout,
                                stats,
                            }
                        }
                        Err(error) => {
                            warn!("Clip '{}' could not be persisted: {}", clip.name, error);
                            ClipStatus::Failed { stage: state, error }
                        }
                    }
                }
                Err(error) => {
                    warn!("Clip '{}' failed during {:?}: {}", clip.name, state, error);
                    if matches!(error, BakeError::Cancelled) {
                        report.cancelled = true;
                    }
                    ClipStatus::Failed { stage: state, error }
                }
            };

            report.outcomes.push(ClipOutcome {
                clip: clip.name.clone(),
                status,
            });
            if report.cancelled {
                break;
            }
        }

        Ok(report)
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(BakeError::Cancelled);
        }
        Ok(())
    }

    /// Bakes one clip. `state` tracks the stage reached so a failure can be
    /// attributed. Every resource is scoped to this call.
    pub fn bake_clip<E: PoseEvaluator + ?Sized>(
        &self,
        evaluator: &mut E,
        clip: &ClipInfo,
        vertex_count: usize,
        state: &mut BakeState,
    ) -> Result<(BakedAnimationAsset, DispatchStats)> {
        *state = BakeState::Init;
        let frames = frame_count(clip, self.settings.sample_interval)?;
        let work_group = self.device.work_group_size(Kernel::VertexFrameRearrange);
        let layout = plan(vertex_count, frames, work_group);
        debug!(
            "Clip '{}': {:.3}s -> {} frames, texture {}x{}, groups {:?}",
            clip.name, clip.duration, frames, layout.width, layout.height, layout.groups
        );

        let position_name = format!("{}.{}.posTex", self.settings.name, clip.name);
        let normal_name = format!("{}.{}.normTex", self.settings.name, clip.name);
        let mut positions =
            self.device
                .create_render_target(&position_name, layout.width, layout.height)?;
        let mut normals = self
            .device
            .create_render_target(&normal_name, layout.width, layout.height)?;
        positions.clear(CLEAR_TEXEL);
        normals.clear(CLEAR_TEXEL);

        let mut bake = ClipBake::new(clip.clone(), frames, vertex_count);

        self.check_cancel()?;
        *state = BakeState::Sampling;
        let snapshots = PoseSampler::with_cancel(self.cancel.clone()).sample(
            evaluator,
            clip,
            frames,
            vertex_count,
        )?;

        self.check_cancel()?;
        *state = BakeState::Packing;
        bake.samples = pack(&snapshots, vertex_count)?;
        drop(snapshots);
        debug_assert!(bake.is_complete());

        self.check_cancel()?;
        *state = BakeState::Dispatching;
        let stats = {
            let buffer = self
                .device
                .create_sample_buffer(std::mem::take(&mut bake.samples))?;
            self.device.dispatch(
                Kernel::VertexFrameRearrange,
                RearrangeBindings {
                    samples: &buffer,
                    vertex_count,
                    out_position: &mut positions,
                    out_normal: &mut normals,
                },
                layout.groups,
            )?
        };

        *state = BakeState::Done;
        Ok((
            BakedAnimationAsset {
                clip_name: clip.name.clone(),
                duration: clip.duration,
                looping: clip.looping,
                vertex_count,
                frame_count: frames,
                layout,
                position_name,
                normal_name,
                positions: positions.into_texture(),
                normals: normals.into_texture(),
            },
            stats,
        ))
    }
}
