use crate::core::error::Result;
use crate::io::config::Config;
use crate::io::exporter::DirectorySink;
use crate::pipeline::baker::{AssetSink, BakeReport, BakeSettings, Baker, ClipStatus, MemorySink};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::device::{ComputeDevice, CpuDevice};
use crate::scene::loader::{init_evaluator, shared_assets_from_config};
use log::{debug, info, warn};
use std::time::Instant;

/// Bakes every configured clip.
///
/// With `dry_run` the textures are kept in memory and nothing is written.
pub fn run_cli(config: &Config, dry_run: bool, cancel: CancelToken) -> Result<BakeReport> {
    info!("Starting bake '{}'...", config.bake.name);
    let start_time = Instant::now();

    let mut evaluator = init_evaluator(config)?;
    let clips = evaluator.clip_infos();

    let device = CpuDevice::new(config.bake.work_group_size()?)
        .with_max_texture_size(config.bake.max_texture_size);
    let settings = BakeSettings {
        name: config.bake.name.clone(),
        sample_interval: config.bake.sample_interval,
        shared: shared_assets_from_config(config),
    };
    let baker = Baker::new(&device, settings).with_cancel(cancel);

    let mut memory;
    let mut directory;
    let sink: &mut dyn AssetSink = if dry_run {
        info!("Dry run: textures stay in memory");
        memory = MemorySink::default();
        &mut memory
    } else {
        directory = DirectorySink::new(&config.bake.output_dir, &config.bake.name);
        info!("Writing to '{}'", directory.folder().display());
        &mut directory
    };

    let report = baker.bake_all(&mut evaluator, &clips, sink)?;
    log_summary(&report);

    if !device.ledger().is_clear() {
        warn!(
            "Device resources still alive after bake: {} targets, {} buffers",
            device.ledger().live_targets(),
            device.ledger().live_buffers()
        );
    }
    debug!(
        "Allocated {} render targets and {} sample buffers",
        device.ledger().targets_created(),
        device.ledger().buffers_created()
    );
    info!("Bake completed in {:.2?}", start_time.elapsed());
    Ok(report)
}

fn log_summary(report: &BakeReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            ClipStatus::Done {
                frame_count,
                layout,
                stats,
            } => info!(
                "  {:<16} ok      {:>4} frames  {}x{}  {} texels",
                outcome.clip, frame_count, layout.width, layout.height, stats.writes
            ),
            ClipStatus::Failed { stage, error } => warn!(
                "  {:<16} failed  at {:?}: {}",
                outcome.clip, stage, error
            ),
        }
    }
    info!(
        "{} clip(s) baked, {} failed{}",
        report.succeeded(),
        report.failed(),
        if report.cancelled { ", run cancelled" } else { "" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_bakes_demo_rig() {
        let config = Config::default();
        let report = run_cli(&config, true, CancelToken::new()).unwrap();
        assert_eq!(report.succeeded(), 2);
        assert!(!report.cancelled);
    }

    #[test]
    fn cancelled_run_bakes_nothing() {
        let config = Config::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let report = run_cli(&config, true, cancel).unwrap();
        assert!(report.outcomes.is_empty());
        assert!(report.cancelled);
    }

    #[test]
    fn zero_work_group_axis_aborts_before_baking() {
        let mut config = Config::default();
        config.bake.work_group = [8, 8, 0];
        let err = run_cli(&config, true, CancelToken::new()).unwrap_err();
        assert!(matches!(err, crate::core::error::BakeError::Config(_)));
    }
}
