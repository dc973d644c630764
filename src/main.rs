use clap::Parser;
use log::{error, info};
use std::process::ExitCode;
use vat_baker::app::run_cli;
use vat_baker::io::config::Config;
use vat_baker::pipeline::cancel::CancelToken;

/// Bakes skinned animation clips into vertex animation textures.
#[derive(Parser, Debug)]
#[command(name = "vat-baker")]
#[command(about = "Bakes skinned animation clips into position/normal textures")]
struct Cli {
    /// Configuration file (TOML). The built-in demo rig is used when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Output directory, overriding `bake.output_dir`.
    #[arg(short, long, value_name = "DIR")]
    output: Option<String>,

    /// Seconds between sampled frames, before power-of-two rounding.
    #[arg(long, value_name = "SECONDS")]
    sample_interval: Option<f32>,

    /// Bake without writing any files.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp(None)
        .format_level(true)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading config from '{}'", path);
            match Config::load(path) {
                Ok(c) => c,
                Err(e) => {
                    error!("Failed to load config '{}': {}", path, e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => {
            info!("No config given, using the demo rig");
            Config::default()
        }
    };

    if let Some(dir) = cli.output {
        config.bake.output_dir = dir;
    }
    if let Some(interval) = cli.sample_interval {
        config.bake.sample_interval = interval;
    }

    match run_cli(&config, cli.dry_run, CancelToken::new()) {
        Ok(report) if report.failed() == 0 => ExitCode::SUCCESS,
        Ok(report) => {
            error!("{} clip(s) failed", report.failed());
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Bake aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
