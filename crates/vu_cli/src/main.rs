//! video-upscale - upscale a video with Real-ESRGAN and interpolate it to
//! a higher frame rate.

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use vu_core::config::{self, RunOptions, Settings};
use vu_core::coordinator::Coordinator;
use vu_core::media::FrameRate;
use vu_core::pipeline::ProgressCallback;
use vu_core::tools::{self, ToolStatus};

#[derive(Parser, Debug)]
#[command(
    name = "video-upscale",
    version,
    about = "Upscale a video with Real-ESRGAN and interpolate to a higher frame rate"
)]
struct Cli {
    /// Input video (or still image) file
    input: PathBuf,

    /// Output file
    #[arg(short, long, default_value = "video-upscaled.mp4")]
    output: PathBuf,

    /// Target frame rate
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Override the probed source frame rate (Hz)
    #[arg(long)]
    rate: Option<f64>,

    /// Upscale factor passed to the enhancement model (default: 4)
    #[arg(long)]
    scale: Option<u32>,

    /// Worker threads for per-frame enhancement
    #[arg(short, long)]
    jobs: Option<usize>,

    /// GPU id for the enhancement model (-1 forces CPU)
    #[arg(long)]
    gpu: Option<i32>,

    /// Keep the temporary workspace after the run
    #[arg(long)]
    keep_temp: bool,

    /// Settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if !cli.input.exists() {
        bail!("input file not found: {}", cli.input.display());
    }

    let mut settings = match &cli.config {
        Some(path) => config::load_or_default(path),
        None => Settings::default(),
    };
    if let Some(scale) = cli.scale {
        settings.enhance.scale = scale;
    }
    if let Some(jobs) = cli.jobs {
        settings.enhance.workers = jobs;
    }
    if let Some(gpu) = cli.gpu {
        settings.enhance.gpu_id = Some(gpu);
    }

    report_tools(&settings)?;

    let target_rate = FrameRate::from_hz(cli.fps as f64).context("invalid target rate")?;
    let options = RunOptions {
        input: cli.input,
        output: cli.output,
        target_rate,
        rate_override: cli.rate,
        retain_workspace: cli.keep_temp,
    };

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg} ({eta})",
        )
        .unwrap()
        .progress_chars("#>-"),
    );

    let bar_handle = bar.clone();
    let progress: ProgressCallback = Box::new(move |stage, completed, total| {
        if bar_handle.length() != Some(total) {
            bar_handle.set_length(total);
        }
        bar_handle.set_message(stage.to_string());
        bar_handle.set_position(completed);
    });

    let coordinator = Coordinator::new(settings);
    match coordinator.run_with(options, Some(progress), None) {
        Ok(report) => {
            bar.finish_and_clear();
            println!("Output: {}", report.output_path.display());
            println!(
                "Frames: {} @ {:.3} fps -> target {:.3} fps",
                report.frames_extracted,
                report.source_rate.as_f64(),
                report.target_rate.as_f64()
            );
            if let Some(info) = &report.final_info {
                println!(
                    "Result: {}x{} @ {:.3} fps",
                    info.width,
                    info.height,
                    info.rate.as_f64()
                );
            }
            if report.audio_carried {
                println!("Audio:  carried over from source");
            }
            if !report.steps_skipped.is_empty() {
                println!("Skipped stages: {}", report.steps_skipped.join(", "));
            }
            println!("Log:    {}", report.log_path.display());
            Ok(())
        }
        Err(e) => {
            bar.finish_and_clear();
            if let Some(stage) = e.stage() {
                eprintln!("pipeline failed in stage {stage}");
            }
            Err(e.into())
        }
    }
}

/// Print the capability probe; a missing tool aborts with a hint.
fn report_tools(settings: &Settings) -> Result<()> {
    let checks = tools::check_tools(&[
        settings.tools.ffmpeg.as_str(),
        settings.tools.ffprobe.as_str(),
        settings.enhance.binary.as_str(),
    ]);

    let mut missing = Vec::new();
    for check in &checks {
        match &check.status {
            ToolStatus::Available { version } => {
                tracing::debug!(
                    "{}: available{}",
                    check.name,
                    version
                        .as_deref()
                        .map(|v| format!(" ({v})"))
                        .unwrap_or_default()
                );
            }
            ToolStatus::Missing { reason } => {
                eprintln!("missing dependency '{}': {}", check.name, reason);
                missing.push(check.name.clone());
            }
        }
    }

    if !missing.is_empty() {
        bail!(
            "install the missing dependencies and retry: {}",
            missing.join(", ")
        );
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
