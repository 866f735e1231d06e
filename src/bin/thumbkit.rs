//! Provides the `thumbkit` tool for batch-rendering 3D model thumbnails.
//!
//! Usage: `thumbkit --input <dir> --output <dir> [options]`
//!
//! Renders one `<name>.png` per model into the output directory. Files that
//! fail are logged and skipped; the exit code only reflects whether the run
//! itself could start.
//!
//! # Examples
//! ```text
//! thumbkit --input models --output thumbs --res 256 --bg "#202020" --ext obj glb
//! RUST_LOG=debug thumbkit --input models --output thumbs --shard 0/4
//! ```

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use thumbkit::config::{normalize_extensions, Background, CameraAngle, RunConfig, Shard};
use thumbkit::formats::ImporterRegistry;
use thumbkit::pipeline;

#[derive(Debug, Parser)]
#[command(name = "thumbkit", version, about = "Render normalized PNG thumbnails for a folder of 3D models")]
struct Args {
    /// Folder with model files (searched recursively)
    #[arg(long)]
    input: PathBuf,

    /// Output folder for PNGs (created if missing)
    #[arg(long)]
    output: PathBuf,

    /// Square resolution in pixels
    #[arg(long, default_value_t = 512)]
    res: u32,

    /// transparent | white | black | #RRGGBB | #RGB
    #[arg(long, default_value = "transparent")]
    bg: String,

    /// Camera elevation and azimuth in degrees
    #[arg(long, num_args = 2, value_names = ["ELEV", "AZIM"], default_values = ["60", "30"], allow_negative_numbers = true)]
    angle: Vec<f32>,

    /// Ortho scale padding (1.0~1.3)
    #[arg(long, default_value_t = 1.15)]
    margin: f32,

    /// File extensions to process (one or more)
    #[arg(long, num_args = 1.., default_values = ["obj"])]
    ext: Vec<String>,

    /// Camera shift along world X after spherical placement (0 disables)
    #[arg(long, default_value_t = -100.0, allow_negative_numbers = true)]
    camera_offset: f32,

    /// Renderer samples per pixel
    #[arg(long, default_value_t = 64)]
    samples: u32,

    /// Only process shard INDEX of COUNT, e.g. 0/4
    #[arg(long)]
    shard: Option<Shard>,

    /// Write a JSON report of every file's outcome
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> RunConfig {
        let angle = match self.angle.as_slice() {
            [elevation, azimuth] => CameraAngle::new(*elevation, *azimuth),
            _ => CameraAngle::default(),
        };

        RunConfig {
            input_dir: self.input,
            output_dir: self.output,
            resolution: self.res,
            background: Background::parse(&self.bg),
            angle,
            margin: self.margin,
            extensions: normalize_extensions(&self.ext),
            camera_offset: self.camera_offset,
            samples: self.samples,
            shard: self.shard,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let report_path = args.report.clone();
    let config = args.into_config();
    config.validate().context("invalid arguments")?;

    info!("OUTPUT DIR = {:?}", config.output_dir);
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory '{}'",
            config.output_dir.display()
        )
    })?;

    let registry = ImporterRegistry::default();
    let report = pipeline::run_batch(&config, &registry)?;

    if let Some(path) = report_path {
        let file = File::create(&path)
            .with_context(|| format!("failed to create report '{}'", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .with_context(|| format!("failed to write report '{}'", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}
