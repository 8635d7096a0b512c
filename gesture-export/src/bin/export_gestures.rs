//! Export simulated and measured lamp power for recorded gestures
//!
//! Reads `<gesture>.segments.json` files from the data directory, simulates
//! received power under the parallel and oriented-disk models, calibrates
//! both onto the measured power and writes one `<gesture>.json` per gesture.
//!
//! Usage:
//! ```text
//! cargo run --bin export_gestures -- --config export.json
//! cargo run --bin export_gestures -- --gesture Circle --gesture One:6 --method closed-form
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use gesture_export::{
    ExportConfig, GestureExporter, GestureRequest, JsonRecordWriter, JsonSegmentSource,
};
use radiometry::{DegeneratePolicy, IntegrationMethod};

/// View factor evaluation method
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Method {
    /// Adaptive double quadrature of the disk integral
    Quadrature,
    /// Analytic off-axis expression
    ClosedForm,
}

impl From<Method> for IntegrationMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Quadrature => IntegrationMethod::Quadrature,
            Method::ClosedForm => IntegrationMethod::ClosedForm,
        }
    }
}

/// Value for a segment whose simulated power is constant
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Degenerate {
    /// Minimum of the measured power
    Minimum,
    /// Midpoint of the measured power range
    Midpoint,
}

impl From<Degenerate> for DegeneratePolicy {
    fn from(policy: Degenerate) -> Self {
        match policy {
            Degenerate::Minimum => DegeneratePolicy::Minimum,
            Degenerate::Midpoint => DegeneratePolicy::Midpoint,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "export_gestures")]
#[command(about = "Simulate, calibrate and export lamp power for recorded gestures")]
struct Args {
    /// JSON config file; defaults are used for anything it leaves out
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory with <gesture>.segments.json files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory the <gesture>.json records are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Gesture to export as NAME or NAME:SEGMENT (repeatable, replaces the configured list)
    #[arg(short, long = "gesture")]
    gestures: Vec<GestureRequest>,

    /// View factor evaluation method
    #[arg(long)]
    method: Option<Method>,

    /// Fallback for segments with constant simulated power
    #[arg(long)]
    degenerate: Option<Degenerate>,

    /// Process gestures in parallel
    #[arg(long)]
    parallel: bool,

    /// Write the effective config to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut ExportConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if !self.gestures.is_empty() {
            config.gestures = self.gestures.clone();
        }
        if let Some(method) = self.method {
            config.integrator.method = method.into();
        }
        if let Some(policy) = self.degenerate {
            config.degenerate_policy = policy.into();
        }
        config.parallel |= self.parallel;
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ExportConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ExportConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    if let Some(path) = &args.write_config {
        config
            .save_to_file(path)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        info!("Wrote config to {}", path.display());
        return Ok(());
    }

    let light = config.light_source.descriptor();
    println!("Gesture Export");
    println!("==============");
    println!(
        "  Light source: ({:.2}, {:.2}, {:.2}), diameter {}",
        light.position[0], light.position[1], light.position[2], light.diameter
    );
    println!(
        "  Axis: ({:.3}, {:.3}, {:.3})",
        light.axis[0], light.axis[1], light.axis[2]
    );
    println!("  Sampling rate: {} Hz", config.sampling_rate_hz);
    println!("  View factor: {}", config.integrator.method);
    println!("  Data: {}", config.data_dir.display());
    println!("  Output: {}", config.output_dir.display());
    println!();

    let source = JsonSegmentSource::new(&config.data_dir);
    let writer = JsonRecordWriter::new(&config.output_dir);
    let exporter = GestureExporter::from_config(source, &config);

    info!(
        "Exporting {} gestures ({})",
        config.gestures.len(),
        if config.parallel { "parallel" } else { "sequential" }
    );
    let summary = if config.parallel {
        exporter.export_batch_parallel(&config.gestures, &writer)
    } else {
        exporter.export_batch(&config.gestures, &writer)
    };
    summary.log();

    println!();
    println!(
        "Done: {}/{} gestures exported",
        summary.exported.len(),
        config.gestures.len()
    );

    Ok(())
}
