use anyhow::{Context, Result};
use bgremove::config::{ConfigOptions, Device, ModelSize, OutputOptions};
use bgremove::{ImageSource, Runtime};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Keep the subject, make the background transparent
    RemoveBackground,
    /// Keep the background, make the subject transparent
    RemoveForeground,
    /// Write the mask itself
    Segment,
    /// Apply the mask given with --mask, no inference
    ApplyMask,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DeviceArg {
    Cpu,
    Gpu,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    Small,
    Medium,
    Large,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image path
    input: PathBuf,

    /// Output image path
    #[arg(short, long, default_value = "output.png")]
    output: PathBuf,

    /// What to produce
    #[arg(long, value_enum, default_value = "remove-background")]
    mode: Mode,

    /// Mask image for --mode apply-mask
    #[arg(long, required_if_eq("mode", "apply-mask"))]
    mask: Option<PathBuf>,

    /// JSON config file (camelCase keys); command-line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL or directory holding resources.json and model chunks
    #[arg(long)]
    public_path: Option<String>,

    /// Model variant
    #[arg(long, value_enum)]
    model: Option<ModelArg>,

    /// Inference device
    #[arg(long, value_enum)]
    device: Option<DeviceArg>,

    /// Output media type, e.g. image/png or image/webp
    #[arg(long)]
    format: Option<String>,

    /// Output quality in [0, 1] for lossy formats
    #[arg(long)]
    quality: Option<f32>,

    /// Enable debug logging and progress output
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn config_options(&self) -> Result<ConfigOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                ConfigOptions::from_json(&bytes)?
            }
            None => ConfigOptions::default(),
        };

        if self.public_path.is_some() {
            options.public_path = self.public_path.clone();
        }
        if self.debug {
            options.debug = Some(true);
        }
        if let Some(device) = self.device {
            options.device = Some(match device {
                DeviceArg::Cpu => Device::Cpu,
                DeviceArg::Gpu => Device::Gpu,
            });
        }
        if let Some(model) = self.model {
            options.model = Some(match model {
                ModelArg::Small => ModelSize::Small,
                ModelArg::Medium => ModelSize::Medium,
                ModelArg::Large => ModelSize::Large,
            });
        }
        if self.format.is_some() || self.quality.is_some() {
            let output = options.output.get_or_insert_with(OutputOptions::default);
            if self.format.is_some() {
                output.format = self.format.clone();
            }
            if self.quality.is_some() {
                output.quality = self.quality;
            }
        }
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = args
        .config_options()?
        .validate()
        .context("Invalid configuration")?;

    tracing::info!("Input: {}", args.input.display());
    tracing::info!("Mode: {:?}", args.mode);
    tracing::info!("Model: {:?} on {:?}", config.model(), config.device());

    let runtime = Runtime::onnx();
    let input = ImageSource::Path(args.input.clone());
    let start = Instant::now();

    let encoded = match args.mode {
        Mode::RemoveBackground => runtime.remove_background(input, &config).await,
        Mode::RemoveForeground => runtime.remove_foreground(input, &config).await,
        Mode::Segment => runtime.segment_foreground(input, &config).await,
        Mode::ApplyMask => {
            let mask = args
                .mask
                .clone()
                .context("--mask is required with --mode apply-mask")?;
            runtime
                .apply_segmentation_mask(input, ImageSource::Path(mask), &config)
                .await
        }
    }
    .context("Failed to process image")?;

    std::fs::write(&args.output, &encoded.bytes)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    tracing::info!(
        "Wrote {} ({}, {} bytes) in {:.1}ms",
        args.output.display(),
        encoded.mime,
        encoded.bytes.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    runtime.dispose();
    Ok(())
}
