mod delivery;

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use faceblur_core::blurring::domain::blur_settings::BlurSettings;
use faceblur_core::blurring::infrastructure::gaussian_region_redactor::GaussianRegionRedactor;
use faceblur_core::detection::domain::detector_backend::DetectorBackend;
use faceblur_core::detection::infrastructure::detector_factory::create_face_localizer;
use faceblur_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use faceblur_core::pipeline::redact_video_use_case::RedactVideoUseCase;
use faceblur_core::pipeline::redaction_config::RedactionConfig;
use faceblur_core::shared::constants::{OUTPUT_EXTENSION, OUTPUT_SUFFIX, VIDEO_EXTENSIONS};
use faceblur_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use faceblur_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

use delivery::Staging;

/// Marker for reading the input from stdin.
const STDIN_MARKER: &str = "-";

/// Blur every detected face in a video.
#[derive(Parser, Debug)]
#[command(name = "faceblur", version)]
struct Cli {
    /// Input video file, or `-` to read it from stdin.
    input: PathBuf,

    /// Output file. Defaults to `<input>_blurred.wmv`, or stdout for `-` input.
    output: Option<PathBuf>,

    /// Face detector: geometric (fast) or deep (higher recall).
    ///
    /// The geometric model (blazeface_short_range.onnx) is not downloaded
    /// automatically: place it in the model cache or pass --model-dir. The
    /// deep model is downloaded on first use.
    #[arg(long)]
    backend: Option<DetectorBackend>,

    /// Minimum detection confidence (0.0-1.0). Defaults per backend.
    #[arg(long)]
    confidence: Option<f64>,

    /// Gaussian blur kernel size (positive, odd). Defaults per backend.
    #[arg(long)]
    blur_kernel: Option<usize>,

    /// Gaussian blur sigma. Defaults per backend.
    #[arg(long)]
    blur_sigma: Option<f64>,

    /// Directory searched for model files before downloading. Required for
    /// the geometric backend unless its model is already in the cache.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// JSON config file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == STDIN_MARKER
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = build_config(&cli)?;
    config.validate()?;

    // Dropped at the end of the run, removing staged upload and output.
    let staging = if cli.reads_stdin() {
        Some(Staging::new()?)
    } else {
        None
    };

    let input = match &staging {
        Some(staging) => staging.receive_upload(io::stdin().lock())?,
        None => cli.input.clone(),
    };

    let output = match (&cli.output, &staging) {
        (Some(output), _) => output.clone(),
        (None, Some(staging)) => staging.output_path(),
        (None, None) => default_output_path(&cli.input),
    };
    if !has_output_extension(&output) {
        log::warn!(
            "{} does not end in .{OUTPUT_EXTENSION}; the container follows the extension",
            output.display()
        );
    }

    let localizer = create_face_localizer(
        config.backend,
        config.effective_confidence(),
        config.model_dir.as_deref(),
    )?;
    let blur = config.effective_blur();
    log::info!(
        "Blurring with {}x{} kernel, sigma {}",
        blur.kernel_size,
        blur.kernel_size,
        blur.sigma
    );

    let mut use_case = RedactVideoUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(FfmpegWriter::new()),
        localizer,
        Box::new(GaussianRegionRedactor::new(blur)),
        Box::new(StdoutPipelineLogger::default()),
    );
    let report = use_case.execute(&input, &output)?;
    log::info!(
        "Redacted {} face(s) across {} frames ({} detection failures)",
        report.faces_redacted,
        report.frames_written,
        report.detection_failures
    );

    if staging.is_some() && cli.output.is_none() {
        delivery::deliver(&output, io::stdout().lock())?;
    } else {
        log::info!("Output written to {}", output.display());
    }

    Ok(())
}

/// Merges the config file (if any) with command-line overrides.
fn build_config(cli: &Cli) -> Result<RedactionConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => RedactionConfig::load(path)?,
        None => RedactionConfig::default(),
    };

    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(confidence) = cli.confidence {
        config.confidence = Some(confidence);
    }
    if cli.blur_kernel.is_some() || cli.blur_sigma.is_some() {
        let base = config.effective_blur();
        config.blur = Some(BlurSettings {
            kernel_size: cli.blur_kernel.unwrap_or(base.kernel_size),
            sigma: cli.blur_sigma.unwrap_or(base.sigma),
        });
    }
    if let Some(dir) = &cli.model_dir {
        config.model_dir = Some(dir.clone());
    }

    Ok(config)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.reads_stdin() {
        if !cli.input.exists() {
            return Err(format!("Input file not found: {}", cli.input.display()).into());
        }
        if !is_known_video(&cli.input) {
            log::warn!(
                "{} is not one of the usual video types ({})",
                cli.input.display(),
                VIDEO_EXTENSIONS.join(", ")
            );
        }
    }
    if let Some(dir) = &cli.model_dir {
        if !dir.is_dir() {
            return Err(format!("Model directory not found: {}", dir.display()).into());
        }
    }
    Ok(())
}

/// `<dir>/<stem>_blurred.wmv` beside the input.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}{OUTPUT_SUFFIX}.{OUTPUT_EXTENSION}"))
}

fn has_output_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(OUTPUT_EXTENSION))
}

fn is_known_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
