//! Command-line front end for the calibrated classifier.
//!
//! Loads an ONNX model, a label catalog and an optional calibration file,
//! classifies every image given on the command line and prints one JSON
//! object per image on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! classify -m model.onnx -l labels.json [-c calibration.json] [--debug] <IMAGES>...
//! ```
//!
//! Environment overrides (`UNKNOWN_THRESHOLD`, `MARGIN_THRESHOLD`,
//! `ENTROPY_THRESHOLD`, `SOFTMAX_TEMP`, `SHARPEN_GAMMA`, `INPUT_SIZE`) are
//! applied on top of the files; explicit command-line flags win over them.

use calibrated_classifier::core::config::env::process_env;
use calibrated_classifier::prelude::*;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser)]
#[command(name = "classify")]
#[command(about = "Classifies images with calibrated unknown rejection")]
struct Args {
    /// Path to the ONNX model file
    #[arg(short, long)]
    model: PathBuf,

    /// JSON array of class labels; the last one is the unknown sentinel
    #[arg(short, long)]
    labels: PathBuf,

    /// JSON calibration file (weights, thresholds, gamma, temperature)
    #[arg(short, long)]
    calibration: Option<PathBuf>,

    /// Paths to input images
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Model input side length
    #[arg(long)]
    input_size: Option<u32>,

    /// The model rescales pixel values itself
    #[arg(long)]
    model_includes_rescaling: bool,

    /// Evaluate the identity variant only
    #[arg(long)]
    no_tta: bool,

    /// Include diagnostics in the output
    #[arg(long)]
    debug: bool,

    /// Device to use for inference (e.g., 'cpu', 'cuda', 'cuda:0')
    #[arg(long, default_value = "cpu")]
    device: String,

    /// Session pool size for concurrent inference
    #[arg(long, default_value = "1")]
    session_pool_size: usize,
}

/// Parses a device string into execution providers in order of preference.
fn parse_device(device: &str) -> Result<Vec<OrtExecutionProvider>, String> {
    let device = device.to_lowercase();
    if device == "cpu" {
        return Ok(vec![OrtExecutionProvider::CPU]);
    }
    let device_id = match device.strip_prefix("cuda") {
        Some("") => 0,
        Some(rest) => rest
            .strip_prefix(':')
            .and_then(|id| id.parse::<i32>().ok())
            .ok_or_else(|| format!("invalid CUDA device '{device}'"))?,
        None => return Err(format!("unknown device '{device}', expected cpu or cuda[:N]")),
    };
    Ok(vec![
        OrtExecutionProvider::CUDA {
            device_id: Some(device_id),
        },
        OrtExecutionProvider::CPU,
    ])
}

/// Classifier configuration: environment overrides first, then explicit flags.
fn classifier_config<F>(
    args: &Args,
    lookup: F,
) -> Result<ImageClassifierConfig, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ImageClassifierConfig::new().with_overrides_from(lookup)?;
    if let Some(size) = args.input_size {
        config.input_size = size;
    }
    if args.no_tta {
        config.augmentation.enabled = false;
    }
    config.model_includes_rescaling = args.model_includes_rescaling;
    config.session_pool_size = args.session_pool_size;
    config.ort_session =
        Some(OrtSessionConfig::new().with_execution_providers(parse_device(&args.device)?));
    Ok(config)
}

fn build_classifier(args: &Args) -> Result<ImageClassifier, Box<dyn std::error::Error>> {
    let catalog = ClassCatalog::from_json_file(&args.labels)?;
    let calibration = match &args.calibration {
        Some(path) => CalibrationConfig::from_json_file(path)?,
        None => CalibrationConfig::default(),
    }
    .with_env_overrides()?;

    let classifier = ImageClassifier::builder()
        .config(classifier_config(args, process_env)?)
        .catalog(catalog)
        .calibration(calibration)
        .build()?;
    classifier.load_onnx_model(&args.model)?;
    Ok(classifier)
}

fn main() -> ExitCode {
    init_tracing("info");
    let args = Args::parse();

    let classifier = match build_classifier(&args) {
        Ok(classifier) => classifier,
        Err(e) => {
            error!("failed to set up classifier: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(
        "classifier ready: {}",
        serde_json::to_string(&classifier.status()).unwrap_or_default()
    );

    let options = ClassifyOptions { debug: args.debug };
    let mut failures = 0usize;
    for path in &args.images {
        let line = match classifier.classify_file(path, options) {
            Ok(result) => json!({ "image": path, "result": result }),
            Err(e) => {
                failures += 1;
                error!("{}: {}", path.display(), e);
                json!({ "image": path, "error": e.to_string() })
            }
        };
        println!("{line}");
    }

    if failures > 0 {
        error!("{} of {} images failed", failures, args.images.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
