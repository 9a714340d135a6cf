use anyhow::{bail, Context};
use clap::Parser;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whiteboard_latex::config::{PipelineArgs, RecognizerArgs, RecognizerConfig};
use whiteboard_latex::preprocessing::{Pipeline, PipelineConfig};
use whiteboard_latex::recognizers;

#[derive(Parser, Debug)]
#[command(name = "whiteboard-latex")]
#[command(about = "Convert a photo of handwritten whiteboard math to LaTeX")]
#[command(version)]
struct Args {
    /// Photo of the whiteboard
    image: PathBuf,

    /// File the recognized LaTeX is written to
    #[arg(long, short, default_value = "output.tex")]
    output: PathBuf,

    /// Working file for the preprocessed image, removed before exit
    #[arg(long, default_value = "preprocessed_temp.png")]
    preprocessed: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    log_level: String,

    #[command(flatten)]
    recognizer: RecognizerArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only progress and the result
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if !args.image.exists() {
        bail!("Image file not found: {}", args.image.display());
    }

    let pipeline = Pipeline::new(PipelineConfig::try_from(args.pipeline)?);
    let recognizer_config = RecognizerConfig::from(args.recognizer);

    let outcome = convert(
        &pipeline,
        &recognizer_config,
        &args.image,
        &args.preprocessed,
        &args.output,
    );
    remove_working_file(&args.preprocessed);
    outcome
}

fn convert(
    pipeline: &Pipeline,
    recognizer_config: &RecognizerConfig,
    image: &Path,
    preprocessed: &Path,
    output: &Path,
) -> anyhow::Result<()> {
    println!("Preprocessing image: {}", image.display());
    let result = pipeline
        .process_file(image, preprocessed)
        .context("Preprocessing failed")?;
    match result.skew {
        Some(skew) if result.skew_corrected => println!(
            "Image preprocessed successfully in {}ms (corrected {:.1} degree skew)",
            result.total_time_ms,
            skew.degrees()
        ),
        _ => println!(
            "Image preprocessed successfully in {}ms",
            result.total_time_ms
        ),
    }

    let recognizer =
        recognizers::load(recognizer_config).context("Failed to load recognition model")?;

    println!("Running LaTeX recognition...");
    let latex = recognizer
        .recognize(&DynamicImage::ImageLuma8(result.image))
        .context("Recognition failed")?;

    let rule = "=".repeat(50);
    println!("\n{rule}\nLaTeX Output:\n{rule}\n{latex}\n{rule}\n");

    std::fs::write(output, &latex)
        .with_context(|| format!("Failed to save {}", output.display()))?;
    println!("LaTeX saved to {}", output.display());

    Ok(())
}

/// Best-effort removal of the preprocessed working file.
fn remove_working_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove temporary file {}: {}", path.display(), e),
    }
}
