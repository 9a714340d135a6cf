//! pix2tex engine
//!
//! Drives the `pix2tex` command line tool. The image is encoded to a
//! temporary PNG, the tool is run on it and the LaTeX it prints is returned.

use crate::config::RecognizerConfig;
use crate::error::RecognitionError;
use crate::recognizer::LatexRecognizer;
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use std::process::{Command, Stdio};

pub const NAME: &str = "pix2tex";

pub struct Pix2TexRecognizer {
    command: String,
}

impl Pix2TexRecognizer {
    /// Check that `config.pix2tex_command` can be started.
    pub fn new(config: &RecognizerConfig) -> Result<Self, RecognitionError> {
        let command = config.pix2tex_command.clone();

        Command::new(&command)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                RecognitionError::Initialization(format!("Cannot run '{}': {}", command, e))
            })?;

        tracing::debug!("Using pix2tex command '{}'", command);
        Ok(Self { command })
    }

    fn run(&self, path: &Path) -> Result<String, RecognitionError> {
        let output = Command::new(&self.command)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                RecognitionError::Inference(format!("Failed to run '{}': {}", self.command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::Inference(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        parse_output(&String::from_utf8_lossy(&output.stdout), path)
    }
}

impl LatexRecognizer for Pix2TexRecognizer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "pix2tex LaTeX OCR model via its command line tool"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError> {
        let file = tempfile::Builder::new()
            .prefix("pix2tex_")
            .suffix(".png")
            .tempfile()
            .map_err(|e| RecognitionError::Inference(format!("Failed to create temp file: {}", e)))?;

        image
            .save_with_format(file.path(), ImageFormat::Png)
            .map_err(|e| RecognitionError::Inference(format!("Failed to encode image: {}", e)))?;

        let latex = self.run(file.path())?;

        if let Err(e) = file.close() {
            tracing::warn!("Failed to remove pix2tex input: {}", e);
        }

        Ok(latex)
    }
}

/// Take the last non-empty line of the tool's output, dropping the
/// `<path>: ` prefix it puts in front of predictions for file arguments.
fn parse_output(stdout: &str, path: &Path) -> Result<String, RecognitionError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .ok_or_else(|| RecognitionError::Inference("pix2tex printed nothing".to_string()))?;

    let prefix = path.display().to_string();
    let latex = line
        .strip_prefix(prefix.as_str())
        .and_then(|rest| rest.trim_start().strip_prefix(':'))
        .unwrap_or(line)
        .trim();

    Ok(latex.to_string())
}
