use crate::error::PipelineError;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

use super::config::{Mode, PipelineConfig};
use super::io;
use super::steps;
use super::steps::skew::{SkewEstimate, SkewParams};

/// Timing information for a single pipeline stage
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of one pipeline run including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Normalized image (not serialized)
    #[serde(skip)]
    pub image: GrayImage,
    /// Skew measured on the enhanced image, if any line qualified
    pub skew: Option<SkewEstimate>,
    /// Whether the image was actually rotated
    pub skew_corrected: bool,
    /// Total processing time in milliseconds
    pub total_time_ms: u64,
    /// Contrast path taken
    pub mode: Mode,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Straight-line composition of the normalization stages.
///
/// Holds only its configuration; every call to [`Pipeline::process`] is
/// independent, so one pipeline can serve concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalize a decoded image.
    pub fn process(&self, image: DynamicImage) -> PreprocessingResult {
        let start = Instant::now();
        let mut steps_timing = Vec::new();
        let config = &self.config;

        let img = run_step("grayscale", &mut steps_timing, || {
            steps::grayscale::apply(image, config.blur_kernel_size)
        });

        let img = run_step("contrast", &mut steps_timing, || {
            steps::contrast::apply(img, config.clahe_clip_limit, config.clahe_grid)
        });

        // Measured before the optional binarization so both modes see the
        // same skew
        let skew = run_step("skew_estimate", &mut steps_timing, || {
            steps::skew::estimate(&img, &SkewParams::from(config))
        });

        let img = match config.mode {
            Mode::Standard => img,
            Mode::Binarized => run_step("binarize", &mut steps_timing, || {
                steps::threshold::binarize(img)
            }),
        };

        let skew_corrected = steps::deskew::needs_correction(skew, config.min_skew_degrees);
        let img = run_step("deskew", &mut steps_timing, || {
            steps::deskew::apply(img, skew, config.min_skew_degrees)
        });

        let img = run_step("resize", &mut steps_timing, || {
            steps::resize::apply(img, config.target_width, config.resize_filter)
        });

        let img = match config.mode {
            Mode::Standard => img,
            Mode::Binarized => run_step("restore_binary", &mut steps_timing, || {
                steps::threshold::restore_binary(img)
            }),
        };

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "Pipeline finished in {}ms (mode: {}, skew: {:?}, corrected: {})",
            total_time_ms,
            config.mode.as_str(),
            skew.map(|s| s.degrees()),
            skew_corrected
        );

        PreprocessingResult {
            image: img,
            skew,
            skew_corrected,
            total_time_ms,
            mode: config.mode,
            steps: steps_timing,
        }
    }

    /// Load `input`, normalize it and write the result to `output`.
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<PreprocessingResult, PipelineError> {
        let image = io::load(input)?;
        let result = self.process(image);
        io::write(&result.image, output)?;
        Ok(result)
    }
}

fn run_step<T, F>(name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> T
where
    F: FnOnce() -> T,
{
    let step_start = Instant::now();
    let result = step_fn();
    let time_ms = step_start.elapsed().as_millis() as u64;
    tracing::debug!("Step {} took {}ms", name, time_ms);
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms,
    });
    result
}
