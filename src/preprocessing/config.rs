use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Which contrast path the pipeline takes after CLAHE.
///
/// `Binarized` applies a global Otsu threshold. It helps on simple, clean
/// captures but flattens thin strokes (fraction bars, serifs) that the
/// recognizer relies on, so `Standard` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Standard,
    Binarized,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Binarized => "binarized",
        }
    }
}

/// Interpolation used when shrinking to the target width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    /// Area averaging, least aliasing on thin strokes
    #[default]
    Area,
    /// Catmull-Rom cubic
    Cubic,
    /// Bilinear
    Linear,
}

/// Parameters for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: Mode,
    /// Output width in pixels. Wider images are shrunk, narrower ones kept.
    pub target_width: u32,
    pub resize_filter: ResizeFilter,
    /// Gaussian kernel width (odd). 3 keeps thin pen strokes; 5 smooths
    /// more noise but starts eating into them.
    pub blur_kernel_size: u32,
    pub clahe_clip_limit: f32,
    /// Tiles per axis for CLAHE.
    pub clahe_grid: u32,
    pub hough_vote_threshold: u32,
    /// Strongest line candidates averaged into the skew estimate.
    pub max_lines: usize,
    /// Candidates rotated further than this from horizontal are ignored.
    pub max_skew_degrees: f32,
    /// Estimates at or below this magnitude leave the image untouched.
    pub min_skew_degrees: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Standard,
            target_width: 800,
            resize_filter: ResizeFilter::Area,
            blur_kernel_size: 3,
            clahe_clip_limit: 2.0,
            clahe_grid: 8,
            hough_vote_threshold: 200,
            max_lines: 20,
            max_skew_degrees: 45.0,
            min_skew_degrees: 1.0,
        }
    }
}

impl PipelineConfig {
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Reject values the stages cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_width == 0 {
            return Err(invalid("target_width", "must be greater than zero"));
        }
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(invalid(
                "blur_kernel_size",
                format!("must be odd and positive, got {}", self.blur_kernel_size),
            ));
        }
        if !self.clahe_clip_limit.is_finite() || self.clahe_clip_limit <= 0.0 {
            return Err(invalid(
                "clahe_clip_limit",
                format!("must be positive, got {}", self.clahe_clip_limit),
            ));
        }
        if self.clahe_grid == 0 {
            return Err(invalid("clahe_grid", "must be greater than zero"));
        }
        if self.max_lines == 0 {
            return Err(invalid("max_lines", "must be greater than zero"));
        }
        if !self.max_skew_degrees.is_finite() || self.max_skew_degrees <= 0.0 {
            return Err(invalid(
                "max_skew_degrees",
                format!("must be positive, got {}", self.max_skew_degrees),
            ));
        }
        if !self.min_skew_degrees.is_finite() || self.min_skew_degrees < 0.0 {
            return Err(invalid(
                "min_skew_degrees",
                format!("must not be negative, got {}", self.min_skew_degrees),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
