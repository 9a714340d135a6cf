use crate::error::ConfigError;
use crate::preprocessing::{Mode, PipelineConfig, ResizeFilter};
use clap::{Args, Parser};
use std::path::PathBuf;

/// Pipeline tuning flags shared by both binaries
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Binarize the enhanced image with Otsu thresholding (may lose thin strokes)
    #[arg(long)]
    pub aggressive: bool,

    /// Output width in pixels; wider images are shrunk, narrower ones kept
    #[arg(long, env = "WHITEBOARD_TARGET_WIDTH", default_value_t = 800)]
    pub target_width: u32,

    /// Interpolation used when shrinking
    #[arg(long, env = "WHITEBOARD_RESIZE_FILTER", value_enum, default_value_t = ResizeFilter::Area)]
    pub resize_filter: ResizeFilter,

    /// Gaussian blur kernel width (odd)
    #[arg(long, env = "WHITEBOARD_BLUR_KERNEL", default_value_t = 3)]
    pub blur_kernel_size: u32,

    /// CLAHE clip limit
    #[arg(long, env = "WHITEBOARD_CLAHE_CLIP", default_value_t = 2.0)]
    pub clahe_clip_limit: f32,

    /// CLAHE tiles per axis
    #[arg(long, env = "WHITEBOARD_CLAHE_GRID", default_value_t = 8)]
    pub clahe_grid: u32,

    /// Minimum Hough votes for a line candidate
    #[arg(long = "hough-threshold", env = "WHITEBOARD_HOUGH_THRESHOLD", default_value_t = 200)]
    pub hough_vote_threshold: u32,

    /// Strongest line candidates averaged into the skew estimate
    #[arg(long, env = "WHITEBOARD_MAX_LINES", default_value_t = 20)]
    pub max_lines: usize,

    /// Ignore line candidates rotated further than this from horizontal
    #[arg(long, env = "WHITEBOARD_MAX_SKEW", default_value_t = 45.0)]
    pub max_skew_degrees: f32,

    /// Skip corrections at or below this angle
    #[arg(long, env = "WHITEBOARD_MIN_SKEW", default_value_t = 1.0)]
    pub min_skew_degrees: f32,
}

impl TryFrom<PipelineArgs> for PipelineConfig {
    type Error = ConfigError;

    fn try_from(args: PipelineArgs) -> Result<Self, Self::Error> {
        let config = Self {
            mode: if args.aggressive {
                Mode::Binarized
            } else {
                Mode::Standard
            },
            target_width: args.target_width,
            resize_filter: args.resize_filter,
            blur_kernel_size: args.blur_kernel_size,
            clahe_clip_limit: args.clahe_clip_limit,
            clahe_grid: args.clahe_grid,
            hough_vote_threshold: args.hough_vote_threshold,
            max_lines: args.max_lines,
            max_skew_degrees: args.max_skew_degrees,
            min_skew_degrees: args.min_skew_degrees,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Recognition engine selection
#[derive(Args, Debug, Clone)]
pub struct RecognizerArgs {
    /// Recognition engine (pix2tex, or ocrs when built with engine-ocrs)
    #[arg(long, env = "WHITEBOARD_ENGINE", default_value = "pix2tex")]
    pub engine: String,

    /// Command used to invoke pix2tex
    #[arg(long, env = "PIX2TEX_COMMAND", default_value = "pix2tex")]
    pub pix2tex_command: String,
}

/// Recognizer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizerConfig {
    pub engine: String,
    pub pix2tex_command: String,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            engine: "pix2tex".to_string(),
            pix2tex_command: "pix2tex".to_string(),
        }
    }
}

impl From<RecognizerArgs> for RecognizerConfig {
    fn from(args: RecognizerArgs) -> Self {
        Self {
            engine: args.engine,
            pix2tex_command: args.pix2tex_command,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "whiteboard-latex-server")]
#[command(about = "Upload whiteboard math photos and get LaTeX back")]
#[command(version)]
pub struct ServerArgs {
    /// Host address to bind to
    #[arg(long, env = "WHITEBOARD_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "WHITEBOARD_PORT", default_value = "5001")]
    pub port: u16,

    /// Directory for transient upload and preprocessed files
    #[arg(long, env = "WHITEBOARD_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Maximum upload size in bytes (default: 16MB)
    #[arg(long, env = "WHITEBOARD_MAX_FILE_SIZE", default_value = "16777216")]
    pub max_file_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[command(flatten)]
    pub recognizer: RecognizerArgs,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_file_size: usize,
    pub recognizer: RecognizerConfig,
    pub pipeline: PipelineConfig,
}

impl TryFrom<ServerArgs> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: ServerArgs) -> Result<Self, Self::Error> {
        if args.max_file_size == 0 {
            return Err(ConfigError::Invalid {
                field: "max_file_size",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            upload_dir: args.upload_dir,
            max_file_size: args.max_file_size,
            recognizer: args.recognizer.into(),
            pipeline: args.pipeline.try_into()?,
        })
    }
}
