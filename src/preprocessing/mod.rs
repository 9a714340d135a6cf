//! Whiteboard photo normalization
//!
//! Turns a raw photo of handwritten math into a clean single-channel raster
//! sized for the recognizer: denoise, local contrast, optional
//! binarization, skew correction and resize.

pub mod config;
pub mod io;
pub mod pipeline;
pub mod steps;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{Mode, PipelineConfig, ResizeFilter};
pub use pipeline::{Pipeline, PreprocessingResult, StepTiming};
pub use steps::skew::SkewEstimate;
