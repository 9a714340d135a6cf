//! Recognition engine implementations
//!
//! This module contains implementations of the LatexRecognizer trait. Only
//! the configured engine is constructed; optional engines are compiled in
//! through feature flags.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

pub mod pix2tex;

use crate::config::RecognizerConfig;
use crate::error::RecognitionError;
use crate::recognizer::LatexRecognizer;
use std::sync::Arc;

/// Names of the engines compiled into this build
pub fn available() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut engines = vec![pix2tex::NAME];

    #[cfg(feature = "engine-ocrs")]
    engines.push(ocrs::NAME);

    engines
}

/// Construct the engine named in `config`.
///
/// May block for a long time (model downloads, process spawns); callers on
/// an async runtime should run it on the blocking pool.
pub fn load(config: &RecognizerConfig) -> Result<Arc<dyn LatexRecognizer>, RecognitionError> {
    tracing::info!("Initializing {} recognizer...", config.engine);

    let recognizer: Arc<dyn LatexRecognizer> = match config.engine.as_str() {
        pix2tex::NAME => Arc::new(pix2tex::Pix2TexRecognizer::new(config)?),
        #[cfg(feature = "engine-ocrs")]
        ocrs::NAME => Arc::new(ocrs::OcrsRecognizer::new(config)?),
        other => {
            return Err(RecognitionError::UnknownEngine {
                name: other.to_string(),
                available: available().join(", "),
            })
        }
    };

    tracing::info!(
        "{} recognizer ready: {}",
        recognizer.name(),
        recognizer.description()
    );
    Ok(recognizer)
}
