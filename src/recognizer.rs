use crate::config::RecognizerConfig;
use crate::error::RecognitionError;
use crate::recognizers;
use image::DynamicImage;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Trait that all LaTeX recognition engines must implement
pub trait LatexRecognizer: Send + Sync {
    /// Returns the engine identifier (e.g., "pix2tex", "ocrs")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize the expression in a normalized image.
    ///
    /// The pipeline hands over its single-channel output as
    /// `DynamicImage::ImageLuma8`; engines convert internally if they need
    /// colour.
    fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError>;
}

/// Process-wide recognizer, loaded on first use and shared by reference.
///
/// A failed load is not cached: the next call tries again.
pub struct RecognizerHandle {
    engine: String,
    config: RecognizerConfig,
    cell: OnceCell<Arc<dyn LatexRecognizer>>,
}

impl RecognizerHandle {
    pub fn new(config: RecognizerConfig) -> Self {
        Self {
            engine: config.engine.clone(),
            config,
            cell: OnceCell::new(),
        }
    }

    /// Wrap an already constructed recognizer.
    pub fn with_recognizer(recognizer: Arc<dyn LatexRecognizer>) -> Self {
        Self {
            engine: recognizer.name().to_string(),
            config: RecognizerConfig::default(),
            cell: OnceCell::new_with(Some(recognizer)),
        }
    }

    /// Name of the configured engine, whether or not it is loaded yet
    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Get the recognizer, loading it on a blocking thread if needed.
    pub async fn get(&self) -> Result<Arc<dyn LatexRecognizer>, RecognitionError> {
        self.cell
            .get_or_try_init(|| async {
                let config = self.config.clone();
                tokio::task::spawn_blocking(move || recognizers::load(&config))
                    .await
                    .map_err(|e| {
                        RecognitionError::Initialization(format!("Loader task failed: {}", e))
                    })?
            })
            .await
            .cloned()
    }

    /// Recognize `image` on the blocking pool.
    pub async fn recognize(&self, image: DynamicImage) -> Result<String, RecognitionError> {
        let recognizer = self.get().await?;
        tokio::task::spawn_blocking(move || recognizer.recognize(&image))
            .await
            .map_err(|e| RecognitionError::Inference(format!("Recognition task failed: {}", e)))?
    }
}
