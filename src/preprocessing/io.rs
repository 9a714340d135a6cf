//! Loader and writer at the pipeline boundary.

use crate::error::PipelineError;
use image::{DynamicImage, GrayImage, ImageError, ImageFormat};
use std::io;
use std::path::Path;

/// Read and decode an image file.
///
/// A missing or unreadable file is an `Io` error; readable bytes that are not
/// a supported raster format are a `Decode` error.
pub fn load(path: &Path) -> Result<DynamicImage, PipelineError> {
    let bytes = std::fs::read(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    load_bytes(&bytes, &path.display().to_string())
}

/// Decode an in-memory image. `origin` only labels errors.
pub fn load_bytes(bytes: &[u8], origin: &str) -> Result<DynamicImage, PipelineError> {
    let image = image::load_from_memory(bytes).map_err(|e| PipelineError::Decode {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;

    tracing::debug!(
        "Decoded {} ({}x{}, {:?})",
        origin,
        image.width(),
        image.height(),
        image.color()
    );

    Ok(image)
}

/// Encode `image` to `path`, picking the format from the extension.
pub fn write(image: &GrayImage, path: &Path) -> Result<(), PipelineError> {
    let io_error = |source: io::Error| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    };

    let format = ImageFormat::from_path(path).map_err(|e| {
        io_error(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("unsupported output format: {}", e),
        ))
    })?;

    image.save_with_format(path, format).map_err(|e| match e {
        ImageError::IoError(source) => io_error(source),
        other => io_error(io::Error::other(other.to_string())),
    })?;

    tracing::debug!(
        "Wrote {}x{} image to {}",
        image.width(),
        image.height(),
        path.display()
    );

    Ok(())
}
