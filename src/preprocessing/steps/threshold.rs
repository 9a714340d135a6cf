use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;

/// Global Otsu binarization: pixels above the level that maximizes
/// between-class variance become white, the rest black.
///
/// Lossy on purpose. Thin strokes near the level can vanish entirely.
pub fn binarize(image: GrayImage) -> GrayImage {
    let level = otsu_level(&image);
    tracing::debug!("Otsu level for binarization: {}", level);

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y).0[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Snap every pixel back to 0 or 255 around the midpoint.
///
/// Rotation and resampling blend neighbouring pixels, which reintroduces
/// grey levels into a binarized image.
pub fn restore_binary(image: GrayImage) -> GrayImage {
    let mut image = image;
    for pixel in image.pixels_mut() {
        pixel.0[0] = if pixel.0[0] >= 128 { 255 } else { 0 };
    }
    image
}

/// Inverted Otsu mask marking ink (dark) pixels as 255.
///
/// Returns `None` for a flat image, which has no ink to separate from the
/// background.
pub fn ink_mask(image: &GrayImage) -> Option<GrayImage> {
    let mut pixels = image.pixels().map(|p| p.0[0]);
    let first = pixels.next()?;
    if pixels.all(|v| v == first) {
        return None;
    }

    let level = otsu_level(image);
    Some(GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y).0[0] > level {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    }))
}
