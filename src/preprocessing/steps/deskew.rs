use super::skew::SkewEstimate;
use image::{GrayImage, Luma};

/// Whether `estimate` is large enough to be worth a rotation.
pub fn needs_correction(estimate: Option<SkewEstimate>, min_degrees: f32) -> bool {
    estimate.is_some_and(|e| e.degrees().abs() > min_degrees)
}

/// Rotate `image` about its center to cancel `estimate`.
///
/// Estimates at or below `min_degrees` in magnitude, and absent estimates,
/// return the image untouched.
pub fn apply(image: GrayImage, estimate: Option<SkewEstimate>, min_degrees: f32) -> GrayImage {
    match estimate {
        Some(e) if needs_correction(estimate, min_degrees) => {
            tracing::debug!("Correcting skew of {:.2} degrees", e.degrees());
            rotate_replicate(&image, e.degrees())
        }
        _ => image,
    }
}

/// Rotate counter-clockwise (as displayed) by `degrees`, so a line falling
/// to the right by that angle ends up horizontal.
///
/// Samples bilinearly. Coordinates outside the source are clamped to the
/// nearest edge pixel, so margins continue the board instead of turning
/// black or white.
pub fn rotate_replicate(image: &GrayImage, degrees: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = (width / 2) as f32;
    let cy = (height / 2) as f32;

    GrayImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = cos * dx - sin * dy + cx;
        let sy = sin * dx + cos * dy + cy;
        Luma([sample_clamped(image, sx, sy)])
    })
}

fn sample_clamped(image: &GrayImage, x: f32, y: f32) -> u8 {
    let max_x = (image.width() - 1) as f32;
    let max_y = (image.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let x1 = (x0 + 1.0).min(max_x);
    let y1 = (y0 + 1.0).min(max_y);

    let p = |px: f32, py: f32| image.get_pixel(px as u32, py as u32).0[0] as f32;
    let top = p(x0, y0) * (1.0 - fx) + p(x1, y0) * fx;
    let bottom = p(x0, y1) * (1.0 - fx) + p(x1, y1) * fx;

    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}
