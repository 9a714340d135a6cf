//! Synthetic whiteboard captures shared by the pipeline tests.

use image::{GrayImage, Luma, Rgb, RgbImage};

const BOARD: u8 = 232;
const INK: u8 = 28;

/// Parallel handwritten-like strokes rotated by `degrees` (positive falls to
/// the right) on a light board.
pub fn tilted_lines(width: u32, height: u32, degrees: f32) -> GrayImage {
    let ink = stroke_field(width, height, degrees);
    GrayImage::from_fn(width, height, |x, y| {
        if ink(x, y) {
            Luma([INK])
        } else {
            Luma([BOARD])
        }
    })
}

/// Colour version of [`tilted_lines`]: dark blue marker on an off-white board.
pub fn tilted_lines_rgb(width: u32, height: u32, degrees: f32) -> RgbImage {
    let ink = stroke_field(width, height, degrees);
    RgbImage::from_fn(width, height, |x, y| {
        if ink(x, y) {
            Rgb([30, 34, 70])
        } else {
            Rgb([236, 234, 226])
        }
    })
}

fn stroke_field(width: u32, height: u32, degrees: f32) -> impl Fn(u32, u32) -> bool {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let half_length = width as f32 * 0.4;
    let half_span = height as f32 * 0.35;
    let spacing = (height as f32 / 10.0).max(12.0);
    let thickness = (height as f32 / 200.0).max(2.0);

    move |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let along = cos * dx + sin * dy;
        let across = -sin * dx + cos * dy;
        along.abs() < half_length
            && across.abs() < half_span
            && across.rem_euclid(spacing) < thickness
    }
}
