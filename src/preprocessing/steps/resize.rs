use crate::preprocessing::config::ResizeFilter;
use image::{imageops, imageops::FilterType, GrayImage, Luma};

/// Shrink to `target_width`, keeping the aspect ratio.
///
/// Images already at or below the target width are returned as they are;
/// upscaling would only invent detail.
pub fn apply(image: GrayImage, target_width: u32, filter: ResizeFilter) -> GrayImage {
    let (width, height) = image.dimensions();
    if width <= target_width {
        return image;
    }

    let target_height = target_height(width, height, target_width);
    tracing::debug!(
        "Resizing {}x{} -> {}x{} ({:?})",
        width,
        height,
        target_width,
        target_height,
        filter
    );

    match filter {
        ResizeFilter::Area => area_resize(&image, target_width, target_height),
        ResizeFilter::Cubic => {
            imageops::resize(&image, target_width, target_height, FilterType::CatmullRom)
        }
        ResizeFilter::Linear => {
            imageops::resize(&image, target_width, target_height, FilterType::Triangle)
        }
    }
}

/// `round(target_width * height / width)`, never below one pixel.
pub fn target_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = target_width as f64 * height as f64 / width as f64;
    (scaled.round() as u32).max(1)
}

/// Downsample by averaging every source pixel that overlaps each output
/// pixel, weighted by the overlap.
fn area_resize(image: &GrayImage, dst_w: u32, dst_h: u32) -> GrayImage {
    let (src_w, src_h) = image.dimensions();
    let cols = area_weights(src_w, dst_w);
    let rows = area_weights(src_h, dst_h);

    // Horizontal pass into a float buffer, src_h rows of dst_w samples
    let mut horizontal = vec![0f32; src_h as usize * dst_w as usize];
    for y in 0..src_h {
        let row = &mut horizontal[y as usize * dst_w as usize..][..dst_w as usize];
        for (out, taps) in row.iter_mut().zip(&cols) {
            *out = taps
                .iter()
                .map(|&(sx, w)| image.get_pixel(sx, y).0[0] as f32 * w)
                .sum();
        }
    }

    GrayImage::from_fn(dst_w, dst_h, |x, y| {
        let value: f32 = rows[y as usize]
            .iter()
            .map(|&(sy, w)| horizontal[sy as usize * dst_w as usize + x as usize] * w)
            .sum();
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// For each destination index, the source indices it covers and their
/// normalized overlap weights.
fn area_weights(src: u32, dst: u32) -> Vec<Vec<(u32, f32)>> {
    let scale = src as f64 / dst as f64;

    (0..dst)
        .map(|d| {
            let start = d as f64 * scale;
            let end = ((d + 1) as f64 * scale).min(src as f64);
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(src);

            (first..last)
                .filter_map(|s| {
                    let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (overlap > 1e-9).then(|| (s, (overlap / scale) as f32))
                })
                .collect()
        })
        .collect()
}
