use image::{DynamicImage, GrayImage};
use imageproc::filter::separable_filter_equal;

/// Convert to single-channel luminance and apply a light Gaussian blur.
///
/// Single-channel input skips the conversion. `kernel_size` is the blur
/// width in pixels; 1 disables blurring.
pub fn apply(image: DynamicImage, kernel_size: u32) -> GrayImage {
    let gray = image.into_luma8();
    denoise(gray, kernel_size)
}

fn denoise(gray: GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return gray;
    }
    let kernel = gaussian_kernel(kernel_size);
    separable_filter_equal(&gray, &kernel)
}

/// Normalized 1-D Gaussian weights for an odd `size`.
///
/// Sigma follows the usual derivation from kernel width,
/// `0.3 * ((size - 1) / 2 - 1) + 0.8`, so 3 gives sigma 0.8.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = size | 1;
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let denom = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / denom).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn test_grayscale_converts_color() {
        let mut img = RgbImage::new(10, 10);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(2, 0, Rgb([0, 0, 255]));

        let gray = apply(DynamicImage::ImageRgb8(img), 1);

        // Every primary has some luminance, green the most
        assert!(gray.get_pixel(0, 0).0[0] > 0);
        assert!(gray.get_pixel(1, 0).0[0] > gray.get_pixel(0, 0).0[0]);
        assert!(gray.get_pixel(2, 0).0[0] > 0);
    }

    #[test]
    fn test_grayscale_preserves_dimensions() {
        let img = RgbImage::new(100, 50);
        let result = apply(DynamicImage::ImageRgb8(img), 3);
        assert_eq!(result.dimensions(), (100, 50));
    }

    #[test]
    fn test_single_channel_input_passes_through_without_blur() {
        let img = GrayImage::from_fn(8, 8, |x, y| Luma([(x * 30 + y) as u8]));
        let result = apply(DynamicImage::ImageLuma8(img.clone()), 1);
        assert_eq!(result, img);
    }

    #[test]
    fn test_blur_reduces_isolated_noise() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([128]));
        img.put_pixel(5, 5, Luma([0]));
        img.put_pixel(6, 5, Luma([255]));

        let result = apply(DynamicImage::ImageLuma8(img.clone()), 3);

        assert!(variance(&result) < variance(&img));
    }

    #[test]
    fn test_small_kernel_keeps_thin_stroke() {
        // One pixel wide dark stroke on a light board
        let img = GrayImage::from_fn(21, 21, |x, _| if x == 10 { Luma([20]) } else { Luma([230]) });

        let result = apply(DynamicImage::ImageLuma8(img), 3);

        let stroke = result.get_pixel(10, 10).0[0] as i32;
        let board = result.get_pixel(2, 10).0[0] as i32;
        assert!(board - stroke > 100, "stroke washed out: {} vs {}", stroke, board);
    }

    #[test]
    fn test_gaussian_kernel_is_normalized_and_symmetric() {
        for size in [3, 5, 7] {
            let kernel = gaussian_kernel(size);
            assert_eq!(kernel.len(), size as usize);
            let sum: f32 = kernel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            assert!((kernel[0] - kernel[size as usize - 1]).abs() < 1e-6);
            assert!(kernel[size as usize / 2] > kernel[0]);
        }
    }

    fn variance(img: &GrayImage) -> f64 {
        let pixels: Vec<f64> = img.pixels().map(|p| p.0[0] as f64).collect();
        let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;
        pixels.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / pixels.len() as f64
    }
}
