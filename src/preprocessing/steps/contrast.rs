use image::{GrayImage, Luma};

const BINS: usize = 256;

/// Contrast-limited adaptive histogram equalization (CLAHE).
///
/// The image is split into a `grid` x `grid` set of tiles. Each tile gets its
/// own equalization lookup table built from a histogram clipped at
/// `clip_limit` times the uniform bin height, with the clipped excess spread
/// back over all bins. Output pixels blend the tables of the four nearest
/// tile centers bilinearly, so tile seams do not show.
pub fn apply(image: GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image;
    }

    let tile_w = width.div_ceil(grid.clamp(1, width));
    let tile_h = height.div_ceil(grid.clamp(1, height));
    // Rounding the tile size up can leave fewer tiles than requested
    let tiles_x = width.div_ceil(tile_w) as usize;
    let tiles_y = height.div_ceil(tile_h) as usize;
    let (tile_w, tile_h) = (tile_w as usize, tile_h as usize);

    let luts = build_luts(&image, tiles_x, tiles_y, tile_w, tile_h, clip_limit);
    let lut = |tx: usize, ty: usize| &luts[ty * tiles_x + tx];

    GrayImage::from_fn(width, height, |x, y| {
        let (tx1, tx2, ax) = neighbours(x as usize, tile_w, tiles_x);
        let (ty1, ty2, ay) = neighbours(y as usize, tile_h, tiles_y);
        let v = image.get_pixel(x, y).0[0] as usize;

        let top = lut(tx1, ty1)[v] * (1.0 - ax) + lut(tx2, ty1)[v] * ax;
        let bottom = lut(tx1, ty2)[v] * (1.0 - ax) + lut(tx2, ty2)[v] * ax;
        let blended = top * (1.0 - ay) + bottom * ay;

        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// The two tile indices whose centers bracket `pos`, and the blend weight
/// of the second one.
fn neighbours(pos: usize, tile: usize, tiles: usize) -> (usize, usize, f32) {
    let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
    let lower = f.floor();
    let weight = f - lower;

    let last = tiles as isize - 1;
    let first = (lower as isize).clamp(0, last) as usize;
    let second = (lower as isize + 1).clamp(0, last) as usize;
    (first, second, weight)
}

fn build_luts(
    image: &GrayImage,
    tiles_x: usize,
    tiles_y: usize,
    tile_w: usize,
    tile_h: usize,
    clip_limit: f32,
) -> Vec<[f32; BINS]> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut luts = Vec::with_capacity(tiles_x * tiles_y);

    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut histogram = [0u32; BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    histogram[image.get_pixel(x as u32, y as u32).0[0] as usize] += 1;
                }
            }

            let area = ((x1 - x0) * (y1 - y0)) as u32;
            luts.push(tile_lut(histogram, area, clip_limit));
        }
    }

    luts
}

/// Equalization table for one tile after clipping its histogram.
fn tile_lut(mut histogram: [u32; BINS], area: u32, clip_limit: f32) -> [f32; BINS] {
    let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);

    let mut excess = 0u32;
    for count in histogram.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }

    let batch = excess / BINS as u32;
    let mut residual = excess - batch * BINS as u32;
    for count in histogram.iter_mut() {
        *count += batch;
    }
    if residual > 0 {
        let step = (BINS / residual as usize).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            histogram[i] += 1;
            residual -= 1;
            i += step;
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0f32; BINS];
    let mut cumulative = 0u32;
    for (i, count) in histogram.iter().enumerate() {
        cumulative += count;
        lut[i] = (cumulative as f32 * scale).min(255.0);
    }
    lut
}
