#![allow(dead_code)]

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// A whiteboard-like PNG: dark horizontal strokes on an off-white board.
pub fn board_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let in_text = x > width / 10 && x < width * 9 / 10;
        if in_text && (y % 24) < 3 {
            Rgb([30, 34, 70])
        } else {
            Rgb([236, 234, 226])
        }
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode PNG");
    bytes
}

/// Executable standing in for pix2tex: answers `--help` and prints a fixed
/// prediction for a non-empty image file.
#[cfg(unix)]
pub fn stub_pix2tex(dir: &Path, latex: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("pix2tex-stub");
    let body = format!(
        "#!/bin/sh\n[ \"$1\" = \"--help\" ] && exit 0\ntest -s \"$1\" || exit 3\nprintf '%s: %s\\n' \"$1\" '{}'\n",
        latex
    );
    std::fs::write(&script, body).expect("Failed to write stub");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to mark stub executable");
    script
}

pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .expect("Failed to read dir")
        .next()
        .is_none()
}
