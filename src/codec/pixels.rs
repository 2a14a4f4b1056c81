//! Pixel-level collaborators: image files, PNG bytes and the generic
//! compression used for bundle payloads.

use crate::error::{Error, Result};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat, RgbaImage};
use std::path::Path;

/// File extensions accepted by sprite import, lower case and without the dot.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "bmp", "tga", "jpg", "jpeg", "gif"];

/// Upper bound on an inflated atlas payload (8192² RGBA plus PNG overhead).
pub const MAX_PAYLOAD_BYTES: usize = 8192 * 8192 * 4 + (1 << 20);

/// True when the extension is one of [`IMAGE_EXTENSIONS`].
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|ok| e.eq_ignore_ascii_case(ok)))
        .unwrap_or(false)
}

/// Loads an image file as straight RGBA8.
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    Ok(image::open(path)?.into_rgba8())
}

pub fn encode_png(pixels: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        pixels.as_raw(),
        pixels.width(),
        pixels.height(),
        ColorType::Rgba8,
    )?;
    Ok(out)
}

pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.into_rgba8())
}

/// Raw DEFLATE.
pub fn compress(bytes: &[u8]) -> Vec<u8> {
    miniz_oxide::deflate::compress_to_vec(bytes, 6)
}

/// Inverse of [`compress`]. `limit` caps the inflated size.
pub fn decompress(bytes: &[u8], limit: usize) -> std::result::Result<Vec<u8>, String> {
    miniz_oxide::inflate::decompress_to_vec_with_limit(bytes, limit)
        .map_err(|err| format!("inflate failed: {:?}", err.status))
}

/// Flips rows in place. Canvas rows are stored bottom-first, files top-first.
#[inline]
pub fn flip_rows(pixels: &mut RgbaImage) {
    image::imageops::flip_vertical_in_place(pixels);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn recognises_image_extensions_case_insensitively() {
        assert!(is_image_path(Path::new("a/b/hero.PNG")));
        assert!(is_image_path(Path::new("tile.jpeg")));
        assert!(!is_image_path(Path::new("notes.txt")));
        assert!(!is_image_path(Path::new("no_extension")));
    }

    #[test]
    fn png_keeps_every_pixel() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(2, 1, Rgba([0, 0, 255, 128]));
        let back = decode_png(&encode_png(&img).unwrap()).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn inflate_rejects_garbage() {
        assert!(decompress(&[0xff, 0xff, 0xff, 0xff], 1024).is_err());
    }

    #[test]
    fn flip_swaps_first_and_last_row() {
        let mut img = RgbaImage::new(1, 2);
        img.put_pixel(0, 0, Rgba([1, 1, 1, 1]));
        flip_rows(&mut img);
        assert_eq!(img.get_pixel(0, 1), &Rgba([1, 1, 1, 1]));
        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }
}
