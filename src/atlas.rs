use crate::codec::pixels::{encode_png, flip_rows};
use crate::error::{Error, Result};
use crate::pack::shelf::{pack, Packing};
use crate::sprite::Sprite;
use image::RgbaImage;
use std::path::Path;

/// Atlas sizes offered when creating a project.
pub const ATLAS_SIZES: [u32; 5] = [512, 1024, 2048, 4096, 8192];

/// Atlas size offered by default.
pub const DEFAULT_ATLAS_SIZE: u32 = 1024;
/// Row advance offered by default.
pub const DEFAULT_ALIGNMENT: u32 = 16;

/// Canvas configuration persisted with a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasConfig {
    /// Edge length of the square canvas. Power of two by convention only.
    pub size: u32,
    /// Row advance used by the packer when a shelf fills up.
    pub alignment: u32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_ATLAS_SIZE,
            alignment: DEFAULT_ALIGNMENT,
        }
    }
}

impl AtlasConfig {
    /// Runs the shelf packer with this size and alignment.
    pub fn pack(&self, sizes: &[(u32, u32)]) -> Packing {
        pack(sizes, self.size, self.alignment)
    }
}

/// Canvas pixel buffer owned by a project or bundle.
///
/// Rows are kept in render-target order, bottom row first, the way a GPU
/// framebuffer reads back. [`Atlas::to_image`] gives the top-row-first view
/// that `source` rectangles address.
#[derive(Debug, Clone, PartialEq)]
pub struct Atlas {
    /// Size and alignment.
    pub config: AtlasConfig,
    canvas: RgbaImage,
}

impl Atlas {
    /// Blank, fully transparent canvas.
    pub fn new(config: AtlasConfig) -> Self {
        Self {
            canvas: RgbaImage::new(config.size, config.size),
            config,
        }
    }

    /// Edge length in pixels.
    pub fn size(&self) -> u32 {
        self.config.size
    }

    /// Canvas pixels, bottom row first.
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Gives up the canvas, bottom row first.
    pub fn into_canvas(self) -> RgbaImage {
        self.canvas
    }

    /// Clears the canvas and draws each sprite's pixels at its `source`
    /// position. Sprites outside the canvas are skipped.
    pub fn composite<'a, I>(&mut self, sprites: I)
    where
        I: IntoIterator<Item = (&'a Sprite, &'a RgbaImage)>,
    {
        self.canvas = RgbaImage::new(self.config.size, self.config.size);
        let size = self.config.size as i64;

        for (sprite, pixels) in sprites {
            let (x, y) = (sprite.source.x as i64, sprite.source.y as i64);
            let h = pixels.height() as i64;
            if x < 0 || y < 0 || x + pixels.width() as i64 > size || y + h > size {
                log::warn!("sprite '{}' lies outside the atlas, not drawn", sprite.name());
                continue;
            }
            // Render-target rows run bottom-up, so the sprite goes in flipped.
            let mut flipped = pixels.clone();
            flip_rows(&mut flipped);
            image::imageops::replace(&mut self.canvas, &flipped, x, size - y - h);
        }
    }

    /// Top-row-first copy of the canvas.
    pub fn to_image(&self) -> RgbaImage {
        let mut image = self.canvas.clone();
        flip_rows(&mut image);
        image
    }

    /// Writes the canvas as a top-row-first PNG, replacing any existing file.
    pub fn export_png(&self, path: &Path) -> Result<()> {
        let bytes = encode_png(&self.to_image())?;
        std::fs::write(path, bytes).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
