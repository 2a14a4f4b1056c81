//! Binary bundle: the distributable runtime artifact.
//!
//! ```text
//! u16        sprite_count
//! i32        compressed_atlas_byte_length
//! u8[len]    DEFLATE(PNG(atlas, top row first))
//! per sprite:
//!   "SPR\0"  record magic
//!   u8[32]   name, zero padded
//!   u16      flags
//!   f32 x2   origin
//!   f32 x4   source rect
//!   if ANIMATED: u16 frame_count, u16 frame_speed, f32 x4 per frame
//! ```
//!
//! Everything is little-endian with no padding. Records have no length
//! prefix, so each one is framed only by its magic.

use crate::codec::pixels::{compress, decode_png, decompress, encode_png, flip_rows, MAX_PAYLOAD_BYTES};
use crate::error::{Error, Result};
use crate::hash::fingerprint_str;
use crate::sprite::{validate_name, Animation, Sprite, SpriteFlags, MAX_SPRITE_NAME_LENGTH};
use image::RgbaImage;
use macroquad::math::{vec2, Rect};
use std::path::Path;

/// Four bytes that open every sprite record.
pub const RECORD_MAGIC: [u8; 4] = *b"SPR\0";

/// Encodes a canvas (bottom row first) and its sprites into bundle bytes.
///
/// File paths and pixel buffers of individual sprites are not carried.
pub fn encode_bundle(canvas: &RgbaImage, sprites: &[Sprite]) -> Result<Vec<u8>> {
    let count = u16::try_from(sprites.len()).map_err(|_| Error::TooManySprites(sprites.len()))?;

    let mut upright = canvas.clone();
    flip_rows(&mut upright);
    let payload = compress(&encode_png(&upright)?);
    let payload_len = i32::try_from(payload.len()).map_err(|_| Error::CorruptBundle {
        records_read: 0,
        reason: format!("atlas payload of {} bytes does not fit an i32", payload.len()),
    })?;

    let mut out = Vec::with_capacity(6 + payload.len() + sprites.len() * 62);
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&payload_len.to_le_bytes());
    out.extend_from_slice(&payload);

    for sprite in sprites {
        write_record(&mut out, sprite)?;
    }
    Ok(out)
}

fn write_record(out: &mut Vec<u8>, sprite: &Sprite) -> Result<()> {
    validate_name(sprite.name(), MAX_SPRITE_NAME_LENGTH)?;

    out.extend_from_slice(&RECORD_MAGIC);
    let mut name = [0u8; MAX_SPRITE_NAME_LENGTH];
    name[..sprite.name().len()].copy_from_slice(sprite.name().as_bytes());
    out.extend_from_slice(&name);
    out.extend_from_slice(&sprite.flags().bits().to_le_bytes());
    put_f32s(out, &[sprite.origin.x, sprite.origin.y]);
    put_rect(out, &sprite.source);

    if let Some(animation) = sprite.animation() {
        let frame_count = u16::try_from(animation.frames.len()).map_err(|_| Error::TooManyFrames {
            name: sprite.name().to_owned(),
            count: animation.frames.len(),
        })?;
        out.extend_from_slice(&frame_count.to_le_bytes());
        out.extend_from_slice(&animation.speed.to_le_bytes());
        for frame in &animation.frames {
            put_rect(out, frame);
        }
    }
    Ok(())
}

fn put_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn put_rect(out: &mut Vec<u8>, r: &Rect) {
    put_f32s(out, &[r.x, r.y, r.w, r.h]);
}

/// Decodes bundle bytes.
///
/// The atlas is decoded in full before any record is read. A bad record
/// magic or a truncated record fails the whole decode with
/// [`Error::CorruptBundle`], reporting how many records were intact.
pub fn decode_bundle(bytes: &[u8]) -> Result<Bundle> {
    let mut r = Reader::new(bytes);

    let count = r.u16().ok_or_else(|| corrupt(0, "truncated header"))?;
    let payload_len = r.i32().ok_or_else(|| corrupt(0, "truncated header"))?;
    let payload_len = usize::try_from(payload_len)
        .map_err(|_| corrupt(0, format!("negative atlas length {}", payload_len)))?;
    let payload = r
        .take(payload_len)
        .ok_or_else(|| corrupt(0, format!("atlas payload of {} bytes is truncated", payload_len)))?;

    let png = decompress(payload, MAX_PAYLOAD_BYTES).map_err(|reason| corrupt(0, reason))?;
    let mut canvas = decode_png(&png).map_err(|err| corrupt(0, format!("atlas image: {}", err)))?;
    flip_rows(&mut canvas);

    let mut sprites = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let magic = r.take(4).ok_or_else(|| corrupt(i, "truncated record magic"))?;
        if magic != RECORD_MAGIC {
            log::error!("bundle record {} has magic {:?}, expected SPR", i, magic);
            return Err(corrupt(i, format!("bad record magic {:?}", magic)));
        }
        let sprite = read_record(&mut r).map_err(|reason| corrupt(i, reason))?;
        sprites.push(sprite);
    }

    if r.remaining() > 0 {
        log::debug!("{} trailing byte(s) after the last bundle record", r.remaining());
    }

    Ok(Bundle { canvas, sprites })
}

fn read_record(r: &mut Reader<'_>) -> std::result::Result<Sprite, String> {
    const TRUNCATED: &str = "truncated record";

    let raw_name = r.take(MAX_SPRITE_NAME_LENGTH).ok_or(TRUNCATED)?;
    let end = raw_name.iter().position(|&b| b == 0).unwrap_or(raw_name.len());
    let name = std::str::from_utf8(&raw_name[..end]).map_err(|_| "sprite name is not UTF-8".to_owned())?;

    let flags = SpriteFlags::from_bits_retain(r.u16().ok_or(TRUNCATED)?);
    let origin = vec2(r.f32().ok_or(TRUNCATED)?, r.f32().ok_or(TRUNCATED)?);
    let source = r.rect().ok_or(TRUNCATED)?;

    let mut sprite = Sprite::new(name, 0, 0).map_err(|err| err.to_string())?;
    sprite.source = source;
    sprite.origin = origin;

    if flags.contains(SpriteFlags::ANIMATED) {
        let frame_count = r.u16().ok_or(TRUNCATED)?;
        let speed = r.u16().ok_or(TRUNCATED)?;
        let frames = (0..frame_count)
            .map(|_| r.rect().ok_or(TRUNCATED))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        sprite.set_animation(Some(Animation { frames, speed }));
    }
    sprite.set_flags(flags);
    Ok(sprite)
}

fn corrupt(records_read: usize, reason: impl Into<String>) -> Error {
    Error::CorruptBundle {
        records_read,
        reason: reason.into(),
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let bytes: &'a [u8] = self.bytes;
        let end = self.pos.checked_add(n)?;
        let slice = bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take(N)?.try_into().ok()
    }

    fn u16(&mut self) -> Option<u16> {
        self.array().map(u16::from_le_bytes)
    }

    fn i32(&mut self) -> Option<i32> {
        self.array().map(i32::from_le_bytes)
    }

    fn f32(&mut self) -> Option<f32> {
        self.array().map(f32::from_le_bytes)
    }

    fn rect(&mut self) -> Option<Rect> {
        Some(Rect::new(self.f32()?, self.f32()?, self.f32()?, self.f32()?))
    }
}

/// A decoded bundle. Owns the atlas pixels; pass it explicitly to whatever
/// draws or queries sprites.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    canvas: RgbaImage,
    sprites: Vec<Sprite>,
}

impl Bundle {
    /// Wraps a canvas (bottom row first) and its sprites.
    pub fn new(canvas: RgbaImage, sprites: Vec<Sprite>) -> Self {
        Self { canvas, sprites }
    }

    /// Reads and decodes a bundle file.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;
        decode_bundle(&bytes)
    }

    /// Encodes the bundle and writes it to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = encode_bundle(&self.canvas, &self.sprites)?;
        std::fs::write(path, bytes).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Atlas pixels, bottom row first.
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Atlas pixels, top row first, as addressed by `source` rects.
    pub fn atlas_image(&self) -> RgbaImage {
        let mut image = self.canvas.clone();
        flip_rows(&mut image);
        image
    }

    /// Sprites in bundle order; a sprite id is an index into this slice.
    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    /// Sprite by id.
    pub fn sprite(&self, id: usize) -> Option<&Sprite> {
        self.sprites.get(id)
    }

    /// Index of the first sprite whose fingerprint matches `name`.
    pub fn sprite_id(&self, name: &str) -> Option<usize> {
        let hash = fingerprint_str(name);
        self.sprites.iter().position(|s| s.fingerprint() == hash)
    }

    /// True when the bundle has sprites and a non-empty atlas.
    pub fn is_ready(&self) -> bool {
        !self.sprites.is_empty() && self.canvas.width() > 0 && self.canvas.height() > 0
    }
}

/// C header enumerating sprite ids in bundle order, for runtimes that look
/// sprites up by index instead of by name.
pub fn name_header(sprites: &[Sprite]) -> String {
    let mut out = String::from("#ifndef SPRITE_NAMES_H\n#define SPRITE_NAMES_H\n\ntypedef enum SpriteName {\n");
    for (i, sprite) in sprites.iter().enumerate() {
        let ident: String = sprite
            .name()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        out.push_str(&format!("\tSPRITE_{} = {},\n", ident, i));
    }
    out.push_str("} SpriteName;\n\n#endif // SPRITE_NAMES_H\n");
    out
}
