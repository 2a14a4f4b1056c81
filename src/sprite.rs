use crate::error::{Error, Result};
use crate::hash::fingerprint_str;
use macroquad::math::{Rect, Vec2};

/// Fixed width of the name field in bundle records.
pub const MAX_SPRITE_NAME_LENGTH: usize = 32;

bitflags::bitflags! {
    /// Per-sprite bitfield stored as a `u16` in bundles and projects.
    ///
    /// Unknown bits are kept through `from_bits_retain` so they survive a
    /// load/save cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SpriteFlags: u16 {
        /// The sprite carries an [`Animation`] block.
        const ANIMATED = 1 << 0;
        /// The origin was set explicitly. Advisory only.
        const HAS_ORIGIN = 1 << 1;
    }
}

/// Frame list carried alongside an animated sprite. Never interpreted here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Animation {
    /// Sub-rectangles of the atlas, in playback order.
    pub frames: Vec<Rect>,
    /// Playback speed, frames per second.
    pub speed: u16,
}

/// One packed image unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    name: String,
    fingerprint: u64,
    /// Placement inside the atlas, in canvas pixels.
    pub source: Rect,
    /// Pivot in sprite-local coordinates.
    pub origin: Vec2,
    flags: SpriteFlags,
    animation: Option<Animation>,
}

impl Sprite {
    /// Creates an unplaced sprite of the given size.
    ///
    /// Names longer than [`MAX_SPRITE_NAME_LENGTH`] bytes are rejected rather
    /// than truncated.
    pub fn new(name: &str, width: u32, height: u32) -> Result<Self> {
        validate_name(name, MAX_SPRITE_NAME_LENGTH)?;
        Ok(Self {
            name: name.to_owned(),
            fingerprint: fingerprint_str(name),
            source: Rect::new(0.0, 0.0, width as f32, height as f32),
            origin: Vec2::ZERO,
            flags: SpriteFlags::empty(),
            animation: None,
        })
    }

    /// Name as stored in the project and bundle.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hash of the name, used for lookup.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Renames the sprite and recomputes its fingerprint.
    pub fn rename(&mut self, name: &str) -> Result<()> {
        validate_name(name, MAX_SPRITE_NAME_LENGTH)?;
        self.name = name.to_owned();
        self.fingerprint = fingerprint_str(name);
        Ok(())
    }

    /// Width and height in whole pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.source.w as u32, self.source.h as u32)
    }

    /// Moves the placement rectangle; its size is left alone.
    pub fn set_position(&mut self, x: u32, y: u32) {
        self.source.x = x as f32;
        self.source.y = y as f32;
    }

    /// Sets the pivot and marks it as explicit.
    pub fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
        self.flags.insert(SpriteFlags::HAS_ORIGIN);
    }

    /// Attaches or clears the animation block, keeping `ANIMATED` in sync.
    pub fn set_animation(&mut self, animation: Option<Animation>) {
        match animation {
            Some(_) => self.flags.insert(SpriteFlags::ANIMATED),
            None => self.flags.remove(SpriteFlags::ANIMATED),
        }
        self.animation = animation;
    }

    /// Frame list, present exactly when `ANIMATED` is set.
    pub fn animation(&self) -> Option<&Animation> {
        self.animation.as_ref()
    }

    /// Stored flag bits.
    pub fn flags(&self) -> SpriteFlags {
        self.flags
    }

    /// Replaces the stored bits. `ANIMATED` always follows the animation
    /// block, whatever `flags` says.
    pub fn set_flags(&mut self, flags: SpriteFlags) {
        self.flags = flags;
        self.flags.set(SpriteFlags::ANIMATED, self.animation.is_some());
    }

    /// Shorthand for the `ANIMATED` flag.
    pub fn is_animated(&self) -> bool {
        self.flags.contains(SpriteFlags::ANIMATED)
    }
}

/// Checks a name against a fixed-width field: non-empty, no NUL bytes, at
/// most `max` bytes of UTF-8.
pub fn validate_name(name: &str, max: usize) -> Result<()> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::InvalidName(name.to_owned()));
    }
    if name.len() > max {
        return Err(Error::NameTooLong {
            name: name.to_owned(),
            max,
        });
    }
    Ok(())
}

/// Longest prefix of `name` that fits in `max` bytes without splitting a char.
pub fn truncate_name(name: &str, max: usize) -> &str {
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
