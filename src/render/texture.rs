use crate::atlas::Atlas;
use crate::codec::bundle::Bundle;
use crate::sprite::Sprite;
use image::RgbaImage;
use macroquad::prelude::*;

/// GPU copy of an atlas. The texture is released when this is dropped.
pub struct AtlasTexture {
    /// Uploaded atlas, top row first.
    pub tex: Texture2D,
}

impl AtlasTexture {
    /// Uploads top-row-first pixels with nearest filtering.
    ///
    /// Needs a live macroquad context, so call it from inside the main loop.
    pub fn upload(pixels: &RgbaImage) -> Self {
        let tex = Texture2D::from_rgba8(pixels.width() as u16, pixels.height() as u16, pixels.as_raw());
        tex.set_filter(FilterMode::Nearest);
        Self { tex }
    }

    /// Uploads a project's composited canvas.
    pub fn from_atlas(atlas: &Atlas) -> Self {
        Self::upload(&atlas.to_image())
    }

    /// Uploads a decoded bundle's atlas.
    pub fn from_bundle(bundle: &Bundle) -> Self {
        Self::upload(&bundle.atlas_image())
    }

    /// Texture size in pixels.
    pub fn size(&self) -> Vec2 {
        self.tex.size()
    }

    /// Draws the whole atlas with its top-left corner at `pos`.
    pub fn draw(&self, pos: Vec2, scale: f32) {
        draw_texture_ex(
            &self.tex,
            pos.x,
            pos.y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(self.size() * scale),
                ..Default::default()
            },
        );
    }

    /// Draws one sprite so that its origin lands on `pos`.
    pub fn draw_sprite(&self, sprite: &Sprite, pos: Vec2, tint: Color) {
        draw_texture_ex(
            &self.tex,
            pos.x - sprite.origin.x,
            pos.y - sprite.origin.y,
            tint,
            DrawTextureParams {
                source: Some(sprite.source),
                ..Default::default()
            },
        );
    }

    /// Draws frame `index` of an animated sprite; still sprites draw whole.
    pub fn draw_frame(&self, sprite: &Sprite, index: usize, pos: Vec2, tint: Color) {
        let frame = sprite
            .animation()
            .filter(|a| !a.frames.is_empty())
            .map(|a| a.frames[index % a.frames.len()]);
        match frame {
            Some(source) => draw_texture_ex(
                &self.tex,
                pos.x - sprite.origin.x,
                pos.y - sprite.origin.y,
                tint,
                DrawTextureParams {
                    source: Some(source),
                    ..Default::default()
                },
            ),
            None => self.draw_sprite(sprite, pos, tint),
        }
    }
}
