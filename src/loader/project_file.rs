// src/loader/project_file.rs
use crate::atlas::{AtlasConfig, ATLAS_SIZES};
use crate::error::{Error, Result};
use crate::sprite::{validate_name, Animation, Sprite, SpriteFlags};
use macroquad::math::{vec2, Rect};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum project name length in bytes.
pub const MAX_PROJECT_NAME_LENGTH: usize = 32;
/// Suffix appended to the project file name for the previous generation.
pub const BACKUP_SUFFIX: &str = ".bkp";

#[derive(Serialize, Deserialize)]
struct JsonProject {
    version: u32,
    name: String,
    atlas: JsonAtlas,
    #[serde(default)]
    embed_files: bool,
    #[serde(default)]
    sprites: Vec<JsonSprite>,
}

#[derive(Serialize, Deserialize)]
struct JsonAtlas {
    size: u32,
    alignment: u32,
}

#[derive(Serialize, Deserialize)]
struct JsonSprite {
    name: String,
    #[serde(default)]
    file: String,
    #[serde(default)]
    flags: u16,
    source: JsonRect,
    #[serde(default)]
    origin: JsonPoint,
    #[serde(default)]
    animation: JsonAnimation,
}

#[derive(Serialize, Deserialize, Default, Clone, Copy)]
struct JsonRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

#[derive(Serialize, Deserialize, Default)]
struct JsonPoint {
    x: f32,
    y: f32,
}

#[derive(Serialize, Deserialize, Default)]
struct JsonAnimation {
    #[serde(default)]
    frame_count: u16,
    #[serde(default)]
    speed: u16,
    #[serde(default)]
    frames: Vec<JsonRect>,
}

impl From<JsonRect> for Rect {
    fn from(r: JsonRect) -> Self {
        Rect::new(r.x, r.y, r.width, r.height)
    }
}

impl From<&Rect> for JsonRect {
    fn from(r: &Rect) -> Self {
        JsonRect {
            x: r.x,
            y: r.y,
            width: r.w,
            height: r.h,
        }
    }
}

/// In-memory form of the project file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDocument {
    /// File format version.
    pub version: u32,
    /// Project name.
    pub name: String,
    /// Atlas size and alignment.
    pub atlas: AtlasConfig,
    /// Stored and reloaded, not acted on.
    pub embed_files: bool,
    /// Sprites in placement order.
    pub sprites: Vec<SpriteRecord>,
}

/// A sprite plus the image file it was imported from.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteRecord {
    /// Sprite metadata.
    pub sprite: Sprite,
    /// Source image, relative to the project directory.
    pub file: PathBuf,
}

fn invalid(msg: impl std::fmt::Display) -> serde_json::Error {
    <serde_json::Error as serde::de::Error>::custom(msg)
}

fn sprite_from_json(j: JsonSprite) -> std::result::Result<SpriteRecord, serde_json::Error> {
    let source = Rect::from(j.source);
    let mut sprite = Sprite::new(&j.name, 0, 0).map_err(invalid)?;
    sprite.source = source;
    sprite.origin = vec2(j.origin.x, j.origin.y);
    let flags = SpriteFlags::from_bits_retain(j.flags);

    if flags.contains(SpriteFlags::ANIMATED) {
        if j.animation.frame_count as usize != j.animation.frames.len() {
            log::warn!(
                "sprite '{}' declares {} frames but lists {}",
                j.name,
                j.animation.frame_count,
                j.animation.frames.len()
            );
        }
        sprite.set_animation(Some(Animation {
            frames: j.animation.frames.into_iter().map(Rect::from).collect(),
            speed: j.animation.speed,
        }));
    }
    sprite.set_flags(flags);

    Ok(SpriteRecord {
        sprite,
        file: PathBuf::from(j.file),
    })
}

fn sprite_to_json(record: &SpriteRecord) -> JsonSprite {
    let sprite = &record.sprite;
    let animation = match sprite.animation() {
        Some(a) => JsonAnimation {
            frame_count: a.frames.len().min(u16::MAX as usize) as u16,
            speed: a.speed,
            frames: a.frames.iter().map(JsonRect::from).collect(),
        },
        None => JsonAnimation::default(),
    };
    JsonSprite {
        name: sprite.name().to_owned(),
        file: record.file.to_string_lossy().into_owned(),
        flags: sprite.flags().bits(),
        source: JsonRect::from(&sprite.source),
        origin: JsonPoint {
            x: sprite.origin.x,
            y: sprite.origin.y,
        },
        animation,
    }
}

/// Parses a project document from JSON text.
pub fn parse_project(text: &str) -> std::result::Result<ProjectDocument, serde_json::Error> {
    let j: JsonProject = serde_json::from_str(text)?;
    validate_name(&j.name, MAX_PROJECT_NAME_LENGTH).map_err(invalid)?;
    let largest = ATLAS_SIZES[ATLAS_SIZES.len() - 1];
    if j.atlas.size == 0 || j.atlas.size > largest {
        return Err(invalid(format!("atlas size {} is outside 1..={}", j.atlas.size, largest)));
    }

    let sprites = j
        .sprites
        .into_iter()
        .map(sprite_from_json)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ProjectDocument {
        version: j.version,
        name: j.name,
        atlas: AtlasConfig {
            size: j.atlas.size,
            alignment: j.atlas.alignment,
        },
        embed_files: j.embed_files,
        sprites,
    })
}

/// Renders a project document as pretty-printed JSON.
pub fn render_project(doc: &ProjectDocument) -> std::result::Result<String, serde_json::Error> {
    let j = JsonProject {
        version: doc.version,
        name: doc.name.clone(),
        atlas: JsonAtlas {
            size: doc.atlas.size,
            alignment: doc.atlas.alignment,
        },
        embed_files: doc.embed_files,
        sprites: doc.sprites.iter().map(sprite_to_json).collect(),
    };
    serde_json::to_string_pretty(&j)
}

/// `project.rspp` → `project.rspp.bkp`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

/// Reads and parses a project file. The backup is never touched.
pub fn load_project_file(path: &Path) -> Result<ProjectDocument> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let txt = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_project(&txt).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Saves `doc` to `path`, keeping exactly one previous generation.
///
/// The old backup is deleted, the current file becomes the backup, then the
/// new document is written fresh.
pub fn save_project_file(path: &Path, doc: &ProjectDocument) -> Result<()> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| Error::Write { path, source }
    };

    let text = render_project(doc).map_err(|err| Error::Write {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
    })?;

    let backup = backup_path(path);
    if backup.exists() {
        fs::remove_file(&backup).map_err(write_err(&backup))?;
    }
    if path.exists() {
        fs::rename(path, &backup).map_err(write_err(path))?;
    }
    fs::write(path, text).map_err(write_err(path))
}

/// Replaces the project file with its backup. The backup is consumed.
pub fn restore_backup(path: &Path) -> Result<()> {
    let backup = backup_path(path);
    if !backup.exists() {
        return Err(Error::NotFound(backup));
    }
    fs::rename(&backup, path).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}
