#![warn(missing_docs)]

//! Sprite atlas packing for Macroquad: a project store, a shelf packer and
//! a compact binary bundle for runtime lookup.

mod atlas;
mod error;
mod hash;
mod project;
mod sprite;
mod pack {
    pub mod shelf;
}
mod codec {
    pub mod bundle;
    pub mod pixels;
}
mod loader {
    pub mod project_file;
}
mod render {
    pub mod texture;
}

pub use atlas::{Atlas, AtlasConfig, ATLAS_SIZES, DEFAULT_ALIGNMENT, DEFAULT_ATLAS_SIZE};
pub use codec::bundle::{decode_bundle, encode_bundle, name_header, Bundle, RECORD_MAGIC};
pub use codec::pixels::{is_image_path, load_image, IMAGE_EXTENSIONS};
pub use error::{Error, Result};
pub use hash::{fingerprint, fingerprint_str};
pub use loader::project_file::{
    backup_path, load_project_file, parse_project, render_project, restore_backup, save_project_file,
    ProjectDocument, SpriteRecord, MAX_PROJECT_NAME_LENGTH,
};
pub use pack::shelf::{pack, sort_order, PackRect, Packing};
pub use project::{
    list_projects, validate_project_name, PackReport, Project, ProjectSprite, BUNDLE_FILE_NAME,
    DEFAULT_PROJECT_DIRECTORY, HEADER_FILE_NAME, PROJECT_FILE_NAME, PROJECT_VERSION,
};
pub use render::texture::AtlasTexture;
pub use sprite::{truncate_name, Animation, Sprite, SpriteFlags, MAX_SPRITE_NAME_LENGTH};
