use std::path::PathBuf;
use std::{error, fmt, io};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for packing, bundle and project operations
#[derive(Debug)]
pub enum Error {
    /// The requested project or bundle file does not exist
    NotFound(PathBuf),
    /// A project already exists at the target location
    AlreadyExists(PathBuf),
    /// Reading a file failed
    Read {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },
    /// Writing, renaming or removing a file failed
    Write {
        /// File that was being written
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },
    /// The project document is not valid JSON for our schema
    Parse {
        /// Project file that failed to parse
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },
    /// Decoding or encoding pixel data failed
    Image(image::ImageError),
    /// The bundle stream is structurally invalid
    CorruptBundle {
        /// Sprite records fully parsed before the failure
        records_read: usize,
        /// What went wrong
        reason: String,
    },
    /// A sprite or project name exceeds its fixed-width field
    NameTooLong {
        /// The rejected name
        name: String,
        /// Maximum length in bytes
        max: usize,
    },
    /// A name is empty or contains characters that cannot be stored
    InvalidName(String),
    /// A sprite with the same fingerprint is already in the project
    DuplicateSprite(String),
    /// No sprite at the given index
    NoSuchSprite(usize),
    /// A source image does not fit the atlas even when placed alone
    SpriteTooLarge {
        /// Sprite name
        name: String,
        /// Image width in pixels
        width: u32,
        /// Image height in pixels
        height: u32,
        /// Atlas edge length in pixels
        atlas_size: u32,
    },
    /// More sprites than the bundle's `u16` counter can hold
    TooManySprites(usize),
    /// More animation frames than the bundle's `u16` counter can hold
    TooManyFrames {
        /// Sprite name
        name: String,
        /// Number of frames
        count: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(path) => write!(f, "File not found: {}", path.display()),
            Error::AlreadyExists(path) => {
                write!(f, "Project already exists: {}", path.display())
            }
            Error::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            Error::Write { path, source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
            Error::Parse { path, source } => {
                write!(f, "Failed to parse project file {}: {}", path.display(), source)
            }
            Error::Image(err) => write!(f, "Image error: {}", err),
            Error::CorruptBundle {
                records_read,
                reason,
            } => write!(
                f,
                "Corrupt bundle after {} sprite record(s): {}",
                records_read, reason
            ),
            Error::NameTooLong { name, max } => {
                write!(f, "Name '{}' is longer than {} bytes", name, max)
            }
            Error::InvalidName(name) => write!(f, "Invalid name: '{}'", name),
            Error::DuplicateSprite(name) => {
                write!(f, "A sprite named '{}' is already in the project", name)
            }
            Error::NoSuchSprite(index) => write!(f, "No sprite at index {}", index),
            Error::SpriteTooLarge {
                name,
                width,
                height,
                atlas_size,
            } => write!(
                f,
                "Sprite '{}' ({}x{}) does not fit a {}x{} atlas",
                name, width, height, atlas_size, atlas_size
            ),
            Error::TooManySprites(count) => write!(
                f,
                "Bundle can hold at most {} sprites, got {}",
                u16::MAX,
                count
            ),
            Error::TooManyFrames { name, count } => write!(
                f,
                "Sprite '{}' has {} animation frames, at most {} fit a bundle",
                name,
                count,
                u16::MAX
            ),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Read { source, .. } | Error::Write { source, .. } => Some(source),
            Error::Parse { source, .. } => Some(source),
            Error::Image(err) => Some(err),
            _ => None,
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err)
    }
}
