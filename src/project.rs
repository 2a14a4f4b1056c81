use crate::atlas::{Atlas, AtlasConfig};
use crate::codec::bundle::{encode_bundle, name_header, Bundle};
use crate::codec::pixels::{is_image_path, load_image};
use crate::error::{Error, Result};
use crate::hash::fingerprint_str;
use crate::loader::project_file::*;
use crate::sprite::{truncate_name, validate_name, Sprite, MAX_SPRITE_NAME_LENGTH};
use image::RgbaImage;
use macroquad::math::Vec2;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the editor keeps projects, relative to its working directory.
pub const DEFAULT_PROJECT_DIRECTORY: &str = "projects";
/// Extension of project files.
pub const PROJECT_EXTENSION: &str = "rspp";
/// Project file inside each project directory.
pub const PROJECT_FILE_NAME: &str = "project.rspp";
/// Exported bundle inside each project directory.
pub const BUNDLE_FILE_NAME: &str = "bundle.rspx";
/// C header written next to the bundle.
pub const HEADER_FILE_NAME: &str = "bundle.h";
/// Exported atlas image inside each project directory.
pub const ATLAS_PNG_FILE_NAME: &str = "atlas.png";
/// Imported images inside each project directory.
pub const TEXTURES_DIRECTORY: &str = "textures";
/// Version written into new project files.
pub const PROJECT_VERSION: u32 = 1;

/// A sprite inside a project, with its source file and decoded pixels.
#[derive(Debug, Clone)]
pub struct ProjectSprite {
    sprite: Sprite,
    file: PathBuf,
    pixels: RgbaImage,
}

impl ProjectSprite {
    /// Sprite metadata.
    pub fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    /// Image file, relative to the project directory when imported.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Decoded pixels, top row first.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Outcome of a packing pass over a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackReport {
    /// Sprites that kept a place in the atlas.
    pub placed: usize,
    /// Names of sprites removed because they did not fit.
    pub dropped: Vec<String>,
}

impl PackReport {
    /// True when at least one sprite was dropped.
    pub fn capacity_exceeded(&self) -> bool {
        !self.dropped.is_empty()
    }
}

/// The editable unit: atlas configuration, sprites and their source files.
pub struct Project {
    /// Project file format version.
    pub version: u32,
    name: String,
    /// Persisted only.
    pub embed_files: bool,
    dir: PathBuf,
    sprites: Vec<ProjectSprite>,
    atlas: Atlas,
}

impl Project {
    /// Creates `<root>/<name>/project.rspp` with no sprites and writes it
    /// immediately.
    pub fn create(root: &Path, name: &str, config: AtlasConfig) -> Result<Self> {
        validate_project_name(name)?;
        let dir = root.join(name);
        let file = dir.join(PROJECT_FILE_NAME);
        if file.exists() {
            log::error!("project '{}' already exists", name);
            return Err(Error::AlreadyExists(file));
        }

        let textures = dir.join(TEXTURES_DIRECTORY);
        fs::create_dir_all(&textures).map_err(|source| Error::Write {
            path: textures.clone(),
            source,
        })?;

        let project = Self {
            version: PROJECT_VERSION,
            name: name.to_owned(),
            embed_files: false,
            dir,
            sprites: Vec::new(),
            atlas: Atlas::new(config),
        };
        project.save()?;
        log::info!("created project '{}' at {}", name, file.display());
        Ok(project)
    }

    /// Loads a project file and reloads every sprite's pixels.
    ///
    /// Sprites whose image file is missing keep their metadata and get a blank
    /// buffer of the recorded size, capped at the atlas size. When an image on
    /// disk no longer matches its recorded size, the image wins and the
    /// project is repacked.
    pub fn open(path: &Path) -> Result<Self> {
        let doc = load_project_file(path)?;
        let dir = path
            .parent()
            .map(|d| d.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./"));

        let max = doc.atlas.size;
        let mut resized = false;
        let mut sprites = Vec::with_capacity(doc.sprites.len());
        for SpriteRecord { mut sprite, file } in doc.sprites {
            let full = if file.is_absolute() { file.clone() } else { dir.join(&file) };
            let pixels = match load_image(&full) {
                Ok(pixels) => pixels,
                Err(err) => {
                    log::warn!("could not load {} for sprite '{}': {}", full.display(), sprite.name(), err);
                    let (w, h) = sprite.size();
                    RgbaImage::new(w.min(max), h.min(max))
                }
            };
            // Pixels are the ground truth; the next repack places by their size.
            if pixels.dimensions() != sprite.size() {
                let (w, h) = sprite.size();
                log::warn!(
                    "sprite '{}' is {}x{} in the project, using {}x{}",
                    sprite.name(),
                    w,
                    h,
                    pixels.width(),
                    pixels.height()
                );
                sprite.source.w = pixels.width() as f32;
                sprite.source.h = pixels.height() as f32;
                resized = true;
            }
            sprites.push(ProjectSprite { sprite, file, pixels });
        }

        let mut project = Self {
            version: doc.version,
            name: doc.name,
            embed_files: doc.embed_files,
            dir,
            sprites,
            atlas: Atlas::new(doc.atlas),
        };
        let misplaced = project.sprites.iter().any(|s| {
            let (w, h) = s.sprite.size();
            s.sprite.source.x < 0.0
                || s.sprite.source.y < 0.0
                || s.sprite.source.x as u64 + w as u64 > max as u64
                || s.sprite.source.y as u64 + h as u64 > max as u64
        });
        if resized || misplaced {
            log::warn!("project '{}' no longer matches its layout, repacking", project.name);
            project.repack();
        } else {
            project.composite();
        }
        log::info!("opened project '{}' ({} sprites)", project.name, project.sprites.len());
        Ok(project)
    }

    /// Writes the project file, rotating the previous one into the backup slot.
    pub fn save(&self) -> Result<()> {
        save_project_file(&self.project_file(), &self.document())?;
        log::info!("saved project '{}'", self.name);
        Ok(())
    }

    /// Snapshot of what [`Project::save`] writes.
    pub fn document(&self) -> ProjectDocument {
        ProjectDocument {
            version: self.version,
            name: self.name.clone(),
            atlas: self.atlas.config,
            embed_files: self.embed_files,
            sprites: self
                .sprites
                .iter()
                .map(|s| SpriteRecord {
                    sprite: s.sprite.clone(),
                    file: s.file.clone(),
                })
                .collect(),
        }
    }

    /// Project name, also its directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the project file, textures and exports.
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Path of `project.rspp`.
    pub fn project_file(&self) -> PathBuf {
        self.dir.join(PROJECT_FILE_NAME)
    }

    /// Atlas configuration and composited canvas.
    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    /// Sprites in placement order.
    pub fn sprites(&self) -> &[ProjectSprite] {
        &self.sprites
    }

    /// Metadata of sprite `index`.
    pub fn sprite(&self, index: usize) -> Option<&Sprite> {
        self.sprites.get(index).map(|s| &s.sprite)
    }

    /// Adds an unplaced sprite. Call [`Project::repack`] afterwards.
    pub fn add_sprite(&mut self, name: &str, file: PathBuf, pixels: RgbaImage) -> Result<usize> {
        let sprite = Sprite::new(name, pixels.width(), pixels.height())?;
        if self.sprites.iter().any(|s| s.sprite.fingerprint() == sprite.fingerprint()) {
            return Err(Error::DuplicateSprite(name.to_owned()));
        }
        let size = self.atlas.size();
        if pixels.width() > size || pixels.height() > size {
            return Err(Error::SpriteTooLarge {
                name: name.to_owned(),
                width: pixels.width(),
                height: pixels.height(),
                atlas_size: size,
            });
        }
        self.sprites.push(ProjectSprite { sprite, file, pixels });
        Ok(self.sprites.len() - 1)
    }

    /// Copies image files into the project's texture directory, adds them as
    /// sprites and repacks.
    ///
    /// Files without an image extension are skipped, as are stems that clash
    /// with an existing sprite name. Stems longer than the name field are cut
    /// to fit. An image larger than the atlas stops the import; sprites added
    /// before it are still packed.
    pub fn import_images<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<PackReport> {
        let images: Vec<&Path> = paths
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| {
                let keep = is_image_path(p);
                if !keep {
                    log::debug!("skipping {}: not an image", p.display());
                }
                keep
            })
            .collect();
        if images.is_empty() {
            log::warn!("no images to import");
            return Ok(self.repack());
        }

        let mut failure = None;
        for src in images {
            if let Err(err) = self.import_one(src) {
                match err {
                    Error::DuplicateSprite(ref name) => {
                        log::warn!("skipping {}: sprite '{}' already exists", src.display(), name);
                    }
                    err => {
                        failure = Some(err);
                        break;
                    }
                }
            }
        }

        let report = self.repack();
        match failure {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    fn import_one(&mut self, src: &Path) -> Result<()> {
        let pixels = load_image(src)?;
        let stem = src.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let name = match truncate_name(stem, MAX_SPRITE_NAME_LENGTH) {
            "" => format!("sprite{}", self.sprites.len()),
            name => name.to_owned(),
        };

        let rel = self.free_texture_path(src);
        self.add_sprite(&name, rel.clone(), pixels)?;

        let dest = self.dir.join(&rel);
        if let Err(source) = fs::copy(src, &dest) {
            self.sprites.pop();
            return Err(Error::Write { path: dest, source });
        }
        log::debug!("imported {} as '{}'", src.display(), name);
        Ok(())
    }

    /// `textures/<n>.<ext>` with the first `n` not already taken.
    fn free_texture_path(&self, src: &Path) -> PathBuf {
        let ext = src
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png")
            .to_ascii_lowercase();
        let mut n = self.sprites.len();
        loop {
            let rel = Path::new(TEXTURES_DIRECTORY).join(format!("{}.{}", n, ext));
            let taken = self.dir.join(&rel).exists() || self.sprites.iter().any(|s| s.file == rel);
            if !taken {
                return rel;
            }
            n += 1;
        }
    }

    /// Packs all sprites, reorders them into placement order, drops the ones
    /// that do not fit and redraws the canvas.
    pub fn repack(&mut self) -> PackReport {
        let sizes: Vec<(u32, u32)> = self.sprites.iter().map(|s| s.pixels.dimensions()).collect();
        let packing = self.atlas.config.pack(&sizes);

        let mut slots: Vec<Option<ProjectSprite>> = self.sprites.drain(..).map(Some).collect();
        let mut report = PackReport::default();
        for &index in &packing.order {
            let Some(mut entry) = slots[index].take() else { continue };
            if packing.dropped.contains(&index) {
                // Dropping `entry` releases its pixels.
                report.dropped.push(entry.sprite.name().to_owned());
                continue;
            }
            let (x, y) = packing.positions[index];
            entry.sprite.set_position(x, y);
            self.sprites.push(entry);
        }
        report.placed = self.sprites.len();

        if report.capacity_exceeded() {
            log::warn!(
                "atlas {}x{} is full, dropped {} sprite(s): {}",
                self.atlas.size(),
                self.atlas.size(),
                report.dropped.len(),
                report.dropped.join(", ")
            );
        }
        self.composite();
        report
    }

    /// Redraws the canvas from the current sprite positions.
    pub fn composite(&mut self) {
        self.atlas
            .composite(self.sprites.iter().map(|s| (&s.sprite, &s.pixels)));
    }

    /// Renames sprite `index`. Names whose fingerprint is already taken by
    /// another sprite are refused.
    pub fn rename_sprite(&mut self, index: usize, name: &str) -> Result<()> {
        if index >= self.sprites.len() {
            return Err(Error::NoSuchSprite(index));
        }
        let hash = fingerprint_str(name);
        let clash = self
            .sprites
            .iter()
            .enumerate()
            .any(|(i, s)| i != index && s.sprite.fingerprint() == hash);
        if clash {
            return Err(Error::DuplicateSprite(name.to_owned()));
        }
        self.sprites[index].sprite.rename(name)
    }

    /// Sets the pivot of sprite `index`, rounded to whole pixels.
    pub fn set_origin(&mut self, index: usize, origin: Vec2) -> Result<()> {
        let entry = self.sprites.get_mut(index).ok_or(Error::NoSuchSprite(index))?;
        entry.sprite.set_origin(origin.round());
        Ok(())
    }

    /// First sprite whose placed rectangle contains `point` (canvas pixels).
    pub fn sprite_at(&self, point: Vec2) -> Option<usize> {
        self.sprites.iter().position(|s| s.sprite.source.contains(point))
    }

    /// In-memory bundle of the current canvas and sprites.
    pub fn to_bundle(&self) -> Bundle {
        Bundle::new(
            self.atlas.canvas().clone(),
            self.sprites.iter().map(|s| s.sprite.clone()).collect(),
        )
    }

    /// Writes `bundle.rspx` and the matching `bundle.h` into the project
    /// directory. Returns the bundle path.
    pub fn export_bundle(&self) -> Result<PathBuf> {
        let sprites: Vec<Sprite> = self.sprites.iter().map(|s| s.sprite.clone()).collect();
        let bytes = encode_bundle(self.atlas.canvas(), &sprites)?;

        let path = self.dir.join(BUNDLE_FILE_NAME);
        fs::write(&path, bytes).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;
        let header = self.dir.join(HEADER_FILE_NAME);
        fs::write(&header, name_header(&sprites)).map_err(|source| Error::Write {
            path: header.clone(),
            source,
        })?;

        log::info!("exported bundle {} ({} sprites)", path.display(), sprites.len());
        Ok(path)
    }

    /// Writes the atlas as `atlas.png` into the project directory.
    pub fn export_png(&self) -> Result<PathBuf> {
        let path = self.dir.join(ATLAS_PNG_FILE_NAME);
        self.atlas.export_png(&path)?;
        log::info!("exported atlas {}", path.display());
        Ok(path)
    }
}

/// Project names become directory names, so path separators are refused.
pub fn validate_project_name(name: &str) -> Result<()> {
    validate_name(name, MAX_PROJECT_NAME_LENGTH)?;
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// Every project file below `root`, sorted. A missing root yields nothing.
pub fn list_projects(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if root.is_dir() {
        collect_projects(root, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn collect_projects(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let read_err = |source| Error::Read {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_dir() {
            collect_projects(&path, found)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(PROJECT_EXTENSION) {
            found.push(path);
        }
    }
    Ok(())
}
