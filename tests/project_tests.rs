// tests/project_tests.rs

use image::{Rgba, RgbaImage};
use macroquad::math::vec2;
use macroquad_sprite_atlas::{
    backup_path, fingerprint_str, list_projects, load_project_file, restore_backup, AtlasConfig, Bundle,
    Error, PackRect, Project, PROJECT_FILE_NAME,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

fn temp_root(tag: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let dir = std::env::temp_dir().join(format!("atlas_{}_{}", tag, nanos));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_png(dir: &Path, name: &str, w: u32, h: u32, color: Rgba<u8>) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_pixel(w, h, color).save(&path).unwrap();
    path
}

/// Every sprite lies inside the atlas, matches its pixels and overlaps no other.
fn assert_layout_valid(project: &Project) {
    let size = project.atlas().size();
    let rects: Vec<PackRect> = project
        .sprites()
        .iter()
        .map(|s| {
            let src = s.sprite().source;
            assert_eq!(s.sprite().size(), s.pixels().dimensions(), "{}", s.sprite().name());
            PackRect::new(src.x as u32, src.y as u32, src.w as u32, src.h as u32)
        })
        .collect();
    for (i, a) in rects.iter().enumerate() {
        assert!(a.x + a.w <= size && a.y + a.h <= size, "{:?} outside", a);
        for b in &rects[i + 1..] {
            assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
        }
    }
}

fn small() -> AtlasConfig {
    AtlasConfig { size: 64, alignment: 16 }
}

#[test]
fn create_writes_project_and_refuses_to_overwrite() {
    let root = temp_root("create");
    let project = Project::create(&root, "demo", small()).unwrap();

    assert_eq!(project.project_file(), root.join("demo").join(PROJECT_FILE_NAME));
    assert!(project.project_file().exists());
    assert!(root.join("demo/textures").is_dir());
    assert!(!backup_path(&project.project_file()).exists());

    match Project::create(&root, "demo", small()) {
        Err(Error::AlreadyExists(path)) => assert_eq!(path, project.project_file()),
        other => panic!("expected AlreadyExists, got {:?}", other.map(|p| p.name().to_owned())),
    }
    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn save_keeps_exactly_one_previous_generation() {
    let root = temp_root("backup");
    let mut project = Project::create(&root, "demo", small()).unwrap();
    let file = project.project_file();
    let first = fs::read_to_string(&file).unwrap();

    project.embed_files = true;
    project.save().unwrap();
    let second = fs::read_to_string(&file).unwrap();
    assert_eq!(fs::read_to_string(backup_path(&file)).unwrap(), first);
    assert!(second.contains("\"embed_files\": true"));

    project.save().unwrap();
    assert_eq!(fs::read_to_string(backup_path(&file)).unwrap(), second);

    // Loading reads the current file only.
    let current = fs::read_to_string(&file).unwrap();
    load_project_file(&file).unwrap();
    Project::open(&file).unwrap();
    assert_eq!(fs::read_to_string(backup_path(&file)).unwrap(), second);
    assert_eq!(fs::read_to_string(&file).unwrap(), current);

    restore_backup(&file).unwrap();
    assert_eq!(fs::read_to_string(&file).unwrap(), second);
    assert!(!backup_path(&file).exists());
    assert!(matches!(restore_backup(&file), Err(Error::NotFound(_))));

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn opening_missing_or_broken_projects_fails() {
    let root = temp_root("open_errors");
    let missing = root.join("nothing/project.rspp");
    assert!(matches!(Project::open(&missing), Err(Error::NotFound(p)) if p == missing));

    let broken = root.join("project.rspp");
    fs::write(&broken, "{ \"version\": 1, \"name\": ").unwrap();
    assert!(matches!(Project::open(&broken), Err(Error::Parse { path, .. }) if path == broken));

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn import_repack_export_and_reopen() {
    let root = temp_root("pipeline");
    let src = temp_root("pipeline_src");
    let c = write_png(&src, "c.png", 16, 16, BLUE);
    let a = write_png(&src, "a.png", 32, 32, RED);
    let b = write_png(&src, "b.png", 32, 32, GREEN);
    let notes = src.join("notes.txt");
    fs::write(&notes, "not an image").unwrap();

    let mut project = Project::create(&root, "demo", small()).unwrap();
    let report = project.import_images(&[c, a, b, notes]).unwrap();
    assert_eq!(report.placed, 3);
    assert!(!report.capacity_exceeded());

    // Placement order: the two 32x32 in import order, then the 16x16.
    let names: Vec<&str> = project.sprites().iter().map(|s| s.sprite().name()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    let positions: Vec<(f32, f32)> = project
        .sprites()
        .iter()
        .map(|s| (s.sprite().source.x, s.sprite().source.y))
        .collect();
    assert_eq!(positions, [(0.0, 0.0), (32.0, 0.0), (0.0, 32.0)]);
    assert_eq!(project.sprites()[2].file(), Path::new("textures/0.png"));
    assert!(project.directory().join("textures/0.png").exists());

    let bundle_path = project.export_bundle().unwrap();
    assert!(project.directory().join("bundle.h").exists());
    let bundle = Bundle::read(&bundle_path).unwrap();
    assert_eq!(bundle.sprite_id("b"), Some(1));
    assert_eq!(bundle.atlas_image().get_pixel(40, 5), &GREEN);

    let png = project.export_png().unwrap();
    let exported = image::open(&png).unwrap().into_rgba8();
    assert_eq!(exported.get_pixel(0, 40), &BLUE);
    assert_eq!(exported.get_pixel(20, 40), &Rgba([0, 0, 0, 0]));

    project.save().unwrap();
    let reopened = Project::open(&project.project_file()).unwrap();
    assert_eq!(reopened.document(), project.document());
    assert_eq!(reopened.atlas().canvas(), project.atlas().canvas());

    fs::remove_dir_all(&root).unwrap();
    fs::remove_dir_all(&src).unwrap();
}

#[test]
fn overflow_drops_sprites_and_reports_them() {
    let root = temp_root("overflow");
    let src = temp_root("overflow_src");
    let files = [
        write_png(&src, "big.png", 40, 40, RED),
        write_png(&src, "mid.png", 32, 32, GREEN),
        write_png(&src, "tiny.png", 16, 16, BLUE),
    ];

    let mut project = Project::create(&root, "demo", small()).unwrap();
    let report = project.import_images(&files).unwrap();
    assert!(report.capacity_exceeded());
    assert_eq!(report.placed, 1);
    assert_eq!(report.dropped, ["mid", "tiny"]);
    assert_eq!(project.sprites().len(), 1);
    assert_eq!(project.sprites()[0].sprite().name(), "big");

    fs::remove_dir_all(&root).unwrap();
    fs::remove_dir_all(&src).unwrap();
}

#[test]
fn oversized_image_stops_the_import() {
    let root = temp_root("oversized");
    let src = temp_root("oversized_src");
    let files = [
        write_png(&src, "ok.png", 8, 8, RED),
        write_png(&src, "huge.png", 128, 8, GREEN),
        write_png(&src, "later.png", 8, 8, BLUE),
    ];

    let mut project = Project::create(&root, "demo", small()).unwrap();
    match project.import_images(&files) {
        Err(Error::SpriteTooLarge { name, atlas_size, .. }) => {
            assert_eq!(name, "huge");
            assert_eq!(atlas_size, 64);
        }
        other => panic!("expected SpriteTooLarge, got {:?}", other),
    }
    let names: Vec<&str> = project.sprites().iter().map(|s| s.sprite().name()).collect();
    assert_eq!(names, ["ok"]);
    assert!(!project.directory().join("textures/1.png").exists());

    fs::remove_dir_all(&root).unwrap();
    fs::remove_dir_all(&src).unwrap();
}

#[test]
fn reopening_with_a_resized_texture_repacks() {
    let root = temp_root("resized_tex");
    let src = temp_root("resized_tex_src");
    let files = [
        write_png(&src, "a.png", 32, 32, RED),
        write_png(&src, "b.png", 32, 32, GREEN),
        write_png(&src, "c.png", 32, 32, BLUE),
        write_png(&src, "d.png", 24, 24, RED),
    ];

    let mut project = Project::create(&root, "demo", small()).unwrap();
    project.import_images(&files).unwrap();
    project.save().unwrap();
    assert_layout_valid(&project);

    // Swap a's texture for a smaller image behind the project's back.
    let a_file = project.directory().join(project.sprites()[0].file());
    RgbaImage::from_pixel(8, 8, GREEN).save(&a_file).unwrap();

    let mut reopened = Project::open(&project.project_file()).unwrap();
    assert_layout_valid(&reopened);
    let a = reopened.sprites().iter().find(|s| s.sprite().name() == "a").unwrap();
    assert_eq!(a.sprite().size(), (8, 8));

    let e = write_png(&src, "e.png", 16, 16, BLUE);
    reopened.import_images(&[e]).unwrap();
    assert_layout_valid(&reopened);
    let bundle = reopened.to_bundle();
    for sprite in bundle.sprites() {
        assert!(sprite.source.x + sprite.source.w <= 64.0 && sprite.source.y + sprite.source.h <= 64.0);
    }

    fs::remove_dir_all(&root).unwrap();
    fs::remove_dir_all(&src).unwrap();
}

#[test]
fn missing_texture_keeps_sprite_with_blank_pixels() {
    let root = temp_root("missing_tex");
    let src = temp_root("missing_tex_src");
    let file = write_png(&src, "hero.png", 8, 8, RED);

    let mut project = Project::create(&root, "demo", small()).unwrap();
    project.import_images(&[file]).unwrap();
    project.save().unwrap();
    fs::remove_file(project.directory().join("textures/0.png")).unwrap();

    let reopened = Project::open(&project.project_file()).unwrap();
    assert_eq!(reopened.sprites().len(), 1);
    assert_eq!(reopened.sprites()[0].pixels().dimensions(), (8, 8));
    assert!(reopened.atlas().canvas().pixels().all(|p| p.0 == [0, 0, 0, 0]));

    fs::remove_dir_all(&root).unwrap();
    fs::remove_dir_all(&src).unwrap();
}

#[test]
fn editing_sprites() {
    let root = temp_root("editing");
    let mut project = Project::create(&root, "demo", small()).unwrap();
    project
        .add_sprite("a", PathBuf::from("textures/a.png"), RgbaImage::from_pixel(16, 16, RED))
        .unwrap();
    project
        .add_sprite("b", PathBuf::from("textures/b.png"), RgbaImage::from_pixel(8, 8, GREEN))
        .unwrap();
    assert!(matches!(
        project.add_sprite("a", PathBuf::from("x.png"), RgbaImage::new(1, 1)),
        Err(Error::DuplicateSprite(name)) if name == "a"
    ));
    project.repack();

    assert_eq!(project.sprite_at(vec2(4.0, 4.0)), Some(0));
    assert_eq!(project.sprite_at(vec2(18.0, 2.0)), Some(1));
    assert_eq!(project.sprite_at(vec2(60.0, 60.0)), None);

    project.set_origin(1, vec2(3.6, 7.2)).unwrap();
    let b = project.sprite(1).unwrap();
    assert_eq!(b.origin, vec2(4.0, 7.0));

    assert!(matches!(project.rename_sprite(1, "a"), Err(Error::DuplicateSprite(_))));
    project.rename_sprite(1, "coin").unwrap();
    assert_eq!(project.sprite(1).unwrap().name(), "coin");
    assert_eq!(project.sprite(1).unwrap().fingerprint(), fingerprint_str("coin"));
    // Renaming a sprite to its own name is not a clash.
    project.rename_sprite(1, "coin").unwrap();

    assert!(matches!(project.rename_sprite(9, "x"), Err(Error::NoSuchSprite(9))));
    assert!(matches!(project.set_origin(9, vec2(1.0, 1.0)), Err(Error::NoSuchSprite(9))));

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn list_projects_finds_every_project_file() {
    let root = temp_root("list");
    Project::create(&root, "zeta", small()).unwrap();
    Project::create(&root, "alpha", small()).unwrap();
    fs::write(root.join("readme.txt"), "ignored").unwrap();

    let found = list_projects(&root).unwrap();
    assert_eq!(
        found,
        vec![root.join("alpha/project.rspp"), root.join("zeta/project.rspp")]
    );
    assert!(list_projects(&root.join("absent")).unwrap().is_empty());

    fs::remove_dir_all(&root).unwrap();
}
