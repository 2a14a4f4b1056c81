use anyhow::Context;
use macroquad::prelude::*;
use macroquad_sprite_atlas::{AtlasTexture, Bundle, Project};
use std::path::Path;

fn window_conf() -> Conf {
    Conf {
        window_title: "Atlas Preview".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

// Usage: preview <project.rspp | bundle.rspx>
fn load(path: &Path) -> anyhow::Result<Bundle> {
    if path.extension().and_then(|e| e.to_str()) == Some("rspx") {
        return Bundle::read(path).with_context(|| format!("reading bundle {}", path.display()));
    }
    let project = Project::open(path).with_context(|| format!("opening project {}", path.display()))?;
    Ok(project.to_bundle())
}

#[macroquad::main(window_conf)]
async fn main() {
    let loaded = std::env::args()
        .nth(1)
        .context("usage: preview <project.rspp | bundle.rspx>")
        .and_then(|arg| load(Path::new(&arg)));
    let bundle = match loaded {
        Ok(bundle) => bundle,
        Err(err) => {
            eprintln!("{:#}", err);
            return;
        }
    };
    let atlas = AtlasTexture::from_bundle(&bundle);

    let mut selected = 0usize;
    let mut frame = 0usize;
    let mut elapsed = 0.0f32;

    loop {
        clear_background(DARKGRAY);

        let count = bundle.sprites().len();
        if count > 0 {
            if is_key_pressed(KeyCode::Right) {
                selected = (selected + 1) % count;
            }
            if is_key_pressed(KeyCode::Left) {
                selected = (selected + count - 1) % count;
            }
        }

        let scale = (screen_height() - 40.0) / atlas.size().y.max(1.0);
        atlas.draw(vec2(20.0, 20.0), scale.min(1.0));

        if let Some(sprite) = bundle.sprite(selected) {
            let speed = sprite.animation().map(|a| a.speed).unwrap_or(0);
            if speed > 0 {
                elapsed += get_frame_time();
                let step = 1.0 / speed as f32;
                while elapsed >= step {
                    elapsed -= step;
                    frame = frame.wrapping_add(1);
                }
            }
            let at = vec2(screen_width() * 0.75, screen_height() * 0.5);
            atlas.draw_frame(sprite, frame, at, WHITE);
            draw_circle(at.x, at.y, 3.0, RED);
            draw_text(sprite.name(), screen_width() * 0.6, 40.0, 30.0, WHITE);
        }

        draw_text(&format!("FPS: {}", get_fps()), screen_width() - 135.0, screen_height() - 20.0, 30.0, RED);
        next_frame().await;
    }
}
