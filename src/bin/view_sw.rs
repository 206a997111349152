//! Interactive software-rendered walk-through.
//!
//! ```bash
//! cargo run --release --bin view_sw -- [demo.map] [--config render.toml]
//! ```
//!
//! Arrows / WASD move and turn, Alt + ←/→ strafes, PgUp / PgDn look up and
//! down, R / F raise and lower the floor of the cell ahead.

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use glam::IVec2;
use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};

use yacast_rs::{
    config::RenderConfig,
    demo,
    fixed::{Angle, Fixed},
    map::GridMap,
    renderer::{Rgba, Software, software::SpriteFlags},
    world::Camera,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    /// Map file written by `gen_map`; the built-in demo level if omitted
    #[arg(value_name = "MAP")]
    map: Option<PathBuf>,

    /// Renderer settings (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Window pixels per frame-buffer pixel
    #[arg(long, default_value_t = 2)]
    scale: u8,
}

const MOVE_STEP: Fixed = Fixed::from_raw(96);
const TURN_STEP: Angle = Angle::from_units(32);
const MAX_STEP_UP: Fixed = Fixed::from_raw(300);
const SHEAR_STEP: i32 = 4;

fn main() -> anyhow::Result<()> {
    // ─────────── parse CLI & config ───────────
    let opts = Opts::parse();
    let cfg = match &opts.config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RenderConfig::default(),
    };
    cfg.validate()?;

    // ─────────── load map & textures ──────────
    let mut map = match &opts.map {
        Some(path) => GridMap::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => demo::map(),
    };
    let bank = demo::textures()?;
    println!("map {}×{}, {} entities", map.width(), map.height(), map.entities().len());

    let (start, facing) = demo::player_start(&map);
    let mut camera = Camera::new(
        start,
        map.floor(map.cell_of(start)) + demo::EYE_HEIGHT,
        facing,
        Angle::from_degrees(cfg.fov_degrees),
    );

    let (w, h) = (cfg.width, cfg.height);
    let mut renderer = Software::new(cfg);
    let mut rgba: Vec<Rgba> = vec![0; w * h];

    let scale = match opts.scale {
        0 | 1 => Scale::X1,
        2 => Scale::X2,
        3 | 4 => Scale::X4,
        _ => Scale::X8,
    };
    let mut win = Window::new(
        "yacast software renderer",
        w,
        h,
        WindowOptions {
            scale,
            ..WindowOptions::default()
        },
    )?;
    win.set_target_fps(35);

    // ────────────────── benchmarking state ──────────────────────────────
    let mut acc_time = Duration::ZERO;
    let mut acc_frames = 0usize;
    let mut last_print = Instant::now();

    while win.is_open() && !win.is_key_down(Key::Escape) {
        /* movement --------------------------------------------------------- */
        let mut forward = Fixed::ZERO;
        let mut side = Fixed::ZERO;
        if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
            forward += MOVE_STEP;
        }
        if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
            forward -= MOVE_STEP;
        }
        let alt = win.is_key_down(Key::LeftAlt) || win.is_key_down(Key::RightAlt);
        if alt {
            if win.is_key_down(Key::Left) {
                side -= MOVE_STEP;
            }
            if win.is_key_down(Key::Right) {
                side += MOVE_STEP;
            }
        } else {
            /* positive turns right */
            if win.is_key_down(Key::Left) {
                camera.turn(-TURN_STEP);
            }
            if win.is_key_down(Key::Right) {
                camera.turn(TURN_STEP);
            }
        }
        if win.is_key_down(Key::A) {
            side -= MOVE_STEP;
        }
        if win.is_key_down(Key::D) {
            side += MOVE_STEP;
        }
        walk(&map, &mut camera, forward, side);

        /* look up / down ----------------------------------------------------- */
        if win.is_key_down(Key::PageUp) {
            camera.set_shear((camera.shear() + SHEAR_STEP).min(h as i32 / 2));
        }
        if win.is_key_down(Key::PageDown) {
            camera.set_shear((camera.shear() - SHEAR_STEP).max(-(h as i32) / 2));
        }

        /* map edits between frames ------------------------------------------ */
        let ahead = map.cell_of(camera.pos() + camera.forward());
        if win.is_key_pressed(Key::R, KeyRepeat::Yes) {
            map.move_floor(ahead, Fixed::from_raw(64));
        }
        if win.is_key_pressed(Key::F, KeyRepeat::Yes) {
            map.move_floor(ahead, Fixed::from_raw(-64));
        }

        /* draw --------------------------------------------------------------- */
        let t0 = Instant::now();
        let mut frame = renderer.begin(&camera, &bank, &bank);
        frame.draw_map(&map);
        for e in map.entities() {
            if let Some(tex) = demo::sprite_texture(e.kind) {
                let flags = SpriteFlags::from_bits_truncate(e.flags);
                frame.draw_sprite(e.pos(), e.z(), e.angle(), tex, flags);
            }
        }
        frame.end();
        renderer.framebuffer().to_rgba(bank.palette(), &mut rgba);
        acc_time += t0.elapsed();
        acc_frames += 1;

        win.update_with_buffer(&rgba, w, h)?;

        if last_print.elapsed() >= Duration::from_secs(3) {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames.max(1) as f64;
            println!("avg render: {:.2} ms  ({:.1} FPS)", avg_ms, 1000.0 / avg_ms);
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }
    }
    Ok(())
}

/// Move the camera unless the target cell is closed, too low under its
/// ceiling or a step too high; then stand on the new floor.
fn walk(map: &GridMap, camera: &mut Camera, forward: Fixed, side: Fixed) {
    if forward.is_zero() && side.is_zero() {
        return;
    }
    let here = map.floor(map.cell_of(camera.pos()));
    let mut next = *camera;
    next.step(forward, side);
    let cell: IVec2 = map.cell_of(next.pos());
    let info = map.cell(cell);
    let fits = info.ceil - info.floor > demo::EYE_HEIGHT;
    if map.contains(cell) && fits && info.floor - here <= MAX_STEP_UP {
        camera.set_pos(next.pos());
    }
    camera.set_z(map.floor(map.cell_of(camera.pos())) + demo::EYE_HEIGHT);
}
