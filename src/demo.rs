//! Built-in demo content: a procedural texture set and a small map that
//! exercises every surface kind (steps, a pit, pillars, a low passage,
//! an open-sky courtyard) plus a few sprites of each orientation.
//!
//! Used by `gen_map`, `view_sw` and the frame benchmark.

use glam::IVec2;

use crate::{
    fixed::{Angle, Fixed, FxVec2},
    map::{GridMap, MapEntity, Surface},
    renderer::software::SpriteFlags,
    world::texture::{Colormap, Palette, Texture, TextureBank, TextureError, TextureId},
};

/* texture ids, in `textures()` insertion order (0 is the checker) */
pub const FLOOR: TextureId = 1;
pub const CEIL: TextureId = 2;
pub const BRICK: TextureId = 3;
pub const STONE: TextureId = 4;
pub const SKY: TextureId = 5;
pub const GRASS: TextureId = 6;
pub const LAMP: TextureId = 7;
pub const BARREL: TextureId = 8;
pub const RUG: TextureId = 9;
pub const BANNER: TextureId = 10;

/* entity kinds */
pub const PLAYER_START: u16 = 1;
pub const KIND_LAMP: u16 = 2;
pub const KIND_BARREL: u16 = 3;
pub const KIND_RUG: u16 = 4;
pub const KIND_BANNER: u16 = 5;

/// Eye height above the floor.
pub const EYE_HEIGHT: Fixed = Fixed::from_raw(620);

const SHADE_LEVELS: u16 = 32;

/// Sprite texture for an entity kind; `None` for kinds that are not drawn.
pub fn sprite_texture(kind: u16) -> Option<TextureId> {
    const KIND_SPRITE: &[(u16, TextureId)] = &[
        (KIND_LAMP, LAMP),
        (KIND_BARREL, BARREL),
        (KIND_RUG, RUG),
        (KIND_BANNER, BANNER),
    ];
    KIND_SPRITE.iter().find(|(k, _)| *k == kind).map(|&(_, t)| t)
}

/*──────────────────────────── textures ───────────────────────────────*/

/// Palette index `step` (0..32) of colour ramp `ramp` (0..8).
#[inline(always)]
fn ramp(ramp: u8, step: u8) -> u8 {
    ramp * 32 + step.min(31)
}

/// Cheap deterministic per-texel noise in `0..n`.
#[inline(always)]
fn noise(u: usize, v: usize, n: u32) -> u8 {
    let h = (u as u32).wrapping_mul(0x9E37_79B1) ^ (v as u32).wrapping_mul(0x85EB_CA6B);
    ((h ^ (h >> 15)) % n) as u8
}

fn raster(name: &str, w: usize, h: usize, f: impl Fn(usize, usize) -> u8) -> Texture {
    let mut pixels = Vec::with_capacity(w * h);
    for v in 0..h {
        for u in 0..w {
            pixels.push(f(u, v));
        }
    }
    Texture {
        name: name.into(),
        w,
        h,
        pixels,
    }
}

/// Procedural textures, a ramp palette and distance-fading shade tables.
pub fn textures() -> Result<TextureBank, TextureError> {
    let palette = Palette::ramps();
    let colormap = Colormap::fade_to_black(&palette, SHADE_LEVELS);
    let mut bank = TextureBank::default_with_checker();
    bank.set_colormap(colormap);
    bank.set_palette(palette);

    let surfaces = [
        // sandy tiles
        raster("FLOOR", 64, 64, |u, v| {
            let edge = u % 32 == 0 || v % 32 == 0;
            ramp(4, if edge { 12 } else { 20 + noise(u, v, 4) })
        }),
        // grey panels
        raster("CEIL", 64, 64, |u, v| {
            ramp(0, if u % 16 == 0 || v % 16 == 0 { 10 } else { 18 })
        }),
        // red bricks, half-offset every other course
        raster("BRICK", 64, 64, |u, v| {
            let course = v / 16;
            let shift = if course % 2 == 0 { 0 } else { 16 };
            let mortar = v % 16 == 0 || (u + shift) % 32 == 0;
            if mortar { ramp(0, 14) } else { ramp(1, 18 + noise(u, v, 5)) }
        }),
        raster("STONE", 64, 64, |u, v| ramp(5, 14 + noise(u / 4, v / 4, 8))),
        // light-blue gradient with a few clouds
        raster("SKY", 256, 128, |u, v| {
            let cloud = noise(u / 16, v / 8, 7) == 0 && v < 64;
            if cloud { ramp(0, 30) } else { ramp(6, 31 - (v / 8) as u8) }
        }),
        raster("GRASS", 64, 64, |u, v| ramp(2, 12 + noise(u, v, 8))),
    ];
    let sprites = [
        // post with a glowing globe; 0 = transparent
        raster("LAMP", 32, 96, |u, v| {
            let (dx, dy) = (u as i32 - 16, v as i32 - 12);
            if dx * dx + dy * dy < 100 {
                ramp(4, 31)
            } else if (14..18).contains(&u) && v >= 20 {
                ramp(0, 8)
            } else {
                0
            }
        }),
        raster("BARREL", 32, 40, |u, v| {
            if (2..30).contains(&u) {
                ramp(2, if v % 12 < 2 { 8 } else { 16 + (u % 8) as u8 })
            } else {
                0
            }
        }),
        raster("RUG", 96, 64, |u, v| {
            let border = !(6..90).contains(&u) || !(6..58).contains(&v);
            ramp(if border { 4 } else { 7 }, 18 + noise(u / 6, v / 6, 6))
        }),
        raster("BANNER", 48, 80, |u, v| {
            if v < 64 || (u / 8) % 2 == 0 { ramp(3, 20 + (v % 16 < 2) as u8 * 8) } else { 0 }
        }),
    ];
    for tex in surfaces.into_iter().chain(sprites) {
        let name = tex.name.clone();
        bank.insert(name, tex)?;
    }
    Ok(bank)
}

/*─────────────────────────────── map ─────────────────────────────────*/

fn fx(v: i32) -> Fixed {
    Fixed::from_int(v)
}

fn entity(x: Fixed, y: Fixed, z: Fixed, angle: Angle, kind: u16, flags: SpriteFlags) -> MapEntity {
    MapEntity {
        x: x.raw(),
        y: y.raw(),
        z: z.raw(),
        angle: angle.units() as u16,
        kind,
        flags: flags.bits(),
        extra: [0; 4],
    }
}

/// 24 × 24 demo level.
pub fn map() -> GridMap {
    const N: i32 = 24;
    let mut map = GridMap::new(
        N as usize,
        N as usize,
        fx(0),
        fx(3),
        [FLOOR, CEIL, BRICK, BRICK],
        SKY,
    );
    let close = |map: &mut GridMap, x: i32, y: i32, tex: TextureId| {
        let c = IVec2::new(x, y);
        map.set_floor(c, fx(3));
        map.set_texture(c, Surface::LowerWall, tex);
    };

    // ─── outer wall, and a partition at x = 12 with two openings ───
    for i in 0..N {
        close(&mut map, i, 0, BRICK);
        close(&mut map, i, N - 1, BRICK);
        close(&mut map, 0, i, BRICK);
        close(&mut map, N - 1, i, BRICK);
        if i != 5 && i != 16 {
            close(&mut map, 12, i, BRICK);
        }
    }
    // the northern opening is a low passage
    map.set_ceiling(IVec2::new(12, 5), fx(2));

    // ─── pillars ───
    for (x, y) in [(4, 4), (8, 4), (4, 8), (8, 8)] {
        close(&mut map, x, y, STONE);
    }

    // ─── stairs up to a platform, and a pit beside it ───
    for (i, x) in (2..5).enumerate() {
        for y in 14..18 {
            let c = IVec2::new(x, y);
            map.set_floor(c, Fixed::from_raw((i as i32 + 1) * 256));
            map.set_texture(c, Surface::LowerWall, STONE);
        }
    }
    for x in 5..9 {
        for y in 13..19 {
            let c = IVec2::new(x, y);
            map.set_floor(c, fx(1));
            map.set_ceiling(c, fx(4));
            map.set_texture(c, Surface::LowerWall, STONE);
            map.set_texture(c, Surface::UpperWall, STONE);
        }
    }
    for x in 9..11 {
        for y in 20..22 {
            map.set_floor(IVec2::new(x, y), fx(-1));
        }
    }

    // ─── courtyard open to the sky ───
    for x in 14..22 {
        for y in 2..11 {
            let c = IVec2::new(x, y);
            map.set_ceiling(c, fx(8));
            map.set_texture(c, Surface::Ceiling, SKY);
            map.set_texture(c, Surface::Floor, GRASS);
            map.set_texture(c, Surface::UpperWall, SKY);
        }
    }
    // raised bed in the courtyard
    for x in 17..19 {
        for y in 5..7 {
            let c = IVec2::new(x, y);
            map.set_floor(c, Fixed::HALF);
            map.set_texture(c, Surface::LowerWall, STONE);
        }
    }

    // ─── entities ───
    let half = Fixed::HALF;
    let none = SpriteFlags::empty();
    let ents = [
        entity(fx(2) + half, fx(2) + half, fx(0), Angle::from_degrees(45), PLAYER_START, none),
        entity(fx(6), fx(6), fx(0), Angle::ZERO, KIND_RUG, SpriteFlags::FLOOR),
        entity(fx(10) + half, fx(2), fx(0), Angle::ZERO, KIND_LAMP, SpriteFlags::FULLBRIGHT),
        entity(fx(10) + half, fx(10), fx(0), Angle::ZERO, KIND_LAMP, SpriteFlags::FULLBRIGHT),
        entity(fx(6) + half, fx(15) + half, fx(1), Angle::ZERO, KIND_BARREL, none),
        entity(fx(7) + half, fx(16) + half, fx(1), Angle::ZERO, KIND_BARREL, SpriteFlags::FLIP_X),
        entity(fx(16), fx(9), fx(0), Angle::ZERO, KIND_BARREL, SpriteFlags::TRANSLUCENT),
        // against the partition's west face
        entity(
            fx(12) - Fixed::from_raw(16),
            fx(9),
            Fixed::HALF,
            Angle::QUARTER,
            KIND_BANNER,
            SpriteFlags::WALL,
        ),
    ];
    for e in ents {
        map.push_entity(e);
    }
    map
}

/// Where the level wants the camera: the first player start, else the
/// middle of the map.
pub fn player_start(map: &GridMap) -> (FxVec2, Angle) {
    match map.entities().iter().find(|e| e.kind == PLAYER_START) {
        Some(e) => (e.pos(), e.angle()),
        None => (
            FxVec2::new(fx(map.width() as i32) / 2, fx(map.height() as i32) / 2),
            Angle::ZERO,
        ),
    }
}
