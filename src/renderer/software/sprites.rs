//! Sprite drawing.
//!
//! Sprites arrive here already ordered back to front.  Every pixel is
//! clipped against the occluders of its column that lie nearer than the
//! sprite at that column, so walls hide sprites without a depth buffer.
//!
//! * Texel `0` is transparent.
//! * `TRANSLUCENT` draws every other pixel in a checker pattern.
//! * `FULLBRIGHT` always uses shade table `0`.
//! * `FLIP_X` mirrors the texture horizontally.

use crate::{
    engine::types::{HP_BITS, View},
    fixed::{FRAC_BITS, Fixed, RECIP_BITS},
    renderer::Framebuffer,
    world::texture::Texture,
};

use super::{
    Paint,
    depth::DepthRecords,
    projection::{Flat, ProjectedSprite, Shape, SpriteFlags, Upright},
};

/// Palette index that is never written.
const TRANSPARENT: u8 = 0;

/// Everything shared by the pixels of one sprite.
struct Blend<'a> {
    flags: SpriteFlags,
    paint: Paint<'a>,
}

impl Blend<'_> {
    #[inline(always)]
    fn table(&self, depth: Fixed) -> &[u8; 256] {
        if self.flags.contains(SpriteFlags::FULLBRIGHT) {
            self.paint.shades.shade_table(0)
        } else {
            self.paint.table(depth, false)
        }
    }

    /// Dithered blend skips half the pixels.
    #[inline(always)]
    fn skips(&self, x: i32, y: i32) -> bool {
        self.flags.contains(SpriteFlags::TRANSLUCENT) && (x + y) & 1 == 1
    }

    #[inline(always)]
    fn column(&self, tu: i32, w: i32) -> i32 {
        if self.flags.contains(SpriteFlags::FLIP_X) {
            w - 1 - tu
        } else {
            tu
        }
    }
}

/// Draw one projected sprite.
pub fn draw(
    fb: &mut Framebuffer,
    view: &View,
    depth: &DepthRecords,
    paint: Paint<'_>,
    sprite: &ProjectedSprite,
    tex: &Texture,
) {
    let blend = Blend {
        flags: sprite.flags,
        paint,
    };
    match &sprite.shape {
        Shape::Upright(u) => draw_upright(fb, view, depth, &blend, sprite, u, tex),
        Shape::Flat(f) => draw_flat(fb, view, depth, &blend, sprite, f, tex),
    }
}

/*───────────────────────── billboard / wall ──────────────────────────*/

fn draw_upright(
    fb: &mut Framebuffer,
    view: &View,
    depth: &DepthRecords,
    blend: &Blend<'_>,
    sprite: &ProjectedSprite,
    u: &Upright,
    tex: &Texture,
) {
    let (tw, th) = (tex.w as i32, tex.h as i32);
    let span = (u.sx1 - u.sx0).max(1);
    let top_hp = (u.top.raw() as i64) << HP_BITS;
    let v_shift = FRAC_BITS + HP_BITS - blend.paint.texels_per_unit_shift;

    for x in sprite.x0..sprite.x1 {
        // ─── 1. perspective-correct depth and u at the column centre ───
        let t = (((x as i64) << FRAC_BITS) + (1 << (FRAC_BITS - 1)) - u.sx0).clamp(0, span);
        let iz = (u.iz0 + (u.iz1 - u.iz0) * t / span).max(1);
        let uz = u.uz0 + (u.uz1 - u.uz0) * t / span;
        let d = Fixed::from_raw(
            ((1_i64 << (FRAC_BITS + RECIP_BITS)) / iz).min(i32::MAX as i64) as i32,
        );
        let uf = uz / iz;
        let tu = blend.column(((uf * tw as i64) >> FRAC_BITS).clamp(0, tw as i64 - 1) as i32, tw);

        // ─── 2. rows left open by nearer occluders ───
        let (ct, cb) = depth.clip(x as usize, d);
        let y0 = view.row(u.top, d).max(ct).max(sprite.y0);
        let y1 = view.row(u.bottom, d).min(cb).min(sprite.y1);
        if y0 >= y1 {
            continue;
        }

        // ─── 3. texels, anchored to the sprite's top edge in world space ───
        let table = blend.table(d);
        let step = view.row_step_hp(d);
        let mut z = view.height_at_hp(y0, step);
        for y in y0..y1 {
            let v = ((top_hp - z) >> v_shift) as i32;
            z -= step;
            if v < 0 || v >= th || blend.skips(x, y) {
                continue;
            }
            let texel = tex.texel(tu, v);
            if texel != TRANSPARENT {
                fb.put(x as usize, y as usize, table[texel as usize]);
            }
        }
    }
}

/*─────────────────────────── floor-aligned ───────────────────────────*/

fn draw_flat(
    fb: &mut Framebuffer,
    view: &View,
    depth: &DepthRecords,
    blend: &Blend<'_>,
    sprite: &ProjectedSprite,
    f: &Flat,
    tex: &Texture,
) {
    let (tw, th) = (tex.w as i64, tex.h as i64);
    let side = f.axis.perp();
    let (w2, h2) = ((f.half_w.raw() as i64 * 2).max(1), (f.half_h.raw() as i64 * 2).max(1));
    let below = f.z < view.eye;

    for y in sprite.y0..sprite.y1 {
        // a floor is only ever seen below the horizon, a ceiling above it
        if below != (y >= view.horizon) {
            continue;
        }
        let dist = view.plane_depth(f.z, y);
        if dist < view.near {
            continue;
        }
        let table = blend.table(dist);
        let ahead = view.origin + view.forward.scale(dist);

        for x in sprite.x0..sprite.x1 {
            if blend.skips(x, y) {
                continue;
            }
            // ─── 1. world point under this pixel, in sprite-local axes ───
            let p = ahead + view.right.scale(view.camx(x) * dist) - f.center;
            let lu = p.dot(f.axis) >> FRAC_BITS;
            let lv = p.dot(side) >> FRAC_BITS;
            if lu.abs() >= f.half_w.raw() as i64 || lv.abs() >= f.half_h.raw() as i64 {
                continue;
            }

            // ─── 2. occlusion ───
            let (ct, cb) = depth.clip(x as usize, dist);
            if y < ct || y >= cb {
                continue;
            }

            // ─── 3. texel ───
            let tu = ((lu + f.half_w.raw() as i64) * tw / w2).clamp(0, tw - 1) as i32;
            let tv = ((lv + f.half_h.raw() as i64) * th / h2).clamp(0, th - 1) as i32;
            let texel = tex.texel(blend.column(tu, tw as i32), tv);
            if texel != TRANSPARENT {
                fb.put(x as usize, y as usize, table[texel as usize]);
            }
        }
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
