//! Angle-indexed sky pass.
//!
//! Sky fragments are collected as ordinary planes; once per map draw each
//! of their column runs is filled from the sky texture, the texture column
//! picked by the absolute angle of that screen column so the sky turns
//! with the camera but never moves with it.

use std::ops::Range;

use crate::{
    engine::types::View,
    fixed::{ANGLE_BITS, Angle, Fixed},
    renderer::Framebuffer,
    world::texture::Texture,
};

/// Sky texture repeats this many times per full turn.
const SKY_WRAPS: i64 = 4;

/// Per-column view angle offsets, rebuilt when the projection changes.
#[derive(Default)]
pub struct SkyAngles {
    width: i32,
    tan_half: Fixed,
    offsets: Vec<Angle>,
}

impl SkyAngles {
    pub fn update(&mut self, view: &View) {
        if self.width == view.width && self.tan_half == view.tan_half {
            return;
        }
        self.width = view.width;
        self.tan_half = view.tan_half;
        self.offsets.clear();
        self.offsets
            .extend((0..view.width).map(|x| Angle::atan2(view.camx(x), Fixed::ONE)));
    }

    /// World angle of the ray through column `x`.
    #[inline(always)]
    pub fn column_angle(&self, view: &View, x: i32) -> Angle {
        view.angle + self.offsets[x as usize]
    }
}

/// Fill `rows` of column `x` with the sky at `angle`, through shade `table`.
pub fn draw_column(
    fb: &mut Framebuffer,
    view: &View,
    tex: &Texture,
    table: &[u8; 256],
    angle: Angle,
    x: i32,
    rows: Range<i32>,
) {
    let u = ((angle.units() as i64 * tex.w as i64 * SKY_WRAPS) >> ANGLE_BITS) as i32;
    let h = tex.h as i32;
    let screen_h = view.height.max(1);
    for y in rows {
        // horizon sits on the texture's middle row
        let v = ((y - view.horizon) * h / screen_h + h / 2).clamp(0, h - 1);
        fb.put(x as usize, y as usize, table[tex.texel(u, v) as usize]);
    }
}
