//! Sprite projector.
//!
//! Turns a world-space sprite into a screen-space [`ProjectedSprite`] or
//! rejects it.  Three kinds share the same pipeline:
//!
//! * **billboard**: a segment facing the camera, centred on the sprite,
//! * **wall-aligned**: a segment along the sprite's own angle,
//! * **floor-aligned**: a rectangle lying in the horizontal plane at `z`.
//!
//! Steps: camera-space rotation, near-plane clip, left/right boundary-ray
//! tests (clip for segments, reject for rectangles), then screen bounds.
//! Anything empty after rounding is dropped before it reaches the queue.

use std::ops::Range;

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::{
    engine::{Ordered, types::View},
    fixed::{Angle, FRAC_BITS, Fixed, FxVec2},
    world::texture::{Texture, TextureId},
};

bitflags! {
    /// Per-sprite orientation and blend flags; same bits as
    /// [`MapEntity::flags`](crate::map::MapEntity).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SpriteFlags: u16 {
        /// Oriented along the sprite's angle instead of facing the camera.
        const WALL        = 0x0001;
        /// Lies flat in the horizontal plane at the sprite's height.
        const FLOOR       = 0x0002;
        /// Dithered 50 % blend.
        const TRANSLUCENT = 0x0004;
        /// No distance shading.
        const FULLBRIGHT  = 0x0008;
        /// Mirror horizontally.
        const FLIP_X      = 0x0010;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpriteKind {
    Billboard,
    Wall,
    Floor,
}

impl SpriteKind {
    /// `WALL` wins over `FLOOR` when both are set.
    pub fn of(flags: SpriteFlags) -> Self {
        if flags.contains(SpriteFlags::WALL) {
            SpriteKind::Wall
        } else if flags.contains(SpriteFlags::FLOOR) {
            SpriteKind::Floor
        } else {
            SpriteKind::Billboard
        }
    }
}

/// A sprite as submitted by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteDesc {
    pub pos: FxVec2,
    /// Bottom edge for upright sprites, plane height for floor sprites.
    pub z: Fixed,
    pub angle: Angle,
    pub tex: TextureId,
    pub flags: SpriteFlags,
}

/// Screen-space geometry of an upright (billboard or wall) sprite.
///
/// Depth and `u` are interpolated perspective-correctly across columns as
/// `1/z` and `u/z`, both in [`Fixed::recip_hp`] scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Upright {
    /// Screen X of the two ends, raw fixed pixels, `sx0 <= sx1`.
    pub sx0: i64,
    pub sx1: i64,
    pub iz0: i64,
    pub iz1: i64,
    pub uz0: i64,
    pub uz1: i64,
    pub bottom: Fixed,
    pub top: Fixed,
}

/// World-space rectangle of a floor-aligned sprite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Flat {
    pub center: FxVec2,
    /// Unit vector along the texture's U axis.
    pub axis: FxVec2,
    pub half_w: Fixed,
    pub half_h: Fixed,
    pub z: Fixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Upright(Upright),
    Flat(Flat),
}

/// A sprite that survived projection, ready for ordering and drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProjectedSprite {
    /// Screen columns covered, half-open.
    pub x0: i32,
    pub x1: i32,
    /// Screen rows that may be touched, half-open.
    pub y0: i32,
    pub y1: i32,
    pub near_depth: Fixed,
    pub far_depth: Fixed,
    pub tex: TextureId,
    pub flags: SpriteFlags,
    /// World segment used by the painter's-order resolver.
    pub footprint: (FxVec2, FxVec2),
    pub shape: Shape,
}

impl ProjectedSprite {
    pub fn kind(&self) -> SpriteKind {
        SpriteKind::of(self.flags)
    }
}

impl Ordered for ProjectedSprite {
    #[inline]
    fn x_range(&self) -> Range<i32> {
        self.x0..self.x1
    }
    #[inline]
    fn footprint(&self) -> (FxVec2, FxVec2) {
        self.footprint
    }
}

/*──────────────────────────── camera space ───────────────────────────*/

/// Camera-space point carrying its texture coordinate along the sprite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CamPoint {
    lat: Fixed,
    depth: Fixed,
    u: Fixed,
}

impl CamPoint {
    fn new(view: &View, p: FxVec2, u: Fixed) -> Self {
        let (lat, depth) = view.to_cam(p);
        Self { lat, depth, u }
    }
}

/// Point where `keep → drop` crosses an edge; `ek >= 0 > ed` are the
/// signed edge distances of the two ends.
fn clip_edge(keep: CamPoint, drop: CamPoint, ek: i64, ed: i64) -> CamPoint {
    let den = (ek - ed).max(1);
    let lerp = |k: Fixed, d: Fixed| {
        let delta = (d.raw() as i64 - k.raw() as i64) * ek / den;
        Fixed::from_raw((k.raw() as i64 + delta) as i32)
    };
    CamPoint {
        lat: lerp(keep.lat, drop.lat),
        depth: lerp(keep.depth, drop.depth),
        u: lerp(keep.u, drop.u),
    }
}

/// Keep the part of segment `a → b` where `edge >= 0`.
fn clip_segment(
    a: CamPoint,
    b: CamPoint,
    edge: impl Fn(&CamPoint) -> i64,
) -> Option<(CamPoint, CamPoint)> {
    let (ea, eb) = (edge(&a), edge(&b));
    match (ea >= 0, eb >= 0) {
        (true, true) => Some((a, b)),
        (true, false) => Some((a, clip_edge(a, b, ea, eb))),
        (false, true) => Some((clip_edge(b, a, eb, ea), b)),
        (false, false) => None,
    }
}

/* signed distances, in raw² units, to the three frustum edges */
#[inline(always)]
fn near_edge(view: &View) -> impl Fn(&CamPoint) -> i64 {
    let near = view.near.raw() as i64;
    move |p| p.depth.raw() as i64 - near
}
#[inline(always)]
fn left_edge(view: &View) -> impl Fn(&CamPoint) -> i64 {
    let tan = view.tan_half.raw() as i64;
    move |p| ((p.lat.raw() as i64) << FRAC_BITS) + p.depth.raw() as i64 * tan
}
#[inline(always)]
fn right_edge(view: &View) -> impl Fn(&CamPoint) -> i64 {
    let tan = view.tan_half.raw() as i64;
    move |p| p.depth.raw() as i64 * tan - ((p.lat.raw() as i64) << FRAC_BITS)
}

/// First screen column whose centre lies at or right of raw screen `sx`.
#[inline(always)]
fn column_at(sx: i64, width: i32) -> i32 {
    let half = 1_i64 << (FRAC_BITS - 1);
    ((sx - half + (1 << FRAC_BITS) - 1) >> FRAC_BITS).clamp(0, width as i64) as i32
}

/// World size of `tex` at `1 << tpu_shift` texels per unit.
#[inline(always)]
fn world_size(texels: usize, tpu_shift: u32) -> Fixed {
    Fixed::from_raw((((texels as i64) << FRAC_BITS) >> tpu_shift).min(i32::MAX as i64) as i32)
}

/*────────────────────────────── project ──────────────────────────────*/

/// Project `desc` (textured with `tex`) for `view`.  `None` means the
/// sprite is behind the camera, outside the field of view or degenerate.
pub fn project(
    view: &View,
    desc: &SpriteDesc,
    tex: &Texture,
    tpu_shift: u32,
) -> Option<ProjectedSprite> {
    let sw = world_size(tex.w, tpu_shift);
    let sh = world_size(tex.h, tpu_shift);
    if sw.raw() <= 0 || sh.raw() <= 0 {
        return None;
    }
    match SpriteKind::of(desc.flags) {
        SpriteKind::Billboard => {
            let half = view.right.scale(sw / 2);
            project_upright(view, desc, desc.pos - half, desc.pos + half, sh)
        }
        SpriteKind::Wall => {
            let half = FxVec2::from_angle(desc.angle).scale(sw / 2);
            project_upright(view, desc, desc.pos - half, desc.pos + half, sh)
        }
        SpriteKind::Floor => project_flat(view, desc, sw, sh),
    }
}

fn project_upright(
    view: &View,
    desc: &SpriteDesc,
    a: FxVec2,
    b: FxVec2,
    height: Fixed,
) -> Option<ProjectedSprite> {
    // ─── 1. camera space, u = 0 at `a`, ONE at `b` ───
    let p0 = CamPoint::new(view, a, Fixed::ZERO);
    let p1 = CamPoint::new(view, b, Fixed::ONE);

    // ─── 2. near plane, then the two boundary rays ───
    let (p0, p1) = clip_segment(p0, p1, near_edge(view))?;
    let (p0, p1) = clip_segment(p0, p1, left_edge(view))?;
    let (p0, p1) = clip_segment(p0, p1, right_edge(view))?;

    // clipping rounds; never let a depth drop below the near plane
    let d0 = p0.depth.max(view.near);
    let d1 = p1.depth.max(view.near);

    // ─── 3. screen X, left to right ───
    let s0 = view.screen_x(p0.lat, d0);
    let s1 = view.screen_x(p1.lat, d1);
    let ((s0, d0, u0), (s1, d1, u1)) = if s0 <= s1 {
        ((s0, d0, p0.u), (s1, d1, p1.u))
    } else {
        ((s1, d1, p1.u), (s0, d0, p0.u))
    };
    let x0 = column_at(s0, view.width);
    let x1 = column_at(s1, view.width);
    if x0 >= x1 {
        return None;
    }

    // ─── 4. vertical bounds ───
    let bottom = desc.z;
    let top = desc.z.saturating_add(height);
    let y0 = view.row(top, d0).min(view.row(top, d1));
    let y1 = view.row(bottom, d0).max(view.row(bottom, d1));
    if y0 >= y1 {
        return None;
    }

    let iz0 = d0.recip_hp();
    let iz1 = d1.recip_hp();
    Some(ProjectedSprite {
        x0,
        x1,
        y0,
        y1,
        near_depth: d0.min(d1),
        far_depth: d0.max(d1),
        tex: desc.tex,
        flags: desc.flags,
        footprint: (a, b),
        shape: Shape::Upright(Upright {
            sx0: s0,
            sx1: s1,
            iz0,
            iz1,
            uz0: u0.raw() as i64 * iz0,
            uz1: u1.raw() as i64 * iz1,
            bottom,
            top,
        }),
    })
}

fn project_flat(
    view: &View,
    desc: &SpriteDesc,
    width: Fixed,
    height: Fixed,
) -> Option<ProjectedSprite> {
    // seen edge-on from exactly its own height
    if desc.z == view.eye {
        return None;
    }
    let axis = FxVec2::from_angle(desc.angle);
    let side = axis.perp();
    let (half_w, half_h) = (width / 2, height / 2);
    let (du, dv) = (axis.scale(half_w), side.scale(half_h));

    // ─── 1. corners, counter-clockwise ───
    let corners = [
        desc.pos - du - dv,
        desc.pos + du - dv,
        desc.pos + du + dv,
        desc.pos - du + dv,
    ];

    // ─── 2. Sutherland–Hodgman against the near plane ───
    let near = near_edge(view);
    let mut poly: SmallVec<[CamPoint; 8]> = SmallVec::new();
    for i in 0..corners.len() {
        let p = CamPoint::new(view, corners[i], Fixed::ZERO);
        let q = CamPoint::new(view, corners[(i + 1) % corners.len()], Fixed::ZERO);
        let (ep, eq) = (near(&p), near(&q));
        if ep >= 0 {
            poly.push(p);
        }
        if (ep >= 0) != (eq >= 0) {
            poly.push(if ep >= 0 {
                clip_edge(p, q, ep, eq)
            } else {
                clip_edge(q, p, eq, ep)
            });
        }
    }
    if poly.is_empty() {
        return None;
    }

    // ─── 3. boundary rays: reject when wholly outside one of them ───
    let (left, right) = (left_edge(view), right_edge(view));
    if poly.iter().all(|p| left(p) < 0) || poly.iter().all(|p| right(p) < 0) {
        return None;
    }

    // ─── 4. screen bounds ───
    let mut sx = (i64::MAX, i64::MIN);
    let mut depth = (Fixed::MAX, Fixed::MIN);
    let mut rows = (i32::MAX, i32::MIN);
    for p in &poly {
        let d = p.depth.max(view.near);
        let s = view.screen_x(p.lat, d);
        sx = (sx.0.min(s), sx.1.max(s));
        depth = (depth.0.min(d), depth.1.max(d));
        let r = view.row(desc.z, d);
        rows = (rows.0.min(r), rows.1.max(r));
    }
    let x0 = column_at(sx.0, view.width);
    let x1 = column_at(sx.1, view.width);
    // the row boundary of a depth is a pixel edge: include the row it opens
    let (y0, y1) = (rows.0.max(0), (rows.1 + 1).min(view.height));
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let half = view.right.scale(width.max(height) / 2);
    Some(ProjectedSprite {
        x0,
        x1,
        y0,
        y1,
        near_depth: depth.0,
        far_depth: depth.1,
        tex: desc.tex,
        flags: desc.flags,
        footprint: (desc.pos - half, desc.pos + half),
        shape: Shape::Flat(Flat {
            center: desc.pos,
            axis,
            half_w,
            half_h,
            z: desc.z,
        }),
    })
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
