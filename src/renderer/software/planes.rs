//! Plane accumulator: deferred floor/ceiling (and sky) pixels.
//!
//! * Fragments sharing a quantised height and a texture are merged into
//!   one [`VisPlane`] holding one vertical run per screen column.
//! * Planes live in an index-addressed arena chained through hash buckets;
//!   [`PlaneMap::clear`] only resets the bucket heads and the fill cursor.
//! * At flush time each plane is turned into horizontal spans by scanning
//!   its columns left to right and detecting where runs start and stop, so
//!   the perspective set-up happens once per span, not once per pixel.

use std::ops::Range;

use tracing::trace;

use crate::{
    engine::types::{HP_BITS, View},
    fixed::{FRAC_BITS, Fixed},
    renderer::Framebuffer,
    world::texture::{Texture, TextureId},
};

use super::Paint;

pub type PlaneId = u32;
const NO_PLANE: PlaneId = PlaneId::MAX;
const BUCKETS: usize = 128;

/// Spans further than this are textured as if they were this far.
const MAX_SPAN_DEPTH: i32 = 1 << 22;

/// Half-open vertical pixel run; empty when `top >= bottom`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Run {
    top: i16,
    bottom: i16,
}

impl Run {
    const EMPTY: Run = Run { top: 0, bottom: 0 };

    #[inline(always)]
    fn is_empty(self) -> bool {
        self.top >= self.bottom
    }

    /// Inclusive `(top, bottom)`; empty runs map to `(i32::MAX, -1)`.
    #[inline(always)]
    fn inclusive(self) -> (i32, i32) {
        if self.is_empty() {
            (i32::MAX, -1)
        } else {
            (self.top as i32, self.bottom as i32 - 1)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PlaneKey {
    height: i32,
    tex: TextureId,
    sky: bool,
}

impl PlaneKey {
    #[inline(always)]
    fn bucket(self) -> usize {
        let h = (self.height as u32).wrapping_mul(0x9E37_79B1)
            ^ (self.tex as u32).wrapping_mul(0x85EB_CA6B)
            ^ self.sky as u32;
        (h >> 7) as usize & (BUCKETS - 1)
    }
}

#[derive(Clone, Debug)]
pub struct VisPlane {
    pub height: Fixed,
    pub tex: TextureId,
    pub sky: bool,
    key: PlaneKey,
    start_x: i32,
    /// Last column holding a run; only this one can still grow.
    last_x: i32,
    runs: Vec<Run>,
    next: PlaneId,
}

impl VisPlane {
    /// Non-empty runs as `(column, rows)`.
    pub fn columns(&self) -> impl Iterator<Item = (i32, Range<i32>)> + '_ {
        self.runs
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_empty())
            .map(|(i, r)| (self.start_x + i as i32, r.top as i32..r.bottom as i32))
    }

    #[inline(always)]
    fn last_run(&mut self) -> &mut Run {
        let i = (self.last_x - self.start_x) as usize;
        &mut self.runs[i]
    }
}

pub struct PlaneMap {
    heads: [PlaneId; BUCKETS],
    planes: Vec<VisPlane>,
    used: usize,
    height_shift: u32,
    span_start: Vec<i32>,
}

impl PlaneMap {
    pub fn new(height_shift: u32) -> Self {
        Self {
            heads: [NO_PLANE; BUCKETS],
            planes: Vec::new(),
            used: 0,
            height_shift,
            span_start: Vec::new(),
        }
    }

    /// Forget every plane; arena slots are recycled by later `add`s.
    pub fn clear(&mut self) {
        self.heads = [NO_PLANE; BUCKETS];
        self.used = 0;
    }

    /// Planes allocated since the last `clear`.
    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn planes(&self) -> &[VisPlane] {
        &self.planes[..self.used]
    }

    /// Register rows `rows` of column `x` as belonging to a plane at
    /// `height` with texture `tex`.  Columns must arrive left to right.
    pub fn add(&mut self, height: Fixed, tex: TextureId, sky: bool, x: i32, rows: Range<i32>) {
        if rows.is_empty() {
            return;
        }
        let key = PlaneKey {
            height: if sky { 0 } else { height.raw() >> self.height_shift },
            tex,
            sky,
        };
        let run = Run {
            top: rows.start as i16,
            bottom: rows.end as i16,
        };

        // ─── 1. extend a touching run, or find a plane free at this column ───
        let mut open = NO_PLANE;
        let mut id = self.heads[key.bucket()];
        while id != NO_PLANE {
            let plane = &mut self.planes[id as usize];
            if plane.key == key {
                if plane.last_x == x {
                    let last = plane.last_run();
                    if last.bottom == run.top {
                        last.bottom = run.bottom;
                        return;
                    }
                    if last.top == run.bottom {
                        last.top = run.top;
                        return;
                    }
                } else if plane.last_x < x && open == NO_PLANE {
                    open = id;
                }
            }
            id = plane.next;
        }

        // ─── 2. open a new column on an existing plane ───
        if open != NO_PLANE {
            let plane = &mut self.planes[open as usize];
            let gap = (x - plane.last_x - 1) as usize;
            plane.runs.extend(std::iter::repeat_n(Run::EMPTY, gap));
            plane.runs.push(run);
            plane.last_x = x;
            return;
        }

        // ─── 3. allocate a fresh plane ───
        let id = self.used as PlaneId;
        let bucket = key.bucket();
        let next = self.heads[bucket];
        if self.used == self.planes.len() {
            trace!(planes = self.used + 1, "plane pool grows");
            self.planes.push(VisPlane {
                height,
                tex,
                sky,
                key,
                start_x: x,
                last_x: x,
                runs: vec![run],
                next,
            });
        } else {
            let plane = &mut self.planes[self.used];
            plane.height = height;
            plane.tex = tex;
            plane.sky = sky;
            plane.key = key;
            plane.start_x = x;
            plane.last_x = x;
            plane.runs.clear();
            plane.runs.push(run);
            plane.next = next;
        }
        self.heads[bucket] = id;
        self.used += 1;
    }

    /// Convert plane `id` into horizontal spans `emit(y, x_first, x_last)`
    /// (inclusive), each exactly once.
    pub fn make_spans(&mut self, id: usize, screen_h: usize, mut emit: impl FnMut(i32, i32, i32)) {
        if self.span_start.len() < screen_h {
            self.span_start.resize(screen_h, 0);
        }
        let plane = &self.planes[id];
        let span_start = &mut self.span_start;

        let (mut t1, mut b1) = Run::EMPTY.inclusive();
        for x in plane.start_x..=plane.last_x + 1 {
            let cur = if x <= plane.last_x {
                plane.runs[(x - plane.start_x) as usize]
            } else {
                Run::EMPTY
            };
            let (mut t2, mut b2) = cur.inclusive();
            let (next_t, next_b) = (t2, b2);

            // rows that stopped: close their spans
            while t1 < t2 && t1 <= b1 {
                emit(t1, span_start[t1 as usize], x - 1);
                t1 += 1;
            }
            while b1 > b2 && b1 >= t1 {
                emit(b1, span_start[b1 as usize], x - 1);
                b1 -= 1;
            }
            // rows that started: remember where
            while t2 < t1 && t2 <= b2 {
                span_start[t2 as usize] = x;
                t2 += 1;
            }
            while b2 > b1 && b2 >= t2 {
                span_start[b2 as usize] = x;
                b2 -= 1;
            }
            t1 = next_t;
            b1 = next_b;
        }
    }
}

/*──────────────────────────── span drawing ───────────────────────────*/

/// Texture one horizontal run `x0 ..= x1` of row `y` on a plane at `height`.
#[allow(clippy::too_many_arguments)]
pub fn draw_span(
    fb: &mut Framebuffer,
    view: &View,
    paint: Paint<'_>,
    tex: &Texture,
    height: Fixed,
    y: i32,
    x0: i32,
    x1: i32,
) {
    let dist = view.plane_depth(height, y);
    let table = paint.table(dist, false);
    let d = dist.raw().min(MAX_SPAN_DEPTH) as i64;
    let tan2 = 2 * view.tan_half.raw() as i64;

    // world units per screen pixel along the row, HP scale
    let lat_step = ((tan2 * d) << (HP_BITS - FRAC_BITS)) / view.width.max(1) as i64;
    // lateral offset of column x0's centre
    let lat0 = (2 * x0 + 1 - view.width) as i64 * lat_step / 2;

    let (f, r) = (view.forward, view.right);
    let base = |o: Fixed, fwd: Fixed, right: Fixed| {
        ((o.raw() as i64) << HP_BITS)
            + ((fwd.raw() as i64 * d) << (HP_BITS - FRAC_BITS))
            + ((right.raw() as i64 * lat0) >> FRAC_BITS)
    };
    let mut px = base(view.origin.x, f.x, r.x);
    let mut py = base(view.origin.y, f.y, r.y);
    let sx = (r.x.raw() as i64 * lat_step) >> FRAC_BITS;
    let sy = (r.y.raw() as i64 * lat_step) >> FRAC_BITS;

    let shift = FRAC_BITS + HP_BITS - paint.texels_per_unit_shift;
    let row = fb.row_mut(y as usize);
    for out in &mut row[x0 as usize..=x1 as usize] {
        let u = (px >> shift) as i32;
        let v = (py >> shift) as i32;
        *out = table[tex.texel(u, v) as usize];
        px += sx;
        py += sy;
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
