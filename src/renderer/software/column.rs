//! Column compositor.
//!
//! One screen column, one hit list.  Two cursors start at the screen edges
//! (`top = 0`, `bottom = height`) and only ever move towards each other:
//!
//! * floor/ceiling rows between consecutive hits are *deferred* to the
//!   plane accumulator,
//! * a height step between the cell being left and the cell entered
//!   exposes a wall, painted at once and recorded as an occluder,
//! * sky-textured surfaces go to the sky pass instead of being painted,
//! * a final synthetic hit at infinite depth closes the cursors on the
//!   horizon.
//!
//! Every row is handed to the sink exactly once.

use std::ops::Range;

use crate::{
    engine::types::{Hit, PixelInfo, Side, View},
    fixed::Fixed,
    map::{CellInfo, Surface},
    renderer::software::depth::Bound,
    world::texture::TextureId,
};

/// Depths are clamped to this so projection never divides by zero.
const MIN_DEPTH: Fixed = Fixed::from_raw(1);

/// A wall strip about to be painted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallSlice {
    pub tex: TextureId,
    pub tex_u: Fixed,
    pub side: Side,
}

/// Receiver of everything one column produces.
pub trait ColumnSink {
    /// Paint `rows` with a textured wall.
    fn wall(&mut self, px: PixelInfo, rows: Range<i32>, wall: WallSlice);
    /// Defer `rows` to the plane at `height` textured with `tex`.
    fn flat(&mut self, x: i32, rows: Range<i32>, height: Fixed, tex: TextureId);
    /// Defer `rows` to the sky pass.
    fn sky(&mut self, x: i32, rows: Range<i32>);
    /// Beyond `px.depth`, rows past `limit` on the `bound` side are hidden.
    fn occluder(&mut self, px: PixelInfo, bound: Bound, limit: i32);
}

/// Column cursors: rows `top .. bottom` are still unpainted.
struct Cursors {
    top: i32,
    bottom: i32,
}

impl Cursors {
    #[inline(always)]
    fn closed(&self) -> bool {
        self.top >= self.bottom
    }
}

/// Composite column `x`.  `start` is the cell holding the camera; `hits`
/// must come from a ray cast through that column.
pub fn composite<S: ColumnSink>(
    view: &View,
    x: i32,
    start: CellInfo,
    hits: &[Hit],
    sky: TextureId,
    sink: &mut S,
) {
    let mut cur = Cursors {
        top: 0,
        bottom: view.height,
    };
    let mut front = start;

    for hit in hits {
        let px = PixelInfo {
            x,
            depth: hit.dist.max(MIN_DEPTH),
        };

        // ─── 1. flats of the cell being left, up to this crossing ───
        let yf = view.row(front.floor, px.depth).clamp(cur.top, cur.bottom);
        defer(sink, x, yf..cur.bottom, front.floor, front.tex(Surface::Floor), sky);
        cur.bottom = yf;

        let yc = view.row(front.ceil, px.depth).clamp(cur.top, cur.bottom);
        defer(sink, x, cur.top..yc, front.ceil, front.tex(Surface::Ceiling), sky);
        cur.top = yc;

        if cur.closed() {
            return;
        }

        // ─── 2. walls exposed by the height change ───
        let back = hit.back;
        if back.floor > front.floor {
            let yt = view.row(back.floor, px.depth).clamp(cur.top, cur.bottom);
            if yt < cur.bottom {
                paint(sink, px, yt..cur.bottom, hit, back.tex(Surface::LowerWall), sky);
                sink.occluder(px, Bound::Floor, yt);
                cur.bottom = yt;
            }
        }
        if back.ceil < front.ceil {
            let yb = view.row(back.ceil, px.depth).clamp(cur.top, cur.bottom);
            if cur.top < yb {
                paint(sink, px, cur.top..yb, hit, back.tex(Surface::UpperWall), sky);
                sink.occluder(px, Bound::Ceiling, yb);
                cur.top = yb;
            }
        }

        // ─── 3. a closed cell hides whatever is left ───
        if back.is_closed() && !cur.closed() {
            paint(sink, px, cur.top..cur.bottom, hit, back.tex(Surface::LowerWall), sky);
            sink.occluder(px, Bound::Floor, cur.top);
            sink.occluder(px, Bound::Ceiling, cur.bottom);
            cur.top = cur.bottom;
        }
        if cur.closed() {
            return;
        }
        front = back;
    }

    // ─── 4. synthetic horizon hit ───
    let h = view.horizon_row().clamp(cur.top, cur.bottom);
    defer(sink, x, h..cur.bottom, front.floor, front.tex(Surface::Floor), sky);
    defer(sink, x, cur.top..h, front.ceil, front.tex(Surface::Ceiling), sky);
}

#[inline(always)]
fn defer<S: ColumnSink>(
    sink: &mut S,
    x: i32,
    rows: Range<i32>,
    height: Fixed,
    tex: TextureId,
    sky: TextureId,
) {
    if rows.is_empty() {
        return;
    }
    if tex == sky {
        sink.sky(x, rows);
    } else {
        sink.flat(x, rows, height, tex);
    }
}

#[inline(always)]
fn paint<S: ColumnSink>(
    sink: &mut S,
    px: PixelInfo,
    rows: Range<i32>,
    hit: &Hit,
    tex: TextureId,
    sky: TextureId,
) {
    if tex == sky {
        sink.sky(px.x, rows);
    } else {
        sink.wall(
            px,
            rows,
            WallSlice {
                tex,
                tex_u: hit.tex_u,
                side: hit.side,
            },
        );
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::{HitList, cast},
        fixed::{Angle, FxVec2},
        map::GridMap,
        world::camera::Camera,
    };
    use glam::IVec2;

    /* tiny helpers ---------------------------------------------------*/
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Wall(TextureId),
        Flat(TextureId),
        Sky,
    }

    #[derive(Default)]
    struct Recorder {
        rows: Vec<Vec<Kind>>,
        occluders: Vec<(Bound, i32, Fixed)>,
        flats: usize,
    }

    impl Recorder {
        fn new(h: i32) -> Self {
            Self {
                rows: vec![Vec::new(); h as usize],
                ..Self::default()
            }
        }
        fn mark(&mut self, rows: Range<i32>, k: Kind) {
            for y in rows {
                self.rows[y as usize].push(k);
            }
        }
        fn painted_once(&self) -> bool {
            self.rows.iter().all(|r| r.len() == 1)
        }
    }

    impl ColumnSink for Recorder {
        fn wall(&mut self, _: PixelInfo, rows: Range<i32>, wall: WallSlice) {
            self.mark(rows, Kind::Wall(wall.tex));
        }
        fn flat(&mut self, _: i32, rows: Range<i32>, _: Fixed, tex: TextureId) {
            self.flats += 1;
            self.mark(rows, Kind::Flat(tex));
        }
        fn sky(&mut self, _: i32, rows: Range<i32>) {
            self.flats += 1;
            self.mark(rows, Kind::Sky);
        }
        fn occluder(&mut self, px: PixelInfo, bound: Bound, limit: i32) {
            self.occluders.push((bound, limit, px.depth));
        }
    }

    const SKY: TextureId = 9;

    fn fx(v: i32) -> Fixed {
        Fixed::from_int(v)
    }

    fn camera(x: Fixed, y: Fixed, z: Fixed, deg: i32) -> Camera {
        Camera::new(FxVec2::new(x, y), z, Angle::from_degrees(deg), Angle::from_degrees(90))
    }

    fn run_column(map: &GridMap, cam: &Camera, x: i32, max_steps: usize) -> Recorder {
        let view = View::new(cam, 64, 48);
        let mut hits = HitList::new();
        cast(map, &view.ray(x), max_steps, &mut hits);
        let mut rec = Recorder::new(view.height);
        let start = map.cell(map.cell_of(view.origin));
        composite(&view, x, start, &hits, map.sky(), &mut rec);
        rec
    }

    /// Room with floor 0, ceiling 2, solid border, and some steps inside.
    fn stepped_map() -> GridMap {
        let mut map = GridMap::new(12, 12, fx(0), fx(2), [1, 2, 3, 4], SKY);
        for i in 0..12 {
            for c in [IVec2::new(i, 0), IVec2::new(i, 11), IVec2::new(0, i), IVec2::new(11, i)] {
                map.set_floor(c, fx(2));
            }
        }
        map.set_floor(IVec2::new(5, 5), Fixed::HALF);
        map.set_ceiling(IVec2::new(7, 5), fx(1) + Fixed::HALF);
        map.set_floor(IVec2::new(8, 6), fx(-1));
        map.set_texture(IVec2::new(3, 4), Surface::Ceiling, SKY);
        map.set_ceiling(IVec2::new(3, 4), fx(3));
        map
    }

    #[test]
    fn every_row_painted_exactly_once() {
        let map = stepped_map();
        for (deg, z) in [(0, fx(1)), (37, Fixed::HALF), (200, fx(1) + Fixed::HALF), (300, fx(1))] {
            let cam = camera(fx(2) + Fixed::HALF, fx(5) + Fixed::HALF, z, deg);
            for x in 0..64 {
                let rec = run_column(&map, &cam, x, 64);
                assert!(rec.painted_once(), "deg {deg} column {x}: {:?}", rec.rows);
            }
        }
    }

    #[test]
    fn coverage_holds_when_steps_run_out() {
        let map = stepped_map();
        let cam = camera(fx(1) + Fixed::HALF, fx(5) + Fixed::HALF, fx(1), 0);
        for steps in [0, 1, 2, 5] {
            for x in [0, 31, 63] {
                assert!(run_column(&map, &cam, x, steps).painted_once());
            }
        }
    }

    #[test]
    fn enclosed_cell_is_all_wall() {
        // 3×3 map: one open cell inside a closed ring
        let mut map = GridMap::new(3, 3, fx(1), fx(1), [1, 2, 3, 4], SKY);
        map.set_floor(IVec2::new(1, 1), fx(0));
        let cam = camera(fx(1) + Fixed::HALF, fx(1) + Fixed::HALF, Fixed::HALF, 0);
        for x in 0..64 {
            let rec = run_column(&map, &cam, x, 64);
            assert_eq!(rec.flats, 0, "column {x}");
            assert!(rec.rows.iter().all(|r| r == &[Kind::Wall(3)]), "column {x}");
        }
    }

    #[test]
    fn empty_hit_list_is_all_horizon_fragments() {
        let map = GridMap::new(4, 4, fx(0), fx(2), [SKY, SKY, 3, 4], SKY);
        let cam = camera(fx(2), fx(2), fx(1), 45);
        let rec = run_column(&map, &cam, 10, 0);
        assert!(rec.painted_once());
        assert!(rec.rows.iter().all(|r| r == &[Kind::Sky]));
        assert!(rec.occluders.is_empty());
    }

    #[test]
    fn lower_wall_records_floor_occluder() {
        // camera looks along +X at a raised step two cells away
        let mut map = GridMap::new(8, 3, fx(0), fx(4), [1, 2, 3, 4], SKY);
        for x in 3..8 {
            let c = IVec2::new(x, 1);
            map.set_floor(c, fx(1));
            map.set_texture(c, Surface::Floor, 5);
        }
        let cam = camera(fx(1) + Fixed::HALF, fx(1) + Fixed::HALF, fx(2), 0);
        let rec = run_column(&map, &cam, 32, 64);
        assert!(rec.painted_once());
        let (bound, limit, depth) = rec.occluders[0];
        assert_eq!(bound, Bound::Floor);
        assert!((depth - (fx(1) + Fixed::HALF)).abs() <= Fixed::from_raw(4));
        // the step face sits directly above the limit row
        assert_eq!(rec.rows[limit as usize], vec![Kind::Wall(3)]);
        // above it only the step's own top, the ceiling and the sky remain
        let above = &rec.rows[..limit as usize];
        assert!(above.iter().all(|r| r[0] != Kind::Flat(1)));
        assert!(above.iter().any(|r| r[0] == Kind::Flat(5)));
        // nearest first
        assert!(rec.occluders.windows(2).all(|w| w[0].2 <= w[1].2));
    }
}
