//! Fixed-point grid DDA.
//!
//! Every iteration advances whichever axis is closer to its next grid
//! line and records one [`Hit`] for the boundary just crossed.  The walk
//! stops at a closed cell (the sky sentinel outside the grid is closed),
//! or after `max_steps` crossings, whichever comes first.

use smallvec::SmallVec;

use crate::{
    engine::types::{Hit, Ray, Side},
    fixed::Fixed,
    map::GridMap,
};

/// Hits for one column; stays on the stack for typical step limits.
pub type HitList = SmallVec<[Hit; 64]>;

/// Cast `ray` through `map`, replacing the contents of `out`.
///
/// `out` never holds more than `max_steps` hits.
pub fn cast(map: &GridMap, ray: &Ray, max_steps: usize, out: &mut HitList) {
    out.clear();

    let o = ray.origin;
    let d = ray.dir;
    let mut cell = o.cell();
    let mut front = map.cell(cell);

    // ─── 1. per-axis stepping setup ───
    let step_x = if d.x.raw() < 0 { -1 } else { 1 };
    let step_y = if d.y.raw() < 0 { -1 } else { 1 };

    // ray parameter needed to cross one full cell along each axis
    let delta_x = Fixed::ONE / d.x.abs().nonzero();
    let delta_y = Fixed::ONE / d.y.abs().nonzero();

    // ray parameter of the first crossing along each axis
    let mut side_x = if step_x > 0 {
        (Fixed::ONE - o.x.frac()) * delta_x
    } else {
        o.x.frac() * delta_x
    };
    let mut side_y = if step_y > 0 {
        (Fixed::ONE - o.y.frac()) * delta_y
    } else {
        o.y.frac() * delta_y
    };

    // ─── 2. walk ───
    for _ in 0..max_steps {
        let (dist, side) = if side_x < side_y {
            let t = side_x;
            side_x = side_x.saturating_add(delta_x);
            cell.x += step_x;
            (t, Side::X)
        } else {
            let t = side_y;
            side_y = side_y.saturating_add(delta_y);
            cell.y += step_y;
            (t, Side::Y)
        };

        let pos = o + d.scale(dist);
        let tex_u = match side {
            Side::X if step_x > 0 => pos.y.frac(),
            Side::X => Fixed::ONE - pos.y.frac(),
            Side::Y if step_y > 0 => Fixed::ONE - pos.x.frac(),
            Side::Y => pos.x.frac(),
        };

        let back = map.cell(cell);
        out.push(Hit {
            pos,
            cell,
            dist,
            side,
            front,
            back,
            tex_u,
        });

        if back.is_closed() {
            break;
        }
        front = back;
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fixed::{Angle, FxVec2},
        map::SKY_HEIGHT,
    };
    use glam::IVec2;

    fn fx(v: i32) -> Fixed {
        Fixed::from_int(v)
    }

    /// `w × h` open room with a closed ring around it.
    fn ring_map(w: usize, h: usize) -> GridMap {
        let mut map = GridMap::new(w, h, fx(0), fx(1), [1, 1, 2, 2], 9);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                if x == 0 || y == 0 || x == w as i32 - 1 || y == h as i32 - 1 {
                    map.set_floor(IVec2::new(x, y), fx(1));
                }
            }
        }
        map
    }

    fn ray_at(x: Fixed, y: Fixed, deg: i32) -> Ray {
        Ray {
            origin: FxVec2::new(x, y),
            dir: FxVec2::from_angle(Angle::from_degrees(deg)),
        }
    }

    #[test]
    fn axis_aligned_ray_hits_wall() {
        let map = ring_map(5, 5);
        let mut hits = HitList::new();
        cast(&map, &ray_at(fx(1) + Fixed::HALF, fx(2) + Fixed::HALF, 0), 64, &mut hits);

        // open cells at x = 2, 3 then the ring at x = 4
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.side == Side::X));
        assert_eq!(hits[0].dist, Fixed::HALF);
        assert_eq!(hits[2].cell, IVec2::new(4, 2));
        assert!(hits[2].back.is_closed());
        assert_eq!(hits[2].tex_u, Fixed::HALF);
        // distances grow monotonically
        assert!(hits.windows(2).all(|w| w[0].dist <= w[1].dist));
    }

    #[test]
    fn zero_component_is_coerced() {
        let map = ring_map(5, 5);
        let mut hits = HitList::new();
        let ray = Ray {
            origin: FxVec2::new(fx(2) + Fixed::HALF, fx(2) + Fixed::HALF),
            dir: FxVec2::new(Fixed::ZERO, -Fixed::ONE),
        };
        cast(&map, &ray, 64, &mut hits);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].cell, IVec2::new(2, 0));
        assert_eq!(hits[1].side, Side::Y);
    }

    #[test]
    fn step_limit_bounds_hit_list() {
        // large open room: the limit, not a wall, ends the walk
        let map = GridMap::new(64, 64, fx(0), fx(4), [1; 4], 9);
        let mut hits = HitList::new();
        for limit in [0, 1, 7, 20] {
            for deg in [0, 33, 90, 181, 300] {
                cast(&map, &ray_at(fx(32), fx(32), deg), limit, &mut hits);
                assert!(hits.len() <= limit);
            }
        }
        cast(&map, &ray_at(fx(32), fx(32), 33), 0, &mut hits);
        assert!(hits.is_empty());
    }

    #[test]
    fn enclosed_map_never_exceeds_limit() {
        let map = ring_map(6, 4);
        let mut hits = HitList::new();
        for deg in (0..360).step_by(7) {
            cast(&map, &ray_at(fx(2), fx(2) + Fixed::HALF, deg), 8, &mut hits);
            assert!(!hits.is_empty() && hits.len() <= 8);
            assert!(hits.last().is_some_and(|h| h.back.is_closed()));
        }
    }

    #[test]
    fn leaving_the_grid_yields_sky_sentinel() {
        let map = GridMap::new(2, 2, fx(0), fx(1), [1; 4], 9);
        let mut hits = HitList::new();
        cast(&map, &ray_at(Fixed::HALF, Fixed::HALF, 180), 64, &mut hits);
        assert_eq!(hits.len(), 1);
        let h = hits[0];
        assert_eq!(h.cell, IVec2::new(-1, 0));
        assert_eq!(h.back.floor, SKY_HEIGHT);
        assert_eq!(h.back.tex, [9; 4]);
        assert_eq!(h.front.tex, [1; 4]);
    }
}
