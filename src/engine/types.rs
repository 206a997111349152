use glam::IVec2;

use crate::{
    fixed::{Angle, FRAC_BITS, Fixed, FxVec2},
    map::CellInfo,
    world::camera::Camera,
};

/// Extra fractional bits used by per-pixel texture stepping.
pub const HP_BITS: u32 = 16;

/// Which grid line a ray crossed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// A vertical grid line (x changed).
    X,
    /// A horizontal grid line (y changed).
    Y,
}

/// World-space ray; `dir` is not normalised: its component along the view
/// direction is one, so the hit parameter equals the perpendicular depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ray {
    pub origin: FxVec2,
    pub dir: FxVec2,
}

/// One cell-boundary crossing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    /// World position of the crossing.
    pub pos: FxVec2,
    /// Cell entered by the crossing.
    pub cell: IVec2,
    /// Perpendicular distance from the viewer.
    pub dist: Fixed,
    pub side: Side,
    /// Cell the ray is leaving.
    pub front: CellInfo,
    /// Cell the ray is entering (sky sentinel outside the grid).
    pub back: CellInfo,
    /// Horizontal wall texture coordinate in `0 .. ONE`.
    pub tex_u: Fixed,
}

/// Screen column paired with the perpendicular depth drawn there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelInfo {
    pub x: i32,
    pub depth: Fixed,
}

/// Per-frame projection constants derived from the camera and the
/// frame-buffer size.
#[derive(Clone, Copy, Debug)]
pub struct View {
    pub width: i32,
    pub height: i32,
    pub camera: Camera,
    pub origin: FxVec2,
    pub eye: Fixed,
    pub angle: Angle,
    pub forward: FxVec2,
    pub right: FxVec2,
    pub tan_half: Fixed,
    pub focal: Fixed,
    /// Screen row of the horizon, `h / 2 + shear`; may lie off-screen.
    pub horizon: i32,
    pub near: Fixed,
}

impl View {
    pub fn new(camera: &Camera, width: usize, height: usize) -> Self {
        Self {
            width: width as i32,
            height: height as i32,
            camera: *camera,
            origin: camera.pos(),
            eye: camera.z(),
            angle: camera.angle(),
            forward: camera.forward(),
            right: camera.right(),
            tan_half: camera.tan_half_fov(),
            focal: camera.focal(width),
            horizon: height as i32 / 2 + camera.shear(),
            near: camera.near(),
        }
    }

    /// Lateral ray slope through the centre of column `x`.
    #[inline(always)]
    pub fn camx(&self, x: i32) -> Fixed {
        let num = (2 * x + 1 - self.width) as i64 * self.tan_half.raw() as i64;
        Fixed::from_raw((num / self.width.max(1) as i64) as i32)
    }

    /// Ray through the centre of column `x`.
    #[inline]
    pub fn ray(&self, x: i32) -> Ray {
        Ray {
            origin: self.origin,
            dir: self.forward + self.right.scale(self.camx(x)),
        }
    }

    #[inline(always)]
    pub fn to_cam(&self, p: FxVec2) -> (Fixed, Fixed) {
        self.camera.to_cam(p)
    }

    /// Screen row boundary where world height `h` lands at `depth`,
    /// clamped to `0 ..= height`.
    #[inline]
    pub fn row(&self, h: Fixed, depth: Fixed) -> i32 {
        let off = (self.eye - h).mul_div(self.focal, depth.max(Fixed::EPSILON)).raw() as i64;
        let v = ((self.horizon as i64) << FRAC_BITS) + off;
        ((v + (1 << (FRAC_BITS - 1))) >> FRAC_BITS).clamp(0, self.height as i64) as i32
    }

    /// Horizon row clamped to the screen.
    #[inline(always)]
    pub fn horizon_row(&self) -> i32 {
        self.horizon.clamp(0, self.height)
    }

    /// Screen X (raw fixed, pixels) of a camera-space point.
    #[inline]
    pub fn screen_x(&self, lateral: Fixed, depth: Fixed) -> i64 {
        let half_w = (self.width as i64) << (FRAC_BITS - 1);
        half_w + lateral.raw() as i64 * self.focal.raw() as i64 / depth.nonzero().raw() as i64
    }

    /// Depth at which a horizontal plane at height `h` covers row `y`.
    #[inline]
    pub fn plane_depth(&self, h: Fixed, y: i32) -> Fixed {
        let dy = (((2 * (y - self.horizon) + 1) as i64) << (FRAC_BITS - 1)).abs();
        let num = ((h - self.eye).raw() as i64).abs() * self.focal.raw() as i64;
        Fixed::from_raw((num / dy).min(i32::MAX as i64) as i32)
    }

    /// World units per screen row at `depth`, with [`HP_BITS`] extra bits.
    #[inline]
    pub fn row_step_hp(&self, depth: Fixed) -> i64 {
        ((depth.raw() as i64) << (FRAC_BITS + HP_BITS)) / self.focal.nonzero().raw() as i64
    }

    /// World height seen through the centre of row `y` on a surface at
    /// the depth whose [`row_step_hp`](Self::row_step_hp) is `step`.
    #[inline]
    pub fn height_at_hp(&self, y: i32, step: i64) -> i64 {
        let half_rows = (2 * (y - self.horizon) + 1) as i64;
        ((self.eye.raw() as i64) << HP_BITS) - half_rows.saturating_mul(step) / 2
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> View {
        let cam = Camera::new(
            FxVec2::new(Fixed::HALF, Fixed::HALF),
            Fixed::HALF,
            Angle::ZERO,
            Angle::from_degrees(90),
        );
        View::new(&cam, 320, 200)
    }

    #[test]
    fn centre_columns_are_symmetric() {
        let v = view();
        assert_eq!(v.camx(159), -v.camx(160));
        assert!(v.camx(0).raw() > -Fixed::ONE.raw());
        assert!(v.camx(319).raw() < Fixed::ONE.raw());
        // forward component of every ray is one
        assert_eq!(v.ray(17).dir.x, Fixed::ONE);
    }

    #[test]
    fn rows_project_and_clamp() {
        let v = view();
        // eye height projects onto the horizon at any depth
        assert_eq!(v.row(Fixed::HALF, Fixed::from_int(3)), 100);
        // floor at depth 1 lies focal/2 pixels below the horizon
        assert_eq!(v.row(Fixed::ZERO, Fixed::ONE), 180);
        assert_eq!(v.row(Fixed::ZERO, Fixed::HALF), 200);
        assert_eq!(v.row(Fixed::from_int(50), Fixed::ONE), 0);
    }

    #[test]
    fn plane_depth_inverts_row() {
        let v = view();
        // row 179 centre is 79.5 px below the horizon: 0.5 * 160 / 79.5
        let d = v.plane_depth(Fixed::ZERO, 179);
        assert_eq!(d, Fixed::from_raw((512 * 160 * 1024) / (159 * 512)));
        assert_eq!(v.row(Fixed::ZERO, d), 180);
    }

    #[test]
    fn height_steps_down_the_screen() {
        let v = view();
        let step = v.row_step_hp(Fixed::ONE);
        let top = v.height_at_hp(20, step);
        let below = v.height_at_hp(21, step);
        assert_eq!(top - below, step);
        // horizon row centre sits half a row under eye height
        assert_eq!(v.height_at_hp(100, step), (512 << HP_BITS) - step / 2);
    }
}
