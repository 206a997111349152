use crate::fixed::{Angle, Fixed, FxVec2};

/// Viewer in world space.
///
/// * Only **yaw** rotates the view; looking up/down is a vertical `shear`
///   of the horizon row, Build-style.
/// * `z` is the absolute eye height (same units as cell floors/ceilings).
/// * Angles grow towards +Y, so with row 0 of the map drawn at the top a
///   positive turn is clockwise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pos: FxVec2,
    z: Fixed,
    angle: Angle,
    shear: i32,
    fov: Angle,
}

impl Camera {
    /// Create a camera at `pos`/`z`, facing `angle`, with horizontal FoV `fov`.
    pub fn new(pos: FxVec2, z: Fixed, angle: Angle, fov: Angle) -> Self {
        Self {
            pos,
            z,
            angle,
            shear: 0,
            fov,
        }
    }

    /*──────────────────────── getters / setters ─────────────────────*/

    #[inline]
    pub fn pos(&self) -> FxVec2 {
        self.pos
    }
    #[inline]
    pub fn z(&self) -> Fixed {
        self.z
    }
    #[inline]
    pub fn angle(&self) -> Angle {
        self.angle
    }
    /// Horizon offset in pixels (positive = looking down).
    #[inline]
    pub fn shear(&self) -> i32 {
        self.shear
    }
    #[inline]
    pub fn fov(&self) -> Angle {
        self.fov
    }

    pub fn set_pos(&mut self, pos: FxVec2) {
        self.pos = pos;
    }
    pub fn set_z(&mut self, z: Fixed) {
        self.z = z;
    }
    pub fn set_angle(&mut self, angle: Angle) {
        self.angle = angle;
    }
    pub fn set_shear(&mut self, shear: i32) {
        self.shear = shear;
    }
    /// FoV is kept strictly inside `(0°, 180°)`.
    pub fn set_fov(&mut self, fov: Angle) {
        let units = fov.units().clamp(1, Angle::HALF.units() - 1);
        self.fov = Angle::from_units(units);
    }

    /*──────────────────────── derived vectors ───────────────────────*/

    /// Unit vector pointing where the camera looks.
    #[inline(always)]
    pub fn forward(&self) -> FxVec2 {
        FxVec2::from_angle(self.angle)
    }

    /// Unit vector pointing to the camera's right (screen +X).
    #[inline(always)]
    pub fn right(&self) -> FxVec2 {
        self.forward().perp()
    }

    /// Transform a world point into camera-local `(lateral, depth)`:
    /// lateral grows to the right, depth along the view direction.
    #[inline]
    pub fn to_cam(&self, p: FxVec2) -> (Fixed, Fixed) {
        let d = p - self.pos;
        (dot_fixed(d, self.right()), dot_fixed(d, self.forward()))
    }

    /*──────────────────────── movement helpers ──────────────────────*/

    /// Move by `forward` units along the view and `side` units to the right.
    pub fn step(&mut self, forward: Fixed, side: Fixed) {
        self.pos = self.pos + self.forward().scale(forward) + self.right().scale(side);
    }

    /// Rotate; positive turns right.
    pub fn turn(&mut self, delta: Angle) {
        self.angle = self.angle + delta;
    }

    /*───────────────── projection / frustum helpers ─────────────────*/

    /// `tan(fov / 2)`.
    #[inline]
    pub fn tan_half_fov(&self) -> Fixed {
        Angle::from_units(self.fov.units() / 2).tan()
    }

    /// Pixels per world unit at depth 1 for a viewport `w` pixels wide.
    ///
    /// ```text
    /// focal = (w / 2) / tan(fov / 2)
    /// ```
    #[inline]
    pub fn focal(&self, w: usize) -> Fixed {
        Fixed::from_int(w as i32) / 2 / self.tan_half_fov().nonzero()
    }

    /// Near-plane distance used when clipping sprites.
    #[inline(always)]
    pub fn near(&self) -> Fixed {
        Fixed::from_raw(Fixed::ONE.raw() / 16)
    }
}

#[inline(always)]
fn dot_fixed(a: FxVec2, b: FxVec2) -> Fixed {
    let raw = a.dot(b) >> crate::fixed::FRAC_BITS;
    Fixed::from_raw(raw.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    fn fx(v: i32) -> Fixed {
        Fixed::from_int(v)
    }

    fn cam_at_origin(deg: i32) -> Camera {
        Camera::new(FxVec2::ZERO, fx(0), Angle::from_degrees(deg), Angle::from_degrees(90))
    }

    #[test]
    fn forward_and_right_are_orthogonal() {
        let cam = cam_at_origin(30);
        assert_eq!(cam.forward().dot(cam.right()).abs() >> 10, 0);
    }

    #[test]
    fn focal_at_90_deg() {
        let cam = cam_at_origin(0);
        assert_eq!(cam.focal(640), fx(320));
    }

    #[test]
    fn to_cam_axes_align() {
        let cam = cam_at_origin(0);
        // straight ahead → (lateral 0, depth 10)
        assert_eq!(cam.to_cam(FxVec2::new(fx(10), fx(0))), (fx(0), fx(10)));
        // +Y is to the right when facing +X
        assert_eq!(cam.to_cam(FxVec2::new(fx(0), fx(5))), (fx(5), fx(0)));
    }

    #[test]
    fn to_cam_rotated() {
        let cam = cam_at_origin(90);
        assert_eq!(cam.to_cam(FxVec2::new(fx(0), fx(10))), (fx(0), fx(10)));
    }

    #[test]
    fn step_and_turn() {
        let mut cam = cam_at_origin(0);
        cam.step(fx(2), fx(1));
        assert_eq!(cam.pos(), FxVec2::new(fx(2), fx(1)));
        cam.turn(Angle::from_degrees(-90));
        assert_eq!(cam.angle(), Angle::from_degrees(270));
    }

    #[test]
    fn fov_is_clamped() {
        let mut cam = cam_at_origin(0);
        cam.set_fov(Angle::HALF);
        assert!(cam.fov().units() < Angle::HALF.units());
        cam.set_fov(Angle::ZERO);
        assert!(cam.fov().units() > 0);
    }
}
