//! Fixed-point scalar, binary angles and the tables behind them.
//!
//! * [`Fixed`] – signed 32-bit value with 10 fractional bits (`1024 == 1.0`).
//! * [`Angle`] – binary angle, [`ANGLES`] units per full turn, always wraps.
//! * [`FxVec2`] – 2-D vector of [`Fixed`] used for world positions.
//!
//! The renderer never touches `f32`/`f64`.  Floating point is only used once,
//! while the sine/tangent tables are built on first use.

use glam::IVec2;
use once_cell::sync::Lazy;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Number of fractional bits.
pub const FRAC_BITS: u32 = 10;
const FRAC_MASK: i32 = (1 << FRAC_BITS) - 1;

/*───────────────────────────────────────────────────────────────────────*/
/*                                Fixed                                  */
/*───────────────────────────────────────────────────────────────────────*/

/// Signed fixed-point scalar, `1024` represents `1.0`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fixed(i32);

#[inline(always)]
fn clamp_raw(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl Fixed {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1 << FRAC_BITS);
    pub const HALF: Self = Self(1 << (FRAC_BITS - 1));
    /// Smallest positive value.
    pub const EPSILON: Self = Self(1);
    pub const MAX: Self = Self(i32::MAX);
    pub const MIN: Self = Self(i32::MIN);

    #[inline(always)]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn raw(self) -> i32 {
        self.0
    }

    #[inline(always)]
    pub const fn from_int(v: i32) -> Self {
        Self(v << FRAC_BITS)
    }

    /// `num / den` as a fixed value; a zero `den` is treated as one.
    #[inline]
    pub const fn from_ratio(num: i32, den: i32) -> Self {
        let den = if den == 0 { 1 } else { den };
        Self((((num as i64) << FRAC_BITS) / den as i64) as i32)
    }

    /// Integer part, rounded towards negative infinity.
    #[inline(always)]
    pub const fn to_int(self) -> i32 {
        self.0 >> FRAC_BITS
    }

    /// Nearest integer, halves round up.
    #[inline(always)]
    pub const fn round_to_int(self) -> i32 {
        ((self.0 as i64 + (1 << (FRAC_BITS - 1))) >> FRAC_BITS) as i32
    }

    #[inline(always)]
    pub const fn floor(self) -> Self {
        Self(self.0 & !FRAC_MASK)
    }

    /// Fractional part in `0 .. ONE`, also for negative values.
    #[inline(always)]
    pub const fn frac(self) -> Self {
        Self(self.0 & FRAC_MASK)
    }

    #[inline(always)]
    pub const fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    #[inline(always)]
    pub const fn signum(self) -> i32 {
        self.0.signum()
    }

    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Coerce to non-zero: `0` becomes [`Fixed::EPSILON`].  Every divisor in
    /// the renderer goes through here.
    #[inline(always)]
    pub const fn nonzero(self) -> Self {
        if self.0 == 0 { Self::EPSILON } else { self }
    }

    #[inline]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// `self * mul / div` with a 64-bit intermediate, saturated to range.
    #[inline]
    pub fn mul_div(self, mul: Self, div: Self) -> Self {
        let num = self.0 as i64 * mul.0 as i64;
        Self(clamp_raw(num / div.nonzero().0 as i64))
    }

    /// Reciprocal with `RECIP_BITS` fractional bits (more precision for
    /// perspective interpolation than a plain [`Fixed`] could hold).
    #[inline]
    pub fn recip_hp(self) -> i64 {
        (1_i64 << (FRAC_BITS + RECIP_BITS)) / self.nonzero().0 as i64
    }
}

/// Extra fractional bits carried by [`Fixed::recip_hp`].
pub const RECIP_BITS: u32 = 20;

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({:.4})", self.0 as f64 / (1 << FRAC_BITS) as f64)
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0 as f64 / (1 << FRAC_BITS) as f64)
    }
}

impl Add for Fixed {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Fixed {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl Sub for Fixed {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Fixed {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.wrapping_sub(rhs.0);
    }
}

impl Neg for Fixed {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl Mul for Fixed {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        Self(clamp_raw((self.0 as i64 * rhs.0 as i64) >> FRAC_BITS))
    }
}

impl Div for Fixed {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        Self(clamp_raw(((self.0 as i64) << FRAC_BITS) / rhs.nonzero().0 as i64))
    }
}

impl Mul<i32> for Fixed {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: i32) -> Self {
        Self(clamp_raw(self.0 as i64 * rhs as i64))
    }
}

impl Div<i32> for Fixed {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: i32) -> Self {
        let rhs = if rhs == 0 { 1 } else { rhs };
        Self(self.0 / rhs)
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                                Angle                                  */
/*───────────────────────────────────────────────────────────────────────*/

pub const ANGLE_BITS: u32 = 12;
/// Units in a full turn.
pub const ANGLES: i32 = 1 << ANGLE_BITS;
const ANGLE_MASK: i32 = ANGLES - 1;
/// Tangent table covers one octant, `0 ..= ANGLES / 8`.
const OCTANT: i32 = ANGLES / 8;
const TAN_BITS: u32 = 16;

static SINE: Lazy<Vec<Fixed>> = Lazy::new(|| {
    (0..ANGLES)
        .map(|i| {
            let rad = i as f64 * std::f64::consts::TAU / ANGLES as f64;
            Fixed::from_raw((rad.sin() * (1 << FRAC_BITS) as f64).round() as i32)
        })
        .collect()
});

static TAN_OCTANT: Lazy<Vec<i64>> = Lazy::new(|| {
    (0..=OCTANT)
        .map(|i| {
            let rad = i as f64 * std::f64::consts::TAU / ANGLES as f64;
            (rad.tan() * (1_i64 << TAN_BITS) as f64).round() as i64
        })
        .collect()
});

/// Binary angle: `0` = +X (east), a quarter turn = +Y.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub struct Angle(i32);

impl Angle {
    pub const ZERO: Self = Self(0);
    pub const QUARTER: Self = Self(ANGLES / 4);
    pub const HALF: Self = Self(ANGLES / 2);

    #[inline(always)]
    pub const fn from_units(units: i32) -> Self {
        Self(units & ANGLE_MASK)
    }

    #[inline(always)]
    pub const fn units(self) -> i32 {
        self.0
    }

    pub const fn from_degrees(deg: i32) -> Self {
        Self::from_units(((deg as i64 * ANGLES as i64) / 360) as i32)
    }

    pub const fn degrees(self) -> i32 {
        ((self.0 as i64 * 360) / ANGLES as i64) as i32
    }

    #[inline(always)]
    pub fn sin(self) -> Fixed {
        SINE[self.0 as usize]
    }

    #[inline(always)]
    pub fn cos(self) -> Fixed {
        SINE[((self.0 + ANGLES / 4) & ANGLE_MASK) as usize]
    }

    /// Tangent; the cosine is coerced to non-zero so a quarter turn saturates.
    pub fn tan(self) -> Fixed {
        self.sin() / self.cos()
    }

    /// Angle of the vector `(x, y)`; `(0, 0)` yields [`Angle::ZERO`].
    pub fn atan2(y: Fixed, x: Fixed) -> Self {
        if x.is_zero() && y.is_zero() {
            return Self::ZERO;
        }
        let ax = (x.raw() as i64).abs();
        let ay = (y.raw() as i64).abs();
        let (lo, hi) = if ay <= ax { (ay, ax) } else { (ax, ay) };
        let ratio = (lo << TAN_BITS) / hi.max(1);

        let table = &*TAN_OCTANT;
        let mut a = table.partition_point(|&t| t < ratio) as i32;
        if a > 0 && ratio - table[a as usize - 1] < table[a.min(OCTANT) as usize] - ratio {
            a -= 1;
        }
        let a = a.min(OCTANT);

        let mut t = if ay <= ax { a } else { ANGLES / 4 - a };
        if x.raw() < 0 {
            t = ANGLES / 2 - t;
        }
        if y.raw() < 0 {
            t = -t;
        }
        Self::from_units(t)
    }
}

impl Add for Angle {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self::from_units(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self::from_units(self.0 - rhs.0)
    }
}

impl Neg for Angle {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self::from_units(-self.0)
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                                FxVec2                                 */
/*───────────────────────────────────────────────────────────────────────*/

/// 2-D world-space vector.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub struct FxVec2 {
    pub x: Fixed,
    pub y: Fixed,
}

impl FxVec2 {
    pub const ZERO: Self = Self::new(Fixed::ZERO, Fixed::ZERO);

    #[inline(always)]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `a`.
    #[inline]
    pub fn from_angle(a: Angle) -> Self {
        Self::new(a.cos(), a.sin())
    }

    #[inline(always)]
    pub fn scale(self, s: Fixed) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    /// Rotated a quarter turn towards +Y.
    #[inline(always)]
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// 2-D cross product in raw units (scaled by `ONE²`); only the sign and
    /// relative magnitude are meaningful.
    #[inline(always)]
    pub fn cross(self, o: Self) -> i64 {
        self.x.raw() as i64 * o.y.raw() as i64 - self.y.raw() as i64 * o.x.raw() as i64
    }

    /// Dot product in raw units (scaled by `ONE²`).
    #[inline(always)]
    pub fn dot(self, o: Self) -> i64 {
        self.x.raw() as i64 * o.x.raw() as i64 + self.y.raw() as i64 * o.y.raw() as i64
    }

    /// Grid cell containing this point.
    #[inline(always)]
    pub fn cell(self) -> IVec2 {
        IVec2::new(self.x.to_int(), self.y.to_int())
    }
}

impl Add for FxVec2 {
    type Output = Self;
    #[inline(always)]
    fn add(self, o: Self) -> Self {
        Self::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for FxVec2 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, o: Self) -> Self {
        Self::new(self.x - o.x, self.y - o.y)
    }
}

impl Neg for FxVec2 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
