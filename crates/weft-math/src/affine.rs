//! 2x3 affine matrix in 16.16 fixed-point.
//!
//! [`Affine`] maps pipeline coordinates between node frames. The matrix is
//! stored row-major as `[a b tx; c d ty]` and applied to column vectors:
//!
//! ```text
//! | a b tx |   | x |   | a*x + b*y + tx |
//! | c d ty | * | y | = | c*x + d*y + ty |
//! |         |  | 1 |
//! ```
//!
//! Rotation and scale setters accept floats on the outer API and convert
//! immediately; composition, inversion and application are pure fixed-point
//! so a transform chain evaluates identically on every target.
//!
//! # Usage
//!
//! ```rust
//! use weft_math::{Affine, Point};
//!
//! let m = Affine::rotation_scale(0.0, 2.0, 2.0).then(&Affine::translation_int(5, 0));
//! let p = m.apply(Point::from_int(1, 1));
//! assert_eq!(p.x.floor(), 7);
//! assert_eq!(p.y.floor(), 2);
//! ```

use crate::{Fixed, Point};

/// Coarse classification of an affine matrix, used for capability
/// negotiation between pipeline nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformClass {
    /// Exactly the identity.
    Identity,
    /// Pure translation.
    Translation,
    /// Axis-aligned scale with equal factors (plus translation).
    ScaleUniform,
    /// Axis-aligned scale with distinct factors (plus translation).
    ScaleAny,
    /// Rotation with uniform scale (plus translation).
    Rotation,
    /// Anything else: shear, non-uniform rotated scale.
    General,
}

/// A 2x3 affine matrix, all elements 16.16 fixed-point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affine {
    /// Row 0, column 0.
    pub a: Fixed,
    /// Row 0, column 1.
    pub b: Fixed,
    /// Row 0 translation.
    pub tx: Fixed,
    /// Row 1, column 0.
    pub c: Fixed,
    /// Row 1, column 1.
    pub d: Fixed,
    /// Row 1 translation.
    pub ty: Fixed,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        a: Fixed::ONE,
        b: Fixed::ZERO,
        tx: Fixed::ZERO,
        c: Fixed::ZERO,
        d: Fixed::ONE,
        ty: Fixed::ZERO,
    };

    /// Creates a matrix from its six elements.
    #[inline]
    pub const fn new(a: Fixed, b: Fixed, tx: Fixed, c: Fixed, d: Fixed, ty: Fixed) -> Self {
        Self { a, b, tx, c, d, ty }
    }

    /// Pure translation.
    #[inline]
    pub const fn translation(t: Point) -> Self {
        Self {
            a: Fixed::ONE,
            b: Fixed::ZERO,
            tx: t.x,
            c: Fixed::ZERO,
            d: Fixed::ONE,
            ty: t.y,
        }
    }

    /// Pure translation by integer pixels.
    #[inline]
    pub const fn translation_int(x: i32, y: i32) -> Self {
        Self::translation(Point::from_int(x, y))
    }

    /// Rotation by `theta` radians combined with per-axis scale.
    ///
    /// Builds `[cos*sx  -sin*sy  0; sin*sx  cos*sy  0]`. Floats are
    /// converted to fixed-point once, here.
    pub fn rotation_scale(theta: f32, sx: f32, sy: f32) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self {
            a: Fixed::from_f32(cos * sx),
            b: Fixed::from_f32(-sin * sy),
            tx: Fixed::ZERO,
            c: Fixed::from_f32(sin * sx),
            d: Fixed::from_f32(cos * sy),
            ty: Fixed::ZERO,
        }
    }

    /// Axis-aligned scale.
    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            a: Fixed::from_f32(sx),
            b: Fixed::ZERO,
            tx: Fixed::ZERO,
            c: Fixed::ZERO,
            d: Fixed::from_f32(sy),
            ty: Fixed::ZERO,
        }
    }

    /// Applies the transform to a point.
    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.b * p.y + self.tx,
            self.c * p.x + self.d * p.y + self.ty,
        )
    }

    /// Returns the transform that applies `self` first, then `after`.
    pub fn then(&self, after: &Affine) -> Affine {
        Affine {
            a: after.a * self.a + after.b * self.c,
            b: after.a * self.b + after.b * self.d,
            tx: after.a * self.tx + after.b * self.ty + after.tx,
            c: after.c * self.a + after.d * self.c,
            d: after.c * self.b + after.d * self.d,
            ty: after.c * self.tx + after.d * self.ty + after.ty,
        }
    }

    /// Determinant as a 16.16 value widened through 64 bits.
    #[inline]
    fn det_wide(&self) -> i64 {
        let a = self.a.to_bits() as i64;
        let b = self.b.to_bits() as i64;
        let c = self.c.to_bits() as i64;
        let d = self.d.to_bits() as i64;
        (a * d - b * c) >> super::fixed::FRAC_BITS
    }

    /// Inverts the matrix, or returns `None` when it is singular.
    ///
    /// A singular matrix collapses the plane to a line; callers treat that
    /// as a fully transparent result rather than an error.
    pub fn invert(&self) -> Option<Affine> {
        let det = self.det_wide();
        if det == 0 {
            return None;
        }
        let shift = super::fixed::FRAC_BITS;
        let div = |num: i64| -> Fixed {
            let wide = (num << shift) / det;
            Fixed::from_bits(wide.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
        };
        let a = self.a.to_bits() as i64;
        let b = self.b.to_bits() as i64;
        let c = self.c.to_bits() as i64;
        let d = self.d.to_bits() as i64;
        let tx = self.tx.to_bits() as i64;
        let ty = self.ty.to_bits() as i64;
        Some(Affine {
            a: div(d),
            b: div(-b),
            tx: div((b * ty - d * tx) >> shift),
            c: div(-c),
            d: div(a),
            ty: div((c * tx - a * ty) >> shift),
        })
    }

    /// `true` when off-diagonal terms are zero.
    #[inline]
    pub fn is_axis_aligned(&self) -> bool {
        self.b == Fixed::ZERO && self.c == Fixed::ZERO
    }

    /// Classifies the matrix for capability negotiation.
    pub fn classify(&self) -> TransformClass {
        if self.is_axis_aligned() {
            if self.a == Fixed::ONE && self.d == Fixed::ONE {
                return if self.tx == Fixed::ZERO && self.ty == Fixed::ZERO {
                    TransformClass::Identity
                } else {
                    TransformClass::Translation
                };
            }
            return if self.a == self.d {
                TransformClass::ScaleUniform
            } else {
                TransformClass::ScaleAny
            };
        }
        if self.a == self.d && self.b == -self.c {
            return TransformClass::Rotation;
        }
        TransformClass::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_apply() {
        let p = Point::from_int(7, -3);
        assert_eq!(Affine::IDENTITY.apply(p), p);
    }

    #[test]
    fn test_translation_then_scale() {
        let m = Affine::translation_int(1, 2).then(&Affine::scale(2.0, 2.0));
        let p = m.apply(Point::from_int(3, 4));
        assert_eq!(p.x.floor(), 8);
        assert_eq!(p.y.floor(), 12);
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let m = Affine::rotation_scale(std::f32::consts::FRAC_PI_2, 1.0, 1.0);
        let p = m.apply(Point::from_int(1, 0));
        assert_relative_eq!(p.x.to_f32(), 0.0, epsilon = 1e-3);
        assert_relative_eq!(p.y.to_f32(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_invert_roundtrip() {
        let m = Affine::rotation_scale(0.3, 1.5, 0.75).then(&Affine::translation_int(10, -4));
        let inv = m.invert().unwrap();
        let p = Point::from_int(5, 9);
        let back = inv.apply(m.apply(p));
        assert_relative_eq!(back.x.to_f32(), 5.0, epsilon = 0.01);
        assert_relative_eq!(back.y.to_f32(), 9.0, epsilon = 0.01);
    }

    #[test]
    fn test_invert_singular() {
        let m = Affine::scale(0.0, 1.0);
        assert!(m.invert().is_none());
    }

    #[test]
    fn test_classify() {
        assert_eq!(Affine::IDENTITY.classify(), TransformClass::Identity);
        assert_eq!(
            Affine::translation_int(1, 0).classify(),
            TransformClass::Translation
        );
        assert_eq!(Affine::scale(2.0, 2.0).classify(), TransformClass::ScaleUniform);
        assert_eq!(Affine::scale(2.0, 3.0).classify(), TransformClass::ScaleAny);
        assert_eq!(
            Affine::rotation_scale(0.5, 1.0, 1.0).classify(),
            TransformClass::Rotation
        );
        let sheared = Affine::new(
            Fixed::ONE,
            Fixed::HALF,
            Fixed::ZERO,
            Fixed::ZERO,
            Fixed::ONE,
            Fixed::ZERO,
        );
        assert_eq!(sheared.classify(), TransformClass::General);
    }
}
