//! # 2-D Vector Mathematics Module
//!
//! This module provides the planar vector type used throughout the simulation
//! for positions, headings, velocities and steering forces. `Vec2` is a small
//! `Copy` struct with single-precision components; the operator overloads live
//! in [`ops`] and the geometry helpers (rotation, signed angles, smooth
//! interpolation) in [`math`].
//!
//! ## Example Usage
//! ```
//! use torusflock::vector::Vec2;
//!
//! let position = Vec2::new(10.0, 5.0);
//! let heading = Vec2::new(0.0, 1.0);
//!
//! let ahead = position + heading * 2.0;
//! assert_eq!(ahead, Vec2::new(10.0, 7.0));
//!
//! // perp() rotates a vector by +90 degrees; used for lateral forces.
//! assert_eq!(heading.perp(), Vec2::new(-1.0, 0.0));
//! ```

// Numerical operator implementations
pub mod ops;
// Geometry helpers: angles, rotation, interpolation
pub mod math;
// Unit tests
pub mod tests;

/// A 2-D vector in Cartesian coordinates.
///
/// Components are `f32`: the model state (positions on a kilometre-scale
/// torus, unit headings, forces of a few Newton) never needs more precision,
/// and the neighbor tables keyed on squared `f32` distances stay compact.
#[derive(Default, Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vec2 {
    /// X-component of the vector
    pub x: f32,
    /// Y-component of the vector
    pub y: f32,
}

impl Vec2 {
    /// Creates a new vector from its components.
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// The zero vector; additive identity and the reset value of every
    /// steering accumulator.
    pub fn zero() -> Self {
        Vec2 { x: 0.0, y: 0.0 }
    }

    /// Unit vector along the positive x-axis, the default agent heading.
    pub fn x_hat() -> Self {
        Vec2::new(1.0, 0.0)
    }

    /// Unit vector along the positive y-axis.
    pub fn y_hat() -> Self {
        Vec2::new(0.0, 1.0)
    }

    /// Dot product with another vector.
    #[inline]
    pub fn dot(&self, other: &Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// The vector rotated by +90°: `(-y, x)`.
    ///
    /// For a unit heading this is the left-lateral direction, so lateral
    /// steering forces are multiples of `dir.perp()`.
    #[inline]
    pub fn perp(&self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    /// Perp-dot product (2-D cross product): `self.perp() · other`.
    ///
    /// Positive when `other` lies to the left of `self`.
    #[inline]
    pub fn perp_dot(&self, other: &Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Squared Euclidean length.
    #[inline]
    pub fn norm2(&self) -> f32 {
        self.dot(self)
    }

    /// Euclidean length.
    #[inline]
    pub fn norm(&self) -> f32 {
        self.norm2().sqrt()
    }

    /// Returns the unit vector in this direction, or `fallback` when the
    /// length is (numerically) zero. NaN components fail the length test and
    /// fall back as well.
    #[inline]
    pub fn safe_normalize(&self, fallback: Vec2) -> Vec2 {
        let len2 = self.norm2();
        if len2 > 1.0e-7 { *self / len2.sqrt() } else { fallback }
    }

    /// Rotates the vector by `rad` radians (counter-clockwise).
    #[inline]
    pub fn rotate(&self, rad: f32) -> Vec2 {
        let (s, c) = rad.sin_cos();
        Vec2::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }
}
