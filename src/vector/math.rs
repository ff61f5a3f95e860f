//! # Geometry helpers
//!
//! Free functions on [`Vec2`] and scalars that the steering actions and the
//! flight integrator share: signed angles between directions and the smooth
//! interpolation ramp used for distance-dependent acceleration.

use super::Vec2;

/// Signed angle in radians from `a` to `b`, computed via
/// `atan2(perp_dot, dot)` and clamped to `[-max_rad, +max_rad]`.
///
/// Positive when `b` lies to the left of `a`. Both inputs may have arbitrary
/// (nonzero) length; only their directions matter.
#[inline]
pub fn rad_between_max(a: &Vec2, b: &Vec2, max_rad: f32) -> f32 {
    let c = a.perp_dot(b);
    let d = a.dot(b);
    c.atan2(d).clamp(-max_rad, max_rad)
}

/// Signed angle in radians from `a` to `b` in `[-π, +π]`.
#[inline]
pub fn rad_between(a: &Vec2, b: &Vec2) -> f32 {
    rad_between_max(a, b, std::f32::consts::PI)
}

/// Quintic fade `6x⁵ − 15x⁴ + 10x³`, the smootherstep polynomial on [0, 1].
#[inline]
pub fn fade(x: f32) -> f32 {
    x * x * x * (x * (x * 6.0 - 15.0) + 10.0)
}

/// Smootherstep ramp: 0 at `edge0` and below, 1 at `edge1` and above, with
/// zero first and second derivative at both edges.
#[inline]
pub fn smootherstep(x: f32, edge0: f32, edge1: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    fade(t)
}

/// Converts a field-of-view in degrees to the cosine threshold tested against
/// `dot(heading, offset) / |offset|`: a neighbor passes when the angle from
/// the heading is below half the field of view.
#[inline]
pub fn cos_half_fov(fov_deg: f32) -> f32 {
    (0.5 * fov_deg).to_radians().cos()
}
