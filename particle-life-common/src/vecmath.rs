use serde::{Deserialize, Serialize};
use std::ops::{AddAssign, Mul, Sub};

/// A simple 2D vector struct.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    /// Creates a new Vec2.
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// Creates a zero vector.
    pub fn zero() -> Self {
        Vec2 { x: 0.0, y: 0.0 }
    }

    /// Calculates the length (magnitude) of the vector.
    /// Uses `hypot` so tiny components do not underflow when squared.
    pub fn length(&self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Wraps both components into the unit torus `[0, 1)`.
    pub fn wrapped(&self) -> Self {
        Vec2 { x: wrap_unit(self.x), y: wrap_unit(self.y) }
    }

    /// Shortest displacement from `self` to `other` on the unit torus.
    pub fn min_image_to(&self, other: Vec2) -> Self {
        Vec2 {
            x: min_image(other.x - self.x),
            y: min_image(other.y - self.y),
        }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self { x: self.x * scalar, y: self.y * scalar }
    }
}

/// Wraps a coordinate into `[0, 1)`.
///
/// `rem_euclid` can round up to exactly `1.0` for tiny negative inputs, so that
/// case is folded back to `0.0`.
#[inline(always)]
pub fn wrap_unit(value: f32) -> f32 {
    let wrapped = value.rem_euclid(1.0);
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// Minimum-image correction of a single displacement component on the unit torus.
#[inline(always)]
pub fn min_image(delta: f32) -> f32 {
    if delta.abs() > 0.5 {
        delta - delta.signum()
    } else {
        delta
    }
}

/// Clamps a value between a minimum and maximum.
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}
