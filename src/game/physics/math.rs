//! Conversions between Bevy's glam types and the nalgebra types parry3d works in.

use bevy::prelude::*;
use parry3d::math::{Isometry, Point, Real, Vector};
use parry3d::na::{Quaternion, Translation3, UnitQuaternion};

pub fn to_vector(value: Vec3) -> Vector<Real> {
    Vector::new(value.x, value.y, value.z)
}

pub fn to_point(value: Vec3) -> Point<Real> {
    Point::new(value.x, value.y, value.z)
}

pub fn from_vector(value: &Vector<Real>) -> Vec3 {
    Vec3::new(value.x, value.y, value.z)
}

pub fn from_point(value: &Point<Real>) -> Vec3 {
    Vec3::new(value.x, value.y, value.z)
}

pub fn to_rotation(value: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(value.w, value.x, value.y, value.z))
}

pub fn to_isometry(translation: Vec3, rotation: Quat) -> Isometry<Real> {
    Isometry::from_parts(
        Translation3::new(translation.x, translation.y, translation.z),
        to_rotation(rotation),
    )
}

/// True when every component of `value` is within `epsilon` of zero.
pub fn is_near_zero(value: Vec3, epsilon: f32) -> bool {
    value.abs().max_element() <= epsilon
}

/// Zeroes every component whose magnitude is below `epsilon`.
pub fn snap_small_components(value: Vec3, epsilon: f32) -> Vec3 {
    Vec3::select(value.abs().cmplt(Vec3::splat(epsilon)), Vec3::ZERO, value)
}

/// Unit "up" for a gravity vector. Zero gravity falls back to +Y rather than normalizing.
pub fn up_from_gravity(gravity: Vec3) -> Vec3 {
    gravity.try_normalize().map(|down| -down).unwrap_or(Vec3::Y)
}
