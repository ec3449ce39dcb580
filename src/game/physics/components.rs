use crate::game::physics::filter::CollisionFilter;
use crate::game::physics::math::{to_isometry, to_point};
use bevy::prelude::*;
use parry3d::math::{Isometry, Real};
use parry3d::shape::{Shape, SharedShape};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ColliderError {
    #[error("Cannot build a convex hull from {} points", .0)]
    DegenerateHull(usize),
}

/// Collision shape attached to an entity.
///
/// The shape is placed relative to the entity's reference point: the box centre for
/// level geometry, the feet for characters. `offset` is the local translation from that
/// point to the shape's own origin.
#[derive(Component, Debug, Clone)]
pub struct Collider {
    shape: SharedShape,
    offset: Vec3,
    filter: CollisionFilter,
}

impl Collider {
    pub fn new(shape: SharedShape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            filter: CollisionFilter::DEFAULT,
        }
    }

    /// Box centred on the reference point.
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(SharedShape::cuboid(
            half_extents.x,
            half_extents.y,
            half_extents.z,
        ))
    }

    /// Box resting on the reference point.
    pub fn aabb(size: Vec3) -> Self {
        Self::cuboid(size / 2.0).with_offset(Vec3::Y * size.y / 2.0)
    }

    /// Sphere resting on the reference point.
    pub fn sphere(radius: f32) -> Self {
        Self::new(SharedShape::ball(radius)).with_offset(Vec3::Y * radius)
    }

    /// Upright capsule resting on the reference point. `height` includes both caps.
    pub fn vertical_capsule(radius: f32, mut height: f32) -> Self {
        if height < radius * 2.0 {
            height = radius * 2.0;
        }

        height -= radius * 2.0;

        Self::capsule(Vec3::Y * radius, Vec3::Y * (radius + height), radius)
    }

    pub fn capsule(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self::new(SharedShape::capsule(to_point(start), to_point(end), radius))
    }

    pub fn hull(mut points: Vec<Vec3>) -> Result<Self, ColliderError> {
        points.dedup();
        let vertices: Vec<_> = points.iter().copied().map(to_point).collect();

        SharedShape::convex_hull(&vertices)
            .map(Self::new)
            .ok_or(ColliderError::DegenerateHull(points.len()))
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn shape(&self) -> &dyn Shape {
        self.shape.as_ref()
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn filter(&self) -> CollisionFilter {
        self.filter
    }

    /// World pose of the shape for an entity at `position` with `rotation`.
    pub fn isometry(&self, position: Vec3, rotation: Quat) -> Isometry<Real> {
        to_isometry(position + rotation * self.offset, rotation)
    }

    /// Half extents of the shape's local bounding box on the entity's local X and Z axes.
    pub fn horizontal_half_extents(&self) -> Vec2 {
        let half_extents = self.shape.compute_local_aabb().half_extents();
        Vec2::new(half_extents.x, half_extents.z)
    }
}
