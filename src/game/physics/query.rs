//! Raycast, shape-sweep and shape-distance queries against a [`CollisionWorld`].
//!
//! Every `*_all` query returns the hits that survive the [`QueryContext`]: the ignored
//! entity is dropped, as is any collider whose filter does not interact with the context's
//! filter. The `*_nearest` variants reduce that list and return `None` when it is empty.
//!
//! Surface normals always point out of the collider that was hit, towards the query.
//! Ties between equally near hits are broken arbitrarily.

use crate::game::physics::components::Collider;
use crate::game::physics::filter::CollisionFilter;
use crate::game::physics::math::{from_point, from_vector, to_point, to_vector};
use crate::game::physics::world::{CollisionWorld, WorldCollider};
use bevy::prelude::*;
use parry3d::math::{Isometry, Real, Vector};
use parry3d::query::{self, Contact, Ray, ShapeCastOptions, Unsupported};
use parry3d::shape::{Ball, Capsule, Shape};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    #[error("Collision backend cannot query against the shape of {:?}", .0)]
    Unsupported(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryContext {
    pub filter: CollisionFilter,
    pub ignore: Option<Entity>,
    /// Report any overlap at the start of a sweep as a hit at fraction 0. When unset, an
    /// initial contact is only reported if the motion pushes further into it.
    pub stop_at_penetration: bool,
}

impl QueryContext {
    pub fn new(filter: CollisionFilter) -> Self {
        Self {
            filter,
            ignore: None,
            stop_at_penetration: false,
        }
    }

    /// Solid-world queries on behalf of a moving `entity`.
    pub fn moving_body(entity: Entity) -> Self {
        Self::new(CollisionFilter::MOVING_BODY).ignoring(entity)
    }

    pub fn ignoring(mut self, entity: Entity) -> Self {
        self.ignore = Some(entity);
        self
    }

    pub fn stopping_at_penetration(mut self) -> Self {
        self.stop_at_penetration = true;
        self
    }

    fn accepts(&self, candidate: &WorldCollider) -> bool {
        self.ignore != Some(candidate.entity)
            && self.filter.can_collide(&candidate.collider.filter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    /// Position along the segment, in `[0, 1]`.
    pub fraction: f32,
    /// Distance from the ray origin.
    pub distance: f32,
    pub point: Vec3,
    pub surface_normal: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    pub entity: Entity,
    /// Position along the swept segment, in `[0, 1]`.
    pub fraction: f32,
    pub point: Vec3,
    pub surface_normal: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceHit {
    pub entity: Entity,
    /// Signed separation. Negative values are penetration depths.
    pub distance: f32,
    pub point: Vec3,
    pub surface_normal: Vec3,
}

//------ Raycasts ------//

pub fn raycast_all(world: &CollisionWorld, from: Vec3, to: Vec3, ctx: QueryContext) -> Vec<RayHit> {
    let segment = to - from;
    let length = segment.length();
    if length <= f32::EPSILON {
        return Vec::new();
    }

    let ray = Ray::new(to_point(from), to_vector(segment));

    world
        .colliders()
        .filter(|candidate| ctx.accepts(candidate))
        .filter_map(|candidate| {
            let hit = candidate.collider.shape().cast_ray_and_get_normal(
                &candidate.isometry,
                &ray,
                1.0,
                true,
            )?;

            Some(RayHit {
                entity: candidate.entity,
                fraction: hit.time_of_impact,
                distance: hit.time_of_impact * length,
                point: from + segment * hit.time_of_impact,
                surface_normal: from_vector(&hit.normal),
            })
        })
        .collect()
}

pub fn raycast_nearest(
    world: &CollisionWorld,
    from: Vec3,
    to: Vec3,
    ctx: QueryContext,
) -> Option<RayHit> {
    nearest_by_distance(raycast_all(world, from, to, ctx), |hit| hit.distance)
}

//------ Shape sweeps ------//

/// Sweeps `collider`, held at `rotation`, from reference point `from` to `to`.
pub fn try_shape_sweep_all(
    world: &CollisionWorld,
    collider: &Collider,
    rotation: Quat,
    from: Vec3,
    to: Vec3,
    ctx: QueryContext,
) -> Result<Vec<SweepHit>, QueryError> {
    sweep_candidates(world, collider, rotation, from, to, ctx)
        .filter_map(Result::transpose)
        .collect()
}

/// Like [`try_shape_sweep_all`], but skips colliders the backend cannot sweep against.
pub fn shape_sweep_all(
    world: &CollisionWorld,
    collider: &Collider,
    rotation: Quat,
    from: Vec3,
    to: Vec3,
    ctx: QueryContext,
) -> Vec<SweepHit> {
    sweep_candidates(world, collider, rotation, from, to, ctx)
        .filter_map(skip_unsupported)
        .collect()
}

pub fn shape_sweep_nearest(
    world: &CollisionWorld,
    collider: &Collider,
    rotation: Quat,
    from: Vec3,
    to: Vec3,
    ctx: QueryContext,
) -> Option<SweepHit> {
    nearest_by_distance(
        shape_sweep_all(world, collider, rotation, from, to, ctx),
        |hit| hit.fraction,
    )
}

fn sweep_candidates<'a>(
    world: &'a CollisionWorld,
    collider: &'a Collider,
    rotation: Quat,
    from: Vec3,
    to: Vec3,
    ctx: QueryContext,
) -> impl Iterator<Item = Result<Option<SweepHit>, QueryError>> + 'a {
    let start = collider.isometry(from, rotation);
    let motion = to_vector(to - from);
    let options = ShapeCastOptions {
        max_time_of_impact: 1.0,
        target_distance: 0.0,
        stop_at_penetration: ctx.stop_at_penetration,
        compute_impact_geometry_on_penetration: true,
    };

    world
        .colliders()
        .filter(move |candidate| ctx.accepts(candidate))
        .map(move |candidate| {
            let hit = query::cast_shapes(
                &start,
                &motion,
                collider.shape(),
                &candidate.isometry,
                &Vector::zeros(),
                candidate.collider.shape(),
                options,
            )
            .map_err(|_| QueryError::Unsupported(candidate.entity))?;

            Ok(hit.map(|hit| SweepHit {
                entity: candidate.entity,
                fraction: hit.time_of_impact,
                point: from_point(&(candidate.isometry * hit.witness2)),
                surface_normal: from_vector(&(candidate.isometry.rotation * hit.normal2.into_inner())),
            }))
        })
}

//------ Shape distance ------//

/// Signed distance from `collider`, placed at `position`/`rotation`, to every accepted
/// collider closer than `max_distance`.
pub fn try_shape_distance_all(
    world: &CollisionWorld,
    collider: &Collider,
    position: Vec3,
    rotation: Quat,
    max_distance: f32,
    ctx: QueryContext,
) -> Result<Vec<DistanceHit>, QueryError> {
    distance_candidates(world, collider, position, rotation, max_distance, ctx)
        .filter_map(Result::transpose)
        .collect()
}

/// Like [`try_shape_distance_all`], but skips colliders the backend cannot measure against.
pub fn shape_distance_all(
    world: &CollisionWorld,
    collider: &Collider,
    position: Vec3,
    rotation: Quat,
    max_distance: f32,
    ctx: QueryContext,
) -> Vec<DistanceHit> {
    distance_candidates(world, collider, position, rotation, max_distance, ctx)
        .filter_map(skip_unsupported)
        .collect()
}

pub fn shape_distance_nearest(
    world: &CollisionWorld,
    collider: &Collider,
    position: Vec3,
    rotation: Quat,
    max_distance: f32,
    ctx: QueryContext,
) -> Option<DistanceHit> {
    nearest_by_distance(
        shape_distance_all(world, collider, position, rotation, max_distance, ctx),
        |hit| hit.distance,
    )
}

fn distance_candidates<'a>(
    world: &'a CollisionWorld,
    collider: &'a Collider,
    position: Vec3,
    rotation: Quat,
    max_distance: f32,
    ctx: QueryContext,
) -> impl Iterator<Item = Result<Option<DistanceHit>, QueryError>> + 'a {
    let pose = collider.isometry(position, rotation);

    world
        .colliders()
        .filter(move |candidate| ctx.accepts(candidate))
        .map(move |candidate| {
            let other = candidate.collider.shape();
            let contact = match collider.shape().as_capsule() {
                Some(capsule) => {
                    capsule_contact(&pose, capsule, &candidate.isometry, other, max_distance)
                }
                None => query::contact(&pose, collider.shape(), &candidate.isometry, other, max_distance),
            }
            .map_err(|_| QueryError::Unsupported(candidate.entity))?;

            Ok(contact.map(|contact| DistanceHit {
                entity: candidate.entity,
                distance: contact.dist,
                point: from_point(&contact.point2),
                surface_normal: from_vector(&contact.normal2.into_inner()),
            }))
        })
}

const GOLDEN_SECTION: Real = 0.618_034;
const CORE_SEARCH_STEPS: usize = 32;

/// Contact between a capsule and `other`, reporting the deeper of two estimates.
///
/// The first is the contact of the capsule's core segment, less the radius. EPA on the rounded
/// capsule itself can report a deep overlap as touching, but the segment's Minkowski sum with
/// a convex shape is a polytope it handles well. The second is the deepest ball along the core
/// against a convex `other`, found by point projection. That depth can never exceed the true
/// one, so it catches any segment result that still comes back too shallow.
fn capsule_contact(
    pose: &Isometry<Real>,
    capsule: &Capsule,
    other_pose: &Isometry<Real>,
    other: &dyn Shape,
    prediction: Real,
) -> Result<Option<Contact>, Unsupported> {
    let radius = capsule.radius;
    let core = query::contact(pose, &capsule.segment, other_pose, other, prediction + radius)?
        .map(|mut contact| {
            contact.point1 += contact.normal1.into_inner() * radius;
            contact.dist -= radius;
            contact
        });

    if !other.is_convex() {
        return Ok(core);
    }

    let deepest = deepest_ball_contact(pose, capsule, other_pose, other, prediction)?;
    Ok(match (core, deepest) {
        (Some(core), Some(ball)) if ball.dist < core.dist => Some(ball),
        (core, ball) => core.or(ball),
    })
}

/// Signed distance to a convex shape is convex along a segment, so a golden-section search
/// over the capsule's core finds its deepest point.
fn deepest_ball_contact(
    pose: &Isometry<Real>,
    capsule: &Capsule,
    other_pose: &Isometry<Real>,
    other: &dyn Shape,
    prediction: Real,
) -> Result<Option<Contact>, Unsupported> {
    let a = pose * capsule.segment.a;
    let b = pose * capsule.segment.b;
    let at = |t: Real| a + (b - a) * t;
    let signed_distance = |t: Real| {
        let point = at(t);
        let projection = other.project_point(other_pose, &point, false);
        let distance = (projection.point - point).norm();
        if projection.is_inside { -distance } else { distance }
    };

    let (mut lo, mut hi) = (0.0, 1.0);
    for _ in 0..CORE_SEARCH_STEPS {
        let left = hi - (hi - lo) * GOLDEN_SECTION;
        let right = lo + (hi - lo) * GOLDEN_SECTION;
        if signed_distance(left) <= signed_distance(right) {
            hi = right;
        } else {
            lo = left;
        }
    }

    let deepest = [0.0, 1.0, (lo + hi) / 2.0]
        .into_iter()
        .map(|t| (t, signed_distance(t)))
        .min_by(|x, y| x.1.total_cmp(&y.1))
        .map_or(0.0, |(t, _)| t);

    let mut center = *pose;
    center.translation.vector = at(deepest).coords;
    query::contact(&center, &Ball::new(capsule.radius), other_pose, other, prediction)
}

//------ Reduction ------//

fn skip_unsupported<T>(result: Result<Option<T>, QueryError>) -> Option<T> {
    match result {
        Ok(hit) => hit,
        Err(err) => {
            warn!("Skipping collider in query: {err}");
            None
        }
    }
}

/// The hit with the smallest key. Sweep fractions and signed distances both reduce this way.
pub fn nearest_by_distance<T>(hits: Vec<T>, key: impl Fn(&T) -> f32) -> Option<T> {
    hits.into_iter().min_by(|a, b| key(a).total_cmp(&key(b)))
}
