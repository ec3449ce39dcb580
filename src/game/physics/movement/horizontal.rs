//! Planar movement: step over low obstacles, slide along everything else.

use super::CharacterProbe;
use crate::game::physics::math::is_near_zero;
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HorizontalOutcome {
    /// Nothing was requested.
    Stationary,
    /// The path was clear.
    Clear,
    /// Lifted onto an obstacle no taller than the character's max step.
    StepUp { lift: f32 },
    /// Pushed back out of whatever the target pose overlaps.
    Slide,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalMove {
    pub displacement: Vec3,
    pub outcome: HorizontalOutcome,
}

impl HorizontalMove {
    const STATIONARY: Self = Self {
        displacement: Vec3::ZERO,
        outcome: HorizontalOutcome::Stationary,
    };
}

/// Resolves `requested`, a displacement in the movement plane, from the sample point `from`.
pub fn resolve_horizontal(
    probe: &CharacterProbe,
    from: Vec3,
    requested: Vec3,
    up: Vec3,
    max_step: f32,
) -> HorizontalMove {
    let settings = probe.settings;
    if is_near_zero(requested, settings.movement_epsilon) {
        return HorizontalMove::STATIONARY;
    }

    let target = from + requested;
    if probe.sweep_all(from, target).is_empty() {
        return HorizontalMove {
            displacement: requested,
            outcome: HorizontalOutcome::Clear,
        };
    }

    // Drop onto the target from one step above it. A raised pose that is already blocked
    // means the obstacle is taller than a step.
    let fraction = probe
        .step_probe(target + up * max_step, target)
        .map_or(1.0, |hit| hit.fraction);

    if fraction > settings.movement_epsilon {
        let lift = max_step * (1.0 - fraction);
        debug!("Stepping up {lift:.3} onto obstacle");
        return HorizontalMove {
            displacement: requested + up * lift,
            outcome: HorizontalOutcome::StepUp { lift },
        };
    }

    let displacement = probe
        .distance_all(target, settings.slide_query_distance)
        .into_iter()
        .filter(|hit| hit.distance < 0.0)
        .fold(requested, |displacement, hit| {
            displacement + hit.surface_normal * -hit.distance
        });

    HorizontalMove {
        displacement,
        outcome: HorizontalOutcome::Slide,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::components::Collider;
    use crate::game::physics::filter::CollisionFilter;
    use crate::game::physics::query::QueryContext;
    use crate::game::physics::settings::MovementSettings;
    use crate::game::physics::world::CollisionWorld;

    const MAX_STEP: f32 = 0.3;

    fn character() -> Entity {
        Entity::from_raw_u32(100).unwrap()
    }

    fn solid(half_extents: Vec3) -> Collider {
        Collider::cuboid(half_extents).with_filter(CollisionFilter::STATIC_WORLD)
    }

    /// Floor top at y = 0 and a block of the given height whose near face is at x = 0.5.
    fn create_test_world(block_height: f32) -> CollisionWorld {
        let mut world = CollisionWorld::new();
        world.insert(
            Entity::from_raw_u32(1).unwrap(),
            solid(Vec3::new(10.0, 0.5, 10.0)),
            Vec3::new(0.0, -0.5, 0.0),
            Quat::IDENTITY,
        );
        world.insert(
            Entity::from_raw_u32(2).unwrap(),
            solid(Vec3::new(1.0, block_height / 2.0, 5.0)),
            Vec3::new(1.5, block_height / 2.0, 0.0),
            Quat::IDENTITY,
        );
        world
    }

    fn resolve(world: &CollisionWorld, collider: &Collider, from: Vec3, requested: Vec3) -> HorizontalMove {
        let settings = MovementSettings::default();
        let probe = CharacterProbe {
            world,
            collider,
            rotation: Quat::IDENTITY,
            ctx: QueryContext::moving_body(character()),
            settings: &settings,
        };
        resolve_horizontal(&probe, from, requested, Vec3::Y, MAX_STEP)
    }

    #[test]
    fn test_tiny_request_is_a_no_op() {
        let world = create_test_world(0.2);
        let collider = Collider::aabb(Vec3::new(0.6, 1.8, 0.6));

        let result = resolve(&world, &collider, Vec3::ZERO, Vec3::new(5e-5, 0.0, -5e-5));
        assert_eq!(result, HorizontalMove::STATIONARY);
    }

    #[test]
    fn test_clear_path_is_unchanged() {
        let world = create_test_world(0.2);
        let collider = Collider::aabb(Vec3::new(0.6, 1.8, 0.6));
        let requested = Vec3::new(0.0, 0.0, 0.5);

        let result = resolve(&world, &collider, Vec3::ZERO, requested);
        assert_eq!(result.outcome, HorizontalOutcome::Clear);
        assert_eq!(result.displacement, requested);
    }

    #[test]
    fn test_low_block_is_stepped_onto() {
        let world = create_test_world(0.2);
        let collider = Collider::aabb(Vec3::new(0.6, 1.8, 0.6));

        // Box face at x = 0.3 moves 0.3 into the block.
        let result = resolve(&world, &collider, Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0));
        let HorizontalOutcome::StepUp { lift } = result.outcome else {
            panic!("expected a step, got {result:?}");
        };
        assert!((lift - 0.2).abs() < 1e-3, "lift {lift}");
        assert!((result.displacement - Vec3::new(0.5, 0.2, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_tall_block_stops_forward_motion() {
        let world = create_test_world(0.5);
        let collider = Collider::aabb(Vec3::new(0.6, 1.8, 0.6));

        let result = resolve(&world, &collider, Vec3::ZERO, Vec3::new(0.4, 0.0, 0.0));
        assert_eq!(result.outcome, HorizontalOutcome::Slide);
        assert!(
            (result.displacement.x - 0.2).abs() < 1e-3,
            "box face should stop at the block, moved {}",
            result.displacement.x
        );
        assert!(result.displacement.y.abs() < 1e-3);
    }

    #[test]
    fn test_slide_keeps_tangent_component() {
        let mut world = CollisionWorld::new();
        world.insert(
            Entity::from_raw_u32(3).unwrap(),
            solid(Vec3::new(0.5, 5.0, 10.0)),
            Vec3::new(0.95, 0.0, 0.0),
            Quat::IDENTITY,
        );
        let collider = Collider::vertical_capsule(0.4, 1.8);

        // Capsule surface 0.05 from the wall, pushed 0.2 into it and 0.3 along it.
        let result = resolve(&world, &collider, Vec3::ZERO, Vec3::new(0.2, 0.0, 0.3));
        assert_eq!(result.outcome, HorizontalOutcome::Slide);
        assert!((result.displacement.x - 0.05).abs() < 1e-3, "{result:?}");
        assert!((result.displacement.z - 0.3).abs() < 1e-4, "{result:?}");
        assert!(result.displacement.y.abs() < 1e-4, "{result:?}");
    }

    #[test]
    fn test_corner_combines_both_push_outs() {
        let mut world = CollisionWorld::new();
        world.insert(
            Entity::from_raw_u32(3).unwrap(),
            solid(Vec3::new(0.5, 5.0, 5.0)),
            Vec3::new(1.0, 0.0, 0.0),
            Quat::IDENTITY,
        );
        world.insert(
            Entity::from_raw_u32(4).unwrap(),
            solid(Vec3::new(5.0, 5.0, 0.5)),
            Vec3::new(0.0, 0.0, 1.0),
            Quat::IDENTITY,
        );
        let collider = Collider::vertical_capsule(0.4, 1.8);

        // Faces at x = 0.5 and z = 0.5, capsule surface 0.1 from each.
        let result = resolve(&world, &collider, Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.3, 0.0, 0.3));
        assert_eq!(result.outcome, HorizontalOutcome::Slide);
        assert!(
            (result.displacement - Vec3::new(0.1, 0.0, 0.1)).length() < 1e-3,
            "{result:?}"
        );
    }
}
