//! Gravity, jump impulses and drag.

use super::CharacterProbe;
use crate::game::physics::math::{is_near_zero, snap_small_components};
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalMove {
    pub displacement: Vec3,
    /// Jump velocity to carry into the next tick. Zeroed when the move hit a floor or ceiling.
    pub jump_velocity: Vec3,
}

/// Sweeps this tick's combined jump and gravity velocity from the sample point `from`.
///
/// `gravity_velocity` is expected to already be zero for grounded characters.
pub fn resolve_vertical(
    probe: &CharacterProbe,
    from: Vec3,
    jump_velocity: Vec3,
    gravity_velocity: Vec3,
    dt: f32,
) -> VerticalMove {
    let settings = probe.settings;
    let mut displacement = (jump_velocity + gravity_velocity) * dt;
    let mut jump_velocity = jump_velocity;

    if is_near_zero(displacement, settings.movement_epsilon) {
        return VerticalMove {
            displacement: Vec3::ZERO,
            jump_velocity,
        };
    }

    if !probe.sweep_all(from, from + displacement).is_empty()
        && let Some(contact) = probe.distance_nearest(from + displacement, 0.0)
        && contact.distance < -settings.vertical_penetration_tolerance
    {
        displacement -= contact.surface_normal * contact.distance;

        let fraction = probe
            .sweep_nearest(from, from + displacement)
            .map_or(1.0, |hit| hit.fraction);
        displacement *= fraction;
        jump_velocity = Vec3::ZERO;

        debug!(
            "Vertical move blocked {:.3} short, remaining {:.3}",
            -contact.distance,
            displacement.length()
        );
    }

    VerticalMove {
        displacement: snap_small_components(displacement, settings.movement_epsilon),
        jump_velocity,
    }
}

/// Decays `jump_velocity` by `drag * dt` without changing its direction.
pub fn apply_drag(jump_velocity: Vec3, drag: f32, dt: f32, snap: f32) -> Vec3 {
    let current = jump_velocity.length();
    if current < snap {
        return Vec3::ZERO;
    }

    let speed = (current - drag * dt).max(0.0);
    if speed < snap {
        Vec3::ZERO
    } else {
        jump_velocity / current * speed
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

    /// Floor top at y = 0, ceiling underside at y = 3.
    fn create_test_world() -> CollisionWorld {
        let mut world = CollisionWorld::new();
        let slab = Collider::cuboid(Vec3::new(10.0, 0.5, 10.0)).with_filter(CollisionFilter::STATIC_WORLD);
        world.insert(Entity::from_raw_u32(1).unwrap(), slab.clone(), Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY);
        world.insert(Entity::from_raw_u32(2).unwrap(), slab, Vec3::new(0.0, 3.5, 0.0), Quat::IDENTITY);
        world
    }

    fn resolve(from: Vec3, jump_velocity: Vec3, gravity_velocity: Vec3, dt: f32) -> VerticalMove {
        let world = create_test_world();
        let collider = Collider::vertical_capsule(0.4, 1.8);
        let settings = MovementSettings::default();
        let probe = CharacterProbe {
            world: &world,
            collider: &collider,
            rotation: Quat::IDENTITY,
            ctx: QueryContext::moving_body(Entity::from_raw_u32(100).unwrap()),
            settings: &settings,
        };
        resolve_vertical(&probe, from, jump_velocity, gravity_velocity, dt)
    }

    #[test]
    fn test_free_fall_is_unobstructed() {
        let result = resolve(Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO, Vec3::new(0.0, -9.81, 0.0), 0.1);
        assert!((result.displacement.y + 0.981).abs() < 1e-4);
        assert_eq!(result.jump_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_fall_stops_on_floor_and_cancels_jump() {
        let jump = Vec3::new(0.0, -2.0, 0.0);
        let result = resolve(Vec3::new(0.0, 0.3, 0.0), jump, Vec3::new(0.0, -9.81, 0.0), 0.1);
        assert!(
            (result.displacement.y + 0.3).abs() < 1e-3,
            "should land exactly on the floor, moved {}",
            result.displacement.y
        );
        assert_eq!(result.jump_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_jump_into_ceiling_is_shortened() {
        // Capsule top at 2.8, ceiling at 3.0.
        let result = resolve(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, 0.1);
        assert!((result.displacement.y - 0.2).abs() < 1e-3, "{result:?}");
        assert_eq!(result.jump_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_grounded_without_jump_does_not_move() {
        let result = resolve(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, 0.1);
        assert_eq!(result.displacement, Vec3::ZERO);
    }

    #[test]
    fn test_drag_preserves_direction() {
        let decayed = apply_drag(Vec3::new(0.0, 6.0, 8.0), 5.0, 0.2, 1e-3);
        assert!((decayed.length() - 9.0).abs() < 1e-5);
        assert!((decayed.normalize() - Vec3::new(0.0, 0.6, 0.8)).length() < 1e-5);
    }

    #[test]
    fn test_drag_snaps_to_zero() {
        assert_eq!(apply_drag(Vec3::Y * 0.5, 10.0, 0.1, 1e-3), Vec3::ZERO);
        assert_eq!(apply_drag(Vec3::Y * 1e-4, 0.0, 0.1, 1e-3), Vec3::ZERO);
    }

    #[test]
    fn test_drag_is_monotonic() {
        let mut velocity = Vec3::Y * 14.0;
        for _ in 0..100 {
            let next = apply_drag(velocity, 10.0, 1.0 / 60.0, 1e-3);
            assert!(next.length() <= velocity.length());
            velocity = next;
        }
        assert_eq!(velocity, Vec3::ZERO);
    }
}
