//! Grounded check from five short rays under the character's footprint.

use super::CharacterProbe;
use crate::game::physics::query::raycast_nearest;
use bevy::prelude::*;

/// Ray origins relative to the sample point: the centre, then left/right/forward/backward at a
/// fraction of the collider's horizontal half extents. The offsets turn with the character but
/// stay perpendicular to `up`.
pub fn footprint(probe: &CharacterProbe, up: Vec3) -> [Vec3; 5] {
    let half_extents = probe.collider.horizontal_half_extents() * probe.settings.footprint_fraction;
    let side = (probe.rotation * Vec3::X)
        .reject_from_normalized(up)
        .try_normalize()
        .unwrap_or_else(|| up.any_orthonormal_vector());
    let forward = side.cross(up);

    [
        Vec3::ZERO,
        -side * half_extents.x,
        side * half_extents.x,
        forward * half_extents.y,
        -forward * half_extents.y,
    ]
}

/// True when any footprint ray below the sample point `at` hits solid world.
pub fn detect_ground(probe: &CharacterProbe, at: Vec3, up: Vec3) -> bool {
    let settings = probe.settings;
    let lift = up * settings.ground_probe_lift;
    let reach = -up * (settings.ground_probe_lift + settings.ground_probe_distance);

    footprint(probe, up).into_iter().any(|offset| {
        let origin = at + offset + lift;
        raycast_nearest(probe.world, origin, origin + reach, probe.ctx).is_some()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::components::Collider;
    use crate::game::physics::filter::CollisionFilter;
    use crate::game::physics::query::QueryContext;
    use crate::game::physics::settings::MovementSettings;
    use crate::game::physics::world::CollisionWorld;

    /// Floor top at y = 0 spanning x from -10 up to `edge`.
    fn create_test_world(edge: f32) -> CollisionWorld {
        let mut world = CollisionWorld::new();
        world.insert(
            Entity::from_raw_u32(1).unwrap(),
            Collider::cuboid(Vec3::new((edge + 10.0) / 2.0, 0.5, 10.0))
                .with_filter(CollisionFilter::STATIC_WORLD),
            Vec3::new((edge - 10.0) / 2.0, -0.5, 0.0),
            Quat::IDENTITY,
        );
        world
    }

    fn grounded_at(world: &CollisionWorld, at: Vec3, rotation: Quat) -> bool {
        let collider = Collider::vertical_capsule(0.4, 1.8);
        let settings = MovementSettings::default();
        let probe = CharacterProbe {
            world,
            collider: &collider,
            rotation,
            ctx: QueryContext::moving_body(Entity::from_raw_u32(100).unwrap()),
            settings: &settings,
        };
        detect_ground(&probe, at, Vec3::Y)
    }

    #[test]
    fn test_standing_on_floor_is_grounded() {
        let world = create_test_world(10.0);
        assert!(grounded_at(&world, Vec3::ZERO, Quat::IDENTITY));
    }

    #[test]
    fn test_offset_ray_catches_ledge_corner() {
        // Centre ray misses, the -X ray at x = -0.3 lands on the floor.
        let world = create_test_world(-0.1);
        assert!(grounded_at(&world, Vec3::ZERO, Quat::IDENTITY));
    }

    #[test]
    fn test_all_rays_missing_is_airborne() {
        let world = create_test_world(-0.5);
        assert!(!grounded_at(&world, Vec3::ZERO, Quat::IDENTITY));
    }

    #[test]
    fn test_hovering_above_probe_range_is_airborne() {
        let world = create_test_world(10.0);
        assert!(!grounded_at(&world, Vec3::new(0.0, 0.05, 0.0), Quat::IDENTITY));
    }

    #[test]
    fn test_footprint_turns_with_character() {
        let world = create_test_world(-0.1);
        let collider = Collider::vertical_capsule(0.4, 1.8);
        let settings = MovementSettings::default();
        let probe = CharacterProbe {
            world: &world,
            collider: &collider,
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ctx: QueryContext::moving_body(Entity::from_raw_u32(100).unwrap()),
            settings: &settings,
        };

        let offsets = footprint(&probe, Vec3::Y);
        assert_eq!(offsets[0], Vec3::ZERO);
        // Local X now points along world -Z.
        assert!((offsets[2] - Vec3::new(0.0, 0.0, -0.3)).length() < 1e-5);
        // Backward ray swings round to world -X and still finds the ledge.
        assert!((offsets[4] - Vec3::new(-0.3, 0.0, 0.0)).length() < 1e-5);
        assert!(grounded_at(&world, Vec3::ZERO, probe.rotation));
    }

    #[test]
    fn test_footprint_stays_perpendicular_to_up() {
        let world = create_test_world(10.0);
        let collider = Collider::vertical_capsule(0.4, 1.8);
        let settings = MovementSettings::default();
        let probe = CharacterProbe {
            world: &world,
            collider: &collider,
            rotation: Quat::IDENTITY,
            ctx: QueryContext::moving_body(Entity::from_raw_u32(100).unwrap()),
            settings: &settings,
        };

        // Tilted gravity, and gravity along the character's own X axis.
        for up in [Vec3::new(1.0, 1.0, 0.0).normalize(), Vec3::X] {
            let offsets = footprint(&probe, up);
            for offset in &offsets[1..] {
                assert!(offset.dot(up).abs() < 1e-5, "{offset:?} leans along {up:?}");
                assert!((offset.length() - 0.3).abs() < 1e-5, "{offset:?}");
            }
            assert!(offsets[1].dot(offsets[3]).abs() < 1e-5);
        }
    }
}
