//! Bitmask collision layers.
//!
//! Two filters interact when each one's `belongs_to` overlaps the other's
//! `collides_with`. A shared non-zero `group_index` overrides the masks:
//! positive groups always collide, negative groups never do.

use bevy::prelude::*;

pub mod layers {
    pub const NONE: u32 = 0;
    /// Level geometry that never moves.
    pub const STATIC: u32 = 1 << 0;
    /// Moving props and platforms.
    pub const DYNAMIC: u32 = 1 << 1;
    pub const TERRAIN: u32 = 1 << 2;
    /// Sensors. Nothing solid collides with these.
    pub const TRIGGER_VOLUME: u32 = 1 << 3;
    pub const CHARACTER: u32 = 1 << 4;

    /// Everything a moving body should be stopped by.
    pub const SOLID_WORLD: u32 = STATIC | DYNAMIC | TERRAIN;
    pub const ALL: u32 = u32::MAX;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub struct CollisionFilter {
    pub belongs_to: u32,
    pub collides_with: u32,
    pub group_index: i32,
}

impl CollisionFilter {
    pub const DEFAULT: Self = Self::new(layers::STATIC, layers::ALL);

    /// Level geometry: solid to everything except trigger volumes.
    pub const STATIC_WORLD: Self = Self::new(layers::STATIC, layers::ALL & !layers::TRIGGER_VOLUME);

    /// The filter every movement query runs with. Characters only see solid world, so they
    /// never block each other.
    pub const MOVING_BODY: Self = Self::new(layers::CHARACTER, layers::SOLID_WORLD);

    pub const fn new(belongs_to: u32, collides_with: u32) -> Self {
        Self {
            belongs_to,
            collides_with,
            group_index: 0,
        }
    }

    pub const fn with_group(mut self, group_index: i32) -> Self {
        self.group_index = group_index;
        self
    }

    pub fn can_collide(&self, other: &Self) -> bool {
        if self.group_index != 0 && self.group_index == other.group_index {
            return self.group_index > 0;
        }

        (self.belongs_to & other.collides_with) != 0 && (other.belongs_to & self.collides_with) != 0
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_body_hits_solid_world() {
        let wall = CollisionFilter::STATIC_WORLD;
        let terrain = CollisionFilter::new(layers::TERRAIN, layers::ALL);
        assert!(CollisionFilter::MOVING_BODY.can_collide(&wall));
        assert!(CollisionFilter::MOVING_BODY.can_collide(&terrain));
    }

    #[test]
    fn test_characters_ignore_each_other() {
        let other = CollisionFilter::MOVING_BODY;
        assert!(!CollisionFilter::MOVING_BODY.can_collide(&other));
    }

    #[test]
    fn test_trigger_volumes_are_not_solid() {
        let trigger = CollisionFilter::new(layers::TRIGGER_VOLUME, layers::CHARACTER);
        assert!(!CollisionFilter::MOVING_BODY.can_collide(&trigger));
    }

    #[test]
    fn test_check_is_symmetric() {
        let a = CollisionFilter::new(layers::DYNAMIC, layers::STATIC);
        let b = CollisionFilter::new(layers::STATIC, layers::CHARACTER);
        assert_eq!(a.can_collide(&b), b.can_collide(&a));
        assert!(!a.can_collide(&b));
    }

    #[test]
    fn test_group_overrides_masks() {
        let a = CollisionFilter::new(layers::DYNAMIC, layers::NONE).with_group(3);
        let b = CollisionFilter::new(layers::DYNAMIC, layers::NONE).with_group(3);
        assert!(a.can_collide(&b), "positive group forces collision");

        let c = CollisionFilter::STATIC_WORLD.with_group(-2);
        let d = CollisionFilter::MOVING_BODY.with_group(-2);
        assert!(!c.can_collide(&d), "negative group forbids collision");

        let e = CollisionFilter::STATIC_WORLD.with_group(-2);
        let f = CollisionFilter::MOVING_BODY.with_group(5);
        assert!(e.can_collide(&f), "different groups fall back to masks");
    }
}
