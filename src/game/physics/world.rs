//! Per-tick snapshot of every collider in the scene.
//!
//! The snapshot is rebuilt at the start of each fixed tick, before any character is
//! resolved, and is only read while characters are being moved.

use crate::game::physics::components::Collider;
use crate::game::physics::filter::CollisionFilter;
use crate::game::physics::movement::CharacterState;
use bevy::ecs::entity::EntityHashMap;
use bevy::prelude::*;
use parry3d::math::{Isometry, Real};

#[derive(Debug, Clone)]
pub struct WorldCollider {
    pub entity: Entity,
    pub collider: Collider,
    pub isometry: Isometry<Real>,
}

#[derive(Resource, Debug, Default)]
pub struct CollisionWorld {
    colliders: Vec<WorldCollider>,
    index: EntityHashMap<usize>,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `entity`'s collider at the given pose, replacing any previous entry for it.
    pub fn insert(&mut self, entity: Entity, collider: Collider, position: Vec3, rotation: Quat) {
        let entry = WorldCollider {
            entity,
            isometry: collider.isometry(position, rotation),
            collider,
        };

        if let Some(&existing) = self.index.get(&entity) {
            self.colliders[existing] = entry;
        } else {
            self.index.insert(entity, self.colliders.len());
            self.colliders.push(entry);
        }
    }

    pub fn clear(&mut self) {
        self.colliders.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn colliders(&self) -> impl Iterator<Item = &WorldCollider> {
        self.colliders.iter()
    }

    pub fn has_collider(&self, entity: Entity) -> bool {
        self.index.contains_key(&entity)
    }

    pub fn collider_of(&self, entity: Entity) -> Option<&WorldCollider> {
        self.index.get(&entity).map(|&i| &self.colliders[i])
    }
}

/// Publishes this tick's snapshot. Level geometry is posed by its `Transform`, characters by
/// their resolved state. Characters always enter as moving bodies, whatever filter their
/// collider carries, so they never block one another.
pub(super) fn build_collision_world(
    mut world: ResMut<CollisionWorld>,
    level_geometry: Query<(Entity, &Collider, &Transform), Without<CharacterState>>,
    characters: Query<(Entity, &Collider, &CharacterState)>,
) {
    world.clear();

    for (entity, collider, transform) in &level_geometry {
        world.insert(
            entity,
            collider.clone(),
            transform.translation,
            transform.rotation,
        );
    }

    for (entity, collider, state) in &characters {
        let collider = collider.clone().with_filter(CollisionFilter::MOVING_BODY);
        world.insert(entity, collider, state.position, state.rotation);
    }
}
