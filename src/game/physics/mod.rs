use crate::AppSystems;
use bevy::prelude::*;

pub mod components;
pub mod filter;
pub mod math;
pub mod movement;
pub mod query;
pub mod settings;
pub mod world;

pub(super) fn plugin(app: &mut App) {
    app.register_type::<settings::MovementSettings>();
    app.register_type::<movement::CharacterState>();
    app.register_type::<movement::MovementInput>();
    app.init_resource::<settings::MovementSettings>();
    app.init_resource::<world::CollisionWorld>();

    app.add_systems(
        FixedUpdate,
        world::build_collision_world.in_set(AppSystems::BuildWorld),
    );

    app.add_plugins(movement::plugin);
}
