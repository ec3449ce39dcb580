use bevy::prelude::*;

pub mod game;

pub use game::physics::components::{Collider, ColliderError};
pub use game::physics::filter::{CollisionFilter, layers};
pub use game::physics::movement::{BatchError, CharacterState, MovementInput, resolve_batch, tick};
pub use game::physics::settings::MovementSettings;
pub use game::physics::world::CollisionWorld;

pub fn plugin(app: &mut App) {
    app.init_resource::<Pause>();

    // Order the fixed-tick phases: input is recorded, the collision snapshot is rebuilt, then
    // every character is resolved against it.
    app.configure_sets(
        FixedUpdate,
        (
            AppSystems::RecordInput,
            AppSystems::BuildWorld,
            AppSystems::Resolve,
            AppSystems::Update,
        )
            .chain(),
    );

    // Set up the `Pause` gate.
    app.configure_sets(FixedUpdate, PausableSystems.run_if(resource_equals(Pause(false))));

    app.add_plugins(game::plugin);
}

/// High-level groupings of systems for the app in the `FixedUpdate` schedule.
/// When adding a new variant, make sure to order it in the `configure_sets`
/// call above.
#[derive(SystemSet, Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum AppSystems {
    /// Record scripted or player input.
    RecordInput,
    /// Snapshot every collider for this tick.
    BuildWorld,
    /// Move characters.
    Resolve,
    /// Do everything else (consider splitting this into further variants).
    Update,
}

/// Whether or not the game is paused.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
#[reflect(Resource)]
pub struct Pause(pub bool);

/// A system set for systems that shouldn't run while the game is paused.
#[derive(SystemSet, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct PausableSystems;
