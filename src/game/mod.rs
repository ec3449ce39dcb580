//! Kinematic character movement and the headless demo level that exercises it.

use bevy::prelude::*;

pub mod character;
pub mod level;
pub mod physics;

pub(super) fn plugin(app: &mut App) {
    app.add_plugins((character::plugin, level::plugin, physics::plugin));
}
