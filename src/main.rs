//! Headless demo: runs the yard level at 60 Hz and logs what the player does.

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

fn main() -> AppExit {
    App::new()
        .add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 60.0,
            ))),
            LogPlugin {
                filter: "info,bevy_kinematic_character=debug".to_string(),
                ..default()
            },
            bevy_kinematic_character::plugin,
        ))
        .run()
}
