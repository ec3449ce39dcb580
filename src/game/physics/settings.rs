use bevy::prelude::*;

/// Tolerances shared by every character resolved in a tick.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct MovementSettings {
    /// Queries sample the character this far along "up" from its feet, so a character resting
    /// on a floor is not reported as touching it.
    pub contact_offset: f32,
    /// Displacements with every component below this are treated as zero.
    pub movement_epsilon: f32,
    /// Vertical moves only correct overlaps deeper than this.
    pub vertical_penetration_tolerance: f32,
    /// The end-of-tick correction only pushes out of overlaps deeper than this.
    pub penetration_threshold: f32,
    /// Search radius for the slide's distance query.
    pub slide_query_distance: f32,
    /// Ground rays start this far above the feet.
    pub ground_probe_lift: f32,
    /// How far below the feet a ground ray still counts as a hit.
    pub ground_probe_distance: f32,
    /// Offset ground rays sit at this fraction of the collider's horizontal half extents.
    pub footprint_fraction: f32,
    /// Jump speed below which drag snaps it to zero.
    pub drag_snap: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            contact_offset: 0.01,
            movement_epsilon: 1e-4,
            vertical_penetration_tolerance: 0.001,
            penetration_threshold: 0.005,
            slide_query_distance: 0.5,
            ground_probe_lift: 0.05,
            ground_probe_distance: 0.02,
            footprint_fraction: 0.75,
            drag_snap: 1e-3,
        }
    }
}
