use super::CharacterProbe;
use bevy::prelude::*;

/// Displacement that pushes the character at sample point `at` out of its deepest overlap, or
/// zero when that overlap is within the threshold. A single step, no iteration.
pub fn correct_penetration(probe: &CharacterProbe, at: Vec3) -> Vec3 {
    let Some(contact) = probe.distance_nearest(at, 0.0) else {
        return Vec3::ZERO;
    };

    if contact.distance >= -probe.settings.penetration_threshold {
        return Vec3::ZERO;
    }

    debug!(
        "Correcting {:.3} penetration into {:?}",
        -contact.distance, contact.entity
    );
    contact.surface_normal * -contact.distance
}
