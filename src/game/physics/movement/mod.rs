//! Kinematic character controller.
//!
//! Each fixed tick a character is moved in a fixed order against the tick's
//! [`CollisionWorld`] snapshot:
//! - horizontal input is swept, stepping onto low obstacles or sliding along the rest;
//! - jump and gravity velocity are swept, stopping at floors and ceilings;
//! - one push out of any remaining overlap;
//! - five ground rays decide whether the character is grounded for the next tick.
//!
//! Queries sample the character slightly above its feet (see
//! [`MovementSettings::contact_offset`]) so a character standing on a floor is not reported as
//! touching it. The offset never leaks into [`CharacterState::position`].

use crate::game::physics::components::Collider;
use crate::game::physics::math::up_from_gravity;
use crate::game::physics::query::{
    DistanceHit, QueryContext, SweepHit, shape_distance_all, shape_distance_nearest,
    shape_sweep_all, shape_sweep_nearest,
};
use crate::game::physics::settings::MovementSettings;
use crate::game::physics::world::CollisionWorld;
use crate::{AppSystems, PausableSystems};
use bevy::prelude::*;
use bevy::tasks::{ComputeTaskPool, ParallelSliceMut, TaskPool};

pub mod ground;
pub mod horizontal;
pub mod penetration;
pub mod vertical;

use ground::detect_ground;
use horizontal::{HorizontalOutcome, resolve_horizontal};
use penetration::correct_penetration;
use vertical::{apply_drag, resolve_vertical};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        FixedUpdate,
        resolve_characters
            .in_set(AppSystems::Resolve)
            .in_set(PausableSystems),
    );
}

/// Pose, tunables and carried-over velocity of one kinematic character.
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
#[require(MovementInput)]
pub struct CharacterState {
    /// Feet position.
    pub position: Vec3,
    pub rotation: Quat,
    /// Constant per character. Its direction defines "down".
    pub gravity: Vec3,

    /// Planar speed cap in world units per second.
    pub max_speed: f32,
    /// Planar speed at full input magnitude.
    pub speed: f32,
    /// Initial jump speed.
    pub jump_strength: f32,
    /// Tallest obstacle the character walks onto without jumping.
    pub max_step: f32,
    /// Jump speed lost per second.
    pub drag: f32,

    pub current_direction: Vec3,
    pub current_magnitude: f32,
    pub jump_requested: bool,

    /// Extra planar displacement for the next tick, e.g. a knockback. Zeroed once consumed.
    pub horizontal_velocity: Vec3,
    pub jump_velocity: Vec3,
    pub is_grounded: bool,
}

impl CharacterState {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            max_speed: 7.5,
            speed: 5.0,
            jump_strength: 14.0,
            max_step: 0.35,
            drag: 10.0,
            current_direction: Vec3::ZERO,
            current_magnitude: 0.0,
            jump_requested: false,
            horizontal_velocity: Vec3::ZERO,
            jump_velocity: Vec3::ZERO,
            is_grounded: false,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_speed(mut self, speed: f32, max_speed: f32) -> Self {
        self.speed = speed;
        self.max_speed = max_speed;
        self
    }

    pub fn with_jump(mut self, jump_strength: f32, drag: f32) -> Self {
        self.jump_strength = jump_strength;
        self.drag = drag;
        self
    }

    pub fn with_max_step(mut self, max_step: f32) -> Self {
        self.max_step = max_step;
        self
    }

    pub fn with_grounded(mut self, is_grounded: bool) -> Self {
        self.is_grounded = is_grounded;
        self
    }

    /// Unit vector opposite to gravity.
    pub fn up(&self) -> Vec3 {
        up_from_gravity(self.gravity)
    }
}

impl Default for CharacterState {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

/// Input for the next tick, written by whatever drives the character.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Reflect)]
#[reflect(Component)]
pub struct MovementInput {
    /// Desired planar direction. Only its direction matters.
    pub direction: Vec3,
    /// Fraction of the character's speed to move at.
    pub magnitude: f32,
    /// Held jump. Jumps trigger once per grounded period no matter how long this is held.
    pub jump: bool,
}

impl MovementInput {
    pub fn new(direction: Vec3, magnitude: f32, jump: bool) -> Self {
        Self {
            direction,
            magnitude,
            jump,
        }
    }

    fn is_finite(&self) -> bool {
        self.direction.is_finite() && self.magnitude.is_finite()
    }
}

/// World queries on behalf of a single character, with its shape, orientation and filter
/// already bound.
#[derive(Clone, Copy)]
pub struct CharacterProbe<'a> {
    pub world: &'a CollisionWorld,
    pub collider: &'a Collider,
    pub rotation: Quat,
    pub ctx: QueryContext,
    pub settings: &'a MovementSettings,
}

impl CharacterProbe<'_> {
    fn sweep_all(&self, from: Vec3, to: Vec3) -> Vec<SweepHit> {
        shape_sweep_all(self.world, self.collider, self.rotation, from, to, self.ctx)
    }

    fn sweep_nearest(&self, from: Vec3, to: Vec3) -> Option<SweepHit> {
        shape_sweep_nearest(self.world, self.collider, self.rotation, from, to, self.ctx)
    }

    /// Sweep that treats any overlap at `from` as an immediate hit.
    fn step_probe(&self, from: Vec3, to: Vec3) -> Option<SweepHit> {
        let ctx = self.ctx.stopping_at_penetration();
        shape_sweep_nearest(self.world, self.collider, self.rotation, from, to, ctx)
    }

    fn distance_all(&self, at: Vec3, max_distance: f32) -> Vec<DistanceHit> {
        shape_distance_all(self.world, self.collider, at, self.rotation, max_distance, self.ctx)
    }

    fn distance_nearest(&self, at: Vec3, max_distance: f32) -> Option<DistanceHit> {
        shape_distance_nearest(self.world, self.collider, at, self.rotation, max_distance, self.ctx)
    }
}

/// Advances one character by `dt` seconds.
///
/// `entity` is the character's own collider in `world`, which queries skip.
pub fn tick(
    entity: Entity,
    state: &CharacterState,
    collider: &Collider,
    world: &CollisionWorld,
    dt: f32,
    input: MovementInput,
    settings: &MovementSettings,
) -> CharacterState {
    let mut next = state.clone();

    if !dt.is_finite() || dt < 0.0 || !input.is_finite() {
        warn!("Ignoring invalid movement input for {entity:?}: dt {dt}, {input:?}");
        next.jump_requested = false;
        next.horizontal_velocity = Vec3::ZERO;
        return next;
    }

    let up = next.up();
    next.current_direction = input
        .direction
        .reject_from_normalized(up)
        .try_normalize()
        .unwrap_or(Vec3::ZERO);
    next.current_magnitude = input.magnitude.max(0.0);
    next.jump_requested = input.jump;

    let probe = CharacterProbe {
        world,
        collider,
        rotation: next.rotation,
        ctx: QueryContext::moving_body(entity),
        settings,
    };
    let mut sample = next.position + up * settings.contact_offset;

    // Horizontal
    let planar_speed = (next.current_magnitude * next.speed).min(next.max_speed);
    let requested = next.horizontal_velocity + next.current_direction * planar_speed * dt;
    let horizontal = resolve_horizontal(&probe, sample, requested, up, next.max_step);
    if horizontal.outcome == HorizontalOutcome::Slide {
        debug!("{entity:?} sliding, kept {:?} of {requested:?}", horizontal.displacement);
    }
    next.position += horizontal.displacement;
    sample += horizontal.displacement;
    next.horizontal_velocity = Vec3::ZERO;

    // Vertical
    next.jump_velocity = apply_drag(next.jump_velocity, next.drag, dt, settings.drag_snap);
    if next.is_grounded && next.jump_requested && next.jump_velocity == Vec3::ZERO {
        next.jump_velocity = up * next.jump_strength;
        debug!("{entity:?} jumped");
    }
    next.jump_requested = false;

    let gravity_velocity = if next.is_grounded { Vec3::ZERO } else { next.gravity };
    let vertical = resolve_vertical(&probe, sample, next.jump_velocity, gravity_velocity, dt);
    next.position += vertical.displacement;
    sample += vertical.displacement;
    next.jump_velocity = vertical.jump_velocity;

    // Penetration
    let correction = correct_penetration(&probe, sample);
    next.position += correction;
    sample += correction;

    // Ground
    next.is_grounded = detect_ground(&probe, sample, up);
    if next.is_grounded && !state.is_grounded {
        debug!("{entity:?} landed at {:?}", next.position);
    }

    next
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchError {
    #[error(
        "Batch slices differ in length: {entities} entities, {states} states, {colliders} colliders, {inputs} inputs"
    )]
    LengthMismatch {
        entities: usize,
        states: usize,
        colliders: usize,
        inputs: usize,
    },
}

/// Ticks every character in parallel on the compute task pool. Slices are matched by index.
#[tracing::instrument(skip_all, fields(characters = states.len()))]
pub fn resolve_batch(
    entities: &[Entity],
    mut states: &mut [CharacterState],
    colliders: &[Collider],
    inputs: &[MovementInput],
    world: &CollisionWorld,
    dt: f32,
    settings: &MovementSettings,
) -> Result<(), BatchError> {
    let len = states.len();
    if entities.len() != len || colliders.len() != len || inputs.len() != len {
        return Err(BatchError::LengthMismatch {
            entities: entities.len(),
            states: len,
            colliders: colliders.len(),
            inputs: inputs.len(),
        });
    }
    if len == 0 {
        return Ok(());
    }

    let pool = ComputeTaskPool::get_or_init(TaskPool::default);
    let chunk_size = len.div_ceil(pool.thread_num().max(1));

    states.par_chunk_map_mut(pool, chunk_size, |chunk_index, chunk| {
        let start = chunk_index * chunk_size;
        for (i, state) in (start..).zip(chunk.iter_mut()) {
            *state = tick(entities[i], state, &colliders[i], world, dt, inputs[i], settings);
        }
    });

    Ok(())
}

fn resolve_characters(
    time: Res<Time>,
    world: Res<CollisionWorld>,
    settings: Res<MovementSettings>,
    mut characters: Query<(Entity, &mut CharacterState, &Collider, &MovementInput)>,
) {
    let dt = time.delta_secs();
    let world = world.into_inner();
    let settings = settings.into_inner();

    characters
        .par_iter_mut()
        .for_each(|(entity, mut state, collider, input)| {
            let next = tick(entity, &state, collider, world, dt, *input, settings);
            // Avoid flagging resting characters as changed.
            state.set_if_neq(next);
        });
}
