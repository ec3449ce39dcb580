use crate::AppSystems;
use crate::game::physics::components::Collider;
use crate::game::physics::filter::CollisionFilter;
use crate::game::physics::movement::{CharacterState, MovementInput};
use bevy::prelude::*;

pub fn plugin(app: &mut App) {
    app.register_type::<Locomotion>();

    app.add_systems(FixedUpdate, update_locomotion.in_set(AppSystems::Update));
    app.add_systems(PostUpdate, sync_transforms);
    app.add_observer(on_locomotion_change);
}

pub fn character(name: impl Into<String>, state: CharacterState, collider: Collider) -> impl Bundle {
    (
        Name::new(name.into()),
        Character,
        LocomotionContainer(Locomotion::Idle),
        // Physics
        Transform::from_translation(state.position).with_rotation(state.rotation),
        MovementInput::default(),
        state,
        collider.with_filter(CollisionFilter::MOVING_BODY),
    )
}

#[derive(Component, Debug, Clone, Reflect)]
pub struct Character;

#[derive(Component, Debug, Clone, Reflect)]
pub struct LocomotionContainer(pub Locomotion);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum Locomotion {
    Idle,
    Walking,
    Airborne,
}

impl Locomotion {
    pub fn of(state: &CharacterState) -> Self {
        if !state.is_grounded {
            Self::Airborne
        } else if state.current_magnitude > 0.0 && state.current_direction != Vec3::ZERO {
            Self::Walking
        } else {
            Self::Idle
        }
    }
}

#[derive(EntityEvent, Debug, Clone, Reflect)]
pub struct LocomotionEvent {
    entity: Entity,
    new_state: Locomotion,
    prev_state: Option<Locomotion>,
}

impl LocomotionEvent {
    pub fn new(entity: Entity, new_state: Locomotion) -> Self {
        Self {
            entity,
            new_state,
            prev_state: None,
        }
    }

    pub fn from_state(mut self, prev_state: Locomotion) -> Self {
        self.prev_state = Some(prev_state);
        self
    }

    pub fn new_state(&self) -> Locomotion {
        self.new_state
    }
}

fn update_locomotion(
    mut commands: Commands,
    query: Query<
        (Entity, &CharacterState, &LocomotionContainer),
        (With<Character>, Changed<CharacterState>),
    >,
) {
    for (entity, state, locomotion) in &query {
        let next = Locomotion::of(state);
        if next != locomotion.0 {
            commands.trigger(LocomotionEvent::new(entity, next).from_state(locomotion.0));
        }
    }
}

fn on_locomotion_change(
    event: On<LocomotionEvent>,
    mut query: Query<(&Name, &mut LocomotionContainer), With<Character>>,
) {
    let Ok((name, mut locomotion)) = query.get_mut(event.entity) else {
        return;
    };

    let prev_state = locomotion.0;

    if let Some(expected_prev_state) = event.prev_state
        && prev_state != expected_prev_state
    {
        warn!(
            "{name}: locomotion mismatch, expected {expected_prev_state:?}, got {prev_state:?}"
        );
        return;
    }

    debug!("{name}: {prev_state:?} -> {:?}", event.new_state);
    locomotion.0 = event.new_state;
}

/// Presentation hand-off: characters are drawn wherever their resolved state says.
fn sync_transforms(
    mut query: Query<(&CharacterState, &mut Transform), Changed<CharacterState>>,
) {
    for (state, mut transform) in &mut query {
        transform.translation = state.position;
        transform.rotation = state.rotation;
    }
}
