//! Spawn the demo level: a walled yard with a low step, a pillar and a pit, one patrolling
//! player and a couple of wandering NPCs.

use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::TAU;
use std::str::FromStr;

use crate::AppSystems;
use crate::game::character::{Locomotion, LocomotionEvent, character};
use crate::game::physics::components::Collider;
use crate::game::physics::filter::CollisionFilter;
use crate::game::physics::movement::{CharacterState, MovementInput};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, spawn_level);
    app.add_systems(
        FixedUpdate,
        (drive_patrols, drive_wanderers).in_set(AppSystems::RecordInput),
    );
    app.add_observer(report_player_locomotion);
}

pub const TILE_SIZE: f32 = 1.0;
pub const STEP_HEIGHT: f32 = 0.25;
pub const WALL_HEIGHT: f32 = 2.0;
const FLOOR_DEPTH: f32 = 0.5;

const ARRIVAL_DISTANCE: f32 = 0.2;

const LEVEL_LAYOUT: &str = "
    W,W,W,W,W,W,W,W,W,W,W,W
    W,F,F,F,F,F,F,F,F,F,F,W
    W,F,P,F,S,S,F,F,F,F,F,W
    W,F,F,F,F,F,F,F,F,F,F,W
    W,F,F,F,F,F,F,F,W,W,F,W
    W,N,F,F,_,_,F,F,F,F,F,W
    W,F,F,F,_,_,F,F,F,N,F,W
    W,W,W,W,W,W,W,W,W,W,W,W
";

/// Player route, in tile coordinates. The first leg crosses the step.
const PATROL_ROUTE: [(usize, usize); 4] = [(2, 2), (9, 2), (9, 3), (2, 3)];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LevelParseError {
    #[error("Invalid tile {0:?}")]
    InvalidTile(String),
    #[error("Row {row} has {found} tiles, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("Level is empty")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    Gap,
    Floor,
    Step,
    Wall,
    PlayerSpawn,
    NpcSpawn,
}

impl Tile {
    /// Top surface height, or `None` for a hole.
    fn height(self) -> Option<f32> {
        match self {
            Tile::Gap => None,
            Tile::Floor | Tile::PlayerSpawn | Tile::NpcSpawn => Some(0.0),
            Tile::Step => Some(STEP_HEIGHT),
            Tile::Wall => Some(WALL_HEIGHT),
        }
    }
}

impl FromStr for Tile {
    type Err = LevelParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "_" => Ok(Tile::Gap),
            "F" => Ok(Tile::Floor),
            "S" => Ok(Tile::Step),
            "W" => Ok(Tile::Wall),
            "P" => Ok(Tile::PlayerSpawn),
            "N" => Ok(Tile::NpcSpawn),
            other => Err(LevelParseError::InvalidTile(other.to_string())),
        }
    }
}

/// Tile grid, indexed `[z][x]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelLayout {
    rows: Vec<Vec<Tile>>,
}

impl FromStr for LevelLayout {
    type Err = LevelParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let rows = s
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.split(',').map(str::parse).collect())
            .collect::<Result<Vec<Vec<Tile>>, _>>()?;

        let expected = rows.first().map(Vec::len).ok_or(LevelParseError::Empty)?;
        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != expected)
        {
            return Err(LevelParseError::RaggedRow {
                row,
                found,
                expected,
            });
        }

        Ok(Self { rows })
    }
}

/// A box of level geometry covering a run of identical tiles within one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl LevelLayout {
    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize, Tile)> + '_ {
        self.rows.iter().enumerate().flat_map(|(z, row)| {
            row.iter().enumerate().map(move |(x, &tile)| (x, z, tile))
        })
    }

    pub fn spawns(&self, kind: Tile) -> impl Iterator<Item = Vec3> + '_ {
        self.tiles()
            .filter(move |&(_, _, tile)| tile == kind)
            .map(|(x, z, _)| tile_position(x, z))
    }

    /// Merges each row's runs of equal-height tiles into one box, so characters walking along
    /// a row do not cross seams.
    pub fn blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::new();

        for (z, row) in self.rows.iter().enumerate() {
            let mut start = 0;
            while start < row.len() {
                let height = row[start].height();
                let end = (start..row.len())
                    .find(|&x| row[x].height() != height)
                    .unwrap_or(row.len());

                if let Some(top) = height {
                    let bottom = -FLOOR_DEPTH;
                    let width = (end - start) as f32 * TILE_SIZE;
                    let center_x = (start as f32 - 0.5) * TILE_SIZE + width / 2.0;
                    blocks.push(Block {
                        center: Vec3::new(center_x, (top + bottom) / 2.0, z as f32 * TILE_SIZE),
                        half_extents: Vec3::new(width / 2.0, (top - bottom) / 2.0, TILE_SIZE / 2.0),
                    });
                }

                start = end;
            }
        }

        blocks
    }
}

pub fn tile_position(x: usize, z: usize) -> Vec3 {
    Vec3::new(x as f32, 0.0, z as f32) * TILE_SIZE
}

#[derive(Component, Debug, Clone, Reflect)]
pub struct LevelGeometry;

#[derive(Component, Debug, Clone, Reflect)]
pub struct Player;

/// Walks a closed route, jumping at every waypoint.
#[derive(Component, Debug, Clone, Reflect)]
pub struct Patrol {
    waypoints: Vec<Vec3>,
    next: usize,
}

impl Patrol {
    pub fn new(waypoints: Vec<Vec3>) -> Self {
        Self { waypoints, next: 0 }
    }
}

/// Picks a new random heading every time the timer finishes.
#[derive(Component, Debug, Clone, Reflect)]
pub struct Wander {
    timer: Timer,
    direction: Vec3,
    magnitude: f32,
}

impl Wander {
    pub fn new(interval: f32) -> Self {
        Self {
            timer: Timer::from_seconds(interval, TimerMode::Repeating),
            direction: Vec3::ZERO,
            magnitude: 0.0,
        }
    }
}

/// A system that spawns the main level.
pub fn spawn_level(mut commands: Commands) {
    let layout = match LEVEL_LAYOUT.parse::<LevelLayout>() {
        Ok(layout) => layout,
        Err(err) => {
            error!("Failed to parse level layout: {err}");
            return;
        }
    };

    let level = commands
        .spawn((Name::new("Level"), Transform::default()))
        .id();

    for block in layout.blocks() {
        let geometry = commands
            .spawn((
                Name::new("Block"),
                LevelGeometry,
                Collider::cuboid(block.half_extents).with_filter(CollisionFilter::STATIC_WORLD),
                Transform::from_translation(block.center),
            ))
            .id();
        commands.entity(level).add_child(geometry);
    }

    for position in layout.spawns(Tile::PlayerSpawn) {
        let route = PATROL_ROUTE
            .iter()
            .map(|&(x, z)| tile_position(x, z))
            .collect();
        commands.spawn((
            Player,
            Patrol::new(route),
            character(
                "Player",
                CharacterState::new(position),
                Collider::vertical_capsule(0.3, 1.8),
            ),
        ));
    }

    for (index, position) in layout.spawns(Tile::NpcSpawn).enumerate() {
        commands.spawn((
            Wander::new(1.5),
            character(
                format!("NPC {index}"),
                CharacterState::new(position).with_speed(2.5, 4.0),
                Collider::aabb(Vec3::new(0.5, 1.6, 0.5)),
            ),
        ));
    }

    info!("Level spawned with {} blocks", layout.blocks().len());
}

fn drive_patrols(mut query: Query<(&mut Patrol, &CharacterState, &mut MovementInput)>) {
    for (mut patrol, state, mut input) in &mut query {
        let Some(&target) = patrol.waypoints.get(patrol.next) else {
            *input = MovementInput::default();
            continue;
        };

        let to_target = (target - state.position).reject_from_normalized(state.up());
        let arrived = to_target.length() < ARRIVAL_DISTANCE;
        if arrived {
            patrol.next = (patrol.next + 1) % patrol.waypoints.len();
        }

        *input = MovementInput::new(to_target, 1.0, arrived);
    }
}

fn drive_wanderers(time: Res<Time>, mut query: Query<(&mut Wander, &mut MovementInput)>) {
    let mut rng = rand::rng();

    for (mut wander, mut input) in &mut query {
        if wander.timer.tick(time.delta()).just_finished() {
            let heading = rng.random_range(0.0..TAU);
            wander.direction = Vec3::new(heading.cos(), 0.0, heading.sin());
            wander.magnitude = rng.random_range(0.3..1.0);
        }

        *input = MovementInput::new(wander.direction, wander.magnitude, false);
    }
}

fn report_player_locomotion(
    event: On<LocomotionEvent>,
    players: Query<&CharacterState, With<Player>>,
) {
    let Ok(state) = players.get(event.event_target()) else {
        return;
    };

    match event.new_state() {
        Locomotion::Airborne => info!("Player left the ground at {:.2}", state.position),
        other => info!("Player is {other:?} at {:.2}", state.position),
    }
}
