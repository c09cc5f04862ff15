//! Level layouts, population, the win / fail check and level reset.

use crate::collision::CollisionController;
use crate::config::LumiaConfig;
use crate::constants::FALL_FLOOR_Y;
use crate::enemy::spawn_enemy;
use crate::error::{LumiaError, LumiaResult};
use crate::lumia::{spawn_lumia, LumiaBody, LumiaSpawn};
use crate::pathfinding::{OccupancyGrid, PathfindingClock};
use crate::props::{
    spawn_button_with_door, spawn_energy, spawn_ground, spawn_plant, spawn_spike,
    spawn_sticky_wall, Door, DoorKind, Plant,
};
use crate::scene::avatar::Avatar;
use crate::size_level::checked_size_level;
use bevy::prelude::*;
use serde::Deserialize;

/// Level file loaded at startup, relative to the working directory.
pub const LEVEL_PATH: &str = "assets/levels/level_01.toml";

/// Marker for everything a level reset despawns.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct LevelEntity;

// ── Layout ────────────────────────────────────────────────────────────────────

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RectSpec {
    pub center: [f32; 2],
    pub half_extents: [f32; 2],
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LumiaSpec {
    pub pos: [f32; 2],
    pub size_level: usize,
    #[serde(default)]
    pub is_avatar: bool,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct EnemySpec {
    pub pos: [f32; 2],
    pub size_level: usize,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct StickyWallSpec {
    pub center: [f32; 2],
    pub half_extents: [f32; 2],
    /// Outward wall normal.
    pub normal: [f32; 2],
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct DoorSpec {
    pub center: [f32; 2],
    pub half_extents: [f32; 2],
    #[serde(default)]
    pub kind: DoorKind,
    #[serde(default)]
    pub open_offset: [f32; 2],
    #[serde(default)]
    pub normally_open: bool,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ButtonSpec {
    pub pos: [f32; 2],
    pub door: DoorSpec,
}

/// Initial placement of everything in a level.
#[derive(Resource, Deserialize, Debug, Clone, PartialEq)]
pub struct LevelLayout {
    #[serde(default)]
    pub name: String,
    /// World rectangle covered by the occupancy grid.
    pub bounds_min: [f32; 2],
    pub bounds_max: [f32; 2],
    #[serde(default = "default_fall_floor_y")]
    pub fall_floor_y: f32,
    #[serde(default)]
    pub tiles: Vec<RectSpec>,
    pub lumias: Vec<LumiaSpec>,
    #[serde(default)]
    pub enemies: Vec<EnemySpec>,
    #[serde(default)]
    pub plants: Vec<[f32; 2]>,
    #[serde(default)]
    pub spikes: Vec<RectSpec>,
    #[serde(default)]
    pub energy: Vec<[f32; 2]>,
    #[serde(default)]
    pub sticky_walls: Vec<StickyWallSpec>,
    #[serde(default)]
    pub buttons: Vec<ButtonSpec>,
}

fn default_fall_floor_y() -> f32 {
    FALL_FLOOR_Y
}

impl Default for LevelLayout {
    fn default() -> Self {
        Self::demo()
    }
}

fn v(a: [f32; 2]) -> Vec2 {
    Vec2::from_array(a)
}

impl LevelLayout {
    /// Built-in level used when no level file is available.
    pub fn demo() -> Self {
        let rect = |center: [f32; 2], half_extents: [f32; 2]| RectSpec {
            center,
            half_extents,
        };
        Self {
            name: "demo".into(),
            bounds_min: [-640.0, -200.0],
            bounds_max: [960.0, 520.0],
            fall_floor_y: FALL_FLOOR_Y,
            tiles: vec![
                rect([0.0, -20.0], [500.0, 20.0]),
                rect([-520.0, 160.0], [20.0, 200.0]),
                rect([760.0, -20.0], [200.0, 20.0]),
                rect([250.0, 140.0], [80.0, 10.0]),
            ],
            lumias: vec![
                LumiaSpec {
                    pos: [-360.0, 30.0],
                    size_level: 3,
                    is_avatar: true,
                },
                LumiaSpec {
                    pos: [-240.0, 20.0],
                    size_level: 1,
                    is_avatar: false,
                },
            ],
            enemies: vec![EnemySpec {
                pos: [160.0, 60.0],
                size_level: 1,
            }],
            plants: vec![[250.0, 162.0], [860.0, 12.0]],
            spikes: vec![rect([420.0, 6.0], [30.0, 6.0])],
            energy: vec![[-120.0, 20.0], [40.0, 20.0]],
            sticky_walls: vec![StickyWallSpec {
                center: [-494.0, 160.0],
                half_extents: [6.0, 140.0],
                normal: [1.0, 0.0],
            }],
            buttons: vec![ButtonSpec {
                pos: [-60.0, 4.0],
                door: DoorSpec {
                    center: [620.0, 80.0],
                    half_extents: [12.0, 80.0],
                    kind: DoorKind::Sliding,
                    open_offset: [0.0, 150.0],
                    normally_open: false,
                },
            }],
        }
    }

    /// Reject layouts the game cannot start from.
    pub fn validate(&self) -> LumiaResult<()> {
        for level in self
            .lumias
            .iter()
            .map(|l| l.size_level)
            .chain(self.enemies.iter().map(|e| e.size_level))
        {
            checked_size_level(level)?;
        }
        let avatars = self.lumias.iter().filter(|l| l.is_avatar).count();
        if avatars != 1 {
            return Err(LumiaError::InvalidLayout {
                reason: format!("expected exactly one avatar Lumia, found {avatars}"),
            });
        }
        if self.bounds_min[0] >= self.bounds_max[0] || self.bounds_min[1] >= self.bounds_max[1] {
            return Err(LumiaError::InvalidLayout {
                reason: "bounds_min must be below bounds_max on both axes".into(),
            });
        }
        Ok(())
    }
}

/// Parse and validate a layout from TOML text.
pub fn parse_level_layout(contents: &str) -> LumiaResult<LevelLayout> {
    let layout: LevelLayout = toml::from_str(contents).map_err(|e| LumiaError::InvalidLayout {
        reason: e.to_string(),
    })?;
    layout.validate()?;
    Ok(layout)
}

pub fn load_level_layout(path: &str) -> LumiaResult<LevelLayout> {
    let contents = std::fs::read_to_string(path).map_err(|e| LumiaError::LevelLoad {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    parse_level_layout(&contents)
}

/// Startup system: replace the demo layout with [`LEVEL_PATH`] if it loads.
pub fn load_level_layout_system(mut layout: ResMut<LevelLayout>) {
    match load_level_layout(LEVEL_PATH) {
        Ok(loaded) => {
            info!("Loaded level '{}' from {LEVEL_PATH}", loaded.name);
            *layout = loaded;
        }
        Err(e) => warn!("{e}; using the built-in demo level"),
    }
}

// ── Population ────────────────────────────────────────────────────────────────

/// Spawn every entity of `layout` and rebuild the occupancy grid obstacles.
/// Returns the avatar entity.
pub fn populate_level(
    commands: &mut Commands,
    layout: &LevelLayout,
    grid: &mut OccupancyGrid,
    config: &LumiaConfig,
) -> Option<Entity> {
    grid.reset(config.path_cell_size, v(layout.bounds_min), v(layout.bounds_max));

    for tile in &layout.tiles {
        spawn_ground(commands, v(tile.center), v(tile.half_extents));
        grid.mark_obstacle_rect(v(tile.center), v(tile.half_extents));
    }
    for spike in &layout.spikes {
        spawn_spike(commands, v(spike.center), v(spike.half_extents));
        grid.mark_obstacle_rect(v(spike.center), v(spike.half_extents));
    }
    for wall in &layout.sticky_walls {
        spawn_sticky_wall(commands, v(wall.center), v(wall.half_extents), v(wall.normal));
    }
    for (index, pos) in layout.plants.iter().enumerate() {
        spawn_plant(commands, index, v(*pos));
    }
    for pos in &layout.energy {
        spawn_energy(commands, v(*pos));
    }
    for button in &layout.buttons {
        let spec = button.door;
        let door = Door::new(spec.kind, v(spec.center), v(spec.open_offset), spec.normally_open);
        spawn_button_with_door(commands, v(button.pos), door, v(spec.half_extents));
        grid.mark_obstacle_rect(v(spec.center), v(spec.half_extents));
    }
    for enemy in &layout.enemies {
        spawn_enemy(commands, v(enemy.pos), enemy.size_level);
    }

    let mut avatar = None;
    for lumia in &layout.lumias {
        let spawn = LumiaSpawn {
            position: v(lumia.pos),
            size_level: lumia.size_level,
            is_avatar: lumia.is_avatar,
            linvel: Vec2::ZERO,
            angvel: 0.0,
            spike_grace: 0,
        };
        let entity = spawn_lumia(commands, &spawn, config);
        if lumia.is_avatar {
            avatar = Some(entity);
        }
    }
    avatar
}

/// Startup system: populate the active layout.
pub fn populate_level_system(
    mut commands: Commands,
    layout: Res<LevelLayout>,
    config: Res<LumiaConfig>,
    mut grid: ResMut<OccupancyGrid>,
    mut avatar: ResMut<Avatar>,
) {
    avatar.entity = populate_level(&mut commands, &layout, &mut grid, &config);
    info!(
        "Populated level '{}': {} Lumia, {} enemies, {} plants",
        layout.name,
        layout.lumias.len(),
        layout.enemies.len(),
        layout.plants.len()
    );
}

// ── Win / fail ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelOutcome {
    #[default]
    Playing,
    Won,
    Failed,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct LevelStatus {
    pub outcome: LevelOutcome,
    /// Frames left before the level resets once decided.
    pub countdown: u32,
    pub reset_pending: bool,
    /// Number of resets so far.
    pub resets: u32,
}

/// Snapshot of everything the win / fail check looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSnapshot {
    pub plants_total: usize,
    pub plants_lit: usize,
    /// `None` when there is no avatar.
    pub avatar_y: Option<f32>,
    /// Live Lumia plus Lumia waiting to be created.
    pub lumia_count: usize,
    pub fall_floor_y: f32,
}

/// Win once every plant is lit; fail without an avatar, with the avatar below
/// the fall floor, or with no Lumia left.  A win takes precedence.
pub fn evaluate_level(snapshot: &LevelSnapshot) -> LevelOutcome {
    if snapshot.plants_total > 0 && snapshot.plants_lit == snapshot.plants_total {
        return LevelOutcome::Won;
    }
    let fell = snapshot.avatar_y.is_none_or(|y| y < snapshot.fall_floor_y);
    if fell || snapshot.lumia_count == 0 {
        return LevelOutcome::Failed;
    }
    LevelOutcome::Playing
}

/// Decide the level outcome and count down to the reset.
pub fn level_status_system(
    config: Res<LumiaConfig>,
    layout: Res<LevelLayout>,
    avatar: Res<Avatar>,
    controller: Res<CollisionController>,
    mut status: ResMut<LevelStatus>,
    q_lumia: Query<(&LumiaBody, &Transform)>,
    q_plants: Query<&Plant>,
) {
    if status.outcome != LevelOutcome::Playing {
        status.countdown = status.countdown.saturating_sub(1);
        if status.countdown == 0 {
            status.reset_pending = true;
        }
        return;
    }

    let snapshot = LevelSnapshot {
        plants_total: q_plants.iter().count(),
        plants_lit: q_plants.iter().filter(|p| p.is_lit).count(),
        avatar_y: avatar
            .entity
            .and_then(|e| q_lumia.get(e).ok())
            .map(|(_, transform)| transform.translation.y),
        lumia_count: q_lumia.iter().filter(|(body, _)| body.is_live()).count()
            + controller.batch.lumia_to_create.len(),
        fall_floor_y: layout.fall_floor_y,
    };

    let outcome = evaluate_level(&snapshot);
    match outcome {
        LevelOutcome::Playing => {}
        LevelOutcome::Won => {
            info!("Level '{}' complete", layout.name);
            status.countdown = config.win_countdown_frames;
        }
        LevelOutcome::Failed => {
            info!("Level '{}' failed", layout.name);
            status.countdown = config.fail_countdown_frames;
        }
    }
    status.outcome = outcome;
}

/// Tear the level down and populate it again once the countdown expires.
#[allow(clippy::too_many_arguments)]
pub fn level_reset_system(
    mut commands: Commands,
    config: Res<LumiaConfig>,
    layout: Res<LevelLayout>,
    mut status: ResMut<LevelStatus>,
    mut grid: ResMut<OccupancyGrid>,
    mut avatar: ResMut<Avatar>,
    mut controller: ResMut<CollisionController>,
    mut clock: ResMut<PathfindingClock>,
    q_level: Query<Entity, With<LevelEntity>>,
) {
    if !status.reset_pending {
        return;
    }
    for entity in q_level.iter() {
        commands.entity(entity).despawn();
    }
    controller.batch.clear();
    *clock = PathfindingClock::default();
    avatar.entity = populate_level(&mut commands, &layout, &mut grid, &config);

    let resets = status.resets + 1;
    *status = LevelStatus {
        resets,
        ..LevelStatus::default()
    };
    info!("Level '{}' reset ({resets})", layout.name);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> LevelSnapshot {
        LevelSnapshot {
            plants_total: 2,
            plants_lit: 1,
            avatar_y: Some(0.0),
            lumia_count: 1,
            fall_floor_y: -100.0,
        }
    }

    #[test]
    fn demo_layout_is_valid() {
        assert!(LevelLayout::demo().validate().is_ok());
    }

    #[test]
    fn layout_needs_exactly_one_avatar() {
        let mut layout = LevelLayout::demo();
        layout.lumias.iter_mut().for_each(|l| l.is_avatar = true);
        assert!(matches!(layout.validate(), Err(LumiaError::InvalidLayout { .. })));
        layout.lumias.clear();
        assert!(layout.validate().is_err());
    }

    #[test]
    fn layout_rejects_out_of_table_levels() {
        let mut layout = LevelLayout::demo();
        layout.enemies[0].size_level = 9;
        assert_eq!(
            layout.validate(),
            Err(LumiaError::SizeLevelOutOfRange { level: 9, max: 5 })
        );
    }

    #[test]
    fn minimal_toml_layout_parses() {
        let layout = parse_level_layout(
            r#"
            name = "tiny"
            bounds_min = [-100.0, -100.0]
            bounds_max = [100.0, 100.0]

            [[lumias]]
            pos = [0.0, 0.0]
            size_level = 2
            is_avatar = true

            [[buttons]]
            pos = [10.0, 0.0]
            door = { center = [50.0, 0.0], half_extents = [5.0, 20.0], kind = "Shrinking" }
            "#,
        )
        .expect("layout should parse");
        assert_eq!(layout.name, "tiny");
        assert_eq!(layout.fall_floor_y, FALL_FLOOR_Y);
        assert_eq!(layout.buttons[0].door.kind, DoorKind::Shrinking);
        assert!(!layout.buttons[0].door.normally_open);
    }

    #[test]
    fn missing_level_file_is_a_load_error() {
        let err = load_level_layout("assets/levels/does_not_exist.toml").unwrap_err();
        assert!(matches!(err, LumiaError::LevelLoad { .. }));
    }

    #[test]
    fn outcome_rules() {
        assert_eq!(evaluate_level(&snapshot()), LevelOutcome::Playing);
        assert_eq!(
            evaluate_level(&LevelSnapshot {
                plants_lit: 2,
                ..snapshot()
            }),
            LevelOutcome::Won
        );
        assert_eq!(
            evaluate_level(&LevelSnapshot {
                avatar_y: Some(-101.0),
                ..snapshot()
            }),
            LevelOutcome::Failed
        );
        assert_eq!(
            evaluate_level(&LevelSnapshot {
                avatar_y: None,
                ..snapshot()
            }),
            LevelOutcome::Failed
        );
        assert_eq!(
            evaluate_level(&LevelSnapshot {
                lumia_count: 0,
                ..snapshot()
            }),
            LevelOutcome::Failed
        );
    }

    #[test]
    fn a_level_without_plants_is_never_won() {
        let s = LevelSnapshot {
            plants_total: 0,
            plants_lit: 0,
            ..snapshot()
        };
        assert_eq!(evaluate_level(&s), LevelOutcome::Playing);
    }

    #[test]
    fn population_spawns_the_layout_and_returns_the_avatar() {
        let mut world = World::new();
        let layout = LevelLayout::demo();
        let config = LumiaConfig::default();
        let mut grid = OccupancyGrid::default();
        let avatar = populate_level(&mut world.commands(), &layout, &mut grid, &config);
        world.flush();

        let avatar = avatar.expect("demo has an avatar");
        assert!(world.get::<LumiaBody>(avatar).unwrap().is_avatar);
        let mut lumia = world.query::<&LumiaBody>();
        assert_eq!(lumia.iter(&world).count(), layout.lumias.len());
        let mut plants = world.query::<&Plant>();
        assert_eq!(plants.iter(&world).count(), layout.plants.len());
        let floor = grid.world_to_cell(Vec2::new(0.0, -20.0));
        assert_eq!(grid.state(floor), crate::pathfinding::CellState::Obstacle);
    }
}
