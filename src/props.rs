//! Static level props the Lumia interact with: ground, plants, spikes,
//! energy pickups, sticky walls, floor buttons and the doors they drive.
//!
//! | Prop | Collider | Contact effect (see [`crate::collision`]) |
//! |------|----------|--------------------------------------------|
//! | [`Ground`] | solid | grounding counter |
//! | [`Plant`] | sensor | lights the plant, costs one size level |
//! | [`Spike`] | solid | costs one size level |
//! | [`EnergyItem`] | sensor | grants one size level, item removed |
//! | [`StickyWall`] | sensor | sticks / unsticks the Lumia |
//! | [`FloorButton`] | sensor | opens / closes the paired [`Door`] |

use crate::config::LumiaConfig;
use crate::lumia::LumiaBody;
use crate::scene::level::LevelEntity;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

// ── Components ────────────────────────────────────────────────────────────────

/// Solid level geometry.  Also rasterised into the occupancy grid as obstacles.
#[derive(Component, Debug, Clone, Copy)]
pub struct Ground;

/// A plant the Lumia light up.  Dark → Lit is one-way until the level resets.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Plant {
    pub index: usize,
    pub is_lit: bool,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Spike;

/// A pickup that grows a Lumia by one level.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct EnergyItem {
    /// Latched when the item is queued for removal.
    pub is_removed: bool,
}

/// Sensor in front of a wall face that Lumia stick to.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct StickyWall {
    /// Unit normal pointing out of the wall.
    pub surface_normal: Vec2,
}

/// A pressure plate paired with one door.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct FloorButton {
    pub door: Entity,
    pub is_pushing_down: bool,
    /// Non-owning reference to the Lumia holding the button down.
    pub pressed_by: Option<Entity>,
    /// Frames left before the button accepts a new press.
    pub cool_down: u32,
}

impl FloorButton {
    pub fn new(door: Entity) -> Self {
        Self {
            door,
            is_pushing_down: false,
            pressed_by: None,
            cool_down: 0,
        }
    }

    /// Lift the button and start its cool-down.
    pub fn release(&mut self, cool_down_frames: u32) {
        self.release_stale();
        self.cool_down = cool_down_frames;
    }

    /// Lift the button after its presser was replaced or destroyed.  No
    /// cool-down starts, so a replacement body still resting on the plate
    /// presses it again on its first contact.
    pub fn release_stale(&mut self) {
        self.is_pushing_down = false;
        self.pressed_by = None;
    }
}

/// What a button tells its door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonSignal {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
pub enum DoorKind {
    /// Slides by `open_offset` when opening.
    #[default]
    Sliding,
    /// Shrinks in place when opening.
    Shrinking,
}

/// A door animated between closed (`progress = 0`) and open (`progress = 1`).
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Door {
    pub kind: DoorKind,
    pub closed_position: Vec2,
    pub open_offset: Vec2,
    /// Inverts the button polarity: pressing closes, releasing opens.
    pub normally_open: bool,
    pub is_opening: bool,
    pub is_closing: bool,
    pub progress: f32,
}

impl Door {
    pub fn new(kind: DoorKind, closed_position: Vec2, open_offset: Vec2, normally_open: bool) -> Self {
        Self {
            kind,
            closed_position,
            open_offset,
            normally_open,
            is_opening: false,
            is_closing: false,
            progress: if normally_open { 1.0 } else { 0.0 },
        }
    }

    /// Start moving in response to a button.  Opening and closing are
    /// mutually exclusive; the latest signal wins.
    pub fn apply_signal(&mut self, signal: ButtonSignal) {
        let open = (signal == ButtonSignal::Pressed) != self.normally_open;
        self.is_opening = open;
        self.is_closing = !open;
    }

    /// Advance the animation by `speed` and stop at either end.
    pub fn advance(&mut self, speed: f32) {
        if self.is_opening {
            self.progress = (self.progress + speed).min(1.0);
            if self.progress >= 1.0 {
                self.is_opening = false;
            }
        } else if self.is_closing {
            self.progress = (self.progress - speed).max(0.0);
            if self.progress <= 0.0 {
                self.is_closing = false;
            }
        }
    }

    pub fn translation(&self) -> Vec2 {
        match self.kind {
            DoorKind::Sliding => self.closed_position + self.open_offset * self.progress,
            DoorKind::Shrinking => self.closed_position,
        }
    }

    pub fn scale(&self, min_scale: f32) -> f32 {
        match self.kind {
            DoorKind::Sliding => 1.0,
            DoorKind::Shrinking => 1.0 - (1.0 - min_scale) * self.progress,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.progress >= 1.0
    }
}

// ── Spawning ──────────────────────────────────────────────────────────────────

pub fn spawn_ground(commands: &mut Commands, center: Vec2, half_extents: Vec2) -> Entity {
    commands
        .spawn((
            Ground,
            LevelEntity,
            Transform::from_translation(center.extend(0.0)),
            RigidBody::Fixed,
            Collider::cuboid(half_extents.x, half_extents.y),
        ))
        .id()
}

pub fn spawn_plant(commands: &mut Commands, index: usize, position: Vec2) -> Entity {
    commands
        .spawn((
            Plant {
                index,
                is_lit: false,
            },
            LevelEntity,
            Transform::from_translation(position.extend(0.1)),
            RigidBody::Fixed,
            Collider::ball(12.0),
            Sensor,
        ))
        .id()
}

pub fn spawn_spike(commands: &mut Commands, center: Vec2, half_extents: Vec2) -> Entity {
    commands
        .spawn((
            Spike,
            LevelEntity,
            Transform::from_translation(center.extend(0.1)),
            RigidBody::Fixed,
            Collider::cuboid(half_extents.x, half_extents.y),
        ))
        .id()
}

pub fn spawn_energy(commands: &mut Commands, position: Vec2) -> Entity {
    commands
        .spawn((
            EnergyItem::default(),
            LevelEntity,
            Transform::from_translation(position.extend(0.1)),
            RigidBody::Fixed,
            Collider::ball(8.0),
            Sensor,
        ))
        .id()
}

pub fn spawn_sticky_wall(
    commands: &mut Commands,
    center: Vec2,
    half_extents: Vec2,
    surface_normal: Vec2,
) -> Entity {
    commands
        .spawn((
            StickyWall {
                surface_normal: surface_normal.normalize_or_zero(),
            },
            LevelEntity,
            Transform::from_translation(center.extend(0.05)),
            RigidBody::Fixed,
            Collider::cuboid(half_extents.x, half_extents.y),
            Sensor,
        ))
        .id()
}

/// Spawn a door and the button that drives it.  Returns `(button, door)`.
pub fn spawn_button_with_door(
    commands: &mut Commands,
    button_position: Vec2,
    door: Door,
    door_half_extents: Vec2,
) -> (Entity, Entity) {
    let door_translation = door.translation();
    let door_entity = commands
        .spawn((
            door,
            LevelEntity,
            Transform::from_translation(door_translation.extend(0.0)),
            RigidBody::KinematicPositionBased,
            Collider::cuboid(door_half_extents.x, door_half_extents.y),
        ))
        .id();
    let button_entity = commands
        .spawn((
            FloorButton::new(door_entity),
            LevelEntity,
            Transform::from_translation(button_position.extend(0.1)),
            RigidBody::Fixed,
            Collider::cuboid(14.0, 4.0),
            Sensor,
        ))
        .id();
    (button_entity, door_entity)
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Tick button cool-downs and release buttons whose recorded Lumia is gone.
///
/// `pressed_by` is a weak reference: the Lumia may have been merged, shrunk or
/// destroyed since it pressed the button.
pub fn button_revalidation_system(
    mut q_buttons: Query<&mut FloorButton>,
    mut q_doors: Query<&mut Door>,
    q_lumia: Query<&LumiaBody>,
) {
    for mut button in q_buttons.iter_mut() {
        if button.cool_down > 0 {
            button.cool_down -= 1;
        }
        let Some(presser) = button.pressed_by else {
            continue;
        };
        let still_pressing = q_lumia.get(presser).is_ok_and(|body| body.is_live());
        if still_pressing {
            continue;
        }
        button.release_stale();
        if let Ok(mut door) = q_doors.get_mut(button.door) {
            door.apply_signal(ButtonSignal::Released);
        }
    }
}

/// Animate doors toward their open/closed targets.
pub fn door_motion_system(config: Res<LumiaConfig>, mut q_doors: Query<(&mut Door, &mut Transform)>) {
    for (mut door, mut transform) in q_doors.iter_mut() {
        if !door.is_opening && !door.is_closing {
            continue;
        }
        door.advance(config.door_speed);
        let translation = door.translation();
        let scale = door.scale(config.door_min_scale);
        transform.translation.x = translation.x;
        transform.translation.y = translation.y;
        transform.scale = Vec3::new(scale, scale, 1.0);
    }
}
