//! Enemy blobs: components, spawning, cool-down and velocity hand-off.
//!
//! Behaviour (targeting, Wander/Chasing/Fleeing, A* steering) lives in
//! [`crate::pathfinding::behavior`]; this module only owns the entity and the
//! two small systems that turn the behaviour's decisions into Rapier motion.

use crate::scene::level::LevelEntity;
use crate::size_level::size_level;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Behaviour state of an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnemyState {
    #[default]
    Wander,
    Chasing,
    Fleeing,
}

/// Gameplay state of one enemy.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct EnemyBody {
    pub size_level: usize,
    /// Desired velocity chosen by the behaviour system.
    pub velocity: Vec2,
    /// Frames left before the enemy moves (and bites) again.
    pub cool_down: u32,
    pub state: EnemyState,
    /// Non-owning reference to the Lumia being tracked.  Revalidated against
    /// the live roster every time it is read.
    pub target: Option<Entity>,
    /// Latched when the enemy is queued for removal; never cleared.
    pub is_removed: bool,
}

impl EnemyBody {
    pub fn new(size_level: usize) -> Self {
        Self {
            size_level,
            velocity: Vec2::ZERO,
            cool_down: 0,
            state: EnemyState::Wander,
            target: None,
            is_removed: false,
        }
    }

    #[inline]
    pub fn in_cool_down(&self) -> bool {
        self.cool_down > 0
    }

    /// Freeze the enemy for `frames` frames.
    pub fn start_cool_down(&mut self, frames: u32) {
        self.cool_down = frames;
        self.velocity = Vec2::ZERO;
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        size_level(self.size_level).radius
    }
}

/// Spawn an enemy.  Enemies ignore gravity: their motion comes entirely from
/// [`enemy_motion_system`].
pub fn spawn_enemy(commands: &mut Commands, position: Vec2, level: usize) -> Entity {
    let size = size_level(level);
    commands
        .spawn((
            (
                EnemyBody::new(level),
                LevelEntity,
                Transform::from_translation(position.extend(0.4)),
                Visibility::default(),
            ),
            (
                RigidBody::Dynamic,
                Collider::ball(size.radius),
                ColliderMassProperties::Density(size.density),
                Velocity::zero(),
                GravityScale(0.0),
                LockedAxes::ROTATION_LOCKED,
                ActiveEvents::COLLISION_EVENTS,
            ),
        ))
        .id()
}

/// Count enemy cool-downs down by one frame.
pub fn enemy_cool_down_system(mut q_enemy: Query<&mut EnemyBody>) {
    for mut enemy in q_enemy.iter_mut() {
        if enemy.cool_down > 0 {
            enemy.cool_down -= 1;
        }
    }
}

/// Copy each enemy's desired velocity into its Rapier `Velocity`.
pub fn enemy_motion_system(mut q_enemy: Query<(&EnemyBody, &mut Velocity)>) {
    for (enemy, mut velocity) in q_enemy.iter_mut() {
        velocity.linvel = if enemy.is_removed || enemy.in_cool_down() {
            Vec2::ZERO
        } else {
            enemy.velocity
        };
        velocity.angvel = 0.0;
    }
}
