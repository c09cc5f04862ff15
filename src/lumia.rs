//! The Lumia blob entity.
//!
//! A Lumia is a plain ECS entity: gameplay state lives in [`LumiaBody`], and
//! the Rapier components attached next to it (`RigidBody`, `Collider`,
//! `Velocity`, ...) are the physics capability it uses.  Position and
//! velocity are therefore read from `Transform` / `Velocity`, never duplicated
//! here.
//!
//! Once a body is latched `is_removed` it is waiting for the deferred-apply
//! step to despawn it; every system treats it as already gone.

use crate::config::LumiaConfig;
use crate::scene::level::LevelEntity;
use crate::size_level::{bigger_size_level, size_level, smaller_size_level, SizeLevel};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Z layer for Lumia sprites and gizmos.
pub const LUMIA_Z: f32 = 0.5;

/// Gameplay action the body is currently performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LumiaState {
    #[default]
    Idle,
    Splitting,
    Merging,
}

/// Gameplay state of one Lumia blob.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct LumiaBody {
    /// Index into the size table.
    pub size_level: usize,
    /// The body currently receiving player input.
    pub is_avatar: bool,
    pub is_grounded: bool,
    /// Number of `Ground` colliders currently touching the body.
    pub ground_contacts: u32,
    /// Set by a launch, cleared on the next ground contact.
    pub is_launching: bool,
    pub is_on_sticky_wall: bool,
    /// Direction toward the wall the body is stuck to (negated wall normal).
    pub stick_direction: Vec2,
    /// Set while the body is the one holding a floor button down.
    pub is_on_button: bool,
    /// Latched when the body is queued for removal; never cleared.
    pub is_removed: bool,
    /// Latched when the body is removed without a replacement.
    pub is_dying: bool,
    /// Frames left during which spike contacts are ignored.
    pub spike_grace: u32,
    pub state: LumiaState,
}

impl LumiaBody {
    pub fn new(size_level: usize, is_avatar: bool) -> Self {
        Self {
            size_level,
            is_avatar,
            is_grounded: false,
            ground_contacts: 0,
            is_launching: false,
            is_on_sticky_wall: false,
            stick_direction: Vec2::ZERO,
            is_on_button: false,
            is_removed: false,
            is_dying: false,
            spike_grace: 0,
            state: LumiaState::Idle,
        }
    }

    #[inline]
    pub fn size(&self) -> SizeLevel {
        size_level(self.size_level)
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.size().radius
    }

    /// One level up, clamped at the table maximum.
    #[inline]
    pub fn bigger_size_level(&self) -> usize {
        bigger_size_level(self.size_level)
    }

    /// One level down, clamped at the table minimum.
    #[inline]
    pub fn smaller_size_level(&self) -> usize {
        smaller_size_level(self.size_level)
    }

    /// `true` until the body is queued for removal.
    #[inline]
    pub fn is_live(&self) -> bool {
        !self.is_removed && !self.is_dying
    }

    /// Latch the body for removal (it is being replaced by a new body).
    pub fn mark_removed(&mut self) {
        self.is_removed = true;
    }

    /// Latch the body for removal with no replacement.
    pub fn mark_dying(&mut self) {
        self.is_removed = true;
        self.is_dying = true;
    }

    /// Record one more touching ground collider.
    pub fn touch_ground(&mut self) {
        self.ground_contacts += 1;
        self.is_grounded = true;
        self.is_launching = false;
    }

    /// Record one ground collider separating from the body.
    pub fn leave_ground(&mut self) {
        self.ground_contacts = self.ground_contacts.saturating_sub(1);
        self.is_grounded = self.ground_contacts > 0;
    }
}

/// Everything needed to instantiate a new Lumia.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LumiaSpawn {
    pub position: Vec2,
    pub size_level: usize,
    pub is_avatar: bool,
    pub linvel: Vec2,
    pub angvel: f32,
    /// Initial [`LumiaBody::spike_grace`].
    pub spike_grace: u32,
}

/// Spawn a Lumia with its Rapier body and collider sized from the size table.
pub fn spawn_lumia(commands: &mut Commands, spawn: &LumiaSpawn, config: &LumiaConfig) -> Entity {
    let size = size_level(spawn.size_level);
    commands
        .spawn((
            (
                LumiaBody {
                    spike_grace: spawn.spike_grace,
                    ..LumiaBody::new(spawn.size_level, spawn.is_avatar)
                },
                LevelEntity,
                Transform::from_translation(spawn.position.extend(LUMIA_Z)),
                Visibility::default(),
            ),
            (
                RigidBody::Dynamic,
                Collider::ball(size.radius),
                ColliderMassProperties::Density(size.density),
                Velocity {
                    linvel: spawn.linvel,
                    angvel: spawn.angvel,
                },
                ExternalImpulse::default(),
                GravityScale(1.0),
                Friction::coefficient(config.lumia_friction),
                Restitution::coefficient(config.lumia_restitution),
                ActiveEvents::COLLISION_EVENTS,
            ),
        ))
        .id()
}

/// Count spike grace periods down by one frame.
pub fn lumia_grace_system(mut q_lumia: Query<&mut LumiaBody>) {
    for mut body in q_lumia.iter_mut() {
        if body.spike_grace > 0 {
            body.spike_grace -= 1;
        }
    }
}

/// Entity with the smallest squared distance to `from`.
///
/// Ties keep the first candidate seen.
pub fn nearest_lumia(
    from: Vec2,
    candidates: impl IntoIterator<Item = (Entity, Vec2)>,
) -> Option<Entity> {
    let mut best: Option<(Entity, f32)> = None;
    for (entity, position) in candidates {
        let dist_sq = position.distance_squared(from);
        if best.is_none_or(|(_, best_sq)| dist_sq < best_sq) {
            best = Some((entity, dist_sq));
        }
    }
    best.map(|(entity, _)| entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_latches_are_one_way() {
        let mut body = LumiaBody::new(2, false);
        assert!(body.is_live());
        body.mark_removed();
        assert!(!body.is_live());
        assert!(!body.is_dying);

        let mut dying = LumiaBody::new(0, true);
        dying.mark_dying();
        assert!(dying.is_removed && dying.is_dying);
    }

    #[test]
    fn ground_contacts_are_counted() {
        let mut body = LumiaBody::new(1, true);
        body.is_launching = true;
        body.touch_ground();
        body.touch_ground();
        assert!(body.is_grounded);
        assert!(!body.is_launching);
        body.leave_ground();
        assert!(body.is_grounded, "one contact still remains");
        body.leave_ground();
        body.leave_ground();
        assert!(!body.is_grounded);
        assert_eq!(body.ground_contacts, 0);
    }

    #[test]
    fn spike_grace_is_carried_over_and_counts_down() {
        let mut world = World::new();
        let spawn = LumiaSpawn {
            position: Vec2::ZERO,
            size_level: 3,
            is_avatar: false,
            linvel: Vec2::ZERO,
            angvel: 0.0,
            spike_grace: 2,
        };
        let entity = spawn_lumia(&mut world.commands(), &spawn, &LumiaConfig::default());
        world.flush();
        assert_eq!(world.get::<LumiaBody>(entity).unwrap().spike_grace, 2);

        let mut schedule = Schedule::default();
        schedule.add_systems(lumia_grace_system);
        for _ in 0..3 {
            schedule.run(&mut world);
        }
        assert_eq!(world.get::<LumiaBody>(entity).unwrap().spike_grace, 0);
    }

    #[test]
    fn nearest_lumia_uses_squared_distance() {
        let mut world = World::new();
        let far = world.spawn_empty().id();
        let near = world.spawn_empty().id();
        let picked = nearest_lumia(
            Vec2::ZERO,
            [(far, Vec2::new(30.0, 0.0)), (near, Vec2::new(-5.0, 5.0))],
        );
        assert_eq!(picked, Some(near));
        assert_eq!(nearest_lumia(Vec2::ZERO, []), None);
    }

    #[test]
    fn spawn_lumia_attaches_body_and_physics() {
        let mut world = World::new();
        let config = LumiaConfig::default();
        let spawn = LumiaSpawn {
            position: Vec2::new(3.0, 4.0),
            size_level: 2,
            is_avatar: true,
            linvel: Vec2::new(1.0, 0.0),
            angvel: 0.5,
            spike_grace: 0,
        };
        let entity = spawn_lumia(&mut world.commands(), &spawn, &config);
        world.flush();

        let body = world.get::<LumiaBody>(entity).expect("body component");
        assert_eq!(body.size_level, 2);
        assert!(body.is_avatar);
        let velocity = world.get::<Velocity>(entity).expect("velocity component");
        assert_eq!(velocity.linvel, Vec2::new(1.0, 0.0));
        let transform = world.get::<Transform>(entity).expect("transform");
        assert_eq!(transform.translation.truncate(), Vec2::new(3.0, 4.0));
    }
}
