use crate::collision::CollisionController;
use crate::config::LumiaConfig;
use crate::lumia::{spawn_lumia, LumiaBody, LumiaSpawn};
use crate::pathfinding::OccupancyGrid;
use crate::props::Door;
use crate::scene::avatar::Avatar;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Who takes over when the avatar is removed without a replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heir {
    Existing(Entity),
    /// Index into the batch's `lumia_to_create`.
    Created(usize),
}

/// Nearest candidate to `from` by squared distance.  Existing bodies are
/// considered before bodies about to be created; ties keep the first seen.
pub fn pick_heir(
    from: Vec2,
    existing: impl IntoIterator<Item = (Entity, Vec2)>,
    created: &[LumiaSpawn],
) -> Option<Heir> {
    let candidates = existing
        .into_iter()
        .map(|(entity, pos)| (Heir::Existing(entity), pos))
        .chain(
            created
                .iter()
                .enumerate()
                .map(|(i, spawn)| (Heir::Created(i), spawn.position)),
        );
    let mut best: Option<(Heir, f32)> = None;
    for (heir, pos) in candidates {
        let dist_sq = pos.distance_squared(from);
        if best.is_none_or(|(_, best_sq)| dist_sq < best_sq) {
            best = Some((heir, dist_sq));
        }
    }
    best.map(|(heir, _)| heir)
}

/// Apply the batch recorded during the previous physics step.
///
/// Order: avatar hand-off decision, creations, removals, stick / unstick,
/// door signals.  Runs before this frame's physics step, so nothing here
/// happens inside a contact callback.
pub fn apply_mutation_batch_system(
    mut commands: Commands,
    config: Res<LumiaConfig>,
    mut controller: ResMut<CollisionController>,
    mut avatar: ResMut<Avatar>,
    mut grid: ResMut<OccupancyGrid>,
    mut q_lumia: Query<(Entity, &mut LumiaBody, &Transform, &mut Velocity, &mut GravityScale)>,
    mut q_doors: Query<&mut Door>,
) {
    if controller.batch.is_empty() {
        controller.batch.clear();
        return;
    }
    let mut batch = std::mem::take(&mut controller.batch);

    // The avatar's last position, if it is about to disappear.
    let orphaned_at = avatar
        .entity
        .filter(|e| batch.lumia_to_remove.contains(e))
        .and_then(|e| q_lumia.get(e).ok())
        .map(|(_, _, transform, ..)| transform.translation.truncate());
    let inherited = batch.lumia_to_create.iter().any(|spawn| spawn.is_avatar);

    let mut new_avatar = None;
    if let (Some(from), false) = (orphaned_at, inherited) {
        let survivors = q_lumia
            .iter()
            .filter(|(e, body, ..)| body.is_live() && !batch.lumia_to_remove.contains(e))
            .map(|(e, _, transform, ..)| (e, transform.translation.truncate()));
        match pick_heir(from, survivors, &batch.lumia_to_create) {
            Some(Heir::Existing(entity)) => {
                if let Ok((_, mut body, ..)) = q_lumia.get_mut(entity) {
                    body.is_avatar = true;
                }
                new_avatar = Some(entity);
            }
            Some(Heir::Created(index)) => batch.lumia_to_create[index].is_avatar = true,
            None => {}
        }
    }

    // Creations.
    for spawn in &batch.lumia_to_create {
        let entity = spawn_lumia(&mut commands, spawn, &config);
        if spawn.is_avatar {
            new_avatar = Some(entity);
        }
    }

    // Removals.
    for &entity in &batch.lumia_to_remove {
        if let Ok(mut entity_commands) = commands.get_entity(entity) {
            entity_commands.despawn();
        }
        grid.forget(entity);
    }
    for &entity in batch.energy_to_remove.iter().chain(&batch.enemies_to_remove) {
        if let Ok(mut entity_commands) = commands.get_entity(entity) {
            entity_commands.despawn();
        }
        grid.forget(entity);
    }

    if orphaned_at.is_some() || new_avatar.is_some() {
        if new_avatar != avatar.entity {
            match new_avatar {
                Some(entity) if !inherited => info!("Avatar handed off to {entity:?}"),
                Some(_) => {}
                None => info!("Avatar lost; no Lumia left"),
            }
        }
        avatar.entity = new_avatar;
    }

    // Stick / unstick.
    for &entity in &batch.lumia_to_stick {
        if let Ok((_, mut body, _, mut velocity, mut gravity)) = q_lumia.get_mut(entity) {
            if body.is_live() {
                body.is_on_sticky_wall = true;
                velocity.linvel = Vec2::ZERO;
                velocity.angvel = 0.0;
                gravity.0 = 0.0;
            }
        }
    }
    for &entity in &batch.lumia_to_unstick {
        if let Ok((_, mut body, _, _, mut gravity)) = q_lumia.get_mut(entity) {
            body.is_on_sticky_wall = false;
            gravity.0 = 1.0;
        }
    }

    // Doors.
    for (&door_entity, &signal) in &batch.door_signals {
        if let Ok(mut door) = q_doors.get_mut(door_entity) {
            door.apply_signal(signal);
        }
    }

    debug!(
        "Applied batch: +{} / -{} Lumia, -{} energy, -{} enemies",
        batch.lumia_to_create.len(),
        batch.lumia_to_remove.len(),
        batch.energy_to_remove.len(),
        batch.enemies_to_remove.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::{ButtonSignal, DoorKind};

    fn setup() -> (World, Schedule) {
        let mut world = World::new();
        world.init_resource::<LumiaConfig>();
        world.init_resource::<CollisionController>();
        world.init_resource::<Avatar>();
        world.init_resource::<OccupancyGrid>();
        let mut schedule = Schedule::default();
        schedule.add_systems(apply_mutation_batch_system);
        (world, schedule)
    }

    fn spawn(world: &mut World, level: usize, x: f32, is_avatar: bool) -> Entity {
        let spawn = LumiaSpawn {
            position: Vec2::new(x, 0.0),
            size_level: level,
            is_avatar,
            linvel: Vec2::ZERO,
            angvel: 0.0,
            spike_grace: 0,
        };
        let entity = spawn_lumia(&mut world.commands(), &spawn, &LumiaConfig::default());
        world.flush();
        if is_avatar {
            world.resource_mut::<Avatar>().entity = Some(entity);
        }
        entity
    }

    fn queue_death(world: &mut World, entity: Entity) {
        world.get_mut::<LumiaBody>(entity).unwrap().mark_dying();
        world
            .resource_mut::<CollisionController>()
            .batch
            .lumia_to_remove
            .insert(entity);
    }

    #[test]
    fn avatar_passes_to_the_nearest_survivor() {
        let (mut world, mut schedule) = setup();
        let avatar = spawn(&mut world, 0, 0.0, true);
        let near = spawn(&mut world, 1, 30.0, false);
        let _far = spawn(&mut world, 1, -300.0, false);
        queue_death(&mut world, avatar);

        schedule.run(&mut world);

        assert!(world.get_entity(avatar).is_err());
        assert_eq!(world.resource::<Avatar>().entity, Some(near));
        assert!(world.get::<LumiaBody>(near).unwrap().is_avatar);
        assert!(world.resource::<CollisionController>().batch.is_empty());
    }

    #[test]
    fn losing_the_last_lumia_empties_the_avatar() {
        let (mut world, mut schedule) = setup();
        let avatar = spawn(&mut world, 0, 0.0, true);
        queue_death(&mut world, avatar);
        schedule.run(&mut world);
        assert_eq!(world.resource::<Avatar>().entity, None);
    }

    #[test]
    fn resized_avatar_keeps_control() {
        let (mut world, mut schedule) = setup();
        let avatar = spawn(&mut world, 2, 0.0, true);
        world.get_mut::<LumiaBody>(avatar).unwrap().mark_removed();
        {
            let mut controller = world.resource_mut::<CollisionController>();
            controller.batch.lumia_to_remove.insert(avatar);
            controller.batch.lumia_to_create.push(LumiaSpawn {
                position: Vec2::new(0.0, 5.0),
                size_level: 3,
                is_avatar: true,
                linvel: Vec2::ZERO,
                angvel: 0.0,
                spike_grace: 0,
            });
        }

        schedule.run(&mut world);

        let new_avatar = world.resource::<Avatar>().entity.unwrap();
        assert_ne!(new_avatar, avatar);
        let body = world.get::<LumiaBody>(new_avatar).unwrap();
        assert_eq!(body.size_level, 3);
        assert!(body.is_avatar);
    }

    #[test]
    fn heir_can_be_a_body_still_waiting_to_be_created() {
        let mut world = World::new();
        let far = world.spawn_empty().id();
        let created = [LumiaSpawn {
            position: Vec2::new(5.0, 0.0),
            size_level: 2,
            is_avatar: false,
            linvel: Vec2::ZERO,
            angvel: 0.0,
            spike_grace: 0,
        }];
        assert_eq!(
            pick_heir(Vec2::ZERO, [(far, Vec2::new(50.0, 0.0))], &created),
            Some(Heir::Created(0))
        );
        assert_eq!(pick_heir(Vec2::ZERO, [], &[]), None);
    }

    #[test]
    fn stick_freezes_and_unstick_restores_gravity() {
        let (mut world, mut schedule) = setup();
        let body = spawn(&mut world, 1, 0.0, false);
        world.get_mut::<Velocity>(body).unwrap().linvel = Vec2::new(10.0, -5.0);
        world.resource_mut::<CollisionController>().batch.stick(body);

        schedule.run(&mut world);
        assert!(world.get::<LumiaBody>(body).unwrap().is_on_sticky_wall);
        assert_eq!(world.get::<Velocity>(body).unwrap().linvel, Vec2::ZERO);
        assert_eq!(world.get::<GravityScale>(body).unwrap().0, 0.0);

        world.resource_mut::<CollisionController>().batch.unstick(body);
        schedule.run(&mut world);
        assert!(!world.get::<LumiaBody>(body).unwrap().is_on_sticky_wall);
        assert_eq!(world.get::<GravityScale>(body).unwrap().0, 1.0);
    }

    #[test]
    fn door_signals_start_the_door() {
        let (mut world, mut schedule) = setup();
        let door = world
            .spawn(Door::new(DoorKind::Sliding, Vec2::ZERO, Vec2::Y, false))
            .id();
        world
            .resource_mut::<CollisionController>()
            .batch
            .door_signals
            .insert(door, ButtonSignal::Pressed);

        schedule.run(&mut world);
        assert!(world.get::<Door>(door).unwrap().is_opening);
    }
}
