//! Avatar bookkeeping and the actions the player drives through it:
//! select, split, launch and hold-to-merge attraction.
//!
//! Split is the one structural change made outside the deferred batch: it
//! is requested by input, not by a contact, so it runs synchronously before
//! the physics step.

use crate::config::LumiaConfig;
use crate::input::PlayerIntent;
use crate::lumia::{spawn_lumia, LumiaBody, LumiaSpawn, LumiaState};
use crate::pathfinding::OccupancyGrid;
use crate::size_level::{radius_of, split_levels};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// The Lumia currently receiving player input.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Avatar {
    pub entity: Option<Entity>,
}

/// First candidate whose bounding box contains `point`.
pub fn lumia_at_point(
    point: Vec2,
    candidates: impl IntoIterator<Item = (Entity, Vec2, f32)>,
) -> Option<Entity> {
    candidates.into_iter().find_map(|(entity, center, radius)| {
        let offset = (point - center).abs();
        (offset.x <= radius && offset.y <= radius).then_some(entity)
    })
}

/// Velocity pulling a Lumia at `position` toward the avatar, if it is within
/// the attraction radius.
pub fn attraction_velocity(
    position: Vec2,
    avatar_position: Vec2,
    radius_sq: f32,
    speed: f32,
) -> Option<Vec2> {
    let dist_sq = position.distance_squared(avatar_position);
    if dist_sq > radius_sq || dist_sq <= f32::EPSILON {
        return None;
    }
    Some((avatar_position - position).normalize_or_zero() * speed)
}

/// The two halves of a split, side by side on the original footprint.
pub fn split_spawns(
    position: Vec2,
    level: usize,
    linvel: Vec2,
    angvel: f32,
    gap: f32,
    speed: f32,
) -> Option<[LumiaSpawn; 2]> {
    let (first, second) = split_levels(level)?;
    let bottom = position.y - radius_of(level);
    let (r1, r2) = (radius_of(first), radius_of(second));
    let half_gap = gap * 0.5;
    Some([
        LumiaSpawn {
            position: Vec2::new(position.x - r1 - half_gap, bottom + r1),
            size_level: first,
            is_avatar: true,
            linvel: linvel - Vec2::X * speed,
            angvel,
            spike_grace: 0,
        },
        LumiaSpawn {
            position: Vec2::new(position.x + r2 + half_gap, bottom + r2),
            size_level: second,
            is_avatar: false,
            linvel: linvel + Vec2::X * speed,
            angvel,
            spike_grace: 0,
        },
    ])
}

type AvatarQuery<'a> = (
    Entity,
    &'a mut LumiaBody,
    &'a Transform,
    &'a mut Velocity,
    &'a mut ExternalImpulse,
    &'a mut GravityScale,
);

/// Consume this frame's [`PlayerIntent`] and act on the avatar.
pub fn avatar_action_system(
    mut commands: Commands,
    config: Res<LumiaConfig>,
    mut intent: ResMut<PlayerIntent>,
    mut avatar: ResMut<Avatar>,
    mut grid: ResMut<OccupancyGrid>,
    mut q_lumia: Query<AvatarQuery>,
) {
    let intent = std::mem::take(&mut *intent);

    if let Some(point) = intent.select_at {
        let picked = lumia_at_point(
            point,
            q_lumia
                .iter()
                .filter(|(_, body, ..)| body.is_live())
                .map(|(e, body, tf, ..)| (e, tf.translation.truncate(), body.radius())),
        );
        if let Some(picked) = picked.filter(|p| Some(*p) != avatar.entity) {
            if let Some(old) = avatar.entity {
                if let Ok((_, mut body, ..)) = q_lumia.get_mut(old) {
                    body.is_avatar = false;
                    body.state = LumiaState::Idle;
                }
            }
            if let Ok((_, mut body, ..)) = q_lumia.get_mut(picked) {
                body.is_avatar = true;
            }
            avatar.entity = Some(picked);
            info!("Avatar switched to {picked:?}");
        }
    }

    let Some(entity) = avatar.entity else {
        return;
    };
    let Ok((_, mut body, transform, mut velocity, mut impulse, mut gravity)) = q_lumia.get_mut(entity)
    else {
        return;
    };
    if !body.is_live() {
        return;
    }

    body.state = if intent.merge {
        LumiaState::Merging
    } else if intent.split {
        LumiaState::Splitting
    } else {
        LumiaState::Idle
    };

    if intent.split {
        let position = transform.translation.truncate();
        if let Some(halves) = split_spawns(
            position,
            body.size_level,
            velocity.linvel,
            velocity.angvel,
            config.split_gap,
            config.split_speed,
        ) {
            body.mark_removed();
            commands.entity(entity).despawn();
            grid.forget(entity);
            let first = spawn_lumia(&mut commands, &halves[0], &config);
            spawn_lumia(&mut commands, &halves[1], &config);
            avatar.entity = Some(first);
            debug!(
                "Split level {} into {} + {}",
                body.size_level, halves[0].size_level, halves[1].size_level
            );
            return;
        }
        body.state = LumiaState::Idle;
    }

    if let Some(requested) = intent.launch {
        if !body.is_grounded && !body.is_on_sticky_wall {
            return;
        }
        let mut launch = requested.clamp_length_max(config.max_launch_speed);
        if body.is_on_sticky_wall {
            // Only the part of the launch that leaves the wall is kept.
            let into_wall = launch.dot(body.stick_direction).max(0.0);
            launch -= body.stick_direction * into_wall;
            body.is_on_sticky_wall = false;
            gravity.0 = 1.0;
            velocity.linvel = Vec2::ZERO;
        }
        impulse.impulse = launch * body.size().mass();
        body.is_launching = true;
    }
}

/// While the avatar is merging, pull every live Lumia in range toward it.
pub fn merge_attraction_system(
    config: Res<LumiaConfig>,
    avatar: Res<Avatar>,
    mut q_lumia: Query<(Entity, &LumiaBody, &Transform, &mut Velocity)>,
) {
    let Some(avatar_entity) = avatar.entity else {
        return;
    };
    let Ok((_, avatar_body, avatar_transform, _)) = q_lumia.get(avatar_entity) else {
        return;
    };
    if avatar_body.state != LumiaState::Merging || !avatar_body.is_live() {
        return;
    }
    let avatar_position = avatar_transform.translation.truncate();
    let radius_sq = config.merge_attraction_radius_sq();

    for (entity, body, transform, mut velocity) in q_lumia.iter_mut() {
        if entity == avatar_entity || !body.is_live() || body.is_on_sticky_wall {
            continue;
        }
        if let Some(pull) = attraction_velocity(
            transform.translation.truncate(),
            avatar_position,
            radius_sq,
            config.merge_attraction_speed,
        ) {
            velocity.linvel = pull;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with(config: LumiaConfig) -> World {
        let mut world = World::new();
        world.insert_resource(config);
        world.init_resource::<PlayerIntent>();
        world.init_resource::<Avatar>();
        world.init_resource::<OccupancyGrid>();
        world
    }

    fn spawn(world: &mut World, level: usize, x: f32, is_avatar: bool) -> Entity {
        let config = world.resource::<LumiaConfig>().clone();
        let spawn = LumiaSpawn {
            position: Vec2::new(x, radius_of(level)),
            size_level: level,
            is_avatar,
            linvel: Vec2::ZERO,
            angvel: 0.0,
            spike_grace: 0,
        };
        let entity = spawn_lumia(&mut world.commands(), &spawn, &config);
        world.flush();
        if is_avatar {
            world.resource_mut::<Avatar>().entity = Some(entity);
        }
        entity
    }

    fn run_actions(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(avatar_action_system);
        schedule.run(world);
    }

    #[test]
    fn point_selection_uses_the_bounding_box() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let candidates = [(a, Vec2::ZERO, 10.0), (b, Vec2::new(15.0, 0.0), 10.0)];
        assert_eq!(lumia_at_point(Vec2::new(9.0, 9.0), candidates), Some(a));
        assert_eq!(lumia_at_point(Vec2::new(7.0, 0.0), candidates), Some(a), "first match wins");
        assert_eq!(lumia_at_point(Vec2::new(24.0, 0.0), candidates), Some(b));
        assert_eq!(lumia_at_point(Vec2::new(0.0, 30.0), candidates), None);
    }

    #[test]
    fn attraction_only_inside_the_radius() {
        assert_eq!(
            attraction_velocity(Vec2::new(10.0, 0.0), Vec2::ZERO, 400.0, 5.0),
            Some(Vec2::new(-5.0, 0.0))
        );
        assert_eq!(attraction_velocity(Vec2::new(30.0, 0.0), Vec2::ZERO, 400.0, 5.0), None);
    }

    #[test]
    fn split_halves_do_not_overlap_and_keep_the_footprint() {
        let [a, b] = split_spawns(Vec2::new(0.0, radius_of(4)), 4, Vec2::ZERO, 0.0, 4.0, 90.0).unwrap();
        assert_eq!((a.size_level, b.size_level), (2, 1));
        assert!(a.is_avatar && !b.is_avatar);
        let gap = a.position.distance(b.position) - radius_of(2) - radius_of(1);
        assert!(gap > 0.0);
        assert!((a.position.y - radius_of(2)).abs() < 1e-5);
        assert!((b.position.y - radius_of(1)).abs() < 1e-5);
        assert!(a.linvel.x < 0.0 && b.linvel.x > 0.0);
        assert!(split_spawns(Vec2::ZERO, 0, Vec2::ZERO, 0.0, 4.0, 90.0).is_none());
    }

    #[test]
    fn split_replaces_the_avatar_synchronously() {
        let mut world = world_with(LumiaConfig::default());
        let original = spawn(&mut world, 3, 0.0, true);
        world.resource_mut::<PlayerIntent>().split = true;

        run_actions(&mut world);

        assert!(world.get_entity(original).is_err());
        let new_avatar = world.resource::<Avatar>().entity.expect("avatar handed to a half");
        let body = world.get::<LumiaBody>(new_avatar).unwrap();
        assert!(body.is_avatar);
        assert_eq!(body.size_level, 1);
        let mut q = world.query::<&LumiaBody>();
        assert_eq!(q.iter(&world).count(), 2);
        assert!(!world.resource::<PlayerIntent>().split, "intent is consumed");
    }

    #[test]
    fn launch_needs_ground_and_is_clamped() {
        let config = LumiaConfig::default();
        let max = config.max_launch_speed;
        let mut world = world_with(config);
        let avatar = spawn(&mut world, 2, 0.0, true);

        world.resource_mut::<PlayerIntent>().launch = Some(Vec2::new(0.0, 10_000.0));
        run_actions(&mut world);
        assert_eq!(world.get::<ExternalImpulse>(avatar).unwrap().impulse, Vec2::ZERO);

        world.get_mut::<LumiaBody>(avatar).unwrap().touch_ground();
        world.resource_mut::<PlayerIntent>().launch = Some(Vec2::new(0.0, 10_000.0));
        run_actions(&mut world);
        let mass = radius_of(2) * radius_of(2) * std::f32::consts::PI * 0.8;
        let impulse = world.get::<ExternalImpulse>(avatar).unwrap().impulse;
        assert!((impulse.y - max * mass).abs() < 1e-2 * max * mass);
        assert!(world.get::<LumiaBody>(avatar).unwrap().is_launching);
    }

    #[test]
    fn launching_off_a_sticky_wall_unsticks() {
        let mut world = world_with(LumiaConfig::default());
        let avatar = spawn(&mut world, 1, 0.0, true);
        world.get_mut::<LumiaBody>(avatar).unwrap().is_on_sticky_wall = true;
        world.get_mut::<GravityScale>(avatar).unwrap().0 = 0.0;
        world.resource_mut::<PlayerIntent>().launch = Some(Vec2::new(100.0, 0.0));

        run_actions(&mut world);

        assert!(!world.get::<LumiaBody>(avatar).unwrap().is_on_sticky_wall);
        assert_eq!(world.get::<GravityScale>(avatar).unwrap().0, 1.0);
        assert!(world.get::<ExternalImpulse>(avatar).unwrap().impulse.x > 0.0);
    }

    #[test]
    fn launch_into_the_wall_keeps_only_the_outward_part() {
        let mut world = world_with(LumiaConfig::default());
        let avatar = spawn(&mut world, 1, 0.0, true);
        {
            let mut body = world.get_mut::<LumiaBody>(avatar).unwrap();
            body.is_on_sticky_wall = true;
            // Stuck to a wall on its left.
            body.stick_direction = Vec2::NEG_X;
        }
        world.resource_mut::<PlayerIntent>().launch = Some(Vec2::new(-100.0, 50.0));

        run_actions(&mut world);

        let impulse = world.get::<ExternalImpulse>(avatar).unwrap().impulse;
        assert!(impulse.x.abs() < 1e-4);
        assert!(impulse.y > 0.0);
    }

    #[test]
    fn selecting_moves_the_avatar_flag() {
        let mut world = world_with(LumiaConfig::default());
        let first = spawn(&mut world, 2, 0.0, true);
        let second = spawn(&mut world, 1, 200.0, false);
        world.resource_mut::<PlayerIntent>().select_at = Some(Vec2::new(200.0, radius_of(1)));

        run_actions(&mut world);

        assert_eq!(world.resource::<Avatar>().entity, Some(second));
        assert!(!world.get::<LumiaBody>(first).unwrap().is_avatar);
        assert!(world.get::<LumiaBody>(second).unwrap().is_avatar);
    }

    #[test]
    fn merging_avatar_pulls_nearby_lumia() {
        let mut world = world_with(LumiaConfig::default());
        let avatar = spawn(&mut world, 2, 0.0, true);
        let near = spawn(&mut world, 1, 100.0, false);
        let far = spawn(&mut world, 1, 1000.0, false);
        world.get_mut::<LumiaBody>(avatar).unwrap().state = LumiaState::Merging;

        let mut schedule = Schedule::default();
        schedule.add_systems(merge_attraction_system);
        schedule.run(&mut world);

        assert!(world.get::<Velocity>(near).unwrap().linvel.x < 0.0);
        assert_eq!(world.get::<Velocity>(far).unwrap().linvel, Vec2::ZERO);
        assert_eq!(world.get::<Velocity>(avatar).unwrap().linvel, Vec2::ZERO);
    }
}
