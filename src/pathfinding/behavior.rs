//! Enemy targeting and the Wander / Chasing / Fleeing state machine.
//!
//! Three cadences are decoupled: steering runs every tick, targets are
//! re-picked every `enemy_retarget_interval` ticks (or as soon as the target
//! is gone), and the state is re-evaluated every `enemy_evaluate_interval`
//! ticks (or when the target changes).

use super::astar::find_path;
use super::grid::{CellState, OccupancyGrid};
use crate::config::LumiaConfig;
use crate::enemy::{EnemyBody, EnemyState};
use crate::lumia::{nearest_lumia, LumiaBody};
use bevy::prelude::*;

/// Tick counter driving the periodic retarget / re-evaluate cadence.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct PathfindingClock {
    pub tick: u64,
}

impl PathfindingClock {
    #[inline]
    pub fn is_due(&self, interval: u32) -> bool {
        self.tick % u64::from(interval.max(1)) == 0
    }
}

/// What the state machine sees of the target: squared distance and size level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSighting {
    pub dist_sq: f32,
    pub size_level: usize,
}

/// State an enemy of `enemy_level` should be in given its target.
///
/// Out of range (or no target) → `Wander`; a strictly bigger target →
/// `Fleeing`; otherwise `Chasing`.
pub fn next_enemy_state(
    enemy_level: usize,
    target: Option<TargetSighting>,
    detection_radius_sq: f32,
) -> EnemyState {
    match target {
        Some(sighting) if sighting.dist_sq <= detection_radius_sq => {
            if sighting.size_level > enemy_level {
                EnemyState::Fleeing
            } else {
                EnemyState::Chasing
            }
        }
        _ => EnemyState::Wander,
    }
}

/// Velocity toward the first step of the A* path from `from` to `target`.
/// Zero when no path exists.
pub fn chase_velocity(grid: &OccupancyGrid, from: Vec2, target: Vec2, speed: f32) -> Vec2 {
    let start = grid.world_to_cell(from);
    let goal = grid.world_to_cell(target);
    let Some(path) = find_path(grid, start, goal) else {
        return Vec2::ZERO;
    };
    let waypoint = match path.get(1) {
        Some(&next) => grid.cell_center(next),
        None => target,
    };
    (waypoint - from).normalize_or_zero() * speed
}

/// Velocity directly away from `threat`.
#[inline]
pub fn flee_velocity(from: Vec2, threat: Vec2, speed: f32) -> Vec2 {
    (from - threat).normalize_or_zero() * speed
}

/// Re-tag every live body's cell in the occupancy grid.
pub fn occupancy_update_system(
    mut grid: ResMut<OccupancyGrid>,
    q_lumia: Query<(Entity, &LumiaBody, &Transform)>,
    q_enemy: Query<(Entity, &EnemyBody, &Transform)>,
) {
    for (entity, body, transform) in q_lumia.iter() {
        if body.is_live() {
            grid.track(entity, transform.translation.truncate(), CellState::Lumia);
        } else {
            grid.forget(entity);
        }
    }
    for (entity, enemy, transform) in q_enemy.iter() {
        if enemy.is_removed {
            grid.forget(entity);
        } else {
            grid.track(entity, transform.translation.truncate(), CellState::Enemy);
        }
    }
}

/// Retarget, re-evaluate and steer every enemy.
pub fn enemy_behavior_system(
    config: Res<LumiaConfig>,
    grid: Res<OccupancyGrid>,
    mut clock: ResMut<PathfindingClock>,
    mut q_enemy: Query<(&mut EnemyBody, &Transform)>,
    q_lumia: Query<(Entity, &LumiaBody, &Transform)>,
) {
    clock.tick += 1;
    let retarget_due = clock.is_due(config.enemy_retarget_interval);
    let evaluate_due = clock.is_due(config.enemy_evaluate_interval);
    let radius_sq = config.enemy_detection_radius_sq();

    let roster: Vec<(Entity, Vec2, usize)> = q_lumia
        .iter()
        .filter(|(_, body, _)| body.is_live())
        .map(|(entity, body, transform)| (entity, transform.translation.truncate(), body.size_level))
        .collect();
    let lookup = |entity: Entity| roster.iter().find(|(e, _, _)| *e == entity).copied();

    for (mut enemy, transform) in q_enemy.iter_mut() {
        if enemy.is_removed {
            continue;
        }
        let position = transform.translation.truncate();

        // The target is a weak reference: it may have been merged or destroyed.
        let target_alive = enemy.target.and_then(lookup).is_some();
        let mut target_changed = false;
        if retarget_due || !target_alive {
            let nearest = nearest_lumia(position, roster.iter().map(|(e, p, _)| (*e, *p)));
            target_changed = nearest != enemy.target;
            enemy.target = nearest;
        }

        let target = enemy.target.and_then(lookup);
        if evaluate_due || target_changed {
            let sighting = target.map(|(_, target_pos, level)| TargetSighting {
                dist_sq: target_pos.distance_squared(position),
                size_level: level,
            });
            let next = next_enemy_state(enemy.size_level, sighting, radius_sq);
            if next != enemy.state {
                debug!("enemy {:?} -> {:?}", enemy.state, next);
                enemy.state = next;
            }
        }

        enemy.velocity = match (enemy.state, target) {
            _ if enemy.in_cool_down() => Vec2::ZERO,
            (EnemyState::Chasing, Some((_, target_pos, _))) => {
                chase_velocity(&grid, position, target_pos, config.enemy_chase_speed)
            }
            (EnemyState::Fleeing, Some((_, target_pos, _))) => {
                flee_velocity(position, target_pos, config.enemy_flee_speed)
            }
            _ => Vec2::ZERO,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RADIUS_SQ: f32 = 100.0 * 100.0;

    fn sighting(dist: f32, size_level: usize) -> Option<TargetSighting> {
        Some(TargetSighting {
            dist_sq: dist * dist,
            size_level,
        })
    }

    #[test]
    fn state_follows_range_and_size_thresholds() {
        assert_eq!(next_enemy_state(2, None, RADIUS_SQ), EnemyState::Wander);
        assert_eq!(next_enemy_state(2, sighting(100.1, 1), RADIUS_SQ), EnemyState::Wander);
        assert_eq!(next_enemy_state(2, sighting(100.0, 1), RADIUS_SQ), EnemyState::Chasing);
        assert_eq!(next_enemy_state(2, sighting(50.0, 2), RADIUS_SQ), EnemyState::Chasing);
        assert_eq!(next_enemy_state(2, sighting(50.0, 3), RADIUS_SQ), EnemyState::Fleeing);
    }

    #[test]
    fn fixed_inputs_give_the_same_sequence_every_time() {
        let inputs = [sighting(300.0, 1), sighting(80.0, 1), sighting(80.0, 4), sighting(80.0, 2), None];
        let run = || inputs.iter().map(|s| next_enemy_state(2, *s, RADIUS_SQ)).collect::<Vec<_>>();
        let expected = vec![
            EnemyState::Wander,
            EnemyState::Chasing,
            EnemyState::Fleeing,
            EnemyState::Chasing,
            EnemyState::Wander,
        ];
        assert_eq!(run(), expected);
        assert_eq!(run(), expected);
    }

    #[test]
    fn chase_heads_for_the_first_path_cell() {
        let grid = OccupancyGrid::new(10.0, Vec2::ZERO, Vec2::splat(200.0));
        let v = chase_velocity(&grid, Vec2::new(5.0, 5.0), Vec2::new(95.0, 5.0), 70.0);
        assert!((v - Vec2::new(70.0, 0.0)).length() < 1e-3, "got {v}");
    }

    #[test]
    fn chase_without_a_path_holds_still() {
        let mut grid = OccupancyGrid::new(10.0, Vec2::ZERO, Vec2::splat(200.0));
        for y in 0..=20 {
            grid.mark_obstacle(IVec2::new(5, y));
        }
        let v = chase_velocity(&grid, Vec2::new(5.0, 5.0), Vec2::new(95.0, 5.0), 70.0);
        assert_eq!(v, Vec2::ZERO);
    }

    #[test]
    fn flee_points_away_from_the_threat() {
        let v = flee_velocity(Vec2::ZERO, Vec2::new(0.0, 10.0), 85.0);
        assert_eq!(v, Vec2::new(0.0, -85.0));
        assert_eq!(flee_velocity(Vec2::ONE, Vec2::ONE, 85.0), Vec2::ZERO);
    }

    fn behavior_world() -> (World, Schedule) {
        let mut world = World::new();
        world.insert_resource(LumiaConfig {
            enemy_retarget_interval: 1,
            enemy_evaluate_interval: 1,
            ..LumiaConfig::default()
        });
        world.insert_resource(OccupancyGrid::new(20.0, Vec2::splat(-400.0), Vec2::splat(400.0)));
        world.init_resource::<PathfindingClock>();
        let mut schedule = Schedule::default();
        schedule.add_systems((occupancy_update_system, enemy_behavior_system).chain());
        (world, schedule)
    }

    #[test]
    fn enemy_chases_a_smaller_lumia_in_range() {
        let (mut world, mut schedule) = behavior_world();
        let lumia = world
            .spawn((LumiaBody::new(0, true), Transform::from_xyz(100.0, 0.0, 0.0)))
            .id();
        let enemy = world
            .spawn((EnemyBody::new(2), Transform::from_xyz(0.0, 0.0, 0.0)))
            .id();

        schedule.run(&mut world);

        let enemy = world.get::<EnemyBody>(enemy).unwrap();
        assert_eq!(enemy.target, Some(lumia));
        assert_eq!(enemy.state, EnemyState::Chasing);
        assert!(enemy.velocity.x > 0.0);
    }

    #[test]
    fn enemy_drops_a_removed_target_and_wanders() {
        let (mut world, mut schedule) = behavior_world();
        let lumia = world
            .spawn((LumiaBody::new(4, true), Transform::from_xyz(50.0, 0.0, 0.0)))
            .id();
        let enemy = world
            .spawn((EnemyBody::new(1), Transform::default()))
            .id();

        schedule.run(&mut world);
        assert_eq!(world.get::<EnemyBody>(enemy).unwrap().state, EnemyState::Fleeing);
        assert!(world.get::<EnemyBody>(enemy).unwrap().velocity.x < 0.0);

        world.get_mut::<LumiaBody>(lumia).unwrap().mark_dying();
        schedule.run(&mut world);
        let enemy = world.get::<EnemyBody>(enemy).unwrap();
        assert_eq!(enemy.target, None);
        assert_eq!(enemy.state, EnemyState::Wander);
        assert_eq!(enemy.velocity, Vec2::ZERO);
    }

    #[test]
    fn state_changes_wait_for_the_evaluation_tick() {
        let (mut world, mut schedule) = behavior_world();
        world.resource_mut::<LumiaConfig>().enemy_evaluate_interval = 5;
        let lumia = world
            .spawn((LumiaBody::new(0, true), Transform::from_xyz(60.0, 0.0, 0.0)))
            .id();
        let enemy = world
            .spawn((EnemyBody::new(2), Transform::default()))
            .id();

        // Tick 1 picks the target, which counts as a change and evaluates.
        schedule.run(&mut world);
        assert_eq!(world.get::<EnemyBody>(enemy).unwrap().state, EnemyState::Chasing);

        // The target grows; nothing happens until tick 5.
        world.get_mut::<LumiaBody>(lumia).unwrap().size_level = 4;
        for _ in 2..5 {
            schedule.run(&mut world);
            assert_eq!(world.get::<EnemyBody>(enemy).unwrap().state, EnemyState::Chasing);
        }
        schedule.run(&mut world);
        assert_eq!(world.get::<EnemyBody>(enemy).unwrap().state, EnemyState::Fleeing);
    }
}
