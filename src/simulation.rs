//! [`LumiaPlugin`]: resources and the per-frame system order.
//!
//! ## Frame order
//!
//! `Update` (chained, before Rapier steps the world in `PostUpdate`):
//! 1. [`avatar_action_system`]: select / split / launch; split mutates now.
//! 2. [`apply_mutation_batch_system`]: creations, removals with avatar
//!    hand-off, stick / unstick, door signals from the previous step.
//! 3. Spike grace countdown, merge attraction, button revalidation, door
//!    motion.
//! 4. Enemy cool-down, occupancy grid, behaviour, motion.
//!
//! `PostUpdate`, after Rapier writeback:
//! 5. [`collision_dispatch_system`] records the next batch.
//! 6. Win / fail check, reset, camera.
//!
//! The plugin does not add Rapier itself, so tests can drive it headless by
//! injecting `CollisionEvent` messages.

use crate::collision::{collision_dispatch_system, CollisionController};
use crate::config::LumiaConfig;
use crate::enemy::{enemy_cool_down_system, enemy_motion_system};
use crate::input::PlayerIntent;
use crate::lumia::lumia_grace_system;
use crate::pathfinding::{
    enemy_behavior_system, occupancy_update_system, OccupancyGrid, PathfindingClock,
};
use crate::props::{button_revalidation_system, door_motion_system};
use crate::scene::{
    apply_mutation_batch_system, avatar_action_system, camera_follow_system, level_reset_system,
    level_status_system, merge_attraction_system, Avatar, LevelLayout, LevelStatus,
};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

pub struct LumiaPlugin;

impl Plugin for LumiaPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LumiaConfig>()
            .init_resource::<LevelLayout>()
            .init_resource::<LevelStatus>()
            .init_resource::<CollisionController>()
            .init_resource::<Avatar>()
            .init_resource::<PlayerIntent>()
            .init_resource::<OccupancyGrid>()
            .init_resource::<PathfindingClock>()
            .add_message::<CollisionEvent>()
            .add_systems(
                Update,
                (
                    avatar_action_system,
                    apply_mutation_batch_system,
                    lumia_grace_system,
                    merge_attraction_system,
                    button_revalidation_system,
                    door_motion_system,
                    enemy_cool_down_system,
                    occupancy_update_system,
                    enemy_behavior_system,
                    enemy_motion_system,
                )
                    .chain(),
            )
            .add_systems(
                PostUpdate,
                (
                    collision_dispatch_system,
                    level_status_system,
                    level_reset_system,
                    camera_follow_system,
                )
                    .chain()
                    .after(PhysicsSet::Writeback),
            );
    }
}
