//! World integration: the per-frame deferred apply, avatar actions, level
//! population and flow, and camera tracking.

pub mod apply;
pub mod avatar;
pub mod camera;
pub mod level;

pub use apply::apply_mutation_batch_system;
pub use avatar::{avatar_action_system, merge_attraction_system, Avatar};
pub use camera::{camera_follow_system, setup_camera};
pub use level::{
    level_reset_system, level_status_system, load_level_layout_system, populate_level_system,
    LevelEntity, LevelLayout, LevelOutcome, LevelStatus,
};
