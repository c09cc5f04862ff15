//! Centralised physics and gameplay constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place without source-diving across multiple modules.
//!
//! ## Tuning guidance
//!
//! Every value below except `FALL_FLOOR_Y` is mirrored by a field on
//! [`crate::config::LumiaConfig`] and can be overridden from
//! `assets/lumia.toml` without recompiling.  The
//! size-level table itself is not tunable; it lives in [`crate::size_level`].

// ── World ─────────────────────────────────────────────────────────────────────

/// Downward gravity (u/s²) written into the Rapier configuration at startup.
///
/// Rapier runs at `pixels_per_meter(1.0)`, so this is expressed directly in
/// world units.  Higher values make launches shorter and falls faster.
pub const GRAVITY: f32 = 600.0;

/// Default height below which an avatar is considered fallen out of the level.
/// Used when a level layout does not set its own `fall_floor_y`.
pub const FALL_FLOOR_Y: f32 = -600.0;

// ── Lumia: Movement ───────────────────────────────────────────────────────────

/// Upper bound (u/s) on the speed a single launch can give the avatar.
pub const MAX_LAUNCH_SPEED: f32 = 520.0;

/// Horizontal speed (u/s) given to each half of a split, in opposite directions.
pub const SPLIT_SPEED: f32 = 90.0;

/// Clear space (u) left between the two halves of a split at spawn time.
///
/// Non-zero so the halves are not already touching (and immediately merging)
/// on the frame after the split.
pub const SPLIT_GAP: f32 = 4.0;

/// Friction coefficient for Lumia colliders.
pub const LUMIA_FRICTION: f32 = 0.7;

/// Restitution coefficient for Lumia colliders.
/// 0.0 = perfectly inelastic; 1.0 = perfectly elastic.
pub const LUMIA_RESTITUTION: f32 = 0.15;

// ── Lumia: Merging ────────────────────────────────────────────────────────────

/// Radius (u) around the avatar within which other Lumia are pulled in while
/// the merge action is held.
pub const MERGE_ATTRACTION_RADIUS: f32 = 220.0;

/// Speed (u/s) at which attracted Lumia move toward the avatar.
pub const MERGE_ATTRACTION_SPEED: f32 = 160.0;

/// Frames a body shrunk by a spike ignores spikes.  The replacement spawns
/// touching the same spike, and that fresh contact must not cost another level.
pub const SPIKE_GRACE_FRAMES: u32 = 10;

/// Clear space (u) between the max-size body and the overflow body produced
/// when a merge exceeds the size table.
pub const MERGE_OVERFLOW_GAP: f32 = 2.0;

// ── Enemies ───────────────────────────────────────────────────────────────────

/// Speed (u/s) of an enemy following its A* path toward a target.
pub const ENEMY_CHASE_SPEED: f32 = 70.0;

/// Speed (u/s) of an enemy running directly away from a bigger target.
pub const ENEMY_FLEE_SPEED: f32 = 85.0;

/// Distance (u) within which an enemy notices the nearest Lumia.
pub const ENEMY_DETECTION_RADIUS: f32 = 260.0;

/// Frames an enemy holds still (and ignores Lumia contacts) after a bite.
pub const ENEMY_COOL_DOWN_FRAMES: u32 = 60;

/// Enemies re-pick their nearest target every this many ticks.
pub const ENEMY_RETARGET_INTERVAL: u32 = 30;

/// Enemies re-evaluate their Wander/Chasing/Fleeing state every this many ticks.
pub const ENEMY_EVALUATE_INTERVAL: u32 = 10;

// ── Pathfinding ───────────────────────────────────────────────────────────────

/// World-space edge length (u) of one occupancy-grid cell.
///
/// Should be close to the smallest Lumia diameter: much larger and narrow
/// corridors disappear from the grid, much smaller and A* expands far more
/// cells than it needs to.
pub const PATH_CELL_SIZE: f32 = 20.0;

// ── Buttons & Doors ───────────────────────────────────────────────────────────

/// Frames a released button ignores new presses.
pub const BUTTON_COOL_DOWN_FRAMES: u32 = 20;

/// Door animation progress per frame (fraction of the full open/close travel).
pub const DOOR_SPEED: f32 = 0.04;

/// Scale a fully open `Shrinking` door shrinks down to.
pub const DOOR_MIN_SCALE: f32 = 0.05;

// ── Level Flow ────────────────────────────────────────────────────────────────

/// Frames between lighting the last plant and the level reset.
pub const WIN_COUNTDOWN_FRAMES: u32 = 120;

/// Frames between the failure condition and the level reset.
pub const FAIL_COUNTDOWN_FRAMES: u32 = 90;

// ── Camera ────────────────────────────────────────────────────────────────────

/// Maximum distance (u) the camera moves toward the avatar in one frame.
pub const CAMERA_MAX_STEP: f32 = 12.0;

/// Within this distance (u) of the avatar the camera snaps instead of easing.
pub const CAMERA_DEADBAND: f32 = 1.0;
