//! Runtime gameplay configuration loaded from `assets/lumia.toml`.
//!
//! [`LumiaConfig`] is a Bevy [`Resource`] that mirrors every constant in
//! [`crate::constants`].  At startup, [`load_lumia_config`] reads
//! `assets/lumia.toml` and overwrites the defaults with any values present in
//! the file.  Missing keys fall back to the compile-time defaults, so a minimal
//! TOML can override just the constants you care about.
//!
//! ## Usage in systems
//!
//! Add `config: Res<LumiaConfig>` to any system parameter list and read values
//! with `config.enemy_chase_speed`, `config.door_speed`, etc.
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `LumiaConfig::default()`.

use crate::constants::*;
use crate::error::{validate_positive, LumiaResult};
use bevy::prelude::*;
use serde::Deserialize;

/// Path of the optional tuning override file, relative to the working directory.
pub const CONFIG_PATH: &str = "assets/lumia.toml";

/// Runtime-tunable physics and gameplay configuration.
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LumiaConfig {
    // ── World ────────────────────────────────────────────────────────────────
    pub gravity: f32,

    // ── Lumia: Movement ──────────────────────────────────────────────────────
    pub max_launch_speed: f32,
    pub split_speed: f32,
    pub split_gap: f32,
    pub lumia_friction: f32,
    pub lumia_restitution: f32,

    // ── Lumia: Merging ───────────────────────────────────────────────────────
    pub merge_attraction_radius: f32,
    pub merge_attraction_speed: f32,
    pub merge_overflow_gap: f32,
    pub spike_grace_frames: u32,

    // ── Enemies ──────────────────────────────────────────────────────────────
    pub enemy_chase_speed: f32,
    pub enemy_flee_speed: f32,
    pub enemy_detection_radius: f32,
    pub enemy_cool_down_frames: u32,
    pub enemy_retarget_interval: u32,
    pub enemy_evaluate_interval: u32,

    // ── Pathfinding ──────────────────────────────────────────────────────────
    pub path_cell_size: f32,

    // ── Buttons & Doors ──────────────────────────────────────────────────────
    pub button_cool_down_frames: u32,
    pub door_speed: f32,
    pub door_min_scale: f32,

    // ── Level Flow ───────────────────────────────────────────────────────────
    pub win_countdown_frames: u32,
    pub fail_countdown_frames: u32,

    // ── Camera ───────────────────────────────────────────────────────────────
    pub camera_max_step: f32,
    pub camera_deadband: f32,
}

impl Default for LumiaConfig {
    fn default() -> Self {
        Self {
            // World
            gravity: GRAVITY,
            // Lumia: Movement
            max_launch_speed: MAX_LAUNCH_SPEED,
            split_speed: SPLIT_SPEED,
            split_gap: SPLIT_GAP,
            lumia_friction: LUMIA_FRICTION,
            lumia_restitution: LUMIA_RESTITUTION,
            // Lumia: Merging
            merge_attraction_radius: MERGE_ATTRACTION_RADIUS,
            merge_attraction_speed: MERGE_ATTRACTION_SPEED,
            merge_overflow_gap: MERGE_OVERFLOW_GAP,
            spike_grace_frames: SPIKE_GRACE_FRAMES,
            // Enemies
            enemy_chase_speed: ENEMY_CHASE_SPEED,
            enemy_flee_speed: ENEMY_FLEE_SPEED,
            enemy_detection_radius: ENEMY_DETECTION_RADIUS,
            enemy_cool_down_frames: ENEMY_COOL_DOWN_FRAMES,
            enemy_retarget_interval: ENEMY_RETARGET_INTERVAL,
            enemy_evaluate_interval: ENEMY_EVALUATE_INTERVAL,
            // Pathfinding
            path_cell_size: PATH_CELL_SIZE,
            // Buttons & Doors
            button_cool_down_frames: BUTTON_COOL_DOWN_FRAMES,
            door_speed: DOOR_SPEED,
            door_min_scale: DOOR_MIN_SCALE,
            // Level Flow
            win_countdown_frames: WIN_COUNTDOWN_FRAMES,
            fail_countdown_frames: FAIL_COUNTDOWN_FRAMES,
            // Camera
            camera_max_step: CAMERA_MAX_STEP,
            camera_deadband: CAMERA_DEADBAND,
        }
    }
}

impl LumiaConfig {
    /// Reject values that would stall or destabilise the simulation.
    pub fn validate(&self) -> LumiaResult<()> {
        validate_positive("gravity", self.gravity)?;
        validate_positive("max_launch_speed", self.max_launch_speed)?;
        validate_positive("path_cell_size", self.path_cell_size)?;
        validate_positive("enemy_detection_radius", self.enemy_detection_radius)?;
        validate_positive("door_speed", self.door_speed)?;
        validate_positive("camera_max_step", self.camera_max_step)?;
        Ok(())
    }

    /// Squared detection radius, compared against squared distances.
    #[inline]
    pub fn enemy_detection_radius_sq(&self) -> f32 {
        self.enemy_detection_radius * self.enemy_detection_radius
    }

    /// Squared merge attraction radius, compared against squared distances.
    #[inline]
    pub fn merge_attraction_radius_sq(&self) -> f32 {
        self.merge_attraction_radius * self.merge_attraction_radius
    }
}

/// Parse a TOML override on top of the compiled defaults and validate it.
pub fn parse_lumia_config(contents: &str) -> Result<LumiaConfig, String> {
    let config = toml::from_str::<LumiaConfig>(contents).map_err(|e| e.to_string())?;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Startup system: attempt to load `assets/lumia.toml` and overwrite the
/// `LumiaConfig` resource with any values present in the file.
///
/// Missing keys retain their compiled defaults.  Parse and validation errors
/// are logged but do not abort the game.  A missing file is not an error.
pub fn load_lumia_config(mut config: ResMut<LumiaConfig>) {
    match std::fs::read_to_string(CONFIG_PATH) {
        Ok(contents) => match parse_lumia_config(&contents) {
            Ok(loaded) => {
                *config = loaded;
                info!("Loaded gameplay config from {CONFIG_PATH}");
            }
            Err(e) => {
                warn!("Failed to load {CONFIG_PATH}: {e}; using defaults");
            }
        },
        Err(_) => {
            info!("No {CONFIG_PATH} found; using compiled defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        assert!(LumiaConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = parse_lumia_config("enemy_chase_speed = 12.5\ndoor_speed = 0.5\n")
            .expect("partial override should parse");
        assert_eq!(config.enemy_chase_speed, 12.5);
        assert_eq!(config.door_speed, 0.5);
        assert_eq!(config.gravity, GRAVITY);
        assert_eq!(config.enemy_cool_down_frames, ENEMY_COOL_DOWN_FRAMES);
    }

    #[test]
    fn non_positive_cell_size_is_rejected() {
        let err = parse_lumia_config("path_cell_size = 0.0\n").unwrap_err();
        assert!(err.contains("path_cell_size"), "unexpected error: {err}");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(parse_lumia_config("gravity = \"lots\"").is_err());
    }
}
