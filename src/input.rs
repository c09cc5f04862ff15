//! Keyboard / mouse → [`PlayerIntent`].
//!
//! Gameplay systems never poll devices; they consume `PlayerIntent`, which
//! tests fill in directly.  The intent is consumed (reset) by
//! [`crate::scene::avatar::avatar_action_system`] each frame.
//!
//! | Input | Intent |
//! |-------|--------|
//! | Left click | select the Lumia under the cursor |
//! | Right click | launch toward the cursor |
//! | Space (+ A / D / W) | launch in the held direction, straight up by default |
//! | S | split |
//! | M or Shift (held) | merge |

use crate::config::LumiaConfig;
use crate::scene::avatar::Avatar;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

/// Launch speed per world unit between the avatar and a right click.
const AIM_TO_SPEED: f32 = 2.0;

/// One frame of player requests.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct PlayerIntent {
    /// Desired launch velocity (u/s), clamped later.
    pub launch: Option<Vec2>,
    pub split: bool,
    /// Held: pull nearby Lumia toward the avatar.
    pub merge: bool,
    /// World-space point to select a new avatar at.
    pub select_at: Option<Vec2>,
}

pub fn keyboard_to_intent_system(
    keys: Res<ButtonInput<KeyCode>>,
    config: Res<LumiaConfig>,
    mut intent: ResMut<PlayerIntent>,
) {
    if keys.just_pressed(KeyCode::Space) {
        let mut direction = Vec2::ZERO;
        if keys.pressed(KeyCode::KeyA) {
            direction.x -= 1.0;
        }
        if keys.pressed(KeyCode::KeyD) {
            direction.x += 1.0;
        }
        if keys.pressed(KeyCode::KeyW) || direction == Vec2::ZERO {
            direction.y += 1.0;
        }
        intent.launch = Some(direction.normalize() * config.max_launch_speed);
    }
    if keys.just_pressed(KeyCode::KeyS) {
        intent.split = true;
    }
    intent.merge = keys.any_pressed([KeyCode::KeyM, KeyCode::ShiftLeft, KeyCode::ShiftRight]);
}

pub fn mouse_to_intent_system(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    q_camera: Query<(&Camera, &GlobalTransform)>,
    q_transform: Query<&Transform>,
    avatar: Res<Avatar>,
    mut intent: ResMut<PlayerIntent>,
) {
    let left = buttons.just_pressed(MouseButton::Left);
    let right = buttons.just_pressed(MouseButton::Right);
    if !left && !right {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok((camera, camera_transform)) = q_camera.single() else {
        return;
    };
    let Ok(world_point) = camera.viewport_to_world_2d(camera_transform, cursor) else {
        return;
    };

    if left {
        intent.select_at = Some(world_point);
    }
    if right {
        let avatar_pos = avatar
            .entity
            .and_then(|e| q_transform.get(e).ok())
            .map(|t| t.translation.truncate());
        if let Some(avatar_pos) = avatar_pos {
            intent.launch = Some((world_point - avatar_pos) * AIM_TO_SPEED);
        }
    }
}
