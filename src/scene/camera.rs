use crate::config::LumiaConfig;
use crate::lumia::LumiaBody;
use crate::scene::avatar::Avatar;
use bevy::prelude::*;

/// Move `current` toward `target` by at most `max_step`.  Within `deadband`
/// it snaps onto the target.
pub fn step_toward(current: Vec2, target: Vec2, max_step: f32, deadband: f32) -> Vec2 {
    let offset = target - current;
    if offset.length() <= deadband.max(0.0) {
        return target;
    }
    current + offset.clamp_length_max(max_step)
}

pub fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
    info!("Camera spawned");
}

/// Ease the camera toward the avatar.  Camera Z is preserved.
pub fn camera_follow_system(
    config: Res<LumiaConfig>,
    avatar: Res<Avatar>,
    q_avatar: Query<&Transform, With<LumiaBody>>,
    mut q_camera: Query<&mut Transform, (With<Camera>, Without<LumiaBody>)>,
) {
    let Some(target) = avatar
        .entity
        .and_then(|e| q_avatar.get(e).ok())
        .map(|t| t.translation.truncate())
    else {
        return;
    };
    let Ok(mut camera) = q_camera.single_mut() else {
        return;
    };
    let next = step_toward(
        camera.translation.truncate(),
        target,
        config.camera_max_step,
        config.camera_deadband,
    );
    camera.translation.x = next.x;
    camera.translation.y = next.y;
}
