use bevy::prelude::*;
use bevy::window::WindowResolution;
use bevy_rapier2d::prelude::*;

use lumia::config::{self, LumiaConfig};
use lumia::input;
use lumia::rendering;
use lumia::scene::{self, level};
use lumia::simulation::LumiaPlugin;

/// Configure Rapier physics: downward gravity from the loaded config.
fn setup_physics_config(mut q: Query<&mut RapierConfiguration>, config: Res<LumiaConfig>) {
    for mut cfg in q.iter_mut() {
        cfg.gravity = Vec2::new(0.0, -config.gravity);
    }
}

fn main() {
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Lumia".into(),
            resolution: WindowResolution::new(1200, 680),
            ..Default::default()
        }),
        ..Default::default()
    }))
    .insert_resource(ClearColor(Color::srgb(0.04, 0.04, 0.07)))
    // pixels_per_meter(1.0) keeps world units and physics units identical, so
    // size-table masses and launch impulses need no conversion.
    .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(1.0))
    .add_plugins(LumiaPlugin)
    .add_systems(
        Startup,
        (
            // Config and layout first so population sees the final values.
            config::load_lumia_config,
            level::load_level_layout_system,
            setup_physics_config,
            scene::setup_camera,
            rendering::setup_status_hud,
            level::populate_level_system,
        )
            .chain(),
    )
    .add_systems(
        Update,
        (input::keyboard_to_intent_system, input::mouse_to_intent_system)
            .before(scene::avatar_action_system),
    )
    .add_systems(
        Update,
        (rendering::gizmo_rendering_system, rendering::status_hud_system),
    );

    app.run();
}
