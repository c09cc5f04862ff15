//! Gizmo drawing and the status HUD.
//!
//! Everything drawn here is a pure function of gameplay state; nothing in
//! this module writes back into the simulation.

use crate::enemy::{EnemyBody, EnemyState};
use crate::lumia::{LumiaBody, LumiaState};
use crate::props::{Door, EnergyItem, FloorButton, Ground, Plant, Spike, StickyWall};
use crate::scene::level::{LevelOutcome, LevelStatus};
use bevy::prelude::*;
use bevy_rapier2d::prelude::Collider;

/// Marker for the top-left status HUD node.
#[derive(Component)]
pub struct StatusHud;

pub fn lumia_color(body: &LumiaBody) -> Color {
    match (body.is_avatar, body.state) {
        (true, LumiaState::Merging) => Color::srgb(1.0, 0.85, 0.35),
        (true, _) => Color::srgb(0.55, 1.0, 0.75),
        (false, _) if body.is_on_sticky_wall => Color::srgb(0.45, 0.65, 1.0),
        (false, _) => Color::srgb(0.30, 0.75, 0.55),
    }
}

pub fn enemy_color(enemy: &EnemyBody) -> Color {
    if enemy.in_cool_down() {
        return Color::srgb(0.5, 0.5, 0.5);
    }
    match enemy.state {
        EnemyState::Wander => Color::srgb(0.75, 0.35, 0.75),
        EnemyState::Chasing => Color::srgb(1.0, 0.2, 0.2),
        EnemyState::Fleeing => Color::srgb(0.95, 0.6, 0.2),
    }
}

/// HUD line for the current level state.
pub fn status_label(status: &LevelStatus, plants_lit: usize, plants_total: usize) -> String {
    match status.outcome {
        LevelOutcome::Playing => format!("Plants lit: {plants_lit}/{plants_total}"),
        LevelOutcome::Won => "Level complete!".to_string(),
        LevelOutcome::Failed => "All Lumia lost. Restarting...".to_string(),
    }
}

fn draw_rect(gizmos: &mut Gizmos, center: Vec2, half_extents: Vec2, scale: Vec2, color: Color) {
    gizmos.rect_2d(Isometry2d::from_translation(center), half_extents * 2.0 * scale, color);
}

/// Draw every body as a circle or rectangle sized from its collider.
#[allow(clippy::too_many_arguments)]
pub fn gizmo_rendering_system(
    mut gizmos: Gizmos,
    q_lumia: Query<(&LumiaBody, &Transform)>,
    q_enemies: Query<(&EnemyBody, &Transform)>,
    q_plants: Query<(&Plant, &Transform)>,
    q_energy: Query<(&EnergyItem, &Transform)>,
    q_buttons: Query<(&FloorButton, &Transform, &Collider)>,
    q_doors: Query<(&Door, &Transform, &Collider)>,
    q_static: Query<(&Transform, &Collider, Has<Spike>, Has<StickyWall>), Or<(With<Ground>, With<Spike>, With<StickyWall>)>>,
) {
    for (body, transform) in q_lumia.iter() {
        if body.is_removed {
            continue;
        }
        let pos = transform.translation.truncate();
        gizmos.circle_2d(pos, body.radius(), lumia_color(body));
    }

    for (enemy, transform) in q_enemies.iter() {
        if enemy.is_removed {
            continue;
        }
        gizmos.circle_2d(transform.translation.truncate(), enemy.radius(), enemy_color(enemy));
    }

    for (plant, transform) in q_plants.iter() {
        let color = if plant.is_lit {
            Color::srgb(1.0, 0.95, 0.4)
        } else {
            Color::srgb(0.25, 0.35, 0.2)
        };
        gizmos.circle_2d(transform.translation.truncate(), 12.0, color);
    }

    for (energy, transform) in q_energy.iter() {
        if !energy.is_removed {
            gizmos.circle_2d(transform.translation.truncate(), 8.0, Color::srgb(0.3, 0.9, 1.0));
        }
    }

    for (button, transform, collider) in q_buttons.iter() {
        let Some(cuboid) = collider.as_cuboid() else {
            continue;
        };
        let color = if button.is_pushing_down {
            Color::srgb(0.4, 1.0, 0.4)
        } else {
            Color::srgb(0.6, 0.6, 0.3)
        };
        draw_rect(&mut gizmos, transform.translation.truncate(), cuboid.half_extents(), Vec2::ONE, color);
    }

    for (door, transform, collider) in q_doors.iter() {
        let Some(cuboid) = collider.as_cuboid() else {
            continue;
        };
        let color = if door.is_open() {
            Color::srgba(0.6, 0.6, 0.9, 0.35)
        } else {
            Color::srgb(0.6, 0.6, 0.9)
        };
        draw_rect(
            &mut gizmos,
            transform.translation.truncate(),
            cuboid.half_extents(),
            transform.scale.truncate(),
            color,
        );
    }

    for (transform, collider, is_spike, is_sticky) in q_static.iter() {
        let Some(cuboid) = collider.as_cuboid() else {
            continue;
        };
        let color = if is_spike {
            Color::srgb(0.9, 0.25, 0.25)
        } else if is_sticky {
            Color::srgba(0.45, 0.65, 1.0, 0.5)
        } else {
            Color::srgb(0.65, 0.65, 0.65)
        };
        draw_rect(&mut gizmos, transform.translation.truncate(), cuboid.half_extents(), Vec2::ONE, color);
    }
}

pub fn setup_status_hud(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(10.0),
                top: Val::Px(10.0),
                ..default()
            },
            StatusHud,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: 18.0,
                    ..default()
                },
                TextColor(Color::srgb(0.95, 0.88, 0.45)),
            ));
        });
}

pub fn status_hud_system(
    status: Res<LevelStatus>,
    q_plants: Query<&Plant>,
    parent_query: Query<&Children, With<StatusHud>>,
    mut text_query: Query<&mut Text>,
) {
    let total = q_plants.iter().count();
    let lit = q_plants.iter().filter(|p| p.is_lit).count();
    let label = status_label(&status, lit, total);
    for children in parent_query.iter() {
        for child in children.iter() {
            if let Ok(mut text) = text_query.get_mut(child) {
                if text.0 != label {
                    text.0.clone_from(&label);
                }
            }
        }
    }
}
