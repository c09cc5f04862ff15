use super::controller::{CollisionController, LumiaContact};
use crate::config::LumiaConfig;
use crate::enemy::EnemyBody;
use crate::lumia::LumiaBody;
use crate::props::{EnergyItem, FloorButton, Ground, Plant, Spike, StickyWall};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Classify every Rapier contact event of this frame and hand it to the
/// matching [`CollisionController`] handler.
///
/// Runs after Rapier's writeback, so the contacts belong to the physics step
/// that just finished.  The batch it fills is applied on the next frame by
/// [`crate::scene::apply::apply_mutation_batch_system`].
///
/// | Pair | Started | Stopped |
/// |------|---------|---------|
/// | Lumia / Lumia | merge | - |
/// | Lumia / Plant | light + shrink | - |
/// | Lumia / Spike | shrink | - |
/// | Lumia / Enemy | eat or bite | - |
/// | Lumia / Energy | grow | - |
/// | Lumia / Button | press | release |
/// | Lumia / StickyWall | stick | unstick |
/// | Lumia / Ground | ground counter +1 | ground counter -1 |
#[allow(clippy::too_many_arguments)]
pub fn collision_dispatch_system(
    mut collision_events: MessageReader<CollisionEvent>,
    controller: ResMut<CollisionController>,
    config: Res<LumiaConfig>,
    mut q_lumia: Query<(&mut LumiaBody, &Transform, &Velocity)>,
    mut q_plants: Query<&mut Plant>,
    q_spikes: Query<(), With<Spike>>,
    mut q_enemies: Query<&mut EnemyBody>,
    mut q_energy: Query<&mut EnergyItem>,
    mut q_buttons: Query<&mut FloorButton>,
    q_walls: Query<&StickyWall>,
    q_ground: Query<(), With<Ground>>,
) {
    let controller = controller.into_inner();

    for event in collision_events.read() {
        let (e1, e2, started) = match event {
            CollisionEvent::Started(e1, e2, _) => (*e1, *e2, true),
            CollisionEvent::Stopped(e1, e2, _) => (*e1, *e2, false),
        };

        let first_is_lumia = q_lumia.contains(e1);
        let second_is_lumia = q_lumia.contains(e2);

        if first_is_lumia && second_is_lumia {
            if !started {
                continue;
            }
            let Ok([(body_a, tf_a, vel_a), (body_b, tf_b, vel_b)]) = q_lumia.get_many_mut([e1, e2])
            else {
                continue;
            };
            let mut a = LumiaContact::new(e1, body_a.into_inner(), tf_a, vel_a);
            let mut b = LumiaContact::new(e2, body_b.into_inner(), tf_b, vel_b);
            controller.lumia_contact(&mut a, &mut b, config.merge_overflow_gap);
            continue;
        }

        let (lumia_entity, other) = if first_is_lumia {
            (e1, e2)
        } else if second_is_lumia {
            (e2, e1)
        } else {
            // The Lumia may already be despawned when its Stopped event arrives;
            // a button it was holding still has to come up.
            if !started {
                for (gone, button_entity) in [(e1, e2), (e2, e1)] {
                    if let Ok(mut button) = q_buttons.get_mut(button_entity) {
                        controller.button_released(gone, None, &mut button, config.button_cool_down_frames);
                    }
                }
            }
            continue;
        };

        let Ok((body, transform, velocity)) = q_lumia.get_mut(lumia_entity) else {
            continue;
        };
        let mut lumia = LumiaContact::new(lumia_entity, body.into_inner(), transform, velocity);

        if started {
            if let Ok(mut plant) = q_plants.get_mut(other) {
                controller.plant_contact(&mut lumia, &mut plant);
            } else if q_spikes.contains(other) {
                controller.spike_contact(&mut lumia, config.spike_grace_frames);
            } else if let Ok(mut enemy) = q_enemies.get_mut(other) {
                controller.enemy_contact(&mut lumia, other, &mut enemy, config.enemy_cool_down_frames);
            } else if let Ok(mut energy) = q_energy.get_mut(other) {
                controller.energy_contact(&mut lumia, other, &mut energy);
            } else if let Ok(mut button) = q_buttons.get_mut(other) {
                controller.button_pressed(&mut lumia, &mut button);
            } else if let Ok(wall) = q_walls.get(other) {
                controller.sticky_wall_begin(&mut lumia, wall);
            } else if q_ground.contains(other) {
                lumia.body.touch_ground();
            }
        } else if let Ok(mut button) = q_buttons.get_mut(other) {
            controller.button_released(
                lumia_entity,
                Some(&mut *lumia.body),
                &mut button,
                config.button_cool_down_frames,
            );
        } else if q_walls.contains(other) {
            controller.sticky_wall_end(&mut lumia);
        } else if q_ground.contains(other) {
            lumia.body.leave_ground();
        }
    }
}
