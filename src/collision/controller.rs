//! Contact handlers.  Each one inspects a single Lumia contact and records
//! what should happen in the [`MutationBatch`]; nothing here spawns or
//! despawns.  Plain flag updates (grounding, plant lit, enemy cool-down,
//! button state) are written straight to the components involved.

use super::batch::MutationBatch;
use crate::enemy::EnemyBody;
use crate::lumia::{LumiaBody, LumiaSpawn};
use crate::props::{ButtonSignal, EnergyItem, FloorButton, Plant, StickyWall};
use crate::size_level::{
    merge_levels, radius_of, resize, shrunk_size_level, MergeOutcome, MAX_SIZE_LEVEL,
    MIN_SIZE_LEVEL,
};
use bevy::prelude::*;
use bevy_rapier2d::prelude::Velocity;

/// Accumulates the deferred mutation batch between two apply steps.
#[derive(Resource, Debug, Default)]
pub struct CollisionController {
    pub batch: MutationBatch,
}

/// A Lumia participating in a contact: its gameplay state plus the physics
/// state copied out of Rapier at the time of the contact.
#[derive(Debug)]
pub struct LumiaContact<'a> {
    pub entity: Entity,
    pub body: &'a mut LumiaBody,
    pub position: Vec2,
    pub linvel: Vec2,
    pub angvel: f32,
}

impl<'a> LumiaContact<'a> {
    pub fn new(
        entity: Entity,
        body: &'a mut LumiaBody,
        transform: &Transform,
        velocity: &Velocity,
    ) -> Self {
        Self {
            entity,
            body,
            position: transform.translation.truncate(),
            linvel: velocity.linvel,
            angvel: velocity.angvel,
        }
    }

    #[inline]
    fn bottom(&self) -> f32 {
        self.position.y - self.body.radius()
    }
}

impl CollisionController {
    /// Replace the body with one at level `to`, keeping its footprint,
    /// velocity and avatar-ness.
    fn queue_resize(&mut self, lumia: &mut LumiaContact, to: usize, spike_grace: u32) {
        if !lumia.body.is_live() {
            return;
        }
        let change = resize(lumia.body.size_level, to);
        lumia.body.mark_removed();
        self.batch.lumia_to_remove.insert(lumia.entity);
        self.batch.lumia_to_create.push(LumiaSpawn {
            position: lumia.position + change.position_offset,
            size_level: change.level,
            is_avatar: lumia.body.is_avatar,
            linvel: lumia.linvel,
            angvel: lumia.angvel,
            spike_grace,
        });
    }

    /// Remove the body with no replacement.
    fn queue_death(&mut self, lumia: &mut LumiaContact) {
        if !lumia.body.is_live() {
            return;
        }
        lumia.body.mark_dying();
        self.batch.lumia_to_remove.insert(lumia.entity);
    }

    /// One level down, or destruction at the minimum.
    fn shrink(&mut self, lumia: &mut LumiaContact, spike_grace: u32) {
        match shrunk_size_level(lumia.body.size_level) {
            Some(level) => self.queue_resize(lumia, level, spike_grace),
            None => self.queue_death(lumia),
        }
    }

    /// Light a dark plant at the cost of one size level.
    pub fn plant_contact(&mut self, lumia: &mut LumiaContact, plant: &mut Plant) {
        if plant.is_lit || !lumia.body.is_live() {
            return;
        }
        plant.is_lit = true;
        self.batch.did_light_plant = true;
        self.shrink(lumia, 0);
    }

    /// Cost one size level.  The replacement ignores spikes for
    /// `grace_frames`, since it spawns already touching this spike.
    pub fn spike_contact(&mut self, lumia: &mut LumiaContact, grace_frames: u32) {
        if !lumia.body.is_live() || lumia.body.spike_grace > 0 {
            return;
        }
        self.shrink(lumia, grace_frames);
    }

    /// A bigger Lumia eats the enemy and grows; otherwise the enemy bites
    /// it down one level.  Either way the enemy starts cooling down.
    pub fn enemy_contact(
        &mut self,
        lumia: &mut LumiaContact,
        enemy_entity: Entity,
        enemy: &mut EnemyBody,
        cool_down_frames: u32,
    ) {
        if enemy.is_removed || enemy.in_cool_down() || !lumia.body.is_live() {
            return;
        }
        enemy.start_cool_down(cool_down_frames);

        let level = lumia.body.size_level;
        let new_level = if level > enemy.size_level {
            enemy.is_removed = true;
            self.batch.enemies_to_remove.insert(enemy_entity);
            lumia.body.bigger_size_level()
        } else {
            lumia.body.smaller_size_level()
        };

        if new_level != level {
            self.queue_resize(lumia, new_level, 0);
        } else if level == MIN_SIZE_LEVEL && !enemy.is_removed {
            self.queue_death(lumia);
        }
    }

    /// Absorb an energy item for one size level.  Bodies at the maximum
    /// leave the item where it is.
    pub fn energy_contact(
        &mut self,
        lumia: &mut LumiaContact,
        energy_entity: Entity,
        energy: &mut EnergyItem,
    ) {
        if energy.is_removed || !lumia.body.is_live() || lumia.body.size_level >= MAX_SIZE_LEVEL {
            return;
        }
        energy.is_removed = true;
        self.batch.energy_to_remove.insert(energy_entity);
        self.batch.did_absorb_energy = true;
        let level = lumia.body.bigger_size_level();
        self.queue_resize(lumia, level, 0);
    }

    /// Merge two touching Lumia into one body at `a + b + 1`, or into a
    /// maximum-size body plus an overflow body beside it.
    pub fn lumia_contact(&mut self, a: &mut LumiaContact, b: &mut LumiaContact, overflow_gap: f32) {
        if a.entity == b.entity || !a.body.is_live() || !b.body.is_live() {
            return;
        }
        let Some(outcome) = merge_levels(a.body.size_level, b.body.size_level) else {
            return;
        };

        let linvel = (a.linvel + b.linvel) * 0.5;
        let angvel = a.angvel;
        let is_avatar = a.body.is_avatar || b.body.is_avatar;
        let x = (a.position.x + b.position.x) * 0.5;
        let bottom = a.bottom().min(b.bottom());

        a.body.mark_removed();
        b.body.mark_removed();
        self.batch.lumia_to_remove.insert(a.entity);
        self.batch.lumia_to_remove.insert(b.entity);

        let primary_level = match outcome {
            MergeOutcome::Single(level) => level,
            MergeOutcome::Overflow { primary, .. } => primary,
        };
        let primary_radius = radius_of(primary_level);
        self.batch.lumia_to_create.push(LumiaSpawn {
            position: Vec2::new(x, bottom + primary_radius),
            size_level: primary_level,
            is_avatar,
            linvel,
            angvel,
            spike_grace: 0,
        });

        if let MergeOutcome::Overflow { overflow, .. } = outcome {
            let overflow_radius = radius_of(overflow);
            self.batch.lumia_to_create.push(LumiaSpawn {
                position: Vec2::new(
                    x + primary_radius + overflow_radius + overflow_gap,
                    bottom + overflow_radius,
                ),
                size_level: overflow,
                is_avatar: false,
                linvel,
                angvel,
                spike_grace: 0,
            });
        }
    }

    /// Press an idle button and record who is holding it.
    pub fn button_pressed(&mut self, lumia: &mut LumiaContact, button: &mut FloorButton) {
        if !lumia.body.is_live() || button.is_pushing_down || button.cool_down > 0 {
            return;
        }
        button.is_pushing_down = true;
        button.pressed_by = Some(lumia.entity);
        lumia.body.is_on_button = true;
        self.batch.door_signals.insert(button.door, ButtonSignal::Pressed);
    }

    /// Release the button if `lumia` is the body recorded as pressing it.
    /// `body` is `None` when the Lumia has already been despawned.  Only a
    /// live body stepping off starts the cool-down; a replaced or destroyed
    /// presser does not.
    pub fn button_released(
        &mut self,
        lumia: Entity,
        body: Option<&mut LumiaBody>,
        button: &mut FloorButton,
        cool_down_frames: u32,
    ) {
        if button.pressed_by != Some(lumia) {
            return;
        }
        match body {
            Some(body) => {
                if body.is_live() {
                    button.release(cool_down_frames);
                } else {
                    button.release_stale();
                }
                body.is_on_button = false;
            }
            None => button.release_stale(),
        }
        self.batch.door_signals.insert(button.door, ButtonSignal::Released);
    }

    pub fn sticky_wall_begin(&mut self, lumia: &mut LumiaContact, wall: &StickyWall) {
        if lumia.body.is_on_sticky_wall || !lumia.body.is_live() {
            return;
        }
        lumia.body.stick_direction = -wall.surface_normal;
        self.batch.stick(lumia.entity);
    }

    pub fn sticky_wall_end(&mut self, lumia: &mut LumiaContact) {
        let pending = self.batch.lumia_to_stick.contains(&lumia.entity);
        if lumia.body.is_on_sticky_wall || pending {
            self.batch.unstick(lumia.entity);
        }
    }
}
