use crate::lumia::LumiaSpawn;
use crate::props::ButtonSignal;
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

/// Structural changes recorded while contacts are processed and applied on
/// the next frame, outside any physics callback.
///
/// The sets are unordered.  A body in `lumia_to_remove` has its removal latch
/// set at the moment it was queued, so no other channel sees it again.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MutationBatch {
    pub lumia_to_create: Vec<LumiaSpawn>,
    pub lumia_to_remove: HashSet<Entity>,
    pub lumia_to_stick: HashSet<Entity>,
    pub lumia_to_unstick: HashSet<Entity>,
    pub energy_to_remove: HashSet<Entity>,
    pub enemies_to_remove: HashSet<Entity>,
    /// Latest button signal per door.
    pub door_signals: HashMap<Entity, ButtonSignal>,
    pub did_light_plant: bool,
    pub did_absorb_energy: bool,
}

impl MutationBatch {
    pub fn is_empty(&self) -> bool {
        self.lumia_to_create.is_empty()
            && self.lumia_to_remove.is_empty()
            && self.lumia_to_stick.is_empty()
            && self.lumia_to_unstick.is_empty()
            && self.energy_to_remove.is_empty()
            && self.enemies_to_remove.is_empty()
            && self.door_signals.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Queue a stick; cancels a pending unstick of the same body.
    pub fn stick(&mut self, entity: Entity) {
        self.lumia_to_unstick.remove(&entity);
        self.lumia_to_stick.insert(entity);
    }

    /// Queue an unstick; cancels a pending stick of the same body.
    pub fn unstick(&mut self, entity: Entity) {
        self.lumia_to_stick.remove(&entity);
        self.lumia_to_unstick.insert(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_stick_intent_wins() {
        let mut world = World::new();
        let body = world.spawn_empty().id();
        let mut batch = MutationBatch::default();

        batch.stick(body);
        batch.unstick(body);
        assert!(!batch.lumia_to_stick.contains(&body));
        assert!(batch.lumia_to_unstick.contains(&body));

        batch.stick(body);
        assert!(batch.lumia_to_stick.contains(&body));
        assert!(!batch.lumia_to_unstick.contains(&body));
    }

    #[test]
    fn clear_resets_flags_and_sets() {
        let mut world = World::new();
        let mut batch = MutationBatch::default();
        assert!(batch.is_empty());
        batch.energy_to_remove.insert(world.spawn_empty().id());
        batch.did_absorb_energy = true;
        assert!(!batch.is_empty());
        batch.clear();
        assert!(batch.is_empty());
        assert!(!batch.did_absorb_energy);
    }
}
