//! Lumia: a splitting and merging blob platformer.
//!
//! The crate is the gameplay core: the size-level model, contact
//! classification into a deferred mutation batch, the per-frame apply step,
//! and enemy pathfinding.  [`simulation::LumiaPlugin`] wires it into a Bevy
//! app; Rapier supplies the physics.

pub mod collision;
pub mod config;
pub mod constants;
pub mod enemy;
pub mod error;
pub mod input;
pub mod lumia;
pub mod pathfinding;
pub mod props;
pub mod rendering;
pub mod scene;
pub mod simulation;
pub mod size_level;
