//! Contact classification and the deferred mutation batch.
//!
//! Contacts are turned into *intent* here and nowhere else.  The batch is
//! applied one frame later by the scene layer, never while Rapier is still
//! reporting contacts for the step.

pub mod batch;
pub mod controller;
pub mod dispatch;

pub use batch::MutationBatch;
pub use controller::{CollisionController, LumiaContact};
pub use dispatch::collision_dispatch_system;
