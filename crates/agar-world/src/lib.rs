//! World state for the agar.io client.
//!
//! [`WorldStore`] owns the live [`World`] and is the only place it is
//! mutated. The dispatch loop applies decoded events through the
//! `register_*` operations; readers take snapshots or look up single
//! entities.

mod store;
mod world;

pub use store::WorldStore;
pub use world::World;
