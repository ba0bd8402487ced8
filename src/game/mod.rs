pub mod bots;
pub mod combat;
pub mod movement;
pub mod snapshot;
pub mod tuning;
pub mod world;

pub use movement::MovementSystem;
pub use snapshot::SnapshotBuilder;
pub use world::{AdoptionZone, Pickup, Placement, Shelter, StartingBoosts, Stray, World};
