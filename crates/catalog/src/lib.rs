//! Program, reward slot, and event rule configuration consumed by the spin
//! and event engines.

pub mod store;
pub mod types;

pub use store::{CatalogStore, NewEventRule, NewProgram, NewRewardSlot};
pub use types::{EventRule, Program, RewardKind, RewardSlot};
