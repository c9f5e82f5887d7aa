//! The Lucky Spin wheel: tier-weighted reward selection, daily spin
//! accounting, and coupon issuance for winning draws.

pub mod engine;
pub mod history;
pub mod selector;

pub use engine::{SpinEngine, SpinOutcome, SpinStatus};
pub use history::{SpinHistoryStore, SpinKind, SpinRecord};
pub use selector::{select_reward, Selection};
