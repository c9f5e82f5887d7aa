//! The lifecycle event rules engine: matches customer events against
//! configured rules and auto-grants coupons with dedup.

pub mod engine;

pub use engine::{EventContext, EventEngine};
