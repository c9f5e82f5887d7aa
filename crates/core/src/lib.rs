pub mod config;
pub mod customers;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{PerksError, PerksResult};
