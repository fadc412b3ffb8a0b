pub mod types;
pub mod sources;
pub mod config;
pub mod error;

pub use types::*;
pub use sources::{load_sources, parse_sources};
pub use config::{Config, HarvestSettings};
pub use error::SleeplessError;
