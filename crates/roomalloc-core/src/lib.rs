pub mod config;
pub mod types;

pub use config::AllocConfig;
pub use types::*;
