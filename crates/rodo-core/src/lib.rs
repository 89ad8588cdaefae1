pub mod config;
pub mod error;
pub mod types;

pub use config::RodoConfig;
pub use error::{Result, RodoError};
