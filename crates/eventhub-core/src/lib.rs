pub mod config;
pub mod dates;
pub mod error;
pub mod mail;
pub mod types;

pub use error::{EventHubError, Result};
