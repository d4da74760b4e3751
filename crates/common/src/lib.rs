//! Shared types, config, and error definitions for the weather poster.

pub mod config;
pub mod error;
pub mod types;

pub use config::PosterConfig;
pub use error::{Error, ErrorCode, ErrorEnvelope};
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
