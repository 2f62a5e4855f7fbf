//! Shared types and errors

pub mod errors;
pub mod types;

pub use errors::{OutboundError, Result};
pub use types::*;
