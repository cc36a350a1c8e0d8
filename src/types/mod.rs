//! Shared types

pub mod error;

pub use error::{EngineError, Result};
