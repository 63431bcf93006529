//! dispviz Common Utilities
//!
//! Shared infrastructure for all dispviz crates:
//! - Error types and result aliases
//! - Run and frame clocks
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
