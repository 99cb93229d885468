//! Error handling
//!
//! Defines error types for the file store and the container deployer.

pub mod types;

pub use types::*;
