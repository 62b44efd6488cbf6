//! juris-core - Core types and traits for the juris system
//!
//! This crate provides the foundational types, traits, and error handling
//! used throughout the juris workspace.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{JurisError, Result};
pub use traits::*;
pub use types::*;
