//! juris-llm - Text completion backends
//!
//! This crate provides the Anthropic Messages API client used for
//! matter analysis, plus an in-memory mock for tests.

mod anthropic;
mod mock;

pub use anthropic::AnthropicCompleter;
pub use mock::MockCompleter;

// Re-export for convenience
pub use juris_core::Completer;
