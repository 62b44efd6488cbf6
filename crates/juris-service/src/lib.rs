//! juris-service - Matter service facade
//!
//! Exposes operations for:
//! - Creating, updating, sharing and deleting matters
//! - Ingesting document text into searchable passages
//! - Grounded legal analysis and whole-matter tools
//! - Per-user history and corpus statistics

mod access;
mod prompts;
mod service;
mod tools;

pub use service::{
    AnalyseParams, CreateMatterParams, IngestParams, MatterService, ShareParams, ToolParams,
    ToolResult,
};
pub use tools::MatterTool;
