//! juris-query - Retrieval and reassembly engine
//!
//! This crate selects passages for a question using a staged retrieval
//! chain (ranked keyword search with an unranked sample fallback) and
//! regroups results into per-document blocks for prompt building.
//!
//! # Features
//!
//! - Keyword expression extraction from free-form questions
//! - Staged retrieval that never fails outwardly
//! - Grouping and full-document reassembly
//!
//! # Example
//!
//! ```rust,ignore
//! use juris_query::Retriever;
//! use std::sync::Arc;
//!
//! let retriever = Retriever::new(Arc::new(store));
//! let passages = retriever
//!     .retrieve(matter_id, "When was the guarantee signed?", 25)
//!     .await;
//! ```

mod assemble;
mod keywords;
mod retrieve;

pub use assemble::{assemble_documents, group_by_document};
pub use keywords::keyword_expression;
pub use retrieve::{plan, RetrievalStrategy, Retriever};

// Re-export for convenience
pub use juris_core::{AssembledDocument, RetrievedPassage};
