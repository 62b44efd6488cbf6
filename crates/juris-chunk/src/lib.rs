//! juris-chunk - Document text segmentation
//!
//! This crate turns raw extracted document text into bounded,
//! overlapping, context-preserving passages:
//!
//! - [`normalize`]: canonicalizes line endings, horizontal whitespace,
//!   and blank-line runs.
//! - [`segment`]: greedy paragraph packing with an overlap carry,
//!   followed by fixed-width window splitting of oversized chunks.
//!
//! # Example
//!
//! ```rust
//! use juris_chunk::{normalize, segment, SegmentConfig};
//!
//! let text = normalize("First paragraph.\r\n\r\nSecond paragraph.");
//! let passages = segment(&text, &SegmentConfig::default());
//! ```

mod normalize;
mod segment;

pub use normalize::normalize;
pub use segment::segment;

// Re-export for convenience
pub use juris_core::SegmentConfig;
