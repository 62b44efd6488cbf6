//! Core traits defining the interfaces between components.

use async_trait::async_trait;
use ulid::Ulid;

use crate::error::Result;
use crate::types::{
    Document, HistoryEntry, Matter, MatterShare, MatterUpdate, Passage, RetrievedPassage,
    SharePermission, Stats,
};

/// Storage layer trait.
#[async_trait]
pub trait Store: Send + Sync {
    // Matter operations
    async fn create_matter(&self, matter: &Matter) -> Result<()>;
    async fn get_matter(&self, id: Ulid) -> Result<Option<Matter>>;
    async fn list_matters_owned(&self, owner_id: &str) -> Result<Vec<Matter>>;
    async fn list_matters_shared_with(
        &self,
        user_id: &str,
    ) -> Result<Vec<(Matter, SharePermission)>>;
    async fn update_matter(&self, id: Ulid, update: &MatterUpdate) -> Result<()>;
    async fn delete_matter(&self, id: Ulid) -> Result<()>;

    /// Recount the matter's documents and store the result. Returns the new count.
    async fn refresh_document_count(&self, matter_id: Ulid) -> Result<u32>;

    // Document operations
    async fn insert_document(&self, document: &Document) -> Result<()>;
    async fn get_document(&self, id: Ulid) -> Result<Option<Document>>;
    async fn list_documents(&self, matter_id: Ulid) -> Result<Vec<Document>>;
    async fn delete_document(&self, id: Ulid) -> Result<()>;
    async fn set_chunk_count(&self, document_id: Ulid, count: u32) -> Result<()>;
    async fn find_document_by_hash(
        &self,
        matter_id: Ulid,
        hash: &[u8; 32],
    ) -> Result<Option<Document>>;

    // Passage operations
    async fn insert_passages(&self, passages: &[Passage]) -> Result<()>;

    /// Passages for a matter ordered by (document name, sequence index),
    /// optionally restricted to the given document kinds.
    async fn list_passages(
        &self,
        matter_id: Ulid,
        kinds: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<Passage>>;

    async fn list_passages_for_document(&self, document_id: Ulid) -> Result<Vec<Passage>>;

    /// Ranked lexical search over passage content, restricted to a matter.
    /// Results arrive best-match first.
    async fn keyword_search(
        &self,
        matter_id: Ulid,
        expression: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>>;

    /// Unranked sample of a matter's passages. Order is store-defined.
    async fn sample_passages(
        &self,
        matter_id: Ulid,
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>>;

    // Share operations
    async fn upsert_share(&self, share: &MatterShare) -> Result<()>;
    async fn get_share(&self, matter_id: Ulid, user_id: &str) -> Result<Option<MatterShare>>;
    async fn list_shares(&self, matter_id: Ulid) -> Result<Vec<MatterShare>>;
    async fn delete_share(&self, id: Ulid) -> Result<()>;

    // History operations
    async fn append_history(&self, entry: &HistoryEntry) -> Result<()>;
    async fn list_history(&self, matter_id: Ulid, user_id: &str) -> Result<Vec<HistoryEntry>>;
    async fn clear_history(&self, matter_id: Ulid, user_id: &str) -> Result<()>;

    // Stats
    async fn get_stats(&self, matter_id: Option<Ulid>) -> Result<Stats>;
}

/// Text-completion backend trait.
///
/// The backend is opaque: given a system instruction and a prompt it
/// returns generated text or fails.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Segmentation configuration, passed explicitly into each pipeline call.
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Nominal chunk size in characters.
    pub chunk_chars: usize,

    /// Trailing characters of one chunk carried into the next.
    pub overlap_chars: usize,

    /// Fragments at or below this length are discarded, never stored.
    pub min_fragment_chars: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 1200,
            overlap_chars: 150,
            min_fragment_chars: 50,
        }
    }
}

impl SegmentConfig {
    /// Hard ceiling on emitted chunk length: 1.5x the nominal size.
    /// Chunks above it are force-split into fixed-width windows.
    pub fn max_chunk_chars(&self) -> usize {
        self.chunk_chars + self.chunk_chars / 2
    }
}
