//! Matter service facade.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ulid::Ulid;

use juris_chunk::{normalize, segment};
use juris_core::{
    AssembledDocument, Completer, Document, HistoryEntry, JurisConfig, JurisError, Matter,
    MatterShare, MatterUpdate, Passage, Result, SharePermission, Store,
};
use juris_query::{assemble_documents, Retriever};
use juris_store::SqliteStore;

use crate::access;
use crate::prompts;
use crate::tools::{self, MatterTool};

/// Passages inserted per batch during ingestion.
const INSERT_BATCH: usize = 50;

/// Matter service state.
pub struct MatterService<C> {
    /// Database store.
    store: Arc<SqliteStore>,

    /// Staged passage retriever.
    retriever: Retriever<SqliteStore>,

    /// Completion backend.
    completer: Arc<C>,

    /// Runtime configuration.
    config: JurisConfig,
}

/// Matter creation parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateMatterParams {
    /// Display name.
    pub name: String,

    /// Governing jurisdiction (default: "Bermuda").
    pub jurisdiction: Option<String>,

    /// Nature of the dispute (optional).
    pub nature: Option<String>,

    /// Key issues (optional).
    pub issues: Option<String>,
}

/// Document ingestion parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct IngestParams {
    /// Matter to ingest into.
    pub matter_id: Ulid,

    /// Document display name.
    pub document_name: String,

    /// Document-type tag (default: "Other").
    pub kind: Option<String>,

    /// Raw extracted text.
    pub content: String,
}

/// Analysis request parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct AnalyseParams {
    /// Matter to analyse.
    pub matter_id: Ulid,

    /// The question.
    pub question: String,

    /// Analysis type (default: "General Legal Analysis").
    pub query_type: Option<String>,

    /// Focus areas for the response (default: all relevant issues).
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

/// Tool run parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct ToolParams {
    /// Matter to run against.
    pub matter_id: Ulid,

    /// Tool name.
    pub tool: String,

    /// Tool-specific instructions (optional).
    pub instructions: Option<String>,

    /// Anchor document names for the inconsistency tool.
    #[serde(default)]
    pub anchor_names: Vec<String>,
}

/// Share grant parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct ShareParams {
    /// Matter to share.
    pub matter_id: Ulid,

    /// Grantee user id.
    pub user_id: String,

    /// Granted permission (default: read).
    #[serde(default = "default_permission")]
    pub permission: SharePermission,
}

fn default_permission() -> SharePermission {
    SharePermission::Read
}

/// Operation result.
#[derive(Debug, Serialize)]
pub struct ToolResult {
    /// Whether the operation was successful.
    pub success: bool,

    /// Result message or content.
    pub message: String,
}

impl ToolResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl<C> MatterService<C>
where
    C: Completer,
{
    /// Create a new matter service with the given database path.
    pub fn new(db_path: impl Into<PathBuf>, completer: Arc<C>, config: JurisConfig) -> Result<Self> {
        let db_path = db_path.into();
        info!("Initializing matter service with database at {:?}", db_path);

        let store = Arc::new(SqliteStore::open(&db_path)?);
        let retriever = Retriever::new(store.clone());

        Ok(Self {
            store,
            retriever,
            completer,
            config,
        })
    }

    /// Create a new matter service with an in-memory database.
    pub fn new_memory(completer: Arc<C>) -> Result<Self> {
        info!("Initializing matter service with in-memory database");

        let store = Arc::new(SqliteStore::open_memory()?);
        let retriever = Retriever::new(store.clone());

        Ok(Self {
            store,
            retriever,
            completer,
            config: JurisConfig::default(),
        })
    }

    // Matters

    /// Create a matter owned by the actor.
    pub async fn create_matter(&self, actor: &str, params: CreateMatterParams) -> ToolResult {
        if params.name.trim().is_empty() {
            return ToolResult::error("Name required");
        }

        info!("Creating matter '{}' for {}", params.name, actor);

        let matter = Matter::new(
            &params.name,
            params.jurisdiction.as_deref(),
            params.nature.as_deref(),
            params.issues.as_deref(),
            actor,
        );

        match self.store.create_matter(&matter).await {
            Ok(()) => ToolResult::success(format!(
                "Matter '{}' created with id {}",
                matter.name, matter.id
            )),
            Err(e) => ToolResult::error(format!("Failed to create matter: {}", e)),
        }
    }

    /// List matters owned by the actor, then matters shared with them.
    pub async fn list_matters(&self, actor: &str) -> ToolResult {
        let owned = match self.store.list_matters_owned(actor).await {
            Ok(matters) => matters,
            Err(e) => return ToolResult::error(format!("Failed to list matters: {}", e)),
        };
        let shared = match self.store.list_matters_shared_with(actor).await {
            Ok(matters) => matters,
            Err(e) => return ToolResult::error(format!("Failed to list matters: {}", e)),
        };

        if owned.is_empty() && shared.is_empty() {
            return ToolResult::success("No matters found.");
        }

        let mut output = format!("Found {} matters:\n\n", owned.len() + shared.len());
        for matter in owned {
            output.push_str(&format!(
                "- {} {} [{}] ({} documents)\n",
                matter.id, matter.name, matter.jurisdiction, matter.document_count
            ));
        }
        for (matter, permission) in shared {
            output.push_str(&format!(
                "- {} {} [{}] ({} documents, shared: {})\n",
                matter.id, matter.name, matter.jurisdiction, matter.document_count, permission
            ));
        }

        ToolResult::success(output)
    }

    /// Partially update a matter. Owner only.
    pub async fn update_matter(&self, actor: &str, matter_id: Ulid, update: MatterUpdate) -> ToolResult {
        if update.is_empty() {
            return ToolResult::error("No fields to update");
        }

        if let Err(e) = access::require_owner(
            self.store.as_ref(),
            matter_id,
            actor,
            "Only the owner can edit this matter",
        )
        .await
        {
            return ToolResult::error(e.to_string());
        }

        match self.store.update_matter(matter_id, &update).await {
            Ok(()) => ToolResult::success("Matter updated."),
            Err(e) => ToolResult::error(format!("Failed to update matter: {}", e)),
        }
    }

    /// Delete a matter and everything under it. Owner only.
    pub async fn delete_matter(&self, actor: &str, matter_id: Ulid) -> ToolResult {
        let matter = match access::require_owner(
            self.store.as_ref(),
            matter_id,
            actor,
            "Only the owner can delete this matter",
        )
        .await
        {
            Ok(matter) => matter,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        info!("Deleting matter {} ('{}')", matter_id, matter.name);

        match self.store.delete_matter(matter_id).await {
            Ok(()) => ToolResult::success(format!("Matter '{}' deleted.", matter.name)),
            Err(e) => ToolResult::error(format!("Failed to delete matter: {}", e)),
        }
    }

    // Sharing

    /// Grant another user access to a matter. Owner only.
    pub async fn share_matter(&self, actor: &str, params: ShareParams) -> ToolResult {
        if let Err(e) = access::require_owner(
            self.store.as_ref(),
            params.matter_id,
            actor,
            "Only the owner can share this matter",
        )
        .await
        {
            return ToolResult::error(e.to_string());
        }

        if params.user_id == actor {
            return ToolResult::error("Cannot share with yourself");
        }

        info!(
            "Sharing matter {} with {} ({})",
            params.matter_id, params.user_id, params.permission
        );

        let share = MatterShare::new(params.matter_id, &params.user_id, params.permission);
        match self.store.upsert_share(&share).await {
            Ok(()) => ToolResult::success(format!(
                "Matter shared with '{}' ({}).",
                params.user_id, params.permission
            )),
            Err(e) => ToolResult::error(format!("Failed to share matter: {}", e)),
        }
    }

    /// List a matter's shares.
    pub async fn list_shares(&self, actor: &str, matter_id: Ulid) -> ToolResult {
        if let Err(e) = access::require_view(self.store.as_ref(), matter_id, actor).await {
            return ToolResult::error(e.to_string());
        }

        match self.store.list_shares(matter_id).await {
            Ok(shares) => {
                if shares.is_empty() {
                    return ToolResult::success("No shares for this matter.");
                }

                let mut output = format!("Found {} shares:\n\n", shares.len());
                for share in shares {
                    output.push_str(&format!("- {}: {}\n", share.user_id, share.permission));
                }
                ToolResult::success(output)
            }
            Err(e) => ToolResult::error(format!("Failed to list shares: {}", e)),
        }
    }

    /// Remove a user's share. Owner only.
    pub async fn revoke_share(&self, actor: &str, matter_id: Ulid, user_id: &str) -> ToolResult {
        if let Err(e) = access::require_owner(
            self.store.as_ref(),
            matter_id,
            actor,
            "Only the owner can remove sharing",
        )
        .await
        {
            return ToolResult::error(e.to_string());
        }

        let share = match self.store.get_share(matter_id, user_id).await {
            Ok(Some(share)) => share,
            Ok(None) => return ToolResult::error(format!("Share not found: {}", user_id)),
            Err(e) => return ToolResult::error(format!("Failed to remove share: {}", e)),
        };

        match self.store.delete_share(share.id).await {
            Ok(()) => ToolResult::success(format!("Share for '{}' removed.", user_id)),
            Err(e) => ToolResult::error(format!("Failed to remove share: {}", e)),
        }
    }

    // Documents

    /// Ingest a document's text into a matter.
    pub async fn ingest(&self, actor: &str, params: IngestParams) -> ToolResult {
        info!(
            "Ingesting document '{}' into matter {}",
            params.document_name, params.matter_id
        );

        if let Err(e) = access::require_edit(self.store.as_ref(), params.matter_id, actor).await {
            return ToolResult::error(e.to_string());
        }

        let text = normalize(&params.content);
        if text.chars().count() < self.config.segmentation.min_fragment_chars {
            return ToolResult::error("Document too short or unreadable");
        }

        let document = Document::new(
            params.matter_id,
            &params.document_name,
            params.kind.as_deref(),
            &text,
        );

        // Repeated ingestion appends duplicates; the hash only warns.
        if let Some(hash) = &document.content_hash {
            match self.store.find_document_by_hash(params.matter_id, hash).await {
                Ok(Some(existing)) => warn!(
                    "Matter {} already contains '{}' with identical content",
                    params.matter_id, existing.name
                ),
                Ok(None) => {}
                Err(e) => return ToolResult::error(e.to_string()),
            }
        }

        if let Err(e) = self.store.insert_document(&document).await {
            return ToolResult::error(e.to_string());
        }

        let chunks = segment(&text, &self.config.segmentation.segment_config());
        let passages: Vec<Passage> = chunks
            .iter()
            .enumerate()
            .map(|(seq, content)| {
                Passage::new(
                    params.matter_id,
                    document.id,
                    &document.name,
                    &document.kind,
                    seq as u32,
                    content,
                )
            })
            .collect();

        // Batches apply in order; a failure reports how much landed.
        let mut persisted = 0usize;
        for batch in passages.chunks(INSERT_BATCH) {
            if let Err(e) = self.store.insert_passages(batch).await {
                return ToolResult::error(
                    JurisError::store_write(persisted, e.to_string()).to_string(),
                );
            }
            persisted += batch.len();
        }

        if let Err(e) = self.store.set_chunk_count(document.id, passages.len() as u32).await {
            return ToolResult::error(e.to_string());
        }
        if let Err(e) = self.store.refresh_document_count(params.matter_id).await {
            return ToolResult::error(e.to_string());
        }

        ToolResult::success(format!(
            "Successfully ingested '{}' with {} passages ({} characters). Document id: {}",
            document.name, persisted, document.char_count, document.id
        ))
    }

    /// List a matter's documents, newest first.
    pub async fn list_documents(&self, actor: &str, matter_id: Ulid) -> ToolResult {
        if let Err(e) = access::require_view(self.store.as_ref(), matter_id, actor).await {
            return ToolResult::error(e.to_string());
        }

        match self.store.list_documents(matter_id).await {
            Ok(documents) => {
                if documents.is_empty() {
                    return ToolResult::success("No documents in this matter.");
                }

                let mut output = format!("Found {} documents:\n\n", documents.len());
                for doc in documents {
                    output.push_str(&format!(
                        "- {} {} [{}] ({} passages, {} characters)\n",
                        doc.id, doc.name, doc.kind, doc.chunk_count, doc.char_count
                    ));
                }
                ToolResult::success(output)
            }
            Err(e) => ToolResult::error(format!("Failed to list documents: {}", e)),
        }
    }

    /// Delete a document and its passages. Requires edit access.
    pub async fn delete_document(&self, actor: &str, document_id: Ulid) -> ToolResult {
        let document = match self.store.get_document(document_id).await {
            Ok(Some(document)) => document,
            Ok(None) => return ToolResult::error("Document not found"),
            Err(e) => return ToolResult::error(format!("Failed to delete document: {}", e)),
        };

        if let Err(e) = access::require_edit(self.store.as_ref(), document.matter_id, actor).await {
            return ToolResult::error(e.to_string());
        }

        info!("Deleting document {} ('{}')", document_id, document.name);

        if let Err(e) = self.store.delete_document(document_id).await {
            return ToolResult::error(format!("Failed to delete document: {}", e));
        }
        if let Err(e) = self.store.refresh_document_count(document.matter_id).await {
            return ToolResult::error(e.to_string());
        }

        ToolResult::success(format!("Document '{}' deleted.", document.name))
    }

    // Analysis

    /// Answer a question grounded in retrieved matter passages.
    pub async fn analyse(&self, actor: &str, params: AnalyseParams) -> ToolResult {
        let matter = match access::require_view(self.store.as_ref(), params.matter_id, actor).await
        {
            Ok(matter) => matter,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        info!("Analysing matter {}: {:?}", params.matter_id, params.question);

        let passages = self
            .retriever
            .retrieve(
                params.matter_id,
                &params.question,
                self.config.retrieval.passage_limit,
            )
            .await;
        let context = prompts::retrieved_context(passages);

        let system = prompts::analysis_system_prompt(
            &matter,
            context.as_deref(),
            params.query_type.as_deref(),
            &params.focus_areas,
        );

        let answer = match self.completer.complete(&system, &params.question).await {
            Ok(answer) => answer,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let entry = HistoryEntry::new(params.matter_id, actor, &params.question, &answer, None);
        if let Err(e) = self.store.append_history(&entry).await {
            warn!("Failed to record history entry: {}", e);
        }

        ToolResult::success(answer)
    }

    /// Run a whole-matter tool.
    pub async fn run_tool(&self, actor: &str, params: ToolParams) -> ToolResult {
        let tool: MatterTool = match params.tool.parse() {
            Ok(tool) => tool,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let matter = match access::require_view(self.store.as_ref(), params.matter_id, actor).await
        {
            Ok(matter) => matter,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let instructions = params.instructions.as_deref().filter(|s| !s.is_empty());
        if tool == MatterTool::Proposition && instructions.is_none() {
            return ToolResult::error("Please state the proposition to test");
        }

        info!("Running {} tool on matter {}", tool, params.matter_id);

        let prompt = match tool {
            MatterTool::Citations => {
                let filing_kinds = ["Skeleton Argument".to_string(), "Pleading".to_string()];
                let authority_kinds = ["Case Law".to_string()];
                let filings = match self
                    .fetch_all_grouped(params.matter_id, Some(&filing_kinds[..]))
                    .await
                {
                    Ok(docs) => docs,
                    Err(e) => return ToolResult::error(e.to_string()),
                };
                let authorities = match self
                    .fetch_all_grouped(params.matter_id, Some(&authority_kinds[..]))
                    .await
                {
                    Ok(docs) => docs,
                    Err(e) => return ToolResult::error(e.to_string()),
                };
                tools::citations(&matter, &filings, &authorities)
            }
            _ => {
                let documents = match self.fetch_all_grouped(params.matter_id, None).await {
                    Ok(docs) => docs,
                    Err(e) => return ToolResult::error(e.to_string()),
                };
                match tool {
                    MatterTool::Proposition => {
                        // Checked non-empty above.
                        tools::proposition(&matter, &documents, instructions.unwrap_or_default())
                    }
                    MatterTool::Inconsistency => {
                        tools::inconsistency(&matter, &documents, &params.anchor_names, instructions)
                    }
                    MatterTool::Chronology => tools::chronology(&matter, &documents, instructions),
                    MatterTool::Persons => tools::persons(&matter, &documents, instructions),
                    MatterTool::Issues => tools::issues(&matter, &documents, instructions),
                    MatterTool::Briefing => tools::briefing(&matter, &documents, instructions),
                    MatterTool::Draft => tools::draft(&matter, &documents, instructions),
                    MatterTool::Citations => unreachable!("handled above"),
                }
            }
        };

        let answer = match self.completer.complete(&prompt.system, &prompt.user).await {
            Ok(answer) => answer,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let question = match instructions {
            Some(instructions) => instructions.to_string(),
            None => format!("Run {}", tool),
        };
        let entry = HistoryEntry::new(
            params.matter_id,
            actor,
            &question,
            &answer,
            Some(tool.as_str()),
        );
        if let Err(e) = self.store.append_history(&entry).await {
            warn!("Failed to record history entry: {}", e);
        }

        ToolResult::success(answer)
    }

    /// Reassemble the matter's documents from stored passages, capped at
    /// the configured passage limit, optionally filtered by kind.
    async fn fetch_all_grouped(
        &self,
        matter_id: Ulid,
        kinds: Option<&[String]>,
    ) -> Result<IndexMap<String, AssembledDocument>> {
        let passages = self
            .store
            .list_passages(matter_id, kinds, self.config.retrieval.matter_passage_cap)
            .await?;
        Ok(assemble_documents(passages))
    }

    // History

    /// The actor's question/answer history for a matter, oldest first.
    pub async fn history(&self, actor: &str, matter_id: Ulid) -> ToolResult {
        if let Err(e) = access::require_view(self.store.as_ref(), matter_id, actor).await {
            return ToolResult::error(e.to_string());
        }

        match self.store.list_history(matter_id, actor).await {
            Ok(entries) => {
                if entries.is_empty() {
                    return ToolResult::success("No history for this matter.");
                }

                let mut output = format!("Found {} exchanges:\n\n", entries.len());
                for entry in entries {
                    match &entry.tool_name {
                        Some(tool) => output.push_str(&format!("Q ({}): {}\n", tool, entry.question)),
                        None => output.push_str(&format!("Q: {}\n", entry.question)),
                    }
                    output.push_str(&format!("A: {}\n\n", entry.answer));
                }
                ToolResult::success(output)
            }
            Err(e) => ToolResult::error(format!("Failed to load history: {}", e)),
        }
    }

    /// Remove the actor's history rows for a matter.
    pub async fn clear_history(&self, actor: &str, matter_id: Ulid) -> ToolResult {
        if let Err(e) = access::require_view(self.store.as_ref(), matter_id, actor).await {
            return ToolResult::error(e.to_string());
        }

        match self.store.clear_history(matter_id, actor).await {
            Ok(()) => ToolResult::success("History cleared."),
            Err(e) => ToolResult::error(format!("Failed to clear history: {}", e)),
        }
    }

    // Stats

    /// Corpus statistics, optionally scoped to one matter.
    pub async fn stats(&self, matter_id: Option<Ulid>) -> ToolResult {
        match self.store.get_stats(matter_id).await {
            Ok(stats) => {
                let mut output = String::new();

                if let Some(id) = matter_id {
                    output.push_str(&format!("Statistics for matter {}:\n\n", id));
                } else {
                    output.push_str("Overall statistics:\n\n");
                }

                output.push_str(&format!("- Matters: {}\n", stats.matters));
                output.push_str(&format!("- Documents: {}\n", stats.documents));
                output.push_str(&format!("- Passages: {}\n", stats.passages));
                output.push_str(&format!(
                    "- Storage: {:.2} MB\n",
                    stats.storage_bytes as f64 / 1024.0 / 1024.0
                ));

                ToolResult::success(output)
            }
            Err(e) => ToolResult::error(format!("Failed to get stats: {}", e)),
        }
    }
}
