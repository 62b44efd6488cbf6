//! Core domain types for matters, documents, and passages.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::JurisError;

/// Jurisdiction applied when a matter is created without one.
pub const DEFAULT_JURISDICTION: &str = "Bermuda";

/// Document-type tag applied when none is supplied.
pub const DEFAULT_DOC_KIND: &str = "Other";

/// Permission level granted by a matter share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    Read,
    Edit,
}

impl SharePermission {
    /// Stable string form, used for storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Edit => "edit",
        }
    }
}

impl std::fmt::Display for SharePermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SharePermission {
    type Err = JurisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "edit" => Ok(Self::Edit),
            other => Err(JurisError::input(format!("Unknown permission: {}", other))),
        }
    }
}

/// A legal matter: the top-level workspace owning documents and passages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matter {
    /// Unique identifier (ULID).
    pub id: Ulid,

    /// Display name.
    pub name: String,

    /// Governing jurisdiction (e.g. "Bermuda", "Cayman Islands", "BVI").
    pub jurisdiction: String,

    /// Nature of the dispute (free text, may be empty).
    pub nature: String,

    /// Key issues (free text, may be empty).
    pub issues: String,

    /// Owning user id.
    pub owner_id: String,

    /// Cached count of documents in the matter.
    pub document_count: u32,

    /// Creation timestamp (Unix millis).
    pub created_at: u64,
}

impl Matter {
    /// Create a new matter owned by `owner_id`.
    pub fn new(
        name: &str,
        jurisdiction: Option<&str>,
        nature: Option<&str>,
        issues: Option<&str>,
        owner_id: &str,
    ) -> Self {
        Self {
            id: Ulid::new(),
            name: name.to_string(),
            jurisdiction: jurisdiction.unwrap_or(DEFAULT_JURISDICTION).to_string(),
            nature: nature.unwrap_or_default().to_string(),
            issues: issues.unwrap_or_default().to_string(),
            owner_id: owner_id.to_string(),
            document_count: 0,
            created_at: now_millis(),
        }
    }
}

/// Partial update for a matter. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatterUpdate {
    pub name: Option<String>,
    pub nature: Option<String>,
    pub issues: Option<String>,
}

impl MatterUpdate {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.nature.is_none() && self.issues.is_none()
    }
}

/// An ingested source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (ULID).
    pub id: Ulid,

    /// Matter this document belongs to.
    pub matter_id: Ulid,

    /// Display name.
    pub name: String,

    /// Document-type tag (e.g. "Pleading", "Case Law"). Free-form.
    pub kind: String,

    /// Character count of the normalized text.
    pub char_count: u64,

    /// Number of passages produced by segmentation.
    pub chunk_count: u32,

    /// Blake3 hash of the normalized text, for duplicate detection.
    #[serde(with = "serde_bytes_opt")]
    pub content_hash: Option<[u8; 32]>,

    /// Creation timestamp (Unix millis).
    pub created_at: u64,
}

impl Document {
    /// Create a new document record from normalized text.
    ///
    /// The chunk count starts at zero and is set after segmentation.
    pub fn new(matter_id: Ulid, name: &str, kind: Option<&str>, content: &str) -> Self {
        let content_hash = blake3::hash(content.as_bytes());

        Self {
            id: Ulid::new(),
            matter_id,
            name: name.to_string(),
            kind: kind.unwrap_or(DEFAULT_DOC_KIND).to_string(),
            char_count: content.chars().count() as u64,
            chunk_count: 0,
            content_hash: Some(*content_hash.as_bytes()),
            created_at: now_millis(),
        }
    }
}

/// A stored passage: the atomic retrievable unit of a document.
///
/// Document name and kind are denormalized so retrieval and grouping
/// never need a join back to the documents table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Unique identifier (ULID).
    pub id: Ulid,

    /// Owning matter.
    pub matter_id: Ulid,

    /// Owning document.
    pub document_id: Ulid,

    /// Owning document's display name.
    pub document_name: String,

    /// Owning document's type tag.
    pub doc_kind: String,

    /// Zero-based position within the document. Gapless and monotonic.
    pub seq: u32,

    /// Passage text.
    pub content: String,
}

impl Passage {
    /// Create a new passage.
    pub fn new(
        matter_id: Ulid,
        document_id: Ulid,
        document_name: &str,
        doc_kind: &str,
        seq: u32,
        content: &str,
    ) -> Self {
        Self {
            id: Ulid::new(),
            matter_id,
            document_id,
            document_name: document_name.to_string(),
            doc_kind: doc_kind.to_string(),
            seq,
            content: content.to_string(),
        }
    }
}

/// A passage as returned by retrieval: content plus grouping fields only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Passage text.
    pub content: String,

    /// Source document's display name.
    pub document_name: String,

    /// Source document's type tag.
    pub doc_kind: String,
}

/// A document reconstituted from its passages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledDocument {
    /// Document-type tag carried through from the passages.
    pub doc_kind: String,

    /// Passage contents joined with blank-line separators.
    pub text: String,
}

/// A grant of matter access to another user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatterShare {
    /// Unique identifier (ULID).
    pub id: Ulid,

    /// Shared matter.
    pub matter_id: Ulid,

    /// Grantee user id.
    pub user_id: String,

    /// Granted permission.
    pub permission: SharePermission,

    /// Creation timestamp (Unix millis).
    pub created_at: u64,
}

impl MatterShare {
    /// Create a new share.
    pub fn new(matter_id: Ulid, user_id: &str, permission: SharePermission) -> Self {
        Self {
            id: Ulid::new(),
            matter_id,
            user_id: user_id.to_string(),
            permission,
            created_at: now_millis(),
        }
    }
}

/// One question/answer exchange recorded against a matter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique identifier (ULID).
    pub id: Ulid,

    /// Matter the exchange belongs to.
    pub matter_id: Ulid,

    /// User who asked.
    pub user_id: String,

    /// The question as asked.
    pub question: String,

    /// The generated answer.
    pub answer: String,

    /// Tool that produced the answer, absent for free-form analysis.
    pub tool_name: Option<String>,

    /// Creation timestamp (Unix millis).
    pub created_at: u64,
}

impl HistoryEntry {
    /// Create a new history entry.
    pub fn new(
        matter_id: Ulid,
        user_id: &str,
        question: &str,
        answer: &str,
        tool_name: Option<&str>,
    ) -> Self {
        Self {
            id: Ulid::new(),
            matter_id,
            user_id: user_id.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            tool_name: tool_name.map(String::from),
            created_at: now_millis(),
        }
    }
}

/// Statistics about the stored corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    /// Number of matters.
    pub matters: u64,

    /// Number of documents.
    pub documents: u64,

    /// Number of passages.
    pub passages: u64,

    /// Database size in bytes.
    pub storage_bytes: u64,

    /// Optional matter filter applied.
    pub filter: Option<String>,
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Helper module for optional byte array serialization.
mod serde_bytes_opt {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<[u8; 32]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => {
                let hex = hex::encode(bytes);
                hex.serialize(serializer)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<[u8; 32]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        match opt {
            Some(hex) => {
                let bytes = hex::decode(&hex).map_err(serde::de::Error::custom)?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("invalid hash length"))?;
                Ok(Some(arr))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matter_defaults() {
        let matter = Matter::new("Smith v Jones", None, None, None, "user-1");
        assert_eq!(matter.jurisdiction, "Bermuda");
        assert_eq!(matter.nature, "");
        assert_eq!(matter.document_count, 0);

        let matter = Matter::new("In re Atlantic", Some("Cayman Islands"), None, None, "user-1");
        assert_eq!(matter.jurisdiction, "Cayman Islands");
    }

    #[test]
    fn test_document_counts_chars_not_bytes() {
        let matter_id = Ulid::new();
        let doc = Document::new(matter_id, "measure.txt", None, "déposé");
        assert_eq!(doc.char_count, 6);
        assert_eq!(doc.kind, "Other");
        assert_eq!(doc.chunk_count, 0);
    }

    #[test]
    fn test_share_permission_roundtrip() {
        assert_eq!("read".parse::<SharePermission>().unwrap(), SharePermission::Read);
        assert_eq!("edit".parse::<SharePermission>().unwrap(), SharePermission::Edit);
        assert!("admin".parse::<SharePermission>().is_err());
        assert_eq!(SharePermission::Edit.to_string(), "edit");
    }

    #[test]
    fn test_matter_update_is_empty() {
        assert!(MatterUpdate::default().is_empty());
        let update = MatterUpdate {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
