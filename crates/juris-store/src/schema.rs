//! Database schema definitions.

/// Main schema SQL.
pub const SCHEMA: &str = r#"
-- Matters table
CREATE TABLE IF NOT EXISTS matters (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    jurisdiction TEXT NOT NULL,
    nature TEXT NOT NULL DEFAULT '',
    issues TEXT NOT NULL DEFAULT '',
    owner_id TEXT NOT NULL,
    document_count INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_matters_owner ON matters(owner_id);

-- Documents table
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    matter_id TEXT NOT NULL REFERENCES matters(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    char_count INTEGER NOT NULL,
    chunk_count INTEGER NOT NULL DEFAULT 0,
    content_hash BLOB,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_matter ON documents(matter_id);
CREATE INDEX IF NOT EXISTS idx_documents_hash ON documents(matter_id, content_hash);

-- Passages table
CREATE TABLE IF NOT EXISTS passages (
    id TEXT PRIMARY KEY,
    matter_id TEXT NOT NULL REFERENCES matters(id) ON DELETE CASCADE,
    document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    document_name TEXT NOT NULL,
    doc_kind TEXT NOT NULL,
    seq INTEGER NOT NULL,
    content TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_passages_matter ON passages(matter_id);
CREATE INDEX IF NOT EXISTS idx_passages_document ON passages(document_id, seq);

-- Full-text search index over passage content
CREATE VIRTUAL TABLE IF NOT EXISTS passages_fts USING fts5(
    content,
    content=passages,
    content_rowid=rowid
);

-- Triggers to keep FTS index in sync
CREATE TRIGGER IF NOT EXISTS passages_ai AFTER INSERT ON passages BEGIN
    INSERT INTO passages_fts(rowid, content) VALUES (new.rowid, new.content);
END;

CREATE TRIGGER IF NOT EXISTS passages_ad AFTER DELETE ON passages BEGIN
    INSERT INTO passages_fts(passages_fts, rowid, content) VALUES ('delete', old.rowid, old.content);
END;

CREATE TRIGGER IF NOT EXISTS passages_au AFTER UPDATE ON passages BEGIN
    INSERT INTO passages_fts(passages_fts, rowid, content) VALUES ('delete', old.rowid, old.content);
    INSERT INTO passages_fts(rowid, content) VALUES (new.rowid, new.content);
END;

-- Matter shares table
CREATE TABLE IF NOT EXISTS matter_shares (
    id TEXT PRIMARY KEY,
    matter_id TEXT NOT NULL REFERENCES matters(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    permission TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (matter_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_shares_user ON matter_shares(user_id);

-- Conversation history table
CREATE TABLE IF NOT EXISTS conversation_history (
    id TEXT PRIMARY KEY,
    matter_id TEXT NOT NULL REFERENCES matters(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    tool_name TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_matter_user ON conversation_history(matter_id, user_id, created_at);
"#;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;
