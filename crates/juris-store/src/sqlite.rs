//! SQLite-based storage implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, ToSql};
use tracing::{debug, info};
use ulid::Ulid;

use juris_core::{
    Document, HistoryEntry, JurisError, Matter, MatterShare, MatterUpdate, Passage, Result,
    RetrievedPassage, SharePermission, Stats, Store,
};

use crate::schema::SCHEMA;

/// SQLite-based store implementation.
///
/// Uses a blocking Mutex for thread-safe access. Every operation is a
/// short-lived statement, so the mutex is held only briefly.
pub struct SqliteStore {
    /// Connection wrapped in blocking Mutex.
    conn: Arc<Mutex<Connection>>,
}

// Manually implement Send + Sync since Connection is protected by Mutex
unsafe impl Send for SqliteStore {}
unsafe impl Sync for SqliteStore {}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| JurisError::database(format!("Failed to open database: {}", e)))?;

        Self::init(conn, path)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| JurisError::database(format!("Failed to open in-memory database: {}", e)))?;

        Self::init(conn, Path::new(":memory:"))
    }

    /// Initialize the store with a connection.
    fn init(conn: Connection, path: &Path) -> Result<Self> {
        Self::configure_connection(&conn)?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| JurisError::database(format!("Failed to initialize schema: {}", e)))?;

        info!("Database opened at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Configure SQLite connection for optimal performance.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA busy_timeout = 30000;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
            PRAGMA foreign_keys = ON;
            "#,
        )
        .map_err(|e| JurisError::database(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self.conn.lock().map_err(|e| JurisError::database(e.to_string()))?;
        f(&conn)
    }
}

#[async_trait]
impl Store for SqliteStore {
    // Matter operations

    async fn create_matter(&self, matter: &Matter) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO matters (id, name, jurisdiction, nature, issues, owner_id,
                                     document_count, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    matter.id.to_string(),
                    matter.name,
                    matter.jurisdiction,
                    matter.nature,
                    matter.issues,
                    matter.owner_id,
                    matter.document_count,
                    matter.created_at as i64,
                ],
            )
            .map_err(|e| JurisError::database(format!("Failed to create matter: {}", e)))?;

            debug!("Created matter: {}", matter.id);
            Ok(())
        })
    }

    async fn get_matter(&self, id: Ulid) -> Result<Option<Matter>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, name, jurisdiction, nature, issues, owner_id,
                           document_count, created_at
                    FROM matters WHERE id = ?1
                    "#,
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let result = stmt
                .query_row(params![id.to_string()], |row| Self::row_to_matter(row))
                .optional()
                .map_err(|e| JurisError::database(e.to_string()))?;

            Ok(result)
        })
    }

    async fn list_matters_owned(&self, owner_id: &str) -> Result<Vec<Matter>> {
        let owner_id = owner_id.to_string();
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, name, jurisdiction, nature, issues, owner_id,
                           document_count, created_at
                    FROM matters
                    WHERE owner_id = ?1
                    ORDER BY created_at DESC
                    "#,
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let matters = stmt
                .query_map(params![owner_id], |row| Self::row_to_matter(row))
                .map_err(|e| JurisError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| JurisError::database(e.to_string()))?;

            Ok(matters)
        })
    }

    async fn list_matters_shared_with(
        &self,
        user_id: &str,
    ) -> Result<Vec<(Matter, SharePermission)>> {
        let user_id = user_id.to_string();
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT m.id, m.name, m.jurisdiction, m.nature, m.issues, m.owner_id,
                           m.document_count, m.created_at, s.permission
                    FROM matters m
                    JOIN matter_shares s ON s.matter_id = m.id
                    WHERE s.user_id = ?1
                    ORDER BY m.created_at DESC
                    "#,
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let matters = stmt
                .query_map(params![user_id], |row| {
                    let matter = Self::row_to_matter(row)?;
                    let permission: String = row.get(8)?;
                    Ok((matter, permission.parse().unwrap_or(SharePermission::Read)))
                })
                .map_err(|e| JurisError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| JurisError::database(e.to_string()))?;

            Ok(matters)
        })
    }

    async fn update_matter(&self, id: Ulid, update: &MatterUpdate) -> Result<()> {
        let id = id.to_string();
        let update = update.clone();
        self.with_conn(|conn| {
            // NULL parameters leave the stored value untouched
            let updated = conn
                .execute(
                    r#"
                    UPDATE matters SET
                        name = COALESCE(?2, name),
                        nature = COALESCE(?3, nature),
                        issues = COALESCE(?4, issues)
                    WHERE id = ?1
                    "#,
                    params![id, update.name, update.nature, update.issues],
                )
                .map_err(|e| JurisError::database(format!("Failed to update matter: {}", e)))?;

            if updated == 0 {
                return Err(JurisError::MatterNotFound { id: id.clone() });
            }

            debug!("Updated matter: {}", id);
            Ok(())
        })
    }

    async fn delete_matter(&self, id: Ulid) -> Result<()> {
        let id = id.to_string();
        self.with_conn(|conn| {
            // Documents, passages, shares, and history are deleted by CASCADE
            let deleted = conn
                .execute("DELETE FROM matters WHERE id = ?1", params![id])
                .map_err(|e| JurisError::database(e.to_string()))?;

            if deleted == 0 {
                return Err(JurisError::MatterNotFound { id: id.clone() });
            }

            debug!("Deleted matter: {}", id);
            Ok(())
        })
    }

    async fn refresh_document_count(&self, matter_id: Ulid) -> Result<u32> {
        let matter_id = matter_id.to_string();
        self.with_conn(|conn| {
            let count: u32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM documents WHERE matter_id = ?1",
                    params![matter_id],
                    |row| row.get(0),
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let updated = conn
                .execute(
                    "UPDATE matters SET document_count = ?2 WHERE id = ?1",
                    params![matter_id, count],
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            if updated == 0 {
                return Err(JurisError::MatterNotFound {
                    id: matter_id.clone(),
                });
            }

            Ok(count)
        })
    }

    // Document operations

    async fn insert_document(&self, document: &Document) -> Result<()> {
        let content_hash = document.content_hash.map(|h| h.to_vec());

        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO documents (id, matter_id, name, kind, char_count, chunk_count,
                                       content_hash, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    document.id.to_string(),
                    document.matter_id.to_string(),
                    document.name,
                    document.kind,
                    document.char_count as i64,
                    document.chunk_count,
                    content_hash,
                    document.created_at as i64,
                ],
            )
            .map_err(|e| JurisError::database(format!("Failed to insert document: {}", e)))?;

            debug!("Inserted document: {}", document.id);
            Ok(())
        })
    }

    async fn get_document(&self, id: Ulid) -> Result<Option<Document>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, matter_id, name, kind, char_count, chunk_count,
                           content_hash, created_at
                    FROM documents WHERE id = ?1
                    "#,
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let result = stmt
                .query_row(params![id.to_string()], |row| Self::row_to_document(row))
                .optional()
                .map_err(|e| JurisError::database(e.to_string()))?;

            Ok(result)
        })
    }

    async fn list_documents(&self, matter_id: Ulid) -> Result<Vec<Document>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, matter_id, name, kind, char_count, chunk_count,
                           content_hash, created_at
                    FROM documents
                    WHERE matter_id = ?1
                    ORDER BY created_at DESC
                    "#,
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let documents = stmt
                .query_map(params![matter_id.to_string()], |row| {
                    Self::row_to_document(row)
                })
                .map_err(|e| JurisError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| JurisError::database(e.to_string()))?;

            Ok(documents)
        })
    }

    async fn delete_document(&self, id: Ulid) -> Result<()> {
        self.with_conn(|conn| {
            // Passages are deleted by CASCADE
            let deleted = conn
                .execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])
                .map_err(|e| JurisError::database(e.to_string()))?;

            if deleted == 0 {
                return Err(JurisError::DocumentNotFound);
            }

            debug!("Deleted document: {}", id);
            Ok(())
        })
    }

    async fn set_chunk_count(&self, document_id: Ulid, count: u32) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE documents SET chunk_count = ?2 WHERE id = ?1",
                    params![document_id.to_string(), count],
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            if updated == 0 {
                return Err(JurisError::DocumentNotFound);
            }

            Ok(())
        })
    }

    async fn find_document_by_hash(
        &self,
        matter_id: Ulid,
        hash: &[u8; 32],
    ) -> Result<Option<Document>> {
        let hash = hash.to_vec();
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, matter_id, name, kind, char_count, chunk_count,
                           content_hash, created_at
                    FROM documents
                    WHERE matter_id = ?1 AND content_hash = ?2
                    "#,
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let result = stmt
                .query_row(params![matter_id.to_string(), hash], |row| {
                    Self::row_to_document(row)
                })
                .optional()
                .map_err(|e| JurisError::database(e.to_string()))?;

            Ok(result)
        })
    }

    // Passage operations

    async fn insert_passages(&self, passages: &[Passage]) -> Result<()> {
        let passages: Vec<Passage> = passages.to_vec();
        self.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| JurisError::database(e.to_string()))?;

            {
                let mut stmt = tx
                    .prepare(
                        r#"
                        INSERT INTO passages (id, matter_id, document_id, document_name,
                                              doc_kind, seq, content)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                        "#,
                    )
                    .map_err(|e| JurisError::database(e.to_string()))?;

                for passage in &passages {
                    stmt.execute(params![
                        passage.id.to_string(),
                        passage.matter_id.to_string(),
                        passage.document_id.to_string(),
                        passage.document_name,
                        passage.doc_kind,
                        passage.seq,
                        passage.content,
                    ])
                    .map_err(|e| JurisError::database(format!("Failed to insert passage: {}", e)))?;
                }
            }

            tx.commit()
                .map_err(|e| JurisError::database(e.to_string()))?;

            debug!("Inserted {} passages", passages.len());
            Ok(())
        })
    }

    async fn list_passages(
        &self,
        matter_id: Ulid,
        kinds: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<Passage>> {
        let matter_id = matter_id.to_string();
        let kinds: Option<Vec<String>> = kinds.map(|k| k.to_vec());
        let limit = limit as i64;

        self.with_conn(move |conn| {
            if let Some(kinds) = &kinds {
                if kinds.is_empty() {
                    return Ok(Vec::new());
                }

                let placeholders = (0..kinds.len())
                    .map(|i| format!("?{}", i + 2))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    r#"
                    SELECT id, matter_id, document_id, document_name, doc_kind, seq, content
                    FROM passages
                    WHERE matter_id = ?1 AND doc_kind IN ({})
                    ORDER BY document_name, seq
                    LIMIT ?{}
                    "#,
                    placeholders,
                    kinds.len() + 2
                );

                let mut stmt = conn
                    .prepare(&sql)
                    .map_err(|e| JurisError::database(e.to_string()))?;

                let mut values: Vec<&dyn ToSql> = Vec::with_capacity(kinds.len() + 2);
                values.push(&matter_id);
                for kind in kinds {
                    values.push(kind);
                }
                values.push(&limit);

                let passages = stmt
                    .query_map(params_from_iter(values), |row| Self::row_to_passage(row))
                    .map_err(|e| JurisError::database(e.to_string()))?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| JurisError::database(e.to_string()))?;

                Ok(passages)
            } else {
                let mut stmt = conn
                    .prepare(
                        r#"
                        SELECT id, matter_id, document_id, document_name, doc_kind, seq, content
                        FROM passages
                        WHERE matter_id = ?1
                        ORDER BY document_name, seq
                        LIMIT ?2
                        "#,
                    )
                    .map_err(|e| JurisError::database(e.to_string()))?;

                let passages = stmt
                    .query_map(params![matter_id, limit], |row| Self::row_to_passage(row))
                    .map_err(|e| JurisError::database(e.to_string()))?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| JurisError::database(e.to_string()))?;

                Ok(passages)
            }
        })
    }

    async fn list_passages_for_document(&self, document_id: Ulid) -> Result<Vec<Passage>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, matter_id, document_id, document_name, doc_kind, seq, content
                    FROM passages
                    WHERE document_id = ?1
                    ORDER BY seq
                    "#,
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let passages = stmt
                .query_map(params![document_id.to_string()], |row| {
                    Self::row_to_passage(row)
                })
                .map_err(|e| JurisError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| JurisError::database(e.to_string()))?;

            Ok(passages)
        })
    }

    async fn keyword_search(
        &self,
        matter_id: Ulid,
        expression: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        let matter_id = matter_id.to_string();
        let expression = expression.to_string();
        let limit = limit as i64;

        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT p.content, p.document_name, p.doc_kind, bm25(passages_fts) AS score
                    FROM passages_fts f
                    JOIN passages p ON p.rowid = f.rowid
                    WHERE passages_fts MATCH ?1
                    AND p.matter_id = ?2
                    ORDER BY score
                    LIMIT ?3
                    "#,
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let rows = stmt
                .query_map(params![expression, matter_id, limit], |row| {
                    Ok(RetrievedPassage {
                        content: row.get(0)?,
                        document_name: row.get(1)?,
                        doc_kind: row.get(2)?,
                    })
                })
                .map_err(|e| JurisError::database(e.to_string()))?;

            let results: Vec<_> = rows
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| JurisError::database(e.to_string()))?;

            Ok(results)
        })
    }

    async fn sample_passages(
        &self,
        matter_id: Ulid,
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        let matter_id = matter_id.to_string();
        let limit = limit as i64;

        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT content, document_name, doc_kind
                    FROM passages
                    WHERE matter_id = ?1
                    ORDER BY document_name, seq
                    LIMIT ?2
                    "#,
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let rows = stmt
                .query_map(params![matter_id, limit], |row| {
                    Ok(RetrievedPassage {
                        content: row.get(0)?,
                        document_name: row.get(1)?,
                        doc_kind: row.get(2)?,
                    })
                })
                .map_err(|e| JurisError::database(e.to_string()))?;

            let results: Vec<_> = rows
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| JurisError::database(e.to_string()))?;

            Ok(results)
        })
    }

    // Share operations

    async fn upsert_share(&self, share: &MatterShare) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO matter_shares (id, matter_id, user_id, permission, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (matter_id, user_id) DO UPDATE SET permission = excluded.permission
                "#,
                params![
                    share.id.to_string(),
                    share.matter_id.to_string(),
                    share.user_id,
                    share.permission.as_str(),
                    share.created_at as i64,
                ],
            )
            .map_err(|e| JurisError::database(format!("Failed to share matter: {}", e)))?;

            debug!("Shared matter {} with {}", share.matter_id, share.user_id);
            Ok(())
        })
    }

    async fn get_share(&self, matter_id: Ulid, user_id: &str) -> Result<Option<MatterShare>> {
        let user_id = user_id.to_string();
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, matter_id, user_id, permission, created_at
                    FROM matter_shares
                    WHERE matter_id = ?1 AND user_id = ?2
                    "#,
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let result = stmt
                .query_row(params![matter_id.to_string(), user_id], |row| {
                    Self::row_to_share(row)
                })
                .optional()
                .map_err(|e| JurisError::database(e.to_string()))?;

            Ok(result)
        })
    }

    async fn list_shares(&self, matter_id: Ulid) -> Result<Vec<MatterShare>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, matter_id, user_id, permission, created_at
                    FROM matter_shares
                    WHERE matter_id = ?1
                    ORDER BY created_at
                    "#,
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let shares = stmt
                .query_map(params![matter_id.to_string()], |row| Self::row_to_share(row))
                .map_err(|e| JurisError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| JurisError::database(e.to_string()))?;

            Ok(shares)
        })
    }

    async fn delete_share(&self, id: Ulid) -> Result<()> {
        let id = id.to_string();
        self.with_conn(|conn| {
            let deleted = conn
                .execute("DELETE FROM matter_shares WHERE id = ?1", params![id])
                .map_err(|e| JurisError::database(e.to_string()))?;

            if deleted == 0 {
                return Err(JurisError::ShareNotFound { id: id.clone() });
            }

            debug!("Deleted share: {}", id);
            Ok(())
        })
    }

    // History operations

    async fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO conversation_history (id, matter_id, user_id, question, answer,
                                                  tool_name, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    entry.id.to_string(),
                    entry.matter_id.to_string(),
                    entry.user_id,
                    entry.question,
                    entry.answer,
                    entry.tool_name,
                    entry.created_at as i64,
                ],
            )
            .map_err(|e| JurisError::database(format!("Failed to append history: {}", e)))?;

            Ok(())
        })
    }

    async fn list_history(&self, matter_id: Ulid, user_id: &str) -> Result<Vec<HistoryEntry>> {
        let user_id = user_id.to_string();
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, matter_id, user_id, question, answer, tool_name, created_at
                    FROM conversation_history
                    WHERE matter_id = ?1 AND user_id = ?2
                    ORDER BY created_at, id
                    "#,
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            let entries = stmt
                .query_map(params![matter_id.to_string(), user_id], |row| {
                    Self::row_to_history(row)
                })
                .map_err(|e| JurisError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| JurisError::database(e.to_string()))?;

            Ok(entries)
        })
    }

    async fn clear_history(&self, matter_id: Ulid, user_id: &str) -> Result<()> {
        let user_id = user_id.to_string();
        self.with_conn(|conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM conversation_history WHERE matter_id = ?1 AND user_id = ?2",
                    params![matter_id.to_string(), user_id],
                )
                .map_err(|e| JurisError::database(e.to_string()))?;

            debug!("Cleared {} history entries", deleted);
            Ok(())
        })
    }

    // Stats

    async fn get_stats(&self, matter_id: Option<Ulid>) -> Result<Stats> {
        let filter = matter_id.map(|id| id.to_string());

        self.with_conn(move |conn| {
            let matters: u64 = conn
                .query_row("SELECT COUNT(*) FROM matters", [], |row| row.get(0))
                .map_err(|e| JurisError::database(e.to_string()))?;

            let (documents, passages): (u64, u64) = if let Some(ref id) = filter {
                let docs: u64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM documents WHERE matter_id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .map_err(|e| JurisError::database(e.to_string()))?;

                let passages: u64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM passages WHERE matter_id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .map_err(|e| JurisError::database(e.to_string()))?;

                (docs, passages)
            } else {
                let docs: u64 = conn
                    .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
                    .map_err(|e| JurisError::database(e.to_string()))?;

                let passages: u64 = conn
                    .query_row("SELECT COUNT(*) FROM passages", [], |row| row.get(0))
                    .map_err(|e| JurisError::database(e.to_string()))?;

                (docs, passages)
            };

            // Get page count and page size to estimate storage
            let page_count: u64 = conn
                .query_row("PRAGMA page_count", [], |row| row.get(0))
                .unwrap_or(0);
            let page_size: u64 = conn
                .query_row("PRAGMA page_size", [], |row| row.get(0))
                .unwrap_or(4096);

            Ok(Stats {
                matters,
                documents,
                passages,
                storage_bytes: page_count * page_size,
                filter,
            })
        })
    }
}

// Helper methods
impl SqliteStore {
    /// Convert a row to a Matter.
    fn row_to_matter(row: &rusqlite::Row<'_>) -> rusqlite::Result<Matter> {
        let id_str: String = row.get(0)?;

        Ok(Matter {
            id: Ulid::from_string(&id_str).unwrap_or_else(|_| Ulid::nil()),
            name: row.get(1)?,
            jurisdiction: row.get(2)?,
            nature: row.get(3)?,
            issues: row.get(4)?,
            owner_id: row.get(5)?,
            document_count: row.get(6)?,
            created_at: row.get::<_, i64>(7)? as u64,
        })
    }

    /// Convert a row to a Document.
    fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
        let id_str: String = row.get(0)?;
        let matter_id_str: String = row.get(1)?;
        let content_hash: Option<Vec<u8>> = row.get(6)?;

        Ok(Document {
            id: Ulid::from_string(&id_str).unwrap_or_else(|_| Ulid::nil()),
            matter_id: Ulid::from_string(&matter_id_str).unwrap_or_else(|_| Ulid::nil()),
            name: row.get(2)?,
            kind: row.get(3)?,
            char_count: row.get::<_, i64>(4)? as u64,
            chunk_count: row.get(5)?,
            content_hash: content_hash.and_then(|v| v.try_into().ok()),
            created_at: row.get::<_, i64>(7)? as u64,
        })
    }

    /// Convert a row to a Passage.
    fn row_to_passage(row: &rusqlite::Row<'_>) -> rusqlite::Result<Passage> {
        let id_str: String = row.get(0)?;
        let matter_id_str: String = row.get(1)?;
        let document_id_str: String = row.get(2)?;

        Ok(Passage {
            id: Ulid::from_string(&id_str).unwrap_or_else(|_| Ulid::nil()),
            matter_id: Ulid::from_string(&matter_id_str).unwrap_or_else(|_| Ulid::nil()),
            document_id: Ulid::from_string(&document_id_str).unwrap_or_else(|_| Ulid::nil()),
            document_name: row.get(3)?,
            doc_kind: row.get(4)?,
            seq: row.get(5)?,
            content: row.get(6)?,
        })
    }

    /// Convert a row to a MatterShare.
    fn row_to_share(row: &rusqlite::Row<'_>) -> rusqlite::Result<MatterShare> {
        let id_str: String = row.get(0)?;
        let matter_id_str: String = row.get(1)?;
        let permission: String = row.get(3)?;

        Ok(MatterShare {
            id: Ulid::from_string(&id_str).unwrap_or_else(|_| Ulid::nil()),
            matter_id: Ulid::from_string(&matter_id_str).unwrap_or_else(|_| Ulid::nil()),
            user_id: row.get(2)?,
            permission: permission.parse().unwrap_or(SharePermission::Read),
            created_at: row.get::<_, i64>(4)? as u64,
        })
    }

    /// Convert a row to a HistoryEntry.
    fn row_to_history(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryEntry> {
        let id_str: String = row.get(0)?;
        let matter_id_str: String = row.get(1)?;

        Ok(HistoryEntry {
            id: Ulid::from_string(&id_str).unwrap_or_else(|_| Ulid::nil()),
            matter_id: Ulid::from_string(&matter_id_str).unwrap_or_else(|_| Ulid::nil()),
            user_id: row.get(2)?,
            question: row.get(3)?,
            answer: row.get(4)?,
            tool_name: row.get(5)?,
            created_at: row.get::<_, i64>(6)? as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(store.list_matters_owned("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("juris.db");

        let matter = Matter::new("Smith v Jones", None, None, None, "user-1");
        let matter_id = matter.id;

        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_matter(&matter).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let retrieved = store.get_matter(matter_id).await.unwrap().unwrap();
        assert_eq!(retrieved.name, "Smith v Jones");
    }

    #[tokio::test]
    async fn test_matter_crud() {
        let store = SqliteStore::open_memory().unwrap();

        // Create
        let matter = Matter::new(
            "Re Conyers Trust",
            Some("Cayman Islands"),
            Some("Trust dispute"),
            Some("Breach of fiduciary duty"),
            "user-1",
        );
        let matter_id = matter.id;
        store.create_matter(&matter).await.unwrap();

        // Read
        let retrieved = store.get_matter(matter_id).await.unwrap().unwrap();
        assert_eq!(retrieved.name, "Re Conyers Trust");
        assert_eq!(retrieved.jurisdiction, "Cayman Islands");
        assert_eq!(retrieved.nature, "Trust dispute");
        assert_eq!(retrieved.owner_id, "user-1");

        // List
        let owned = store.list_matters_owned("user-1").await.unwrap();
        assert_eq!(owned.len(), 1);
        assert!(store.list_matters_owned("user-2").await.unwrap().is_empty());

        // Delete
        store.delete_matter(matter_id).await.unwrap();
        assert!(store.get_matter(matter_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_matter_partial_fields() {
        let store = SqliteStore::open_memory().unwrap();

        let matter = Matter::new("Original", None, Some("Contract dispute"), None, "user-1");
        let matter_id = matter.id;
        store.create_matter(&matter).await.unwrap();

        let update = MatterUpdate {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        store.update_matter(matter_id, &update).await.unwrap();

        // Untouched fields survive the update
        let retrieved = store.get_matter(matter_id).await.unwrap().unwrap();
        assert_eq!(retrieved.name, "Renamed");
        assert_eq!(retrieved.nature, "Contract dispute");
    }

    #[tokio::test]
    async fn test_update_missing_matter() {
        let store = SqliteStore::open_memory().unwrap();

        let update = MatterUpdate {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let err = store.update_matter(Ulid::new(), &update).await.unwrap_err();
        assert!(matches!(err, JurisError::MatterNotFound { .. }));
    }

    #[tokio::test]
    async fn test_document_crud_and_hash_lookup() {
        let store = SqliteStore::open_memory().unwrap();

        let matter = Matter::new("Smith v Jones", None, None, None, "user-1");
        let matter_id = matter.id;
        store.create_matter(&matter).await.unwrap();

        let doc = Document::new(matter_id, "witness-statement.txt", Some("Witness Statement"), "text");
        let doc_id = doc.id;
        let hash = doc.content_hash.unwrap();
        store.insert_document(&doc).await.unwrap();

        // Read
        let retrieved = store.get_document(doc_id).await.unwrap().unwrap();
        assert_eq!(retrieved.name, "witness-statement.txt");
        assert_eq!(retrieved.kind, "Witness Statement");
        assert_eq!(retrieved.content_hash, Some(hash));

        // Hash lookup
        let by_hash = store.find_document_by_hash(matter_id, &hash).await.unwrap();
        assert_eq!(by_hash.unwrap().id, doc_id);
        assert!(store
            .find_document_by_hash(matter_id, &[0u8; 32])
            .await
            .unwrap()
            .is_none());

        // Chunk count
        store.set_chunk_count(doc_id, 7).await.unwrap();
        let retrieved = store.get_document(doc_id).await.unwrap().unwrap();
        assert_eq!(retrieved.chunk_count, 7);

        // Delete
        store.delete_document(doc_id).await.unwrap();
        assert!(store.get_document(doc_id).await.unwrap().is_none());
        let err = store.delete_document(doc_id).await.unwrap_err();
        assert!(matches!(err, JurisError::DocumentNotFound));
    }

    #[tokio::test]
    async fn test_refresh_document_count() {
        let store = SqliteStore::open_memory().unwrap();

        let matter = Matter::new("Smith v Jones", None, None, None, "user-1");
        let matter_id = matter.id;
        store.create_matter(&matter).await.unwrap();

        let doc_a = Document::new(matter_id, "a.txt", None, "alpha");
        let doc_b = Document::new(matter_id, "b.txt", None, "bravo");
        let doc_b_id = doc_b.id;
        store.insert_document(&doc_a).await.unwrap();
        store.insert_document(&doc_b).await.unwrap();

        let count = store.refresh_document_count(matter_id).await.unwrap();
        assert_eq!(count, 2);
        let matter = store.get_matter(matter_id).await.unwrap().unwrap();
        assert_eq!(matter.document_count, 2);

        store.delete_document(doc_b_id).await.unwrap();
        let count = store.refresh_document_count(matter_id).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_passages_ordered_by_document_then_seq() {
        let store = SqliteStore::open_memory().unwrap();

        let matter = Matter::new("Smith v Jones", None, None, None, "user-1");
        let matter_id = matter.id;
        store.create_matter(&matter).await.unwrap();

        // Inserted out of order across two documents
        let doc_b = Document::new(matter_id, "b-reply.txt", Some("Pleading"), "reply text");
        let doc_a = Document::new(matter_id, "a-claim.txt", Some("Pleading"), "claim text");
        store.insert_document(&doc_b).await.unwrap();
        store.insert_document(&doc_a).await.unwrap();

        let passages = vec![
            Passage::new(matter_id, doc_b.id, "b-reply.txt", "Pleading", 1, "b one"),
            Passage::new(matter_id, doc_a.id, "a-claim.txt", "Pleading", 0, "a zero"),
            Passage::new(matter_id, doc_b.id, "b-reply.txt", "Pleading", 0, "b zero"),
            Passage::new(matter_id, doc_a.id, "a-claim.txt", "Pleading", 1, "a one"),
        ];
        store.insert_passages(&passages).await.unwrap();

        let listed = store.list_passages(matter_id, None, 100).await.unwrap();
        let contents: Vec<&str> = listed.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["a zero", "a one", "b zero", "b one"]);

        let for_doc = store.list_passages_for_document(doc_b.id).await.unwrap();
        assert_eq!(for_doc.len(), 2);
        assert_eq!(for_doc[0].seq, 0);
        assert_eq!(for_doc[1].seq, 1);
    }

    #[tokio::test]
    async fn test_passages_kind_filter() {
        let store = SqliteStore::open_memory().unwrap();

        let matter = Matter::new("Smith v Jones", None, None, None, "user-1");
        let matter_id = matter.id;
        store.create_matter(&matter).await.unwrap();

        let pleading = Document::new(matter_id, "claim.txt", Some("Pleading"), "claim");
        let authority = Document::new(matter_id, "authority.txt", Some("Case Law"), "authority");
        store.insert_document(&pleading).await.unwrap();
        store.insert_document(&authority).await.unwrap();

        let passages = vec![
            Passage::new(matter_id, pleading.id, "claim.txt", "Pleading", 0, "claim text"),
            Passage::new(matter_id, authority.id, "authority.txt", "Case Law", 0, "authority text"),
        ];
        store.insert_passages(&passages).await.unwrap();

        let kinds = vec!["Pleading".to_string()];
        let filtered = store
            .list_passages(matter_id, Some(kinds.as_slice()), 100)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].doc_kind, "Pleading");

        let kinds = vec!["Skeleton Argument".to_string()];
        let filtered = store
            .list_passages(matter_id, Some(kinds.as_slice()), 100)
            .await
            .unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn test_keyword_search_scoped_to_matter() {
        let store = SqliteStore::open_memory().unwrap();

        let matter_a = Matter::new("Matter A", None, None, None, "user-1");
        let matter_b = Matter::new("Matter B", None, None, None, "user-1");
        store.create_matter(&matter_a).await.unwrap();
        store.create_matter(&matter_b).await.unwrap();

        let doc_a = Document::new(matter_a.id, "trust-deed.txt", None, "deed");
        let doc_b = Document::new(matter_b.id, "trust-deed.txt", None, "deed");
        store.insert_document(&doc_a).await.unwrap();
        store.insert_document(&doc_b).await.unwrap();

        let passages = vec![
            Passage::new(
                matter_a.id,
                doc_a.id,
                "trust-deed.txt",
                "Other",
                0,
                "The settlor retained beneficial ownership of the shares",
            ),
            Passage::new(
                matter_a.id,
                doc_a.id,
                "trust-deed.txt",
                "Other",
                1,
                "Dividends were paid into the operating account",
            ),
            Passage::new(
                matter_b.id,
                doc_b.id,
                "trust-deed.txt",
                "Other",
                0,
                "Beneficial ownership passed to the trustee on execution",
            ),
        ];
        store.insert_passages(&passages).await.unwrap();

        let results = store
            .keyword_search(matter_a.id, r#""beneficial" OR "ownership""#, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("settlor"));
        assert_eq!(results[0].document_name, "trust-deed.txt");
    }

    #[tokio::test]
    async fn test_sample_passages() {
        let store = SqliteStore::open_memory().unwrap();

        let matter = Matter::new("Smith v Jones", None, None, None, "user-1");
        let matter_id = matter.id;
        store.create_matter(&matter).await.unwrap();

        let doc = Document::new(matter_id, "affidavit.txt", Some("Affidavit"), "text");
        store.insert_document(&doc).await.unwrap();

        let passages: Vec<Passage> = (0..5)
            .map(|i| {
                Passage::new(
                    matter_id,
                    doc.id,
                    "affidavit.txt",
                    "Affidavit",
                    i,
                    &format!("paragraph {}", i),
                )
            })
            .collect();
        store.insert_passages(&passages).await.unwrap();

        let sample = store.sample_passages(matter_id, 3).await.unwrap();
        assert_eq!(sample.len(), 3);
        assert_eq!(sample[0].doc_kind, "Affidavit");

        assert!(store.sample_passages(Ulid::new(), 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_matter_cascades() {
        let store = SqliteStore::open_memory().unwrap();

        let matter = Matter::new("Smith v Jones", None, None, None, "user-1");
        let matter_id = matter.id;
        store.create_matter(&matter).await.unwrap();

        let doc = Document::new(matter_id, "claim.txt", None, "claim");
        let doc_id = doc.id;
        store.insert_document(&doc).await.unwrap();

        let passages = vec![Passage::new(
            matter_id,
            doc_id,
            "claim.txt",
            "Other",
            0,
            "The charterparty was repudiated",
        )];
        store.insert_passages(&passages).await.unwrap();

        let share = MatterShare::new(matter_id, "user-2", SharePermission::Read);
        store.upsert_share(&share).await.unwrap();

        let entry = HistoryEntry::new(matter_id, "user-1", "Q", "A", None);
        store.append_history(&entry).await.unwrap();

        store.delete_matter(matter_id).await.unwrap();

        assert!(store.get_document(doc_id).await.unwrap().is_none());
        assert!(store
            .list_passages_for_document(doc_id)
            .await
            .unwrap()
            .is_empty());
        assert!(store.get_share(matter_id, "user-2").await.unwrap().is_none());
        assert!(store.list_history(matter_id, "user-1").await.unwrap().is_empty());

        // FTS index is kept in sync by triggers, so the passage is gone
        let results = store
            .keyword_search(matter_id, r#""charterparty""#, 10)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_share_upsert_replaces_permission() {
        let store = SqliteStore::open_memory().unwrap();

        let matter = Matter::new("Smith v Jones", None, None, None, "user-1");
        let matter_id = matter.id;
        store.create_matter(&matter).await.unwrap();

        let share = MatterShare::new(matter_id, "user-2", SharePermission::Read);
        store.upsert_share(&share).await.unwrap();

        let retrieved = store.get_share(matter_id, "user-2").await.unwrap().unwrap();
        assert_eq!(retrieved.permission, SharePermission::Read);

        // Re-sharing with the same user replaces the permission
        let share = MatterShare::new(matter_id, "user-2", SharePermission::Edit);
        store.upsert_share(&share).await.unwrap();

        let retrieved = store.get_share(matter_id, "user-2").await.unwrap().unwrap();
        assert_eq!(retrieved.permission, SharePermission::Edit);
        assert_eq!(store.list_shares(matter_id).await.unwrap().len(), 1);

        store.delete_share(retrieved.id).await.unwrap();
        assert!(store.get_share(matter_id, "user-2").await.unwrap().is_none());
        let err = store.delete_share(retrieved.id).await.unwrap_err();
        assert!(matches!(err, JurisError::ShareNotFound { .. }));
    }

    #[tokio::test]
    async fn test_history_append_list_clear() {
        let store = SqliteStore::open_memory().unwrap();

        let matter = Matter::new("Smith v Jones", None, None, None, "user-1");
        let matter_id = matter.id;
        store.create_matter(&matter).await.unwrap();

        let first = HistoryEntry::new(matter_id, "user-1", "First question", "First answer", None);
        store.append_history(&first).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = HistoryEntry::new(
            matter_id,
            "user-1",
            "Second question",
            "Second answer",
            Some("chronology"),
        );
        store.append_history(&second).await.unwrap();

        let other = HistoryEntry::new(matter_id, "user-2", "Other question", "Other answer", None);
        store.append_history(&other).await.unwrap();

        // Chronological, per user
        let entries = store.list_history(matter_id, "user-1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].question, "First question");
        assert_eq!(entries[1].tool_name.as_deref(), Some("chronology"));

        store.clear_history(matter_id, "user-1").await.unwrap();
        assert!(store.list_history(matter_id, "user-1").await.unwrap().is_empty());
        assert_eq!(store.list_history(matter_id, "user-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = SqliteStore::open_memory().unwrap();

        let matter_a = Matter::new("Matter A", None, None, None, "user-1");
        let matter_b = Matter::new("Matter B", None, None, None, "user-1");
        store.create_matter(&matter_a).await.unwrap();
        store.create_matter(&matter_b).await.unwrap();

        let doc = Document::new(matter_a.id, "claim.txt", None, "claim");
        store.insert_document(&doc).await.unwrap();

        let passages = vec![
            Passage::new(matter_a.id, doc.id, "claim.txt", "Other", 0, "first"),
            Passage::new(matter_a.id, doc.id, "claim.txt", "Other", 1, "second"),
        ];
        store.insert_passages(&passages).await.unwrap();

        let stats = store.get_stats(None).await.unwrap();
        assert_eq!(stats.matters, 2);
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.passages, 2);
        assert!(stats.filter.is_none());

        let stats = store.get_stats(Some(matter_b.id)).await.unwrap();
        assert_eq!(stats.matters, 2);
        assert_eq!(stats.documents, 0);
        assert_eq!(stats.passages, 0);
        assert_eq!(stats.filter, Some(matter_b.id.to_string()));
    }
}
