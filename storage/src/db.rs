use std::path::PathBuf;
use rusqlite::{params, Row};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};
use crate::{
    error::Result,
    models::StoredMemory,
    migrations,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("recall.db"),
            max_connections: 5,
        }
    }
}

/// Durable memory store backed by SQLite with an FTS5 relevance index.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

const MEMORY_COLUMNS: &str = "m.id, m.user_id, m.text, m.metadata, m.created_at";

impl Storage {
    pub fn new(config: StorageConfig) -> Result<Self> {
        let manager = SqliteConnectionManager::file(&config.path);
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .build(manager)?;

        let conn = pool.get()?;
        migrations::run_migrations(&conn)?;

        Ok(Self { pool })
    }

    /// In-memory database. A single connection keeps the data alive.
    pub fn memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;

        let conn = pool.get()?;
        migrations::run_migrations(&conn)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    pub fn add_memory(&self, memory: &StoredMemory) -> Result<()> {
        self.add_memories(std::slice::from_ref(memory))
    }

    /// Inserts a batch atomically: either every record lands or none does.
    pub fn add_memories(&self, memories: &[StoredMemory]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO memories (id, user_id, text, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for memory in memories {
                stmt.execute(params![
                    memory.id,
                    memory.user_id,
                    memory.text,
                    memory.metadata,
                    memory.created_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Relevance-ranked search scoped to one user, most relevant first.
    pub fn search_memories(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<StoredMemory>> {
        let Some(fts) = fts_query(query) else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS}, memories_fts.rank
             FROM memories_fts
             JOIN memories m ON m.rowid = memories_fts.rowid
             WHERE memories_fts MATCH ?1 AND m.user_id = ?2
             ORDER BY memories_fts.rank
             LIMIT ?3"
        ))?;

        let memories = stmt
            .query_map(params![fts, user_id, limit as i64], memory_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(memories)
    }

    /// Newest first.
    pub fn list_memories(&self, user_id: &str, limit: usize) -> Result<Vec<StoredMemory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS}, NULL
             FROM memories m
             WHERE m.user_id = ?1
             ORDER BY m.created_at DESC, m.rowid DESC
             LIMIT ?2"
        ))?;

        let memories = stmt
            .query_map(params![user_id, limit as i64], memory_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(memories)
    }

    pub fn count_memories(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM memories WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<StoredMemory> {
    Ok(StoredMemory {
        id: row.get(0)?,
        user_id: row.get(1)?,
        text: row.get(2)?,
        metadata: row.get(3)?,
        created_at: row.get(4)?,
        score: row.get(5)?,
    })
}

/// Turns free text into an FTS5 OR-query of quoted terms, so punctuation in
/// user input can never produce a MATCH syntax error.
fn fts_query(text: &str) -> Option<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
        let term = term.to_lowercase();
        if !terms.contains(&term) {
            terms.push(term);
        }
    }

    if terms.is_empty() {
        return None;
    }

    Some(
        terms
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}
