//! Answer history (SQLite).
//!
//! One append-only table holding every generated answer. Rows are never
//! updated or deleted; the only read is "most recent by creation time".

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::error::GatewayResult;

/// Handle to the answers table. Opens a fresh connection per call.
#[derive(Clone)]
pub struct AnswerStore {
    db_path: PathBuf,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AnswerRow {
    pub id: i64,
    pub task: String,
    pub content: String,
    pub created_at_ms: i64,
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl AnswerStore {
    /// Open the store, creating the file and table if absent.
    pub fn new(db_path: PathBuf) -> GatewayResult<Self> {
        let this = Self { db_path };
        this.init()?;
        Ok(this)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection, rusqlite::Error> {
        Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
    }

    fn init(&self) -> GatewayResult<()> {
        if let Some(parent) = self.db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = self.open()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_answers_created_at ON answers(created_at_ms);
            "#,
        )?;
        Ok(())
    }

    /// Append one answer.
    pub fn save(&self, task: &str, content: &str) -> GatewayResult<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO answers (task, content, created_at_ms) VALUES (?1, ?2, ?3)",
            params![task, content, now_ms()],
        )?;
        Ok(())
    }

    /// Most recent answer by creation time; insertion order breaks ties.
    pub fn latest(&self) -> GatewayResult<Option<AnswerRow>> {
        let conn = self.open()?;
        let row = conn
            .query_row(
                "SELECT id, task, content, created_at_ms FROM answers \
                 ORDER BY created_at_ms DESC, id DESC LIMIT 1",
                [],
                |r| {
                    Ok(AnswerRow {
                        id: r.get(0)?,
                        task: r.get(1)?,
                        content: r.get(2)?,
                        created_at_ms: r.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, AnswerStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = AnswerStore::new(dir.path().join("answers.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn latest_on_empty_table_is_none() {
        let (_dir, store) = test_store();
        assert!(store.latest().unwrap().is_none());
    }

    #[test]
    fn latest_returns_the_newest_row() {
        let (_dir, store) = test_store();
        store.save("qa", "first").unwrap();
        store.save("image", "[image generated]").unwrap();
        store.save("platform_content", "third").unwrap();

        let row = store.latest().unwrap().unwrap();
        assert_eq!(row.task, "platform_content");
        assert_eq!(row.content, "third");
    }

    #[test]
    fn ids_are_monotonically_increasing() {
        let (_dir, store) = test_store();
        store.save("qa", "a").unwrap();
        let first = store.latest().unwrap().unwrap().id;
        store.save("qa", "b").unwrap();
        let second = store.latest().unwrap().unwrap().id;
        assert!(second > first);
    }

    #[test]
    fn reopening_the_store_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.db");
        {
            let store = AnswerStore::new(path.clone()).unwrap();
            store.save("qa", "kept").unwrap();
        }
        let store = AnswerStore::new(path).unwrap();
        assert_eq!(store.latest().unwrap().unwrap().content, "kept");
    }
}
