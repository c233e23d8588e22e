//! Chat-log recording
//!
//! Every finished turn is recorded as (model, input, output). The SQLite
//! recorder keeps a queryable history per session; `MemoryChatLog` keeps
//! entries in memory for hosts that persist elsewhere.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// One recorded exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub input: String,
    pub output: String,
}

impl ChatLogEntry {
    pub fn new(
        model: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            model: model.into(),
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Chat-log recorder supplied by the host
pub trait ChatLog: Send + Sync {
    fn record(&self, entry: &ChatLogEntry) -> anyhow::Result<()>;
}

/// Recorder that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChatLog;

impl ChatLog for NoopChatLog {
    fn record(&self, _entry: &ChatLogEntry) -> anyhow::Result<()> {
        Ok(())
    }
}

/// In-memory recorder
#[derive(Debug, Default)]
pub struct MemoryChatLog {
    entries: parking_lot::Mutex<Vec<ChatLogEntry>>,
}

impl MemoryChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ChatLogEntry> {
        self.entries.lock().clone()
    }
}

impl ChatLog for MemoryChatLog {
    fn record(&self, entry: &ChatLogEntry) -> anyhow::Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}

/// SQLite-backed chat log
pub struct SqliteChatLog {
    conn: Mutex<Connection>,
    session_id: Uuid,
    path: PathBuf,
}

impl SqliteChatLog {
    /// Open (or create) the database and register a new session
    pub fn open(path: &Path, session_id: Uuid) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chat_log (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                model TEXT NOT NULL,
                input TEXT NOT NULL,
                output TEXT NOT NULL,
                FOREIGN KEY (session_id) REFERENCES sessions(id)
            );

            CREATE INDEX IF NOT EXISTS idx_chat_log_session ON chat_log(session_id);
            CREATE INDEX IF NOT EXISTS idx_chat_log_timestamp ON chat_log(timestamp);
        "#,
        )?;

        conn.execute(
            "INSERT OR IGNORE INTO sessions (id, started_at) VALUES (?1, ?2)",
            params![session_id.to_string(), Utc::now().to_rfc3339()],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            session_id,
            path: path.to_path_buf(),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Most recent entries across all sessions, newest first
    pub fn recent(&self, limit: usize) -> anyhow::Result<Vec<ChatLogEntry>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, timestamp, model, input, output
            FROM chat_log
            ORDER BY timestamp DESC
            LIMIT ?1
        "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (id, timestamp, model, input, output) = row?;
            results.push(ChatLogEntry {
                id: Uuid::parse_str(&id)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp)?.with_timezone(&Utc),
                model,
                input,
                output,
            });
        }
        Ok(results)
    }
}

impl ChatLog for SqliteChatLog {
    fn record(&self, entry: &ChatLogEntry) -> anyhow::Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        conn.execute(
            r#"INSERT INTO chat_log (id, session_id, timestamp, model, input, output)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                entry.id.to_string(),
                self.session_id.to_string(),
                entry.timestamp.to_rfc3339(),
                entry.model,
                entry.input,
                entry.output
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let log = SqliteChatLog::open(&dir.path().join("chat.db"), Uuid::new_v4()).unwrap();

        log.record(&ChatLogEntry::new("ep-1", "hello", "Hi there"))
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        log.record(&ChatLogEntry::new("ep-1", "again", "Sure"))
            .unwrap();

        let recent = log.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].input, "again");
        assert_eq!(recent[1].output, "Hi there");
        assert_eq!(recent[1].model, "ep-1");

        assert_eq!(log.recent(1).unwrap().len(), 1);
    }

    #[test]
    fn test_sessions_share_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");

        let first = SqliteChatLog::open(&path, Uuid::new_v4()).unwrap();
        first.record(&ChatLogEntry::new("m", "a", "b")).unwrap();
        drop(first);

        let second = SqliteChatLog::open(&path, Uuid::new_v4()).unwrap();
        assert_eq!(second.recent(10).unwrap().len(), 1);
    }

    #[test]
    fn test_memory_log() {
        let log = MemoryChatLog::new();
        log.record(&ChatLogEntry::new("m", "in", "out")).unwrap();
        assert_eq!(log.entries()[0].output, "out");
    }
}
