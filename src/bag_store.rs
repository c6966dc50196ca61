//! rosbag2 SQLite (.db3) access: topic discovery, per-topic record retrieval and inspection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, params};

use crate::error::{BagSyncError, Result};

/// A topic declared in the container's `topics` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescriptor {
    pub id: i64,
    pub name: String,
    pub type_id: String,
}

/// One row of the `messages` table, still serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub topic_id: i64,
    /// Container record time, not the payload's own stamp.
    pub timestamp_ns: i64,
    pub payload: Vec<u8>,
    pub type_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSummary {
    pub name: String,
    pub type_id: String,
    pub count: u64,
    pub first_ns: Option<i64>,
    pub last_ns: Option<i64>,
}

/// An open, read-only log container. Dropping it releases the handle.
#[derive(Debug)]
pub struct LogStore {
    path: PathBuf,
    conn: Connection,
    topics: Vec<TopicDescriptor>,
}

impl LogStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(BagSyncError::NotFound { path });
        }
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| BagSyncError::Corrupt { path: path.clone(), source })?;

        let topics = read_topics(&conn).map_err(|source| BagSyncError::Corrupt { path: path.clone(), source })?;
        tracing::debug!("opened {} with {} topics", path.display(), topics.len());

        Ok(Self { path, conn, topics })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list_topics(&self) -> &[TopicDescriptor] {
        &self.topics
    }

    pub fn topic(&self, name: &str) -> Option<&TopicDescriptor> {
        self.topics.iter().find(|t| t.name == name)
    }

    /// All records of `topic_name` in insertion order.
    pub fn read_all(&self, topic_name: &str) -> Result<Vec<LogRecord>> {
        let topic = self.topic(topic_name).ok_or_else(|| BagSyncError::UnknownTopic {
            topic: topic_name.to_string(),
            path: self.path.clone(),
        })?;

        let query = || -> rusqlite::Result<Vec<LogRecord>> {
            let mut stmt = self
                .conn
                .prepare("SELECT timestamp, data FROM messages WHERE topic_id = ?1 ORDER BY rowid")?;
            let rows = stmt.query_map([topic.id], |row| {
                Ok(LogRecord {
                    topic_id: topic.id,
                    timestamp_ns: row.get(0)?,
                    payload: row.get(1)?,
                    type_id: topic.type_id.clone(),
                })
            })?;
            rows.collect()
        };
        query().map_err(|source| BagSyncError::Query { path: self.path.clone(), source })
    }

    /// Message count and time span per topic, ordered by topic name.
    pub fn summary(&self) -> Result<Vec<TopicSummary>> {
        let query = || -> rusqlite::Result<BTreeMap<i64, (u64, Option<i64>, Option<i64>)>> {
            let mut stmt = self
                .conn
                .prepare("SELECT topic_id, COUNT(*), MIN(timestamp), MAX(timestamp) FROM messages GROUP BY topic_id")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    (row.get::<_, i64>(1)? as u64, row.get::<_, Option<i64>>(2)?, row.get::<_, Option<i64>>(3)?),
                ))
            })?;
            rows.collect()
        };
        let stats = query().map_err(|source| BagSyncError::Query { path: self.path.clone(), source })?;

        let mut out: Vec<TopicSummary> = self
            .topics
            .iter()
            .map(|t| {
                let (count, first_ns, last_ns) = stats.get(&t.id).copied().unwrap_or((0, None, None));
                TopicSummary {
                    name: t.name.clone(),
                    type_id: t.type_id.clone(),
                    count,
                    first_ns,
                    last_ns,
                }
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    /// Release the handle now instead of at drop.
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn
            .close()
            .map_err(|(_, source)| BagSyncError::Query { path, source })
    }
}

fn read_topics(conn: &Connection) -> rusqlite::Result<Vec<TopicDescriptor>> {
    let mut stmt = conn.prepare("SELECT id, name, type FROM topics ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(TopicDescriptor {
            id: row.get(0)?,
            name: row.get(1)?,
            type_id: row.get(2)?,
        })
    })?;
    rows.collect()
}

/// Writes rosbag2-schema containers: synthetic datasets and test fixtures.
pub struct BagWriter {
    conn: Connection,
    topic_ids: BTreeMap<String, i64>,
}

impl BagWriter {
    pub fn create(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to create bag at {}", path.display()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                serialization_format TEXT NOT NULL,
                offered_qos_profiles TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY,
                topic_id INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                data BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS timestamp_idx ON messages (timestamp ASC);",
        )?;
        Ok(Self { conn, topic_ids: BTreeMap::new() })
    }

    pub fn add_topic(&mut self, name: &str, type_id: &str) -> anyhow::Result<i64> {
        if let Some(id) = self.topic_ids.get(name) {
            return Ok(*id);
        }
        self.conn.execute(
            "INSERT INTO topics (name, type, serialization_format, offered_qos_profiles) VALUES (?1, ?2, 'cdr', '')",
            params![name, type_id],
        )?;
        let id = self.conn.last_insert_rowid();
        self.topic_ids.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn write(&mut self, topic_id: i64, timestamp_ns: i64, payload: &[u8]) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO messages (topic_id, timestamp, data) VALUES (?1, ?2, ?3)",
            params![topic_id, timestamp_ns, payload],
        )?;
        Ok(())
    }
}
