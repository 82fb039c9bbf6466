//! SQLite store: the durable, dedup-aware sink.
//!
//! Cross-run identity is `(video_id, author, text)` — a repeat harvest of
//! the same video inserts only the comments the table has never seen.
//! Connection access is serialized behind a mutex; batch writes run in one
//! transaction.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::{CommentSink, SinkError};
use crate::core::types::{AvatarRef, Comment, SinkReport, VideoInfo};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS videos (
    video_id    TEXT PRIMARY KEY,
    video_url   TEXT NOT NULL,
    author      TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    tags        TEXT NOT NULL DEFAULT '[]',
    post_time   TEXT NOT NULL DEFAULT '',
    first_seen  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS comments (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id          TEXT NOT NULL REFERENCES videos(video_id),
    author            TEXT NOT NULL,
    text              TEXT NOT NULL,
    like_count        INTEGER NOT NULL DEFAULT 0,
    posted_at         TEXT NOT NULL DEFAULT '',
    reply_count       INTEGER NOT NULL DEFAULT 0,
    is_reply          INTEGER NOT NULL DEFAULT 0,
    parent_author     TEXT,
    parent_preview    TEXT,
    avatar_url        TEXT,
    avatar_local_path TEXT,
    captured_at       TEXT NOT NULL,
    UNIQUE (video_id, author, text)
);
CREATE INDEX IF NOT EXISTS idx_comments_video ON comments (video_id);
";

/// Durable comment store over a single SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and migrate) the store at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.display(), "sqlite store open");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store. Test-friendly; same schema and semantics.
    pub fn in_memory() -> Result<Self, SinkError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// `(videos, comments)` row counts.
    pub fn stats(&self) -> Result<(usize, usize), SinkError> {
        let conn = self.conn.lock().unwrap();
        let videos: usize = conn.query_row("SELECT COUNT(*) FROM videos", [], |r| r.get(0))?;
        let comments: usize = conn.query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))?;
        Ok((videos, comments))
    }

    /// All stored comments for one video, in insertion order.
    pub fn comments_for_video(&self, video_id: &str) -> Result<Vec<Comment>, SinkError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT author, text, like_count, posted_at, reply_count, is_reply,
                    parent_author, parent_preview, avatar_url, avatar_local_path, captured_at
             FROM comments WHERE video_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![video_id], |row| {
            let captured_raw: String = row.get(10)?;
            let avatar_local: Option<String> = row.get(9)?;
            Ok(Comment {
                author: row.get(0)?,
                text: row.get(1)?,
                like_count: row.get::<_, i64>(2)? as u64,
                posted_at: row.get(3)?,
                reply_count: row.get::<_, i64>(4)? as u64,
                is_reply: row.get::<_, i64>(5)? != 0,
                parent_author: row.get(6)?,
                parent_preview: row.get(7)?,
                avatar: AvatarRef {
                    url: row.get(8)?,
                    local_path: avatar_local.map(Into::into),
                },
                captured_at: DateTime::parse_from_rfc3339(&captured_raw)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Stored metadata for one video, if ever harvested.
    pub fn video(&self, video_id: &str) -> Result<Option<VideoInfo>, SinkError> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT video_id, video_url, author, description, tags, post_time
                 FROM videos WHERE video_id = ?1",
                params![video_id],
                |row| {
                    let tags_raw: String = row.get(4)?;
                    Ok(VideoInfo {
                        video_id: row.get(0)?,
                        video_url: row.get(1)?,
                        author: row.get(2)?,
                        description: row.get(3)?,
                        tags: serde_json::from_str(&tags_raw).unwrap_or_default(),
                        post_time: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

impl CommentSink for SqliteStore {
    fn write_batch(
        &self,
        video: &VideoInfo,
        comments: &[Comment],
    ) -> Result<SinkReport, SinkError> {
        if comments.is_empty() {
            return Err(SinkError::EmptyBatch);
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO videos (video_id, video_url, author, description, tags, post_time, first_seen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (video_id) DO UPDATE SET
                 video_url = excluded.video_url,
                 author = excluded.author,
                 description = excluded.description,
                 tags = excluded.tags,
                 post_time = excluded.post_time",
            params![
                video.video_id,
                video.video_url,
                video.author,
                video.description,
                serde_json::to_string(&video.tags)?,
                video.post_time,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO comments
                     (video_id, author, text, like_count, posted_at, reply_count, is_reply,
                      parent_author, parent_preview, avatar_url, avatar_local_path, captured_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for c in comments {
                inserted += stmt.execute(params![
                    video.video_id,
                    c.author,
                    c.text,
                    c.like_count as i64,
                    c.posted_at,
                    c.reply_count as i64,
                    c.is_reply as i64,
                    c.parent_author,
                    c.parent_preview,
                    c.avatar.url,
                    c.avatar.local_path.as_ref().map(|p| p.display().to_string()),
                    c.captured_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;

        let skipped = comments.len() - inserted;
        info!(inserted, skipped, video_id = %video.video_id, "sqlite batch committed");
        Ok(SinkReport { inserted, skipped })
    }
}
