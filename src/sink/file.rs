//! Flat-file sinks: CSV and JSON exports.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::{CommentSink, SinkError};
use crate::core::types::{Comment, SinkReport, VideoInfo};

const CSV_HEADER: &str = "author,text,like_count,posted_at,reply_count,is_reply,\
parent_author,parent_preview,avatar_url,avatar_local_path,captured_at";

/// Quote a CSV field when it carries a delimiter, quote, or newline.
fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

fn ensure_parent(path: &PathBuf) -> Result<(), SinkError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// One CSV file per batch, UTF-8, header row first.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CommentSink for CsvSink {
    fn write_batch(
        &self,
        _video: &VideoInfo,
        comments: &[Comment],
    ) -> Result<SinkReport, SinkError> {
        if comments.is_empty() {
            return Err(SinkError::EmptyBatch);
        }
        ensure_parent(&self.path)?;

        let mut out = fs::File::create(&self.path)?;
        writeln!(out, "{CSV_HEADER}")?;
        for c in comments {
            let row = [
                csv_field(&c.author),
                csv_field(&c.text),
                c.like_count.to_string(),
                csv_field(&c.posted_at),
                c.reply_count.to_string(),
                c.is_reply.to_string(),
                csv_field(c.parent_author.as_deref().unwrap_or("")),
                csv_field(c.parent_preview.as_deref().unwrap_or("")),
                csv_field(c.avatar.url.as_deref().unwrap_or("")),
                csv_field(
                    &c.avatar
                        .local_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                ),
                c.captured_at.to_rfc3339(),
            ];
            writeln!(out, "{}", row.join(","))?;
        }
        out.flush()?;

        info!(rows = comments.len(), path = %self.path.display(), "CSV export written");
        Ok(SinkReport {
            inserted: comments.len(),
            skipped: 0,
        })
    }
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    video: &'a VideoInfo,
    exported_at: chrono::DateTime<Utc>,
    comment_count: usize,
    comments: &'a [Comment],
}

/// One pretty-printed JSON document per batch, video metadata included.
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CommentSink for JsonSink {
    fn write_batch(
        &self,
        video: &VideoInfo,
        comments: &[Comment],
    ) -> Result<SinkReport, SinkError> {
        if comments.is_empty() {
            return Err(SinkError::EmptyBatch);
        }
        ensure_parent(&self.path)?;

        let doc = JsonDocument {
            video,
            exported_at: Utc::now(),
            comment_count: comments.len(),
            comments,
        };
        let out = fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(out, &doc)?;

        info!(rows = comments.len(), path = %self.path.display(), "JSON export written");
        Ok(SinkReport {
            inserted: comments.len(),
            skipped: 0,
        })
    }
}
