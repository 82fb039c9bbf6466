//! Persistence: where a finished batch goes.
//!
//! Sinks are synchronous and infallible-on-duplicates: writing a record the
//! store already holds is a skip, not an error. An *empty* batch is an error
//! — it almost always means the harvest silently failed upstream, and
//! clobbering a previous export with zero rows would destroy data.

pub mod file;
pub mod sqlite;

use thiserror::Error;

use crate::core::types::{Comment, SinkReport, VideoInfo};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("refusing to write an empty batch")]
    EmptyBatch,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// A destination for one harvest batch.
pub trait CommentSink {
    fn write_batch(
        &self,
        video: &VideoInfo,
        comments: &[Comment],
    ) -> Result<SinkReport, SinkError>;
}
