use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sentinel author for containers whose username field never rendered.
/// Records carrying it are degenerate and may be filtered (`skip_unknown`).
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Placeholder for a timestamp field that never rendered.
pub const UNKNOWN_TIME: &str = "Unknown";

/// External avatar reference: the page-provided URL plus the local cache path
/// once the asynchronous download has succeeded. `local_path` stays `None`
/// when the fetch fails — never fatal to the record.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AvatarRef {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub local_path: Option<PathBuf>,
}

/// One harvested comment, top-level or reply.
///
/// Identity for deduplication is the `(author, text)` pair within a single
/// harvest session. That is approximate on purpose: the DOM re-renders and
/// re-orders items while we scroll, so node identity is worthless, and two
/// genuinely distinct comments with identical author and body collapse.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Comment {
    pub author: String,
    pub text: String,
    pub like_count: u64,
    /// Platform-relative display string ("2d ago"); not normalized.
    pub posted_at: String,
    pub reply_count: u64,
    #[serde(default)]
    pub is_reply: bool,
    /// Author of the enclosing top-level comment. Set only on replies.
    /// Known approximation: two top-level comments by the same author in one
    /// feed collide on this key — the source system behaves the same way.
    #[serde(default)]
    pub parent_author: Option<String>,
    /// Truncated parent body carried for display convenience, not identity.
    #[serde(default)]
    pub parent_preview: Option<String>,
    #[serde(default)]
    pub avatar: AvatarRef,
    /// Provenance only; never used for ordering.
    pub captured_at: DateTime<Utc>,
}

impl Comment {
    /// Dedup key: `(author, text)` scoped to one harvest session.
    pub fn identity(&self) -> (&str, &str) {
        (self.author.as_str(), self.text.as_str())
    }

    pub fn is_unknown_author(&self) -> bool {
        self.author == UNKNOWN_AUTHOR
    }
}

/// Best-effort metadata for the video whose feed we are harvesting.
/// Every field except the id degrades to an empty default.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct VideoInfo {
    pub video_id: String,
    pub video_url: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub post_time: String,
}

impl VideoInfo {
    pub fn from_url(video_id: impl Into<String>, video_url: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            video_url: video_url.into(),
            ..Default::default()
        }
    }
}

/// Why the feed loader stopped driving the scroll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Bounded mode: the rendered item count reached the target cap.
    TargetReached,
    /// The no-growth retry budget was exhausted.
    Stalled,
    /// Unbounded mode: wall-clock time since the last growth exceeded the
    /// idle timeout.
    IdleTimeout,
}

/// Outcome of one feed-loading pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Highest rendered item count observed.
    pub rendered: usize,
    pub rounds: u32,
    pub stop: StopReason,
}

/// Counts reported by a sink after a batch write.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SinkReport {
    pub inserted: usize,
    /// Rows skipped because the storage layer already held the same
    /// `(video, author, text)` identity.
    pub skipped: usize,
}

/// Final report handed back by a harvest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestReport {
    pub video: VideoInfo,
    pub total_comments: usize,
    pub top_level: usize,
    pub replies: usize,
    /// In-memory duplicates dropped before the sink saw the batch.
    pub duplicates_dropped: usize,
    pub load: LoadSummary,
    pub sink: SinkReport,
}
