//! tidescout — incremental comment harvester for short-video pages.
//!
//! Drives a real Chromium-family browser over CDP: opens a video page,
//! scrolls the comment feed until the target is rendered, extracts and
//! deduplicates the records, and hands the batch to a sink (CSV, JSON, or
//! SQLite). A background monitor watches for the verification interstitial
//! and pauses the whole pipeline until a human solves it.
//!
//! Layering, bottom up:
//! * [`browser`] — session lifecycle, locator catalog, and the [`browser::dom::DomAccess`]
//!   facade everything above talks through.
//! * [`harvest`] — the scroll loop, the challenge monitor, extraction,
//!   dedup, and the avatar cache, orchestrated by [`HarvestRunner`].
//! * [`sink`] — where finished batches go.

pub mod browser;
pub mod core;
pub mod harvest;
pub mod sink;
pub mod util;

pub use crate::core::config::{load_file_config, HarvestConfig};
pub use crate::core::types::{
    Comment, HarvestReport, LoadSummary, SinkReport, StopReason, VideoInfo,
};
pub use crate::harvest::{HarvestOptions, HarvestOutcome, HarvestRunner, ProgressFn};
pub use crate::sink::{CommentSink, SinkError};
