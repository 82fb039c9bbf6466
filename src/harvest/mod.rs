//! Harvest pipeline: one video URL in, a deduplicated comment batch out.
//!
//! Stage order per run: launch browser → open feed → spawn challenge
//! monitor → drive the scroll loop → extract → dedup → resolve avatars →
//! teardown. The monitor is always stopped before the browser session is
//! closed; it polls the live page and must not outlive it.

pub mod avatar;
pub mod challenge;
pub mod dedup;
pub mod extract;
pub mod loader;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::browser::dom::{CdpDom, DomAccess};
use crate::browser::{navigate, BrowserSession};
use crate::core::config::{self, HarvestConfig};
use crate::core::types::{Comment, HarvestReport, LoadSummary, SinkReport, VideoInfo};
use avatar::AvatarCache;
use challenge::{ChallengeCallback, ChallengeMonitor, MonitorOptions};

/// Progress observer: percentage plus a human-readable stage message.
pub type ProgressFn = Arc<dyn Fn(u8, &str) + Send + Sync>;

/// Everything a harvest run needs besides the URL.
pub struct HarvestOptions {
    pub config: HarvestConfig,
    /// Headed is the production default — challenge resolution needs a
    /// window a human can reach.
    pub headless: bool,
    /// Budget for the page and the feed container to appear.
    pub nav_timeout: Duration,
    /// Download commenter avatars into the local cache.
    pub fetch_avatars: bool,
    pub progress: Option<ProgressFn>,
    /// Fired once per challenge detection episode.
    pub on_challenge: Option<ChallengeCallback>,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            config: HarvestConfig::default(),
            headless: false,
            nav_timeout: Duration::from_secs(30),
            fetch_avatars: true,
            progress: None,
            on_challenge: None,
        }
    }
}

/// Result of a completed harvest, before any sink has seen it.
pub struct HarvestOutcome {
    pub video: VideoInfo,
    /// Deduplicated, feed-ordered batch.
    pub comments: Vec<Comment>,
    pub load: LoadSummary,
    pub duplicates_dropped: usize,
}

impl HarvestOutcome {
    /// Final report once a sink has accepted (or skipped) the batch.
    pub fn report(&self, sink: SinkReport) -> HarvestReport {
        let replies = self.comments.iter().filter(|c| c.is_reply).count();
        HarvestReport {
            video: self.video.clone(),
            total_comments: self.comments.len(),
            top_level: self.comments.len() - replies,
            replies,
            duplicates_dropped: self.duplicates_dropped,
            load: self.load.clone(),
            sink,
        }
    }
}

pub struct HarvestRunner {
    opts: HarvestOptions,
}

impl HarvestRunner {
    pub fn new(opts: HarvestOptions) -> Self {
        Self { opts }
    }

    fn progress(&self, pct: u8, msg: &str) {
        if let Some(p) = &self.opts.progress {
            p(pct, msg);
        }
    }

    /// Run the full pipeline against `video_url`.
    ///
    /// Session-level failures (no browser, navigation dead, feed never
    /// appeared) propagate; element-level trouble degrades inside the
    /// extraction layer instead.
    pub async fn run(&self, video_url: &str) -> Result<HarvestOutcome> {
        self.progress(5, "launching browser");
        let session = BrowserSession::launch(self.opts.headless).await?;

        let result = self.run_on_session(&session, video_url).await;
        session.close().await;
        result
    }

    async fn run_on_session(
        &self,
        session: &BrowserSession,
        video_url: &str,
    ) -> Result<HarvestOutcome> {
        let cfg = &self.opts.config;

        let page = session.new_page().await?;
        let dom: Arc<CdpDom> = Arc::new(CdpDom::new(page.clone()));

        self.progress(10, "opening comment feed");
        navigate::open_feed(&page, &dom, video_url, self.opts.nav_timeout).await?;
        let video = navigate::video_info(dom.as_ref(), video_url).await;
        info!(video_id = %video.video_id, "harvest started");

        let monitor = ChallengeMonitor::spawn(
            dom.clone() as Arc<dyn DomAccess>,
            self.opts.on_challenge.clone(),
            MonitorOptions::default(),
        );

        let growth_progress = self.opts.progress.clone();
        let max_comments = cfg.max_comments.max(1);
        let unlimited = cfg.unlimited;
        let on_growth = move |rendered: usize| {
            if let Some(p) = &growth_progress {
                let pct = if unlimited {
                    50
                } else {
                    (20 + rendered * 60 / max_comments).min(80) as u8
                };
                p(pct, &format!("{rendered} comments rendered"));
            }
        };

        let load = loader::load_feed(
            dom.as_ref(),
            Some(monitor.subscribe()),
            cfg,
            Some(&on_growth),
        )
        .await;
        info!(rendered = load.rendered, rounds = load.rounds, stop = ?load.stop, "feed loading finished");

        self.progress(80, "extracting comments");
        let raw = extract::extract_comments(dom.as_ref(), cfg).await;

        self.progress(90, "deduplicating");
        let (mut comments, duplicates_dropped) = dedup::dedup_comments(raw);

        if self.opts.fetch_avatars && !comments.is_empty() {
            match AvatarCache::new(config::avatar_cache_dir()) {
                Ok(cache) => cache.resolve(&mut comments).await,
                Err(e) => warn!("avatar cache unavailable, skipping downloads: {}", e),
            }
        }

        // Monitor first, session after — never the other way around.
        monitor.stop().await;

        self.progress(100, "harvest complete");
        info!(
            total = comments.len(),
            duplicates_dropped, "harvest complete"
        );

        Ok(HarvestOutcome {
            video,
            comments,
            load,
            duplicates_dropped,
        })
    }
}
