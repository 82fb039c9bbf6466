//! Feed navigation: get from a video URL to a page whose comment feed
//! container is guaranteed present.

use anyhow::{anyhow, bail, Result};
use chromiumoxide::Page;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::browser::dom::{CdpDom, DomAccess};
use crate::browser::selectors;
use crate::core::types::VideoInfo;
use crate::util;

/// Poll until `locator` has at least one match, or `timeout` elapses.
pub async fn wait_for(dom: &dyn DomAccess, locator: &selectors::Locator, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if dom.find_one(None, locator).await.is_some() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

/// Navigate to `video_url` and open the comment panel.
///
/// On `Ok(())` the feed container is present in the DOM — the loader and
/// extractor rely on that guarantee. Navigation failures are session-level
/// and propagate.
pub async fn open_feed(page: &Page, dom: &CdpDom, video_url: &str, timeout: Duration) -> Result<()> {
    if !util::is_video_url(video_url) {
        bail!("not a video URL: {}", video_url);
    }

    info!("Opening video page: {}", video_url);
    page.goto(video_url)
        .await
        .map_err(|e| anyhow!("navigation to {} failed: {}", video_url, e))?;

    if !wait_for(dom, &selectors::VIDEO_ELEMENT, timeout).await {
        bail!("video element never appeared on {}", video_url);
    }
    // Let the surrounding chrome settle before poking at it.
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Some layouts render the feed immediately; others need the icon click.
    if dom.find_one(None, &selectors::FEED_CONTAINER).await.is_none() {
        if let Some(icon) = dom.find_one(None, &selectors::COMMENT_ICON).await {
            dom.click(&icon).await;
            info!("Clicked comment icon");
        }
    }

    if !wait_for(dom, &selectors::FEED_CONTAINER, timeout).await {
        bail!("comment feed container never appeared on {}", video_url);
    }

    info!("Comment feed is open");
    Ok(())
}

/// Best-effort metadata scrape for the current video page.
///
/// Every missing field degrades to its empty default; this never fails once
/// the page itself is open.
pub async fn video_info(dom: &dyn DomAccess, video_url: &str) -> VideoInfo {
    let video_id = util::video_id_from_url(video_url).unwrap_or_default();
    if video_id.is_empty() {
        warn!("could not derive a video id from {}", video_url);
    }
    let mut info = VideoInfo::from_url(video_id, video_url);

    if let Some(node) = dom.find_one(None, &selectors::VIDEO_AUTHOR).await {
        if let Some(t) = dom.text_of(&node).await {
            info.author = t;
        }
    }
    if info.author.is_empty() {
        if let Some(handle) = util::username_from_url(video_url) {
            info.author = handle;
        }
    }

    if let Some(node) = dom.find_one(None, &selectors::VIDEO_DESCRIPTION).await {
        if let Some(t) = dom.text_of(&node).await {
            info.description = t;
        }
    }

    for tag in dom.find_many(None, &selectors::VIDEO_TAGS).await {
        if let Some(t) = dom.text_of(&tag).await {
            let t = t.trim_start_matches('#').to_string();
            if !t.is_empty() {
                info.tags.push(t);
            }
        }
    }

    info
}
