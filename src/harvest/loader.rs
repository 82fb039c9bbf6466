//! Feed loader: drives the infinite-scroll feed until enough comment items
//! are rendered, then hands off to the extractor.
//!
//! One round = (pause gate) → measure → stop check → expand a reply batch
//! *or* scroll. Reply expansion renders new items without scrolling, so a
//! round that clicked affordances skips the scroll and re-measures first —
//! otherwise we would scroll past items we just asked for.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::browser::dom::{DomAccess, NodeRef};
use crate::browser::selectors;
use crate::core::config::HarvestConfig;
use crate::core::types::{LoadSummary, StopReason};

/// Invoked whenever the rendered item count grows; drives progress reporting.
pub type GrowthFn = dyn Fn(usize) + Send + Sync;

fn noop_growth(_: usize) {}

/// Settle pause with a little randomness so round timing never forms a
/// perfectly regular signature.
fn jittered(base: Duration) -> Duration {
    let cap = base.as_millis() as u64 / 4;
    if cap == 0 {
        return base;
    }
    base + Duration::from_millis(rand::thread_rng().gen_range(0..=cap))
}

/// Drive the scroll loop to completion.
///
/// `pause_rx` is the challenge monitor's paused flag; while it reads true the
/// loader blocks without touching the page. Time spent paused never counts
/// toward the idle timeout — the idle clock restarts on resume, so a harvest
/// interrupted right before its deadline still gets a full idle window after
/// the human solves the challenge.
///
/// Stop conditions:
/// * bounded mode — rendered count reached `max_comments`;
/// * either mode — `max_attempts` consecutive rounds without growth;
/// * unbounded mode — more than `max_idle` of active (unpaused) time since
///   the last growth.
pub async fn load_feed(
    dom: &dyn DomAccess,
    mut pause_rx: Option<watch::Receiver<bool>>,
    cfg: &HarvestConfig,
    on_growth: Option<&GrowthFn>,
) -> LoadSummary {
    let on_growth = on_growth.unwrap_or(&noop_growth);
    let mut rounds: u32 = 0;
    let mut last_count: usize = 0;
    let mut no_growth: u32 = 0;
    let mut idle_since = Instant::now();

    let stop = loop {
        if let Some(rx) = pause_rx.as_mut() {
            if *rx.borrow() {
                info!("Feed loading paused while a challenge is up");
                while *rx.borrow() {
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("Feed loading resumed");
                idle_since = Instant::now();
            }
        }

        rounds += 1;
        let rendered = dom.count(None, &selectors::COMMENT_ITEM).await;

        if !cfg.unlimited && rendered >= cfg.max_comments {
            info!(rendered, target = cfg.max_comments, "target reached");
            break StopReason::TargetReached;
        }

        if rendered > last_count {
            debug!(rendered, rounds, "feed grew");
            last_count = rendered;
            no_growth = 0;
            idle_since = Instant::now();
            on_growth(rendered);
        } else {
            no_growth += 1;
        }

        if cfg.unlimited && idle_since.elapsed() >= cfg.max_idle {
            info!(rendered, "no growth within the idle window");
            break StopReason::IdleTimeout;
        }
        if no_growth >= cfg.max_attempts {
            info!(rendered, attempts = no_growth, "feed stalled");
            break StopReason::Stalled;
        }

        if cfg.include_replies {
            let affordances = dom.find_many(None, &selectors::VIEW_REPLIES).await;
            if !affordances.is_empty() {
                let batch = affordances.len().min(cfg.reply_batch_per_round);
                debug!(batch, "expanding reply threads");
                for node in affordances.iter().take(batch) {
                    dom.scroll_into_view(node).await;
                    dom.click(node).await;
                }
                tokio::time::sleep(cfg.reply_settle).await;
                // Re-measure before the next scroll. Only the growth the
                // expansion actually produced resets the stall budget — a
                // click the page ignored must still exhaust it.
                continue;
            }
        }

        // Nudge the last rendered item into the viewport first; some layouts
        // only fetch the next page once it has been on screen.
        if rendered > 0 {
            let last = NodeRef::root(&selectors::COMMENT_ITEM, rendered - 1);
            dom.scroll_into_view(&last).await;
        }
        dom.scroll_to_end(&selectors::FEED_CONTAINER).await;
        tokio::time::sleep(jittered(cfg.scroll_pause)).await;
    };

    // Re-measure once after the loop so the summary reflects items a final
    // settle may have added.
    let rendered = dom.count(None, &selectors::COMMENT_ITEM).await.max(last_count);
    LoadSummary {
        rendered,
        rounds,
        stop,
    }
}
