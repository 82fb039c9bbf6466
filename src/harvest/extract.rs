//! Record extraction: walk the rendered feed and turn comment containers
//! into [`Comment`] values.
//!
//! Extraction is strictly best-effort per field. A missing author degrades to
//! the `Unknown` sentinel, a missing body to the empty string, a missing
//! counter to 0 — one half-rendered container must never abort a harvest
//! that already has hundreds of good records on the page.

use chrono::Utc;
use tracing::{debug, warn};

use crate::browser::dom::{DomAccess, NodeRef};
use crate::browser::selectors;
use crate::core::config::HarvestConfig;
use crate::core::types::{AvatarRef, Comment, UNKNOWN_AUTHOR, UNKNOWN_TIME};
use crate::util;

const PARENT_PREVIEW_CHARS: usize = 80;

async fn text_or<'a>(
    dom: &dyn DomAccess,
    scope: &NodeRef,
    locator: &selectors::Locator,
    default: &'a str,
) -> String {
    match dom.find_one(Some(scope), locator).await {
        Some(node) => dom
            .text_of(&node)
            .await
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| default.to_string()),
        None => default.to_string(),
    }
}

async fn avatar_of(dom: &dyn DomAccess, scope: &NodeRef) -> AvatarRef {
    let url = match dom.find_one(Some(scope), &selectors::AVATAR_IMG).await {
        Some(img) => dom.attribute_of(&img, "src").await.filter(|u| !u.is_empty()),
        None => None,
    };
    AvatarRef {
        url,
        local_path: None,
    }
}

/// Whether this comment-item wrapper is a reply rendered inside an expanded
/// thread. Reply wrappers carry level-2 structure and none of the level-1
/// structure; the top-level pass skips them and harvests them through their
/// parent's scope instead. A top-level container with *some* level-1 field
/// rendered (author or body) is never a reply, however degenerate — its
/// missing fields degrade to defaults rather than dropping the record.
async fn is_reply_wrapper(dom: &dyn DomAccess, item: &NodeRef) -> bool {
    dom.find_one(Some(item), &selectors::AUTHOR).await.is_none()
        && dom.find_one(Some(item), &selectors::TEXT).await.is_none()
        && dom
            .find_one(Some(item), &selectors::REPLY_AUTHOR)
            .await
            .is_some()
}

async fn extract_reply(dom: &dyn DomAccess, node: &NodeRef, parent: &Comment) -> Comment {
    let author = text_or(dom, node, &selectors::REPLY_AUTHOR, UNKNOWN_AUTHOR).await;
    let text = text_or(dom, node, &selectors::REPLY_TEXT, "").await;
    let like_count = util::parse_count(&text_or(dom, node, &selectors::LIKE_COUNT, "").await);
    let posted_at = text_or(dom, node, &selectors::POSTED_AT, UNKNOWN_TIME).await;

    Comment {
        author,
        text,
        like_count,
        posted_at,
        reply_count: 0,
        is_reply: true,
        parent_author: Some(parent.author.clone()),
        parent_preview: Some(util::preview_of(&parent.text, PARENT_PREVIEW_CHARS)),
        avatar: avatar_of(dom, node).await,
        captured_at: Utc::now(),
    }
}

/// Harvest every currently rendered comment, top-level and (when enabled)
/// replies, in feed order.
///
/// In bounded mode at most `max_comments` records come back; records dropped
/// by `skip_unknown_author` do not count against the cap. The feed is read
/// as-is — the loader is responsible for having rendered enough of it.
pub async fn extract_comments(dom: &dyn DomAccess, cfg: &HarvestConfig) -> Vec<Comment> {
    let items = dom.find_many(None, &selectors::COMMENT_ITEM).await;
    debug!(containers = items.len(), "extracting rendered comments");

    let mut out: Vec<Comment> = Vec::new();
    let mut skipped_unknown = 0usize;
    let cap = if cfg.unlimited {
        usize::MAX
    } else {
        cfg.max_comments
    };

    'items: for item in &items {
        if out.len() >= cap {
            break;
        }
        if is_reply_wrapper(dom, item).await {
            continue;
        }

        let author = text_or(dom, item, &selectors::AUTHOR, UNKNOWN_AUTHOR).await;
        let text = text_or(dom, item, &selectors::TEXT, "").await;
        let like_count = util::parse_count(&text_or(dom, item, &selectors::LIKE_COUNT, "").await);
        let posted_at = text_or(dom, item, &selectors::POSTED_AT, UNKNOWN_TIME).await;

        let replies = if cfg.include_replies {
            dom.find_many(Some(item), &selectors::REPLY_ITEM).await
        } else {
            Vec::new()
        };

        // The affordance label ("View 12 replies") knows the true thread
        // size; the rendered count is only a floor.
        let labeled = util::parse_reply_label(
            &text_or(dom, item, &selectors::VIEW_REPLIES_LABEL, "").await,
        );
        let reply_count = labeled.max(replies.len() as u64);

        let parent = Comment {
            author,
            text,
            like_count,
            posted_at,
            reply_count,
            is_reply: false,
            parent_author: None,
            parent_preview: None,
            avatar: avatar_of(dom, item).await,
            captured_at: Utc::now(),
        };

        if parent.is_unknown_author() && cfg.skip_unknown_author {
            skipped_unknown += 1;
        } else {
            out.push(parent.clone());
        }

        for node in &replies {
            if out.len() >= cap {
                break 'items;
            }
            let reply = extract_reply(dom, node, &parent).await;
            if reply.is_unknown_author() && cfg.skip_unknown_author {
                skipped_unknown += 1;
                continue;
            }
            out.push(reply);
        }
    }

    if skipped_unknown > 0 {
        warn!(skipped_unknown, "dropped records with no rendered author");
    }
    debug!(records = out.len(), "extraction complete");
    out
}
