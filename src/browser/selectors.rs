//! Locator catalog: semantic field name → DOM query descriptor.
//!
//! The host page ships hashed class names with stable fragments
//! (`DivCommentItemWrapper` etc.) and `data-e2e` hooks; both survive
//! re-renders, neither survives a redesign. Keeping every selector here means
//! a markup change is a one-file fix.

/// A declarative element query: CSS selector plus a label for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    pub name: &'static str,
    pub css: &'static str,
}

impl Locator {
    pub const fn new(name: &'static str, css: &'static str) -> Self {
        Self { name, css }
    }
}

/// Scrollable container holding the whole comment feed.
pub const FEED_CONTAINER: Locator =
    Locator::new("feed_container", "div[class*='DivCommentListContainer']");

/// Icon that opens the comment panel on a video page.
pub const COMMENT_ICON: Locator = Locator::new("comment_icon", "span[data-e2e='comment-icon']");

/// One top-level comment container (also matches reply items when scoped
/// under `REPLY_CONTAINER`).
pub const COMMENT_ITEM: Locator =
    Locator::new("comment_item", "div[class*='DivCommentItemWrapper']");

/// Display name of a top-level commenter.
pub const AUTHOR: Locator = Locator::new("author", "div[data-e2e='comment-username-1'] p");

/// Body text of a top-level comment.
pub const TEXT: Locator = Locator::new("text", "span[data-e2e='comment-level-1'] p");

/// Like counter next to a comment.
pub const LIKE_COUNT: Locator = Locator::new("like_count", "div[class*='DivLikeContainer'] span");

/// Relative timestamp ("2d ago").
pub const POSTED_AT: Locator = Locator::new(
    "posted_at",
    "div[class*='DivCommentSubContentWrapper'] span:first-child",
);

/// "View N replies" affordance under a comment.
pub const VIEW_REPLIES: Locator =
    Locator::new("view_replies", "div[class*='DivViewRepliesContainer']");

/// Label inside the view-replies affordance carrying the localized count.
pub const VIEW_REPLIES_LABEL: Locator = Locator::new(
    "view_replies_label",
    "div[class*='DivViewRepliesContainer'] span",
);

/// Wrapper around the expanded reply thread of one comment.
pub const REPLY_CONTAINER: Locator =
    Locator::new("reply_container", "div[class*='DivReplyContainer']");

/// One rendered reply inside an expanded thread.
pub const REPLY_ITEM: Locator = Locator::new(
    "reply_item",
    "div[class*='DivReplyContainer'] div[class*='DivCommentItemWrapper']",
);

/// Display name of a reply author.
pub const REPLY_AUTHOR: Locator =
    Locator::new("reply_author", "div[data-e2e='comment-username-2'] p");

/// Body text of a reply.
pub const REPLY_TEXT: Locator = Locator::new("reply_text", "span[data-e2e='comment-level-2'] p");

/// Commenter avatar image.
pub const AVATAR_IMG: Locator = Locator::new("avatar_img", "img[class*='ImgAvatar'], span[class*='SpanAvatarContainer'] img");

/// Blocking verification interstitial (slider CAPTCHA).
pub const CHALLENGE_CONTAINER: Locator = Locator::new(
    "challenge_container",
    "#captcha-verify-container-main-page, div[class*='captcha_container']",
);

/// `<video>` element proving the target page loaded.
pub const VIDEO_ELEMENT: Locator = Locator::new("video_element", "video");

/// Creator handle on the video page.
pub const VIDEO_AUTHOR: Locator =
    Locator::new("video_author", "div[class*='DivCreatorInfoContainer'] a");

/// Video caption/description block.
pub const VIDEO_DESCRIPTION: Locator = Locator::new(
    "video_description",
    "div[class*='DivDescriptionContentContainer']",
);

/// Hashtag anchors in the caption.
pub const VIDEO_TAGS: Locator = Locator::new("video_tags", "a[href*='/tag/']");
