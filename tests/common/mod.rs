//! Simulated comment feed for driving the harvest pipeline without a
//! browser.
//!
//! `FakeFeed` implements `DomAccess` over an in-memory model: comments
//! arrive in batches (one batch revealed per scroll-to-end), reply threads
//! stay hidden until their affordance is clicked, and the challenge
//! interstitial can be toggled from the test body. Query-path resolution
//! mirrors the real facade — selectors are matched by their CSS string, and
//! a path that no longer resolves is simply absent.

use std::sync::Mutex;

use async_trait::async_trait;

use tidescout::browser::dom::{DomAccess, NodeRef};
use tidescout::browser::selectors::{self, Locator};

#[derive(Debug, Clone, Default)]
pub struct FakeReply {
    pub author: Option<String>,
    pub text: Option<String>,
    pub likes: Option<String>,
    pub posted: Option<String>,
    pub avatar: Option<String>,
}

impl FakeReply {
    pub fn new(author: &str, text: &str) -> Self {
        Self {
            author: Some(author.to_string()),
            text: Some(text.to_string()),
            likes: Some("1".to_string()),
            posted: Some("1h ago".to_string()),
            avatar: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeComment {
    pub author: Option<String>,
    pub text: Option<String>,
    pub likes: Option<String>,
    pub posted: Option<String>,
    pub avatar: Option<String>,
    pub reply_label: Option<String>,
    pub replies: Vec<FakeReply>,
    pub expanded: bool,
}

impl FakeComment {
    pub fn new(author: &str, text: &str) -> Self {
        Self {
            author: Some(author.to_string()),
            text: Some(text.to_string()),
            likes: Some("5".to_string()),
            posted: Some("2d ago".to_string()),
            ..Default::default()
        }
    }

    pub fn no_author(mut self) -> Self {
        self.author = None;
        self
    }

    pub fn no_text(mut self) -> Self {
        self.text = None;
        self
    }

    pub fn likes(mut self, raw: &str) -> Self {
        self.likes = Some(raw.to_string());
        self
    }

    pub fn avatar(mut self, url: &str) -> Self {
        self.avatar = Some(url.to_string());
        self
    }

    pub fn replies(mut self, label: &str, replies: Vec<FakeReply>) -> Self {
        self.reply_label = Some(label.to_string());
        self.replies = replies;
        self
    }

    /// Render the reply thread already open, as if its affordance had been
    /// clicked before the test started.
    pub fn expanded(mut self) -> Self {
        self.expanded = true;
        self
    }
}

struct FeedState {
    batches: Vec<Vec<FakeComment>>,
    revealed: usize,
    challenge_visible: bool,
    scrolls: usize,
    /// Affordances stay rendered but clicks do nothing, like a page that
    /// silently drops synthetic events.
    affordances_inert: bool,
}

impl FeedState {
    fn comments(&self) -> impl Iterator<Item = &FakeComment> {
        self.batches.iter().take(self.revealed).flatten()
    }

    /// Rendered comment-item wrappers in document order: each top-level
    /// wrapper followed by its expanded replies.
    fn flattened(&self) -> Vec<Elem> {
        let mut out = Vec::new();
        for (ci, c) in self.comments().enumerate() {
            out.push(Elem::Top(ci));
            if c.expanded {
                for ri in 0..c.replies.len() {
                    out.push(Elem::Reply(ci, ri));
                }
            }
        }
        out
    }

    /// Comments whose reply affordance is currently rendered.
    fn affordances(&self) -> Vec<usize> {
        self.comments()
            .enumerate()
            .filter(|(_, c)| !c.expanded && !c.replies.is_empty())
            .map(|(ci, _)| ci)
            .collect()
    }

    fn comment(&self, ci: usize) -> Option<&FakeComment> {
        self.comments().nth(ci)
    }
}

/// A resolved element in the simulated page.
#[derive(Debug, Clone)]
enum Elem {
    Top(usize),
    Reply(usize, usize),
    Affordance(usize),
    Challenge,
    Field {
        text: Option<String>,
        src: Option<String>,
    },
}

pub struct FakeFeed {
    state: Mutex<FeedState>,
}

impl FakeFeed {
    /// First batch is rendered immediately; each scroll-to-end reveals one
    /// more.
    pub fn new(batches: Vec<Vec<FakeComment>>) -> Self {
        Self {
            state: Mutex::new(FeedState {
                batches,
                revealed: 1,
                challenge_visible: false,
                scrolls: 0,
                affordances_inert: false,
            }),
        }
    }

    pub fn set_challenge(&self, visible: bool) {
        self.state.lock().unwrap().challenge_visible = visible;
    }

    pub fn set_affordances_inert(&self, inert: bool) {
        self.state.lock().unwrap().affordances_inert = inert;
    }

    pub fn scroll_count(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    fn text_field(value: &Option<String>) -> Option<Elem> {
        value.as_ref().map(|t| Elem::Field {
            text: Some(t.clone()),
            src: None,
        })
    }

    fn src_field(value: &Option<String>) -> Option<Elem> {
        value.as_ref().map(|u| Elem::Field {
            text: None,
            src: Some(u.clone()),
        })
    }

    fn resolve_root(state: &FeedState, css: &str, index: usize) -> Option<Elem> {
        if css == selectors::COMMENT_ITEM.css {
            return state.flattened().get(index).cloned();
        }
        if css == selectors::VIEW_REPLIES.css {
            return state.affordances().get(index).map(|ci| Elem::Affordance(*ci));
        }
        if css == selectors::CHALLENGE_CONTAINER.css {
            return state.challenge_visible.then_some(Elem::Challenge);
        }
        None
    }

    fn resolve_scoped(state: &FeedState, parent: &Elem, css: &str, index: usize) -> Option<Elem> {
        match parent {
            Elem::Top(ci) => {
                let c = state.comment(*ci)?;
                if css == selectors::AUTHOR.css {
                    Self::text_field(&c.author)
                } else if css == selectors::TEXT.css {
                    Self::text_field(&c.text)
                } else if css == selectors::LIKE_COUNT.css {
                    Self::text_field(&c.likes)
                } else if css == selectors::POSTED_AT.css {
                    Self::text_field(&c.posted)
                } else if css == selectors::AVATAR_IMG.css {
                    Self::src_field(&c.avatar)
                } else if css == selectors::VIEW_REPLIES_LABEL.css {
                    if c.expanded {
                        None
                    } else {
                        Self::text_field(&c.reply_label)
                    }
                } else if css == selectors::REPLY_ITEM.css {
                    (c.expanded && index < c.replies.len()).then_some(Elem::Reply(*ci, index))
                } else if css == selectors::REPLY_AUTHOR.css {
                    // Nested reply structure is reachable from the parent
                    // wrapper, exactly like the live page.
                    if c.expanded {
                        c.replies.first().and_then(|r| Self::text_field(&r.author))
                    } else {
                        None
                    }
                } else {
                    None
                }
            }
            Elem::Reply(ci, ri) => {
                let r = state.comment(*ci)?.replies.get(*ri)?;
                if css == selectors::REPLY_AUTHOR.css {
                    Self::text_field(&r.author)
                } else if css == selectors::REPLY_TEXT.css {
                    Self::text_field(&r.text)
                } else if css == selectors::LIKE_COUNT.css {
                    Self::text_field(&r.likes)
                } else if css == selectors::POSTED_AT.css {
                    Self::text_field(&r.posted)
                } else if css == selectors::AVATAR_IMG.css {
                    Self::src_field(&r.avatar)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn resolve(&self, node: &NodeRef) -> Option<Elem> {
        let state = self.state.lock().unwrap();
        let mut current: Option<Elem> = None;
        for step in node.steps() {
            current = match &current {
                None => Self::resolve_root(&state, &step.css, step.index),
                Some(parent) => Self::resolve_scoped(&state, parent, &step.css, step.index),
            };
            current.as_ref()?;
        }
        current
    }

    fn count_at(&self, scope: Option<&NodeRef>, locator: &Locator) -> usize {
        let state = self.state.lock().unwrap();
        match scope {
            None => {
                if locator.css == selectors::COMMENT_ITEM.css {
                    state.flattened().len()
                } else if locator.css == selectors::VIEW_REPLIES.css {
                    state.affordances().len()
                } else if locator.css == selectors::CHALLENGE_CONTAINER.css {
                    usize::from(state.challenge_visible)
                } else {
                    0
                }
            }
            Some(parent) => {
                drop(state);
                let Some(elem) = self.resolve(parent) else {
                    return 0;
                };
                let state = self.state.lock().unwrap();
                if let (Elem::Top(ci), true) = (&elem, locator.css == selectors::REPLY_ITEM.css) {
                    state
                        .comment(*ci)
                        .filter(|c| c.expanded)
                        .map(|c| c.replies.len())
                        .unwrap_or(0)
                } else {
                    usize::from(Self::resolve_scoped(&state, &elem, locator.css, 0).is_some())
                }
            }
        }
    }
}

#[async_trait]
impl DomAccess for FakeFeed {
    async fn find_one(&self, scope: Option<&NodeRef>, locator: &Locator) -> Option<NodeRef> {
        (self.count_at(scope, locator) > 0).then(|| match scope {
            Some(s) => s.child(locator, 0),
            None => NodeRef::root(locator, 0),
        })
    }

    async fn find_many(&self, scope: Option<&NodeRef>, locator: &Locator) -> Vec<NodeRef> {
        let n = self.count_at(scope, locator);
        (0..n)
            .map(|i| match scope {
                Some(s) => s.child(locator, i),
                None => NodeRef::root(locator, i),
            })
            .collect()
    }

    async fn is_visible(&self, node: &NodeRef) -> bool {
        self.resolve(node).is_some()
    }

    async fn text_of(&self, node: &NodeRef) -> Option<String> {
        match self.resolve(node)? {
            Elem::Field { text, .. } => text,
            _ => None,
        }
    }

    async fn attribute_of(&self, node: &NodeRef, name: &str) -> Option<String> {
        match self.resolve(node)? {
            Elem::Field { src, .. } if name == "src" => src,
            _ => None,
        }
    }

    async fn scroll_into_view(&self, _node: &NodeRef) {}

    async fn scroll_to_end(&self, locator: &Locator) {
        if locator.css != selectors::FEED_CONTAINER.css {
            return;
        }
        let mut state = self.state.lock().unwrap();
        state.scrolls += 1;
        if state.revealed < state.batches.len() {
            state.revealed += 1;
        }
    }

    async fn click(&self, node: &NodeRef) {
        let Some(Elem::Affordance(ci)) = self.resolve(node) else {
            return;
        };
        let mut state = self.state.lock().unwrap();
        if state.affordances_inert {
            return;
        }
        let revealed = state.revealed;
        let target = state.batches.iter_mut().take(revealed).flatten().nth(ci);
        if let Some(c) = target {
            c.expanded = true;
        }
    }
}
