//! DOM access facade.
//!
//! Everything above the browser layer talks to the page through [`DomAccess`]:
//! the feed loader, the record extractor, and the challenge monitor. The
//! contract is uniform — an absent element is `None`/empty, a failed CDP call
//! is an absent element, and no query ever surfaces an error to the caller.
//!
//! A [`NodeRef`] is an opaque *query path*, not a pinned node handle. The
//! feed re-renders continuously while we scroll, so holding live node ids
//! would dangle within a round; instead every operation re-resolves the
//! `(selector, index)` chain against the current DOM.

use async_trait::async_trait;
use chromiumoxide::Page;
use tracing::debug;

use crate::browser::selectors::Locator;

/// One hop in a query path: the `index`-th match of `css` under the previous
/// hop (or under the document root for the first hop).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub css: String,
    pub index: usize,
}

/// Opaque re-resolvable element reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeRef {
    steps: Vec<Step>,
}

impl NodeRef {
    pub fn child(&self, locator: &Locator, index: usize) -> NodeRef {
        let mut steps = self.steps.clone();
        steps.push(Step {
            css: locator.css.to_string(),
            index,
        });
        NodeRef { steps }
    }

    pub fn root(locator: &Locator, index: usize) -> NodeRef {
        NodeRef::default().child(locator, index)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, s) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, " > ")?;
            }
            write!(f, "{}[{}]", s.css, s.index)?;
        }
        Ok(())
    }
}

/// Read/interact surface over the live page.
///
/// Reads are safe to interleave from concurrent tasks; only one logical
/// driver may issue mutations (`click`, scrolls) at a time.
#[async_trait]
pub trait DomAccess: Send + Sync {
    /// First match of `locator` under `scope` (document root when `None`).
    async fn find_one(&self, scope: Option<&NodeRef>, locator: &Locator) -> Option<NodeRef>;

    /// All current matches of `locator` under `scope`, in DOM order.
    async fn find_many(&self, scope: Option<&NodeRef>, locator: &Locator) -> Vec<NodeRef>;

    /// Whether the node exists and is rendered visible.
    async fn is_visible(&self, node: &NodeRef) -> bool;

    /// Trimmed text content; `None` when the node is gone.
    async fn text_of(&self, node: &NodeRef) -> Option<String>;

    /// Attribute value; `None` when node or attribute is absent.
    async fn attribute_of(&self, node: &NodeRef, name: &str) -> Option<String>;

    /// Bring the node into the viewport (triggers lazy loading on some layouts).
    async fn scroll_into_view(&self, node: &NodeRef);

    /// Scroll the first match of `locator` to its own end
    /// (`scrollTop = scrollHeight`).
    async fn scroll_to_end(&self, locator: &Locator);

    /// Synthesize a click on the node. A vanished node is a no-op.
    async fn click(&self, node: &NodeRef);

    /// Number of current matches under `scope`.
    async fn count(&self, scope: Option<&NodeRef>, locator: &Locator) -> usize {
        self.find_many(scope, locator).await.len()
    }
}

// ---------------------------------------------------------------------------
// CDP implementation
// ---------------------------------------------------------------------------

/// [`DomAccess`] over a `chromiumoxide` page.
///
/// Query paths compile to guarded `querySelectorAll` chains evaluated in the
/// page; any CDP error or null resolution degrades to the absent value.
pub struct CdpDom {
    page: Page,
}

impl CdpDom {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// JS string literal with proper escaping (selectors contain quotes).
    fn js_str(s: &str) -> String {
        serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
    }

    /// Build an IIFE that resolves `steps` and evaluates `tail` with `el`
    /// bound to the resolved element.
    fn resolve_script(steps: &[Step], tail: &str) -> String {
        let mut js = String::from("(() => {\n  let el = document;\n");
        for step in steps {
            js.push_str(&format!(
                "  el = el.querySelectorAll({})[{}]; if (!el) return null;\n",
                Self::js_str(&step.css),
                step.index
            ));
        }
        js.push_str("  ");
        js.push_str(tail);
        js.push_str("\n})()");
        js
    }

    /// Evaluate and coerce; every failure path is the absent value.
    async fn eval_json(&self, script: String) -> Option<serde_json::Value> {
        match self.page.evaluate(script).await {
            Ok(v) => v.into_value::<serde_json::Value>().ok(),
            Err(e) => {
                debug!("dom eval failed (treated as absent): {}", e);
                None
            }
        }
    }

    async fn count_under(&self, scope: Option<&NodeRef>, locator: &Locator) -> usize {
        let steps = scope.map(|s| s.steps()).unwrap_or(&[]);
        let tail = format!(
            "return el.querySelectorAll({}).length;",
            Self::js_str(locator.css)
        );
        self.eval_json(Self::resolve_script(steps, &tail))
            .await
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize
    }
}

#[async_trait]
impl DomAccess for CdpDom {
    async fn find_one(&self, scope: Option<&NodeRef>, locator: &Locator) -> Option<NodeRef> {
        if self.count_under(scope, locator).await == 0 {
            return None;
        }
        Some(match scope {
            Some(s) => s.child(locator, 0),
            None => NodeRef::root(locator, 0),
        })
    }

    async fn find_many(&self, scope: Option<&NodeRef>, locator: &Locator) -> Vec<NodeRef> {
        let n = self.count_under(scope, locator).await;
        (0..n)
            .map(|i| match scope {
                Some(s) => s.child(locator, i),
                None => NodeRef::root(locator, i),
            })
            .collect()
    }

    async fn is_visible(&self, node: &NodeRef) -> bool {
        let tail = "const st = window.getComputedStyle(el);\n  \
                    if (st.display === 'none' || st.visibility === 'hidden') return false;\n  \
                    const r = el.getBoundingClientRect();\n  \
                    return r.width > 0 && r.height > 0;";
        self.eval_json(Self::resolve_script(node.steps(), tail))
            .await
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    async fn text_of(&self, node: &NodeRef) -> Option<String> {
        let tail = "return el.textContent;";
        self.eval_json(Self::resolve_script(node.steps(), tail))
            .await
            .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
    }

    async fn attribute_of(&self, node: &NodeRef, name: &str) -> Option<String> {
        let tail = format!("return el.getAttribute({});", Self::js_str(name));
        self.eval_json(Self::resolve_script(node.steps(), &tail))
            .await
            .and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    async fn scroll_into_view(&self, node: &NodeRef) {
        let tail = "el.scrollIntoView(); return true;";
        let _ = self
            .eval_json(Self::resolve_script(node.steps(), tail))
            .await;
    }

    async fn scroll_to_end(&self, locator: &Locator) {
        let steps = [Step {
            css: locator.css.to_string(),
            index: 0,
        }];
        let tail = "el.scrollTop = el.scrollHeight; return true;";
        let _ = self.eval_json(Self::resolve_script(&steps, tail)).await;
    }

    async fn click(&self, node: &NodeRef) {
        let tail = "el.click(); return true;";
        let _ = self
            .eval_json(Self::resolve_script(node.steps(), tail))
            .await;
    }
}
