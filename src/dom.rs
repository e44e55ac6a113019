//! Document capabilities the scanner reads through.
//!
//! The scan never touches a browser directly. It reads the tree, styles and
//! geometry through [`Document`] and asks whole-document selector questions
//! through [`DocumentQuery`], so a captured snapshot or a test fixture can
//! stand in for the live page.

use serde::{Deserialize, Serialize};

/// Handle to an element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Viewport-relative bounding rectangle, as `getBoundingClientRect()` reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// The computed-style properties the scanner consults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: String,
    pub cursor: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".into(),
            visibility: "visible".into(),
            opacity: "1".into(),
            cursor: "auto".into(),
        }
    }
}

/// Layout viewport size and scroll offset at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

/// Read access to a rendered element tree.
///
/// Only elements are exposed; text and comment nodes are not part of the tree.
/// `children` is in document order.
pub trait Document {
    /// The `<body>`, root of every scan. `None` if the page has no render tree yet.
    fn body(&self) -> Option<NodeId>;

    /// Lowercase tag name.
    fn tag_name(&self, node: NodeId) -> &str;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// The element's `type` DOM property, which differs from the attribute
    /// for defaults (`submit` for a bare `<button>`).
    fn type_property(&self, node: NodeId) -> Option<&str>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> &[NodeId];

    fn computed_style(&self, node: NodeId) -> &ComputedStyle;

    fn bounding_rect(&self, node: NodeId) -> Rect;

    /// `(offsetWidth, offsetHeight)` of the rendered box.
    fn offset_size(&self, node: NodeId) -> (f64, f64);

    /// `innerText`, falling back to `textContent`. Untrimmed.
    fn rendered_text(&self, node: NodeId) -> &str;

    fn viewport(&self) -> Viewport;

    fn url(&self) -> &str;

    fn title(&self) -> &str;
}

/// Whole-document selector queries.
///
/// Kept apart from [`Document`] because every answer depends on the entire
/// document, not on one node.
pub trait DocumentQuery {
    /// Number of elements `selector` matches. Unparsable selectors match nothing.
    fn count_matches(&self, selector: &str) -> usize;
}
