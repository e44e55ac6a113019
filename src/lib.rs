//! # eoka-scan
//!
//! Interactive element discovery for browser agents. Walks the rendered page,
//! keeps what a user could click or type into right now, and hands back a flat,
//! serialisable list with two locators per element.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eoka_scan::Session;
//!
//! # #[tokio::main]
//! # async fn main() -> eoka_scan::Result<()> {
//! let mut session = Session::launch().await?;
//! session.goto("https://example.com").await?;
//!
//! // Scan with numbered overlays drawn on the page
//! let report = session.scan(true).await?;
//! println!("{}", report.element_list());
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! The scan itself is synchronous and browser-free: it runs over any
//! [`Document`] (a captured [`DomSnapshot`] in practice), so it can be driven
//! from fixtures.

pub mod annotate;
pub mod capture;
pub mod classify;
pub mod dom;
pub mod geometry;
pub mod locator;
pub mod query;
pub mod scan;
pub mod session;
pub mod snapshot;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use annotate::{AnnotationLayer, Mark, Overlay};
pub use dom::{ComputedStyle, Document, DocumentQuery, NodeId, Rect, Viewport};
pub use scan::scan;
pub use session::{LaunchOptions, LocatorCheck, Session};
pub use snapshot::{DomSnapshot, SnapshotBuilder};

// Re-export eoka types that users need
pub use eoka::{Browser, Page, StealthConfig};

/// Result type for eoka-scan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a scan. Everything else degrades instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("document unavailable: {0}")]
    DomUnavailable(String),

    #[error("locator unresolvable: {0}")]
    LocatorUnresolvable(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("snapshot parse error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("no element with index {0} in the last scan")]
    UnknownIndex(usize),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fixed attribute projection carried by every descriptor.
/// Missing attributes are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub id: String,
    pub class: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
    #[serde(rename = "aria-label")]
    pub aria_label: String,
}

/// Viewport-relative top-left corner at scan time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

/// One actionable element found by a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    /// Lowercase tag name
    pub tag_name: String,
    /// Structural path rooted at `/body`, e.g. `/body/div[2]/a[1]`
    pub xpath: String,
    /// Shortest selector found to be unique, or the best effort if none was
    #[serde(rename = "css_selector")]
    pub selector: String,
    pub attributes: Attributes,
    /// Traversal-order index; also the overlay label
    #[serde(rename = "highlight_index")]
    pub index: usize,
    pub coordinates: Coordinates,
    /// Rendered text, trimmed
    pub text: String,
    pub is_visible: bool,
    pub is_in_viewport: bool,
}

impl fmt::Display for ElementDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] <{}", self.index, self.tag_name)?;
        if !self.attributes.kind.is_empty() && self.attributes.kind != "text" {
            write!(f, " type=\"{}\"", self.attributes.kind)?;
        }
        f.write_str(">")?;
        let label = if self.text.is_empty() {
            &self.attributes.aria_label
        } else {
            &self.text
        };
        if !label.is_empty() {
            let short: String = label.split_whitespace().collect::<Vec<_>>().join(" ");
            if short.chars().count() > 60 {
                let cut: String = short.chars().take(57).collect();
                write!(f, " \"{}...\"", cut)?;
            } else {
                write!(f, " \"{}\"", short)?;
            }
        }
        let role = &self.attributes.role;
        if !role.is_empty() {
            let redundant = (role == "button" && self.tag_name == "button")
                || (role == "link" && self.tag_name == "a");
            if !redundant {
                write!(f, " role=\"{}\"", role)?;
            }
        }
        write!(f, " {}", self.selector)
    }
}

/// A tab entry. Always just the scanned document for now.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub url: String,
    pub title: String,
}

/// Everything one scan produced. Plain data, safe to ship across a process boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub current_url: String,
    pub available_tabs: Vec<TabInfo>,
    pub interactive_elements: Vec<ElementDescriptor>,
}

impl ScanReport {
    /// Compact text list for LLM consumption, one element per line.
    pub fn element_list(&self) -> String {
        let mut out = String::with_capacity(self.interactive_elements.len() * 48);
        for el in &self.interactive_elements {
            out.push_str(&el.to_string());
            out.push('\n');
        }
        out
    }

    /// Get a descriptor by its index.
    pub fn get(&self, index: usize) -> Option<&ElementDescriptor> {
        self.interactive_elements.get(index)
    }

    /// First element whose text or aria-label contains `needle` (case-insensitive).
    pub fn find_by_text(&self, needle: &str) -> Option<usize> {
        let needle = needle.to_lowercase();
        self.interactive_elements
            .iter()
            .find(|e| {
                e.text.to_lowercase().contains(&needle)
                    || e.attributes.aria_label.to_lowercase().contains(&needle)
            })
            .map(|e| e.index)
    }

    pub fn len(&self) -> usize {
        self.interactive_elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactive_elements.is_empty()
    }
}
