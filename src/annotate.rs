//! Index overlays: a box and a numbered label over each scanned element.
//!
//! The scan only records marks through [`AnnotationLayer`]; nothing it returns
//! depends on them. [`Overlay`] turns the recorded marks into one injected
//! script, so drawing is a single round trip after the scan.

use std::collections::BTreeMap;

use eoka::Page;
use serde::Serialize;

use crate::dom::{Rect, Viewport};

/// Marks elements found during a scan.
///
/// Both operations are idempotent: clearing twice is clearing once, and
/// attaching the same index again replaces the earlier mark.
pub trait AnnotationLayer {
    /// Drop every mark from the previous scan.
    fn clear(&mut self);

    /// Mark the element labelled `index`. `rect` is viewport-relative.
    fn attach(&mut self, index: usize, rect: Rect, viewport: &Viewport);
}

/// One overlay, in document coordinates (scroll offset + viewport rect).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Mark {
    #[serde(rename = "i")]
    pub index: usize,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Mark {
    /// Top of the label, which sits just above the box.
    pub fn label_top(&self) -> f64 {
        self.top - LABEL_OFFSET
    }
}

const LABEL_OFFSET: f64 = 20.0;

const BOX_CLASS: &str = "__eoka_scan_box";
const LABEL_CLASS: &str = "__eoka_scan_label";
const STYLE_ID: &str = "__eoka_scan_style";

/// Removes every overlay node a previous render injected. The stylesheet stays.
pub const CLEAR_JS: &str =
    "document.querySelectorAll('.__eoka_scan_box, .__eoka_scan_label').forEach(el => el.remove())";

/// The marks of the latest scan, owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    marks: BTreeMap<usize, Mark>,
}

impl AnnotationLayer for Overlay {
    fn clear(&mut self) {
        self.marks.clear();
    }

    fn attach(&mut self, index: usize, rect: Rect, viewport: &Viewport) {
        self.marks.insert(
            index,
            Mark {
                index,
                left: rect.left() + viewport.scroll_x,
                top: rect.top() + viewport.scroll_y,
                width: rect.width,
                height: rect.height,
            },
        );
    }
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks in index order.
    pub fn marks(&self) -> impl Iterator<Item = &Mark> {
        self.marks.values()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Script that removes old overlay nodes, injects the stylesheet if it is
    /// not there yet, and draws the current marks.
    pub fn render_js(&self) -> String {
        let marks: Vec<&Mark> = self.marks.values().collect();
        format!(
            r#"
(() => {{
    document.querySelectorAll('.{boxc}, .{labelc}').forEach(el => el.remove());
    if (!document.getElementById('{style_id}')) {{
        const style = document.createElement('style');
        style.id = '{style_id}';
        style.textContent = `
            .{boxc} {{
                position: absolute !important;
                border: 2px solid red !important;
                background-color: rgba(255, 0, 0, 0.2) !important;
                z-index: 10000 !important;
                pointer-events: none !important;
            }}
            .{labelc} {{
                position: absolute !important;
                background-color: red !important;
                color: white !important;
                padding: 2px 4px !important;
                border-radius: 2px !important;
                font: 12px/14px monospace !important;
                z-index: 10001 !important;
                pointer-events: none !important;
            }}
        `;
        (document.head || document.documentElement).appendChild(style);
    }}
    const host = document.body;
    if (!host) return;
    for (const m of {marks}) {{
        const box = document.createElement('div');
        box.className = '{boxc}';
        box.style.left = m.left + 'px';
        box.style.top = m.top + 'px';
        box.style.width = m.width + 'px';
        box.style.height = m.height + 'px';
        host.appendChild(box);

        const label = document.createElement('div');
        label.className = '{labelc}';
        label.textContent = String(m.i);
        label.style.left = m.left + 'px';
        label.style.top = (m.top - {offset}) + 'px';
        host.appendChild(label);
    }}
}})()
"#,
            boxc = BOX_CLASS,
            labelc = LABEL_CLASS,
            style_id = STYLE_ID,
            offset = LABEL_OFFSET,
            marks = serde_json::to_string(&marks).unwrap_or_else(|_| "[]".into()),
        )
    }

    /// Replace whatever overlays the page shows with this overlay's marks.
    pub async fn render(&self, page: &Page) -> eoka::Result<()> {
        page.execute(&self.render_js()).await
    }

    /// Remove all overlay nodes from the page.
    pub async fn remove(page: &Page) -> eoka::Result<()> {
        page.execute(CLEAR_JS).await
    }
}
