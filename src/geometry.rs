//! Geometry predicates: is the element rendered, and is all of it on screen.

use crate::dom::{Document, NodeId, Rect, Viewport};

/// Rendered with a non-empty box and not hidden by `display`, `visibility`
/// or `opacity`.
pub fn is_visible<D: Document + ?Sized>(doc: &D, node: NodeId) -> bool {
    let (width, height) = doc.offset_size(node);
    if width <= 0.0 || height <= 0.0 {
        return false;
    }
    let style = doc.computed_style(node);
    style.visibility != "hidden" && style.display != "none" && !is_transparent(&style.opacity)
}

/// The whole bounding box lies inside the viewport at the current scroll
/// position. Half-scrolled-off elements do not count.
pub fn is_in_viewport<D: Document + ?Sized>(doc: &D, node: NodeId) -> bool {
    rect_in_viewport(&doc.bounding_rect(node), &doc.viewport())
}

pub fn rect_in_viewport(rect: &Rect, viewport: &Viewport) -> bool {
    rect.top() >= 0.0
        && rect.left() >= 0.0
        && rect.bottom() <= viewport.height
        && rect.right() <= viewport.width
}

fn is_transparent(opacity: &str) -> bool {
    opacity.trim().parse::<f64>().is_ok_and(|o| o == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotBuilder;

    #[test]
    fn visible_needs_box_and_style() {
        let mut b = SnapshotBuilder::new(800.0, 600.0);
        let body = b.body();
        let plain = b.element(body, "div").id();
        let none = b.element(body, "div").display("none").id();
        let hidden = b.element(body, "div").visibility("hidden").id();
        let clear = b.element(body, "div").opacity("0").id();
        let faint = b.element(body, "div").opacity("0.05").id();
        let flat = b.element(body, "div").rect(10.0, 10.0, 50.0, 0.0).id();
        let collapsed = b.element(body, "div").visibility("collapse").id();
        let doc = b.build();

        assert!(is_visible(&doc, plain));
        assert!(!is_visible(&doc, none));
        assert!(!is_visible(&doc, hidden));
        assert!(!is_visible(&doc, clear));
        assert!(is_visible(&doc, faint));
        assert!(!is_visible(&doc, flat));
        // only `hidden` is filtered, matching what the page reports
        assert!(is_visible(&doc, collapsed));
    }

    #[test]
    fn viewport_edges_are_inclusive() {
        let vp = Viewport {
            width: 800.0,
            height: 600.0,
            scroll_x: 0.0,
            scroll_y: 300.0,
        };
        assert!(rect_in_viewport(&Rect::new(0.0, 0.0, 800.0, 600.0), &vp));
        assert!(rect_in_viewport(&Rect::new(700.0, 580.0, 100.0, 20.0), &vp));
        assert!(!rect_in_viewport(&Rect::new(700.0, 590.0, 100.0, 20.0), &vp));
        assert!(!rect_in_viewport(&Rect::new(-1.0, 10.0, 50.0, 20.0), &vp));
        assert!(!rect_in_viewport(&Rect::new(10.0, -5.0, 50.0, 20.0), &vp));
        assert!(!rect_in_viewport(&Rect::new(760.0, 10.0, 50.0, 20.0), &vp));
    }

    #[test]
    fn scrolled_away_element_is_out() {
        let mut b = SnapshotBuilder::new(800.0, 600.0);
        let body = b.body();
        let below = b.element(body, "a").rect(10.0, 900.0, 80.0, 20.0).id();
        let above = b.element(body, "a").rect(10.0, -40.0, 80.0, 20.0).id();
        let here = b.element(body, "a").rect(10.0, 40.0, 80.0, 20.0).id();
        let doc = b.build();

        assert!(!is_in_viewport(&doc, below));
        assert!(!is_in_viewport(&doc, above));
        assert!(is_in_viewport(&doc, here));
    }
}
