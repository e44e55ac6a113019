//! Traversal driver.

use std::time::Instant;

use tracing::{debug, trace};

use crate::annotate::AnnotationLayer;
use crate::classify::is_interactive;
use crate::dom::{Document, DocumentQuery, NodeId};
use crate::geometry::{is_in_viewport, is_visible};
use crate::locator::{css_selector, xpath};
use crate::{Attributes, Coordinates, ElementDescriptor, Error, Result, ScanReport, TabInfo};

/// Walk the body depth-first, pre-order, and describe every element that is
/// visible, fully inside the viewport and interactive.
///
/// Every descendant is visited, including those under rejected elements.
/// Indices are handed out in visit order starting at 0. `layer` is cleared
/// first; marks are attached only when `highlight` is set.
pub fn scan<D, Q>(
    doc: &D,
    query: &Q,
    highlight: bool,
    layer: &mut dyn AnnotationLayer,
) -> Result<ScanReport>
where
    D: Document + ?Sized,
    Q: DocumentQuery + ?Sized,
{
    let start = Instant::now();
    let body = doc
        .body()
        .ok_or_else(|| Error::DomUnavailable(format!("no <body> in {:?}", doc.url())))?;

    layer.clear();

    let viewport = doc.viewport();
    let mut elements = Vec::new();
    let mut visited = 0usize;
    let mut stack = vec![body];

    while let Some(node) = stack.pop() {
        visited += 1;

        if is_visible(doc, node) && is_in_viewport(doc, node) && is_interactive(doc, node) {
            let index = elements.len();
            let rect = doc.bounding_rect(node);
            if highlight {
                layer.attach(index, rect, &viewport);
            }
            let descriptor = describe(doc, query, node, index)?;
            trace!("[{}] <{}> {}", index, descriptor.tag_name, descriptor.selector);
            elements.push(descriptor);
        }

        stack.extend(doc.children(node).iter().rev().copied());
    }

    debug!(
        "scanned {} elements, {} interactive in {:?}",
        visited,
        elements.len(),
        start.elapsed()
    );

    let url = doc.url().to_string();
    Ok(ScanReport {
        available_tabs: vec![TabInfo {
            url: url.clone(),
            title: doc.title().to_string(),
        }],
        current_url: url,
        interactive_elements: elements,
    })
}

fn describe<D, Q>(doc: &D, query: &Q, node: NodeId, index: usize) -> Result<ElementDescriptor>
where
    D: Document + ?Sized,
    Q: DocumentQuery + ?Sized,
{
    let attr = |name: &str| doc.attribute(node, name).unwrap_or_default().to_string();
    let rect = doc.bounding_rect(node);

    Ok(ElementDescriptor {
        tag_name: doc.tag_name(node).to_ascii_lowercase(),
        xpath: xpath(doc, node)?,
        selector: css_selector(doc, query, node),
        attributes: Attributes {
            id: attr("id"),
            class: attr("class"),
            kind: doc
                .type_property(node)
                .map(str::to_string)
                .unwrap_or_else(|| attr("type")),
            role: attr("role"),
            aria_label: attr("aria-label"),
        },
        index,
        coordinates: Coordinates {
            x: rect.x,
            y: rect.y,
        },
        text: doc.rendered_text(node).trim().to_string(),
        is_visible: true,
        is_in_viewport: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::Overlay;
    use crate::snapshot::{DomSnapshot, SnapshotBuilder};

    fn run(doc: &DomSnapshot, highlight: bool, overlay: &mut Overlay) -> ScanReport {
        scan(doc, doc, highlight, overlay).unwrap()
    }

    fn login_page() -> DomSnapshot {
        let mut b = SnapshotBuilder::new(1024.0, 768.0)
            .url("https://example.com/login")
            .title("Sign in");
        let body = b.body();
        let form = b.element(body, "form").rect(0.0, 0.0, 400.0, 300.0).id();
        b.element(form, "input")
            .attr("name", "email")
            .type_prop("text")
            .rect(10.0, 10.0, 200.0, 24.0);
        b.element(form, "input")
            .attr("name", "password")
            .attr("type", "password")
            .type_prop("password")
            .rect(10.0, 50.0, 200.0, 24.0);
        b.element(form, "button")
            .attr("class", "primary")
            .type_prop("submit")
            .text("\n  Sign in  \n")
            .rect(10.0, 90.0, 80.0, 30.0);
        let card = b
            .element(body, "div")
            .attr("class", "card")
            .cursor("pointer")
            .rect(500.0, 10.0, 300.0, 200.0)
            .id();
        b.element(card, "a")
            .attr("href", "/help")
            .attr("aria-label", "Help")
            .cursor("pointer")
            .rect(510.0, 20.0, 40.0, 16.0);
        b.build()
    }

    #[test]
    fn indices_follow_preorder() {
        let doc = login_page();
        let report = run(&doc, false, &mut Overlay::new());

        let tags: Vec<&str> = report
            .interactive_elements
            .iter()
            .map(|e| e.tag_name.as_str())
            .collect();
        assert_eq!(tags, vec!["input", "input", "button", "div", "a"]);
        for (i, el) in report.interactive_elements.iter().enumerate() {
            assert_eq!(el.index, i);
            assert!(el.is_visible && el.is_in_viewport);
        }
    }

    #[test]
    fn descriptor_fields() {
        let doc = login_page();
        let report = run(&doc, false, &mut Overlay::new());

        let email = &report.interactive_elements[0];
        assert_eq!(email.xpath, "/body/form[1]/input[1]");
        assert_eq!(email.attributes.kind, "text");
        assert_eq!(email.attributes.id, "");
        assert_eq!(email.attributes.aria_label, "");

        let submit = &report.interactive_elements[2];
        assert_eq!(submit.selector, ".primary");
        assert_eq!(submit.text, "Sign in");
        assert_eq!(submit.attributes.kind, "submit");
        assert_eq!(submit.coordinates, Coordinates { x: 10.0, y: 90.0 });

        let help = &report.interactive_elements[4];
        assert_eq!(help.xpath, "/body/div[1]/a[1]");
        assert_eq!(help.attributes.aria_label, "Help");

        assert_eq!(report.current_url, "https://example.com/login");
        assert_eq!(
            report.available_tabs,
            vec![TabInfo {
                url: "https://example.com/login".into(),
                title: "Sign in".into()
            }]
        );
    }

    #[test]
    fn type_attribute_used_without_property() {
        let mut b = SnapshotBuilder::new(800.0, 600.0);
        let body = b.body();
        b.element(body, "input").attr("type", "checkbox");
        let doc = b.build();
        let report = run(&doc, false, &mut Overlay::new());
        assert_eq!(report.interactive_elements[0].attributes.kind, "checkbox");
    }

    #[test]
    fn gating_keeps_only_actionable_elements() {
        let mut b = SnapshotBuilder::new(800.0, 600.0);
        let body = b.body();
        b.element(body, "a").attr("id", "gone").display("none");
        b.element(body, "button")
            .attr("id", "below")
            .rect(10.0, 1200.0, 80.0, 20.0);
        b.element(body, "button")
            .attr("id", "half")
            .rect(10.0, 590.0, 80.0, 20.0);
        b.element(body, "button").attr("id", "ok").rect(10.0, 10.0, 80.0, 20.0);
        let doc = b.build();

        let report = run(&doc, false, &mut Overlay::new());
        let ids: Vec<&str> = report
            .interactive_elements
            .iter()
            .map(|e| e.attributes.id.as_str())
            .collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[test]
    fn pointer_cursor_alone_qualifies() {
        let mut b = SnapshotBuilder::new(800.0, 600.0);
        let body = b.body();
        b.element(body, "span").cursor("pointer").text("More");
        let doc = b.build();

        let report = run(&doc, false, &mut Overlay::new());
        assert_eq!(report.len(), 1);
        assert_eq!(report.interactive_elements[0].tag_name, "span");
    }

    #[test]
    fn descends_into_rejected_containers() {
        let mut b = SnapshotBuilder::new(800.0, 600.0);
        let body = b.body();
        let hidden = b.element(body, "div").visibility("hidden").id();
        // visibility can be overridden by a child
        b.element(hidden, "button").attr("id", "shown");
        let offscreen = b.element(body, "section").rect(0.0, -50.0, 800.0, 2000.0).id();
        let deep = b.element(offscreen, "div").id();
        b.element(deep, "a").attr("id", "deep-link").rect(5.0, 5.0, 30.0, 10.0);
        let doc = b.build();

        let report = run(&doc, false, &mut Overlay::new());
        let ids: Vec<&str> = report
            .interactive_elements
            .iter()
            .map(|e| e.attributes.id.as_str())
            .collect();
        assert_eq!(ids, vec!["shown", "deep-link"]);
    }

    #[test]
    fn empty_body_yields_empty_report() {
        let mut b = SnapshotBuilder::new(800.0, 600.0);
        let body = b.body();
        let wrap = b.element(body, "div").id();
        b.element(wrap, "p").text("Nothing to click");
        let doc = b.build();

        let mut overlay = Overlay::new();
        let report = run(&doc, true, &mut overlay);
        assert!(report.interactive_elements.is_empty());
        assert!(overlay.is_empty());
    }

    #[test]
    fn highlight_marks_every_element_once() {
        let doc = login_page();
        let mut overlay = Overlay::new();

        let first = run(&doc, true, &mut overlay);
        assert_eq!(overlay.len(), first.len());
        let second = run(&doc, true, &mut overlay);
        assert_eq!(overlay.len(), second.len());
        assert_eq!(first, second);

        let labels: Vec<usize> = overlay.marks().map(|m| m.index).collect();
        assert_eq!(labels, (0..first.len()).collect::<Vec<_>>());
    }

    #[test]
    fn scan_without_highlight_clears_old_marks() {
        let doc = login_page();
        let mut overlay = Overlay::new();
        run(&doc, true, &mut overlay);
        assert!(!overlay.is_empty());

        let report = run(&doc, false, &mut overlay);
        assert!(!report.is_empty());
        assert!(overlay.is_empty());
    }

    #[test]
    fn locators_resolve_back() {
        let doc = login_page();
        let report = run(&doc, false, &mut Overlay::new());
        for el in &report.interactive_elements {
            let node = doc.resolve_xpath(&el.xpath).unwrap();
            assert_eq!(doc.tag_name(node), el.tag_name);
            assert!(doc.select(&el.selector).unwrap().contains(&node));
        }
    }
}
