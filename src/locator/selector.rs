use std::fmt::Write;

use tracing::warn;

use super::css_escape;
use crate::dom::{Document, DocumentQuery, NodeId};

/// Attributes folded into the tag selector, in this order, when set.
pub const QUALIFYING_ATTRIBUTES: &[&str] = &["type", "name", "role", "aria-label"];

/// Shortest selector that `query` confirms matches only `node`.
///
/// Strategies run in a fixed order and the first unique one wins:
/// `#id`, the full class combination, then `tag[attr="v"]...:nth-child(n)`,
/// then that same compound qualified by the parent's selector. Never fails:
/// when nothing is unique the best candidate is returned anyway, and it
/// still matches `node`.
pub fn css_selector<D, Q>(doc: &D, query: &Q, node: NodeId) -> String
where
    D: Document + ?Sized,
    Q: DocumentQuery + ?Sized,
{
    if let Some(id) = doc.attribute(node, "id").filter(|id| !id.is_empty()) {
        return format!("#{}", css_escape(id));
    }

    if let Some(classes) = doc.attribute(node, "class").and_then(class_selector) {
        if query.count_matches(&classes) == 1 {
            return classes;
        }
    }

    let mut selector = doc.tag_name(node).to_ascii_lowercase();
    for attr in QUALIFYING_ATTRIBUTES {
        if let Some(value) = doc.attribute(node, attr).filter(|v| !v.is_empty()) {
            let _ = write!(selector, "[{}=\"{}\"]", attr, css_escape(value));
        }
    }

    let parent = doc.parent(node);
    if let Some(parent) = parent {
        let position = doc
            .children(parent)
            .iter()
            .position(|&c| c == node)
            .map_or(0, |i| i + 1);
        let _ = write!(selector, ":nth-child({})", position);
    }

    if query.count_matches(&selector) == 1 {
        return selector;
    }

    match parent {
        Some(parent) if Some(parent) != doc.body() => {
            format!("{} > {}", css_selector(doc, query, parent), selector)
        }
        _ => {
            warn!("no unique selector for <{}>, using {}", doc.tag_name(node), selector);
            selector
        }
    }
}

fn class_selector(class_attr: &str) -> Option<String> {
    let mut out = String::new();
    for class in class_attr.split_ascii_whitespace() {
        out.push('.');
        out.push_str(&css_escape(class));
    }
    (!out.is_empty()).then_some(out)
}
