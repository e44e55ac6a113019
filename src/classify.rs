//! Interactivity classifier.
//!
//! An element is actionable if ANY of these hold, checked independently of
//! its ancestors and descendants:
//!
//! - its tag is inherently actionable (`a`, `button`, `input`, `select`, `textarea`)
//! - its `role` is an actionable ARIA role
//! - it declares an inline pointer/touch handler attribute (`onclick`, ...)
//! - its computed cursor is `pointer`
//!
//! Handlers attached with `addEventListener` are invisible here; only markup
//! attributes are seen. Elements wired up that way are found only if they also
//! show a pointer cursor.

use crate::dom::{Document, NodeId};

pub const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea"];

pub const INTERACTIVE_ROLES: &[&str] = &["button", "link", "menuitem", "tab", "checkbox", "radio"];

pub const HANDLER_ATTRIBUTES: &[&str] = &[
    "onclick",
    "onmousedown",
    "onmouseup",
    "ontouchstart",
    "ontouchend",
];

pub fn is_interactive<D: Document + ?Sized>(doc: &D, node: NodeId) -> bool {
    has_interactive_tag(doc, node)
        || has_interactive_role(doc, node)
        || has_handler_attribute(doc, node)
        || has_pointer_cursor(doc, node)
}

fn has_interactive_tag<D: Document + ?Sized>(doc: &D, node: NodeId) -> bool {
    let tag = doc.tag_name(node);
    INTERACTIVE_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t))
}

fn has_interactive_role<D: Document + ?Sized>(doc: &D, node: NodeId) -> bool {
    doc.attribute(node, "role")
        .is_some_and(|role| INTERACTIVE_ROLES.contains(&role))
}

fn has_handler_attribute<D: Document + ?Sized>(doc: &D, node: NodeId) -> bool {
    HANDLER_ATTRIBUTES
        .iter()
        .any(|attr| doc.attribute(node, attr).is_some())
}

fn has_pointer_cursor<D: Document + ?Sized>(doc: &D, node: NodeId) -> bool {
    doc.computed_style(node).cursor == "pointer"
}
