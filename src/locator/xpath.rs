use crate::dom::{Document, NodeId};
use crate::{Error, Result};

/// Absolute structural path from the body, e.g. `/body/div[2]/a[1]`.
///
/// Each step counts only preceding siblings with the same tag. Fails with
/// [`Error::LocatorUnresolvable`] rather than returning a partial path when
/// the element is not reachable from the body through its parents' children.
pub fn xpath<D: Document + ?Sized>(doc: &D, node: NodeId) -> Result<String> {
    let body = doc
        .body()
        .ok_or_else(|| Error::DomUnavailable("document has no <body>".into()))?;

    let mut steps = Vec::new();
    let mut current = node;
    while current != body {
        let tag = doc.tag_name(current);
        let parent = doc.parent(current).ok_or_else(|| {
            Error::LocatorUnresolvable(format!("<{}> is not attached under <body>", tag))
        })?;

        let mut same_tag_before = 0;
        let mut found = false;
        for &sibling in doc.children(parent) {
            if sibling == current {
                found = true;
                break;
            }
            if doc.tag_name(sibling) == tag {
                same_tag_before += 1;
            }
        }
        if !found {
            return Err(Error::LocatorUnresolvable(format!(
                "<{}> is missing from its parent's children",
                tag
            )));
        }

        steps.push(format!("{}[{}]", tag, same_tag_before + 1));
        current = parent;
    }

    let mut path = String::from("/body");
    for step in steps.iter().rev() {
        path.push('/');
        path.push_str(step);
    }
    Ok(path)
}
