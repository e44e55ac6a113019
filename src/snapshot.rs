//! Captured documents.
//!
//! A [`DomSnapshot`] is a plain-data copy of the body subtree: tags,
//! attributes, the style subset the classifier reads, geometry and rendered
//! text. It serialises as a flat pre-order node list where each node names
//! its parent by position, so depth never runs into JSON nesting limits.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dom::{ComputedStyle, Document, DocumentQuery, NodeId, Rect, Viewport};
use crate::query::{self, Selector};
use crate::{Error, Result};

/// One captured element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Position of the parent in the node list; `None` only for the body.
    #[serde(default)]
    pub parent: Option<usize>,
    pub tag: String,
    #[serde(default)]
    pub attrs: Vec<(String, String)>,
    #[serde(default)]
    pub style: ComputedStyle,
    #[serde(default)]
    pub rect: Rect,
    /// `[offsetWidth, offsetHeight]`
    #[serde(default)]
    pub offset: (f64, f64),
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub type_prop: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    viewport: Viewport,
    #[serde(default)]
    nodes: Vec<NodeData>,
}

/// An immutable captured document. Implements [`Document`] and [`DocumentQuery`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot", into = "RawSnapshot")]
pub struct DomSnapshot {
    url: String,
    title: String,
    viewport: Viewport,
    nodes: Vec<NodeData>,
    children: Vec<Vec<NodeId>>,
}

impl TryFrom<RawSnapshot> for DomSnapshot {
    type Error = Error;

    fn try_from(raw: RawSnapshot) -> Result<Self> {
        if raw.nodes.is_empty() {
            return Err(Error::DomUnavailable(format!(
                "no <body> captured for {:?}",
                raw.url
            )));
        }
        let mut children = vec![Vec::new(); raw.nodes.len()];
        for (i, node) in raw.nodes.iter().enumerate() {
            match (i, node.parent) {
                (0, None) => {}
                (0, Some(_)) => {
                    return Err(Error::MalformedSnapshot(
                        "first node must be the parentless <body>".into(),
                    ))
                }
                (_, Some(p)) if p < i => children[p].push(NodeId(i)),
                (_, parent) => {
                    return Err(Error::MalformedSnapshot(format!(
                        "node {} has parent {:?}; nodes must be in pre-order",
                        i, parent
                    )))
                }
            }
        }
        Ok(Self {
            url: raw.url,
            title: raw.title,
            viewport: raw.viewport,
            nodes: raw.nodes,
            children,
        })
    }
}

impl From<DomSnapshot> for RawSnapshot {
    fn from(doc: DomSnapshot) -> Self {
        Self {
            url: doc.url,
            title: doc.title,
            viewport: doc.viewport,
            nodes: doc.nodes,
        }
    }
}

impl DomSnapshot {
    /// Parse the capture payload / snapshot file format.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawSnapshot = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&RawSnapshot::from(self.clone()))?)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    /// All elements matching `selector`, in document order.
    pub fn select(&self, selector: &str) -> Result<Vec<NodeId>> {
        let sel = Selector::parse(selector)?;
        Ok(query::select_all(self, &sel))
    }

    /// Resolve a `/body/tag[n]/...` path back to its element.
    pub fn resolve_xpath(&self, path: &str) -> Option<NodeId> {
        let rest = path.strip_prefix("/body")?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        let mut current = NodeId(0);
        for step in rest.split('/').skip(1) {
            let (tag, position) = step.strip_suffix(']')?.split_once('[')?;
            let position: usize = position.parse().ok()?;
            current = *self.children[current.0]
                .iter()
                .filter(|&&c| self.nodes[c.0].tag == tag)
                .nth(position.checked_sub(1)?)?;
        }
        Some(current)
    }
}

impl Document for DomSnapshot {
    fn body(&self) -> Option<NodeId> {
        Some(NodeId(0))
    }

    fn tag_name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0]
            .attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn type_property(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].type_prop.as_deref()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent.map(NodeId)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.children[node.0]
    }

    fn computed_style(&self, node: NodeId) -> &ComputedStyle {
        &self.nodes[node.0].style
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        self.nodes[node.0].rect
    }

    fn offset_size(&self, node: NodeId) -> (f64, f64) {
        self.nodes[node.0].offset
    }

    fn rendered_text(&self, node: NodeId) -> &str {
        &self.nodes[node.0].text
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn title(&self) -> &str {
        &self.title
    }
}

impl DocumentQuery for DomSnapshot {
    fn count_matches(&self, selector: &str) -> usize {
        match Selector::parse(selector) {
            Ok(sel) => query::select_all(self, &sel).len(),
            Err(e) => {
                warn!("{}", e);
                0
            }
        }
    }
}

/// Builds fixture documents in code.
///
/// Elements default to a visible 100x20 box at the origin with `cursor: auto`;
/// the body covers the viewport.
pub struct SnapshotBuilder {
    raw: RawSnapshot,
}

impl SnapshotBuilder {
    pub fn new(width: f64, height: f64) -> Self {
        let body = NodeData {
            parent: None,
            tag: "body".into(),
            attrs: Vec::new(),
            style: ComputedStyle::default(),
            rect: Rect::new(0.0, 0.0, width, height),
            offset: (width, height),
            text: String::new(),
            type_prop: None,
        };
        Self {
            raw: RawSnapshot {
                url: "about:blank".into(),
                title: String::new(),
                viewport: Viewport {
                    width,
                    height,
                    scroll_x: 0.0,
                    scroll_y: 0.0,
                },
                nodes: vec![body],
            },
        }
    }

    pub fn url(mut self, url: &str) -> Self {
        self.raw.url = url.into();
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.raw.title = title.into();
        self
    }

    pub fn scroll(mut self, x: f64, y: f64) -> Self {
        self.raw.viewport.scroll_x = x;
        self.raw.viewport.scroll_y = y;
        self
    }

    pub fn body(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a child element to `parent` (document order = call order within a parent).
    ///
    /// Children must be added before any later sibling of `parent` gets
    /// descendants of its own, keeping the node list in pre-order.
    pub fn element(&mut self, parent: NodeId, tag: &str) -> ElementBuilder<'_> {
        let id = NodeId(self.raw.nodes.len());
        self.raw.nodes.push(NodeData {
            parent: Some(parent.0),
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            style: ComputedStyle::default(),
            rect: Rect::new(0.0, 0.0, 100.0, 20.0),
            offset: (100.0, 20.0),
            text: String::new(),
            type_prop: None,
        });
        ElementBuilder { builder: self, id }
    }

    /// Finish. Nodes are reordered into pre-order if elements were appended out of order.
    pub fn build(self) -> DomSnapshot {
        let raw = preorder(self.raw);
        match DomSnapshot::try_from(raw) {
            Ok(doc) => doc,
            // preorder() guarantees a parentless body followed by pre-order nodes
            Err(e) => unreachable!("builder produced an invalid snapshot: {}", e),
        }
    }
}

// Renumber so every parent precedes its children and siblings keep insertion order.
fn preorder(mut raw: RawSnapshot) -> RawSnapshot {
    let n = raw.nodes.len();
    let mut kids: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, node) in raw.nodes.iter().enumerate().skip(1) {
        if let Some(p) = node.parent {
            kids[p].push(i);
        }
    }
    let mut order = Vec::with_capacity(n);
    let mut stack = vec![0usize];
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(kids[i].iter().rev());
    }
    let mut new_index = vec![0usize; n];
    for (new, &old) in order.iter().enumerate() {
        new_index[old] = new;
    }
    let mut old_nodes: Vec<Option<NodeData>> = raw.nodes.drain(..).map(Some).collect();
    raw.nodes = order
        .iter()
        .filter_map(|&old| old_nodes[old].take())
        .map(|mut node| {
            node.parent = node.parent.map(|p| new_index[p]);
            node
        })
        .collect();
    raw
}

/// Configures one element added through [`SnapshotBuilder::element`].
pub struct ElementBuilder<'a> {
    builder: &'a mut SnapshotBuilder,
    id: NodeId,
}

impl ElementBuilder<'_> {
    fn node(&mut self) -> &mut NodeData {
        &mut self.builder.raw.nodes[self.id.0]
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.node().attrs.push((name.into(), value.into()));
        self
    }

    /// Sets both the bounding rect and the offset size.
    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        let node = self.node();
        node.rect = Rect::new(x, y, width, height);
        node.offset = (width, height);
        self
    }

    pub fn display(mut self, value: &str) -> Self {
        self.node().style.display = value.into();
        self
    }

    pub fn visibility(mut self, value: &str) -> Self {
        self.node().style.visibility = value.into();
        self
    }

    pub fn opacity(mut self, value: &str) -> Self {
        self.node().style.opacity = value.into();
        self
    }

    pub fn cursor(mut self, value: &str) -> Self {
        self.node().style.cursor = value.into();
        self
    }

    pub fn text(mut self, value: &str) -> Self {
        self.node().text = value.into();
        self
    }

    pub fn type_prop(mut self, value: &str) -> Self {
        self.node().type_prop = Some(value.into());
        self
    }

    /// Handle of the element being built. Only stable until [`SnapshotBuilder::build`]
    /// if elements were added out of pre-order.
    pub fn id(self) -> NodeId {
        self.id
    }
}
