use crate::dom::element::{BoundingBox, ElementNode};
use crate::dom::selector_map::{ElementSelector, SelectorMap};
use crate::dom::{css_selector, identifier_path, preview};
use crate::error::{PickerError, Result};
use headless_chrome::Tab;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

const ROOT_ONLY: &[NodeId] = &[NodeId::ROOT];

/// Index of a node in a [`DomTree`], assigned in document (pre-) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The tree root (the document body)
    pub const ROOT: NodeId = NodeId(0);
}

/// A single element stored in the arena
#[derive(Debug, Clone)]
pub struct DomNode {
    /// Lowercase tag name
    pub tag_name: String,

    /// Attributes in document order
    pub attributes: IndexMap<String, String>,

    /// Full text content, untrimmed
    pub text: String,

    /// Parent back-reference; `None` only for the root
    pub parent: Option<NodeId>,

    /// Child elements in document order
    pub children: Vec<NodeId>,

    /// Whether the element was rendered with a non-empty box
    pub is_visible: bool,

    /// Bounding box in viewport coordinates
    pub bounding_box: Option<BoundingBox>,

    /// Markup captured from the live page
    pub outer_html: Option<String>,
}

/// Page structure as an arena of element nodes rooted at the document body
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<DomNode>,

    /// Selector information for every element, keyed by node id
    pub selector_map: SelectorMap,
}

impl DomTree {
    /// Build a tree from a snapshot root (normally `<body>`)
    pub fn new(root: ElementNode) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(root.count()),
            selector_map: SelectorMap::new(),
        };
        tree.push_node(root, None);
        tree.build_selector_map();
        tree
    }

    fn push_node(&mut self, element: ElementNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let text = element.full_text();
        self.nodes.push(DomNode {
            tag_name: element.tag_name.to_ascii_lowercase(),
            attributes: element.attributes,
            text,
            parent,
            children: Vec::with_capacity(element.children.len()),
            is_visible: element.is_visible,
            bounding_box: element.bounding_box,
            outer_html: element.outer_html,
        });

        for child in element.children {
            let child_id = self.push_node(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }

        id
    }

    /// Parse a tree from snapshot JSON (a serialized [`ElementNode`])
    pub fn from_json(json: &str) -> Result<Self> {
        let root: ElementNode = serde_json::from_str(json)
            .map_err(|e| PickerError::DomParseFailed(format!("Failed to parse DOM JSON: {}", e)))?;
        Ok(Self::new(root))
    }

    /// Build DOM tree from a browser tab
    pub fn from_tab(tab: &Arc<Tab>) -> Result<Self> {
        let js_code = include_str!("snapshot.js");

        let result = tab
            .evaluate(js_code, false)
            .map_err(|e| PickerError::DomParseFailed(format!("Failed to execute DOM snapshot script: {}", e)))?;

        let json_value = result
            .value
            .ok_or_else(|| PickerError::DomParseFailed("No value returned from DOM snapshot".to_string()))?;

        // The script returns a JSON string rather than an object
        let json_str: String = serde_json::from_value(json_value)
            .map_err(|e| PickerError::DomParseFailed(format!("Failed to get JSON string: {}", e)))?;

        let tree = Self::from_json(&json_str)?;
        log::debug!("Captured DOM snapshot with {} elements", tree.len());
        Ok(tree)
    }

    fn build_selector_map(&mut self) {
        let mut map = SelectorMap::new();
        for index in 0..self.nodes.len() {
            let node = self.node(NodeId(index));
            let mut selector = ElementSelector::new(css_selector(node), identifier_path(node), node.tag_name());
            if let Some(id) = node.element_id() {
                selector = selector.with_id(id);
            }
            let text = node.text();
            if !text.is_empty() {
                selector = selector.with_text(preview(text, 50));
            }
            map.insert(NodeId(index), selector);
        }
        self.selector_map = map;
    }

    /// Root element reference
    pub fn root(&self) -> NodeRef<'_> {
        self.node(NodeId::ROOT)
    }

    /// Get a node reference, if the id belongs to this tree
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.0 < self.nodes.len()).then_some(NodeRef { tree: self, id })
    }

    /// Node reference for an id known to belong to this tree
    fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    /// Number of elements in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds at least its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes in document order
    pub fn iter(&self) -> impl Iterator<Item = NodeRef<'_>> {
        (0..self.nodes.len()).map(move |index| self.node(NodeId(index)))
    }

    /// Record markup fetched from the live page for a node
    pub fn set_outer_html(&mut self, id: NodeId, html: impl Into<String>) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or_else(|| PickerError::ElementNotFound(format!("No element with index {}", id.0)))?;
        node.outer_html = Some(html.into());
        Ok(())
    }

    /// Get element selector by index
    pub fn get_selector(&self, id: NodeId) -> Option<&ElementSelector> {
        self.selector_map.get(id)
    }

    /// Find a node by its identifier path
    pub fn find_by_identifier_path(&self, path: &str) -> Option<NodeRef<'_>> {
        self.selector_map.find_by_identifier_path(path).map(|id| self.node(id))
    }

    /// Convert a subtree back into its snapshot form
    pub fn to_element_node(&self, id: NodeId) -> Option<ElementNode> {
        let node = self.nodes.get(id.0)?;
        Some(ElementNode {
            tag_name: node.tag_name.clone(),
            attributes: node.attributes.clone(),
            text_content: Some(node.text.clone()),
            children: node
                .children
                .iter()
                .filter_map(|child| self.to_element_node(*child))
                .collect(),
            is_visible: node.is_visible,
            bounding_box: node.bounding_box,
            outer_html: node.outer_html.clone(),
        })
    }

    /// Convert the DOM tree to snapshot JSON
    pub fn to_json(&self) -> Result<String> {
        let root = self
            .to_element_node(NodeId::ROOT)
            .ok_or_else(|| PickerError::DomParseFailed("Tree has no root".to_string()))?;
        serde_json::to_string_pretty(&root)
            .map_err(|e| PickerError::DomParseFailed(format!("Failed to serialize DOM to JSON: {}", e)))
    }
}

/// Borrowed handle to one element of a [`DomTree`]
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a DomTree,
    id: NodeId,
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl<'a> NodeRef<'a> {
    fn data(self) -> &'a DomNode {
        &self.tree.nodes[self.id.0]
    }

    /// Node id within the tree
    pub fn id(self) -> NodeId {
        self.id
    }

    /// The owning tree
    pub fn tree(self) -> &'a DomTree {
        self.tree
    }

    /// Lowercase tag name
    pub fn tag_name(self) -> &'a str {
        &self.data().tag_name
    }

    /// Attributes in document order
    pub fn attributes(self) -> &'a IndexMap<String, String> {
        &self.data().attributes
    }

    /// Get attribute value by name
    pub fn attribute(self, name: &str) -> Option<&'a str> {
        self.data().attributes.get(name).map(String::as_str)
    }

    /// Non-empty `id` attribute
    pub fn element_id(self) -> Option<&'a str> {
        self.attribute("id").filter(|id| !id.is_empty())
    }

    /// Non-empty `class` attribute, verbatim
    pub fn class_name(self) -> Option<&'a str> {
        self.attribute("class").filter(|class| !class.is_empty())
    }

    /// Trimmed text content
    pub fn text(self) -> &'a str {
        self.data().text.trim()
    }

    /// Whether the element was rendered with a non-empty box
    pub fn is_visible(self) -> bool {
        self.data().is_visible
    }

    /// Bounding box in viewport coordinates
    pub fn bounding_box(self) -> Option<BoundingBox> {
        self.data().bounding_box
    }

    /// Whether this is the tree root
    pub fn is_root(self) -> bool {
        self.id == NodeId::ROOT
    }

    /// Parent element
    pub fn parent(self) -> Option<NodeRef<'a>> {
        self.data().parent.map(|id| self.tree.node(id))
    }

    /// Direct child elements
    pub fn children(self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.data().children.iter().map(move |id| tree.node(*id))
    }

    /// Number of direct child elements
    pub fn child_count(self) -> usize {
        self.data().children.len()
    }

    /// Child element at a 0-based position
    pub fn child(self, index: usize) -> Option<NodeRef<'a>> {
        self.data().children.get(index).map(|id| self.tree.node(*id))
    }

    /// Siblings including this node, in document order
    pub fn siblings(self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        let ids: &'a [NodeId] = match self.data().parent {
            Some(parent) => &tree.nodes[parent.0].children,
            None => ROOT_ONLY,
        };
        ids.iter().map(move |id| tree.node(*id))
    }

    /// 0-based position among the parent's child elements
    pub fn child_position(self) -> Option<usize> {
        let parent = self.data().parent?;
        self.tree.nodes[parent.0].children.iter().position(|id| *id == self.id)
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    /// This node and all descendants in document order
    pub fn descendants(self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            let children: Vec<_> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Serialized markup: the captured markup if present, otherwise
    /// re-serialized from the snapshot
    pub fn outer_html(self) -> String {
        match &self.data().outer_html {
            Some(html) => html.clone(),
            None => {
                let mut out = String::new();
                self.write_html(&mut out);
                out
            }
        }
    }

    fn write_html(self, out: &mut String) {
        let data = self.data();
        out.push('<');
        out.push_str(&data.tag_name);
        for (name, value) in &data.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_html(value, true));
            out.push('"');
        }
        out.push('>');

        if VOID_ELEMENTS.contains(&data.tag_name.as_str()) {
            return;
        }

        if data.children.is_empty() {
            out.push_str(&escape_html(&data.text, false));
        } else {
            for child in self.children() {
                child.write_html(out);
            }
        }

        out.push_str("</");
        out.push_str(&data.tag_name);
        out.push('>');
    }
}

fn escape_html(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
