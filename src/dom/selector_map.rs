use crate::dom::tree::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Information needed to locate an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementSelector {
    /// CSS selector for the element
    pub css_selector: String,

    /// Structural path from the body, used as a storage key
    pub identifier_path: String,

    /// Element's tag name
    pub tag_name: String,

    /// Element's ID attribute (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Element's text content (truncated for display)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ElementSelector {
    /// Create a new ElementSelector
    pub fn new(
        css_selector: impl Into<String>,
        identifier_path: impl Into<String>,
        tag_name: impl Into<String>,
    ) -> Self {
        Self {
            css_selector: css_selector.into(),
            identifier_path: identifier_path.into(),
            tag_name: tag_name.into(),
            id: None,
            text: None,
        }
    }

    /// Builder method: set ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder method: set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Map of element indices to their selectors
/// Uses IndexMap to preserve document order
#[derive(Debug, Clone, Default)]
pub struct SelectorMap {
    map: IndexMap<NodeId, ElementSelector>,
}

impl SelectorMap {
    /// Create a new empty SelectorMap
    pub fn new() -> Self {
        Self { map: IndexMap::new() }
    }

    /// Register the selector of an element
    pub fn insert(&mut self, id: NodeId, selector: ElementSelector) {
        self.map.insert(id, selector);
    }

    /// Get selector by index
    pub fn get(&self, id: NodeId) -> Option<&ElementSelector> {
        self.map.get(&id)
    }

    /// Check if index exists
    pub fn contains(&self, id: NodeId) -> bool {
        self.map.contains_key(&id)
    }

    /// Get the number of registered elements
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over all (index, selector) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &ElementSelector)> {
        self.map.iter()
    }

    /// Get all selectors
    pub fn selectors(&self) -> impl Iterator<Item = &ElementSelector> {
        self.map.values()
    }

    /// Find the first index whose CSS selector matches exactly
    pub fn find_by_css_selector(&self, css_selector: &str) -> Option<NodeId> {
        self.map
            .iter()
            .find(|(_, sel)| sel.css_selector == css_selector)
            .map(|(idx, _)| *idx)
    }

    /// Find index by identifier path
    pub fn find_by_identifier_path(&self, path: &str) -> Option<NodeId> {
        self.map
            .iter()
            .find(|(_, sel)| sel.identifier_path == path)
            .map(|(idx, _)| *idx)
    }

    /// Find index by element ID
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.map
            .iter()
            .find(|(_, sel)| sel.id.as_deref() == Some(id))
            .map(|(idx, _)| *idx)
    }

    /// Export to JSON for listing
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.map)
    }
}
