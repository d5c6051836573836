//! DOM snapshot and selector generation module
//!
//! This module provides the page structure a selection is made on and the
//! two builders that describe a picked element:
//! - ElementNode: serializable snapshot of a DOM element
//! - DomTree: arena of elements with parent back-references
//! - identifier_path: structural path used as a storage key
//! - css_selector: selector used to re-locate the element later
//! - SelectorMap: selectors for every element of a tree
//! - query: matcher for the generated selector subset

pub mod element;
pub mod path;
pub mod query;
pub mod selector;
pub mod selector_map;
pub mod tree;

pub use element::{BoundingBox, ElementNode};
pub use path::identifier_path;
pub use query::{Selector, select, select_first};
pub use selector::css_selector;
pub use selector_map::{ElementSelector, SelectorMap};
pub use tree::{DomNode, DomTree, NodeId, NodeRef};

/// Class attribute as chained `.class` suffixes.
///
/// Splits on single spaces without normalization, so repeated or doubled
/// separators are carried through unchanged.
pub(crate) fn class_suffix(class_name: &str) -> String {
    class_name.split(' ').map(|token| format!(".{}", token)).collect()
}

/// Truncate text to `max` characters, appending `...` when shortened
pub(crate) fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let truncated: String = text.chars().take(max).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}
