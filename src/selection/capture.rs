//! Confirmation view-model for a clicked element.
//!
//! A [`CaptureDraft`] lists everything the user may keep from an element:
//! its text, each attribute and each direct child. Every option starts
//! unchecked; confirming produces a [`SelectionRecord`] that carries only the
//! checked options plus the always-captured fields.

use crate::dom::{NodeId, NodeRef, css_selector, identifier_path, preview};
use crate::error::{PickerError, Result};
use crate::selection::record::{ChildSnapshot, SelectionRecord};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Length of child text previews in the confirmation view
const CHILD_PREVIEW_LEN: usize = 50;

/// Keep-the-text option; only offered when the element has text
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TextOption {
    pub text: String,
    pub checked: bool,
}

/// Keep-this-attribute option
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AttributeOption {
    pub name: String,
    pub value: String,
    pub checked: bool,
}

/// Keep-this-child option
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChildOption {
    /// 0-based position among the element's children
    pub index: usize,
    pub tag_name: String,
    /// Trimmed full text of the child
    pub text: String,
    /// Text shortened for display
    pub preview: String,
    pub checked: bool,
}

/// The user's answers to a confirmation view
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaptureChoices {
    /// Keep the element's text content as `value`
    #[serde(default)]
    pub keep_text: bool,

    /// Names of attributes to keep
    #[serde(default)]
    pub attributes: Vec<String>,

    /// 0-based indices of direct children to keep
    #[serde(default)]
    pub children: Vec<usize>,
}

/// Confirmation view for one clicked element
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CaptureDraft {
    pub node: NodeId,
    pub tag_name: String,
    pub selector: String,
    pub identifier_path: String,
    pub text: String,
    pub html: String,
    pub value: Option<TextOption>,
    pub attributes: Vec<AttributeOption>,
    pub children: Vec<ChildOption>,
}

impl CaptureDraft {
    /// Open a confirmation view for an element
    pub fn open(node: NodeRef<'_>) -> Self {
        let text = node.text().to_string();

        let value = (!text.is_empty()).then(|| TextOption {
            text: text.clone(),
            checked: false,
        });

        let attributes = node
            .attributes()
            .iter()
            .map(|(name, value)| AttributeOption {
                name: name.clone(),
                value: value.clone(),
                checked: false,
            })
            .collect();

        let children = node
            .children()
            .enumerate()
            .map(|(index, child)| ChildOption {
                index,
                tag_name: child.tag_name().to_string(),
                text: child.text().to_string(),
                preview: preview(child.text(), CHILD_PREVIEW_LEN),
                checked: false,
            })
            .collect();

        Self {
            node: node.id(),
            tag_name: node.tag_name().to_string(),
            selector: css_selector(node),
            identifier_path: identifier_path(node),
            text,
            html: node.outer_html(),
            value,
            attributes,
            children,
        }
    }

    /// Toggle the keep-the-text option
    pub fn check_value(&mut self, checked: bool) -> Result<()> {
        let option = self
            .value
            .as_mut()
            .ok_or_else(|| PickerError::UnknownOption("text content".to_string()))?;
        option.checked = checked;
        Ok(())
    }

    /// Toggle an attribute option by name
    pub fn check_attribute(&mut self, name: &str, checked: bool) -> Result<()> {
        let option = self
            .attributes
            .iter_mut()
            .find(|option| option.name == name)
            .ok_or_else(|| PickerError::UnknownOption(format!("attribute '{}'", name)))?;
        option.checked = checked;
        Ok(())
    }

    /// Toggle a child option by index
    pub fn check_child(&mut self, index: usize, checked: bool) -> Result<()> {
        let option = self
            .children
            .get_mut(index)
            .ok_or_else(|| PickerError::UnknownOption(format!("child {}", index)))?;
        option.checked = checked;
        Ok(())
    }

    /// Check every option named in `choices`.
    ///
    /// Nothing is changed when one of the choices does not exist.
    pub fn apply(&mut self, choices: &CaptureChoices) -> Result<()> {
        let mut updated = self.clone();
        if choices.keep_text {
            updated.check_value(true)?;
        }
        for name in &choices.attributes {
            updated.check_attribute(name, true)?;
        }
        for index in &choices.children {
            updated.check_child(*index, true)?;
        }
        *self = updated;
        Ok(())
    }

    /// Build the record for this element from the checked options
    pub fn confirm(&self, label: &str, timestamp: DateTime<Utc>) -> SelectionRecord {
        let attributes: IndexMap<String, String> = self
            .attributes
            .iter()
            .filter(|option| option.checked)
            .map(|option| (option.name.clone(), option.value.clone()))
            .collect();

        let children = self
            .children
            .iter()
            .filter(|option| option.checked)
            .map(|option| ChildSnapshot {
                index: option.index,
                tag_name: option.tag_name.clone(),
                text: option.text.clone(),
            })
            .collect();

        SelectionRecord {
            identifier_path: self.identifier_path.clone(),
            label: label.to_string(),
            selector: self.selector.clone(),
            tag_name: self.tag_name.clone(),
            text: self.text.clone(),
            html: self.html.clone(),
            value: self
                .value
                .as_ref()
                .filter(|option| option.checked)
                .map(|option| option.text.clone()),
            attributes,
            children,
            timestamp,
        }
    }
}
