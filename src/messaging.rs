//! Request/response messages between a controller and a page agent.
//!
//! Requests are JSON objects tagged by `action`, e.g.
//! `{"action": "startSelection", "label": "price"}`. Every request gets
//! exactly one [`Response`].

use crate::error::{PickerError, Result};
use crate::selection::{CaptureChoices, CaptureDraft, ExportDocument, SelectionRecord};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a request designates an element of the page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(untagged)]
pub enum ElementTarget {
    /// Select by index from the DOM tree (document order, body = 0)
    Index {
        /// Element index
        index: usize,
    },
    /// Select by identifier path
    Path {
        /// Identifier path, e.g. `div#main:nth-child(2) > p:nth-child(1)`
        path: String,
    },
    /// Select the first element matching a CSS selector
    Css {
        /// CSS selector
        selector: String,
    },
}

/// Messages understood by a page agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    /// Enter picking mode for a label
    StartSelection { label: String },
    /// Leave picking mode
    StopSelection,
    /// List saved selections
    GetSelections,
    /// Delete all saved selections
    ClearSelections,
    /// Export saved selections with the page URL
    ExportData,
    /// Delete the selection with a label
    RemoveSelection { label: String },
    /// Click an element while picking
    PickElement { target: ElementTarget },
    /// Save the clicked element with the chosen options
    ConfirmSelection {
        #[serde(default)]
        keep_text: bool,
        #[serde(default)]
        attributes: Vec<String>,
        #[serde(default)]
        children: Vec<usize>,
    },
    /// Discard the clicked element and stop picking
    CancelSelection,
    /// Close the confirmation view and keep picking
    HideSelectionModal,
}

impl Request {
    /// Decode a request from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PickerError::InvalidRequest(e.to_string()))
    }

    /// Decode a request from a JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| PickerError::InvalidRequest(e.to_string()))
    }

    /// Action name of the request
    pub fn action(&self) -> &'static str {
        match self {
            Request::StartSelection { .. } => "startSelection",
            Request::StopSelection => "stopSelection",
            Request::GetSelections => "getSelections",
            Request::ClearSelections => "clearSelections",
            Request::ExportData => "exportData",
            Request::RemoveSelection { .. } => "removeSelection",
            Request::PickElement { .. } => "pickElement",
            Request::ConfirmSelection { .. } => "confirmSelection",
            Request::CancelSelection => "cancelSelection",
            Request::HideSelectionModal => "hideSelectionModal",
        }
    }

    /// Confirmation choices carried by a `confirmSelection` request
    pub fn choices(&self) -> Option<CaptureChoices> {
        match self {
            Request::ConfirmSelection {
                keep_text,
                attributes,
                children,
            } => Some(CaptureChoices {
                keep_text: *keep_text,
                attributes: attributes.clone(),
                children: children.clone(),
            }),
            _ => None,
        }
    }
}

impl From<CaptureChoices> for Request {
    fn from(choices: CaptureChoices) -> Self {
        Request::ConfirmSelection {
            keep_text: choices.keep_text,
            attributes: choices.attributes,
            children: choices.children,
        }
    }
}

/// Reply to a [`Request`]
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Response {
    /// Request handled, nothing to return
    Ack {},
    /// Saved selections
    Selections(Vec<SelectionRecord>),
    /// Export document
    Export(ExportDocument),
    /// Outcome of a removal
    Removed { success: bool },
    /// Confirmation view of a clicked element
    Draft(Box<CaptureDraft>),
    /// The record that was just saved
    Saved(Box<SelectionRecord>),
}

impl Response {
    /// Serialize the response as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Delivers requests to a page agent
pub trait Transport {
    /// Send one request and wait for its response
    fn send(&mut self, request: Request) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, request: Request) -> Result<Response> {
        (**self).send(request)
    }
}

/// Transport with no receiving end, as on pages that cannot host an agent
#[derive(Debug, Clone, Default)]
pub struct Disconnected;

impl Transport for Disconnected {
    fn send(&mut self, request: Request) -> Result<Response> {
        Err(PickerError::NoReceiver(format!(
            "Could not establish connection for '{}'",
            request.action()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_actions() {
        assert_eq!(
            Request::from_json(r#"{"action": "startSelection", "label": "price"}"#).unwrap(),
            Request::StartSelection {
                label: "price".to_string()
            }
        );
        assert_eq!(
            Request::from_json(r#"{"action": "stopSelection"}"#).unwrap(),
            Request::StopSelection
        );
        assert_eq!(
            Request::from_json(r#"{"action": "removeSelection", "label": "x"}"#).unwrap(),
            Request::RemoveSelection { label: "x".to_string() }
        );
    }

    #[test]
    fn test_decode_pick_targets() {
        let request = Request::from_value(json!({"action": "pickElement", "target": {"index": 4}})).unwrap();
        assert_eq!(
            request,
            Request::PickElement {
                target: ElementTarget::Index { index: 4 }
            }
        );

        let request = Request::from_value(json!({"action": "pickElement", "target": {"selector": "p.note"}})).unwrap();
        assert_eq!(
            request,
            Request::PickElement {
                target: ElementTarget::Css {
                    selector: "p.note".to_string()
                }
            }
        );
    }

    #[test]
    fn test_decode_confirm_with_defaults() {
        let request = Request::from_value(json!({"action": "confirmSelection", "keepText": true})).unwrap();
        assert_eq!(
            request.choices().unwrap(),
            CaptureChoices {
                keep_text: true,
                attributes: Vec::new(),
                children: Vec::new(),
            }
        );
    }

    #[test]
    fn test_invalid_action() {
        let err = Request::from_json(r#"{"action": "launchRockets"}"#).unwrap_err();
        assert!(matches!(err, PickerError::InvalidRequest(_)));

        let err = Request::from_json(r#"{"label": "x"}"#).unwrap_err();
        assert!(matches!(err, PickerError::InvalidRequest(_)));
    }

    #[test]
    fn test_encode_request() {
        let json = serde_json::to_value(Request::from(CaptureChoices {
            keep_text: false,
            attributes: vec!["href".to_string()],
            children: vec![0],
        }))
        .unwrap();
        assert_eq!(
            json,
            json!({"action": "confirmSelection", "keepText": false, "attributes": ["href"], "children": [0]})
        );
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(serde_json::to_value(Response::Ack {}).unwrap(), json!({}));
        assert_eq!(
            serde_json::to_value(Response::Removed { success: true }).unwrap(),
            json!({"success": true})
        );
        assert_eq!(serde_json::to_value(Response::Selections(Vec::new())).unwrap(), json!([]));
    }

    #[test]
    fn test_disconnected_transport() {
        let err = Disconnected.send(Request::GetSelections).unwrap_err();
        assert!(matches!(err, PickerError::NoReceiver(_)));
        assert!(err.to_string().contains("getSelections"));
    }
}
