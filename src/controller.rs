//! User-facing controls for one tab.
//!
//! The [`Controller`] validates what the user typed, forwards requests to the
//! tab's page agent through a [`Transport`] and reports each outcome as a
//! [`Status`]. Failures never escape as errors: they become error statuses.

use crate::codegen::python;
use crate::error::PickerError;
use crate::messaging::{Request, Response, Transport};
use crate::selection::SelectionRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome category of a user action
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Error,
}

/// Message shown to the user after an action
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }

    fn failed(err: &PickerError) -> Self {
        Self::error(format!("Error: {}", err))
    }

    pub fn is_success(&self) -> bool {
        self.kind == StatusKind::Success
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// A file produced for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub contents: String,
}

/// File name of a generated scraping script
pub fn script_file_name(timestamp: DateTime<Utc>) -> String {
    format!("web_scraper_{}.py", timestamp.timestamp_millis())
}

/// Controls of one tab
#[derive(Debug)]
pub struct Controller<T: Transport> {
    transport: T,
    selecting: bool,
}

impl<T: Transport> Controller<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            selecting: false,
        }
    }

    /// Whether selection mode was started from this controller
    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    /// Start picking an element for `label`.
    ///
    /// The label is trimmed; empty labels and labels already in use are
    /// rejected without contacting the agent's session.
    pub fn start_selection(&mut self, label: &str) -> Status {
        let label = label.trim();
        if label.is_empty() {
            return Status::error("Please enter a label");
        }

        if self.load_selections().iter().any(|record| record.label == label) {
            return Status::error("Label already exists. Please choose a different label.");
        }

        match self.transport.send(Request::StartSelection {
            label: label.to_string(),
        }) {
            Ok(_) => {
                self.selecting = true;
                Status::success("Selection mode started")
            }
            Err(e) => Status::failed(&e),
        }
    }

    /// Leave selection mode
    pub fn stop_selection(&mut self) -> Status {
        match self.transport.send(Request::StopSelection) {
            Ok(_) => {
                self.selecting = false;
                Status::success("Selection mode stopped")
            }
            Err(e) => Status::failed(&e),
        }
    }

    /// Saved selections of the tab; anything unexpected reads as none
    pub fn load_selections(&mut self) -> Vec<SelectionRecord> {
        match self.transport.send(Request::GetSelections) {
            Ok(Response::Selections(records)) => records,
            Ok(other) => {
                log::warn!("Unexpected reply to getSelections: {:?}", other);
                Vec::new()
            }
            Err(e) => {
                log::debug!("No selections loaded: {}", e);
                Vec::new()
            }
        }
    }

    /// Delete the selection carrying `label`
    pub fn remove_selection(&mut self, label: &str) -> Status {
        match self.transport.send(Request::RemoveSelection {
            label: label.to_string(),
        }) {
            Ok(Response::Removed { success: true }) => Status::success("Selection removed"),
            Ok(_) => Status::error("Failed to remove selection"),
            Err(e) => Status::failed(&e),
        }
    }

    /// Export the tab's selections as a JSON download
    pub fn export_data(&mut self) -> (Status, Option<Artifact>) {
        let document = match self.transport.send(Request::ExportData) {
            Ok(Response::Export(document)) => document,
            Ok(other) => {
                log::warn!("Unexpected reply to exportData: {:?}", other);
                return (Status::error("Failed to export data"), None);
            }
            Err(e) => return (Status::failed(&e), None),
        };

        match document.to_json() {
            Ok(contents) => (
                Status::success("Data exported successfully"),
                Some(Artifact {
                    file_name: document.file_name(),
                    contents,
                }),
            ),
            Err(e) => (Status::failed(&e.into()), None),
        }
    }

    /// Generate a Python scraping script from the tab's selections
    pub fn generate_code(&mut self) -> (Status, Option<Artifact>) {
        let document = match self.transport.send(Request::ExportData) {
            Ok(Response::Export(document)) => document,
            Ok(_) => return (Status::error("No selections found to generate code"), None),
            Err(e) => return (Status::failed(&e), None),
        };

        if document.selections.is_empty() {
            return (Status::error("No selections found to generate code"), None);
        }

        let generated_at = Utc::now();
        let contents = python::generate(&document.selections, &document.url, generated_at);
        (
            Status::success("Python code generated successfully"),
            Some(Artifact {
                file_name: script_file_name(generated_at),
                contents,
            }),
        )
    }

    /// Delete every selection once the user has confirmed
    pub fn clear_all(&mut self, confirmed: bool) -> Option<Status> {
        if !confirmed {
            return None;
        }
        Some(match self.transport.send(Request::ClearSelections) {
            Ok(_) => Status::success("All selections cleared"),
            Err(e) => Status::failed(&e),
        })
    }

    /// Close the controls, hiding any confirmation view left open
    pub fn close(&mut self) {
        if let Err(e) = self.transport.send(Request::HideSelectionModal) {
            log::debug!("Could not hide selection view: {}", e);
        }
    }
}
