use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One saved, labelled element of a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRecord {
    /// Identifier path of the element; the key of the record
    #[serde(rename = "id", alias = "identifierPath")]
    pub identifier_path: String,

    /// User-supplied label, unique per page
    pub label: String,

    /// CSS selector used to re-locate the element
    pub selector: String,

    /// Lowercase tag name
    pub tag_name: String,

    /// Trimmed text content at capture time
    pub text: String,

    /// Serialized markup at capture time
    #[serde(default)]
    pub html: String,

    /// Text content the user chose to keep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Attributes the user chose to keep
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Direct children the user chose to keep
    #[serde(default)]
    pub children: Vec<ChildSnapshot>,

    /// Capture time
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of a kept direct child
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChildSnapshot {
    /// 0-based position among the element's children
    pub index: usize,
    pub tag_name: String,
    pub text: String,
}

/// Exported selections of a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportDocument {
    /// Page the selections were made on
    pub url: String,

    /// Export time
    pub timestamp: DateTime<Utc>,

    /// Saved selections in insertion order
    #[serde(default)]
    pub selections: Vec<SelectionRecord>,
}

impl ExportDocument {
    /// Create an export stamped with the current time
    pub fn new(url: impl Into<String>, selections: Vec<SelectionRecord>) -> Self {
        Self::at(url, Utc::now(), selections)
    }

    /// Create an export with an explicit timestamp
    pub fn at(url: impl Into<String>, timestamp: DateTime<Utc>, selections: Vec<SelectionRecord>) -> Self {
        Self {
            url: url.into(),
            timestamp,
            selections,
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Download file name for this export
    pub fn file_name(&self) -> String {
        format!("web-scraper-data-{}.json", self.timestamp.timestamp_millis())
    }
}
