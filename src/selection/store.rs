use crate::selection::record::{ExportDocument, SelectionRecord};
use indexmap::IndexMap;

/// Saved selections of one tab, keyed by identifier path in insertion order
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    records: IndexMap<String, SelectionRecord>,
}

impl SelectionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from previously persisted records
    pub fn from_records(records: impl IntoIterator<Item = SelectionRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.save(record);
        }
        store
    }

    /// Save a record under its identifier path.
    ///
    /// A record already stored under the same path is replaced in place and
    /// returned.
    pub fn save(&mut self, record: SelectionRecord) -> Option<SelectionRecord> {
        self.records.insert(record.identifier_path.clone(), record)
    }

    /// Get a record by identifier path
    pub fn get(&self, identifier_path: &str) -> Option<&SelectionRecord> {
        self.records.get(identifier_path)
    }

    /// Find the first record with a label
    pub fn find_by_label(&self, label: &str) -> Option<&SelectionRecord> {
        self.records.values().find(|record| record.label == label)
    }

    /// Check whether a label is already in use
    pub fn contains_label(&self, label: &str) -> bool {
        self.find_by_label(label).is_some()
    }

    /// Remove the first record with a label, keeping the order of the rest
    pub fn remove_by_label(&mut self, label: &str) -> Option<SelectionRecord> {
        let index = self.records.values().position(|record| record.label == label)?;
        self.records.shift_remove_index(index).map(|(_, record)| record)
    }

    /// Remove all records
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of saved records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &SelectionRecord> {
        self.records.values()
    }

    /// Labels in insertion order
    pub fn labels(&self) -> Vec<&str> {
        self.records.values().map(|record| record.label.as_str()).collect()
    }

    /// Owned copy of all records in insertion order
    pub fn to_vec(&self) -> Vec<SelectionRecord> {
        self.records.values().cloned().collect()
    }

    /// Export the store for a page, stamped with the current time
    pub fn export(&self, url: &str) -> ExportDocument {
        ExportDocument::new(url, self.to_vec())
    }
}
