//! Per-tab page agent.
//!
//! A [`PageAgent`] owns the page tree, the tab's [`SelectionStore`] and the
//! [`PickSession`]. It answers [`Request`]s one at a time and writes the
//! tab's export document to [`Storage`] after every change.

use crate::dom::{DomTree, NodeId, NodeRef, select_first};
use crate::error::{PickerError, Result};
use crate::messaging::{ElementTarget, Request, Response, Transport};
use crate::selection::{CaptureChoices, CaptureDraft, ExportDocument, PickSession, SelectionRecord, SelectionStore};
use crate::storage::{Storage, tab_key};
use chrono::Utc;
use std::sync::Arc;

/// Agent for one tab
pub struct PageAgent {
    url: String,
    tree: DomTree,
    store: SelectionStore,
    session: PickSession,
    storage: Arc<dyn Storage>,
    key: String,
}

impl std::fmt::Debug for PageAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageAgent")
            .field("url", &self.url)
            .field("key", &self.key)
            .field("elements", &self.tree.len())
            .field("selections", &self.store.len())
            .field("session", &self.session)
            .finish()
    }
}

impl PageAgent {
    /// Start an agent on a page, seeding its store from the tab's saved data
    pub fn new(url: impl Into<String>, tree: DomTree, tab: &str, storage: Arc<dyn Storage>) -> Result<Self> {
        let url = url.into();
        let key = tab_key(tab);

        let store = match storage.get(&key)? {
            Some(document) => {
                if document.url != url {
                    log::debug!("Stored selections for {} were taken on {}", key, document.url);
                }
                SelectionStore::from_records(document.selections)
            }
            None => SelectionStore::new(),
        };
        log::info!("Page agent ready on {} ({} saved selections)", url, store.len());

        Ok(Self {
            url,
            tree,
            store,
            session: PickSession::new(),
            storage,
            key,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Mutable access to the tree, e.g. to attach live markup
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn session(&self) -> &PickSession {
        &self.session
    }

    /// Storage key of the agent's tab
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Swap in a freshly loaded page; saved selections are kept
    pub fn replace_page(&mut self, url: impl Into<String>, tree: DomTree) {
        self.url = url.into();
        self.tree = tree;
        self.session.stop();
    }

    /// Answer one request
    pub fn handle(&mut self, request: Request) -> Result<Response> {
        log::debug!("Handling '{}'", request.action());
        match request {
            Request::StartSelection { label } => {
                self.start_selection(label);
                Ok(Response::Ack {})
            }
            Request::StopSelection => {
                self.stop_selection();
                Ok(Response::Ack {})
            }
            Request::GetSelections => Ok(Response::Selections(self.store.to_vec())),
            Request::ClearSelections => {
                self.clear();
                Ok(Response::Ack {})
            }
            Request::ExportData => Ok(Response::Export(self.export())),
            Request::RemoveSelection { label } => Ok(Response::Removed {
                success: self.remove(&label),
            }),
            Request::PickElement { target } => {
                let draft = self.pick(&target)?;
                Ok(Response::Draft(Box::new(draft.clone())))
            }
            request @ Request::ConfirmSelection { .. } => {
                let choices = request.choices().unwrap_or_default();
                let record = self.confirm(&choices)?;
                Ok(Response::Saved(Box::new(record)))
            }
            Request::CancelSelection => {
                self.cancel();
                Ok(Response::Ack {})
            }
            Request::HideSelectionModal => {
                self.hide_selection_modal();
                Ok(Response::Ack {})
            }
        }
    }

    /// Enter picking mode; ignored while a session is already active
    pub fn start_selection(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        let started = self.session.begin_pick(label.as_str());
        if started {
            log::info!("Picking element for '{}'", label);
        } else {
            log::debug!("Ignoring start of '{}': a session is already active", label);
        }
        started
    }

    /// Leave picking mode, discarding any open confirmation view
    pub fn stop_selection(&mut self) {
        self.session.stop();
    }

    /// Resolve an element target against the page tree
    pub fn resolve(&self, target: &ElementTarget) -> Result<NodeRef<'_>> {
        Self::resolve_in(&self.tree, target)
    }

    /// Move the hover outline to an element
    pub fn hover(&mut self, target: &ElementTarget) -> Result<NodeId> {
        let id = self.resolve(target)?.id();
        self.session.hover(id);
        Ok(id)
    }

    /// Click an element: opens its confirmation view
    pub fn pick(&mut self, target: &ElementTarget) -> Result<&CaptureDraft> {
        let node = Self::resolve_in(&self.tree, target)?;
        self.session.element_clicked(node)
    }

    /// Save the clicked element with the given choices and end the session
    pub fn confirm(&mut self, choices: &CaptureChoices) -> Result<SelectionRecord> {
        self.session
            .draft_mut()
            .ok_or(PickerError::NothingToConfirm)?
            .apply(choices)?;
        let record = self.session.confirm(Utc::now())?;

        if let Some(previous) = self.store.save(record.clone()) {
            log::debug!("Replaced selection '{}' at {}", previous.label, previous.identifier_path);
        }
        log::info!("Saved selection '{}' as {}", record.label, record.selector);
        self.persist();
        Ok(record)
    }

    /// Discard the clicked element and end the session
    pub fn cancel(&mut self) {
        if !self.session.cancel() {
            self.session.stop();
        }
    }

    /// Close the confirmation view and keep picking
    pub fn hide_selection_modal(&mut self) {
        self.session.hide_draft();
    }

    /// Saved selections in insertion order
    pub fn selections(&self) -> Vec<SelectionRecord> {
        self.store.to_vec()
    }

    /// Delete the first selection carrying `label`
    pub fn remove(&mut self, label: &str) -> bool {
        let removed = self.store.remove_by_label(label).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// Delete every selection of the tab
    pub fn clear(&mut self) {
        self.store.clear();
        self.persist();
    }

    /// Export document of the tab
    pub fn export(&self) -> ExportDocument {
        self.store.export(&self.url)
    }

    fn resolve_in<'a>(tree: &'a DomTree, target: &ElementTarget) -> Result<NodeRef<'a>> {
        match target {
            ElementTarget::Index { index } => tree
                .get(NodeId(*index))
                .ok_or_else(|| PickerError::ElementNotFound(format!("index {}", index))),
            ElementTarget::Path { path } => tree
                .find_by_identifier_path(path)
                .ok_or_else(|| PickerError::ElementNotFound(format!("path '{}'", path))),
            ElementTarget::Css { selector } => select_first(tree, selector)?
                .ok_or_else(|| PickerError::ElementNotFound(format!("selector '{}'", selector))),
        }
    }

    // Storage failures are logged; the in-memory store stays authoritative.
    fn persist(&self) {
        if let Err(e) = self.storage.put(&self.key, &self.export()) {
            log::warn!("Failed to persist selections for {}: {}", self.key, e);
        }
    }
}

impl Transport for PageAgent {
    fn send(&mut self, request: Request) -> Result<Response> {
        self.handle(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementNode;
    use crate::storage::MemoryStorage;

    fn page() -> DomTree {
        DomTree::new(
            ElementNode::new("body")
                .with_child(
                    ElementNode::new("div")
                        .with_id("main")
                        .with_child(ElementNode::new("h1").with_text("Products"))
                        .with_child(
                            ElementNode::new("a")
                                .with_attribute("href", "/item/1")
                                .with_class("link")
                                .with_text("First"),
                        ),
                )
                .with_child(ElementNode::new("p").with_text("Footer")),
        )
    }

    fn agent(storage: Arc<dyn Storage>) -> PageAgent {
        PageAgent::new("https://shop.example", page(), "7", storage).unwrap()
    }

    fn pick_and_confirm(agent: &mut PageAgent, label: &str, target: ElementTarget, choices: CaptureChoices) -> SelectionRecord {
        agent.handle(Request::StartSelection { label: label.to_string() }).unwrap();
        agent.handle(Request::PickElement { target }).unwrap();
        match agent.handle(Request::from(choices)).unwrap() {
            Response::Saved(record) => *record,
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_pick_confirm_persists() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut agent = agent(storage.clone());

        let record = pick_and_confirm(
            &mut agent,
            "link",
            ElementTarget::Css {
                selector: "a.link".to_string(),
            },
            CaptureChoices {
                keep_text: true,
                attributes: vec!["href".to_string()],
                children: Vec::new(),
            },
        );

        assert_eq!(record.selector, "div#main > a.link");
        assert_eq!(record.value.as_deref(), Some("First"));
        assert_eq!(record.attributes.get("href").map(String::as_str), Some("/item/1"));
        assert!(!agent.session().is_picking());

        let stored = storage.get("page_7").unwrap().unwrap();
        assert_eq!(stored.url, "https://shop.example");
        assert_eq!(stored.selections, vec![record]);
    }

    #[test]
    fn test_agent_seeds_from_storage() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        {
            let mut first = agent(storage.clone());
            pick_and_confirm(
                &mut first,
                "footer",
                ElementTarget::Index { index: 4 },
                CaptureChoices::default(),
            );
        }

        let second = agent(storage.clone());
        assert_eq!(second.store().labels(), vec!["footer"]);

        let other_tab = PageAgent::new("https://shop.example", page(), "8", storage).unwrap();
        assert!(other_tab.store().is_empty());
    }

    #[test]
    fn test_get_and_export() {
        let mut agent = agent(Arc::new(MemoryStorage::new()));
        assert_eq!(agent.handle(Request::GetSelections).unwrap(), Response::Selections(Vec::new()));

        match agent.handle(Request::ExportData).unwrap() {
            Response::Export(document) => {
                assert_eq!(document.url, "https://shop.example");
                assert!(document.selections.is_empty());
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_remove_and_clear() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut agent = agent(storage.clone());
        pick_and_confirm(&mut agent, "title", ElementTarget::Index { index: 2 }, CaptureChoices::default());
        pick_and_confirm(&mut agent, "footer", ElementTarget::Index { index: 4 }, CaptureChoices::default());

        let response = agent
            .handle(Request::RemoveSelection {
                label: "title".to_string(),
            })
            .unwrap();
        assert_eq!(response, Response::Removed { success: true });
        assert_eq!(agent.store().labels(), vec!["footer"]);

        let response = agent
            .handle(Request::RemoveSelection {
                label: "missing".to_string(),
            })
            .unwrap();
        assert_eq!(response, Response::Removed { success: false });

        agent.handle(Request::ClearSelections).unwrap();
        assert!(agent.store().is_empty());
        assert!(storage.get("page_7").unwrap().unwrap().selections.is_empty());
    }

    #[test]
    fn test_pick_requires_start() {
        let mut agent = agent(Arc::new(MemoryStorage::new()));
        let err = agent
            .handle(Request::PickElement {
                target: ElementTarget::Index { index: 1 },
            })
            .unwrap_err();
        assert!(matches!(err, PickerError::NotPicking));

        let err = agent.handle(Request::from(CaptureChoices::default())).unwrap_err();
        assert!(matches!(err, PickerError::NothingToConfirm));
    }

    #[test]
    fn test_unknown_targets() {
        let mut agent = agent(Arc::new(MemoryStorage::new()));
        agent.start_selection("x");

        for target in [
            ElementTarget::Index { index: 99 },
            ElementTarget::Path {
                path: "table:nth-child(1)".to_string(),
            },
            ElementTarget::Css {
                selector: "section".to_string(),
            },
        ] {
            assert!(matches!(agent.pick(&target), Err(PickerError::ElementNotFound(_))));
        }
        assert!(matches!(
            agent.pick(&ElementTarget::Css {
                selector: "a[href]".to_string()
            }),
            Err(PickerError::UnsupportedSelector(_))
        ));
    }

    #[test]
    fn test_bad_choice_keeps_draft_open() {
        let mut agent = agent(Arc::new(MemoryStorage::new()));
        agent.start_selection("title");
        agent.pick(&ElementTarget::Index { index: 2 }).unwrap();

        let err = agent
            .confirm(&CaptureChoices {
                keep_text: false,
                attributes: vec!["href".to_string()],
                children: Vec::new(),
            })
            .unwrap_err();
        assert!(matches!(err, PickerError::UnknownOption(_)));
        assert!(agent.session().draft().is_some());
        assert!(agent.store().is_empty());
    }

    #[test]
    fn test_hide_then_cancel() {
        let mut agent = agent(Arc::new(MemoryStorage::new()));
        agent.handle(Request::StartSelection { label: "x".to_string() }).unwrap();
        agent
            .handle(Request::PickElement {
                target: ElementTarget::Path {
                    path: "p:nth-child(2)".to_string(),
                },
            })
            .unwrap();

        agent.handle(Request::HideSelectionModal).unwrap();
        assert!(agent.session().is_picking());
        assert!(agent.session().draft().is_none());

        agent.handle(Request::CancelSelection).unwrap();
        assert!(!agent.session().is_picking());
    }

    #[test]
    fn test_start_is_ignored_while_picking() {
        let mut agent = agent(Arc::new(MemoryStorage::new()));
        assert!(agent.start_selection("first"));
        assert!(!agent.start_selection("second"));
        assert_eq!(agent.session().label(), Some("first"));

        agent.handle(Request::StopSelection).unwrap();
        assert!(!agent.session().is_picking());
    }

    #[test]
    fn test_hover_tracks_node() {
        let mut agent = agent(Arc::new(MemoryStorage::new()));
        agent.start_selection("x");
        let id = agent.hover(&ElementTarget::Index { index: 3 }).unwrap();
        assert_eq!(agent.session().hovered(), Some(id));
    }
}
