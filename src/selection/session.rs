use crate::dom::{NodeId, NodeRef};
use crate::error::{PickerError, Result};
use crate::selection::capture::CaptureDraft;
use crate::selection::record::SelectionRecord;
use chrono::{DateTime, Utc};

/// State of a picking session
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PickState {
    /// No picking in progress
    #[default]
    Idle,
    /// Waiting for the user to click an element
    Picking { label: String },
    /// An element was clicked and its confirmation view is open
    Confirming { label: String, draft: CaptureDraft },
}

/// Picking session of one tab
#[derive(Debug, Clone, Default)]
pub struct PickSession {
    state: PickState,
    hovered: Option<NodeId>,
}

impl PickSession {
    /// Create an idle session
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> &PickState {
        &self.state
    }

    /// Whether a picking session is active (picking or confirming)
    pub fn is_picking(&self) -> bool {
        !matches!(self.state, PickState::Idle)
    }

    /// Label of the active session
    pub fn label(&self) -> Option<&str> {
        match &self.state {
            PickState::Idle => None,
            PickState::Picking { label } | PickState::Confirming { label, .. } => Some(label),
        }
    }

    /// Open confirmation view
    pub fn draft(&self) -> Option<&CaptureDraft> {
        match &self.state {
            PickState::Confirming { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Open confirmation view, mutably
    pub fn draft_mut(&mut self) -> Option<&mut CaptureDraft> {
        match &mut self.state {
            PickState::Confirming { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Element currently under the pointer
    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    /// Start picking elements for `label`.
    ///
    /// Returns false and leaves the session untouched if one is already active.
    pub fn begin_pick(&mut self, label: impl Into<String>) -> bool {
        if self.is_picking() {
            return false;
        }
        self.state = PickState::Picking { label: label.into() };
        true
    }

    /// Track the element under the pointer while picking
    pub fn hover(&mut self, node: NodeId) {
        if self.is_picking() {
            self.hovered = Some(node);
        }
    }

    /// Clear the hover target
    pub fn unhover(&mut self) {
        self.hovered = None;
    }

    /// Open the confirmation view for a clicked element.
    ///
    /// A click while a view is already open replaces it.
    pub fn element_clicked(&mut self, node: NodeRef<'_>) -> Result<&CaptureDraft> {
        let label = self.label().ok_or(PickerError::NotPicking)?.to_string();
        let draft = CaptureDraft::open(node);
        log::debug!("Element clicked for '{}': {}", label, draft.identifier_path);

        self.state = PickState::Confirming { label, draft };
        self.draft().ok_or(PickerError::NothingToConfirm)
    }

    /// Close the confirmation view and keep picking
    pub fn hide_draft(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            PickState::Confirming { label, .. } => {
                self.state = PickState::Picking { label };
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    /// Discard the confirmation view and end the session
    pub fn cancel(&mut self) -> bool {
        if matches!(self.state, PickState::Confirming { .. }) {
            self.state = PickState::Idle;
            self.hovered = None;
            true
        } else {
            false
        }
    }

    /// Turn the open confirmation view into a record and end the session
    pub fn confirm(&mut self, timestamp: DateTime<Utc>) -> Result<SelectionRecord> {
        match std::mem::take(&mut self.state) {
            PickState::Confirming { label, draft } => {
                self.hovered = None;
                Ok(draft.confirm(&label, timestamp))
            }
            other => {
                self.state = other;
                Err(PickerError::NothingToConfirm)
            }
        }
    }

    /// End the session from any state
    pub fn stop(&mut self) {
        self.state = PickState::Idle;
        self.hovered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomTree, ElementNode};

    fn tree() -> DomTree {
        DomTree::new(
            ElementNode::new("body")
                .with_child(ElementNode::new("h1").with_text("Title"))
                .with_child(ElementNode::new("p").with_text("Body")),
        )
    }

    #[test]
    fn test_full_pick_cycle() {
        let tree = tree();
        let mut session = PickSession::new();
        assert!(session.begin_pick("title"));
        assert_eq!(session.label(), Some("title"));

        session.element_clicked(tree.get(NodeId(1)).unwrap()).unwrap();
        assert!(matches!(session.state(), PickState::Confirming { .. }));

        session.draft_mut().unwrap().check_value(true).unwrap();
        let record = session.confirm(Utc::now()).unwrap();

        assert_eq!(record.label, "title");
        assert_eq!(record.value.as_deref(), Some("Title"));
        assert_eq!(session.state(), &PickState::Idle);
    }

    #[test]
    fn test_begin_pick_is_ignored_while_active() {
        let mut session = PickSession::new();
        assert!(session.begin_pick("first"));
        assert!(!session.begin_pick("second"));
        assert_eq!(session.label(), Some("first"));
    }

    #[test]
    fn test_click_requires_active_session() {
        let tree = tree();
        let mut session = PickSession::new();
        let err = session.element_clicked(tree.get(NodeId(1)).unwrap()).unwrap_err();
        assert!(matches!(err, PickerError::NotPicking));
    }

    #[test]
    fn test_second_click_replaces_draft() {
        let tree = tree();
        let mut session = PickSession::new();
        session.begin_pick("thing");
        session.element_clicked(tree.get(NodeId(1)).unwrap()).unwrap();
        session.element_clicked(tree.get(NodeId(2)).unwrap()).unwrap();

        assert_eq!(session.draft().unwrap().tag_name, "p");
        assert_eq!(session.label(), Some("thing"));
    }

    #[test]
    fn test_hide_draft_keeps_picking() {
        let tree = tree();
        let mut session = PickSession::new();
        assert!(!session.hide_draft());

        session.begin_pick("thing");
        session.element_clicked(tree.get(NodeId(1)).unwrap()).unwrap();
        assert!(session.hide_draft());
        assert_eq!(
            session.state(),
            &PickState::Picking {
                label: "thing".to_string()
            }
        );
    }

    #[test]
    fn test_cancel_ends_session() {
        let tree = tree();
        let mut session = PickSession::new();
        session.begin_pick("thing");
        assert!(!session.cancel());

        session.element_clicked(tree.get(NodeId(1)).unwrap()).unwrap();
        assert!(session.cancel());
        assert!(!session.is_picking());
        assert!(matches!(session.confirm(Utc::now()), Err(PickerError::NothingToConfirm)));
    }

    #[test]
    fn test_confirm_without_draft_keeps_state() {
        let mut session = PickSession::new();
        session.begin_pick("thing");
        assert!(session.confirm(Utc::now()).is_err());
        assert_eq!(session.label(), Some("thing"));
    }

    #[test]
    fn test_hover_only_while_picking() {
        let mut session = PickSession::new();
        session.hover(NodeId(1));
        assert_eq!(session.hovered(), None);

        session.begin_pick("thing");
        session.hover(NodeId(2));
        assert_eq!(session.hovered(), Some(NodeId(2)));
        session.unhover();
        assert_eq!(session.hovered(), None);

        session.hover(NodeId(1));
        session.stop();
        assert_eq!(session.hovered(), None);
        assert!(!session.is_picking());
    }
}
