//! MCP (Model Context Protocol) server for element picking
//!
//! Every tool forwards to the page agent of the loaded page; user-facing
//! actions (starting a selection, exporting, generating code) go through the
//! same [`Controller`] checks as the CLI.

pub mod handler;
pub use handler::{PickerServer, PickerState, SNAPSHOT_TAB};

use crate::browser::highlight::{Highlight, HighlightStyle, to_base64};
use crate::controller::{Artifact, Controller, Status};
use crate::dom::{DomTree, NodeId};
use crate::error::PickerError;
use crate::messaging::{ElementTarget, Request, Response};
use crate::selection::CaptureChoices;
use rmcp::{ErrorData as McpError,
           handler::server::wrapper::Parameters,
           model::{CallToolResult, Content},
           tool,
           tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Open page parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OpenPageParams {
    /// URL to open in the browser
    pub url: String,
    /// Tab id to store selections under (default: the browser's tab id)
    #[serde(default)]
    pub tab: Option<String>,
}

/// Load snapshot parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoadSnapshotParams {
    /// Path of a DOM snapshot JSON file
    #[serde(default)]
    pub path: Option<String>,
    /// Inline DOM snapshot JSON
    #[serde(default)]
    pub json: Option<String>,
    /// URL the snapshot was taken from
    pub url: String,
    /// Tab id to store selections under (default: "snapshot")
    #[serde(default)]
    pub tab: Option<String>,
}

/// List elements parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListElementsParams {
    /// Only list elements with a non-empty bounding box
    #[serde(default)]
    pub visible_only: bool,
    /// Maximum number of elements to return
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Label parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LabelParams {
    /// Selection label
    pub label: String,
}

/// Pick element parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PickElementParams {
    /// Element index from list_elements
    #[serde(default)]
    pub index: Option<usize>,
    /// Identifier path of the element
    #[serde(default)]
    pub path: Option<String>,
    /// CSS selector; the first match is picked
    #[serde(default)]
    pub selector: Option<String>,
}

impl PickElementParams {
    fn target(self) -> Option<ElementTarget> {
        if let Some(index) = self.index {
            Some(ElementTarget::Index { index })
        } else if let Some(path) = self.path {
            Some(ElementTarget::Path { path })
        } else {
            self.selector.map(|selector| ElementTarget::Css { selector })
        }
    }
}

/// Highlight parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct HighlightParams {
    /// Element index to outline as hovered
    #[serde(default)]
    pub hovered_index: Option<usize>,
}

/// Map a crate error to an MCP error
fn to_mcp(err: PickerError) -> McpError {
    match err {
        PickerError::InvalidRequest(_)
        | PickerError::ElementNotFound(_)
        | PickerError::UnsupportedSelector(_)
        | PickerError::UnknownOption(_)
        | PickerError::NotPicking
        | PickerError::NothingToConfirm
        | PickerError::NoPage => McpError::invalid_params(err.to_string(), None),
        _ => McpError::internal_error(err.to_string(), None),
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn status_result(status: Status) -> Result<CallToolResult, McpError> {
    if status.is_success() {
        Ok(CallToolResult::success(vec![Content::text(status.message)]))
    } else {
        Err(McpError::invalid_params(status.message, None))
    }
}

fn artifact_result(outcome: (Status, Option<Artifact>)) -> Result<CallToolResult, McpError> {
    match outcome {
        (status, Some(artifact)) if status.is_success() => Ok(CallToolResult::success(vec![
            Content::text(format!("{}: {}", status.message, artifact.file_name)),
            Content::text(artifact.contents),
        ])),
        (status, _) => status_result(Status::error(status.message)),
    }
}

fn page_summary(url: &str, tree: &DomTree, selections: usize) -> String {
    format!("Loaded {}: {} elements, {} saved selections", url, tree.len(), selections)
}

#[tool_router]
impl PickerServer {
    /// Open a live page
    #[tool(description = "Open a URL in the browser and capture its elements for picking")]
    fn open_page(&self, params: Parameters<OpenPageParams>) -> Result<CallToolResult, McpError> {
        let mut state = self.state()?;
        let browser = state.browser().map_err(to_mcp)?;

        browser.open(&params.0.url).map_err(to_mcp)?;
        let tree = browser.snapshot().map_err(to_mcp)?;
        let url = browser.url().map_err(to_mcp)?;
        let tab = match params.0.tab {
            Some(tab) => tab,
            None => browser.tab_id().map_err(to_mcp)?,
        };

        let agent = state.load_page(url, tree, &tab, true).map_err(to_mcp)?;
        let summary = page_summary(agent.url(), agent.tree(), agent.store().len());
        Ok(CallToolResult::success(vec![Content::text(summary)]))
    }

    /// Load a saved DOM snapshot
    #[tool(description = "Load a DOM snapshot (JSON file path or inline JSON) as the current page")]
    fn load_snapshot(&self, params: Parameters<LoadSnapshotParams>) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let json = match (params.json, params.path) {
            (Some(json), _) => json,
            (None, Some(path)) => std::fs::read_to_string(&path)
                .map_err(|e| McpError::invalid_params(format!("Failed to read {}: {}", path, e), None))?,
            (None, None) => return Err(McpError::invalid_params("Either path or json must be provided", None)),
        };
        let tree = DomTree::from_json(&json).map_err(to_mcp)?;
        let tab = params.tab.unwrap_or_else(|| SNAPSHOT_TAB.to_string());

        let mut state = self.state()?;
        let agent = state.load_page(params.url, tree, &tab, false).map_err(to_mcp)?;
        let summary = page_summary(agent.url(), agent.tree(), agent.store().len());
        Ok(CallToolResult::success(vec![Content::text(summary)]))
    }

    /// List pickable elements
    #[tool(description = "List the elements of the current page with their index, selector and identifier path")]
    fn list_elements(&self, params: Parameters<ListElementsParams>) -> Result<CallToolResult, McpError> {
        let state = self.state()?;
        let tree = state.agent().map_err(to_mcp)?.tree();

        let elements: Vec<serde_json::Value> = tree
            .selector_map
            .iter()
            .filter(|(id, _)| !params.0.visible_only || tree.get(**id).is_some_and(|node| node.is_visible()))
            .take(params.0.limit.unwrap_or(usize::MAX))
            .map(|(id, selector)| {
                serde_json::json!({
                    "index": id.0,
                    "tagName": selector.tag_name,
                    "selector": selector.css_selector,
                    "path": selector.identifier_path,
                    "text": selector.text,
                })
            })
            .collect();

        json_result(&elements)
    }

    /// Start picking for a label
    #[tool(description = "Start selection mode for a new, unique label")]
    fn start_selection(&self, params: Parameters<LabelParams>) -> Result<CallToolResult, McpError> {
        let mut state = self.state()?;
        let agent = state.agent_mut().map_err(to_mcp)?;
        status_result(Controller::new(agent).start_selection(&params.0.label))
    }

    /// Stop picking
    #[tool(description = "Stop selection mode")]
    fn stop_selection(&self) -> Result<CallToolResult, McpError> {
        let mut state = self.state()?;
        let agent = state.agent_mut().map_err(to_mcp)?;
        status_result(Controller::new(agent).stop_selection())
    }

    /// Click an element
    #[tool(description = "Pick an element by index, identifier path or CSS selector and show its capture options")]
    fn pick_element(&self, params: Parameters<PickElementParams>) -> Result<CallToolResult, McpError> {
        let target = params
            .0
            .target()
            .ok_or_else(|| McpError::invalid_params("One of index, path or selector must be provided", None))?;

        let mut state = self.state()?;
        let (browser, agent) = state.browser_and_agent().map_err(to_mcp)?;

        if let Some(browser) = browser {
            let id = agent.resolve(&target).map_err(to_mcp)?.id();
            if let Err(e) = browser.capture_html(agent.tree_mut(), id) {
                log::debug!("Keeping snapshot markup for element {}: {}", id.0, e);
            }
        }

        match agent.handle(Request::PickElement { target }).map_err(to_mcp)? {
            Response::Draft(draft) => json_result(&draft),
            other => json_result(&other),
        }
    }

    /// Save the picked element
    #[tool(description = "Save the picked element, keeping its text, the named attributes and the listed children")]
    fn confirm_selection(&self, params: Parameters<CaptureChoices>) -> Result<CallToolResult, McpError> {
        let mut state = self.state()?;
        let agent = state.agent_mut().map_err(to_mcp)?;
        let response = agent.handle(Request::from(params.0)).map_err(to_mcp)?;
        json_result(&response)
    }

    /// Discard the picked element
    #[tool(description = "Discard the picked element and leave selection mode")]
    fn cancel_selection(&self) -> Result<CallToolResult, McpError> {
        let mut state = self.state()?;
        let agent = state.agent_mut().map_err(to_mcp)?;
        agent.handle(Request::CancelSelection).map_err(to_mcp)?;
        Ok(CallToolResult::success(vec![Content::text("Selection cancelled")]))
    }

    /// List saved selections
    #[tool(description = "List the saved selections of the current page")]
    fn get_selections(&self) -> Result<CallToolResult, McpError> {
        let mut state = self.state()?;
        let agent = state.agent_mut().map_err(to_mcp)?;
        json_result(&Controller::new(agent).load_selections())
    }

    /// Remove a saved selection
    #[tool(description = "Remove the saved selection with the given label")]
    fn remove_selection(&self, params: Parameters<LabelParams>) -> Result<CallToolResult, McpError> {
        let mut state = self.state()?;
        let agent = state.agent_mut().map_err(to_mcp)?;
        status_result(Controller::new(agent).remove_selection(&params.0.label))
    }

    /// Remove every saved selection
    #[tool(description = "Remove all saved selections of the current page")]
    fn clear_selections(&self) -> Result<CallToolResult, McpError> {
        let mut state = self.state()?;
        let agent = state.agent_mut().map_err(to_mcp)?;
        let status = Controller::new(agent)
            .clear_all(true)
            .unwrap_or_else(|| Status::error("Clear was not confirmed"));
        status_result(status)
    }

    /// Export selections as JSON
    #[tool(description = "Export the saved selections with the page URL as JSON")]
    fn export_data(&self) -> Result<CallToolResult, McpError> {
        let mut state = self.state()?;
        let agent = state.agent_mut().map_err(to_mcp)?;
        artifact_result(Controller::new(agent).export_data())
    }

    /// Generate a Python scraper
    #[tool(description = "Generate a Python (requests + BeautifulSoup) script that scrapes the saved selections")]
    fn generate_code(&self) -> Result<CallToolResult, McpError> {
        let mut state = self.state()?;
        let agent = state.agent_mut().map_err(to_mcp)?;
        artifact_result(Controller::new(agent).generate_code())
    }

    /// Screenshot with saved selections outlined
    #[tool(description = "Take a screenshot of the live page with saved selections outlined")]
    fn highlight_selections(&self, params: Parameters<HighlightParams>) -> Result<CallToolResult, McpError> {
        let state = self.state()?;
        let agent = state.agent().map_err(to_mcp)?;
        let browser = state
            .live_browser()
            .ok_or_else(|| McpError::invalid_params("Highlighting needs a page opened in the browser (open_page)", None))?;

        let tree = agent.tree();
        let mut highlights: Vec<Highlight> = agent
            .store()
            .iter()
            .filter_map(|record| tree.find_by_identifier_path(&record.identifier_path))
            .filter_map(|node| node.bounding_box())
            .map(Highlight::saved)
            .collect();

        let hovered = params.0.hovered_index.map(NodeId).or(agent.session().hovered());
        if let Some(bounds) = hovered.and_then(|id| tree.get(id)).and_then(|node| node.bounding_box()) {
            highlights.push(Highlight::hovered(bounds));
        }

        let png = browser.highlight(&highlights, &HighlightStyle::default()).map_err(to_mcp)?;
        Ok(CallToolResult::success(vec![
            Content::text(format!("Outlined {} elements", highlights.len())),
            Content::image(to_base64(&png), "image/png"),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::LaunchOptions;
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    const SNAPSHOT: &str = r#"{
        "tag_name": "body",
        "children": [
            {"tag_name": "h1", "text_content": "Shop", "children": []},
            {"tag_name": "a", "attributes": {"href": "/next"}, "text_content": "Next", "children": []}
        ]
    }"#;

    fn server() -> PickerServer {
        let server = PickerServer::new(LaunchOptions::default(), Arc::new(MemoryStorage::new()));
        server
            .load_snapshot(Parameters(LoadSnapshotParams {
                path: None,
                json: Some(SNAPSHOT.to_string()),
                url: "https://shop.example".to_string(),
                tab: None,
            }))
            .unwrap();
        server
    }

    #[test]
    fn test_tools_registered() {
        let server = server();
        let names: Vec<_> = server.tool_router.list_all().into_iter().map(|tool| tool.name.to_string()).collect();
        for name in [
            "open_page",
            "load_snapshot",
            "list_elements",
            "start_selection",
            "stop_selection",
            "pick_element",
            "confirm_selection",
            "cancel_selection",
            "get_selections",
            "remove_selection",
            "clear_selections",
            "export_data",
            "generate_code",
            "highlight_selections",
        ] {
            assert!(names.contains(&name.to_string()), "missing tool {}", name);
        }
    }

    #[test]
    fn test_pick_flow_over_tools() {
        let server = server();
        server
            .start_selection(Parameters(LabelParams {
                label: "next".to_string(),
            }))
            .unwrap();
        server
            .pick_element(Parameters(PickElementParams {
                index: None,
                path: None,
                selector: Some("a".to_string()),
            }))
            .unwrap();
        server
            .confirm_selection(Parameters(CaptureChoices {
                keep_text: true,
                attributes: vec!["href".to_string()],
                children: Vec::new(),
            }))
            .unwrap();

        let state = server.state().unwrap();
        let agent = state.agent().unwrap();
        assert_eq!(agent.store().labels(), vec!["next"]);
        assert_eq!(agent.key(), "page_snapshot");
    }

    #[test]
    fn test_duplicate_label_is_rejected() {
        let server = server();
        let label = || {
            Parameters(LabelParams {
                label: "title".to_string(),
            })
        };
        server.start_selection(label()).unwrap();
        server
            .pick_element(Parameters(PickElementParams {
                index: Some(1),
                path: None,
                selector: None,
            }))
            .unwrap();
        server.confirm_selection(Parameters(CaptureChoices::default())).unwrap();

        assert!(server.start_selection(label()).is_err());
    }

    #[test]
    fn test_tools_need_a_page() {
        let server = PickerServer::new(LaunchOptions::default(), Arc::new(MemoryStorage::new()));
        assert!(server.get_selections().is_err());
        assert!(server.list_elements(Parameters(ListElementsParams::default())).is_err());
    }

    #[test]
    fn test_generate_code_without_selections_fails() {
        let server = server();
        assert!(server.generate_code().is_err());
        assert!(server.export_data().is_ok());
    }

    #[test]
    fn test_highlight_needs_live_page() {
        let server = server();
        assert!(server.highlight_selections(Parameters(HighlightParams::default())).is_err());
    }

    #[test]
    fn test_snapshot_pick_keeps_snapshot_markup() {
        let server = server();
        server
            .start_selection(Parameters(LabelParams {
                label: "title".to_string(),
            }))
            .unwrap();
        server
            .pick_element(Parameters(PickElementParams {
                index: Some(1),
                path: None,
                selector: None,
            }))
            .unwrap();
        server.confirm_selection(Parameters(CaptureChoices::default())).unwrap();

        let state = server.state().unwrap();
        assert!(!state.is_live());
        let record = state.agent().unwrap().store().iter().next().unwrap().clone();
        assert_eq!(record.html, "<h1>Shop</h1>");
    }

    #[test]
    fn test_pick_requires_target() {
        let server = server();
        let params = PickElementParams {
            index: None,
            path: None,
            selector: None,
        };
        assert!(params.clone().target().is_none());
        assert!(server.pick_element(Parameters(params)).is_err());
    }
}
