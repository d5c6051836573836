use crate::agent::PageAgent;
use crate::browser::{BrowserSession, LaunchOptions};
use crate::dom::DomTree;
use crate::error::{PickerError, Result as PickerResult};
use crate::storage::Storage;
use rmcp::{ErrorData as McpError,
           ServerHandler,
           handler::server::router::tool::ToolRouter,
           model::{Implementation, ServerCapabilities, ServerInfo},
           tool_handler};
use std::sync::{Arc, Mutex, MutexGuard};

/// Tab key used for pages loaded from snapshot files
pub const SNAPSHOT_TAB: &str = "snapshot";

/// Mutable state behind the server: the browser (launched on first use) and
/// the agent of the loaded page
pub struct PickerState {
    options: LaunchOptions,
    browser: Option<BrowserSession>,
    agent: Option<PageAgent>,
    /// Whether the agent's tree was captured from the browser's current page
    live: bool,
    storage: Arc<dyn Storage>,
}

impl PickerState {
    pub fn new(options: LaunchOptions, storage: Arc<dyn Storage>) -> Self {
        Self {
            options,
            browser: None,
            agent: None,
            live: false,
            storage,
        }
    }

    /// The browser session, launching it if needed
    pub fn browser(&mut self) -> PickerResult<&BrowserSession> {
        if self.browser.is_none() {
            self.browser = Some(BrowserSession::launch(self.options.clone())?);
        }
        self.browser
            .as_ref()
            .ok_or_else(|| PickerError::LaunchFailed("Browser unavailable".to_string()))
    }

    /// The browser session, if it is showing the loaded page
    pub fn live_browser(&self) -> Option<&BrowserSession> {
        self.browser.as_ref().filter(|_| self.live)
    }

    /// Whether the loaded page came from the browser rather than a snapshot
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn agent(&self) -> PickerResult<&PageAgent> {
        self.agent.as_ref().ok_or(PickerError::NoPage)
    }

    pub fn agent_mut(&mut self) -> PickerResult<&mut PageAgent> {
        self.agent.as_mut().ok_or(PickerError::NoPage)
    }

    /// Split borrow of the live browser and the agent
    pub fn browser_and_agent(&mut self) -> PickerResult<(Option<&BrowserSession>, &mut PageAgent)> {
        let live = self.live;
        let agent = self.agent.as_mut().ok_or(PickerError::NoPage)?;
        Ok((self.browser.as_ref().filter(|_| live), agent))
    }

    /// Point the server at a page; the agent is kept when the tab is unchanged.
    /// `live` marks a tree captured from the browser's current page.
    pub fn load_page(&mut self, url: String, tree: DomTree, tab: &str, live: bool) -> PickerResult<&PageAgent> {
        let key = crate::storage::tab_key(tab);
        match self.agent.as_mut().filter(|agent| agent.key() == key) {
            Some(agent) => agent.replace_page(url, tree),
            None => self.agent = Some(PageAgent::new(url, tree, tab, self.storage.clone())?),
        }
        self.live = live;
        self.agent()
    }
}

/// MCP server exposing element picking on a browser page
#[derive(Clone)]
pub struct PickerServer {
    state: Arc<Mutex<PickerState>>,
    pub(crate) tool_router: ToolRouter<Self>,
}

impl PickerServer {
    /// Create a server; the browser is launched when a page is first opened
    pub fn new(options: LaunchOptions, storage: Arc<dyn Storage>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PickerState::new(options, storage))),
            tool_router: Self::tool_router(),
        }
    }

    pub(crate) fn state(&self) -> std::result::Result<MutexGuard<'_, PickerState>, McpError> {
        self.state
            .lock()
            .map_err(|_| McpError::internal_error("Picker state lock poisoned", None))
    }
}

#[tool_handler]
impl ServerHandler for PickerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Pick and label elements of a web page. Open a page (open_page or load_snapshot), \
                 list its elements, then start_selection with a label, pick_element and \
                 confirm_selection. Saved selections are kept per tab and can be exported as JSON \
                 or as a Python scraping script."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementNode;
    use crate::storage::MemoryStorage;

    fn state() -> PickerState {
        PickerState::new(LaunchOptions::default(), Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_server_info() {
        let server = PickerServer::new(LaunchOptions::default(), Arc::new(MemoryStorage::new()));
        let info = server.get_info();
        assert_eq!(info.server_info.name, "scrape-picker");
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("start_selection"));
    }

    #[test]
    fn test_snapshot_replaces_live_page() {
        let mut state = state();
        let tree = || DomTree::new(ElementNode::new("body").with_child(ElementNode::new("h1")));

        state.load_page("https://a.example".to_string(), tree(), "1", true).unwrap();
        assert!(state.is_live());

        state.load_page("https://b.example".to_string(), tree(), "1", false).unwrap();
        assert!(!state.is_live());
        assert!(state.live_browser().is_none());
        let (browser, agent) = state.browser_and_agent().unwrap();
        assert!(browser.is_none());
        assert_eq!(agent.url(), "https://b.example");
    }

    #[test]
    fn test_load_page_keeps_agent_for_same_tab() {
        let mut state = state();
        let tree = || DomTree::new(ElementNode::new("body"));

        state.load_page("https://a.example".to_string(), tree(), "1", false).unwrap();
        state.load_page("https://a.example/2".to_string(), tree(), "1", false).unwrap();
        assert_eq!(state.agent().unwrap().key(), "page_1");

        state.load_page("https://a.example".to_string(), tree(), "2", false).unwrap();
        assert_eq!(state.agent().unwrap().key(), "page_2");
    }
}
