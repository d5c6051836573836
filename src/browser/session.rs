use crate::{browser::config::{ConnectionOptions, LaunchOptions},
            browser::highlight::{Highlight, HighlightStyle, highlight_png},
            dom::{DomTree, NodeId, identifier_path, path::SEGMENT_SEPARATOR},
            error::{PickerError, Result}};
use headless_chrome::{Browser, Tab, protocol::cdp::Page::CaptureScreenshotFormatOption};
use std::{ffi::OsStr, sync::Arc, time::Duration};

/// Browser session that manages a Chrome/Chromium instance
pub struct BrowserSession {
    /// The underlying headless_chrome Browser instance
    browser: Browser,

    /// CDP timeout applied to every tab this session hands out
    timeout: Duration,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Ignore default arguments to prevent detection by anti-bot services
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

        // Picking sessions are interactive and can sit idle for a long time
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.path = options.chrome_path;
        launch_opts.user_data_dir = options.user_data_dir;
        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| PickerError::LaunchFailed(e.to_string()))?;

        browser.new_tab().map_err(|e| PickerError::LaunchFailed(format!("Failed to create tab: {}", e)))?;
        log::info!("Launched browser ({})", if options.headless { "headless" } else { "headed" });

        Ok(Self {
            browser,
            timeout: Duration::from_millis(options.timeout),
        })
    }

    /// Connect to an existing browser instance via WebSocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let timeout = Duration::from_millis(options.timeout);
        let browser = Browser::connect_with_timeout(options.ws_url.clone(), Duration::from_secs(60 * 60))
            .map_err(|e| PickerError::ConnectionFailed(e.to_string()))?;
        log::info!("Connected to browser at {}", options.ws_url);

        Ok(Self { browser, timeout })
    }

    /// Get the active tab
    pub fn tab(&self) -> Result<Arc<Tab>> {
        let tab = self.get_active_tab()?;
        tab.set_default_timeout(self.timeout);
        Ok(tab)
    }

    /// Get all tabs
    pub fn get_tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| PickerError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        Ok(tabs)
    }

    /// Get the currently active tab: the visible one, or the first tab
    pub fn get_active_tab(&self) -> Result<Arc<Tab>> {
        let tabs = self.get_tabs()?;

        for tab in &tabs {
            match tab.evaluate("document.visibilityState === 'visible'", false) {
                Ok(remote_object) => {
                    if remote_object.value.and_then(|v| v.as_bool()).unwrap_or(false) {
                        return Ok(tab.clone());
                    }
                }
                Err(e) => log::debug!("Failed to check tab status: {}", e),
            }
        }

        tabs.into_iter()
            .next()
            .ok_or_else(|| PickerError::TabOperationFailed("No active tab found".to_string()))
    }

    /// Stable id of the active tab, used to namespace stored selections
    pub fn tab_id(&self) -> Result<String> {
        Ok(self.tab()?.get_target_id().to_string())
    }

    /// Navigate to a URL and wait until the page has loaded
    pub fn open(&self, url: &str) -> Result<()> {
        self.navigate(url)?;
        self.wait_for_navigation()
    }

    /// Navigate to a URL using the active tab
    pub fn navigate(&self, url: &str) -> Result<()> {
        self.tab()?
            .navigate_to(url)
            .map_err(|e| PickerError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?;

        Ok(())
    }

    /// Wait for navigation to complete
    pub fn wait_for_navigation(&self) -> Result<()> {
        self.tab()?
            .wait_until_navigated()
            .map_err(|e| PickerError::NavigationFailed(format!("Navigation timeout: {}", e)))?;

        Ok(())
    }

    /// URL of the active tab
    pub fn url(&self) -> Result<String> {
        Ok(self.tab()?.get_url())
    }

    /// Capture the page structure of the active tab
    pub fn snapshot(&self) -> Result<DomTree> {
        DomTree::from_tab(&self.tab()?)
    }

    /// Live `outerHTML` of the element at an identifier path
    pub fn outer_html(&self, path: &str) -> Result<String> {
        let selector = live_selector(path);
        let quoted = serde_json::to_string(&selector)?;
        let js = format!("(function() {{ const el = document.querySelector({}); return el ? el.outerHTML : null; }})()", quoted);

        let result = self
            .tab()?
            .evaluate(&js, false)
            .map_err(|e| PickerError::EvaluationFailed(e.to_string()))?;

        result
            .value
            .and_then(|value| value.as_str().map(str::to_string))
            .ok_or_else(|| PickerError::ElementNotFound(format!("No live element at '{}'", selector)))
    }

    /// Attach the live markup of a node to the tree
    pub fn capture_html(&self, tree: &mut DomTree, id: NodeId) -> Result<()> {
        let node = tree
            .get(id)
            .ok_or_else(|| PickerError::ElementNotFound(format!("index {}", id.0)))?;
        let html = self.outer_html(&identifier_path(node))?;
        tree.set_outer_html(id, html)
    }

    /// PNG capture of the visible viewport
    pub fn screenshot(&self) -> Result<Vec<u8>> {
        self.tab()?
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| PickerError::ScreenshotFailed(e.to_string()))
    }

    /// Viewport screenshot with the given boxes outlined
    pub fn highlight(&self, highlights: &[Highlight], style: &HighlightStyle) -> Result<Vec<u8>> {
        highlight_png(&self.screenshot()?, highlights, style)
    }

    /// Get the underlying Browser instance
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close the browser
    pub fn close(&self) -> Result<()> {
        // headless_chrome closes the browser process on drop; closing the
        // tabs ends the page sessions right away
        let tabs = self.get_tabs()?;
        for tab in tabs {
            let _ = tab.close(false);
        }
        Ok(())
    }
}

/// Document selector for an identifier path, which is relative to the body
fn live_selector(path: &str) -> String {
    if path.is_empty() {
        "body".to_string()
    } else {
        format!("body{}{}", SEGMENT_SEPARATOR, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_selector() {
        assert_eq!(live_selector(""), "body");
        assert_eq!(
            live_selector("div#main:nth-child(1) > p:nth-child(2)"),
            "body > div#main:nth-child(1) > p:nth-child(2)"
        );
    }

    // Integration tests (require Chrome to be installed)
    #[test]
    #[ignore] // Ignore by default, run with: cargo test -- --ignored
    fn test_launch_browser() {
        let result = BrowserSession::launch(LaunchOptions::new().headless(true));
        assert!(result.is_ok());
    }

    #[test]
    #[ignore]
    fn test_get_active_tab() {
        let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");

        assert!(session.get_active_tab().is_ok());
        assert!(!session.tab_id().unwrap().is_empty());
    }

    #[test]
    #[ignore]
    fn test_open_and_snapshot() {
        let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
        session.open("data:text/html,<p id=\"a\">Hello</p>").expect("Failed to open page");

        let tree = session.snapshot().expect("Failed to snapshot");
        assert_eq!(tree.root().tag_name(), "body");
        assert_eq!(tree.get(NodeId(1)).unwrap().element_id(), Some("a"));
        assert_eq!(session.outer_html("p#a:nth-child(1)").unwrap(), "<p id=\"a\">Hello</p>");
    }
}
