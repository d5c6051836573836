//! # scrape-picker
//!
//! A Rust library for picking, labelling and persisting DOM elements of web pages, then turning
//! the saved selections into a JSON export or a generated Python scraping script.
//!
//! ## Features
//!
//! - **Selector generation**: a CSS selector and a structural identifier path for any element
//! - **Picking sessions**: start, click, confirm with chosen text/attributes/children, cancel
//! - **Per-tab persistence**: selections stored under `page_<tab>` in memory or on disk
//! - **Export & codegen**: `{url, timestamp, selections}` JSON and a requests + BeautifulSoup script
//! - **Live pages**: Chrome DevTools Protocol snapshots, live markup and highlighted screenshots
//! - **MCP Server**: every picking action exposed as a Model Context Protocol tool
//!
//! ## MCP Server
//!
//! ```bash
//! # Run over stdio with a headless browser
//! cargo run --bin mcp-server --features mcp-server
//!
//! # Visible browser, selections stored in ./selections
//! cargo run --bin mcp-server --features mcp-server -- --headed --store-dir selections
//! ```
//!
//! ## Library Usage
//!
//! ### Selectors for an element
//!
//! ```rust
//! use scrape_picker::dom::{DomTree, ElementNode, NodeId, css_selector, identifier_path};
//!
//! let tree = DomTree::new(
//!     ElementNode::new("body").with_child(
//!         ElementNode::new("div")
//!             .with_id("parent")
//!             .with_child(ElementNode::new("span").with_class("child-class")),
//!     ),
//! );
//! let span = tree.get(NodeId(2)).unwrap();
//!
//! assert_eq!(identifier_path(span), "div#parent:nth-child(1) > span.child-class:nth-child(1)");
//! assert_eq!(css_selector(span), "div#parent > span.child-class");
//! ```
//!
//! ### A picking session
//!
//! ```rust
//! use scrape_picker::agent::PageAgent;
//! use scrape_picker::dom::{DomTree, ElementNode};
//! use scrape_picker::messaging::{ElementTarget, Request};
//! use scrape_picker::selection::CaptureChoices;
//! use scrape_picker::storage::MemoryStorage;
//! use std::sync::Arc;
//!
//! # fn main() -> scrape_picker::Result<()> {
//! let tree = DomTree::new(ElementNode::new("body").with_child(ElementNode::new("h1").with_text("Hello")));
//! let mut agent = PageAgent::new("https://example.com", tree, "1", Arc::new(MemoryStorage::new()))?;
//!
//! agent.handle(Request::StartSelection { label: "title".to_string() })?;
//! agent.handle(Request::PickElement { target: ElementTarget::Index { index: 1 } })?;
//! agent.handle(Request::from(CaptureChoices { keep_text: true, ..Default::default() }))?;
//!
//! assert_eq!(agent.export().selections[0].value.as_deref(), Some("Hello"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`dom`]: page snapshot, arena tree, selector and identifier-path builders, selector matching
//! - [`selection`]: selection records, the per-tab store, confirmation view and session state machine
//! - [`storage`]: per-tab persistence of selections
//! - [`messaging`]: request/response messages between controls and a page agent
//! - [`agent`]: the page agent answering requests for one tab
//! - [`controller`]: user-facing controls with label validation and status messages
//! - [`codegen`]: Python scraper generation
//! - [`browser`]: Chrome session management, live markup and highlighted screenshots
//! - [`error`]: Error types and result aliases
//! - [`mcp`]: **Model Context Protocol server** (requires `mcp-handler` feature)

pub mod agent;
pub mod browser;
pub mod codegen;
pub mod controller;
pub mod dom;
pub mod error;
pub mod messaging;
pub mod selection;
pub mod storage;

#[cfg(feature = "mcp-handler")]
pub mod mcp;

pub use agent::PageAgent;
pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions};
pub use controller::{Controller, Status, StatusKind};
pub use dom::{BoundingBox, DomTree, ElementNode, ElementSelector, NodeId, SelectorMap, css_selector, identifier_path};
pub use error::{PickerError, Result};
pub use messaging::{ElementTarget, Request, Response, Transport};
pub use selection::{CaptureChoices, ExportDocument, SelectionRecord, SelectionStore};
pub use storage::{FileStorage, MemoryStorage, Storage};

#[cfg(feature = "mcp-handler")]
pub use mcp::PickerServer;
#[cfg(feature = "mcp-handler")]
pub use rmcp::ServiceExt;
