//! scrape-picker command line
//!
//! Pick and label elements of a page (live through Chrome, or from a saved
//! DOM snapshot), keep them per tab and turn them into an export document or
//! a Python scraping script.

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use scrape_picker::agent::PageAgent;
use scrape_picker::browser::{BrowserSession, ConnectionOptions, Highlight, HighlightStyle, LaunchOptions};
use scrape_picker::controller::{Artifact, Controller, Status};
use scrape_picker::dom::{DomTree, ElementNode};
use scrape_picker::messaging::ElementTarget;
use scrape_picker::selection::CaptureChoices;
use scrape_picker::storage::{DEFAULT_STORE_DIR, FileStorage, Storage, StorageOptions, tab_key};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "scrape-picker")]
#[command(version)]
#[command(about = "Pick page elements and turn them into scrapers", long_about = None)]
struct Cli {
    /// Directory where selections are stored per tab
    #[arg(long, global = true, value_name = "DIR", env = "SCRAPE_PICKER_STORE", default_value = DEFAULT_STORE_DIR)]
    store_dir: PathBuf,

    /// Tab id the selections belong to
    #[arg(long, global = true, value_name = "ID", env = "SCRAPE_PICKER_TAB", default_value = "default")]
    tab: String,

    /// Attach to a running Chrome (DevTools WebSocket URL) instead of launching one
    #[arg(long, global = true, value_name = "WS_URL", env = "SCRAPE_PICKER_WS")]
    connect: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the elements of a page with their index, selector and path
    Elements {
        #[command(flatten)]
        source: SourceArgs,

        /// Only list elements with a non-empty bounding box
        #[arg(long)]
        visible_only: bool,

        /// Maximum number of elements to print
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Save the DOM snapshot of a page as JSON
    Snapshot {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file
        #[arg(long, short = 'o', value_name = "FILE")]
        out: PathBuf,
    },

    /// Pick an element, label it and save it
    Pick {
        #[command(flatten)]
        source: SourceArgs,

        /// Label of the selection
        #[arg(long, short = 'l')]
        label: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Keep the element's text content
        #[arg(long)]
        keep_text: bool,

        /// Attribute to keep (repeatable)
        #[arg(long = "attribute", short = 'a', value_name = "NAME")]
        attributes: Vec<String>,

        /// 0-based index of a direct child to keep (repeatable)
        #[arg(long = "child", short = 'c', value_name = "INDEX")]
        children: Vec<usize>,
    },

    /// Print the saved selections
    List,

    /// Remove the selection with a label
    Remove {
        /// Label of the selection
        #[arg(long, short = 'l')]
        label: String,
    },

    /// Remove all saved selections
    Clear {
        /// Confirm removal
        #[arg(long)]
        yes: bool,
    },

    /// Write the saved selections as a JSON export
    Export {
        /// Output directory
        #[arg(long, short = 'o', value_name = "DIR", default_value = ".")]
        out: PathBuf,
    },

    /// Generate a Python scraping script from the saved selections
    Codegen {
        /// Output directory
        #[arg(long, short = 'o', value_name = "DIR", default_value = ".")]
        out: PathBuf,
    },

    /// Screenshot a live page with the saved selections outlined
    Highlight {
        /// URL to open
        #[arg(long)]
        url: String,

        /// Launch browser in headed mode
        #[arg(long, short = 'H')]
        headed: bool,

        /// Output PNG file
        #[arg(long, short = 'o', value_name = "FILE")]
        out: PathBuf,
    },
}

/// Where the page comes from
#[derive(Args)]
struct SourceArgs {
    /// Open this URL in Chrome
    #[arg(long, conflicts_with = "snapshot", required_unless_present = "snapshot")]
    url: Option<String>,

    /// Load a saved DOM snapshot instead of a live page
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// URL the snapshot was taken from
    #[arg(long, requires = "snapshot", value_name = "URL")]
    page_url: Option<String>,

    /// Launch browser in headed mode
    #[arg(long, short = 'H')]
    headed: bool,
}

/// Which element to pick
#[derive(Args)]
#[group(required = true, multiple = false)]
struct TargetArgs {
    /// Element index from `elements`
    #[arg(long)]
    index: Option<usize>,

    /// Identifier path of the element
    #[arg(long)]
    path: Option<String>,

    /// CSS selector; the first match is picked
    #[arg(long)]
    selector: Option<String>,
}

impl TargetArgs {
    fn into_target(self) -> anyhow::Result<ElementTarget> {
        match (self.index, self.path, self.selector) {
            (Some(index), _, _) => Ok(ElementTarget::Index { index }),
            (_, Some(path), _) => Ok(ElementTarget::Path { path }),
            (_, _, Some(selector)) => Ok(ElementTarget::Css { selector }),
            _ => bail!("One of --index, --path or --selector is required"),
        }
    }
}

/// A loaded page, with the browser kept alive for live pages
struct Page {
    url: String,
    tree: DomTree,
    browser: Option<BrowserSession>,
}

fn load_page(source: &SourceArgs, connect: Option<&str>) -> anyhow::Result<Page> {
    if let Some(path) = &source.snapshot {
        let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let tree = DomTree::from_json(&json)?;
        let url = source
            .page_url
            .clone()
            .unwrap_or_else(|| format!("file://{}", path.display()));
        return Ok(Page { url, tree, browser: None });
    }

    let url = source.url.as_deref().context("--url or --snapshot is required")?;
    let browser = open_live(url, source.headed, connect)?;
    let tree = browser.snapshot()?;
    Ok(Page {
        url: browser.url()?,
        tree,
        browser: Some(browser),
    })
}

fn open_live(url: &str, headed: bool, connect: Option<&str>) -> anyhow::Result<BrowserSession> {
    let browser = match connect {
        Some(ws_url) => BrowserSession::connect(ConnectionOptions::new(ws_url))?,
        None => BrowserSession::launch(LaunchOptions::new().headless(!headed))?,
    };
    browser.open(url)?;
    log::info!("Opened {}", url);
    Ok(browser)
}

/// Agent over the stored selections only, for commands that need no page
fn stored_agent(storage: Arc<dyn Storage>, tab: &str) -> anyhow::Result<PageAgent> {
    let url = storage.get(&tab_key(tab))?.map(|document| document.url).unwrap_or_default();
    Ok(PageAgent::new(url, DomTree::new(ElementNode::new("body")), tab, storage)?)
}

fn report(status: Status) -> anyhow::Result<()> {
    if status.is_success() {
        println!("{}", status);
        Ok(())
    } else {
        bail!("{}", status)
    }
}

fn write_artifact(outcome: (Status, Option<Artifact>), dir: &Path) -> anyhow::Result<()> {
    let (status, artifact) = outcome;
    let Some(artifact) = artifact else {
        bail!("{}", status);
    };

    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(&artifact.file_name);
    std::fs::write(&path, artifact.contents).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{}: {}", status, path.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(StorageOptions::new(cli.store_dir.clone())));

    match cli.command {
        Command::Elements {
            source,
            visible_only,
            limit,
        } => {
            let page = load_page(&source, cli.connect.as_deref())?;
            let tree = &page.tree;
            for (id, selector) in tree
                .selector_map
                .iter()
                .filter(|(id, _)| !visible_only || tree.get(**id).is_some_and(|node| node.is_visible()))
                .take(limit.unwrap_or(usize::MAX))
            {
                println!(
                    "[{}] <{}> {}  |  {}{}",
                    id.0,
                    selector.tag_name,
                    selector.css_selector,
                    selector.identifier_path,
                    selector.text.as_deref().map(|t| format!("  |  {}", t)).unwrap_or_default()
                );
            }
        }
        Command::Snapshot { source, out } => {
            let page = load_page(&source, cli.connect.as_deref())?;
            std::fs::write(&out, page.tree.to_json()?).with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Saved {} elements from {} to {}", page.tree.len(), page.url, out.display());
        }
        Command::Pick {
            source,
            label,
            target,
            keep_text,
            attributes,
            children,
        } => {
            let page = load_page(&source, cli.connect.as_deref())?;
            let target = target.into_target()?;
            let mut agent = PageAgent::new(page.url, page.tree, &cli.tab, storage)?;

            report(Controller::new(&mut agent).start_selection(&label))?;

            if let Some(browser) = &page.browser {
                let id = agent.resolve(&target)?.id();
                if let Err(e) = browser.capture_html(agent.tree_mut(), id) {
                    log::warn!("Using snapshot markup: {}", e);
                }
            }

            agent.pick(&target)?;
            let record = agent.confirm(&CaptureChoices {
                keep_text,
                attributes,
                children,
            })?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::List => {
            let mut agent = stored_agent(storage, &cli.tab)?;
            let selections = Controller::new(&mut agent).load_selections();
            if selections.is_empty() {
                println!("No elements selected yet");
            }
            for record in selections {
                println!("{}  <{}>  {}", record.label, record.tag_name, record.selector);
                if let Some(value) = &record.value {
                    println!("    value: {:?}", value);
                }
                for (name, value) in &record.attributes {
                    println!("    {} = {:?}", name, value);
                }
                for child in &record.children {
                    println!("    <{}> {}", child.tag_name, child.text);
                }
            }
        }
        Command::Remove { label } => {
            let mut agent = stored_agent(storage, &cli.tab)?;
            report(Controller::new(&mut agent).remove_selection(&label))?;
        }
        Command::Clear { yes } => {
            let mut agent = stored_agent(storage, &cli.tab)?;
            match Controller::new(&mut agent).clear_all(yes) {
                Some(status) => report(status)?,
                None => println!("Nothing cleared; pass --yes to remove all selections"),
            }
        }
        Command::Export { out } => {
            let mut agent = stored_agent(storage, &cli.tab)?;
            write_artifact(Controller::new(&mut agent).export_data(), &out)?;
        }
        Command::Codegen { out } => {
            let mut agent = stored_agent(storage, &cli.tab)?;
            write_artifact(Controller::new(&mut agent).generate_code(), &out)?;
        }
        Command::Highlight { url, headed, out } => {
            let browser = open_live(&url, headed, cli.connect.as_deref())?;
            let tree = browser.snapshot()?;
            let agent = PageAgent::new(browser.url()?, tree, &cli.tab, storage)?;

            let highlights: Vec<Highlight> = agent
                .store()
                .iter()
                .filter_map(|record| agent.tree().find_by_identifier_path(&record.identifier_path))
                .filter_map(|node| node.bounding_box())
                .map(Highlight::saved)
                .collect();

            let png = browser.highlight(&highlights, &HighlightStyle::default())?;
            std::fs::write(&out, png).with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Outlined {} selections in {}", highlights.len(), out.display());
        }
    }

    Ok(())
}
