//! Browser management: launching or connecting to Chrome, loading pages,
//! capturing DOM snapshots and highlighted screenshots.

pub mod config;
pub mod highlight;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use highlight::{Highlight, HighlightStyle, highlight_png};
pub use session::BrowserSession;
