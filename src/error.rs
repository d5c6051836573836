use thiserror::Error;

/// Errors produced while capturing, storing and exporting element selections
#[derive(Debug, Error)]
pub enum PickerError {
    /// Failed to launch the browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Failed to connect to an existing browser
    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    /// Navigation failed
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Tab operation failed
    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    /// JavaScript evaluation failed
    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    /// DOM snapshot could not be parsed
    #[error("Failed to parse DOM: {0}")]
    DomParseFailed(String),

    /// Element could not be located in the page tree
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Selector uses syntax the matcher does not understand
    #[error("Unsupported selector: {0}")]
    UnsupportedSelector(String),

    /// Message could not be decoded into a known action
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An element was clicked while no picking session was active
    #[error("No picking session is active")]
    NotPicking,

    /// Confirm was requested without an open confirmation view
    #[error("No element is awaiting confirmation")]
    NothingToConfirm,

    /// The confirmation view has no option with this name or index
    #[error("Unknown capture option: {0}")]
    UnknownOption(String),

    /// The page agent has no loaded page to work on
    #[error("No page loaded")]
    NoPage,

    /// No context received the message (e.g. a privileged page)
    #[error("No receiving end for message: {0}")]
    NoReceiver(String),

    /// Screenshot capture or rendering failed
    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, PickerError>;
