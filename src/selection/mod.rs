//! Element selection: records, the per-tab store, the confirmation view and
//! the picking session state machine.

pub mod capture;
pub mod record;
pub mod session;
pub mod store;

pub use capture::{AttributeOption, CaptureChoices, CaptureDraft, ChildOption, TextOption};
pub use record::{ChildSnapshot, ExportDocument, SelectionRecord};
pub use session::{PickSession, PickState};
pub use store::SelectionStore;
