//! wordpad-editor-core: Pure Rust editor logic without framework dependencies.
//!
//! This crate provides:
//! - `DocumentSurface` - the structured document tree being edited
//! - `HistoryManager` - snapshot-based undo/redo with debounced saves
//! - `ObjectOverlayManager` - move/resize shells around images and tables
//! - `EditorCommand` - toolbar commands, each one history entry
//! - `find` - find next, replace current and replace all
//! - `EditorContext` - ties the above to a host's layout, UI and clock

pub mod commands;
pub mod config;
pub mod context;
pub mod debounce;
pub mod error;
pub mod events;
pub mod find;
mod format;
pub mod history;
pub mod keymap;
pub mod layout;
pub mod markup;
pub mod overlay;
pub mod persist;
pub mod platform;
pub mod snapshot;
pub mod tree;
pub mod types;

pub use commands::{CommandOutcome, EditorCommand, execute_command};
pub use config::{EditorConfig, HistoryConfig, OverlayConfig};
pub use context::EditorContext;
pub use error::EditorError;
pub use events::{ChangeChannel, ChangeKind, ChangeOrigin, ContentChange};
pub use find::{MatchPosition, TextMatch};
pub use history::{HistoryManager, HistoryStack, NoOverlay, OverlayControl, UndoManager};
pub use keymap::{Key, KeyAction, KeyCombo, KeydownResult, Modifiers};
pub use layout::StaticLayout;
pub use overlay::{ClickOutcome, ObjectOverlayManager, OverlayState};
pub use persist::{DocumentMeta, SavedDocument};
pub use platform::{Clock, LayoutProvider, ManualClock, NoopUi, SystemClock, UiHooks};
pub use smol_str::SmolStr;
pub use snapshot::Snapshot;
pub use tree::{
    ActiveFormats, Align, Caret, DeleteUnit, DocumentSurface, Element, Node, NodeId, NodeKind,
    Position, Style, Tag,
};
pub use types::{Point, Rect, Size};
