//! Browser DOM layer for the wordpad editor.
//!
//! This crate renders a `wordpad-editor-core` document into a host element
//! and feeds browser events back into it. It assumes a
//! `wasm32-unknown-unknown` target; the pure mapping helpers also build
//! natively so they can be unit tested.
//!
//! # Architecture
//!
//! - `autosave`: periodic LocalStorage saves
//! - `caret`: tree caret ↔ DOM selection mapping
//! - `dom`: rendering plus the `LayoutProvider` and `UiHooks` implementations
//! - `events`: key, input and pointer event extraction
//! - `timer`: `setTimeout` driving the history debounce
//! - `editor`: `BrowserEditor`, the JS-facing entry point
//! - `platform`: Browser/OS detection for shortcut modifiers
//!
//! # Re-exports
//!
//! This crate re-exports `wordpad-editor-core` for convenience, so consumers
//! only need to depend on `wordpad-editor-browser`.

// Re-export core crate
pub use wordpad_editor_core;
pub use wordpad_editor_core::*;

pub mod autosave;
pub mod caret;
pub mod events;
pub mod logging;
pub mod platform;
pub mod timer;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub mod dom;
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub mod editor;

pub use caret::{DomPosition, caret_for_dom_position, dom_position_for_caret};
pub use events::{
    InputAction, align_named, block_tag, inline_format, key_combo, parse_input, parse_node_id,
};
pub use logging::init_logging;
pub use platform::{Platform, platform};

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use editor::BrowserEditor;

/// Module start hook: panic messages and logging go to the console.
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    init_logging();
}
