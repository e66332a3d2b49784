//! The editor application context.
//!
//! One `EditorContext` owns everything a single editor instance needs: the
//! document surface, the object overlay, the history and the platform
//! hooks. Hosts build it once and route every user action through it, so
//! change notifications are always folded into history in the same order
//! the edits happened.

use web_time::Instant;

use crate::commands::{CommandOutcome, EditorCommand, execute_command};
use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::events::{ChangeOrigin, ContentChange};
use crate::find::{self, MatchPosition};
use crate::history::{HistoryManager, UndoManager};
use crate::keymap::{KeyAction, KeyCombo, KeydownResult, resolve};
use crate::overlay::{ClickOutcome, ObjectOverlayManager, OverlayState};
use crate::platform::{Clock, LayoutProvider, SystemClock, UiHooks};
use crate::snapshot::Snapshot;
use crate::tree::{Caret, DeleteUnit, DocumentSurface, Node, NodeId};
use crate::types::Point;

pub struct EditorContext<L, U, C = SystemClock> {
    config: EditorConfig,
    surface: DocumentSurface,
    overlay: ObjectOverlayManager,
    history: HistoryManager,
    layout: L,
    ui: U,
    clock: C,
}

impl<L: LayoutProvider, U: UiHooks> EditorContext<L, U, SystemClock> {
    /// Create an editor over an empty document.
    pub fn new(config: EditorConfig, layout: L, ui: U) -> Self {
        Self::with_clock(config, layout, ui, SystemClock)
    }
}

impl<L: LayoutProvider, U: UiHooks, C: Clock> EditorContext<L, U, C> {
    pub fn with_clock(config: EditorConfig, layout: L, ui: U, clock: C) -> Self {
        let surface = DocumentSurface::new();
        let overlay = ObjectOverlayManager::new(config.overlay.clone());
        let seed = HistoryManager::capture(&surface, &overlay);
        let history = HistoryManager::new(&config.history, seed);
        Self {
            config,
            surface,
            overlay,
            history,
            layout,
            ui,
            clock,
        }
    }

    // === Accessors ===

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn surface(&self) -> &DocumentSurface {
        &self.surface
    }

    pub fn overlay(&self) -> &ObjectOverlayManager {
        &self.overlay
    }

    pub fn overlay_state(&self) -> OverlayState {
        self.overlay.state()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut L {
        &mut self.layout
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    /// Markup of the document without overlay scaffolding.
    pub fn clean_markup(&self) -> String {
        HistoryManager::capture(&self.surface, &self.overlay)
            .markup()
            .to_string()
    }

    /// The document as it would be saved right now.
    pub fn snapshot(&self) -> Snapshot {
        HistoryManager::capture(&self.surface, &self.overlay)
    }

    /// When the host should call [`tick`](Self::tick) next, if a debounced
    /// save is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.history.next_deadline()
    }

    // === Editing ===

    /// Move the caret, usually to mirror the host's selection.
    pub fn set_caret(&mut self, caret: Option<Caret>) {
        self.surface.set_caret(caret);
        self.refresh_ui();
    }

    /// Mirror a non-collapsed host selection.
    pub fn set_selection(&mut self, anchor: Caret, focus: Caret) {
        self.surface.set_selection(anchor, focus);
        self.refresh_ui();
    }

    pub fn type_text(&mut self, text: &str) {
        self.surface.type_text(text);
        self.sync();
    }

    /// Backspace. Coalesced with neighbouring keystrokes like typing.
    pub fn delete_backward(&mut self, unit: DeleteUnit) -> bool {
        let deleted = self.surface.delete_backward(unit);
        self.sync();
        if deleted {
            self.refresh_ui();
        }
        deleted
    }

    /// Forward delete.
    pub fn delete_forward(&mut self, unit: DeleteUnit) -> bool {
        let deleted = self.surface.delete_forward(unit);
        self.sync();
        if deleted {
            self.refresh_ui();
        }
        deleted
    }

    /// Select the next match of `query` after the caret. Selecting is not
    /// an edit, so history is untouched.
    pub fn find_next(&mut self, query: &str) -> Option<MatchPosition> {
        let found = find::find_next(&mut self.surface, query);
        self.refresh_ui();
        found
    }

    /// Run a toolbar command.
    pub fn execute(&mut self, command: &EditorCommand) -> Result<CommandOutcome, EditorError> {
        let result = execute_command(&mut self.surface, &mut self.overlay, command);
        if let Err(err) = &result {
            tracing::warn!(%err, ?command, "command rejected");
        }
        self.sync();
        self.ui.focus_surface();
        self.refresh_ui();
        result
    }

    /// Apply an arbitrary mutation (formatting and the like) as one
    /// discrete edit.
    pub fn apply<R>(&mut self, f: impl FnOnce(&mut DocumentSurface) -> R) -> R {
        self.overlay.dissolve(&mut self.surface);
        let out = f(&mut self.surface);
        self.surface
            .publish(ContentChange::discrete(ChangeOrigin::Command));
        self.sync();
        self.refresh_ui();
        out
    }

    /// Replace the document and start a fresh history from it.
    pub fn load(&mut self, content: Vec<Node>) {
        self.overlay.dissolve(&mut self.surface);
        self.surface = DocumentSurface::from_nodes(content);
        self.history.reset(&mut self.surface, &self.overlay);
        tracing::debug!(origin = ?ChangeOrigin::Load, "document loaded");
        self.refresh_ui();
    }

    // === Objects ===

    /// Route a click on `target` (None for outside the surface).
    pub fn click(&mut self, target: Option<NodeId>) -> ClickOutcome {
        let outcome = self.overlay.click(&mut self.surface, target, &self.layout);
        self.sync();
        self.refresh_ui();
        outcome
    }

    /// The user clicked somewhere outside the editor and its toolbar.
    pub fn blur(&mut self) -> bool {
        let released = self.overlay.blur(&mut self.surface);
        self.sync();
        released
    }

    /// Start a move or resize. Pending history is flushed first so the
    /// gesture lands in its own entry.
    pub fn pointer_down(&mut self, target: NodeId, pos: Point) -> bool {
        let started = self.overlay.pointer_down(&self.surface, target, pos);
        if started {
            self.history.flush(&mut self.surface, &self.overlay);
        }
        started
    }

    pub fn pointer_move(&mut self, pos: Point) -> bool {
        let bounds = self.layout.surface_size();
        self.overlay.pointer_move(&mut self.surface, pos, bounds)
    }

    pub fn pointer_up(&mut self) -> bool {
        let committed = self.overlay.pointer_up(&mut self.surface);
        self.sync();
        committed
    }

    pub fn cancel_gesture(&mut self) -> bool {
        self.overlay.cancel_gesture(&mut self.surface)
    }

    // === History ===

    pub fn undo(&mut self) -> bool {
        self.history
            .undo(&mut self.surface, &mut self.overlay, &mut self.ui)
    }

    pub fn redo(&mut self) -> bool {
        self.history
            .redo(&mut self.surface, &mut self.overlay, &mut self.ui)
    }

    /// Handle an editor keybinding. Unbound keys are left to the platform.
    pub fn handle_key(&mut self, combo: &KeyCombo, is_mac: bool) -> KeydownResult {
        match resolve(combo, is_mac) {
            Some(KeyAction::Undo) => {
                self.undo();
                KeydownResult::Handled
            }
            Some(KeyAction::Redo) => {
                self.redo();
                KeydownResult::Handled
            }
            Some(KeyAction::CancelGesture) if self.cancel_gesture() => KeydownResult::Handled,
            Some(KeyAction::CancelGesture) | None => KeydownResult::NotHandled,
        }
    }

    /// Fire a due debounced save. Returns whether an entry was recorded.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now();
        self.history.pump(&mut self.surface, &self.overlay, now)
    }

    /// Record the document now, skipping the debounce window.
    pub fn save(&mut self) -> bool {
        self.surface.changes_mut().discard();
        self.history.save(&self.surface, &self.overlay)
    }

    fn sync(&mut self) {
        let now = self.clock.now();
        self.history.pump(&mut self.surface, &self.overlay, now);
    }

    fn refresh_ui(&mut self) {
        let formats = self.surface.active_formats();
        self.ui.refresh_active_states(&formats);
        self.ui.show_table_tools(formats.in_table);
    }
}

impl<L: LayoutProvider, U: UiHooks, C: Clock> UndoManager for EditorContext<L, U, C> {
    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn undo(&mut self) -> bool {
        EditorContext::undo(self)
    }

    fn redo(&mut self) -> bool {
        EditorContext::redo(self)
    }

    fn clear_history(&mut self) {
        self.history.reset(&mut self.surface, &self.overlay);
    }
}
