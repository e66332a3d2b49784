//! Snapshot-based undo/redo.
//!
//! Provides:
//! - `UndoManager` trait for whatever owns a document and its history
//! - `HistoryStack` - bounded, linear list of snapshots with a cursor
//! - `HistoryManager` - turns content-change notifications into saves and
//!   performs restores
//!
//! Every save captures the whole document. Restores replace the content
//! wholesale while the manager's restoring flag is set, so the restore's
//! own change notification can never become a history entry.

use std::collections::VecDeque;

use web_time::Instant;

use crate::config::HistoryConfig;
use crate::debounce::Debouncer;
use crate::error::EditorError;
use crate::events::ChangeKind;
use crate::platform::UiHooks;
use crate::snapshot::Snapshot;
use crate::tree::{DocumentSurface, Node};

/// Trait for managing undo/redo operations.
///
/// Implementations must actually perform the undo/redo, not just track state.
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Perform undo. Returns true if the document changed.
    fn undo(&mut self) -> bool;

    /// Perform redo. Returns true if the document changed.
    fn redo(&mut self) -> bool;

    /// Clear all undo/redo history, keeping the current document.
    fn clear_history(&mut self);
}

/// The piece of the overlay the history needs to see.
pub trait OverlayControl {
    /// Document content as it would be with any active wrapper dissolved.
    /// Must not touch the live tree.
    fn project(&self, surface: &DocumentSurface) -> Vec<Node>;

    /// Tear down any active wrapper ahead of a restore.
    fn dissolve_for_restore(&mut self, surface: &mut DocumentSurface) -> Result<(), EditorError>;
}

/// Overlay stand-in for documents without floating objects.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOverlay;

impl OverlayControl for NoOverlay {
    fn project(&self, surface: &DocumentSurface) -> Vec<Node> {
        surface.content().to_vec()
    }

    fn dissolve_for_restore(&mut self, _surface: &mut DocumentSurface) -> Result<(), EditorError> {
        Ok(())
    }
}

// === History stack ===

/// Ordered snapshots plus the index of the one the document currently shows.
///
/// Never empty: it is seeded with the initial document. Adjacent entries
/// are never equal, and the oldest entries are evicted once `max_size` is
/// exceeded.
#[derive(Clone, Debug)]
pub struct HistoryStack {
    entries: VecDeque<Snapshot>,
    index: usize,
    max_size: usize,
}

impl HistoryStack {
    pub fn new(max_size: usize, seed: Snapshot) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(seed);
        Self {
            entries,
            index: 0,
            max_size: max_size.max(1),
        }
    }

    /// Record a snapshot after the current one.
    ///
    /// Returns false when it equals the current snapshot. Otherwise any
    /// redo states are dropped, the snapshot is appended and becomes
    /// current, and the oldest entries are evicted to respect the bound.
    pub fn push(&mut self, snapshot: Snapshot) -> bool {
        if self.current() == Some(&snapshot) {
            return false;
        }
        self.entries.truncate(self.index + 1);
        self.entries.push_back(snapshot);
        let mut evicted = 0;
        while self.entries.len() > self.max_size {
            self.entries.pop_front();
            evicted += 1;
        }
        self.index = self.entries.len() - 1;
        if evicted > 0 {
            tracing::debug!(evicted, len = self.entries.len(), "evicted oldest history entries");
        }
        true
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.index)
    }

    /// Move one step back, returning the snapshot to restore.
    pub fn step_back(&mut self) -> Option<Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index).cloned()
    }

    /// Move one step forward, returning the snapshot to restore.
    pub fn step_forward(&mut self) -> Option<Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index).cloned()
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Drop every entry and start over from `seed`.
    pub fn reset(&mut self, seed: Snapshot) {
        self.entries.clear();
        self.entries.push_back(seed);
        self.index = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }
}

// === History manager ===

#[derive(Clone, Debug)]
pub struct HistoryManager {
    stack: HistoryStack,
    debounce: Debouncer,
    restoring: bool,
}

impl HistoryManager {
    pub fn new(config: &HistoryConfig, seed: Snapshot) -> Self {
        Self {
            stack: HistoryStack::new(config.max_stack_size, seed),
            debounce: Debouncer::new(config.debounce()),
            restoring: false,
        }
    }

    pub fn stack(&self) -> &HistoryStack {
        &self.stack
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    pub fn has_pending_save(&self) -> bool {
        self.debounce.is_pending()
    }

    /// When the pending debounced save is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    pub fn can_undo(&self) -> bool {
        self.stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.stack.can_redo()
    }

    /// Snapshot the document as it would be without overlay scaffolding.
    pub fn capture(surface: &DocumentSurface, overlay: &impl OverlayControl) -> Snapshot {
        Snapshot::from_nodes(overlay.project(surface))
    }

    /// Record the current document. Returns whether a new entry was added.
    pub fn save(&mut self, surface: &DocumentSurface, overlay: &impl OverlayControl) -> bool {
        if self.restoring {
            return false;
        }
        self.debounce.cancel();
        let recorded = self.stack.push(Self::capture(surface, overlay));
        if recorded {
            tracing::debug!(
                index = self.stack.index(),
                len = self.stack.len(),
                "saved history entry"
            );
        }
        recorded
    }

    /// Fold pending change notifications into history.
    ///
    /// Continuous changes restart the debounce timer. A discrete change
    /// saves immediately and cancels the timer. A due timer fires a save.
    /// Returns whether a new entry was recorded.
    pub fn pump(
        &mut self,
        surface: &mut DocumentSurface,
        overlay: &impl OverlayControl,
        now: Instant,
    ) -> bool {
        if self.restoring {
            surface.changes_mut().discard();
            return false;
        }
        let mut save_now = false;
        let mut reschedule = false;
        for change in surface.changes_mut().drain() {
            match change.kind {
                ChangeKind::Continuous => reschedule = true,
                ChangeKind::Discrete => {
                    save_now = true;
                    reschedule = false;
                }
            }
        }
        let mut recorded = false;
        if save_now {
            recorded = self.save(surface, overlay);
        }
        if reschedule {
            self.debounce.schedule(now);
        }
        if self.debounce.poll(now) {
            recorded |= self.save(surface, overlay);
        }
        recorded
    }

    /// Save immediately if anything is pending, without waiting for the
    /// debounce window.
    pub fn flush(&mut self, surface: &mut DocumentSurface, overlay: &impl OverlayControl) -> bool {
        let queued = surface.changes_mut().discard();
        if self.restoring {
            return false;
        }
        if queued == 0 && !self.debounce.is_pending() {
            return false;
        }
        self.save(surface, overlay)
    }

    /// Step back one entry and restore it.
    ///
    /// Pending edits are flushed first so they can be undone too. Returns
    /// false (and does nothing) at the oldest entry.
    pub fn undo<O, U>(&mut self, surface: &mut DocumentSurface, overlay: &mut O, ui: &mut U) -> bool
    where
        O: OverlayControl,
        U: UiHooks,
    {
        self.flush(surface, &*overlay);
        if !self.stack.can_undo() {
            return false;
        }
        self.restore_with(surface, overlay, ui, HistoryStack::step_back)
    }

    /// Step forward one entry and restore it. Returns false at the newest
    /// entry.
    pub fn redo<O, U>(&mut self, surface: &mut DocumentSurface, overlay: &mut O, ui: &mut U) -> bool
    where
        O: OverlayControl,
        U: UiHooks,
    {
        self.flush(surface, &*overlay);
        if !self.stack.can_redo() {
            return false;
        }
        self.restore_with(surface, overlay, ui, HistoryStack::step_forward)
    }

    fn restore_with<O, U>(
        &mut self,
        surface: &mut DocumentSurface,
        overlay: &mut O,
        ui: &mut U,
        step: fn(&mut HistoryStack) -> Option<Snapshot>,
    ) -> bool
    where
        O: OverlayControl,
        U: UiHooks,
    {
        self.restoring = true;
        self.debounce.cancel();
        if let Err(err) = overlay.dissolve_for_restore(surface) {
            tracing::debug!(%err, "overlay teardown failed before restore");
        }
        let Some(snapshot) = step(&mut self.stack) else {
            self.restoring = false;
            return false;
        };
        surface.restore(snapshot.content());
        let dropped = surface.changes_mut().discard();
        self.restoring = false;
        tracing::debug!(
            index = self.stack.index(),
            len = self.stack.len(),
            dropped,
            "restored history entry"
        );

        ui.focus_surface();
        ui.refresh_active_states(&surface.active_formats());
        ui.show_table_tools(surface.enclosing_table().is_some());
        true
    }

    /// Forget all history and reseed it from the current document.
    pub fn reset(&mut self, surface: &mut DocumentSurface, overlay: &impl OverlayControl) {
        surface.changes_mut().discard();
        self.debounce.cancel();
        self.stack.reset(Self::capture(surface, overlay));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::events::{ChangeOrigin, ContentChange};
    use crate::platform::NoopUi;
    use crate::tree::ActiveFormats;

    fn snap(text: &str) -> Snapshot {
        let mut s = DocumentSurface::new();
        s.type_text(text);
        Snapshot::from_nodes(s.content().to_vec())
    }

    #[derive(Default)]
    struct RecordingUi {
        focused: usize,
        refreshed: usize,
    }

    impl UiHooks for RecordingUi {
        fn focus_surface(&mut self) {
            self.focused += 1;
        }

        fn refresh_active_states(&mut self, _formats: &ActiveFormats) {
            self.refreshed += 1;
        }

        fn show_table_tools(&mut self, _visible: bool) {}
    }

    struct FailingOverlay;

    impl OverlayControl for FailingOverlay {
        fn project(&self, surface: &DocumentSurface) -> Vec<Node> {
            surface.content().to_vec()
        }

        fn dissolve_for_restore(&mut self, _: &mut DocumentSurface) -> Result<(), EditorError> {
            Err(EditorError::InvalidArgument("teardown".into()))
        }
    }

    fn manager(max: usize) -> (HistoryManager, DocumentSurface) {
        let surface = DocumentSurface::new();
        let config = HistoryConfig {
            max_stack_size: max,
            debounce_ms: 150,
        };
        let seed = HistoryManager::capture(&surface, &NoOverlay);
        (HistoryManager::new(&config, seed), surface)
    }

    #[test]
    fn test_stack_push_dedupes_adjacent() {
        let mut stack = HistoryStack::new(10, snap(""));
        assert!(stack.push(snap("a")));
        assert!(!stack.push(snap("a")));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.index(), 1);
    }

    #[test]
    fn test_stack_push_truncates_redo() {
        let mut stack = HistoryStack::new(10, snap(""));
        stack.push(snap("a"));
        stack.push(snap("b"));
        stack.step_back();
        assert!(stack.can_redo());
        stack.push(snap("c"));
        assert!(!stack.can_redo());
        let markups: Vec<_> = stack.iter().map(|s| s.markup().to_string()).collect();
        assert_eq!(markups, vec!["", "<p>a</p>", "<p>c</p>"]);
    }

    #[test]
    fn test_stack_evicts_oldest() {
        let mut stack = HistoryStack::new(3, snap("0"));
        for t in ["1", "2", "3", "4"] {
            stack.push(snap(t));
        }
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.index(), 2);
        assert_eq!(stack.iter().next().map(|s| s.markup()), Some("<p>2</p>"));
    }

    #[test]
    fn test_stack_eviction_after_undo() {
        let mut stack = HistoryStack::new(3, snap("0"));
        stack.push(snap("1"));
        stack.push(snap("2"));
        stack.step_back();
        stack.step_back();
        // Truncates to ["0"] then appends, nothing to evict.
        stack.push(snap("x"));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.index(), 1);
    }

    #[test]
    fn test_stack_bounds_are_noops() {
        let mut stack = HistoryStack::new(5, snap(""));
        assert_eq!(stack.step_back(), None);
        assert_eq!(stack.step_forward(), None);
        assert_eq!(stack.index(), 0);
    }

    #[test]
    fn test_save_is_idempotent() {
        let (mut history, mut surface) = manager(10);
        surface.type_text("x");
        assert!(history.save(&surface, &NoOverlay));
        assert!(!history.save(&surface, &NoOverlay));
        assert_eq!(history.stack().len(), 2);
    }

    #[test]
    fn test_continuous_changes_are_debounced() {
        let (mut history, mut surface) = manager(10);
        let t0 = Instant::now();

        surface.type_text("a");
        assert!(!history.pump(&mut surface, &NoOverlay, t0));
        surface.type_text("b");
        assert!(!history.pump(&mut surface, &NoOverlay, t0 + Duration::from_millis(100)));
        // Window restarted by the second keystroke.
        assert!(!history.pump(&mut surface, &NoOverlay, t0 + Duration::from_millis(200)));
        assert!(history.pump(&mut surface, &NoOverlay, t0 + Duration::from_millis(250)));
        assert_eq!(history.stack().len(), 2);
        assert!(!history.has_pending_save());
    }

    #[test]
    fn test_discrete_change_saves_immediately_and_cancels_timer() {
        let (mut history, mut surface) = manager(10);
        let t0 = Instant::now();
        surface.type_text("a");
        history.pump(&mut surface, &NoOverlay, t0);
        assert!(history.has_pending_save());

        surface.publish(ContentChange::discrete(ChangeOrigin::Command));
        assert!(history.pump(&mut surface, &NoOverlay, t0 + Duration::from_millis(10)));
        assert!(!history.has_pending_save());
        assert_eq!(history.stack().len(), 2);
    }

    #[test]
    fn test_undo_redo_restore_exact_markup() {
        let (mut history, mut surface) = manager(10);
        let mut ui = RecordingUi::default();
        surface.type_text("one");
        history.save(&surface, &NoOverlay);
        surface.type_text(" two");
        history.save(&surface, &NoOverlay);

        assert!(history.undo(&mut surface, &mut NoOverlay, &mut ui));
        assert_eq!(surface.to_markup(), "<p>one</p>");
        assert!(history.undo(&mut surface, &mut NoOverlay, &mut ui));
        assert_eq!(surface.to_markup(), "");
        assert!(!history.undo(&mut surface, &mut NoOverlay, &mut ui));

        assert!(history.redo(&mut surface, &mut NoOverlay, &mut ui));
        assert!(history.redo(&mut surface, &mut NoOverlay, &mut ui));
        assert_eq!(surface.to_markup(), "<p>one two</p>");
        assert!(!history.redo(&mut surface, &mut NoOverlay, &mut ui));

        assert_eq!(ui.focused, 4);
        assert_eq!(ui.refreshed, 4);
    }

    #[test]
    fn test_restore_notifications_never_saved() {
        let (mut history, mut surface) = manager(10);
        surface.type_text("a");
        history.save(&surface, &NoOverlay);
        history.undo(&mut surface, &mut NoOverlay, &mut NoopUi);

        assert!(!surface.has_pending_changes());
        assert!(!history.is_restoring());
        let later = Instant::now() + Duration::from_secs(5);
        assert!(!history.pump(&mut surface, &NoOverlay, later));
        assert!(history.can_redo());
    }

    #[test]
    fn test_undo_flushes_pending_typing() {
        let (mut history, mut surface) = manager(10);
        surface.type_text("a");
        history.save(&surface, &NoOverlay);
        surface.type_text("b");
        history.pump(&mut surface, &NoOverlay, Instant::now());

        assert!(history.undo(&mut surface, &mut NoOverlay, &mut NoopUi));
        assert_eq!(surface.to_markup(), "<p>a</p>");
        assert!(history.redo(&mut surface, &mut NoOverlay, &mut NoopUi));
        assert_eq!(surface.to_markup(), "<p>ab</p>");
    }

    #[test]
    fn test_teardown_failure_is_swallowed() {
        let (mut history, mut surface) = manager(10);
        surface.type_text("a");
        history.save(&surface, &NoOverlay);
        assert!(history.undo(&mut surface, &mut FailingOverlay, &mut NoopUi));
        assert_eq!(surface.to_markup(), "");
        assert!(!history.is_restoring());
    }

    #[test]
    fn test_reset_reseeds() {
        let (mut history, mut surface) = manager(10);
        surface.type_text("a");
        history.save(&surface, &NoOverlay);
        history.reset(&mut surface, &NoOverlay);
        assert_eq!(history.stack().len(), 1);
        assert_eq!(
            history.stack().current().map(|s| s.markup()),
            Some("<p>a</p>")
        );
    }
}
