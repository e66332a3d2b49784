//! Content-changed notifications.
//!
//! Every mutator of the document surface (typing, commands, overlay
//! gestures, restores) publishes a [`ContentChange`] here. The history
//! manager is the only consumer: it drains the channel and decides whether
//! to debounce or snapshot immediately.

use std::collections::VecDeque;

/// How a change should be folded into history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// Low-level mutation that is expected to repeat (a keystroke).
    /// Coalesced until the debounce window passes.
    Continuous,
    /// One completed edit. Snapshotted immediately.
    Discrete,
}

/// What produced the change. Used for logging only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOrigin {
    Typing,
    Deleting,
    Command,
    ObjectSelect,
    ObjectRelease,
    ObjectMove,
    ObjectResize,
    ObjectDelete,
    Restore,
    Load,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentChange {
    pub kind: ChangeKind,
    pub origin: ChangeOrigin,
}

impl ContentChange {
    pub fn continuous(origin: ChangeOrigin) -> Self {
        Self {
            kind: ChangeKind::Continuous,
            origin,
        }
    }

    pub fn discrete(origin: ChangeOrigin) -> Self {
        Self {
            kind: ChangeKind::Discrete,
            origin,
        }
    }
}

/// FIFO of pending change notifications.
#[derive(Clone, Debug, Default)]
pub struct ChangeChannel {
    queue: VecDeque<ContentChange>,
}

impl ChangeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, change: ContentChange) {
        tracing::trace!(kind = ?change.kind, origin = ?change.origin, "content changed");
        self.queue.push_back(change);
    }

    /// Take all pending notifications in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = ContentChange> + '_ {
        self.queue.drain(..)
    }

    /// Drop pending notifications without delivering them.
    pub fn discard(&mut self) -> usize {
        let n = self.queue.len();
        self.queue.clear();
        n
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
