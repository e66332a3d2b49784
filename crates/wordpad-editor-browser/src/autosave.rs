//! LocalStorage autosave.
//!
//! While autosave is on, the clean document is written to LocalStorage
//! every few seconds under `wordpad_autosave:<name>`. A write is skipped
//! when nothing changed since the last one.

use wordpad_editor_core::DocumentMeta;

/// Milliseconds between autosave checks.
pub const AUTOSAVE_INTERVAL_MS: u32 = 3_000;

/// Prefix for autosave keys in LocalStorage.
pub const AUTOSAVE_KEY_PREFIX: &str = "wordpad_autosave:";

/// Name used when the host does not pick one.
pub const DEFAULT_AUTOSAVE_NAME: &str = "untitled";

pub fn storage_key(name: &str) -> String {
    format!("{AUTOSAVE_KEY_PREFIX}{name}")
}

/// Remembers what was written last.
#[derive(Debug, Default)]
pub struct SaveTracker {
    last: Option<(String, DocumentMeta)>,
}

impl SaveTracker {
    pub fn should_save(&self, markup: &str, meta: &DocumentMeta) -> bool {
        self.last
            .as_ref()
            .is_none_or(|(m, d)| m != markup || d != meta)
    }

    pub fn record(&mut self, markup: &str, meta: &DocumentMeta) {
        self.last = Some((markup.to_owned(), meta.clone()));
    }
}

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod storage {
    use gloo_storage::errors::StorageError;
    use gloo_storage::{LocalStorage, Storage};
    use gloo_timers::callback::Interval;
    use wordpad_editor_core::SavedDocument;

    use super::{AUTOSAVE_INTERVAL_MS, SaveTracker};

    /// A running autosave. Dropping it stops the interval.
    pub struct AutoSave {
        key: String,
        tracker: SaveTracker,
        _interval: Interval,
    }

    impl AutoSave {
        pub fn start(key: String, on_tick: impl FnMut() + 'static) -> Self {
            tracing::debug!(%key, "autosave started");
            Self {
                key,
                tracker: SaveTracker::default(),
                _interval: Interval::new(AUTOSAVE_INTERVAL_MS, on_tick),
            }
        }

        /// Write `doc` unless it matches the last write. Returns whether it
        /// was written.
        pub fn save(&mut self, doc: &SavedDocument, markup: &str) -> Result<bool, StorageError> {
            if !self.tracker.should_save(markup, &doc.meta) {
                return Ok(false);
            }
            LocalStorage::set(&self.key, doc)?;
            self.tracker.record(markup, &doc.meta);
            tracing::debug!(key = %self.key, bytes = markup.len(), "autosaved");
            Ok(true)
        }
    }

    /// Read an autosaved document, if there is a loadable one.
    pub fn load(key: &str) -> Option<SavedDocument> {
        let doc: SavedDocument = LocalStorage::get(key).ok()?;
        match doc.validate() {
            Ok(()) => Some(doc),
            Err(err) => {
                tracing::warn!(%err, key, "ignoring autosave");
                None
            }
        }
    }
}

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use storage::{AutoSave, load};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key() {
        assert_eq!(storage_key("notes"), "wordpad_autosave:notes");
    }

    #[test]
    fn test_tracker_skips_unchanged_documents() {
        let mut tracker = SaveTracker::default();
        let meta = DocumentMeta::default();
        assert!(tracker.should_save("<p>a</p>", &meta));
        tracker.record("<p>a</p>", &meta);
        assert!(!tracker.should_save("<p>a</p>", &meta));
        assert!(tracker.should_save("<p>ab</p>", &meta));

        let titled = DocumentMeta {
            title: Some("Notes".into()),
            author: None,
        };
        assert!(tracker.should_save("<p>a</p>", &titled));
    }
}
