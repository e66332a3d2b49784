//! Editor configuration.
//!
//! Every field has a default, so an empty JSON object (or no config at all)
//! yields the stock editor.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EditorError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EditorConfig {
    pub history: HistoryConfig,
    pub overlay: OverlayConfig,
}

/// Undo history settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Maximum number of snapshots kept; the oldest are evicted first.
    pub max_stack_size: usize,
    /// Quiet period after the last continuous change before a snapshot.
    pub debounce_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_stack_size: 200,
            debounce_ms: 150,
        }
    }
}

impl HistoryConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Object overlay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayConfig {
    /// Smallest width/height a resize can produce.
    pub min_object_size: f64,
    /// Record a history entry when an object is selected.
    pub save_on_select: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            min_object_size: 30.0,
            save_on_select: false,
        }
    }
}

impl EditorConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        let config: EditorConfig =
            serde_json::from_str(json).map_err(|e| EditorError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EditorError> {
        if self.history.max_stack_size == 0 {
            return Err(EditorError::InvalidConfig(
                "history.maxStackSize must be at least 1".into(),
            ));
        }
        if !(self.overlay.min_object_size > 0.0) {
            return Err(EditorError::InvalidConfig(
                "overlay.minObjectSize must be positive".into(),
            ));
        }
        Ok(())
    }
}
