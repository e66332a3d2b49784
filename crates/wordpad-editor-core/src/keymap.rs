//! History keyboard shortcuts and gesture cancel.
//!
//! Typing, deleting and formatting shortcuts reach the editor as input
//! events instead (the browser turns Ctrl+B into `formatBold` and so on),
//! and navigation stays with the platform.

use smol_str::SmolStr;

/// Key values for keyboard input.
///
/// Platform-agnostic key representation. Platform-specific code converts
/// from native key events to this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),

    /// Unknown/unidentified key.
    Unidentified,

    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,

    // === Modifiers ===
    Alt,
    Control,
    Meta,
    Shift,

    // === Editing commands ===
    Undo,
    Redo,
}

impl Key {
    /// Create a character key.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Parse a DOM `KeyboardEvent.key` value.
    pub fn from_key_value(value: &str) -> Self {
        match value {
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Enter" => Self::Enter,
            "Tab" => Self::Tab,
            "Escape" | "Esc" => Self::Escape,
            "Alt" => Self::Alt,
            "Control" => Self::Control,
            "Meta" | "OS" => Self::Meta,
            "Shift" => Self::Shift,
            "Undo" => Self::Undo,
            "Redo" => Self::Redo,
            "" | "Unidentified" => Self::Unidentified,
            s if s.chars().count() == 1 => Self::character(s),
            _ => Self::Unidentified,
        }
    }

    /// Check if this is a modifier key.
    pub fn is_modifier(&self) -> bool {
        matches!(self, Self::Alt | Self::Control | Self::Meta | Self::Shift)
    }

    /// Character keys compared without case, so Shift+Z and z match alike.
    fn is_char(&self, c: char) -> bool {
        match self {
            Self::Character(s) => {
                let mut chars = s.chars();
                chars.next().is_some_and(|k| k.eq_ignore_ascii_case(&c)) && chars.next().is_none()
            }
            _ => false,
        }
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const META_SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: true,
    };

    /// Get the primary modifier for the platform (Cmd on Mac, Ctrl elsewhere).
    pub fn primary(is_mac: bool) -> Self {
        if is_mac { Self::META } else { Self::CTRL }
    }

    /// Get the primary modifier + Shift for the platform.
    pub fn primary_shift(is_mac: bool) -> Self {
        if is_mac {
            Self::META_SHIFT
        } else {
            Self::CTRL_SHIFT
        }
    }

    /// Whether the platform's primary modifier is held.
    pub fn has_primary(&self, is_mac: bool) -> bool {
        if is_mac { self.meta } else { self.ctrl }
    }
}

/// A key combination for triggering an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn primary(key: Key, is_mac: bool) -> Self {
        Self {
            key,
            modifiers: Modifiers::primary(is_mac),
        }
    }

    pub fn primary_shift(key: Key, is_mac: bool) -> Self {
        Self {
            key,
            modifiers: Modifiers::primary_shift(is_mac),
        }
    }
}

/// Editor-level actions bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Undo,
    Redo,
    /// Abandon an in-progress move or resize.
    CancelGesture,
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not a keybinding, let platform handle it.
    NotHandled,
}

/// Map a key combination to an editor action.
///
/// `Mod+Z` undoes; `Mod+Y` and `Mod+Shift+Z` redo. The Shift variant only
/// ever redoes. `Mod` is Cmd on Mac and Ctrl elsewhere.
pub fn resolve(combo: &KeyCombo, is_mac: bool) -> Option<KeyAction> {
    let mods = combo.modifiers;
    match &combo.key {
        Key::Undo => return Some(KeyAction::Undo),
        Key::Redo => return Some(KeyAction::Redo),
        Key::Escape if mods == Modifiers::NONE => return Some(KeyAction::CancelGesture),
        _ => {}
    }
    if !mods.has_primary(is_mac) || mods.alt {
        return None;
    }
    if combo.key.is_char('z') {
        Some(if mods.shift {
            KeyAction::Redo
        } else {
            KeyAction::Undo
        })
    } else if combo.key.is_char('y') && !mods.shift {
        Some(KeyAction::Redo)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_undo_redo() {
        for is_mac in [false, true] {
            let undo = KeyCombo::primary(Key::character("z"), is_mac);
            let redo_y = KeyCombo::primary(Key::character("y"), is_mac);
            let redo_shift = KeyCombo::primary_shift(Key::character("Z"), is_mac);
            assert_eq!(resolve(&undo, is_mac), Some(KeyAction::Undo));
            assert_eq!(resolve(&redo_y, is_mac), Some(KeyAction::Redo));
            assert_eq!(resolve(&redo_shift, is_mac), Some(KeyAction::Redo));
        }
    }

    #[test]
    fn test_wrong_platform_modifier_ignored() {
        let ctrl_z = KeyCombo::with_modifiers(Key::character("z"), Modifiers::CTRL);
        assert_eq!(resolve(&ctrl_z, true), None);
        let cmd_z = KeyCombo::with_modifiers(Key::character("z"), Modifiers::META);
        assert_eq!(resolve(&cmd_z, false), None);
    }

    #[test]
    fn test_plain_keys_not_bound() {
        assert_eq!(resolve(&KeyCombo::new(Key::character("z")), false), None);
        let alt = KeyCombo::with_modifiers(
            Key::character("z"),
            Modifiers {
                alt: true,
                ..Modifiers::CTRL
            },
        );
        assert_eq!(resolve(&alt, false), None);
    }

    #[test]
    fn test_escape_and_dedicated_keys() {
        assert_eq!(
            resolve(&KeyCombo::new(Key::Escape), false),
            Some(KeyAction::CancelGesture)
        );
        assert_eq!(resolve(&KeyCombo::new(Key::Undo), true), Some(KeyAction::Undo));
    }

    #[test]
    fn test_key_value_parsing() {
        assert_eq!(Key::from_key_value("Escape"), Key::Escape);
        assert_eq!(Key::from_key_value("z"), Key::character("z"));
        assert_eq!(Key::from_key_value("ArrowLeft"), Key::Unidentified);
        assert!(Key::from_key_value("Shift").is_modifier());
    }
}
