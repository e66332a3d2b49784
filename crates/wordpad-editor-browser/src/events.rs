//! Browser event extraction.
//!
//! Turns DOM events into the core's platform-agnostic inputs: key combos,
//! input actions, node ids and surface-relative pointer positions.

use wordpad_editor_core::{Align, DeleteUnit, EditorCommand, Key, KeyCombo, Modifiers, NodeId, Tag};

/// Attribute carrying the tree id on every rendered element.
pub const NODE_ID_ATTR: &str = "data-node-id";

// === InputType browser parsing ===

/// What a `beforeinput` event asks the editor to do.
#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    InsertText(String),
    InsertParagraph,
    DeleteBackward(DeleteUnit),
    DeleteForward(DeleteUnit),
    /// Formatting shortcuts such as Ctrl+B arrive as `format*` inputs.
    Command(EditorCommand),
    Undo,
    Redo,
    /// Not supported by the editor; the event is cancelled so the DOM never
    /// drifts from the document tree.
    Ignore,
}

/// Parse a W3C Input Events `inputType` with its data.
pub fn parse_input(input_type: &str, data: Option<String>) -> InputAction {
    match input_type {
        "insertText" | "insertReplacementText" | "insertFromPaste" | "insertFromDrop" => {
            match data {
                Some(text) if !text.is_empty() => InputAction::InsertText(text),
                _ => InputAction::Ignore,
            }
        }
        "insertParagraph" | "insertLineBreak" => InputAction::InsertParagraph,
        "deleteContentBackward" | "deleteContent" | "deleteByCut" | "deleteByDrag" => {
            InputAction::DeleteBackward(DeleteUnit::Char)
        }
        "deleteWordBackward" => InputAction::DeleteBackward(DeleteUnit::Word),
        "deleteSoftLineBackward" | "deleteHardLineBackward" => {
            InputAction::DeleteBackward(DeleteUnit::Line)
        }
        "deleteContentForward" => InputAction::DeleteForward(DeleteUnit::Char),
        "deleteWordForward" => InputAction::DeleteForward(DeleteUnit::Word),
        "deleteSoftLineForward" | "deleteHardLineForward" => {
            InputAction::DeleteForward(DeleteUnit::Line)
        }
        "formatBold" => InputAction::Command(EditorCommand::ToggleInline(Tag::Bold)),
        "formatItalic" => InputAction::Command(EditorCommand::ToggleInline(Tag::Italic)),
        "formatUnderline" => InputAction::Command(EditorCommand::ToggleInline(Tag::Underline)),
        "formatStrikeThrough" => InputAction::Command(EditorCommand::ToggleInline(Tag::Strike)),
        "formatJustifyLeft" => InputAction::Command(EditorCommand::SetAlign(Align::Left)),
        "formatJustifyCenter" => InputAction::Command(EditorCommand::SetAlign(Align::Center)),
        "formatJustifyRight" => InputAction::Command(EditorCommand::SetAlign(Align::Right)),
        "formatJustifyFull" => InputAction::Command(EditorCommand::SetAlign(Align::Justify)),
        "formatRemove" => InputAction::Command(EditorCommand::ClearFormatting),
        "insertOrderedList" => InputAction::Command(EditorCommand::ToggleList { ordered: true }),
        "insertUnorderedList" => {
            InputAction::Command(EditorCommand::ToggleList { ordered: false })
        }
        "historyUndo" => InputAction::Undo,
        "historyRedo" => InputAction::Redo,
        _ => InputAction::Ignore,
    }
}

// === Toolbar names ===

/// Character format named by a toolbar button.
pub fn inline_format(name: &str) -> Option<Tag> {
    match name.trim().to_ascii_lowercase().as_str() {
        "bold" | "b" => Some(Tag::Bold),
        "italic" | "i" => Some(Tag::Italic),
        "underline" | "u" => Some(Tag::Underline),
        "strike" | "strikethrough" | "s" => Some(Tag::Strike),
        _ => None,
    }
}

pub fn align_named(name: &str) -> Option<Align> {
    match name.trim().to_ascii_lowercase().as_str() {
        "left" => Some(Align::Left),
        "center" => Some(Align::Center),
        "right" => Some(Align::Right),
        "justify" | "full" => Some(Align::Justify),
        _ => None,
    }
}

/// Block tag for a `formatBlock` value such as `h2` or `<p>`.
pub fn block_tag(name: &str) -> Option<Tag> {
    let name = name.trim().trim_start_matches('<').trim_end_matches('>');
    match name.to_ascii_lowercase().as_str() {
        "p" => Some(Tag::Paragraph),
        "div" => Some(Tag::Div),
        heading => {
            let level: u8 = heading.strip_prefix('h')?.parse().ok()?;
            (1..=6).contains(&level).then_some(Tag::Heading(level))
        }
    }
}

/// Build a key combo from `KeyboardEvent` fields.
pub fn key_combo(key: &str, ctrl: bool, alt: bool, shift: bool, meta: bool) -> KeyCombo {
    KeyCombo::with_modifiers(
        Key::from_key_value(key),
        Modifiers {
            ctrl,
            alt,
            shift,
            meta,
        },
    )
}

/// Parse a `data-node-id` attribute value.
pub fn parse_node_id(value: &str) -> Option<NodeId> {
    value.trim().parse().ok().map(NodeId)
}

// === DOM extraction ===

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod dom {
    use wasm_bindgen::JsCast;
    use web_sys::{Element, HtmlElement, KeyboardEvent, MouseEvent};
    use wordpad_editor_core::{KeyCombo, NodeId, Point};

    use super::{NODE_ID_ATTR, key_combo, parse_node_id};

    pub fn key_combo_from_event(event: &KeyboardEvent) -> KeyCombo {
        key_combo(
            &event.key(),
            event.ctrl_key(),
            event.alt_key(),
            event.shift_key(),
            event.meta_key(),
        )
    }

    pub fn node_id_of_element(element: &Element) -> Option<NodeId> {
        element
            .get_attribute(NODE_ID_ATTR)
            .and_then(|v| parse_node_id(&v))
    }

    /// Id of the closest rendered node at or above the event target.
    pub fn target_node_id(event: &web_sys::Event) -> Option<NodeId> {
        let target = event.target()?;
        let element: &Element = target.dyn_ref()?;
        let closest = element
            .closest(&format!("[{NODE_ID_ATTR}]"))
            .ok()
            .flatten()?;
        node_id_of_element(&closest)
    }

    /// Pointer position relative to the host's content box origin.
    pub fn pointer_position(host: &HtmlElement, event: &MouseEvent) -> Point {
        let rect = host.get_bounding_client_rect();
        Point::new(
            f64::from(event.client_x()) - rect.x() + f64::from(host.scroll_left()),
            f64::from(event.client_y()) - rect.y() + f64::from(host.scroll_top()),
        )
    }
}

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use dom::{key_combo_from_event, node_id_of_element, pointer_position, target_node_id};
