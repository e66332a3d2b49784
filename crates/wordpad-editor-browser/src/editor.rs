//! BrowserEditor - the editor wired to a host element, exposed to JavaScript.
//!
//! All DOM listeners are installed once, at construction: typing, keys and
//! presses on the host, one `mousemove`/`mouseup` pair on the document for
//! move and resize gestures, and a document `click` that releases the
//! selected object when the user clicks outside the editor and toolbar.
//! Every handler routes through the single `EditorContext`, re-renders when
//! the tree changed, and re-arms the debounce timer.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo_events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlElement, InputEvent, KeyboardEvent, MouseEvent};

use wordpad_editor_core::persist::{self, DocumentMeta};
use wordpad_editor_core::{
    ClickOutcome, CommandOutcome, DeleteUnit, EditorCommand, EditorConfig, EditorContext,
    EditorError, KeydownResult, SavedDocument, Size, UndoManager,
};

use crate::autosave::{self, AutoSave, DEFAULT_AUTOSAVE_NAME, storage_key};
use crate::caret::{place_caret, place_selection, read_selection};
use crate::dom::{self, BrowserLayout, BrowserUi};
use crate::events::{
    InputAction, align_named, block_tag, inline_format, key_combo_from_event, parse_input,
    pointer_position, target_node_id,
};
use crate::platform::{Platform, platform};
use crate::timer::SaveTimer;

type Context = EditorContext<BrowserLayout, BrowserUi>;

struct Session {
    ctx: Context,
    host: HtmlElement,
    toolbar: Option<Element>,
    timer: SaveTimer,
    platform: Platform,
    meta: DocumentMeta,
    /// Set by the `mouseup` that ends a gesture, so the `click` that
    /// follows it does not release the object.
    gesture_ended: bool,
    autosave: Option<AutoSave>,
}

impl Session {
    fn render(&self) {
        dom::render(&self.host, self.ctx.surface());
        // Restoring the selection would pull focus back from the toolbar
        // or a dialog.
        if !self.has_focus() {
            return;
        }
        let surface = self.ctx.surface();
        match (surface.anchor(), surface.caret()) {
            (Some(anchor), Some(focus)) => place_selection(&self.host, surface, anchor, focus),
            (None, Some(caret)) => place_caret(&self.host, surface, caret),
            _ => {}
        }
    }

    fn has_focus(&self) -> bool {
        gloo_utils::document().active_element().is_some_and(|el| {
            let node: &web_sys::Node = el.as_ref();
            self.host.contains(Some(node))
        })
    }

    /// Whether `node` belongs to the editor or its toolbar.
    fn owns(&self, node: &web_sys::Node) -> bool {
        self.host.contains(Some(node))
            || self
                .toolbar
                .as_ref()
                .is_some_and(|toolbar| toolbar.contains(Some(node)))
    }

    /// Mirror the DOM selection into the tree before an edit.
    fn capture_selection(&mut self) {
        if let Some((anchor, focus)) = read_selection(&self.host, self.ctx.surface()) {
            self.ctx.set_selection(anchor, focus);
        }
    }

    fn execute_logged(&mut self, command: &EditorCommand) {
        if let Err(err) = self.ctx.execute(command) {
            tracing::debug!(%err, "input command not applied");
        }
    }
}

type Shared = Rc<RefCell<Session>>;

fn to_js(err: EditorError) -> JsError {
    JsError::new(&err.to_string())
}

// === Debounce timer ===

fn arm_timer(shared: &Shared) {
    let weak = Rc::downgrade(shared);
    let Ok(mut session) = shared.try_borrow_mut() else {
        return;
    };
    let deadline = session.ctx.next_deadline();
    session.timer.arm(deadline, move || on_timer(&weak));
}

fn on_timer(weak: &Weak<RefCell<Session>>) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    {
        let Ok(mut session) = shared.try_borrow_mut() else {
            tracing::debug!("save timer fired while editor busy");
            return;
        };
        session.ctx.tick();
        session.timer.disarm();
    }
    arm_timer(&shared);
}

// === Autosave ===

fn autosave_tick(weak: &Weak<RefCell<Session>>) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let Ok(mut session) = shared.try_borrow_mut() else {
        tracing::debug!("autosave skipped while editor busy");
        return;
    };
    let snapshot = session.ctx.snapshot();
    let doc = match SavedDocument::new(snapshot.content(), &session.meta) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(%err, "autosave skipped");
            return;
        }
    };
    let Some(autosave) = session.autosave.as_mut() else {
        return;
    };
    if let Err(err) = autosave.save(&doc, snapshot.markup()) {
        tracing::warn!(%err, "autosave failed");
    }
}

// === Event handlers ===

fn on_mousedown(shared: &Shared, event: &web_sys::Event) {
    let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
        return;
    };
    if mouse.button() != 0 {
        return;
    }
    {
        let Ok(mut session) = shared.try_borrow_mut() else {
            return;
        };
        session.gesture_ended = false;
        let target = target_node_id(event);
        let pos = pointer_position(&session.host, mouse);
        if let Some(id) = target {
            if session.ctx.pointer_down(id, pos) {
                event.prevent_default();
                return;
            }
        }
        match session.ctx.click(target) {
            ClickOutcome::Selected(_) => {
                event.prevent_default();
                session.render();
            }
            ClickOutcome::Released => session.render(),
            ClickOutcome::Kept | ClickOutcome::Ignored => {}
        }
    }
    arm_timer(shared);
}

fn on_mousemove(shared: &Shared, event: &web_sys::Event) {
    let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
        return;
    };
    let Ok(mut session) = shared.try_borrow_mut() else {
        return;
    };
    if !session.ctx.overlay().is_gesture_active() {
        return;
    }
    let pos = pointer_position(&session.host, mouse);
    if session.ctx.pointer_move(pos) {
        dom::patch_overlay(&session.host, session.ctx.surface(), session.ctx.overlay());
    }
}

fn on_mouseup(shared: &Shared) {
    {
        let Ok(mut session) = shared.try_borrow_mut() else {
            return;
        };
        if !session.ctx.overlay().is_gesture_active() {
            return;
        }
        session.ctx.pointer_up();
        session.gesture_ended = true;
        session.render();
    }
    arm_timer(shared);
}

fn on_keydown(shared: &Shared, event: &web_sys::Event) {
    let Some(key) = event.dyn_ref::<KeyboardEvent>() else {
        return;
    };
    {
        let Ok(mut session) = shared.try_borrow_mut() else {
            return;
        };
        let combo = key_combo_from_event(key);
        let is_mac = session.platform.uses_meta();
        if session.ctx.handle_key(&combo, is_mac) == KeydownResult::NotHandled {
            return;
        }
        event.prevent_default();
        session.render();
    }
    arm_timer(shared);
}

fn input_data(input: &InputEvent) -> Option<String> {
    input
        .data()
        .filter(|d| !d.is_empty())
        .or_else(|| {
            input
                .data_transfer()
                .and_then(|dt| dt.get_data("text/plain").ok())
        })
}

fn on_beforeinput(shared: &Shared, event: &web_sys::Event) {
    let Some(input) = event.dyn_ref::<InputEvent>() else {
        return;
    };
    // IME composition is left to the browser until it commits.
    if input.is_composing() {
        return;
    }
    event.prevent_default();
    {
        let Ok(mut session) = shared.try_borrow_mut() else {
            return;
        };
        let input_type = input.input_type();
        match parse_input(&input_type, input_data(input)) {
            InputAction::InsertText(text) => {
                session.capture_selection();
                session.ctx.type_text(&text);
            }
            InputAction::InsertParagraph => {
                session.capture_selection();
                session.execute_logged(&EditorCommand::InsertParagraph);
            }
            InputAction::DeleteBackward(unit) => {
                session.capture_selection();
                session.ctx.delete_backward(unit);
            }
            InputAction::DeleteForward(unit) => {
                session.capture_selection();
                session.ctx.delete_forward(unit);
            }
            InputAction::Command(command) => {
                session.capture_selection();
                session.execute_logged(&command);
            }
            InputAction::Undo => {
                session.ctx.undo();
            }
            InputAction::Redo => {
                session.ctx.redo();
            }
            InputAction::Ignore => {
                tracing::trace!(%input_type, "ignored input");
                return;
            }
        }
        session.render();
    }
    arm_timer(shared);
}

fn on_document_click(shared: &Shared, event: &web_sys::Event) {
    {
        let Ok(mut session) = shared.try_borrow_mut() else {
            return;
        };
        if std::mem::take(&mut session.gesture_ended) {
            return;
        }
        let inside = event
            .target()
            .and_then(|t| t.dyn_into::<web_sys::Node>().ok())
            .is_some_and(|node| session.owns(&node));
        if inside || !session.ctx.blur() {
            return;
        }
        session.render();
    }
    arm_timer(shared);
}

// === JS surface ===

/// An editor bound to a host element.
#[wasm_bindgen]
pub struct BrowserEditor {
    shared: Shared,
    _listeners: Vec<EventListener>,
}

#[wasm_bindgen]
impl BrowserEditor {
    /// Attach an editor to `host`. `toolbar` holds the format buttons and
    /// table tools; `config` is optional JSON editor configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(
        host: HtmlElement,
        toolbar: Option<Element>,
        config: Option<String>,
    ) -> Result<BrowserEditor, JsError> {
        let config = match config {
            Some(json) => EditorConfig::from_json(&json).map_err(to_js)?,
            None => EditorConfig::default(),
        };
        dom::prepare_host(&host).map_err(|e| JsError::new(&format!("{e:?}")))?;

        let ctx = EditorContext::new(
            config,
            BrowserLayout::new(host.clone()),
            BrowserUi::new(host.clone(), toolbar.clone()),
        );
        let shared: Shared = Rc::new(RefCell::new(Session {
            ctx,
            host: host.clone(),
            toolbar,
            timer: SaveTimer::new(),
            platform: platform(),
            meta: DocumentMeta::default(),
            gesture_ended: false,
            autosave: None,
        }));

        let document = gloo_utils::document();
        let listeners = vec![
            EventListener::new_with_options(&host, "mousedown", EventListenerOptions::enable_prevent_default(), {
                let shared = shared.clone();
                move |e| on_mousedown(&shared, e)
            }),
            EventListener::new(&document, "mousemove", {
                let shared = shared.clone();
                move |e| on_mousemove(&shared, e)
            }),
            EventListener::new(&document, "mouseup", {
                let shared = shared.clone();
                move |_| on_mouseup(&shared)
            }),
            EventListener::new_with_options(&host, "keydown", EventListenerOptions::enable_prevent_default(), {
                let shared = shared.clone();
                move |e| on_keydown(&shared, e)
            }),
            EventListener::new_with_options(&host, "beforeinput", EventListenerOptions::enable_prevent_default(), {
                let shared = shared.clone();
                move |e| on_beforeinput(&shared, e)
            }),
            EventListener::new(&document, "click", {
                let shared = shared.clone();
                move |e| on_document_click(&shared, e)
            }),
        ];

        shared.borrow().render();
        tracing::debug!("editor attached");
        Ok(Self {
            shared,
            _listeners: listeners,
        })
    }

    // === History ===

    pub fn undo(&self) -> Result<bool, JsError> {
        self.with_session(|s| s.ctx.undo())
    }

    pub fn redo(&self) -> Result<bool, JsError> {
        self.with_session(|s| s.ctx.redo())
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.shared
            .try_borrow()
            .is_ok_and(|s| UndoManager::can_undo(&s.ctx))
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.shared
            .try_borrow()
            .is_ok_and(|s| UndoManager::can_redo(&s.ctx))
    }

    /// Record pending typing now instead of waiting for the debounce.
    pub fn flush(&self) -> Result<bool, JsError> {
        self.with_session(|s| s.ctx.save())
    }

    /// Number of recorded history entries, including the initial one.
    #[wasm_bindgen(js_name = historyLen)]
    pub fn history_len(&self) -> usize {
        self.shared
            .try_borrow()
            .map_or(0, |s| s.ctx.history().stack().len())
    }

    // === Editing ===

    /// Backspace at the current selection.
    #[wasm_bindgen(js_name = deleteBackward)]
    pub fn delete_backward(&self) -> Result<bool, JsError> {
        self.with_session(|s| {
            s.capture_selection();
            s.ctx.delete_backward(DeleteUnit::Char)
        })
    }

    #[wasm_bindgen(js_name = deleteForward)]
    pub fn delete_forward(&self) -> Result<bool, JsError> {
        self.with_session(|s| {
            s.capture_selection();
            s.ctx.delete_forward(DeleteUnit::Char)
        })
    }

    // === Formatting ===

    /// Toggle `bold`, `italic`, `underline` or `strike`.
    #[wasm_bindgen(js_name = toggleFormat)]
    pub fn toggle_format(&self, name: &str) -> Result<bool, JsError> {
        let tag = inline_format(name)
            .ok_or_else(|| JsError::new(&format!("unknown format {name:?}")))?;
        self.run_at_selection(EditorCommand::ToggleInline(tag))
            .map(|o| o != CommandOutcome::NoOp)
    }

    /// Align the caret's paragraph: `left`, `center`, `right` or `justify`.
    #[wasm_bindgen(js_name = setAlign)]
    pub fn set_align(&self, name: &str) -> Result<bool, JsError> {
        let align =
            align_named(name).ok_or_else(|| JsError::new(&format!("unknown alignment {name:?}")))?;
        self.run_at_selection(EditorCommand::SetAlign(align))
            .map(|o| o != CommandOutcome::NoOp)
    }

    /// Turn the caret's paragraph into `p`, `div` or `h1`..`h6`.
    #[wasm_bindgen(js_name = formatBlock)]
    pub fn format_block(&self, tag: &str) -> Result<bool, JsError> {
        let tag = block_tag(tag).ok_or_else(|| JsError::new(&format!("unknown block {tag:?}")))?;
        self.run_at_selection(EditorCommand::FormatBlock(tag))
            .map(|o| o != CommandOutcome::NoOp)
    }

    #[wasm_bindgen(js_name = toggleList)]
    pub fn toggle_list(&self, ordered: bool) -> Result<bool, JsError> {
        self.run_at_selection(EditorCommand::ToggleList { ordered })
            .map(|o| o != CommandOutcome::NoOp)
    }

    #[wasm_bindgen(js_name = clearFormatting)]
    pub fn clear_formatting(&self) -> Result<bool, JsError> {
        self.run_at_selection(EditorCommand::ClearFormatting)
            .map(|o| o != CommandOutcome::NoOp)
    }

    // === Commands ===

    #[wasm_bindgen(js_name = insertImage)]
    pub fn insert_image(
        &self,
        src: String,
        width: Option<f64>,
        height: Option<f64>,
    ) -> Result<(), JsError> {
        let size = width.zip(height).map(|(w, h)| Size::new(w, h));
        self.run_at_selection(EditorCommand::InsertImage { src, size })
            .map(drop)
    }

    #[wasm_bindgen(js_name = insertTable)]
    pub fn insert_table(&self, rows: usize, cols: usize) -> Result<(), JsError> {
        self.run_at_selection(EditorCommand::InsertTable { rows, cols })
            .map(drop)
    }

    #[wasm_bindgen(js_name = insertLink)]
    pub fn insert_link(&self, url: String, text: Option<String>) -> Result<(), JsError> {
        self.run_at_selection(EditorCommand::InsertLink { url, text })
            .map(drop)
    }

    #[wasm_bindgen(js_name = addRow)]
    pub fn add_row(&self) -> Result<(), JsError> {
        self.run(EditorCommand::AddRow).map(drop)
    }

    #[wasm_bindgen(js_name = addColumn)]
    pub fn add_column(&self) -> Result<(), JsError> {
        self.run(EditorCommand::AddColumn).map(drop)
    }

    #[wasm_bindgen(js_name = removeRow)]
    pub fn remove_row(&self) -> Result<(), JsError> {
        self.run(EditorCommand::RemoveRow).map(drop)
    }

    #[wasm_bindgen(js_name = removeColumn)]
    pub fn remove_column(&self) -> Result<(), JsError> {
        self.run(EditorCommand::RemoveColumn).map(drop)
    }

    #[wasm_bindgen(js_name = removeTable)]
    pub fn remove_table(&self) -> Result<(), JsError> {
        self.run(EditorCommand::RemoveTable).map(drop)
    }

    /// Returns the number of replacements made.
    #[wasm_bindgen(js_name = replaceAll)]
    pub fn replace_all(&self, find: String, replace: String) -> Result<usize, JsError> {
        match self.run(EditorCommand::ReplaceAll { find, replace })? {
            CommandOutcome::Replaced(n) => Ok(n),
            _ => Ok(0),
        }
    }

    /// Select the next match after the caret, wrapping around. Returns
    /// nothing when the text does not occur.
    #[wasm_bindgen(js_name = findNext)]
    pub fn find_next(&self, query: &str) -> Result<Option<MatchInfo>, JsError> {
        self.with_session(|s| {
            s.ctx.find_next(query).map(|m| MatchInfo {
                index: m.index,
                total: m.total,
            })
        })
    }

    /// Replace the selected match, or the next one. Returns whether a
    /// replacement was made.
    #[wasm_bindgen(js_name = replaceCurrent)]
    pub fn replace_current(&self, find: String, replace: String) -> Result<bool, JsError> {
        let outcome = self.run(EditorCommand::ReplaceCurrent { find, replace })?;
        Ok(outcome != CommandOutcome::NoOp)
    }

    #[wasm_bindgen(js_name = deleteSelectedObject)]
    pub fn delete_selected_object(&self) -> Result<bool, JsError> {
        let outcome = self.run(EditorCommand::DeleteSelectedObject)?;
        Ok(outcome != CommandOutcome::NoOp)
    }

    /// Clear the document. The previous content stays reachable by undo.
    #[wasm_bindgen(js_name = newDocument)]
    pub fn new_document(&self) -> Result<(), JsError> {
        self.run(EditorCommand::ResetContent).map(drop)
    }

    // === Documents ===

    #[wasm_bindgen(js_name = setTitle)]
    pub fn set_title(&self, title: Option<String>) -> Result<(), JsError> {
        self.with_session(|s| s.meta.title = title)
    }

    #[wasm_bindgen(js_name = setAuthor)]
    pub fn set_author(&self, author: Option<String>) -> Result<(), JsError> {
        self.with_session(|s| s.meta.author = author)
    }

    /// Clean markup, without object wrappers.
    pub fn markup(&self) -> Result<String, JsError> {
        self.read(|s| s.ctx.clean_markup())
    }

    #[wasm_bindgen(js_name = plainText)]
    pub fn plain_text(&self) -> Result<String, JsError> {
        self.read(|s| s.ctx.surface().to_plain_text())
    }

    #[wasm_bindgen(js_name = saveJson)]
    pub fn save_json(&self) -> Result<String, JsError> {
        self.read(|s| persist::save_json(s.ctx.snapshot().content(), &s.meta))?
            .map_err(to_js)
    }

    /// Replace the document from saved JSON. History starts over.
    #[wasm_bindgen(js_name = loadJson)]
    pub fn load_json(&self, json: &str) -> Result<(), JsError> {
        let doc = persist::load_json(json).map_err(to_js)?;
        self.with_session(move |s| {
            s.meta = doc.meta;
            s.ctx.load(doc.content);
        })
    }

    /// Replace the document with plain text, one paragraph per line.
    #[wasm_bindgen(js_name = importText)]
    pub fn import_text(&self, text: &str) -> Result<(), JsError> {
        let content = persist::nodes_from_plain_text(text);
        self.with_session(move |s| s.ctx.load(content))
    }

    /// HTML body for a `.doc` download.
    #[wasm_bindgen(js_name = exportDoc)]
    pub fn export_doc(&self) -> Result<String, JsError> {
        self.read(|s| persist::export_markup(s.ctx.snapshot().content(), &s.meta))
    }

    // === Autosave ===

    /// Turn LocalStorage autosave on or off. When turned on the document
    /// is saved at once, then every few seconds while it changes. Returns
    /// whether autosave is now on.
    #[wasm_bindgen(js_name = toggleAutoSave)]
    pub fn toggle_auto_save(&self, name: Option<String>) -> Result<bool, JsError> {
        let enabled = {
            let mut session = self
                .shared
                .try_borrow_mut()
                .map_err(|_| JsError::new("editor is busy"))?;
            if session.autosave.take().is_some() {
                tracing::debug!("autosave stopped");
                false
            } else {
                let key = storage_key(name.as_deref().unwrap_or(DEFAULT_AUTOSAVE_NAME));
                let weak = Rc::downgrade(&self.shared);
                session.autosave = Some(AutoSave::start(key, move || autosave_tick(&weak)));
                true
            }
        };
        if enabled {
            autosave_tick(&Rc::downgrade(&self.shared));
        }
        Ok(enabled)
    }

    #[wasm_bindgen(js_name = isAutoSaving)]
    pub fn is_auto_saving(&self) -> bool {
        self.shared
            .try_borrow()
            .is_ok_and(|s| s.autosave.is_some())
    }

    /// Load the autosaved document, if one exists. History starts over.
    #[wasm_bindgen(js_name = restoreAutoSave)]
    pub fn restore_auto_save(&self, name: Option<String>) -> Result<bool, JsError> {
        let key = storage_key(name.as_deref().unwrap_or(DEFAULT_AUTOSAVE_NAME));
        let Some(doc) = autosave::load(&key) else {
            return Ok(false);
        };
        self.with_session(move |s| {
            s.meta = doc.meta;
            s.ctx.load(doc.content);
        })?;
        Ok(true)
    }
}

/// Position of the selected match, counted from zero.
#[wasm_bindgen]
#[derive(Clone, Copy, Debug)]
pub struct MatchInfo {
    pub index: usize,
    pub total: usize,
}

impl BrowserEditor {
    fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> Result<R, JsError> {
        let session = self
            .shared
            .try_borrow()
            .map_err(|_| JsError::new("editor is busy"))?;
        Ok(f(&session))
    }

    /// Run `f`, re-render and re-arm the debounce timer.
    fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Result<R, JsError> {
        let out = {
            let mut session = self
                .shared
                .try_borrow_mut()
                .map_err(|_| JsError::new("editor is busy"))?;
            let out = f(&mut session);
            session.render();
            out
        };
        arm_timer(&self.shared);
        Ok(out)
    }

    fn run(&self, command: EditorCommand) -> Result<CommandOutcome, JsError> {
        self.with_session(|s| s.ctx.execute(&command))?
            .map_err(to_js)
    }

    /// Like [`run`](Self::run), acting at the page's current selection.
    fn run_at_selection(&self, command: EditorCommand) -> Result<CommandOutcome, JsError> {
        self.with_session(|s| {
            s.capture_selection();
            s.ctx.execute(&command)
        })?
        .map_err(to_js)
    }
}
