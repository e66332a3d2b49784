//! WASM browser tests for wordpad-editor-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

#![cfg(all(target_family = "wasm", target_os = "unknown"))]

use gloo_storage::{LocalStorage, Storage};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Element, EventTarget, HtmlElement, MouseEvent, MouseEventInit};

wasm_bindgen_test_configure!(run_in_browser);

use wordpad_editor_browser::BrowserEditor;
use wordpad_editor_browser::caret::{place_caret, read_caret};
use wordpad_editor_browser::dom::{BrowserLayout, render};
use wordpad_editor_core::{Caret, DocumentSurface, LayoutProvider};

fn host() -> HtmlElement {
    let document = gloo_utils::document();
    let el: HtmlElement = document.create_element("div").unwrap().unchecked_into();
    el.style().set_property("width", "600px").unwrap();
    el.style().set_property("height", "400px").unwrap();
    document.body().unwrap().append_child(&el).unwrap();
    el
}

/// A toolbar with one button, outside the editor.
fn toolbar() -> (Element, HtmlElement) {
    let document = gloo_utils::document();
    let toolbar = document.create_element("div").unwrap();
    let button: HtmlElement = document.create_element("button").unwrap().unchecked_into();
    button.set_text_content(Some("Delete"));
    toolbar.append_child(&button).unwrap();
    document.body().unwrap().append_child(&toolbar).unwrap();
    (toolbar, button)
}

const PIXEL: &str = "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

fn mouse(target: &EventTarget, kind: &str, x: f64, y: f64) {
    let init = MouseEventInit::new();
    init.set_bubbles(true);
    init.set_cancelable(true);
    init.set_client_x(x as i32);
    init.set_client_y(y as i32);
    init.set_button(0);
    let event = MouseEvent::new_with_mouse_event_init_dict(kind, &init).unwrap();
    target.dispatch_event(&event).unwrap();
}

fn find(host: &HtmlElement, selector: &str) -> Option<HtmlElement> {
    host.query_selector(selector)
        .unwrap()
        .map(|el| el.unchecked_into())
}

fn left_px(el: &HtmlElement) -> f64 {
    el.style()
        .get_property_value("left")
        .unwrap()
        .trim_end_matches("px")
        .parse()
        .unwrap_or(0.0)
}

/// Insert an image and select it with a press on it.
fn selected_image(host: &HtmlElement, editor: &BrowserEditor) {
    editor.insert_image(PIXEL.into(), Some(100.0), Some(100.0)).unwrap();
    let img = find(host, "img").unwrap();
    let r = img.get_bounding_client_rect();
    mouse(&img, "mousedown", r.x() + 5.0, r.y() + 5.0);
    assert!(find(host, ".obj-wrapper").is_some());
}

fn select_text(node: &web_sys::Node, start: u32, end: u32) {
    let selection = web_sys::window().unwrap().get_selection().unwrap().unwrap();
    selection.set_base_and_extent(node, start, node, end).unwrap();
}

// === Editor commands ===

#[wasm_bindgen_test]
fn test_table_insert_and_undo() {
    let host = host();
    let editor = BrowserEditor::new(host.clone(), None, None).unwrap();
    editor.insert_table(2, 2).unwrap();
    assert!(host.inner_html().contains("<table"));
    assert!(editor.can_undo());

    assert!(editor.undo().unwrap());
    assert!(!host.inner_html().contains("<table"));
    assert!(editor.can_redo());
}

#[wasm_bindgen_test]
fn test_config_is_validated() {
    let result = BrowserEditor::new(host(), None, Some(r#"{"history": {"maxStackSize": 0}}"#.into()));
    assert!(result.is_err());
}

#[wasm_bindgen_test]
fn test_save_and_load_json() {
    let editor = BrowserEditor::new(host(), None, None).unwrap();
    editor.import_text("first\nsecond").unwrap();
    editor.set_title(Some("Notes".into())).unwrap();
    let json = editor.save_json().unwrap();

    let other = BrowserEditor::new(host(), None, None).unwrap();
    other.load_json(&json).unwrap();
    assert_eq!(other.plain_text().unwrap(), "first\nsecond");
    assert!(!other.can_undo());
    assert!(other.export_doc().unwrap().starts_with("<h1>Notes</h1>"));
}

// === DOM mapping ===

#[wasm_bindgen_test]
fn test_rendered_elements_carry_layout() {
    let host = host();
    let mut surface = DocumentSurface::new();
    surface.type_text("hello");
    render(&host, &surface);
    let layout = BrowserLayout::new(host.clone());
    let p = surface.content()[0].id;
    let rect = layout.object_rect(&surface, p).unwrap();
    assert!(rect.width > 0.0);
    assert!(layout.surface_size().width >= 600.0);
}

#[wasm_bindgen_test]
fn test_surface_size_excludes_border() {
    let host = host();
    host.style().set_property("border", "10px solid black").unwrap();
    host.style().set_property("box-sizing", "border-box").unwrap();
    let layout = BrowserLayout::new(host.clone());

    let size = layout.surface_size();
    assert_eq!(size.width, f64::from(host.client_width()));
    assert_eq!(size.height, f64::from(host.client_height()));
    assert_eq!(size.width, 580.0);
    assert!(size.height < host.get_bounding_client_rect().height());
}

#[wasm_bindgen_test]
fn test_caret_survives_render() {
    let host = host();
    host.set_attribute("contenteditable", "true").unwrap();
    let mut surface = DocumentSurface::new();
    surface.type_text("hello");
    render(&host, &surface);

    let text = surface.content()[0].children()[0].id;
    place_caret(&host, &surface, Caret::new(text, 3));
    assert_eq!(read_caret(&host, &surface), Some(Caret::new(text, 3)));
}

// === Pointer gestures ===

#[wasm_bindgen_test]
fn test_drags_move_the_object_and_record_one_entry_each() {
    let host = host();
    let document = gloo_utils::document();
    let editor = BrowserEditor::new(host.clone(), None, None).unwrap();
    selected_image(&host, &editor);

    for _ in 0..2 {
        let shell = find(&host, ".obj-wrapper").unwrap();
        let start_left = left_px(&shell);
        let entries = editor.history_len();
        let r = shell.get_bounding_client_rect();
        let (x, y) = (r.x() + 10.0, r.y() + 10.0);

        mouse(&shell, "mousedown", x, y);
        mouse(&document, "mousemove", x + 40.0, y);
        assert!((left_px(&shell) - start_left - 40.0).abs() < 1.0);
        assert_eq!(editor.history_len(), entries);

        mouse(&document, "mouseup", x + 40.0, y);
        assert_eq!(editor.history_len(), entries + 1);

        // Moves after release are not part of any gesture.
        mouse(&document, "mousemove", x + 200.0, y + 50.0);
        mouse(&document, "mouseup", x + 200.0, y + 50.0);
        let shell = find(&host, ".obj-wrapper").unwrap();
        assert!((left_px(&shell) - start_left - 40.0).abs() < 1.0);
        assert_eq!(editor.history_len(), entries + 1);
    }

    assert!(editor.undo().unwrap());
    assert!(editor.undo().unwrap());
    assert!(!editor.markup().unwrap().contains("left"));
}

#[wasm_bindgen_test]
fn test_toolbar_delete_after_focus_leaves_editor() {
    let host = host();
    let (toolbar, button) = toolbar();
    let editor = BrowserEditor::new(host.clone(), Some(toolbar), None).unwrap();
    selected_image(&host, &editor);

    // Pressing a toolbar button takes focus away from the editor.
    host.blur().unwrap();
    button.focus().unwrap();
    mouse(&button, "mousedown", 0.0, 0.0);
    mouse(&button, "click", 0.0, 0.0);
    assert!(find(&host, ".obj-wrapper").is_some());

    assert!(editor.delete_selected_object().unwrap());
    assert!(find(&host, "img").is_none());
}

#[wasm_bindgen_test]
fn test_click_outside_releases_object() {
    let host = host();
    let editor = BrowserEditor::new(host.clone(), None, None).unwrap();
    selected_image(&host, &editor);

    let body = gloo_utils::document().body().unwrap();
    mouse(&body, "click", 1.0, 1.0);
    assert!(find(&host, ".obj-wrapper").is_none());
    assert!(find(&host, "img").is_some());
    assert!(!editor.delete_selected_object().unwrap());
}

// === Text editing ===

#[wasm_bindgen_test]
fn test_delete_at_dom_caret_then_undo() {
    let host = host();
    let editor = BrowserEditor::new(host.clone(), None, None).unwrap();
    editor.import_text("abc").unwrap();
    host.focus().unwrap();
    let text = find(&host, "p").unwrap().first_child().unwrap();
    select_text(&text, 3, 3);

    assert!(editor.delete_backward().unwrap());
    assert!(editor.delete_backward().unwrap());
    assert_eq!(editor.plain_text().unwrap(), "a");
    assert!(editor.flush().unwrap());

    assert!(editor.undo().unwrap());
    assert_eq!(editor.plain_text().unwrap(), "abc");
}

#[wasm_bindgen_test]
fn test_format_selection_from_toolbar() {
    let host = host();
    let editor = BrowserEditor::new(host.clone(), None, None).unwrap();
    editor.import_text("make bold").unwrap();
    host.focus().unwrap();
    let text = find(&host, "p").unwrap().first_child().unwrap();
    select_text(&text, 5, 9);

    assert!(editor.toggle_format("bold").unwrap());
    assert_eq!(editor.markup().unwrap(), "<p>make <b>bold</b></p>");
    assert!(editor.set_align("center").unwrap());
    assert!(editor.format_block("h2").unwrap());
    assert_eq!(
        editor.markup().unwrap(),
        "<h2 style=\"text-align: center\">make <b>bold</b></h2>"
    );
    assert!(editor.toggle_format("table").is_err());

    assert!(editor.undo().unwrap());
    assert!(editor.undo().unwrap());
    assert_eq!(editor.markup().unwrap(), "<p>make <b>bold</b></p>");
}

#[wasm_bindgen_test]
fn test_find_next_then_replace_current() {
    let editor = BrowserEditor::new(host(), None, None).unwrap();
    editor.import_text("cat and cat").unwrap();

    let first = editor.find_next("CAT").unwrap().unwrap();
    assert_eq!((first.index, first.total), (0, 2));
    let second = editor.find_next("cat").unwrap().unwrap();
    assert_eq!(second.index, 1);
    assert!(editor.replace_current("cat".into(), "dog".into()).unwrap());
    assert_eq!(editor.plain_text().unwrap(), "cat and dog");
    assert!(editor.find_next("zebra").unwrap().is_none());
}

// === Autosave ===

#[wasm_bindgen_test]
fn test_autosave_round_trip() {
    let key = "wordpad_autosave:web-test";
    LocalStorage::delete(key);
    let editor = BrowserEditor::new(host(), None, None).unwrap();
    editor.import_text("keep me").unwrap();

    assert!(editor.toggle_auto_save(Some("web-test".into())).unwrap());
    assert!(editor.is_auto_saving());
    editor.new_document().unwrap();
    assert_eq!(editor.plain_text().unwrap(), "");

    assert!(editor.restore_auto_save(Some("web-test".into())).unwrap());
    assert_eq!(editor.plain_text().unwrap(), "keep me");
    assert!(!editor.toggle_auto_save(None).unwrap());
    assert!(!editor.restore_auto_save(Some("missing".into())).unwrap());
    LocalStorage::delete(key);
}

