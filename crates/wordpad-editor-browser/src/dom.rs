//! DOM rendering and the browser implementations of the core's platform
//! traits.
//!
//! The host element's children are always a rendering of the document
//! tree. Every element carries `data-node-id`, which is how layout queries,
//! event targets and caret positions find their way back to tree nodes.

use web_sys::{Element, HtmlElement};
use wordpad_editor_core::{
    ActiveFormats, Align, DocumentSurface, LayoutProvider, NodeId, ObjectOverlayManager, Rect,
    Size, UiHooks,
};

use crate::events::NODE_ID_ATTR;

/// Find the rendered element for a tree node.
pub fn find_node_element(host: &HtmlElement, id: NodeId) -> Option<Element> {
    host.query_selector(&format!("[{NODE_ID_ATTR}=\"{}\"]", id.0))
        .ok()
        .flatten()
}

/// Replace the host's children with a fresh rendering of the surface.
pub fn render(host: &HtmlElement, surface: &DocumentSurface) {
    host.set_inner_html(&surface.render_html());
}

/// Update only the inline styles of the wrapper and its object.
///
/// Used on every pointer move during a gesture, where re-rendering the
/// whole surface would be wasteful.
pub fn patch_overlay(host: &HtmlElement, surface: &DocumentSurface, overlay: &ObjectOverlayManager) {
    for id in [overlay.shell(), overlay.selected()].into_iter().flatten() {
        let Some(el) = find_node_element(host, id) else {
            continue;
        };
        let css = surface
            .find(id)
            .and_then(|n| n.as_element())
            .map(|e| e.style.to_css())
            .unwrap_or_default();
        let result = if css.is_empty() {
            el.remove_attribute("style")
        } else {
            el.set_attribute("style", &css)
        };
        if let Err(err) = result {
            tracing::debug!(?err, node = %id, "could not patch style");
        }
    }
}

// === LayoutProvider ===

/// Geometry read from the rendered DOM.
pub struct BrowserLayout {
    host: HtmlElement,
}

impl BrowserLayout {
    pub fn new(host: HtmlElement) -> Self {
        Self { host }
    }
}

impl LayoutProvider for BrowserLayout {
    fn object_rect(&self, _surface: &DocumentSurface, id: NodeId) -> Option<Rect> {
        let el = find_node_element(&self.host, id)?;
        let r = el.get_bounding_client_rect();
        let h = self.host.get_bounding_client_rect();
        Some(Rect::new(
            r.x() - h.x() + f64::from(self.host.scroll_left()),
            r.y() - h.y() + f64::from(self.host.scroll_top()),
            r.width(),
            r.height(),
        ))
    }

    /// The visible content box. Objects are clamped to it, so a drag
    /// cannot push one past the edge and grow the scroll area.
    fn surface_size(&self) -> Size {
        Size::new(
            f64::from(self.host.client_width()),
            f64::from(self.host.client_height()),
        )
    }
}

// === UiHooks ===

/// Focus and toolbar state in the page.
///
/// Toolbar buttons are found by `data-format` (`bold`, `italic`,
/// `underline`, `strike`, `ordered-list`, `unordered-list`,
/// `align-left` and so on); the table tools group by `data-table-tools`.
pub struct BrowserUi {
    host: HtmlElement,
    toolbar: Option<Element>,
}

impl BrowserUi {
    pub fn new(host: HtmlElement, toolbar: Option<Element>) -> Self {
        Self { host, toolbar }
    }

    fn toolbar_item(&self, selector: &str) -> Option<Element> {
        self.toolbar.as_ref()?.query_selector(selector).ok().flatten()
    }
}

fn format_states(formats: &ActiveFormats) -> [(&'static str, bool); 10] {
    [
        ("bold", formats.bold),
        ("italic", formats.italic),
        ("underline", formats.underline),
        ("strike", formats.strike),
        ("ordered-list", formats.ordered_list),
        ("unordered-list", formats.unordered_list),
        ("align-left", formats.align == Some(Align::Left)),
        ("align-center", formats.align == Some(Align::Center)),
        ("align-right", formats.align == Some(Align::Right)),
        ("align-justify", formats.align == Some(Align::Justify)),
    ]
}

impl UiHooks for BrowserUi {
    fn focus_surface(&mut self) {
        if let Err(err) = self.host.focus() {
            tracing::debug!(?err, "could not focus editor");
        }
    }

    fn refresh_active_states(&mut self, formats: &ActiveFormats) {
        for (name, active) in format_states(formats) {
            let Some(button) = self.toolbar_item(&format!("[data-format=\"{name}\"]")) else {
                continue;
            };
            if let Err(err) = button
                .class_list()
                .toggle_with_force("active-format", active)
            {
                tracing::debug!(?err, name, "could not update toolbar state");
            }
        }
    }

    fn show_table_tools(&mut self, visible: bool) {
        let Some(tools) = self.toolbar_item("[data-table-tools]") else {
            return;
        };
        let result = if visible {
            tools.remove_attribute("hidden")
        } else {
            tools.set_attribute("hidden", "")
        };
        if let Err(err) = result {
            tracing::debug!(?err, "could not toggle table tools");
        }
    }
}

/// Make the host a positioned, editable container.
pub fn prepare_host(host: &HtmlElement) -> Result<(), wasm_bindgen::JsValue> {
    host.set_attribute("contenteditable", "true")?;
    host.style().set_property("position", "relative")?;
    if host.tab_index() < 0 {
        host.set_tab_index(0);
    }
    Ok(())
}
