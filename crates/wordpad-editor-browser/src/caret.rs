//! Mapping between tree carets and DOM selection positions.
//!
//! The rendered DOM is not a one-to-one copy of the tree: empty text nodes
//! render nothing, and adjacent text nodes are merged into one DOM text
//! node by the HTML parser. Positions are translated through "runs" of
//! consecutive tree text nodes, each of which is one DOM text node.

use wordpad_editor_core::{Caret, DocumentSurface, Node, NodeId};

/// A caret position in the rendered DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomPosition {
    /// Inside the text node at DOM child index `child` of `parent`.
    /// `parent` is None for the host element.
    Text {
        parent: Option<NodeId>,
        child: usize,
        offset: usize,
    },
    /// Between children of an element, before DOM child index `child`.
    Element { parent: Option<NodeId>, child: usize },
}

fn siblings_of(surface: &DocumentSurface, parent: Option<NodeId>) -> Option<&[Node]> {
    match parent {
        Some(id) => Some(surface.find(id)?.children()),
        None => Some(surface.content()),
    }
}

/// DOM child count of `nodes` plus the char length of a trailing open text
/// run, if the slice ends inside one.
fn dom_prefix(nodes: &[Node]) -> (usize, Option<usize>) {
    let mut dom = 0;
    let mut run: Option<usize> = None;
    for node in nodes {
        match node.as_text() {
            Some("") => {}
            Some(text) => run = Some(run.unwrap_or(0) + text.chars().count()),
            None => {
                if run.take().is_some() {
                    dom += 1;
                }
                dom += 1;
            }
        }
    }
    (dom, run)
}

/// Where `caret` lands once the surface is rendered.
pub fn dom_position_for_caret(surface: &DocumentSurface, caret: Caret) -> Option<DomPosition> {
    let node = surface.find(caret.node)?;
    match node.as_text() {
        Some(text) => {
            let (parent, index) = surface.locate(caret.node)?;
            let siblings = siblings_of(surface, parent)?;
            let (dom, run) = dom_prefix(&siblings[..index]);
            if run.is_none() && text.is_empty() {
                return Some(DomPosition::Element { parent, child: dom });
            }
            Some(DomPosition::Text {
                parent,
                child: dom,
                offset: run.unwrap_or(0) + caret.offset.min(text.chars().count()),
            })
        }
        None => {
            let children = node.children();
            let (dom, run) = dom_prefix(&children[..caret.offset.min(children.len())]);
            Some(DomPosition::Element {
                parent: Some(caret.node),
                child: dom + usize::from(run.is_some()),
            })
        }
    }
}

/// Translate a DOM selection position back to a tree caret.
pub fn caret_for_dom_position(surface: &DocumentSurface, position: DomPosition) -> Option<Caret> {
    match position {
        DomPosition::Text {
            parent,
            child,
            offset,
        } => {
            let siblings = siblings_of(surface, parent)?;
            let run = text_run(siblings, child)?;
            let mut remaining = offset;
            let mut last = None;
            for node in run {
                let Some(text) = node.as_text() else { continue };
                let len = text.chars().count();
                if len == 0 {
                    continue;
                }
                if remaining <= len {
                    return Some(Caret::new(node.id, remaining));
                }
                remaining -= len;
                last = Some(Caret::new(node.id, len));
            }
            last
        }
        DomPosition::Element { parent, child } => {
            let parent = parent?;
            let siblings = siblings_of(surface, Some(parent))?;
            let index = tree_index_for_dom_child(siblings, child);
            Some(Caret::new(parent, index))
        }
    }
}

/// The tree nodes forming DOM child `child`, when that child is text.
fn text_run(nodes: &[Node], child: usize) -> Option<&[Node]> {
    let mut dom = 0;
    let mut i = 0;
    while i < nodes.len() {
        match nodes[i].as_text() {
            Some("") => i += 1,
            Some(_) => {
                let start = i;
                while i < nodes.len() && nodes[i].is_text() {
                    i += 1;
                }
                if dom == child {
                    return Some(&nodes[start..i]);
                }
                dom += 1;
            }
            None => {
                if dom == child {
                    return None;
                }
                dom += 1;
                i += 1;
            }
        }
    }
    None
}

fn tree_index_for_dom_child(nodes: &[Node], child: usize) -> usize {
    (0..=nodes.len())
        .find(|&i| {
            let (dom, run) = dom_prefix(&nodes[..i]);
            dom + usize::from(run.is_some()) >= child
        })
        .unwrap_or(nodes.len())
}

// === DOM selection ===

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod dom {
    use wasm_bindgen::JsCast;
    use web_sys::{Element, HtmlElement};
    use wordpad_editor_core::{Caret, DocumentSurface, NodeId};

    use super::{DomPosition, caret_for_dom_position, dom_position_for_caret};
    use crate::events::node_id_of_element;

    fn child_index(parent: &web_sys::Node, child: &web_sys::Node) -> Option<usize> {
        let nodes = parent.child_nodes();
        (0..nodes.length())
            .find(|&i| nodes.item(i).is_some_and(|n| n.is_same_node(Some(child))))
            .map(|i| i as usize)
    }

    fn parent_id(host: &HtmlElement, element: &Element) -> Option<Option<NodeId>> {
        let host_node: &web_sys::Node = host.as_ref();
        if element.is_same_node(Some(host_node)) {
            return Some(None);
        }
        node_id_of_element(element).map(Some)
    }

    /// Map one DOM selection endpoint inside `host` to a tree caret.
    fn caret_at(
        host: &HtmlElement,
        surface: &DocumentSurface,
        node: &web_sys::Node,
        offset: usize,
    ) -> Option<Caret> {
        if !host.contains(Some(node)) {
            return None;
        }
        let position = if node.node_type() == web_sys::Node::TEXT_NODE {
            let parent = node.parent_element()?;
            let parent_node: &web_sys::Node = parent.as_ref();
            DomPosition::Text {
                parent: parent_id(host, &parent)?,
                child: child_index(parent_node, node)?,
                offset,
            }
        } else {
            let element: &Element = node.dyn_ref()?;
            DomPosition::Element {
                parent: parent_id(host, element)?,
                child: offset,
            }
        };
        caret_for_dom_position(surface, position)
    }

    /// Read the DOM selection as `(anchor, focus)` tree carets. A collapsed
    /// selection has both ends equal.
    pub fn read_selection(host: &HtmlElement, surface: &DocumentSurface) -> Option<(Caret, Caret)> {
        let selection = web_sys::window()?.get_selection().ok()??;
        let focus_node = selection.focus_node()?;
        let focus = caret_at(host, surface, &focus_node, selection.focus_offset() as usize)?;
        let anchor = selection
            .anchor_node()
            .and_then(|n| caret_at(host, surface, &n, selection.anchor_offset() as usize))
            .unwrap_or(focus);
        Some((anchor, focus))
    }

    /// Read the DOM selection focus as a tree caret.
    pub fn read_caret(host: &HtmlElement, surface: &DocumentSurface) -> Option<Caret> {
        read_selection(host, surface).map(|(_, focus)| focus)
    }

    fn element_for(host: &HtmlElement, parent: Option<NodeId>) -> Option<Element> {
        match parent {
            Some(id) => crate::dom::find_node_element(host, id),
            None => Some(host.clone().unchecked_into()),
        }
    }

    /// The rendered DOM node and offset for a tree caret.
    fn dom_point(
        host: &HtmlElement,
        surface: &DocumentSurface,
        caret: Caret,
    ) -> Option<(web_sys::Node, u32)> {
        match dom_position_for_caret(surface, caret)? {
            DomPosition::Text {
                parent,
                child,
                offset,
            } => {
                let text = element_for(host, parent)?.child_nodes().item(child as u32)?;
                Some((text, offset as u32))
            }
            DomPosition::Element { parent, child } => {
                Some((element_for(host, parent)?.into(), child as u32))
            }
        }
    }

    /// Collapse the DOM selection onto `caret` after a render.
    pub fn place_caret(host: &HtmlElement, surface: &DocumentSurface, caret: Caret) {
        let Some((node, offset)) = dom_point(host, surface, caret) else {
            return;
        };
        let Some(selection) = web_sys::window().and_then(|w| w.get_selection().ok().flatten())
        else {
            return;
        };
        if let Err(err) = selection.collapse_with_offset(Some(&node), offset) {
            tracing::debug!(?err, "could not place caret");
        }
    }

    /// Restore a non-collapsed selection after a render.
    pub fn place_selection(host: &HtmlElement, surface: &DocumentSurface, anchor: Caret, focus: Caret) {
        let (Some((anchor_node, anchor_offset)), Some((focus_node, focus_offset))) = (
            dom_point(host, surface, anchor),
            dom_point(host, surface, focus),
        ) else {
            return;
        };
        let Some(selection) = web_sys::window().and_then(|w| w.get_selection().ok().flatten())
        else {
            return;
        };
        if let Err(err) =
            selection.set_base_and_extent(&anchor_node, anchor_offset, &focus_node, focus_offset)
        {
            tracing::debug!(?err, "could not place selection");
        }
    }
}

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use dom::{place_caret, place_selection, read_caret, read_selection};
