//! Character and paragraph formatting.
//!
//! Inline formats wrap the selected text, or open an empty formatted run
//! at a collapsed caret; toggling inside a run of that format unwraps it.
//! Block formats act on the text block around the caret.

use crate::commands::CommandOutcome;
use crate::error::EditorError;
use crate::tree::{Align, Caret, DocumentSurface, Element, Node, NodeId, Tag};

/// Tags `FormatBlock` may turn a block into.
pub(crate) fn is_block_format(tag: Tag) -> bool {
    matches!(tag, Tag::Paragraph | Tag::Div) || matches!(tag, Tag::Heading(1..=6))
}

fn is_plain_block(tag: Tag) -> bool {
    matches!(tag, Tag::Paragraph | Tag::Div | Tag::Heading(_))
}

/// The text block holding the caret.
fn caret_block(surface: &DocumentSurface) -> Option<NodeId> {
    let caret = surface.caret()?;
    surface.enclosing(caret.node, |t| t.is_text_block())
}

fn wrap(surface: &mut DocumentSurface, id: NodeId, tag: Tag) -> Result<(), EditorError> {
    surface.replace_with(id, |s, node| {
        vec![s.element(Element::new(tag).with_children(vec![node]))]
    })
}

// === Inline ===

pub(crate) fn toggle_inline(
    surface: &mut DocumentSurface,
    tag: Tag,
) -> Result<CommandOutcome, EditorError> {
    let Some(caret) = surface.caret() else {
        return Ok(CommandOutcome::NoOp);
    };
    if let Some(run) = surface.enclosing(caret.node, |t| t == tag) {
        surface.unwrap_element(run)?;
        return Ok(CommandOutcome::Applied);
    }

    if let Some((node, range)) = surface.selected_range() {
        let len = range.len();
        let middle = surface.split_text(node, range.start)?;
        surface.split_text(middle, len)?;
        wrap(surface, middle, tag)?;
        surface.set_selection(Caret::new(middle, 0), Caret::new(middle, len));
        return Ok(CommandOutcome::Applied);
    }

    let Some(caret) = surface.ensure_text_caret(caret) else {
        return Ok(CommandOutcome::NoOp);
    };
    surface.split_text(caret.node, caret.offset)?;
    let text = surface.text("");
    let text_id = text.id;
    let run = surface.element(Element::new(tag).with_children(vec![text]));
    let (parent, index) = surface
        .locate(caret.node)
        .ok_or(EditorError::NodeNotFound(caret.node))?;
    surface.insert_at(parent, index + 1, run)?;
    surface.set_caret(Some(Caret::new(text_id, 0)));
    Ok(CommandOutcome::Applied)
}

// === Blocks ===

pub(crate) fn set_align(
    surface: &mut DocumentSurface,
    align: Align,
) -> Result<CommandOutcome, EditorError> {
    let Some(block) = caret_block(surface) else {
        return Ok(CommandOutcome::NoOp);
    };
    let el = surface
        .find_mut(block)
        .and_then(Node::as_element_mut)
        .ok_or(EditorError::NodeNotFound(block))?;
    if el.style.align == Some(align) {
        return Ok(CommandOutcome::NoOp);
    }
    el.style.align = Some(align);
    Ok(CommandOutcome::Applied)
}

pub(crate) fn format_block(
    surface: &mut DocumentSurface,
    tag: Tag,
) -> Result<CommandOutcome, EditorError> {
    let Some(block) = surface
        .caret()
        .and_then(|c| surface.enclosing(c.node, is_plain_block))
    else {
        return Ok(CommandOutcome::NoOp);
    };
    let el = surface
        .find_mut(block)
        .and_then(Node::as_element_mut)
        .ok_or(EditorError::NodeNotFound(block))?;
    if el.tag == tag {
        return Ok(CommandOutcome::NoOp);
    }
    el.tag = tag;
    Ok(CommandOutcome::Applied)
}

/// Turn the caret's block into a list, switch the list kind, or turn the
/// items back into paragraphs when the list already has that kind.
pub(crate) fn toggle_list(
    surface: &mut DocumentSurface,
    ordered: bool,
) -> Result<CommandOutcome, EditorError> {
    let Some(caret) = surface.caret() else {
        return Ok(CommandOutcome::NoOp);
    };
    let target = Tag::List { ordered };

    if let Some(list) = surface.enclosing(caret.node, |t| matches!(t, Tag::List { .. })) {
        let el = surface
            .find_mut(list)
            .and_then(Node::as_element_mut)
            .ok_or(EditorError::NodeNotFound(list))?;
        if el.tag != target {
            el.tag = target;
            return Ok(CommandOutcome::Applied);
        }
        surface.replace_with(list, |s, node| {
            node.into_children()
                .into_iter()
                .map(|item| {
                    if item.tag() != Some(Tag::ListItem) {
                        return item;
                    }
                    let style = item.as_element().map(|el| el.style).unwrap_or_default();
                    s.element(
                        Element::new(Tag::Paragraph)
                            .with_style(style)
                            .with_children(item.into_children()),
                    )
                })
                .collect()
        })?;
        return Ok(CommandOutcome::Applied);
    }

    let Some(block) = surface.enclosing(caret.node, is_plain_block) else {
        return Ok(CommandOutcome::NoOp);
    };
    surface.replace_with(block, |s, node| {
        let style = node.as_element().map(|el| el.style).unwrap_or_default();
        let item = s.element(
            Element::new(Tag::ListItem)
                .with_style(style)
                .with_children(node.into_children()),
        );
        vec![s.element(Element::new(target).with_children(vec![item]))]
    })?;
    Ok(CommandOutcome::Applied)
}

fn collect_formatting(nodes: &[Node], out: &mut Vec<NodeId>) {
    for node in nodes {
        if node
            .tag()
            .is_some_and(|t| t.is_inline_format() || t == Tag::Span)
        {
            out.push(node.id);
        }
        collect_formatting(node.children(), out);
    }
}

/// Strip character formatting and alignment from the caret's block.
pub(crate) fn clear_formatting(surface: &mut DocumentSurface) -> Result<CommandOutcome, EditorError> {
    let Some(block) = caret_block(surface) else {
        return Ok(CommandOutcome::NoOp);
    };
    let mut runs = Vec::new();
    if let Some(node) = surface.find(block) {
        collect_formatting(node.children(), &mut runs);
    }
    for run in &runs {
        surface.unwrap_element(*run)?;
    }
    let aligned = surface
        .find_mut(block)
        .and_then(Node::as_element_mut)
        .and_then(|el| el.style.align.take())
        .is_some();
    if runs.is_empty() && !aligned {
        return Ok(CommandOutcome::NoOp);
    }
    Ok(CommandOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A paragraph holding `text`, caret at `offset`.
    fn paragraph(text: &str, offset: usize) -> (DocumentSurface, NodeId) {
        let mut surface = DocumentSurface::new();
        surface.type_text(text);
        let node = surface.caret().unwrap().node;
        surface.set_caret(Some(Caret::new(node, offset)));
        (surface, node)
    }

    #[test]
    fn test_bold_wraps_selection_and_keeps_it_selected() {
        let (mut s, text) = paragraph("make this bold", 0);
        s.set_selection(Caret::new(text, 5), Caret::new(text, 9));

        assert_eq!(toggle_inline(&mut s, Tag::Bold), Ok(CommandOutcome::Applied));
        assert_eq!(s.to_markup(), "<p>make <b>this</b> bold</p>");
        let (node, range) = s.selected_range().unwrap();
        assert_eq!(range, 0..4);
        assert_eq!(
            s.find(s.parent_of(node).unwrap()).and_then(Node::tag),
            Some(Tag::Bold)
        );

        assert_eq!(toggle_inline(&mut s, Tag::Bold), Ok(CommandOutcome::Applied));
        assert_eq!(s.to_markup(), "<p>make this bold</p>");
    }

    #[test]
    fn test_italic_at_collapsed_caret_opens_run() {
        let (mut s, _) = paragraph("ab", 1);
        toggle_inline(&mut s, Tag::Italic).unwrap();
        s.type_text("X");
        assert_eq!(s.to_markup(), "<p>a<i>X</i>b</p>");
        assert!(s.active_formats().italic);
    }

    #[test]
    fn test_align_and_clear() {
        let (mut s, _) = paragraph("centered", 3);
        assert_eq!(set_align(&mut s, Align::Center), Ok(CommandOutcome::Applied));
        assert_eq!(set_align(&mut s, Align::Center), Ok(CommandOutcome::NoOp));
        assert_eq!(s.to_markup(), "<p style=\"text-align: center\">centered</p>");

        assert_eq!(clear_formatting(&mut s), Ok(CommandOutcome::Applied));
        assert_eq!(s.to_markup(), "<p>centered</p>");
        assert_eq!(clear_formatting(&mut s), Ok(CommandOutcome::NoOp));
    }

    #[test]
    fn test_clear_formatting_unwraps_nested_runs() {
        let (mut s, text) = paragraph("a b c", 0);
        s.set_selection(Caret::new(text, 2), Caret::new(text, 3));
        toggle_inline(&mut s, Tag::Bold).unwrap();
        toggle_inline(&mut s, Tag::Underline).unwrap();
        assert_eq!(s.to_markup(), "<p>a <b><u>b</u></b> c</p>");

        assert_eq!(clear_formatting(&mut s), Ok(CommandOutcome::Applied));
        assert_eq!(s.to_markup(), "<p>a b c</p>");
    }

    #[test]
    fn test_format_block_retags() {
        let (mut s, _) = paragraph("Title", 0);
        assert_eq!(format_block(&mut s, Tag::Heading(2)), Ok(CommandOutcome::Applied));
        assert_eq!(s.to_markup(), "<h2>Title</h2>");
        assert_eq!(format_block(&mut s, Tag::Heading(2)), Ok(CommandOutcome::NoOp));
        assert!(is_block_format(Tag::Div));
        assert!(!is_block_format(Tag::Heading(7)));
        assert!(!is_block_format(Tag::Bold));
    }

    #[test]
    fn test_list_toggle_cycle() {
        let (mut s, text) = paragraph("item", 2);
        assert_eq!(toggle_list(&mut s, false), Ok(CommandOutcome::Applied));
        assert_eq!(s.to_markup(), "<ul><li>item</li></ul>");
        assert!(s.active_formats().unordered_list);
        assert_eq!(s.caret(), Some(Caret::new(text, 2)));

        toggle_list(&mut s, true).unwrap();
        assert_eq!(s.to_markup(), "<ol><li>item</li></ol>");

        toggle_list(&mut s, true).unwrap();
        assert_eq!(s.to_markup(), "<p>item</p>");
        assert_eq!(s.caret(), Some(Caret::new(text, 2)));
    }

    #[test]
    fn test_formatting_without_caret_is_noop() {
        let mut s = DocumentSurface::new();
        assert_eq!(toggle_inline(&mut s, Tag::Bold), Ok(CommandOutcome::NoOp));
        assert_eq!(set_align(&mut s, Align::Right), Ok(CommandOutcome::NoOp));
        assert_eq!(toggle_list(&mut s, true), Ok(CommandOutcome::NoOp));
        assert_eq!(clear_formatting(&mut s), Ok(CommandOutcome::NoOp));
    }
}
