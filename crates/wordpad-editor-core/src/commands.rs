//! Editing commands issued from the toolbar.
//!
//! Each command that changes the document publishes exactly one discrete
//! change, so it becomes exactly one history entry. Commands that find
//! nothing to act on (a table command with the caret outside any table)
//! return [`CommandOutcome::NoOp`] and publish nothing.

use crate::error::EditorError;
use crate::events::{ChangeOrigin, ContentChange};
use crate::find;
use crate::format;
use crate::overlay::ObjectOverlayManager;
use crate::tree::{Align, Caret, DocumentSurface, Element, Node, NodeId, Style, Tag};
use crate::types::Size;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    /// Typed text at the caret. Coalesced by the debounce window.
    InsertText(String),
    /// Start a new empty paragraph after the caret's block.
    InsertParagraph,
    InsertImage {
        src: String,
        size: Option<Size>,
    },
    InsertTable {
        rows: usize,
        cols: usize,
    },
    /// Insert a link at the caret. The label defaults to the URL.
    InsertLink {
        url: String,
        text: Option<String>,
    },
    AddRow,
    AddColumn,
    RemoveRow,
    RemoveColumn,
    RemoveTable,
    /// Wrap the selection in (or unwrap it from) bold, italic, underline
    /// or strikethrough.
    ToggleInline(Tag),
    SetAlign(Align),
    /// Retag the caret's paragraph as a paragraph, div or heading.
    FormatBlock(Tag),
    ToggleList {
        ordered: bool,
    },
    /// Strip character formatting and alignment from the caret's block.
    ClearFormatting,
    /// Literal, ASCII case-insensitive replace across all text.
    ReplaceAll {
        find: String,
        replace: String,
    },
    /// Replace the selected match, or the next one after the caret.
    ReplaceCurrent {
        find: String,
        replace: String,
    },
    /// Clear the whole document.
    ResetContent,
    DeleteSelectedObject,
}

impl EditorCommand {
    fn validate(&self) -> Result<(), EditorError> {
        match self {
            EditorCommand::InsertImage { src, size } => {
                if src.trim().is_empty() {
                    return Err(EditorError::InvalidArgument("image source is empty".into()));
                }
                if size.is_some_and(|s| !(s.width > 0.0 && s.height > 0.0)) {
                    return Err(EditorError::InvalidArgument(
                        "image size must be positive".into(),
                    ));
                }
            }
            EditorCommand::InsertTable { rows, cols } => {
                if *rows == 0 || *cols == 0 {
                    return Err(EditorError::InvalidArgument(format!(
                        "table needs at least one row and column, got {rows}x{cols}"
                    )));
                }
            }
            EditorCommand::InsertLink { url, .. } => {
                if url.trim().is_empty() {
                    return Err(EditorError::InvalidArgument("link URL is empty".into()));
                }
            }
            EditorCommand::ReplaceAll { find, .. } | EditorCommand::ReplaceCurrent { find, .. } => {
                if find.is_empty() {
                    return Err(EditorError::InvalidArgument("search text is empty".into()));
                }
            }
            EditorCommand::ToggleInline(tag) if !tag.is_inline_format() => {
                return Err(EditorError::InvalidArgument(format!(
                    "<{}> is not a character format",
                    tag.name()
                )));
            }
            EditorCommand::FormatBlock(tag) if !format::is_block_format(*tag) => {
                return Err(EditorError::InvalidArgument(format!(
                    "cannot format a block as <{}>",
                    tag.name()
                )));
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    /// Number of occurrences replaced.
    Replaced(usize),
    /// Nothing to act on; the document is unchanged.
    NoOp,
}

/// Execute a command against the surface.
///
/// Any active object wrapper is dissolved first, except for
/// [`EditorCommand::DeleteSelectedObject`] which acts on it.
pub fn execute_command(
    surface: &mut DocumentSurface,
    overlay: &mut ObjectOverlayManager,
    command: &EditorCommand,
) -> Result<CommandOutcome, EditorError> {
    command.validate()?;

    if let EditorCommand::DeleteSelectedObject = command {
        return Ok(if overlay.delete_selected(surface)? {
            CommandOutcome::Applied
        } else {
            CommandOutcome::NoOp
        });
    }
    overlay.dissolve(surface);

    let outcome = match command {
        EditorCommand::InsertText(text) => {
            // Typing publishes its own continuous change.
            if text.is_empty() {
                return Ok(CommandOutcome::NoOp);
            }
            surface.type_text(text);
            return Ok(CommandOutcome::Applied);
        }
        EditorCommand::InsertParagraph => insert_paragraph(surface),
        EditorCommand::InsertImage { src, size } => insert_image(surface, src, *size),
        EditorCommand::InsertTable { rows, cols } => insert_table(surface, *rows, *cols),
        EditorCommand::InsertLink { url, text } => {
            insert_link(surface, url.trim(), text.as_deref())?
        }
        EditorCommand::AddRow => add_row(surface)?,
        EditorCommand::AddColumn => add_column(surface)?,
        EditorCommand::RemoveRow => remove_row(surface)?,
        EditorCommand::RemoveColumn => remove_column(surface)?,
        EditorCommand::RemoveTable => remove_table(surface)?,
        EditorCommand::ToggleInline(tag) => format::toggle_inline(surface, *tag)?,
        EditorCommand::SetAlign(align) => format::set_align(surface, *align)?,
        EditorCommand::FormatBlock(tag) => format::format_block(surface, *tag)?,
        EditorCommand::ToggleList { ordered } => format::toggle_list(surface, *ordered)?,
        EditorCommand::ClearFormatting => format::clear_formatting(surface)?,
        EditorCommand::ReplaceAll { find, replace } => {
            match find::replace_all(surface, find, replace) {
                0 => CommandOutcome::NoOp,
                count => CommandOutcome::Replaced(count),
            }
        }
        EditorCommand::ReplaceCurrent { find, replace } => {
            if find::replace_current(surface, find, replace) {
                CommandOutcome::Replaced(1)
            } else {
                CommandOutcome::NoOp
            }
        }
        EditorCommand::ResetContent => {
            if surface.is_empty() {
                CommandOutcome::NoOp
            } else {
                surface.set_content(Vec::new());
                surface.set_caret(None);
                CommandOutcome::Applied
            }
        }
        EditorCommand::DeleteSelectedObject => CommandOutcome::NoOp,
    };

    if outcome != CommandOutcome::NoOp {
        tracing::debug!(?command, ?outcome, "command applied");
        surface.publish(ContentChange::discrete(ChangeOrigin::Command));
    }
    Ok(outcome)
}

// === Insertion ===

fn insert_paragraph(surface: &mut DocumentSurface) -> CommandOutcome {
    let text = surface.text("");
    let text_id = text.id;
    let para = surface.element(Element::new(Tag::Paragraph).with_children(vec![text]));
    surface.insert_block_after_caret(para);
    surface.set_caret(Some(Caret::new(text_id, 0)));
    CommandOutcome::Applied
}

fn insert_image(surface: &mut DocumentSurface, src: &str, size: Option<Size>) -> CommandOutcome {
    let style = Style {
        width: size.map(|s| s.width),
        height: size.map(|s| s.height),
        ..Style::default()
    };
    let img = surface.element(
        Element::new(Tag::Image)
            .with_attr("src", src.trim())
            .with_style(style),
    );
    surface.insert_block_after_caret(img);
    CommandOutcome::Applied
}

fn empty_cells(surface: &mut DocumentSurface, cols: usize) -> Vec<Node> {
    (0..cols)
        .map(|_| surface.element(Element::new(Tag::TableCell)))
        .collect()
}

fn insert_table(surface: &mut DocumentSurface, rows: usize, cols: usize) -> CommandOutcome {
    let rows = (0..rows)
        .map(|_| {
            let cells = empty_cells(surface, cols);
            surface.element(Element::new(Tag::TableRow).with_children(cells))
        })
        .collect();
    let table = surface.element(Element::new(Tag::Table).with_children(rows));
    surface.insert_block_after_caret(table);
    CommandOutcome::Applied
}

/// Split the text node under the caret and put a link between the halves.
/// Without a text caret the link goes into a new paragraph.
fn insert_link(
    surface: &mut DocumentSurface,
    url: &str,
    label: Option<&str>,
) -> Result<CommandOutcome, EditorError> {
    let label = label.filter(|l| !l.is_empty()).unwrap_or(url);
    let label_node = surface.text(label);
    let link = surface.element(
        Element::new(Tag::Link)
            .with_attr("href", url)
            .with_children(vec![label_node]),
    );

    let text_caret = surface
        .caret()
        .filter(|c| surface.find(c.node).is_some_and(Node::is_text));
    let Some(caret) = text_caret else {
        let para = surface.element(Element::new(Tag::Paragraph).with_children(vec![link]));
        surface.insert_block_after_caret(para);
        return Ok(CommandOutcome::Applied);
    };

    let tail = surface.split_text(caret.node, caret.offset)?;
    let (parent, index) = surface
        .locate(tail)
        .ok_or(EditorError::NodeNotFound(tail))?;
    surface.insert_at(parent, index, link)?;
    surface.set_caret(Some(Caret::new(tail, 0)));
    Ok(CommandOutcome::Applied)
}

// === Table editing ===

/// The caret's cell, its row, the row's table and the cell's column index.
struct CellContext {
    row: NodeId,
    table: NodeId,
    column: usize,
}

fn cell_context(surface: &DocumentSurface) -> Option<CellContext> {
    let cell = surface.enclosing_cell()?;
    let (row, column) = surface.locate(cell)?;
    let row = row?;
    let table = surface.enclosing(row, |t| t == Tag::Table)?;
    Some(CellContext { row, table, column })
}

fn child_ids(surface: &DocumentSurface, id: NodeId) -> Vec<NodeId> {
    surface
        .find(id)
        .map(|n| n.children().iter().map(|c| c.id).collect())
        .unwrap_or_default()
}

fn add_row(surface: &mut DocumentSurface) -> Result<CommandOutcome, EditorError> {
    let Some(ctx) = cell_context(surface) else {
        return Ok(CommandOutcome::NoOp);
    };
    let cols = child_ids(surface, ctx.row).len();
    let cells = empty_cells(surface, cols);
    let row = surface.element(Element::new(Tag::TableRow).with_children(cells));
    let (parent, index) = surface
        .locate(ctx.row)
        .ok_or(EditorError::NodeNotFound(ctx.row))?;
    surface.insert_at(parent, index + 1, row)?;
    Ok(CommandOutcome::Applied)
}

fn add_column(surface: &mut DocumentSurface) -> Result<CommandOutcome, EditorError> {
    let Some(ctx) = cell_context(surface) else {
        return Ok(CommandOutcome::NoOp);
    };
    for row in child_ids(surface, ctx.table) {
        let cell = surface.element(Element::new(Tag::TableCell));
        surface.insert_at(Some(row), ctx.column + 1, cell)?;
    }
    Ok(CommandOutcome::Applied)
}

fn remove_row(surface: &mut DocumentSurface) -> Result<CommandOutcome, EditorError> {
    let Some(ctx) = cell_context(surface) else {
        return Ok(CommandOutcome::NoOp);
    };
    surface.detach(ctx.row)?;
    Ok(CommandOutcome::Applied)
}

fn remove_column(surface: &mut DocumentSurface) -> Result<CommandOutcome, EditorError> {
    let Some(ctx) = cell_context(surface) else {
        return Ok(CommandOutcome::NoOp);
    };
    for row in child_ids(surface, ctx.table) {
        if let Some(cell) = child_ids(surface, row).get(ctx.column) {
            surface.detach(*cell)?;
        }
    }
    Ok(CommandOutcome::Applied)
}

fn remove_table(surface: &mut DocumentSurface) -> Result<CommandOutcome, EditorError> {
    let Some(ctx) = cell_context(surface) else {
        return Ok(CommandOutcome::NoOp);
    };
    surface.detach(ctx.table)?;
    Ok(CommandOutcome::Applied)
}
