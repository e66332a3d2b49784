//! Markup and plain-text serialization of the document tree.
//!
//! Markup is the snapshot format: two snapshots are equal exactly when
//! their markup is byte-for-byte equal, so the writer must be
//! deterministic (attribute order is insertion order, style properties have
//! a fixed order).

use std::fmt::{self, Write};

use v_htmlescape::escape;

use crate::tree::{Node, NodeKind, Tag};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MarkupOptions {
    /// Emit `data-node-id` on every element so a DOM host can map elements
    /// back to tree nodes.
    pub node_ids: bool,
}

/// Serialize a forest to markup.
pub fn to_markup(nodes: &[Node], options: MarkupOptions) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_nodes(&mut out, nodes, options);
    out
}

pub fn write_nodes<W: Write>(out: &mut W, nodes: &[Node], options: MarkupOptions) -> fmt::Result {
    for node in nodes {
        write_node(out, node, options)?;
    }
    Ok(())
}

fn write_node<W: Write>(out: &mut W, node: &Node, options: MarkupOptions) -> fmt::Result {
    let el = match &node.kind {
        NodeKind::Text(text) => return write!(out, "{}", escape(text)),
        NodeKind::Element(el) => el,
    };
    let name = el.tag.name();
    write!(out, "<{name}")?;
    if options.node_ids {
        write!(out, " data-node-id=\"{}\"", node.id.0)?;
    }
    if let Some(class) = el.tag.class() {
        write!(out, " class=\"{class}\"")?;
    }
    for (key, value) in &el.attrs {
        write!(out, " {}=\"{}\"", key, escape(value))?;
    }
    if !el.style.is_empty() {
        write!(out, " style=\"{}\"", el.style.to_css())?;
    }
    out.write_char('>')?;
    if el.tag.is_void() {
        return Ok(());
    }
    write_nodes(out, &el.children, options)?;
    write!(out, "</{name}>")
}

/// Text of a forest with block boundaries turned into newlines and table
/// cells separated by tabs.
pub fn plain_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    push_plain(&mut out, nodes);
    out.trim_end_matches('\n').to_string()
}

fn push_plain(out: &mut String, nodes: &[Node]) {
    for node in nodes {
        let el = match &node.kind {
            NodeKind::Text(text) => {
                out.push_str(text);
                continue;
            }
            NodeKind::Element(el) => el,
        };
        match el.tag {
            Tag::LineBreak => {
                out.push('\n');
                continue;
            }
            Tag::MoveHandle | Tag::ResizeHandle => continue,
            _ => {}
        }
        push_plain(out, &el.children);
        match el.tag {
            Tag::TableCell => out.push('\t'),
            Tag::TableRow => {
                while out.ends_with('\t') {
                    out.pop();
                }
                out.push('\n');
            }
            tag if tag.is_block() && !out.is_empty() && !out.ends_with('\n') => out.push('\n'),
            _ => {}
        }
    }
}
