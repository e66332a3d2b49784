//! Structured document tree backing the editable surface.
//!
//! The surface is a forest of [`Node`]s (the children of the editable host
//! element). Every node carries a stable [`NodeId`] so objects keep their
//! identity while the overlay re-parents them, and so the browser layer can
//! map DOM elements back to tree nodes.
//!
//! Queries are capability-based ("nearest enclosing table cell for the
//! caret") rather than tag-name string comparisons.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::EditorError;
use crate::events::{ChangeChannel, ChangeOrigin, ContentChange};
use crate::markup::{self, MarkupOptions};

/// Stable identity of a node within one surface.
///
/// Allocated monotonically and never reused, including across restores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element kinds the editor understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    Paragraph,
    Div,
    Span,
    Heading(u8),
    Bold,
    Italic,
    Underline,
    Strike,
    Link,
    LineBreak,
    List { ordered: bool },
    ListItem,
    Mark,
    Image,
    Table,
    TableRow,
    TableCell,
    /// Positioning shell around the selected object.
    ObjectShell,
    MoveHandle,
    ResizeHandle,
}

impl Tag {
    /// HTML element name used when serializing.
    pub fn name(&self) -> &'static str {
        match self {
            Tag::Paragraph => "p",
            Tag::Div | Tag::ObjectShell | Tag::MoveHandle | Tag::ResizeHandle => "div",
            Tag::Span => "span",
            Tag::Heading(level) => match *level {
                0 | 1 => "h1",
                2 => "h2",
                3 => "h3",
                4 => "h4",
                5 => "h5",
                _ => "h6",
            },
            Tag::Bold => "b",
            Tag::Italic => "i",
            Tag::Underline => "u",
            Tag::Strike => "s",
            Tag::Link => "a",
            Tag::LineBreak => "br",
            Tag::List { ordered: true } => "ol",
            Tag::List { ordered: false } => "ul",
            Tag::ListItem => "li",
            Tag::Mark => "mark",
            Tag::Image => "img",
            Tag::Table => "table",
            Tag::TableRow => "tr",
            Tag::TableCell => "td",
        }
    }

    /// CSS class carried by overlay scaffolding.
    pub fn class(&self) -> Option<&'static str> {
        match self {
            Tag::ObjectShell => Some("obj-wrapper"),
            Tag::MoveHandle => Some("move-handle"),
            Tag::ResizeHandle => Some("resize-handle"),
            _ => None,
        }
    }

    /// Images and tables can be selected, moved and resized.
    pub fn is_embeddable(&self) -> bool {
        matches!(self, Tag::Image | Tag::Table)
    }

    /// Overlay-only elements that must never reach a snapshot.
    pub fn is_scaffolding(&self) -> bool {
        matches!(self, Tag::ObjectShell | Tag::MoveHandle | Tag::ResizeHandle)
    }

    /// Elements serialized without children or a closing tag.
    pub fn is_void(&self) -> bool {
        matches!(self, Tag::LineBreak | Tag::Image)
    }

    /// Character formatting that can be toggled around text.
    pub fn is_inline_format(&self) -> bool {
        matches!(self, Tag::Bold | Tag::Italic | Tag::Underline | Tag::Strike)
    }

    /// Blocks that hold a line of text. Deletes never cross a table cell.
    pub fn is_text_block(&self) -> bool {
        matches!(
            self,
            Tag::Paragraph | Tag::Div | Tag::Heading(_) | Tag::ListItem | Tag::TableCell
        )
    }

    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Tag::Paragraph
                | Tag::Div
                | Tag::Heading(_)
                | Tag::List { .. }
                | Tag::ListItem
                | Tag::Table
                | Tag::TableRow
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Relative,
    Absolute,
}

impl Position {
    fn as_css(&self) -> &'static str {
        match self {
            Position::Relative => "relative",
            Position::Absolute => "absolute",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    fn as_css(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
            Align::Justify => "justify",
        }
    }
}

/// The subset of inline style the editor reads and writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
}

impl Style {
    pub fn is_empty(&self) -> bool {
        *self == Style::default()
    }

    /// Serialize as an inline `style` attribute value.
    pub fn to_css(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(position) = self.position {
            parts.push(format!("position: {}", position.as_css()));
        }
        if let Some(v) = self.left {
            parts.push(format!("left: {v}px"));
        }
        if let Some(v) = self.top {
            parts.push(format!("top: {v}px"));
        }
        if let Some(v) = self.width {
            parts.push(format!("width: {v}px"));
        }
        if let Some(v) = self.height {
            parts.push(format!("height: {v}px"));
        }
        if let Some(align) = self.align {
            parts.push(format!("text-align: {}", align.as_css()));
        }
        parts.join("; ")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: Tag,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<(SmolStr, String)>,
    #[serde(default, skip_serializing_if = "Style::is_empty")]
    pub style: Style,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            style: Style::default(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value in place.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((SmolStr::new(name), value)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Text(String),
    Element(Element),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl Node {
    pub fn tag(&self) -> Option<Tag> {
        self.as_element().map(|el| el.tag)
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match &mut self.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(t) => Some(t),
            NodeKind::Element(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    /// Children of an element; empty for text.
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Element(el) => &el.children,
            NodeKind::Text(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.kind {
            NodeKind::Element(el) => Some(&mut el.children),
            NodeKind::Text(_) => None,
        }
    }

    pub fn into_children(self) -> Vec<Node> {
        match self.kind {
            NodeKind::Element(el) => el.children,
            NodeKind::Text(_) => Vec::new(),
        }
    }

    /// Concatenated text of this subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(std::slice::from_ref(self), &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match &node.kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element(el) => collect_text(&el.children, out),
        }
    }
}

// === Forest helpers ===
//
// These work on a bare `[Node]` so the overlay can run them on projected
// copies of the content as well as on the live surface.

pub(crate) fn find_in(nodes: &[Node], id: NodeId) -> Option<&Node> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_in(node.children(), id) {
            return Some(found);
        }
    }
    None
}

pub(crate) fn find_in_mut(nodes: &mut [Node], id: NodeId) -> Option<&mut Node> {
    for node in nodes.iter_mut() {
        if node.id == id {
            return Some(node);
        }
        if let NodeKind::Element(el) = &mut node.kind {
            if let Some(found) = find_in_mut(&mut el.children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Parent id (None for top level) and index among siblings.
pub(crate) fn locate_in(
    nodes: &[Node],
    parent: Option<NodeId>,
    id: NodeId,
) -> Option<(Option<NodeId>, usize)> {
    for (i, node) in nodes.iter().enumerate() {
        if node.id == id {
            return Some((parent, i));
        }
        if let Some(found) = locate_in(node.children(), Some(node.id), id) {
            return Some(found);
        }
    }
    None
}

pub(crate) fn children_of_mut(
    root: &mut Vec<Node>,
    parent: Option<NodeId>,
) -> Option<&mut Vec<Node>> {
    match parent {
        None => Some(root),
        Some(pid) => find_in_mut(root, pid).and_then(Node::children_mut),
    }
}

fn path_in(nodes: &[Node], id: NodeId, path: &mut Vec<NodeId>) -> bool {
    for node in nodes {
        path.push(node.id);
        if node.id == id || path_in(node.children(), id, path) {
            return true;
        }
        path.pop();
    }
    false
}

fn max_id_in(nodes: &[Node]) -> Option<u64> {
    nodes
        .iter()
        .map(|n| {
            let own = n.id.0;
            max_id_in(n.children()).map_or(own, |child| child.max(own))
        })
        .max()
}

fn char_to_byte(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map_or(s.len(), |(byte, _)| byte)
}

/// Text blocks that can be joined with a neighbouring block.
fn is_joinable(tag: Tag) -> bool {
    tag.is_text_block() && tag != Tag::TableCell
}

/// Text node ids in document order, each with its nearest text block.
fn collect_text_runs(nodes: &[Node], block: Option<NodeId>, out: &mut Vec<(NodeId, Option<NodeId>)>) {
    for node in nodes {
        match &node.kind {
            NodeKind::Text(_) => out.push((node.id, block)),
            NodeKind::Element(el) => {
                let block = if el.tag.is_text_block() {
                    Some(node.id)
                } else {
                    block
                };
                collect_text_runs(&el.children, block, out);
            }
        }
    }
}

fn word_start(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i > 0 && chars[i - 1].is_whitespace() {
        i -= 1;
    }
    while i > 0 && !chars[i - 1].is_whitespace() {
        i -= 1;
    }
    i
}

fn word_end(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    while i < chars.len() && !chars[i].is_whitespace() {
        i += 1;
    }
    i
}

/// How much one delete keystroke removes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeleteUnit {
    #[default]
    Char,
    /// Back or forward to the next word boundary.
    Word,
    /// To the start or end of the caret's text node.
    Line,
}

/// Insertion point inside the document.
///
/// `offset` is a char offset when `node` is text, a child index when it is
/// an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caret {
    pub node: NodeId,
    pub offset: usize,
}

impl Caret {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Formatting that applies at the caret, for toolbar indicators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActiveFormats {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub align: Option<Align>,
    pub ordered_list: bool,
    pub unordered_list: bool,
    pub in_table: bool,
}

/// The live editable content.
#[derive(Clone, Debug, Default)]
pub struct DocumentSurface {
    content: Vec<Node>,
    next_id: u64,
    caret: Option<Caret>,
    /// Other end of a non-collapsed selection; the caret is the focus.
    anchor: Option<Caret>,
    changes: ChangeChannel,
}

impl DocumentSurface {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a surface from existing content.
    pub fn from_nodes(content: Vec<Node>) -> Self {
        let next_id = max_id_in(&content).map_or(0, |max| max + 1);
        Self {
            content,
            next_id,
            caret: None,
            anchor: None,
            changes: ChangeChannel::new(),
        }
    }

    pub fn content(&self) -> &[Node] {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut Vec<Node> {
        &mut self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    // === Node construction ===

    pub fn alloc_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Build a detached text node.
    pub fn text(&mut self, text: impl Into<String>) -> Node {
        Node {
            id: self.alloc_id(),
            kind: NodeKind::Text(text.into()),
        }
    }

    /// Build a detached element node.
    pub fn element(&mut self, element: Element) -> Node {
        Node {
            id: self.alloc_id(),
            kind: NodeKind::Element(element),
        }
    }

    // === Queries ===

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        find_in(&self.content, id)
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        find_in_mut(&mut self.content, id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    /// Parent id (None at top level) and sibling index of a node.
    pub fn locate(&self, id: NodeId) -> Option<(Option<NodeId>, usize)> {
        locate_in(&self.content, None, id)
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.locate(id).and_then(|(parent, _)| parent)
    }

    /// Ids from the top-level ancestor down to `id` inclusive.
    pub fn path_of(&self, id: NodeId) -> Option<Vec<NodeId>> {
        let mut path = Vec::new();
        path_in(&self.content, id, &mut path).then_some(path)
    }

    /// Nearest node (starting at `id` itself) whose tag satisfies `pred`.
    pub fn enclosing(&self, id: NodeId, pred: impl Fn(Tag) -> bool) -> Option<NodeId> {
        let path = self.path_of(id)?;
        path.into_iter()
            .rev()
            .find(|ancestor| self.find(*ancestor).and_then(Node::tag).is_some_and(&pred))
    }

    /// Nearest table cell enclosing the caret.
    pub fn enclosing_cell(&self) -> Option<NodeId> {
        let caret = self.caret?;
        self.enclosing(caret.node, |t| t == Tag::TableCell)
    }

    /// Nearest table enclosing the caret.
    pub fn enclosing_table(&self) -> Option<NodeId> {
        let caret = self.caret?;
        self.enclosing(caret.node, |t| t == Tag::Table)
    }

    pub fn active_formats(&self) -> ActiveFormats {
        let mut formats = ActiveFormats::default();
        let Some(path) = self.caret.and_then(|c| self.path_of(c.node)) else {
            return formats;
        };
        for id in path {
            let Some(el) = self.find(id).and_then(Node::as_element) else {
                continue;
            };
            match el.tag {
                Tag::Bold => formats.bold = true,
                Tag::Italic => formats.italic = true,
                Tag::Underline => formats.underline = true,
                Tag::Strike => formats.strike = true,
                Tag::List { ordered: true } => formats.ordered_list = true,
                Tag::List { ordered: false } => formats.unordered_list = true,
                Tag::Table | Tag::TableRow | Tag::TableCell => formats.in_table = true,
                _ => {}
            }
            if el.style.align.is_some() {
                formats.align = el.style.align;
            }
        }
        formats
    }

    // === Caret ===

    pub fn caret(&self) -> Option<Caret> {
        self.caret
    }

    /// Collapse the selection onto `caret`.
    pub fn set_caret(&mut self, caret: Option<Caret>) {
        self.caret = caret;
        self.anchor = None;
    }

    /// Select from `anchor` to `focus`. The caret sits at the focus.
    pub fn set_selection(&mut self, anchor: Caret, focus: Caret) {
        self.anchor = (anchor != focus).then_some(anchor);
        self.caret = Some(focus);
    }

    pub fn anchor(&self) -> Option<Caret> {
        self.anchor
    }

    /// The selected char range, when the selection lies inside one text
    /// node.
    pub fn selected_range(&self) -> Option<(NodeId, Range<usize>)> {
        let (anchor, caret) = (self.anchor?, self.caret?);
        if anchor.node != caret.node {
            return None;
        }
        let len = self.text_len(caret.node);
        let start = anchor.offset.min(caret.offset).min(len);
        let end = anchor.offset.max(caret.offset).min(len);
        (start < end).then_some((caret.node, start..end))
    }

    /// Drop the caret or anchor if they point at nodes that no longer exist.
    pub fn fix_caret(&mut self) {
        if self.caret.is_some_and(|c| !self.contains(c.node)) {
            self.caret = None;
        }
        if self
            .anchor
            .is_some_and(|a| self.caret.is_none() || !self.contains(a.node))
        {
            self.anchor = None;
        }
    }

    // === Structural edits (no change notifications) ===

    /// Remove a node (and its subtree) from the tree.
    pub fn detach(&mut self, id: NodeId) -> Result<Node, EditorError> {
        let (parent, index) = self.locate(id).ok_or(EditorError::NodeNotFound(id))?;
        let siblings =
            children_of_mut(&mut self.content, parent).ok_or(EditorError::NodeNotFound(id))?;
        let node = siblings.remove(index);
        self.fix_caret();
        Ok(node)
    }

    /// Insert a node under `parent` (None for top level). The index is
    /// clamped to the number of children.
    pub fn insert_at(
        &mut self,
        parent: Option<NodeId>,
        index: usize,
        node: Node,
    ) -> Result<(), EditorError> {
        let siblings = match parent {
            None => &mut self.content,
            Some(pid) => self
                .find_mut(pid)
                .and_then(Node::children_mut)
                .ok_or(EditorError::NodeNotFound(pid))?,
        };
        let index = index.min(siblings.len());
        siblings.insert(index, node);
        Ok(())
    }

    /// Replace the node `id` with whatever `f` builds from it, in the same
    /// slot. The caret survives when its node is still in the tree.
    pub fn replace_with(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Self, Node) -> Vec<Node>,
    ) -> Result<(), EditorError> {
        let (parent, index) = self.locate(id).ok_or(EditorError::NodeNotFound(id))?;
        let siblings =
            children_of_mut(&mut self.content, parent).ok_or(EditorError::NodeNotFound(id))?;
        let node = siblings.remove(index);
        let replacement = f(self, node);
        let siblings =
            children_of_mut(&mut self.content, parent).ok_or(EditorError::NodeNotFound(id))?;
        let index = index.min(siblings.len());
        siblings.splice(index..index, replacement);
        self.fix_caret();
        Ok(())
    }

    /// Replace an element with its children.
    pub fn unwrap_element(&mut self, id: NodeId) -> Result<(), EditorError> {
        self.replace_with(id, |_, node| node.into_children())
    }

    /// Split a text node at a char offset. The tail moves into a new
    /// sibling right after it, whose id is returned.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, EditorError> {
        let tail = match self.find_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Text(s)) => {
                let byte = char_to_byte(s, offset);
                s.split_off(byte)
            }
            Some(NodeKind::Element(_)) => {
                return Err(EditorError::InvalidArgument(format!(
                    "{id} is not a text node"
                )));
            }
            None => return Err(EditorError::NodeNotFound(id)),
        };
        let tail = self.text(tail);
        let tail_id = tail.id;
        let (parent, index) = self.locate(id).ok_or(EditorError::NodeNotFound(id))?;
        self.insert_at(parent, index + 1, tail)?;
        Ok(tail_id)
    }

    /// Replace a char range of a text node. Returns whether the node was
    /// text and the edit changed it.
    pub(crate) fn replace_chars(&mut self, id: NodeId, range: Range<usize>, with: &str) -> bool {
        let Some(NodeKind::Text(s)) = self.find_mut(id).map(|n| &mut n.kind) else {
            return false;
        };
        let start = char_to_byte(s, range.start);
        let end = char_to_byte(s, range.end);
        if start > end || (start == end && with.is_empty()) {
            return false;
        }
        s.replace_range(start..end, with);
        true
    }

    fn text_len(&self, id: NodeId) -> usize {
        self.find(id)
            .and_then(Node::as_text)
            .map_or(0, |s| s.chars().count())
    }

    pub fn append_block(&mut self, node: Node) {
        self.content.push(node);
    }

    /// Insert a top-level block right after the block holding the caret,
    /// or at the end of the document when there is no caret.
    pub fn insert_block_after_caret(&mut self, node: Node) -> NodeId {
        let id = node.id;
        let top_level = self
            .caret
            .and_then(|c| self.path_of(c.node))
            .and_then(|path| path.first().copied())
            .and_then(|top| self.content.iter().position(|n| n.id == top));
        match top_level {
            Some(index) => self.content.insert(index + 1, node),
            None => self.content.push(node),
        }
        id
    }

    /// Replace all content. The caret is kept when it still resolves.
    pub fn set_content(&mut self, content: Vec<Node>) {
        if let Some(max) = max_id_in(&content) {
            self.next_id = self.next_id.max(max + 1);
        }
        self.content = content;
        self.fix_caret();
    }

    /// Replace all content with a stored snapshot's content.
    ///
    /// Publishes a restore notification like any other mutator; the history
    /// manager discards it while its suppression flag is set.
    pub fn restore(&mut self, content: &[Node]) {
        self.set_content(content.to_vec());
        self.publish(ContentChange::discrete(ChangeOrigin::Restore));
    }

    /// Apply a text-changing function to every text node, returning the
    /// sum of what it reports.
    pub(crate) fn map_text(&mut self, mut f: impl FnMut(&mut String) -> usize) -> usize {
        fn walk(nodes: &mut [Node], f: &mut dyn FnMut(&mut String) -> usize) -> usize {
            let mut total = 0;
            for node in nodes.iter_mut() {
                match &mut node.kind {
                    NodeKind::Text(t) => total += f(t),
                    NodeKind::Element(el) => total += walk(&mut el.children, f),
                }
            }
            total
        }
        walk(&mut self.content, &mut f)
    }

    // === Typing ===

    /// Insert typed text at the caret.
    ///
    /// Without a usable caret a new paragraph is started at the end of the
    /// document. Publishes a continuous change so the keystroke is
    /// coalesced with its neighbours.
    pub fn type_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.delete_selection();
        let caret = match self.caret.and_then(|c| self.ensure_text_caret(c)) {
            Some(caret) => caret,
            None => self.start_trailing_paragraph(),
        };
        if let Some(NodeKind::Text(s)) = self.find_mut(caret.node).map(|n| &mut n.kind) {
            let byte = char_to_byte(s, caret.offset);
            s.insert_str(byte, text);
        }
        self.caret = Some(Caret::new(
            caret.node,
            caret.offset + text.chars().count(),
        ));
        self.publish(ContentChange::continuous(ChangeOrigin::Typing));
    }

    /// Resolve a caret to a text position, inserting an empty text node
    /// when it sits between element children.
    pub(crate) fn ensure_text_caret(&mut self, caret: Caret) -> Option<Caret> {
        let node = self.find(caret.node)?;
        if node.is_text() {
            return Some(caret);
        }
        if node.tag().is_none_or(|t| t.is_void() || t.is_scaffolding()) {
            return None;
        }
        let text = self.text("");
        let id = text.id;
        let children = self.find_mut(caret.node)?.children_mut()?;
        let at = caret.offset.min(children.len());
        children.insert(at, text);
        Some(Caret::new(id, 0))
    }

    fn start_trailing_paragraph(&mut self) -> Caret {
        let text = self.text("");
        let text_id = text.id;
        let para = self.element(Element::new(Tag::Paragraph).with_children(vec![text]));
        self.content.push(para);
        Caret::new(text_id, 0)
    }

    // === Deleting ===

    /// Delete the selection, or what `unit` covers before the caret.
    ///
    /// At the start of a text node the last char of the preceding text in
    /// the same block goes; at the start of a block the block is joined
    /// onto the one before it. Publishes a continuous change when anything
    /// was removed.
    pub fn delete_backward(&mut self, unit: DeleteUnit) -> bool {
        let changed = self.delete_selection() || self.delete_before_caret(unit);
        if changed {
            self.publish(ContentChange::continuous(ChangeOrigin::Deleting));
        }
        changed
    }

    /// Forward counterpart of [`delete_backward`](Self::delete_backward):
    /// at the end of a block the next block is joined onto this one.
    pub fn delete_forward(&mut self, unit: DeleteUnit) -> bool {
        let changed = self.delete_selection() || self.delete_after_caret(unit);
        if changed {
            self.publish(ContentChange::continuous(ChangeOrigin::Deleting));
        }
        changed
    }

    /// Remove the selected range and collapse the caret to its start.
    fn delete_selection(&mut self) -> bool {
        let Some((node, range)) = self.selected_range() else {
            self.anchor = None;
            return false;
        };
        let start = range.start;
        let removed = self.replace_chars(node, range, "");
        self.set_caret(Some(Caret::new(node, start)));
        removed
    }

    /// The caret as a text position with its offset clamped, plus the chars
    /// of its text node.
    fn text_caret(&mut self) -> Option<(Caret, Vec<char>)> {
        let caret = self.caret.and_then(|c| self.ensure_text_caret(c))?;
        let chars: Vec<char> = self
            .find(caret.node)
            .and_then(Node::as_text)
            .map(|s| s.chars().collect())
            .unwrap_or_default();
        let caret = Caret::new(caret.node, caret.offset.min(chars.len()));
        self.caret = Some(caret);
        Some((caret, chars))
    }

    fn delete_before_caret(&mut self, unit: DeleteUnit) -> bool {
        let Some((caret, chars)) = self.text_caret() else {
            return false;
        };
        if caret.offset > 0 {
            let start = match unit {
                DeleteUnit::Char => caret.offset - 1,
                DeleteUnit::Word => word_start(&chars, caret.offset),
                DeleteUnit::Line => 0,
            };
            self.replace_chars(caret.node, start..caret.offset, "");
            self.caret = Some(Caret::new(caret.node, start));
            return true;
        }
        let runs = self.text_runs();
        let Some(pos) = runs.iter().position(|(id, _)| *id == caret.node) else {
            return false;
        };
        let block = runs[pos].1;
        for &(id, run_block) in runs[..pos].iter().rev() {
            if run_block != block {
                break;
            }
            let len = self.text_len(id);
            if len > 0 {
                return self.replace_chars(id, len - 1..len, "");
            }
        }
        match block.and_then(|b| Some((self.adjacent_block(b, false)?, b))) {
            Some((previous, block)) => self.join_blocks(previous, block),
            None => false,
        }
    }

    fn delete_after_caret(&mut self, unit: DeleteUnit) -> bool {
        let Some((caret, chars)) = self.text_caret() else {
            return false;
        };
        if caret.offset < chars.len() {
            let end = match unit {
                DeleteUnit::Char => caret.offset + 1,
                DeleteUnit::Word => word_end(&chars, caret.offset),
                DeleteUnit::Line => chars.len(),
            };
            return self.replace_chars(caret.node, caret.offset..end, "");
        }
        let runs = self.text_runs();
        let Some(pos) = runs.iter().position(|(id, _)| *id == caret.node) else {
            return false;
        };
        let block = runs[pos].1;
        for &(id, run_block) in &runs[pos + 1..] {
            if run_block != block {
                break;
            }
            if self.text_len(id) > 0 {
                return self.replace_chars(id, 0..1, "");
            }
        }
        match block.and_then(|b| Some((b, self.adjacent_block(b, true)?))) {
            Some((block, next)) => self.join_blocks(block, next),
            None => false,
        }
    }

    fn text_runs(&self) -> Vec<(NodeId, Option<NodeId>)> {
        let mut runs = Vec::new();
        collect_text_runs(&self.content, None, &mut runs);
        runs
    }

    /// The joinable sibling right before (or after) the joinable block `id`.
    fn adjacent_block(&self, id: NodeId, forward: bool) -> Option<NodeId> {
        if !self.find(id)?.tag().is_some_and(is_joinable) {
            return None;
        }
        let (parent, index) = self.locate(id)?;
        let siblings = match parent {
            Some(pid) => self.find(pid)?.children(),
            None => self.content.as_slice(),
        };
        let index = if forward {
            index + 1
        } else {
            index.checked_sub(1)?
        };
        siblings
            .get(index)
            .filter(|n| n.tag().is_some_and(is_joinable))
            .map(|n| n.id)
    }

    /// Move the children of `from` to the end of `into` and drop `from`.
    fn join_blocks(&mut self, into: NodeId, from: NodeId) -> bool {
        if self.find(into).and_then(Node::as_element).is_none() {
            return false;
        }
        let Some(moved) = self
            .find_mut(from)
            .and_then(Node::children_mut)
            .map(std::mem::take)
        else {
            return false;
        };
        if let Some(children) = self.find_mut(into).and_then(Node::children_mut) {
            children.extend(moved);
        }
        self.detach(from).is_ok()
    }

    // === Change notifications ===

    pub fn publish(&mut self, change: ContentChange) {
        self.changes.publish(change);
    }

    pub fn changes_mut(&mut self) -> &mut ChangeChannel {
        &mut self.changes
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    // === Output ===

    /// Clean markup of the live tree.
    pub fn to_markup(&self) -> String {
        markup::to_markup(&self.content, MarkupOptions::default())
    }

    /// Markup annotated with `data-node-id` for a DOM host.
    pub fn render_html(&self) -> String {
        markup::to_markup(&self.content, MarkupOptions { node_ids: true })
    }

    pub fn to_plain_text(&self) -> String {
        markup::plain_text(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(surface: &mut DocumentSurface, rows: usize, cols: usize) -> Node {
        let rows = (0..rows)
            .map(|_| {
                let cells = (0..cols)
                    .map(|_| surface.element(Element::new(Tag::TableCell)))
                    .collect();
                surface.element(Element::new(Tag::TableRow).with_children(cells))
            })
            .collect();
        surface.element(Element::new(Tag::Table).with_children(rows))
    }

    #[test]
    fn test_type_text_without_caret_starts_paragraph() {
        let mut surface = DocumentSurface::new();
        surface.type_text("A");
        assert_eq!(surface.to_markup(), "<p>A</p>");
        surface.type_text("bc");
        assert_eq!(surface.to_markup(), "<p>Abc</p>");
        assert_eq!(surface.caret().map(|c| c.offset), Some(3));
        assert_eq!(surface.changes_mut().len(), 2);
    }

    #[test]
    fn test_type_text_at_char_offset() {
        let mut surface = DocumentSurface::new();
        surface.type_text("héllo");
        let caret = surface.caret().unwrap();
        surface.set_caret(Some(Caret::new(caret.node, 2)));
        surface.type_text("X");
        assert_eq!(surface.to_plain_text(), "héXllo");
    }

    #[test]
    fn test_type_text_into_empty_cell() {
        let mut surface = DocumentSurface::new();
        let t = table(&mut surface, 1, 2);
        let cell = t.children()[0].children()[1].id;
        surface.append_block(t);
        surface.set_caret(Some(Caret::new(cell, 0)));
        surface.type_text("x");
        assert_eq!(
            surface.to_markup(),
            "<table><tr><td></td><td>x</td></tr></table>"
        );
    }

    #[test]
    fn test_enclosing_cell_and_table() {
        let mut surface = DocumentSurface::new();
        let t = table(&mut surface, 2, 2);
        let table_id = t.id;
        let cell = t.children()[1].children()[0].id;
        surface.append_block(t);

        assert_eq!(surface.enclosing_cell(), None);
        surface.set_caret(Some(Caret::new(cell, 0)));
        assert_eq!(surface.enclosing_cell(), Some(cell));
        assert_eq!(surface.enclosing_table(), Some(table_id));
        assert!(surface.active_formats().in_table);
    }

    #[test]
    fn test_detach_and_insert_at() {
        let mut surface = DocumentSurface::new();
        let a = surface.text("a");
        let b = surface.text("b");
        let a_id = a.id;
        let p = surface.element(Element::new(Tag::Paragraph).with_children(vec![a, b]));
        let p_id = p.id;
        surface.append_block(p);

        let node = surface.detach(a_id).unwrap();
        assert_eq!(surface.to_markup(), "<p>b</p>");
        surface.insert_at(Some(p_id), 99, node).unwrap();
        assert_eq!(surface.to_markup(), "<p>ba</p>");
        assert_eq!(surface.locate(a_id), Some((Some(p_id), 1)));
        assert_eq!(surface.detach(NodeId(999)), Err(EditorError::NodeNotFound(NodeId(999))));
    }

    #[test]
    fn test_detach_clears_dangling_caret() {
        let mut surface = DocumentSurface::new();
        surface.type_text("gone");
        let para = surface.content()[0].id;
        surface.detach(para).unwrap();
        assert_eq!(surface.caret(), None);
    }

    /// Two paragraphs, `first` and `second`, with the caret at the start of
    /// `second`'s text.
    fn two_paragraphs() -> (DocumentSurface, NodeId, NodeId) {
        let mut surface = DocumentSurface::new();
        let a = surface.text("first");
        let a_id = a.id;
        let b = surface.text("second");
        let b_id = b.id;
        let p1 = surface.element(Element::new(Tag::Paragraph).with_children(vec![a]));
        let p2 = surface.element(Element::new(Tag::Paragraph).with_children(vec![b]));
        surface.append_block(p1);
        surface.append_block(p2);
        surface.set_caret(Some(Caret::new(b_id, 0)));
        (surface, a_id, b_id)
    }

    #[test]
    fn test_delete_backward_removes_char_before_caret() {
        let mut surface = DocumentSurface::new();
        surface.type_text("abc");
        surface.changes_mut().discard();

        assert!(surface.delete_backward(DeleteUnit::Char));
        assert_eq!(surface.to_markup(), "<p>ab</p>");
        assert_eq!(surface.caret().map(|c| c.offset), Some(2));
        let changes: Vec<_> = surface.changes_mut().drain().collect();
        assert_eq!(
            changes,
            vec![ContentChange::continuous(ChangeOrigin::Deleting)]
        );
    }

    #[test]
    fn test_delete_forward_removes_char_after_caret() {
        let mut surface = DocumentSurface::new();
        surface.type_text("abc");
        let text = surface.caret().unwrap().node;
        surface.set_caret(Some(Caret::new(text, 1)));

        assert!(surface.delete_forward(DeleteUnit::Char));
        assert_eq!(surface.to_markup(), "<p>ac</p>");
        assert_eq!(surface.caret(), Some(Caret::new(text, 1)));
    }

    #[test]
    fn test_delete_backward_joins_paragraphs() {
        let (mut surface, a_id, b_id) = two_paragraphs();

        assert!(surface.delete_backward(DeleteUnit::Char));
        assert_eq!(surface.to_markup(), "<p>firstsecond</p>");
        assert_eq!(surface.content().len(), 1);
        assert_eq!(surface.caret(), Some(Caret::new(b_id, 0)));
        assert_eq!(surface.parent_of(a_id), surface.parent_of(b_id));
    }

    #[test]
    fn test_delete_forward_joins_next_paragraph() {
        let (mut surface, a_id, _) = two_paragraphs();
        surface.set_caret(Some(Caret::new(a_id, 5)));

        assert!(surface.delete_forward(DeleteUnit::Char));
        assert_eq!(surface.to_markup(), "<p>firstsecond</p>");
        assert_eq!(surface.caret(), Some(Caret::new(a_id, 5)));
    }

    #[test]
    fn test_delete_crosses_inline_runs_in_one_block() {
        let mut surface = DocumentSurface::new();
        let plain = surface.text("ab");
        let bold_text = surface.text("cd");
        let bold_id = bold_text.id;
        let b = surface.element(Element::new(Tag::Bold).with_children(vec![bold_text]));
        let p = surface.element(Element::new(Tag::Paragraph).with_children(vec![plain, b]));
        surface.append_block(p);
        surface.set_caret(Some(Caret::new(bold_id, 0)));

        assert!(surface.delete_backward(DeleteUnit::Char));
        assert_eq!(surface.to_markup(), "<p>a<b>cd</b></p>");
    }

    #[test]
    fn test_delete_stops_at_document_and_cell_edges() {
        let mut surface = DocumentSurface::new();
        surface.type_text("x");
        let text = surface.caret().unwrap().node;
        surface.set_caret(Some(Caret::new(text, 0)));
        surface.changes_mut().discard();
        assert!(!surface.delete_backward(DeleteUnit::Char));
        assert!(!surface.has_pending_changes());

        let mut surface = DocumentSurface::new();
        let t = table(&mut surface, 1, 2);
        let second_cell = t.children()[0].children()[1].id;
        surface.append_block(t);
        surface.set_caret(Some(Caret::new(second_cell, 0)));
        assert!(!surface.delete_backward(DeleteUnit::Char));
        assert_eq!(
            surface.to_markup(),
            "<table><tr><td></td><td></td></tr></table>"
        );
    }

    #[test]
    fn test_delete_word_and_line() {
        let mut surface = DocumentSurface::new();
        surface.type_text("one two three");

        assert!(surface.delete_backward(DeleteUnit::Word));
        assert_eq!(surface.to_markup(), "<p>one two </p>");
        assert!(surface.delete_backward(DeleteUnit::Word));
        assert_eq!(surface.to_markup(), "<p>one </p>");

        let text = surface.caret().unwrap().node;
        surface.set_caret(Some(Caret::new(text, 0)));
        assert!(surface.delete_forward(DeleteUnit::Line));
        assert_eq!(surface.to_markup(), "<p></p>");
    }

    #[test]
    fn test_selection_is_deleted_then_replaced() {
        let mut surface = DocumentSurface::new();
        surface.type_text("hello world");
        let text = surface.caret().unwrap().node;

        surface.set_selection(Caret::new(text, 11), Caret::new(text, 6));
        assert_eq!(surface.selected_range(), Some((text, 6..11)));
        assert!(surface.delete_backward(DeleteUnit::Char));
        assert_eq!(surface.to_markup(), "<p>hello </p>");
        assert_eq!(surface.anchor(), None);

        surface.set_selection(Caret::new(text, 0), Caret::new(text, 5));
        surface.type_text("bye");
        assert_eq!(surface.to_markup(), "<p>bye </p>");
        assert_eq!(surface.caret(), Some(Caret::new(text, 3)));
    }

    #[test]
    fn test_collapsed_selection_has_no_range() {
        let mut surface = DocumentSurface::new();
        surface.type_text("abc");
        let caret = surface.caret().unwrap();
        surface.set_selection(caret, caret);
        assert_eq!(surface.anchor(), None);
        assert_eq!(surface.selected_range(), None);
    }

    #[test]
    fn test_split_text_and_unwrap() {
        let mut surface = DocumentSurface::new();
        let text = surface.text("abcd");
        let text_id = text.id;
        let b = surface.element(Element::new(Tag::Bold).with_children(vec![text]));
        let b_id = b.id;
        let p = surface.element(Element::new(Tag::Paragraph).with_children(vec![b]));
        surface.append_block(p);

        let tail = surface.split_text(text_id, 2).unwrap();
        assert_eq!(surface.locate(tail), Some((Some(b_id), 1)));
        assert_eq!(surface.to_markup(), "<p><b>abcd</b></p>");

        surface.set_caret(Some(Caret::new(tail, 1)));
        surface.unwrap_element(b_id).unwrap();
        assert_eq!(surface.to_markup(), "<p>abcd</p>");
        assert_eq!(surface.caret(), Some(Caret::new(tail, 1)));

        assert!(matches!(
            surface.split_text(surface.content()[0].id, 0),
            Err(EditorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_ids_stay_monotonic_across_restore() {
        let mut surface = DocumentSurface::new();
        surface.type_text("abc");
        let saved = surface.content().to_vec();
        surface.set_content(Vec::new());
        surface.restore(&saved);
        let fresh = surface.alloc_id();
        assert!(saved.iter().all(|n| n.id < fresh));
    }

    #[test]
    fn test_from_nodes_continues_after_max_id() {
        let nodes = vec![Node {
            id: NodeId(41),
            kind: NodeKind::Text("x".into()),
        }];
        let mut surface = DocumentSurface::from_nodes(nodes);
        assert_eq!(surface.alloc_id(), NodeId(42));
    }

    #[test]
    fn test_active_formats_from_ancestors() {
        let mut surface = DocumentSurface::new();
        let text = surface.text("bold");
        let text_id = text.id;
        let b = surface.element(Element::new(Tag::Bold).with_children(vec![text]));
        let p = surface.element(
            Element::new(Tag::Paragraph)
                .with_style(Style {
                    align: Some(Align::Center),
                    ..Style::default()
                })
                .with_children(vec![b]),
        );
        surface.append_block(p);
        surface.set_caret(Some(Caret::new(text_id, 1)));

        let formats = surface.active_formats();
        assert!(formats.bold);
        assert!(!formats.italic);
        assert_eq!(formats.align, Some(Align::Center));
    }

    #[test]
    fn test_insert_block_after_caret() {
        let mut surface = DocumentSurface::new();
        surface.type_text("first");
        let caret = surface.caret();
        let para = surface.content()[0].id;
        let second = surface.text("second");
        let p2 = surface.element(Element::new(Tag::Paragraph).with_children(vec![second]));
        surface.append_block(p2);
        surface.set_caret(caret);

        let img = surface.element(Element::new(Tag::Image).with_attr("src", "a.png"));
        surface.insert_block_after_caret(img);
        assert_eq!(surface.content()[0].id, para);
        assert_eq!(surface.content()[1].tag(), Some(Tag::Image));
        assert_eq!(surface.content().len(), 3);
    }

    #[test]
    fn test_style_css() {
        let style = Style {
            position: Some(Position::Absolute),
            left: Some(50.0),
            top: Some(0.0),
            width: Some(80.5),
            ..Style::default()
        };
        assert_eq!(
            style.to_css(),
            "position: absolute; left: 50px; top: 0px; width: 80.5px"
        );
        assert!(Style::default().is_empty());
    }
}
