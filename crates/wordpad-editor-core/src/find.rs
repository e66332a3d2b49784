//! Find and replace over the document's text.
//!
//! Matching is literal and ignores ASCII case. A match never spans two text
//! nodes, so a word split by formatting is not found.

use std::collections::HashMap;
use std::ops::Range;

use crate::tree::{Caret, DocumentSurface, Node, NodeId, NodeKind};

/// One occurrence, as char offsets into a text node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextMatch {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

/// Which match is selected, counted from zero, out of how many.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchPosition {
    pub index: usize,
    pub total: usize,
}

/// Char ranges of `query` in `text`.
fn match_ranges(text: &str, query: &str) -> Vec<Range<usize>> {
    // ASCII lowercasing keeps byte offsets, so positions found in the
    // folded copy index the original.
    let folded = text.to_ascii_lowercase();
    let needle = query.to_ascii_lowercase();
    let len = query.chars().count();
    folded
        .match_indices(&needle)
        .map(|(byte, _)| {
            let start = text[..byte].chars().count();
            start..start + len
        })
        .collect()
}

fn walk_text<'a>(nodes: &'a [Node], f: &mut impl FnMut(NodeId, &'a str)) {
    for node in nodes {
        match &node.kind {
            NodeKind::Text(text) => f(node.id, text),
            NodeKind::Element(el) => walk_text(&el.children, f),
        }
    }
}

/// Every match in document order.
pub fn find_matches(nodes: &[Node], query: &str) -> Vec<TextMatch> {
    let mut matches = Vec::new();
    if query.is_empty() {
        return matches;
    }
    walk_text(nodes, &mut |node, text| {
        matches.extend(
            match_ranges(text, query)
                .into_iter()
                .map(|r| TextMatch {
                    node,
                    start: r.start,
                    end: r.end,
                }),
        );
    });
    matches
}

/// Select the first match at or after the caret, wrapping to the first
/// match in the document.
pub fn find_next(surface: &mut DocumentSurface, query: &str) -> Option<MatchPosition> {
    let matches = find_matches(surface.content(), query);
    if matches.is_empty() {
        return None;
    }
    let mut order = HashMap::new();
    walk_text(surface.content(), &mut |node, _| {
        let next = order.len();
        order.insert(node, next);
    });
    let from = surface
        .caret()
        .and_then(|c| Some((*order.get(&c.node)?, c.offset)))
        .unwrap_or((0, 0));
    let index = matches
        .iter()
        .position(|m| (order.get(&m.node).copied().unwrap_or(0), m.start) >= from)
        .unwrap_or(0);

    let found = matches[index];
    surface.set_selection(
        Caret::new(found.node, found.start),
        Caret::new(found.node, found.end),
    );
    tracing::debug!(query, index, total = matches.len(), "match selected");
    Some(MatchPosition {
        index,
        total: matches.len(),
    })
}

/// The selection, when it is exactly one match of `query`.
pub fn selected_match(surface: &DocumentSurface, query: &str) -> Option<TextMatch> {
    let (node, range) = surface.selected_range()?;
    let text = surface.find(node)?.as_text()?;
    let selected: String = text
        .chars()
        .skip(range.start)
        .take(range.len())
        .collect();
    selected.eq_ignore_ascii_case(query).then_some(TextMatch {
        node,
        start: range.start,
        end: range.end,
    })
}

/// Replace the selected match, finding the next one first when the
/// selection is not a match. Leaves the caret after the replacement.
pub fn replace_current(surface: &mut DocumentSurface, find: &str, replace: &str) -> bool {
    let current = match selected_match(surface, find) {
        Some(m) => Some(m),
        None => find_next(surface, find).and_then(|_| selected_match(surface, find)),
    };
    let Some(m) = current else {
        return false;
    };
    surface.replace_chars(m.node, m.start..m.end, replace);
    surface.set_caret(Some(Caret::new(m.node, m.start + replace.chars().count())));
    true
}

/// Replace every match. Returns how many were replaced.
pub fn replace_all(surface: &mut DocumentSurface, find: &str, replace: &str) -> usize {
    let count = surface.map_text(|text| {
        let (replaced, n) = replace_ascii_case_insensitive(text, find, replace);
        if n > 0 {
            *text = replaced;
        }
        n
    });
    if count > 0 {
        surface.set_caret(surface.caret());
    }
    count
}

/// Replace every occurrence of `needle`, ignoring ASCII case. Returns the
/// new text and the number of replacements.
fn replace_ascii_case_insensitive(haystack: &str, needle: &str, replacement: &str) -> (String, usize) {
    let folded = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut count = 0;
    let mut last = 0;
    for (start, _) in folded.match_indices(&needle) {
        out.push_str(&haystack[last..start]);
        out.push_str(replacement);
        last = start + needle.len();
        count += 1;
    }
    out.push_str(&haystack[last..]);
    (out, count)
}
