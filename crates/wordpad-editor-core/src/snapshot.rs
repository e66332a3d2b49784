//! Immutable captures of the document content.

use std::sync::Arc;

use smol_str::SmolStr;

use crate::markup::{self, MarkupOptions};
use crate::tree::Node;

/// A point-in-time capture of the document.
///
/// Holds the serialized markup and the structure it was produced from, so a
/// restore reproduces the exact tree (node ids included). Two snapshots are
/// equal when their markup is equal.
#[derive(Clone, Debug)]
pub struct Snapshot {
    markup: SmolStr,
    content: Arc<[Node]>,
}

impl Snapshot {
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let markup = SmolStr::new(markup::to_markup(&nodes, MarkupOptions::default()));
        Self {
            markup,
            content: nodes.into(),
        }
    }

    pub fn empty() -> Self {
        Self::from_nodes(Vec::new())
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn content(&self) -> &[Node] {
        &self.content
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.markup == other.markup
    }
}

impl Eq for Snapshot {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::DocumentSurface;

    #[test]
    fn test_equality_ignores_node_ids() {
        let mut a = DocumentSurface::new();
        a.type_text("same");
        let mut b = DocumentSurface::new();
        b.alloc_id();
        b.alloc_id();
        b.type_text("same");

        assert_ne!(a.content()[0].id, b.content()[0].id);
        assert_eq!(
            Snapshot::from_nodes(a.content().to_vec()),
            Snapshot::from_nodes(b.content().to_vec())
        );
    }

    #[test]
    fn test_markup_and_content_agree() {
        let mut s = DocumentSurface::new();
        s.type_text("hi");
        let snap = Snapshot::from_nodes(s.content().to_vec());
        assert_eq!(snap.markup(), "<p>hi</p>");
        assert_eq!(snap.content(), s.content());
        assert_eq!(Snapshot::empty().markup(), "");
    }
}
