//! Saving, loading and exporting documents.
//!
//! The native format is JSON: the structured content plus title/author
//! metadata. Export produces the HTML-based `.doc` body: a title heading
//! and author line followed by the clean document markup.

use serde::{Deserialize, Serialize};
use v_htmlescape::escape;

use crate::error::EditorError;
use crate::markup::{self, MarkupOptions};
use crate::tree::{DocumentSurface, Element, Node, Tag};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedDocument {
    pub version: u32,
    #[serde(default)]
    pub meta: DocumentMeta,
    pub content: Vec<Node>,
}

impl SavedDocument {
    /// Package clean content for storage.
    pub fn new(content: &[Node], meta: &DocumentMeta) -> Result<Self, EditorError> {
        if contains_scaffolding(content) {
            return Err(EditorError::Serialization(
                "refusing to save overlay scaffolding".into(),
            ));
        }
        Ok(Self {
            version: FORMAT_VERSION,
            meta: meta.clone(),
            content: content.to_vec(),
        })
    }

    /// Reject documents this version cannot load.
    pub fn validate(&self) -> Result<(), EditorError> {
        if self.version != FORMAT_VERSION {
            return Err(EditorError::Serialization(format!(
                "unsupported document version {}",
                self.version
            )));
        }
        if contains_scaffolding(&self.content) {
            return Err(EditorError::Serialization(
                "document contains overlay scaffolding".into(),
            ));
        }
        Ok(())
    }
}

/// Serialize clean document content.
pub fn save_json(content: &[Node], meta: &DocumentMeta) -> Result<String, EditorError> {
    let doc = SavedDocument::new(content, meta)?;
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn load_json(json: &str) -> Result<SavedDocument, EditorError> {
    let doc: SavedDocument = serde_json::from_str(json)?;
    doc.validate()?;
    Ok(doc)
}

/// HTML body for the `.doc` export.
pub fn export_markup(content: &[Node], meta: &DocumentMeta) -> String {
    let title = meta.title.as_deref().unwrap_or("Untitled");
    let author = meta.author.as_deref().unwrap_or("Unknown");
    format!(
        "<h1>{}</h1><p><b>Author:</b> {}</p>{}",
        escape(title),
        escape(author),
        markup::to_markup(content, MarkupOptions::default())
    )
}

/// One paragraph per line, for importing plain text.
pub fn nodes_from_plain_text(text: &str) -> Vec<Node> {
    let mut scratch = DocumentSurface::new();
    text.lines()
        .map(|line| {
            let text = scratch.text(line);
            scratch.element(Element::new(Tag::Paragraph).with_children(vec![text]))
        })
        .collect()
}

fn contains_scaffolding(nodes: &[Node]) -> bool {
    nodes.iter().any(|n| {
        n.tag().is_some_and(|t| t.is_scaffolding()) || contains_scaffolding(n.children())
    })
}
