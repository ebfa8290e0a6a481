//! In-memory structured document tree.
//!
//! Block nodes only: inline markup is flattened to plain text, which is all
//! chunk placement and serialization need. Nodes are addressed by paths of
//! child indexes from the root, so document order is plain lexicographic
//! order of paths.

use rmdchunk_core::ChunkNode;

use crate::error::EditorError;
use crate::transaction::{Step, Transaction};

/// Kind and attributes of a document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root.
    Doc,
    /// YAML front matter block.
    Frontmatter {
        /// YAML source between the `---` fences.
        yaml: String,
    },
    /// Paragraph of plain text.
    Paragraph {
        /// Flattened inline text.
        text: String,
    },
    /// ATX heading.
    Heading {
        /// Heading level (1-6).
        depth: u8,
        /// Flattened inline text.
        text: String,
    },
    /// Generic fenced or indented code block.
    CodeBlock {
        /// Info string language.
        lang: Option<String>,
        /// Info string remainder.
        meta: Option<String>,
        /// Code text.
        code: String,
    },
    /// Executable code chunk.
    Chunk(ChunkNode),
    /// Bullet or ordered list; children are list items.
    List {
        /// Ordered (`1.`) instead of bullet (`-`).
        ordered: bool,
        /// First number of an ordered list.
        start: Option<u32>,
    },
    /// List item; children are blocks.
    ListItem {
        /// Task list state, if any.
        checked: Option<bool>,
    },
    /// Block quote; children are blocks.
    BlockQuote,
    /// Table; children are rows.
    Table,
    /// Table row; children are cells.
    TableRow,
    /// Table cell holding flattened inline text.
    TableCell {
        /// Flattened inline text.
        text: String,
    },
    /// Horizontal rule.
    ThematicBreak,
    /// Raw HTML block.
    Html {
        /// HTML source.
        value: String,
    },
}

impl NodeKind {
    /// Schema name of the node kind.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Frontmatter { .. } => "yaml_metadata",
            NodeKind::Paragraph { .. } => "paragraph",
            NodeKind::Heading { .. } => "heading",
            NodeKind::CodeBlock { .. } => "code_block",
            NodeKind::Chunk(_) => crate::extension::NODE_NAME,
            NodeKind::List { ordered: true, .. } => "ordered_list",
            NodeKind::List { ordered: false, .. } => "bullet_list",
            NodeKind::ListItem { .. } => "list_item",
            NodeKind::BlockQuote => "blockquote",
            NodeKind::Table => "table",
            NodeKind::TableRow => "table_row",
            NodeKind::TableCell { .. } => "table_cell",
            NodeKind::ThematicBreak => "horizontal_rule",
            NodeKind::Html { .. } => "raw_html",
        }
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Kind and attributes.
    pub kind: NodeKind,
    /// Child blocks (empty for leaf kinds).
    pub children: Vec<Node>,
}

impl Node {
    /// Creates a leaf node.
    pub fn leaf(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    /// Creates a container node.
    pub fn container(kind: NodeKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    /// Paragraph with the given text.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Paragraph { text: text.into() })
    }

    /// Heading with the given level and text.
    pub fn heading(depth: u8, text: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Heading {
            depth,
            text: text.into(),
        })
    }

    /// Chunk node.
    pub fn chunk(chunk: ChunkNode) -> Self {
        Self::leaf(NodeKind::Chunk(chunk))
    }

    /// Bullet list of items.
    pub fn bullet_list(items: Vec<Node>) -> Self {
        Self::container(
            NodeKind::List {
                ordered: false,
                start: None,
            },
            items,
        )
    }

    /// Ordered list of items starting at `start`.
    pub fn ordered_list(start: u32, items: Vec<Node>) -> Self {
        Self::container(
            NodeKind::List {
                ordered: true,
                start: Some(start),
            },
            items,
        )
    }

    /// List item holding blocks.
    pub fn list_item(children: Vec<Node>) -> Self {
        Self::container(NodeKind::ListItem { checked: None }, children)
    }

    /// Block quote holding blocks.
    pub fn blockquote(children: Vec<Node>) -> Self {
        Self::container(NodeKind::BlockQuote, children)
    }

    /// Table from rows of cell texts.
    pub fn table<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|cells| {
                let cells = cells
                    .into_iter()
                    .map(|text| Self::leaf(NodeKind::TableCell { text: text.into() }))
                    .collect();
                Self::container(NodeKind::TableRow, cells)
            })
            .collect();
        Self::container(NodeKind::Table, rows)
    }

    /// Editable text of a textblock (paragraph, heading, cell, code, chunk).
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Paragraph { text }
            | NodeKind::Heading { text, .. }
            | NodeKind::TableCell { text } => Some(text),
            NodeKind::CodeBlock { code, .. } => Some(code),
            NodeKind::Chunk(chunk) => Some(&chunk.raw_content),
            _ => None,
        }
    }

    /// Chunk payload, if this is a chunk node.
    pub fn as_chunk(&self) -> Option<&ChunkNode> {
        match &self.kind {
            NodeKind::Chunk(chunk) => Some(chunk),
            _ => None,
        }
    }

    /// Whether this node holds editable text.
    pub fn is_textblock(&self) -> bool {
        self.text().is_some()
    }

    /// Whether this is a list item with no content, or only an empty paragraph.
    pub fn is_empty_list_item(&self) -> bool {
        if !matches!(self.kind, NodeKind::ListItem { .. }) {
            return false;
        }
        match self.children.as_slice() {
            [] => true,
            [only] => matches!(&only.kind, NodeKind::Paragraph { text } if text.is_empty()),
            _ => false,
        }
    }
}

/// A collapsed cursor or a range inside one textblock.
///
/// Offsets count characters of the textblock's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Path of the textblock.
    pub path: Vec<usize>,
    /// Fixed end of the selection.
    pub anchor: usize,
    /// Moving end of the selection.
    pub head: usize,
}

impl Selection {
    /// Collapsed cursor at `offset`.
    pub fn cursor(path: Vec<usize>, offset: usize) -> Self {
        Self {
            path,
            anchor: offset,
            head: offset,
        }
    }

    /// Range between `anchor` and `head`.
    pub fn range(path: Vec<usize>, anchor: usize, head: usize) -> Self {
        Self { path, anchor, head }
    }

    /// Whether the selection is a collapsed cursor.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Lower offset.
    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Upper offset.
    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }
}

/// A structured document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Root node (always [`NodeKind::Doc`]).
    pub root: Node,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Document {
    /// Creates a document from top-level blocks.
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            root: Node::container(NodeKind::Doc, children),
        }
    }

    /// Top-level blocks.
    pub fn blocks(&self) -> &[Node] {
        &self.root.children
    }

    /// Node at `path`; the empty path is the root.
    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(&self.root, |node, index| node.children.get(*index))
    }

    /// Mutable node at `path`.
    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        path.iter()
            .try_fold(&mut self.root, |node, index| node.children.get_mut(*index))
    }

    /// Whether `selection` points into a textblock and both offsets fall
    /// within its text (counted in characters).
    pub fn is_valid_selection(&self, selection: &Selection) -> bool {
        self.node(&selection.path)
            .and_then(Node::text)
            .is_some_and(|text| selection.to() <= text.chars().count())
    }

    /// Ancestors of the node at `path`, nearest first, ending with the root.
    pub fn ancestors(&self, path: &[usize]) -> Vec<&Node> {
        let mut ancestors: Vec<&Node> = (0..path.len())
            .filter_map(|depth| self.node(&path[..depth]))
            .collect();
        ancestors.reverse();
        ancestors
    }

    /// Every chunk node with its path, in document order.
    pub fn chunks(&self) -> Vec<(Vec<usize>, &ChunkNode)> {
        let mut found = Vec::new();
        collect_chunks(&self.root, &mut Vec::new(), &mut found);
        found
    }

    /// Applies all steps of a transaction, or none of them.
    pub fn apply(&mut self, transaction: &Transaction) -> Result<(), EditorError> {
        let mut target = self.clone();
        for step in transaction.steps() {
            apply_step(&mut target.root, step)?;
        }
        if let Some(selection) = transaction.selection()
            && !target.is_valid_selection(selection)
        {
            return Err(EditorError::InvalidSelection {
                path: selection.path.clone(),
            });
        }
        *self = target;
        Ok(())
    }
}

fn collect_chunks<'a>(
    node: &'a Node,
    path: &mut Vec<usize>,
    found: &mut Vec<(Vec<usize>, &'a ChunkNode)>,
) {
    if let Some(chunk) = node.as_chunk() {
        found.push((path.clone(), chunk));
    }
    for (index, child) in node.children.iter().enumerate() {
        path.push(index);
        collect_chunks(child, path, found);
        path.pop();
    }
}

fn apply_step(root: &mut Node, step: &Step) -> Result<(), EditorError> {
    let path = step.path();
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(EditorError::RootReplacement);
    };
    let invalid = || EditorError::InvalidPath {
        path: path.to_vec(),
    };
    let parent = parent_path
        .iter()
        .try_fold(root, |node, i| node.children.get_mut(*i))
        .ok_or_else(invalid)?;

    match step {
        Step::Replace { nodes, .. } => {
            if index >= parent.children.len() {
                return Err(invalid());
            }
            parent.children.splice(index..=index, nodes.iter().cloned());
        }
        Step::Insert { node, .. } => {
            if index > parent.children.len() {
                return Err(invalid());
            }
            parent.children.insert(index, node.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::new(vec![
            Node::heading(1, "Title"),
            Node::bullet_list(vec![
                Node::list_item(vec![Node::paragraph("one")]),
                Node::list_item(vec![
                    Node::paragraph("two"),
                    Node::chunk(ChunkNode::new("{r}\nx")),
                ]),
            ]),
            Node::chunk(ChunkNode::new("{python}\ny")),
        ])
    }

    #[test]
    fn addresses_nodes_by_path() {
        let doc = sample();
        assert_eq!(doc.node(&[0]).and_then(Node::text), Some("Title"));
        assert_eq!(doc.node(&[1, 1, 0]).and_then(Node::text), Some("two"));
        assert!(doc.node(&[1, 5]).is_none());
        assert_eq!(doc.node(&[]).map(|n| n.kind.name()), Some("doc"));
    }

    #[test]
    fn ancestors_are_nearest_first() {
        let doc = sample();
        let names: Vec<_> = doc
            .ancestors(&[1, 1, 0])
            .iter()
            .map(|n| n.kind.name())
            .collect();
        assert_eq!(names, vec!["list_item", "bullet_list", "doc"]);
    }

    #[test]
    fn chunks_in_document_order() {
        let doc = sample();
        let chunks: Vec<_> = doc
            .chunks()
            .into_iter()
            .map(|(path, chunk)| (path, chunk.raw_content.clone()))
            .collect();
        assert_eq!(
            chunks,
            vec![
                (vec![1, 1, 1], "{r}\nx".to_string()),
                (vec![2], "{python}\ny".to_string()),
            ]
        );
    }

    #[test]
    fn empty_list_items() {
        assert!(Node::list_item(vec![]).is_empty_list_item());
        assert!(Node::list_item(vec![Node::paragraph("")]).is_empty_list_item());
        assert!(!Node::list_item(vec![Node::paragraph("x")]).is_empty_list_item());
        assert!(!Node::paragraph("").is_empty_list_item());
    }

    #[test]
    fn failed_transaction_leaves_document_untouched() {
        let mut doc = sample();
        let before = doc.clone();
        let tr = Transaction::new()
            .replace(vec![0], vec![Node::paragraph("changed")])
            .replace(vec![9], vec![]);
        assert!(matches!(
            doc.apply(&tr),
            Err(EditorError::InvalidPath { .. })
        ));
        assert_eq!(doc, before);
    }

    #[test]
    fn selection_must_land_in_textblock() {
        let mut doc = sample();
        let tr = Transaction::new()
            .replace(vec![0], vec![Node::paragraph("changed")])
            .select(Selection::cursor(vec![1], 0));
        assert!(matches!(
            doc.apply(&tr),
            Err(EditorError::InvalidSelection { .. })
        ));
        assert_eq!(doc, sample());

        let tr = Transaction::new().select(Selection::range(vec![0], 0, 999));
        assert!(matches!(
            doc.apply(&tr),
            Err(EditorError::InvalidSelection { .. })
        ));
        assert_eq!(doc, sample());
    }

    #[test]
    fn replace_and_insert_steps() {
        let mut doc = sample();
        let tr = Transaction::new()
            .replace(vec![2], vec![])
            .insert(vec![0], Node::paragraph("lead"));
        doc.apply(&tr).unwrap();
        assert_eq!(doc.blocks().len(), 3);
        assert_eq!(doc.node(&[0]).and_then(Node::text), Some("lead"));
        assert!(doc.chunks().iter().all(|(path, _)| path[0] == 2));
    }

    #[test]
    fn root_cannot_be_replaced() {
        let mut doc = sample();
        let tr = Transaction::new().replace(vec![], vec![]);
        assert!(matches!(doc.apply(&tr), Err(EditorError::RootReplacement)));
    }

    #[test]
    fn selection_offsets() {
        let sel = Selection::range(vec![0], 5, 2);
        assert!(!sel.is_empty());
        assert_eq!((sel.from(), sel.to()), (2, 5));
        assert!(Selection::cursor(vec![0], 3).is_empty());
    }
}
