//! Where a new chunk may go, and the transaction that puts it there.
//!
//! A chunk is legal at the top level of the body, inside a list item or
//! inside a block quote, and never anywhere below a table. When the cursor
//! sits in an empty paragraph right after a list whose nearest item is empty,
//! the chunk fills that item instead of adding a block after the list.

use rmdchunk_core::ChunkNode;

use crate::context::DocumentContext;
use crate::document::{Document, Node, NodeKind, Selection};
use crate::error::EditorError;
use crate::transaction::Transaction;

/// Resolved insertion target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertionTarget {
    /// The chunk replaces the selection in the textblock at `path`.
    ReplaceSelection {
        /// Path of the selected textblock.
        path: Vec<usize>,
    },
    /// The chunk becomes the content of the empty list item at `item`,
    /// and the empty paragraph holding the cursor is removed.
    MergeIntoListItem {
        /// Path of the empty list item.
        item: Vec<usize>,
        /// Path of the cursor paragraph.
        cursor: Vec<usize>,
    },
}

/// Whether a chunk may be inserted at `selection`.
pub fn can_insert(document: &Document, selection: &Selection) -> bool {
    resolve_target(document, selection).is_some()
}

/// Decides where a chunk inserted at `selection` goes, or `None` if it can't go anywhere.
pub fn resolve_target(document: &Document, selection: &Selection) -> Option<InsertionTarget> {
    let path = &selection.path;
    let block = document.node(path)?;
    if !block.is_textblock() {
        return None;
    }

    let ancestors = document.ancestors(path);
    if ancestors
        .iter()
        .any(|node| matches!(node.kind, NodeKind::Table | NodeKind::TableRow))
    {
        log::debug!("chunk insertion refused inside a table at {:?}", path);
        return None;
    }

    let contained = path.len() == 1
        || ancestors
            .iter()
            .any(|node| matches!(node.kind, NodeKind::ListItem { .. } | NodeKind::BlockQuote));
    if !contained {
        log::debug!("chunk insertion refused outside body, list or quote at {:?}", path);
        return None;
    }

    if let Some(item) = preceding_empty_list_item(document, selection) {
        log::debug!("merging chunk into empty list item at {:?}", item);
        return Some(InsertionTarget::MergeIntoListItem {
            item,
            cursor: path.clone(),
        });
    }

    Some(InsertionTarget::ReplaceSelection { path: path.clone() })
}

/// The nearest list item before an empty cursor paragraph, if that item is empty.
///
/// Only the last item of the preceding list is considered, following trailing
/// nested lists down to their own last item.
fn preceding_empty_list_item(document: &Document, selection: &Selection) -> Option<Vec<usize>> {
    if !selection.is_empty() {
        return None;
    }
    let block = document.node(&selection.path)?;
    if !matches!(&block.kind, NodeKind::Paragraph { text } if text.is_empty()) {
        return None;
    }

    let (&index, parent) = selection.path.split_last()?;
    let mut path = parent.to_vec();
    path.push(index.checked_sub(1)?);
    let mut list = document.node(&path)?;
    if !matches!(list.kind, NodeKind::List { .. }) {
        return None;
    }

    loop {
        let last = list.children.len().checked_sub(1)?;
        let item = &list.children[last];
        path.push(last);
        match item.children.last() {
            Some(nested) if matches!(nested.kind, NodeKind::List { .. }) => {
                path.push(item.children.len() - 1);
                list = nested;
            }
            _ => return item.is_empty_list_item().then_some(path),
        }
    }
}

/// Builds the single transaction inserting `chunk` at `selection`.
///
/// The cursor ends up right after the chunk's header line. Returns `None`
/// when insertion is not legal there.
pub fn insert_chunk_transaction(
    document: &Document,
    selection: &Selection,
    chunk: ChunkNode,
) -> Option<Transaction> {
    let target = resolve_target(document, selection)?;
    let offset = header_end(&chunk);

    let transaction = match target {
        InsertionTarget::MergeIntoListItem { item, cursor } => {
            let checked = match document.node(&item)?.kind {
                NodeKind::ListItem { checked } => checked,
                _ => None,
            };
            let filled = Node::container(NodeKind::ListItem { checked }, vec![Node::chunk(chunk)]);
            let mut chunk_path = item.clone();
            chunk_path.push(0);
            // The item precedes the cursor paragraph, so deleting the
            // paragraph first leaves the item path intact.
            Transaction::new()
                .delete(cursor)
                .replace(item, vec![filled])
                .select(Selection::cursor(chunk_path, offset))
        }
        InsertionTarget::ReplaceSelection { path } => {
            let block = document.node(&path)?;
            let mut chunk_path = path.clone();
            match split_textblock(block, selection) {
                Some((before, after)) => {
                    let mut nodes = Vec::with_capacity(3);
                    if let Some(before) = before {
                        nodes.push(before);
                        if let Some(last) = chunk_path.last_mut() {
                            *last += 1;
                        }
                    }
                    nodes.push(Node::chunk(chunk));
                    nodes.extend(after);
                    Transaction::new()
                        .replace(path, nodes)
                        .select(Selection::cursor(chunk_path, offset))
                }
                None => {
                    // Code blocks, chunks: the new chunk follows the block.
                    if let Some(last) = chunk_path.last_mut() {
                        *last += 1;
                    }
                    Transaction::new()
                        .insert(chunk_path.clone(), Node::chunk(chunk))
                        .select(Selection::cursor(chunk_path, offset))
                }
            }
        }
    };
    Some(transaction)
}

/// Inserts a chunk at the context's selection. Returns `false` (and changes
/// nothing) when insertion is not legal there.
pub fn insert_chunk(
    context: &mut impl DocumentContext,
    chunk: ChunkNode,
) -> Result<bool, EditorError> {
    match insert_chunk_transaction(context.document(), context.selection(), chunk) {
        Some(transaction) => {
            context.dispatch(transaction)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Cursor offset just after the header line, or the content end when there
/// is no newline.
fn header_end(chunk: &ChunkNode) -> usize {
    match chunk.raw_content.find('\n') {
        Some(newline) => chunk.raw_content[..=newline].chars().count(),
        None => chunk.char_len(),
    }
}

/// Splits a paragraph or heading around the selection, dropping the selected
/// text. Empty halves are omitted. `None` for blocks that can't be split.
fn split_textblock(block: &Node, selection: &Selection) -> Option<(Option<Node>, Option<Node>)> {
    let text = match &block.kind {
        NodeKind::Paragraph { text } | NodeKind::Heading { text, .. } => text,
        _ => return None,
    };
    let from = char_to_byte(text, selection.from());
    let to = char_to_byte(text, selection.to());
    let rebuild = |piece: &str| -> Option<Node> {
        if piece.is_empty() {
            return None;
        }
        Some(match block.kind {
            NodeKind::Heading { depth, .. } => Node::heading(depth, piece),
            _ => Node::paragraph(piece),
        })
    };
    Some((rebuild(&text[..from]), rebuild(&text[to..])))
}

fn char_to_byte(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map_or(text.len(), |(byte, _)| byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> ChunkNode {
        ChunkNode::seed()
    }

    #[test]
    fn top_level_paragraph_is_legal() {
        let doc = Document::new(vec![Node::paragraph("")]);
        let sel = Selection::cursor(vec![0], 0);
        assert_eq!(
            resolve_target(&doc, &sel),
            Some(InsertionTarget::ReplaceSelection { path: vec![0] })
        );
    }

    #[test]
    fn tables_are_never_legal() {
        let doc = Document::new(vec![
            Node::table([["a"]]),
            Node::blockquote(vec![Node::table([["b"]])]),
            Node::bullet_list(vec![Node::list_item(vec![Node::table([["c"]])])]),
        ]);
        for path in [vec![0, 0, 0], vec![1, 0, 0, 0], vec![2, 0, 0, 0, 0]] {
            assert!(doc.node(&path).is_some(), "{path:?}");
            assert!(!can_insert(&doc, &Selection::cursor(path, 0)));
        }
    }

    #[test]
    fn list_items_and_quotes_are_legal() {
        let doc = Document::new(vec![
            Node::bullet_list(vec![Node::list_item(vec![Node::paragraph("x")])]),
            Node::blockquote(vec![Node::paragraph("y")]),
        ]);
        assert!(can_insert(&doc, &Selection::cursor(vec![0, 0, 0], 1)));
        assert!(can_insert(&doc, &Selection::cursor(vec![1, 0], 0)));
    }

    #[test]
    fn non_textblocks_are_not_legal() {
        let doc = Document::new(vec![Node::blockquote(vec![Node::paragraph("y")])]);
        assert!(!can_insert(&doc, &Selection::cursor(vec![0], 0)));
        assert!(!can_insert(&doc, &Selection::cursor(vec![5], 0)));
    }

    #[test]
    fn splits_paragraph_and_places_cursor_after_header() {
        let doc = Document::new(vec![Node::paragraph("before after")]);
        let sel = Selection::range(vec![0], 6, 7);
        let tr = insert_chunk_transaction(&doc, &sel, seed()).unwrap();
        let mut doc = doc;
        doc.apply(&tr).unwrap();
        assert_eq!(
            doc.blocks(),
            &[
                Node::paragraph("before"),
                Node::chunk(seed()),
                Node::paragraph("after"),
            ]
        );
        assert_eq!(tr.selection(), Some(&Selection::cursor(vec![1], 4)));
    }

    #[test]
    fn heading_halves_stay_headings() {
        let doc = Document::new(vec![Node::heading(2, "ab")]);
        let tr = insert_chunk_transaction(&doc, &Selection::cursor(vec![0], 1), seed()).unwrap();
        let mut doc = doc;
        doc.apply(&tr).unwrap();
        assert_eq!(
            doc.blocks(),
            &[Node::heading(2, "a"), Node::chunk(seed()), Node::heading(2, "b")]
        );
    }

    #[test]
    fn chunk_follows_code_blocks() {
        let doc = Document::new(vec![Node::chunk(ChunkNode::new("{r}\nx"))]);
        let tr = insert_chunk_transaction(&doc, &Selection::cursor(vec![0], 2), seed()).unwrap();
        let mut doc = doc;
        doc.apply(&tr).unwrap();
        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(tr.selection(), Some(&Selection::cursor(vec![1], 4)));
    }

    #[test]
    fn cursor_offset_counts_characters() {
        let chunk = ChunkNode::new("{r label='é'}\ncode");
        assert_eq!(header_end(&chunk), 14);
        assert_eq!(header_end(&ChunkNode::new("{r}")), 3);
    }
}
