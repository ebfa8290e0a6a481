//! Document mutation context used by placement and commands.

use crate::document::{Document, Selection};
use crate::error::EditorError;
use crate::transaction::Transaction;

/// What chunk commands need from a host editor: read the document and
/// selection, and apply one atomic transaction.
pub trait DocumentContext {
    /// Current document.
    fn document(&self) -> &Document;

    /// Current selection.
    fn selection(&self) -> &Selection;

    /// Applies a transaction atomically, updating the selection when the
    /// transaction sets one.
    fn dispatch(&mut self, transaction: Transaction) -> Result<(), EditorError>;
}

/// In-memory editor state: a document plus a selection inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    document: Document,
    selection: Selection,
}

impl Editor {
    /// Creates an editor; the selection must point at a textblock.
    pub fn new(document: Document, selection: Selection) -> Result<Self, EditorError> {
        check_selection(&document, &selection)?;
        Ok(Self {
            document,
            selection,
        })
    }

    /// Moves the selection.
    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EditorError> {
        check_selection(&self.document, &selection)?;
        self.selection = selection;
        Ok(())
    }

    /// Consumes the editor, returning the document.
    pub fn into_document(self) -> Document {
        self.document
    }
}

impl DocumentContext for Editor {
    fn document(&self) -> &Document {
        &self.document
    }

    fn selection(&self) -> &Selection {
        &self.selection
    }

    fn dispatch(&mut self, transaction: Transaction) -> Result<(), EditorError> {
        self.document.apply(&transaction)?;
        if let Some(selection) = transaction.selection() {
            self.selection = selection.clone();
        }
        Ok(())
    }
}

fn check_selection(document: &Document, selection: &Selection) -> Result<(), EditorError> {
    if document.is_valid_selection(selection) {
        Ok(())
    } else {
        Err(EditorError::InvalidSelection {
            path: selection.path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Node;

    #[test]
    fn rejects_selection_outside_textblocks() {
        let doc = Document::new(vec![Node::blockquote(vec![Node::paragraph("q")])]);
        assert!(matches!(
            Editor::new(doc.clone(), Selection::cursor(vec![0], 0)),
            Err(EditorError::InvalidSelection { .. })
        ));
        let mut editor = Editor::new(doc, Selection::cursor(vec![0, 0], 1)).unwrap();
        assert!(editor.set_selection(Selection::cursor(vec![3], 0)).is_err());
        assert_eq!(editor.selection().path, vec![0, 0]);
    }

    #[test]
    fn rejects_offsets_past_the_text() {
        let doc = Document::new(vec![Node::paragraph("héllo")]);
        assert!(matches!(
            Editor::new(doc.clone(), Selection::cursor(vec![0], 999)),
            Err(EditorError::InvalidSelection { .. })
        ));
        let mut editor = Editor::new(doc, Selection::cursor(vec![0], 5)).unwrap();
        assert!(editor.set_selection(Selection::range(vec![0], 2, 6)).is_err());
        assert_eq!(editor.selection(), &Selection::cursor(vec![0], 5));
    }

    #[test]
    fn dispatch_updates_document_and_selection() {
        let doc = Document::new(vec![Node::paragraph("a")]);
        let mut editor = Editor::new(doc, Selection::cursor(vec![0], 0)).unwrap();
        let tr = Transaction::new()
            .insert(vec![1], Node::paragraph("b"))
            .select(Selection::cursor(vec![1], 1));
        editor.dispatch(tr).unwrap();
        assert_eq!(editor.document().blocks().len(), 2);
        assert_eq!(editor.selection(), &Selection::cursor(vec![1], 1));
    }
}
