use rmdchunk_core::ChunkError;
use thiserror::Error;

/// Errors raised by document edits, parsing and DOM conversion.
#[derive(Debug, Error)]
pub enum EditorError {
    /// A step addressed a node that does not exist.
    #[error("Invalid node path: {path:?}")]
    InvalidPath {
        /// Offending path
        path: Vec<usize>,
    },
    /// A transaction tried to replace the document root.
    #[error("Cannot replace the document root")]
    RootReplacement,
    /// A transaction selected something other than a textblock.
    #[error("Selection does not point at a textblock: {path:?}")]
    InvalidSelection {
        /// Offending path
        path: Vec<usize>,
    },
    /// Markdown parsing or capsule resolution failed.
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    /// lol_html rejected the HTML input.
    #[error("HTML rewriting failed: {0}")]
    Html(#[from] lol_html::errors::RewritingError),
}
