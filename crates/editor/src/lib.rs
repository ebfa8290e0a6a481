#![deny(missing_docs)]
//! rmdchunk editor: chunk nodes inside a structured document, with markdown
//! parsing and writing, placement rules, commands and the DOM contract.

/// Chunk commands and the executor capability.
pub mod commands;
/// Document mutation context and the in-memory editor.
pub mod context;
/// Document tree, nodes and selections.
pub mod document;
/// DOM form of chunk nodes.
pub mod dom;
/// Editor error type.
pub mod error;
/// Chunk extension descriptor.
pub mod extension;
/// Extension options and code view configuration.
pub mod options;
/// Markdown to document parsing.
pub mod parse;
/// Chunk placement policy.
pub mod placement;
/// Atomic document transactions.
pub mod transaction;
/// Document to markdown writing.
pub mod writer;

pub use commands::{
    ChunkCommands, ChunkExecutor, EditorCommandId, ExecutableChunk, INSERT_CHUNK_KEY,
    current_chunk, previous_chunks,
};
pub use context::{DocumentContext, Editor};
pub use document::{Document, Node, NodeKind, Selection};
pub use dom::{chunk_to_html, chunks_from_html, is_chunk_element};
pub use error::EditorError;
pub use extension::{ChunkExtension, DomParseRule, NODE_NAME};
pub use options::{CodeViewConfig, ExtensionOptions};
pub use parse::{
    DocumentTransform, ParseOptions, ParsedDocument, ParserPipeline, TextTransform,
    parse_document,
};
pub use placement::{
    InsertionTarget, can_insert, insert_chunk, insert_chunk_transaction, resolve_target,
};
pub use transaction::{Step, Transaction};
pub use writer::write_markdown;
