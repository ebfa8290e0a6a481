#![deny(missing_docs)]
//! rmdchunk core: R Markdown code chunk text model, language tags, and fenced codec.

/// Capsule extraction and resolution for fenced chunks.
pub mod capsule;
/// Chunk header/code split.
pub mod chunk;
/// Code fence detection utilities.
pub mod code_fence;
/// Core error and diagnostic types.
pub mod error;
/// Fenced markdown serialization.
pub mod fenced;
/// Language tag extraction.
pub mod lang;

pub use capsule::{Capsule, CapsuleExtraction, CapsuleMap, extract_capsules};
pub use chunk::{CHUNK_SEED, ChunkNode, ParsedChunk, join_chunk, parse_chunk};
pub use code_fence::{FenceLine, FencePhase, FenceState, LineParseOutcome, advance_fence_state};
pub use error::{ChunkError, ParseDiagnostics, ParseWarning, SourceLocation};
pub use fenced::{serialize_chunk, unfence, write_chunk};
pub use lang::extract_language;
