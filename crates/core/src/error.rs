use thiserror::Error;

/// Source location information for error reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Errors that can occur while parsing documents containing chunks.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// A placeholder referenced a capsule that was never extracted.
    #[error("Unresolved chunk capsule: {id}")]
    UnresolvedCapsule {
        /// Capsule index carried by the placeholder
        id: usize,
    },
    /// markdown-rs parser error surfaced through the adapter.
    #[error("Parse error at {location}: {message}")]
    MarkdownAdapter {
        /// Error message
        message: String,
        /// Source location
        location: SourceLocation,
    },
}

impl ChunkError {
    /// Create a parse error with location
    pub fn parse_error(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::MarkdownAdapter {
            message: message.into(),
            location: SourceLocation::new(line, column),
        }
    }
}

/// Non-fatal warnings that don't prevent parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// Chunk fence opened but never closed; left as ordinary text
    UnclosedChunkFence {
        /// Source location where the fence started
        location: SourceLocation,
        /// Header line of the unclosed chunk
        context: String,
    },
    /// Placeholder found outside block position; original text restored
    OrphanCapsule {
        /// Capsule index
        id: usize,
    },
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseWarning::UnclosedChunkFence { location, context } => {
                write!(f, "Unclosed chunk fence: {}, near '{}'", location, context)
            }
            ParseWarning::OrphanCapsule { id } => {
                write!(f, "Chunk capsule {} was not in block position", id)
            }
        }
    }
}

/// Collection of parse diagnostics
#[derive(Debug, Clone, Default)]
pub struct ParseDiagnostics {
    /// List of non-fatal warnings
    pub warnings: Vec<ParseWarning>,
}

impl ParseDiagnostics {
    /// Create a new empty diagnostics collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the diagnostics collection
    pub fn add_warning(&mut self, warning: ParseWarning) {
        self.warnings.push(warning);
    }

    /// Append all warnings of another collection
    pub fn extend(&mut self, other: ParseDiagnostics) {
        self.warnings.extend(other.warnings);
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
