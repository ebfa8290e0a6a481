//! Extension options and the code view configuration derived from them.

use rmdchunk_core::extract_language;
use serde::{Deserialize, Serialize};

/// Class added to the code view of every chunk.
pub const CHUNK_BACKGROUND_CLASS: &str = "pm-chunk-background-color";

/// Options controlling the chunk extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionOptions {
    /// Enable code chunks at all.
    #[serde(alias = "codeChunks")]
    pub code_chunks: bool,
    /// Show line numbers in chunk code views.
    #[serde(alias = "lineNumbers")]
    pub line_numbers: bool,
    /// Highlight bookdown theorem chunks.
    #[serde(alias = "bookdownTheorems")]
    pub bookdown_theorems: bool,
}

impl Default for ExtensionOptions {
    fn default() -> Self {
        Self {
            code_chunks: true,
            line_numbers: true,
            bookdown_theorems: false,
        }
    }
}

/// How the host code view should present a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeViewConfig {
    /// The first line is the `{meta}` header, not code.
    pub first_line_meta: bool,
    /// Show line numbers.
    pub line_numbers: bool,
    /// Highlight bookdown theorem chunks.
    pub bookdown_theorems: bool,
    /// Extra CSS classes.
    pub classes: Vec<String>,
}

impl CodeViewConfig {
    /// Builds the code view configuration for the given options.
    pub fn new(options: &ExtensionOptions) -> Self {
        Self {
            first_line_meta: true,
            line_numbers: options.line_numbers,
            bookdown_theorems: options.bookdown_theorems,
            classes: vec![CHUNK_BACKGROUND_CLASS.to_string()],
        }
    }

    /// Language used for highlighting a chunk's content.
    pub fn lang<'a>(&self, content: &'a str) -> Option<&'a str> {
        extract_language(content)
    }

    /// Gutter label of a 1-based line. The header line has none and code
    /// lines count from 1.
    pub fn format_line_number(&self, line: usize) -> String {
        if line <= 1 {
            String::new()
        } else {
            (line - 1).to_string()
        }
    }
}

impl Default for CodeViewConfig {
    fn default() -> Self {
        Self::new(&ExtensionOptions::default())
    }
}
