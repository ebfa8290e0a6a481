//! Chunk text model: the split between a chunk's `{meta}` header line and its code.
//!
//! A chunk node stores its whole text content as one string, header first:
//!
//! ```text
//! {r echo=FALSE}
//! plot(cars)
//! ```
//!
//! [`parse_chunk`] recovers the two halves on demand. It never fails loudly:
//! content without a header line yields `None`, which callers treat as
//! "nothing to serialize".

/// Text content of a freshly inserted chunk.
pub const CHUNK_SEED: &str = "{r}\n";

/// A code chunk node as stored in the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkNode {
    /// Full text content: header line, newline, code.
    pub raw_content: String,
    /// Opaque identifier used by external navigation.
    pub navigation_id: Option<String>,
}

impl ChunkNode {
    /// Creates a chunk node from raw text content.
    pub fn new(raw_content: impl Into<String>) -> Self {
        Self {
            raw_content: raw_content.into(),
            navigation_id: None,
        }
    }

    /// Creates the canonical empty chunk (`{r}` header, no code).
    pub fn seed() -> Self {
        Self::new(CHUNK_SEED)
    }

    /// Attaches a navigation identifier.
    pub fn with_navigation_id(mut self, id: impl Into<String>) -> Self {
        self.navigation_id = Some(id.into());
        self
    }

    /// Splits the content into meta and code.
    pub fn parse(&self) -> Option<ParsedChunk<'_>> {
        parse_chunk(&self.raw_content)
    }

    /// Language tag derived from the header line.
    pub fn language(&self) -> Option<&str> {
        crate::lang::extract_language(&self.raw_content)
    }

    /// Length of the content in characters.
    pub fn char_len(&self) -> usize {
        self.raw_content.chars().count()
    }
}

impl Default for ChunkNode {
    fn default() -> Self {
        Self::seed()
    }
}

/// Header/code split of a chunk's content. Borrowed from the node; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedChunk<'a> {
    /// Text between the header braces, exactly as typed.
    pub meta: &'a str,
    /// Everything after the header line, minus one trailing newline.
    pub code: &'a str,
}

impl<'a> ParsedChunk<'a> {
    /// Language tag of the meta (first identifier run).
    pub fn language(&self) -> Option<&'a str> {
        crate::lang::identifier_prefix(self.meta)
    }

    /// Options following the language tag, with separators trimmed.
    ///
    /// `{r, echo=FALSE}` and `{r echo=FALSE}` both yield `echo=FALSE`.
    pub fn options(&self) -> &'a str {
        let rest = match self.language() {
            Some(lang) => &self.meta[lang.len()..],
            None => self.meta,
        };
        rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace())
            .trim_end()
    }

    /// Value of a `key=value` option, if set.
    ///
    /// Options may be separated by commas or spaces, and whitespace around
    /// `=` is ignored. Quoted values containing separators are not supported.
    pub fn option(&self, key: &str) -> Option<String> {
        let normalized = self
            .options()
            .split('=')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("=");
        normalized
            .split([',', ' ', '\t'])
            .filter_map(|token| token.split_once('='))
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.to_string())
    }
}

/// Splits raw chunk content into its `{meta}` header and code.
///
/// The first line must start with `{`, end with `}` (trailing spaces allowed)
/// and be terminated by a newline. Returns `None` otherwise.
pub fn parse_chunk(content: &str) -> Option<ParsedChunk<'_>> {
    let newline = content.find('\n')?;
    let header = content[..newline].trim_end_matches([' ', '\t', '\r']);
    let meta = header.strip_prefix('{')?.strip_suffix('}')?;

    let rest = &content[newline + 1..];
    let code = rest.strip_suffix('\n').unwrap_or(rest);

    Some(ParsedChunk { meta, code })
}

/// Joins meta and code back into raw node content.
pub fn join_chunk(meta: &str, code: &str) -> String {
    let mut content = String::with_capacity(meta.len() + code.len() + 3);
    content.push('{');
    content.push_str(meta);
    content.push_str("}\n");
    content.push_str(code);
    content
}
