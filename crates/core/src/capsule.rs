//! Capsule extraction: shielding fenced chunks from generic block parsing.
//!
//! Before the structural parser sees the document, every fenced chunk is cut
//! out of the source and replaced by a single placeholder line. The parser
//! then treats the placeholder as an ordinary one-line paragraph, and a later
//! pass swaps each such paragraph for a [`ChunkNode`]. Chunk code may contain
//! lines that look like headings, list markers or HTML; none of it is ever
//! seen by the block parser.
//!
//! Placeholders keep the container prefix of the opening fence (list
//! indentation, `> ` markers) and are surrounded by blank container lines, so
//! they land in the same container the chunk came from and never merge into a
//! neighbouring paragraph. Leading front matter is passed through untouched.

use std::borrow::Cow;

use crate::chunk::{ChunkNode, join_chunk};
use crate::code_fence::{
    FenceLine, FenceState, advance_fence_state, chunk_header, split_container_prefix,
};
use crate::error::{ChunkError, ParseDiagnostics, ParseWarning, SourceLocation};

const TOKEN_STEM: &str = "RMDCHUNKCAPSULE";

/// A fenced chunk cut out of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capsule {
    /// Index of the capsule, in source order.
    pub id: usize,
    /// Container prefix of the opening fence line.
    pub prefix: String,
    /// Original fenced text, exactly as it appeared in the source.
    pub fenced: String,
    /// Raw node content: header line plus code, fences and prefixes stripped.
    pub raw_content: String,
}

impl Capsule {
    /// Builds the chunk node this capsule stands for.
    pub fn to_node(&self) -> ChunkNode {
        ChunkNode::new(self.raw_content.clone())
    }

    /// Fenced text with the container prefix removed from every line and no
    /// trailing newline.
    pub fn unprefixed(&self) -> String {
        self.fenced
            .lines()
            .map(|line| strip_prefix(line, &self.prefix))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Placeholder → capsule mapping produced by [`extract_capsules`].
#[derive(Debug, Clone, Default)]
pub struct CapsuleMap {
    stem: String,
    capsules: Vec<Capsule>,
}

impl CapsuleMap {
    /// Placeholder token for a capsule id.
    pub fn placeholder(&self, id: usize) -> String {
        format!("{}ID{}END", self.stem, id)
    }

    /// Returns the capsule id if `text` (ignoring surrounding whitespace) is a placeholder.
    pub fn placeholder_id(&self, text: &str) -> Option<usize> {
        if self.capsules.is_empty() {
            return None;
        }
        let id = text
            .trim()
            .strip_prefix(self.stem.as_str())?
            .strip_prefix("ID")?
            .strip_suffix("END")?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        id.parse().ok()
    }

    /// Looks up a capsule by id.
    pub fn get(&self, id: usize) -> Result<&Capsule, ChunkError> {
        self.capsules
            .get(id)
            .ok_or(ChunkError::UnresolvedCapsule { id })
    }

    /// Resolves placeholder text into the chunk node it stands for.
    ///
    /// Returns `Ok(None)` when `text` is not a placeholder.
    pub fn resolve(&self, text: &str) -> Result<Option<ChunkNode>, ChunkError> {
        match self.placeholder_id(text) {
            Some(id) => self.get(id).map(|capsule| Some(capsule.to_node())),
            None => Ok(None),
        }
    }

    /// Puts original fenced text back wherever a placeholder occurs in `text`.
    ///
    /// Used for placeholders that ended up somewhere a chunk node can't go,
    /// such as inside an indented code block. `text` is expected to have had
    /// the container prefix removed already, so the fenced lines are restored
    /// without it, and the blank lines padding the placeholder are dropped.
    pub fn restore<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.capsules.is_empty() || !text.contains(self.stem.as_str()) {
            return Cow::Borrowed(text);
        }
        let mut restored = text.to_string();
        for capsule in &self.capsules {
            let token = self.placeholder(capsule.id);
            if !restored.contains(&token) {
                continue;
            }
            let original = capsule.unprefixed();
            for (padded, replacement) in [
                (format!("\n\n{token}\n\n"), format!("\n{original}\n")),
                (format!("\n\n{token}"), format!("\n{original}")),
                (format!("{token}\n\n"), format!("{original}\n")),
                (token.clone(), original.clone()),
            ] {
                restored = restored.replace(&padded, &replacement);
            }
        }
        Cow::Owned(restored)
    }

    /// Number of capsules.
    pub fn len(&self) -> usize {
        self.capsules.len()
    }

    /// Whether no chunk was extracted.
    pub fn is_empty(&self) -> bool {
        self.capsules.is_empty()
    }

    /// Capsules in source order.
    pub fn iter(&self) -> impl Iterator<Item = &Capsule> {
        self.capsules.iter()
    }
}

/// Result of running the capsule filter over a document.
#[derive(Debug, Clone)]
pub struct CapsuleExtraction {
    /// Source with every fenced chunk replaced by a placeholder line.
    pub source: String,
    /// Mapping used to resolve placeholders after block parsing.
    pub capsules: CapsuleMap,
    /// Unclosed chunk fences, which are left in place.
    pub diagnostics: ParseDiagnostics,
}

struct PendingCapsule {
    prefix: String,
    header: String,
    code: Vec<String>,
    fenced: String,
    line: usize,
}

/// Replaces every fenced chunk in `source` with a placeholder line.
pub fn extract_capsules(source: &str) -> CapsuleExtraction {
    let mut map = CapsuleMap {
        stem: unique_stem(source),
        capsules: Vec::new(),
    };
    let mut diagnostics = ParseDiagnostics::new();
    let mut output = String::with_capacity(source.len());
    let mut fence_state = FenceState::default();
    let mut pending: Option<PendingCapsule> = None;

    let skipped = front_matter_lines(source);
    for (index, raw_line) in source.split_inclusive('\n').enumerate() {
        if index < skipped {
            output.push_str(raw_line);
            continue;
        }
        let line = raw_line.trim_end_matches(['\n', '\r']);
        let outcome = advance_fence_state(line, fence_state);
        fence_state = outcome.next_state;

        match (outcome.line, pending.is_some()) {
            (FenceLine::Opening, false) if outcome.next_state.chunk => {
                let (prefix, body) = split_container_prefix(line);
                let header = chunk_header(body).unwrap_or("{}");
                pending = Some(PendingCapsule {
                    prefix: prefix.to_string(),
                    header: header.to_string(),
                    code: Vec::new(),
                    fenced: raw_line.to_string(),
                    line: index + 1,
                });
            }
            (FenceLine::Content, true) => {
                if let Some(capsule) = pending.as_mut() {
                    capsule
                        .code
                        .push(strip_prefix(line, &capsule.prefix).to_string());
                    capsule.fenced.push_str(raw_line);
                }
            }
            (FenceLine::Closing, true) => {
                if let Some(mut capsule) = pending.take() {
                    capsule.fenced.push_str(raw_line);
                    let id = map.capsules.len();
                    let blank = capsule.prefix.trim_end();
                    output.push_str(blank);
                    output.push('\n');
                    output.push_str(&capsule.prefix);
                    output.push_str(&map.placeholder(id));
                    output.push('\n');
                    output.push_str(blank);
                    output.push('\n');

                    let meta = &capsule.header[1..capsule.header.len() - 1];
                    map.capsules.push(Capsule {
                        id,
                        prefix: capsule.prefix,
                        fenced: capsule.fenced,
                        raw_content: join_chunk(meta, &capsule.code.join("\n")),
                    });
                }
            }
            _ => output.push_str(raw_line),
        }
    }

    if let Some(capsule) = pending {
        diagnostics.add_warning(ParseWarning::UnclosedChunkFence {
            location: SourceLocation::new(capsule.line, capsule.prefix.chars().count() + 1),
            context: format!("```{}", capsule.header),
        });
        output.push_str(&capsule.fenced);
    }

    CapsuleExtraction {
        source: output,
        capsules: map,
        diagnostics,
    }
}

/// Number of lines taken by a leading `---` or `+++` front matter block,
/// closing delimiter included. Zero when the block is missing or unclosed.
fn front_matter_lines(source: &str) -> usize {
    let mut lines = source.lines();
    let Some(delimiter) = lines.next().map(str::trim_end) else {
        return 0;
    };
    if delimiter != "---" && delimiter != "+++" {
        return 0;
    }
    lines
        .position(|line| line.trim_end() == delimiter)
        .map_or(0, |closing| closing + 2)
}

/// Picks a placeholder stem that does not occur anywhere in `source`.
fn unique_stem(source: &str) -> String {
    if !source.contains(TOKEN_STEM) {
        return TOKEN_STEM.to_string();
    }
    (1usize..)
        .map(|salt| format!("{TOKEN_STEM}{salt}X"))
        .find(|stem| !source.contains(stem.as_str()))
        .unwrap_or_else(|| TOKEN_STEM.to_string())
}

/// Removes the opening fence's container prefix from a content line.
fn strip_prefix<'a>(line: &'a str, prefix: &str) -> &'a str {
    if let Some(rest) = line.strip_prefix(prefix) {
        return rest;
    }
    // Blank block quote lines lose their trailing space (`>` for `> `).
    let bare = prefix.trim_end();
    if !bare.is_empty()
        && let Some(rest) = line.strip_prefix(bare)
    {
        return rest.strip_prefix(' ').unwrap_or(rest);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_chunk_with_placeholder() {
        let extraction = extract_capsules("Intro\n\n```{r}\n1 + 1\n```\n\nOutro\n");
        assert_eq!(extraction.capsules.len(), 1);
        assert_eq!(
            extraction.source,
            "Intro\n\n\nRMDCHUNKCAPSULEID0END\n\n\nOutro\n"
        );
        let capsule = extraction.capsules.get(0).unwrap();
        assert_eq!(capsule.raw_content, "{r}\n1 + 1");
        assert_eq!(capsule.fenced, "```{r}\n1 + 1\n```\n");
    }

    #[test]
    fn two_adjacent_chunks_keep_order() {
        let source = "# Title\n\nSome prose.\n```{r}\na <- 1\n```\n```{python}\nb = 2\n```\nMore prose.\n";
        let extraction = extract_capsules(source);
        let map = &extraction.capsules;
        assert_eq!(map.len(), 2);

        let contents: Vec<_> = map.iter().map(|c| c.raw_content.as_str()).collect();
        assert_eq!(contents, vec!["{r}\na <- 1", "{python}\nb = 2"]);

        let out = &extraction.source;
        let title = out.find("# Title").unwrap();
        let prose = out.find("Some prose.").unwrap();
        let first = out.find(&map.placeholder(0)).unwrap();
        let second = out.find(&map.placeholder(1)).unwrap();
        let more = out.find("More prose.").unwrap();
        assert!(title < prose && prose < first && first < second && second < more);
        assert!(!out.contains("a <- 1"));
    }

    #[test]
    fn chunk_code_is_opaque() {
        let source = "```{r}\n# not a heading\n- not a list\n<div>\n```\n";
        let extraction = extract_capsules(source);
        assert!(!extraction.source.contains("# not a heading"));
        assert_eq!(
            extraction.capsules.get(0).unwrap().raw_content,
            "{r}\n# not a heading\n- not a list\n<div>"
        );
    }

    #[test]
    fn empty_chunk_resolves_to_seed() {
        let extraction = extract_capsules("```{r}\n```\n");
        let node = extraction
            .capsules
            .resolve(&extraction.capsules.placeholder(0))
            .unwrap()
            .unwrap();
        assert_eq!(node, ChunkNode::seed());
    }

    #[test]
    fn plain_code_fences_are_left_alone() {
        let source = "```r\nx\n```\n\n~~~{r}\ny\n~~~\n";
        let extraction = extract_capsules(source);
        assert!(extraction.capsules.is_empty());
        assert_eq!(extraction.source, source);
    }

    #[test]
    fn chunk_example_inside_longer_fence_is_not_extracted() {
        let source = "````markdown\n```{r}\n1\n```\n````\n";
        let extraction = extract_capsules(source);
        assert!(extraction.capsules.is_empty());
        assert_eq!(extraction.source, source);
    }

    #[test]
    fn keeps_blockquote_prefix() {
        let extraction = extract_capsules("> Quote\n> ```{r}\n> x\n>\n> y\n> ```\n");
        let capsule = extraction.capsules.get(0).unwrap();
        assert_eq!(capsule.prefix, "> ");
        assert_eq!(capsule.raw_content, "{r}\nx\n\ny");
        assert_eq!(
            extraction.source,
            "> Quote\n>\n> RMDCHUNKCAPSULEID0END\n>\n"
        );
    }

    #[test]
    fn keeps_list_indentation() {
        let extraction = extract_capsules("- item\n\n  ```{r}\n  x\n  ```\n");
        let capsule = extraction.capsules.get(0).unwrap();
        assert_eq!(capsule.prefix, "  ");
        assert_eq!(capsule.raw_content, "{r}\nx");
        assert!(extraction.source.contains("\n  RMDCHUNKCAPSULEID0END\n"));
    }

    #[test]
    fn unclosed_chunk_is_left_as_text_with_warning() {
        let source = "text\n```{r}\nx\n";
        let extraction = extract_capsules(source);
        assert!(extraction.capsules.is_empty());
        assert_eq!(extraction.source, source);
        assert_eq!(
            extraction.diagnostics.warnings,
            vec![ParseWarning::UnclosedChunkFence {
                location: SourceLocation::new(2, 1),
                context: "```{r}".to_string(),
            }]
        );
    }

    #[test]
    fn placeholder_stem_avoids_collisions() {
        let source = "RMDCHUNKCAPSULE mentioned\n\n```{r}\nx\n```\n";
        let extraction = extract_capsules(source);
        let token = extraction.capsules.placeholder(0);
        assert_eq!(token, "RMDCHUNKCAPSULE1XID0END");
        assert_eq!(extraction.capsules.placeholder_id("RMDCHUNKCAPSULE mentioned"), None);
        assert_eq!(extraction.capsules.placeholder_id(&token), Some(0));
    }

    #[test]
    fn resolve_reports_unknown_ids() {
        let extraction = extract_capsules("```{r}\nx\n```\n");
        let map = &extraction.capsules;
        assert!(matches!(
            map.resolve("RMDCHUNKCAPSULEID7END"),
            Err(ChunkError::UnresolvedCapsule { id: 7 })
        ));
        assert_eq!(map.resolve("ordinary text").unwrap(), None);
    }

    #[test]
    fn restore_puts_fenced_text_back() {
        let source = "```{r}\nx\n```\n";
        let extraction = extract_capsules(source);
        let map = &extraction.capsules;
        let text = format!("see {}", map.placeholder(0));
        assert_eq!(map.restore(&text), "see ```{r}\nx\n```");
        assert_eq!(map.restore("untouched"), Cow::Borrowed("untouched"));
    }

    #[test]
    fn restore_drops_prefix_and_padding() {
        let extraction = extract_capsules("Para\n\n    some code\n    ```{r}\n    x\n    ```\n");
        let map = &extraction.capsules;
        assert_eq!(map.get(0).unwrap().unprefixed(), "```{r}\nx\n```");

        let token = map.placeholder(0);
        let code = format!("some code\n\n{token}");
        assert_eq!(map.restore(&code), "some code\n```{r}\nx\n```");
        let code = format!("before\n\n{token}\n\nafter");
        assert_eq!(map.restore(&code), "before\n```{r}\nx\n```\nafter");
    }

    #[test]
    fn front_matter_is_passed_through() {
        let source = "---\nabstract: |\n  ```{r}\n  x\n  ```\n---\n\n```{r}\ny\n```\n";
        let extraction = extract_capsules(source);
        assert_eq!(extraction.capsules.len(), 1);
        assert_eq!(extraction.capsules.get(0).unwrap().raw_content, "{r}\ny");
        assert!(extraction.source.starts_with("---\nabstract: |\n  ```{r}\n  x\n  ```\n---\n"));
    }

    #[test]
    fn unclosed_front_matter_is_ordinary_text() {
        let extraction = extract_capsules("---\n```{r}\nx\n```\n");
        assert_eq!(extraction.capsules.len(), 1);
        assert_eq!(front_matter_lines("+++\na = 1\n+++\nbody\n"), 3);
        assert_eq!(front_matter_lines("text\n---\n"), 0);
    }

    #[test]
    fn crlf_sources_are_handled() {
        let extraction = extract_capsules("```{r}\r\nx\r\n```\r\nafter\r\n");
        assert_eq!(extraction.capsules.get(0).unwrap().raw_content, "{r}\nx");
        assert!(extraction.source.ends_with("after\r\n"));
    }
}
