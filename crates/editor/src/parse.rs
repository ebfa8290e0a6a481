//! Markdown parsing into the document tree, with the chunk capsule filter.
//!
//! Pipeline: text transforms → capsule extraction → markdown-rs mdast →
//! document tree (placeholders resolved into chunk nodes) → document
//! transforms.

use std::borrow::Cow;

use markdown::mdast::Node as MdNode;
use markdown::message::{Message, Place};
use rmdchunk_core::code_fence::chunk_header;
use rmdchunk_core::{
    CapsuleMap, ChunkError, ChunkNode, ParseDiagnostics, ParseWarning, SourceLocation,
    extract_capsules, join_chunk,
};

use crate::document::{Document, Node, NodeKind};
use crate::error::EditorError;

/// Parser options for building markdown-rs parse options.
#[derive(Clone, Copy, Debug)]
pub struct ParseOptions {
    /// Enable GitHub Flavored Markdown constructs (tables, task lists).
    pub gfm: bool,
    /// Enable YAML frontmatter parsing.
    pub frontmatter: bool,
    /// Keep raw HTML blocks as HTML nodes.
    pub raw_html: bool,
    /// Shield fenced chunks from block parsing with capsules.
    pub capsules: bool,
}

impl ParseOptions {
    /// R Markdown defaults.
    pub const fn rmarkdown() -> Self {
        Self {
            gfm: true,
            frontmatter: true,
            raw_html: false,
            capsules: true,
        }
    }

    /// Convert to markdown-rs `ParseOptions`.
    pub fn to_markdown(self) -> markdown::ParseOptions {
        let mut constructs = markdown::Constructs {
            frontmatter: self.frontmatter,
            html_flow: self.raw_html,
            html_text: self.raw_html,
            ..Default::default()
        };

        if self.gfm {
            constructs.gfm_strikethrough = true;
            constructs.gfm_table = true;
            constructs.gfm_task_list_item = true;
        }

        markdown::ParseOptions {
            constructs,
            ..markdown::ParseOptions::default()
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::rmarkdown()
    }
}

/// Trait for preprocessing raw markdown text before parsing.
pub trait TextTransform {
    /// Transform the input markdown text, returning an owned or borrowed string.
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str>;
}

impl<F> TextTransform for F
where
    F: for<'a> Fn(&'a str) -> Cow<'a, str>,
{
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        (self)(input)
    }
}

/// Trait for mutating the document tree after parsing.
pub trait DocumentTransform {
    /// Mutate the parsed document in place.
    fn transform(&self, document: &mut Document);
}

impl<F> DocumentTransform for F
where
    F: Fn(&mut Document),
{
    fn transform(&self, document: &mut Document) {
        (self)(document)
    }
}

/// A parsed document plus the non-fatal problems found on the way.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Document tree.
    pub document: Document,
    /// Warnings (unclosed chunk fences, orphan capsules).
    pub diagnostics: ParseDiagnostics,
}

/// Configurable parsing pipeline with optional transforms.
pub struct ParserPipeline {
    options: ParseOptions,
    text_transforms: Vec<Box<dyn TextTransform>>,
    document_transforms: Vec<Box<dyn DocumentTransform>>,
}

impl ParserPipeline {
    /// Create a new pipeline.
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            text_transforms: Vec::new(),
            document_transforms: Vec::new(),
        }
    }

    /// Add a text preprocessor transform (runs before capsule extraction).
    pub fn add_text_transform<T: TextTransform + 'static>(&mut self, transform: T) {
        self.text_transforms.push(Box::new(transform));
    }

    /// Add a document transform.
    pub fn add_document_transform<T: DocumentTransform + 'static>(&mut self, transform: T) {
        self.document_transforms.push(Box::new(transform));
    }

    /// Parse markdown into a document using the configured pipeline.
    pub fn parse(&self, input: &str) -> Result<ParsedDocument, EditorError> {
        let mut current = Cow::Borrowed(input);
        for transform in &self.text_transforms {
            let next = transform.transform(current.as_ref());
            current = Cow::Owned(next.into_owned());
        }

        let mut diagnostics = ParseDiagnostics::new();
        let (source, capsules) = if self.options.capsules {
            let extraction = extract_capsules(&current);
            log::debug!("extracted {} chunk capsules", extraction.capsules.len());
            diagnostics.extend(extraction.diagnostics);
            (Cow::Owned(extraction.source), extraction.capsules)
        } else {
            (current, CapsuleMap::default())
        };

        let root = markdown::to_mdast(&source, &self.options.to_markdown()).map_err(|err| {
            ChunkError::MarkdownAdapter {
                message: err.to_string(),
                location: message_location(&err),
            }
        })?;

        let mut converter = Converter {
            source: &source,
            capsules: &capsules,
            diagnostics: &mut diagnostics,
        };
        let children = match &root {
            MdNode::Root(root) => converter.blocks(&root.children)?,
            other => converter.block(other)?.into_iter().collect(),
        };

        let mut document = Document::new(children);
        for transform in &self.document_transforms {
            transform.transform(&mut document);
        }

        for warning in &diagnostics.warnings {
            log::warn!("{}", warning);
        }

        Ok(ParsedDocument {
            document,
            diagnostics,
        })
    }
}

/// Parse markdown into a document with default transforms.
pub fn parse_document(input: &str, options: &ParseOptions) -> Result<ParsedDocument, EditorError> {
    ParserPipeline::new(*options).parse(input)
}

fn message_location(message: &Message) -> SourceLocation {
    match &message.place {
        Some(place) => match place.as_ref() {
            Place::Point(point) => SourceLocation::new(point.line, point.column),
            Place::Position(position) => {
                SourceLocation::new(position.start.line, position.start.column)
            }
        },
        None => SourceLocation::new(1, 1),
    }
}

/// mdast → document conversion with placeholder resolution.
struct Converter<'a> {
    /// Text handed to markdown-rs; node positions index into it.
    source: &'a str,
    capsules: &'a CapsuleMap,
    diagnostics: &'a mut ParseDiagnostics,
}

impl<'a> Converter<'a> {
    fn blocks(&mut self, nodes: &[MdNode]) -> Result<Vec<Node>, ChunkError> {
        let mut blocks = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(block) = self.block(node)? {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }

    fn block(&mut self, node: &MdNode) -> Result<Option<Node>, ChunkError> {
        let block = match node {
            MdNode::Paragraph(para) => {
                let text = extract_text_from_nodes(&para.children);
                match self.capsules.resolve(&text)? {
                    Some(chunk) => Node::chunk(chunk),
                    None => Node::paragraph(self.restore_orphans(text)),
                }
            }
            MdNode::Heading(heading) => {
                let text = extract_text_from_nodes(&heading.children);
                Node::heading(heading.depth, self.restore_orphans(text))
            }
            MdNode::Code(code) => self.code(code)?,
            MdNode::List(list) => Node::container(
                NodeKind::List {
                    ordered: list.ordered,
                    start: list.start,
                },
                self.blocks(&list.children)?,
            ),
            MdNode::ListItem(item) => Node::container(
                NodeKind::ListItem {
                    checked: item.checked,
                },
                self.blocks(&item.children)?,
            ),
            MdNode::Blockquote(quote) => Node::blockquote(self.blocks(&quote.children)?),
            MdNode::Table(table) => Node::container(NodeKind::Table, self.blocks(&table.children)?),
            MdNode::TableRow(row) => Node::container(NodeKind::TableRow, self.blocks(&row.children)?),
            MdNode::TableCell(cell) => {
                let text = extract_text_from_nodes(&cell.children);
                Node::leaf(NodeKind::TableCell {
                    text: self.restore_orphans(text),
                })
            }
            MdNode::ThematicBreak(_) => Node::leaf(NodeKind::ThematicBreak),
            MdNode::Html(html) => Node::leaf(NodeKind::Html {
                value: self.restore_orphans(html.value.clone()),
            }),
            MdNode::Yaml(yaml) => Node::leaf(NodeKind::Frontmatter {
                yaml: self.restore_orphans(yaml.value.clone()),
            }),
            MdNode::Definition(_) => return Ok(None),
            _ => {
                log::warn!("Unhandled markdown node type: {:?}", node);
                return Ok(None);
            }
        };
        Ok(Some(block))
    }

    /// Code blocks with a `{...}` info string are chunks the capsule filter
    /// could not see (e.g. a fence on the same line as a list marker).
    ///
    /// markdown-rs splits and unescapes the info string, so the header is
    /// read back from the opening fence line itself when possible.
    fn code(&mut self, code: &markdown::mdast::Code) -> Result<Node, ChunkError> {
        let header = match self.opening_header(code) {
            Some(header) => Some(header.to_string()),
            None => {
                let info = match (&code.lang, &code.meta) {
                    (Some(lang), Some(meta)) => format!("{lang} {meta}"),
                    (Some(lang), None) => lang.clone(),
                    _ => String::new(),
                };
                (info.len() >= 2 && info.starts_with('{') && info.ends_with('}')).then_some(info)
            }
        };
        if let Some(header) = header {
            let meta = &header[1..header.len() - 1];
            let body = self.restore_orphans(code.value.clone());
            return Ok(Node::chunk(ChunkNode::new(join_chunk(meta, &body))));
        }
        // A placeholder inside indented code is literal code text.
        Ok(Node::leaf(NodeKind::CodeBlock {
            lang: code.lang.clone(),
            meta: code.meta.clone(),
            code: self.restore_orphans(code.value.clone()),
        }))
    }

    /// `{...}` header on the opening line of a fenced code node.
    fn opening_header(&self, code: &markdown::mdast::Code) -> Option<&'a str> {
        if !code.lang.as_deref().is_some_and(|lang| lang.starts_with('{')) {
            return None;
        }
        let start = code.position.as_ref()?.start.offset;
        let rest = self.source.get(start..)?;
        let line = rest.split('\n').next()?.trim_end_matches('\r');
        let fence = line.find('`')?;
        chunk_header(&line[fence..])
    }

    fn restore_orphans(&mut self, text: String) -> String {
        let orphans: Vec<usize> = self
            .capsules
            .iter()
            .map(|capsule| capsule.id)
            .filter(|id| text.contains(&self.capsules.placeholder(*id)))
            .collect();
        if orphans.is_empty() {
            return text;
        }
        for id in orphans {
            self.diagnostics
                .add_warning(ParseWarning::OrphanCapsule { id });
        }
        self.capsules.restore(&text).into_owned()
    }
}

/// Extracts plain text from a list of inline nodes.
fn extract_text_from_nodes(nodes: &[MdNode]) -> String {
    let mut text = String::new();
    for node in nodes {
        extract_text_from_node(node, &mut text);
    }
    text
}

fn extract_text_from_node(node: &MdNode, buffer: &mut String) {
    match node {
        MdNode::Text(t) => buffer.push_str(&t.value),
        MdNode::InlineCode(code) => buffer.push_str(&code.value),
        MdNode::InlineMath(math) => buffer.push_str(&math.value),
        MdNode::Html(html) => buffer.push_str(&html.value),
        MdNode::Break(_) => buffer.push('\n'),
        MdNode::Image(image) => buffer.push_str(&image.alt),
        MdNode::Strong(strong) => {
            for child in &strong.children {
                extract_text_from_node(child, buffer);
            }
        }
        MdNode::Emphasis(emphasis) => {
            for child in &emphasis.children {
                extract_text_from_node(child, buffer);
            }
        }
        MdNode::Link(link) => {
            for child in &link.children {
                extract_text_from_node(child, buffer);
            }
        }
        MdNode::LinkReference(link) => {
            for child in &link.children {
                extract_text_from_node(child, buffer);
            }
        }
        MdNode::Delete(del) => {
            for child in &del.children {
                extract_text_from_node(child, buffer);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> ParsedDocument {
        parse_document(input, &ParseOptions::default()).expect("markdown should parse")
    }

    fn kinds(nodes: &[Node]) -> Vec<&'static str> {
        nodes.iter().map(|n| n.kind.name()).collect()
    }

    #[test]
    fn top_level_chunk_becomes_node() {
        let parsed = parse("Intro\n\n```{r}\n1 + 1\n```\n\nOutro\n");
        let blocks = parsed.document.blocks();
        assert_eq!(kinds(blocks), vec!["paragraph", "rmd_chunk", "paragraph"]);
        assert_eq!(blocks[1].text(), Some("{r}\n1 + 1"));
        assert!(!parsed.diagnostics.has_warnings());
    }

    #[test]
    fn two_adjacent_chunks_and_prose() {
        let parsed = parse("Before.\n```{r}\na <- 1\n```\n```{python}\n# comment\nb = 2\n```\nAfter.\n");
        let blocks = parsed.document.blocks();
        assert_eq!(
            kinds(blocks),
            vec!["paragraph", "rmd_chunk", "rmd_chunk", "paragraph"]
        );
        assert_eq!(blocks[0].text(), Some("Before."));
        assert_eq!(blocks[1].text(), Some("{r}\na <- 1"));
        assert_eq!(blocks[2].text(), Some("{python}\n# comment\nb = 2"));
        assert_eq!(blocks[3].text(), Some("After."));
    }

    #[test]
    fn chunk_code_is_not_parsed_as_markdown() {
        let parsed = parse("```{r}\n# not a heading\n\n- not a list\n```\n");
        let blocks = parsed.document.blocks();
        assert_eq!(kinds(blocks), vec!["rmd_chunk"]);
        assert_eq!(blocks[0].text(), Some("{r}\n# not a heading\n\n- not a list"));
    }

    #[test]
    fn chunks_inside_list_items_and_quotes() {
        let parsed = parse("- step one\n\n  ```{r}\n  x <- 1\n  ```\n\n- step two\n\n> quoted\n>\n> ```{r}\n> y\n> ```\n");
        let doc = &parsed.document;
        assert_eq!(kinds(doc.blocks()), vec!["bullet_list", "blockquote"]);
        assert_eq!(doc.node(&[0, 0, 1]).and_then(Node::text), Some("{r}\nx <- 1"));
        assert_eq!(doc.node(&[1, 1]).and_then(Node::text), Some("{r}\ny"));
    }

    #[test]
    fn chunk_on_list_marker_line_falls_back_to_code_info() {
        let parsed = parse("- ```{r, echo=FALSE}\n  plot(cars)\n  ```\n");
        let doc = &parsed.document;
        assert_eq!(
            doc.node(&[0, 0, 0]).and_then(Node::text),
            Some("{r, echo=FALSE}\nplot(cars)")
        );
    }

    #[test]
    fn marker_line_chunk_keeps_header_verbatim() {
        let source = "- a\n- ```{r  echo=FALSE, fig.cap=\"A &amp; B\"}\n  x\n  ```\n";
        let parsed = parse(source);
        let header = "{r  echo=FALSE, fig.cap=\"A &amp; B\"}";
        assert_eq!(
            parsed.document.node(&[0, 1, 0]).and_then(Node::text),
            Some(format!("{header}\nx").as_str())
        );

        let written = crate::writer::write_markdown(&parsed.document);
        let reparsed = parse(&written);
        assert_eq!(reparsed.document, parsed.document);
    }

    #[test]
    fn chunk_fence_in_indented_code_is_restored_as_code() {
        let parsed = parse("Para\n\n    some code\n    ```{r}\n    x\n    ```\n");
        let blocks = parsed.document.blocks();
        assert_eq!(kinds(blocks), vec!["paragraph", "code_block"]);
        assert_eq!(
            blocks[1].kind,
            NodeKind::CodeBlock {
                lang: None,
                meta: None,
                code: "some code\n```{r}\nx\n```".into()
            }
        );
        assert_eq!(
            parsed.diagnostics.warnings,
            vec![ParseWarning::OrphanCapsule { id: 0 }]
        );

        let written = crate::writer::write_markdown(&parsed.document);
        assert!(!written.contains("RMDCHUNKCAPSULE"), "{written}");
        assert!(written.contains("some code\n```{r}\nx\n```\n"), "{written}");
    }

    #[test]
    fn chunk_fence_in_front_matter_stays_yaml() {
        let source = "---\nabstract: |\n  ```{r}\n  x\n  ```\n---\n\nText\n";
        let parsed = parse(source);
        let blocks = parsed.document.blocks();
        assert_eq!(kinds(blocks), vec!["yaml_metadata", "paragraph"]);
        assert_eq!(
            blocks[0].kind,
            NodeKind::Frontmatter {
                yaml: "abstract: |\n  ```{r}\n  x\n  ```".into()
            }
        );
        assert!(parsed.document.chunks().is_empty());
        assert!(!parsed.diagnostics.has_warnings());
        assert_eq!(crate::writer::write_markdown(&parsed.document), source);
    }

    #[test]
    fn orphan_placeholder_is_restored_with_warning() {
        let capsules = extract_capsules("```{r}\nx\n```\n").capsules;
        let mut diagnostics = ParseDiagnostics::new();
        let mut converter = Converter {
            source: "",
            capsules: &capsules,
            diagnostics: &mut diagnostics,
        };
        let restored = converter.restore_orphans(format!("cell {}", capsules.placeholder(0)));
        assert_eq!(restored, "cell ```{r}\nx\n```");
        assert_eq!(diagnostics.warnings, vec![ParseWarning::OrphanCapsule { id: 0 }]);
    }

    #[test]
    fn plain_code_block_stays_code() {
        let parsed = parse("```r\nx\n```\n");
        assert_eq!(
            parsed.document.blocks()[0].kind,
            NodeKind::CodeBlock {
                lang: Some("r".into()),
                meta: None,
                code: "x".into()
            }
        );
    }

    #[test]
    fn capsules_can_be_disabled() {
        let options = ParseOptions {
            capsules: false,
            ..ParseOptions::default()
        };
        let parsed = parse_document("```{r}\nx\n```\n", &options).unwrap();
        // The code-info fallback still recognises the chunk.
        assert_eq!(parsed.document.blocks()[0].text(), Some("{r}\nx"));
    }

    #[test]
    fn frontmatter_and_tables() {
        let parsed = parse("---\ntitle: Report\n---\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
        let blocks = parsed.document.blocks();
        assert_eq!(kinds(blocks), vec!["yaml_metadata", "table"]);
        assert_eq!(
            blocks[0].kind,
            NodeKind::Frontmatter {
                yaml: "title: Report".into()
            }
        );
        assert_eq!(blocks[1].children.len(), 2);
        assert_eq!(blocks[1].children[1].children[0].text(), Some("1"));
    }

    #[test]
    fn inline_markup_is_flattened() {
        let parsed = parse("Some **bold** and `code` with [a link](https://x.y).\n");
        assert_eq!(
            parsed.document.blocks()[0].text(),
            Some("Some bold and code with a link.")
        );
    }

    #[test]
    fn unclosed_chunk_is_reported() {
        let parsed = parse("```{r}\nx <- 1\n");
        assert!(matches!(
            parsed.diagnostics.warnings.as_slice(),
            [ParseWarning::UnclosedChunkFence { .. }]
        ));
    }

    fn lowercase_r(input: &str) -> Cow<'_, str> {
        Cow::Owned(input.replace("{R}", "{r}"))
    }

    #[test]
    fn pipeline_runs_transforms() {
        let mut pipeline = ParserPipeline::new(ParseOptions::default());
        pipeline.add_text_transform(lowercase_r);
        pipeline.add_document_transform(|doc: &mut Document| {
            doc.root.children.retain(|n| n.as_chunk().is_some());
        });
        let parsed = pipeline.parse("text\n\n```{R}\nx\n```\n").unwrap();
        assert_eq!(parsed.document.blocks().len(), 1);
        assert_eq!(parsed.document.blocks()[0].text(), Some("{r}\nx"));
    }
}
