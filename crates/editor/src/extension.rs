//! The chunk extension: node schema, DOM rules, markdown filters and commands
//! bundled for a host editor.

use rmdchunk_core::{CapsuleExtraction, ChunkNode, extract_capsules, write_chunk};

use crate::commands::{ChunkCommands, ChunkExecutor};
use crate::document::Document;
use crate::dom::{CHUNK_DOM_CLASS, CHUNK_SELECTOR, chunk_to_html, chunks_from_html};
use crate::error::EditorError;
use crate::options::{CodeViewConfig, ExtensionOptions};
use crate::parse::{ParseOptions, ParsedDocument, parse_document};
use crate::writer::write_markdown;

/// Schema name of chunk nodes.
pub const NODE_NAME: &str = "rmd_chunk";

/// Name of the optional navigation id attribute.
pub const NAVIGATION_ID_ATTR_NAME: &str = "navigation_id";

/// How the host parses chunk elements out of the DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomParseRule {
    /// CSS selector of chunk elements.
    pub selector: &'static str,
    /// Keep all whitespace, newlines included.
    pub preserve_whitespace_full: bool,
}

/// The chunk extension.
#[derive(Debug)]
pub struct ChunkExtension {
    options: ExtensionOptions,
    code_view: CodeViewConfig,
    commands: ChunkCommands,
}

impl ChunkExtension {
    /// Creates the extension, or `None` when code chunks are disabled.
    pub fn new(
        options: ExtensionOptions,
        executor: Option<Box<dyn ChunkExecutor>>,
    ) -> Option<Self> {
        if !options.code_chunks {
            log::debug!("code chunks disabled, skipping {NODE_NAME} extension");
            return None;
        }
        Some(Self {
            options,
            code_view: CodeViewConfig::new(&options),
            commands: ChunkCommands::new(executor),
        })
    }

    /// Schema name of the node.
    pub fn node_name(&self) -> &'static str {
        NODE_NAME
    }

    /// Options the extension was created with.
    pub fn options(&self) -> &ExtensionOptions {
        &self.options
    }

    /// Code view configuration for chunk nodes.
    pub fn code_view(&self) -> &CodeViewConfig {
        &self.code_view
    }

    /// Registered commands.
    pub fn commands(&self) -> &ChunkCommands {
        &self.commands
    }

    /// DOM parse rule.
    pub fn parse_rule(&self) -> DomParseRule {
        DomParseRule {
            selector: CHUNK_SELECTOR,
            preserve_whitespace_full: true,
        }
    }

    /// Class attribute of rendered chunk elements.
    pub fn dom_class(&self) -> &'static str {
        CHUNK_DOM_CLASS
    }

    /// Renders a chunk node to HTML.
    pub fn to_dom(&self, node: &ChunkNode) -> String {
        chunk_to_html(node)
    }

    /// Parses chunk nodes out of HTML.
    pub fn parse_dom(&self, html: &str) -> Result<Vec<ChunkNode>, EditorError> {
        chunks_from_html(html)
    }

    /// Markdown source filter run before block parsing.
    pub fn capsule_filter(&self, source: &str) -> CapsuleExtraction {
        extract_capsules(source)
    }

    /// Writes one chunk node as fenced markdown; `None` writes nothing.
    pub fn write_node(&self, node: &ChunkNode) -> Option<String> {
        write_chunk(&node.raw_content)
    }

    /// Parses markdown with chunk support.
    pub fn parse_markdown(&self, source: &str) -> Result<ParsedDocument, EditorError> {
        parse_document(source, &ParseOptions::default())
    }

    /// Writes a document back to markdown.
    pub fn write_markdown(&self, document: &Document) -> String {
        write_markdown(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::EditorCommandId;

    #[test]
    fn disabled_without_code_chunks() {
        let options = ExtensionOptions {
            code_chunks: false,
            ..ExtensionOptions::default()
        };
        assert!(ChunkExtension::new(options, None).is_none());
    }

    #[test]
    fn exposes_schema_and_rules() {
        let ext = ChunkExtension::new(ExtensionOptions::default(), None).unwrap();
        assert_eq!(ext.node_name(), "rmd_chunk");
        assert_eq!(ext.parse_rule().selector, "div[class*='rmd-chunk']");
        assert!(ext.parse_rule().preserve_whitespace_full);
        assert_eq!(ext.dom_class(), "rmd-chunk pm-code-block");
        assert_eq!(ext.commands().commands(), vec![EditorCommandId::RmdChunk]);
        assert!(ext.code_view().first_line_meta);
    }

    #[test]
    fn markdown_round_trip() {
        let ext = ChunkExtension::new(ExtensionOptions::default(), None).unwrap();
        let source = "# Analysis\n\n```{r load, message=FALSE}\nlibrary(dplyr)\n```\n";
        let parsed = ext.parse_markdown(source).unwrap();
        assert_eq!(ext.write_markdown(&parsed.document), source);
        assert_eq!(
            ext.write_node(&ChunkNode::seed()).as_deref(),
            Some("```{r}\n```\n")
        );
        assert_eq!(ext.capsule_filter(source).capsules.len(), 1);
    }
}
