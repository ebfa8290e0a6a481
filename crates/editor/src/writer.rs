//! Block-level markdown writer.
//!
//! Chunks are written in their exact fenced form; every other block uses a
//! plain CommonMark rendering. Blocks are separated by one blank line.

use rmdchunk_core::write_chunk;

use crate::document::{Document, Node, NodeKind};

/// Writes the document as markdown.
pub fn write_markdown(document: &Document) -> String {
    write_blocks(document.blocks())
}

fn write_blocks(blocks: &[Node]) -> String {
    blocks
        .iter()
        .filter_map(write_block)
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders one block, terminated by a newline. `None` when the block writes nothing.
fn write_block(node: &Node) -> Option<String> {
    let block = match &node.kind {
        NodeKind::Doc => write_blocks(&node.children),
        NodeKind::Frontmatter { yaml } => format!("---\n{yaml}\n---\n"),
        NodeKind::Paragraph { text } => {
            if text.is_empty() {
                return None;
            }
            format!("{text}\n")
        }
        NodeKind::Heading { depth, text } => {
            format!("{} {text}\n", "#".repeat(usize::from(*depth).clamp(1, 6)))
        }
        NodeKind::CodeBlock { lang, meta, code } => {
            write_code_block(lang.as_deref(), meta.as_deref(), code)
        }
        NodeKind::Chunk(chunk) => match write_chunk(&chunk.raw_content) {
            Some(fenced) => fenced,
            None => {
                log::debug!("skipping chunk without a header line");
                return None;
            }
        },
        NodeKind::List { ordered, start } => write_list(node, *ordered, start.unwrap_or(1)),
        NodeKind::ListItem { checked } => write_list_item("- ", *checked, &node.children),
        NodeKind::BlockQuote => {
            let inner = write_blocks(&node.children);
            if inner.is_empty() {
                ">\n".to_string()
            } else {
                prefix_lines(&inner, "> ", "> ")
            }
        }
        NodeKind::Table => write_table(&node.children),
        NodeKind::TableRow => write_table(std::slice::from_ref(node)),
        NodeKind::TableCell { text } => format!("{text}\n"),
        NodeKind::ThematicBreak => "***\n".to_string(),
        NodeKind::Html { value } => format!("{value}\n"),
    };
    Some(block)
}

fn write_code_block(lang: Option<&str>, meta: Option<&str>, code: &str) -> String {
    let longest_run = code.split(|c| c != '`').map(str::len).max().unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    let info = match (lang, meta) {
        (Some(lang), Some(meta)) => format!("{lang} {meta}"),
        (Some(lang), None) => lang.to_string(),
        _ => String::new(),
    };
    if code.is_empty() {
        format!("{fence}{info}\n{fence}\n")
    } else {
        format!("{fence}{info}\n{code}\n{fence}\n")
    }
}

fn write_list(list: &Node, ordered: bool, start: u32) -> String {
    let loose = list.children.iter().any(|item| item.children.len() > 1);
    let items: Vec<String> = list
        .children
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let marker = if ordered {
                format!("{}. ", start.saturating_add(index as u32))
            } else {
                "- ".to_string()
            };
            let checked = match item.kind {
                NodeKind::ListItem { checked } => checked,
                _ => None,
            };
            write_list_item(&marker, checked, &item.children)
        })
        .collect();
    items.join(if loose { "\n" } else { "" })
}

fn write_list_item(marker: &str, checked: Option<bool>, children: &[Node]) -> String {
    let task = match checked {
        Some(true) => "[x] ",
        Some(false) => "[ ] ",
        None => "",
    };
    let inner = write_blocks(children);
    if inner.is_empty() {
        return format!("{}\n", format!("{marker}{task}").trim_end());
    }
    let first = format!("{marker}{task}");
    let rest = " ".repeat(marker.len());
    prefix_lines(&inner, &first, &rest)
}

fn write_table(rows: &[Node]) -> String {
    let mut out = String::new();
    for (index, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row
            .children
            .iter()
            .map(|cell| cell.text().unwrap_or_default().replace('|', "\\|"))
            .collect();
        out.push_str("| ");
        out.push_str(&cells.join(" | "));
        out.push_str(" |\n");
        if index == 0 {
            out.push('|');
            for _ in &cells {
                out.push_str(" --- |");
            }
            out.push('\n');
        }
    }
    out
}

/// Prefixes the first line with `first` and later lines with `rest`.
/// Blank lines keep only the prefix's non-space part.
fn prefix_lines(text: &str, first: &str, rest: &str) -> String {
    let mut out = String::with_capacity(text.len() + first.len() * 4);
    for (index, line) in text.lines().enumerate() {
        let prefix = if index == 0 { first } else { rest };
        if line.is_empty() {
            out.push_str(prefix.trim_end());
        } else {
            out.push_str(prefix);
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}
