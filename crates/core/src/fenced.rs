//! Fenced markdown form of a chunk.
//!
//! A chunk is written as a backtick fence whose info string is the brace
//! header:
//!
//! ````text
//! ```{r echo=FALSE}
//! plot(cars)
//! ```
//! ````
//!
//! The byte layout is fixed: one newline after the header, one after the code
//! (only when there is code), and a closing fence followed by a newline.

use crate::chunk::{join_chunk, parse_chunk};
use crate::code_fence::chunk_header;

/// Writes meta and code as a fenced chunk block.
///
/// ```
/// use rmdchunk_core::fenced::serialize_chunk;
///
/// assert_eq!(serialize_chunk("r", "1 + 1"), "```{r}\n1 + 1\n```\n");
/// assert_eq!(serialize_chunk("r", ""), "```{r}\n```\n");
/// ```
pub fn serialize_chunk(meta: &str, code: &str) -> String {
    let mut out = String::with_capacity(meta.len() + code.len() + 12);
    out.push_str("```{");
    out.push_str(meta);
    out.push_str("}\n");
    if !code.is_empty() {
        out.push_str(code);
        out.push('\n');
    }
    out.push_str("```\n");
    out
}

/// Writes raw chunk node content as a fenced block.
///
/// Returns `None` (nothing to write) when the content has no header line.
pub fn write_chunk(raw_content: &str) -> Option<String> {
    let parsed = parse_chunk(raw_content)?;
    Some(serialize_chunk(parsed.meta, parsed.code))
}

/// Strips the fences from a fenced chunk block, returning raw node content.
///
/// The first line must be a chunk opening fence. A closing fence is
/// optional; when present, anything after it is ignored.
pub fn unfence(fenced: &str) -> Option<String> {
    let mut lines = fenced.lines();
    let opening = lines.next()?;
    let header = chunk_header(opening)?;
    let fence_len = opening.bytes().take_while(|b| *b == b'`').count();

    let mut code: Vec<&str> = Vec::new();
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed.len() >= fence_len && trimmed.bytes().all(|b| b == b'`') {
            break;
        }
        code.push(line);
    }

    let meta = &header[1..header.len() - 1];
    Some(join_chunk(meta, &code.join("\n")))
}
