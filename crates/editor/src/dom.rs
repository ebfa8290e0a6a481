//! DOM form of chunk nodes.
//!
//! A chunk renders as `<div class="rmd-chunk pm-code-block">` holding its raw
//! content as text. Any `div` whose class attribute contains `rmd-chunk`
//! parses back into a chunk, with whitespace preserved exactly.

use std::cell::RefCell;

use lol_html::{RewriteStrSettings, element, rewrite_str, text};
use rmdchunk_core::ChunkNode;

use crate::error::EditorError;

/// Class token identifying chunk elements.
pub const CHUNK_CLASS: &str = "rmd-chunk";

/// Class attribute written on chunk elements.
pub const CHUNK_DOM_CLASS: &str = "rmd-chunk pm-code-block";

/// Attribute carrying the navigation id.
pub const NAVIGATION_ID_ATTR: &str = "data-navigation-id";

/// Selector matching chunk elements.
pub const CHUNK_SELECTOR: &str = "div[class*='rmd-chunk']";

/// Whether an element with this tag and class attribute is a chunk.
pub fn is_chunk_element(tag: &str, class: Option<&str>) -> bool {
    tag.eq_ignore_ascii_case("div") && class.is_some_and(|class| class.contains(CHUNK_CLASS))
}

/// Renders a chunk node as its DOM element.
pub fn chunk_to_html(node: &ChunkNode) -> String {
    let mut html = format!(r#"<div class="{CHUNK_DOM_CLASS}""#);
    if let Some(id) = &node.navigation_id {
        html.push_str(&format!(
            r#" {NAVIGATION_ID_ATTR}="{}""#,
            html_escape::encode_double_quoted_attribute(id)
        ));
    }
    html.push('>');
    html.push_str(&html_escape::encode_text(&node.raw_content));
    html.push_str("</div>");
    html
}

/// Extracts every chunk element of an HTML fragment, in document order.
pub fn chunks_from_html(html: &str) -> Result<Vec<ChunkNode>, EditorError> {
    let chunks = RefCell::new(Vec::new());

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(CHUNK_SELECTOR, |el| {
                    let mut chunk = ChunkNode::new(String::new());
                    chunk.navigation_id = el
                        .get_attribute(NAVIGATION_ID_ATTR)
                        .map(|id| html_escape::decode_html_entities(&id).into_owned());
                    chunks.borrow_mut().push(chunk);
                    Ok(())
                }),
                text!(CHUNK_SELECTOR, |t| {
                    // Text may arrive split mid-entity; decode once at the end.
                    if let Some(chunk) = chunks.borrow_mut().last_mut() {
                        chunk.raw_content.push_str(t.as_str());
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )?;

    let chunks: Vec<ChunkNode> = chunks
        .into_inner()
        .into_iter()
        .map(|mut chunk| {
            chunk.raw_content = html_escape::decode_html_entities(&chunk.raw_content).into_owned();
            chunk
        })
        .collect();
    log::debug!("parsed {} chunks from html", chunks.len());
    Ok(chunks)
}
