use js_sys::Array;
use rmdchunk_core::ParseWarning;
use rmdchunk_editor::{
    ChunkExtension, CodeViewConfig, ExtensionOptions, ParseOptions, parse_document,
    write_markdown,
};
use serde::Serialize;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;

// ============================================================================
// Config
// ============================================================================

/// Options accepted by the WASM functions. Missing fields use the defaults.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct WasmParseConfig {
    #[serde(default)]
    pub gfm: Option<bool>,
    #[serde(default)]
    pub frontmatter: Option<bool>,
    #[serde(default, alias = "allowRawHtml")]
    pub allow_raw_html: Option<bool>,
}

fn parse_config(config: JsValue) -> WasmParseConfig {
    if config.is_undefined() || config.is_null() {
        return WasmParseConfig::default();
    }
    serde_wasm_bindgen::from_value(config).unwrap_or_default()
}

fn build_parse_options(cfg: &WasmParseConfig) -> ParseOptions {
    let defaults = ParseOptions::default();
    ParseOptions {
        gfm: cfg.gfm.unwrap_or(defaults.gfm),
        frontmatter: cfg.frontmatter.unwrap_or(defaults.frontmatter),
        raw_html: cfg.allow_raw_html.unwrap_or(defaults.raw_html),
        capsules: true,
    }
}

fn parse_extension_options(options: JsValue) -> Result<ExtensionOptions, JsError> {
    if options.is_undefined() || options.is_null() {
        return Ok(ExtensionOptions::default());
    }
    serde_wasm_bindgen::from_value(options)
        .map_err(|e| JsError::new(&format!("Invalid options: {}", e)))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

// ============================================================================
// Chunk text
// ============================================================================

/// Header/code split of a chunk's content.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedChunkResult {
    pub meta: String,
    pub code: String,
    pub language: Option<String>,
    pub options: String,
}

/// Splits raw chunk content into meta and code; `null` without a header line.
#[wasm_bindgen(js_name = parseChunk)]
pub fn parse_chunk(content: &str) -> Result<JsValue, JsError> {
    let Some(parsed) = rmdchunk_core::parse_chunk(content) else {
        return Ok(JsValue::NULL);
    };
    to_js(&ParsedChunkResult {
        meta: parsed.meta.to_string(),
        code: parsed.code.to_string(),
        language: parsed.language().map(str::to_string),
        options: parsed.options().to_string(),
    })
}

/// Language tag of chunk content.
#[wasm_bindgen(js_name = extractLanguage)]
pub fn extract_language(content: &str) -> Option<String> {
    rmdchunk_core::extract_language(content).map(str::to_string)
}

/// Fenced markdown for meta and code.
#[wasm_bindgen(js_name = serializeChunk)]
pub fn serialize_chunk(meta: &str, code: &str) -> String {
    rmdchunk_core::serialize_chunk(meta, code)
}

/// Fenced markdown for raw chunk content; `undefined` when it has no header.
#[wasm_bindgen(js_name = writeChunk)]
pub fn write_chunk(content: &str) -> Option<String> {
    rmdchunk_core::write_chunk(content)
}

// ============================================================================
// Capsules
// ============================================================================

/// One extracted capsule.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleEntry {
    pub id: usize,
    pub placeholder: String,
    pub raw_content: String,
}

/// Result of the capsule filter.
#[derive(Debug, Clone, Serialize)]
pub struct CapsuleResult {
    pub source: String,
    pub capsules: Vec<CapsuleEntry>,
    pub warnings: Vec<String>,
}

/// Replaces every fenced chunk with a placeholder line.
#[wasm_bindgen(js_name = extractCapsules)]
pub fn extract_capsules(source: &str) -> Result<JsValue, JsError> {
    let extraction = rmdchunk_core::extract_capsules(source);
    let map = &extraction.capsules;
    let result = CapsuleResult {
        capsules: map
            .iter()
            .map(|capsule| CapsuleEntry {
                id: capsule.id,
                placeholder: map.placeholder(capsule.id),
                raw_content: capsule.raw_content.clone(),
            })
            .collect(),
        warnings: warning_messages(&extraction.diagnostics.warnings),
        source: extraction.source,
    };
    to_js(&result)
}

fn warning_messages(warnings: &[ParseWarning]) -> Vec<String> {
    warnings.iter().map(ToString::to_string).collect()
}

// ============================================================================
// Documents
// ============================================================================

/// Raw contents of every chunk in a markdown document, in order.
#[wasm_bindgen(js_name = parseChunks)]
pub fn parse_chunks(source: &str, config: JsValue) -> Result<Array, JsError> {
    let cfg = parse_config(config);
    let parsed = parse_document(source, &build_parse_options(&cfg))
        .map_err(|e| JsError::new(&e.to_string()))?;
    Ok(parsed
        .document
        .chunks()
        .into_iter()
        .map(|(_, chunk)| JsValue::from_str(&chunk.raw_content))
        .collect())
}

/// Parses and rewrites a markdown document, normalizing block layout.
#[wasm_bindgen(js_name = normalizeMarkdown)]
pub fn normalize_markdown(source: &str, config: JsValue) -> Result<String, JsError> {
    let cfg = parse_config(config);
    let parsed = parse_document(source, &build_parse_options(&cfg))
        .map_err(|e| JsError::new(&e.to_string()))?;
    Ok(write_markdown(&parsed.document))
}

// ============================================================================
// Extension / DOM
// ============================================================================

/// Code view configuration, or `null` when code chunks are disabled.
#[wasm_bindgen(js_name = codeViewConfig)]
pub fn code_view_config(options: JsValue) -> Result<JsValue, JsError> {
    let options = parse_extension_options(options)?;
    match ChunkExtension::new(options, None) {
        Some(extension) => to_js::<CodeViewConfig>(extension.code_view()),
        None => Ok(JsValue::NULL),
    }
}

/// Gutter label for a 1-based chunk line.
#[wasm_bindgen(js_name = formatLineNumber)]
pub fn format_line_number(line: usize) -> String {
    CodeViewConfig::default().format_line_number(line)
}

/// DOM element for chunk content.
#[wasm_bindgen(js_name = chunkToHtml)]
pub fn chunk_to_html(content: &str, navigation_id: Option<String>) -> String {
    let mut node = rmdchunk_core::ChunkNode::new(content);
    node.navigation_id = navigation_id;
    rmdchunk_editor::chunk_to_html(&node)
}

/// Raw contents of every chunk element in an HTML fragment.
#[wasm_bindgen(js_name = chunksFromHtml)]
pub fn chunks_from_html(html: &str) -> Result<Array, JsError> {
    let chunks =
        rmdchunk_editor::chunks_from_html(html).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(chunks
        .iter()
        .map(|chunk| JsValue::from_str(&chunk.raw_content))
        .collect())
}
