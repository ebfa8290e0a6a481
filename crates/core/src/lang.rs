/// Returns the language tag of a chunk's content.
///
/// The tag is the run of `[A-Za-z0-9_]` characters immediately after a leading
/// `{`; anything after it (options, separators) is ignored.
///
/// # Examples
///
/// ```
/// use rmdchunk_core::lang::extract_language;
///
/// assert_eq!(extract_language("{r}\n1+1"), Some("r"));
/// assert_eq!(extract_language("{r echo=FALSE}\ncode"), Some("r"));
/// assert_eq!(extract_language("{}\n"), None);
/// assert_eq!(extract_language("no header"), None);
/// ```
pub fn extract_language(content: &str) -> Option<&str> {
    identifier_prefix(content.strip_prefix('{')?)
}

/// Leading `[A-Za-z0-9_]+` run of `text`, if non-empty.
pub(crate) fn identifier_prefix(text: &str) -> Option<&str> {
    let end = text
        .bytes()
        .position(|b| !(b.is_ascii_alphanumeric() || b == b'_'))
        .unwrap_or(text.len());
    (end > 0).then(|| &text[..end])
}
