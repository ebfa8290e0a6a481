//! Fence tracking for chunk capsule extraction.
//!
//! Lines are classified after stripping their container prefix (leading
//! spaces, tabs and `>` block quote markers), so fences nested in list items
//! and block quotes are tracked the same way as top-level ones. Ordinary code
//! fences are tracked too: a `{r}` fence inside a longer ```` ````markdown ````
//! block is example text, not a chunk.

/// Fence parsing phases tracked across lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FencePhase {
    /// Not currently inside a fence.
    #[default]
    Outside,
    /// Within fence contents.
    InsideFence,
}

/// Current fence state (phase, marker, length, and whether it is a chunk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FenceState {
    /// Current fence phase.
    pub phase: FencePhase,
    /// Fence marker character (``` or ~~~).
    pub marker: Option<char>,
    /// Length of the opening fence (number of ` or ~ characters).
    pub length: usize,
    /// Whether the open fence carries a `{...}` chunk header.
    pub chunk: bool,
}

/// Role a single line plays with respect to fences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceLine {
    /// Ordinary document text.
    Text,
    /// Opening delimiter of a fence.
    Opening,
    /// Line inside a fence.
    Content,
    /// Closing delimiter of a fence.
    Closing,
}

/// Outcome of processing a single line for fence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineParseOutcome {
    /// State to carry into the next line.
    pub next_state: FenceState,
    /// What the processed line was.
    pub line: FenceLine,
}

/// Advance fence state based on a single line of text.
pub fn advance_fence_state(line: &str, state: FenceState) -> LineParseOutcome {
    let (_, body) = split_container_prefix(line);

    match state.phase {
        FencePhase::Outside => match detect_fence_marker_with_length(body) {
            Some((marker, length)) if is_valid_info(marker, &body[length..]) => LineParseOutcome {
                next_state: FenceState {
                    phase: FencePhase::InsideFence,
                    marker: Some(marker),
                    length,
                    chunk: marker == '`' && chunk_header(body).is_some(),
                },
                line: FenceLine::Opening,
            },
            _ => LineParseOutcome {
                next_state: state,
                line: FenceLine::Text,
            },
        },
        FencePhase::InsideFence => {
            if let Some((marker, closer_len)) = detect_fence_marker_with_length(body)
                && Some(marker) == state.marker
                && closer_len >= state.length
                && body[closer_len..].trim().is_empty()
            {
                LineParseOutcome {
                    next_state: FenceState::default(),
                    line: FenceLine::Closing,
                }
            } else {
                LineParseOutcome {
                    next_state: state,
                    line: FenceLine::Content,
                }
            }
        }
    }
}

/// Splits a line into its container prefix (spaces, tabs, `>`) and the rest.
pub fn split_container_prefix(line: &str) -> (&str, &str) {
    let end = line
        .bytes()
        .position(|b| !matches!(b, b' ' | b'\t' | b'>'))
        .unwrap_or(line.len());
    line.split_at(end)
}

/// Returns the `{...}` header of a backtick chunk opening fence.
///
/// `line` must already be stripped of its container prefix.
///
/// ```
/// use rmdchunk_core::code_fence::chunk_header;
///
/// assert_eq!(chunk_header("```{r echo=FALSE}"), Some("{r echo=FALSE}"));
/// assert_eq!(chunk_header("``` {python}  "), Some("{python}"));
/// assert_eq!(chunk_header("```r"), None);
/// ```
pub fn chunk_header(line: &str) -> Option<&str> {
    let (marker, length) = detect_fence_marker_with_length(line)?;
    if marker != '`' {
        return None;
    }
    let info = line[length..].trim();
    (info.starts_with('{') && info.ends_with('}') && !info.contains('`')).then_some(info)
}

fn detect_fence_marker_with_length(after_indent: &str) -> Option<(char, usize)> {
    let mut chars = after_indent.chars();
    let first = chars.next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let run_len = 1 + chars.take_while(|c| *c == first).count();
    if run_len >= 3 {
        Some((first, run_len))
    } else {
        None
    }
}

/// Backtick info strings may not contain backticks (otherwise it's inline code).
fn is_valid_info(marker: char, info: &str) -> bool {
    marker != '`' || !info.contains('`')
}
