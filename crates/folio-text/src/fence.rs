//! Code fence tracking for line-anchored scans.
//!
//! Anchors such as section headings and separator lines must not match
//! inside fenced code (a `# comment` in a shell listing is not a heading).

/// Classification of a line relative to fenced code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
    /// Opening or closing fence marker.
    Fence,
    /// Line inside a fenced block.
    Code,
    /// Ordinary prose line.
    Prose,
}

/// Tracks `CommonMark` fence state across successive lines.
///
/// A closing fence uses the opening character and is at least as long as
/// the opener, with nothing but whitespace after it.
#[derive(Debug, Default)]
pub(crate) struct FenceState {
    open: Option<(char, usize)>,
}

impl FenceState {
    /// Classify `line` and advance the state.
    pub(crate) fn observe(&mut self, line: &str) -> LineKind {
        let trimmed = line.trim_start();
        match self.open {
            Some((ch, len)) => {
                if closes_fence(trimmed, ch, len) {
                    self.open = None;
                    LineKind::Fence
                } else {
                    LineKind::Code
                }
            }
            None => match fence_marker(trimmed) {
                Some(marker) => {
                    self.open = Some(marker);
                    LineKind::Fence
                }
                None => LineKind::Prose,
            },
        }
    }
}

/// Fence character and run length if `trimmed` opens a fence.
fn fence_marker(trimmed: &str) -> Option<(char, usize)> {
    let ch = trimmed.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    let run = trimmed.chars().take_while(|&c| c == ch).count();
    (run >= 3).then_some((ch, run))
}

fn closes_fence(trimmed: &str, ch: char, min_len: usize) -> bool {
    let run = trimmed.chars().take_while(|&c| c == ch).count();
    // Fence chars are ASCII, so `run` is also a byte offset.
    run >= min_len && trimmed[run..].chars().all(char::is_whitespace)
}

/// One line of a buffer with its byte extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Line<'a> {
    /// Offset of the first byte of the line.
    pub(crate) start: usize,
    /// Offset just past the line terminator (or end of buffer).
    pub(crate) end: usize,
    /// Line content without `\n` / `\r\n`.
    pub(crate) text: &'a str,
}

/// Iterate lines of `text` that lie outside fenced code blocks.
///
/// Fence markers themselves are skipped.
pub(crate) fn prose_lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    let mut state = FenceState::default();
    let mut offset = 0;
    text.split_inclusive('\n').filter_map(move |raw| {
        let start = offset;
        offset += raw.len();
        let content = raw.strip_suffix('\n').unwrap_or(raw);
        let content = content.strip_suffix('\r').unwrap_or(content);
        (state.observe(content) == LineKind::Prose).then_some(Line {
            start,
            end: offset,
            text: content,
        })
    })
}
