//! Diagram block extraction.
//!
//! Finds delimited diagram blocks (by default fenced code tagged with a
//! diagram language) and reports their spans in document order. The buffer
//! is never modified; replacements are applied later by [`crate::splice`].
//!
//! Nested fences of the same kind are not supported: the opener always
//! pairs with the nearest closer after it. For fenced code the closer must be
//! at least as long as the opener, so a four-backtick block may contain a
//! three-backtick one.

use regex::Regex;

use crate::span::Span;

/// Open and close markers for a diagram block.
#[derive(Debug, Clone)]
pub struct Delimiters {
    open: Regex,
    close: Closer,
}

#[derive(Debug, Clone)]
enum Closer {
    /// Nearest match of a pattern.
    Pattern(Regex),
    /// Nearest run of the opener's fence character at least as long as the
    /// opener's run (the `fence` capture group).
    FenceRun,
}

impl Delimiters {
    /// Build delimiters from regular expressions.
    pub fn new(open: &str, close: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            open: Regex::new(open)?,
            close: Closer::Pattern(Regex::new(close)?),
        })
    }

    /// Fenced code tagged with `language`: a line starting with three or
    /// more backticks (or tildes), the tag and a line break, closed by the
    /// next run of at least as many of the same character.
    pub fn fence(language: &str) -> Result<Self, regex::Error> {
        let open = format!(
            r"(?m)^[ \t]*(?<fence>`{{3,}}|~{{3,}}){}[ \t]*\r?\n",
            regex::escape(language)
        );
        Ok(Self {
            open: Regex::new(&open)?,
            close: Closer::FenceRun,
        })
    }

    /// Start and end of the closer nearest after `from`.
    fn find_close(&self, text: &str, from: usize, fence: Option<&str>) -> Option<(usize, usize)> {
        match &self.close {
            Closer::Pattern(close) => close.find_at(text, from).map(|m| (m.start(), m.end())),
            Closer::FenceRun => {
                let fence = fence?;
                let ch = fence.bytes().next()?;
                let start = from + text[from..].find(fence)?;
                let run = text[start..].bytes().take_while(|&b| b == ch).count();
                Some((start, start + run))
            }
        }
    }
}

/// A diagram block found by one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// Whole block including both delimiters.
    pub span: Span,
    /// Region between the delimiters.
    pub content_span: Span,
    /// 1-based position in document order.
    pub sequence: usize,
    /// Raw text between the delimiters.
    pub content: String,
}

/// Extraction failure. Partial results are never returned because
/// dropping one block would renumber every block after it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("diagram block {sequence} opened at byte {offset} has no closing delimiter")]
    MalformedBlock { sequence: usize, offset: usize },
}

/// Extract all diagram blocks from `text` in document order.
///
/// Matching is greedy and non-overlapping: after a block is matched,
/// scanning resumes strictly after its end. Returns an empty vector when no
/// opener is present.
///
/// # Example
///
/// ```
/// use folio_text::{Delimiters, extract_blocks};
///
/// let text = "```mermaid\nA-->B\n```\ntext\n```mermaid\nC-->D\n```\n";
/// let blocks = extract_blocks(text, &Delimiters::fence("mermaid").unwrap()).unwrap();
///
/// assert_eq!(blocks.len(), 2);
/// assert_eq!(blocks[1].sequence, 2);
/// assert_eq!(blocks[1].content, "C-->D\n");
/// ```
pub fn extract_blocks(
    text: &str,
    delimiters: &Delimiters,
) -> Result<Vec<DiagramBlock>, ExtractError> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while cursor <= text.len() {
        let Some(captures) = delimiters.open.captures_at(text, cursor) else {
            break;
        };
        let Some(open) = captures.get(0) else {
            break;
        };
        let fence = captures.name("fence");
        let start = fence.map_or(open.start(), |f| f.start());
        let sequence = blocks.len() + 1;
        let Some((close_start, close_end)) =
            delimiters.find_close(text, open.end(), fence.map(|f| f.as_str()))
        else {
            return Err(ExtractError::MalformedBlock {
                sequence,
                offset: start,
            });
        };

        blocks.push(DiagramBlock {
            span: Span::new(start, close_end),
            content_span: Span::new(open.end(), close_start),
            sequence,
            content: text[open.end()..close_start].to_owned(),
        });

        // Degenerate patterns may match empty; step one char to make progress.
        cursor = if close_end > open.start() {
            close_end
        } else {
            next_char_boundary(text, close_end)
        };
    }

    tracing::debug!(count = blocks.len(), "Extracted diagram blocks");
    Ok(blocks)
}

fn next_char_boundary(text: &str, offset: usize) -> usize {
    text[offset..]
        .chars()
        .next()
        .map_or(offset + 1, |c| offset + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splice::{Replacement, splice};
    use pretty_assertions::assert_eq;

    fn mermaid() -> Delimiters {
        Delimiters::fence("mermaid").unwrap()
    }

    #[test]
    fn test_no_blocks() {
        let text = "# Title\n\n```rust\nfn main() {}\n```\n";
        assert!(extract_blocks(text, &mermaid()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_buffer() {
        assert!(extract_blocks("", &mermaid()).unwrap().is_empty());
    }

    #[test]
    fn test_single_block_spans() {
        let text = "before\n```mermaid\ngraph TD\n  A-->B\n```\nafter";
        let blocks = extract_blocks(text, &mermaid()).unwrap();

        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.sequence, 1);
        assert_eq!(block.content, "graph TD\n  A-->B\n");
        assert_eq!(
            block.span.get(text),
            Some("```mermaid\ngraph TD\n  A-->B\n```")
        );
        assert_eq!(block.content_span.get(text), Some(block.content.as_str()));
    }

    #[test]
    fn test_blocks_sorted_and_disjoint() {
        let text = "```mermaid\na\n```\n\n```mermaid\nb\n```\n\n```mermaid\nc\n```\n";
        let blocks = extract_blocks(text, &mermaid()).unwrap();

        assert_eq!(blocks.len(), 3);
        for pair in blocks.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start);
            assert_eq!(pair[0].sequence + 1, pair[1].sequence);
        }
    }

    #[test]
    fn test_other_languages_ignored() {
        let text = "```plantuml\n@startuml\n@enduml\n```\n```mermaid\nx\n```\n";
        let blocks = extract_blocks(text, &mermaid()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "x\n");
    }

    #[test]
    fn test_nearest_closer_wins() {
        // A nested-looking fence ends the block at the inner closer.
        let text = "```mermaid\nouter\n```inner\n```\n";
        let blocks = extract_blocks(text, &mermaid()).unwrap();
        assert_eq!(blocks[0].content, "outer\n");
    }

    #[test]
    fn test_unclosed_block_is_malformed() {
        let text = "```mermaid\na\n```\n\n```mermaid\nnever closed\n";
        let err = extract_blocks(text, &mermaid()).unwrap_err();
        assert_eq!(
            err,
            ExtractError::MalformedBlock {
                sequence: 2,
                offset: 18
            }
        );
    }

    #[test]
    fn test_crlf_opener() {
        let text = "```mermaid\r\nA\r\n```";
        let blocks = extract_blocks(text, &mermaid()).unwrap();
        assert_eq!(blocks[0].content, "A\r\n");
    }

    #[test]
    fn test_language_is_escaped() {
        let delimiters = Delimiters::fence("c++").unwrap();
        let text = "```c++\nint x;\n```";
        assert_eq!(extract_blocks(text, &delimiters).unwrap().len(), 1);
    }

    #[test]
    fn test_custom_delimiters() {
        let delimiters = Delimiters::new(r"\\begin\{diagram\}", r"\\end\{diagram\}").unwrap();
        let text = r"x \begin{diagram}A\end{diagram} y \begin{diagram}B\end{diagram}";
        let blocks = extract_blocks(text, &delimiters).unwrap();
        let contents: Vec<_> = blocks.iter().map(|b| b.content.as_str()).collect();
        assert_eq!(contents, ["A", "B"]);
    }

    #[test]
    fn test_empty_matching_patterns_terminate() {
        let delimiters = Delimiters::new("", "").unwrap();
        let blocks = extract_blocks("ab", &delimiters).unwrap();
        assert_eq!(blocks.len(), 3);
        assert!(blocks.iter().all(|b| b.span.is_empty()));
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let text = "```mermaid\na\n```\n```mermaid\nb\n```";
        assert_eq!(
            extract_blocks(text, &mermaid()).unwrap(),
            extract_blocks(text, &mermaid()).unwrap()
        );
    }

    #[test]
    fn test_identity_splice_round_trip() {
        let text = "Intro ✓\n```mermaid\na\n```\nmid\n```mermaid\nbb\n```\n```mermaid\n\n```\nend";
        let blocks = extract_blocks(text, &mermaid()).unwrap();
        assert_eq!(blocks.len(), 3);

        let identity: Vec<_> = blocks
            .iter()
            .map(|b| Replacement::new(b.span, b.span.get(text).unwrap()))
            .collect();
        assert_eq!(splice(text, &identity).unwrap(), text);

        let inner: Vec<_> = blocks
            .iter()
            .map(|b| Replacement::new(b.content_span, b.content.clone()))
            .collect();
        assert_eq!(splice(text, &inner).unwrap(), text);
    }

    #[test]
    fn test_longer_fence_spans_whole_block() {
        let text = "a\n````mermaid\nA-->B\n```\nC\n````\nb\n";
        let blocks = extract_blocks(text, &mermaid()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "A-->B\n```\nC\n");

        let out = splice(text, &[Replacement::new(blocks[0].span, "(fig)")]).unwrap();
        assert_eq!(out, "a\n(fig)\nb\n");
    }

    #[test]
    fn test_tilde_fence() {
        let text = "~~~mermaid\nA\n```\n~~~\n";
        let blocks = extract_blocks(text, &mermaid()).unwrap();
        assert_eq!(blocks[0].content, "A\n```\n");
        assert_eq!(blocks[0].span.get(text), Some("~~~mermaid\nA\n```\n~~~"));
    }

    #[test]
    fn test_opener_must_start_a_line() {
        let text = "inline ```mermaid\nA\n```\n";
        assert!(extract_blocks(text, &mermaid()).unwrap().is_empty());
    }

    #[test]
    fn test_indented_fence_keeps_indent() {
        let text = "- item\n  ```mermaid\n  A\n  ```\n";
        let blocks = extract_blocks(text, &mermaid()).unwrap();
        let out = splice(text, &[Replacement::new(blocks[0].span, "(fig)")]).unwrap();
        assert_eq!(out, "- item\n  (fig)\n");
    }
}
