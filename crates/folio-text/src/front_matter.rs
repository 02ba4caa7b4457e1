//! Anchor-based removal of front matter and named sections.
//!
//! A paper's markdown source usually repeats material the compiler renders
//! from metadata: the title line, the author block, the abstract. Each
//! [`Anchor`] locates one such region against the current buffer and the
//! region is deleted through the splice engine.

use crate::fence::prose_lines;
use crate::span::Span;
use crate::splice::{Replacement, SpliceError, splice};

/// Region to delete from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// First line of the buffer, when the buffer starts with `prefix`.
    TitleLine { prefix: String },
    /// Buffer start through the first separator line (`---`), when the
    /// buffer starts with `prefix`. An empty prefix always matches.
    Leading { prefix: String },
    /// Heading line equal to `heading` (e.g. `## Abstract`) through to the
    /// next heading of equal or higher level, or end of document.
    Section { heading: String },
}

impl Anchor {
    #[must_use]
    pub fn title_line(prefix: impl Into<String>) -> Self {
        Self::TitleLine {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn leading(prefix: impl Into<String>) -> Self {
        Self::Leading {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn section(heading: impl Into<String>) -> Self {
        Self::Section {
            heading: heading.into(),
        }
    }

    /// Locate the first region matching this anchor in `text`.
    #[must_use]
    pub fn locate(&self, text: &str) -> Option<Span> {
        match self {
            Self::TitleLine { prefix } => {
                if !text.starts_with(prefix.as_str()) {
                    return None;
                }
                let end = text.find('\n').map_or(text.len(), |pos| pos + 1);
                Some(Span::new(0, end))
            }
            Self::Leading { prefix } => {
                if !text.starts_with(prefix.as_str()) {
                    return None;
                }
                prose_lines(text)
                    .find(|line| is_separator(line.text))
                    .map(|line| Span::new(0, line.end))
            }
            Self::Section { heading } => locate_section(text, heading),
        }
    }
}

/// Deletes anchored regions from a document, one anchor at a time.
///
/// Each anchor is located against the output of the previous one, so no
/// span is ever applied to a buffer generation it was not computed from.
///
/// # Example
///
/// ```
/// use folio_text::{Anchor, FrontMatterStripper};
///
/// let stripper = FrontMatterStripper::new()
///     .with_anchor(Anchor::leading(""))
///     .with_anchor(Anchor::section("## Abstract"));
///
/// let doc = "# Title\nby Someone\n---\n## Abstract\n\nShort.\n\n## Introduction\nBody\n";
/// assert_eq!(stripper.strip(doc).unwrap(), "## Introduction\nBody\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrontMatterStripper {
    anchors: Vec<Anchor>,
}

impl FrontMatterStripper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an anchor. Anchors are applied in insertion order.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchors.push(anchor);
        self
    }

    #[must_use]
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Remove every anchored region from `text`. Missing anchors are skipped.
    pub fn strip(&self, text: &str) -> Result<String, SpliceError> {
        let mut current = text.to_owned();
        for anchor in &self.anchors {
            match anchor.locate(&current) {
                Some(span) => {
                    tracing::debug!(?anchor, start = span.start, end = span.end, "Stripping region");
                    current = splice(&current, &[Replacement::deletion(span)])?;
                }
                None => tracing::debug!(?anchor, "Anchor not found, skipping"),
            }
        }
        Ok(current)
    }
}

/// A line of three or more `-` with optional trailing whitespace.
fn is_separator(line: &str) -> bool {
    let line = line.trim_end();
    line.len() >= 3 && line.bytes().all(|b| b == b'-')
}

/// ATX heading level (1-6) of `line`, if it is a heading.
fn heading_level(line: &str) -> Option<usize> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    (rest.is_empty() || rest.starts_with([' ', '\t'])).then_some(hashes)
}

fn locate_section(text: &str, heading: &str) -> Option<Span> {
    let heading = heading.trim();
    let level = heading_level(heading)?;

    let mut lines = prose_lines(text);
    let start = lines.find(|line| line.text.trim_end() == heading)?.start;
    let end = lines
        .find(|line| heading_level(line.text).is_some_and(|l| l <= level))
        .map_or(text.len(), |line| line.start);

    Some(Span::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAPER: &str = "\
# DANEEL: A Paper
**Author Name**
Affiliation
---
## Abstract

We present things.

## 1. Introduction

Body text.
";

    #[test]
    fn test_title_line() {
        let span = Anchor::title_line("# DANEEL:").locate(PAPER).unwrap();
        assert_eq!(span.get(PAPER), Some("# DANEEL: A Paper\n"));
    }

    #[test]
    fn test_title_line_prefix_mismatch() {
        assert_eq!(Anchor::title_line("# Other").locate(PAPER), None);
    }

    #[test]
    fn test_leading_region() {
        let span = Anchor::leading("").locate(PAPER).unwrap();
        assert_eq!(
            span.get(PAPER),
            Some("# DANEEL: A Paper\n**Author Name**\nAffiliation\n---\n")
        );
    }

    #[test]
    fn test_leading_requires_prefix() {
        assert_eq!(Anchor::leading("**Author").locate(PAPER), None);
        let stripped = &PAPER["# DANEEL: A Paper\n".len()..];
        assert!(Anchor::leading("**Author").locate(stripped).is_some());
    }

    #[test]
    fn test_leading_is_single_shot() {
        let text = "head\n---\nmiddle\n---\ntail\n";
        let out = FrontMatterStripper::new()
            .with_anchor(Anchor::leading(""))
            .strip(text)
            .unwrap();
        assert_eq!(out, "middle\n---\ntail\n");
    }

    #[test]
    fn test_leading_ignores_inline_dashes() {
        let text = "a -- b --- c\n----  \nrest";
        let span = Anchor::leading("").locate(text).unwrap();
        assert_eq!(span.get(text), Some("a -- b --- c\n----  \n"));
    }

    #[test]
    fn test_section_until_same_level() {
        let span = Anchor::section("## Abstract").locate(PAPER).unwrap();
        assert_eq!(span.get(PAPER), Some("## Abstract\n\nWe present things.\n\n"));
    }

    #[test]
    fn test_section_keeps_lower_level_headings() {
        let text = "## Abstract\nA\n### Detail\nB\n# Part\nC\n";
        let span = Anchor::section("## Abstract").locate(text).unwrap();
        assert_eq!(span.get(text), Some("## Abstract\nA\n### Detail\nB\n"));
    }

    #[test]
    fn test_section_to_end_of_document() {
        let text = "## Intro\nx\n## Abstract\nlast words";
        let span = Anchor::section("## Abstract").locate(text).unwrap();
        assert_eq!(span.get(text), Some("## Abstract\nlast words"));
    }

    #[test]
    fn test_section_headings_in_code_ignored() {
        let text = "## Abstract\n```sh\n## not a heading\n```\nmore\n## Next\n";
        let span = Anchor::section("## Abstract").locate(text).unwrap();
        assert_eq!(
            span.get(text),
            Some("## Abstract\n```sh\n## not a heading\n```\nmore\n")
        );
    }

    #[test]
    fn test_section_requires_exact_heading() {
        assert_eq!(Anchor::section("## Abstracts").locate(PAPER), None);
        assert_eq!(Anchor::section("not a heading").locate(PAPER), None);
    }

    #[test]
    fn test_strip_no_match_is_noop() {
        let text = "# Plain\n\nNo front matter here.\n";
        let stripper = FrontMatterStripper::new()
            .with_anchor(Anchor::title_line("# DANEEL:"))
            .with_anchor(Anchor::section("## Abstract"));
        assert_eq!(stripper.strip(text).unwrap(), text);
    }

    #[test]
    fn test_strip_full_front_matter() {
        let stripper = FrontMatterStripper::new()
            .with_anchor(Anchor::title_line("# DANEEL:"))
            .with_anchor(Anchor::leading("**Author"))
            .with_anchor(Anchor::section("## Abstract"));

        assert_eq!(
            stripper.strip(PAPER).unwrap(),
            "## 1. Introduction\n\nBody text.\n"
        );
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(heading_level("# A"), Some(1));
        assert_eq!(heading_level("###"), Some(3));
        assert_eq!(heading_level("#hashtag"), None);
        assert_eq!(heading_level("####### seven"), None);
        assert_eq!(heading_level("plain"), None);
    }
}
