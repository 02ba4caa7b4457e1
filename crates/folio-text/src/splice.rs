//! Single-pass multi-span replacement.
//!
//! The engine never edits a buffer in place. It reads the immutable source
//! once, copying the gaps between spans verbatim and emitting each
//! replacement's text at its span, so no running offset is ever needed:
//!
//! ```text
//! source:  [gap0][span0][gap1][span1][gap2]
//! output:  [gap0][text0][gap1][text1][gap2]
//! ```
//!
//! Replacements must arrive sorted by ascending `start` and must not
//! overlap. Violations are reported before any output is produced.

use crate::span::Span;

/// Text to emit in place of one span of the source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Region of the source buffer being replaced.
    pub span: Span,
    /// Text emitted instead of the region.
    pub text: String,
}

impl Replacement {
    #[must_use]
    pub fn new(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }

    /// Replacement that removes `span`.
    #[must_use]
    pub fn deletion(span: Span) -> Self {
        Self::new(span, String::new())
    }

    /// Change in buffer length caused by this replacement.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn length_delta(&self) -> isize {
        self.text.len() as isize - self.span.len() as isize
    }
}

/// Precondition violation detected by the splice engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpliceError {
    #[error("replacement {index} starts at byte {start}, before the previous replacement at byte {previous}")]
    UnsortedReplacements {
        index: usize,
        start: usize,
        previous: usize,
    },

    #[error("replacement {index} starts at byte {start}, inside the previous replacement ending at byte {previous_end}")]
    OverlappingReplacements {
        index: usize,
        start: usize,
        previous_end: usize,
    },

    #[error("replacement {index} span {start}..{end} exceeds buffer length {len}")]
    SpanOutOfBounds {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("replacement {index} offset {offset} is not on a character boundary")]
    NotCharBoundary { index: usize, offset: usize },
}

/// Replace every span in `replacements` within `source` in a single pass.
///
/// The output length equals `source.len()` plus the sum of all
/// [`Replacement::length_delta`] values. An empty list returns a copy of
/// `source`.
///
/// # Example
///
/// ```
/// use folio_text::{Replacement, Span, splice};
///
/// let out = splice(
///     "one two three",
///     &[
///         Replacement::new(Span::new(0, 3), "1"),
///         Replacement::new(Span::new(8, 13), "three thousand"),
///     ],
/// )
/// .unwrap();
/// assert_eq!(out, "1 two three thousand");
/// ```
pub fn splice(source: &str, replacements: &[Replacement]) -> Result<String, SpliceError> {
    validate(source, replacements)?;

    let delta: isize = replacements.iter().map(Replacement::length_delta).sum();
    let mut output = String::with_capacity(source.len().saturating_add_signed(delta));
    let mut cursor = 0;

    for replacement in replacements {
        output.push_str(&source[cursor..replacement.span.start]);
        output.push_str(&replacement.text);
        cursor = replacement.span.end;
    }
    output.push_str(&source[cursor..]);

    Ok(output)
}

fn validate(source: &str, replacements: &[Replacement]) -> Result<(), SpliceError> {
    let mut previous: Option<Span> = None;

    for (index, replacement) in replacements.iter().enumerate() {
        let span = replacement.span;

        if span.start > span.end || span.end > source.len() {
            return Err(SpliceError::SpanOutOfBounds {
                index,
                start: span.start,
                end: span.end,
                len: source.len(),
            });
        }
        for offset in [span.start, span.end] {
            if !source.is_char_boundary(offset) {
                return Err(SpliceError::NotCharBoundary { index, offset });
            }
        }

        if let Some(prev) = previous {
            if span.start < prev.start {
                return Err(SpliceError::UnsortedReplacements {
                    index,
                    start: span.start,
                    previous: prev.start,
                });
            }
            if span.start < prev.end {
                return Err(SpliceError::OverlappingReplacements {
                    index,
                    start: span.start,
                    previous_end: prev.end,
                });
            }
        }
        previous = Some(span);
    }

    Ok(())
}

/// Collects replacements for one buffer generation and applies them at once.
///
/// Replacements must be added in document order; [`apply`](Self::apply)
/// does not sort them, so an out-of-order caller fails instead of silently
/// producing a different document.
///
/// Consumes itself on apply so spans cannot be reused against the next
/// generation.
///
/// # Example
///
/// ```
/// use folio_text::{Span, Splice};
///
/// let mut splice = Splice::new();
/// splice.delete(Span::new(0, 6));
/// splice.replace(Span::new(11, 12), "!");
/// assert_eq!(splice.apply("Hello world.").unwrap(), "world!");
/// ```
#[derive(Debug, Default)]
pub struct Splice {
    items: Vec<Replacement>,
}

impl Splice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Register `text` to be emitted in place of `span`.
    pub fn replace(&mut self, span: Span, text: impl Into<String>) {
        self.items.push(Replacement::new(span, text));
    }

    /// Register removal of `span`.
    pub fn delete(&mut self, span: Span) {
        self.items.push(Replacement::deletion(span));
    }

    pub fn push(&mut self, replacement: Replacement) {
        self.items.push(replacement);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Registered replacements in insertion order.
    #[must_use]
    pub fn replacements(&self) -> &[Replacement] {
        &self.items
    }

    /// Apply all registered replacements to `source`.
    pub fn apply(self, source: &str) -> Result<String, SpliceError> {
        splice(source, &self.items)
    }
}

impl Extend<Replacement> for Splice {
    fn extend<T: IntoIterator<Item = Replacement>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl FromIterator<Replacement> for Splice {
    fn from_iter<T: IntoIterator<Item = Replacement>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rep(start: usize, end: usize, text: &str) -> Replacement {
        Replacement::new(Span::new(start, end), text)
    }

    #[test]
    fn test_empty_list_is_identity() {
        let source = "unchanged ✓ text";
        assert_eq!(splice(source, &[]).unwrap(), source);
    }

    #[test]
    fn test_growing_and_shrinking_replacements() {
        let source = "aa BB cc DD ee";
        let replacements = [rep(3, 5, "bbbbbbbb"), rep(9, 11, "")];
        let out = splice(source, &replacements).unwrap();
        assert_eq!(out, "aa bbbbbbbb cc  ee");
    }

    #[test]
    fn test_output_length_is_sum_of_deltas() {
        let source = "0123456789";
        let replacements = [rep(0, 2, "abcdef"), rep(4, 8, "x"), rep(9, 10, "yz")];
        let out = splice(source, &replacements).unwrap();

        let delta: isize = replacements.iter().map(Replacement::length_delta).sum();
        assert_eq!(out.len(), source.len().checked_add_signed(delta).unwrap());
        assert_eq!(out, "abcdef23x8yz");
    }

    #[test]
    fn test_adjacent_spans() {
        let out = splice("abcd", &[rep(0, 2, "X"), rep(2, 4, "Y")]).unwrap();
        assert_eq!(out, "XY");
    }

    #[test]
    fn test_insertions_at_same_offset_keep_order() {
        let out = splice("ab", &[rep(1, 1, "1"), rep(1, 1, "2")]).unwrap();
        assert_eq!(out, "a12b");
    }

    #[test]
    fn test_unsorted_fails_fast() {
        let err = splice("0123456789", &[rep(6, 8, "x"), rep(1, 2, "y")]).unwrap_err();
        assert_eq!(
            err,
            SpliceError::UnsortedReplacements {
                index: 1,
                start: 1,
                previous: 6
            }
        );
    }

    #[test]
    fn test_overlapping_fails() {
        let err = splice("0123456789", &[rep(1, 5, "x"), rep(3, 7, "y")]).unwrap_err();
        assert!(matches!(
            err,
            SpliceError::OverlappingReplacements { index: 1, .. }
        ));
    }

    #[test]
    fn test_out_of_bounds_fails() {
        let err = splice("short", &[rep(2, 9, "x")]).unwrap_err();
        assert_eq!(
            err,
            SpliceError::SpanOutOfBounds {
                index: 0,
                start: 2,
                end: 9,
                len: 5
            }
        );
    }

    #[test]
    fn test_char_boundary_enforced() {
        let err = splice("→ arrow", &[rep(1, 3, "x")]).unwrap_err();
        assert_eq!(err, SpliceError::NotCharBoundary { index: 0, offset: 1 });
    }

    #[test]
    fn test_multibyte_replacements() {
        let source = "α β γ";
        // "β" occupies bytes 3..5
        let out = splice(source, &[rep(3, 5, "beta")]).unwrap();
        assert_eq!(out, "α beta γ");
    }

    #[test]
    fn test_length_delta() {
        assert_eq!(rep(0, 4, "ab").length_delta(), -2);
        assert_eq!(rep(0, 0, "abc").length_delta(), 3);
        assert_eq!(Replacement::deletion(Span::new(2, 7)).length_delta(), -5);
    }

    #[test]
    fn test_collector_apply() {
        let mut splice = Splice::with_capacity(2);
        assert!(splice.is_empty());
        splice.replace(Span::new(0, 1), "A");
        splice.delete(Span::new(2, 3));
        assert_eq!(splice.len(), 2);
        assert_eq!(splice.apply("a.b.").unwrap(), "A..");
    }

    #[test]
    fn test_collector_preserves_insertion_order() {
        let splice: Splice = [rep(5, 6, "x"), rep(0, 1, "y")].into_iter().collect();
        assert!(matches!(
            splice.apply("abcdefg"),
            Err(SpliceError::UnsortedReplacements { .. })
        ));
    }
}
