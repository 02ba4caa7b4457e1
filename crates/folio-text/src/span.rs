//! Half-open byte ranges into a single buffer generation.

use std::ops::Range;

/// Half-open byte range `start..end` into a specific text buffer.
///
/// A span is only meaningful against the buffer it was computed from.
/// Applying a span from an earlier generation is a contract violation that
/// the splice engine can only partially detect (bounds and char boundaries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    /// Inclusive start offset in bytes.
    pub start: usize,
    /// Exclusive end offset in bytes.
    pub end: usize,
}

impl Span {
    /// Create a span. `start` must not exceed `end`.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} exceeds end {end}");
        Self { start, end }
    }

    /// Empty span at `offset` (an insertion point).
    #[must_use]
    pub fn empty(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub fn range(self) -> Range<usize> {
        self.start..self.end
    }

    /// Borrow the covered text, or `None` if the span does not fit `text`
    /// or splits a UTF-8 sequence.
    #[must_use]
    pub fn get(self, text: &str) -> Option<&str> {
        text.get(self.range())
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_empty() {
        let span = Span::new(3, 7);
        assert_eq!(span.len(), 4);
        assert!(!span.is_empty());
        assert!(Span::empty(5).is_empty());
    }

    #[test]
    fn test_get_within_bounds() {
        let span = Span::from(6..11);
        assert_eq!(span.get("hello world"), Some("world"));
    }

    #[test]
    fn test_get_out_of_bounds() {
        assert_eq!(Span::new(2, 20).get("short"), None);
    }

    #[test]
    fn test_get_splits_char() {
        // "é" is two bytes; offset 1 falls inside it
        assert_eq!(Span::new(1, 2).get("é"), None);
    }

    #[test]
    fn test_ordering_by_start() {
        let mut spans = vec![Span::new(10, 12), Span::new(0, 4), Span::new(5, 5)];
        spans.sort();
        assert_eq!(spans, vec![Span::new(0, 4), Span::new(5, 5), Span::new(10, 12)]);
    }
}
