//! Bare URL wrapping for LaTeX line breaking.
//!
//! Wraps `http://` and `https://` URLs that are not already part of markup
//! in a wrap marker (by default `\url{...}`), leaving trailing sentence
//! punctuation outside the marker.

use std::sync::LazyLock;

use regex::Regex;

use crate::span::Span;
use crate::splice::{Replacement, SpliceError, splice};

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<>)\]}]+").unwrap());

/// Characters that mark a URL as already enclosed by markup.
const ENCLOSING_CHARS: [char; 5] = ['(', '[', '{', '"', '\''];

/// Trailing characters trimmed off a URL and re-emitted after the marker.
const TRAILING_PUNCTUATION: [char; 7] = ['.', ',', ';', ':', '!', '?', ')'];

/// Wraps bare URLs in an open/close marker pair.
///
/// Wrapping is idempotent: a URL directly after the open marker is left
/// alone.
///
/// # Example
///
/// ```
/// use folio_text::UrlWrapper;
///
/// let wrapper = UrlWrapper::latex();
/// let out = wrapper.wrap("See https://x.com/a, and https://y.com/b.").unwrap();
/// assert_eq!(out, r"See \url{https://x.com/a}, and \url{https://y.com/b}.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlWrapper {
    open: String,
    close: String,
}

impl Default for UrlWrapper {
    fn default() -> Self {
        Self::latex()
    }
}

impl UrlWrapper {
    /// Wrapper with a custom marker pair.
    #[must_use]
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// LaTeX `\url{...}` wrapper.
    #[must_use]
    pub fn latex() -> Self {
        Self::new(r"\url{", "}")
    }

    /// Compute one replacement per bare URL in `text`, in document order.
    #[must_use]
    pub fn replacements(&self, text: &str) -> Vec<Replacement> {
        URL_PATTERN
            .find_iter(text)
            .filter(|m| !self.is_enclosed(&text[..m.start()]))
            .filter_map(|m| {
                let (url, trailing) = split_trailing(m.as_str());
                (!url.is_empty()).then(|| {
                    Replacement::new(
                        Span::new(m.start(), m.end()),
                        format!("{}{url}{}{trailing}", self.open, self.close),
                    )
                })
            })
            .collect()
    }

    /// Wrap every bare URL in `text`.
    pub fn wrap(&self, text: &str) -> Result<String, SpliceError> {
        let replacements = self.replacements(text);
        tracing::debug!(count = replacements.len(), "Wrapping bare URLs");
        splice(text, &replacements)
    }

    fn is_enclosed(&self, before: &str) -> bool {
        before
            .chars()
            .next_back()
            .is_some_and(|c| ENCLOSING_CHARS.contains(&c))
            || (!self.open.is_empty() && before.ends_with(&self.open))
            || before.ends_with("](")
    }
}

/// Split `url` into the URL proper and its trailing punctuation.
fn split_trailing(url: &str) -> (&str, &str) {
    let trimmed = url.trim_end_matches(TRAILING_PUNCTUATION);
    url.split_at(trimmed.len())
}
