//! Span-based text transformation for Folio.
//!
//! Every stage of the document build is a pure function from one buffer
//! generation to the next. Stages never edit a buffer while holding offsets
//! into it; they compute [`Span`]s against the current generation and hand
//! them to the splice engine, which copies the source once.
//!
//! # Modules
//!
//! - [`blocks`]: Diagram block extraction (`DiagramBlock`, `Delimiters`)
//! - [`splice`]: Single-pass multi-span replacement (`Replacement`, `Splice`)
//! - [`urls`]: Bare-URL wrapping for LaTeX line breaking (`UrlWrapper`)
//! - [`front_matter`]: Anchor-based region deletion (`FrontMatterStripper`)
//!
//! # Example
//!
//! ```
//! use folio_text::{Delimiters, Replacement, extract_blocks, splice};
//!
//! let text = "Intro\n```mermaid\ngraph TD\n```\nOutro\n";
//! let delimiters = Delimiters::fence("mermaid").unwrap();
//! let blocks = extract_blocks(text, &delimiters).unwrap();
//!
//! let replacements: Vec<_> = blocks
//!     .iter()
//!     .map(|b| Replacement::new(b.span, format!("[figure {}]", b.sequence)))
//!     .collect();
//!
//! assert_eq!(splice(text, &replacements).unwrap(), "Intro\n[figure 1]\nOutro\n");
//! ```

pub mod blocks;
mod fence;
pub mod front_matter;
mod span;
pub mod splice;
pub mod urls;

pub use blocks::{Delimiters, DiagramBlock, ExtractError, extract_blocks};
pub use front_matter::{Anchor, FrontMatterStripper};
pub use span::Span;
pub use splice::{Replacement, Splice, SpliceError, splice};
pub use urls::UrlWrapper;
