//! Diagram transport and rendering for Folio.
//!
//! - [`codec`]: compress-and-encode diagram source into the URL-safe token a
//!   `PlantUML`-compatible render server accepts, and the reverse
//! - [`request`]: `{server}/{format}/{token}` request URLs
//! - [`render`]: the `DiagramRenderer` trait with HTTP and local executable
//!   implementations
//! - [`batch`]: parallel rendering with partial results
//!
//! # Example
//!
//! ```
//! use folio_diagrams::{DiagramFormat, build_render_url, encode};
//!
//! let token = encode(b"Bob -> Alice : hello").unwrap();
//! let url = build_render_url("https://www.plantuml.com/plantuml", DiagramFormat::Png, &token);
//! assert!(url.starts_with("https://www.plantuml.com/plantuml/png/"));
//! ```

pub mod batch;
pub mod codec;
mod consts;
mod language;
pub mod render;
pub mod request;

pub use batch::{DiagramError, DiagramJob, PartialRenderResult, RenderedDiagram, render_all};
pub use codec::{ALPHABET, CodecError, decode, encode};
pub use consts::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_HTTP_TIMEOUT, DEFAULT_SERVER_URL};
pub use language::{DiagramFormat, DiagramLanguage};
pub use render::{
    CommandRenderer, DiagramRenderer, MERMAID_CLI_ARGS, RenderError, ServerRenderer, create_agent,
};
pub use request::{RenderRequest, build_render_url};
