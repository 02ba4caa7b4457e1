//! Folio document build pipeline.
//!
//! Turns a markdown paper with embedded diagram blocks into processed
//! markdown ready for a document compiler:
//!
//! - [`pipeline`]: extraction, resolution, rendering, splicing and cleanup
//! - [`resolve`]: per-diagram resolution table
//! - [`compiler`]: `pandoc` invocation
//! - [`tex`]: post-processing of compiler-generated LaTeX
//!
//! # Example
//!
//! ```
//! use folio_build::{Fallback, Pipeline, Resolution, ResolutionTable};
//! use folio_text::Delimiters;
//!
//! let table = ResolutionTable::new(Fallback::Delete)
//!     .with(1, Resolution::Static("(figure)".to_owned()));
//! let pipeline = Pipeline::new(Delimiters::fence("mermaid").unwrap()).with_table(table);
//!
//! let output = pipeline.run("Intro\n```mermaid\nA-->B\n```\nEnd\n").unwrap();
//! assert_eq!(output.text, "Intro\n(figure)\nEnd\n");
//! ```

pub mod compiler;
mod error;
pub mod pipeline;
pub mod resolve;
pub mod tex;

pub use compiler::{CompileError, CompileOutput, CompileRequest, DocumentCompiler, Pandoc};
pub use error::BuildError;
pub use pipeline::{BuildReport, DiagramOutcome, DiagramReport, Pipeline, PipelineOutput};
pub use resolve::{DiagramSource, Fallback, RenderJob, Resolution, ResolutionTable};
pub use tex::{TexPatchOutput, TexPatcher, convert_unicode};
