//! Pipeline driver.
//!
//! Composes the text stages in a fixed order:
//!
//! 1. extract diagram blocks
//! 2. resolve each block (static text, render job, deletion)
//! 3. render every render job, in parallel, before anything is spliced
//! 4. splice all replacements in one pass
//! 5. strip front matter
//! 6. wrap bare URLs
//! 7. optionally convert Unicode symbols to LaTeX
//!
//! A failed render degrades that one diagram to the placeholder text and is
//! recorded in the [`BuildReport`]. Structural errors abort the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use folio_config::{Config, FrontMatterConfig, RendererKind};
use folio_diagrams::{
    CommandRenderer, DiagramFormat, DiagramJob, DiagramLanguage, DiagramRenderer, RenderError,
    ServerRenderer, render_all,
};
use folio_text::{
    Anchor, Delimiters, DiagramBlock, FrontMatterStripper, Splice, UrlWrapper, extract_blocks,
};

use crate::error::BuildError;
use crate::resolve::{DiagramSource, RenderJob, Resolution, ResolutionTable};
use crate::tex;

/// Default text for diagrams that could not be rendered.
pub const DEFAULT_PLACEHOLDER: &str = "[Diagram placeholder]";

/// What happened to one diagram block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramOutcome {
    /// Replaced with static text.
    Static,
    /// Removed.
    Deleted,
    /// Rendered and embedded; `path` is the image reference target.
    Rendered { path: String },
    /// Rendering failed; the placeholder was used.
    Failed { error: String },
    /// No renderer configured; the placeholder was used.
    Unrendered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramReport {
    pub sequence: usize,
    pub outcome: DiagramOutcome,
}

/// Per-diagram outcomes in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub diagrams: Vec<DiagramReport>,
}

impl BuildReport {
    #[must_use]
    pub fn rendered(&self) -> usize {
        self.count(|o| matches!(o, DiagramOutcome::Rendered { .. }))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DiagramOutcome::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&DiagramOutcome) -> bool) -> usize {
        self.diagrams.iter().filter(|d| predicate(&d.outcome)).count()
    }
}

/// Result of [`Pipeline::run`].
#[derive(Debug)]
pub struct PipelineOutput {
    pub text: String,
    pub report: BuildReport,
}

/// Markdown-to-markdown document transformation.
pub struct Pipeline {
    delimiters: Delimiters,
    table: ResolutionTable,
    renderer: Option<Box<dyn DiagramRenderer>>,
    placeholder: String,
    image_dir: String,
    image_width: String,
    output_dir: Option<PathBuf>,
    stripper: FrontMatterStripper,
    url_wrapper: Option<UrlWrapper>,
    convert_unicode: bool,
}

impl Pipeline {
    /// Pipeline for blocks matched by `delimiters`, with an empty table and no
    /// renderer.
    #[must_use]
    pub fn new(delimiters: Delimiters) -> Self {
        Self {
            delimiters,
            table: ResolutionTable::default(),
            renderer: None,
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
            image_dir: "diagrams".to_owned(),
            image_width: "85%".to_owned(),
            output_dir: None,
            stripper: FrontMatterStripper::new(),
            url_wrapper: Some(UrlWrapper::latex()),
            convert_unicode: false,
        }
    }

    /// Pipeline configured from `folio.toml`.
    pub fn from_config(config: &Config) -> Result<Self, BuildError> {
        let diagrams = &config.diagrams;
        let format = DiagramFormat::parse(&diagrams.format).unwrap_or_default();
        let timeout = Duration::from_secs(config.render_timeout_secs());

        let renderer: Option<Box<dyn DiagramRenderer>> = match diagrams.renderer {
            RendererKind::Server => Some(Box::new(
                ServerRenderer::new(&diagrams.server_url)
                    .with_format(format)
                    .with_timeout(timeout),
            )),
            RendererKind::Command => {
                let language = DiagramLanguage::parse(&diagrams.language).unwrap_or_else(|| {
                    tracing::warn!(language = %diagrams.language, "Unknown diagram language, treating as mermaid");
                    DiagramLanguage::default()
                });
                let mut renderer = CommandRenderer::new(&diagrams.command)
                    .with_language(language)
                    .with_format(format)
                    .with_timeout(timeout);
                if let Some(args) = &diagrams.command_args {
                    renderer = renderer.with_args(args.clone());
                }
                Some(Box::new(renderer))
            }
            RendererKind::None => None,
        };

        let url_wrapper = config
            .urls
            .wrap
            .then(|| UrlWrapper::new(&config.urls.marker_open, &config.urls.marker_close));

        let mut pipeline = Self::new(Delimiters::fence(&diagrams.language)?)
            .with_table(ResolutionTable::from_config(diagrams)?)
            .with_placeholder(&diagrams.placeholder)
            .with_image_dir(&diagrams.dir)
            .with_image_width(&diagrams.width)
            .with_output_dir(&config.document_resolved.output_dir)
            .with_front_matter(stripper_from_config(&config.front_matter))
            .with_url_wrapper(url_wrapper)
            .with_unicode_conversion(config.latex.convert_unicode);
        pipeline.renderer = renderer;
        Ok(pipeline)
    }

    #[must_use]
    pub fn with_table(mut self, table: ResolutionTable) -> Self {
        self.table = table;
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn DiagramRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Image directory, relative to the output directory and used verbatim
    /// in image references.
    #[must_use]
    pub fn with_image_dir(mut self, dir: impl Into<String>) -> Self {
        self.image_dir = dir.into();
        self
    }

    /// `{width=...}` attribute value. Empty omits the attribute.
    #[must_use]
    pub fn with_image_width(mut self, width: impl Into<String>) -> Self {
        self.image_width = width.into();
        self
    }

    /// Directory rendered images are written under. Without one, images are
    /// referenced but not written.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_front_matter(mut self, stripper: FrontMatterStripper) -> Self {
        self.stripper = stripper;
        self
    }

    #[must_use]
    pub fn with_url_wrapper(mut self, wrapper: Option<UrlWrapper>) -> Self {
        self.url_wrapper = wrapper;
        self
    }

    #[must_use]
    pub fn with_unicode_conversion(mut self, enabled: bool) -> Self {
        self.convert_unicode = enabled;
        self
    }

    /// Transform `text`.
    pub fn run(&self, text: &str) -> Result<PipelineOutput, BuildError> {
        let blocks = extract_blocks(text, &self.delimiters)?;
        tracing::info!(count = blocks.len(), "Extracted diagram blocks");

        let plans: Vec<Resolution> = blocks
            .iter()
            .map(|block| self.table.resolve(block.sequence, &self.placeholder))
            .collect();

        let mut renders = self.render_jobs(&blocks, &plans);

        let mut splice = Splice::with_capacity(blocks.len());
        let mut report = BuildReport::default();
        for (block, plan) in blocks.iter().zip(&plans) {
            let (replacement, outcome) = match plan {
                Resolution::Static(text) => (text.clone(), DiagramOutcome::Static),
                Resolution::Delete => (String::new(), DiagramOutcome::Deleted),
                Resolution::Render(job) => {
                    self.embed(block.sequence, job, renders.remove(&block.sequence))?
                }
            };
            splice.replace(block.span, replacement);
            report.diagrams.push(DiagramReport {
                sequence: block.sequence,
                outcome,
            });
        }

        let text = splice.apply(text)?;
        let text = self.stripper.strip(&text)?;
        let text = match &self.url_wrapper {
            Some(wrapper) => wrapper.wrap(&text)?,
            None => text,
        };
        let text = if self.convert_unicode {
            tex::convert_unicode(&text).into_owned()
        } else {
            text
        };

        tracing::info!(
            rendered = report.rendered(),
            failed = report.failed(),
            "Pipeline finished"
        );
        Ok(PipelineOutput { text, report })
    }

    /// Render every render job, keyed by sequence number.
    fn render_jobs(
        &self,
        blocks: &[DiagramBlock],
        plans: &[Resolution],
    ) -> HashMap<usize, Result<Vec<u8>, RenderError>> {
        let Some(renderer) = &self.renderer else {
            return HashMap::new();
        };

        let jobs: Vec<DiagramJob> = blocks
            .iter()
            .zip(plans)
            .filter_map(|(block, plan)| match plan {
                Resolution::Render(job) => {
                    let source = match &job.source {
                        DiagramSource::Block => block.content.clone(),
                        DiagramSource::Inline(source) => source.clone(),
                    };
                    Some(DiagramJob::new(block.sequence, source))
                }
                Resolution::Static(_) | Resolution::Delete => None,
            })
            .collect();

        let result = render_all(&jobs, renderer.as_ref());
        result
            .rendered
            .into_iter()
            .map(|r| (r.sequence, Ok(r.bytes)))
            .chain(result.errors.into_iter().map(|e| (e.sequence, Err(e.kind))))
            .collect()
    }

    /// Replacement text for a render job.
    fn embed(
        &self,
        sequence: usize,
        job: &RenderJob,
        render: Option<Result<Vec<u8>, RenderError>>,
    ) -> Result<(String, DiagramOutcome), BuildError> {
        let (Some(renderer), Some(render)) = (&self.renderer, render) else {
            tracing::warn!(sequence, "No renderer configured, using placeholder");
            return Ok((self.placeholder.clone(), DiagramOutcome::Unrendered));
        };

        let bytes = match render {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(sequence, error = %e, "Diagram render failed, using placeholder");
                return Ok((
                    self.placeholder.clone(),
                    DiagramOutcome::Failed {
                        error: e.to_string(),
                    },
                ));
            }
        };

        let name = format!("diagram_{sequence}.{}", renderer.format().as_str());
        if let Some(output_dir) = &self.output_dir {
            write_image(&output_dir.join(&self.image_dir), &name, &bytes)?;
        }

        let path = if self.image_dir.is_empty() {
            name
        } else {
            format!("{}/{name}", self.image_dir.trim_end_matches('/'))
        };
        let reference = image_reference(&job.caption_for(sequence), &path, &self.image_width);
        tracing::debug!(sequence, path = %path, "Embedded rendered diagram");
        Ok((reference, DiagramOutcome::Rendered { path }))
    }
}

fn write_image(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), BuildError> {
    std::fs::create_dir_all(dir).map_err(|source| BuildError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(name);
    std::fs::write(&path, bytes).map_err(|source| BuildError::Write { path, source })
}

/// `![caption](path){width=...}`.
#[must_use]
pub fn image_reference(caption: &str, path: &str, width: &str) -> String {
    if width.is_empty() {
        format!("![{caption}]({path})")
    } else {
        format!("![{caption}]({path}){{width={width}}}")
    }
}

/// Anchors in application order: title line, leading block, then sections.
#[must_use]
pub fn stripper_from_config(config: &FrontMatterConfig) -> FrontMatterStripper {
    let mut stripper = FrontMatterStripper::new();
    if let Some(prefix) = &config.title_prefix {
        stripper = stripper.with_anchor(Anchor::title_line(prefix));
    }
    if let Some(prefix) = &config.leading_prefix {
        stripper = stripper.with_anchor(Anchor::leading(prefix));
    }
    for heading in &config.sections {
        stripper = stripper.with_anchor(Anchor::section(heading));
    }
    stripper
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::resolve::Fallback;
    use pretty_assertions::assert_eq;

    /// Returns the source as image bytes and records what it was asked to render.
    #[derive(Default)]
    struct RecordingRenderer {
        seen: Mutex<Vec<String>>,
    }

    impl DiagramRenderer for RecordingRenderer {
        fn render(&self, source: &str) -> Result<Vec<u8>, RenderError> {
            self.seen.lock().unwrap().push(source.to_owned());
            if source.contains("broken") {
                return Err(RenderError::Rejected {
                    status: 400,
                    body: "syntax error".to_owned(),
                });
            }
            Ok(source.as_bytes().to_vec())
        }

        fn format(&self) -> DiagramFormat {
            DiagramFormat::Png
        }
    }

    const PAPER: &str = "\
# DANEEL: Architecture
**Author**
---
## Abstract

Summary.

## 1. Introduction

See https://example.org/a, first.

```mermaid
graph TD; A-->B
```

Middle text.

```mermaid
graph LR; C-->D
```

```mermaid
flowchart TB; E-->F
```

Between.
```mermaid
graph TD; G-->H
```
End.
";

    fn mermaid() -> Delimiters {
        Delimiters::fence("mermaid").unwrap()
    }

    fn paper_stripper() -> FrontMatterStripper {
        FrontMatterStripper::new()
            .with_anchor(Anchor::title_line("# DANEEL:"))
            .with_anchor(Anchor::leading("**Author"))
            .with_anchor(Anchor::section("## Abstract"))
    }

    #[test]
    fn test_static_table_end_to_end() {
        let table = (1..=4).fold(ResolutionTable::new(Fallback::Delete), |table, n| {
            table.with(n, Resolution::Static(format!("<figure {n}>")))
        });

        let output = Pipeline::new(mermaid())
            .with_table(table)
            .with_front_matter(paper_stripper())
            .run(PAPER)
            .unwrap();

        assert_eq!(
            output.text,
            "\
## 1. Introduction

See \\url{https://example.org/a}, first.

<figure 1>

Middle text.

<figure 2>

<figure 3>

Between.
<figure 4>
End.
"
        );
        assert!(
            output
                .report
                .diagrams
                .iter()
                .all(|d| d.outcome == DiagramOutcome::Static)
        );
        let sequences: Vec<_> = output.report.diagrams.iter().map(|d| d.sequence).collect();
        assert_eq!(sequences, [1, 2, 3, 4]);
    }

    #[test]
    fn test_identity_without_blocks_or_anchors() {
        let text = "# Plain\n\nNo diagrams, no links.\n";
        let output = Pipeline::new(mermaid()).run(text).unwrap();
        assert_eq!(output.text, text);
        assert!(output.report.diagrams.is_empty());
    }

    #[test]
    fn test_unlisted_blocks_use_placeholder_without_renderer() {
        let text = "a\n```mermaid\nx\n```\nb\n";
        let table = ResolutionTable::new(Fallback::RenderBlock);
        let output = Pipeline::new(mermaid())
            .with_table(table)
            .with_placeholder("[missing]")
            .run(text)
            .unwrap();
        assert_eq!(output.text, "a\n[missing]\nb\n");
        assert_eq!(output.report.diagrams[0].outcome, DiagramOutcome::Unrendered);
    }

    #[test]
    fn test_render_and_write_images() {
        let dir = tempfile::tempdir().unwrap();
        let table = ResolutionTable::new(Fallback::RenderBlock)
            .with(
                2,
                Resolution::Render(
                    RenderJob::inline("@startuml\nA -> B\n@enduml").with_caption("Loop"),
                ),
            )
            .with(3, Resolution::Delete);

        let output = Pipeline::new(mermaid())
            .with_table(table)
            .with_renderer(Box::new(RecordingRenderer::default()))
            .with_output_dir(dir.path())
            .with_url_wrapper(None)
            .run(PAPER)
            .unwrap();

        assert!(output.text.contains(
            "![Diagram 1](diagrams/diagram_1.png){width=85%}\n\nMiddle text.\n\n![Loop](diagrams/diagram_2.png){width=85%}\n\n\n\nBetween.\n![Diagram 4](diagrams/diagram_4.png){width=85%}\nEnd.\n"
        ));
        assert!(output.text.contains("See https://example.org/a, first."));

        let image = std::fs::read(dir.path().join("diagrams/diagram_2.png")).unwrap();
        assert_eq!(image, b"@startuml\nA -> B\n@enduml");
        let image = std::fs::read(dir.path().join("diagrams/diagram_1.png")).unwrap();
        assert_eq!(image, b"graph TD; A-->B\n");
        assert!(!dir.path().join("diagrams/diagram_3.png").exists());

        assert_eq!(output.report.rendered(), 3);
        assert_eq!(output.report.diagrams[2].outcome, DiagramOutcome::Deleted);
    }

    #[test]
    fn test_render_failure_falls_back_per_diagram() {
        let text = "```mermaid\nok\n```\n```mermaid\nbroken\n```\n";
        let output = Pipeline::new(mermaid())
            .with_table(ResolutionTable::new(Fallback::RenderBlock))
            .with_renderer(Box::new(RecordingRenderer::default()))
            .with_image_width("")
            .run(text)
            .unwrap();

        assert_eq!(
            output.text,
            "![Diagram 1](diagrams/diagram_1.png)\n[Diagram placeholder]\n"
        );
        assert_eq!(output.report.rendered(), 1);
        assert_eq!(output.report.failed(), 1);
        assert_eq!(
            output.report.diagrams[1].outcome,
            DiagramOutcome::Failed {
                error: "rejected with HTTP 400: syntax error".to_owned()
            }
        );
    }

    struct Shared(Arc<RecordingRenderer>);

    impl DiagramRenderer for Shared {
        fn render(&self, source: &str) -> Result<Vec<u8>, RenderError> {
            self.0.render(source)
        }

        fn format(&self) -> DiagramFormat {
            self.0.format()
        }
    }

    #[test]
    fn test_static_and_deleted_blocks_are_not_rendered() {
        let renderer = Arc::new(RecordingRenderer::default());
        let table = ResolutionTable::new(Fallback::Delete)
            .with(1, Resolution::Static("s".to_owned()))
            .with(3, Resolution::Render(RenderJob::block()));
        Pipeline::new(mermaid())
            .with_table(table)
            .with_renderer(Box::new(Shared(Arc::clone(&renderer))))
            .run(PAPER)
            .unwrap();

        assert_eq!(*renderer.seen.lock().unwrap(), ["flowchart TB; E-->F\n"]);
    }

    #[test]
    fn test_malformed_block_aborts() {
        let text = "ok\n```mermaid\nnever closed\n";
        let err = Pipeline::new(mermaid()).run(text).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Extract(folio_text::ExtractError::MalformedBlock { sequence: 1, .. })
        ));
    }

    #[test]
    fn test_unicode_conversion_last() {
        let text = "x → y\n```mermaid\nA --> B\n```\n";
        let output = Pipeline::new(mermaid())
            .with_table(ResolutionTable::new(Fallback::Placeholder))
            .with_placeholder("σ")
            .with_unicode_conversion(true)
            .run(text)
            .unwrap();
        assert_eq!(output.text, "x $\\rightarrow$ y\n$\\sigma$\n");
    }

    #[test]
    fn test_image_reference() {
        assert_eq!(
            image_reference("Diagram 1", "diagrams/diagram_1.png", "85%"),
            "![Diagram 1](diagrams/diagram_1.png){width=85%}"
        );
        assert_eq!(image_reference("c", "p.svg", ""), "![c](p.svg)");
    }

    #[test]
    fn test_stripper_from_config() {
        let config = FrontMatterConfig {
            title_prefix: Some("# DANEEL:".to_owned()),
            leading_prefix: Some("**Author".to_owned()),
            sections: vec!["## Abstract".to_owned()],
        };
        assert_eq!(stripper_from_config(&config).anchors(), paper_stripper().anchors());
    }

    #[test]
    fn test_from_config_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("folio.toml");
        std::fs::write(
            &config_path,
            r###"
[diagrams]
renderer = "none"
unlisted = "delete"

[[diagrams.figures]]
sequence = 2
text = "(ascii art)"

[front_matter]
sections = ["## Abstract"]

[urls]
marker_open = "<"
marker_close = ">"
"###,
        )
        .unwrap();
        let config = Config::load(Some(&config_path), None).unwrap();

        let text = "## Abstract\nx\n## Body\n```mermaid\na\n```\n```mermaid\nb\n```\nhttps://a.org\n";
        let output = Pipeline::from_config(&config).unwrap().run(text).unwrap();
        assert_eq!(output.text, "## Body\n\n(ascii art)\n<https://a.org>\n");
    }
}
