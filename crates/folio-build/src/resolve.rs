//! Per-diagram resolution strategies.
//!
//! Every extracted block is resolved to exactly one [`Resolution`]: fixed
//! text, a render job, or deletion. The mapping is explicit, keyed by the
//! block's 1-based sequence number, with a [`Fallback`] for blocks the table
//! does not list.

use std::collections::BTreeMap;

use folio_config::{DiagramsConfig, UnlistedPolicy};

use crate::error::BuildError;

/// Where the diagram source of a render job comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramSource {
    /// The block's own content.
    Block,
    /// Replacement source, e.g. a `PlantUML` rewrite of a mermaid block.
    Inline(String),
}

/// A diagram to render and embed as an image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub source: DiagramSource,
    /// Image caption. Defaults to `Diagram {n}`.
    pub caption: Option<String>,
}

impl RenderJob {
    #[must_use]
    pub fn block() -> Self {
        Self {
            source: DiagramSource::Block,
            caption: None,
        }
    }

    #[must_use]
    pub fn inline(source: impl Into<String>) -> Self {
        Self {
            source: DiagramSource::Inline(source.into()),
            caption: None,
        }
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Caption for diagram `sequence`.
    #[must_use]
    pub fn caption_for(&self, sequence: usize) -> String {
        self.caption
            .clone()
            .unwrap_or_else(|| format!("Diagram {sequence}"))
    }
}

/// How one diagram block is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Literal replacement text.
    Static(String),
    /// Rendered image reference, or the placeholder if rendering fails.
    Render(RenderJob),
    /// Remove the block.
    Delete,
}

/// Resolution for blocks missing from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    Delete,
    #[default]
    Placeholder,
    RenderBlock,
}

impl From<UnlistedPolicy> for Fallback {
    fn from(policy: UnlistedPolicy) -> Self {
        match policy {
            UnlistedPolicy::Delete => Self::Delete,
            UnlistedPolicy::Placeholder => Self::Placeholder,
            UnlistedPolicy::Render => Self::RenderBlock,
        }
    }
}

/// Sequence number to resolution mapping.
#[derive(Debug, Clone, Default)]
pub struct ResolutionTable {
    entries: BTreeMap<usize, Resolution>,
    fallback: Fallback,
}

impl ResolutionTable {
    #[must_use]
    pub fn new(fallback: Fallback) -> Self {
        Self {
            entries: BTreeMap::new(),
            fallback,
        }
    }

    /// Set the resolution for diagram `sequence`, replacing any earlier one.
    #[must_use]
    pub fn with(mut self, sequence: usize, resolution: Resolution) -> Self {
        self.insert(sequence, resolution);
        self
    }

    pub fn insert(&mut self, sequence: usize, resolution: Resolution) {
        self.entries.insert(sequence, resolution);
    }

    #[must_use]
    pub fn get(&self, sequence: usize) -> Option<&Resolution> {
        self.entries.get(&sequence)
    }

    #[must_use]
    pub fn fallback(&self) -> Fallback {
        self.fallback
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolution for diagram `sequence`, applying the fallback when unlisted.
    #[must_use]
    pub fn resolve(&self, sequence: usize, placeholder: &str) -> Resolution {
        if let Some(resolution) = self.entries.get(&sequence) {
            return resolution.clone();
        }
        match self.fallback {
            Fallback::Delete => Resolution::Delete,
            Fallback::Placeholder => Resolution::Static(placeholder.to_owned()),
            Fallback::RenderBlock => Resolution::Render(RenderJob::block()),
        }
    }

    /// Build the table from `[[diagrams.figures]]`, reading any
    /// `source_file`.
    pub fn from_config(config: &DiagramsConfig) -> Result<Self, BuildError> {
        let mut table = Self::new(config.unlisted.into());

        for figure in &config.figures {
            let resolution = if figure.delete {
                Resolution::Delete
            } else if let Some(text) = &figure.text {
                Resolution::Static(text.clone())
            } else {
                let source = match (&figure.source, &figure.source_file) {
                    (Some(source), _) => source.clone(),
                    (None, Some(path)) => {
                        std::fs::read_to_string(path).map_err(|source| BuildError::Read {
                            path: path.clone(),
                            source,
                        })?
                    }
                    (None, None) => {
                        return Err(folio_config::ConfigError::Validation(format!(
                            "diagrams.figures: sequence {} has no resolution",
                            figure.sequence
                        ))
                        .into());
                    }
                };
                let mut job = RenderJob::inline(source);
                job.caption.clone_from(&figure.title);
                Resolution::Render(job)
            };
            table.insert(figure.sequence, resolution);
        }

        tracing::debug!(
            entries = table.len(),
            fallback = ?table.fallback,
            "Built resolution table"
        );
        Ok(table)
    }
}
