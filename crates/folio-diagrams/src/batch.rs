//! Parallel diagram rendering with partial failure support.

use rayon::prelude::*;

use crate::render::{DiagramRenderer, RenderError};

/// A diagram to render, tagged with its document sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramJob {
    pub sequence: usize,
    pub source: String,
}

impl DiagramJob {
    pub fn new(sequence: usize, source: impl Into<String>) -> Self {
        Self {
            sequence,
            source: source.into(),
        }
    }
}

/// Image bytes for one job.
#[derive(Debug)]
pub struct RenderedDiagram {
    pub sequence: usize,
    pub bytes: Vec<u8>,
}

/// Single diagram rendering error.
#[derive(Debug, thiserror::Error)]
#[error("diagram {sequence}: {kind}")]
pub struct DiagramError {
    pub sequence: usize,
    pub kind: RenderError,
}

/// Result of rendering diagrams with partial failures.
#[derive(Debug)]
pub struct PartialRenderResult<T> {
    /// Successfully rendered diagrams, in job order.
    pub rendered: Vec<T>,
    /// Errors for diagrams that failed to render, in job order.
    pub errors: Vec<DiagramError>,
}

impl<T> PartialRenderResult<T> {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Render all jobs in parallel on the global rayon pool.
///
/// Every job is attempted exactly once. Results keep job order regardless of
/// completion order.
#[must_use]
pub fn render_all(
    jobs: &[DiagramJob],
    renderer: &dyn DiagramRenderer,
) -> PartialRenderResult<RenderedDiagram> {
    if jobs.is_empty() {
        return PartialRenderResult {
            rendered: Vec::new(),
            errors: Vec::new(),
        };
    }

    tracing::info!(count = jobs.len(), "Rendering diagrams");

    let results: Vec<Result<RenderedDiagram, DiagramError>> = jobs
        .par_iter()
        .map(|job| {
            renderer
                .render(&job.source)
                .map(|bytes| RenderedDiagram {
                    sequence: job.sequence,
                    bytes,
                })
                .map_err(|kind| DiagramError {
                    sequence: job.sequence,
                    kind,
                })
        })
        .collect();

    partition_results(results)
}

/// Partition results into successes and failures.
fn partition_results<T>(results: Vec<Result<T, DiagramError>>) -> PartialRenderResult<T> {
    let mut rendered = Vec::with_capacity(results.len());
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(item) => rendered.push(item),
            Err(error) => errors.push(error),
        }
    }

    PartialRenderResult { rendered, errors }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::language::DiagramFormat;

    /// Echoes the source; sources starting with `fail` are rejected.
    #[derive(Default)]
    struct EchoRenderer {
        calls: AtomicUsize,
    }

    impl DiagramRenderer for EchoRenderer {
        fn render(&self, source: &str) -> Result<Vec<u8>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = source.strip_prefix("sleep ") {
                std::thread::sleep(Duration::from_millis(delay.parse().unwrap()));
            }
            if source.starts_with("fail") {
                return Err(RenderError::Rejected {
                    status: 400,
                    body: source.to_owned(),
                });
            }
            Ok(source.as_bytes().to_vec())
        }

        fn format(&self) -> DiagramFormat {
            DiagramFormat::Png
        }
    }

    #[test]
    fn test_empty_jobs() {
        let renderer = EchoRenderer::default();
        let result = render_all(&[], &renderer);
        assert!(result.rendered.is_empty());
        assert!(result.is_complete());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_partial_failures() {
        let renderer = EchoRenderer::default();
        let jobs = [
            DiagramJob::new(1, "a"),
            DiagramJob::new(2, "fail b"),
            DiagramJob::new(3, "c"),
        ];
        let result = render_all(&jobs, &renderer);

        let sequences: Vec<_> = result.rendered.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, [1, 3]);
        assert_eq!(result.rendered[1].bytes, b"c");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].sequence, 2);
        assert_eq!(
            result.errors[0].to_string(),
            "diagram 2: rejected with HTTP 400: fail b"
        );
    }

    #[test]
    fn test_order_independent_of_completion() {
        let renderer = EchoRenderer::default();
        let jobs: Vec<_> = (1..=8)
            .map(|n| DiagramJob::new(n, format!("sleep {}", (9 - n) * 10)))
            .collect();
        let result = render_all(&jobs, &renderer);

        let sequences: Vec<_> = result.rendered.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_each_job_attempted_once() {
        let renderer = EchoRenderer::default();
        let jobs: Vec<_> = (1..=5).map(|n| DiagramJob::new(n, "fail")).collect();
        let result = render_all(&jobs, &renderer);
        assert_eq!(result.errors.len(), 5);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 5);
    }
}
