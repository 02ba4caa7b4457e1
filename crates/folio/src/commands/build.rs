//! `folio build` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use folio_build::compiler::request_for;
use folio_build::{BuildError, BuildReport, DiagramOutcome, DocumentCompiler, Pandoc, Pipeline};
use folio_config::{CliSettings, Config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Markdown source file (overrides config).
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Render server URL (overrides config).
    #[arg(long, env = "FOLIO_SERVER_URL")]
    server_url: Option<String>,

    /// Write the processed markdown without running the compiler.
    #[arg(long)]
    no_compile: bool,

    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl BuildArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source: self.source,
            output_dir: self.output_dir,
            server_url: self.server_url,
            compile: self.no_compile.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let document = &config.document_resolved;
        tracing::debug!(config = ?config.config_path, "Loaded configuration");

        output.info(&format!("Source: {}", document.source.display()));
        output.info(&format!("Output: {}", document.output_dir.display()));

        let text = std::fs::read_to_string(&document.source).map_err(|source| BuildError::Read {
            path: document.source.clone(),
            source,
        })?;

        let result = Pipeline::from_config(&config)?.run(&text)?;
        print_report(&output, &result.report);

        let processed = document.processed_path();
        write_file(&processed, &result.text)?;
        output.success(&format!("Wrote {}", processed.display()));

        if !config.compiler.enabled {
            return Ok(());
        }

        let mut request = request_for(&processed, &config.compiler_output());
        for (name, value) in config.metadata.variables() {
            request = request.with_variable(name, value);
        }
        for (name, value) in &config.compiler.variables {
            request = request.with_variable(name, value);
        }

        let compiled = Pandoc::from_config(&config.compiler).compile(&request)?;
        if !compiled.stderr.trim().is_empty() {
            output.warning(compiled.stderr.trim_end());
        }
        output.success(&format!("Compiled {}", request.output_path().display()));
        Ok(())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| BuildError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, contents).map_err(|source| BuildError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn print_report(output: &Output, report: &BuildReport) {
    for diagram in &report.diagrams {
        match &diagram.outcome {
            DiagramOutcome::Rendered { path } => {
                output.info(&format!("  diagram {} -> {path}", diagram.sequence));
            }
            DiagramOutcome::Failed { error } => output.warning(&format!(
                "  diagram {} failed, using placeholder: {error}",
                diagram.sequence
            )),
            DiagramOutcome::Unrendered => output.warning(&format!(
                "  diagram {} has no renderer, using placeholder",
                diagram.sequence
            )),
            DiagramOutcome::Static | DiagramOutcome::Deleted => {}
        }
    }
    output.info(&format!(
        "Diagrams: {} total, {} rendered, {} failed",
        report.diagrams.len(),
        report.rendered(),
        report.failed()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build/nested/paper_processed.md");
        write_file(&path, "body\n").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "body\n");
    }

    #[test]
    fn test_build_without_compiler() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("folio.toml"),
            r#"
[diagrams]
renderer = "none"

[[diagrams.figures]]
sequence = 1
text = "(figure)"
"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("paper.md"),
            "# Paper\n```mermaid\nA-->B\n```\nSee https://a.org.\n",
        )
        .unwrap();

        BuildArgs {
            source: None,
            output_dir: None,
            server_url: None,
            no_compile: true,
            config: Some(dir.path().join("folio.toml")),
        }
        .execute()
        .unwrap();

        let processed = std::fs::read_to_string(dir.path().join("build/paper_processed.md")).unwrap();
        assert_eq!(processed, "# Paper\n(figure)\nSee \\url{https://a.org}.\n");
    }
}
