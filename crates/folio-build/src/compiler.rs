//! Document compiler collaborators.

use std::path::{Path, PathBuf};
use std::process::Command;

use folio_config::CompilerConfig;

/// Input for one compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// Processed markdown, relative to `working_dir` or absolute.
    pub input: PathBuf,
    /// Output document, relative to `working_dir` or absolute.
    pub output: PathBuf,
    /// Directory the compiler runs in, so image references resolve.
    pub working_dir: PathBuf,
    /// Named values passed to the compiler's template.
    pub variables: Vec<(String, String)>,
}

impl CompileRequest {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            working_dir: working_dir.into(),
            variables: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    /// Output path resolved against the working directory.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.working_dir.join(&self.output)
    }
}

/// Diagnostics from a successful compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Compiler error.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Compiler ran and exited unsuccessfully. Output is kept verbatim.
    #[error("compiler failed ({}):\n{stderr}", exit_status(.status))]
    Failure {
        status: Option<i32>,
        stderr: String,
        stdout: String,
    },

    /// Compiler could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[allow(clippy::ref_option)]
fn exit_status(status: &Option<i32>) -> String {
    status.map_or_else(|| "killed by signal".to_owned(), |code| format!("exit code {code}"))
}

/// Turns processed markdown into the final document.
pub trait DocumentCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<CompileOutput, CompileError>;
}

/// `pandoc` invocation.
#[derive(Debug, Clone)]
pub struct Pandoc {
    program: String,
    template: Option<String>,
    pdf_engine: Option<String>,
    from: Option<String>,
    to: Option<String>,
    standalone: bool,
    toc: bool,
    toc_depth: Option<u8>,
    number_sections: bool,
}

impl Default for Pandoc {
    fn default() -> Self {
        Self {
            program: "pandoc".to_owned(),
            template: None,
            pdf_engine: None,
            from: None,
            to: None,
            standalone: false,
            toc: false,
            toc_depth: None,
            number_sections: false,
        }
    }
}

impl Pandoc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(config: &CompilerConfig) -> Self {
        let mut pandoc = Self::new()
            .with_program(&config.program)
            .with_reader(&config.from)
            .with_standalone(config.standalone)
            .with_number_sections(config.number_sections);
        pandoc.template.clone_from(&config.template);
        pandoc.pdf_engine.clone_from(&config.pdf_engine);
        pandoc.to.clone_from(&config.to);
        if config.toc {
            pandoc = pandoc.with_toc(config.toc_depth);
        }
        pandoc
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    #[must_use]
    pub fn with_pdf_engine(mut self, engine: impl Into<String>) -> Self {
        self.pdf_engine = Some(engine.into());
        self
    }

    /// Reader format with extensions, e.g. `markdown+raw_tex`.
    #[must_use]
    pub fn with_reader(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    #[must_use]
    pub fn with_writer(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    #[must_use]
    pub fn with_standalone(mut self, standalone: bool) -> Self {
        self.standalone = standalone;
        self
    }

    /// Enable a table of contents, optionally limited to `depth` levels.
    #[must_use]
    pub fn with_toc(mut self, depth: Option<u8>) -> Self {
        self.toc = true;
        self.toc_depth = depth;
        self
    }

    #[must_use]
    pub fn with_number_sections(mut self, number_sections: bool) -> Self {
        self.number_sections = number_sections;
        self
    }

    /// Command-line arguments for `request`.
    #[must_use]
    pub fn args(&self, request: &CompileRequest) -> Vec<String> {
        let mut args = vec![
            request.input.to_string_lossy().into_owned(),
            "-o".to_owned(),
            request.output.to_string_lossy().into_owned(),
        ];
        if let Some(template) = &self.template {
            args.push(format!("--template={template}"));
        }
        if let Some(engine) = &self.pdf_engine {
            args.push(format!("--pdf-engine={engine}"));
        }
        if let Some(from) = &self.from {
            args.push(format!("--from={from}"));
        }
        if let Some(to) = &self.to {
            args.push(format!("--to={to}"));
        }
        if self.standalone {
            args.push("--standalone".to_owned());
        }
        if self.toc {
            args.push("--toc".to_owned());
            if let Some(depth) = self.toc_depth {
                args.push(format!("--toc-depth={depth}"));
            }
        }
        if self.number_sections {
            args.push("--number-sections".to_owned());
        }
        for (name, value) in &request.variables {
            args.push("-V".to_owned());
            args.push(format!("{name}={value}"));
        }
        args
    }
}

impl DocumentCompiler for Pandoc {
    fn compile(&self, request: &CompileRequest) -> Result<CompileOutput, CompileError> {
        let args = self.args(request);
        tracing::info!(
            program = %self.program,
            input = %request.input.display(),
            output = %request.output.display(),
            "Compiling document"
        );
        tracing::debug!(?args, "Compiler arguments");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&request.working_dir)
            .output()
            .map_err(|source| CompileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(CompileError::Failure {
                status: output.status.code(),
                stderr,
                stdout,
            });
        }

        Ok(CompileOutput { stdout, stderr })
    }
}

/// Build a compile request for the processed markdown at `input`, writing
/// `output` next to it.
pub fn request_for(input: &Path, output: &str) -> CompileRequest {
    let working_dir = input.parent().map(Path::to_path_buf).unwrap_or_default();
    let input_name = input.file_name().map_or_else(|| input.to_path_buf(), PathBuf::from);
    CompileRequest::new(input_name, output, working_dir)
}
