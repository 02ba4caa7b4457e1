//! Diagram renderer collaborators.
//!
//! Two implementations of [`DiagramRenderer`]:
//! - [`ServerRenderer`]: HTTP GET against a `PlantUML`-compatible server
//!   using the transport codec token.
//! - [`CommandRenderer`]: a local executable (e.g. mermaid-cli) that reads
//!   source from a temporary file and writes an image file.
//!
//! Neither retries. Each call makes at most one attempt and fails with
//! [`RenderError::Timeout`] once its deadline passes.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use ureq::Agent;

use crate::codec::CodecError;
use crate::consts::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_HTTP_TIMEOUT, POLL_INTERVAL, STDERR_GRACE, USER_AGENT,
};
use crate::language::{DiagramFormat, DiagramLanguage};
use crate::request::RenderRequest;

/// Default mermaid-cli arguments. `{input}` and `{output}` are substituted
/// with the temporary source path and the image path.
pub const MERMAID_CLI_ARGS: [&str; 12] = [
    "-i", "{input}", "-o", "{output}", "-b", "white", "-s", "3", "-t", "neutral", "-w", "1200",
];

/// Error from a single render attempt.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No result within the configured deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Render server answered with an error status.
    #[error("rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Transport-level failure talking to the render server.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Local renderer exited unsuccessfully.
    #[error("{program} failed ({}): {stderr}", exit_code(.status))]
    ToolFailed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("failed to encode diagram source")]
    Encode(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[allow(clippy::ref_option)]
fn exit_code(status: &Option<i32>) -> String {
    status.map_or_else(|| String::from("killed by signal"), |code| format!("exit code {code}"))
}

/// Renders diagram source to image bytes.
pub trait DiagramRenderer: Send + Sync {
    /// Render one diagram.
    fn render(&self, source: &str) -> Result<Vec<u8>, RenderError>;

    /// Format of the bytes returned by [`render`](Self::render).
    fn format(&self) -> DiagramFormat;
}

/// Create HTTP agent with the specified timeout.
///
/// Status codes are returned as responses, not errors, so error bodies can
/// be reported.
#[must_use]
pub fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Renders via HTTP GET `{server}/{format}/{token}`.
pub struct ServerRenderer {
    agent: Agent,
    base_url: String,
    format: DiagramFormat,
    timeout: Duration,
}

impl ServerRenderer {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            agent: create_agent(DEFAULT_HTTP_TIMEOUT),
            base_url: base_url.into(),
            format: DiagramFormat::default(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: DiagramFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = create_agent(timeout);
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request URL for `source` against this server.
    pub fn url_for(&self, source: &str) -> Result<String, CodecError> {
        Ok(RenderRequest::new(self.format, source.as_bytes())?.url(&self.base_url))
    }
}

impl DiagramRenderer for ServerRenderer {
    fn render(&self, source: &str) -> Result<Vec<u8>, RenderError> {
        let url = self.url_for(source)?;
        tracing::debug!(url = %url, "Requesting diagram from render server");

        let response = self
            .agent
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| match e {
                ureq::Error::Timeout(_) => RenderError::Timeout(self.timeout),
                other => RenderError::Http(other.to_string()),
            })?;

        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let body = body
                .read_to_string()
                .unwrap_or_else(|_| String::from("(unable to read error body)"));
            return Err(RenderError::Rejected { status, body });
        }

        body.read_to_vec().map_err(|e| match e {
            ureq::Error::Timeout(_) => RenderError::Timeout(self.timeout),
            other => RenderError::Http(other.to_string()),
        })
    }

    fn format(&self) -> DiagramFormat {
        self.format
    }
}

/// Renders by running a local executable on a temporary source file.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    language: DiagramLanguage,
    format: DiagramFormat,
    timeout: Duration,
}

impl CommandRenderer {
    /// Renderer for `program` with mermaid-cli style arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: MERMAID_CLI_ARGS.iter().map(|&a| a.to_owned()).collect(),
            language: DiagramLanguage::Mermaid,
            format: DiagramFormat::default(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// mermaid-cli (`mmdc`) with its default arguments.
    #[must_use]
    pub fn mermaid_cli() -> Self {
        Self::new("mmdc")
    }

    /// Replace the argument template.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Language of the source, which picks the temporary file extension.
    #[must_use]
    pub fn with_language(mut self, language: DiagramLanguage) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: DiagramFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

impl DiagramRenderer for CommandRenderer {
    fn render(&self, source: &str) -> Result<Vec<u8>, RenderError> {
        let dir = tempfile::tempdir()?;
        let input = dir
            .path()
            .join(format!("diagram.{}", self.language.source_extension()));
        let output = dir.path().join(format!("diagram.{}", self.format.as_str()));
        std::fs::write(&input, source)?;

        let args = self.expand_args(&input, &output);
        tracing::debug!(program = %self.program, ?args, "Running local renderer");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain stderr concurrently so a chatty tool cannot block on a full pipe.
        let stderr_rx = child.stderr.take().map(|mut stderr| {
            let (tx, rx) = mpsc::channel();
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                let _ = tx.send(buf);
            });
            rx
        });

        let Some(status) = wait_with_timeout(&mut child, self.timeout)? else {
            tracing::warn!(program = %self.program, timeout = ?self.timeout, "Renderer timed out, killed");
            return Err(RenderError::Timeout(self.timeout));
        };

        let stderr = stderr_rx
            .and_then(|rx| rx.recv_timeout(STDERR_GRACE).ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(RenderError::ToolFailed {
                program: self.program.clone(),
                status: status.code(),
                stderr: stderr.trim().to_owned(),
            });
        }

        Ok(std::fs::read(&output)?)
    }

    fn format(&self) -> DiagramFormat {
        self.format
    }
}

/// Wait for `child` until `timeout`, killing it when the deadline passes.
///
/// Returns `None` if the process was killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        }
        let now = Instant::now();
        if now >= deadline {
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}
