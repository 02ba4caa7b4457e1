//! Configuration management for Folio.
//!
//! Parses `folio.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `diagrams.server_url`
//! - `metadata.title`, `metadata.author`, `metadata.date`, `metadata.abstract`
//! - `compiler.variables.*`

mod expand;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override markdown source path.
    pub source: Option<PathBuf>,
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override render server URL.
    pub server_url: Option<String>,
    /// Override compiler enabled flag.
    pub compile: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "folio.toml";

const DEFAULT_SERVER_URL: &str = "https://www.plantuml.com/plantuml";
/// Fence tags the local renderer understands.
const COMMAND_LANGUAGES: [&str; 5] = ["mermaid", "plantuml", "puml", "graphviz", "dot"];
const DEFAULT_READER: &str = "markdown+tex_math_dollars+pipe_tables+raw_tex+implicit_figures";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document paths (relative strings from TOML).
    document: DocumentConfigRaw,
    /// Diagram resolution and rendering.
    pub diagrams: DiagramsConfig,
    /// Front-matter anchors.
    pub front_matter: FrontMatterConfig,
    /// Bare URL wrapping.
    pub urls: UrlsConfig,
    /// LaTeX-oriented text conversion.
    pub latex: LatexConfig,
    /// Document compiler invocation.
    pub compiler: CompilerConfig,
    /// Document metadata passed to the compiler.
    pub metadata: MetadataConfig,

    /// Resolved document configuration (set after loading).
    #[serde(skip)]
    pub document_resolved: DocumentConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw document configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocumentConfigRaw {
    source: Option<String>,
    output_dir: Option<String>,
    processed_name: Option<String>,
}

/// Resolved document configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DocumentConfig {
    /// Markdown source file.
    pub source: PathBuf,
    /// Directory receiving the processed markdown, diagrams and compiler output.
    pub output_dir: PathBuf,
    /// File name of the processed markdown inside `output_dir`.
    pub processed_name: String,
}

impl DocumentConfig {
    /// Path of the processed markdown file.
    #[must_use]
    pub fn processed_path(&self) -> PathBuf {
        self.output_dir.join(&self.processed_name)
    }

    /// Source file stem, used to derive default output names.
    #[must_use]
    pub fn stem(&self) -> String {
        self.source
            .file_stem()
            .map_or_else(|| "document".to_owned(), |s| s.to_string_lossy().into_owned())
    }
}

/// How diagrams are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// HTTP GET against a `PlantUML`-compatible render server.
    #[default]
    Server,
    /// Local executable such as mermaid-cli.
    Command,
    /// No rendering; render jobs fall back to the placeholder.
    None,
}

/// Treatment of diagram blocks without a `[[diagrams.figures]]` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlistedPolicy {
    /// Remove the block.
    Delete,
    /// Replace the block with the placeholder text.
    #[default]
    Placeholder,
    /// Render the block's own content.
    Render,
}

/// Diagram configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiagramsConfig {
    /// Fence tag of the diagram blocks to replace.
    pub language: String,
    pub renderer: RendererKind,
    pub server_url: String,
    /// Image format, `png` or `svg`.
    pub format: String,
    /// Per-diagram render timeout. Defaults depend on the renderer.
    pub timeout_secs: Option<u64>,
    /// Image directory, relative to the output directory.
    pub dir: String,
    /// Value of the `{width=...}` image attribute.
    pub width: String,
    /// Text substituted for diagrams that cannot be rendered.
    pub placeholder: String,
    pub unlisted: UnlistedPolicy,
    /// Local renderer executable.
    pub command: String,
    /// Local renderer arguments; `{input}` and `{output}` are substituted.
    pub command_args: Option<Vec<String>>,
    /// Explicit per-diagram resolutions.
    pub figures: Vec<FigureConfig>,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            language: "mermaid".to_owned(),
            renderer: RendererKind::default(),
            server_url: DEFAULT_SERVER_URL.to_owned(),
            format: "png".to_owned(),
            timeout_secs: None,
            dir: "diagrams".to_owned(),
            width: "85%".to_owned(),
            placeholder: "[Diagram placeholder]".to_owned(),
            unlisted: UnlistedPolicy::default(),
            command: "mmdc".to_owned(),
            command_args: None,
            figures: Vec::new(),
        }
    }
}

/// One `[[diagrams.figures]]` entry.
///
/// Exactly one of `text`, `source`, `source_file` or `delete = true` must be
/// set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    /// 1-based position of the diagram block in the document.
    pub sequence: usize,
    /// Image caption.
    pub title: Option<String>,
    /// Static replacement text (e.g. hand-drawn ASCII art).
    pub text: Option<String>,
    /// Replacement diagram source to render.
    pub source: Option<String>,
    /// File holding replacement diagram source (resolved against the config
    /// directory).
    pub source_file: Option<PathBuf>,
    /// Remove the block.
    pub delete: bool,
}

impl FigureConfig {
    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        if self.sequence == 0 {
            return Err(ConfigError::Validation(format!(
                "diagrams.figures[{index}].sequence must be at least 1"
            )));
        }
        let set = [
            self.text.is_some(),
            self.source.is_some(),
            self.source_file.is_some(),
            self.delete,
        ]
        .into_iter()
        .filter(|&b| b)
        .count();
        if set != 1 {
            return Err(ConfigError::Validation(format!(
                "diagrams.figures[{index}] (sequence {}) must set exactly one of text, source, source_file, delete",
                self.sequence
            )));
        }
        Ok(())
    }
}

/// Front-matter anchors. Every anchor is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FrontMatterConfig {
    /// Remove the first line when the document starts with this prefix.
    pub title_prefix: Option<String>,
    /// Remove everything through the first `---` line when the document
    /// starts with this prefix (empty string always matches).
    pub leading_prefix: Option<String>,
    /// Section headings to remove, e.g. `## Abstract`.
    pub sections: Vec<String>,
}

/// Bare URL wrapping.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UrlsConfig {
    pub wrap: bool,
    pub marker_open: String,
    pub marker_close: String,
}

impl Default for UrlsConfig {
    fn default() -> Self {
        Self {
            wrap: true,
            marker_open: r"\url{".to_owned(),
            marker_close: "}".to_owned(),
        }
    }
}

/// LaTeX conversion options.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LatexConfig {
    /// Replace Unicode symbols with LaTeX commands in the processed markdown.
    pub convert_unicode: bool,
}

/// Document compiler configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub enabled: bool,
    pub program: String,
    /// Output file name, relative to the output directory. Defaults to
    /// `{stem}.pdf`.
    pub output: Option<String>,
    pub template: Option<String>,
    pub pdf_engine: Option<String>,
    /// Pandoc reader with extensions.
    pub from: String,
    pub to: Option<String>,
    pub standalone: bool,
    pub toc: bool,
    pub toc_depth: Option<u8>,
    pub number_sections: bool,
    /// Extra `-V key=value` variables.
    pub variables: BTreeMap<String, String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "pandoc".to_owned(),
            output: None,
            template: None,
            pdf_engine: Some("xelatex".to_owned()),
            from: DEFAULT_READER.to_owned(),
            to: None,
            standalone: false,
            toc: false,
            toc_depth: None,
            number_sections: false,
            variables: BTreeMap::new(),
        }
    }
}

/// Document metadata passed to the compiler as variables.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

impl MetadataConfig {
    /// Set fields as `(name, value)` pairs in a stable order.
    #[must_use]
    pub fn variables(&self) -> Vec<(&'static str, &str)> {
        [
            ("title", &self.title),
            ("author", &self.author),
            ("date", &self.date),
            ("abstract", &self.abstract_text),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`diagrams.server_url`").
        field: String,
        /// Error message (e.g., "${`RENDER_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `folio.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir().ok().and_then(discover_from) {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source) = &settings.source {
            self.document_resolved.source.clone_from(source);
            if self.document.processed_name.is_none() {
                self.document_resolved.processed_name =
                    default_processed_name(&self.document_resolved.stem());
            }
        }
        if let Some(output_dir) = &settings.output_dir {
            self.document_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(server_url) = &settings.server_url {
            self.diagrams.server_url.clone_from(server_url);
        }
        if let Some(compile) = settings.compile {
            self.compiler.enabled = compile;
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        let mut config = Self {
            document: DocumentConfigRaw::default(),
            diagrams: DiagramsConfig::default(),
            front_matter: FrontMatterConfig::default(),
            urls: UrlsConfig::default(),
            latex: LatexConfig::default(),
            compiler: CompilerConfig::default(),
            metadata: MetadataConfig::default(),
            document_resolved: DocumentConfig::default(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_document()?;
        self.validate_diagrams()?;
        self.validate_compiler()?;
        Ok(())
    }

    fn validate_document(&self) -> Result<(), ConfigError> {
        let name = &self.document_resolved.processed_name;
        require_non_empty(name, "document.processed_name")?;
        if name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "document.processed_name must be a file name, not a path".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        let diagrams = &self.diagrams;
        require_non_empty(&diagrams.language, "diagrams.language")?;

        if !matches!(diagrams.format.as_str(), "png" | "svg") {
            return Err(ConfigError::Validation(format!(
                "diagrams.format must be png or svg, got {:?}",
                diagrams.format
            )));
        }
        if diagrams.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "diagrams.timeout_secs must be greater than 0".to_owned(),
            ));
        }

        match diagrams.renderer {
            RendererKind::Server => {
                require_non_empty(&diagrams.server_url, "diagrams.server_url")?;
                require_http_url(&diagrams.server_url, "diagrams.server_url")?;
            }
            RendererKind::Command => {
                require_non_empty(&diagrams.command, "diagrams.command")?;
                // The local renderer needs the language for its input file.
                if !COMMAND_LANGUAGES.contains(&diagrams.language.trim()) {
                    return Err(ConfigError::Validation(format!(
                        "diagrams.language must be one of {} with renderer = \"command\", got {:?}",
                        COMMAND_LANGUAGES.join(", "),
                        diagrams.language
                    )));
                }
            }
            RendererKind::None => {}
        }

        let mut seen = HashSet::new();
        for (index, figure) in diagrams.figures.iter().enumerate() {
            figure.validate(index)?;
            if !seen.insert(figure.sequence) {
                return Err(ConfigError::Validation(format!(
                    "diagrams.figures: sequence {} listed more than once",
                    figure.sequence
                )));
            }
        }

        Ok(())
    }

    fn validate_compiler(&self) -> Result<(), ConfigError> {
        if !self.compiler.enabled {
            return Ok(());
        }
        require_non_empty(&self.compiler.program, "compiler.program")?;
        require_non_empty(&self.compiler.from, "compiler.from")?;
        if let Some(depth) = self.compiler.toc_depth
            && !(1..=6).contains(&depth)
        {
            return Err(ConfigError::Validation(
                "compiler.toc_depth must be between 1 and 6".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.diagrams.server_url =
            expand::expand_env(&self.diagrams.server_url, "diagrams.server_url")?;

        expand::expand_opt(&mut self.metadata.title, "metadata.title")?;
        expand::expand_opt(&mut self.metadata.author, "metadata.author")?;
        expand::expand_opt(&mut self.metadata.date, "metadata.date")?;
        expand::expand_opt(&mut self.metadata.abstract_text, "metadata.abstract")?;

        for (key, value) in &mut self.compiler.variables {
            *value = expand::expand_env(value, &format!("compiler.variables.{key}"))?;
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        let source = resolve(self.document.source.as_deref(), "paper.md");
        let output_dir = resolve(self.document.output_dir.as_deref(), "build");
        let mut document = DocumentConfig {
            source,
            output_dir,
            processed_name: String::new(),
        };
        document.processed_name = self
            .document
            .processed_name
            .clone()
            .unwrap_or_else(|| default_processed_name(&document.stem()));
        self.document_resolved = document;

        for figure in &mut self.diagrams.figures {
            if let Some(file) = &figure.source_file {
                figure.source_file = Some(config_dir.join(file));
            }
        }
    }

    /// Per-diagram render timeout.
    #[must_use]
    pub fn render_timeout_secs(&self) -> u64 {
        self.diagrams
            .timeout_secs
            .unwrap_or(match self.diagrams.renderer {
                RendererKind::Command => 60,
                RendererKind::Server | RendererKind::None => 30,
            })
    }

    /// Compiler output file name.
    #[must_use]
    pub fn compiler_output(&self) -> String {
        self.compiler
            .output
            .clone()
            .unwrap_or_else(|| format!("{}.pdf", self.document_resolved.stem()))
    }
}

fn default_processed_name(stem: &str) -> String {
    format!("{stem}_processed.md")
}

/// Search for config file in `start` and its parents.
fn discover_from(mut current: PathBuf) -> Option<PathBuf> {
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}
