//! `folio encode` and `folio decode` command implementations.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use folio_diagrams::{DEFAULT_SERVER_URL, DiagramFormat, RenderRequest, decode};

use crate::error::CliError;

/// Arguments for the encode command.
#[derive(Args)]
pub(crate) struct EncodeArgs {
    /// Diagram source file (default: stdin).
    file: Option<PathBuf>,

    /// Image format, `png` or `svg`.
    #[arg(short, long, default_value = "png")]
    format: String,

    /// Render server URL.
    #[arg(long, env = "FOLIO_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,
}

impl EncodeArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let source = match &self.file {
            Some(path) => std::fs::read_to_string(path)?,
            None => io::read_to_string(io::stdin())?,
        };
        let url = self.render_url(&source)?;
        writeln!(io::stdout(), "{url}")?;
        Ok(())
    }

    fn render_url(&self, source: &str) -> Result<String, CliError> {
        let format = DiagramFormat::parse(&self.format).ok_or_else(|| {
            CliError::Validation(format!(
                "unknown format '{}', expected png or svg",
                self.format
            ))
        })?;
        let request = RenderRequest::new(format, source.as_bytes())?;
        Ok(request.url(&self.server_url))
    }
}

/// Arguments for the decode command.
#[derive(Args)]
pub(crate) struct DecodeArgs {
    /// Encoded token, as found after the format segment of a render URL.
    token: String,
}

impl DecodeArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let source = decode_token(&self.token)?;
        let mut stdout = io::stdout();
        stdout.write_all(source.as_bytes())?;
        if !source.ends_with('\n') {
            writeln!(stdout)?;
        }
        Ok(())
    }
}

fn decode_token(token: &str) -> Result<String, CliError> {
    let bytes = decode(token.trim())?;
    String::from_utf8(bytes)
        .map_err(|_| CliError::Validation("decoded diagram source is not UTF-8".to_owned()))
}
