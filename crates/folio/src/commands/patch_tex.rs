//! `folio patch-tex` command implementation.

use std::path::PathBuf;

use clap::Args;
use folio_build::TexPatcher;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the patch-tex command.
#[derive(Args)]
pub(crate) struct PatchTexArgs {
    /// LaTeX file to patch in place.
    file: PathBuf,

    /// Macros replacing diagram listings, in document order (e.g. `\diagramOne`).
    #[arg(short, long, num_args = 1.., value_delimiter = ',')]
    macros: Vec<String>,

    /// Leave Unicode symbols untouched.
    #[arg(long)]
    keep_unicode: bool,
}

impl PatchTexArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let tex = std::fs::read_to_string(&self.file)?;
        let patched = TexPatcher::new()
            .with_macros(self.macros)
            .with_unicode_conversion(!self.keep_unicode)
            .patch(&tex)?;
        std::fs::write(&self.file, &patched.text)?;

        if patched.preamble_added {
            output.info("Added diagram preamble");
        }
        output.info(&format!(
            "Replaced {} symbols, {} diagram listings ({} removed)",
            patched.symbols_replaced, patched.listings_replaced, patched.listings_removed
        ));
        output.success(&format!("Patched {}", self.file.display()));
        Ok(())
    }
}
