//! LaTeX post-processing.
//!
//! - [`convert_unicode`]: replace Unicode symbols with LaTeX commands for
//!   engines without native Unicode font support
//! - [`TexPatcher`]: patch the compiler's LaTeX output (preamble packages,
//!   highlighted diagram listings replaced by diagram macros)

use std::borrow::Cow;
use std::sync::LazyLock;

use folio_text::{Replacement, Span, SpliceError, splice};
use regex::Regex;

/// A pandoc highlighted listing.
static SHADED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\begin\{Shaded\}\s*\\begin\{Highlighting\}\[\][\s\S]*?\\end\{Highlighting\}\s*\\end\{Shaded\}",
    )
    .unwrap()
});

/// First highlighted line of a mermaid `graph`/`flowchart` diagram.
static DIAGRAM_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\NormalTok\{(?:graph|flowchart) (?:TB|TD|BT|LR|RL)\}").unwrap()
});

const ANCHOR_PACKAGE: &str = r"\usepackage{bookmark}";
const TIKZ_PACKAGE: &str = r"\usepackage{tikz}";

/// Preamble inserted after `\usepackage{bookmark}`.
pub const DEFAULT_PREAMBLE: &str = r"
% Extra symbols (checkmark, etc.)
\usepackage{amssymb}

% TikZ for diagrams
\usepackage{tikz}
\usetikzlibrary{shapes.multipart, positioning, arrows.meta, fit, backgrounds}
\input{diagrams}
";

/// Comment left where a listing had no macro to replace it.
pub const REMOVED_LISTING: &str = "% removed mermaid block";

/// LaTeX replacement for a Unicode symbol.
fn latex_symbol(c: char) -> Option<&'static str> {
    let latex = match c {
        // Greek, including mathematical italic forms
        'α' | '𝛼' => r"$\alpha$",
        'β' => r"$\beta$",
        'γ' => r"$\gamma$",
        'δ' => r"$\delta$",
        'ε' => r"$\varepsilon$",
        'ζ' => r"$\zeta$",
        'η' => r"$\eta$",
        'θ' => r"$\theta$",
        'ι' => r"$\iota$",
        'κ' => r"$\kappa$",
        'λ' => r"$\lambda$",
        'μ' => r"$\mu$",
        'ν' => r"$\nu$",
        'ξ' => r"$\xi$",
        'ο' => "$o$",
        'π' => r"$\pi$",
        'ρ' => r"$\rho$",
        'σ' | '𝜎' => r"$\sigma$",
        'τ' => r"$\tau$",
        'υ' => r"$\upsilon$",
        'φ' => r"$\phi$",
        'χ' => r"$\chi$",
        'ψ' => r"$\psi$",
        'ω' => r"$\omega$",
        'Σ' => r"$\Sigma$",
        'Δ' => r"$\Delta$",
        'Ω' => r"$\Omega$",
        // Math
        '≈' => r"$\approx$",
        '≠' => r"$\neq$",
        '≤' => r"$\leq$",
        '≥' => r"$\geq$",
        '→' => r"$\rightarrow$",
        '←' => r"$\leftarrow$",
        '↔' => r"$\leftrightarrow$",
        '×' => r"$\times$",
        '÷' => r"$\div$",
        '±' => r"$\pm$",
        '∞' => r"$\infty$",
        '∑' => r"$\sum$",
        '∏' => r"$\prod$",
        '√' => r"$\sqrt{}$",
        '∈' => r"$\in$",
        '∉' => r"$\notin$",
        '⊂' => r"$\subset$",
        '⊃' => r"$\supset$",
        '∪' => r"$\cup$",
        '∩' => r"$\cap$",
        '∧' => r"$\land$",
        '∨' => r"$\lor$",
        '¬' => r"$\neg$",
        '∼' => r"$\sim$",
        '✓' => r"$\checkmark$",
        // Typography
        '—' => "---",
        '–' => "--",
        '…' => "...",
        '•' => r"\textbullet{}",
        '°' => r"\textdegree{}",
        _ => return None,
    };
    Some(latex)
}

/// Replace Unicode symbols with LaTeX equivalents.
///
/// Returns the input unchanged (borrowed) when nothing needs converting.
///
/// ```
/// use folio_build::tex::convert_unicode;
///
/// assert_eq!(convert_unicode("α → β"), r"$\alpha$ $\rightarrow$ $\beta$");
/// assert_eq!(convert_unicode("plain"), "plain");
/// ```
#[must_use]
pub fn convert_unicode(text: &str) -> Cow<'_, str> {
    let Some(first) = text.find(|c| latex_symbol(c).is_some()) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len() + 64);
    out.push_str(&text[..first]);
    for c in text[first..].chars() {
        match latex_symbol(c) {
            Some(latex) => out.push_str(latex),
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Count of characters [`convert_unicode`] would replace.
#[must_use]
pub fn count_unicode_symbols(text: &str) -> usize {
    text.chars().filter(|&c| latex_symbol(c).is_some()).count()
}

/// Summary of a [`TexPatcher::patch`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexPatchOutput {
    pub text: String,
    /// Whether the preamble was inserted.
    pub preamble_added: bool,
    pub symbols_replaced: usize,
    /// Listings replaced by a macro.
    pub listings_replaced: usize,
    /// Listings beyond the macro list, replaced by [`REMOVED_LISTING`].
    pub listings_removed: usize,
}

/// Post-processes LaTeX produced by the document compiler.
#[derive(Debug, Clone)]
pub struct TexPatcher {
    preamble: String,
    macros: Vec<String>,
    convert_unicode: bool,
}

impl Default for TexPatcher {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.to_owned(),
            macros: Vec::new(),
            convert_unicode: true,
        }
    }
}

impl TexPatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagram macros substituted for listings, in document order
    /// (e.g. `\payoffmatrix`).
    #[must_use]
    pub fn with_macros(mut self, macros: Vec<String>) -> Self {
        self.macros = macros;
        self
    }

    #[must_use]
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    #[must_use]
    pub fn with_unicode_conversion(mut self, enabled: bool) -> Self {
        self.convert_unicode = enabled;
        self
    }

    /// Apply all patches: preamble, Unicode symbols, diagram listings.
    pub fn patch(&self, tex: &str) -> Result<TexPatchOutput, SpliceError> {
        let (text, preamble_added) = match self.inject_preamble(tex)? {
            Some(text) => (text, true),
            None => (tex.to_owned(), false),
        };

        let (text, symbols_replaced) = if self.convert_unicode {
            let count = count_unicode_symbols(&text);
            (convert_unicode(&text).into_owned(), count)
        } else {
            (text, 0)
        };

        let (text, listings_replaced, listings_removed) = self.replace_listings(&text)?;

        tracing::info!(
            preamble_added,
            symbols_replaced,
            listings_replaced,
            listings_removed,
            "Patched LaTeX output"
        );

        Ok(TexPatchOutput {
            text,
            preamble_added,
            symbols_replaced,
            listings_replaced,
            listings_removed,
        })
    }

    /// Insert the preamble after the first `\usepackage{bookmark}` unless
    /// TikZ is already loaded. Returns `None` when nothing changed.
    fn inject_preamble(&self, tex: &str) -> Result<Option<String>, SpliceError> {
        if tex.contains(TIKZ_PACKAGE) {
            tracing::debug!("TikZ already loaded, preamble unchanged");
            return Ok(None);
        }
        let Some(pos) = tex.find(ANCHOR_PACKAGE) else {
            tracing::warn!("No \\usepackage{{bookmark}} anchor, preamble unchanged");
            return Ok(None);
        };
        let at = Span::empty(pos + ANCHOR_PACKAGE.len());
        splice(tex, &[Replacement::new(at, self.preamble.clone())]).map(Some)
    }

    fn replace_listings(&self, tex: &str) -> Result<(String, usize, usize), SpliceError> {
        let replacements: Vec<_> = SHADED_BLOCK
            .find_iter(tex)
            .filter(|m| DIAGRAM_HEADER.is_match(m.as_str()))
            .enumerate()
            .map(|(i, m)| {
                let text = self.macros.get(i).map_or(REMOVED_LISTING, String::as_str);
                Replacement::new(Span::new(m.start(), m.end()), text)
            })
            .collect();

        let replaced = replacements.len().min(self.macros.len());
        let removed = replacements.len() - replaced;
        Ok((splice(tex, &replacements)?, replaced, removed))
    }
}
