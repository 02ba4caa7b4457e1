//! Diagram languages and output formats.

/// Diagram notations recognized in fenced blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagramLanguage {
    #[default]
    Mermaid,
    PlantUml,
    GraphViz,
}

impl DiagramLanguage {
    /// Parse language from a code fence info string.
    ///
    /// Returns None if the language is not a supported diagram type.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "mermaid" => Some(Self::Mermaid),
            "plantuml" | "puml" => Some(Self::PlantUml),
            "graphviz" | "dot" => Some(Self::GraphViz),
            _ => None,
        }
    }

    /// Canonical fence tag for this language.
    #[must_use]
    pub fn fence_tag(self) -> &'static str {
        match self {
            Self::Mermaid => "mermaid",
            Self::PlantUml => "plantuml",
            Self::GraphViz => "dot",
        }
    }

    /// File extension used when handing source to a local renderer.
    #[must_use]
    pub fn source_extension(self) -> &'static str {
        match self {
            Self::Mermaid => "mmd",
            Self::PlantUml => "puml",
            Self::GraphViz => "dot",
        }
    }
}

/// Output format for rendered diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagramFormat {
    /// Raster image (default, embeds reliably in LaTeX).
    #[default]
    Png,
    /// Vector image.
    Svg,
}

impl DiagramFormat {
    /// Parse format from a configuration value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// Path segment expected by the render server, also the file extension.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse() {
        let languages = [
            ("mermaid", DiagramLanguage::Mermaid),
            ("plantuml", DiagramLanguage::PlantUml),
            ("puml", DiagramLanguage::PlantUml),
            ("graphviz", DiagramLanguage::GraphViz),
            ("dot", DiagramLanguage::GraphViz),
            (" mermaid ", DiagramLanguage::Mermaid),
        ];
        for (name, expected) in languages {
            assert_eq!(DiagramLanguage::parse(name), Some(expected), "Failed to parse: {name}");
        }
        assert_eq!(DiagramLanguage::parse("rust"), None);
        assert_eq!(DiagramLanguage::parse(""), None);
    }

    #[test]
    fn test_fence_tag_round_trips() {
        for lang in [
            DiagramLanguage::Mermaid,
            DiagramLanguage::PlantUml,
            DiagramLanguage::GraphViz,
        ] {
            assert_eq!(DiagramLanguage::parse(lang.fence_tag()), Some(lang));
        }
    }

    #[test]
    fn test_source_extension() {
        assert_eq!(DiagramLanguage::Mermaid.source_extension(), "mmd");
        assert_eq!(DiagramLanguage::PlantUml.source_extension(), "puml");
    }

    #[test]
    fn test_format_default_is_png() {
        assert_eq!(DiagramFormat::default(), DiagramFormat::Png);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(DiagramFormat::parse("svg"), Some(DiagramFormat::Svg));
        assert_eq!(DiagramFormat::parse("png"), Some(DiagramFormat::Png));
        assert_eq!(DiagramFormat::parse("jpeg"), None);
        assert_eq!(DiagramFormat::parse(""), None);
    }
}
