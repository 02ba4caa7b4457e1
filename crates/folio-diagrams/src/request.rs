//! Render-server request URLs.

use crate::codec::{CodecError, encode};
use crate::language::DiagramFormat;

/// A single GET request against a `PlantUML`-compatible render server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub format: DiagramFormat,
    pub token: String,
}

impl RenderRequest {
    /// Encode `source` into a request for the given output format.
    pub fn new(format: DiagramFormat, source: &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            format,
            token: encode(source)?,
        })
    }

    /// Full request URL against `base`.
    #[must_use]
    pub fn url(&self, base: &str) -> String {
        build_render_url(base, self.format, &self.token)
    }
}

/// Build `{base}/{format}/{token}`.
///
/// A single trailing `/` on `base` is dropped so configured server URLs may
/// end with a slash. Nothing else is normalized.
#[must_use]
pub fn build_render_url(base: &str, format: DiagramFormat, token: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    format!("{base}/{}/{token}", format.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_render_url() {
        assert_eq!(
            build_render_url("https://www.plantuml.com/plantuml", DiagramFormat::Png, "SyfFKj2rKt3CoKnELR1Io4ZDoSa700"),
            "https://www.plantuml.com/plantuml/png/SyfFKj2rKt3CoKnELR1Io4ZDoSa700"
        );
    }

    #[test]
    fn test_build_render_url_trailing_slash() {
        assert_eq!(
            build_render_url("http://localhost:8080/", DiagramFormat::Svg, "abc"),
            "http://localhost:8080/svg/abc"
        );
        // Only one slash is trimmed.
        assert_eq!(
            build_render_url("http://h//", DiagramFormat::Png, "t"),
            "http://h//png/t"
        );
    }

    #[test]
    fn test_request_url_uses_codec_token() {
        let request = RenderRequest::new(DiagramFormat::Png, b"@startuml\nA -> B\n@enduml").unwrap();
        assert_eq!(
            crate::codec::decode(&request.token).unwrap(),
            b"@startuml\nA -> B\n@enduml"
        );
        assert_eq!(
            request.url("https://srv"),
            format!("https://srv/png/{}", request.token)
        );
    }

    #[test]
    fn test_empty_source_empty_token() {
        let request = RenderRequest::new(DiagramFormat::Svg, b"").unwrap();
        assert_eq!(request.url("https://srv"), "https://srv/svg/");
    }
}
