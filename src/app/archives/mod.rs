pub mod row;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use row::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkID(pub i64);

impl fmt::Display for LinkID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A derived artifact of a captured page. The numbers are the backend's
/// `format` query codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchivedFormat {
    Png = 0,
    Jpeg = 1,
    Pdf = 2,
    Monolith = 4,
}

impl ArchivedFormat {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ArchivedFormat::Png),
            1 => Some(ArchivedFormat::Jpeg),
            2 => Some(ArchivedFormat::Pdf),
            4 => Some(ArchivedFormat::Monolith),
            _ => None,
        }
    }

    pub fn is_screenshot(self) -> bool {
        matches!(self, ArchivedFormat::Png | ArchivedFormat::Jpeg)
    }

    pub fn icon(self) -> &'static str {
        match self {
            ArchivedFormat::Monolith => "bi-filetype-html",
            ArchivedFormat::Pdf => "bi-file-earmark-pdf",
            ArchivedFormat::Png | ArchivedFormat::Jpeg => "bi-file-earmark-image",
        }
    }

    /// File name offered to the browser when the artifact is downloaded.
    pub fn download_name(self) -> &'static str {
        match self {
            ArchivedFormat::Monolith => "Webpage",
            ArchivedFormat::Pdf => "PDF",
            ArchivedFormat::Png | ArchivedFormat::Jpeg => "Screenshot",
        }
    }
}

/// Backend endpoint serving the artifact bytes.
pub fn archive_path(link: LinkID, format: ArchivedFormat) -> String {
    format!("/api/v1/archives/{link}?format={}", format.code())
}

/// Viewer route for an artifact, under `/public` when browsing publicly.
pub fn viewer_href(link: LinkID, format: ArchivedFormat, public: bool) -> String {
    let prefix = if public { "/public" } else { "" };
    format!("{prefix}/preserved/{link}?format={}", format.code())
}

pub fn is_public_path(pathname: &str) -> bool {
    pathname.starts_with("/public")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkID,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub pdf: Option<String>,
    #[serde(default)]
    pub monolith: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

fn stored(path: &Option<String>) -> Option<&str> {
    path.as_deref()
        .filter(|p| !p.is_empty() && *p != "unavailable")
}

impl Link {
    pub fn screenshot(&self) -> Option<ArchivedFormat> {
        let image = stored(&self.image)?;
        if image.ends_with(".png") {
            Some(ArchivedFormat::Png)
        } else {
            Some(ArchivedFormat::Jpeg)
        }
    }

    pub fn has_pdf(&self) -> bool {
        stored(&self.pdf).is_some()
    }

    pub fn has_monolith(&self) -> bool {
        stored(&self.monolith).is_some()
    }

    /// The artifacts this link actually has, in display order.
    pub fn formats(&self) -> Vec<ArchivedFormat> {
        let mut formats = Vec::with_capacity(3);

        if let Some(screenshot) = self.screenshot() {
            formats.push(screenshot);
        }
        if self.has_pdf() {
            formats.push(ArchivedFormat::Pdf);
        }
        if self.has_monolith() {
            formats.push(ArchivedFormat::Monolith);
        }

        formats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(image: Option<&str>, pdf: Option<&str>, monolith: Option<&str>) -> Link {
        Link {
            id: LinkID(9),
            name: "Example".into(),
            url: Some("https://example.com".into()),
            image: image.map(str::to_string),
            pdf: pdf.map(str::to_string),
            monolith: monolith.map(str::to_string),
            rest: Map::new(),
        }
    }

    #[test]
    fn download_names_follow_the_format() {
        assert_eq!(ArchivedFormat::Monolith.download_name(), "Webpage");
        assert_eq!(ArchivedFormat::Pdf.download_name(), "PDF");
        assert_eq!(ArchivedFormat::Png.download_name(), "Screenshot");
        assert_eq!(ArchivedFormat::Jpeg.download_name(), "Screenshot");
    }

    #[test]
    fn codes_match_the_backend() {
        for format in [
            ArchivedFormat::Png,
            ArchivedFormat::Jpeg,
            ArchivedFormat::Pdf,
            ArchivedFormat::Monolith,
        ] {
            assert_eq!(ArchivedFormat::from_code(format.code()), Some(format));
        }
        assert_eq!(ArchivedFormat::Monolith.code(), 4);
        assert_eq!(ArchivedFormat::from_code(3), None);
    }

    #[test]
    fn paths() {
        assert_eq!(
            archive_path(LinkID(9), ArchivedFormat::Pdf),
            "/api/v1/archives/9?format=2"
        );
        assert_eq!(
            viewer_href(LinkID(9), ArchivedFormat::Monolith, false),
            "/preserved/9?format=4"
        );
        assert_eq!(
            viewer_href(LinkID(9), ArchivedFormat::Png, true),
            "/public/preserved/9?format=0"
        );
    }

    #[test]
    fn public_paths() {
        assert!(is_public_path("/public/links/3"));
        assert!(!is_public_path("/links/3"));
    }

    #[test]
    fn formats_skip_missing_artifacts() {
        let full = link(Some("archives/1/9.jpeg"), Some("archives/1/9.pdf"), Some("m"));
        assert_eq!(
            full.formats(),
            vec![ArchivedFormat::Jpeg, ArchivedFormat::Pdf, ArchivedFormat::Monolith]
        );

        let partial = link(Some("archives/1/9.png"), Some("unavailable"), Some(""));
        assert_eq!(partial.formats(), vec![ArchivedFormat::Png]);

        assert!(link(None, None, None).formats().is_empty());
    }
}
