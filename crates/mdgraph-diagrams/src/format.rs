//! Output image formats.

/// Image format requested from the diagram tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Embedded with `<object>`, keeps links and text selectable.
    #[default]
    Svg,
    Png,
    Jpg,
    Gif,
    Pdf,
}

impl ImageFormat {
    /// All supported formats.
    pub const ALL: [Self; 5] = [Self::Svg, Self::Png, Self::Jpg, Self::Gif, Self::Pdf];

    /// Parse a format name (`svg`, `png`, `jpg`/`jpeg`, `gif`, `pdf`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Some(Self::Svg),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpg),
            "gif" => Some(Self::Gif),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Format name, also used as file extension and tool argument.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Gif => "gif",
            Self::Pdf => "pdf",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(ImageFormat::parse("svg"), Some(ImageFormat::Svg));
        assert_eq!(ImageFormat::parse("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::parse("jpeg"), Some(ImageFormat::Jpg));
        assert_eq!(ImageFormat::parse("bmp"), None);
    }

    #[test]
    fn test_names_parse_back() {
        for format in ImageFormat::ALL {
            assert_eq!(ImageFormat::parse(format.as_str()), Some(format));
        }
    }
}
