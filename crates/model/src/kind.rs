use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Annotation types the tools know how to carry between documents
/// Deserializing accepts canonical and `/Subtype` spellings; anything else becomes `Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AnnotationKind {
    Text,
    FreeText,
    Highlight,
    Underline,
    StrikeOut,
    Squiggly,
    Ink,
    Line,
    Square,
    Circle,
    Polygon,
    Polyline,
    Stamp,
    Caret,
    FileAttachment,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 15] = [
        AnnotationKind::Text,
        AnnotationKind::FreeText,
        AnnotationKind::Highlight,
        AnnotationKind::Underline,
        AnnotationKind::StrikeOut,
        AnnotationKind::Squiggly,
        AnnotationKind::Ink,
        AnnotationKind::Line,
        AnnotationKind::Square,
        AnnotationKind::Circle,
        AnnotationKind::Polygon,
        AnnotationKind::Polyline,
        AnnotationKind::Stamp,
        AnnotationKind::Caret,
        AnnotationKind::FileAttachment,
    ];

    /// Canonical name, used in fingerprints and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationKind::Text => "Text",
            AnnotationKind::FreeText => "FreeText",
            AnnotationKind::Highlight => "Highlight",
            AnnotationKind::Underline => "Underline",
            AnnotationKind::StrikeOut => "StrikeOut",
            AnnotationKind::Squiggly => "Squiggly",
            AnnotationKind::Ink => "Ink",
            AnnotationKind::Line => "Line",
            AnnotationKind::Square => "Square",
            AnnotationKind::Circle => "Circle",
            AnnotationKind::Polygon => "Polygon",
            AnnotationKind::Polyline => "Polyline",
            AnnotationKind::Stamp => "Stamp",
            AnnotationKind::Caret => "Caret",
            AnnotationKind::FileAttachment => "FileAttachment",
        }
    }

    /// PDF `/Subtype` name.
    pub fn subtype(self) -> &'static str {
        match self {
            AnnotationKind::Polyline => "PolyLine",
            other => other.as_str(),
        }
    }

    /// Lowercase XFDF element name.
    pub fn xfdf_tag(self) -> &'static str {
        match self {
            AnnotationKind::Text => "text",
            AnnotationKind::FreeText => "freetext",
            AnnotationKind::Highlight => "highlight",
            AnnotationKind::Underline => "underline",
            AnnotationKind::StrikeOut => "strikeout",
            AnnotationKind::Squiggly => "squiggly",
            AnnotationKind::Ink => "ink",
            AnnotationKind::Line => "line",
            AnnotationKind::Square => "square",
            AnnotationKind::Circle => "circle",
            AnnotationKind::Polygon => "polygon",
            AnnotationKind::Polyline => "polyline",
            AnnotationKind::Stamp => "stamp",
            AnnotationKind::Caret => "caret",
            AnnotationKind::FileAttachment => "fileattachment",
        }
    }

    pub fn from_subtype(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.subtype() == name || kind.as_str() == name)
    }

    pub fn from_xfdf_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.xfdf_tag().eq_ignore_ascii_case(tag))
    }

    /// Resolve a name that may not be known, falling back to a note.
    ///
    /// Unknown names are reported at warn level and become [`AnnotationKind::Text`].
    pub fn from_subtype_or_text(name: &str) -> Self {
        Self::from_subtype(name).unwrap_or_else(|| {
            tracing::warn!(subtype = name, "unknown annotation type, treating as Text");
            AnnotationKind::Text
        })
    }

    /// Text markup kinds carry quad points.
    pub fn is_text_markup(self) -> bool {
        matches!(
            self,
            AnnotationKind::Highlight
                | AnnotationKind::Underline
                | AnnotationKind::StrikeOut
                | AnnotationKind::Squiggly
        )
    }

    /// Kinds whose interior color (`IC`) is meaningful.
    pub fn has_interior(self) -> bool {
        matches!(
            self,
            AnnotationKind::Square
                | AnnotationKind::Circle
                | AnnotationKind::Polygon
                | AnnotationKind::Polyline
                | AnnotationKind::Line
                | AnnotationKind::FreeText
        )
    }
}

impl<'de> Deserialize<'de> for AnnotationKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_subtype_or_text(&name))
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_names_round_trip() {
        for kind in AnnotationKind::ALL {
            assert_eq!(AnnotationKind::from_subtype(kind.subtype()), Some(kind));
            assert_eq!(AnnotationKind::from_xfdf_tag(kind.xfdf_tag()), Some(kind));
        }
    }

    #[test]
    fn polyline_uses_pdf_spelling() {
        assert_eq!(AnnotationKind::Polyline.subtype(), "PolyLine");
        assert_eq!(AnnotationKind::from_subtype("Polyline"), Some(AnnotationKind::Polyline));
    }

    #[test]
    fn unknown_subtype_falls_back_to_text() {
        assert_eq!(AnnotationKind::from_subtype("Redact"), None);
        assert_eq!(AnnotationKind::from_subtype_or_text("Redact"), AnnotationKind::Text);
    }

    #[test]
    fn deserializes_both_polyline_spellings() {
        let kinds: Vec<AnnotationKind> =
            serde_json::from_str(r#"["Polyline", "PolyLine", "Square"]"#).expect("kinds");
        assert_eq!(
            kinds,
            vec![AnnotationKind::Polyline, AnnotationKind::Polyline, AnnotationKind::Square]
        );
    }

    #[test]
    fn deserializes_unknown_kind_as_text() {
        let kind: AnnotationKind = serde_json::from_str(r#""Redact""#).expect("kind");
        assert_eq!(kind, AnnotationKind::Text);
    }

    #[test]
    fn xfdf_tags_ignore_case() {
        assert_eq!(AnnotationKind::from_xfdf_tag("StrikeOut"), Some(AnnotationKind::StrikeOut));
    }
}
