//! Neutral, source-independent annotation record

use crate::codec::{DEFAULT_BORDER_WIDTH, DEFAULT_FLAGS, DEFAULT_OPACITY};
use crate::color::Rgb;
use crate::geometry::{CoordinateSpace, Geometry, Rect};
use crate::kind::AnnotationKind;
use serde::{Deserialize, Deserializer, Serialize};

/// One annotation, detached from the document it came from.
///
/// Records are produced by the extractor or the interchange parser and
/// consumed by the merge engine or the translator. They are never written
/// back to; builder methods consume and return the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    page: u32,
    kind: AnnotationKind,
    /// Space of `rect` and every point in `geometry`
    #[serde(default)]
    space: CoordinateSpace,
    rect: Rect,
    #[serde(default, deserialize_with = "normalized_geometry")]
    geometry: Geometry,
    #[serde(default)]
    stroke: Option<Rgb>,
    #[serde(default)]
    fill: Option<Rgb>,
    #[serde(default = "default_opacity")]
    opacity: f32,
    #[serde(default = "default_border_width")]
    border_width: f32,
    #[serde(default, deserialize_with = "non_empty_text")]
    content: Option<String>,
    #[serde(default, deserialize_with = "non_empty_text")]
    author: Option<String>,
    #[serde(default, deserialize_with = "non_empty_text")]
    subject: Option<String>,
    #[serde(default, deserialize_with = "non_empty_text")]
    name: Option<String>,
    #[serde(default = "default_flags")]
    flags: u32,
}

impl AnnotationRecord {
    /// Create a record with default attributes and no geometry.
    pub fn new(page: u32, kind: AnnotationKind, space: CoordinateSpace, rect: Rect) -> Self {
        Self {
            page,
            kind,
            space,
            rect,
            geometry: Geometry::None,
            stroke: None,
            fill: None,
            opacity: DEFAULT_OPACITY,
            border_width: DEFAULT_BORDER_WIDTH,
            content: None,
            author: None,
            subject: None,
            name: None,
            flags: DEFAULT_FLAGS,
        }
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry.normalized();
        self
    }

    pub fn with_stroke(mut self, stroke: Option<Rgb>) -> Self {
        self.stroke = stroke;
        self
    }

    pub fn with_fill(mut self, fill: Option<Rgb>) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { DEFAULT_OPACITY };
        self
    }

    pub fn with_border_width(mut self, width: f32) -> Self {
        self.border_width = if width.is_finite() { width.max(0.0) } else { DEFAULT_BORDER_WIDTH };
        self
    }

    pub fn with_content(mut self, content: Option<String>) -> Self {
        self.content = non_empty(content);
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = non_empty(author);
        self
    }

    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.subject = non_empty(subject);
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = non_empty(name);
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    pub fn space(&self) -> CoordinateSpace {
        self.space
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn stroke(&self) -> Option<Rgb> {
        self.stroke
    }

    pub fn fill(&self) -> Option<Rgb> {
        self.fill
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn border_width(&self) -> f32 {
        self.border_width
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Short description of the content for log lines.
    ///
    /// Longer content is cut at `max_chars` characters and marked with `...`;
    /// records without content (drawings, shapes) read `(drawing)`.
    pub fn content_preview(&self, max_chars: usize) -> String {
        match self.content() {
            None => "(drawing)".to_owned(),
            Some(text) if text.chars().count() > max_chars => {
                let cut: String = text.chars().take(max_chars).collect();
                format!("{cut}...")
            }
            Some(text) => text.to_owned(),
        }
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|text| !text.is_empty())
}

fn non_empty_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_empty(Option::<String>::deserialize(deserializer)?))
}

fn normalized_geometry<'de, D>(deserializer: D) -> Result<Geometry, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Geometry::deserialize(deserializer)?.normalized())
}

fn default_opacity() -> f32 {
    DEFAULT_OPACITY
}

fn default_border_width() -> f32 {
    DEFAULT_BORDER_WIDTH
}

fn default_flags() -> u32 {
    DEFAULT_FLAGS
}
