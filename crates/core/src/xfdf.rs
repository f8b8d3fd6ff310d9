//! XFDF annotation interchange files.
//!
//! Elements are matched by local name so documents with and without the
//! `http://ns.adobe.com/xfdf/` namespace read the same. Numeric attributes
//! that do not parse are treated as absent and logged.

use annotmerge_model::{
    parse_flat_coords, parse_hex_color, parse_ink_strokes, parse_point, parse_rect,
    AnnotationKind, AnnotationRecord, AnnotationResult, CoordinateSpace, Geometry, Rect,
    DEFAULT_BORDER_WIDTH, DEFAULT_FLAGS, DEFAULT_OPACITY,
};
use roxmltree::{Document, Node, ParsingOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum InterchangeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("root element is <{0}>, expected <xfdf>")]
    NotXfdf(String),
}

/// Parsed contents of an XFDF file.
#[derive(Debug, Clone, PartialEq)]
pub struct XfdfDocument {
    /// `href` of the `<f>` element: the document the annotations belong to
    pub source: Option<String>,
    pub records: Vec<AnnotationRecord>,
}

/// Flag names accepted in place of a numeric `flags` value.
const FLAG_NAMES: [(&str, u32); 10] = [
    ("invisible", 1),
    ("hidden", 2),
    ("print", 4),
    ("nozoom", 8),
    ("norotate", 16),
    ("noview", 32),
    ("readonly", 64),
    ("locked", 128),
    ("togglenoview", 256),
    ("lockedcontents", 512),
];

pub fn read_xfdf(path: &Path) -> Result<XfdfDocument, InterchangeError> {
    let text = fs::read_to_string(path)
        .map_err(|source| InterchangeError::Io { path: path.to_path_buf(), source })?;
    parse_xfdf(&text)
}

pub fn parse_xfdf(text: &str) -> Result<XfdfDocument, InterchangeError> {
    let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
    let doc = Document::parse_with_options(text, options)?;

    let root = doc.root_element();
    if root.tag_name().name() != "xfdf" {
        return Err(InterchangeError::NotXfdf(root.tag_name().name().to_owned()));
    }

    let source = child(root, "f").and_then(|f| f.attribute("href")).map(str::to_owned);
    let records = match child(root, "annots") {
        Some(annots) => annots.children().filter(Node::is_element).map(parse_annotation).collect(),
        None => Vec::new(),
    };

    tracing::debug!(source = ?source, annotations = records.len(), "parsed XFDF");
    Ok(XfdfDocument { source, records })
}

fn parse_annotation(node: Node<'_, '_>) -> AnnotationRecord {
    let tag = node.tag_name().name();
    let kind = AnnotationKind::from_xfdf_tag(tag).unwrap_or_else(|| {
        tracing::warn!(tag, "unknown XFDF annotation element, importing as text");
        AnnotationKind::Text
    });

    let page = number_attr(node, "page").unwrap_or(0);
    let rect = match node.attribute("rect") {
        None => Rect::zero(),
        Some(text) => parse_rect(text).unwrap_or_else(|err| {
            tracing::warn!(tag, %err, "ignoring malformed rect");
            Rect::zero()
        }),
    };

    AnnotationRecord::new(page, kind, CoordinateSpace::Page, rect)
        .with_geometry(parse_geometry(node, kind))
        .with_stroke(Some(parse_hex_color(node.attribute("color"))))
        .with_opacity(number_attr(node, "opacity").unwrap_or(DEFAULT_OPACITY))
        .with_border_width(number_attr(node, "width").unwrap_or(DEFAULT_BORDER_WIDTH))
        .with_flags(flags_attr(node).unwrap_or(DEFAULT_FLAGS))
        .with_content(child(node, "contents").and_then(|c| c.text()).map(str::to_owned))
        .with_author(node.attribute("title").map(str::to_owned))
        .with_subject(node.attribute("subject").map(str::to_owned))
        .with_name(node.attribute("name").map(str::to_owned))
}

fn parse_geometry(node: Node<'_, '_>, kind: AnnotationKind) -> Geometry {
    use AnnotationKind::*;

    let tag = node.tag_name().name();
    let parsed = match kind {
        Ink => {
            let gestures: Vec<&str> = child(node, "inklist")
                .map(|inklist| {
                    inklist
                        .children()
                        .filter(|n| n.tag_name().name() == "gesture")
                        .filter_map(|gesture| gesture.text())
                        .collect()
                })
                .unwrap_or_default();
            parse_ink_strokes(gestures).map(Geometry::Ink)
        }
        Line => match (node.attribute("start"), node.attribute("end")) {
            (Some(start), Some(end)) => parse_point(start)
                .and_then(|start| Ok(Geometry::Line { start, end: parse_point(end)? })),
            _ => Ok(Geometry::None),
        },
        Highlight | Underline | StrikeOut | Squiggly => coords_attr(node, "coords")
            .map(|values| values.map_or(Geometry::None, Geometry::QuadPoints)),
        Polygon | Polyline => coords_attr(node, "vertices")
            .map(|values| values.map_or(Geometry::None, Geometry::Vertices)),
        _ => Ok(Geometry::None),
    };

    parsed.unwrap_or_else(|err| {
        tracing::warn!(tag, %err, "ignoring malformed geometry");
        Geometry::None
    })
}

/// Coordinate list attribute. Points may be separated by `;` as well as `,`.
fn coords_attr(node: Node<'_, '_>, name: &str) -> AnnotationResult<Option<Vec<f32>>> {
    node.attribute(name).map(|text| parse_flat_coords(&text.replace(';', ","))).transpose()
}

fn number_attr<T: FromStr>(node: Node<'_, '_>, name: &str) -> Option<T> {
    let text = node.attribute(name)?;
    let value = text.trim().parse().ok();
    if value.is_none() {
        tracing::warn!(
            tag = node.tag_name().name(),
            attribute = name,
            value = text,
            "ignoring malformed attribute"
        );
    }
    value
}

/// `flags` is either an integer or a comma separated list of flag names.
fn flags_attr(node: Node<'_, '_>) -> Option<u32> {
    let text = node.attribute("flags")?.trim();
    if let Ok(value) = text.parse() {
        return Some(value);
    }

    let mut flags = 0;
    for name in text.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        match FLAG_NAMES.iter().find(|(flag, _)| flag.eq_ignore_ascii_case(name)) {
            Some((_, bit)) => flags |= bit,
            None => {
                tracing::warn!(value = text, "ignoring malformed flags attribute");
                return None;
            }
        }
    }
    Some(flags)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && n.tag_name().name() == name)
}
