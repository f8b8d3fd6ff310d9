//! Turning a neutral record into a PDF annotation dictionary.
//!
//! Screen-space records are flipped into page space against the height of
//! the page they land on; page-space records are written as is.

use annotmerge_model::{
    AnnotationError, AnnotationKind, AnnotationRecord, AnnotationResult, CoordinateSpace,
    Geometry, Point, Rect, Rgb,
};
use chrono::{DateTime, Local, TimeZone};
use lopdf::{dictionary, Dictionary, Object};
use pdf_engine::encode_text_string;
use std::fmt::Display;

const FREE_TEXT_APPEARANCE: &str = "/Helv 11 Tf 0 0 0 rg";
const NOTE_ICON: &str = "Comment";
const STAMP_ICON: &str = "Approved";

/// Format a timestamp as a PDF date string, `D:YYYYMMDDHHmmSS`.
pub fn pdf_date<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    time.format("D:%Y%m%d%H%M%S").to_string()
}

/// Build the annotation dictionary for `record`, stamped with the current
/// local time.
pub fn translate(record: &AnnotationRecord, page_height: f32) -> AnnotationResult<Dictionary> {
    translate_at(record, page_height, &pdf_date(&Local::now()))
}

/// Same as [`translate`] with an explicit `/CreationDate` and `/M` value.
pub fn translate_at(
    record: &AnnotationRecord,
    page_height: f32,
    timestamp: &str,
) -> AnnotationResult<Dictionary> {
    let (rect, geometry) = match record.space() {
        CoordinateSpace::Page => (record.rect(), record.geometry().clone()),
        CoordinateSpace::Screen => {
            (record.rect().flipped(page_height), record.geometry().flipped(page_height))
        }
    };

    let kind = match persisted_kind(record.kind()) {
        Ok(kind) => kind,
        Err(err) => {
            tracing::warn!(page = record.page() + 1, %err, "writing annotation as a note");
            AnnotationKind::Text
        }
    };
    let mut dict = dictionary! {
        "Type" => "Annot",
        "Subtype" => kind.subtype(),
        "Rect" => reals(&rect.to_array()),
        "F" => i64::from(record.flags()),
    };

    write_kind_fields(&mut dict, kind, rect, &geometry, record.border_width())?;
    write_colors(&mut dict, kind, record.stroke(), record.fill());

    if record.opacity() < 1.0 {
        dict.set("CA", Object::Real(record.opacity()));
    }

    let texts = [
        ("Contents", record.content()),
        ("T", record.author()),
        ("Subj", record.subject()),
        ("NM", record.name()),
    ];
    for (key, value) in texts {
        if let Some(value) = value {
            dict.set(key, encode_text_string(value));
        }
    }

    dict.set("CreationDate", Object::string_literal(timestamp));
    dict.set("M", Object::string_literal(timestamp));

    Ok(dict)
}

/// File attachments need an embedded file stream (`/FS`) that records do not
/// carry.
fn persisted_kind(kind: AnnotationKind) -> AnnotationResult<AnnotationKind> {
    match kind {
        AnnotationKind::FileAttachment => {
            Err(AnnotationError::UnsupportedKind(kind.as_str().to_owned()))
        }
        other => Ok(other),
    }
}

fn write_kind_fields(
    dict: &mut Dictionary,
    kind: AnnotationKind,
    rect: Rect,
    geometry: &Geometry,
    border_width: f32,
) -> AnnotationResult<()> {
    use AnnotationKind::*;

    match kind {
        Text => {
            dict.set("Name", Object::Name(NOTE_ICON.into()));
            dict.set("Open", false);
        }
        FreeText => {
            dict.set("DA", Object::string_literal(FREE_TEXT_APPEARANCE));
        }
        Highlight | Underline | StrikeOut | Squiggly => {
            let quads = match geometry {
                Geometry::QuadPoints(values) => {
                    if values.len() % 8 != 0 {
                        return Err(AnnotationError::malformed(format!(
                            "{} quad point values is not a multiple of 8",
                            values.len()
                        )));
                    }
                    values.clone()
                }
                _ => rect.quad().to_vec(),
            };
            dict.set("QuadPoints", reals(&quads));
        }
        Ink => {
            let Geometry::Ink(strokes) = geometry else {
                return Err(AnnotationError::EmptyGeometry { kind });
            };
            let ink_list: Vec<Object> =
                strokes.iter().map(|stroke| Object::Array(point_reals(stroke))).collect();
            dict.set("InkList", ink_list);
            dict.set("BS", border_style(border_width));
        }
        Line => {
            let (start, end) = match geometry {
                Geometry::Line { start, end } => (*start, *end),
                Geometry::Vertices(values) if values.len() >= 4 => {
                    (Point::new(values[0], values[1]), Point::new(values[2], values[3]))
                }
                _ => return Err(AnnotationError::EmptyGeometry { kind }),
            };
            dict.set("L", point_reals(&[start, end]));
            dict.set("BS", border_style(border_width));
        }
        Square | Circle => {
            dict.set("BS", border_style(border_width));
        }
        Polygon | Polyline => {
            let Geometry::Vertices(values) = geometry else {
                return Err(AnnotationError::EmptyGeometry { kind });
            };
            if values.len() % 2 != 0 {
                return Err(AnnotationError::malformed(format!(
                    "vertex list has odd length {}",
                    values.len()
                )));
            }
            dict.set("Vertices", reals(values));
            dict.set("BS", border_style(border_width));
        }
        Stamp => {
            dict.set("Name", Object::Name(STAMP_ICON.into()));
        }
        Caret | FileAttachment => {}
    }

    Ok(())
}

/// `/C` takes the stroke color, or the fill when there is no stroke. Kinds
/// with an interior also get `/IC` when both are present.
fn write_colors(
    dict: &mut Dictionary,
    kind: AnnotationKind,
    stroke: Option<Rgb>,
    fill: Option<Rgb>,
) {
    if let Some(color) = stroke.or(fill) {
        dict.set("C", reals(&color.to_array()));
    }
    if let (Some(_), Some(fill)) = (stroke, fill) {
        if kind.has_interior() {
            dict.set("IC", reals(&fill.to_array()));
        }
    }
}

fn border_style(width: f32) -> Dictionary {
    dictionary! {
        "Type" => "Border",
        "W" => Object::Real(width),
        "S" => "S",
    }
}

fn reals(values: &[f32]) -> Vec<Object> {
    values.iter().map(|value| Object::Real(*value)).collect()
}

fn point_reals(points: &[Point]) -> Vec<Object> {
    points.iter().flat_map(|p| [Object::Real(p.x), Object::Real(p.y)]).collect()
}
