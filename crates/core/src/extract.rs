//! Reading annotation records out of an open document.
//!
//! Everything produced here is in page space. Entries that cannot become a
//! record (structural subtypes, a missing `/Rect`) are skipped with a log
//! line; malformed geometry degrades to [`Geometry::None`].

use annotmerge_model::{
    pair_up, AnnotationError, AnnotationKind, AnnotationRecord, AnnotationResult, CoordinateSpace,
    Geometry, Point, Rect, Rgb, DEFAULT_BORDER_WIDTH, DEFAULT_FLAGS, DEFAULT_OPACITY,
};
use lopdf::{Dictionary, Object};
use pdf_engine::{decode_text_string, DocumentHandle, PdfEngine, PdfEngineError};

/// Subtypes that belong to the document structure rather than to markup.
const STRUCTURAL_SUBTYPES: [&str; 3] = ["Link", "Widget", "Popup"];

/// All records of a document, page by page in `/Annots` order.
pub fn extract_document<E: PdfEngine + ?Sized>(
    engine: &E,
    handle: DocumentHandle,
) -> Result<Vec<AnnotationRecord>, PdfEngineError> {
    let mut records = Vec::new();
    for page in 0..engine.page_count(handle)? {
        records.extend(extract_page(engine, handle, page)?);
    }
    Ok(records)
}

pub fn extract_page<E: PdfEngine + ?Sized>(
    engine: &E,
    handle: DocumentHandle,
    page: u32,
) -> Result<Vec<AnnotationRecord>, PdfEngineError> {
    Ok(engine
        .annotations(handle, page)?
        .iter()
        .filter_map(|dict| record_from_dictionary(page, dict))
        .collect())
}

/// Convert one annotation dictionary. `None` means the entry is skipped.
pub fn record_from_dictionary(page: u32, dict: &Dictionary) -> Option<AnnotationRecord> {
    let Some(subtype) = name(dict, b"Subtype") else {
        tracing::warn!(page, "skipping annotation without /Subtype");
        return None;
    };
    if STRUCTURAL_SUBTYPES.contains(&subtype.as_str()) {
        tracing::debug!(page, %subtype, "skipping structural annotation");
        return None;
    }

    let rect = match numbers(dict, b"Rect").as_deref() {
        Some(&[x0, y0, x1, y1]) => Rect::new(x0, y0, x1, y1),
        _ => {
            tracing::warn!(page, %subtype, "skipping annotation without a usable /Rect");
            return None;
        }
    };

    let kind = AnnotationKind::from_subtype_or_text(&subtype);
    let geometry = match read_geometry(kind, dict) {
        Ok(geometry) => geometry,
        Err(err) => {
            tracing::warn!(page, %kind, %err, "ignoring malformed geometry");
            Geometry::None
        }
    };

    let record = AnnotationRecord::new(page, kind, CoordinateSpace::Page, rect)
        .with_geometry(geometry)
        .with_stroke(color(dict, b"C"))
        .with_fill(color(dict, b"IC"))
        .with_opacity(number(dict, b"CA").unwrap_or(DEFAULT_OPACITY))
        .with_border_width(border_width(dict))
        .with_content(text(dict, b"Contents"))
        .with_author(text(dict, b"T"))
        .with_subject(text(dict, b"Subj"))
        .with_name(text(dict, b"NM"))
        .with_flags(flags(dict));

    Some(record)
}

fn read_geometry(kind: AnnotationKind, dict: &Dictionary) -> AnnotationResult<Geometry> {
    use AnnotationKind::*;

    match kind {
        Ink => {
            let Ok(strokes) = dict.get(b"InkList").and_then(Object::as_array) else {
                return Ok(Geometry::None);
            };
            let strokes = strokes
                .iter()
                .map(|stroke| pair_up(&numeric(object_numbers(stroke), "ink strokes")?))
                .collect::<AnnotationResult<Vec<Vec<Point>>>>()?;
            Ok(Geometry::Ink(strokes))
        }
        Highlight | Underline | StrikeOut | Squiggly => match dict.get(b"QuadPoints") {
            Err(_) => Ok(Geometry::None),
            Ok(obj) => {
                let values = numeric(object_numbers(obj), "quad points")?;
                if values.len() % 8 != 0 {
                    return Err(AnnotationError::malformed(format!(
                        "{} quad point values is not a multiple of 8",
                        values.len()
                    )));
                }
                Ok(Geometry::QuadPoints(values))
            }
        },
        Polygon | Polyline => match dict.get(b"Vertices") {
            Err(_) => Ok(Geometry::None),
            Ok(obj) => {
                let values = numeric(object_numbers(obj), "vertices")?;
                pair_up(&values)?;
                Ok(Geometry::Vertices(values))
            }
        },
        Line => match dict.get(b"L") {
            Err(_) => Ok(Geometry::None),
            Ok(obj) => match object_numbers(obj).as_deref() {
                Some(&[x0, y0, x1, y1]) => {
                    Ok(Geometry::Line { start: Point::new(x0, y0), end: Point::new(x1, y1) })
                }
                _ => Err(AnnotationError::malformed("line endpoints need 4 numbers")),
            },
        },
        _ => Ok(Geometry::None),
    }
}

fn numeric(values: Option<Vec<f32>>, what: &str) -> AnnotationResult<Vec<f32>> {
    values.ok_or_else(|| AnnotationError::malformed(format!("{what} are not numeric")))
}

fn name(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let bytes = dict.get(key).ok()?.as_name().ok()?;
    Some(String::from_utf8_lossy(bytes).into_owned())
}

fn text(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(decode_text_string)
}

fn number(dict: &Dictionary, key: &[u8]) -> Option<f32> {
    dict.get(key).ok().and_then(object_number)
}

fn numbers(dict: &Dictionary, key: &[u8]) -> Option<Vec<f32>> {
    dict.get(key).ok().and_then(object_numbers)
}

fn object_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) if f.is_finite() => Some(*f),
        _ => None,
    }
}

/// Every element of an array as a number, or `None` if any is not one.
fn object_numbers(object: &Object) -> Option<Vec<f32>> {
    object.as_array().ok()?.iter().map(object_number).collect()
}

fn color(dict: &Dictionary, key: &[u8]) -> Option<Rgb> {
    Rgb::from_components(&numbers(dict, key)?)
}

/// `/BS /W` wins over the legacy `/Border [h v w]` array.
fn border_width(dict: &Dictionary) -> f32 {
    let from_style = dict
        .get(b"BS")
        .and_then(Object::as_dict)
        .ok()
        .and_then(|style| number(style, b"W"));

    from_style
        .or_else(|| numbers(dict, b"Border").and_then(|border| border.get(2).copied()))
        .unwrap_or(DEFAULT_BORDER_WIDTH)
}

fn flags(dict: &Dictionary) -> u32 {
    match dict.get(b"F") {
        Ok(Object::Integer(value)) => u32::try_from(*value).unwrap_or(DEFAULT_FLAGS),
        _ => DEFAULT_FLAGS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, StringFormat};
    use pdf_engine::{fixtures, LopdfEngine, OpenSource};

    fn square() -> Dictionary {
        dictionary! {
            "Type" => "Annot",
            "Subtype" => "Square",
            "Rect" => vec![10.into(), 20.into(), 110.into(), 70.into()],
            "C" => vec![1.into(), 0.into(), 0.into()],
            "IC" => vec![0.into(), 0.into(), 1.into()],
            "CA" => Object::Real(0.5),
            "BS" => dictionary! { "W" => 3 },
            "Contents" => Object::string_literal("boxed"),
            "T" => Object::string_literal("Ana"),
            "NM" => Object::string_literal("sq-1"),
            "F" => 4,
        }
    }

    #[test]
    fn reads_common_fields() {
        let record = record_from_dictionary(2, &square()).expect("square is a record");

        assert_eq!(record.page(), 2);
        assert_eq!(record.kind(), AnnotationKind::Square);
        assert_eq!(record.space(), CoordinateSpace::Page);
        assert_eq!(record.rect(), Rect::new(10.0, 20.0, 110.0, 70.0));
        assert_eq!(record.stroke(), Some(Rgb::new(1.0, 0.0, 0.0)));
        assert_eq!(record.fill(), Some(Rgb::new(0.0, 0.0, 1.0)));
        assert_eq!(record.opacity(), 0.5);
        assert_eq!(record.border_width(), 3.0);
        assert_eq!(record.content(), Some("boxed"));
        assert_eq!(record.author(), Some("Ana"));
        assert_eq!(record.name(), Some("sq-1"));
        assert_eq!(record.flags(), 4);
    }

    #[test]
    fn legacy_border_array_gives_width() {
        let mut dict = square();
        dict.remove(b"BS");
        dict.set("Border", vec![0.into(), 0.into(), 2.into()]);

        let record = record_from_dictionary(0, &dict).expect("record");
        assert_eq!(record.border_width(), 2.0);
    }

    #[test]
    fn structural_subtypes_are_skipped() {
        for subtype in STRUCTURAL_SUBTYPES {
            let dict = dictionary! {
                "Subtype" => subtype,
                "Rect" => vec![0.into(), 0.into(), 1.into(), 1.into()],
            };
            assert!(record_from_dictionary(0, &dict).is_none(), "{subtype} should be skipped");
        }
    }

    #[test]
    fn missing_rect_is_skipped() {
        let dict = dictionary! { "Subtype" => "Text" };
        assert!(record_from_dictionary(0, &dict).is_none());
    }

    #[test]
    fn unknown_subtype_becomes_text() {
        let dict = dictionary! {
            "Subtype" => "Sound",
            "Rect" => vec![0.into(), 0.into(), 5.into(), 5.into()],
        };
        let record = record_from_dictionary(0, &dict).expect("record");
        assert_eq!(record.kind(), AnnotationKind::Text);
    }

    #[test]
    fn malformed_ink_keeps_record_without_geometry() {
        let dict = dictionary! {
            "Subtype" => "Ink",
            "Rect" => vec![0.into(), 0.into(), 5.into(), 5.into()],
            "InkList" => vec![Object::Array(vec![1.into(), 2.into(), 3.into()])],
        };
        let record = record_from_dictionary(0, &dict).expect("record survives");
        assert!(record.geometry().is_none());
    }

    #[test]
    fn reads_kind_specific_geometry() {
        let highlight = dictionary! {
            "Subtype" => "Highlight",
            "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
            "QuadPoints" => (0..8i64).map(Object::from).collect::<Vec<_>>(),
        };
        let line = dictionary! {
            "Subtype" => "Line",
            "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
            "L" => vec![1.into(), 2.into(), 3.into(), 4.into()],
        };
        let polygon = dictionary! {
            "Subtype" => "Polygon",
            "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
            "Vertices" => vec![0.into(), 0.into(), 5.into(), 5.into(), 10.into(), 0.into()],
        };

        let highlight = record_from_dictionary(0, &highlight).expect("highlight");
        assert_eq!(
            highlight.geometry(),
            &Geometry::QuadPoints(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0])
        );

        let line = record_from_dictionary(0, &line).expect("line");
        assert_eq!(
            line.geometry(),
            &Geometry::Line { start: Point::new(1.0, 2.0), end: Point::new(3.0, 4.0) }
        );

        let polygon = record_from_dictionary(0, &polygon).expect("polygon");
        assert_eq!(polygon.geometry(), &Geometry::Vertices(vec![0.0, 0.0, 5.0, 5.0, 10.0, 0.0]));
    }

    #[test]
    fn utf16_contents_are_decoded() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "über".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let dict = dictionary! {
            "Subtype" => "Text",
            "Rect" => vec![0.into(), 0.into(), 5.into(), 5.into()],
            "Contents" => Object::String(bytes, StringFormat::Literal),
        };

        let record = record_from_dictionary(0, &dict).expect("record");
        assert_eq!(record.content(), Some("über"));
    }

    #[test]
    fn extracts_every_page_in_order() {
        let link = dictionary! {
            "Subtype" => "Link",
            "Rect" => vec![0.into(), 0.into(), 5.into(), 5.into()],
        };
        let bytes = fixtures::pdf_with_annotations(
            612.0,
            792.0,
            vec![vec![square(), link], Vec::new(), vec![square()]],
        );

        let mut engine = LopdfEngine::new();
        let handle = engine.open(OpenSource::Bytes(bytes)).expect("open");
        let records = extract_document(&engine, handle).expect("extract");

        let pages: Vec<u32> = records.iter().map(AnnotationRecord::page).collect();
        assert_eq!(pages, vec![0, 2]);
    }

    #[test]
    fn indirect_ink_strokes_are_read() {
        let mut engine = LopdfEngine::new();
        let handle =
            engine.open(OpenSource::Bytes(fixtures::pdf_with_indirect_ink_list())).expect("open");

        let records = extract_page(&engine, handle, 0).expect("extract");
        assert_eq!(
            records[0].geometry(),
            &Geometry::Ink(vec![vec![Point::new(10.0, 10.0), Point::new(20.0, 20.0)]])
        );
    }
}
