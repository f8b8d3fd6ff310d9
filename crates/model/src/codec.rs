//! Text encodings of geometry as found in interchange files.
//!
//! Numbers are comma separated; ink strokes separate their points with `;`.
//! Every parser either returns the complete value or a
//! [`AnnotationError::MalformedGeometry`], never a partial result.

use crate::error::{AnnotationError, AnnotationResult};
use crate::geometry::{Point, Rect};

pub const DEFAULT_OPACITY: f32 = 1.0;
pub const DEFAULT_BORDER_WIDTH: f32 = 1.0;
/// Annotation flag bit 3: print the annotation with the page.
pub const FLAG_PRINT: u32 = 4;
pub const DEFAULT_FLAGS: u32 = FLAG_PRINT;

/// Parse a comma separated list of numbers.
pub fn parse_flat_coords(text: &str) -> AnnotationResult<Vec<f32>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    text.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| AnnotationError::malformed(format!("invalid number {part:?}")))
        })
        .collect()
}

/// Parse `x0,y0,x1,y1`.
pub fn parse_rect(text: &str) -> AnnotationResult<Rect> {
    match parse_flat_coords(text)?.as_slice() {
        &[x0, y0, x1, y1] => Ok(Rect::new(x0, y0, x1, y1)),
        other => Err(AnnotationError::malformed(format!(
            "rect needs 4 numbers, got {}",
            other.len()
        ))),
    }
}

/// Parse `x,y`.
pub fn parse_point(text: &str) -> AnnotationResult<Point> {
    match parse_flat_coords(text)?.as_slice() {
        &[x, y] => Ok(Point::new(x, y)),
        other => Err(AnnotationError::malformed(format!(
            "point needs 2 numbers, got {}",
            other.len()
        ))),
    }
}

/// Parse one ink stroke, `x,y;x,y;...`. Empty segments (a trailing `;`) are
/// ignored.
pub fn parse_ink_stroke(text: &str) -> AnnotationResult<Vec<Point>> {
    text.split(';').filter(|segment| !segment.trim().is_empty()).map(parse_point).collect()
}

/// Parse several strokes at once, one per entry.
pub fn parse_ink_strokes<'a, I>(strokes: I) -> AnnotationResult<Vec<Vec<Point>>>
where
    I: IntoIterator<Item = &'a str>,
{
    strokes
        .into_iter()
        .map(parse_ink_stroke)
        .filter(|stroke| stroke.as_ref().map_or(true, |points| !points.is_empty()))
        .collect()
}

/// Group a flat list into points. Odd-length lists are malformed.
pub fn pair_up(values: &[f32]) -> AnnotationResult<Vec<Point>> {
    if values.len() % 2 != 0 {
        return Err(AnnotationError::malformed(format!(
            "coordinate list has odd length {}",
            values.len()
        )));
    }
    Ok(values.chunks_exact(2).map(|pair| Point::new(pair[0], pair[1])).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rect_with_spaces() {
        let rect = parse_rect(" 10, 20.5 ,30,40 ").expect("rect should parse");
        assert_eq!(rect.to_array(), [10.0, 20.5, 30.0, 40.0]);
    }

    #[test]
    fn rect_with_wrong_arity_is_malformed() {
        assert!(matches!(parse_rect("1,2,3"), Err(AnnotationError::MalformedGeometry(_))));
        assert!(matches!(parse_rect(""), Err(AnnotationError::MalformedGeometry(_))));
    }

    #[test]
    fn partial_numbers_are_rejected_whole() {
        let err = parse_flat_coords("1,2,x,4").expect_err("should fail");
        assert!(err.to_string().contains("\"x\""));
        assert!(parse_flat_coords("1,NaN").is_err());
    }

    #[test]
    fn parses_point() {
        assert_eq!(parse_point("3,4").expect("point"), Point::new(3.0, 4.0));
        assert!(parse_point("3").is_err());
    }

    #[test]
    fn parses_ink_strokes() {
        let strokes = parse_ink_strokes(["1,1;2,2;3,3", "4,4;", ""]).expect("strokes");
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0].len(), 3);
        assert_eq!(strokes[1], vec![Point::new(4.0, 4.0)]);
    }

    #[test]
    fn malformed_stroke_point_fails() {
        assert!(parse_ink_strokes(["1,1;2"]).is_err());
    }

    #[test]
    fn pair_up_rejects_odd_lists() {
        assert_eq!(pair_up(&[1.0, 2.0]).expect("pairs"), vec![Point::new(1.0, 2.0)]);
        assert!(pair_up(&[1.0, 2.0, 3.0]).is_err());
    }
}
