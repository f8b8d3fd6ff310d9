//! Geometric primitives shared by the extractor, translator and XFDF parser.
//!
//! Every point-valued field lives in one of two coordinate spaces. The space is
//! carried next to the values (see [`crate::AnnotationRecord::space`]) and is
//! never inferred from the numbers themselves.

use serde::{Deserialize, Serialize};

/// Coordinate system a set of points is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// Native PDF space: origin bottom-left, y grows upward
    #[default]
    Page,
    /// Rendering/extraction space: origin top-left, y grows downward
    Screen,
}

/// Screen-space to page-space transform for a single y value.
///
/// Applying it twice with the same height returns the original value.
pub fn flip_y(value: f32, page_height: f32) -> f32 {
    page_height - value
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn flipped(self, page_height: f32) -> Self {
        Self { x: self.x, y: flip_y(self.y, page_height) }
    }
}

/// Axis-aligned rectangle with `x0 <= x1` and `y0 <= y1`.
///
/// Fields are private so the ordering invariant cannot be broken after
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Rect {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl Rect {
    /// Build a rectangle from any two opposite corners.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0: x0.min(x1), y0: y0.min(y1), x1: x0.max(x1), y1: y0.max(y1) }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn x0(&self) -> f32 {
        self.x0
    }

    pub fn y0(&self) -> f32 {
        self.y0
    }

    pub fn x1(&self) -> f32 {
        self.x1
    }

    pub fn y1(&self) -> f32 {
        self.y1
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }

    /// Flip between screen and page space. The y values swap roles so the
    /// result is still well-formed.
    pub fn flipped(&self, page_height: f32) -> Self {
        Self::new(self.x0, flip_y(self.y1, page_height), self.x1, flip_y(self.y0, page_height))
    }

    /// Single quad covering the rectangle, in PDF quad order
    /// (upper-left, upper-right, lower-left, lower-right). Page space only.
    pub fn quad(&self) -> [f32; 8] {
        [self.x0, self.y1, self.x1, self.y1, self.x0, self.y0, self.x1, self.y0]
    }
}

impl From<[f32; 4]> for Rect {
    fn from(value: [f32; 4]) -> Self {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

impl From<Rect> for [f32; 4] {
    fn from(value: Rect) -> Self {
        value.to_array()
    }
}

/// Kind-dependent geometric payload of an annotation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Geometry {
    #[default]
    None,
    /// Ordered strokes, each an ordered point sequence
    Ink(Vec<Vec<Point>>),
    /// Flat list, 8 floats per quad
    QuadPoints(Vec<f32>),
    /// Flat list, x/y pairs
    Vertices(Vec<f32>),
    Line { start: Point, end: Point },
}

impl Geometry {
    /// Collapse empty payloads into [`Geometry::None`].
    ///
    /// Empty strokes inside an ink list are dropped first, so a list made only
    /// of empty strokes is also treated as absent.
    pub fn normalized(self) -> Self {
        match self {
            Geometry::Ink(strokes) => {
                let strokes: Vec<Vec<Point>> =
                    strokes.into_iter().filter(|stroke| !stroke.is_empty()).collect();
                if strokes.is_empty() {
                    Geometry::None
                } else {
                    Geometry::Ink(strokes)
                }
            }
            Geometry::QuadPoints(values) if values.is_empty() => Geometry::None,
            Geometry::Vertices(values) if values.is_empty() => Geometry::None,
            other => other,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Geometry::None)
    }

    /// Flip every point of the payload independently.
    pub fn flipped(&self, page_height: f32) -> Self {
        match self {
            Geometry::None => Geometry::None,
            Geometry::Ink(strokes) => Geometry::Ink(
                strokes
                    .iter()
                    .map(|stroke| stroke.iter().map(|p| p.flipped(page_height)).collect())
                    .collect(),
            ),
            Geometry::QuadPoints(values) => Geometry::QuadPoints(flip_flat(values, page_height)),
            Geometry::Vertices(values) => Geometry::Vertices(flip_flat(values, page_height)),
            Geometry::Line { start, end } => Geometry::Line {
                start: start.flipped(page_height),
                end: end.flipped(page_height),
            },
        }
    }
}

/// Flip the y component (odd indices) of a flat x/y list.
fn flip_flat(values: &[f32], page_height: f32) -> Vec<f32> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| if i % 2 == 1 { flip_y(*v, page_height) } else { *v })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_twice_is_identity() {
        for (value, height) in [(0.0, 792.0), (10.5, 100.0), (700.25, 842.0)] {
            assert_eq!(flip_y(flip_y(value, height), height), value);
        }
    }

    #[test]
    fn rect_normalizes_corners() {
        let rect = Rect::new(50.0, 20.0, 10.0, 10.0);
        assert_eq!(rect.to_array(), [10.0, 10.0, 50.0, 20.0]);
        assert_eq!(rect.width(), 40.0);
        assert_eq!(rect.height(), 10.0);
    }

    #[test]
    fn rect_flip_keeps_ordering() {
        let screen = Rect::new(10.0, 10.0, 50.0, 20.0);
        let page = screen.flipped(100.0);
        assert_eq!(page.to_array(), [10.0, 80.0, 50.0, 90.0]);
        assert_eq!(page.flipped(100.0), screen);
    }

    #[test]
    fn rect_quad_is_in_pdf_order() {
        let quad = Rect::new(0.0, 0.0, 4.0, 2.0).quad();
        assert_eq!(quad, [0.0, 2.0, 4.0, 2.0, 0.0, 0.0, 4.0, 0.0]);
    }

    #[test]
    fn empty_payloads_normalize_to_none() {
        assert!(Geometry::Ink(vec![]).normalized().is_none());
        assert!(Geometry::Ink(vec![vec![], vec![]]).normalized().is_none());
        assert!(Geometry::QuadPoints(vec![]).normalized().is_none());
        assert!(Geometry::Vertices(vec![]).normalized().is_none());

        let line = Geometry::Line { start: Point::new(0.0, 0.0), end: Point::new(1.0, 1.0) };
        assert_eq!(line.clone().normalized(), line);
    }

    #[test]
    fn geometry_flip_touches_only_y() {
        let vertices = Geometry::Vertices(vec![1.0, 10.0, 2.0, 20.0]);
        assert_eq!(vertices.flipped(100.0), Geometry::Vertices(vec![1.0, 90.0, 2.0, 80.0]));

        let ink = Geometry::Ink(vec![vec![Point::new(3.0, 0.0)], vec![Point::new(4.0, 100.0)]]);
        assert_eq!(
            ink.flipped(100.0),
            Geometry::Ink(vec![vec![Point::new(3.0, 100.0)], vec![Point::new(4.0, 0.0)]])
        );
    }
}
