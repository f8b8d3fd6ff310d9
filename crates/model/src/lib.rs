//! Annotation data model
//!
//! Neutral annotation records, the geometry and color codec used to read and
//! write them, and the fingerprint that decides whether two records from
//! different documents are the same markup.

pub mod codec;
pub mod color;
pub mod error;
pub mod fingerprint;
pub mod geometry;
pub mod kind;
pub mod record;

pub use codec::{
    pair_up, parse_flat_coords, parse_ink_stroke, parse_ink_strokes, parse_point, parse_rect,
    DEFAULT_BORDER_WIDTH, DEFAULT_FLAGS, DEFAULT_OPACITY, FLAG_PRINT,
};
pub use color::{parse_hex_color, Rgb};
pub use error::{AnnotationError, AnnotationResult};
pub use fingerprint::{fingerprint, FingerprintKey};
pub use geometry::{flip_y, CoordinateSpace, Geometry, Point, Rect};
pub use kind::AnnotationKind;
pub use record::AnnotationRecord;
