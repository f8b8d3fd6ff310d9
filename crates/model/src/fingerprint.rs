//! Cross-document annotation identity.
//!
//! Object numbers are not stable across independently re-saved copies of a
//! document, so identity is derived from what a reader sees: page, type,
//! position and text. Colors, opacity and authorship are left out because
//! viewers fill them with their own defaults.

use crate::record::AnnotationRecord;
use std::fmt;

/// Rect components are compared at this many steps per unit (one decimal).
const RECT_PRECISION: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FingerprintKey {
    page: u32,
    kind: &'static str,
    /// Rect components in tenths of a unit
    rect: [i64; 4],
    content: String,
}

impl FingerprintKey {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Rounded rect components.
    pub fn rect(&self) -> [f32; 4] {
        self.rect.map(|v| v as f32 / RECT_PRECISION)
    }
}

impl fmt::Display for FingerprintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x0, y0, x1, y1] = self.rect();
        write!(
            f,
            "p{}:{}:[{x0:.1},{y0:.1},{x1:.1},{y1:.1}]:{:?}",
            self.page, self.kind, self.content
        )
    }
}

/// Derive the identity key of a record.
pub fn fingerprint(record: &AnnotationRecord) -> FingerprintKey {
    FingerprintKey {
        page: record.page(),
        kind: record.kind().as_str(),
        rect: record.rect().to_array().map(round_component),
        content: record.content().unwrap_or_default().to_owned(),
    }
}

fn round_component(value: f32) -> i64 {
    (f64::from(value) * f64::from(RECT_PRECISION)).round() as i64
}
