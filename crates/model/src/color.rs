use serde::{Deserialize, Serialize};

/// RGB color with normalized components (0.0 to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const YELLOW: Rgb = Rgb { r: 1.0, g: 1.0, b: 0.0 };
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };

    /// Create a color, clamping each component into [0, 1]
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r: r.clamp(0.0, 1.0), g: g.clamp(0.0, 1.0), b: b.clamp(0.0, 1.0) }
    }

    /// Interpret a PDF color array.
    ///
    /// One component is gray, three are RGB, four are CMYK. Anything else
    /// (including the empty array, which means "transparent") yields `None`.
    pub fn from_components(components: &[f32]) -> Option<Self> {
        match *components {
            [gray] => Some(Self::new(gray, gray, gray)),
            [r, g, b] => Some(Self::new(r, g, b)),
            [c, m, y, k] => Some(Self::new(
                (1.0 - c) * (1.0 - k),
                (1.0 - m) * (1.0 - k),
                (1.0 - y) * (1.0 - k),
            )),
            _ => None,
        }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[f32; 3]> for Rgb {
    fn from(value: [f32; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

impl From<Rgb> for [f32; 3] {
    fn from(value: Rgb) -> Self {
        value.to_array()
    }
}

/// Parse `#RRGGBB`. Absent or malformed input resolves to yellow, the
/// interchange default.
pub fn parse_hex_color(text: Option<&str>) -> Rgb {
    text.and_then(|text| {
        let hex = text.trim().strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).ok().map(|v| v as f32 / 255.0)
        };
        Some(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    })
    .unwrap_or(Rgb::YELLOW)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_color() {
        let color = parse_hex_color(Some("#FF8000"));
        assert!((color.r - 1.0).abs() < 0.001);
        assert!((color.g - 0.502).abs() < 0.01);
        assert!((color.b - 0.0).abs() < 0.001);
    }

    #[test]
    fn bad_hex_defaults_to_yellow() {
        assert_eq!(parse_hex_color(None), Rgb::YELLOW);
        assert_eq!(parse_hex_color(Some("FF0000")), Rgb::YELLOW);
        assert_eq!(parse_hex_color(Some("#F00")), Rgb::YELLOW);
        assert_eq!(parse_hex_color(Some("#GG0000")), Rgb::YELLOW);
    }

    #[test]
    fn components_cover_gray_rgb_and_cmyk() {
        assert_eq!(Rgb::from_components(&[0.5]), Some(Rgb::new(0.5, 0.5, 0.5)));
        assert_eq!(Rgb::from_components(&[1.0, 0.0, 0.0]), Some(Rgb::new(1.0, 0.0, 0.0)));
        assert_eq!(Rgb::from_components(&[0.0, 0.0, 1.0, 0.0]), Some(Rgb::YELLOW));
        assert_eq!(Rgb::from_components(&[]), None);
        assert_eq!(Rgb::from_components(&[1.0, 1.0]), None);
    }

    #[test]
    fn hex_channels_map_to_unit_range() {
        assert_eq!(parse_hex_color(Some("#00FF00")), Rgb::new(0.0, 1.0, 0.0));
    }
}
