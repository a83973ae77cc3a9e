use serde::{Deserialize, Serialize};

pub type CanvasId = i64;

/// A cell of the unbounded canvas grid.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub x: i64,
    pub y: i64,
}

impl Coordinate {
    pub const ORIGIN: Coordinate = Coordinate { x: 0, y: 0 };

    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// 8-bit RGBA color. Alpha is stored as 0-255; interfaces that speak unit
/// alpha convert through [`Color::from_unit_alpha`] and [`Color::unit_alpha`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_unit_alpha(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        let alpha = if alpha.is_finite() { alpha } else { 1.0 };
        let a = (alpha.max(0.0).min(1.0) * 255.0).round() as u8;
        Self { r, g, b, a }
    }

    pub fn unit_alpha(self) -> f32 {
        self.a as f32 / 255.0
    }
}

/// Top-left corner of a background tile. Both components are multiples of
/// the tile side the coordinate was built with.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: i64,
    pub y: i64,
}

impl TileCoord {
    /// The tile of side `side` whose area contains `point`.
    pub fn containing(point: Coordinate, side: u32) -> Self {
        let side = i64::from(side.max(1));
        Self {
            x: point.x.div_euclid(side) * side,
            y: point.y.div_euclid(side) * side,
        }
    }

    /// Image key understood by the tile endpoint, e.g. `-1024x0_1024`.
    pub fn address(self, side: u32) -> String {
        format!("{}x{}_{}", self.x, self.y, side)
    }
}

/// Channel layout the canvas service uses on the wire (`{"R":..,"G":..}`).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoteRgba {
    #[serde(rename = "R")]
    pub r: u8,
    #[serde(rename = "G")]
    pub g: u8,
    #[serde(rename = "B")]
    pub b: u8,
    #[serde(rename = "A")]
    pub a: u8,
}

impl From<RemoteRgba> for Color {
    fn from(value: RemoteRgba) -> Self {
        Color::rgba(value.r, value.g, value.b, value.a)
    }
}

impl From<Color> for RemoteRgba {
    fn from(value: Color) -> Self {
        Self {
            r: value.r,
            g: value.g,
            b: value.b,
            a: value.a,
        }
    }
}

/// One changed pixel in a poll response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RemotePixel {
    #[serde(rename = "X")]
    pub x: i64,
    #[serde(rename = "Y")]
    pub y: i64,
    #[serde(rename = "RGBA")]
    pub rgba: RemoteRgba,
    /// Milliseconds since the Unix epoch. Older services omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<i64>,
}

impl RemotePixel {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.x, self.y)
    }

    pub fn color(&self) -> Color {
        self.rgba.into()
    }
}
