use pixboard_shared::{CanvasId, TileCoord};

use crate::error::AddressError;

/// The part of a session that survives a reload: which canvas, and where
/// the camera was. Encoded as `/canvas/{id}/{zoom}/{x}/{y}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasAddress {
    pub canvas_id: CanvasId,
    pub zoom: f64,
    pub x: i64,
    pub y: i64,
}

impl Default for CanvasAddress {
    fn default() -> Self {
        Self {
            canvas_id: 0,
            zoom: 1.0,
            x: 0,
            y: 0,
        }
    }
}

impl CanvasAddress {
    /// Missing trailing segments fall back to zoom 1 at the origin.
    pub fn parse(path: &str) -> Result<Self, AddressError> {
        let mut parts = path.trim_matches('/').split('/');
        if parts.next() != Some("canvas") {
            return Err(AddressError::MissingPrefix(path.to_string()));
        }
        let mut address = CanvasAddress::default();
        if let Some(id) = non_empty(parts.next()) {
            address.canvas_id = parse_segment("canvas id", id)?;
        }
        if let Some(zoom) = non_empty(parts.next()) {
            let zoom: f64 = parse_segment("zoom", zoom)?;
            if !(zoom.is_finite() && zoom > 0.0) {
                return Err(AddressError::InvalidSegment {
                    field: "zoom",
                    value: zoom.to_string(),
                });
            }
            address.zoom = zoom;
        }
        if let Some(x) = non_empty(parts.next()) {
            address.x = parse_segment("x", x)?;
        }
        if let Some(y) = non_empty(parts.next()) {
            address.y = parse_segment("y", y)?;
        }
        Ok(address)
    }

    pub fn to_path(&self) -> String {
        format!("/canvas/{}/{}/{}/{}", self.canvas_id, self.zoom, self.x, self.y)
    }
}

fn non_empty(part: Option<&str>) -> Option<&str> {
    part.filter(|value| !value.is_empty())
}

fn parse_segment<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, AddressError> {
    value.parse().map_err(|_| AddressError::InvalidSegment {
        field,
        value: value.to_string(),
    })
}

/// Address of the pre-rendered image for `tile`.
pub fn tile_url(endpoint: &str, tile: TileCoord, side: u32) -> String {
    format!("{}/tile/{}.png", endpoint.trim_end_matches('/'), tile.address(side))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_address() {
        let address = CanvasAddress::parse("/canvas/3/2.5/-120/44").unwrap();
        assert_eq!(
            address,
            CanvasAddress {
                canvas_id: 3,
                zoom: 2.5,
                x: -120,
                y: 44
            }
        );
        assert_eq!(CanvasAddress::parse(&address.to_path()).unwrap(), address);
    }

    #[test]
    fn missing_segments_use_defaults() {
        assert_eq!(CanvasAddress::parse("/canvas/7").unwrap().zoom, 1.0);
        assert_eq!(CanvasAddress::parse("canvas/").unwrap(), CanvasAddress::default());
    }

    #[test]
    fn rejects_bad_segments() {
        assert!(matches!(
            CanvasAddress::parse("/board/1"),
            Err(AddressError::MissingPrefix(_))
        ));
        assert_eq!(
            CanvasAddress::parse("/canvas/1/1/abc"),
            Err(AddressError::InvalidSegment {
                field: "x",
                value: "abc".into()
            })
        );
        assert!(CanvasAddress::parse("/canvas/1/0").is_err());
    }

    #[test]
    fn tile_url_uses_tile_key() {
        assert_eq!(
            tile_url("http://localhost:1001/", TileCoord { x: -1024, y: 2048 }, 1024),
            "http://localhost:1001/tile/-1024x2048_1024.png"
        );
    }
}
