use std::collections::HashSet;

use pixboard_shared::TileCoord;

use crate::geometry::Camera;

/// Rings of tiles fetched beyond the visible area so panning does not
/// reveal unloaded background.
pub const DEFAULT_PREFETCH_MARGIN: u32 = 1;

/// Largest window the driver will enumerate in one retile.
pub const MAX_WINDOW_TILES: u64 = 4096;

/// Inclusive range of tile coordinates around a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileWindow {
    pub side: u32,
    pub first_x: i64,
    pub last_x: i64,
    pub first_y: i64,
    pub last_y: i64,
}

impl TileWindow {
    /// Window over the world rectangle `center ± extent / 2`.
    ///
    /// Each edge is snapped to the tile grid and the window is grown by
    /// `margin` rings. An edge that falls inside a tile keeps that tile, so
    /// every tile touching the visible area is always part of the window.
    /// Returns `None` for a zero-area viewport.
    pub fn around(
        center: (f64, f64),
        width_in_world: f64,
        height_in_world: f64,
        side: u32,
        margin: u32,
    ) -> Option<Self> {
        if side == 0
            || !(width_in_world.is_finite() && height_in_world.is_finite())
            || width_in_world <= 0.0
            || height_in_world <= 0.0
            || !(center.0.is_finite() && center.1.is_finite())
        {
            return None;
        }
        let (first_x, last_x) = axis_range(center.0, width_in_world, side, margin);
        let (first_y, last_y) = axis_range(center.1, height_in_world, side, margin);
        Some(Self {
            side,
            first_x,
            last_x,
            first_y,
            last_y,
        })
    }

    pub fn for_camera(camera: &Camera, side: u32, margin: u32) -> Option<Self> {
        let (width, height) = camera.world_extents();
        Self::around((camera.center_x, camera.center_y), width, height, side, margin)
    }

    pub fn contains(&self, tile: TileCoord) -> bool {
        tile.x >= self.first_x && tile.x <= self.last_x && tile.y >= self.first_y && tile.y <= self.last_y
    }

    /// Chebyshev distance in tiles from `tile` to the nearest tile of the window.
    pub fn distance_in_tiles(&self, tile: TileCoord) -> u64 {
        let side = i64::from(self.side);
        let dx = gap(tile.x, self.first_x, self.last_x) / side;
        let dy = gap(tile.y, self.first_y, self.last_y) / side;
        dx.max(dy).unsigned_abs()
    }

    /// Number of tiles in the window, saturating instead of overflowing.
    pub fn tile_count(&self) -> u64 {
        let side = i128::from(self.side);
        let cols = (i128::from(self.last_x) - i128::from(self.first_x)) / side + 1;
        let rows = (i128::from(self.last_y) - i128::from(self.first_y)) / side + 1;
        u64::try_from(cols.saturating_mul(rows)).unwrap_or(u64::MAX)
    }

    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        let step = self.side as usize;
        (self.first_x..=self.last_x).step_by(step).flat_map(move |x| {
            (self.first_y..=self.last_y)
                .step_by(step)
                .map(move |y| TileCoord { x, y })
        })
    }
}

fn axis_range(center: f64, extent: f64, side: u32, margin: u32) -> (i64, i64) {
    let side_f = f64::from(side);
    let side = i64::from(side);
    let low = center - extent / 2.0;
    let high = center + extent / 2.0;
    let first = (low / side_f).ceil() as i64 * side - i64::from(margin) * side;
    let last = (high / side_f).floor() as i64 * side + i64::from(margin) * side;
    (first.min(((low / side_f).floor() as i64) * side), last)
}

fn gap(value: i64, first: i64, last: i64) -> i64 {
    if value < first {
        first - value
    } else if value > last {
        value - last
    } else {
        0
    }
}

/// Tiles of `window` not yet in `existing`, in column-major order.
pub fn missing_tiles(window: &TileWindow, existing: &HashSet<TileCoord>) -> Vec<TileCoord> {
    window.tiles().filter(|tile| !existing.contains(tile)).collect()
}

/// Tiles needed to show a viewport of the given world size around `center`,
/// padded by the default prefetch ring, minus those already in `existing`.
pub fn compute_needed_tiles(
    center: (f64, f64),
    width_in_world: f64,
    height_in_world: f64,
    side: u32,
    existing: &HashSet<TileCoord>,
) -> Vec<TileCoord> {
    match TileWindow::around(center, width_in_world, height_in_world, side, DEFAULT_PREFETCH_MARGIN) {
        Some(window) => missing_tiles(&window, existing),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(x: i64, y: i64) -> TileCoord {
        TileCoord { x, y }
    }

    #[test]
    fn centered_viewport_needs_three_by_three_block() {
        let tiles = compute_needed_tiles((0.0, 0.0), 1024.0, 1024.0, 1024, &HashSet::new());
        let got: HashSet<_> = tiles.iter().copied().collect();
        let mut expected = HashSet::new();
        for x in [-1024, 0, 1024] {
            for y in [-1024, 0, 1024] {
                expected.insert(tile(x, y));
            }
        }
        assert_eq!(tiles.len(), 9);
        assert_eq!(got, expected);
    }

    #[test]
    fn zero_area_viewport_needs_nothing() {
        assert!(compute_needed_tiles((0.0, 0.0), 0.0, 600.0, 1024, &HashSet::new()).is_empty());
        assert!(compute_needed_tiles((0.0, 0.0), 800.0, 0.0, 1024, &HashSet::new()).is_empty());
    }

    #[test]
    fn known_tiles_are_not_emitted_again() {
        let mut existing: HashSet<_> =
            compute_needed_tiles((0.0, 0.0), 1024.0, 1024.0, 1024, &HashSet::new())
                .into_iter()
                .collect();
        let again = compute_needed_tiles((0.0, 0.0), 1024.0, 1024.0, 1024, &existing);
        assert!(again.is_empty());

        let panned = compute_needed_tiles((1500.0, 0.0), 1024.0, 1024.0, 1024, &existing);
        assert!(!panned.is_empty());
        for t in &panned {
            assert!(!existing.contains(t), "{t:?} re-emitted");
        }
        existing.extend(panned);
    }

    #[test]
    fn window_covers_every_visible_tile() {
        let side = 256;
        let centers = [(0.0, 0.0), (-1000.5, 333.3), (12345.0, -98765.0), (128.0, 128.0)];
        for center in centers {
            let (width, height) = (700.0, 450.0);
            let window = TileWindow::around(center, width, height, side, 1).unwrap();
            let existing: HashSet<_> = window.tiles().take(3).collect();
            let mut union: HashSet<_> = missing_tiles(&window, &existing).into_iter().collect();
            union.extend(existing.iter().copied());

            // every tile of the padded window
            for t in window.tiles() {
                assert!(union.contains(&t));
            }
            // every tile touching the visible rectangle
            let low_x = ((center.0 - width / 2.0) / side as f64).floor() as i64;
            let high_x = ((center.0 + width / 2.0) / side as f64).floor() as i64;
            let low_y = ((center.1 - height / 2.0) / side as f64).floor() as i64;
            let high_y = ((center.1 + height / 2.0) / side as f64).floor() as i64;
            for tx in low_x..=high_x {
                for ty in low_y..=high_y {
                    let t = tile(tx * side as i64, ty * side as i64);
                    assert!(union.contains(&t), "gap at {t:?} for center {center:?}");
                }
            }
        }
    }

    #[test]
    fn tiles_are_grid_aligned() {
        let window = TileWindow::around((-77.0, 5000.0), 3000.0, 2000.0, 512, 2).unwrap();
        for t in window.tiles() {
            assert_eq!(t.x.rem_euclid(512), 0);
            assert_eq!(t.y.rem_euclid(512), 0);
        }
    }

    #[test]
    fn distance_is_zero_inside_window() {
        let window = TileWindow::around((0.0, 0.0), 1024.0, 1024.0, 1024, 1).unwrap();
        assert_eq!(window.distance_in_tiles(tile(0, 0)), 0);
        assert_eq!(window.distance_in_tiles(tile(3072, 0)), 2);
        assert_eq!(window.distance_in_tiles(tile(-1024, -4096)), 3);
    }

    #[test]
    fn tile_count_matches_enumeration() {
        let window = TileWindow::around((0.0, 0.0), 1024.0, 1024.0, 1024, 1).unwrap();
        assert_eq!(window.tile_count(), 9);
        assert_eq!(window.tile_count(), window.tiles().count() as u64);

        let huge = TileWindow::around((0.0, 0.0), 1.28e9, 7.2e8, 1024, 1).unwrap();
        assert!(huge.tile_count() > MAX_WINDOW_TILES);
    }
}
