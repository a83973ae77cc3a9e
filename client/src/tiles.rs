use std::collections::HashSet;

use pixboard_shared::TileCoord;

use crate::windowing::TileWindow;

/// Every background tile the session has asked for, in the order it was
/// first needed.
#[derive(Debug, Default)]
pub struct TileCache {
    order: Vec<TileCoord>,
    index: HashSet<TileCoord>,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds tiles not already known and returns the ones that were new.
    pub fn add_tiles(&mut self, tiles: impl IntoIterator<Item = TileCoord>) -> Vec<TileCoord> {
        let mut added = Vec::new();
        for tile in tiles {
            if self.index.insert(tile) {
                self.order.push(tile);
                added.push(tile);
            }
        }
        added
    }

    pub fn contains(&self, tile: TileCoord) -> bool {
        self.index.contains(&tile)
    }

    pub fn as_set(&self) -> &HashSet<TileCoord> {
        &self.index
    }

    pub fn tiles(&self) -> &[TileCoord] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drops tiles lying more than `radius` tiles outside `window` and returns them.
    pub fn evict_outside(&mut self, window: &TileWindow, radius: u32) -> Vec<TileCoord> {
        let mut evicted = Vec::new();
        self.order.retain(|tile| {
            if window.distance_in_tiles(*tile) > u64::from(radius) {
                evicted.push(*tile);
                false
            } else {
                true
            }
        });
        for tile in &evicted {
            self.index.remove(tile);
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(x: i64, y: i64) -> TileCoord {
        TileCoord { x, y }
    }

    #[test]
    fn adding_is_idempotent() {
        let mut cache = TileCache::new();
        assert_eq!(cache.add_tiles([tile(0, 0), tile(1024, 0)]).len(), 2);
        assert_eq!(cache.add_tiles([tile(0, 0), tile(0, 0)]), Vec::new());
        assert_eq!(cache.add_tiles([tile(0, 1024), tile(0, 1024)]), vec![tile(0, 1024)]);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.tiles(), &[tile(0, 0), tile(1024, 0), tile(0, 1024)]);
    }

    #[test]
    fn eviction_keeps_window_and_radius() {
        let mut cache = TileCache::new();
        let window = TileWindow::around((0.0, 0.0), 1024.0, 1024.0, 1024, 1).unwrap();
        cache.add_tiles(window.tiles());
        cache.add_tiles([tile(2048, 0), tile(5120, 0), tile(0, -8192)]);

        let evicted = cache.evict_outside(&window, 1);
        assert_eq!(evicted, vec![tile(5120, 0), tile(0, -8192)]);
        assert!(cache.contains(tile(2048, 0)));
        assert!(!cache.contains(tile(5120, 0)));
        for t in window.tiles() {
            assert!(cache.contains(t));
        }
        // evicted tiles can be required again later
        assert_eq!(cache.add_tiles([tile(5120, 0)]), vec![tile(5120, 0)]);
    }
}
