use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use pixboard_shared::{Color, Coordinate};
use uuid::Uuid;

/// Identity of one edit, assigned when the edit is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditId(Uuid);

impl EditId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EditId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EditId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrigin {
    /// Applied locally, not yet acknowledged by the service.
    Optimistic,
    /// Learned from a poll, or a local edit the service acknowledged.
    Confirmed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub id: EditId,
    pub coordinate: Coordinate,
    pub color: Color,
    pub erased: bool,
    pub at: DateTime<Utc>,
    pub origin: EditOrigin,
}

/// A confirmed change reported by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEdit {
    pub coordinate: Coordinate,
    pub color: Color,
    pub erased: bool,
    pub at: DateTime<Utc>,
}

/// What a coordinate should look like on top of the background tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelValue {
    /// Nothing painted over the canvas background.
    Background,
    Painted(Color),
}

impl PixelValue {
    pub fn resolve(self, background: Color) -> Color {
        match self {
            PixelValue::Background => background,
            PixelValue::Painted(color) => color,
        }
    }
}

/// Per-coordinate log of edits layered over the tile images.
///
/// Lists are kept oldest-first in storage so that prepending is a push; the
/// most recently learned edit is the one rendered. Order is arrival order,
/// never the edits' own timestamps.
///
/// Confirmed entries that no rollback can reach again are dropped: only the
/// newest confirmed entry beneath the oldest optimistic edit is kept.
#[derive(Debug, Default)]
pub struct PixelOverlay {
    pixels: HashMap<Coordinate, Vec<Edit>>,
}

impl PixelOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_edit(&mut self, coordinate: Coordinate, color: Color, erased: bool, id: EditId) {
        self.pixels.entry(coordinate).or_default().push(Edit {
            id,
            coordinate,
            color,
            erased,
            at: Utc::now(),
            origin: EditOrigin::Optimistic,
        });
    }

    /// Removes the edit with `id` wherever it sits in the coordinate's log.
    /// Returns false when no such edit exists.
    pub fn rollback_edit(&mut self, coordinate: Coordinate, id: EditId) -> bool {
        let Some(edits) = self.pixels.get_mut(&coordinate) else {
            return false;
        };
        let Some(index) = edits.iter().position(|edit| edit.id == id) else {
            return false;
        };
        edits.remove(index);
        if edits.is_empty() {
            self.pixels.remove(&coordinate);
        } else {
            compact(edits);
        }
        true
    }

    /// Marks an optimistic edit as acknowledged. Its position is unchanged.
    pub fn confirm_edit(&mut self, coordinate: Coordinate, id: EditId) -> bool {
        let Some(edits) = self.pixels.get_mut(&coordinate) else {
            return false;
        };
        let Some(edit) = edits.iter_mut().find(|edit| edit.id == id) else {
            return false;
        };
        edit.origin = EditOrigin::Confirmed;
        compact(edits);
        true
    }

    /// Records confirmed edits on top of whatever each coordinate holds and
    /// returns the coordinates touched, in arrival order without repeats.
    pub fn merge_remote(&mut self, edits: impl IntoIterator<Item = RemoteEdit>) -> Vec<Coordinate> {
        let mut touched = Vec::new();
        let mut seen = HashSet::new();
        for edit in edits {
            let log = self.pixels.entry(edit.coordinate).or_default();
            log.push(Edit {
                id: EditId::new(),
                coordinate: edit.coordinate,
                color: edit.color,
                erased: edit.erased,
                at: edit.at,
                origin: EditOrigin::Confirmed,
            });
            compact(log);
            if seen.insert(edit.coordinate) {
                touched.push(edit.coordinate);
            }
        }
        touched
    }

    pub fn effective(&self, coordinate: Coordinate) -> PixelValue {
        match self.pixels.get(&coordinate).and_then(|edits| edits.last()) {
            Some(edit) if !edit.erased => PixelValue::Painted(edit.color),
            _ => PixelValue::Background,
        }
    }

    /// Effective value of every coordinate that has at least one edit.
    /// An erased head is reported as [`PixelValue::Background`] so the
    /// renderer can cover the tile image underneath.
    pub fn effective_pixels(&self) -> Vec<(Coordinate, PixelValue)> {
        let mut pixels: Vec<_> = self
            .pixels
            .keys()
            .map(|coordinate| (*coordinate, self.effective(*coordinate)))
            .collect();
        pixels.sort_by_key(|(coordinate, _)| *coordinate);
        pixels
    }

    /// Edits at `coordinate`, most recent first.
    pub fn history(&self, coordinate: Coordinate) -> impl Iterator<Item = &Edit> {
        self.pixels
            .get(&coordinate)
            .into_iter()
            .flat_map(|edits| edits.iter().rev())
    }

    pub fn pending_count(&self) -> usize {
        self.pixels
            .values()
            .flatten()
            .filter(|edit| edit.origin == EditOrigin::Optimistic)
            .count()
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn clear(&mut self) {
        self.pixels.clear();
    }
}

/// Drops confirmed entries older than the one the oldest optimistic edit
/// would fall back to.
fn compact(edits: &mut Vec<Edit>) {
    let oldest_pending = edits
        .iter()
        .position(|edit| edit.origin == EditOrigin::Optimistic)
        .unwrap_or(edits.len());
    let keep_from = oldest_pending.saturating_sub(1);
    if keep_from > 0 {
        edits.drain(..keep_from);
    }
}
