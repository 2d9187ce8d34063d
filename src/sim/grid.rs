//! Uniform spatial grid for broad-phase queries
//!
//! A key is registered in every cell its rectangle overlaps, so a query only
//! has to look at the cells under the query rectangle instead of every object.
//! Footprints are clipped to the world: a rectangle entirely outside
//! `[0, width) x [0, height)` occupies no cell and is never returned.

use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

use super::collision::Rect;

/// Occupancy snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridStats {
    /// Cells holding at least one key
    pub cells: usize,
    /// Key-to-cell registrations; a key spanning four cells counts four times
    pub registrations: usize,
}

/// Inclusive, already clipped cell range of one rectangle
#[derive(Debug, Clone, Copy)]
struct Footprint {
    x0: i32,
    x1: i32,
    y0: i32,
    y1: i32,
}

impl Footprint {
    fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        (self.x0..=self.x1).flat_map(move |x| (self.y0..=self.y1).map(move |y| (x, y)))
    }
}

/// Uniform grid over a fixed world rectangle
#[derive(Debug, Clone)]
pub struct SpatialGrid<K> {
    cell_size: f32,
    grid_width: i32,
    grid_height: i32,
    cells: FxHashMap<(i32, i32), Vec<K>>,
}

impl<K: Copy + Eq + Hash> SpatialGrid<K> {
    /// A non-positive or non-finite `cell_size` collapses the grid to one
    /// cell spanning the whole world.
    pub fn new(world_width: f32, world_height: f32, cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            log::warn!("Invalid grid cell size {}, using a single cell", cell_size);
            world_width.max(world_height).max(1.0)
        };
        Self {
            cell_size,
            grid_width: (world_width / cell_size).ceil() as i32,
            grid_height: (world_height / cell_size).ceil() as i32,
            cells: FxHashMap::default(),
        }
    }

    /// Grid dimensions in cells
    pub fn dimensions(&self) -> (i32, i32) {
        (self.grid_width, self.grid_height)
    }

    fn cell_coord(&self, v: f32) -> i32 {
        (v / self.cell_size).floor() as i32
    }

    fn footprint(&self, rect: &Rect) -> Option<Footprint> {
        let x0 = self.cell_coord(rect.x).max(0);
        let y0 = self.cell_coord(rect.y).max(0);
        let x1 = self.cell_coord(rect.right()).min(self.grid_width - 1);
        let y1 = self.cell_coord(rect.bottom()).min(self.grid_height - 1);
        (x0 <= x1 && y0 <= y1).then_some(Footprint { x0, x1, y0, y1 })
    }

    /// Register `key` in every cell `rect` overlaps
    pub fn insert(&mut self, key: K, rect: &Rect) {
        let Some(footprint) = self.footprint(rect) else {
            return;
        };
        for cell in footprint.cells() {
            self.cells.entry(cell).or_default().push(key);
        }
    }

    /// Remove `key` from every cell `rect` overlaps, pruning emptied cells
    ///
    /// `rect` must be the footprint the key was registered with.
    pub fn remove(&mut self, key: K, rect: &Rect) {
        let Some(footprint) = self.footprint(rect) else {
            return;
        };
        for cell in footprint.cells() {
            if let Some(keys) = self.cells.get_mut(&cell) {
                keys.retain(|k| *k != key);
                if keys.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    /// Re-register a moved key: full remove at the old corner, insert at the new
    pub fn update(&mut self, key: K, rect: &Rect, old_x: f32, old_y: f32) {
        self.remove(key, &rect.moved_to(old_x, old_y));
        self.insert(key, rect);
    }

    fn collect(&self, rect: &Rect, exclude: Option<K>) -> Vec<K> {
        let Some(footprint) = self.footprint(rect) else {
            return Vec::new();
        };
        let mut seen = FxHashSet::default();
        let mut nearby = Vec::new();
        for cell in footprint.cells() {
            let Some(keys) = self.cells.get(&cell) else {
                continue;
            };
            for &other in keys {
                if Some(other) != exclude && seen.insert(other) {
                    nearby.push(other);
                }
            }
        }
        nearby
    }

    /// Keys sharing at least one cell with `rect`, excluding `key` itself
    pub fn potential_collisions(&self, key: K, rect: &Rect) -> Vec<K> {
        self.collect(rect, Some(key))
    }

    /// Keys sharing at least one cell with `rect`
    pub fn query(&self, rect: &Rect) -> Vec<K> {
        self.collect(rect, None)
    }

    /// Occupants of the cell containing world point `(x, y)`
    pub fn objects_in_cell(&self, x: f32, y: f32) -> &[K] {
        let cell = (self.cell_coord(x), self.cell_coord(y));
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn stats(&self) -> GridStats {
        GridStats {
            cells: self.cells.len(),
            registrations: self.cells.values().map(Vec::len).sum(),
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
