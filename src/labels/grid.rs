use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{BoundingBox, Viewport};
use crate::error::{ChartError, ChartResult};

use super::{CandidatePosition, PositionedBox};

const WORD_BITS: usize = 32;

/// Canvases up to this many pixels map one pixel to one cell.
const UNIT_CELL_AREA: f64 = 1_000_000.0;

pub const DEFAULT_GRID_PADDING_PX: f64 = 1.0;

/// Upper bound on cells per grid; a cell size override may not exceed it.
pub const MAX_GRID_CELLS: usize = 1 << 24;

/// Stable label identity, derived from the owning data record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(String);

impl LabelId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LabelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LabelId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Resolution of an occupancy grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub viewport: Viewport,
    pub cell_size_px: f64,
    pub padding_px: f64,
}

impl GridSpec {
    /// Cell size `max(1, sqrt(w * h / 1e6))` so large canvases stay near a
    /// million cells.
    #[must_use]
    pub fn for_viewport(viewport: Viewport) -> Self {
        let area = f64::from(viewport.width) * f64::from(viewport.height);
        Self {
            viewport,
            cell_size_px: (area / UNIT_CELL_AREA).sqrt().max(1.0),
            padding_px: DEFAULT_GRID_PADDING_PX,
        }
    }

    #[must_use]
    pub fn with_cell_size(mut self, cell_size_px: f64) -> Self {
        self.cell_size_px = cell_size_px;
        self
    }

    #[must_use]
    pub fn with_padding(mut self, padding_px: f64) -> Self {
        self.padding_px = padding_px;
        self
    }

    pub fn validate(self) -> ChartResult<Self> {
        if !self.viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }
        if !self.cell_size_px.is_finite() || self.cell_size_px < 1.0 {
            return Err(ChartError::InvalidData(
                "grid cell size must be finite and >= 1".to_owned(),
            ));
        }
        if !self.padding_px.is_finite() || self.padding_px < 0.0 {
            return Err(ChartError::InvalidData(
                "grid padding must be finite and >= 0".to_owned(),
            ));
        }
        Ok(self)
    }

    fn cells_along(self, pixels: u32) -> usize {
        let span = f64::from(pixels) + 2.0 * self.padding_px + self.cell_size_px;
        (span / self.cell_size_px).floor() as usize
    }
}

/// Inclusive rectangle of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub x1: usize,
    pub y1: usize,
    pub x2: usize,
    pub y2: usize,
}

impl CellRange {
    #[must_use]
    pub fn cell_count(self) -> usize {
        (self.x2 - self.x1 + 1) * (self.y2 - self.y1 + 1)
    }
}

/// Last committed state of a label in the grid.
///
/// `cells` is `None` while the label is hidden; a hidden label holds no cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OccupancyEntry {
    pub position: CandidatePosition,
    pub placed: PositionedBox,
    pub cells: Option<CellRange>,
}

impl OccupancyEntry {
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.cells.is_some()
    }
}

/// Bit-packed occupancy over chart pixel space plus a reverse index from label
/// identity to the cells it holds.
///
/// Obstacles live in their own layer, so releasing a label never clears an
/// obstacle drawn underneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    spec: GridSpec,
    columns: usize,
    rows: usize,
    words: Vec<u32>,
    obstacles: Vec<u32>,
    entries: IndexMap<LabelId, OccupancyEntry>,
}

impl OccupancyGrid {
    pub fn new(spec: GridSpec) -> ChartResult<Self> {
        let spec = spec.validate()?;
        let columns = spec.cells_along(spec.viewport.width);
        let rows = spec.cells_along(spec.viewport.height);
        let cells = columns
            .checked_mul(rows)
            .filter(|cells| *cells <= MAX_GRID_CELLS)
            .ok_or_else(|| {
                ChartError::InvalidData(format!(
                    "occupancy grid of {columns}x{rows} cells exceeds {MAX_GRID_CELLS} cells; \
                     raise the cell size"
                ))
            })?;
        let words = cells / WORD_BITS + 1;
        Ok(Self {
            spec,
            columns,
            rows,
            words: vec![0; words],
            obstacles: vec![0; words],
            entries: IndexMap::new(),
        })
    }

    pub fn for_viewport(viewport: Viewport) -> ChartResult<Self> {
        Self::new(GridSpec::for_viewport(viewport))
    }

    #[must_use]
    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// `true` when this grid was allocated at exactly `spec`'s resolution and
    /// may be patched instead of reallocated.
    #[must_use]
    pub fn matches(&self, spec: &GridSpec) -> bool {
        self.spec == *spec
    }

    fn scale(&self, pixel: f64) -> f64 {
        ((pixel + self.spec.padding_px) / self.spec.cell_size_px).floor()
    }

    /// Cells covered by `bbox`, or `None` when any part falls off the grid.
    #[must_use]
    pub fn cell_range(&self, bbox: BoundingBox) -> Option<CellRange> {
        let (x1, y1) = (self.scale(bbox.x1), self.scale(bbox.y1));
        let (x2, y2) = (self.scale(bbox.x2), self.scale(bbox.y2));
        if !(x1 >= 0.0 && y1 >= 0.0) || x2 >= self.columns as f64 || y2 >= self.rows as f64 {
            return None;
        }
        Some(CellRange {
            x1: x1 as usize,
            y1: y1 as usize,
            x2: x2 as usize,
            y2: y2 as usize,
        })
    }

    /// Cells covered by `bbox`, clipped to the grid. `None` if nothing remains.
    #[must_use]
    pub fn clipped_cell_range(&self, bbox: BoundingBox) -> Option<CellRange> {
        let max_x = (self.columns - 1) as f64;
        let max_y = (self.rows - 1) as f64;
        let (x1, y1) = (self.scale(bbox.x1), self.scale(bbox.y1));
        let (x2, y2) = (self.scale(bbox.x2), self.scale(bbox.y2));
        if !(x2 >= 0.0 && y2 >= 0.0 && x1 <= max_x && y1 <= max_y) {
            return None;
        }
        Some(CellRange {
            x1: x1.max(0.0) as usize,
            y1: y1.max(0.0) as usize,
            x2: x2.min(max_x) as usize,
            y2: y2.min(max_y) as usize,
        })
    }

    fn row_spans(&self, range: CellRange) -> impl Iterator<Item = (usize, u32)> + use<> {
        let columns = self.columns;
        (range.y1..=range.y2).flat_map(move |row| {
            let start = row * columns + range.x1;
            let end = row * columns + range.x2;
            span_masks(start, end)
        })
    }

    #[must_use]
    pub fn is_free(&self, range: CellRange) -> bool {
        self.row_spans(range)
            .all(|(word, mask)| (self.words[word] | self.obstacles[word]) & mask == 0)
    }

    /// Marks label cells. Obstacles go through [`Self::mark_region`].
    pub fn mark(&mut self, range: CellRange) {
        for (word, mask) in self.row_spans(range) {
            self.words[word] |= mask;
        }
    }

    pub fn unmark(&mut self, range: CellRange) {
        for (word, mask) in self.row_spans(range) {
            self.words[word] &= !mask;
        }
    }

    #[must_use]
    pub fn is_occupied(&self, column: usize, row: usize) -> bool {
        if column >= self.columns || row >= self.rows {
            return false;
        }
        let index = row * self.columns + column;
        let word = index / WORD_BITS;
        (self.words[word] | self.obstacles[word]) & (1 << (index % WORD_BITS)) != 0
    }

    /// Marks the on-grid part of an obstacle such as a drawn mark.
    ///
    /// Obstacle cells stay set for the life of the grid; only reallocation
    /// clears them.
    pub fn mark_region(&mut self, bbox: BoundingBox) {
        let Some(range) = self.clipped_cell_range(bbox) else {
            return;
        };
        for (word, mask) in self.row_spans(range) {
            self.obstacles[word] |= mask;
        }
    }

    /// Cells held by a label, an obstacle, or both.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.words
            .iter()
            .zip(&self.obstacles)
            .map(|(labels, obstacles)| (labels | obstacles).count_ones() as usize)
            .sum()
    }

    #[must_use]
    pub fn entry(&self, id: &LabelId) -> Option<&OccupancyEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&LabelId, &OccupancyEntry)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Records `entry` for `id`, marking its cells when visible.
    pub fn commit(&mut self, id: LabelId, entry: OccupancyEntry) {
        if let Some(range) = entry.cells {
            self.mark(range);
        }
        self.entries.insert(id, entry);
    }

    /// Drops the entry for `id`, clearing exactly the cells it held.
    pub fn release(&mut self, id: &LabelId) -> Option<OccupancyEntry> {
        let entry = self.entries.shift_remove(id)?;
        if let Some(range) = entry.cells {
            self.unmark(range);
        }
        Some(entry)
    }
}

fn span_masks(start: usize, end: usize) -> impl Iterator<Item = (usize, u32)> {
    let first = start / WORD_BITS;
    let last = end / WORD_BITS;
    (first..=last).map(move |word| {
        let low = if word == first { start % WORD_BITS } else { 0 };
        let high = if word == last {
            end % WORD_BITS
        } else {
            WORD_BITS - 1
        };
        let mask = (u32::MAX >> (WORD_BITS - 1 - high)) & (u32::MAX << low);
        (word, mask)
    })
}

#[cfg(test)]
mod tests {
    use super::{GridSpec, LabelId, MAX_GRID_CELLS, OccupancyEntry, OccupancyGrid};
    use crate::core::{BoundingBox, Viewport};
    use crate::error::ChartError;
    use crate::labels::{CandidatePosition, LabelAnchor};

    #[test]
    fn small_canvases_use_unit_cells_with_padding() {
        let spec = GridSpec::for_viewport(Viewport::new(100, 50));
        assert_eq!(spec.cell_size_px, 1.0);
        let grid = OccupancyGrid::new(spec).expect("grid");
        assert_eq!(grid.columns(), 103);
        assert_eq!(grid.rows(), 53);
    }

    #[test]
    fn large_canvases_scale_cells_down() {
        let spec = GridSpec::for_viewport(Viewport::new(4000, 1000));
        assert_eq!(spec.cell_size_px, 2.0);
    }

    #[test]
    fn mark_spanning_word_boundaries_is_reversible() {
        let mut grid = OccupancyGrid::for_viewport(Viewport::new(200, 20)).expect("grid");
        let range = grid
            .cell_range(BoundingBox::new(10.0, 2.0, 120.0, 6.0))
            .expect("on grid");
        assert!(grid.is_free(range));
        grid.mark(range);
        assert_eq!(grid.occupied_cells(), range.cell_count());
        assert!(!grid.is_free(range));
        grid.unmark(range);
        assert_eq!(grid.occupied_cells(), 0);
    }

    #[test]
    fn boxes_off_the_grid_have_no_range() {
        let grid = OccupancyGrid::for_viewport(Viewport::new(50, 50)).expect("grid");
        assert!(grid.cell_range(BoundingBox::new(-5.0, 0.0, 4.0, 4.0)).is_none());
        assert!(grid.cell_range(BoundingBox::new(40.0, 40.0, 60.0, 45.0)).is_none());
        assert!(grid.clipped_cell_range(BoundingBox::new(40.0, 40.0, 60.0, 45.0)).is_some());
    }

    #[test]
    fn obstacles_survive_releasing_a_label_beneath_them() {
        let mut grid = OccupancyGrid::for_viewport(Viewport::new(100, 100)).expect("grid");
        let position = CandidatePosition::new(LabelAnchor::Top, 2.0);
        let placed = position.place_box(BoundingBox::point(50.0, 50.0), 20.0, 10.0);
        let cells = grid.cell_range(placed.bbox).expect("on grid");
        let id = LabelId::from("a");
        grid.commit(
            id.clone(),
            OccupancyEntry {
                position,
                placed,
                cells: Some(cells),
            },
        );

        grid.mark_region(placed.bbox);
        assert_eq!(grid.occupied_cells(), cells.cell_count());

        grid.release(&id).expect("committed entry");
        assert_eq!(grid.occupied_cells(), cells.cell_count());
        assert!(grid.is_occupied(cells.x1, cells.y1));
        assert!(!grid.is_free(cells));
    }

    #[test]
    fn oversized_grids_are_rejected() {
        let spec = GridSpec::for_viewport(Viewport::new(100_000, 100_000)).with_cell_size(1.0);
        let err = OccupancyGrid::new(spec).expect_err("too many cells");
        assert!(matches!(err, ChartError::InvalidData(ref message) if message.contains("cell size")));

        let default = GridSpec::for_viewport(Viewport::new(100_000, 100_000));
        let grid = OccupancyGrid::new(default).expect("default sizing stays bounded");
        assert!(grid.columns() * grid.rows() <= MAX_GRID_CELLS);
    }

    #[test]
    fn zero_sized_viewport_is_rejected() {
        assert!(OccupancyGrid::for_viewport(Viewport::new(0, 10)).is_err());
    }
}
