//! Collision-aware label placement over a bit-packed occupancy grid.

pub mod grid;
pub mod placer;
pub mod position;

pub use grid::{CellRange, GridSpec, LabelId, MAX_GRID_CELLS, OccupancyEntry, OccupancyGrid};
pub use placer::{
    CandidatePositions, CollisionMode, LabelCandidate, LabelEngine, LabelPlacement,
    LabelPlacementConfig, PlacementDecision, PlacementOptions, PlacementResult, fixed_placements,
    place,
};
pub use position::{CandidatePosition, LabelAnchor, PositionedBox, TextAlign, TextBaseline};
