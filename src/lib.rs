//! chart-reflow: invalidation scheduling and label placement for chart
//! components.
//!
//! Each chart instance maps input mutations to dirty flags, flushes them as
//! one rank-ordered pass of recompute steps, and places data labels without
//! overlap on a bit-packed occupancy grid.

pub mod api;
pub mod core;
pub mod error;
pub mod labels;
pub mod telemetry;

pub use api::{
    ChartComponent, ChartComponentConfig, ChartKind, DirtyFlag, DirtyFlags, InvalidationScheduler,
    MutationEffectTable, StepTable,
};
pub use error::{ChartError, ChartResult};
pub use labels::{LabelCandidate, LabelEngine, OccupancyGrid, PlacementOptions, place};
