use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::core::{BoundingBox, Viewport};
use crate::error::{ChartError, ChartResult};

use super::{
    CandidatePosition, GridSpec, LabelAnchor, LabelId, OccupancyEntry, OccupancyGrid,
    PositionedBox, TextAlign, TextBaseline,
};

pub type CandidatePositions = SmallVec<[CandidatePosition; 4]>;

/// A label waiting to be placed next to its mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCandidate {
    pub id: LabelId,
    /// Bounding box of the mark the label belongs to.
    pub anchor: BoundingBox,
    pub width: f64,
    pub height: f64,
    /// Positions to try, best first.
    pub positions: CandidatePositions,
    /// Data-hidden or fully transparent labels are left alone.
    pub suppressed: bool,
}

impl LabelCandidate {
    #[must_use]
    pub fn new(id: impl Into<LabelId>, anchor: BoundingBox, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            anchor,
            width,
            height,
            positions: SmallVec::new(),
            suppressed: false,
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: CandidatePosition) -> Self {
        self.positions.push(position);
        self
    }

    #[must_use]
    pub fn with_positions(mut self, positions: impl IntoIterator<Item = CandidatePosition>) -> Self {
        self.positions.extend(positions);
        self
    }

    #[must_use]
    pub fn suppressed(mut self, suppressed: bool) -> Self {
        self.suppressed = suppressed;
        self
    }

    fn validate(&self) -> ChartResult<()> {
        self.anchor.validate("label anchor")?;
        if !self.width.is_finite() || !self.height.is_finite() || self.width < 0.0 || self.height < 0.0
        {
            return Err(ChartError::InvalidData(format!(
                "label `{}` size must be finite and >= 0",
                self.id
            )));
        }
        if let Some(position) = self.positions.iter().find(|p| !p.offset.is_finite()) {
            return Err(ChartError::InvalidData(format!(
                "label `{}` has a non-finite offset at {}",
                self.id, position.anchor
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlacementOptions {
    /// Keep every label at its last committed box; only decide visibility.
    pub hide_only: bool,
    /// Only release labels that are no longer present.
    pub remove_only: bool,
    /// Preview: compute placements but hand back the grid untouched.
    pub suppress_mark_draw: bool,
}

impl PlacementOptions {
    #[must_use]
    pub const fn full() -> Self {
        Self {
            hide_only: false,
            remove_only: false,
            suppress_mark_draw: false,
        }
    }

    #[must_use]
    pub const fn hide_only() -> Self {
        Self {
            hide_only: true,
            ..Self::full()
        }
    }

    #[must_use]
    pub const fn remove_only() -> Self {
        Self {
            remove_only: true,
            ..Self::full()
        }
    }

    #[must_use]
    pub const fn with_suppress_mark_draw(mut self, suppress: bool) -> Self {
        self.suppress_mark_draw = suppress;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlacementDecision {
    Placed {
        position: CandidatePosition,
        bbox: BoundingBox,
        align: TextAlign,
        baseline: TextBaseline,
    },
    /// No candidate position was free; the label is hidden.
    NoFit,
    /// Suppressed label, grid untouched.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPlacement {
    pub id: LabelId,
    pub decision: PlacementDecision,
}

impl LabelPlacement {
    fn placed(id: LabelId, position: CandidatePosition, placed: PositionedBox) -> Self {
        Self {
            id,
            decision: PlacementDecision::Placed {
                position,
                bbox: placed.bbox,
                align: placed.align,
                baseline: placed.baseline,
            },
        }
    }

    #[must_use]
    pub fn is_placed(&self) -> bool {
        matches!(self.decision, PlacementDecision::Placed { .. })
    }

    #[must_use]
    pub fn position(&self) -> Option<CandidatePosition> {
        match self.decision {
            PlacementDecision::Placed { position, .. } => Some(position),
            PlacementDecision::NoFit | PlacementDecision::Skipped => None,
        }
    }

    #[must_use]
    pub fn anchor(&self) -> Option<LabelAnchor> {
        self.position().map(|position| position.anchor)
    }

    #[must_use]
    pub fn bbox(&self) -> Option<BoundingBox> {
        match self.decision {
            PlacementDecision::Placed { bbox, .. } => Some(bbox),
            PlacementDecision::NoFit | PlacementDecision::Skipped => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementResult {
    pub grid: OccupancyGrid,
    pub placements: Vec<LabelPlacement>,
}

impl PlacementResult {
    #[must_use]
    pub fn placed_count(&self) -> usize {
        self.placements
            .iter()
            .filter(|placement| placement.is_placed())
            .count()
    }

    #[must_use]
    pub fn placement(&self, id: &LabelId) -> Option<&LabelPlacement> {
        self.placements.iter().find(|placement| placement.id == *id)
    }
}

/// Assigns each label the first free candidate position.
///
/// Labels are processed in input order, so earlier labels win ties. The grid
/// is taken by value and handed back updated, unless `suppress_mark_draw` is
/// set, in which case the input grid is returned unchanged.
pub fn place(
    labels: &[LabelCandidate],
    grid: OccupancyGrid,
    avoid_regions: &[BoundingBox],
    options: PlacementOptions,
) -> ChartResult<PlacementResult> {
    if options.hide_only && options.remove_only {
        return Err(ChartError::InvalidData(
            "hide_only and remove_only placement cannot be combined".to_owned(),
        ));
    }
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        label.validate()?;
        if !seen.insert(&label.id) {
            return Err(ChartError::InvalidData(format!(
                "duplicate label id `{}`",
                label.id
            )));
        }
    }
    for region in avoid_regions {
        region.validate("avoid region")?;
    }

    let preserved = options.suppress_mark_draw.then(|| grid.clone());
    let mut working = grid;

    let placements = if options.remove_only {
        remove_stale(labels, &mut working);
        Vec::new()
    } else if options.hide_only {
        labels
            .iter()
            .map(|label| recheck_visibility(label, &mut working, avoid_regions))
            .collect()
    } else {
        labels
            .iter()
            .map(|label| place_label(label, &mut working, avoid_regions))
            .collect::<Vec<_>>()
    };

    debug!(
        labels = labels.len(),
        placed = placements.iter().filter(|p| p.is_placed()).count(),
        hide_only = options.hide_only,
        remove_only = options.remove_only,
        preview = options.suppress_mark_draw,
        "label placement finished"
    );

    Ok(PlacementResult {
        grid: preserved.unwrap_or(working),
        placements,
    })
}

fn place_label(
    label: &LabelCandidate,
    grid: &mut OccupancyGrid,
    avoid_regions: &[BoundingBox],
) -> LabelPlacement {
    if label.suppressed {
        return LabelPlacement {
            id: label.id.clone(),
            decision: PlacementDecision::Skipped,
        };
    }
    grid.release(&label.id);

    let viewport = grid.spec().viewport;
    if label
        .anchor
        .lies_outside(f64::from(viewport.width), f64::from(viewport.height))
    {
        trace!(label = %label.id, "mark lies outside the chart; label not placed");
        return LabelPlacement {
            id: label.id.clone(),
            decision: PlacementDecision::NoFit,
        };
    }

    for position in &label.positions {
        let placed = position.place_box(label.anchor, label.width, label.height);
        let Some(cells) = grid.cell_range(placed.bbox) else {
            trace!(label = %label.id, anchor = %position.anchor, "candidate off the grid");
            continue;
        };
        if !grid.is_free(cells) {
            trace!(label = %label.id, anchor = %position.anchor, "candidate collides");
            continue;
        }
        if avoid_regions.iter().any(|region| region.intersects(placed.bbox)) {
            trace!(label = %label.id, anchor = %position.anchor, "candidate hits avoid region");
            continue;
        }

        grid.commit(
            label.id.clone(),
            OccupancyEntry {
                position: *position,
                placed,
                cells: Some(cells),
            },
        );
        return LabelPlacement::placed(label.id.clone(), *position, placed);
    }

    LabelPlacement {
        id: label.id.clone(),
        decision: PlacementDecision::NoFit,
    }
}

fn recheck_visibility(
    label: &LabelCandidate,
    grid: &mut OccupancyGrid,
    avoid_regions: &[BoundingBox],
) -> LabelPlacement {
    if label.suppressed {
        return LabelPlacement {
            id: label.id.clone(),
            decision: PlacementDecision::Skipped,
        };
    }
    let Some(mut entry) = grid.release(&label.id) else {
        return LabelPlacement {
            id: label.id.clone(),
            decision: PlacementDecision::NoFit,
        };
    };

    let bbox = entry.placed.bbox;
    entry.cells = grid
        .cell_range(bbox)
        .filter(|cells| grid.is_free(*cells))
        .filter(|_| !avoid_regions.iter().any(|region| region.intersects(bbox)));
    let visible = entry.is_visible();
    trace!(label = %label.id, visible, "label visibility rechecked");
    grid.commit(label.id.clone(), entry);

    if visible {
        LabelPlacement::placed(label.id.clone(), entry.position, entry.placed)
    } else {
        LabelPlacement {
            id: label.id.clone(),
            decision: PlacementDecision::NoFit,
        }
    }
}

fn remove_stale(labels: &[LabelCandidate], grid: &mut OccupancyGrid) {
    let present = labels.iter().map(|label| &label.id).collect::<HashSet<_>>();
    let stale = grid
        .entries()
        .map(|(id, _)| id)
        .filter(|id| !present.contains(id))
        .cloned()
        .collect::<Vec<_>>();
    for id in stale {
        trace!(label = %id, "releasing removed label");
        grid.release(&id);
    }
}

/// Every label at its first candidate position, ignoring collisions.
#[must_use]
pub fn fixed_placements(labels: &[LabelCandidate]) -> Vec<LabelPlacement> {
    labels
        .iter()
        .map(|label| {
            let first = label.positions.first().filter(|_| !label.suppressed);
            match first {
                Some(position) => LabelPlacement::placed(
                    label.id.clone(),
                    *position,
                    position.place_box(label.anchor, label.width, label.height),
                ),
                None if label.suppressed => LabelPlacement {
                    id: label.id.clone(),
                    decision: PlacementDecision::Skipped,
                },
                None => LabelPlacement {
                    id: label.id.clone(),
                    decision: PlacementDecision::NoFit,
                },
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionMode {
    /// Full collision placement on data and layout changes.
    #[default]
    Auto,
    /// Labels keep their boxes; collisions only hide them.
    HideOnly,
    /// Labels always use their first position.
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelPlacementConfig {
    /// Overrides the size-derived grid cell size.
    pub cell_size_px: Option<f64>,
    pub padding_px: f64,
    /// Used for candidates that bring no positions of their own.
    pub default_positions: Vec<CandidatePosition>,
    pub collision: CollisionMode,
}

impl Default for LabelPlacementConfig {
    fn default() -> Self {
        Self {
            cell_size_px: None,
            padding_px: super::grid::DEFAULT_GRID_PADDING_PX,
            default_positions: vec![
                CandidatePosition::new(LabelAnchor::Top, 4.0),
                CandidatePosition::new(LabelAnchor::Bottom, 4.0),
            ],
            collision: CollisionMode::Auto,
        }
    }
}

impl LabelPlacementConfig {
    pub fn validate(self) -> ChartResult<Self> {
        if self
            .cell_size_px
            .is_some_and(|size| !size.is_finite() || size < 1.0)
        {
            return Err(ChartError::InvalidData(
                "label config `cell_size_px` must be finite and >= 1".to_owned(),
            ));
        }
        if !self.padding_px.is_finite() || self.padding_px < 0.0 {
            return Err(ChartError::InvalidData(
                "label config `padding_px` must be finite and >= 0".to_owned(),
            ));
        }
        if self
            .default_positions
            .iter()
            .any(|position| !position.offset.is_finite())
        {
            return Err(ChartError::InvalidData(
                "label config `default_positions` offsets must be finite".to_owned(),
            ));
        }
        Ok(self)
    }
}

/// Configured front end to [`place`] that owns grid allocation policy.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEngine {
    config: LabelPlacementConfig,
}

impl LabelEngine {
    pub fn new(config: LabelPlacementConfig) -> ChartResult<Self> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    #[must_use]
    pub fn config(&self) -> &LabelPlacementConfig {
        &self.config
    }

    #[must_use]
    pub fn grid_spec(&self, viewport: Viewport) -> GridSpec {
        let spec = GridSpec::for_viewport(viewport).with_padding(self.config.padding_px);
        match self.config.cell_size_px {
            Some(size) => spec.with_cell_size(size),
            None => spec,
        }
    }

    /// Returns `previous` when it can be patched, otherwise a fresh grid.
    ///
    /// A grid is never patched across a resolution change; `force_fresh`
    /// also reallocates when marks moved under an unchanged resolution.
    pub fn prepare_grid(
        &self,
        viewport: Viewport,
        previous: Option<OccupancyGrid>,
        force_fresh: bool,
    ) -> ChartResult<OccupancyGrid> {
        let spec = self.grid_spec(viewport);
        match previous {
            Some(grid) if !force_fresh && grid.matches(&spec) => Ok(grid),
            _ => {
                debug!(
                    width = viewport.width,
                    height = viewport.height,
                    cell_size = spec.cell_size_px,
                    "allocating occupancy grid"
                );
                OccupancyGrid::new(spec)
            }
        }
    }

    /// Fills in default positions, then places.
    pub fn place(
        &self,
        labels: &[LabelCandidate],
        grid: OccupancyGrid,
        avoid_regions: &[BoundingBox],
        options: PlacementOptions,
    ) -> ChartResult<PlacementResult> {
        if labels.iter().all(|label| !label.positions.is_empty()) {
            return place(labels, grid, avoid_regions, options);
        }
        let filled = self.with_default_positions(labels);
        place(&filled, grid, avoid_regions, options)
    }

    #[must_use]
    pub fn fixed_placements(&self, labels: &[LabelCandidate]) -> Vec<LabelPlacement> {
        fixed_placements(&self.with_default_positions(labels))
    }

    fn with_default_positions(&self, labels: &[LabelCandidate]) -> Vec<LabelCandidate> {
        labels
            .iter()
            .map(|label| {
                if label.positions.is_empty() {
                    label
                        .clone()
                        .with_positions(self.config.default_positions.iter().copied())
                } else {
                    label.clone()
                }
            })
            .collect()
    }
}
