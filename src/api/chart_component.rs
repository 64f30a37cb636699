use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::core::Viewport;
use crate::error::{ChartError, ChartResult};
use crate::labels::{
    CollisionMode, LabelCandidate, LabelEngine, LabelPlacement, OccupancyGrid, PlacementOptions,
    place,
};

use super::{
    ChartCollaborators, ChartComponentConfig, DirtyFlag, DirtyFlags, FlushReport,
    InvalidationScheduler, LabelFrame, MutationEffectTable, RenderContext, StepContext, StepKind,
    StepRunner, StepTable,
};

const RESIZE_FLAGS: DirtyFlags = DirtyFlags::from_flags(&[
    DirtyFlag::Layout,
    DirtyFlag::RecomputeScales,
    DirtyFlag::RedrawGeometry,
    DirtyFlag::Axes,
    DirtyFlag::Grid,
    DirtyFlag::RepositionLabels,
]);

const REPOSITION_FLAGS: DirtyFlags =
    DirtyFlags::from_flags(&[DirtyFlag::RepositionLabels, DirtyFlag::LabelContent]);

const MARK_MOVE_FLAGS: DirtyFlags =
    DirtyFlags::from_flags(&[DirtyFlag::EnterUpdateExit, DirtyFlag::RedrawGeometry]);

/// One chart instance: invalidation scheduler, label engine and the
/// chart-specific collaborators that back each step.
///
/// Inputs are recorded with [`mutate`](Self::mutate) and applied in one
/// ordered pass by [`flush`](Self::flush).
pub struct ChartComponent<C: ChartCollaborators> {
    collaborators: C,
    config: ChartComponentConfig,
    scheduler: InvalidationScheduler,
    labels: LabelEngine,
    grid: Option<OccupancyGrid>,
    grid_stale: bool,
    placements: Vec<LabelPlacement>,
    last_report: Option<FlushReport>,
}

impl<C: ChartCollaborators> ChartComponent<C> {
    /// Creates a component using the preset tables for `config.kind`.
    pub fn new(collaborators: C, config: ChartComponentConfig) -> ChartResult<Self> {
        let mutations = Arc::new(config.kind.mutation_table()?);
        let steps = Arc::new(config.kind.step_table()?);
        Self::with_tables(collaborators, config, mutations, steps)
    }

    pub fn with_tables(
        collaborators: C,
        config: ChartComponentConfig,
        mutations: Arc<MutationEffectTable>,
        steps: Arc<StepTable>,
    ) -> ChartResult<Self> {
        let config = config.validate()?;
        let labels = LabelEngine::new(config.labels.clone())?;
        let scheduler = InvalidationScheduler::new(mutations, steps)?;
        Ok(Self {
            collaborators,
            config,
            scheduler,
            labels,
            grid: None,
            grid_stale: true,
            placements: Vec::new(),
            last_report: None,
        })
    }

    /// Records an input change; see [`InvalidationScheduler::mutate`].
    pub fn mutate(
        &mut self,
        name: &str,
        old_value: &Value,
        new_value: &Value,
    ) -> ChartResult<DirtyFlags> {
        self.scheduler.mutate(name, old_value, new_value)
    }

    /// Changes the canvas size. The next flush relays out and reallocates the
    /// occupancy grid.
    pub fn resize(&mut self, viewport: Viewport) -> ChartResult<DirtyFlags> {
        if !viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        if viewport == self.config.viewport {
            return Ok(DirtyFlags::none());
        }
        self.config.viewport = viewport;
        let flags = RESIZE_FLAGS.intersection(self.scheduler.step_table().guarded_flags());
        self.scheduler.mark(flags)?;
        Ok(flags)
    }

    /// Applies every pending change in one ordered pass.
    pub fn flush(&mut self) -> ChartResult<&FlushReport> {
        let mut runner = ComponentSteps {
            collaborators: &mut self.collaborators,
            config: &self.config,
            labels: &self.labels,
            grid: &mut self.grid,
            grid_stale: &mut self.grid_stale,
            placements: &mut self.placements,
        };
        let report = self.scheduler.flush(&mut runner)?;
        Ok(&*self.last_report.insert(report))
    }

    /// Placements `candidates` would get against the current grid, without
    /// committing them.
    pub fn preview_labels(
        &self,
        candidates: &[LabelCandidate],
    ) -> ChartResult<Vec<LabelPlacement>> {
        let spec = self.labels.grid_spec(self.config.viewport);
        // A scratch grid stands in until a flush has marked the obstacles.
        let grid = match self.grid.as_ref() {
            Some(grid) if !self.grid_stale && grid.matches(&spec) => grid.clone(),
            _ => OccupancyGrid::new(spec)?,
        };
        let result = self.labels.place(
            candidates,
            grid,
            &[],
            PlacementOptions::full().with_suppress_mark_draw(true),
        )?;
        Ok(result.placements)
    }

    #[must_use]
    pub fn pending(&self) -> DirtyFlags {
        self.scheduler.pending()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.scheduler.has_pending()
    }

    #[must_use]
    pub fn last_report(&self) -> Option<&FlushReport> {
        self.last_report.as_ref()
    }

    #[must_use]
    pub fn placements(&self) -> &[LabelPlacement] {
        &self.placements
    }

    #[must_use]
    pub fn grid(&self) -> Option<&OccupancyGrid> {
        self.grid.as_ref()
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.config.viewport
    }

    #[must_use]
    pub fn config(&self) -> &ChartComponentConfig {
        &self.config
    }

    #[must_use]
    pub fn scheduler(&self) -> &InvalidationScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn collaborators(&self) -> &C {
        &self.collaborators
    }

    pub fn collaborators_mut(&mut self) -> &mut C {
        &mut self.collaborators
    }

    #[must_use]
    pub fn into_collaborators(self) -> C {
        self.collaborators
    }
}

struct ComponentSteps<'a, C> {
    collaborators: &'a mut C,
    config: &'a ChartComponentConfig,
    labels: &'a LabelEngine,
    grid: &'a mut Option<OccupancyGrid>,
    grid_stale: &'a mut bool,
    placements: &'a mut Vec<LabelPlacement>,
}

impl<C: ChartCollaborators> StepRunner for ComponentSteps<'_, C> {
    fn run_step(&mut self, step: &mut StepContext<'_>) -> ChartResult<()> {
        let context = RenderContext {
            kind: step.step().kind(),
            viewport: self.config.viewport,
            triggered: step.triggered(),
            sweep: step.sweep(),
            animation_duration_ms: self.config.animation_duration_ms,
        };

        match context.kind {
            StepKind::PrepareData => {
                let change = self.collaborators.prepare_data(&context)?;
                let mut flags = DirtyFlags::none();
                if change.domain_changed {
                    flags.insert(DirtyFlag::RecomputeScales);
                }
                if change.marks_changed {
                    flags.insert(DirtyFlag::EnterUpdateExit);
                }
                cascade_declared(step, flags)
            }
            StepKind::RecomputeScales => {
                let change = self.collaborators.build_scales(&context)?;
                *self.grid_stale = true;
                if change.domain_changed {
                    cascade_declared(
                        step,
                        DirtyFlags::from_flags(&[
                            DirtyFlag::Axes,
                            DirtyFlag::Grid,
                            DirtyFlag::RepositionLabels,
                        ]),
                    )?;
                }
                Ok(())
            }
            StepKind::DrawGeometry => {
                let change = self.collaborators.draw_geometry(&context)?;
                if context.triggered.intersects(MARK_MOVE_FLAGS) {
                    *self.grid_stale = true;
                }
                let mut flags = DirtyFlags::none();
                if change.restyle_needed {
                    flags.merge(DirtyFlags::from_flags(&[
                        DirtyFlag::LabelColor,
                        DirtyFlag::InteractionState,
                    ]));
                }
                if change.marks_exited {
                    flags.insert(DirtyFlag::LabelRemoval);
                }
                cascade_declared(step, flags)
            }
            StepKind::DrawDecorations => self.collaborators.draw_decorations(&context),
            StepKind::PlaceLabels => self.place_labels(step, &context),
            StepKind::DescribeAccessibility => self.collaborators.describe_accessibility(&context),
            StepKind::ApplyInteraction => self.collaborators.apply_interaction(&context),
        }
    }
}

impl<C: ChartCollaborators> ComponentSteps<'_, C> {
    fn place_labels(&mut self, step: &mut StepContext<'_>, context: &RenderContext) -> ChartResult<()> {
        let frame = self.collaborators.label_candidates(context)?;
        let previously_visible = visible_count(self.placements.as_slice());

        let placements = match self.labels.config().collision {
            CollisionMode::Off => self.labels.fixed_placements(&frame.candidates),
            CollisionMode::HideOnly => {
                let pinned = LabelFrame {
                    candidates: self.pin_to_first_position(&frame.candidates),
                    ..frame
                };
                self.collide(&pinned, context)?
            }
            CollisionMode::Auto => self.collide(&frame, context)?,
        };

        self.collaborators.apply_labels(context, &placements)?;
        let visible = visible_count(&placements);
        *self.placements = placements;
        if visible != previously_visible {
            cascade_declared(step, DirtyFlags::from_flag(DirtyFlag::AccessibilityCount))?;
        }
        Ok(())
    }

    fn collide(
        &mut self,
        frame: &LabelFrame,
        context: &RenderContext,
    ) -> ChartResult<Vec<LabelPlacement>> {
        let spec = self.labels.grid_spec(context.viewport);
        let fresh = *self.grid_stale || !self.grid.as_ref().is_some_and(|grid| grid.matches(&spec));
        let mut grid = self
            .labels
            .prepare_grid(context.viewport, self.grid.take(), fresh)?;
        // Cleared again once the grid is stored back.
        *self.grid_stale = true;
        let triggered = context.triggered;

        if fresh || triggered.intersects(REPOSITION_FLAGS) {
            debug!(fresh, labels = frame.candidates.len(), "full label placement");
            if fresh {
                for obstacle in &frame.obstacles {
                    grid.mark_region(*obstacle);
                }
            } else {
                grid = place(&frame.candidates, grid, &[], PlacementOptions::remove_only())?.grid;
            }
            let result = self.labels.place(
                &frame.candidates,
                grid,
                &frame.avoid_regions,
                PlacementOptions::full(),
            )?;
            self.store_grid(result.grid);
            return Ok(result.placements);
        }

        if triggered.contains_flag(DirtyFlag::LabelRemoval) {
            debug!("releasing labels of removed marks");
            grid = place(&frame.candidates, grid, &[], PlacementOptions::remove_only())?.grid;
        }

        if triggered.contains_flag(DirtyFlag::LabelVisibility) {
            debug!(labels = frame.candidates.len(), "label visibility update");
            let result = self.labels.place(
                &frame.candidates,
                grid,
                &frame.avoid_regions,
                PlacementOptions::hide_only(),
            )?;
            self.store_grid(result.grid);
            return Ok(result.placements);
        }

        self.store_grid(grid);
        let present = frame
            .candidates
            .iter()
            .map(|candidate| &candidate.id)
            .collect::<HashSet<_>>();
        Ok(self
            .placements
            .iter()
            .filter(|placement| present.contains(&placement.id))
            .cloned()
            .collect())
    }

    fn store_grid(&mut self, grid: OccupancyGrid) {
        *self.grid = Some(grid);
        *self.grid_stale = false;
    }

    fn pin_to_first_position(&self, candidates: &[LabelCandidate]) -> Vec<LabelCandidate> {
        let fallback = self.labels.config().default_positions.first().copied();
        candidates
            .iter()
            .map(|candidate| {
                let mut pinned = candidate.clone();
                pinned.positions.truncate(1);
                if pinned.positions.is_empty() {
                    pinned.positions.extend(fallback);
                }
                pinned
            })
            .collect()
    }
}

/// Cascades the subset of `flags` the running step declares.
fn cascade_declared(step: &mut StepContext<'_>, flags: DirtyFlags) -> ChartResult<()> {
    let declared = flags.intersection(step.step().cascades());
    if declared.is_none() {
        return Ok(());
    }
    step.cascade(declared)
}

fn visible_count(placements: &[LabelPlacement]) -> usize {
    placements
        .iter()
        .filter(|placement| placement.is_placed())
        .count()
}
