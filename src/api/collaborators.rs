use serde::{Deserialize, Serialize};

use crate::core::{BoundingBox, Viewport};
use crate::error::ChartResult;
use crate::labels::{LabelCandidate, LabelPlacement};

use super::{DirtyFlags, StepKind};

/// What a step body sees of the pending update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderContext {
    pub kind: StepKind,
    pub viewport: Viewport,
    /// Flags that caused this step to run.
    pub triggered: DirtyFlags,
    pub sweep: usize,
    pub animation_duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataChange {
    /// Value extents moved, so scales must be rebuilt.
    pub domain_changed: bool,
    /// Records were added, removed or re-keyed.
    pub marks_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScaleChange {
    pub domain_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeometryChange {
    /// Marks were drawn with new fills; labels and hover state need recolor.
    pub restyle_needed: bool,
    /// Marks left the chart and their labels must be released.
    pub marks_exited: bool,
}

/// Label input for one placement round.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelFrame {
    pub candidates: Vec<LabelCandidate>,
    /// Drawn marks; written into a freshly allocated grid before placement.
    pub obstacles: Vec<BoundingBox>,
    /// Regions labels must stay clear of without occupying grid cells.
    pub avoid_regions: Vec<BoundingBox>,
}

/// Chart-specific bodies of the recompute steps.
///
/// Each method backs exactly one [`StepKind`]. Errors are returned from the
/// flush unchanged and leave the step's flags set.
pub trait ChartCollaborators {
    fn prepare_data(&mut self, context: &RenderContext) -> ChartResult<DataChange>;

    fn build_scales(&mut self, context: &RenderContext) -> ChartResult<ScaleChange>;

    fn draw_geometry(&mut self, context: &RenderContext) -> ChartResult<GeometryChange>;

    fn draw_decorations(&mut self, context: &RenderContext) -> ChartResult<()>;

    fn label_candidates(&mut self, context: &RenderContext) -> ChartResult<LabelFrame>;

    /// Receives the final placement of every label after a placement round.
    fn apply_labels(
        &mut self,
        _context: &RenderContext,
        _placements: &[LabelPlacement],
    ) -> ChartResult<()> {
        Ok(())
    }

    fn describe_accessibility(&mut self, context: &RenderContext) -> ChartResult<()>;

    fn apply_interaction(&mut self, context: &RenderContext) -> ChartResult<()>;
}

/// Collaborators that draw nothing, for tests and headless use.
///
/// Records every step it is asked to run and serves a fixed label frame.
#[derive(Debug, Clone, Default)]
pub struct NullCollaborators {
    pub calls: Vec<StepKind>,
    pub labels: LabelFrame,
    pub data_change: DataChange,
    pub scale_change: ScaleChange,
    pub geometry_change: GeometryChange,
    pub last_placements: Vec<LabelPlacement>,
}

impl NullCollaborators {
    #[must_use]
    pub fn with_labels(labels: LabelFrame) -> Self {
        Self {
            labels,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn call_count(&self, kind: StepKind) -> usize {
        self.calls.iter().filter(|call| **call == kind).count()
    }
}

impl ChartCollaborators for NullCollaborators {
    fn prepare_data(&mut self, context: &RenderContext) -> ChartResult<DataChange> {
        self.calls.push(context.kind);
        Ok(self.data_change)
    }

    fn build_scales(&mut self, context: &RenderContext) -> ChartResult<ScaleChange> {
        self.calls.push(context.kind);
        Ok(self.scale_change)
    }

    fn draw_geometry(&mut self, context: &RenderContext) -> ChartResult<GeometryChange> {
        self.calls.push(context.kind);
        Ok(self.geometry_change)
    }

    fn draw_decorations(&mut self, context: &RenderContext) -> ChartResult<()> {
        self.calls.push(context.kind);
        Ok(())
    }

    fn label_candidates(&mut self, context: &RenderContext) -> ChartResult<LabelFrame> {
        self.calls.push(context.kind);
        Ok(self.labels.clone())
    }

    fn apply_labels(
        &mut self,
        _context: &RenderContext,
        placements: &[LabelPlacement],
    ) -> ChartResult<()> {
        self.last_placements = placements.to_vec();
        Ok(())
    }

    fn describe_accessibility(&mut self, context: &RenderContext) -> ChartResult<()> {
        self.calls.push(context.kind);
        Ok(())
    }

    fn apply_interaction(&mut self, context: &RenderContext) -> ChartResult<()> {
        self.calls.push(context.kind);
        Ok(())
    }
}
