//! Ready-made effect and step tables for the built-in chart components.
//!
//! Every chart shares the standard seven-step pipeline; each chart type has
//! its own mutation table listing every settable input.

use serde::{Deserialize, Serialize};

use crate::error::ChartResult;

use super::{
    DirtyFlag as F, DirtyFlags, MutationEffect, MutationEffectTable, StepKind, StepSpec, StepTable,
};

pub const STEP_PREPARE_DATA: &str = "prepare_data";
pub const STEP_RECOMPUTE_SCALES: &str = "recompute_scales";
pub const STEP_DRAW_GEOMETRY: &str = "draw_geometry";
pub const STEP_DRAW_DECORATIONS: &str = "draw_decorations";
pub const STEP_PLACE_LABELS: &str = "place_labels";
pub const STEP_DESCRIBE_ACCESSIBILITY: &str = "describe_accessibility";
pub const STEP_APPLY_INTERACTION: &str = "apply_interaction";

const DATA_FLAGS: DirtyFlags =
    DirtyFlags::from_flags(&[F::PrepareData, F::TableData, F::LegendData, F::InteractionKeys]);
const SCALE_FLAGS: DirtyFlags =
    DirtyFlags::from_flags(&[F::Layout, F::RecomputeScales, F::ResetRoot]);
const GEOMETRY_FLAGS: DirtyFlags = DirtyFlags::from_flags(&[
    F::EnterUpdateExit,
    F::RedrawGeometry,
    F::Colors,
    F::Textures,
    F::Strokes,
    F::RoundedCorners,
]);
const DECORATION_FLAGS: DirtyFlags = DirtyFlags::from_flags(&[
    F::Axes,
    F::Grid,
    F::Baseline,
    F::ReferenceLines,
    F::Annotations,
    F::Legend,
]);
const LABEL_FLAGS: DirtyFlags = DirtyFlags::from_flags(&[
    F::LabelContent,
    F::RepositionLabels,
    F::LabelVisibility,
    F::LabelColor,
    F::LabelRemoval,
]);
const ACCESSIBILITY_FLAGS: DirtyFlags = DirtyFlags::from_flags(&[
    F::RelabelAccessibility,
    F::DescriptionWrapper,
    F::AccessibilityMetadata,
    F::AccessibilityCount,
    F::AxisAccessibility,
    F::AnnotationAccessibility,
]);
const INTERACTION_FLAGS: DirtyFlags = DirtyFlags::from_flags(&[
    F::InteractionState,
    F::SelectionClass,
    F::Cursor,
    F::BindInteractivity,
    F::LegendInteractivity,
]);

/// Built-in chart components with a preset mutation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    BarChart,
    DumbbellPlot,
    CirclePacking,
}

impl ChartKind {
    pub fn mutation_table(self) -> ChartResult<MutationEffectTable> {
        match self {
            Self::BarChart => bar_chart_mutations(),
            Self::DumbbellPlot => dumbbell_plot_mutations(),
            Self::CirclePacking => circle_packing_mutations(),
        }
    }

    pub fn step_table(self) -> ChartResult<StepTable> {
        standard_steps()
    }
}

/// data → scales → geometry → decorations → labels → accessibility → interaction.
pub fn standard_steps() -> ChartResult<StepTable> {
    StepTable::new(vec![
        StepSpec::new(STEP_PREPARE_DATA, StepKind::PrepareData, 0, DATA_FLAGS)
            .with_cascades(DirtyFlags::from_flags(&[F::RecomputeScales, F::EnterUpdateExit])),
        StepSpec::new(STEP_RECOMPUTE_SCALES, StepKind::RecomputeScales, 10, SCALE_FLAGS)
            .with_cascades(DirtyFlags::from_flags(&[F::Axes, F::Grid, F::RepositionLabels])),
        StepSpec::new(STEP_DRAW_GEOMETRY, StepKind::DrawGeometry, 20, GEOMETRY_FLAGS)
            .with_cascades(DirtyFlags::from_flags(&[
                F::LabelColor,
                F::LabelRemoval,
                F::InteractionState,
            ])),
        StepSpec::new(
            STEP_DRAW_DECORATIONS,
            StepKind::DrawDecorations,
            30,
            DECORATION_FLAGS,
        ),
        StepSpec::new(STEP_PLACE_LABELS, StepKind::PlaceLabels, 40, LABEL_FLAGS)
            .with_cascades(DirtyFlags::from_flag(F::AccessibilityCount)),
        StepSpec::new(
            STEP_DESCRIBE_ACCESSIBILITY,
            StepKind::DescribeAccessibility,
            50,
            ACCESSIBILITY_FLAGS,
        ),
        StepSpec::new(
            STEP_APPLY_INTERACTION,
            StepKind::ApplyInteraction,
            60,
            INTERACTION_FLAGS,
        ),
    ])
}

const LAYOUT_CHANGE: DirtyFlags = DirtyFlags::from_flags(&[
    F::Layout,
    F::RecomputeScales,
    F::ResetRoot,
    F::RedrawGeometry,
    F::Axes,
    F::Grid,
    F::RepositionLabels,
    F::LabelColor,
    F::Legend,
    F::ReferenceLines,
    F::Baseline,
    F::Annotations,
]);
const HEADING_CHANGE: DirtyFlags = DirtyFlags::from_flags(&[
    F::AccessibilityMetadata,
    F::AccessibilityCount,
    F::AxisAccessibility,
    F::DescriptionWrapper,
    F::AnnotationAccessibility,
]);
const COLOR_CHANGE: DirtyFlags = DirtyFlags::from_flags(&[
    F::Colors,
    F::Textures,
    F::InteractionState,
    F::LabelColor,
    F::Legend,
    F::Strokes,
]);
const STYLE_CHANGE: DirtyFlags =
    DirtyFlags::from_flags(&[F::InteractionState, F::LabelColor, F::Strokes]);
const HIGHLIGHT_CHANGE: DirtyFlags =
    DirtyFlags::from_flags(&[F::InteractionState, F::LabelColor, F::LabelVisibility]);
const INTERACTION_KEYS_CHANGE: DirtyFlags = DirtyFlags::from_flags(&[
    F::InteractionKeys,
    F::InteractionState,
    F::LabelColor,
    F::SelectionClass,
    F::RelabelAccessibility,
    F::TableData,
]);
const SUPPRESS_EVENTS_CHANGE: DirtyFlags =
    DirtyFlags::from_flags(&[F::BindInteractivity, F::Cursor, F::InteractionState]);
const CURSOR_CHANGE: DirtyFlags = DirtyFlags::from_flags(&[F::Cursor, F::LegendInteractivity]);
const TITLE_CHANGE: DirtyFlags =
    DirtyFlags::from_flags(&[F::DescriptionWrapper, F::AccessibilityMetadata]);
const SUBTITLE_CHANGE: DirtyFlags = DirtyFlags::from_flag(F::AccessibilityMetadata);
const UNIQUE_ID_CHANGE: DirtyFlags = DirtyFlags::from_flags(&[
    F::DescriptionWrapper,
    F::AccessibilityMetadata,
    F::RelabelAccessibility,
]);
const ANNOTATION_CHANGE: DirtyFlags =
    DirtyFlags::from_flags(&[F::Annotations, F::AnnotationAccessibility]);

fn accessibility_effect() -> MutationEffect {
    let metadata = DirtyFlags::from_flag(F::AccessibilityMetadata);
    MutationEffect::new(DirtyFlags::from_flags(&[
        F::DescriptionWrapper,
        F::AccessibilityMetadata,
        F::RelabelAccessibility,
    ]))
    .with_field("longDescription", metadata)
    .with_field("executiveSummary", metadata)
    .with_field("purpose", metadata)
    .with_field("contextExplanation", metadata)
    .with_field("statisticalNotes", metadata)
    .with_field("structureNotes", metadata)
    .with_field(
        "hideDataTableButton",
        DirtyFlags::from_flag(F::DescriptionWrapper),
    )
    .with_field(
        "elementsAreInterface",
        DirtyFlags::from_flags(&[F::RelabelAccessibility, F::BindInteractivity]),
    )
    .with_field(
        "keyboardNavConfig",
        DirtyFlags::from_flag(F::BindInteractivity),
    )
}

fn data_label_effect() -> MutationEffect {
    let placement = DirtyFlags::from_flags(&[F::RepositionLabels, F::LabelColor]);
    let content = DirtyFlags::from_flags(&[F::TableData, F::LabelContent, F::LabelColor]);
    MutationEffect::new(placement.union(content))
        .with_field("visible", DirtyFlags::from_flag(F::LabelVisibility))
        .with_field("placement", placement)
        .with_field("collisionPlacement", placement)
        .with_field("collisionHideOnly", placement)
        .with_field("labelAccessor", content)
        .with_field("format", content)
}

fn legend_effect() -> MutationEffect {
    MutationEffect::new(DirtyFlags::from_flag(F::Legend)).with_field(
        "interactive",
        DirtyFlags::from_flags(&[F::Legend, F::Cursor, F::LegendInteractivity]),
    )
}

pub fn bar_chart_mutations() -> ChartResult<MutationEffectTable> {
    MutationEffectTable::builder()
        .entry(
            "data",
            DirtyFlags::from_flags(&[
                F::PrepareData,
                F::Colors,
                F::Textures,
                F::EnterUpdateExit,
                F::LabelContent,
                F::RepositionLabels,
                F::RelabelAccessibility,
                F::LegendData,
                F::TableData,
                F::RecomputeScales,
                F::RedrawGeometry,
                F::Axes,
                F::AxisAccessibility,
                F::Grid,
                F::Legend,
                F::ReferenceLines,
                F::Baseline,
                F::Annotations,
                F::Strokes,
            ]),
        )
        .entry(
            "sortOrder",
            DirtyFlags::from_flags(&[
                F::PrepareData,
                F::EnterUpdateExit,
                F::RelabelAccessibility,
                F::TableData,
                F::RecomputeScales,
                F::RedrawGeometry,
                F::LabelContent,
                F::RepositionLabels,
                F::Annotations,
            ]),
        )
        .entry(
            "groupAccessor",
            DirtyFlags::from_flags(&[
                F::LegendData,
                F::Colors,
                F::Textures,
                F::InteractionState,
                F::LabelColor,
                F::Legend,
                F::RelabelAccessibility,
                F::TableData,
                F::Strokes,
                F::InteractionKeys,
                F::SelectionClass,
            ]),
        )
        .entry(
            "ordinalAccessor",
            DirtyFlags::from_flags(&[
                F::TableData,
                F::RecomputeScales,
                F::RedrawGeometry,
                F::InteractionState,
                F::LabelColor,
                F::Axes,
                F::ReferenceLines,
                F::Baseline,
                F::Annotations,
                F::RelabelAccessibility,
                F::Strokes,
            ]),
        )
        .entry(
            "valueAccessor",
            DirtyFlags::from_flags(&[
                F::TableData,
                F::RecomputeScales,
                F::Colors,
                F::Textures,
                F::RedrawGeometry,
                F::InteractionState,
                F::Axes,
                F::LabelColor,
                F::LabelContent,
                F::RepositionLabels,
                F::ReferenceLines,
                F::Baseline,
                F::Annotations,
                F::RelabelAccessibility,
                F::Strokes,
            ]),
        )
        .entries(
            ["maxValueOverride", "minValueOverride"],
            DirtyFlags::from_flags(&[
                F::RecomputeScales,
                F::RedrawGeometry,
                F::Axes,
                F::RepositionLabels,
                F::LabelColor,
                F::ReferenceLines,
                F::Baseline,
                F::Annotations,
            ]),
        )
        .entry("highestHeadingLevel", HEADING_CHANGE)
        .entry("mainTitle", TITLE_CHANGE)
        .entry("subTitle", SUBTITLE_CHANGE)
        .entries(
            ["xAxis", "yAxis"],
            DirtyFlags::from_flags(&[F::Axes, F::AxisAccessibility, F::Grid]),
        )
        .entry("wrapLabel", DirtyFlags::from_flag(F::Axes))
        .entries(["colors", "colorPalette"], COLOR_CHANGE)
        .entry(
            "layout",
            LAYOUT_CHANGE
                .difference(DirtyFlags::from_flag(F::Layout))
                .with_flag(F::RelabelAccessibility),
        )
        .entries(["height", "width", "padding", "margin"], LAYOUT_CHANGE)
        .entry("roundedCorner", DirtyFlags::from_flag(F::RoundedCorners))
        .entry(
            "barIntervalRatio",
            DirtyFlags::from_flags(&[
                F::RecomputeScales,
                F::RedrawGeometry,
                F::Axes,
                F::RepositionLabels,
                F::LabelColor,
                F::Annotations,
            ]),
        )
        .effect("dataLabel", data_label_effect())
        .effect("legend", legend_effect())
        .entries(
            ["referenceLines", "referenceStyle"],
            DirtyFlags::from_flag(F::ReferenceLines),
        )
        .entry("tooltipLabel", DirtyFlags::from_flag(F::TableData))
        .entry("showTooltip", DirtyFlags::from_flag(F::InteractionState))
        .entry(
            "hoverOpacity",
            DirtyFlags::from_flags(&[F::InteractionState, F::LabelColor]),
        )
        .entries(["clickStyle", "hoverStyle"], STYLE_CHANGE)
        .entry(
            "clickHighlight",
            HIGHLIGHT_CHANGE.with_flag(F::SelectionClass),
        )
        .entry("hoverHighlight", HIGHLIGHT_CHANGE)
        .entry("interactionKeys", INTERACTION_KEYS_CHANGE)
        .entry("cursor", CURSOR_CHANGE)
        .effect("accessibility", accessibility_effect())
        .entry("annotations", ANNOTATION_CHANGE)
        .entry("uniqueID", UNIQUE_ID_CHANGE)
        .entry("suppressEvents", SUPPRESS_EVENTS_CHANGE)
        .build()
}

pub fn dumbbell_plot_mutations() -> ChartResult<MutationEffectTable> {
    let marker = MutationEffect::new(DirtyFlags::from_flags(&[
        F::PrepareData,
        F::RedrawGeometry,
        F::RepositionLabels,
    ]))
    .with_field("visible", DirtyFlags::from_flags(&[F::Colors, F::LabelVisibility]))
    .with_field(
        "type",
        DirtyFlags::from_flags(&[F::EnterUpdateExit, F::RedrawGeometry, F::RepositionLabels]),
    )
    .with_field(
        "sizeFromBar",
        DirtyFlags::from_flags(&[F::RedrawGeometry, F::RepositionLabels]),
    );
    let series_label = MutationEffect::new(DirtyFlags::from_flags(&[
        F::RepositionLabels,
        F::Strokes,
        F::TableData,
    ]))
    .with_field("visible", DirtyFlags::from_flag(F::LabelVisibility))
    .with_field(
        "placement",
        DirtyFlags::from_flags(&[F::PrepareData, F::RepositionLabels]),
    );
    let difference_label = MutationEffect::new(DirtyFlags::from_flags(&[
        F::LabelContent,
        F::RepositionLabels,
        F::LabelColor,
        F::Strokes,
        F::TableData,
    ]))
    .with_field("visible", DirtyFlags::from_flag(F::LabelVisibility));

    MutationEffectTable::builder()
        .entry(
            "data",
            DirtyFlags::from_flags(&[
                F::PrepareData,
                F::TableData,
                F::LegendData,
                F::RecomputeScales,
                F::EnterUpdateExit,
                F::RedrawGeometry,
                F::Colors,
                F::Textures,
                F::Strokes,
                F::Axes,
                F::Legend,
                F::ReferenceLines,
                F::Annotations,
                F::LabelContent,
                F::RepositionLabels,
                F::RelabelAccessibility,
                F::InteractionState,
            ]),
        )
        .entries(
            ["ordinalAccessor", "valueAccessor"],
            DirtyFlags::from_flags(&[
                F::PrepareData,
                F::TableData,
                F::RecomputeScales,
                F::RedrawGeometry,
                F::Axes,
                F::LabelContent,
                F::RepositionLabels,
                F::ReferenceLines,
                F::Annotations,
                F::RelabelAccessibility,
            ]),
        )
        .entry(
            "seriesAccessor",
            DirtyFlags::from_flags(&[
                F::PrepareData,
                F::TableData,
                F::LegendData,
                F::Colors,
                F::Legend,
                F::EnterUpdateExit,
                F::RepositionLabels,
                F::RelabelAccessibility,
                F::InteractionKeys,
            ]),
        )
        .entry(
            "sortOrder",
            DirtyFlags::from_flags(&[
                F::PrepareData,
                F::RecomputeScales,
                F::RedrawGeometry,
                F::Axes,
                F::RepositionLabels,
                F::RelabelAccessibility,
            ]),
        )
        .entries(
            ["maxValueOverride", "minValueOverride"],
            DirtyFlags::from_flags(&[
                F::RecomputeScales,
                F::RedrawGeometry,
                F::Axes,
                F::RepositionLabels,
                F::ReferenceLines,
                F::Annotations,
            ]),
        )
        .entry("highestHeadingLevel", HEADING_CHANGE)
        .entry("mainTitle", TITLE_CHANGE)
        .entry("subTitle", SUBTITLE_CHANGE)
        .entries(
            ["xAxis", "yAxis"],
            DirtyFlags::from_flags(&[F::Axes, F::AxisAccessibility, F::Grid]),
        )
        .entry("wrapLabel", DirtyFlags::from_flag(F::Axes))
        .entry(
            "layout",
            LAYOUT_CHANGE
                .difference(DirtyFlags::from_flag(F::Layout))
                .with_flag(F::PrepareData),
        )
        .entries(["height", "width", "padding", "margin"], LAYOUT_CHANGE)
        .entries(
            ["showBaselineX", "showBaselineY"],
            DirtyFlags::from_flag(F::Baseline),
        )
        .entries(["colors", "colorPalette"], COLOR_CHANGE)
        .entries(["clickStyle", "hoverStyle"], STYLE_CHANGE)
        .entry(
            "hoverOpacity",
            DirtyFlags::from_flags(&[F::InteractionState, F::LabelColor]),
        )
        .entry("cursor", CURSOR_CHANGE)
        .entry(
            "focusMarker",
            DirtyFlags::from_flags(&[
                F::PrepareData,
                F::RedrawGeometry,
                F::Strokes,
                F::RepositionLabels,
                F::LabelColor,
            ]),
        )
        .effect("marker", marker)
        .entry(
            "barStyle",
            DirtyFlags::from_flags(&[
                F::RedrawGeometry,
                F::Strokes,
                F::LabelColor,
                F::InteractionState,
            ]),
        )
        .effect("dataLabel", data_label_effect())
        .effect("seriesLabel", series_label)
        .effect("differenceLabel", difference_label)
        .entry("showTooltip", DirtyFlags::from_flag(F::InteractionState))
        .entry("tooltipLabel", DirtyFlags::from_flag(F::TableData))
        .effect("accessibility", accessibility_effect())
        .effect("legend", legend_effect())
        .entry("annotations", ANNOTATION_CHANGE)
        .entries(
            ["referenceLines", "referenceStyle"],
            DirtyFlags::from_flag(F::ReferenceLines),
        )
        .entry("suppressEvents", SUPPRESS_EVENTS_CHANGE)
        .entry(
            "clickHighlight",
            HIGHLIGHT_CHANGE.with_flag(F::SelectionClass),
        )
        .entry("hoverHighlight", HIGHLIGHT_CHANGE)
        .entry("interactionKeys", INTERACTION_KEYS_CHANGE)
        .entry("uniqueID", UNIQUE_ID_CHANGE)
        .build()
}

pub fn circle_packing_mutations() -> ChartResult<MutationEffectTable> {
    let hierarchy_change = DirtyFlags::from_flags(&[
        F::PrepareData,
        F::TableData,
        F::RecomputeScales,
        F::EnterUpdateExit,
        F::RedrawGeometry,
        F::Colors,
        F::LabelContent,
        F::RepositionLabels,
        F::RelabelAccessibility,
    ]);

    MutationEffectTable::builder()
        .entry(
            "data",
            hierarchy_change.union(DirtyFlags::from_flags(&[
                F::Strokes,
                F::Textures,
                F::InteractionState,
            ])),
        )
        .entry("mainTitle", TITLE_CHANGE)
        .entry("subTitle", SUBTITLE_CHANGE)
        .entry("highestHeadingLevel", HEADING_CHANGE)
        .entries(
            ["parentAccessor", "nodeAccessor", "sizeAccessor"],
            hierarchy_change,
        )
        .entries(["height", "width", "padding", "margin"], LAYOUT_CHANGE)
        .entries(
            ["dataDepth", "displayDepth"],
            hierarchy_change.with_flag(F::InteractionState),
        )
        .entry(
            "circlePadding",
            DirtyFlags::from_flags(&[F::PrepareData, F::RedrawGeometry, F::RepositionLabels]),
        )
        .entries(["colors", "colorPalette"], COLOR_CHANGE)
        .entry("showTooltip", DirtyFlags::from_flag(F::InteractionState))
        .entry("tooltipLabel", DirtyFlags::from_flag(F::TableData))
        .entry(
            "hoverOpacity",
            DirtyFlags::from_flags(&[F::InteractionState, F::LabelColor]),
        )
        .entries(["clickStyle", "hoverStyle"], STYLE_CHANGE)
        .entry("cursor", CURSOR_CHANGE)
        .entry(
            "clickHighlight",
            HIGHLIGHT_CHANGE.with_flag(F::SelectionClass),
        )
        .entry("hoverHighlight", HIGHLIGHT_CHANGE)
        .entry(
            "zoomToNode",
            DirtyFlags::from_flags(&[
                F::RecomputeScales,
                F::RedrawGeometry,
                F::RepositionLabels,
                F::InteractionState,
            ]),
        )
        .entry("interactionKeys", INTERACTION_KEYS_CHANGE)
        .effect("dataLabel", data_label_effect())
        .effect("accessibility", accessibility_effect())
        .entry("annotations", ANNOTATION_CHANGE)
        .entry("uniqueID", UNIQUE_ID_CHANGE)
        .entry("suppressEvents", SUPPRESS_EVENTS_CHANGE)
        .build()
}

#[cfg(test)]
mod tests {
    use super::{ChartKind, STEP_PLACE_LABELS, standard_steps};
    use crate::api::{DirtyFlag, DirtyFlags};

    #[test]
    fn preset_tables_only_use_consumed_flags() {
        let guarded = standard_steps().expect("standard steps").guarded_flags();
        for kind in [
            ChartKind::BarChart,
            ChartKind::DumbbellPlot,
            ChartKind::CirclePacking,
        ] {
            let table = kind.mutation_table().expect("preset table");
            assert!(table.contains("data"), "{kind:?} must react to data");
            assert!(
                guarded.contains_all(table.reachable_flags()),
                "{kind:?} produces flags without a consuming step"
            );
        }
    }

    #[test]
    fn every_flag_is_owned_by_exactly_one_standard_step() {
        let steps = standard_steps().expect("standard steps");
        for flag in DirtyFlag::ALL {
            let owners = steps
                .steps_guarding(DirtyFlags::from_flag(flag))
                .count();
            assert_eq!(owners, 1, "{flag} should have exactly one owner");
        }
    }

    #[test]
    fn labels_step_is_fifth_in_order() {
        let steps = standard_steps().expect("standard steps");
        assert_eq!(steps.position(STEP_PLACE_LABELS), Some(4));
    }
}
