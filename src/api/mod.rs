//! Reactive invalidation: mutation effects, step ordering and flushing.

pub mod chart_component;
pub mod chart_presets;
pub mod collaborators;
pub mod component_config;
pub mod dirty_flags;
pub mod mutation_table;
pub mod scheduler;
pub mod step_table;

pub use chart_component::ChartComponent;
pub use chart_presets::{
    ChartKind, STEP_APPLY_INTERACTION, STEP_DESCRIBE_ACCESSIBILITY, STEP_DRAW_DECORATIONS,
    STEP_DRAW_GEOMETRY, STEP_PLACE_LABELS, STEP_PREPARE_DATA, STEP_RECOMPUTE_SCALES,
    bar_chart_mutations, circle_packing_mutations, dumbbell_plot_mutations, standard_steps,
};
pub use collaborators::{
    ChartCollaborators, DataChange, GeometryChange, LabelFrame, NullCollaborators, RenderContext,
    ScaleChange,
};
pub use component_config::{ChartComponentConfig, DEFAULT_ANIMATION_DURATION_MS};
pub use dirty_flags::{DirtyFlag, DirtyFlags};
pub use mutation_table::{MutationEffect, MutationEffectTable, MutationEffectTableBuilder};
pub use scheduler::{
    FlushReport, InvalidationScheduler, RenderPass, StepContext, StepOutcome, StepRunner,
};
pub use step_table::{StepKind, StepSpec, StepTable};
