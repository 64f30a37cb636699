use chart_reflow::api::{
    DirtyFlag, DirtyFlags, STEP_APPLY_INTERACTION, STEP_DESCRIBE_ACCESSIBILITY,
    STEP_DRAW_DECORATIONS, STEP_DRAW_GEOMETRY, STEP_PLACE_LABELS, STEP_PREPARE_DATA,
    STEP_RECOMPUTE_SCALES, StepKind, StepSpec, StepTable, standard_steps,
};
use chart_reflow::error::ChartError;

fn flags(list: &[DirtyFlag]) -> DirtyFlags {
    DirtyFlags::from_flags(list)
}

#[test]
fn standard_steps_follow_the_pipeline_order() {
    let table = standard_steps().expect("standard steps");
    let names = table.iter().map(StepSpec::name).collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            STEP_PREPARE_DATA,
            STEP_RECOMPUTE_SCALES,
            STEP_DRAW_GEOMETRY,
            STEP_DRAW_DECORATIONS,
            STEP_PLACE_LABELS,
            STEP_DESCRIBE_ACCESSIBILITY,
            STEP_APPLY_INTERACTION,
        ]
    );
    assert_eq!(table.guarded_flags(), DirtyFlags::all());
}

#[test]
fn clearing_a_later_steps_guard_is_a_cycle() {
    let result = StepTable::new(vec![
        StepSpec::new(
            "data",
            StepKind::PrepareData,
            0,
            flags(&[DirtyFlag::PrepareData]),
        )
        .with_clears(flags(&[DirtyFlag::RepositionLabels])),
        StepSpec::new(
            "labels",
            StepKind::PlaceLabels,
            40,
            flags(&[DirtyFlag::RepositionLabels]),
        ),
    ]);

    let err = result.expect_err("lower rank clears a later guard");
    match err {
        ChartError::Cycle {
            step,
            flag,
            guarded_by,
        } => {
            assert_eq!(step, "data");
            assert_eq!(flag, DirtyFlag::RepositionLabels);
            assert_eq!(guarded_by, "labels");
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn cascading_backward_is_a_cycle() {
    let result = StepTable::new(vec![
        StepSpec::new(
            "scales",
            StepKind::RecomputeScales,
            10,
            flags(&[DirtyFlag::RecomputeScales]),
        ),
        StepSpec::new(
            "geometry",
            StepKind::DrawGeometry,
            20,
            flags(&[DirtyFlag::RedrawGeometry]),
        )
        .with_cascades(flags(&[DirtyFlag::RecomputeScales])),
    ]);
    assert!(matches!(result, Err(ChartError::Cycle { .. })));
}

#[test]
fn equal_rank_steps_may_share_subsumed_flags() {
    let table = StepTable::new(vec![
        StepSpec::new(
            "axes",
            StepKind::DrawDecorations,
            30,
            flags(&[DirtyFlag::Axes]),
        )
        .with_clears(flags(&[DirtyFlag::Grid])),
        StepSpec::new(
            "grid",
            StepKind::DrawDecorations,
            30,
            flags(&[DirtyFlag::Grid]),
        ),
    ])
    .expect("equal ranks are not ordered against each other");
    assert_eq!(table.len(), 2);
    assert_eq!(table.position("grid"), Some(1));
}

#[test]
fn duplicate_and_empty_names_are_rejected() {
    let duplicate = StepTable::new(vec![
        StepSpec::new("data", StepKind::PrepareData, 0, flags(&[DirtyFlag::PrepareData])),
        StepSpec::new("data", StepKind::PrepareData, 1, flags(&[DirtyFlag::TableData])),
    ]);
    assert!(matches!(duplicate, Err(ChartError::InvalidData(_))));

    let unnamed = StepTable::new(vec![StepSpec::new(
        "",
        StepKind::PrepareData,
        0,
        flags(&[DirtyFlag::PrepareData]),
    )]);
    assert!(matches!(unnamed, Err(ChartError::InvalidData(_))));

    assert!(matches!(
        StepTable::new(Vec::new()),
        Err(ChartError::InvalidData(_))
    ));
}

#[test]
fn lookup_helpers_find_steps_by_name_and_flag() {
    let table = standard_steps().expect("standard steps");
    let labels = table.get(STEP_PLACE_LABELS).expect("labels step");
    assert_eq!(labels.kind(), StepKind::PlaceLabels);
    assert!(labels.cascades().contains_flag(DirtyFlag::AccessibilityCount));

    let guarding = table
        .steps_guarding(flags(&[DirtyFlag::Cursor, DirtyFlag::Colors]))
        .map(StepSpec::name)
        .collect::<Vec<_>>();
    assert_eq!(guarding, vec![STEP_DRAW_GEOMETRY, STEP_APPLY_INTERACTION]);
    assert!(table.get("missing").is_none());
}
