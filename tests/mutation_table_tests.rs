use chart_reflow::api::{
    ChartKind, DirtyFlag, DirtyFlags, bar_chart_mutations, circle_packing_mutations,
    dumbbell_plot_mutations, standard_steps,
};
use chart_reflow::error::ChartError;
use serde_json::json;

#[test]
fn every_preset_table_builds_and_is_consumed_by_the_standard_steps() {
    let guarded = standard_steps().expect("steps").guarded_flags();
    for table in [
        bar_chart_mutations(),
        dumbbell_plot_mutations(),
        circle_packing_mutations(),
    ] {
        let table = table.expect("preset table");
        assert!(!table.is_empty());
        assert!(guarded.contains_all(table.reachable_flags()));
    }
}

#[test]
fn size_inputs_share_the_layout_effect() {
    let table = bar_chart_mutations().expect("bar table");
    let width = table
        .effects_for("width", &json!(400), &json!(600))
        .expect("width");
    for name in ["height", "padding", "margin"] {
        let flags = table
            .effects_for(name, &json!(1), &json!(2))
            .expect("layout input");
        assert_eq!(flags, width, "{name}");
    }
    assert!(width.contains_flag(DirtyFlag::Layout));
    assert!(width.contains_flag(DirtyFlag::RepositionLabels));
}

#[test]
fn data_label_fields_refine_the_invalidation() {
    let table = bar_chart_mutations().expect("bar table");

    let visible = table
        .effects_for(
            "dataLabel",
            &json!({"visible": true, "format": "0.0a"}),
            &json!({"visible": false, "format": "0.0a"}),
        )
        .expect("dataLabel");
    assert_eq!(visible, DirtyFlags::from_flag(DirtyFlag::LabelVisibility));

    let placement = table
        .effects_for(
            "dataLabel",
            &json!({"placement": "top"}),
            &json!({"placement": "bottom"}),
        )
        .expect("dataLabel");
    assert!(placement.contains_flag(DirtyFlag::RepositionLabels));
    assert!(!placement.contains_flag(DirtyFlag::LabelContent));

    let format = table
        .effects_for(
            "dataLabel",
            &json!({"format": "0.0a"}),
            &json!({"format": "$0,0"}),
        )
        .expect("dataLabel");
    assert!(format.contains_flag(DirtyFlag::LabelContent));
    assert!(format.contains_flag(DirtyFlag::TableData));
}

#[test]
fn equal_values_set_nothing() {
    let table = dumbbell_plot_mutations().expect("dumbbell table");
    let flags = table
        .effects_for("data", &json!([{"x": 1}]), &json!([{"x": 1}]))
        .expect("data");
    assert!(flags.is_none());
}

#[test]
fn chart_specific_inputs_exist_only_on_their_chart() {
    let bar = ChartKind::BarChart.mutation_table().expect("bar");
    let dumbbell = ChartKind::DumbbellPlot.mutation_table().expect("dumbbell");
    let packing = ChartKind::CirclePacking.mutation_table().expect("circle packing");

    assert!(bar.contains("roundedCorner"));
    assert!(!dumbbell.contains("roundedCorner"));
    assert!(dumbbell.contains("differenceLabel"));
    assert!(packing.contains("zoomToNode"));

    let err = packing
        .effects_for("roundedCorner", &json!(0), &json!(1))
        .expect_err("bar-only input");
    assert!(matches!(err, ChartError::UnknownMutation { .. }));
}

#[test]
fn marker_visibility_on_dumbbell_avoids_relayout() {
    let table = dumbbell_plot_mutations().expect("dumbbell table");
    let flags = table
        .effects_for(
            "marker",
            &json!({"visible": true, "type": "dot"}),
            &json!({"visible": false, "type": "dot"}),
        )
        .expect("marker");
    assert!(flags.contains_flag(DirtyFlag::LabelVisibility));
    assert!(!flags.contains_flag(DirtyFlag::RecomputeScales));
    assert!(!flags.contains_flag(DirtyFlag::PrepareData));
}
