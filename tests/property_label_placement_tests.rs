use chart_reflow::core::{BoundingBox, Viewport};
use chart_reflow::labels::{
    CandidatePosition, LabelAnchor, LabelCandidate, OccupancyGrid, PlacementOptions, place,
};
use proptest::prelude::*;

fn candidates(points: &[(f64, f64, f64)]) -> Vec<LabelCandidate> {
    let positions = [
        CandidatePosition::new(LabelAnchor::Top, 3.0),
        CandidatePosition::new(LabelAnchor::Bottom, 3.0),
        CandidatePosition::new(LabelAnchor::Right, 3.0),
        CandidatePosition::new(LabelAnchor::TopLeft, 2.0),
        CandidatePosition::new(LabelAnchor::Middle, -1.0),
    ];
    points
        .iter()
        .enumerate()
        .map(|(i, (x, y, width))| {
            LabelCandidate::new(format!("label-{i}"), BoundingBox::point(*x, *y), *width, 10.0)
                .with_positions(positions)
        })
        .collect()
}

proptest! {
    #[test]
    fn placed_labels_never_overlap_and_stay_on_the_grid(
        points in prop::collection::vec((0.0f64..640.0, 0.0f64..360.0, 4.0f64..60.0), 1..80)
    ) {
        let labels = candidates(&points);
        let grid = OccupancyGrid::for_viewport(Viewport::new(640, 360)).expect("grid");
        let padding = grid.spec().padding_px;
        let result = place(&labels, grid, &[], PlacementOptions::full()).expect("placement");

        let boxes = result
            .placements
            .iter()
            .filter_map(|placement| placement.bbox())
            .collect::<Vec<_>>();
        for (i, a) in boxes.iter().enumerate() {
            prop_assert!(a.x1 >= -padding && a.y1 >= -padding);
            prop_assert!(a.x2 < 640.0 + padding + 1.0 && a.y2 < 360.0 + padding + 1.0);
            for b in &boxes[i + 1..] {
                prop_assert!(!a.intersects(*b));
            }
        }
        prop_assert_eq!(result.grid.entry_count(), boxes.len());
    }

    #[test]
    fn placement_is_deterministic_and_fully_reversible(
        points in prop::collection::vec((0.0f64..320.0, 0.0f64..240.0, 4.0f64..40.0), 0..40)
    ) {
        let labels = candidates(&points);
        let grid = OccupancyGrid::for_viewport(Viewport::new(320, 240)).expect("grid");

        let first = place(&labels, grid.clone(), &[], PlacementOptions::full()).expect("first");
        let second = place(&labels, grid.clone(), &[], PlacementOptions::full()).expect("second");
        prop_assert_eq!(&first, &second);

        let hidden = place(&labels, first.grid.clone(), &[], PlacementOptions::hide_only())
            .expect("hide only");
        for (before, after) in first.placements.iter().zip(&hidden.placements) {
            if after.is_placed() {
                prop_assert_eq!(before.bbox(), after.bbox());
            }
        }

        let cleared = place(&[], first.grid, &[], PlacementOptions::remove_only()).expect("remove");
        prop_assert_eq!(cleared.grid, grid);
    }
}
