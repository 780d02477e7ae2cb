//! Integration tests for the GridTransform string format
//!
//! These tests verify that:
//! - Export then import reproduces the grid transform exactly
//! - Any token count other than 19 is rejected and leaves the target untouched
//! - Grid transform states accept the same format through actions

use proptest::prelude::*;
use seg3d::geometry::{GridTransform, Transform, TransformParseError};
use seg3d::state::{StateEngine, StateHandler, StateValue};
use std::sync::Arc;

fn finite() -> impl Strategy<Value = f64> {
    prop::num::f64::NORMAL | prop::num::f64::ZERO | prop::num::f64::SUBNORMAL
}

proptest! {
    #[test]
    fn prop_export_import_round_trip(
        nx in 0usize..100_000,
        ny in 0usize..100_000,
        nz in 0usize..100_000,
        mat in prop::array::uniform16(finite()),
    ) {
        let grid = GridTransform::with_transform(nx, ny, nz, Transform::from_array(mat));
        let mut imported = GridTransform::default();

        prop_assert!(imported.import_from_string(&grid.to_string()).is_ok());
        prop_assert_eq!(imported, grid);
    }

    #[test]
    fn prop_wrong_token_count_rejected(
        values in prop::collection::vec(0u32..1000, 0..40)
            .prop_filter("19 tokens is the valid count", |v| v.len() != 19)
    ) {
        let input = format!(
            "[{}]",
            values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
        );
        let original = GridTransform::new(7, 8, 9);
        let mut target = original;

        prop_assert_eq!(
            target.import_from_string(&input),
            Err(TransformParseError::WrongTokenCount(values.len()))
        );
        prop_assert_eq!(target, original);
    }
}

#[test]
fn test_grid_transform_state_from_string() {
    let engine = Arc::new(StateEngine::new());
    let handler = StateHandler::new(&engine, "Layer", true).unwrap();
    let state = handler
        .add_state("grid_transform", StateValue::GridTransform(GridTransform::default()))
        .unwrap();

    assert!(state
        .import_from_string("[10 20 30 2 0 0 0 0 2 0 0 0 0 2 0 0 0 0 1]")
        .unwrap());
    let grid = *state.get().as_grid_transform().unwrap();
    assert_eq!((grid.nx(), grid.ny(), grid.nz()), (10, 20, 30));
    assert_eq!(grid.transform().get(0, 0), Some(2.0));

    // A malformed string leaves the state alone
    assert!(state.import_from_string("[1 2 3]").is_err());
    assert_eq!(state.get().as_grid_transform(), Some(&grid));
}
