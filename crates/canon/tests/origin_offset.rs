//! Tests for the G92 origin-offset state machine: set, cancel, suspend,
//! resume.

use tinyg_canon::OriginOffsetState;
use tinyg_motion::{Axis, MAX_AXES};

#[test]
fn cancelled_by_default_and_contributes_no_offset() {
    let state = OriginOffsetState::default();
    assert_eq!(state.applied_offset(), [0.0; MAX_AXES]);
}

#[test]
fn set_computes_offset_so_new_position_reads_as_requested() {
    let mut state = OriginOffsetState::default();
    let mut current = [0.0; MAX_AXES];
    current[Axis::X.index()] = 10.0;
    let mut requested = [0.0; MAX_AXES];
    requested[Axis::X.index()] = 0.0;

    state.set(current, requested);

    assert_eq!(state.applied_offset()[Axis::X.index()], 10.0);
}

#[test]
fn cancel_discards_the_offset_value() {
    let mut state = OriginOffsetState::default();
    let mut current = [0.0; MAX_AXES];
    current[Axis::X.index()] = 10.0;
    state.set(current, [0.0; MAX_AXES]);

    state.cancel();
    assert_eq!(state.applied_offset(), [0.0; MAX_AXES]);

    // Resuming a cancelled (not suspended) offset is a no-op: the value was
    // discarded, not retained.
    state.resume();
    assert_eq!(state.applied_offset(), [0.0; MAX_AXES]);
}

#[test]
fn suspend_then_resume_restores_the_retained_value() {
    let mut state = OriginOffsetState::default();
    let mut current = [0.0; MAX_AXES];
    current[Axis::Y.index()] = 7.5;
    state.set(current, [0.0; MAX_AXES]);

    state.suspend();
    assert_eq!(state.applied_offset(), [0.0; MAX_AXES]);

    state.resume();
    assert_eq!(state.applied_offset()[Axis::Y.index()], 7.5);
}
