//! Tests for target resolution: unit conversion, coordinate/origin offsets,
//! and rotary Radius/Slave modes.

use tinyg_canon::{resolve_target, AxisConfig, AxisMode, AxisTarget, CoordinateSystem, DistanceMode, Units};
use tinyg_motion::{Axis, MAX_AXES};

fn word(value: f32) -> AxisTarget {
    AxisTarget { value, specified: true }
}

fn empty_update() -> [AxisTarget; MAX_AXES] {
    [AxisTarget::default(); MAX_AXES]
}

#[test]
fn absolute_mm_move_adds_coordinate_and_origin_offsets() {
    let mut update = empty_update();
    update[Axis::X.index()] = word(10.0);
    update[Axis::Y.index()] = word(20.0);

    let mut coord = CoordinateSystem::default();
    coord.offset[Axis::X.index()] = 1.0;
    let mut origin = [0.0; MAX_AXES];
    origin[Axis::X.index()] = 0.5;

    let resolved = resolve_target(
        &update,
        &[0.0; MAX_AXES],
        &[AxisConfig::default(); MAX_AXES],
        &coord,
        &origin,
        Units::Millimeters,
        DistanceMode::Absolute,
    );

    assert_eq!(resolved[Axis::X.index()], 11.5);
    assert_eq!(resolved[Axis::Y.index()], 20.0);
}

#[test]
fn incremental_inches_move_converts_and_adds_to_previous() {
    let mut update = empty_update();
    update[Axis::X.index()] = word(1.0); // 1 inch

    let previous = {
        let mut p = [0.0; MAX_AXES];
        p[Axis::X.index()] = 5.0;
        p
    };

    let resolved = resolve_target(
        &update,
        &previous,
        &[AxisConfig::default(); MAX_AXES],
        &CoordinateSystem::default(),
        &[0.0; MAX_AXES],
        Units::Inches,
        DistanceMode::Incremental,
    );

    assert!((resolved[Axis::X.index()] - (5.0 + 25.4)).abs() < 1e-4);
}

#[test]
fn axis_absent_from_the_line_keeps_its_previous_target() {
    let update = empty_update();
    let mut previous = [0.0; MAX_AXES];
    previous[Axis::Z.index()] = 42.0;

    let resolved = resolve_target(
        &update,
        &previous,
        &[AxisConfig::default(); MAX_AXES],
        &CoordinateSystem::default(),
        &[0.0; MAX_AXES],
        Units::Millimeters,
        DistanceMode::Absolute,
    );

    assert_eq!(resolved[Axis::Z.index()], 42.0);
}

#[test]
fn radius_mode_converts_linear_distance_to_degrees() {
    let mut update = empty_update();
    // arc length of radius * pi/2 should yield 90 degrees.
    let radius = 10.0f32;
    update[Axis::A.index()] = word(radius * std::f32::consts::FRAC_PI_2);

    let mut configs = [AxisConfig::default(); MAX_AXES];
    configs[Axis::A.index()].mode = AxisMode::Radius;
    configs[Axis::A.index()].rotary_radius = radius;

    let resolved = resolve_target(
        &update,
        &[0.0; MAX_AXES],
        &configs,
        &CoordinateSystem::default(),
        &[0.0; MAX_AXES],
        Units::Millimeters,
        DistanceMode::Absolute,
    );

    assert!((resolved[Axis::A.index()] - 90.0).abs() < 1e-2);
}

#[test]
fn slave_of_xy_synthesizes_rotation_from_the_planar_path_length() {
    let mut update = empty_update();
    update[Axis::X.index()] = word(3.0);
    update[Axis::Y.index()] = word(4.0);

    let mut configs = [AxisConfig::default(); MAX_AXES];
    configs[Axis::A.index()].mode = AxisMode::SlaveOfXy;

    let resolved = resolve_target(
        &update,
        &[0.0; MAX_AXES],
        &configs,
        &CoordinateSystem::default(),
        &[0.0; MAX_AXES],
        Units::Millimeters,
        DistanceMode::Absolute,
    );

    // 3-4-5 triangle: path length is 5, independent of the word on A itself.
    assert!((resolved[Axis::A.index()] - 5.0).abs() < 1e-4);
}
