use bevy_math::DVec2;

use super::{Heading, TurnDirection};

fn assert_almost_eq(left: Heading, right: Heading, message: &str) {
    let delta = (left.degrees() - right.degrees()).abs();
    assert!(delta < 1e-6 || (360. - delta).abs() < 1e-6, "{left:?} != {right:?}: {message}");
}

fn assert_delta(left: f64, right: f64, message: &str) {
    assert!((left - right).abs() < 1e-6, "{left} != {right}: {message}");
}

#[test]
fn heading_from_east_north() {
    assert_almost_eq(Heading::from_east_north(DVec2::new(1., 0.)), Heading::EAST, "(1, 0) is east");
    assert_almost_eq(Heading::from_east_north(DVec2::new(-1., 0.)), Heading::WEST, "(-1, 0) is west");
    assert_almost_eq(Heading::from_east_north(DVec2::new(0., 1.)), Heading::NORTH, "(0, 1) is north");
    assert_almost_eq(
        Heading::from_east_north(DVec2::new(0., -1.)),
        Heading::SOUTH,
        "(0, -1) is south",
    );
    assert!(!Heading::from_east_north(DVec2::ZERO).is_finite(), "zero vector has no heading");
}

#[test]
fn heading_from_degrees() {
    assert_almost_eq(Heading::from_degrees(-90.), Heading::WEST, "-90 degrees is westward");
    assert_almost_eq(Heading::from_degrees(-270.), Heading::EAST, "-270 degrees is eastward");
    assert_almost_eq(Heading::from_degrees(-360.), Heading::NORTH, "-360 degrees is northward");
    assert_almost_eq(Heading::from_degrees(450.), Heading::EAST, "450 degrees is eastward");
    assert_almost_eq(Heading::from_degrees(360.), Heading::NORTH, "360 degrees is northward");
    assert!(Heading::from_degrees(-1e-20).degrees() < 360., "tiny negatives stay in range");
}

#[test]
fn heading_distance() {
    assert_delta(
        Heading::WEST.distance(Heading::NORTH, TurnDirection::Clockwise),
        90.,
        "90 degrees right from west to north",
    );
    assert_delta(
        Heading::WEST.distance(Heading::NORTH, TurnDirection::CounterClockwise),
        -270.,
        "270 degrees left from west to north",
    );
    assert_delta(
        Heading::EAST.distance(Heading::WEST, TurnDirection::Clockwise),
        180.,
        "180 degrees from east to west",
    );
    assert_delta(
        Heading::NORTH.distance(Heading::NORTH, TurnDirection::CounterClockwise),
        0.,
        "0 degrees for equal",
    );
}

#[test]
fn heading_closest_distance() {
    assert_delta(
        Heading::from_degrees(350.).closest_distance(Heading::from_degrees(10.)),
        20.,
        "right across north",
    );
    assert_delta(
        Heading::from_degrees(10.).closest_distance(Heading::from_degrees(350.)),
        -20.,
        "left across north",
    );
    assert_delta(Heading::from_degrees(10.) - Heading::from_degrees(350.), 20., "sub is signed");
    assert_delta(Heading::NORTH.abs_difference(Heading::from_degrees(200.)), 160., "unsigned");
}

#[test]
fn heading_closer_direction() {
    assert_eq!(
        Heading::NORTH.closer_direction_to(Heading::EAST),
        TurnDirection::Clockwise,
        "right turn from north to east"
    );
    assert_eq!(
        Heading::NORTH.closer_direction_to(Heading::WEST),
        TurnDirection::CounterClockwise,
        "left turn from north to west"
    );
    assert_eq!(
        Heading::SOUTH.closer_direction_to(Heading::EAST),
        TurnDirection::CounterClockwise,
        "left turn from south to east"
    );
}

#[test]
fn heading_opposite() {
    assert_almost_eq(Heading::EAST.opposite(), Heading::WEST, "opposite of east");
    assert_almost_eq(Heading::from_degrees(200.).opposite(), Heading::from_degrees(20.), "wraps around");
}
