use crate::{Length, approach, approach_asymmetric, step_towards, unit_sign};

fn assert_close(actual: f64, expected: f64, message: &str) {
    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}: {message}");
}

#[test]
fn approach_does_not_overshoot() {
    assert_close(approach(0., 5., 2.), 2., "step up");
    assert_close(approach(4., 5., 2.), 5., "clamped at target");
    assert_close(approach(5., -5., 2.), 3., "step down");
    assert_close(approach(-4., -5., 2.), -5., "clamped at negative target");
}

#[test]
fn approach_asymmetric_uses_directional_limit() {
    assert_close(approach_asymmetric(10., 0., 1., 3.), 7., "decrease limit");
    assert_close(approach_asymmetric(0., 10., 1., 3.), 1., "increase limit");
    assert_close(approach_asymmetric(3., 3., 1., 3.), 3., "at target");
}

#[test]
fn approach_typed_quantity() {
    let next = approach(Length::from_meters(0.), Length::from_meters(10.), Length::from_meters(4.));
    assert_close(next.into_meters(), 4., "lengths step like scalars");
}

#[test]
fn step_towards_dead_band() {
    assert_close(step_towards(0., 0.1, 0.9, 0.2), 0., "inside dead band");
    assert_close(step_towards(0., 10., 0.9, 0.2), 0.9, "step up");
    assert_close(step_towards(0., -10., 0.9, 0.2), -0.9, "step down");
}

#[test]
fn unit_sign_of_zero_is_positive() {
    assert_close(unit_sign(0.), 1., "zero");
    assert_close(unit_sign(-0.5), -1., "negative");
    assert_close(unit_sign(3.), 1., "positive");
}
