use std::ops;

#[cfg(test)]
mod tests;

/// Moves `current` towards `target` by at most `max_step`, never overshooting.
///
/// `max_step` must be non-negative.
#[must_use]
pub fn approach<T>(current: T, target: T, max_step: T) -> T
where
    T: Copy + PartialOrd + ops::Add<Output = T> + ops::Sub<Output = T>,
{
    approach_asymmetric(current, target, max_step, max_step)
}

/// Moves `current` towards `target`,
/// by at most `max_increase` if `target` is greater
/// or at most `max_decrease` if `target` is smaller.
///
/// Both limits must be non-negative.
#[must_use]
pub fn approach_asymmetric<T>(current: T, target: T, max_increase: T, max_decrease: T) -> T
where
    T: Copy + PartialOrd + ops::Add<Output = T> + ops::Sub<Output = T>,
{
    if target > current {
        let next = current + max_increase;
        if next < target { next } else { target }
    } else if target < current {
        let next = current - max_decrease;
        if next > target { next } else { target }
    } else {
        current
    }
}

/// Steps `current` towards `target` at a constant `step`,
/// leaving it unchanged within the `dead_band`.
///
/// Unlike [`approach`], this may overshoot by less than one step,
/// which matches a rate-limited actuator sampled once per tick.
#[must_use]
pub fn step_towards<T>(current: T, target: T, step: T, dead_band: T) -> T
where
    T: Copy + PartialOrd + ops::Add<Output = T> + ops::Sub<Output = T>,
{
    if target > current + dead_band {
        current + step
    } else if target < current - dead_band {
        current - step
    } else {
        current
    }
}

/// `-1` for negative values, `1` otherwise, including zero.
#[must_use]
pub fn unit_sign(value: f64) -> f64 { if value < 0. { -1. } else { 1. } }
