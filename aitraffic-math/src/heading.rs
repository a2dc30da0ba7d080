use std::{fmt, ops};

use bevy_math::DVec2;

#[cfg(test)]
mod tests;

/// An absolute directional bearing in degrees.
#[derive(Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Heading(
    f64, // always 0 <= heading < 360
);

impl Heading {
    /// Heading north.
    pub const NORTH: Self = Self(0.);
    /// Heading east.
    pub const EAST: Self = Self(90.);
    /// Heading south.
    pub const SOUTH: Self = Self(180.);
    /// Heading west.
    pub const WEST: Self = Self(270.);

    /// Creates a heading from an absolute bearing in degrees.
    ///
    /// Any finite value is accepted and wrapped into `0..360`.
    #[must_use]
    pub fn from_degrees(degrees: f64) -> Self {
        let mut value = degrees % 360.;
        if value < 0. {
            value += 360.;
        }
        if value >= 360. {
            value -= 360.;
        }
        Self(value)
    }

    /// Returns the heading of an east/north vector.
    ///
    /// Returns a NaN heading if and only if the argument is zero or contains NaN components.
    #[must_use]
    pub fn from_east_north(vec: DVec2) -> Self {
        if vec == DVec2::ZERO {
            return Self(f64::NAN);
        }
        Self::from_degrees(vec.x.atan2(vec.y).to_degrees())
    }

    /// Converts the heading into an east/north unit vector.
    #[must_use]
    pub fn into_east_north(self) -> DVec2 {
        let (east, north) = self.0.to_radians().sin_cos();
        DVec2::new(east, north)
    }

    /// Returns the heading in degrees in the range `0..360`.
    #[must_use]
    pub fn degrees(self) -> f64 { self.0 }

    #[must_use]
    pub fn is_finite(self) -> bool { self.0.is_finite() }

    /// Degrees to turn from `self` to `other` in the given direction.
    /// The output is always in the range `[0, 360)` for `Clockwise`,
    /// or `(-360, 0]` for `CounterClockwise`.
    #[must_use]
    pub fn distance(self, other: Heading, dir: TurnDirection) -> f64 {
        let mut output = (other.0 - self.0) % 360.;
        match dir {
            TurnDirection::Clockwise => {
                if output < 0. {
                    output += 360.;
                }
            }
            TurnDirection::CounterClockwise => {
                if output > 0. {
                    output -= 360.;
                }
            }
        }
        output
    }

    /// Returns the signed angle closest to zero such that
    /// adding it to `self` approximately returns `other`.
    #[must_use]
    pub fn closest_distance(self, other: Heading) -> f64 {
        self.distance(other, self.closer_direction_to(other))
    }

    /// Returns the unsigned angle between the two headings, in the range `[0, 180]`.
    #[must_use]
    pub fn abs_difference(self, other: Heading) -> f64 { self.closest_distance(other).abs() }

    /// Returns the closer direction to turn towards `other`.
    ///
    /// The result is unspecified if `self` and `other` are exactly opposite or equal.
    #[must_use]
    pub fn closer_direction_to(self, other: Heading) -> TurnDirection {
        if self.distance(other, TurnDirection::Clockwise) < 180. {
            TurnDirection::Clockwise
        } else {
            TurnDirection::CounterClockwise
        }
    }

    /// Returns the opposite direction of this heading.
    #[must_use]
    pub fn opposite(self) -> Self { self + 180. }
}

impl fmt::Debug for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Heading").field(&self.0).finish()
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:03.0}", self.0) }
}

/// Returns the shortest bearing change such that
/// adding the return value to `other` approximately yields `self`.
impl ops::Sub for Heading {
    type Output = f64;
    fn sub(self, other: Self) -> f64 { other.closest_distance(self) }
}

impl ops::Add<f64> for Heading {
    type Output = Self;
    /// Offsets `self` by `degrees` clockwise.
    fn add(self, degrees: f64) -> Self { Self::from_degrees(self.0 + degrees) }
}

impl ops::AddAssign<f64> for Heading {
    /// Offsets `self` by `degrees` clockwise.
    fn add_assign(&mut self, degrees: f64) { *self = *self + degrees; }
}

impl ops::Sub<f64> for Heading {
    type Output = Self;
    /// Offsets `self` by `degrees` counter-clockwise.
    fn sub(self, degrees: f64) -> Self { self + (-degrees) }
}

/// The direction of a heading change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    /// A left turn, decreasing the heading.
    CounterClockwise,
    /// A right turn, increasing the heading.
    Clockwise,
}
