use std::marker::PhantomData;
use std::time::Duration;
use std::{cmp, fmt, iter, ops};

use bevy_math::DVec2;

use crate::Heading;

/// Converts nautical miles to feet.
pub const FEET_PER_NM: f64 = 6076.12;
/// Converts nautical miles to meters.
pub const METERS_PER_NM: f64 = 1852.;
/// Converts minutes to seconds.
pub const SECONDS_PER_MINUTE: f64 = 60.;
/// Converts hours to seconds.
pub const SECONDS_PER_HOUR: f64 = 3600.;

/// A dimensioned value.
///
/// Lengths are stored in nautical miles and time in seconds,
/// so `Speed` is nm/s and `Accel` is nm/s².
pub struct Quantity<T, Base, Dt>(pub T, pub PhantomData<(Base, Dt)>);

impl<T, Base, Dt> Quantity<T, Base, Dt> {
    pub const fn new(value: T) -> Self { Self(value, PhantomData) }
}

impl<T, Base, Dt> Default for Quantity<T, Base, Dt>
where
    T: Default,
{
    fn default() -> Self { Self(T::default(), PhantomData) }
}

impl<T, Base, Dt> Clone for Quantity<T, Base, Dt>
where
    T: Clone,
{
    fn clone(&self) -> Self { Self(self.0.clone(), PhantomData) }
}

impl<T, Base, Dt> Copy for Quantity<T, Base, Dt> where T: Copy {}

impl<T, Base, Dt> PartialEq for Quantity<T, Base, Dt>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool { self.0 == other.0 }
}

impl<T, Base, Dt> PartialOrd for Quantity<T, Base, Dt>
where
    T: PartialOrd,
{
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> { self.0.partial_cmp(&other.0) }
}

impl<T, Base, Dt> ops::Add for Quantity<T, Base, Dt>
where
    T: ops::Add<Output = T>,
{
    type Output = Self;

    fn add(self, other: Self) -> Self { Self(self.0 + other.0, PhantomData) }
}

impl<T, Base, Dt> ops::AddAssign for Quantity<T, Base, Dt>
where
    T: ops::AddAssign,
{
    fn add_assign(&mut self, other: Self) { self.0 += other.0; }
}

impl<T, Base, Dt> ops::Sub for Quantity<T, Base, Dt>
where
    T: ops::Sub<Output = T>,
{
    type Output = Self;

    fn sub(self, other: Self) -> Self { Self(self.0 - other.0, PhantomData) }
}

impl<T, Base, Dt> ops::SubAssign for Quantity<T, Base, Dt>
where
    T: ops::SubAssign,
{
    fn sub_assign(&mut self, other: Self) { self.0 -= other.0; }
}

impl<T, Base, Dt> ops::Mul<f64> for Quantity<T, Base, Dt>
where
    T: ops::Mul<f64, Output = T>,
{
    type Output = Self;

    fn mul(self, other: f64) -> Self { Self(self.0 * other, PhantomData) }
}

impl<T, Base, Dt> ops::MulAssign<f64> for Quantity<T, Base, Dt>
where
    T: ops::MulAssign<f64>,
{
    fn mul_assign(&mut self, other: f64) { self.0 *= other; }
}

impl<T, Base, Dt> ops::Div<f64> for Quantity<T, Base, Dt>
where
    T: ops::Div<f64, Output = T>,
{
    type Output = Self;

    fn div(self, other: f64) -> Self { Self(self.0 / other, PhantomData) }
}

/// Dividing two quantities of the same dimension yields a plain ratio.
impl<T, Base, Dt> ops::Div for Quantity<T, Base, Dt>
where
    T: ops::Div,
{
    type Output = T::Output;

    fn div(self, other: Self) -> Self::Output { self.0 / other.0 }
}

impl<T, Base, Dt> ops::Neg for Quantity<T, Base, Dt>
where
    T: ops::Neg<Output = T>,
{
    type Output = Self;

    fn neg(self) -> Self { Self(-self.0, PhantomData) }
}

impl<T: Default + ops::Add<Output = T>, Base, Dt> iter::Sum for Quantity<T, Base, Dt> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |sum, value| sum + value)
    }
}

/// Used as `Dt` in `Quantity` to indicate that the unit is not a rate of change.
pub struct DtZero;
/// Used as `Dt` in `Quantity` to indicate that the unit is the rate of change of `Quantity<Dt=Dt>`.
pub struct Ddt<Dt>(Dt);

pub type DtOne = Ddt<DtZero>;
pub type DtTwo = Ddt<DtOne>;

impl<T, Base, Dt> ops::Mul<Duration> for Quantity<T, Base, Ddt<Dt>>
where
    T: ops::Mul<f64, Output = T>,
{
    type Output = Quantity<T, Base, Dt>;

    fn mul(self, other: Duration) -> Self::Output {
        Quantity(self.0 * other.as_secs_f64(), PhantomData)
    }
}

impl<T, Base, Dt> ops::Div<Duration> for Quantity<T, Base, Dt>
where
    T: ops::Div<f64, Output = T>,
{
    type Output = Quantity<T, Base, Ddt<Dt>>;

    fn div(self, other: Duration) -> Self::Output {
        Quantity(self.0 / other.as_secs_f64(), PhantomData)
    }
}

impl<Base, Dt> Quantity<f64, Base, Dt> {
    pub const ZERO: Self = Self(0., PhantomData);

    #[must_use]
    pub fn is_positive(self) -> bool { self.0 > 0. }

    #[must_use]
    pub fn is_negative(self) -> bool { self.0 < 0. }

    #[must_use]
    pub fn is_finite(self) -> bool { self.0.is_finite() }

    #[must_use]
    pub fn abs(self) -> Self { Self(self.0.abs(), PhantomData) }

    #[must_use]
    pub fn signum(self) -> f64 { self.0.signum() }

    #[must_use]
    pub fn min(self, other: Self) -> Self { Self(self.0.min(other.0), PhantomData) }

    #[must_use]
    pub fn max(self, other: Self) -> Self { Self(self.0.max(other.0), PhantomData) }

    #[must_use]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self(self.0.clamp(min.0, max.0), PhantomData)
    }

    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> cmp::Ordering { self.0.total_cmp(&other.0) }
}

impl<Base, Dt> ops::Mul<Heading> for Quantity<f64, Base, Dt> {
    type Output = Quantity<DVec2, Base, Dt>;

    /// Splits the magnitude into east/north components along `heading`.
    fn mul(self, heading: Heading) -> Self::Output {
        Quantity(heading.into_east_north() * self.0, PhantomData)
    }
}

impl<Base, Dt> Quantity<DVec2, Base, Dt> {
    #[must_use]
    pub fn x(self) -> Quantity<f64, Base, Dt> { Quantity(self.0.x, PhantomData) }

    #[must_use]
    pub fn y(self) -> Quantity<f64, Base, Dt> { Quantity(self.0.y, PhantomData) }

    #[must_use]
    pub fn magnitude(self) -> Quantity<f64, Base, Dt> { Quantity(self.0.length(), PhantomData) }

    /// The direction of the vector, NaN if it is zero.
    #[must_use]
    pub fn heading(self) -> Heading { Heading::from_east_north(self.0) }
}

pub struct LengthBase;

/// A distance quantity. Internal representation is in nautical miles.
pub type Length<T> = Quantity<T, LengthBase, DtZero>;

/// A linear speed (rate of [length](Length) change) quantity.
pub type Speed<T> = Quantity<T, LengthBase, DtOne>;

/// A linear acceleration (rate of linear [speed](Speed) change) quantity.
pub type Accel<T> = Quantity<T, LengthBase, DtTwo>;

impl fmt::Debug for Length<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Length")
            .field("meters", &self.into_meters())
            .field("feet", &self.into_feet())
            .finish()
    }
}

impl fmt::Debug for Length<DVec2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Length")
            .field("x.meters", &self.x().into_meters())
            .field("y.meters", &self.y().into_meters())
            .finish()
    }
}

impl fmt::Debug for Speed<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Speed")
            .field("knots", &self.into_knots())
            .field("fpm", &self.into_fpm())
            .finish()
    }
}

impl fmt::Debug for Accel<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accel")
            .field("knots/s", &self.into_knots_per_sec())
            .field("fpm/s", &self.into_fpm_per_sec())
            .finish()
    }
}

impl Length<f64> {
    #[must_use]
    pub const fn into_nm(self) -> f64 { self.0 }

    #[must_use]
    pub const fn from_nm(nm: f64) -> Self { Self(nm, PhantomData) }

    #[must_use]
    pub const fn into_feet(self) -> f64 { self.0 * FEET_PER_NM }

    #[must_use]
    pub const fn from_feet(feet: f64) -> Self { Self(feet / FEET_PER_NM, PhantomData) }

    #[must_use]
    pub const fn into_meters(self) -> f64 { self.0 * METERS_PER_NM }

    #[must_use]
    pub const fn from_meters(meters: f64) -> Self { Self(meters / METERS_PER_NM, PhantomData) }
}

impl Length<DVec2> {
    #[must_use]
    pub fn into_feet(self) -> DVec2 { self.0 * FEET_PER_NM }

    #[must_use]
    pub fn vec2_from_feet(feet: DVec2) -> Self { Self(feet / FEET_PER_NM, PhantomData) }

    #[must_use]
    pub fn into_meters(self) -> DVec2 { self.0 * METERS_PER_NM }

    #[must_use]
    pub fn vec2_from_meters(meters: DVec2) -> Self { Self(meters / METERS_PER_NM, PhantomData) }
}

impl Speed<f64> {
    #[must_use]
    pub const fn into_knots(self) -> f64 { self.0 * SECONDS_PER_HOUR }

    #[must_use]
    pub const fn from_knots(knots: f64) -> Self { Self(knots / SECONDS_PER_HOUR, PhantomData) }

    #[must_use]
    pub const fn into_meter_per_sec(self) -> f64 { self.0 * METERS_PER_NM }

    #[must_use]
    pub const fn from_meter_per_sec(mps: f64) -> Self { Self(mps / METERS_PER_NM, PhantomData) }

    #[must_use]
    pub const fn into_fpm(self) -> f64 { self.0 * (SECONDS_PER_MINUTE * FEET_PER_NM) }

    #[must_use]
    pub const fn from_fpm(fpm: f64) -> Self {
        Self(fpm / (SECONDS_PER_MINUTE * FEET_PER_NM), PhantomData)
    }
}

impl Accel<f64> {
    #[must_use]
    pub const fn into_knots_per_sec(self) -> f64 { self.0 * SECONDS_PER_HOUR }

    #[must_use]
    pub const fn from_knots_per_sec(knots: f64) -> Self {
        Self(knots / SECONDS_PER_HOUR, PhantomData)
    }

    #[must_use]
    pub const fn into_fpm_per_sec(self) -> f64 { self.0 * (SECONDS_PER_MINUTE * FEET_PER_NM) }

    #[must_use]
    pub const fn from_fpm_per_sec(fpm: f64) -> Self {
        Self(fpm / (SECONDS_PER_MINUTE * FEET_PER_NM), PhantomData)
    }
}
