#![allow(
    clippy::excessive_precision,
    clippy::unreadable_literal,
    reason = "we don't really want to read the mathematical constants in this file."
)]

mod units;
pub use units::*;

mod heading;
pub use heading::{Heading, TurnDirection};

mod geo;
pub use geo::{EARTH_RADIUS_METERS, GeoPos};

mod control;
pub use control::*;
