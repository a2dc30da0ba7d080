use math::GeoPos;
use serde::{Deserialize, Serialize};

use crate::FlightPlan;

/// An AI aircraft in a scenario.
#[derive(Clone, Serialize, Deserialize)]
pub struct Aircraft {
    /// Callsign of the aircraft.
    pub callsign:     String,
    /// Performance class of the aircraft.
    pub performance:  PerformanceClass,
    /// Radius of the aircraft in meters, used for separation.
    pub radius_m:     f64,
    /// Flight rules of the aircraft.
    #[serde(default)]
    pub flight_rules: FlightRules,
    /// Predefined flight plan, if the aircraft is not driven by a traffic schedule.
    #[serde(default)]
    pub plan:         Option<FlightPlan>,
    /// Scheduled flights flown in a cycle, used if there is no predefined plan.
    #[serde(default)]
    pub flights:      Vec<ScheduledFlight>,
}

/// A flight between two airports in a traffic schedule.
#[derive(Clone, Serialize, Deserialize)]
pub struct ScheduledFlight {
    /// Where the flight starts.
    pub departure:          FlightEnd,
    /// Where the flight ends.
    pub arrival:            FlightEnd,
    /// Scheduled off-block time in simulation seconds.
    pub departure_time_s:   f64,
    /// Cruise altitude in feet.
    pub cruise_altitude_ft: f64,
}

/// The ground part of one end of a scheduled flight.
#[derive(Clone, Serialize, Deserialize)]
pub struct FlightEnd {
    /// Ident of the airport.
    pub airport:            String,
    /// Parking position.
    pub gate:               GeoPos,
    /// Name of the runway in use.
    pub runway:             String,
    /// Taxi node at the runway threshold.
    pub runway_node:        u32,
    /// Runway heading in degrees.
    pub runway_heading_deg: f64,
}

/// Performance class selecting the fixed performance table of an aircraft.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PerformanceClass {
    /// Light piston aircraft.
    Light,
    /// Second world war fighter.
    Ww2Fighter,
    /// Jet airliner.
    JetTransport,
    /// Jet fighter.
    JetFighter,
    /// Air-to-air refueling tanker.
    Tanker,
    /// An unidentified flying object with extreme performance.
    Ufo,
}

/// Flight rules of an aircraft.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum FlightRules {
    /// Visual flight rules.
    Vfr,
    /// Instrument flight rules.
    #[default]
    Ifr,
}
