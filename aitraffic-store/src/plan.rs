use math::GeoPos;
use serde::{Deserialize, Serialize};

/// A predefined flight plan.
#[derive(Clone, Serialize, Deserialize)]
pub struct FlightPlan {
    /// Display name of the plan.
    pub name:      String,
    /// Whether the plan restarts from the first waypoint after the last one is passed.
    #[serde(default)]
    pub repeat:    bool,
    /// Waypoints of the plan in order.
    ///
    /// Must contain at least two waypoints.
    pub waypoints: Vec<Waypoint>,
}

/// A waypoint in a flight plan.
#[derive(Clone, Serialize, Deserialize)]
pub struct Waypoint {
    /// Symbolic name of the waypoint.
    ///
    /// `PushBackPoint` and `END` have special meaning at airports.
    pub name:        String,
    /// Position of the waypoint.
    pub position:    GeoPos,
    /// Target altitude in feet.
    pub altitude_ft: f64,
    /// Target speed in knots when leaving the waypoint.
    ///
    /// Negative speeds denote reversing, e.g. during pushback.
    pub speed_kt:    f64,
    /// Whether the aircraft is on ground at the waypoint.
    #[serde(default)]
    pub on_ground:   bool,
    /// Altitude to cross the waypoint at, if constrained.
    #[serde(default)]
    pub cross_at_ft: Option<f64>,
    /// Whether this waypoint terminates the plan.
    #[serde(default)]
    pub finished:    bool,
}
