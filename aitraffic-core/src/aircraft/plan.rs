use math::{GeoPos, Length, Speed};

use super::LegPlan;
use crate::ground::SegmentId;

/// A waypoint of a runtime flight plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub name:        String,
    pub position:    GeoPos,
    pub altitude:    Length<f64>,
    /// Speed to hold after passing this waypoint, negative when reversing.
    pub speed:       Speed<f64>,
    pub on_ground:   bool,
    /// Altitude to reach when crossing this waypoint, flown as a constant glide path.
    pub cross_at:    Option<Length<f64>>,
    /// Route position reached at this waypoint, if it is part of a taxi route.
    pub route_index: Option<SegmentId>,
    /// Passing this waypoint ends the plan.
    pub finished:    bool,
}

impl Waypoint {
    #[must_use]
    pub fn new(name: impl Into<String>, position: GeoPos, altitude: Length<f64>, speed: Speed<f64>) -> Self {
        Self {
            name: name.into(),
            position,
            altitude,
            speed,
            on_ground: false,
            cross_at: None,
            route_index: None,
            finished: false,
        }
    }

    #[must_use]
    pub fn on_ground(mut self) -> Self {
        self.on_ground = true;
        self
    }

    #[must_use]
    pub fn cross_at(mut self, altitude: Length<f64>) -> Self {
        self.cross_at = Some(altitude);
        self
    }

    #[must_use]
    pub fn route_index(mut self, pos: SegmentId) -> Self {
        self.route_index = Some(pos);
        self
    }
}

impl From<&store::Waypoint> for Waypoint {
    fn from(wp: &store::Waypoint) -> Self {
        Self {
            name:        wp.name.clone(),
            position:    wp.position,
            altitude:    Length::from_feet(wp.altitude_ft),
            speed:       Speed::from_knots(wp.speed_kt),
            on_ground:   wp.on_ground,
            cross_at:    wp.cross_at_ft.map(Length::from_feet),
            route_index: None,
            finished:    wp.finished,
        }
    }
}

/// An ordered list of waypoints with a cursor over the previous, current and next waypoint.
///
/// The cursor points at the current waypoint.
/// A plan whose cursor is at the first waypoint has not been started yet.
#[derive(Debug, Clone)]
pub struct FlightPlan {
    pub name:             String,
    waypoints:            Vec<Waypoint>,
    cursor:               usize,
    pub repeat:           bool,
    /// The leg of the last loaded part of the plan.
    pub leg:              u32,
    /// The plan is not evaluated before this time.
    pub start_time_s:     f64,
    pub runway:           Option<String>,
    /// Distance before the current waypoint at which the turn towards the next one starts.
    pub lead_distance:    Length<f64>,
    /// Route positions of the taxi route of the current leg.
    pub route:            Vec<SegmentId>,
}

impl FlightPlan {
    #[must_use]
    pub fn new(name: impl Into<String>, waypoints: Vec<Waypoint>, repeat: bool) -> Self {
        Self {
            name: name.into(),
            waypoints,
            cursor: 0,
            repeat,
            leg: 0,
            start_time_s: 0.,
            runway: None,
            lead_distance: Length::ZERO,
            route: Vec::new(),
        }
    }

    #[must_use]
    pub fn waypoints(&self) -> &[Waypoint] { &self.waypoints }

    #[must_use]
    pub fn cursor(&self) -> usize { self.cursor }

    #[must_use]
    pub fn previous(&self) -> Option<&Waypoint> { self.waypoints.get(self.cursor.checked_sub(1)?) }

    #[must_use]
    pub fn current(&self) -> Option<&Waypoint> { self.waypoints.get(self.cursor) }

    #[must_use]
    pub fn next(&self) -> Option<&Waypoint> { self.waypoints.get(self.cursor + 1) }

    pub fn advance(&mut self) {
        if self.cursor < self.waypoints.len() {
            self.cursor += 1;
        }
    }

    /// Moves the cursor back to the first waypoint.
    pub fn restart(&mut self) { self.cursor = 0; }

    #[must_use]
    pub fn is_active(&self, now_s: f64) -> bool { now_s >= self.start_time_s }

    /// Appends the waypoints of a new leg, dropping the waypoints before the previous one.
    pub fn append_leg(&mut self, leg: u32, plan: LegPlan) {
        let passed = self.cursor.saturating_sub(1);
        self.waypoints.drain(..passed);
        self.cursor -= passed;

        self.waypoints.extend(plan.waypoints);
        self.leg = leg;
        self.route = plan.route;
        if plan.runway.is_some() {
            self.runway = plan.runway;
        }
    }
}
