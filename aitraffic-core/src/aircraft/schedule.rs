use math::{GeoPos, Heading, Length, Speed};
use ordered_float::OrderedFloat;
use store::{FlightEnd, FlightRules, ScheduledFlight};

use super::{PerformanceProfile, Waypoint};
use crate::atc::{Airport, Airports};
use crate::ground::{NodeId, RouteError, RouteSearch, SegmentId, TaxiGraph, TaxiRoute};

/// Waypoint name at which a pushback ends and the gate is released.
pub const PUSH_BACK_POINT: &str = "PushBackPoint";
/// Waypoint name at which a scheduled flight is parked at its arrival gate.
pub const END_POINT: &str = "END";

/// The last leg of a scheduled flight.
pub const LAST_LEG: u32 = 10;

const TAXI_SPEED: Speed<f64> = Speed::from_knots(15.);
const PUSH_BACK_SPEED: Speed<f64> = Speed::from_knots(5.);

/// Waypoints and taxi route of a single leg.
#[derive(Debug, Clone, Default)]
pub struct LegPlan {
    pub waypoints: Vec<Waypoint>,
    pub route:     Vec<SegmentId>,
    pub runway:    Option<String>,
}

/// Where a new leg starts, usually the last waypoint of the previous leg.
#[derive(Debug, Clone, Copy)]
pub struct LegStart {
    pub position: GeoPos,
    pub altitude: Length<f64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("schedule has no flights")]
    NoFlights,
    #[error("airport {0} is not loaded")]
    UnknownAirport(String),
    #[error("airport {0} has no taxi nodes")]
    NoTaxiNode(String),
    #[error("taxi route at {airport}: {source}")]
    Route {
        airport: String,
        #[source]
        source:  RouteError,
    },
    #[error("leg {0} does not exist")]
    UnknownLeg(u32),
}

/// A source of flights for an AI aircraft.
pub trait TrafficSchedule: Send + Sync {
    fn departure_airport(&self) -> &str;

    fn arrival_airport(&self) -> &str;

    /// Scheduled departure time of the current flight in simulation seconds.
    fn departure_time_s(&self) -> f64;

    fn flight_rules(&self) -> FlightRules;

    /// Moves on to the next flight.
    fn advance(&mut self);

    /// Builds the waypoints of `leg` of the current flight.
    fn create_leg(&self, leg: u32, start: &LegStart, airports: &Airports) -> Result<LegPlan, ScheduleError>;

    /// Frees the departure gate of the current flight.
    fn release_parking(&mut self);
}

/// Cycles through a fixed list of flights.
pub struct FlightSchedule {
    flights:      Vec<ScheduledFlight>,
    index:        usize,
    flight_rules: FlightRules,
    performance:  &'static PerformanceProfile,
    parked:       bool,
}

impl FlightSchedule {
    pub fn new(
        flights: Vec<ScheduledFlight>,
        flight_rules: FlightRules,
        performance: &'static PerformanceProfile,
    ) -> Result<Self, ScheduleError> {
        if flights.is_empty() {
            return Err(ScheduleError::NoFlights);
        }
        Ok(Self { flights, index: 0, flight_rules, performance, parked: true })
    }

    fn flight(&self) -> &ScheduledFlight { &self.flights[self.index % self.flights.len()] }

    #[must_use]
    pub fn is_parked(&self) -> bool { self.parked }

    fn gate_leg(end: &FlightEnd, airport: &Airport) -> LegPlan {
        let gate = Waypoint::new("Gate", end.gate, airport.elevation, -PUSH_BACK_SPEED).on_ground();
        LegPlan { waypoints: vec![gate], ..LegPlan::default() }
    }

    fn push_back_leg(end: &FlightEnd, airport: &Airport) -> Result<LegPlan, ScheduleError> {
        let graph = &airport.graph;
        let gate_node = nearest_node(airport, end.gate)?;

        let route = graph
            .push_back_nodes()
            .filter(|&node| node != gate_node)
            .filter_map(|node| graph.find_shortest_route_with(gate_node, node, RouteSearch::PushBack).ok())
            .min_by_key(|route| OrderedFloat(route.distance().0));

        let Some(route) = route else {
            bevy::log::debug!("no pushback route from gate at {}, pushing back in place", airport.ident);
            let position = graph.find_node(gate_node).map_or(end.gate, |node| node.position);
            let point = Waypoint::new(PUSH_BACK_POINT, position, airport.elevation, TAXI_SPEED).on_ground();
            return Ok(LegPlan { waypoints: vec![point], ..LegPlan::default() });
        };

        let mut waypoints = taxi_waypoints(graph, &route, -PUSH_BACK_SPEED, airport.elevation, false);
        if let Some(last) = waypoints.last_mut() {
            PUSH_BACK_POINT.clone_into(&mut last.name);
            last.speed = TAXI_SPEED;
        }
        Ok(LegPlan { waypoints, route: route.segments().to_vec(), runway: None })
    }

    fn taxi_leg(
        airport: &Airport,
        start: NodeId,
        to: NodeId,
        runway: Option<&str>,
        include_start: bool,
    ) -> Result<LegPlan, ScheduleError> {
        let route = airport
            .graph
            .find_shortest_route(start, to)
            .map_err(|source| ScheduleError::Route { airport: airport.ident.clone(), source })?;
        let waypoints =
            taxi_waypoints(&airport.graph, &route, TAXI_SPEED, airport.elevation, include_start);
        Ok(LegPlan { waypoints, route: route.segments().to_vec(), runway: runway.map(String::from) })
    }

    fn takeoff_leg(&self, end: &FlightEnd, airport: &Airport) -> Result<LegPlan, ScheduleError> {
        let perf = self.performance;
        let threshold = runway_threshold(end, airport)?;
        let along = runway_axis(threshold, end.runway_heading_deg);
        let elevation = airport.elevation;

        let waypoints = vec![
            Waypoint::new("Accel", along(Length::from_feet(1000.)), elevation, perf.takeoff_speed)
                .on_ground(),
            Waypoint::new(
                "Rotate",
                along(Length::from_feet(5000.)),
                elevation + Length::from_feet(400.),
                perf.climb_speed,
            ),
            Waypoint::new(
                "Climb",
                along(Length::from_nm(3.)),
                elevation + Length::from_feet(1500.),
                perf.climb_speed,
            ),
        ];
        Ok(LegPlan { waypoints, route: Vec::new(), runway: Some(end.runway.clone()) })
    }

    /// The point on the extended centerline where the final approach starts.
    fn approach_fix(end: &FlightEnd, airport: &Airport) -> Result<GeoPos, ScheduleError> {
        let threshold = runway_threshold(end, airport)?;
        Ok(runway_axis(threshold, end.runway_heading_deg)(Length::from_nm(-10.)))
    }

    fn en_route_leg(&self, leg: u32, start: &LegStart, airports: &Airports) -> Result<LegPlan, ScheduleError> {
        let perf = self.performance;
        let flight = self.flight();
        let arrival = find_airport(airports, &flight.arrival.airport)?;
        let fix = Self::approach_fix(&flight.arrival, arrival)?;
        let cruise = Length::from_feet(flight.cruise_altitude_ft);

        let waypoint = match leg {
            5 => Waypoint::new("TopOfClimb", lerp(start.position, fix, 0.2), cruise, perf.climb_speed),
            6 => Waypoint::new("TopOfDescent", lerp(start.position, fix, 0.8), cruise, perf.cruise_speed),
            7 => {
                let altitude = arrival.elevation + Length::from_feet(3000.);
                Waypoint::new("Approach", fix, altitude, perf.descent_speed)
            }
            _ => return Err(ScheduleError::UnknownLeg(leg)),
        };
        Ok(LegPlan { waypoints: vec![waypoint], ..LegPlan::default() })
    }

    fn landing_leg(&self, end: &FlightEnd, airport: &Airport) -> Result<LegPlan, ScheduleError> {
        let perf = self.performance;
        let threshold = runway_threshold(end, airport)?;
        let along = runway_axis(threshold, end.runway_heading_deg);
        let elevation = airport.elevation;
        let threshold_crossing = elevation + Length::from_feet(50.);

        let waypoints = vec![
            Waypoint::new(
                "Final",
                along(Length::from_nm(-3.)),
                elevation + Length::from_feet(1000.),
                perf.landing_speed,
            ),
            Waypoint::new("Threshold", threshold, threshold_crossing, perf.landing_speed)
                .cross_at(threshold_crossing),
            Waypoint::new("Touchdown", along(Length::from_feet(1500.)), elevation, perf.landing_speed)
                .cross_at(elevation)
                .on_ground(),
            Waypoint::new("Rollout", along(Length::from_feet(4000.)), elevation, TAXI_SPEED).on_ground(),
        ];
        Ok(LegPlan { waypoints, route: Vec::new(), runway: Some(end.runway.clone()) })
    }
}

impl TrafficSchedule for FlightSchedule {
    fn departure_airport(&self) -> &str { &self.flight().departure.airport }

    fn arrival_airport(&self) -> &str { &self.flight().arrival.airport }

    fn departure_time_s(&self) -> f64 { self.flight().departure_time_s }

    fn flight_rules(&self) -> FlightRules { self.flight_rules }

    fn advance(&mut self) {
        self.index = (self.index + 1) % self.flights.len();
        self.parked = true;
    }

    fn create_leg(&self, leg: u32, start: &LegStart, airports: &Airports) -> Result<LegPlan, ScheduleError> {
        let flight = self.flight();
        let departure = || find_airport(airports, &flight.departure.airport);
        let arrival = || find_airport(airports, &flight.arrival.airport);

        match leg {
            1 => Ok(Self::gate_leg(&flight.departure, departure()?)),
            2 => Self::push_back_leg(&flight.departure, departure()?),
            3 => Self::taxi_leg(
                departure()?,
                nearest_node(departure()?, start.position)?,
                NodeId(flight.departure.runway_node),
                Some(&flight.departure.runway),
                false,
            ),
            4 => self.takeoff_leg(&flight.departure, departure()?),
            5..=7 => self.en_route_leg(leg, start, airports),
            8 => self.landing_leg(&flight.arrival, arrival()?),
            9 => {
                let airport = arrival()?;
                let gate = nearest_node(airport, flight.arrival.gate)?;
                Self::taxi_leg(airport, runway_exit_node(airport, start.position)?, gate, None, true)
            }
            LAST_LEG => {
                let airport = arrival()?;
                let end =
                    Waypoint::new(END_POINT, flight.arrival.gate, airport.elevation, Speed::ZERO).on_ground();
                Ok(LegPlan { waypoints: vec![end], ..LegPlan::default() })
            }
            _ => Err(ScheduleError::UnknownLeg(leg)),
        }
    }

    fn release_parking(&mut self) {
        if self.parked {
            bevy::log::debug!("gate at {} released", self.flight().departure.airport);
        }
        self.parked = false;
    }
}

fn find_airport<'a>(airports: &'a Airports, ident: &str) -> Result<&'a Airport, ScheduleError> {
    airports.get(ident).ok_or_else(|| ScheduleError::UnknownAirport(ident.to_owned()))
}

fn nearest_node(airport: &Airport, position: GeoPos) -> Result<NodeId, ScheduleError> {
    airport.graph.find_nearest_node(position).ok_or_else(|| ScheduleError::NoTaxiNode(airport.ident.clone()))
}

/// The runway node closest to the end of the landing roll,
/// or the closest node at all if the airport has no runway nodes.
fn runway_exit_node(airport: &Airport, position: GeoPos) -> Result<NodeId, ScheduleError> {
    match airport.graph.find_nearest_node_on_runway(position) {
        Some(node) => Ok(node),
        None => nearest_node(airport, position),
    }
}

fn runway_threshold(end: &FlightEnd, airport: &Airport) -> Result<GeoPos, ScheduleError> {
    let node = NodeId(end.runway_node);
    airport.graph.find_node(node).map(|node| node.position).ok_or_else(|| ScheduleError::Route {
        airport: airport.ident.clone(),
        source:  RouteError::UnknownNode(node),
    })
}

/// Positions along the runway centerline, measured from the threshold.
fn runway_axis(threshold: GeoPos, heading_deg: f64) -> impl Fn(Length<f64>) -> GeoPos {
    let heading = Heading::from_degrees(heading_deg);
    move |distance| threshold.offset(distance * heading)
}

fn lerp(from: GeoPos, to: GeoPos, fraction: f64) -> GeoPos {
    GeoPos::new(from.lat + (to.lat - from.lat) * fraction, from.lon + (to.lon - from.lon) * fraction)
}

/// Converts a taxi route into ground waypoints, one per route node.
///
/// Every waypoint but the one at the start node carries the route position through which its node is reached.
/// The start node is skipped unless `include_start` is set or the route is empty.
fn taxi_waypoints(
    graph: &TaxiGraph,
    route: &TaxiRoute,
    speed: Speed<f64>,
    elevation: Length<f64>,
    include_start: bool,
) -> Vec<Waypoint> {
    let skip = usize::from(!include_start && !route.is_empty());
    route
        .steps()
        .skip(skip)
        .filter_map(|(node, pos)| {
            let position = graph.find_node(node)?.position;
            let waypoint = Waypoint::new(node.0.to_string(), position, elevation, speed).on_ground();
            Some(match pos {
                Some(pos) => waypoint.route_index(pos),
                None => waypoint,
            })
        })
        .collect()
}
