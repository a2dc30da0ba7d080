//! Builds a running [`Simulation`] from a parsed [`store::Scenario`].

use std::collections::HashMap;

use bevy::ecs::system::Command as BevyCommand;
use bevy::ecs::world::World;
use math::{GeoPos, Heading, Length};

use crate::aircraft::{
    Aircraft, FlightPlan, FlightSchedule, Kinematics, PerformanceProfile, ScheduleError, Waypoint,
};
use crate::atc::{Airport, Airports};
use crate::ground::{GraphError, NodeSpec, SegmentSpec, TaxiGraph};
use crate::sim::Simulation;
use crate::traffic::AircraftId;

#[cfg(test)]
mod tests;

/// Replaces the [`Simulation`] resource with the contents of a scenario.
pub struct Command {
    pub scenario: Box<store::Scenario>,
    pub on_error: Box<dyn FnOnce(&mut World, Error) + Send>,
}

impl BevyCommand for Command {
    fn apply(self, world: &mut World) {
        match build_simulation(&self.scenario) {
            Ok(sim) => {
                bevy::log::info!(
                    "loaded {} airports and {} aircraft",
                    sim.airports.len(),
                    sim.aircraft().len()
                );
                world.insert_resource(sim);
            }
            Err(err) => (self.on_error)(world, err),
        }
    }
}

/// Validates a scenario and builds its airports and aircraft.
pub fn build_simulation(scenario: &store::Scenario) -> Result<Simulation> {
    let airports = load_airports(&scenario.airports)?;
    let mut sim = Simulation::new(airports);
    for aircraft in &scenario.aircraft {
        let id = sim.allocate_id();
        let aircraft = load_aircraft(id, aircraft, &sim.airports)?;
        sim.insert(aircraft);
    }
    Ok(sim)
}

fn load_airports(airports: &[store::Airport]) -> Result<Airports> {
    let mut output = HashMap::with_capacity(airports.len());
    for airport in airports {
        let built = load_airport(airport)?;
        if output.insert(airport.ident.clone(), built).is_some() {
            return Err(Error::DuplicateAirport(airport.ident.clone()));
        }
    }
    Ok(output)
}

fn load_airport(airport: &store::Airport) -> Result<Airport> {
    check_position(airport.position, "airport position")?;
    check_finite(airport.elevation_ft, "airport elevation")?;

    let mut builder = TaxiGraph::builder();
    for node in &airport.nodes {
        check_position(node.position, "taxi node position")?;
        let mut spec = NodeSpec::new(node.id, node.position).hold_point(node.hold_point);
        if node.on_runway {
            spec = spec.on_runway();
        }
        builder.add_node(spec);
    }

    for segment in &airport.segments {
        let directions = if segment.two_way {
            vec![(segment.start, segment.end), (segment.end, segment.start)]
        } else {
            vec![(segment.start, segment.end)]
        };
        for (start, end) in directions {
            let mut spec = SegmentSpec::new(start, end);
            spec.active = segment.active;
            spec.push_back = segment.push_back;
            builder.add_segment(spec);
        }
    }

    let graph = builder
        .init()
        .map_err(|source| Error::Graph { airport: airport.ident.clone(), source })?;
    bevy::log::debug!(
        "airport {} has {} taxi nodes and {} segments",
        airport.ident,
        graph.nodes().len(),
        graph.segments().len()
    );
    Ok(Airport::new(airport.ident.clone(), airport.position, Length::from_feet(airport.elevation_ft), graph))
}

fn load_aircraft(id: AircraftId, aircraft: &store::Aircraft, airports: &Airports) -> Result<Aircraft> {
    check_finite(aircraft.radius_m, "aircraft radius")?;
    let radius = Length::from_meters(aircraft.radius_m);
    let performance = PerformanceProfile::for_class(aircraft.performance);

    if let Some(plan) = &aircraft.plan {
        for waypoint in &plan.waypoints {
            check_position(waypoint.position, "waypoint position")?;
            check_finite(waypoint.altitude_ft, "waypoint altitude")?;
            check_finite(waypoint.speed_kt, "waypoint speed")?;
        }
        let [first, _, ..] = plan.waypoints.as_slice() else {
            return Err(Error::PlanTooShort(aircraft.callsign.clone()));
        };

        let altitude = Length::from_feet(first.altitude_ft);
        let kinematics = Kinematics::new(first.position, altitude, Heading::NORTH);
        let waypoints = plan.waypoints.iter().map(Waypoint::from).collect();
        return Ok(Aircraft::new(
            id,
            aircraft.callsign.clone(),
            performance,
            radius,
            aircraft.flight_rules,
            kinematics,
        )
        .with_plan(FlightPlan::new(plan.name.clone(), waypoints, plan.repeat)));
    }

    let Some(first) = aircraft.flights.first() else {
        return Err(Error::NoTraffic(aircraft.callsign.clone()));
    };
    for flight in &aircraft.flights {
        check_finite(flight.departure_time_s, "departure time")?;
        check_finite(flight.cruise_altitude_ft, "cruise altitude")?;
        for end in [&flight.departure, &flight.arrival] {
            if !airports.contains_key(&end.airport) {
                return Err(Error::UnresolvedAirport(end.airport.clone()));
            }
            check_position(end.gate, "gate position")?;
            check_finite(end.runway_heading_deg, "runway heading")?;
        }
    }

    let elevation = airports.get(&first.departure.airport).map_or(Length::ZERO, |airport| airport.elevation);
    let kinematics = Kinematics::new(first.departure.gate, elevation, Heading::NORTH);
    let schedule_error = |source| Error::Schedule { callsign: aircraft.callsign.clone(), source };
    let schedule = FlightSchedule::new(aircraft.flights.clone(), aircraft.flight_rules, performance)
        .map_err(schedule_error)?;
    Aircraft::new(id, aircraft.callsign.clone(), performance, radius, aircraft.flight_rules, kinematics)
        .with_schedule(Box::new(schedule), airports)
        .map_err(schedule_error)
}

fn check_finite(value: f64, what: &'static str) -> Result<()> {
    if value.is_finite() { Ok(()) } else { Err(Error::NonFiniteFloat(what)) }
}

fn check_position(position: GeoPos, what: &'static str) -> Result<()> {
    if position.is_finite() { Ok(()) } else { Err(Error::NonFiniteFloat(what)) }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Airport {0:?} is defined more than once")]
    DuplicateAirport(String),
    #[error("Invalid taxi graph in airport {airport:?}: {source}")]
    Graph {
        airport: String,
        #[source]
        source:  GraphError,
    },
    #[error("No airport called {0:?}")]
    UnresolvedAirport(String),
    #[error("Non-finite value encountered at {0}")]
    NonFiniteFloat(&'static str),
    #[error("Flight plan of {0:?} has fewer than two waypoints")]
    PlanTooShort(String),
    #[error("Aircraft {0:?} has neither a flight plan nor scheduled flights")]
    NoTraffic(String),
    #[error("Cannot schedule {callsign:?}: {source}")]
    Schedule {
        callsign: String,
        #[source]
        source:   ScheduleError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
