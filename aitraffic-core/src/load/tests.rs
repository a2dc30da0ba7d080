use bevy::ecs::system::Command as _;
use bevy::ecs::world::World;

use super::{Command, Error, build_simulation};
use crate::ground::{NodeId, SegmentId};
use crate::sim::Simulation;
use crate::traffic::AircraftId;

const SCENARIO: &str = r#"{
    "airports": [{
        "ident": "EHAM",
        "position": {"lat": 52.3086, "lon": 4.7639},
        "elevation_ft": -11,
        "nodes": [
            {"id": 1, "position": {"lat": 52.3000, "lon": 4.7600}},
            {"id": 2, "position": {"lat": 52.2990, "lon": 4.7600}},
            {"id": 3, "position": {"lat": 52.2990, "lon": 4.7630}},
            {"id": 4, "position": {"lat": 52.2990, "lon": 4.7660}, "on_runway": true}
        ],
        "segments": [
            {"start": 1, "end": 2, "push_back": true},
            {"start": 2, "end": 3, "two_way": true},
            {"start": 3, "end": 4, "two_way": true, "active": false}
        ]
    }],
    "aircraft": [
        {
            "callsign": "PH-ABC",
            "performance": "light",
            "radius_m": 6.0,
            "plan": {
                "name": "tour",
                "repeat": true,
                "waypoints": [
                    {"name": "A", "position": {"lat": 52.30, "lon": 4.76}, "altitude_ft": 0, "speed_kt": 10, "on_ground": true},
                    {"name": "B", "position": {"lat": 52.31, "lon": 4.76}, "altitude_ft": 0, "speed_kt": 10, "on_ground": true}
                ]
            }
        },
        {
            "callsign": "KLM123",
            "performance": "jet_transport",
            "radius_m": 20.0,
            "flights": [{
                "departure": {
                    "airport": "EHAM",
                    "gate": {"lat": 52.3000, "lon": 4.7600},
                    "runway": "09",
                    "runway_node": 4,
                    "runway_heading_deg": 90
                },
                "arrival": {
                    "airport": "EHAM",
                    "gate": {"lat": 52.3000, "lon": 4.7600},
                    "runway": "09",
                    "runway_node": 4,
                    "runway_heading_deg": 90
                },
                "departure_time_s": 600,
                "cruise_altitude_ft": 8000
            }]
        }
    ]
}"#;

fn scenario() -> store::Scenario { serde_json::from_str(SCENARIO).expect("valid scenario") }

#[test]
fn builds_airports_and_aircraft() {
    let sim = build_simulation(&scenario()).expect("scenario is consistent");

    let graph = &sim.airports["EHAM"].graph;
    assert_eq!(graph.nodes().len(), 4);
    assert_eq!(graph.segments().len(), 5, "two-way segments are added in both directions");
    let reverse = graph.find_segment(SegmentId(2)).expect("reverse segment");
    assert_eq!((reverse.start, reverse.end), (NodeId(3), NodeId(2)));
    assert_eq!(reverse.opposite, Some(SegmentId(1)));
    assert!(!graph.find_segment(SegmentId(3)).expect("closed segment").active);
    assert!(!graph.find_segment(SegmentId(4)).expect("closed segment").active);
    assert_eq!(graph.push_back_nodes().collect::<Vec<_>>(), [NodeId(2)]);

    let ids: Vec<_> = sim.aircraft().iter().map(|aircraft| aircraft.id()).collect();
    assert_eq!(ids, [AircraftId(1), AircraftId(2)]);

    let tour = sim.find(AircraftId(1)).and_then(|aircraft| aircraft.plan()).expect("predefined plan");
    assert!(tour.repeat);
    assert_eq!(tour.waypoints().len(), 2);

    let airliner = sim.find(AircraftId(2)).expect("scheduled aircraft");
    let plan = airliner.plan().expect("schedule builds a plan");
    assert_eq!(plan.leg, 2);
    assert_eq!(plan.waypoints().first().map(|wp| wp.name.as_str()), Some("Gate"));
    assert!((airliner.kinematics.altitude.into_feet() + 11.).abs() < 1e-9);
}

#[test]
fn rejects_unknown_airport() {
    let mut scenario = scenario();
    scenario.aircraft[1].flights[0].arrival.airport = "EGLL".into();

    let err = build_simulation(&scenario).err().expect("arrival airport is missing");
    assert!(matches!(err, Error::UnresolvedAirport(ident) if ident == "EGLL"));
}

#[test]
fn rejects_short_plan() {
    let mut scenario = scenario();
    if let Some(plan) = &mut scenario.aircraft[0].plan {
        plan.waypoints.truncate(1);
    }

    let err = build_simulation(&scenario).err().expect("one waypoint is not a plan");
    assert!(matches!(err, Error::PlanTooShort(callsign) if callsign == "PH-ABC"));
}

#[test]
fn rejects_non_finite_values() {
    let mut scenario = scenario();
    scenario.airports[0].nodes[2].position.lat = f64::NAN;

    let err = build_simulation(&scenario).err().expect("NaN position");
    assert!(matches!(err, Error::NonFiniteFloat(_)));
}

#[test]
fn rejects_dangling_segment() {
    let mut scenario = scenario();
    scenario.airports[0].segments[0].end = 9;

    let err = build_simulation(&scenario).err().expect("node 9 is missing");
    assert!(matches!(err, Error::Graph { airport, .. } if airport == "EHAM"));
}

#[test]
fn rejects_aircraft_without_traffic() {
    let mut scenario = scenario();
    scenario.aircraft[1].flights.clear();

    let err = build_simulation(&scenario).err().expect("no plan and no flights");
    assert!(matches!(err, Error::NoTraffic(_)));
}

#[test]
fn command_replaces_simulation() {
    let mut world = World::new();
    world.insert_resource(Simulation::default());

    Command {
        scenario: Box::new(scenario()),
        on_error: Box::new(|_, err| panic!("unexpected load error: {err}")),
    }
    .apply(&mut world);

    assert_eq!(world.resource::<Simulation>().aircraft().len(), 2);
}

#[test]
fn command_reports_errors() {
    let mut scenario = scenario();
    scenario.airports.push(scenario.airports[0].clone());

    let mut world = World::new();
    Command {
        scenario: Box::new(scenario),
        on_error: Box::new(|world, err| {
            assert!(matches!(err, Error::DuplicateAirport(_)));
            world.insert_resource(Simulation::default());
        }),
    }
    .apply(&mut world);

    assert!(world.resource::<Simulation>().aircraft().is_empty());
}
