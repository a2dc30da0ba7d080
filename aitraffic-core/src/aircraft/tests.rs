use std::collections::HashMap;
use std::time::Duration;

use bevy::math::DVec2;
use math::{GeoPos, Heading, Length, Speed};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use store::{FlightEnd, FlightRules, ScheduledFlight};

use super::{
    Aircraft, ConstantElevation, ControlInputs, ExecEnv, FlightPlan, FlightSchedule, Kinematics, LAST_LEG,
    LegPlan, LegStart, PUSH_BACK_POINT, PerformanceProfile, ScheduleError, TrafficSchedule, Waypoint,
    lead_distance,
};
use crate::atc::{Airport, Airports, ControllerKind, ControllerRef};
use crate::config::Config;
use crate::ground::{NodeSpec, SegmentSpec, TaxiGraph};
use crate::sim::LegChangedMessage;
use crate::traffic::{AircraftId, UserAircraft};

const ORIGIN: GeoPos = GeoPos::new(52.0, 4.0);
const DT: Duration = Duration::from_millis(100);

fn at(east_m: f64, north_m: f64) -> GeoPos {
    ORIGIN.offset(Length::vec2_from_meters(DVec2::new(east_m, north_m)))
}

fn point(name: &str, position: GeoPos, knots: f64) -> Waypoint {
    Waypoint::new(name, position, Length::ZERO, Speed::from_knots(knots))
}

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!((actual - expected).abs() <= tolerance, "expected {expected} +/- {tolerance}, got {actual}");
}

struct World {
    airports:    Airports,
    config:      Config,
    rng:         SmallRng,
    elevation:   ConstantElevation,
    user:        Option<UserAircraft>,
    leg_changes: Vec<LegChangedMessage>,
    now_s:       f64,
}

impl World {
    fn new(airports: Airports) -> Self {
        Self {
            airports,
            config: Config::default(),
            rng: SmallRng::seed_from_u64(3),
            elevation: ConstantElevation(Length::ZERO),
            user: None,
            leg_changes: Vec::new(),
            now_s: 0.,
        }
    }

    fn tick(&mut self, aircraft: &mut Aircraft) {
        let mut env = ExecEnv {
            now_s:       self.now_s,
            airports:    &mut self.airports,
            user:        self.user.as_ref(),
            config:      &self.config,
            rng:         &mut self.rng,
            elevation:   &self.elevation,
            leg_changes: &mut self.leg_changes,
        };
        aircraft.run(DT, &mut env);
        self.now_s += DT.as_secs_f64();
    }

    fn run_until(&mut self, aircraft: &mut Aircraft, until_s: f64) {
        while self.now_s < until_s {
            self.tick(aircraft);
        }
    }
}

fn ground_aircraft(heading: Heading) -> Aircraft {
    Aircraft::new(
        AircraftId(1),
        "TEST1".into(),
        &PerformanceProfile::LIGHT,
        Length::from_meters(10.),
        FlightRules::Vfr,
        Kinematics::new(ORIGIN, Length::ZERO, heading),
    )
}

fn shuttle_plan(repeat: bool) -> FlightPlan {
    FlightPlan::new(
        "shuttle",
        vec![point("A", at(0., 0.), 20.).on_ground(), point("B", at(200., 0.), 20.).on_ground()],
        repeat,
    )
}

#[test]
fn plan_cursor_walks_the_waypoints() {
    let mut plan = shuttle_plan(false);
    assert!(plan.previous().is_none());
    assert_eq!(plan.current().map(|wp| wp.name.as_str()), Some("A"));
    assert_eq!(plan.next().map(|wp| wp.name.as_str()), Some("B"));

    plan.advance();
    plan.advance();
    plan.advance();
    assert_eq!(plan.cursor(), 2, "the cursor stops one past the last waypoint");
    assert_eq!(plan.previous().map(|wp| wp.name.as_str()), Some("B"));
    assert!(plan.current().is_none());

    plan.restart();
    assert_eq!(plan.cursor(), 0);
}

#[test]
fn appending_a_leg_drops_passed_waypoints() {
    let mut plan = FlightPlan::new(
        "legs",
        vec![point("A", at(0., 0.), 10.), point("B", at(100., 0.), 10.), point("C", at(200., 0.), 10.)],
        false,
    );
    plan.advance();
    plan.advance();

    plan.append_leg(
        4,
        LegPlan {
            waypoints: vec![point("D", at(300., 0.), 10.)],
            route:     Vec::new(),
            runway:    Some("27".into()),
        },
    );

    let names: Vec<_> = plan.waypoints().iter().map(|wp| wp.name.as_str()).collect();
    assert_eq!(names, ["B", "C", "D"]);
    assert_eq!(plan.previous().map(|wp| wp.name.as_str()), Some("B"));
    assert_eq!(plan.current().map(|wp| wp.name.as_str()), Some("C"));
    assert_eq!(plan.leg, 4);
    assert_eq!(plan.runway.as_deref(), Some("27"));
}

#[test]
fn lead_distance_depends_on_turn_and_speed() {
    let next = Some(at(100., 0.));
    let lead_ft = |knots: f64, heading: Heading, next: Option<GeoPos>| {
        lead_distance(Speed::from_knots(knots), heading, ORIGIN, next).into_feet()
    };

    assert_close(lead_ft(10., Heading::NORTH, None), 0., 1e-9);
    assert_close(lead_ft(10., Heading::EAST, next), 0., 0.01);

    let taxi_radius = 12. * 10. / std::f64::consts::TAU;
    assert_close(lead_ft(10., Heading::NORTH, next), taxi_radius, 0.05);

    let air_radius = 0.1911 * 100. * 100.;
    assert_close(lead_ft(100., Heading::NORTH, next), air_radius, 5.);

    assert_close(lead_ft(10., Heading::WEST, next), taxi_radius * 75f64.to_radians().tan(), 0.1);

    assert_close(lead_ft(-10., Heading::WEST, next), 0., 0.01);
}

#[test]
fn single_run_plan_ends_at_last_waypoint() {
    let mut world = World::new(HashMap::new());
    let mut aircraft = ground_aircraft(Heading::NORTH).with_plan(shuttle_plan(false));

    world.tick(&mut aircraft);
    assert_eq!(aircraft.plan().map(FlightPlan::cursor), Some(1));
    assert!(ORIGIN.distance(aircraft.kinematics.position) < Length::from_meters(2.));
    assert_close(aircraft.kinematics.heading.abs_difference(Heading::EAST), 0., 0.5);

    world.run_until(&mut aircraft, 60.);
    assert!(aircraft.is_dead());
}

#[test]
fn repeating_plan_restarts() {
    let mut world = World::new(HashMap::new());
    let mut aircraft = ground_aircraft(Heading::NORTH).with_plan(shuttle_plan(true));

    let mut farthest_m: f64 = 0.;
    let mut restarts = 0;
    while world.now_s < 90. {
        world.tick(&mut aircraft);
        assert!(!aircraft.is_dead());
        assert!(aircraft.plan().is_some_and(|plan| plan.cursor() <= 2));

        let distance_m = ORIGIN.distance(aircraft.kinematics.position).into_meters();
        if distance_m < 5. && farthest_m > 100. {
            restarts += 1;
            farthest_m = 0.;
        }
        farthest_m = farthest_m.max(distance_m);
    }
    assert!(restarts >= 2, "restarted {restarts} times");
}

#[test]
fn finished_waypoint_restarts_repeating_plan() {
    let mut world = World::new(HashMap::new());
    let mut stop = point("B", at(100., 0.), 0.).on_ground();
    stop.finished = true;
    let plan = FlightPlan::new("loop", vec![point("A", at(0., 0.), 10.).on_ground(), stop], true);
    let mut aircraft = ground_aircraft(Heading::NORTH).with_plan(plan);

    let mut cursors = Vec::new();
    while world.now_s < 120. {
        world.tick(&mut aircraft);
        assert!(!aircraft.is_dead(), "a repeating plan is never removed");
        let cursor = aircraft.plan().map(FlightPlan::cursor).expect("plan is kept");
        if cursors.last() != Some(&cursor) {
            cursors.push(cursor);
        }
    }

    let alternating = cursors.iter().enumerate().all(|(i, &cursor)| cursor == usize::from(i % 2 == 0));
    assert!(alternating, "cursor sequence {cursors:?}");
    let restarts = cursors.iter().filter(|&&cursor| cursor == 0).count();
    assert!(restarts >= 3, "restarted {restarts} times");
}

#[test]
fn ground_turn_converges_on_target_heading() {
    let mut world = World::new(HashMap::new());
    let mut aircraft = ground_aircraft(Heading::NORTH);
    aircraft.inputs =
        Some(ControlInputs { heading: Heading::EAST, altitude: Length::ZERO, speed: Speed::from_knots(10.) });

    world.run_until(&mut aircraft, 60.);

    let k = &aircraft.kinematics;
    assert!(k.heading.abs_difference(Heading::EAST) < 1., "heading {}", k.heading);
    assert_close(k.speed.into_knots(), 10., 0.5);
    assert_close(k.roll_deg, 0., 1e-9);
    assert!(ORIGIN.local_offset(k.position).x().is_positive());
}

#[test]
fn spinning_in_place_decays_target_speed() {
    let mut world = World::new(HashMap::new());
    let mut spinning = ground_aircraft(Heading::NORTH);
    spinning.kinematics.tgt_heading = Heading::SOUTH;
    spinning.kinematics.tgt_speed = Speed::from_knots(10.);
    spinning.kinematics.spin_deg = 400.;

    let mut steady = ground_aircraft(Heading::NORTH);
    steady.kinematics.tgt_heading = Heading::SOUTH;
    steady.kinematics.tgt_speed = Speed::from_knots(10.);

    for _ in 0..10 {
        world.tick(&mut spinning);
        world.tick(&mut steady);
    }

    assert_close(spinning.kinematics.tgt_speed.into_knots(), 10. * 0.999f64.powi(10), 1e-9);
    assert_close(steady.kinematics.tgt_speed.into_knots(), 10., 1e-9);
}

#[test]
fn climb_follows_performance_limits() {
    let mut world = World::new(HashMap::new());
    let mut aircraft = ground_aircraft(Heading::NORTH);
    aircraft.kinematics.no_roll = false;
    aircraft.kinematics.speed = Speed::from_knots(100.);
    aircraft.inputs = Some(ControlInputs {
        heading:  Heading::NORTH,
        altitude: Length::from_feet(5000.),
        speed:    Speed::from_knots(100.),
    });

    world.run_until(&mut aircraft, 30.);

    let k = &aircraft.kinematics;
    let fpm = k.vertical_speed.into_fpm();
    assert_close(fpm, PerformanceProfile::LIGHT.climb_rate.into_fpm(), 10.);
    let altitude_ft = k.altitude.into_feet();
    assert!(altitude_ft > 150. && altitude_ft < 225., "altitude {altitude_ft}");
    assert_close(k.pitch_deg, fpm * 0.005, 1e-9);
}

#[test]
fn cross_at_waypoint_flies_a_glide_path() {
    let mut world = World::new(HashMap::new());
    let threshold = ORIGIN.offset(Length::from_nm(2.) * Heading::NORTH);
    let crossing = Length::from_feet(500.);
    let plan = FlightPlan::new(
        "final",
        vec![
            Waypoint::new("Final", ORIGIN, Length::from_feet(1000.), Speed::from_knots(100.)),
            Waypoint::new("Threshold", threshold, crossing, Speed::from_knots(100.)).cross_at(crossing),
        ],
        false,
    );
    let mut aircraft = ground_aircraft(Heading::NORTH).with_plan(plan);

    world.tick(&mut aircraft);

    let slope = (crossing - Length::from_feet(1000.)) / ORIGIN.distance(threshold);
    let expected = Speed::from_knots(100.) * slope;
    assert_close(expected.into_fpm(), -416.7, 0.5);
    let k = &aircraft.kinematics;
    assert!(!k.use_perf_vs);
    assert_close(k.tgt_vs.into_fpm(), expected.into_fpm(), 1e-6);

    world.run_until(&mut aircraft, 10.);
    let k = &aircraft.kinematics;
    assert!(k.vertical_speed.is_negative());
    assert!(k.altitude < Length::from_feet(1000.), "altitude {:?}", k.altitude);
}

#[test]
fn banked_turn_in_the_air() {
    let mut world = World::new(HashMap::new());
    let mut aircraft = ground_aircraft(Heading::NORTH);
    aircraft.kinematics.no_roll = false;
    aircraft.kinematics.speed = Speed::from_knots(100.);
    aircraft.kinematics.altitude = Length::from_feet(1000.);
    aircraft.inputs = Some(ControlInputs {
        heading:  Heading::EAST,
        altitude: Length::from_feet(1000.),
        speed:    Speed::from_knots(100.),
    });

    world.run_until(&mut aircraft, 2.);
    assert!(aircraft.kinematics.roll_deg > 10., "rolls right towards east");

    world.run_until(&mut aircraft, 120.);
    let k = &aircraft.kinematics;
    assert!(k.heading.abs_difference(Heading::EAST) < 2., "heading {}", k.heading);
    assert!(k.roll_deg.abs() < 2.);
}

fn user_north_of_origin(distance: Length<f64>) -> UserAircraft {
    UserAircraft {
        position: ORIGIN.offset(distance * Heading::NORTH),
        heading:  Heading::NORTH,
        speed:    Speed::ZERO,
        radius:   Length::from_meters(15.),
    }
}

#[test]
fn waiting_aircraft_out_of_sight_is_removed() {
    let mut waiting_plan = shuttle_plan(false);
    waiting_plan.start_time_s = 1000.;

    let mut near = World::new(HashMap::new());
    near.user = Some(user_north_of_origin(Length::from_nm(10.)));
    let mut visible = ground_aircraft(Heading::NORTH).with_plan(waiting_plan.clone());
    near.run_until(&mut visible, 5.);
    assert!(!visible.is_dead());
    assert_close(visible.kinematics.tgt_speed.into_knots(), 0., 1e-9);

    let mut far = World::new(HashMap::new());
    far.user = Some(user_north_of_origin(Length::from_nm(far.config.visibility_nm + 10.)));
    let mut hidden = ground_aircraft(Heading::NORTH).with_plan(waiting_plan);
    far.run_until(&mut hidden, 5.);
    assert!(hidden.is_dead());
}

fn departure_airport() -> Airport {
    let mut builder = TaxiGraph::builder();
    builder
        .add_node(NodeSpec::new(1, at(0., 0.)))
        .add_node(NodeSpec::new(2, at(0., -100.)))
        .add_node(NodeSpec::new(3, at(200., -100.)))
        .add_node(NodeSpec::new(4, at(400., -100.)).on_runway())
        .add_segment(SegmentSpec::new(1, 2).push_back())
        .add_segment(SegmentSpec::new(2, 3))
        .add_segment(SegmentSpec::new(3, 2))
        .add_segment(SegmentSpec::new(3, 4))
        .add_segment(SegmentSpec::new(4, 3));
    let graph = builder.init().expect("valid graph");
    Airport::new("EHAM".into(), ORIGIN, Length::ZERO, graph)
}

fn arrival_airport() -> Airport {
    let mut builder = TaxiGraph::builder();
    builder
        .add_node(NodeSpec::new(1, at(0., 0.)))
        .add_node(NodeSpec::new(2, at(0., -100.)))
        .add_node(NodeSpec::new(3, at(200., -100.)))
        .add_node(NodeSpec::new(4, at(400., -100.)).on_runway())
        .add_segment(SegmentSpec::new(2, 1))
        .add_segment(SegmentSpec::new(3, 2))
        .add_segment(SegmentSpec::new(4, 3));
    let graph = builder.init().expect("valid graph");
    Airport::new("EHAM".into(), ORIGIN, Length::ZERO, graph)
}

fn scheduled_flight() -> ScheduledFlight {
    let end = FlightEnd {
        airport:            "EHAM".into(),
        gate:               at(0., 0.),
        runway:             "09".into(),
        runway_node:        4,
        runway_heading_deg: 90.,
    };
    ScheduledFlight { departure: end.clone(), arrival: end, departure_time_s: 100., cruise_altitude_ft: 5000. }
}

fn flight_schedule() -> FlightSchedule {
    FlightSchedule::new(vec![scheduled_flight()], FlightRules::Ifr, &PerformanceProfile::JET_TRANSPORT)
        .expect("one flight")
}

fn scheduled_aircraft(schedule: Box<dyn TrafficSchedule>, airports: &Airports) -> Aircraft {
    Aircraft::new(
        AircraftId(1),
        "KLM1".into(),
        &PerformanceProfile::JET_TRANSPORT,
        Length::from_meters(20.),
        FlightRules::Ifr,
        Kinematics::new(at(0., 0.), Length::ZERO, Heading::NORTH),
    )
    .with_schedule(schedule, airports)
    .expect("schedule is valid")
}

#[test]
fn schedule_builds_push_back_to_pushback_point() {
    let airports = HashMap::from([("EHAM".to_owned(), departure_airport())]);
    let schedule = flight_schedule();
    let start = LegStart { position: at(0., 0.), altitude: Length::ZERO };

    let gate = schedule.create_leg(1, &start, &airports).expect("gate leg");
    assert_eq!(gate.waypoints.len(), 1);
    assert!(gate.waypoints[0].speed.is_negative());

    let push_back = schedule.create_leg(2, &start, &airports).expect("pushback leg");
    let names: Vec<_> = push_back.waypoints.iter().map(|wp| wp.name.as_str()).collect();
    assert_eq!(names, [PUSH_BACK_POINT]);
    assert_eq!(push_back.route.len(), 1);

    let taxi = schedule
        .create_leg(3, &LegStart { position: at(0., -100.), altitude: Length::ZERO }, &airports)
        .expect("taxi leg");
    let names: Vec<_> = taxi.waypoints.iter().map(|wp| wp.name.as_str()).collect();
    assert_eq!(names, ["3", "4"]);
    assert_eq!(taxi.runway.as_deref(), Some("09"));
    assert!(taxi.waypoints.iter().all(|wp| wp.route_index.is_some()));

    assert!(schedule.create_leg(11, &start, &airports).is_err());
}

#[test]
fn taxi_in_starts_at_nearest_runway_node() {
    let airports = HashMap::from([("EHAM".to_owned(), arrival_airport())]);
    let schedule = flight_schedule();

    // node 3 is closer, but the roll ends on the runway
    let rollout = LegStart { position: at(260., -100.), altitude: Length::ZERO };
    let taxi_in = schedule.create_leg(9, &rollout, &airports).expect("taxi-in leg");
    let names: Vec<_> = taxi_in.waypoints.iter().map(|wp| wp.name.as_str()).collect();
    assert_eq!(names, ["4", "3", "2", "1"]);
    assert!(taxi_in.runway.is_none());
}

#[test]
fn scheduled_aircraft_waits_for_startup_clearance() {
    let airports = HashMap::from([("EHAM".to_owned(), departure_airport())]);
    let mut world = World::new(airports);
    let mut aircraft = scheduled_aircraft(Box::new(flight_schedule()), &world.airports);

    world.run_until(&mut aircraft, 50.);
    assert_eq!(
        aircraft.controller(),
        Some(&ControllerRef { airport: "EHAM".into(), kind: ControllerKind::Startup })
    );
    assert!(aircraft.transponder_code().is_none());
    assert!(at(0., 0.).distance(aircraft.kinematics.position) < Length::from_meters(5.));

    world.run_until(&mut aircraft, 400.);
    assert!(!aircraft.is_dead());
    let code = aircraft.transponder_code().expect("code issued before release");
    assert_eq!(code.len(), 4);
    assert!(at(0., 0.).distance(aircraft.kinematics.position) > Length::from_meters(50.));
    assert_eq!(aircraft.plan().map(|plan| plan.leg), Some(3));
    assert_eq!(world.leg_changes, [LegChangedMessage { aircraft: AircraftId(1), leg: 3 }]);
    assert_eq!(
        aircraft.controller(),
        Some(&ControllerRef { airport: "EHAM".into(), kind: ControllerKind::Ground })
    );
    let startup = world.airports["EHAM"].controller(ControllerKind::Startup);
    assert!(startup.traffic().is_empty(), "signed off from startup");
}

#[test]
fn heading_instruction_overrides_the_plan() {
    let airports = HashMap::from([("EHAM".to_owned(), departure_airport())]);
    let mut world = World::new(airports);
    let mut aircraft = scheduled_aircraft(Box::new(flight_schedule()), &world.airports);

    world.tick(&mut aircraft);
    assert!(aircraft.kinematics.hdg_lock);

    let startup = world.airports.get_mut("EHAM").expect("airport").controller_mut(ControllerKind::Startup);
    let instruction = startup.instruction_mut(AircraftId(1)).expect("registered at startup");
    instruction.change_heading = Some(Heading::WEST);

    world.run_until(&mut aircraft, 20.);
    let k = &aircraft.kinematics;
    assert!(!k.hdg_lock);
    assert_eq!(k.tgt_heading, Heading::WEST);
}

/// Every leg is a single ground waypoint 100 m east of where the leg starts.
struct EastboundSchedule {
    departure: &'static str,
    arrival:   &'static str,
}

impl TrafficSchedule for EastboundSchedule {
    fn departure_airport(&self) -> &str { self.departure }

    fn arrival_airport(&self) -> &str { self.arrival }

    fn departure_time_s(&self) -> f64 { 0. }

    fn flight_rules(&self) -> FlightRules { FlightRules::Vfr }

    fn advance(&mut self) {}

    fn create_leg(&self, leg: u32, start: &LegStart, _: &Airports) -> Result<LegPlan, ScheduleError> {
        let position = start.position.offset(Length::from_meters(100.) * Heading::EAST);
        let waypoint = point(&format!("L{leg}"), position, 10.).on_ground();
        Ok(LegPlan { waypoints: vec![waypoint], ..LegPlan::default() })
    }

    fn release_parking(&mut self) {}
}

#[test]
fn last_leg_wraps_to_the_first() {
    let airports = HashMap::from([("EHAM".to_owned(), departure_airport())]);
    let mut world = World::new(airports);
    let schedule = EastboundSchedule { departure: "EHAM", arrival: "EHAM" };
    let mut aircraft = scheduled_aircraft(Box::new(schedule), &world.airports);
    if let Some(plan) = &mut aircraft.plan {
        plan.leg = LAST_LEG;
    }

    for _ in 0..50 {
        world.tick(&mut aircraft);
        if !world.leg_changes.is_empty() {
            break;
        }
    }

    assert!(!aircraft.is_dead());
    assert_eq!(world.leg_changes, [LegChangedMessage { aircraft: AircraftId(1), leg: 1 }]);
    let plan = aircraft.plan().expect("plan continues");
    assert_eq!(plan.leg, 1);
    assert_eq!(plan.waypoints().last().map(|wp| wp.name.as_str()), Some("L1"));
}

#[test]
fn unknown_arrival_airport_removes_aircraft() {
    let airports = HashMap::from([("EHAM".to_owned(), departure_airport())]);
    let mut world = World::new(airports);
    let schedule = EastboundSchedule { departure: "EHAM", arrival: "LFPG" };
    let mut aircraft = scheduled_aircraft(Box::new(schedule), &world.airports);
    if let Some(plan) = &mut aircraft.plan {
        plan.leg = 5;
    }

    world.run_until(&mut aircraft, 5.);
    assert!(aircraft.is_dead());
}
