use std::f64::consts::TAU;
use std::time::Duration;

use math::{GeoPos, Heading, Length, Speed, approach_asymmetric, step_towards, unit_sign};
use rand::Rng;
use rand::rngs::SmallRng;
use store::FlightRules;

use super::schedule::{END_POINT, LAST_LEG, PUSH_BACK_POINT};
use super::{
    ElevationSource, FlightPlan, LegStart, PerformanceProfile, ScheduleError, TrafficSchedule, Waypoint,
};
use crate::MapExt;
use crate::atc::{Airports, Announcement, AtcEnv, ControllerKind, ControllerRef};
use crate::config::Config;
use crate::sim::LegChangedMessage;
use crate::traffic::{AircraftId, Pose, UserAircraft};

const MAX_BANK_DEG: f64 = 30.;
const ROLL_RATE_DPS: f64 = 9.;
const ROLL_DEAD_BAND_DEG: f64 = 0.2;
const VS_DEAD_BAND: Speed<f64> = Speed::from_fpm(10.);
/// Time for the vertical speed to reach the climb or descent rate of the profile.
const VS_RESPONSE_TIME: Duration = Duration::from_secs(3);
/// The altitude error is closed within this time, limited by the profile rates.
const ALTITUDE_CAPTURE_TIME: Duration = Duration::from_secs(1);
const GROUND_DECEL_FACTOR: f64 = 3.;
const GROUND_TURN_THRESHOLD_DEG: f64 = 30.;
const MAX_GROUND_TURN_RATE_DPS: f64 = 30.;
/// Ground turn rates are scaled by the square root of the speed relative to this.
const GROUND_TURN_REFERENCE_SPEED: Speed<f64> = Speed::from_knots(15.);
const CREEP_SPEED: Speed<f64> = Speed::from_knots(0.21);
/// Ground elevation errors beyond this snap the altitude instead of easing into it.
const ELEVATION_SNAP: Length<f64> = Length::from_feet(1000.);
/// The lead distance is refreshed when the speed changed by more than this since the last refresh.
const LEAD_REFRESH_SPEED_CHANGE: Speed<f64> = Speed::from_knots(10.);
/// Turn angles beyond this are treated as this when computing the lead distance.
const MAX_LEAD_TURN_DEG: f64 = 150.;
/// Waypoints closer than this are always considered reached.
const MIN_LEAD_DISTANCE: Length<f64> = Length::from_meters(1.);
/// The lead point is never closer than this much distance per knot of speed, to avoid overshooting.
const LEAD_DISTANCE_PER_KNOT: Length<f64> = Length::from_meters(2.);
/// Minimum speed for the lead distance calculation.
const MIN_LEAD_SPEED_KT: f64 = 0.5;
/// Speed below which turns are modelled as taxiing turns for the lead distance.
const TAXI_TURN_SPEED_KT: f64 = 25.;

/// Kinematic state of an aircraft together with the targets it is steering towards.
#[derive(Debug, Clone)]
pub struct Kinematics {
    pub position:       GeoPos,
    pub altitude:       Length<f64>,
    pub heading:        Heading,
    /// Positive when moving forward, negative when reversing.
    pub speed:          Speed<f64>,
    pub vertical_speed: Speed<f64>,
    pub pitch_deg:      f64,
    pub roll_deg:       f64,

    pub tgt_heading:  Heading,
    pub tgt_altitude: Length<f64>,
    pub tgt_speed:    Speed<f64>,
    pub tgt_vs:       Speed<f64>,
    pub tgt_roll_deg: f64,

    /// The target altitude is maintained.
    pub alt_lock:    bool,
    /// The target heading follows the flight plan.
    pub hdg_lock:    bool,
    /// The aircraft is on ground and does not bank.
    pub no_roll:     bool,
    /// Vertical speed follows the performance profile instead of a glide path.
    pub use_perf_vs: bool,

    turn_rate_dps:     f64,
    heading_error_deg: f64,
    /// Heading change accumulated since the last waypoint.
    pub(super) spin_deg: f64,
}

impl Kinematics {
    #[must_use]
    pub fn new(position: GeoPos, altitude: Length<f64>, heading: Heading) -> Self {
        Self {
            position,
            altitude,
            heading,
            speed: Speed::ZERO,
            vertical_speed: Speed::ZERO,
            pitch_deg: 0.,
            roll_deg: 0.,
            tgt_heading: heading,
            tgt_altitude: altitude,
            tgt_speed: Speed::ZERO,
            tgt_vs: Speed::ZERO,
            tgt_roll_deg: 0.,
            alt_lock: false,
            hdg_lock: false,
            no_roll: true,
            use_perf_vs: true,
            turn_rate_dps: 0.,
            heading_error_deg: 0.,
            spin_deg: 0.,
        }
    }

    /// Target speed on ground, reduced while the heading is far from the target.
    ///
    /// A nonzero target never drops below creeping speed in its own direction.
    fn ground_target_speed(&self) -> Speed<f64> {
        if self.tgt_speed == Speed::ZERO {
            return Speed::ZERO;
        }
        let error = self.heading.abs_difference(self.tgt_heading);
        let speed = self.tgt_speed * error.to_radians().cos();
        let sense = unit_sign(self.tgt_speed.0);
        if unit_sign(speed.0) == sense && speed.abs() >= CREEP_SPEED { speed } else { CREEP_SPEED * sense }
    }
}

/// Direct targets for an aircraft without a flight plan.
#[derive(Debug, Clone, Copy)]
pub struct ControlInputs {
    pub heading:  Heading,
    pub altitude: Length<f64>,
    pub speed:    Speed<f64>,
}

/// State of an aircraft published to the outside world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    pub latitude:           f64,
    pub longitude:          f64,
    pub heading_deg:        f64,
    pub speed_kt:           f64,
    pub altitude_ft:        f64,
    pub vertical_speed_fpm: f64,
    pub pitch_deg:          f64,
    pub roll_deg:           f64,
}

/// Everything outside an aircraft that its executor reads or writes in a tick.
pub struct ExecEnv<'a> {
    /// Absolute simulation time in seconds.
    pub now_s:       f64,
    pub airports:    &'a mut Airports,
    pub user:        Option<&'a UserAircraft>,
    pub config:      &'a Config,
    pub rng:         &'a mut SmallRng,
    pub elevation:   &'a dyn ElevationSource,
    pub leg_changes: &'a mut Vec<LegChangedMessage>,
}

/// An AI aircraft and its flight plan executor.
pub struct Aircraft {
    id:                   AircraftId,
    pub callsign:         String,
    performance:          &'static PerformanceProfile,
    radius:               Length<f64>,
    flight_rules:         FlightRules,
    pub kinematics:       Kinematics,
    pub(super) plan:      Option<FlightPlan>,
    schedule:             Option<Box<dyn TrafficSchedule>>,
    pub inputs:           Option<ControlInputs>,
    controller:           Option<ControllerRef>,
    transponder:          Option<String>,
    /// Speed at the last lead distance calculation.
    prev_speed:           Speed<f64>,
    /// Seconds accumulated since the last flight plan evaluation.
    dt_count:             f64,
    /// Seconds accumulated since the last elevation query.
    dt_elevation:         f64,
    elevation_interval_s: f64,
    ground_elevation:     Option<Length<f64>>,
    die:                  bool,
}

impl Aircraft {
    #[must_use]
    pub fn new(
        id: AircraftId,
        callsign: String,
        performance: &'static PerformanceProfile,
        radius: Length<f64>,
        flight_rules: FlightRules,
        kinematics: Kinematics,
    ) -> Self {
        Self {
            id,
            callsign,
            performance,
            radius,
            flight_rules,
            kinematics,
            plan: None,
            schedule: None,
            inputs: None,
            controller: None,
            transponder: None,
            prev_speed: Speed::ZERO,
            dt_count: 0.,
            dt_elevation: 0.,
            elevation_interval_s: 0.,
            ground_elevation: None,
            die: false,
        }
    }

    #[must_use]
    pub fn with_plan(mut self, plan: FlightPlan) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Attaches a schedule and builds the plan of the first flight up to its pushback.
    pub fn with_schedule(
        mut self,
        schedule: Box<dyn TrafficSchedule>,
        airports: &Airports,
    ) -> Result<Self, ScheduleError> {
        let start = LegStart { position: self.kinematics.position, altitude: self.kinematics.altitude };
        let mut plan = FlightPlan::new(self.callsign.clone(), Vec::new(), false);
        for leg in [1, 2] {
            let leg_plan = schedule.create_leg(leg, &start, airports)?;
            plan.append_leg(leg, leg_plan);
        }
        self.flight_rules = schedule.flight_rules();
        self.plan = Some(plan);
        self.schedule = Some(schedule);
        Ok(self)
    }

    #[must_use]
    pub fn id(&self) -> AircraftId { self.id }

    #[must_use]
    pub fn radius(&self) -> Length<f64> { self.radius }

    #[must_use]
    pub fn plan(&self) -> Option<&FlightPlan> { self.plan.as_ref() }

    /// The controller the aircraft is currently talking to.
    #[must_use]
    pub fn controller(&self) -> Option<&ControllerRef> { self.controller.as_ref() }

    #[must_use]
    pub fn transponder_code(&self) -> Option<&str> { self.transponder.as_deref() }

    #[must_use]
    pub fn is_dead(&self) -> bool { self.die }

    /// Marks the aircraft for removal at the start of the next tick.
    pub fn kill(&mut self) { self.die = true; }

    #[must_use]
    pub fn pose(&self) -> Pose {
        let k = &self.kinematics;
        Pose { position: k.position, heading: k.heading, speed: k.speed, altitude: k.altitude }
    }

    #[must_use]
    pub fn telemetry(&self) -> Telemetry {
        let k = &self.kinematics;
        Telemetry {
            latitude:           k.position.lat,
            longitude:          k.position.lon,
            heading_deg:        k.heading.degrees(),
            speed_kt:           k.speed.into_knots(),
            altitude_ft:        k.altitude.into_feet(),
            vertical_speed_fpm: k.vertical_speed.into_fpm(),
            pitch_deg:          k.pitch_deg,
            roll_deg:           k.roll_deg,
        }
    }

    /// Signs off from the current controller, releasing anything held there.
    pub fn sign_off(&mut self, airports: &mut Airports) {
        if let Some(controller) = self.controller.take()
            && let Some(airport) = airports.log_get_mut(&controller.airport)
        {
            airport.sign_off(controller.kind, self.id);
        }
    }

    /// Advances the aircraft by `dt`.
    pub fn run(&mut self, dt: Duration, env: &mut ExecEnv) {
        if self.die {
            return;
        }

        if self.plan.is_some() {
            self.process_flight_plan(dt.as_secs_f64(), env);
        } else if let Some(inputs) = self.inputs {
            let k = &mut self.kinematics;
            k.tgt_heading = inputs.heading;
            k.tgt_altitude = inputs.altitude;
            k.tgt_speed = inputs.speed;
            k.hdg_lock = true;
            k.alt_lock = true;
        }
        if self.die {
            return;
        }

        self.follow_instructions(env);
        self.update_secondary_targets();
        self.update_actual_state(dt, env);
    }

    fn is_visible(&self, env: &ExecEnv) -> bool {
        env.user.is_none_or(|user| {
            user.position.distance(self.kinematics.position) <= Length::from_nm(env.config.visibility_nm)
        })
    }

    fn process_flight_plan(&mut self, dt_s: f64, env: &mut ExecEnv) {
        let Some(plan) = &self.plan else { return };
        if plan.previous().is_none() {
            self.handle_first_waypoint(env);
            return;
        }

        self.dt_count += dt_s;
        if self.dt_count < env.config.evaluation_interval_s {
            return;
        }
        self.dt_count = 0.;

        if !plan.is_active(env.now_s) {
            self.kinematics.tgt_speed = Speed::ZERO;
            if !self.is_visible(env) {
                bevy::log::debug!("{} is out of sight while waiting", self.id);
                self.die = true;
            }
            return;
        }

        let Some(curr) = plan.current() else {
            self.finish_plan();
            return;
        };
        let target = curr.position;
        let lead = plan.lead_distance;
        let reversing = plan.previous().is_some_and(|wp| wp.speed.is_negative());

        if self.lead_point_reached(target, lead) {
            self.pass_waypoint(env);
        } else {
            self.control_heading(target, reversing);
            self.control_speed();
        }
    }

    fn handle_first_waypoint(&mut self, env: &mut ExecEnv) {
        let Some(plan) = &mut self.plan else { return };
        plan.advance();
        let (Some(prev), Some(curr)) = (plan.previous().cloned(), plan.current().cloned()) else {
            bevy::log::warn!("{} has a flight plan with fewer than two waypoints", self.id);
            self.die = true;
            return;
        };
        let next = plan.next().map(|wp| wp.position);

        let k = &mut self.kinematics;
        k.position = prev.position;
        k.altitude = prev.altitude;
        k.speed = prev.speed;
        k.tgt_speed = prev.speed;
        let heading = if prev.speed.is_positive() {
            prev.position.course_to(curr.position)
        } else {
            curr.position.course_to(prev.position)
        };
        if heading.is_finite() {
            k.heading = heading;
        }
        k.tgt_heading = k.heading;
        plan.lead_distance = lead_distance(k.speed, k.heading, curr.position, next);

        if let Some(cross_at) = curr.cross_at {
            k.use_perf_vs = false;
            k.tgt_altitude = cross_at;
        } else {
            k.use_perf_vs = true;
            k.tgt_altitude = prev.altitude;
        }
        k.alt_lock = true;
        k.hdg_lock = true;
        k.no_roll = prev.on_ground;

        self.prev_speed = Speed::ZERO;
        self.dt_elevation = self.elevation_interval_s;
        bevy::log::debug!("{} starts {} at {}", self.id, plan.name, prev.name);
        self.announce(env);
    }

    fn lead_point_reached(&self, target: GeoPos, lead: Length<f64>) -> bool {
        let distance = self.kinematics.position.distance(target);
        let overshoot_guard = LEAD_DISTANCE_PER_KNOT * self.kinematics.speed.abs().into_knots();
        distance < lead.max(overshoot_guard).max(MIN_LEAD_DISTANCE)
    }

    fn control_heading(&mut self, target: GeoPos, reversing: bool) {
        let k = &mut self.kinematics;
        let mut course = k.position.course_to(target);
        if !course.is_finite() {
            return;
        }
        if reversing {
            course = course.opposite();
        }
        if k.hdg_lock {
            k.tgt_heading = course;
        }
    }

    fn control_speed(&mut self) {
        let speed = self.kinematics.speed;
        if (speed - self.prev_speed).abs() <= LEAD_REFRESH_SPEED_CHANGE {
            return;
        }
        self.prev_speed = speed;

        if let Some(plan) = &mut self.plan
            && let Some(curr) = plan.current()
        {
            let next = plan.next().map(|wp| wp.position);
            plan.lead_distance = lead_distance(speed, self.kinematics.tgt_heading, curr.position, next);
        }
    }

    fn finish_plan(&mut self) {
        let Some(plan) = &mut self.plan else { return };
        if plan.repeat {
            bevy::log::debug!("{} restarts {}", self.id, plan.name);
            plan.restart();
        } else {
            bevy::log::debug!("{} finished {}", self.id, plan.name);
            self.die = true;
        }
    }

    fn pass_waypoint(&mut self, env: &mut ExecEnv) {
        let Some(plan) = &mut self.plan else { return };
        let Some(curr) = plan.current() else { return };
        if curr.finished {
            self.finish_plan();
            return;
        }

        let k = &mut self.kinematics;
        if let Some(next) = plan.next() {
            let course = curr.position.course_to(next.position);
            if course.is_finite() {
                k.tgt_heading = if curr.speed.is_negative() { course.opposite() } else { course };
            }
            k.spin_deg = 0.;
        }

        plan.advance();
        if plan.next().is_none()
            && self.schedule.is_some()
            && let Err(err) = self.load_next_leg(env)
        {
            bevy::log::warn!("{} cannot continue its schedule: {err}", self.id);
            self.die = true;
            return;
        }

        let Some(plan) = &self.plan else { return };
        let (Some(prev), Some(curr)) = (plan.previous().cloned(), plan.current().cloned()) else {
            self.finish_plan();
            return;
        };
        let next = plan.next().map(|wp| wp.position);

        if self.schedule.is_some() && !self.is_visible(env) {
            bevy::log::debug!("{} is out of sight", self.id);
            self.die = true;
            return;
        }
        self.handle_airport_end_points(&prev, env);
        if self.die {
            return;
        }

        let k = &mut self.kinematics;
        if let Some(plan) = &mut self.plan {
            plan.lead_distance = lead_distance(k.speed, k.tgt_heading, curr.position, next);
        }
        if !prev.on_ground {
            k.tgt_altitude = prev.altitude;
            if let Some(cross_at) = curr.cross_at {
                k.use_perf_vs = false;
                k.tgt_altitude = cross_at;
            } else {
                k.use_perf_vs = true;
            }
        }
        k.tgt_speed = prev.speed;
        k.hdg_lock = true;
        k.alt_lock = true;
        k.no_roll = prev.on_ground;

        bevy::log::trace!("{} passed {} towards {}", self.id, prev.name, curr.name);
        self.announce(env);
    }

    fn load_next_leg(&mut self, env: &mut ExecEnv) -> Result<(), ScheduleError> {
        let (Some(plan), Some(schedule)) = (&mut self.plan, &mut self.schedule) else { return Ok(()) };

        let leg = if plan.leg >= LAST_LEG {
            schedule.advance();
            1
        } else {
            plan.leg + 1
        };
        let start = plan.waypoints().last().map_or(
            LegStart { position: self.kinematics.position, altitude: self.kinematics.altitude },
            |wp| LegStart { position: wp.position, altitude: wp.altitude },
        );

        let leg_plan = schedule.create_leg(leg, &start, env.airports)?;
        plan.append_leg(leg, leg_plan);
        bevy::log::debug!("{} starts leg {leg}", self.id);
        env.leg_changes.push(LegChangedMessage { aircraft: self.id, leg });
        Ok(())
    }

    fn handle_airport_end_points(&mut self, prev: &Waypoint, env: &ExecEnv) {
        let (Some(schedule), Some(plan)) = (&mut self.schedule, &mut self.plan) else { return };

        let departure = schedule.departure_airport();
        let arrival = schedule.arrival_airport();
        if !env.airports.contains_key(departure) || !env.airports.contains_key(arrival) {
            bevy::log::warn!("{} flies between unknown airports {departure} and {arrival}", self.id);
            self.die = true;
            return;
        }

        if prev.name == PUSH_BACK_POINT {
            schedule.release_parking();
            plan.start_time_s = env.now_s + env.config.push_back_hold_s;
        } else if prev.name == END_POINT {
            plan.start_time_s = schedule.departure_time_s().max(env.now_s + env.config.min_turnaround_s);
            bevy::log::debug!("{} parked until {:.0}", self.id, plan.start_time_s);
        }
    }

    /// The controller responsible for the current leg of a scheduled flight.
    fn controller_for_leg(&self) -> Option<ControllerRef> {
        let schedule = self.schedule.as_ref()?;
        let (airport, kind) = match self.plan.as_ref()?.leg {
            2 => (schedule.departure_airport(), ControllerKind::Startup),
            3 => (schedule.departure_airport(), ControllerKind::Ground),
            4 => (schedule.departure_airport(), ControllerKind::Tower),
            9 => (schedule.arrival_airport(), ControllerKind::Ground),
            _ => return None,
        };
        Some(ControllerRef { airport: airport.to_owned(), kind })
    }

    fn announce(&mut self, env: &mut ExecEnv) {
        let target = self.controller_for_leg();
        if self.controller != target {
            self.sign_off(env.airports);
            if let Some(controller) = &target {
                bevy::log::debug!("{} contacts {controller}", self.id);
            }
            self.controller = target;
        }

        let (Some(controller), Some(plan)) = (&self.controller, &self.plan) else { return };
        let Some(airport) = env.airports.log_get_mut(&controller.airport) else { return };
        let departure_time_s = self.schedule.as_ref().map_or(plan.start_time_s, |s| s.departure_time_s());
        let announcement = Announcement {
            id: self.id,
            route: &plan.route,
            position: plan.current().and_then(|wp| wp.route_index),
            pose: self.pose(),
            radius: self.radius,
            leg: plan.leg,
            runway: plan.runway.as_deref(),
            departure_time_s,
            flight_rules: self.flight_rules,
        };
        airport.announce_position(controller.kind, &announcement);
    }

    fn follow_instructions(&mut self, env: &mut ExecEnv) {
        let Some(controller) = &self.controller else { return };
        let Some(airport) = env.airports.log_get_mut(&controller.airport) else { return };

        let mut atc_env = AtcEnv { now_s: env.now_s, user: env.user, config: env.config, rng: &mut *env.rng };
        airport.update(controller.kind, self.id, self.pose(), &mut atc_env);

        let atc = airport.controller(controller.kind);
        if let Some(code) = atc.transponder_code(self.id)
            && self.transponder.as_deref() != Some(code)
        {
            self.transponder = Some(code.to_owned());
        }
        let Some(instruction) = atc.instruction(self.id) else { return };

        let plan_speed = self.plan.as_ref().and_then(|plan| plan.previous()).map(|wp| wp.speed);
        let active = self.plan.as_ref().is_none_or(|plan| plan.is_active(env.now_s));
        let k = &mut self.kinematics;
        if active {
            if instruction.hold_position {
                k.tgt_speed = Speed::ZERO;
            } else if let Some(speed) = instruction.change_speed {
                k.tgt_speed = speed;
            } else if let Some(speed) = plan_speed {
                k.tgt_speed = speed;
            }
        }
        if let Some(heading) = instruction.change_heading {
            k.tgt_heading = heading;
            k.hdg_lock = false;
        }
        if let Some(altitude) = instruction.change_altitude {
            k.tgt_altitude = altitude;
        }
    }

    fn update_secondary_targets(&mut self) {
        let perf = self.performance;
        let glide = self
            .plan
            .as_ref()
            .and_then(FlightPlan::current)
            .and_then(|wp| Some((wp.cross_at?, wp.position)));
        let k = &mut self.kinematics;

        if k.hdg_lock {
            let error = k.heading.abs_difference(k.tgt_heading);
            let sense = if (k.heading + error).abs_difference(k.tgt_heading) < 1. { 1. } else { -1. };
            k.tgt_roll_deg = error.min(MAX_BANK_DEG) * sense;
        }

        if k.alt_lock && !k.no_roll {
            if !k.use_perf_vs
                && let Some((cross_at, position)) = glide
            {
                let distance = k.position.distance(position);
                if distance > MIN_LEAD_DISTANCE {
                    k.tgt_vs = k.speed.abs() * ((cross_at - k.altitude) / distance);
                }
            } else {
                let capture: Speed<f64> = (k.tgt_altitude - k.altitude) / ALTITUDE_CAPTURE_TIME;
                k.tgt_vs = capture.clamp(-perf.descent_rate, perf.climb_rate);
            }
        }
    }

    fn update_actual_state(&mut self, dt: Duration, env: &mut ExecEnv) {
        self.update_speed(dt);
        self.update_position(dt);
        self.update_heading(dt);
        self.update_roll(dt);
        self.update_altitude(dt, env);
        self.update_pitch();
    }

    fn update_speed(&mut self, dt: Duration) {
        let perf = self.performance;
        let k = &mut self.kinematics;

        if k.spin_deg.abs() > 360. && k.heading.abs_difference(k.tgt_heading) > GROUND_TURN_THRESHOLD_DEG {
            k.tgt_speed *= 0.999;
        }

        let (target, decel) = if k.no_roll {
            (k.ground_target_speed(), perf.decel * GROUND_DECEL_FACTOR)
        } else {
            (k.tgt_speed, perf.decel)
        };
        k.speed = approach_asymmetric(k.speed, target, perf.accel * dt, decel * dt);
    }

    fn update_position(&mut self, dt: Duration) {
        let k = &mut self.kinematics;
        let distance = k.speed * dt;
        k.position = k.position.offset(distance * k.heading);
    }

    fn update_heading(&mut self, dt: Duration) {
        let dt_s = dt.as_secs_f64();
        let k = &mut self.kinematics;
        let error = k.heading.abs_difference(k.tgt_heading);
        if !error.is_finite() {
            return;
        }
        let before = k.heading;

        if k.no_roll {
            let sense = unit_sign(k.tgt_roll_deg);
            if error > GROUND_TURN_THRESHOLD_DEG {
                k.turn_rate_dps += 10. * dt_s * sense;
                if error < k.heading_error_deg {
                    k.turn_rate_dps =
                        k.turn_rate_dps.clamp(-MAX_GROUND_TURN_RATE_DPS, MAX_GROUND_TURN_RATE_DPS);
                }
            } else if k.turn_rate_dps.abs() > error {
                k.turn_rate_dps = error * sense;
            } else {
                k.turn_rate_dps += dt_s * sense;
            }
            let speed_factor = (k.speed.abs() / GROUND_TURN_REFERENCE_SPEED).sqrt();
            k.heading += k.turn_rate_dps * dt_s * speed_factor;
            k.heading_error_deg = error;
            if error < 1. {
                k.heading = k.tgt_heading;
            }
        } else if k.roll_deg.abs() > ROLL_DEAD_BAND_DEG && k.speed.abs().is_positive() {
            let knots = k.speed.into_knots();
            let radius = Length::from_feet(0.088362 * knots.powi(2) / k.roll_deg.abs().to_radians().tan());
            let travelled = k.speed.abs() * dt;
            let alpha = travelled / (radius * TAU) * 360.;
            k.heading += alpha * unit_sign(k.roll_deg);
        }

        k.spin_deg += k.heading - before;
    }

    fn update_roll(&mut self, dt: Duration) {
        let k = &mut self.kinematics;
        k.roll_deg = if k.no_roll {
            0.
        } else {
            step_towards(k.roll_deg, k.tgt_roll_deg, ROLL_RATE_DPS * dt.as_secs_f64(), ROLL_DEAD_BAND_DEG)
        };
    }

    fn update_altitude(&mut self, dt: Duration, env: &mut ExecEnv) {
        let perf = self.performance;
        let config = env.config;

        if self.kinematics.no_roll {
            self.dt_elevation += dt.as_secs_f64();
            if self.dt_elevation >= self.elevation_interval_s {
                self.dt_elevation = 0.;
                self.elevation_interval_s =
                    config.elevation_interval_s + env.rng.random::<f64>() * config.elevation_jitter_s;
                let search_radius = Length::from_meters(config.elevation_search_m);
                let position = self.kinematics.position;
                if let Some(elevation) = env.elevation.ground_elevation(position, search_radius) {
                    self.ground_elevation = Some(elevation);
                }
            }
        }

        let k = &mut self.kinematics;
        if k.no_roll {
            k.tgt_vs = Speed::ZERO;
            if let Some(ground) = self.ground_elevation {
                let error = ground - k.altitude;
                if error.abs() > ELEVATION_SNAP {
                    k.altitude = ground;
                } else {
                    k.altitude += error * 0.1;
                }
            }
        }

        let rate = if k.tgt_vs > k.vertical_speed { perf.climb_rate } else { perf.descent_rate };
        let vertical_accel = rate / VS_RESPONSE_TIME;
        k.vertical_speed = step_towards(k.vertical_speed, k.tgt_vs, vertical_accel * dt, VS_DEAD_BAND);
        if !k.no_roll {
            k.altitude += k.vertical_speed * dt;
        }
    }

    fn update_pitch(&mut self) {
        let k = &mut self.kinematics;
        let fpm = k.vertical_speed.into_fpm();
        k.pitch_deg = fpm * if fpm > 0. { 0.005 } else { 0.002 };
    }
}

/// Distance before a waypoint at which the turn towards the next waypoint starts.
///
/// `heading` is the direction of travel into the waypoint.
/// Without a next waypoint there is no turn to lead.
#[must_use]
pub fn lead_distance(
    speed: Speed<f64>,
    heading: Heading,
    current: GeoPos,
    next: Option<GeoPos>,
) -> Length<f64> {
    let Some(next) = next else { return Length::ZERO };
    let outbound = current.course_to(next);
    if !outbound.is_finite() {
        return Length::ZERO;
    }

    // empirical turn radius in feet for a speed in knots
    let knots = speed.abs().into_knots().max(MIN_LEAD_SPEED_KT);
    let radius_ft = if knots < TAXI_TURN_SPEED_KT { 12. * knots / TAU } else { 0.1911 * knots * knots };
    let travel = if speed.is_negative() { heading.opposite() } else { heading };
    let turn = travel.abs_difference(outbound).min(MAX_LEAD_TURN_DEG);
    Length::from_feet(radius_ft * (turn / 2.).to_radians().tan())
}
