//! Controllers issuing instructions to AI traffic at an airport.

use math::Length;
use rand::rngs::SmallRng;
use store::FlightRules;

use crate::config::Config;
use crate::ground::{SegmentId, TaxiGraph};
use crate::traffic::{
    AircraftId, AtcInstruction, NegotiationContext, Pose, TrafficList, TrafficRecord, UserAircraft,
};
use crate::try_log_return;

mod airport;
pub use airport::{Airport, Airports};
mod startup;
pub use startup::{StartupPhase, StartupState};
mod tower;
pub use tower::{ActiveRunway, TowerState};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ControllerKind {
    /// Engine start and pushback clearance.
    Startup,
    /// Taxi between parking and the runway.
    Ground,
    /// Runway occupancy.
    Tower,
}

/// Addresses a controller of a specific airport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{airport} {kind}")]
pub struct ControllerRef {
    pub airport: String,
    pub kind:    ControllerKind,
}

/// The shared environment of a controller update.
pub struct AtcEnv<'a> {
    /// Absolute simulation time in seconds.
    pub now_s:  f64,
    pub user:   Option<&'a UserAircraft>,
    pub config: &'a Config,
    pub rng:    &'a mut SmallRng,
}

/// What an aircraft tells a controller when it contacts it or passes a waypoint.
#[derive(Debug, Clone)]
pub struct Announcement<'a> {
    pub id:               AircraftId,
    /// Route positions of the current taxi route.
    pub route:            &'a [SegmentId],
    /// Route position of the waypoint the aircraft is heading to, if it is on the taxi route.
    pub position:         Option<SegmentId>,
    pub pose:             Pose,
    pub radius:           Length<f64>,
    pub leg:              u32,
    pub runway:           Option<&'a str>,
    pub departure_time_s: f64,
    pub flight_rules:     FlightRules,
}

#[derive(Debug, Clone)]
pub enum ControllerState {
    Tower(TowerState),
    Startup(StartupState),
    Ground,
}

/// A controller together with the traffic it currently handles.
#[derive(Debug, Clone)]
pub struct Controller {
    traffic: TrafficList,
    state:   ControllerState,
}

impl Controller {
    #[must_use]
    pub fn new(kind: ControllerKind) -> Self {
        let state = match kind {
            ControllerKind::Startup => ControllerState::Startup(StartupState::default()),
            ControllerKind::Ground => ControllerState::Ground,
            ControllerKind::Tower => ControllerState::Tower(TowerState::default()),
        };
        Self { traffic: TrafficList::default(), state }
    }

    #[must_use]
    pub fn kind(&self) -> ControllerKind {
        match self.state {
            ControllerState::Tower(_) => ControllerKind::Tower,
            ControllerState::Startup(_) => ControllerKind::Startup,
            ControllerState::Ground => ControllerKind::Ground,
        }
    }

    #[must_use]
    pub fn traffic(&self) -> &TrafficList { &self.traffic }

    #[must_use]
    pub fn state(&self) -> &ControllerState { &self.state }

    /// Registers the aircraft if it is new, then updates its record from the announcement.
    pub fn announce_position(&mut self, announcement: &Announcement) {
        let kind = self.kind();
        let Announcement { id, pose, radius, .. } = *announcement;

        let record = self.traffic.get_or_insert_with(id, || {
            bevy::log::debug!("{id} contacts {kind}");
            let mut record = TrafficRecord::new(id, pose, radius);
            record.instruction.hold_position = kind == ControllerKind::Startup;
            record
        });

        record.pose = pose;
        record.radius = radius;
        record.leg = announcement.leg;
        record.runway = announcement.runway.map(String::from);
        record.departure_time_s = announcement.departure_time_s;
        record.flight_rules = announcement.flight_rules;
        if let Some(pos) = announcement.position {
            record.set_position_and_intentions(pos, announcement.route);
        }
    }

    /// Runs the policy of this controller for one aircraft.
    ///
    /// An aircraft without a record is logged and ignored.
    pub fn update(
        &mut self,
        id: AircraftId,
        pose: Pose,
        graph: &TaxiGraph,
        tower: Option<&TrafficList>,
        env: &mut AtcEnv,
    ) {
        let kind = self.kind();
        let record = try_log_return!(
            self.traffic.get_mut(id),
            expect "{id} updates {kind} without a traffic record"
        );
        record.pose = pose;

        match &mut self.state {
            ControllerState::Tower(tower) => tower.update(&mut self.traffic, id),
            ControllerState::Startup(startup) => startup.update(&mut self.traffic, id, env),
            ControllerState::Ground => {
                let ctx = NegotiationContext { graph, tower, user: env.user, config: env.config };
                self.traffic.check_speed_adjustment(id, &ctx);
                self.traffic.check_hold_position(id, &ctx);
                self.traffic.check_for_circular_waits(id);
            }
        }
    }

    #[must_use]
    pub fn has_instruction(&self, id: AircraftId) -> bool {
        self.instruction(id).is_some_and(AtcInstruction::has_instruction)
    }

    #[must_use]
    pub fn instruction(&self, id: AircraftId) -> Option<&AtcInstruction> {
        self.traffic.get(id).map(|record| &record.instruction)
    }

    /// Lets the host override the instruction given to `id`.
    pub fn instruction_mut(&mut self, id: AircraftId) -> Option<&mut AtcInstruction> {
        self.traffic.get_mut(id).map(|record| &mut record.instruction)
    }

    /// The transponder code issued to `id` during engine start.
    #[must_use]
    pub fn transponder_code(&self, id: AircraftId) -> Option<&str> {
        self.traffic.get(id)?.transponder.as_deref()
    }

    /// Removes the aircraft and releases anything it held.
    pub fn sign_off(&mut self, id: AircraftId) {
        let kind = self.kind();
        if self.traffic.remove(id).is_some() {
            bevy::log::debug!("{id} signs off from {kind}");
        } else {
            bevy::log::error!("{id} signs off from {kind} without a traffic record");
        }

        if let ControllerState::Tower(tower) = &mut self.state {
            tower.sign_off(id);
        }
    }
}
