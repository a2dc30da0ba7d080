//! Drives AI aircraft from the bevy update loop.

use bevy::app::{self, App, Plugin};
use bevy::ecs::message::{Message, MessageReader, MessageWriter};
use bevy::ecs::resource::Resource;
use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::ecs::system::{Res, ResMut};
use bevy::prelude::SystemSet;
use bevy::time::{self, Time};
use itertools::Itertools;
use math::Length;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use strum::IntoEnumIterator;

use crate::MapExt;
use crate::aircraft::{Aircraft, ConstantElevation, ElevationSource, ExecEnv, Telemetry};
use crate::atc::Airports;
use crate::config::Config;
use crate::ground::SegmentId;
use crate::time::SimClock;
use crate::traffic::{AircraftId, UserAircraft};


pub struct Plug;

impl Plugin for Plug {
    fn build(&self, app: &mut App) {
        for set in SystemSets::iter() {
            app.configure_sets(app::Update, set.in_set(AllSystemSets));
        }

        for (before, after) in SystemSets::iter().tuple_windows() {
            app.configure_sets(app::Update, before.before(after));
        }

        app.init_resource::<Config>();
        app.init_resource::<SimClock>();
        app.init_resource::<Simulation>();
        app.init_resource::<SimRng>();
        app.init_resource::<Elevation>();

        app.add_message::<LegChangedMessage>();
        app.add_message::<AircraftRemovedMessage>();
        app.add_message::<SetSegmentActiveMessage>();

        app.add_systems(app::Update, remove_dead_aircraft_system.in_set(SystemSets::Cleanup));
        app.add_systems(app::Update, set_segment_active_system.in_set(SystemSets::PrepareEnviron));
        app.add_systems(app::Update, execute_aircraft_system.in_set(SystemSets::Execute));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemSet, strum::EnumIter)]
pub enum SystemSets {
    /// Removes aircraft that ended their flight plan in the previous tick.
    Cleanup,
    /// Applies external changes to airports before aircraft read them.
    PrepareEnviron,
    /// Runs flight plans, controllers and the kinematic model of every aircraft.
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemSet)]
pub struct AllSystemSets;

/// All airports and AI aircraft of the running simulation.
#[derive(Resource, Default)]
pub struct Simulation {
    pub airports: Airports,
    /// The user's own aircraft, which AI traffic yields to.
    pub user:     Option<UserAircraft>,
    aircraft:     Vec<Aircraft>,
    next_id:      u32,
}

impl Simulation {
    #[must_use]
    pub fn new(airports: Airports) -> Self { Self { airports, ..Self::default() } }

    /// Reserves a fresh aircraft id. Ids start at 1 and are never reused.
    pub fn allocate_id(&mut self) -> AircraftId {
        self.next_id += 1;
        AircraftId(self.next_id)
    }

    /// Adds an aircraft built with an id from [`Self::allocate_id`].
    ///
    /// Aircraft are executed in insertion order.
    pub fn insert(&mut self, aircraft: Aircraft) { self.aircraft.push(aircraft); }

    #[must_use]
    pub fn aircraft(&self) -> &[Aircraft] { &self.aircraft }

    #[must_use]
    pub fn find(&self, id: AircraftId) -> Option<&Aircraft> { self.aircraft.iter().find(|a| a.id() == id) }

    pub fn find_mut(&mut self, id: AircraftId) -> Option<&mut Aircraft> {
        self.aircraft.iter_mut().find(|a| a.id() == id)
    }

    /// Published state of every live aircraft.
    pub fn telemetry(&self) -> impl Iterator<Item = (AircraftId, Telemetry)> + '_ {
        self.aircraft.iter().filter(|a| !a.is_dead()).map(|a| (a.id(), a.telemetry()))
    }
}

/// Random source shared by controllers and executors.
#[derive(Resource)]
pub struct SimRng(pub SmallRng);

impl Default for SimRng {
    fn default() -> Self { Self(SmallRng::seed_from_u64(0)) }
}

/// Terrain elevation used for aircraft on ground.
#[derive(Resource)]
pub struct Elevation(pub Box<dyn ElevationSource>);

impl Default for Elevation {
    fn default() -> Self { Self(Box::new(ConstantElevation(Length::ZERO))) }
}

/// An aircraft started a new leg of its schedule.
#[derive(Debug, Clone, Copy, PartialEq, Message)]
pub struct LegChangedMessage {
    pub aircraft: AircraftId,
    pub leg:      u32,
}

/// An aircraft was removed from the simulation and signed off from every controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Message)]
pub struct AircraftRemovedMessage(pub AircraftId);

/// Opens or closes a taxi segment for routing.
#[derive(Debug, Clone, PartialEq, Message)]
pub struct SetSegmentActiveMessage {
    pub airport: String,
    pub segment: SegmentId,
    pub active:  bool,
}

fn remove_dead_aircraft_system(
    mut sim: ResMut<Simulation>,
    mut removed_writer: MessageWriter<AircraftRemovedMessage>,
) {
    let Simulation { airports, aircraft, .. } = &mut *sim;
    aircraft.retain(|aircraft| {
        if !aircraft.is_dead() {
            return true;
        }

        for airport in airports.values_mut() {
            airport.sign_off_all(aircraft.id());
        }
        bevy::log::debug!("removed {} ({})", aircraft.id(), aircraft.callsign);
        removed_writer.write(AircraftRemovedMessage(aircraft.id()));
        false
    });
}

fn set_segment_active_system(
    mut reader: MessageReader<SetSegmentActiveMessage>,
    mut sim: ResMut<Simulation>,
) {
    for message in reader.read() {
        let Some(airport) = sim.airports.log_get_mut(&message.airport) else { continue };
        if let Err(err) = airport.graph.set_segment_active(message.segment, message.active) {
            bevy::log::warn!("cannot change segment at {}: {err}", message.airport);
        }
    }
}

fn execute_aircraft_system(
    time: Res<Time<time::Virtual>>,
    clock: Res<SimClock>,
    config: Res<Config>,
    elevation: Res<Elevation>,
    mut rng: ResMut<SimRng>,
    mut sim: ResMut<Simulation>,
    mut leg_writer: MessageWriter<LegChangedMessage>,
) {
    if time.is_paused() {
        return;
    }

    let dt = time.delta();
    let now_s = clock.now(time.elapsed());
    let Simulation { airports, user, aircraft, .. } = &mut *sim;
    let mut leg_changes = Vec::new();

    for aircraft in aircraft {
        let mut env = ExecEnv {
            now_s,
            airports: &mut *airports,
            user: user.as_ref(),
            config: &config,
            rng: &mut rng.0,
            elevation: &*elevation.0,
            leg_changes: &mut leg_changes,
        };
        aircraft.run(dt, &mut env);
    }

    leg_writer.write_batch(leg_changes);
}
