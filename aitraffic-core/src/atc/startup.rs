use rand::Rng;
use store::FlightRules;

use super::AtcEnv;
use crate::config::Config;
use crate::traffic::{AircraftId, TrafficList};
use crate::try_log_return;

/// Progress of the engine start dialogue between an aircraft and the startup controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
pub enum StartupPhase {
    /// The aircraft is parked and has not called yet.
    Announce,
    /// The aircraft has requested engine start.
    Request,
    /// The controller has given permission to start.
    Permit,
    /// The aircraft has read back the clearance and its transponder code.
    Acknowledge,
    /// The aircraft is released to push back.
    Release,
}

impl StartupPhase {
    /// The phase after this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Announce => Some(Self::Request),
            Self::Request => Some(Self::Permit),
            Self::Permit => Some(Self::Acknowledge),
            Self::Acknowledge => Some(Self::Release),
            Self::Release => None,
        }
    }

    /// Seconds after the scheduled departure before the transmission leaving this phase may occur.
    fn offset_s(self, config: &Config) -> f64 {
        let [announce, request, permit, acknowledge] = config.startup_offsets_s;
        match self {
            Self::Announce => announce,
            Self::Request => request,
            Self::Permit => permit,
            Self::Acknowledge | Self::Release => acknowledge,
        }
    }
}

/// The startup frequency, shared by all aircraft at the airport.
///
/// Only one transmission happens at a time;
/// after each transmission the frequency stays busy for a randomized period.
#[derive(Debug, Clone)]
pub struct StartupState {
    available:           bool,
    last_transmission_s: f64,
    silence_s:           f64,
}

impl Default for StartupState {
    fn default() -> Self {
        Self { available: true, last_transmission_s: f64::NEG_INFINITY, silence_s: 0. }
    }
}

impl StartupState {
    #[must_use]
    pub fn is_available(&self) -> bool { self.available }

    /// Advances the dialogue of `id` by at most one phase.
    pub(super) fn update(&mut self, traffic: &mut TrafficList, id: AircraftId, env: &mut AtcEnv) {
        if !self.available && env.now_s - self.last_transmission_s >= self.silence_s {
            self.available = true;
        }

        let record = try_log_return!(traffic.get_mut(id), expect "{id} has no startup record");
        let Some(next) = record.phase.next() else { return };
        let gate_s = record.departure_time_s + record.phase.offset_s(env.config);
        if env.now_s <= gate_s || !self.available {
            return;
        }

        self.transmit(env);
        if record.phase == StartupPhase::Permit {
            let code = transponder_code(record.flight_rules, &mut *env.rng);
            bevy::log::debug!("{id} squawks {code}");
            record.transponder = Some(code);
        }
        if next == StartupPhase::Release {
            record.instruction.hold_position = false;
        }
        bevy::log::debug!("{id} startup {} -> {next}", record.phase);
        record.phase = next;
    }

    fn transmit(&mut self, env: &mut AtcEnv) {
        let config = env.config;
        let uniform: f64 = env.rng.random();
        let jitter_s = -config.channel_jitter_mean_s * (1. - uniform).ln();
        self.available = false;
        self.last_transmission_s = env.now_s;
        self.silence_s = config.channel_min_interval_s + jitter_s.min(config.channel_jitter_max_s);
    }
}

/// VFR traffic squawks 1200; other traffic receives four random octal digits.
fn transponder_code(rules: FlightRules, rng: &mut impl Rng) -> String {
    match rules {
        FlightRules::Vfr => String::from("1200"),
        FlightRules::Ifr => (0..4).map(|_| char::from(b'0' + rng.random_range(0..8u8))).collect(),
    }
}
