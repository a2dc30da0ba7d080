use crate::traffic::{AircraftId, TrafficList};
use crate::try_log_return;

/// A runway that has been cleared for exactly one aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRunway {
    pub name:    String,
    pub cleared: AircraftId,
}

/// Grants each runway to one aircraft at a time.
#[derive(Debug, Clone, Default)]
pub struct TowerState {
    runways: Vec<ActiveRunway>,
}

impl TowerState {
    #[must_use]
    pub fn active_runways(&self) -> &[ActiveRunway] { &self.runways }

    /// The aircraft currently cleared for `runway`.
    #[must_use]
    pub fn cleared_for(&self, runway: &str) -> Option<AircraftId> {
        self.runways.iter().find(|active| active.name == runway).map(|active| active.cleared)
    }

    /// The first aircraft to request a runway is cleared for it;
    /// every other aircraft requesting the same runway holds position.
    pub(super) fn update(&mut self, traffic: &mut TrafficList, id: AircraftId) {
        let record = try_log_return!(traffic.get_mut(id), expect "{id} has no tower record");
        let Some(runway) = record.runway.as_deref() else {
            bevy::log::trace!("{id} contacts tower without a runway");
            return;
        };

        if let Some(active) = self.runways.iter().find(|active| active.name == runway) {
            record.instruction.hold_position = active.cleared != id;
        } else {
            bevy::log::debug!("{id} cleared for runway {runway}");
            self.runways.push(ActiveRunway { name: runway.to_owned(), cleared: id });
            record.instruction.hold_position = false;
        }
    }

    /// Releases every runway held by `id`.
    pub(super) fn sign_off(&mut self, id: AircraftId) {
        self.runways.retain(|active| {
            let keep = active.cleared != id;
            if !keep {
                bevy::log::debug!("runway {} released by {id}", active.name);
            }
            keep
        });
    }
}
