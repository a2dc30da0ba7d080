use std::collections::HashMap;

use math::{GeoPos, Length};

use super::{Announcement, AtcEnv, Controller, ControllerKind};
use crate::ground::TaxiGraph;
use crate::traffic::{AircraftId, Pose};

/// Airports by ident.
pub type Airports = HashMap<String, Airport>;

/// An airport with its ground network and the controllers working it.
#[derive(Debug, Clone)]
pub struct Airport {
    pub ident:        String,
    pub position:     GeoPos,
    pub elevation:    Length<f64>,
    pub graph:        TaxiGraph,
    startup:          Controller,
    ground:           Controller,
    tower:            Controller,
}

impl Airport {
    #[must_use]
    pub fn new(ident: String, position: GeoPos, elevation: Length<f64>, graph: TaxiGraph) -> Self {
        Self {
            ident,
            position,
            elevation,
            graph,
            startup: Controller::new(ControllerKind::Startup),
            ground: Controller::new(ControllerKind::Ground),
            tower: Controller::new(ControllerKind::Tower),
        }
    }

    #[must_use]
    pub fn controller(&self, kind: ControllerKind) -> &Controller {
        match kind {
            ControllerKind::Startup => &self.startup,
            ControllerKind::Ground => &self.ground,
            ControllerKind::Tower => &self.tower,
        }
    }

    pub fn controller_mut(&mut self, kind: ControllerKind) -> &mut Controller {
        match kind {
            ControllerKind::Startup => &mut self.startup,
            ControllerKind::Ground => &mut self.ground,
            ControllerKind::Tower => &mut self.tower,
        }
    }

    pub fn announce_position(&mut self, kind: ControllerKind, announcement: &Announcement) {
        self.controller_mut(kind).announce_position(announcement);
    }

    /// Runs the controller `kind` for one aircraft.
    ///
    /// The ground controller also sees the traffic handled by the tower.
    pub fn update(&mut self, kind: ControllerKind, id: AircraftId, pose: Pose, env: &mut AtcEnv) {
        let Self { graph, startup, ground, tower, .. } = self;
        match kind {
            ControllerKind::Startup => startup.update(id, pose, graph, None, env),
            ControllerKind::Ground => ground.update(id, pose, graph, Some(tower.traffic()), env),
            ControllerKind::Tower => tower.update(id, pose, graph, None, env),
        }
    }

    pub fn sign_off(&mut self, kind: ControllerKind, id: AircraftId) {
        self.controller_mut(kind).sign_off(id);
    }

    /// Removes `id` from every controller that still knows it, releasing anything it held.
    pub fn sign_off_all(&mut self, id: AircraftId) {
        for controller in [&mut self.startup, &mut self.ground, &mut self.tower] {
            if controller.traffic().contains(id) {
                controller.sign_off(id);
            }
        }
    }
}
