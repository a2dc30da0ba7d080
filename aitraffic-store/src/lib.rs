//! Schema for airport and traffic files.
//!
//! These structures are handed to the core already parsed;
//! `aitraffic::load` validates them and builds the runtime graph and plans.

#![forbid(missing_docs)]

use serde::{Deserialize, Serialize};

mod airport;
pub use airport::*;

mod plan;
pub use plan::*;

mod aircraft;
pub use aircraft::*;


/// Root structure of a traffic scenario.
#[derive(Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Airports with ground networks available to the traffic.
    pub airports: Vec<Airport>,
    /// AI aircraft present at the start of the scenario.
    #[serde(default)]
    pub aircraft: Vec<Aircraft>,
}
