//! AI ground traffic for a flight simulator:
//! taxi graphs, airport controllers and the flight plan executor that flies AI aircraft.

pub mod aircraft;
pub mod atc;
pub mod config;
pub mod ground;
pub mod load;
pub mod sim;
pub mod time;
pub mod traffic;
pub mod try_log;
pub use try_log::{MapExt, TryLog};
