//! AI aircraft: flight plans, schedules and the executor that flies them.

mod elevation;
pub use elevation::{ConstantElevation, ElevationSource};
mod executor;
pub use executor::{Aircraft, ControlInputs, ExecEnv, Kinematics, Telemetry, lead_distance};
mod perf;
pub use perf::PerformanceProfile;
mod plan;
pub use plan::{FlightPlan, Waypoint};
mod schedule;
pub use schedule::{
    END_POINT, FlightSchedule, LAST_LEG, LegPlan, LegStart, PUSH_BACK_POINT, ScheduleError, TrafficSchedule,
};

#[cfg(test)]
mod tests;
