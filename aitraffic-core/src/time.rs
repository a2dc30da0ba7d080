use std::time::Duration;

use bevy::ecs::resource::Resource;

/// Converts the virtual simulation clock into the absolute time used by schedules.
///
/// All schedule times are seconds since an arbitrary epoch shared with the traffic schedule.
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct SimClock {
    /// Absolute time at which the virtual clock started.
    pub base_s: f64,
    /// Accumulated time warp on top of the elapsed virtual time.
    pub warp_s: f64,
}

impl SimClock {
    #[must_use]
    pub fn new(base_s: f64) -> Self { Self { base_s, warp_s: 0. } }

    /// Absolute time after the virtual clock has run for `elapsed`.
    #[must_use]
    pub fn now(&self, elapsed: Duration) -> f64 { self.base_s + self.warp_s + elapsed.as_secs_f64() }

    /// Skips the clock forward without simulating the skipped interval.
    pub fn warp(&mut self, by_s: f64) { self.warp_s += by_s; }
}
