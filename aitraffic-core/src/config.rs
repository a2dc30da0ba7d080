use bevy::ecs::resource::Resource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// A merging aircraft farther than this from the shared node does not cause a hold, in meters.
    pub hold_distance_m:          f64,
    /// Half angle of the cone ahead of an aircraft in which neighbours are considered
    /// for speed negotiation, in degrees.
    pub speed_cone_deg:           f64,
    /// Multiplier on the sum of two aircraft radii giving their minimum separation.
    pub safety_factor:            f64,
    /// Aircraft farther than this from the user while waiting for activation are removed, in nm.
    pub visibility_nm:            f64,
    /// Minimum accumulated time between two flight plan evaluations, in seconds.
    pub evaluation_interval_s:    f64,
    /// Base interval between two terrain elevation queries, in seconds.
    pub elevation_interval_s:     f64,
    /// Maximum random extension of the elevation query interval, in seconds.
    pub elevation_jitter_s:       f64,
    /// Search radius for terrain elevation queries, in meters.
    pub elevation_search_m:       f64,
    /// Offsets from the scheduled departure time after which each startup transmission may occur,
    /// in seconds.
    pub startup_offsets_s:        [f64; 4],
    /// Minimum silence on the startup frequency after each transmission, in seconds.
    pub channel_min_interval_s:   f64,
    /// Mean of the exponential extension of the channel silence, in seconds.
    pub channel_jitter_mean_s:    f64,
    /// Cap on the exponential extension of the channel silence, in seconds.
    pub channel_jitter_max_s:     f64,
    /// Time the plan is suspended after passing the pushback point, in seconds.
    pub push_back_hold_s:         f64,
    /// Minimum time an aircraft stays parked after arrival, in seconds.
    pub min_turnaround_s:         f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hold_distance_m:        200.,
            speed_cone_deg:         60.,
            safety_factor:          1.1,
            visibility_nm:          150.,
            evaluation_interval_s:  0.1,
            elevation_interval_s:   3.,
            elevation_jitter_s:     1.,
            elevation_search_m:     100.,
            startup_offsets_s:      [0., 60., 80., 100.],
            channel_min_interval_s: 3.,
            channel_jitter_mean_s:  5.,
            channel_jitter_max_s:   15.,
            push_back_hold_s:       120.,
            min_turnaround_s:       1200.,
        }
    }
}
