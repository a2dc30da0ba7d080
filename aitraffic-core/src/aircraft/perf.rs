use math::{Accel, Speed};
use store::PerformanceClass;

/// Fixed performance figures of an aircraft class.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceProfile {
    pub accel:          Accel<f64>,
    pub decel:          Accel<f64>,
    pub climb_rate:     Speed<f64>,
    pub descent_rate:   Speed<f64>,
    pub takeoff_speed:  Speed<f64>,
    pub climb_speed:    Speed<f64>,
    pub cruise_speed:   Speed<f64>,
    pub descent_speed:  Speed<f64>,
    pub landing_speed:  Speed<f64>,
}

impl PerformanceProfile {
    /// Accelerations in kt/s, vertical rates in fpm and speeds in kt.
    const fn new(accel: f64, decel: f64, climb: f64, descent: f64, speeds: [f64; 5]) -> Self {
        let [takeoff, climb_speed, cruise, descent_speed, landing] = speeds;
        Self {
            accel:         Accel::from_knots_per_sec(accel),
            decel:         Accel::from_knots_per_sec(decel),
            climb_rate:    Speed::from_fpm(climb),
            descent_rate:  Speed::from_fpm(descent),
            takeoff_speed: Speed::from_knots(takeoff),
            climb_speed:   Speed::from_knots(climb_speed),
            cruise_speed:  Speed::from_knots(cruise),
            descent_speed: Speed::from_knots(descent_speed),
            landing_speed: Speed::from_knots(landing),
        }
    }

    pub const LIGHT: Self = Self::new(2., 2., 450., 1000., [70., 80., 100., 80., 60.]);
    pub const WW2_FIGHTER: Self = Self::new(4., 2., 3000., 1500., [110., 180., 250., 200., 100.]);
    pub const JET_TRANSPORT: Self = Self::new(5., 2., 3000., 1500., [140., 300., 430., 300., 130.]);
    pub const JET_FIGHTER: Self = Self::new(7., 3., 4000., 2000., [150., 350., 500., 350., 150.]);
    pub const TANKER: Self = Self::JET_TRANSPORT;
    pub const UFO: Self = Self::new(30., 30., 6000., 6000., [150., 300., 430., 300., 130.]);

    #[must_use]
    pub fn for_class(class: PerformanceClass) -> &'static Self {
        match class {
            PerformanceClass::Light => &Self::LIGHT,
            PerformanceClass::Ww2Fighter => &Self::WW2_FIGHTER,
            PerformanceClass::JetTransport => &Self::JET_TRANSPORT,
            PerformanceClass::JetFighter => &Self::JET_FIGHTER,
            PerformanceClass::Tanker => &Self::TANKER,
            PerformanceClass::Ufo => &Self::UFO,
        }
    }
}
