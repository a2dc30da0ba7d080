use math::{GeoPos, Length};

/// Terrain elevation provided by the scenery.
pub trait ElevationSource: Send + Sync {
    /// Ground elevation at `position`,
    /// or `None` if no terrain is loaded within `search_radius`.
    fn ground_elevation(&self, position: GeoPos, search_radius: Length<f64>) -> Option<Length<f64>>;
}

/// Flat terrain at a fixed elevation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantElevation(pub Length<f64>);

impl ElevationSource for ConstantElevation {
    fn ground_elevation(&self, _: GeoPos, _: Length<f64>) -> Option<Length<f64>> { Some(self.0) }
}
