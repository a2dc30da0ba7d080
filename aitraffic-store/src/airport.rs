use math::GeoPos;
use serde::{Deserialize, Serialize};

/// An airport with its ground movement network.
#[derive(Clone, Serialize, Deserialize)]
pub struct Airport {
    /// ICAO identifier of the airport.
    pub ident:        String,
    /// Reference point of the airport.
    pub position:     GeoPos,
    /// Field elevation in feet.
    #[serde(default)]
    pub elevation_ft: f64,
    /// Taxi nodes of the ground network.
    pub nodes:        Vec<TaxiNode>,
    /// Directed taxi segments joining the nodes.
    pub segments:     Vec<TaxiSegment>,
}

/// A point in the ground network, such as a parking position,
/// a taxiway intersection or a runway holding point.
#[derive(Clone, Serialize, Deserialize)]
pub struct TaxiNode {
    /// Identifier of the node, unique within the airport.
    pub id:         u32,
    /// Position of the node.
    pub position:   GeoPos,
    /// Whether the node lies on a runway.
    #[serde(default)]
    pub on_runway:  bool,
    /// Holding point semantics of the node.
    #[serde(default)]
    pub hold_point: HoldPoint,
}

/// Holding point semantics of a taxi node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HoldPoint {
    /// Not a holding point.
    #[default]
    None,
    /// A regular holding point, e.g. before entering a runway.
    Normal,
    /// The end of a pushback path, where the aircraft stops and starts taxiing forward.
    PushBack,
}

/// A directed taxi segment.
#[derive(Clone, Serialize, Deserialize)]
pub struct TaxiSegment {
    /// Identifier of the start node.
    pub start:     u32,
    /// Identifier of the end node.
    pub end:       u32,
    /// Whether the segment is part of the pushback network.
    #[serde(default)]
    pub push_back: bool,
    /// Whether the reverse segment should also be created.
    #[serde(default)]
    pub two_way:   bool,
    /// Whether the segment is open for taxiing.
    #[serde(default = "default_true")]
    pub active:    bool,
}

fn default_true() -> bool { true }
