//! Per-aircraft traffic records and the conflict predicates over them.

use bevy::ecs::resource::Resource;
use math::{GeoPos, Heading, Length, Speed};
use smallvec::SmallVec;
use store::FlightRules;

use crate::atc::StartupPhase;
use crate::ground::{NodeId, SegmentId, TaxiGraph};

mod negotiate;
pub use negotiate::NegotiationContext;


/// Identifies an aircraft in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("aircraft {_0}")]
pub struct AircraftId(pub u32);

impl AircraftId {
    /// The aircraft flown by the user, which never has a traffic record.
    pub const USER: Self = Self(0);
}

/// The aircraft flown by the user.
///
/// AI traffic slows down behind it and is culled by distance to it.
#[derive(Debug, Clone, Resource)]
pub struct UserAircraft {
    pub position: GeoPos,
    pub heading:  Heading,
    pub speed:    Speed<f64>,
    pub radius:   Length<f64>,
}

/// Horizontal state of an aircraft as reported to its controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: GeoPos,
    pub heading:  Heading,
    pub speed:    Speed<f64>,
    pub altitude: Length<f64>,
}

/// An instruction issued by a controller.
///
/// All fields are independent.
/// `hold_position` takes precedence over any speed change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtcInstruction {
    pub hold_pattern:          bool,
    pub hold_position:         bool,
    pub change_speed:          Option<Speed<f64>>,
    pub change_heading:        Option<Heading>,
    pub change_altitude:       Option<Length<f64>>,
    pub resolve_circular_wait: bool,
}

impl AtcInstruction {
    /// Whether any part of the instruction is in effect.
    #[must_use]
    pub fn has_instruction(&self) -> bool {
        self.hold_pattern
            || self.hold_position
            || self.change_speed.is_some()
            || self.change_heading.is_some()
            || self.change_altitude.is_some()
            || self.resolve_circular_wait
    }
}

/// The view of an aircraft held by a controller.
#[derive(Debug, Clone)]
pub struct TrafficRecord {
    pub id:               AircraftId,
    current_pos:          Option<SegmentId>,
    intentions:           Vec<SegmentId>,
    pub leg:              u32,
    pub phase:            StartupPhase,
    pub pose:             Pose,
    pub radius:           Length<f64>,
    waits_for:            Option<AircraftId>,
    /// The current hold is for opposing traffic and must not be released to break a circular wait.
    holds_for_opposing:   bool,
    pub instruction:      AtcInstruction,
    pub runway:           Option<String>,
    pub departure_time_s: f64,
    pub flight_rules:     FlightRules,
    /// Neighbours over which this aircraft has been granted right-of-way at a merge.
    right_of_way:         SmallVec<[AircraftId; 2]>,
    pub transponder:      Option<String>,
}

impl TrafficRecord {
    #[must_use]
    pub fn new(id: AircraftId, pose: Pose, radius: Length<f64>) -> Self {
        Self {
            id,
            current_pos: None,
            intentions: Vec::new(),
            leg: 0,
            phase: StartupPhase::Announce,
            pose,
            radius,
            waits_for: None,
            holds_for_opposing: false,
            instruction: AtcInstruction::default(),
            runway: None,
            departure_time_s: 0.,
            flight_rules: FlightRules::default(),
            right_of_way: SmallVec::new(),
            transponder: None,
        }
    }

    #[must_use]
    pub fn current_pos(&self) -> Option<SegmentId> { self.current_pos }

    #[must_use]
    pub fn intentions(&self) -> &[SegmentId] { &self.intentions }

    /// The aircraft this one currently yields to.
    #[must_use]
    pub fn waits_for(&self) -> Option<AircraftId> { self.waits_for }

    /// Records a yield relationship, leaving the record untouched if it is unchanged.
    pub(crate) fn set_waits_for(&mut self, other: Option<AircraftId>) {
        if self.waits_for != other {
            bevy::log::trace!("{} now waits for {other:?}", self.id);
            self.waits_for = other;
        }
    }

    /// Whether the aircraft holds because of traffic coming the other way.
    #[must_use]
    pub fn holds_for_opposing(&self) -> bool { self.holds_for_opposing }

    #[must_use]
    pub fn has_right_of_way_over(&self, other: AircraftId) -> bool { self.right_of_way.contains(&other) }

    /// Updates the current route position and the remaining route positions.
    ///
    /// The head of the intentions is consumed when the aircraft reaches it.
    /// Otherwise the intentions are rebuilt from the positions of `route` after `pos`,
    /// or from all positions of `route` other than `pos` if `pos` is not on the route.
    /// Repeating a call with the same `pos` leaves the intentions unchanged.
    pub fn set_position_and_intentions(&mut self, pos: SegmentId, route: &[SegmentId]) {
        if self.current_pos == Some(pos) {
            return;
        }
        self.current_pos = Some(pos);

        if let Some(&head) = self.intentions.first() {
            if head == pos {
                self.intentions.remove(0);
                return;
            }
            bevy::log::warn!(
                "{} reached {pos} but expected {head}, rebuilding intentions",
                self.id
            );
        }

        let remaining = match route.iter().position(|&step| step == pos) {
            Some(index) => &route[index + 1..],
            None => route,
        };
        self.intentions = remaining.iter().copied().filter(|&step| step != pos).collect();
    }

    /// Whether both aircraft occupy the same route position,
    /// or `other` occupies a position that `self` intends to pass.
    #[must_use]
    pub fn check_position_and_intentions(&self, other: &TrafficRecord) -> bool {
        let Some(other_pos) = other.current_pos else { return false };
        self.current_pos == Some(other_pos) || self.intentions.contains(&other_pos)
    }

    /// The node this aircraft is currently heading to.
    #[must_use]
    pub fn target_node(&self, graph: &TaxiGraph) -> Option<NodeId> {
        graph.target_of(self.current_pos?)
    }

    fn intention_targets<'a>(&'a self, graph: &'a TaxiGraph) -> impl Iterator<Item = NodeId> + 'a {
        self.intentions.iter().filter_map(|&pos| graph.target_of(pos))
    }

    /// Whether the aircraft is routed through `node`, now or later.
    #[must_use]
    pub fn is_routed_through(&self, node: NodeId, graph: &TaxiGraph) -> bool {
        self.target_node(graph) == Some(node) || self.intention_targets(graph).any(|target| target == node)
    }

    /// Finds a node at which the routes of the two aircraft meet.
    ///
    /// Aircraft following each other on the same route never cross.
    /// Only the first meeting node found is returned,
    /// trying the current targets of both aircraft,
    /// then the intentions of `self` against the target of `other`,
    /// then the intentions of `other` against the target of `self`,
    /// then every pair of intended targets.
    #[must_use]
    pub fn crosses(&self, other: &TrafficRecord, graph: &TaxiGraph) -> Option<NodeId> {
        if self.check_position_and_intentions(other) || other.check_position_and_intentions(self) {
            return None;
        }

        let own_target = self.target_node(graph);
        let other_target = other.target_node(graph);
        if let Some(target) = own_target
            && own_target == other_target
        {
            return Some(target);
        }

        if let Some(other_target) = other_target
            && let Some(node) = self.intention_targets(graph).find(|&node| node == other_target)
        {
            return Some(node);
        }

        if let Some(own_target) = own_target
            && let Some(node) = other.intention_targets(graph).find(|&node| node == own_target)
        {
            return Some(node);
        }

        self.intention_targets(graph)
            .find(|&own| other.intention_targets(graph).any(|theirs| theirs == own))
    }

    /// Whether the two aircraft would meet head-on around `node`.
    ///
    /// This is the case if their current segments are reverses of each other,
    /// or if a segment that `self` intends to take from `node`
    /// is the reverse of the current or an intended segment of `other`.
    #[must_use]
    pub fn is_opposing(&self, other: &TrafficRecord, graph: &TaxiGraph, node: NodeId) -> bool {
        if let (Some(own), Some(theirs)) = (self.current_pos, other.current_pos)
            && graph.find_segment(own).and_then(|segment| segment.opposite) == Some(theirs)
        {
            return true;
        }

        self.intentions.iter().filter_map(|&pos| graph.find_segment(pos)).any(|segment| {
            segment.start == node
                && segment.opposite.is_some_and(|opposite| {
                    other.current_pos == Some(opposite) || other.intentions.contains(&opposite)
                })
        })
    }

    /// Whether `self` is heading to the node that `other` is heading to now or later.
    #[must_use]
    pub fn on_route(&self, other: &TrafficRecord, graph: &TaxiGraph) -> bool {
        let Some(target) = self.target_node(graph) else { return false };
        other.is_routed_through(target, graph)
    }
}

/// The ordered list of aircraft handled by a controller.
///
/// Records keep the order in which aircraft first announced themselves.
#[derive(Debug, Clone, Default)]
pub struct TrafficList {
    records: Vec<TrafficRecord>,
}

impl TrafficList {
    #[must_use]
    pub fn len(&self) -> usize { self.records.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &TrafficRecord> { self.records.iter() }

    #[must_use]
    pub fn contains(&self, id: AircraftId) -> bool { self.index_of(id).is_some() }

    fn index_of(&self, id: AircraftId) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    #[must_use]
    pub fn get(&self, id: AircraftId) -> Option<&TrafficRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn get_mut(&mut self, id: AircraftId) -> Option<&mut TrafficRecord> {
        self.records.iter_mut().find(|record| record.id == id)
    }

    /// Like [`get`](Self::get), but logs a missing record as an integrity violation.
    #[must_use]
    pub fn log_get(&self, id: AircraftId) -> Option<&TrafficRecord> {
        let record = self.get(id);
        if record.is_none() {
            bevy::log::error!("{id} has no traffic record");
        }
        record
    }

    /// Like [`get_mut`](Self::get_mut), but logs a missing record as an integrity violation.
    pub fn log_get_mut(&mut self, id: AircraftId) -> Option<&mut TrafficRecord> {
        let record = self.get_mut(id);
        if record.is_none() {
            bevy::log::error!("{id} has no traffic record");
        }
        record
    }

    /// Returns the existing record of `id`, or appends `record` if there is none.
    pub fn get_or_insert_with(
        &mut self,
        id: AircraftId,
        record: impl FnOnce() -> TrafficRecord,
    ) -> &mut TrafficRecord {
        let index = if let Some(index) = self.index_of(id) {
            index
        } else {
            self.records.push(record());
            self.records.len() - 1
        };
        &mut self.records[index]
    }

    /// Removes the record of `id`, forgetting any right-of-way other aircraft held over it.
    pub fn remove(&mut self, id: AircraftId) -> Option<TrafficRecord> {
        let index = self.index_of(id)?;
        let record = self.records.remove(index);
        for other in &mut self.records {
            other.right_of_way.retain(|&mut granted| granted != id);
        }
        Some(record)
    }
}
