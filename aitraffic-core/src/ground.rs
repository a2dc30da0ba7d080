//! Taxiway graph of an airport.

use std::collections::HashMap;

use itertools::Itertools;
use math::{GeoPos, Heading, Length};
use ordered_float::OrderedFloat;
use smallvec::SmallVec;
pub use store::HoldPoint;

mod route;
pub use route::{RouteError, RouteSearch, TaxiRoute};


/// Identifies a taxi node, as chosen by the airport data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("node {_0}")]
pub struct NodeId(pub u32);

/// Identifies a taxi segment, assigned in insertion order when the graph is built.
///
/// A segment id also identifies the route position of an aircraft
/// that has reached the end node of the segment through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("segment {_0}")]
pub struct SegmentId(pub u32);

impl SegmentId {
    fn index(self) -> usize { self.0 as usize }
}

#[derive(Debug, Clone)]
pub struct TaxiNode {
    pub id:         NodeId,
    pub position:   GeoPos,
    pub on_runway:  bool,
    pub hold_point: HoldPoint,
    segments:       SmallVec<[SegmentId; 4]>,
}

impl TaxiNode {
    /// Outgoing segments of the node in insertion order.
    #[must_use]
    pub fn segments(&self) -> &[SegmentId] { &self.segments }
}

#[derive(Debug, Clone)]
pub struct TaxiSegment {
    pub id:        SegmentId,
    pub start:     NodeId,
    pub end:       NodeId,
    /// Initial course from the start node to the end node.
    pub course:    Heading,
    pub length:    Length<f64>,
    /// The segment joining the same nodes in the reverse direction, if any.
    pub opposite:  Option<SegmentId>,
    pub active:    bool,
    pub push_back: bool,
}

/// Parameters of a node to be added to a [`TaxiGraphBuilder`].
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub id:         NodeId,
    pub position:   GeoPos,
    pub on_runway:  bool,
    pub hold_point: HoldPoint,
}

impl NodeSpec {
    #[must_use]
    pub fn new(id: u32, position: GeoPos) -> Self {
        Self { id: NodeId(id), position, on_runway: false, hold_point: HoldPoint::None }
    }

    #[must_use]
    pub fn on_runway(mut self) -> Self {
        self.on_runway = true;
        self
    }

    #[must_use]
    pub fn hold_point(mut self, hold_point: HoldPoint) -> Self {
        self.hold_point = hold_point;
        self
    }
}

/// Parameters of a segment to be added to a [`TaxiGraphBuilder`].
#[derive(Debug, Clone)]
pub struct SegmentSpec {
    pub start:     NodeId,
    pub end:       NodeId,
    pub active:    bool,
    pub push_back: bool,
}

impl SegmentSpec {
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start: NodeId(start), end: NodeId(end), active: true, push_back: false }
    }

    #[must_use]
    pub fn push_back(mut self) -> Self {
        self.push_back = true;
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("{0} is defined more than once")]
    DuplicateNode(NodeId),
    #[error("segment #{index} references unknown {node}")]
    UnknownNode { index: usize, node: NodeId },
    #[error("segment #{index} starts and ends at {node}")]
    SelfLoop { index: usize, node: NodeId },
    #[error("{0} does not exist")]
    UnknownSegment(SegmentId),
    #[error("too many segments")]
    TooManySegments,
}

/// Collects nodes and segments before the graph is indexed.
#[derive(Default)]
pub struct TaxiGraphBuilder {
    nodes:    Vec<NodeSpec>,
    segments: Vec<SegmentSpec>,
}

impl TaxiGraphBuilder {
    pub fn add_node(&mut self, node: NodeSpec) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn add_segment(&mut self, segment: SegmentSpec) -> &mut Self {
        self.segments.push(segment);
        self
    }

    /// Indexes the graph.
    ///
    /// Nodes are sorted by id.
    /// Segments receive ids in insertion order,
    /// and each segment is paired with the first unpaired segment joining the same nodes in reverse.
    pub fn init(self) -> Result<TaxiGraph, GraphError> {
        let mut nodes: Vec<TaxiNode> = self
            .nodes
            .into_iter()
            .map(|spec| TaxiNode {
                id:         spec.id,
                position:   spec.position,
                on_runway:  spec.on_runway,
                hold_point: spec.hold_point,
                segments:   SmallVec::new(),
            })
            .collect();
        nodes.sort_by_key(|node| node.id);
        if let Some((dup, _)) = nodes.iter().tuple_windows().find(|(a, b)| a.id == b.id) {
            return Err(GraphError::DuplicateNode(dup.id));
        }

        let mut graph = TaxiGraph { nodes, segments: Vec::with_capacity(self.segments.len()) };

        for (index, spec) in self.segments.into_iter().enumerate() {
            if spec.start == spec.end {
                return Err(GraphError::SelfLoop { index, node: spec.start });
            }
            let start = graph
                .find_node(spec.start)
                .ok_or(GraphError::UnknownNode { index, node: spec.start })?
                .position;
            let end = graph
                .find_node(spec.end)
                .ok_or(GraphError::UnknownNode { index, node: spec.end })?
                .position;

            let id = SegmentId(u32::try_from(index).map_err(|_| GraphError::TooManySegments)?);
            graph.segments.push(TaxiSegment {
                id,
                start: spec.start,
                end: spec.end,
                course: start.course_to(end),
                length: start.distance(end),
                opposite: None,
                active: spec.active,
                push_back: spec.push_back,
            });
            if let Some(node) = graph.node_mut(spec.start) {
                node.segments.push(id);
            }
        }

        graph.pair_opposites();
        Ok(graph)
    }
}

/// The directed ground movement graph of an airport.
///
/// Immutable after [`TaxiGraphBuilder::init`] except for segment availability.
#[derive(Debug, Clone, Default)]
pub struct TaxiGraph {
    nodes:    Vec<TaxiNode>,
    segments: Vec<TaxiSegment>,
}

impl TaxiGraph {
    #[must_use]
    pub fn builder() -> TaxiGraphBuilder { TaxiGraphBuilder::default() }

    fn pair_opposites(&mut self) {
        let mut unpaired: HashMap<(NodeId, NodeId), Vec<SegmentId>> = HashMap::new();
        for segment in &self.segments {
            unpaired.entry((segment.start, segment.end)).or_default().push(segment.id);
        }
        for list in unpaired.values_mut() {
            list.reverse(); // pop in insertion order
        }

        for index in 0..self.segments.len() {
            let segment = &self.segments[index];
            if segment.opposite.is_some() {
                continue;
            }
            let (id, key) = (segment.id, (segment.end, segment.start));

            let Some(opposite) = unpaired.get_mut(&key).and_then(Vec::pop) else { continue };
            if let Some(own) = unpaired.get_mut(&(key.1, key.0)) {
                own.retain(|&other| other != id);
            }

            self.segments[index].opposite = Some(opposite);
            self.segments[opposite.index()].opposite = Some(id);
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut TaxiNode> {
        let index = self.nodes.binary_search_by_key(&id, |node| node.id).ok()?;
        Some(&mut self.nodes[index])
    }

    #[must_use]
    pub fn find_node(&self, id: NodeId) -> Option<&TaxiNode> {
        let index = self.nodes.binary_search_by_key(&id, |node| node.id).ok()?;
        Some(&self.nodes[index])
    }

    #[must_use]
    pub fn find_segment(&self, id: SegmentId) -> Option<&TaxiSegment> { self.segments.get(id.index()) }

    /// Nodes sorted by id.
    #[must_use]
    pub fn nodes(&self) -> &[TaxiNode] { &self.nodes }

    /// Segments in id order.
    #[must_use]
    pub fn segments(&self) -> &[TaxiSegment] { &self.segments }

    /// The node at which an aircraft occupying the route position `pos` is heading to.
    #[must_use]
    pub fn target_of(&self, pos: SegmentId) -> Option<NodeId> {
        self.find_segment(pos).map(|segment| segment.end)
    }

    /// Finds the node with the smallest great-circle distance to `position`.
    ///
    /// Returns `None` only if the graph has no nodes.
    #[must_use]
    pub fn find_nearest_node(&self, position: GeoPos) -> Option<NodeId> {
        Self::nearest(self.nodes.iter(), position)
    }

    /// Finds the runway node with the smallest great-circle distance to `position`.
    #[must_use]
    pub fn find_nearest_node_on_runway(&self, position: GeoPos) -> Option<NodeId> {
        Self::nearest(self.nodes.iter().filter(|node| node.on_runway), position)
    }

    fn nearest<'a>(nodes: impl Iterator<Item = &'a TaxiNode>, position: GeoPos) -> Option<NodeId> {
        nodes.min_by_key(|node| OrderedFloat(node.position.distance(position).0)).map(|node| node.id)
    }

    /// Nodes where a pushback may end, without duplicates.
    ///
    /// These are the end nodes of pushback segments in segment order,
    /// followed by the remaining nodes marked as pushback holding points.
    pub fn push_back_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        let segment_ends =
            self.segments.iter().filter(|segment| segment.push_back).map(|segment| segment.end);
        let hold_points =
            self.nodes.iter().filter(|node| node.hold_point == HoldPoint::PushBack).map(|node| node.id);
        segment_ends.chain(hold_points).unique()
    }

    /// Opens or closes a segment for routing.
    pub fn set_segment_active(&mut self, id: SegmentId, active: bool) -> Result<(), GraphError> {
        let segment = self.segments.get_mut(id.index()).ok_or(GraphError::UnknownSegment(id))?;
        if segment.active != active {
            bevy::log::debug!("{id} from {} to {} is now active={active}", segment.start, segment.end);
        }
        segment.active = active;
        Ok(())
    }
}
