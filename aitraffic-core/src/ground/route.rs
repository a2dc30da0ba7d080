use std::fmt;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use math::Length;
use pathfinding::prelude::dijkstra;

use super::{NodeId, SegmentId, TaxiGraph, TaxiSegment};

/// Restricts the segments a route search may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSearch {
    /// Any active segment.
    Full,
    /// Only active segments of the pushback network.
    PushBack,
}

impl RouteSearch {
    fn allows(self, segment: &TaxiSegment) -> bool {
        segment.active
            && match self {
                Self::Full => true,
                Self::PushBack => segment.push_back,
            }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    #[error("no route from {start} to {end}")]
    RouteNotFound { start: NodeId, end: NodeId },
    #[error("{0} does not exist")]
    UnknownNode(NodeId),
}

/// A path through the taxi graph.
///
/// `segments[i]` joins `nodes[i]` to `nodes[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxiRoute {
    nodes:      Vec<NodeId>,
    segments:   Vec<SegmentId>,
    distance: Length<f64>,
}

impl TaxiRoute {
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] { &self.nodes }

    /// Segments of the route, which are also the route positions an aircraft passes through.
    #[must_use]
    pub fn segments(&self) -> &[SegmentId] { &self.segments }

    /// Sum of the segment lengths.
    #[must_use]
    pub fn distance(&self) -> Length<f64> { self.distance }

    /// Number of segments traversed.
    #[must_use]
    pub fn depth(&self) -> usize { self.segments.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.segments.is_empty() }

    /// Steps through each node together with the segment leading into it.
    ///
    /// The first node has no inbound segment.
    pub fn steps(&self) -> impl Iterator<Item = (NodeId, Option<SegmentId>)> + '_ {
        self.nodes
            .iter()
            .copied()
            .zip(itertools::chain([None], self.segments.iter().copied().map(Some)))
    }
}

impl fmt::Display for TaxiRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.0} m)", self.nodes.iter().map(|node| node.0).join(" -> "), self.distance.into_meters())
    }
}

impl TaxiGraph {
    /// Finds the shortest route over all active segments.
    pub fn find_shortest_route(&self, start: NodeId, end: NodeId) -> Result<TaxiRoute, RouteError> {
        self.find_shortest_route_with(start, end, RouteSearch::Full)
    }

    /// Finds the shortest route from `start` to `end` using the segments allowed by `search`.
    ///
    /// Ties between equally short routes are broken arbitrarily but deterministically.
    pub fn find_shortest_route_with(
        &self,
        start: NodeId,
        end: NodeId,
        search: RouteSearch,
    ) -> Result<TaxiRoute, RouteError> {
        self.find_node(start).ok_or(RouteError::UnknownNode(start))?;
        self.find_node(end).ok_or(RouteError::UnknownNode(end))?;

        let (nodes, _) = dijkstra(
            &start,
            |&node| {
                self.find_node(node)
                    .into_iter()
                    .flat_map(|node| node.segments())
                    .filter_map(|&id| self.find_segment(id))
                    .filter(|segment| search.allows(segment))
                    .map(|segment| (segment.end, OrderedFloat(segment.length.0)))
                    .collect::<Vec<_>>()
            },
            |&node| node == end,
        )
        .ok_or(RouteError::RouteNotFound { start, end })?;

        let segments: Vec<SegmentId> = nodes
            .iter()
            .tuple_windows()
            .map(|(&from, &to)| {
                self.shortest_segment(from, to, search).ok_or(RouteError::RouteNotFound { start, end })
            })
            .collect::<Result<_, _>>()?;
        let distance = segments
            .iter()
            .filter_map(|&id| self.find_segment(id))
            .map(|segment| segment.length)
            .sum::<Length<f64>>();

        let route = TaxiRoute { nodes, segments, distance };
        bevy::log::trace!("found taxi route {route}");
        Ok(route)
    }

    fn shortest_segment(&self, from: NodeId, to: NodeId, search: RouteSearch) -> Option<SegmentId> {
        self.find_node(from)?
            .segments()
            .iter()
            .filter_map(|&id| self.find_segment(id))
            .filter(|segment| segment.end == to && search.allows(segment))
            .min_by_key(|segment| OrderedFloat(segment.length.0))
            .map(|segment| segment.id)
    }
}
