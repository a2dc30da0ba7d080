use math::{GeoPos, Length, Speed};

use super::{AircraftId, TrafficList, TrafficRecord, UserAircraft};
use crate::config::Config;
use crate::ground::TaxiGraph;

/// The neighbour distance at which the follower matches the neighbour's speed.
///
/// Closer followers are slowed proportionally.
const MATCH_SPEED_DISTANCE: Length<f64> = Length::from_meters(100.);

/// Everything outside a traffic list that negotiation looks at.
pub struct NegotiationContext<'a> {
    pub graph:  &'a TaxiGraph,
    /// Traffic handled by the tower of the same airport.
    pub tower:  Option<&'a TrafficList>,
    pub user:   Option<&'a UserAircraft>,
    pub config: &'a Config,
}

/// The closest aircraft ahead of the negotiating aircraft.
struct Neighbour {
    id:           AircraftId,
    distance:     Length<f64>,
    speed:        Speed<f64>,
    radius:       Length<f64>,
    /// Follows the same route as the negotiating aircraft.
    in_trail:     bool,
    /// In the tower list or the user, which always requires slowing down when close.
    other_reason: bool,
    waits_for_me: bool,
}

impl Neighbour {
    fn from_record(
        me: &TrafficRecord,
        other: &TrafficRecord,
        distance: Length<f64>,
        other_reason: bool,
    ) -> Self {
        Self {
            id: other.id,
            distance,
            speed: other.pose.speed,
            radius: other.radius,
            in_trail: !other_reason && me.check_position_and_intentions(other),
            other_reason,
            waits_for_me: other.waits_for == Some(me.id),
        }
    }
}

/// Distance to `position` if it lies within the cone ahead of `me`.
fn distance_in_cone(me: &TrafficRecord, position: GeoPos, cone_deg: f64) -> Option<Length<f64>> {
    let course = me.pose.position.course_to(position);
    if !course.is_finite() {
        return Some(Length::ZERO);
    }
    (me.pose.heading.abs_difference(course) < cone_deg).then(|| me.pose.position.distance(position))
}

impl TrafficList {
    /// Adjusts the speed of `id` behind the closest aircraft ahead of it.
    ///
    /// Any previous speed restriction of `id` is cleared first.
    /// A restriction is only issued if the closest aircraft follows the same route,
    /// is handled by the tower, or is the user,
    /// and is closer than twice the safety distance.
    pub fn check_speed_adjustment(&mut self, id: AircraftId, ctx: &NegotiationContext) {
        let Some(me) = self.log_get(id) else { return };
        let cone = ctx.config.speed_cone_deg;

        let own_list = self.iter().filter(|other| other.id != id).map(|other| (other, false));
        let tower_list = ctx
            .tower
            .into_iter()
            .flat_map(TrafficList::iter)
            .filter(|other| other.id != id)
            .map(|other| (other, true));
        let mut closest = own_list
            .chain(tower_list)
            .filter_map(|(other, other_reason)| {
                let distance = distance_in_cone(me, other.pose.position, cone)?;
                Some(Neighbour::from_record(me, other, distance, other_reason))
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance));

        if let Some(user) = ctx.user
            && let Some(distance) = distance_in_cone(me, user.position, cone)
            && closest.as_ref().is_none_or(|closest| distance < closest.distance)
        {
            closest = Some(Neighbour {
                id: AircraftId::USER,
                distance,
                speed: user.speed,
                radius: user.radius,
                in_trail: false,
                other_reason: true,
                waits_for_me: false,
            });
        }

        let Some(me) = self.get_mut(id) else { return };
        me.instruction.change_speed = None;

        let Some(closest) = closest.filter(|closest| closest.in_trail || closest.other_reason) else {
            me.set_waits_for(None);
            return;
        };

        let safety = (me.radius + closest.radius) * ctx.config.safety_factor;
        if closest.distance >= safety * 2. {
            me.set_waits_for(None);
            return;
        }
        if closest.waits_for_me {
            return;
        }

        me.set_waits_for(Some(closest.id));
        let mut speed = closest.speed * (closest.distance / MATCH_SPEED_DISTANCE);
        if closest.distance < safety {
            speed = Speed::ZERO;
        }
        bevy::log::trace!(
            "{id} slows down to {:.1} kt behind {} at {:.0} m",
            speed.into_knots(),
            closest.id,
            closest.distance.into_meters()
        );
        me.instruction.change_speed = Some(speed.max(Speed::ZERO));
    }

    /// Decides whether `id` must hold position for crossing or opposing traffic.
    ///
    /// Opposing traffic always requires holding.
    /// At a merge, `id` holds for a moving aircraft that is closer to the merging node,
    /// unless `id` already has right-of-way over it;
    /// otherwise `id` is granted right-of-way over that aircraft.
    pub fn check_hold_position(&mut self, id: AircraftId, ctx: &NegotiationContext) {
        let Some(me) = self.log_get(id) else { return };
        let graph = ctx.graph;

        let mut blocker = None;
        let mut opposing = false;
        let mut granted = Vec::new();
        let mut crossing = Vec::new();

        for other in self.iter().filter(|other| other.id != id) {
            let Some(node) = me.crosses(other, graph) else { continue };
            crossing.push(other.id);

            if me.is_opposing(other, graph, node) {
                bevy::log::trace!("{id} holds for opposing {} at {node}", other.id);
                blocker.get_or_insert(other.id);
                opposing = true;
                continue;
            }

            let Some(node_pos) = graph.find_node(node).map(|node| node.position) else { continue };
            let other_distance = other.pose.position.distance(node_pos);
            if other_distance < Length::from_meters(ctx.config.hold_distance_m)
                && other.is_routed_through(node, graph)
                && !me.has_right_of_way_over(other.id)
            {
                let own_distance = me.pose.position.distance(node_pos);
                if !other.instruction.hold_position && other_distance < own_distance {
                    bevy::log::trace!("{id} holds for merging {} at {node}", other.id);
                    blocker.get_or_insert(other.id);
                } else {
                    granted.push(other.id);
                }
            }
        }

        let Some(me) = self.get_mut(id) else { return };
        me.right_of_way.retain(|&mut other| crossing.contains(&other));
        for other in granted {
            if !me.right_of_way.contains(&other) {
                me.right_of_way.push(other);
            }
        }

        me.instruction.hold_position = blocker.is_some();
        me.holds_for_opposing = opposing;
        if blocker.is_some() {
            me.set_waits_for(blocker);
        }
    }

    /// Detects whether the yield chain starting at `id` leads back to `id`.
    ///
    /// In a circular wait, the aircraft with the lowest id in the cycle is released,
    /// skipping aircraft that hold for opposing traffic.
    /// A cycle made only of opposing holds is left as is.
    pub fn check_for_circular_waits(&mut self, id: AircraftId) {
        let Some(me) = self.log_get(id) else { return };

        let mut cycle = vec![id];
        let mut next = me.waits_for;
        let mut circular = false;
        for _ in 0..self.len() {
            let Some(current) = next else { break };
            if current == id {
                circular = true;
                break;
            }
            if cycle.contains(&current) {
                break;
            }
            let Some(record) = self.get(current) else { break };
            cycle.push(current);
            next = record.waits_for;
        }

        let Some(me) = self.get_mut(id) else { return };
        me.instruction.resolve_circular_wait = circular;
        if !circular {
            return;
        }

        let releasable = cycle
            .iter()
            .copied()
            .filter(|&member| self.get(member).is_some_and(|record| !record.holds_for_opposing))
            .min();
        let Some(lowest) = releasable else {
            bevy::log::debug!("circular wait among {cycle:?} is held by opposing traffic");
            return;
        };
        bevy::log::debug!("circular wait among {cycle:?}, releasing {lowest}");
        if let Some(record) = self.get_mut(lowest) {
            record.instruction.hold_position = false;
            record.instruction.change_speed = None;
            record.set_waits_for(None);
        }
    }
}
