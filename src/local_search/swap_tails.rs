//! Tail exchange between two routes: everything after `u` in one route
//! swaps with everything after `v` in the other.

use crate::cost::{CostEvaluator, Piece, RouteProposal};
use crate::problem::{Cost, ProblemData};
use crate::route::{NodePos, SearchRoute};

use super::LocalSearch;

impl LocalSearch {
    /// Exact delta of exchanging the tails after `u` and `v`; zero when
    /// the move is not representable. Each unordered route pair is
    /// evaluated once, from the lower route index.
    pub fn evaluate_swap_tails(
        &self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u: NodePos,
        v: NodePos,
    ) -> Cost {
        if u.route == v.route || u.route > v.route {
            return 0;
        }

        let route_u = &self.routes[u.route];
        let route_v = &self.routes[v.route];

        // The anchors must leave the end sentinels in place.
        if u.index >= route_u.last() || v.index >= route_v.last() {
            return 0;
        }

        let u_tail = tail_range(route_u, u.index);
        let v_tail = tail_range(route_v, v.index);
        if u_tail.is_none() && v_tail.is_none() {
            return 0;
        }

        if !tail_fits(data, route_u, u.index, route_v, v_tail)
            || !tail_fits(data, route_v, v.index, route_u, u_tail)
        {
            return 0;
        }

        let current = cost_evaluator
            .route_cost(data, route_u)
            .saturating_add(cost_evaluator.route_cost(data, route_v));

        let mut u_pieces: Vec<Piece> = vec![Piece::Prefix(route_u, u.index)];
        if let Some((start, end)) = v_tail {
            u_pieces.push(Piece::Slice(route_v, start, end));
        }
        u_pieces.push(Piece::End);

        let mut v_pieces: Vec<Piece> = vec![Piece::Prefix(route_v, v.index)];
        if let Some((start, end)) = u_tail {
            v_pieces.push(Piece::Slice(route_u, start, end));
        }
        v_pieces.push(Piece::End);

        let u_proposal = RouteProposal::new(route_u.vehicle_type(), u_pieces);
        let v_proposal = RouteProposal::new(route_v.vehicle_type(), v_pieces);

        cost_evaluator
            .proposal_cost(data, &u_proposal)
            .saturating_add(cost_evaluator.proposal_cost(data, &v_proposal))
            .saturating_sub(current)
    }

    pub fn apply_swap_tails(&mut self, data: &ProblemData, u: NodePos, v: NodePos) {
        let (route_u, route_v) = self.two_routes_mut(u.route, v.route);

        let u_count = route_u.last() - 1 - u.index.min(route_u.last() - 1);
        let v_count = route_v.last() - 1 - v.index.min(route_v.last() - 1);

        let u_tail = if u_count > 0 {
            route_u.remove_range(u.index + 1, u_count)
        } else {
            Vec::new()
        };
        let v_tail = if v_count > 0 {
            route_v.remove_range(v.index + 1, v_count)
        } else {
            Vec::new()
        };

        if !v_tail.is_empty() {
            route_u.insert_range(u.index + 1, &v_tail);
        }
        if !u_tail.is_empty() {
            route_v.insert_range(v.index + 1, &u_tail);
        }

        self.update_route(data, u.route);
        self.update_route(data, v.route);
    }
}

/// Interior positions strictly after `index`, or `None` when the tail is
/// empty.
fn tail_range(route: &SearchRoute, index: usize) -> Option<(usize, usize)> {
    let last = route.last();
    if index + 1 > last - 1 {
        None
    } else {
        Some((index + 1, last - 1))
    }
}

/// Whether a donor tail is admissible on the receiving route: the trip cap
/// holds and any reload depots in the tail are permitted for the receiving
/// vehicle.
fn tail_fits(
    data: &ProblemData,
    receiver: &SearchRoute,
    keep_upto: usize,
    donor: &SearchRoute,
    tail: Option<(usize, usize)>,
) -> bool {
    let vt = data.vehicle_type(receiver.vehicle_type());

    let tail_reloads = match tail {
        None => 0,
        Some((start, end)) => donor.reloads_upto(end) - donor.reloads_upto(start - 1),
    };

    let trips = 1 + receiver.reloads_upto(keep_upto) + tail_reloads;
    if trips > vt.max_trips() {
        return false;
    }

    if tail_reloads > 0 && receiver.vehicle_type() != donor.vehicle_type() {
        if let Some((start, end)) = tail {
            for pos in start..=end {
                let loc = donor.visit(pos);
                if data.is_depot(loc) && !vt.reload_depots.contains(&loc) {
                    return false;
                }
            }
        }
    }

    true
}
