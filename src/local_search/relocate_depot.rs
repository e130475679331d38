//! Relocate a client into another route together with a new reload-depot
//! visit, opening an extra trip there.

use crate::cost::{CostEvaluator, Piece, RouteProposal};
use crate::problem::{Cost, ProblemData};
use crate::route::NodePos;

use super::LocalSearch;

/// The depot choice and side for the best reload insertion.
struct ReloadPlan {
    delta: Cost,
    depot: usize,
    depot_first: bool,
}

impl LocalSearch {
    /// Exact delta of moving the client at `u` after `v` in another route
    /// while inserting the best reload depot on either side of it; zero
    /// when the move is not representable.
    pub fn evaluate_relocate_with_depot(
        &self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u: NodePos,
        v: NodePos,
    ) -> Cost {
        self.plan_relocate_with_depot(data, cost_evaluator, u, v)
            .map_or(0, |plan| plan.delta)
    }

    pub fn apply_relocate_with_depot(
        &mut self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u: NodePos,
        v: NodePos,
    ) {
        let plan = match self.plan_relocate_with_depot(data, cost_evaluator, u, v) {
            Some(plan) => plan,
            None => return,
        };

        let client = self.routes[u.route].visit(u.index);
        let (route_u, route_v) = self.two_routes_mut(u.route, v.route);
        route_u.remove(u.index);
        if plan.depot_first {
            route_v.insert_range(v.index + 1, &[plan.depot, client]);
        } else {
            route_v.insert_range(v.index + 1, &[client, plan.depot]);
        }

        self.update_route(data, u.route);
        self.update_route(data, v.route);
    }

    fn plan_relocate_with_depot(
        &self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        u: NodePos,
        v: NodePos,
    ) -> Option<ReloadPlan> {
        if u.route == v.route {
            return None;
        }

        let route_u = &self.routes[u.route];
        let route_v = &self.routes[v.route];
        let vt = data.vehicle_type(route_v.vehicle_type());

        // Only clients relocate, and the destination must have trip room.
        if u.index == 0 || u.index >= route_u.last() {
            return None;
        }
        let client = route_u.visit(u.index);
        if data.is_depot(client) {
            return None;
        }
        if v.index >= route_v.last() {
            return None;
        }
        if vt.reload_depots.is_empty() || route_v.num_trips() >= vt.max_trips() {
            return None;
        }

        let current = cost_evaluator
            .route_cost(data, route_u)
            .saturating_add(cost_evaluator.route_cost(data, route_v));

        let u_proposal = RouteProposal::new(
            route_u.vehicle_type(),
            vec![
                Piece::Prefix(route_u, u.index - 1),
                Piece::Suffix(route_u, u.index + 1),
            ],
        );
        let u_cost = cost_evaluator.proposal_cost(data, &u_proposal);

        let mut best: Option<ReloadPlan> = None;
        for &depot in &vt.reload_depots {
            for depot_first in [true, false] {
                let mut pieces = vec![Piece::Prefix(route_v, v.index)];
                if depot_first {
                    pieces.push(Piece::Depot(depot));
                    pieces.push(Piece::Client(client));
                } else {
                    pieces.push(Piece::Client(client));
                    pieces.push(Piece::Depot(depot));
                }
                pieces.push(Piece::Suffix(route_v, v.index + 1));

                let proposal = RouteProposal::new(route_v.vehicle_type(), pieces);
                let delta = u_cost
                    .saturating_add(cost_evaluator.proposal_cost(data, &proposal))
                    .saturating_sub(current);

                if best.as_ref().map_or(true, |b| delta < b.delta) {
                    best = Some(ReloadPlan {
                        delta,
                        depot,
                        depot_first,
                    });
                }
            }
        }

        best
    }
}
