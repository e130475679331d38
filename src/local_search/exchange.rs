//! The `(m, n)`-exchange family: move `m` consecutive clients and swap
//! them with `n` consecutive clients, within or across routes. `n = 0`
//! relocates the `m`-segment after the anchor `v`.

use crate::cost::{CostEvaluator, Piece, RouteProposal};
use crate::problem::{Cost, ProblemData};
use crate::route::{swap_nodes, NodePos};

use super::LocalSearch;

impl LocalSearch {
    /// Exact delta of exchanging the `m`-segment at `u` with the
    /// `n`-segment at `v`; zero when the move is not representable.
    pub fn evaluate_exchange(
        &self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        m: usize,
        n: usize,
        u: NodePos,
        v: NodePos,
    ) -> Cost {
        let route_u = &self.routes[u.route];
        let route_v = &self.routes[v.route];

        // The moved segment must be clients within one trip.
        if u.index == 0 || u.index + m > route_u.last() {
            return 0;
        }
        for pos in u.index..u.index + m {
            if data.is_depot(route_u.visit(pos)) {
                return 0;
            }
        }

        if n == 0 {
            // v is an insertion anchor; anything but the end sentinel.
            if v.index >= route_v.last() {
                return 0;
            }
            if u.route == v.route && v.index + 1 >= u.index && v.index < u.index + m {
                return 0; // reinserting at the same place
            }
        } else {
            if v.index == 0 || v.index + n > route_v.last() {
                return 0;
            }
            for pos in v.index..v.index + n {
                if data.is_depot(route_v.visit(pos)) {
                    return 0;
                }
            }
            if u.route == v.route {
                let (f_start, f_len, s_start) = if u.index < v.index {
                    (u.index, m, v.index)
                } else {
                    (v.index, n, u.index)
                };
                if f_start + f_len > s_start {
                    return 0; // overlapping segments
                }
                if m == 2 && n == 2 && f_start + f_len == s_start {
                    return 0; // adjacent pairs swap to themselves
                }
            }
        }

        let u_locs: Vec<usize> = (u.index..u.index + m).map(|p| route_u.visit(p)).collect();

        if u.route == v.route {
            let route = route_u;
            let current = cost_evaluator.route_cost(data, route);
            let mut pieces: Vec<Piece> = Vec::new();

            if n == 0 {
                if v.index > u.index {
                    pieces.push(Piece::Prefix(route, u.index - 1));
                    pieces.push(Piece::Slice(route, u.index + m, v.index));
                    pieces.extend(u_locs.iter().map(|&c| Piece::Client(c)));
                    pieces.push(Piece::Suffix(route, v.index + 1));
                } else {
                    pieces.push(Piece::Prefix(route, v.index));
                    pieces.extend(u_locs.iter().map(|&c| Piece::Client(c)));
                    pieces.push(Piece::Slice(route, v.index + 1, u.index - 1));
                    pieces.push(Piece::Suffix(route, u.index + m));
                }
            } else {
                let (f_start, f_len, f_locs, s_start, s_len, s_locs) = if u.index < v.index {
                    let v_locs: Vec<usize> =
                        (v.index..v.index + n).map(|p| route.visit(p)).collect();
                    (u.index, m, u_locs.clone(), v.index, n, v_locs)
                } else {
                    let v_locs: Vec<usize> =
                        (v.index..v.index + n).map(|p| route.visit(p)).collect();
                    (v.index, n, v_locs, u.index, m, u_locs.clone())
                };

                pieces.push(Piece::Prefix(route, f_start - 1));
                pieces.extend(s_locs.iter().map(|&c| Piece::Client(c)));
                if f_start + f_len <= s_start - 1 {
                    pieces.push(Piece::Slice(route, f_start + f_len, s_start - 1));
                }
                pieces.extend(f_locs.iter().map(|&c| Piece::Client(c)));
                pieces.push(Piece::Suffix(route, s_start + s_len));
            }

            let proposal = RouteProposal::new(route.vehicle_type(), pieces);
            return cost_evaluator
                .proposal_cost(data, &proposal)
                .saturating_sub(current);
        }

        // Across routes.
        let current = cost_evaluator
            .route_cost(data, route_u)
            .saturating_add(cost_evaluator.route_cost(data, route_v));

        let mut u_pieces: Vec<Piece> = vec![Piece::Prefix(route_u, u.index - 1)];
        let mut v_pieces: Vec<Piece> = Vec::new();

        if n == 0 {
            v_pieces.push(Piece::Prefix(route_v, v.index));
            v_pieces.extend(u_locs.iter().map(|&c| Piece::Client(c)));
            v_pieces.push(Piece::Suffix(route_v, v.index + 1));
        } else {
            let v_locs: Vec<usize> = (v.index..v.index + n).map(|p| route_v.visit(p)).collect();
            u_pieces.extend(v_locs.iter().map(|&c| Piece::Client(c)));
            v_pieces.push(Piece::Prefix(route_v, v.index - 1));
            v_pieces.extend(u_locs.iter().map(|&c| Piece::Client(c)));
            v_pieces.push(Piece::Suffix(route_v, v.index + n));
        }
        u_pieces.push(Piece::Suffix(route_u, u.index + m));

        let u_proposal = RouteProposal::new(route_u.vehicle_type(), u_pieces);
        let v_proposal = RouteProposal::new(route_v.vehicle_type(), v_pieces);

        cost_evaluator
            .proposal_cost(data, &u_proposal)
            .saturating_add(cost_evaluator.proposal_cost(data, &v_proposal))
            .saturating_sub(current)
    }

    /// Apply the exchange; the caller updates statistics.
    pub fn apply_exchange(&mut self, data: &ProblemData, m: usize, n: usize, u: NodePos, v: NodePos) {
        if u.route == v.route {
            let route = &mut self.routes[u.route];
            if n == 0 {
                let locs = route.remove_range(u.index, m);
                if v.index > u.index {
                    route.insert_range(v.index + 1 - m, &locs);
                } else {
                    route.insert_range(v.index + 1, &locs);
                }
            } else {
                let (f_start, f_len, s_start, s_len) = if u.index < v.index {
                    (u.index, m, v.index, n)
                } else {
                    (v.index, n, u.index, m)
                };
                let s_locs = route.remove_range(s_start, s_len);
                let f_locs = route.remove_range(f_start, f_len);
                route.insert_range(f_start, &s_locs);
                route.insert_range(s_start + s_len - f_len, &f_locs);
            }
            self.update_route(data, u.route);
        } else {
            let (route_u, route_v) = self.two_routes_mut(u.route, v.route);
            if n == 0 {
                let locs = route_u.remove_range(u.index, m);
                route_v.insert_range(v.index + 1, &locs);
            } else if m == 1 && n == 1 {
                swap_nodes(route_u, u.index, route_v, v.index);
            } else {
                let v_locs = route_v.remove_range(v.index, n);
                let u_locs = route_u.remove_range(u.index, m);
                route_u.insert_range(u.index, &v_locs);
                route_v.insert_range(v.index, &u_locs);
            }
            self.update_route(data, u.route);
            self.update_route(data, v.route);
        }
    }
}
