//! Local search over mutable routes.
//!
//! The orchestrator owns the working routes and a seeded generator. Node
//! operators run over a randomised client order restricted to each
//! client's granular neighbour list; route operators run over route pairs
//! during intensification. Every move's delta comes from the proposal
//! evaluator, so applying a move changes the cost by exactly the returned
//! delta.

pub mod exchange;
pub mod relocate_depot;
pub mod swap_routes;
pub mod swap_star;
pub mod swap_tails;

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{LocalSearchParams, NeighbourMetric};
use crate::cost::{CostEvaluator, Piece, RouteProposal};
use crate::problem::{Cost, ProblemData};
use crate::route::{NodePos, SearchRoute};
use crate::solution::Solution;

/// Node move operators, in their fixed dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeOpTag {
    Exchange10,
    Exchange11,
    Exchange20,
    Exchange21,
    Exchange22,
    Exchange30,
    Exchange31,
    Exchange32,
    Exchange33,
    SwapTails,
    RelocateWithDepot,
}

impl NodeOpTag {
    /// Every node operator, in dispatch order.
    pub fn all() -> Vec<NodeOpTag> {
        vec![
            NodeOpTag::Exchange10,
            NodeOpTag::Exchange11,
            NodeOpTag::Exchange20,
            NodeOpTag::Exchange21,
            NodeOpTag::Exchange22,
            NodeOpTag::Exchange30,
            NodeOpTag::Exchange31,
            NodeOpTag::Exchange32,
            NodeOpTag::Exchange33,
            NodeOpTag::SwapTails,
            NodeOpTag::RelocateWithDepot,
        ]
    }

    /// Segment lengths `(m, n)` for the exchange family.
    pub fn exchange_dims(self) -> Option<(usize, usize)> {
        match self {
            NodeOpTag::Exchange10 => Some((1, 0)),
            NodeOpTag::Exchange11 => Some((1, 1)),
            NodeOpTag::Exchange20 => Some((2, 0)),
            NodeOpTag::Exchange21 => Some((2, 1)),
            NodeOpTag::Exchange22 => Some((2, 2)),
            NodeOpTag::Exchange30 => Some((3, 0)),
            NodeOpTag::Exchange31 => Some((3, 1)),
            NodeOpTag::Exchange32 => Some((3, 2)),
            NodeOpTag::Exchange33 => Some((3, 3)),
            _ => None,
        }
    }

    /// Whether the operator can move material into an empty route.
    fn targets_empty_routes(self) -> bool {
        matches!(
            self,
            NodeOpTag::Exchange10
                | NodeOpTag::Exchange20
                | NodeOpTag::Exchange30
                | NodeOpTag::SwapTails
                | NodeOpTag::RelocateWithDepot
        )
    }
}

/// Route move operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteOpTag {
    SwapStar,
    SwapRoutes,
}

impl RouteOpTag {
    pub fn all() -> Vec<RouteOpTag> {
        vec![RouteOpTag::SwapStar, RouteOpTag::SwapRoutes]
    }
}

/// Evaluation and application counts for one operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorStats {
    pub num_evaluations: u64,
    pub num_applications: u64,
}

/// Aggregate counters over one `LocalSearch` lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStatistics {
    pub node_operators: Vec<OperatorStats>,
    pub route_operators: Vec<OperatorStats>,
    pub num_moves: u64,
    pub num_improving: u64,
    pub num_updates: u64,
}

/// The local-search orchestrator.
pub struct LocalSearch {
    params: LocalSearchParams,
    rng: ChaCha8Rng,
    routes: Vec<SearchRoute>,
    /// Current placement per location; depots and unplanned clients are
    /// `None`.
    positions: Vec<Option<NodePos>>,
    /// Granular neighbour list per client location, computed once.
    neighbours: Vec<Vec<usize>>,
    stats: SearchStatistics,
}

impl LocalSearch {
    /// Create an orchestrator for the given instance; the neighbour lists
    /// are computed here, once.
    pub fn new(data: &ProblemData, params: LocalSearchParams, seed: u64) -> Self {
        let neighbours = build_neighbours(data, &params);
        let stats = SearchStatistics {
            node_operators: vec![OperatorStats::default(); params.node_operators.len()],
            route_operators: vec![OperatorStats::default(); params.route_operators.len()],
            ..SearchStatistics::default()
        };

        LocalSearch {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
            routes: Vec::new(),
            positions: vec![None; data.num_locations()],
            neighbours,
            stats,
        }
    }

    pub fn params(&self) -> &LocalSearchParams {
        &self.params
    }

    pub fn statistics(&self) -> &SearchStatistics {
        &self.stats
    }

    pub fn neighbours(&self, client: usize) -> &[usize] {
        &self.neighbours[client]
    }

    /// The working routes, one per vehicle once a solution is loaded.
    pub fn routes(&self) -> &[SearchRoute] {
        &self.routes
    }

    pub fn route(&self, index: usize) -> &SearchRoute {
        &self.routes[index]
    }

    /// Where a client currently sits, if it is planned at all.
    pub fn position(&self, client: usize) -> Option<NodePos> {
        self.positions[client]
    }

    /// Improve a solution using node operators only.
    pub fn search(
        &mut self,
        data: &ProblemData,
        solution: &Solution,
        cost_evaluator: &CostEvaluator,
    ) -> Solution {
        self.load(data, solution);
        if !self.params.exhaustive {
            self.perturb(data);
        }
        self.complete(data, cost_evaluator);
        self.descend(data, cost_evaluator);
        self.export(data)
    }

    /// Improve a solution with the full mixed loop: node operators to a
    /// fixed point, then route operators, repeated until neither finds an
    /// improving move.
    pub fn intensify(
        &mut self,
        data: &ProblemData,
        solution: &Solution,
        cost_evaluator: &CostEvaluator,
    ) -> Solution {
        self.load(data, solution);
        if !self.params.exhaustive {
            self.perturb(data);
        }
        self.complete(data, cost_evaluator);

        loop {
            self.descend(data, cost_evaluator);
            if !self.route_pass(data, cost_evaluator) {
                break;
            }
        }

        self.export(data)
    }

    // ---- solution transfer -----------------------------------------------

    /// Load a solution into fresh search routes, one per vehicle.
    pub fn load(&mut self, data: &ProblemData, solution: &Solution) {
        self.routes.clear();
        let mut idx = 0;
        for (vt_idx, vt) in data.vehicle_types().iter().enumerate() {
            for _ in 0..vt.num_available {
                self.routes.push(SearchRoute::new(data, idx, vt_idx));
                idx += 1;
            }
        }

        for slot in self.positions.iter_mut() {
            *slot = None;
        }

        for route in solution.routes() {
            if route.is_empty() {
                continue;
            }
            let slot = self
                .routes
                .iter_mut()
                .find(|r| r.vehicle_type() == route.vehicle_type() && r.interior().is_empty());
            if let Some(slot) = slot {
                slot.set_interior(route.visits());
            }
        }

        for r in 0..self.routes.len() {
            self.update_route(data, r);
        }
    }

    /// Snapshot the current routes; empty routes are dropped.
    pub fn export(&self, data: &ProblemData) -> Solution {
        let routes = self
            .routes
            .iter()
            .filter(|r| !r.is_empty(data))
            .map(|r| (r.vehicle_type(), r.interior().to_vec()))
            .collect();
        Solution::new(data, routes)
    }

    /// Rebuild a route's caches and the placement registry of its clients.
    fn update_route(&mut self, data: &ProblemData, route_idx: usize) {
        self.routes[route_idx].update(data);
        self.stats.num_updates += 1;

        let route = &self.routes[route_idx];
        for pos in 1..route.last() {
            let loc = route.visit(pos);
            if data.is_client(loc) {
                self.positions[loc] = Some(NodePos {
                    route: route_idx,
                    index: pos,
                    trip: route.trip_of(pos),
                });
            }
        }
    }

    /// Mutable access to two distinct routes at once.
    fn two_routes_mut(&mut self, a: usize, b: usize) -> (&mut SearchRoute, &mut SearchRoute) {
        debug_assert!(a != b);
        if a < b {
            let (left, right) = self.routes.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.routes.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }

    // ---- main descent ----------------------------------------------------

    /// Run node operators over a randomised client order until a full pass
    /// finds no improving move.
    fn descend(&mut self, data: &ProblemData, cost_evaluator: &CostEvaluator) {
        let mut order: Vec<usize> = data.client_indices().collect();
        order.shuffle(&mut self.rng);

        loop {
            let mut improved = false;

            for &u_loc in &order {
                // After an applied move the anchor's situation changed, so
                // the operator and neighbour loops restart for it.
                'anchor: loop {
                    let u = match self.positions[u_loc] {
                        Some(pos) => pos,
                        None => break 'anchor,
                    };

                    for op_idx in 0..self.params.node_operators.len() {
                        let tag = self.params.node_operators[op_idx];

                        for ni in 0..self.neighbours[u_loc].len() {
                            let v_loc = self.neighbours[u_loc][ni];
                            let v = match self.positions[v_loc] {
                                Some(pos) => pos,
                                None => continue,
                            };

                            self.stats.node_operators[op_idx].num_evaluations += 1;
                            let delta = self.node_delta(data, cost_evaluator, tag, u, v);
                            if delta < 0 {
                                trace!("{:?} ({}, {}): delta {}", tag, u_loc, v_loc, delta);
                                self.apply_node(data, cost_evaluator, tag, u, v);
                                self.stats.node_operators[op_idx].num_applications += 1;
                                self.stats.num_moves += 1;
                                self.stats.num_improving += 1;
                                improved = true;
                                continue 'anchor;
                            }
                        }

                        if tag.targets_empty_routes() {
                            let reps = self.empty_route_reps(data);
                            for v in reps {
                                self.stats.node_operators[op_idx].num_evaluations += 1;
                                let delta = self.node_delta(data, cost_evaluator, tag, u, v);
                                if delta < 0 {
                                    trace!("{:?} ({}, empty): delta {}", tag, u_loc, delta);
                                    self.apply_node(data, cost_evaluator, tag, u, v);
                                    self.stats.node_operators[op_idx].num_applications += 1;
                                    self.stats.num_moves += 1;
                                    self.stats.num_improving += 1;
                                    improved = true;
                                    continue 'anchor;
                                }
                            }
                        }
                    }

                    break 'anchor;
                }
            }

            if !improved {
                break;
            }
        }
    }

    /// One pass of the route operators over all pairs; true iff a move
    /// was applied.
    fn route_pass(&mut self, data: &ProblemData, cost_evaluator: &CostEvaluator) -> bool {
        let mut improved = false;

        for r1 in 0..self.routes.len() {
            for r2 in r1 + 1..self.routes.len() {
                for op_idx in 0..self.params.route_operators.len() {
                    let tag = self.params.route_operators[op_idx];
                    self.stats.route_operators[op_idx].num_evaluations += 1;

                    let delta = match tag {
                        RouteOpTag::SwapStar => {
                            self.evaluate_swap_star(data, cost_evaluator, r1, r2)
                        }
                        RouteOpTag::SwapRoutes => {
                            self.evaluate_swap_routes(data, cost_evaluator, r1, r2)
                        }
                    };

                    if delta < 0 {
                        debug!("{:?} ({}, {}): delta {}", tag, r1, r2, delta);
                        match tag {
                            RouteOpTag::SwapStar => {
                                self.apply_swap_star(data, cost_evaluator, r1, r2)
                            }
                            RouteOpTag::SwapRoutes => self.apply_swap_routes(data, r1, r2),
                        }
                        self.stats.route_operators[op_idx].num_applications += 1;
                        self.stats.num_moves += 1;
                        self.stats.num_improving += 1;
                        improved = true;
                    }
                }
            }
        }

        improved
    }

    /// First empty route of each vehicle type, as an insertion anchor at
    /// its start sentinel.
    fn empty_route_reps(&self, data: &ProblemData) -> Vec<NodePos> {
        let mut reps = Vec::new();
        let mut seen = vec![false; data.num_vehicle_types()];
        for route in &self.routes {
            let vt = route.vehicle_type();
            if !seen[vt] && route.is_empty(data) {
                seen[vt] = true;
                reps.push(NodePos {
                    route: route.idx(),
                    index: 0,
                    trip: 0,
                });
            }
        }
        reps
    }

    // ---- operator dispatch -----------------------------------------------

    fn node_delta(
        &self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        tag: NodeOpTag,
        u: NodePos,
        v: NodePos,
    ) -> Cost {
        if let Some((m, n)) = tag.exchange_dims() {
            return self.evaluate_exchange(data, cost_evaluator, m, n, u, v);
        }
        match tag {
            NodeOpTag::SwapTails => self.evaluate_swap_tails(data, cost_evaluator, u, v),
            NodeOpTag::RelocateWithDepot => {
                self.evaluate_relocate_with_depot(data, cost_evaluator, u, v)
            }
            _ => 0,
        }
    }

    fn apply_node(
        &mut self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        tag: NodeOpTag,
        u: NodePos,
        v: NodePos,
    ) {
        if let Some((m, n)) = tag.exchange_dims() {
            self.apply_exchange(data, m, n, u, v);
            return;
        }
        match tag {
            NodeOpTag::SwapTails => self.apply_swap_tails(data, u, v),
            NodeOpTag::RelocateWithDepot => {
                self.apply_relocate_with_depot(data, cost_evaluator, u, v)
            }
            _ => {}
        }
    }

    // ---- perturbation ----------------------------------------------------

    /// Kick the current routes to escape the local minimum: drop a few
    /// optional clients and relocate a few clients at random.
    fn perturb(&mut self, data: &ProblemData) {
        for _ in 0..self.params.perturb_strength {
            let planned: Vec<usize> = data
                .client_indices()
                .filter(|&c| self.positions[c].is_some())
                .collect();
            if planned.is_empty() {
                return;
            }

            let drop_optional = self.rng.gen_bool(0.5);
            let optional: Vec<usize> = planned
                .iter()
                .copied()
                .filter(|&c| !data.location(c).required)
                .collect();

            if drop_optional && !optional.is_empty() {
                let c = optional[self.rng.gen_range(0..optional.len())];
                let pos = match self.positions[c] {
                    Some(pos) => pos,
                    None => continue,
                };
                self.routes[pos.route].remove(pos.index);
                self.positions[c] = None;
                self.update_route(data, pos.route);
                self.stats.num_moves += 1;
            } else {
                let c = planned[self.rng.gen_range(0..planned.len())];
                let pos = match self.positions[c] {
                    Some(pos) => pos,
                    None => continue,
                };
                self.routes[pos.route].remove(pos.index);
                self.positions[c] = None;
                self.update_route(data, pos.route);

                let dest = self.rng.gen_range(0..self.routes.len());
                let at = self.rng.gen_range(1..=self.routes[dest].last());
                self.routes[dest].insert(at, c);
                self.update_route(data, dest);
                self.stats.num_moves += 1;
            }
        }
    }

    // ---- completion pass -------------------------------------------------

    /// Plan every missing required client at its cheapest position, and
    /// missing optional clients whenever the prize beats the insertion
    /// cost. Group rules are honoured.
    fn complete(&mut self, data: &ProblemData, cost_evaluator: &CostEvaluator) {
        for c in data.client_indices() {
            if self.positions[c].is_some() {
                continue;
            }
            let place = data.location(c);

            // A member of a mutually exclusive group stays out once a
            // sibling is planned.
            if let Some(group_idx) = place.group {
                let group = data.group(group_idx);
                if group.mutually_exclusive
                    && group
                        .clients
                        .iter()
                        .any(|&other| other != c && self.positions[other].is_some())
                {
                    continue;
                }
            }

            if let Some((route_idx, at, delta)) = self.best_insertion(data, cost_evaluator, c) {
                let insert = if place.required {
                    true
                } else {
                    delta < place.prize
                };
                if insert {
                    self.routes[route_idx].insert(at, c);
                    self.update_route(data, route_idx);
                    self.stats.num_moves += 1;
                }
            }
        }

        // Required groups need at least one member planned.
        for group_idx in 0..data.groups().len() {
            let group = data.group(group_idx);
            if !group.required || group.clients.iter().any(|&c| self.positions[c].is_some()) {
                continue;
            }
            let mut best: Option<(usize, usize, usize, Cost)> = None;
            for &c in &group.clients {
                if let Some((route_idx, at, delta)) = self.best_insertion(data, cost_evaluator, c) {
                    if best.map_or(true, |(_, _, _, b)| delta < b) {
                        best = Some((c, route_idx, at, delta));
                    }
                }
            }
            if let Some((c, route_idx, at, _)) = best {
                self.routes[route_idx].insert(at, c);
                self.update_route(data, route_idx);
                self.stats.num_moves += 1;
            }
        }
    }

    /// Cheapest insertion of a client over all routes and positions.
    fn best_insertion(
        &self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        client: usize,
    ) -> Option<(usize, usize, Cost)> {
        let mut best: Option<(usize, usize, Cost)> = None;

        for route in &self.routes {
            let current = cost_evaluator.route_cost(data, route);
            for p in 0..route.last() {
                let proposal = RouteProposal::new(
                    route.vehicle_type(),
                    vec![
                        Piece::Prefix(route, p),
                        Piece::Client(client),
                        Piece::Suffix(route, p + 1),
                    ],
                );
                let delta = cost_evaluator
                    .proposal_cost(data, &proposal)
                    .saturating_sub(current);
                if best.map_or(true, |(_, _, b)| delta < b) {
                    best = Some((route.idx(), p + 1, delta));
                }
            }
        }

        best
    }
}

/// Penalised cost of a loose interior sequence on the given vehicle type,
/// wrapped in the vehicle's depot sentinels.
pub(crate) fn interior_cost(
    data: &ProblemData,
    cost_evaluator: &CostEvaluator,
    vehicle_type: usize,
    interior: &[usize],
) -> Cost {
    let mut pieces = Vec::with_capacity(interior.len() + 2);
    pieces.push(Piece::Start);
    for &loc in interior {
        if data.is_depot(loc) {
            pieces.push(Piece::Depot(loc));
        } else {
            pieces.push(Piece::Client(loc));
        }
    }
    pieces.push(Piece::End);

    cost_evaluator.proposal_cost(data, &RouteProposal::new(vehicle_type, pieces))
}

/// K nearest candidate partners per client under the configured metric.
fn build_neighbours(data: &ProblemData, params: &LocalSearchParams) -> Vec<Vec<usize>> {
    use itertools::Itertools;

    let mut neighbours = vec![Vec::new(); data.num_locations()];
    let distances = data.distance_matrix(0);
    let durations = data.duration_matrix(0);

    for u in data.client_indices() {
        let u_place = data.location(u);
        let ranked = data
            .client_indices()
            .filter(|&v| v != u)
            .map(|v| {
                let v_place = data.location(v);
                let dist = distances.get(u, v);
                let proximity = match params.neighbour_metric {
                    NeighbourMetric::Distance => dist,
                    NeighbourMetric::DistanceDuration => {
                        let travel = durations.get(u, v);
                        let depart_latest = u_place
                            .tw_late
                            .saturating_add(u_place.service_duration)
                            .saturating_add(travel);
                        let arrive_earliest = u_place
                            .tw_early
                            .saturating_add(u_place.service_duration)
                            .saturating_add(travel);
                        let wait = v_place.tw_early.saturating_sub(depart_latest).max(0);
                        let warp = arrive_earliest.saturating_sub(v_place.tw_late).max(0);
                        dist.saturating_add(travel)
                            .saturating_add(wait)
                            .saturating_add(warp)
                    }
                };
                (proximity, v)
            })
            .sorted()
            .take(params.granular_neighbours)
            .map(|(_, v)| v)
            .collect();
        neighbours[u] = ranked;
    }

    neighbours
}
