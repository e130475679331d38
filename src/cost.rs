//! Penalised cost evaluation.
//!
//! A [`CostEvaluator`] is a frozen bundle of penalty weights. Move
//! operators describe a hypothetical route as a [`RouteProposal`] — a
//! concatenation of cached route pieces and loose visits — and obtain its
//! exact penalised cost; the delta against the current routes is then a
//! plain subtraction, so the returned delta always matches the applied
//! change.

use crate::problem::{Cost, Duration, Load, ProblemData};
use crate::route::SearchRoute;
use crate::segment::{DistanceSegment, DurationSegment, LoadSegment};
use crate::solution::Solution;

/// One piece of a hypothetical route. `Prefix` and `Suffix` reuse the
/// route's caches and must come from the route the proposal is built for;
/// `Slice` may come from any route and is re-merged, honouring the
/// proposal vehicle's matrix profile.
#[derive(Debug, Clone, Copy)]
pub enum Piece<'a> {
    /// The proposal vehicle's start-depot sentinel.
    Start,
    /// The proposal vehicle's end-depot sentinel.
    End,
    /// Positions `0..=p` of the route, caches reused.
    Prefix(&'a SearchRoute, usize),
    /// Positions `q..` of the route, caches reused. Always terminal.
    Suffix(&'a SearchRoute, usize),
    /// Interior positions `a..=b` of some route, re-merged on demand.
    Slice(&'a SearchRoute, usize, usize),
    /// A single client visit.
    Client(usize),
    /// An interior reload-depot visit.
    Depot(usize),
}

/// A hypothetical route for a given vehicle type.
#[derive(Debug, Clone)]
pub struct RouteProposal<'a> {
    pub vehicle_type: usize,
    pub pieces: Vec<Piece<'a>>,
}

impl<'a> RouteProposal<'a> {
    pub fn new(vehicle_type: usize, pieces: Vec<Piece<'a>>) -> Self {
        RouteProposal {
            vehicle_type,
            pieces,
        }
    }
}

/// Frozen penalty weights mapping violations to cost.
#[derive(Debug, Clone, PartialEq)]
pub struct CostEvaluator {
    load_penalties: Vec<f64>,
    tw_penalty: f64,
    dist_penalty: f64,
}

impl CostEvaluator {
    pub fn new(load_penalties: Vec<f64>, tw_penalty: f64, dist_penalty: f64) -> Self {
        CostEvaluator {
            load_penalties,
            tw_penalty,
            dist_penalty,
        }
    }

    pub fn load_penalty(&self, dim: usize) -> f64 {
        self.load_penalties.get(dim).copied().unwrap_or(0.0)
    }

    pub fn tw_penalty(&self) -> f64 {
        self.tw_penalty
    }

    pub fn dist_penalty(&self) -> f64 {
        self.dist_penalty
    }

    /// Weighted violation, rounded to the integral cost scale.
    #[inline]
    fn penalise(weight: f64, amount: i64) -> Cost {
        if amount <= 0 {
            return 0;
        }
        (weight * amount as f64).round() as Cost
    }

    /// Penalised cost of a mutable search route, from its caches. Empty
    /// routes cost nothing: no fixed cost and no depot-to-depot travel.
    pub fn route_cost(&self, data: &ProblemData, route: &SearchRoute) -> Cost {
        if route.is_empty(data) {
            return 0;
        }

        let vt = data.vehicle_type(route.vehicle_type());
        let mut cost = vt.fixed_cost;
        cost = cost.saturating_add(vt.unit_distance_cost.saturating_mul(route.distance(data)));
        cost = cost.saturating_add(vt.unit_duration_cost.saturating_mul(route.duration(data)));
        cost = cost.saturating_add(vt.unit_overtime_cost.saturating_mul(route.overtime(data)));
        for dim in 0..data.num_load_dims() {
            cost = cost.saturating_add(Self::penalise(
                self.load_penalty(dim),
                route.excess_load(dim),
            ));
        }
        cost = cost.saturating_add(Self::penalise(self.tw_penalty, route.time_warp(data)));
        cost = cost.saturating_add(Self::penalise(
            self.dist_penalty,
            route.excess_distance(data),
        ));
        cost
    }

    /// Penalised cost of a hypothetical route. The proposal must start
    /// with `Start` or `Prefix` and end with `End` or `Suffix`.
    pub fn proposal_cost(&self, data: &ProblemData, proposal: &RouteProposal) -> Cost {
        let vt = data.vehicle_type(proposal.vehicle_type);
        let profile = vt.profile;
        let dims = data.num_load_dims();
        let dist_mat = data.distance_matrix(profile);
        let dur_mat = data.duration_matrix(profile);

        let mut dist: Option<DistanceSegment> = None;
        let mut dur: Option<DurationSegment> = None;
        let mut loads: Vec<LoadSegment> = vec![LoadSegment::empty(); dims];
        let mut excess_load: Vec<Load> = vec![0; dims];
        let mut closed_by_suffix = false;
        let mut num_clients = 0usize;

        let push_dist = |dist: &mut Option<DistanceSegment>, seg: DistanceSegment| {
            *dist = Some(match dist.take() {
                None => seg,
                Some(prev) => DistanceSegment::merge(dist_mat, &prev, &seg),
            });
        };
        let push_dur = |dur: &mut Option<DurationSegment>, seg: DurationSegment| {
            *dur = Some(match dur.take() {
                None => seg,
                Some(prev) => DurationSegment::merge(dur_mat, &prev, &seg),
            });
        };

        for piece in &proposal.pieces {
            match *piece {
                Piece::Start => {
                    let depot = data.location(vt.start_depot);
                    push_dist(&mut dist, DistanceSegment::new(vt.start_depot));
                    push_dur(
                        &mut dur,
                        DurationSegment::new(
                            vt.start_depot,
                            0,
                            depot.tw_early.max(vt.tw_early),
                            depot.tw_late.min(vt.tw_late),
                            0,
                        ),
                    );
                    for (dim, load) in loads.iter_mut().enumerate() {
                        let initial = vt.initial_load.get(dim).copied().unwrap_or(0);
                        *load = LoadSegment::new(0, initial, initial);
                    }
                }
                Piece::End => {
                    let depot = data.location(vt.end_depot);
                    push_dist(&mut dist, DistanceSegment::new(vt.end_depot));
                    push_dur(
                        &mut dur,
                        DurationSegment::new(
                            vt.end_depot,
                            0,
                            depot.tw_early.max(vt.tw_early),
                            depot.tw_late.min(vt.tw_late),
                            0,
                        ),
                    );
                    for (dim, load) in loads.iter_mut().enumerate() {
                        let capacity = vt.capacity.get(dim).copied().unwrap_or(0);
                        *load = load.finalise(capacity);
                    }
                }
                Piece::Prefix(route, p) => {
                    push_dist(
                        &mut dist,
                        DistanceSegment::slice(route.visit(0), route.visit(p), route.dist_before(p)),
                    );
                    push_dur(&mut dur, *route.dur_prefix(p));
                    for (dim, load) in loads.iter_mut().enumerate() {
                        *load = *route.load_prefix(dim, p);
                    }
                    num_clients += route.clients_upto(p);
                }
                Piece::Suffix(route, q) => {
                    let last = route.last();
                    push_dist(
                        &mut dist,
                        DistanceSegment::slice(route.visit(q), route.visit(last), route.dist_after(q)),
                    );
                    push_dur(&mut dur, *route.dur_suffix(q));
                    for dim in 0..dims {
                        let capacity = vt.capacity.get(dim).copied().unwrap_or(0);
                        let merged = LoadSegment::merge(&loads[dim], route.load_suffix_open(dim, q));
                        excess_load[dim] = merged
                            .excess_load(capacity)
                            .saturating_add(route.load_suffix_closed(dim, q));
                    }
                    closed_by_suffix = true;
                    num_clients += route.clients_upto(last) - route.clients_upto(q - 1);
                }
                Piece::Slice(route, a, b) => {
                    push_dist(
                        &mut dist,
                        DistanceSegment::slice(
                            route.visit(a),
                            route.visit(b),
                            route.dist_between(data, a, b, Some(profile)),
                        ),
                    );
                    push_dur(&mut dur, route.dur_between(data, a, b, Some(profile)));
                    for pos in a..=b {
                        let loc = route.visit(pos);
                        if data.is_depot(loc) {
                            for (dim, load) in loads.iter_mut().enumerate() {
                                let capacity = vt.capacity.get(dim).copied().unwrap_or(0);
                                *load = load.finalise(capacity);
                            }
                        } else {
                            for (dim, load) in loads.iter_mut().enumerate() {
                                *load = LoadSegment::merge(load, route.load_at(dim, pos));
                            }
                        }
                    }
                    num_clients += route.clients_upto(b) - route.clients_upto(a - 1);
                }
                Piece::Client(loc) => {
                    let place = data.location(loc);
                    push_dist(&mut dist, DistanceSegment::new(loc));
                    push_dur(
                        &mut dur,
                        DurationSegment::new(
                            loc,
                            place.service_duration,
                            place.tw_early,
                            place.tw_late,
                            place.release_time,
                        ),
                    );
                    for (dim, load) in loads.iter_mut().enumerate() {
                        *load = LoadSegment::merge(
                            load,
                            &LoadSegment::client(data.delivery(loc, dim), data.pickup(loc, dim)),
                        );
                    }
                    num_clients += 1;
                }
                Piece::Depot(loc) => {
                    let place = data.location(loc);
                    push_dist(&mut dist, DistanceSegment::new(loc));
                    push_dur(
                        &mut dur,
                        DurationSegment::new(
                            loc,
                            place.service_duration,
                            place.tw_early,
                            place.tw_late,
                            0,
                        ),
                    );
                    for (dim, load) in loads.iter_mut().enumerate() {
                        let capacity = vt.capacity.get(dim).copied().unwrap_or(0);
                        *load = load.finalise(capacity);
                    }
                }
            }
        }

        if num_clients == 0 {
            return 0;
        }

        if !closed_by_suffix {
            for dim in 0..dims {
                excess_load[dim] = loads[dim].excess();
            }
        }

        let dist = match dist {
            Some(seg) => seg,
            None => return 0,
        };
        let dur = match dur {
            Some(seg) => seg,
            None => return 0,
        };

        let distance = dist.distance();
        let excess_distance = dist.excess_distance(vt.max_distance);

        let duration = dur.duration();
        let excess_duration = duration.saturating_sub(vt.max_duration).max(0);
        let overtime: Duration = excess_duration.min(vt.max_overtime);
        let time_warp = dur
            .time_warp()
            .saturating_add(excess_duration.saturating_sub(vt.max_overtime).max(0));

        let mut cost = vt.fixed_cost;
        cost = cost.saturating_add(vt.unit_distance_cost.saturating_mul(distance));
        cost = cost.saturating_add(vt.unit_duration_cost.saturating_mul(duration));
        cost = cost.saturating_add(vt.unit_overtime_cost.saturating_mul(overtime));
        for dim in 0..dims {
            cost = cost.saturating_add(Self::penalise(self.load_penalty(dim), excess_load[dim]));
        }
        cost = cost.saturating_add(Self::penalise(self.tw_penalty, time_warp));
        cost = cost.saturating_add(Self::penalise(self.dist_penalty, excess_distance));
        cost
    }

    /// Penalised cost of a finalised solution: route costs, fixed vehicle
    /// costs, penalty terms and the prizes forgone on unvisited optional
    /// clients.
    pub fn penalised_cost(&self, data: &ProblemData, solution: &Solution) -> Cost {
        let mut cost = solution.uncollected_prizes();
        for route in solution.routes() {
            let vt = data.vehicle_type(route.vehicle_type());
            if route.is_empty() {
                continue;
            }
            cost = cost.saturating_add(vt.fixed_cost);
            cost = cost.saturating_add(vt.unit_distance_cost.saturating_mul(route.distance()));
            cost = cost.saturating_add(vt.unit_duration_cost.saturating_mul(route.duration()));
            cost = cost.saturating_add(vt.unit_overtime_cost.saturating_mul(route.overtime()));
            for dim in 0..data.num_load_dims() {
                cost = cost.saturating_add(Self::penalise(
                    self.load_penalty(dim),
                    route.excess_load(dim),
                ));
            }
            cost = cost.saturating_add(Self::penalise(self.tw_penalty, route.time_warp()));
            cost = cost.saturating_add(Self::penalise(self.dist_penalty, route.excess_distance()));
        }
        cost
    }

    /// Cost of a feasible, complete solution, or the infinity sentinel.
    pub fn cost(&self, data: &ProblemData, solution: &Solution) -> Cost {
        if solution.is_feasible() && solution.is_complete() {
            self.penalised_cost(data, solution)
        } else {
            Cost::MAX
        }
    }
}
