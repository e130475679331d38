//! SWAP* between-route exchange: for a pair of overlapping routes, swap
//! one client from each while simultaneously choosing the best reinsertion
//! position for both, including the in-place swap.

use crate::cost::CostEvaluator;
use crate::problem::{Cost, ProblemData};

use super::{interior_cost, LocalSearch};

struct SwapStarPlan {
    delta: Cost,
    a_interior: Vec<usize>,
    b_interior: Vec<usize>,
}

impl LocalSearch {
    /// Best SWAP* delta between the two routes; zero when the pair fails
    /// the overlap test or no swap is representable.
    pub fn evaluate_swap_star(
        &self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        r1: usize,
        r2: usize,
    ) -> Cost {
        self.plan_swap_star(data, cost_evaluator, r1, r2)
            .map_or(0, |plan| plan.delta)
    }

    pub fn apply_swap_star(
        &mut self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        r1: usize,
        r2: usize,
    ) {
        let plan = match self.plan_swap_star(data, cost_evaluator, r1, r2) {
            Some(plan) => plan,
            None => return,
        };

        let (route_a, route_b) = self.two_routes_mut(r1, r2);
        route_a.set_interior(&plan.a_interior);
        route_b.set_interior(&plan.b_interior);

        self.update_route(data, r1);
        self.update_route(data, r2);
    }

    fn plan_swap_star(
        &self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        r1: usize,
        r2: usize,
    ) -> Option<SwapStarPlan> {
        let route_a = &self.routes[r1];
        let route_b = &self.routes[r2];

        if route_a.is_empty(data) || route_b.is_empty(data) {
            return None;
        }
        if !route_a.overlaps_with(route_b, self.params.overlap_tolerance) {
            return None;
        }

        let current = cost_evaluator
            .route_cost(data, route_a)
            .saturating_add(cost_evaluator.route_cost(data, route_b));

        let a_interior = route_a.interior().to_vec();
        let b_interior = route_b.interior().to_vec();

        let mut best: Option<SwapStarPlan> = None;

        for (pa, &u_loc) in a_interior.iter().enumerate() {
            if data.is_depot(u_loc) {
                continue;
            }

            for (pb, &v_loc) in b_interior.iter().enumerate() {
                if data.is_depot(v_loc) {
                    continue;
                }

                let mut a_rest = a_interior.clone();
                a_rest.remove(pa);
                let mut b_rest = b_interior.clone();
                b_rest.remove(pb);

                // Cheap top-3 slots per side, plus the vacated spot for
                // the in-place swap.
                let mut a_slots = top_insertion_slots(data, route_a.vehicle_type(), &a_rest, v_loc);
                if !a_slots.contains(&pa) {
                    a_slots.push(pa);
                }
                let mut b_slots = top_insertion_slots(data, route_b.vehicle_type(), &b_rest, u_loc);
                if !b_slots.contains(&pb) {
                    b_slots.push(pb);
                }

                for &sa in &a_slots {
                    let mut a_new = a_rest.clone();
                    a_new.insert(sa, v_loc);
                    let a_cost =
                        interior_cost(data, cost_evaluator, route_a.vehicle_type(), &a_new);

                    for &sb in &b_slots {
                        let mut b_new = b_rest.clone();
                        b_new.insert(sb, u_loc);
                        let b_cost =
                            interior_cost(data, cost_evaluator, route_b.vehicle_type(), &b_new);

                        let delta = a_cost.saturating_add(b_cost).saturating_sub(current);
                        if best.as_ref().map_or(true, |b| delta < b.delta) {
                            best = Some(SwapStarPlan {
                                delta,
                                a_interior: a_new.clone(),
                                b_interior: b_new,
                            });
                        }
                    }
                }
            }
        }

        best
    }
}

/// Up to three cheapest insertion slots by arc-distance delta, slot 0
/// meaning "before the first interior visit".
fn top_insertion_slots(
    data: &ProblemData,
    vehicle_type: usize,
    interior: &[usize],
    client: usize,
) -> Vec<usize> {
    let vt = data.vehicle_type(vehicle_type);
    let matrix = data.distance_matrix(vt.profile);

    let mut scored: Vec<(i64, usize)> = (0..=interior.len())
        .map(|slot| {
            let prev = if slot == 0 {
                vt.start_depot
            } else {
                interior[slot - 1]
            };
            let next = if slot == interior.len() {
                vt.end_depot
            } else {
                interior[slot]
            };
            let delta = matrix
                .get(prev, client)
                .saturating_add(matrix.get(client, next))
                .saturating_sub(matrix.get(prev, next));
            (delta, slot)
        })
        .collect();

    scored.sort_unstable();
    scored.truncate(3);
    scored.into_iter().map(|(_, slot)| slot).collect()
}
