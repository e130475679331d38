//! Whole-route exchange between two routes of different vehicle types.

use crate::cost::CostEvaluator;
use crate::problem::{Cost, ProblemData};

use super::{interior_cost, LocalSearch};

impl LocalSearch {
    /// Exact delta of exchanging the visit sequences of the two routes;
    /// zero for same-type pairs, self-pairs and both-empty pairs.
    pub fn evaluate_swap_routes(
        &self,
        data: &ProblemData,
        cost_evaluator: &CostEvaluator,
        r1: usize,
        r2: usize,
    ) -> Cost {
        if r1 == r2 {
            return 0;
        }

        let route_a = &self.routes[r1];
        let route_b = &self.routes[r2];

        if route_a.vehicle_type() == route_b.vehicle_type() {
            return 0;
        }
        if route_a.is_empty(data) && route_b.is_empty(data) {
            return 0;
        }
        if !sequence_fits(data, route_a.vehicle_type(), route_b.interior())
            || !sequence_fits(data, route_b.vehicle_type(), route_a.interior())
        {
            return 0;
        }

        let current = cost_evaluator
            .route_cost(data, route_a)
            .saturating_add(cost_evaluator.route_cost(data, route_b));

        interior_cost(data, cost_evaluator, route_a.vehicle_type(), route_b.interior())
            .saturating_add(interior_cost(
                data,
                cost_evaluator,
                route_b.vehicle_type(),
                route_a.interior(),
            ))
            .saturating_sub(current)
    }

    pub fn apply_swap_routes(&mut self, data: &ProblemData, r1: usize, r2: usize) {
        let (route_a, route_b) = self.two_routes_mut(r1, r2);
        let a_interior = route_a.interior().to_vec();
        let b_interior = route_b.interior().to_vec();
        route_a.set_interior(&b_interior);
        route_b.set_interior(&a_interior);

        self.update_route(data, r1);
        self.update_route(data, r2);
    }
}

/// Whether a visit sequence is admissible for a vehicle type: trip cap
/// honoured and every interior depot in its reload set.
fn sequence_fits(data: &ProblemData, vehicle_type: usize, interior: &[usize]) -> bool {
    let vt = data.vehicle_type(vehicle_type);
    let mut reloads = 0;
    for &loc in interior {
        if data.is_depot(loc) {
            reloads += 1;
            if !vt.reload_depots.contains(&loc) {
                return false;
            }
        }
    }
    1 + reloads <= vt.max_trips()
}
