//! Adaptive penalty management.
//!
//! One weight per load dimension plus one each for time warp and excess
//! distance. Weights move multiplicatively toward a target share of
//! feasible solutions, observed over a rolling register.

use log::debug;

use crate::config::PenaltyParams;
use crate::cost::CostEvaluator;
use crate::problem::ProblemData;
use crate::solution::Solution;

/// Tracks feasibility per constraint kind and adapts the penalty weights.
#[derive(Debug, Clone)]
pub struct PenaltyManager {
    params: PenaltyParams,
    load_penalties: Vec<f64>,
    tw_penalty: f64,
    dist_penalty: f64,
    load_registry: Vec<Vec<bool>>,
    tw_registry: Vec<bool>,
    dist_registry: Vec<bool>,
}

impl PenaltyManager {
    /// Create a manager with every weight at the lower clip bound.
    pub fn new(params: PenaltyParams, num_load_dims: usize) -> Self {
        let initial = params.min_penalty.max(1.0);
        PenaltyManager {
            load_penalties: vec![initial; num_load_dims],
            tw_penalty: initial,
            dist_penalty: initial,
            load_registry: vec![Vec::new(); num_load_dims],
            tw_registry: Vec::new(),
            dist_registry: Vec::new(),
            params,
        }
    }

    /// Compute starting weights from the instance: roughly the average arc
    /// cost per unit of typical violation, clipped to the configured
    /// bounds. On prize-collecting instances the time-warp weight is
    /// raised past the largest optional prize so that tolerating a window
    /// violation never beats dropping the client.
    pub fn init_from(data: &ProblemData, params: PenaltyParams) -> Self {
        let num_locs = data.num_locations();
        let num_arcs = (num_locs * num_locs).saturating_sub(num_locs).max(1);

        let mut dist_total: f64 = 0.0;
        let mut dur_total: f64 = 0.0;
        let matrix = data.distance_matrix(0);
        let durations = data.duration_matrix(0);
        for i in 0..num_locs {
            for j in 0..num_locs {
                if i != j {
                    dist_total += matrix.get(i, j) as f64;
                    dur_total += durations.get(i, j) as f64;
                }
            }
        }
        let avg_dist = dist_total / num_arcs as f64;
        let avg_dur = dur_total / num_arcs as f64;

        let mut manager = PenaltyManager::new(params, data.num_load_dims());

        for dim in 0..data.num_load_dims() {
            let mut demand_total: f64 = 0.0;
            for client in data.client_indices() {
                demand_total += data.delivery(client, dim).max(data.pickup(client, dim)) as f64;
            }
            let avg_demand = demand_total / data.num_clients().max(1) as f64;
            manager.load_penalties[dim] = manager.clip(avg_dist / (1.0 + avg_demand));
        }

        manager.tw_penalty = manager.clip(avg_dist / (1.0 + avg_dur));
        manager.dist_penalty = manager.clip(1.0);

        let max_prize = data.max_optional_prize();
        if max_prize > 0 {
            manager.tw_penalty = manager.clip(manager.tw_penalty.max((max_prize + 1) as f64));
        }

        manager
    }

    fn clip(&self, value: f64) -> f64 {
        value.clamp(self.params.min_penalty, self.params.max_penalty)
    }

    /// Record one solution's feasibility per constraint kind; weights
    /// update whenever a register fills up.
    pub fn register(&mut self, solution: &Solution) {
        for dim in 0..self.load_penalties.len() {
            let feasible = solution
                .excess_load()
                .get(dim)
                .map_or(true, |&excess| excess == 0);
            self.load_registry[dim].push(feasible);
        }
        self.tw_registry.push(solution.time_warp() == 0);
        self.dist_registry.push(solution.excess_distance() == 0);

        let threshold = self.params.solutions_between_updates;
        let params = self.params.clone();

        for dim in 0..self.load_penalties.len() {
            if self.load_registry[dim].len() >= threshold {
                let updated = Self::updated_weight(&params, self.load_penalties[dim], &self.load_registry[dim]);
                if (updated - self.load_penalties[dim]).abs() > f64::EPSILON {
                    debug!(
                        "load penalty (dim {}) {} -> {}",
                        dim, self.load_penalties[dim], updated
                    );
                }
                self.load_penalties[dim] = updated;
                self.load_registry[dim].clear();
            }
        }

        if self.tw_registry.len() >= threshold {
            let updated = Self::updated_weight(&params, self.tw_penalty, &self.tw_registry);
            if (updated - self.tw_penalty).abs() > f64::EPSILON {
                debug!("time-warp penalty {} -> {}", self.tw_penalty, updated);
            }
            self.tw_penalty = updated;
            self.tw_registry.clear();
        }

        if self.dist_registry.len() >= threshold {
            let updated = Self::updated_weight(&params, self.dist_penalty, &self.dist_registry);
            if (updated - self.dist_penalty).abs() > f64::EPSILON {
                debug!("distance penalty {} -> {}", self.dist_penalty, updated);
            }
            self.dist_penalty = updated;
            self.dist_registry.clear();
        }
    }

    fn updated_weight(params: &PenaltyParams, current: f64, registry: &[bool]) -> f64 {
        let feasible = registry.iter().filter(|&&f| f).count();
        let rate = feasible as f64 / registry.len() as f64;

        let updated = if rate < params.target_feasible - params.feas_tolerance {
            current * params.penalty_increase
        } else if rate > params.target_feasible + params.feas_tolerance {
            current * params.penalty_decrease
        } else {
            current
        };

        updated.clamp(params.min_penalty, params.max_penalty)
    }

    /// Evaluator with the current weights.
    pub fn cost_evaluator(&self) -> CostEvaluator {
        CostEvaluator::new(
            self.load_penalties.clone(),
            self.tw_penalty,
            self.dist_penalty,
        )
    }

    /// Evaluator with every weight forced to the upper bound, used to
    /// drive a solution feasible.
    pub fn max_cost_evaluator(&self) -> CostEvaluator {
        CostEvaluator::new(
            vec![self.params.max_penalty; self.load_penalties.len()],
            self.params.max_penalty,
            self.params.max_penalty,
        )
    }

    pub fn load_penalty(&self, dim: usize) -> f64 {
        self.load_penalties[dim]
    }

    pub fn tw_penalty(&self) -> f64 {
        self.tw_penalty
    }

    pub fn dist_penalty(&self) -> f64 {
        self.dist_penalty
    }
}
