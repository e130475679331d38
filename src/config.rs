//! Configuration parameters for the solver.

use serde::{Deserialize, Serialize};

use crate::local_search::{NodeOpTag, RouteOpTag};

/// Parameters of the outer iterated-local-search loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IlsParams {
    /// Iterations without improvement before a restart.
    pub max_no_improvement: u64,
    /// Number of slots in the late-acceptance history buffer.
    pub history_size: usize,
}

impl Default for IlsParams {
    fn default() -> Self {
        IlsParams {
            max_no_improvement: 50_000,
            history_size: 500,
        }
    }
}

impl IlsParams {
    pub fn new() -> Self {
        IlsParams::default()
    }

    pub fn with_max_no_improvement(mut self, max_no_improvement: u64) -> Self {
        self.max_no_improvement = max_no_improvement;
        self
    }

    pub fn with_history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size.max(1);
        self
    }
}

/// Parameters of the adaptive penalty scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyParams {
    /// Registered solutions between consecutive weight updates.
    pub solutions_between_updates: usize,
    /// Multiplier applied when too few solutions are feasible.
    pub penalty_increase: f64,
    /// Multiplier applied when enough solutions are feasible.
    pub penalty_decrease: f64,
    /// Target fraction of feasible solutions.
    pub target_feasible: f64,
    /// Dead band around the target before any update happens.
    pub feas_tolerance: f64,
    pub min_penalty: f64,
    pub max_penalty: f64,
}

impl Default for PenaltyParams {
    fn default() -> Self {
        PenaltyParams {
            solutions_between_updates: 500,
            penalty_increase: 1.25,
            penalty_decrease: 0.85,
            target_feasible: 0.65,
            feas_tolerance: 0.05,
            min_penalty: 0.1,
            max_penalty: 100_000.0,
        }
    }
}

impl PenaltyParams {
    pub fn new() -> Self {
        PenaltyParams::default()
    }

    pub fn with_solutions_between_updates(mut self, count: usize) -> Self {
        self.solutions_between_updates = count.max(1);
        self
    }

    pub fn with_penalty_increase(mut self, factor: f64) -> Self {
        self.penalty_increase = factor;
        self
    }

    pub fn with_penalty_decrease(mut self, factor: f64) -> Self {
        self.penalty_decrease = factor;
        self
    }

    pub fn with_target_feasible(mut self, target: f64) -> Self {
        self.target_feasible = target;
        self
    }

    pub fn with_feas_tolerance(mut self, tolerance: f64) -> Self {
        self.feas_tolerance = tolerance;
        self
    }

    pub fn with_penalty_bounds(mut self, min: f64, max: f64) -> Self {
        self.min_penalty = min;
        self.max_penalty = max;
        self
    }
}

/// Proximity measure used when building the granular neighbour lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighbourMetric {
    /// Pure arc distance.
    Distance,
    /// Arc distance plus arc duration plus the waiting time implied by
    /// the clients' time windows.
    DistanceDuration,
}

/// Parameters of the local-search orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSearchParams {
    /// Skip the perturbation step and run pure descent.
    pub exhaustive: bool,
    /// Node operators to run, in a fixed deterministic order.
    pub node_operators: Vec<NodeOpTag>,
    /// Route operators to run during intensification.
    pub route_operators: Vec<RouteOpTag>,
    /// Route-pair centroid proximity threshold in `[0, 1]`.
    pub overlap_tolerance: f64,
    /// Number of neighbours per client in the granular search.
    pub granular_neighbours: usize,
    pub neighbour_metric: NeighbourMetric,
    /// Number of random kicks applied before descending.
    pub perturb_strength: usize,
}

impl Default for LocalSearchParams {
    fn default() -> Self {
        LocalSearchParams {
            exhaustive: false,
            node_operators: NodeOpTag::all(),
            route_operators: RouteOpTag::all(),
            overlap_tolerance: 0.05,
            granular_neighbours: 40,
            neighbour_metric: NeighbourMetric::DistanceDuration,
            perturb_strength: 6,
        }
    }
}

impl LocalSearchParams {
    pub fn new() -> Self {
        LocalSearchParams::default()
    }

    pub fn with_exhaustive(mut self, exhaustive: bool) -> Self {
        self.exhaustive = exhaustive;
        self
    }

    pub fn with_node_operators(mut self, operators: Vec<NodeOpTag>) -> Self {
        self.node_operators = operators;
        self
    }

    pub fn with_route_operators(mut self, operators: Vec<RouteOpTag>) -> Self {
        self.route_operators = operators;
        self
    }

    pub fn with_overlap_tolerance(mut self, tolerance: f64) -> Self {
        self.overlap_tolerance = tolerance.clamp(0.0, 1.0);
        self
    }

    pub fn with_granular_neighbours(mut self, count: usize) -> Self {
        self.granular_neighbours = count.max(1);
        self
    }

    pub fn with_neighbour_metric(mut self, metric: NeighbourMetric) -> Self {
        self.neighbour_metric = metric;
        self
    }

    pub fn with_perturb_strength(mut self, strength: usize) -> Self {
        self.perturb_strength = strength;
        self
    }
}

/// Everything the `solve` entry point needs besides the problem itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveOptions {
    pub seed: u64,
    pub ils: IlsParams,
    pub penalty: PenaltyParams,
    pub local_search: LocalSearchParams,
    /// Convenience limit merged into the stop criterion.
    pub max_iterations: Option<u64>,
    /// Convenience wall-clock limit in seconds, merged into the stop
    /// criterion.
    pub max_runtime: Option<f64>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            seed: 0,
            ils: IlsParams::default(),
            penalty: PenaltyParams::default(),
            local_search: LocalSearchParams::default(),
            max_iterations: None,
            max_runtime: None,
        }
    }
}

impl SolveOptions {
    pub fn new() -> Self {
        SolveOptions::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_ils(mut self, ils: IlsParams) -> Self {
        self.ils = ils;
        self
    }

    pub fn with_penalty(mut self, penalty: PenaltyParams) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_local_search(mut self, local_search: LocalSearchParams) -> Self {
        self.local_search = local_search;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_max_runtime(mut self, seconds: f64) -> Self {
        self.max_runtime = Some(seconds);
        self
    }
}
