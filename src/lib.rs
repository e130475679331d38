//! # ILS-VRP
//!
//! A Rust implementation of iterated local search with late-acceptance
//! hill-climbing (LAHC) for rich vehicle routing problems: heterogeneous
//! fleets, time windows, shift and distance limits, multi-trip reloads,
//! pickup-and-delivery loads, prize-collecting optional clients,
//! multi-depot instances and per-vehicle matrix profiles.
//!
//! The search combines an incremental route representation with a
//! segment-concatenation cost algebra, a granular local search over a
//! closed set of move operators, and an adaptive penalty scheme that
//! steers the share of feasible solutions. Solves are deterministic for a
//! fixed `(problem, seed, options)` triple.

pub mod config;
pub mod cost;
pub mod error;
pub mod lahc;
pub mod local_search;
pub mod penalty;
pub mod problem;
pub mod route;
pub mod segment;
pub mod solution;
pub mod stop;

use std::time::{Duration, Instant};

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::SolveOptions;
use crate::error::Error;
use crate::lahc::LahcBuffer;
use crate::local_search::{LocalSearch, SearchStatistics};
use crate::penalty::PenaltyManager;
use crate::problem::{Cost, ProblemData};
use crate::solution::Solution;
use crate::stop::StopCriterion;

/// Cost bookkeeping over a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveStats {
    pub initial_cost: Cost,
    pub final_cost: Cost,
}

/// Outcome of a solve: the best solution found and how the search went.
/// `best` has cost [`Cost::MAX`] iff no feasible, complete solution was
/// found.
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub best: Solution,
    pub stats: SolveStats,
    pub num_iterations: u64,
    pub runtime: Duration,
    pub search: SearchStatistics,
}

/// The main algorithm structure: an outer iterated-local-search loop with
/// LAHC acceptance and restart on stagnation.
pub struct IlsAlgorithm {
    pub data: ProblemData,
    pub options: SolveOptions,
    pub penalty_manager: PenaltyManager,
    pub local_search: LocalSearch,
    pub best: Solution,
    pub current: Solution,
    pub iterations: u64,
    pub iterations_without_improvement: u64,
    lahc: LahcBuffer,
    rng: ChaCha8Rng,
}

impl IlsAlgorithm {
    /// Create a new solver instance for the given problem and options.
    pub fn new(data: ProblemData, options: SolveOptions) -> Self {
        let penalty_manager = PenaltyManager::init_from(&data, options.penalty.clone());
        let local_search = LocalSearch::new(&data, options.local_search.clone(), options.seed);
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed.wrapping_add(1));
        let current = random_solution(&data, &mut rng);
        let best = current.clone();
        let lahc = LahcBuffer::new(options.ils.history_size);

        IlsAlgorithm {
            data,
            options,
            penalty_manager,
            local_search,
            best,
            current,
            iterations: 0,
            iterations_without_improvement: 0,
            lahc,
            rng,
        }
    }

    /// Run until the stop criterion fires; returns the best solution seen.
    pub fn run(&mut self, stop: &mut StopCriterion) -> Result<SolveResult, Error> {
        let started = Instant::now();

        let mut best_cost = self
            .penalty_manager
            .cost_evaluator()
            .cost(&self.data, &self.best);
        let initial_cost = best_cost;

        loop {
            let cost_evaluator = self.penalty_manager.cost_evaluator();
            let candidate = self
                .local_search
                .intensify(&self.data, &self.current, &cost_evaluator);

            self.penalty_manager.register(&candidate);

            let candidate_cost = cost_evaluator.cost(&self.data, &candidate);
            let candidate_penalised = cost_evaluator.penalised_cost(&self.data, &candidate);
            let current_penalised = cost_evaluator.penalised_cost(&self.data, &self.current);

            if candidate_cost < best_cost {
                info!(
                    "iteration {}: new best cost {}",
                    self.iterations, candidate_cost
                );
                self.best = candidate.clone();
                best_cost = candidate_cost;
                self.iterations_without_improvement = 0;
                stop.notify_improved();
            }

            // Late acceptance: beat the current iterate, or the iterate
            // from `history_size` accepted decisions ago.
            let accept = candidate_penalised < current_penalised
                || self
                    .lahc
                    .peek()
                    .map_or(true, |past| candidate_penalised < past);

            if accept {
                self.lahc.append(candidate_penalised);
                self.current = candidate;
            } else {
                self.lahc.skip();
            }

            self.iterations += 1;
            self.iterations_without_improvement += 1;

            if self.iterations_without_improvement >= self.options.ils.max_no_improvement {
                debug!("iteration {}: stagnated, restarting", self.iterations);
                let restart = random_solution(&self.data, &mut self.rng);
                self.current = self.local_search.intensify(
                    &self.data,
                    &restart,
                    &self.penalty_manager.max_cost_evaluator(),
                );
                self.lahc.clear();
                self.iterations_without_improvement = 0;
            }

            if stop.should_stop(best_cost) {
                break;
            }
        }

        Ok(SolveResult {
            best: self.best.clone(),
            stats: SolveStats {
                initial_cost,
                final_cost: best_cost,
            },
            num_iterations: self.iterations,
            runtime: started.elapsed(),
            search: self.local_search.statistics().clone(),
        })
    }
}

/// Solve with a stop criterion assembled from the options' convenience
/// limits. At least one of `max_iterations` and `max_runtime` must be set.
pub fn solve(data: &ProblemData, options: &SolveOptions) -> Result<SolveResult, Error> {
    let mut criteria = Vec::new();
    if let Some(n) = options.max_iterations {
        criteria.push(StopCriterion::max_iterations(n as i64)?);
    }
    if let Some(seconds) = options.max_runtime {
        criteria.push(StopCriterion::max_runtime(seconds)?);
    }
    if criteria.is_empty() {
        return Err(Error::validation(vec![
            "no stopping criterion: set max_iterations or max_runtime".to_string(),
        ]));
    }

    solve_with_stop(data, options, StopCriterion::any(criteria)?)
}

/// Solve with an explicit stop criterion.
pub fn solve_with_stop(
    data: &ProblemData,
    options: &SolveOptions,
    mut stop: StopCriterion,
) -> Result<SolveResult, Error> {
    let mut algorithm = IlsAlgorithm::new(data.clone(), options.clone());
    algorithm.run(&mut stop)
}

/// A random assignment of clients to vehicles: each required client is
/// planned, optional clients are planned too, and mutually exclusive
/// groups contribute their first drawn member only.
fn random_solution(data: &ProblemData, rng: &mut ChaCha8Rng) -> Solution {
    let mut clients: Vec<usize> = data.client_indices().collect();
    clients.shuffle(rng);

    let mut vehicles: Vec<usize> = Vec::with_capacity(data.num_vehicles());
    for (vt_idx, vt) in data.vehicle_types().iter().enumerate() {
        for _ in 0..vt.num_available {
            vehicles.push(vt_idx);
        }
    }

    let mut routes: Vec<(usize, Vec<usize>)> =
        vehicles.into_iter().map(|vt| (vt, Vec::new())).collect();

    let mut group_used = vec![false; data.groups().len()];
    let mut slot = 0;
    for client in clients {
        if let Some(group_idx) = data.location(client).group {
            if data.group(group_idx).mutually_exclusive {
                if group_used[group_idx] {
                    continue;
                }
                group_used[group_idx] = true;
            }
        }
        let idx = slot % routes.len();
        routes[idx].1.push(client);
        slot += 1;
    }

    Solution::new(data, routes)
}
