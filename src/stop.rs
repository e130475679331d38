//! Stopping criteria for the outer search loop.

use std::time::{Duration, Instant};

use crate::error::Error;
use crate::problem::Cost;

/// A composable predicate consulted once per iteration with the best cost
/// found so far. Criteria are pure state machines; consulting one never
/// fails.
#[derive(Debug, Clone)]
pub enum StopCriterion {
    /// True on the N-th consultation.
    MaxIterations { max: u64, count: u64 },
    /// True once the wall clock has run for at least the limit. The clock
    /// starts at the first consultation.
    MaxRuntime {
        limit: Duration,
        started: Option<Instant>,
    },
    /// True after K consecutive consultations without an improvement
    /// signal.
    NoImprovement {
        max: u64,
        count: u64,
        improved: bool,
    },
    /// True as soon as the best cost is finite.
    FirstFeasible,
    /// True iff any child is true. Children are always all consulted so
    /// their internal counters stay in step.
    Any(Vec<StopCriterion>),
    /// True iff all children are true.
    All(Vec<StopCriterion>),
}

impl StopCriterion {
    /// Stop after `max` consultations; zero stops immediately. Negative
    /// values are rejected.
    pub fn max_iterations(max: i64) -> Result<Self, Error> {
        if max < 0 {
            return Err(Error::validation(vec![
                "max iterations must be non-negative".to_string(),
            ]));
        }
        Ok(StopCriterion::MaxIterations {
            max: max as u64,
            count: 0,
        })
    }

    /// Stop once `seconds` of wall-clock time have elapsed. Negative
    /// values are rejected.
    pub fn max_runtime(seconds: f64) -> Result<Self, Error> {
        if seconds < 0.0 || !seconds.is_finite() {
            return Err(Error::validation(vec![
                "max runtime must be non-negative".to_string(),
            ]));
        }
        Ok(StopCriterion::MaxRuntime {
            limit: Duration::from_secs_f64(seconds),
            started: None,
        })
    }

    /// Stop after `max` consecutive non-improving iterations; zero stops
    /// immediately. Negative values are rejected.
    pub fn no_improvement(max: i64) -> Result<Self, Error> {
        if max < 0 {
            return Err(Error::validation(vec![
                "no-improvement limit must be non-negative".to_string(),
            ]));
        }
        Ok(StopCriterion::NoImprovement {
            max: max as u64,
            count: 0,
            improved: false,
        })
    }

    /// Stop as soon as any feasible solution is known.
    pub fn first_feasible() -> Self {
        StopCriterion::FirstFeasible
    }

    /// Stop when any child fires. An empty list is rejected.
    pub fn any(children: Vec<StopCriterion>) -> Result<Self, Error> {
        if children.is_empty() {
            return Err(Error::validation(vec![
                "Any requires at least one child criterion".to_string(),
            ]));
        }
        Ok(StopCriterion::Any(children))
    }

    /// Stop when all children fire.
    pub fn all(children: Vec<StopCriterion>) -> Self {
        StopCriterion::All(children)
    }

    /// Record that the best solution improved this iteration.
    pub fn notify_improved(&mut self) {
        match self {
            StopCriterion::NoImprovement { improved, .. } => *improved = true,
            StopCriterion::Any(children) | StopCriterion::All(children) => {
                for child in children {
                    child.notify_improved();
                }
            }
            _ => {}
        }
    }

    /// Consult the criterion with the best cost found so far.
    pub fn should_stop(&mut self, best_cost: Cost) -> bool {
        match self {
            StopCriterion::MaxIterations { max, count } => {
                *count += 1;
                *count >= *max
            }
            StopCriterion::MaxRuntime { limit, started } => {
                let start = started.get_or_insert_with(Instant::now);
                start.elapsed() >= *limit
            }
            StopCriterion::NoImprovement {
                max,
                count,
                improved,
            } => {
                if *max == 0 {
                    return true;
                }
                if *improved {
                    *count = 0;
                } else {
                    *count += 1;
                }
                *improved = false;
                *count >= *max
            }
            StopCriterion::FirstFeasible => best_cost != Cost::MAX,
            StopCriterion::Any(children) => {
                let mut stop = false;
                for child in children {
                    stop |= child.should_stop(best_cost);
                }
                stop
            }
            StopCriterion::All(children) => {
                let mut stop = true;
                for child in children {
                    stop &= child.should_stop(best_cost);
                }
                stop
            }
        }
    }
}
