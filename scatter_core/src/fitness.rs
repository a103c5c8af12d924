use crate::executor::Executor;
use crate::goals::{Criterion, Goal};
use crate::suite::{FitnessVector, TestSuite};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// A total, deterministic score over a suite. Lower is better.
///
/// Objectives read the cached traces of the suite's tests; the aggregator makes
/// sure those are fresh before any objective is asked.
pub trait Objective: Send {
    fn name(&self) -> &str;
    fn score(&self, suite: &TestSuite) -> f64;
}

impl<O: Objective + Sync + ?Sized> Objective for Arc<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn score(&self, suite: &TestSuite) -> f64 {
        (**self).score(suite)
    }
}

/// Counts the goals of one criterion that no test in the suite covers.
///
/// Tests whose trace carries a timeout or compile failure contribute nothing.
pub struct CoverageObjective {
    name: String,
    goal_ids: Vec<String>,
}

impl CoverageObjective {
    pub fn new(criterion: Criterion, goals: &[Goal]) -> Self {
        Self {
            name: criterion.tag().to_string(),
            goal_ids: goals.iter().map(Goal::id).collect(),
        }
    }

    pub fn covered_goals(&self, suite: &TestSuite) -> usize {
        let covered: HashSet<&str> = suite
            .tests()
            .iter()
            .filter_map(|t| t.last_execution())
            .filter(|trace| !trace.has_environment_artifact())
            .flat_map(|trace| trace.covered().iter().map(String::as_str))
            .collect();
        self.goal_ids
            .iter()
            .filter(|id| covered.contains(id.as_str()))
            .count()
    }
}

impl Objective for CoverageObjective {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, suite: &TestSuite) -> f64 {
        (self.goal_ids.len() - self.covered_goals(suite)) as f64
    }
}

/// How two fitness vectors are ordered.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Aggregation {
    /// Compare the sum of all objective scores.
    #[default]
    Sum,
    /// Compare objective scores position by position.
    Lexicographic,
}

/// Orders two fitness vectors. `Ordering::Less` means `a` is better.
pub fn compare(a: &FitnessVector, b: &FitnessVector, aggregation: Aggregation) -> Ordering {
    match aggregation {
        Aggregation::Sum => a.total().total_cmp(&b.total()),
        Aggregation::Lexicographic => {
            for (x, y) in a.scores().iter().zip(b.scores()) {
                match x.value.total_cmp(&y.value) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            a.scores().len().cmp(&b.scores().len())
        }
    }
}

/// Evaluates every registered objective against a suite and attaches the results.
pub struct FitnessAggregator {
    objectives: Vec<Box<dyn Objective>>,
    aggregation: Aggregation,
}

impl FitnessAggregator {
    pub fn new(aggregation: Aggregation) -> Self {
        Self {
            objectives: Vec::new(),
            aggregation,
        }
    }

    pub fn add_objective(&mut self, objective: Box<dyn Objective>) {
        self.objectives.push(objective);
    }

    /// Re-runs every test without a fresh trace, then scores all objectives.
    ///
    /// Returns the number of tests that had to be executed.
    pub fn evaluate(&mut self, suite: &mut TestSuite, executor: &mut dyn Executor) -> usize {
        let mut executed = 0;
        for test in suite.tests_mut() {
            if test.fresh_execution().is_none() {
                let trace = executor.run(test);
                test.set_last_execution(trace);
                executed += 1;
            }
        }

        let mut fitness = FitnessVector::new();
        for objective in &self.objectives {
            let mut value = objective.score(suite);
            if value.is_nan() {
                log::warn!(
                    "Objective '{}' produced NaN, treating it as worst",
                    objective.name()
                );
                value = f64::INFINITY;
            }
            fitness.push(objective.name(), value);
        }
        suite.set_fitness(fitness);
        executed
    }

    /// True if `candidate` is strictly better than `incumbent`. Ties keep the incumbent.
    ///
    /// A suite without attached fitness never wins and never loses its place to
    /// one that was not evaluated either.
    pub fn is_better(&self, candidate: &TestSuite, incumbent: &TestSuite) -> bool {
        match (candidate.fitness(), incumbent.fitness()) {
            (Some(c), Some(i)) => compare(c, i, self.aggregation) == Ordering::Less,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}
