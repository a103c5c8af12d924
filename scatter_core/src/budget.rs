use std::fmt;
use std::time::{Duration, Instant};

/// Resource counters the search loop maintains for the budget oracle and for reporting.
#[derive(Debug, Clone)]
pub struct SearchCounters {
    pub started: Instant,
    pub iterations: u64,
    pub fitness_evaluations: u64,
    pub executed_tests: u64,
    pub accepted: u64,
}

impl SearchCounters {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            iterations: 0,
            fitness_evaluations: 0,
            executed_tests: 0,
            accepted: 0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for SearchCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// One configured limit on the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoppingCondition {
    MaxTime(Duration),
    MaxFitnessEvaluations(u64),
    MaxTests(u64),
    MaxIterations(u64),
}

impl StoppingCondition {
    pub fn is_reached(&self, counters: &SearchCounters) -> bool {
        match *self {
            StoppingCondition::MaxTime(limit) => counters.elapsed() >= limit,
            StoppingCondition::MaxFitnessEvaluations(limit) => {
                counters.fitness_evaluations >= limit
            }
            StoppingCondition::MaxTests(limit) => counters.executed_tests >= limit,
            StoppingCondition::MaxIterations(limit) => counters.iterations >= limit,
        }
    }

    fn describe(&self, counters: &SearchCounters) -> String {
        match *self {
            StoppingCondition::MaxTime(limit) => format!(
                "MaxTime: {:.1}s / {}s",
                counters.elapsed().as_secs_f64(),
                limit.as_secs()
            ),
            StoppingCondition::MaxFitnessEvaluations(limit) => format!(
                "MaxFitnessEvaluations: {} / {}",
                counters.fitness_evaluations, limit
            ),
            StoppingCondition::MaxTests(limit) => {
                format!("MaxTests: {} / {}", counters.executed_tests, limit)
            }
            StoppingCondition::MaxIterations(limit) => {
                format!("MaxIterations: {} / {}", counters.iterations, limit)
            }
        }
    }
}

/// Decides when the search must stop.
///
/// The oracle is exhausted as soon as any of its conditions is reached and stays
/// exhausted from then on, even if the counters it was given move backwards.
#[derive(Debug, Clone)]
pub struct BudgetOracle {
    conditions: Vec<StoppingCondition>,
    exhausted: bool,
    last_description: Option<String>,
}

impl BudgetOracle {
    /// Budget used when nothing else is configured.
    pub const FALLBACK: StoppingCondition = StoppingCondition::MaxTime(Duration::from_secs(60));

    pub fn new(conditions: Vec<StoppingCondition>) -> Self {
        let conditions = if conditions.is_empty() {
            vec![Self::FALLBACK]
        } else {
            conditions
        };
        Self {
            conditions,
            exhausted: false,
            last_description: None,
        }
    }

    pub fn conditions(&self) -> &[StoppingCondition] {
        &self.conditions
    }

    pub fn is_exhausted(&mut self, counters: &SearchCounters) -> bool {
        self.last_description = Some(
            self.conditions
                .iter()
                .map(|c| c.describe(counters))
                .collect::<Vec<_>>()
                .join(", "),
        );
        if !self.exhausted {
            self.exhausted = self.conditions.iter().any(|c| c.is_reached(counters));
        }
        self.exhausted
    }
}

impl fmt::Display for BudgetOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.last_description {
            Some(description) => f.write_str(description),
            None => write!(f, "{:?} (not started)", self.conditions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_when_any_condition_is_reached() {
        let mut oracle = BudgetOracle::new(vec![
            StoppingCondition::MaxIterations(3),
            StoppingCondition::MaxTests(100),
        ]);
        let mut counters = SearchCounters::new();
        assert!(!oracle.is_exhausted(&counters));
        counters.iterations = 3;
        assert!(oracle.is_exhausted(&counters));
    }

    #[test]
    fn exhaustion_latches() {
        let mut oracle = BudgetOracle::new(vec![StoppingCondition::MaxFitnessEvaluations(2)]);
        let mut counters = SearchCounters::new();
        counters.fitness_evaluations = 2;
        assert!(oracle.is_exhausted(&counters));
        counters.fitness_evaluations = 0;
        assert!(oracle.is_exhausted(&counters));
    }

    #[test]
    fn zero_budget_is_exhausted_immediately() {
        let mut oracle = BudgetOracle::new(vec![StoppingCondition::MaxTime(Duration::ZERO)]);
        assert!(oracle.is_exhausted(&SearchCounters::new()));
    }

    #[test]
    fn empty_configuration_falls_back_to_time_budget() {
        let oracle = BudgetOracle::new(vec![]);
        assert_eq!(oracle.conditions(), &[BudgetOracle::FALLBACK]);
    }

    #[test]
    fn display_describes_progress() {
        let mut oracle = BudgetOracle::new(vec![StoppingCondition::MaxTests(10)]);
        let mut counters = SearchCounters::new();
        counters.executed_tests = 4;
        oracle.is_exhausted(&counters);
        assert_eq!(oracle.to_string(), "MaxTests: 4 / 10");
    }
}
