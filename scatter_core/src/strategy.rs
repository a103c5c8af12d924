use crate::budget::{BudgetOracle, SearchCounters};
use crate::executor::Executor;
use crate::factory::ChromosomeFactory;
use crate::fitness::{Aggregation, CoverageObjective, FitnessAggregator, Objective};
use crate::goals::{GoalProvider, GoalSet};
use crate::sanitizer::{Verdict, sanitize};
use crate::suite::{FitnessVector, TestSuite};
use crate::telemetry::{Counter, TelemetrySink};
use crate::testcase::TestCase;
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use std::sync::Arc;

/// Everything a strategy may touch while it runs.
///
/// The strategy owns the incumbent; the environment only lends it collaborators
/// and keeps the counters the budget oracle looks at.
pub struct SearchEnv<'a> {
    pub executor: &'a mut dyn Executor,
    pub aggregator: &'a mut FitnessAggregator,
    pub budget: &'a mut BudgetOracle,
    pub telemetry: &'a mut dyn TelemetrySink,
    pub rng: &'a mut dyn RngCore,
    pub counters: SearchCounters,
}

impl SearchEnv<'_> {
    /// Scores `suite` against every objective and updates the counters.
    pub fn evaluate(&mut self, suite: &mut TestSuite) {
        let executed = self.aggregator.evaluate(suite, &mut *self.executor);
        self.counters.fitness_evaluations += 1;
        self.counters.executed_tests += executed as u64;
    }

    pub fn is_finished(&mut self) -> bool {
        self.budget.is_exhausted(&self.counters)
    }
}

/// A way of producing a suite from random candidates.
pub trait Strategy: Send {
    fn name(&self) -> &'static str;
    fn generate_random(&mut self, env: &mut SearchEnv<'_>) -> TestSuite;
}

/// Accept-if-better search shared by the hill-climbing strategies.
///
/// Each iteration asks `propose` for a trial built from nothing but the incumbent
/// (which it must not alter) and fresh randomness, scores it, and keeps it only
/// if it is strictly better. The budget is polled once before every iteration.
///
/// The incumbent is always re-scored first; any fitness it arrives with may come
/// from a different set of objectives.
pub fn climb<P>(env: &mut SearchEnv<'_>, mut incumbent: TestSuite, mut propose: P) -> TestSuite
where
    P: FnMut(&TestSuite, &mut dyn RngCore) -> TestSuite,
{
    env.evaluate(&mut incumbent);

    while !env.is_finished() {
        let mut trial = propose(&incumbent, &mut *env.rng);
        env.evaluate(&mut trial);
        env.counters.iterations += 1;

        log::debug!(
            "Old fitness: {:?}, new fitness: {:?}",
            incumbent.fitness().map(FitnessVector::total),
            trial.fitness().map(FitnessVector::total)
        );

        if env.aggregator.is_better(&trial, &incumbent) {
            incumbent = trial;
            env.counters.accepted += 1;
            env.telemetry.report_accepted(&incumbent);
        }
    }
    incumbent
}

/// Grows one suite a test at a time, keeping each new test only if it improves fitness.
pub struct RandomTestCaseSearch {
    factory: Box<dyn ChromosomeFactory<TestCase>>,
    initial: TestSuite,
}

impl RandomTestCaseSearch {
    pub fn new(factory: Box<dyn ChromosomeFactory<TestCase>>) -> Self {
        Self {
            factory,
            initial: TestSuite::new(),
        }
    }

    /// Starts the search from `suite` instead of an empty suite.
    pub fn with_initial_suite(mut self, suite: TestSuite) -> Self {
        self.initial = suite;
        self
    }
}

impl Strategy for RandomTestCaseSearch {
    fn name(&self) -> &'static str {
        "random-test-case"
    }

    fn generate_random(&mut self, env: &mut SearchEnv<'_>) -> TestSuite {
        log::info!("* Using random test case generation");
        let factory = &mut self.factory;
        climb(env, std::mem::take(&mut self.initial), |incumbent, rng| {
            incumbent.with_test(factory.next(rng))
        })
    }
}

/// Draws whole suites and keeps the best one seen so far.
pub struct RandomTestSuiteSearch {
    factory: Box<dyn ChromosomeFactory<TestSuite>>,
}

impl RandomTestSuiteSearch {
    pub fn new(factory: Box<dyn ChromosomeFactory<TestSuite>>) -> Self {
        Self { factory }
    }
}

impl Strategy for RandomTestSuiteSearch {
    fn name(&self) -> &'static str {
        "random-test-suite"
    }

    fn generate_random(&mut self, env: &mut SearchEnv<'_>) -> TestSuite {
        log::info!("* Using random test suite generation");
        let factory = &mut self.factory;
        climb(env, TestSuite::new(), |_incumbent, rng| factory.next(rng))
    }
}

/// Generates a fixed number of tests, keeping every one that runs or can be truncated.
///
/// There is no competition between tests here and the budget oracle is not consulted.
pub struct FixedNumRandomTests {
    factory: Box<dyn ChromosomeFactory<TestCase>>,
    count: usize,
}

impl FixedNumRandomTests {
    pub fn new(factory: Box<dyn ChromosomeFactory<TestCase>>, count: usize) -> Self {
        Self { factory, count }
    }
}

impl Strategy for FixedNumRandomTests {
    fn name(&self) -> &'static str {
        "fixed-num-random-tests"
    }

    fn generate_random(&mut self, env: &mut SearchEnv<'_>) -> TestSuite {
        log::info!("* Generating fixed number of random test cases");
        let mut suite = TestSuite::new();
        let mut discarded = 0u64;
        let mut truncated = 0u64;

        for i in 0..self.count {
            log::debug!("Current test: {}/{}", i, self.count);
            let test = self.factory.next(&mut *env.rng);
            env.counters.iterations += 1;
            env.counters.executed_tests += 1;

            match sanitize(test, &mut *env.executor) {
                Verdict::Keep(test) => suite.add_test(test),
                Verdict::Truncated(test) => {
                    truncated += 1;
                    suite.add_test(test);
                }
                Verdict::Discard(_) => discarded += 1,
            }
        }

        env.telemetry
            .report_counter(Counter::DiscardedTests, discarded as f64);
        env.telemetry
            .report_counter(Counter::TruncatedTests, truncated as f64);
        suite
    }
}

/// The result of one generation run.
#[derive(Debug)]
pub struct GenerationOutcome<T> {
    pub suite: TestSuite,
    pub counters: SearchCounters,
    pub total_goals: usize,
    pub covered_goals: usize,
    pub budget: String,
    pub telemetry: T,
}

/// Wires goal enumeration, objectives and a strategy into one run.
pub struct TestGenerator<T: TelemetrySink> {
    strategy: Box<dyn Strategy>,
    executor: Box<dyn Executor>,
    telemetry: T,
    goal_providers: Vec<Box<dyn GoalProvider>>,
    extra_objectives: Vec<Box<dyn Objective>>,
    aggregation: Aggregation,
    budget: BudgetOracle,
    rng: Box<dyn RngCore + Send>,
    testable_methods: Option<usize>,
}

impl<T: TelemetrySink> TestGenerator<T> {
    pub fn new(strategy: Box<dyn Strategy>, executor: Box<dyn Executor>, telemetry: T) -> Self {
        Self {
            strategy,
            executor,
            telemetry,
            goal_providers: Vec::new(),
            extra_objectives: Vec::new(),
            aggregation: Aggregation::default(),
            budget: BudgetOracle::new(Vec::new()),
            rng: Box::new(ChaCha8Rng::from_seed([0u8; 32])),
            testable_methods: None,
        }
    }

    pub fn with_goal_provider(mut self, provider: Box<dyn GoalProvider>) -> Self {
        self.goal_providers.push(provider);
        self
    }

    /// Registers an objective evaluated after the per-criterion coverage objectives.
    pub fn with_objective(mut self, objective: Box<dyn Objective>) -> Self {
        self.extra_objectives.push(objective);
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_budget(mut self, budget: BudgetOracle) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = rng;
        self
    }

    /// Number of methods the factories can call. Zero short-circuits generation.
    pub fn with_testable_methods(mut self, count: usize) -> Self {
        self.testable_methods = Some(count);
        self
    }

    pub fn generate_tests(mut self) -> GenerationOutcome<T> {
        if self.testable_methods == Some(0) {
            log::info!("* Found no testable methods in the target");
            return GenerationOutcome {
                suite: TestSuite::new(),
                counters: SearchCounters::new(),
                total_goals: 0,
                covered_goals: 0,
                budget: self.budget.to_string(),
                telemetry: self.telemetry,
            };
        }

        log::info!("* Total number of test goals: ");
        let goals = GoalSet::enumerate(&self.goal_providers);
        self.telemetry
            .report_counter(Counter::TotalGoals, goals.len() as f64);

        let mut aggregator = FitnessAggregator::new(self.aggregation);
        let coverage: Vec<Arc<CoverageObjective>> = goals
            .groups()
            .iter()
            .map(|(criterion, group)| Arc::new(CoverageObjective::new(*criterion, group)))
            .collect();
        for objective in &coverage {
            aggregator.add_objective(Box::new(Arc::clone(objective)));
        }
        for objective in self.extra_objectives.drain(..) {
            aggregator.add_objective(objective);
        }

        let mut env = SearchEnv {
            executor: self.executor.as_mut(),
            aggregator: &mut aggregator,
            budget: &mut self.budget,
            telemetry: &mut self.telemetry,
            rng: self.rng.as_mut(),
            counters: SearchCounters::new(),
        };

        let mut suite = self.strategy.generate_random(&mut env);
        if suite.fitness().is_none() {
            env.evaluate(&mut suite);
        }
        let counters = env.counters.clone();

        let covered_goals: usize = coverage.iter().map(|c| c.covered_goals(&suite)).sum();
        let reports = [
            (Counter::CoveredGoals, covered_goals as f64),
            (Counter::FitnessEvaluations, counters.fitness_evaluations as f64),
            (Counter::ExecutedTests, counters.executed_tests as f64),
            (Counter::Iterations, counters.iterations as f64),
            (Counter::AcceptedCandidates, counters.accepted as f64),
            (Counter::SuiteSize, suite.len() as f64),
            (Counter::SuiteLength, suite.total_length() as f64),
        ];
        for (counter, value) in reports {
            self.telemetry.report_counter(counter, value);
        }

        log::info!("* Search Budget:");
        log::info!("\t- {}", self.budget);

        GenerationOutcome {
            suite,
            counters,
            total_goals: goals.len(),
            covered_goals,
            budget: self.budget.to_string(),
            telemetry: self.telemetry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::StoppingCondition;
    use crate::executor::{ExecutionContext, InProcessExecutor};
    use crate::factory::{CallSignature, RandomLengthTestFactory, TestSuiteFactory};
    use crate::fitness::compare;
    use crate::goals::{BranchGoals, MethodGoals};
    use crate::telemetry::RecordingTelemetry;
    use crate::testcase::Statement;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn call(target: &str) -> TestCase {
        TestCase::from_statements(vec![Statement::new(target, vec![])])
    }

    fn calls(targets: &[&str]) -> TestCase {
        TestCase::from_statements(targets.iter().map(|t| Statement::new(*t, vec![])).collect())
    }

    struct ScriptedTests {
        queue: VecDeque<TestCase>,
        draws: Arc<AtomicUsize>,
    }

    impl ScriptedTests {
        fn new(tests: Vec<TestCase>) -> (Self, Arc<AtomicUsize>) {
            let draws = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    queue: tests.into(),
                    draws: draws.clone(),
                },
                draws,
            )
        }
    }

    impl ChromosomeFactory<TestCase> for ScriptedTests {
        fn name(&self) -> &'static str {
            "scripted"
        }
        fn next(&mut self, _rng: &mut dyn RngCore) -> TestCase {
            self.draws.fetch_add(1, Ordering::SeqCst);
            self.queue.pop_front().unwrap_or_default()
        }
    }

    struct ScriptedSuites(VecDeque<TestSuite>);

    impl ChromosomeFactory<TestSuite> for ScriptedSuites {
        fn name(&self) -> &'static str {
            "scripted-suites"
        }
        fn next(&mut self, _rng: &mut dyn RngCore) -> TestSuite {
            self.0.pop_front().unwrap_or_default()
        }
    }

    /// Scores a suite by the comma-joined targets of all its statements.
    struct TableObjective(HashMap<String, f64>);

    impl TableObjective {
        fn new(entries: &[(&str, f64)]) -> Self {
            Self(entries.iter().map(|(k, v)| (k.to_string(), *v)).collect())
        }
    }

    impl Objective for TableObjective {
        fn name(&self) -> &str {
            "table"
        }
        fn score(&self, suite: &TestSuite) -> f64 {
            let key = suite
                .tests()
                .iter()
                .flat_map(|t| t.statements())
                .map(|s| s.target.as_str())
                .collect::<Vec<_>>()
                .join(",");
            self.0.get(&key).copied().unwrap_or(f64::INFINITY)
        }
    }

    fn quiet_executor() -> Box<dyn Executor> {
        Box::new(InProcessExecutor::new(
            |_s: &Statement, _ctx: &mut ExecutionContext<()>| Ok(()),
        ))
    }

    fn iterations(n: u64) -> BudgetOracle {
        BudgetOracle::new(vec![StoppingCondition::MaxIterations(n)])
    }

    #[test]
    fn incremental_search_keeps_only_improving_tests() {
        let (factory, draws) = ScriptedTests::new(vec![call("A"), call("B")]);
        let outcome = TestGenerator::new(
            Box::new(RandomTestCaseSearch::new(Box::new(factory))),
            quiet_executor(),
            RecordingTelemetry::new(),
        )
        .with_objective(Box::new(TableObjective::new(&[
            ("", 10.0),
            ("A", 8.0),
            ("A,B", 9.0),
        ])))
        .with_budget(iterations(2))
        .generate_tests();

        assert_eq!(draws.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.suite.len(), 1);
        assert_eq!(outcome.suite.tests()[0].statements()[0].target, "A");
        assert_eq!(outcome.suite.fitness().unwrap().total(), 8.0);
        assert_eq!(outcome.counters.accepted, 1);
        assert_eq!(outcome.telemetry.accepted.len(), 1);
        assert_eq!(outcome.counters.fitness_evaluations, 3);
    }

    #[test]
    fn equal_fitness_keeps_incumbent() {
        let (factory, _) = ScriptedTests::new(vec![call("A")]);
        let outcome = TestGenerator::new(
            Box::new(RandomTestCaseSearch::new(Box::new(factory))),
            quiet_executor(),
            RecordingTelemetry::new(),
        )
        .with_objective(Box::new(TableObjective::new(&[("", 5.0), ("A", 5.0)])))
        .with_budget(iterations(1))
        .generate_tests();

        assert!(outcome.suite.is_empty());
        assert!(outcome.telemetry.accepted.is_empty());
    }

    #[test]
    fn exhausted_budget_returns_baseline_without_drawing() {
        let (factory, draws) = ScriptedTests::new(vec![call("A")]);
        let outcome = TestGenerator::new(
            Box::new(RandomTestCaseSearch::new(Box::new(factory))),
            quiet_executor(),
            RecordingTelemetry::new(),
        )
        .with_objective(Box::new(TableObjective::new(&[("", 10.0), ("A", 1.0)])))
        .with_budget(iterations(0))
        .generate_tests();

        assert_eq!(draws.load(Ordering::SeqCst), 0);
        assert!(outcome.suite.is_empty());
        assert_eq!(outcome.suite.fitness().unwrap().total(), 10.0);
        assert_eq!(outcome.counters.iterations, 0);
    }

    #[test]
    fn initial_suite_seeds_the_incumbent() {
        let (factory, _) = ScriptedTests::new(vec![call("B")]);
        let search = RandomTestCaseSearch::new(Box::new(factory))
            .with_initial_suite(TestSuite::from_tests(vec![call("A")]));
        let outcome = TestGenerator::new(Box::new(search), quiet_executor(), RecordingTelemetry::new())
            .with_objective(Box::new(TableObjective::new(&[("A", 4.0), ("A,B", 2.0)])))
            .with_budget(iterations(1))
            .generate_tests();

        assert_eq!(outcome.suite.len(), 2);
        assert_eq!(outcome.suite.fitness().unwrap().total(), 2.0);
    }

    #[test]
    fn initial_suite_is_rescored_under_current_objectives() {
        let mut seed = TestSuite::from_tests(vec![call("A")]);
        let mut earlier = FitnessVector::new();
        earlier.push("table", 1.0);
        seed.set_fitness(earlier);

        let (factory, _) = ScriptedTests::new(vec![call("B")]);
        let search = RandomTestCaseSearch::new(Box::new(factory)).with_initial_suite(seed);
        let outcome = TestGenerator::new(Box::new(search), quiet_executor(), RecordingTelemetry::new())
            .with_objective(Box::new(TableObjective::new(&[("A", 50.0), ("A,B", 10.0)])))
            .with_budget(iterations(1))
            .generate_tests();

        assert_eq!(outcome.suite.len(), 2);
        assert_eq!(outcome.suite.fitness().unwrap().total(), 10.0);
        assert_eq!(outcome.counters.accepted, 1);
    }

    #[test]
    fn suite_search_with_exhausted_budget_draws_nothing() {
        let (tests, draws) = ScriptedTests::new(vec![call("A"), call("B")]);
        let suites = TestSuiteFactory::new(Box::new(tests), 1, 2);
        let outcome = TestGenerator::new(
            Box::new(RandomTestSuiteSearch::new(Box::new(suites))),
            quiet_executor(),
            RecordingTelemetry::new(),
        )
        .with_objective(Box::new(TableObjective::new(&[("", 10.0), ("A", 1.0)])))
        .with_budget(iterations(0))
        .generate_tests();

        assert_eq!(draws.load(Ordering::SeqCst), 0);
        assert!(outcome.suite.is_empty());
        assert_eq!(outcome.suite.fitness().unwrap().total(), 10.0);
        assert_eq!(outcome.counters.iterations, 0);
        assert!(outcome.telemetry.accepted.is_empty());
    }

    #[test]
    fn suite_search_replaces_incumbent_wholesale() {
        let suites = vec![
            TestSuite::from_tests(vec![call("A")]),
            TestSuite::from_tests(vec![call("B"), call("C")]),
            TestSuite::from_tests(vec![call("D")]),
        ];
        let outcome = TestGenerator::new(
            Box::new(RandomTestSuiteSearch::new(Box::new(ScriptedSuites(suites.into())))),
            quiet_executor(),
            RecordingTelemetry::new(),
        )
        .with_objective(Box::new(TableObjective::new(&[
            ("", 10.0),
            ("A", 5.0),
            ("B,C", 7.0),
            ("D", 3.0),
        ])))
        .with_budget(iterations(3))
        .generate_tests();

        let accepted: Vec<f64> = outcome
            .telemetry
            .accepted
            .iter()
            .map(|s| s.fitness().unwrap().total())
            .collect();
        assert_eq!(accepted, vec![5.0, 3.0]);
        assert_eq!(outcome.suite.len(), 1);
        assert_eq!(outcome.suite.tests()[0].statements()[0].target, "D");
    }

    fn stack_harness(statement: &Statement, ctx: &mut ExecutionContext<Vec<i64>>) -> Result<(), String> {
        match statement.target.as_str() {
            "push" => {
                ctx.state.push(statement.args.first().copied().unwrap_or(0));
                Ok(())
            }
            "pop" => {
                if ctx.state.pop().is_none() {
                    ctx.cover_branch("pop-empty");
                    return Err("EmptyStack".to_string());
                }
                Ok(())
            }
            "peek" => match ctx.state.last() {
                Some(v) if *v < 0 => {
                    ctx.cover_branch("peek-negative");
                    Ok(())
                }
                Some(_) => Ok(()),
                None => Err("EmptyStack".to_string()),
            },
            other => Err(format!("unknown {other}")),
        }
    }

    fn stack_catalog() -> Vec<CallSignature> {
        vec![
            CallSignature::new("push", 1),
            CallSignature::new("pop", 0),
            CallSignature::new("peek", 0),
        ]
    }

    fn coverage_generator(strategy: Box<dyn Strategy>) -> TestGenerator<RecordingTelemetry> {
        let methods: Vec<String> = stack_catalog().into_iter().map(|c| c.name).collect();
        TestGenerator::new(
            strategy,
            Box::new(InProcessExecutor::new(stack_harness).with_known_targets(methods.clone())),
            RecordingTelemetry::new(),
        )
        .with_goal_provider(Box::new(MethodGoals::called(methods.clone())))
        .with_goal_provider(Box::new(MethodGoals::returned_normally(methods)))
        .with_goal_provider(Box::new(BranchGoals::new(vec![
            "pop-empty".to_string(),
            "peek-negative".to_string(),
        ])))
        .with_rng(Box::new(ChaCha8Rng::seed_from_u64(7)))
        .with_testable_methods(3)
    }

    #[test]
    fn incremental_search_fitness_never_regresses() {
        let factory = RandomLengthTestFactory::new(stack_catalog(), 4);
        let outcome = coverage_generator(Box::new(RandomTestCaseSearch::new(Box::new(factory))))
            .with_budget(iterations(60))
            .generate_tests();

        let totals: Vec<f64> = outcome
            .telemetry
            .accepted
            .iter()
            .map(|s| s.fitness().unwrap().total())
            .collect();
        assert!(totals.windows(2).all(|w| w[1] < w[0]), "totals: {totals:?}");
        assert!(totals.iter().all(|t| *t < 8.0));
        assert_eq!(outcome.total_goals, 8);
        assert_eq!(outcome.telemetry.counter(Counter::TotalGoals), Some(8.0));
        assert_eq!(
            outcome.covered_goals as f64,
            8.0 - outcome.suite.fitness().unwrap().total()
        );
        assert_eq!(outcome.counters.iterations, 60);
        assert_eq!(outcome.counters.fitness_evaluations, 61);
    }

    #[test]
    fn suite_search_fitness_never_regresses() {
        let factory = TestSuiteFactory::new(
            Box::new(RandomLengthTestFactory::new(stack_catalog(), 3)),
            1,
            3,
        );
        let outcome = coverage_generator(Box::new(RandomTestSuiteSearch::new(Box::new(factory))))
            .with_budget(iterations(30))
            .generate_tests();

        let totals: Vec<f64> = outcome
            .telemetry
            .accepted
            .iter()
            .map(|s| s.fitness().unwrap().total())
            .collect();
        assert!(!totals.is_empty());
        assert!(totals.windows(2).all(|w| w[1] < w[0]), "totals: {totals:?}");
        assert_eq!(outcome.suite.fitness().unwrap().total(), *totals.last().unwrap());
    }

    #[test]
    fn lexicographic_search_never_regresses() {
        let factory = RandomLengthTestFactory::new(stack_catalog(), 4);
        let outcome = coverage_generator(Box::new(RandomTestCaseSearch::new(Box::new(factory))))
            .with_aggregation(Aggregation::Lexicographic)
            .with_budget(iterations(60))
            .generate_tests();

        let accepted: Vec<&FitnessVector> = outcome
            .telemetry
            .accepted
            .iter()
            .map(|s| s.fitness().unwrap())
            .collect();
        assert!(!accepted.is_empty());
        for pair in accepted.windows(2) {
            assert_eq!(
                compare(pair[1], pair[0], Aggregation::Lexicographic),
                std::cmp::Ordering::Less
            );
        }
        assert_eq!(outcome.suite.fitness().unwrap(), *accepted.last().unwrap());
    }

    #[test]
    fn fixed_count_filters_by_execution_outcome() {
        let (factory, _) = ScriptedTests::new(vec![
            calls(&["push", "peek"]),
            calls(&["push", "pop", "pop", "push", "push"]),
            calls(&["frobnicate", "push"]),
        ]);
        let outcome = coverage_generator(Box::new(FixedNumRandomTests::new(Box::new(factory), 3)))
            .with_budget(iterations(0))
            .generate_tests();

        let suite = &outcome.suite;
        assert_eq!(suite.len(), 2);
        assert_eq!(suite.tests()[0].len(), 2);
        assert_eq!(suite.tests()[1].len(), 3);
        assert_eq!(suite.tests()[1].statements()[2].target, "pop");
        assert!(suite.fitness().is_some(), "final suite is scored for reporting");
        assert_eq!(outcome.telemetry.counter(Counter::DiscardedTests), Some(1.0));
        assert_eq!(outcome.telemetry.counter(Counter::TruncatedTests), Some(1.0));
        assert_eq!(outcome.telemetry.counter(Counter::SuiteSize), Some(2.0));
        assert!(outcome.covered_goals >= 5);
    }

    #[test]
    fn no_testable_methods_short_circuits() {
        let (factory, draws) = ScriptedTests::new(vec![call("A")]);
        let outcome = TestGenerator::new(
            Box::new(RandomTestCaseSearch::new(Box::new(factory))),
            quiet_executor(),
            RecordingTelemetry::new(),
        )
        .with_testable_methods(0)
        .with_budget(iterations(5))
        .generate_tests();

        assert!(outcome.suite.is_empty());
        assert_eq!(draws.load(Ordering::SeqCst), 0);
        assert!(outcome.telemetry.counters.is_empty());
    }
}
