pub mod budget;
pub mod config;
pub mod executor;
pub mod factory;
pub mod fitness;
pub mod goals;
pub mod registry;
pub mod sanitizer;
pub mod strategy;
pub mod suite;
pub mod telemetry;
pub mod testcase;

pub use budget::{BudgetOracle, SearchCounters, StoppingCondition};
pub use config::ScatterConfig;
pub use executor::{
    CommandExecutor, ExecutionContext, ExecutionOutcome, ExecutionTrace, Executor,
    InProcessExecutor,
};
pub use factory::{ChromosomeFactory, TestSuiteFactory};
pub use fitness::{Aggregation, FitnessAggregator, Objective};
pub use goals::{Criterion, Goal, GoalProvider, GoalSet};
pub use registry::SetupError;
pub use sanitizer::{Verdict, sanitize};
pub use strategy::{GenerationOutcome, SearchEnv, Strategy, TestGenerator};
pub use suite::{FitnessVector, TestSuite};
pub use telemetry::{Counter, NoOpTelemetry, TelemetrySink};
pub use testcase::{Statement, TestCase};
