//! Tag-based construction of the pluggable parts of a run.
//!
//! Every configurable component is looked up by its tag in a table of
//! constructor closures, so adding a variant means registering one closure.

use crate::budget::BudgetOracle;
use crate::config::{ConfigInputDelivery, ScatterConfig};
use crate::executor::{CommandExecutor, CommandExecutorConfig, Executor, InputDelivery};
use crate::factory::{
    AllMethodsTestFactory, ChromosomeFactory, RandomLengthTestFactory, SeedError,
    SeededTestFactory, TestSuiteFactory, load_seed_pool,
};
use crate::goals::{BranchGoals, Criterion, GoalProvider, MethodGoals};
use crate::strategy::{
    FixedNumRandomTests, RandomTestCaseSearch, RandomTestSuiteSearch, Strategy, TestGenerator,
};
use crate::telemetry::TelemetrySink;
use crate::testcase::TestCase;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Unknown strategy '{tag}' (known: {known})")]
    UnknownStrategy { tag: String, known: String },
    #[error("Unknown test factory '{tag}' (known: {known})")]
    UnknownFactory { tag: String, known: String },
    #[error("Unknown coverage criterion '{tag}' (known: {known})")]
    UnknownCriterion { tag: String, known: String },
    #[error("The seeded test factory requires factory.seed-file")]
    MissingSeedFile,
    #[error("factory.seed-probability must be within 0.0..=1.0, got {0}")]
    InvalidSeedProbability(f64),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error("Command settings missing for command executor in config")]
    MissingCommandSettings,
}

type Constructor<T> = Box<dyn Fn(&ScatterConfig) -> Result<T, SetupError>>;

/// Maps tags to constructors for one kind of component.
pub struct Registry<T> {
    constructors: BTreeMap<&'static str, Constructor<T>>,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    pub fn register<F>(&mut self, tag: &'static str, constructor: F)
    where
        F: Fn(&ScatterConfig) -> Result<T, SetupError> + 'static,
    {
        self.constructors.insert(tag, Box::new(constructor));
    }

    /// Known tags, comma separated, for error messages.
    pub fn known(&self) -> String {
        self.constructors
            .keys()
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Builds the component registered under `tag`, or `None` if there is none.
    pub fn build(&self, tag: &str, config: &ScatterConfig) -> Option<Result<T, SetupError>> {
        self.constructors.get(tag).map(|c| c(config))
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub fn test_factories() -> Registry<Box<dyn ChromosomeFactory<TestCase>>> {
    let mut registry: Registry<Box<dyn ChromosomeFactory<TestCase>>> = Registry::new();
    registry.register("random", |config| {
        Ok(Box::new(RandomLengthTestFactory::new(
            config.target.methods.clone(),
            config.factory.max_length,
        )))
    });
    registry.register("all-methods", |config| {
        Ok(Box::new(AllMethodsTestFactory::new(
            config.target.methods.clone(),
            config.factory.max_length,
        )))
    });
    registry.register("seeded", |config| {
        let probability = config.factory.seed_probability;
        if !(0.0..=1.0).contains(&probability) {
            return Err(SetupError::InvalidSeedProbability(probability));
        }
        let path = config
            .factory
            .seed_file
            .as_ref()
            .ok_or(SetupError::MissingSeedFile)?;
        let seeds = load_seed_pool(path)?;
        log::info!("Loaded {} seed tests from {:?}", seeds.len(), path);
        Ok(Box::new(SeededTestFactory::new(
            seeds,
            probability,
            RandomLengthTestFactory::new(config.target.methods.clone(), config.factory.max_length),
        )))
    });
    registry
}

pub fn build_test_factory(
    config: &ScatterConfig,
) -> Result<Box<dyn ChromosomeFactory<TestCase>>, SetupError> {
    let registry = test_factories();
    let tag = &config.search.test_factory;
    registry
        .build(tag, config)
        .unwrap_or_else(|| {
            Err(SetupError::UnknownFactory {
                tag: tag.clone(),
                known: registry.known(),
            })
        })
}

pub fn strategies() -> Registry<Box<dyn Strategy>> {
    let mut registry: Registry<Box<dyn Strategy>> = Registry::new();
    registry.register("random-test-case", |config| {
        Ok(Box::new(RandomTestCaseSearch::new(build_test_factory(config)?)))
    });
    registry.register("random-test-suite", |config| {
        let suites = TestSuiteFactory::new(
            build_test_factory(config)?,
            config.factory.min_suite_size,
            config.factory.max_suite_size,
        );
        Ok(Box::new(RandomTestSuiteSearch::new(Box::new(suites))))
    });
    registry.register("fixed-num-random-tests", |config| {
        Ok(Box::new(FixedNumRandomTests::new(
            build_test_factory(config)?,
            config.search.num_random_tests,
        )))
    });
    registry
}

pub fn build_strategy(config: &ScatterConfig) -> Result<Box<dyn Strategy>, SetupError> {
    let registry = strategies();
    let tag = &config.search.strategy;
    registry.build(tag, config).unwrap_or_else(|| {
        Err(SetupError::UnknownStrategy {
            tag: tag.clone(),
            known: registry.known(),
        })
    })
}

pub fn goal_providers() -> Registry<Box<dyn GoalProvider>> {
    let mut registry: Registry<Box<dyn GoalProvider>> = Registry::new();
    registry.register(Criterion::Method.tag(), |config| {
        Ok(Box::new(MethodGoals::called(method_names(config))))
    });
    registry.register(Criterion::MethodNoException.tag(), |config| {
        Ok(Box::new(MethodGoals::returned_normally(method_names(config))))
    });
    registry.register(Criterion::Branch.tag(), |config| {
        Ok(Box::new(BranchGoals::new(config.target.branches.clone())))
    });
    registry
}

pub fn build_goal_providers(
    config: &ScatterConfig,
) -> Result<Vec<Box<dyn GoalProvider>>, SetupError> {
    let registry = goal_providers();
    config
        .target
        .criteria
        .iter()
        .map(|tag| {
            registry.build(tag, config).unwrap_or_else(|| {
                Err(SetupError::UnknownCriterion {
                    tag: tag.clone(),
                    known: registry.known(),
                })
            })
        })
        .collect()
}

fn method_names(config: &ScatterConfig) -> Vec<String> {
    config.target.methods.iter().map(|m| m.name.clone()).collect()
}

pub fn build_budget(config: &ScatterConfig) -> BudgetOracle {
    BudgetOracle::new(config.budget.stopping_conditions())
}

pub fn build_command_executor(config: &ScatterConfig) -> Result<CommandExecutor, SetupError> {
    let settings = config
        .executor
        .command_settings
        .clone()
        .ok_or(SetupError::MissingCommandSettings)?;

    let input_delivery = match settings.input_delivery {
        ConfigInputDelivery::StdIn => InputDelivery::StdIn,
        ConfigInputDelivery::File { template } => InputDelivery::File(template),
    };

    Ok(CommandExecutor::new(CommandExecutorConfig {
        command: settings.command,
        input_delivery,
        timeout: Duration::from_millis(settings.timeout_ms),
        working_dir: settings.working_dir,
    }))
}

/// Assembles a ready-to-run generator from `config` around the given executor and sink.
pub fn build_generator<T: TelemetrySink>(
    config: &ScatterConfig,
    executor: Box<dyn Executor>,
    telemetry: T,
) -> Result<TestGenerator<T>, SetupError> {
    let strategy = build_strategy(config)?;
    log::info!("* Using strategy {}", strategy.name());

    let mut generator = TestGenerator::new(strategy, executor, telemetry)
        .with_aggregation(config.search.aggregation)
        .with_budget(build_budget(config))
        .with_rng(Box::new(ChaCha8Rng::seed_from_u64(config.search.seed)))
        .with_testable_methods(config.target.methods.len());
    for provider in build_goal_providers(config)? {
        generator = generator.with_goal_provider(provider);
    }
    Ok(generator)
}
