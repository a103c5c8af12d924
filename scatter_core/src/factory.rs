use crate::suite::TestSuite;
use crate::testcase::{Statement, TestCase};
use rand::Rng;
use rand::seq::SliceRandom;
use rand_core::RngCore;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Default bounds for randomly drawn call arguments.
const DEFAULT_ARG_MIN: i64 = -10;
const DEFAULT_ARG_MAX: i64 = 10;

/// A `ChromosomeFactory` builds fresh random candidates.
///
/// Factories never fail: with nothing to build from they return an empty candidate.
/// Each call is independent of every candidate produced before it.
///
/// # Type Parameters
/// * `C`: The candidate shape, either a `TestCase` or a whole `TestSuite`.
pub trait ChromosomeFactory<C>: Send {
    fn name(&self) -> &'static str;

    /// Builds a new candidate using `rng` as the only source of randomness.
    fn next(&mut self, rng: &mut dyn RngCore) -> C;
}

fn default_arg_min() -> i64 {
    DEFAULT_ARG_MIN
}

fn default_arg_max() -> i64 {
    DEFAULT_ARG_MAX
}

/// A callable method of the system under test.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct CallSignature {
    pub name: String,
    #[serde(default)]
    pub arity: usize,
    #[serde(default = "default_arg_min")]
    pub arg_min: i64,
    #[serde(default = "default_arg_max")]
    pub arg_max: i64,
}

impl CallSignature {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
            arg_min: DEFAULT_ARG_MIN,
            arg_max: DEFAULT_ARG_MAX,
        }
    }

    /// Draws a call to this method with uniformly chosen arguments.
    pub fn random_call(&self, rng: &mut dyn RngCore) -> Statement {
        let (lo, hi) = if self.arg_min <= self.arg_max {
            (self.arg_min, self.arg_max)
        } else {
            (self.arg_max, self.arg_min)
        };
        let args = (0..self.arity).map(|_| rng.random_range(lo..=hi)).collect();
        Statement::new(self.name.clone(), args)
    }
}

/// Builds tests of `1..=max_length` calls, each to a uniformly chosen method.
#[derive(Debug, Clone)]
pub struct RandomLengthTestFactory {
    catalog: Vec<CallSignature>,
    max_length: usize,
}

impl RandomLengthTestFactory {
    pub fn new(catalog: Vec<CallSignature>, max_length: usize) -> Self {
        Self {
            catalog,
            max_length: max_length.max(1),
        }
    }
}

impl ChromosomeFactory<TestCase> for RandomLengthTestFactory {
    fn name(&self) -> &'static str {
        "random"
    }

    fn next(&mut self, rng: &mut dyn RngCore) -> TestCase {
        if self.catalog.is_empty() {
            return TestCase::new();
        }
        let length = rng.random_range(1..=self.max_length);
        let statements = (0..length)
            .map(|_| {
                let index = rng.random_range(0..self.catalog.len());
                self.catalog[index].random_call(rng)
            })
            .collect();
        TestCase::from_statements(statements)
    }
}

/// Walks shuffled passes over the whole catalog so every method gets called once per pass.
///
/// Each test takes up to `max_length` not-yet-used methods of the current pass.
#[derive(Debug, Clone)]
pub struct AllMethodsTestFactory {
    catalog: Vec<CallSignature>,
    max_length: usize,
    pending: Vec<usize>,
}

impl AllMethodsTestFactory {
    pub fn new(catalog: Vec<CallSignature>, max_length: usize) -> Self {
        Self {
            catalog,
            max_length: max_length.max(1),
            pending: Vec::new(),
        }
    }
}

impl ChromosomeFactory<TestCase> for AllMethodsTestFactory {
    fn name(&self) -> &'static str {
        "all-methods"
    }

    fn next(&mut self, rng: &mut dyn RngCore) -> TestCase {
        if self.catalog.is_empty() {
            return TestCase::new();
        }
        if self.pending.is_empty() {
            self.pending = (0..self.catalog.len()).collect();
            self.pending.shuffle(rng);
        }
        let take = self.max_length.min(self.pending.len());
        let statements = self
            .pending
            .split_off(self.pending.len() - take)
            .into_iter()
            .map(|index| self.catalog[index].random_call(rng))
            .collect();
        TestCase::from_statements(statements)
    }
}

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Failed to read seed pool {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse seed pool {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Loads a JSON seed pool: an array of tests, each an array of `{"target", "args"}` calls.
pub fn load_seed_pool(path: &Path) -> Result<Vec<TestCase>, SeedError> {
    let content = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let raw: Vec<Vec<Statement>> =
        serde_json::from_str(&content).map_err(|source| SeedError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    Ok(raw.into_iter().map(TestCase::from_statements).collect())
}

/// Replays a known test with probability `seed_probability`, otherwise defers to random generation.
pub struct SeededTestFactory {
    seeds: Vec<TestCase>,
    seed_probability: f64,
    fallback: RandomLengthTestFactory,
}

impl SeededTestFactory {
    pub fn new(
        seeds: Vec<TestCase>,
        seed_probability: f64,
        fallback: RandomLengthTestFactory,
    ) -> Self {
        Self {
            seeds,
            seed_probability: if seed_probability.is_nan() {
                0.0
            } else {
                seed_probability.clamp(0.0, 1.0)
            },
            fallback,
        }
    }
}

impl ChromosomeFactory<TestCase> for SeededTestFactory {
    fn name(&self) -> &'static str {
        "seeded"
    }

    fn next(&mut self, rng: &mut dyn RngCore) -> TestCase {
        if !self.seeds.is_empty() && rng.random_bool(self.seed_probability) {
            let index = rng.random_range(0..self.seeds.len());
            return TestCase::from_statements(self.seeds[index].statements().to_vec());
        }
        self.fallback.next(rng)
    }
}

/// Builds whole suites by drawing `min_size..=max_size` tests from a test factory.
pub struct TestSuiteFactory {
    test_factory: Box<dyn ChromosomeFactory<TestCase>>,
    min_size: usize,
    max_size: usize,
}

impl TestSuiteFactory {
    pub fn new(
        test_factory: Box<dyn ChromosomeFactory<TestCase>>,
        min_size: usize,
        max_size: usize,
    ) -> Self {
        Self {
            test_factory,
            min_size: min_size.min(max_size),
            max_size: max_size.max(min_size),
        }
    }
}

impl ChromosomeFactory<TestSuite> for TestSuiteFactory {
    fn name(&self) -> &'static str {
        "suite"
    }

    fn next(&mut self, rng: &mut dyn RngCore) -> TestSuite {
        let size = rng.random_range(self.min_size..=self.max_size);
        let tests = (0..size).map(|_| self.test_factory.next(rng)).collect();
        TestSuite::from_tests(tests)
    }
}
