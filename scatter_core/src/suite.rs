use crate::testcase::TestCase;
use bincode::config::{Configuration, Fixint, LittleEndian, NoLimit};
use serde::Serialize;

/// The score one objective assigned to a suite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveScore {
    pub objective: String,
    pub value: f64,
}

/// Scores of every registered objective, in registration order. Lower is better.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FitnessVector {
    scores: Vec<ObjectiveScore>,
}

impl FitnessVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, objective: impl Into<String>, value: f64) {
        self.scores.push(ObjectiveScore {
            objective: objective.into(),
            value,
        });
    }

    pub fn scores(&self) -> &[ObjectiveScore] {
        &self.scores
    }

    pub fn get(&self, objective: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.objective == objective)
            .map(|s| s.value)
    }

    pub fn total(&self) -> f64 {
        self.scores.iter().map(|s| s.value).sum()
    }
}

/// A collection of test cases, optionally carrying the fitness of its current contents.
///
/// Every content change drops the attached fitness, so a suite can only expose
/// scores that were computed against exactly the tests it holds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSuite {
    tests: Vec<TestCase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fitness: Option<FitnessVector>,
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tests(tests: Vec<TestCase>) -> Self {
        Self {
            tests,
            fitness: None,
        }
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    /// Mutable access for refreshing cached traces; the statements themselves stay put.
    pub(crate) fn tests_mut(&mut self) -> &mut [TestCase] {
        &mut self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Total number of statements across all tests.
    pub fn total_length(&self) -> usize {
        self.tests.iter().map(TestCase::len).sum()
    }

    pub fn add_test(&mut self, test: TestCase) {
        self.tests.push(test);
        self.fitness = None;
    }

    pub fn remove_test(&mut self, index: usize) -> Option<TestCase> {
        if index >= self.tests.len() {
            return None;
        }
        self.fitness = None;
        Some(self.tests.remove(index))
    }

    /// Returns a copy of this suite with `test` appended. `self` is left untouched.
    pub fn with_test(&self, test: TestCase) -> TestSuite {
        let mut trial = TestSuite::from_tests(self.tests.clone());
        trial.add_test(test);
        trial
    }

    pub fn fitness(&self) -> Option<&FitnessVector> {
        self.fitness.as_ref()
    }

    pub(crate) fn set_fitness(&mut self, fitness: FitnessVector) {
        self.fitness = Some(fitness);
    }

    fn bincode_config() -> Configuration<LittleEndian, Fixint, NoLimit> {
        bincode::config::standard()
            .with_little_endian()
            .with_fixed_int_encoding()
    }

    /// MD5 hex digest over the statements of every test, in order.
    pub fn digest(&self) -> String {
        let mut context = md5::Context::new();
        for test in &self.tests {
            match bincode::encode_to_vec(test.statements(), Self::bincode_config()) {
                Ok(bytes) => context.consume(bytes),
                Err(e) => log::warn!("Failed to encode test for digest: {e}"),
            }
        }
        format!("{:x}", context.compute())
    }
}
