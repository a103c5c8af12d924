use crate::budget::StoppingCondition;
use crate::factory::CallSignature;
use crate::fitness::Aggregation;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigInputDelivery {
    #[default]
    StdIn,
    File {
        template: String,
    },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct CommandExecutorSettings {
    pub command: Vec<String>,
    #[serde(default)]
    pub input_delivery: ConfigInputDelivery,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    pub working_dir: Option<PathBuf>,
}

pub fn default_timeout_ms() -> u64 {
    2000
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorType {
    #[default]
    InProcess,
    Command,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct InProcessExecutorSettings {
    #[serde(default = "default_harness_key")]
    pub harness_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_harness_key() -> String {
    "stack".to_string()
}

impl Default for InProcessExecutorSettings {
    fn default() -> Self {
        Self {
            harness_key: default_harness_key(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub executor_type: ExecutorType,
    #[serde(default)]
    pub command_settings: Option<CommandExecutorSettings>,
    #[serde(default)]
    pub in_process_settings: Option<InProcessExecutorSettings>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct SearchSettings {
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_test_factory")]
    pub test_factory: String,
    #[serde(default = "default_num_random_tests")]
    pub num_random_tests: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub aggregation: Aggregation,
}

pub fn default_strategy() -> String {
    "random-test-case".to_string()
}

pub fn default_test_factory() -> String {
    "random".to_string()
}

pub fn default_num_random_tests() -> usize {
    20
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            test_factory: default_test_factory(),
            num_random_tests: default_num_random_tests(),
            seed: 0,
            aggregation: Aggregation::default(),
        }
    }
}

/// Search limits. Any limit left unset is ignored; with none set the oracle uses its fallback.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct BudgetSettings {
    pub max_time_secs: Option<u64>,
    pub max_fitness_evaluations: Option<u64>,
    pub max_tests: Option<u64>,
    pub max_iterations: Option<u64>,
}

impl BudgetSettings {
    pub fn stopping_conditions(&self) -> Vec<StoppingCondition> {
        let mut conditions = Vec::new();
        if let Some(secs) = self.max_time_secs {
            conditions.push(StoppingCondition::MaxTime(Duration::from_secs(secs)));
        }
        if let Some(limit) = self.max_fitness_evaluations {
            conditions.push(StoppingCondition::MaxFitnessEvaluations(limit));
        }
        if let Some(limit) = self.max_tests {
            conditions.push(StoppingCondition::MaxTests(limit));
        }
        if let Some(limit) = self.max_iterations {
            conditions.push(StoppingCondition::MaxIterations(limit));
        }
        conditions
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct FactorySettings {
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_min_suite_size")]
    pub min_suite_size: usize,
    #[serde(default = "default_max_suite_size")]
    pub max_suite_size: usize,
    #[serde(default = "default_seed_probability")]
    pub seed_probability: f64,
    pub seed_file: Option<PathBuf>,
}

pub fn default_max_length() -> usize {
    8
}
pub fn default_min_suite_size() -> usize {
    1
}
pub fn default_max_suite_size() -> usize {
    5
}
pub fn default_seed_probability() -> f64 {
    0.2
}

impl Default for FactorySettings {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            min_suite_size: default_min_suite_size(),
            max_suite_size: default_max_suite_size(),
            seed_probability: default_seed_probability(),
            seed_file: None,
        }
    }
}

/// What can be called and which goals count.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct TargetSettings {
    #[serde(default)]
    pub methods: Vec<CallSignature>,
    #[serde(default)]
    pub branches: Vec<String>,
    #[serde(default = "default_criteria")]
    pub criteria: Vec<String>,
}

pub fn default_criteria() -> Vec<String> {
    vec!["method".to_string(), "method-no-exception".to_string()]
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            methods: Vec::new(),
            branches: Vec::new(),
            criteria: default_criteria(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ScatterConfig {
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub budget: BudgetSettings,
    #[serde(default)]
    pub factory: FactorySettings,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub target: TargetSettings,
}

impl ScatterConfig {
    pub fn load_from_file(path: &PathBuf) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config: ScatterConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;

        Ok(config)
    }
}
