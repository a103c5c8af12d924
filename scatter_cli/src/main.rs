use scatter_core::config::{
    CommandExecutorSettings, ExecutorType as ConfigExecutorType, ScatterConfig,
};
use scatter_core::executor::{ExecutionContext, Executor, InProcessExecutor};
use scatter_core::factory::CallSignature;
use scatter_core::registry::{build_command_executor, build_generator};
use scatter_core::suite::TestSuite;
use scatter_core::telemetry::{JsonLinesTelemetry, LogTelemetry, TelemetrySink};
use scatter_core::testcase::Statement;

use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    #[clap(long)]
    strategy: Option<String>,
    #[clap(long)]
    test_factory: Option<String>,
    #[clap(short, long)]
    num_tests: Option<usize>,
    #[clap(long)]
    max_time_secs: Option<u64>,
    #[clap(short, long)]
    iterations: Option<u64>,
    #[clap(short, long)]
    seed: Option<u64>,
    #[clap(long)]
    target_command: Option<String>,
    #[clap(long, value_parser)]
    telemetry_out: Option<PathBuf>,
    #[clap(short, long, value_parser)]
    output: Option<PathBuf>,
}

const STACK_BRANCHES: [&str; 4] = ["pop-empty", "peek-negative", "div-by-zero", "stack-deep"];

fn stack_catalog() -> Vec<CallSignature> {
    vec![
        CallSignature::new("push", 1),
        CallSignature::new("pop", 0),
        CallSignature::new("peek", 0),
        CallSignature::new("add", 0),
        CallSignature::new("div", 2),
        CallSignature::new("clear", 0),
    ]
}

/// A small integer stack used as the built-in target.
fn stack_harness(statement: &Statement, ctx: &mut ExecutionContext<Vec<i64>>) -> Result<(), String> {
    let arg = |i: usize| statement.args.get(i).copied().unwrap_or(0);
    match statement.target.as_str() {
        "push" => {
            ctx.state.push(arg(0));
            if ctx.state.len() > 3 {
                ctx.cover_branch("stack-deep");
            }
        }
        "pop" => {
            if ctx.state.pop().is_none() {
                ctx.cover_branch("pop-empty");
                return Err("EmptyStackException".to_string());
            }
        }
        "peek" => match ctx.state.last() {
            None => return Err("EmptyStackException".to_string()),
            Some(top) if *top < 0 => ctx.cover_branch("peek-negative"),
            Some(_) => {}
        },
        "add" => {
            let (Some(a), Some(b)) = (ctx.state.pop(), ctx.state.pop()) else {
                return Err("EmptyStackException".to_string());
            };
            ctx.state.push(a.wrapping_add(b));
        }
        "div" => {
            if arg(1) == 0 {
                ctx.cover_branch("div-by-zero");
                return Err("ArithmeticException: / by zero".to_string());
            }
            ctx.state.push(arg(0) / arg(1));
        }
        "clear" => ctx.state.clear(),
        other => return Err(format!("No such method: {other}")),
    }
    Ok(())
}

fn print_suite(suite: &TestSuite) {
    for (i, test) in suite.tests().iter().enumerate() {
        println!("// Test {i}");
        print!("{test}");
        println!();
    }
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match cli.config_file {
        Some(config_path) => {
            log::info!("Loading configuration from specified path: {config_path:?}");
            ScatterConfig::load_from_file(&config_path)?
        }
        None => {
            let default_config_path = PathBuf::from("config.toml");
            if default_config_path.exists() {
                log::info!(
                    "No config file specified via CLI, loading default: {default_config_path:?}"
                );
                ScatterConfig::load_from_file(&default_config_path)?
            } else {
                log::info!(
                    "No config file specified and default 'config.toml' not found, using built-in defaults."
                );
                ScatterConfig::default()
            }
        }
    };

    if let Some(strategy) = cli.strategy {
        config.search.strategy = strategy;
    }
    if let Some(test_factory) = cli.test_factory {
        config.search.test_factory = test_factory;
    }
    if let Some(num_tests) = cli.num_tests {
        config.search.num_random_tests = num_tests;
    }
    if let Some(seed) = cli.seed {
        config.search.seed = seed;
    }
    if let Some(secs) = cli.max_time_secs {
        config.budget.max_time_secs = Some(secs);
    }
    if let Some(iterations) = cli.iterations {
        config.budget.max_iterations = Some(iterations);
    }
    if let Some(target_cmd_str) = cli.target_command {
        if config.executor.executor_type == ConfigExecutorType::Command {
            let cmd_settings = config
                .executor
                .command_settings
                .get_or_insert_with(CommandExecutorSettings::default);
            if !cmd_settings.command.is_empty() {
                cmd_settings.command[0] = target_cmd_str;
            } else {
                cmd_settings.command.push(target_cmd_str);
            }
        } else {
            log::warn!("--target-command specified but executor type is not 'command'. Override ignored.");
        }
    }

    let executor: Box<dyn Executor> = match config.executor.executor_type {
        ConfigExecutorType::InProcess => {
            let settings = config.executor.in_process_settings.clone().unwrap_or_default();
            if settings.harness_key != "stack" {
                anyhow::bail!("Unknown in-process harness '{}'", settings.harness_key);
            }
            if config.target.methods.is_empty() {
                config.target.methods = stack_catalog();
                config.target.branches = STACK_BRANCHES.iter().map(|b| b.to_string()).collect();
                if !config.target.criteria.iter().any(|c| c == "branch") {
                    config.target.criteria.push("branch".to_string());
                }
            }
            let known: Vec<String> = config.target.methods.iter().map(|m| m.name.clone()).collect();
            Box::new(
                InProcessExecutor::new(stack_harness)
                    .with_known_targets(known)
                    .with_timeout(Duration::from_millis(settings.timeout_ms)),
            )
        }
        ConfigExecutorType::Command => Box::new(build_command_executor(&config)?),
    };

    log::debug!("Effective configuration: {config:#?}");

    let telemetry: Box<dyn TelemetrySink> = match &cli.telemetry_out {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                anyhow::anyhow!("Failed to create telemetry file {:?}: {}", path, e)
            })?;
            Box::new(JsonLinesTelemetry::new(BufWriter::new(file)))
        }
        None => Box::new(LogTelemetry),
    };

    let start_time = Instant::now();
    let outcome = build_generator(&config, executor, telemetry)?.generate_tests();
    log::info!(
        "Generated {} tests ({} statements) covering {}/{} goals in {:.2?}",
        outcome.suite.len(),
        outcome.suite.total_length(),
        outcome.covered_goals,
        outcome.total_goals,
        start_time.elapsed()
    );

    match cli.output {
        Some(path) => {
            let rendered = serde_json::to_string_pretty(&outcome.suite)?;
            std::fs::write(&path, rendered)
                .map_err(|e| anyhow::anyhow!("Failed to write suite to {:?}: {}", path, e))?;
            log::info!("Wrote suite to {path:?}");
        }
        None => print_suite(&outcome.suite),
    }

    Ok(())
}
