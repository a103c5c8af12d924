use crate::goals::Criterion;
use crate::testcase::{Statement, TestCase};
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

/// An exception observed at one statement position while replaying a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exception {
    /// Raised by code the test legitimately reached.
    CandidateRaised(String),
    /// The execution exceeded its wall-clock budget.
    Timeout,
    /// The test could not be turned into something executable.
    CompileFailure(String),
}

impl Exception {
    /// Timeouts and compile failures come from the harness, never from the test itself.
    pub fn is_environment_artifact(&self) -> bool {
        matches!(self, Exception::Timeout | Exception::CompileFailure(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementEffect {
    pub position: usize,
    pub exception: Option<Exception>,
}

/// Summary of a trace, keyed on its first exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Ok,
    Timeout { position: usize },
    CompileFailure,
    RaisedAt { position: usize },
}

/// Ordered effects of one concrete run of a test case, plus the goal ids it covered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionTrace {
    effects: Vec<StatementEffect>,
    covered: BTreeSet<String>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile_failure(reason: impl Into<String>) -> Self {
        let mut trace = Self::new();
        trace.record(0, Some(Exception::CompileFailure(reason.into())));
        trace
    }

    pub fn record(&mut self, position: usize, exception: Option<Exception>) {
        self.effects.push(StatementEffect {
            position,
            exception,
        });
    }

    pub fn cover(&mut self, goal_id: impl Into<String>) {
        self.covered.insert(goal_id.into());
    }

    pub fn effects(&self) -> &[StatementEffect] {
        &self.effects
    }

    pub fn covered(&self) -> &BTreeSet<String> {
        &self.covered
    }

    pub fn first_exception(&self) -> Option<(usize, &Exception)> {
        self.effects
            .iter()
            .find_map(|effect| effect.exception.as_ref().map(|e| (effect.position, e)))
    }

    pub fn has_environment_artifact(&self) -> bool {
        self.effects
            .iter()
            .filter_map(|effect| effect.exception.as_ref())
            .any(Exception::is_environment_artifact)
    }

    pub fn outcome(&self) -> ExecutionOutcome {
        match self.first_exception() {
            None => ExecutionOutcome::Ok,
            Some((position, Exception::Timeout)) => ExecutionOutcome::Timeout { position },
            Some((_, Exception::CompileFailure(_))) => ExecutionOutcome::CompileFailure,
            Some((position, Exception::CandidateRaised(_))) => {
                ExecutionOutcome::RaisedAt { position }
            }
        }
    }
}

/// Runs a test case concretely and reports what happened.
///
/// Executors never fail: every harness problem is folded into the returned trace
/// as an environment-artifact exception.
pub trait Executor: Send {
    fn run(&mut self, test: &TestCase) -> ExecutionTrace;
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn run(&mut self, test: &TestCase) -> ExecutionTrace {
        (**self).run(test)
    }
}

/// Per-run state handed to an in-process harness.
pub struct ExecutionContext<S> {
    pub state: S,
    covered: BTreeSet<String>,
}

impl<S> ExecutionContext<S> {
    pub fn cover(&mut self, goal_id: impl Into<String>) {
        self.covered.insert(goal_id.into());
    }

    pub fn cover_branch(&mut self, branch: &str) {
        self.cover(Criterion::Branch.goal_id(branch));
    }
}

/// Progress the harness worker reports back for one test.
enum HarnessEvent {
    Statement {
        position: usize,
        exception: Option<Exception>,
    },
    Finished(BTreeSet<String>),
}

/// Executes statements by calling a harness closure on a worker thread.
///
/// A fresh `S` is created for every test. A harness error or panic is recorded as
/// a candidate-raised exception at that statement and ends the run. Once the
/// timeout expires the worker is abandoned and the statement it is stuck in is
/// recorded as timed out; the thread itself keeps running until the call returns.
pub struct InProcessExecutor<S, F>
where
    F: Fn(&Statement, &mut ExecutionContext<S>) -> Result<(), String>,
{
    harness_fn: Arc<F>,
    known_targets: Option<HashSet<String>>,
    timeout: Duration,
    _state: PhantomData<fn() -> S>,
}

impl<S, F> InProcessExecutor<S, F>
where
    S: Default,
    F: Fn(&Statement, &mut ExecutionContext<S>) -> Result<(), String>,
{
    pub fn new(harness_fn: F) -> Self {
        Self {
            harness_fn: Arc::new(harness_fn),
            known_targets: None,
            timeout: Duration::from_millis(crate::config::default_timeout_ms()),
            _state: PhantomData,
        }
    }

    /// Statements calling anything outside `targets` make the test uncompilable.
    pub fn with_known_targets<I, T>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.known_targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn check_compiles(&self, test: &TestCase) -> Result<(), String> {
        let Some(known) = &self.known_targets else {
            return Ok(());
        };
        match test
            .statements()
            .iter()
            .position(|s| !known.contains(&s.target))
        {
            Some(pos) => Err(format!(
                "unknown target '{}' at statement {}",
                test.statements()[pos].target,
                pos
            )),
            None => Ok(()),
        }
    }
}

fn run_statements<S, F>(harness_fn: &F, statements: &[Statement], events: &mpsc::Sender<HarnessEvent>)
where
    S: Default,
    F: Fn(&Statement, &mut ExecutionContext<S>) -> Result<(), String>,
{
    let mut ctx = ExecutionContext {
        state: S::default(),
        covered: BTreeSet::new(),
    };

    for (position, statement) in statements.iter().enumerate() {
        ctx.cover(Criterion::Method.goal_id(&statement.target));

        let result = catch_unwind(AssertUnwindSafe(|| harness_fn(statement, &mut ctx)));

        let exception = match result {
            Ok(Ok(())) => {
                ctx.cover(Criterion::MethodNoException.goal_id(&statement.target));
                None
            }
            Ok(Err(msg)) => Some(Exception::CandidateRaised(msg)),
            Err(panic_payload) => {
                let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic type".to_string()
                };
                Some(Exception::CandidateRaised(msg))
            }
        };

        let raised = exception.is_some();
        if events
            .send(HarnessEvent::Statement {
                position,
                exception,
            })
            .is_err()
        {
            return;
        }
        if raised {
            break;
        }
    }
    let _ = events.send(HarnessEvent::Finished(ctx.covered));
}

impl<S, F> Executor for InProcessExecutor<S, F>
where
    S: Default + 'static,
    F: Fn(&Statement, &mut ExecutionContext<S>) -> Result<(), String> + Send + Sync + 'static,
{
    fn run(&mut self, test: &TestCase) -> ExecutionTrace {
        if let Err(reason) = self.check_compiles(test) {
            log::debug!("Test does not compile: {reason}");
            return ExecutionTrace::compile_failure(reason);
        }

        let (tx, rx) = mpsc::channel();
        let harness_fn = Arc::clone(&self.harness_fn);
        let statements = test.statements().to_vec();
        let spawned = std::thread::Builder::new()
            .name("scatter-harness".to_string())
            .spawn(move || run_statements::<S, F>(&harness_fn, &statements, &tx));
        if let Err(e) = spawned {
            return ExecutionTrace::compile_failure(format!("Failed to spawn harness thread: {e}"));
        }

        let deadline = Instant::now() + self.timeout;
        let mut trace = ExecutionTrace::new();
        let mut reached = 0usize;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(HarnessEvent::Statement {
                    position,
                    exception,
                }) => {
                    trace.record(position, exception);
                    reached = position + 1;
                }
                Ok(HarnessEvent::Finished(covered)) => {
                    for goal in covered {
                        trace.cover(goal);
                    }
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if reached < test.len() {
                        log::warn!("Test exceeded {:?} at statement {reached}", self.timeout);
                        trace.record(reached, Some(Exception::Timeout));
                    }
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        trace
    }
}

pub enum InputDelivery {
    StdIn,
    File(String),
}

pub struct CommandExecutorConfig {
    pub command: Vec<String>,
    pub input_delivery: InputDelivery,
    pub timeout: Duration,
    pub working_dir: Option<PathBuf>,
}

/// One line of driver output: either a statement effect or a compile error.
#[derive(Deserialize, Debug, Default)]
struct DriverLine {
    position: Option<usize>,
    #[serde(default)]
    covered: Vec<String>,
    exception: Option<String>,
    compile_error: Option<String>,
}

/// Runs each test in an external driver process.
///
/// The driver receives the test case as JSON and answers with one JSON line per
/// executed statement, e.g. `{"position":0,"covered":["method:push"],"exception":null}`,
/// or a single `{"compile_error":"..."}` line.
pub struct CommandExecutor {
    config: CommandExecutorConfig,
}

impl CommandExecutor {
    pub fn new(config: CommandExecutorConfig) -> Self {
        Self { config }
    }

    fn run_and_wait_with_timeout(
        &self,
        child: &mut Child,
        timeout: Duration,
    ) -> Result<ExitStatus, Exception> {
        let start_time = Instant::now();

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if start_time.elapsed() > timeout {
                        log::warn!("Driver timed out, killing...");
                        if let Err(e) = child.kill() {
                            log::error!("Failed to kill driver process: {e}");
                        }
                        let _ = child.wait();
                        return Err(Exception::Timeout);
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    log::error!("Error waiting for driver process: {e}");
                    return Err(Exception::CompileFailure(format!(
                        "Error waiting for driver: {e}"
                    )));
                }
            }
        }
    }
}

impl Executor for CommandExecutor {
    fn run(&mut self, test: &TestCase) -> ExecutionTrace {
        let payload = match serde_json::to_vec(test) {
            Ok(p) => p,
            Err(e) => return ExecutionTrace::compile_failure(format!("Failed to encode test: {e}")),
        };

        let Some(program) = self.config.command.first() else {
            return ExecutionTrace::compile_failure("Driver command is empty");
        };
        let mut cmd = Command::new(program);
        cmd.args(&self.config.command[1..]);

        if let Some(cwd) = &self.config.working_dir {
            cmd.current_dir(cwd);
        }

        let mut temp_file_handle: Option<tempfile::NamedTempFile> = None;

        match &self.config.input_delivery {
            InputDelivery::StdIn => {
                cmd.stdin(Stdio::piped());
            }
            InputDelivery::File(arg_template) => {
                let named_temp_file = match tempfile::NamedTempFile::new() {
                    Ok(f) => f,
                    Err(e) => {
                        return ExecutionTrace::compile_failure(format!(
                            "Failed to create temp file: {e}"
                        ));
                    }
                };
                if let Err(e) =
                    File::create(named_temp_file.path()).and_then(|mut f| f.write_all(&payload))
                {
                    return ExecutionTrace::compile_failure(format!(
                        "Failed to write to temp file {:?}: {}",
                        named_temp_file.path(),
                        e
                    ));
                }

                let Some(path_str) = named_temp_file.path().to_str() else {
                    return ExecutionTrace::compile_failure("Temp file path is not valid UTF-8");
                };

                let final_arg = arg_template.replace("{}", path_str);
                for part in final_arg.split_whitespace() {
                    cmd.arg(part);
                }
                cmd.stdin(Stdio::null());
                temp_file_handle = Some(named_temp_file);
            }
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::null());

        let mut child_process = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let error_msg =
                    format!("Failed to spawn command '{:?}': {}", self.config.command, e);
                log::error!("{error_msg}");
                return ExecutionTrace::compile_failure(error_msg);
            }
        };

        let deadline = Instant::now() + self.config.timeout;

        if let InputDelivery::StdIn = self.config.input_delivery {
            if let Some(mut child_stdin) = child_process.stdin.take() {
                std::thread::spawn(move || {
                    if let Err(e) = child_stdin.write_all(&payload) {
                        log::debug!("Driver stopped reading stdin: {e}");
                    }
                });
            }
        }

        let Some(stdout) = child_process.stdout.take() else {
            let _ = child_process.kill();
            let _ = child_process.wait();
            return ExecutionTrace::compile_failure("Driver stdout was not available");
        };
        let (tx, rx) = mpsc::channel::<String>();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(l) => {
                        if tx.send(l).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let mut trace = ExecutionTrace::new();
        let mut reached = 0usize;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(raw) => {
                    let line: DriverLine = match serde_json::from_str(raw.trim()) {
                        Ok(l) => l,
                        Err(e) => {
                            log::debug!("Ignoring driver output {raw:?}: {e}");
                            continue;
                        }
                    };
                    if let Some(reason) = line.compile_error {
                        let _ = child_process.kill();
                        let _ = child_process.wait();
                        return ExecutionTrace::compile_failure(reason);
                    }
                    let Some(position) = line.position else {
                        continue;
                    };
                    for goal in line.covered {
                        trace.cover(goal);
                    }
                    trace.record(position, line.exception.map(Exception::CandidateRaised));
                    reached = position + 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("Driver timed out after {reached} statements, killing...");
                    let _ = child_process.kill();
                    let _ = child_process.wait();
                    trace.record(reached, Some(Exception::Timeout));
                    return trace;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let exit_status = self.run_and_wait_with_timeout(&mut child_process, remaining);
        drop(temp_file_handle);

        match exit_status {
            Ok(status) if !status.success() && trace.first_exception().is_none() => {
                if !test.is_empty() {
                    let desc = match status.code() {
                        Some(code) => format!("Exited with code {code}"),
                        None => "Exited abnormally".to_string(),
                    };
                    let position = reached.min(test.len() - 1);
                    trace.record(position, Some(Exception::CandidateRaised(desc)));
                }
            }
            Ok(_) => {}
            Err(exception) => {
                if trace.first_exception().is_none() {
                    trace.record(reached, Some(exception));
                }
            }
        }
        trace
    }
}
