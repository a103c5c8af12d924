use crate::suite::{FitnessVector, TestSuite};
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// Runtime variables reported to the telemetry sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    TotalGoals,
    CoveredGoals,
    FitnessEvaluations,
    ExecutedTests,
    Iterations,
    AcceptedCandidates,
    DiscardedTests,
    TruncatedTests,
    SuiteSize,
    SuiteLength,
}

impl Counter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Counter::TotalGoals => "total_goals",
            Counter::CoveredGoals => "covered_goals",
            Counter::FitnessEvaluations => "fitness_evaluations",
            Counter::ExecutedTests => "executed_tests",
            Counter::Iterations => "iterations",
            Counter::AcceptedCandidates => "accepted_candidates",
            Counter::DiscardedTests => "discarded_tests",
            Counter::TruncatedTests => "truncated_tests",
            Counter::SuiteSize => "suite_size",
            Counter::SuiteLength => "suite_length",
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A one-way channel for search progress.
///
/// Reports are best-effort: implementations swallow their own failures and the
/// search never waits on or retries them.
pub trait TelemetrySink: Send {
    fn report_accepted(&mut self, suite: &TestSuite);
    fn report_counter(&mut self, counter: Counter, value: f64);
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Box<T> {
    fn report_accepted(&mut self, suite: &TestSuite) {
        (**self).report_accepted(suite)
    }

    fn report_counter(&mut self, counter: Counter, value: f64) {
        (**self).report_counter(counter, value)
    }
}

/// A sink that drops everything.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoOpTelemetry;

impl TelemetrySink for NoOpTelemetry {
    fn report_accepted(&mut self, _suite: &TestSuite) {}

    fn report_counter(&mut self, _counter: Counter, _value: f64) {}
}

/// Writes reports through the `log` facade.
#[derive(Default, Debug, Clone, Copy)]
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    fn report_accepted(&mut self, suite: &TestSuite) {
        log::debug!(
            "Accepted suite {} ({} tests, fitness {:?})",
            suite.digest(),
            suite.len(),
            suite.fitness().map(FitnessVector::total)
        );
    }

    fn report_counter(&mut self, counter: Counter, value: f64) {
        log::info!("{counter} = {value}");
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record<'a> {
    Accepted {
        digest: String,
        tests: usize,
        length: usize,
        fitness: Option<&'a FitnessVector>,
    },
    Counter {
        name: Counter,
        value: f64,
    },
}

/// Writes one JSON object per report to `W`.
pub struct JsonLinesTelemetry<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesTelemetry<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, record: &Record<'_>) {
        let result = serde_json::to_writer(&mut self.writer, record)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush());
        if let Err(e) = result {
            log::warn!("Dropping telemetry record: {e}");
        }
    }
}

impl<W: Write + Send> TelemetrySink for JsonLinesTelemetry<W> {
    fn report_accepted(&mut self, suite: &TestSuite) {
        self.emit(&Record::Accepted {
            digest: suite.digest(),
            tests: suite.len(),
            length: suite.total_length(),
            fitness: suite.fitness(),
        });
    }

    fn report_counter(&mut self, counter: Counter, value: f64) {
        self.emit(&Record::Counter {
            name: counter,
            value,
        });
    }
}

/// Keeps every report in memory.
#[derive(Default, Debug, Clone)]
pub struct RecordingTelemetry {
    pub accepted: Vec<TestSuite>,
    pub counters: Vec<(Counter, f64)>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent value reported for `counter`.
    pub fn counter(&self, counter: Counter) -> Option<f64> {
        self.counters
            .iter()
            .rev()
            .find(|(c, _)| *c == counter)
            .map(|(_, v)| *v)
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn report_accepted(&mut self, suite: &TestSuite) {
        self.accepted.push(suite.clone());
    }

    fn report_counter(&mut self, counter: Counter, value: f64) {
        self.counters.push((counter, value));
    }
}
