use crate::executor::ExecutionTrace;
use bincode::Encode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single call against the system under test, e.g. `push(3)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Encode)]
pub struct Statement {
    pub target: String,
    #[serde(default)]
    pub args: Vec<i64>,
}

impl Statement {
    pub fn new(target: impl Into<String>, args: Vec<i64>) -> Self {
        Self {
            target: target.into(),
            args,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.target)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// An ordered sequence of statements plus the trace of its last execution.
///
/// The cached trace is only trusted while the test is unchanged: any structural
/// edit (`push`, `chop`) marks the test as changed, and callers re-run it before
/// consulting coverage again.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestCase {
    statements: Vec<Statement>,
    #[serde(skip)]
    changed: bool,
    #[serde(skip)]
    last_execution: Option<ExecutionTrace>,
}

impl TestCase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_statements(statements: Vec<Statement>) -> Self {
        Self {
            statements,
            changed: true,
            last_execution: None,
        }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
        self.changed = true;
    }

    /// Keeps the first `len` statements and drops the rest.
    pub fn chop(&mut self, len: usize) {
        if len < self.statements.len() {
            self.statements.truncate(len);
            self.changed = true;
        }
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }

    pub fn last_execution(&self) -> Option<&ExecutionTrace> {
        self.last_execution.as_ref()
    }

    /// Caches `trace` as the result of running the current statements.
    pub fn set_last_execution(&mut self, trace: ExecutionTrace) {
        self.last_execution = Some(trace);
        self.changed = false;
    }

    pub fn clear_last_execution(&mut self) {
        self.last_execution = None;
    }

    /// Returns the cached trace only if it still describes the current statements.
    pub fn fresh_execution(&self) -> Option<&ExecutionTrace> {
        if self.changed {
            None
        } else {
            self.last_execution.as_ref()
        }
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            writeln!(f, "{statement};")?;
        }
        Ok(())
    }
}
