use crate::executor::{ExecutionOutcome, Executor};
use crate::testcase::TestCase;

/// What to do with a freshly generated test after running it once.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Ran cleanly; the test carries its trace.
    Keep(TestCase),
    /// Raised an exception; everything after the failing statement was removed.
    Truncated(TestCase),
    /// Hit a timeout or did not compile; the test is dropped.
    Discard(ExecutionOutcome),
}

/// Runs `test` and decides whether to keep, truncate or discard it.
///
/// Only the first exception of the trace matters. A candidate-raised exception at
/// position `p` keeps the first `p + 1` statements and drops the now stale trace.
pub fn sanitize(mut test: TestCase, executor: &mut dyn Executor) -> Verdict {
    let trace = executor.run(&test);
    match trace.outcome() {
        ExecutionOutcome::Ok => {
            test.set_last_execution(trace);
            Verdict::Keep(test)
        }
        outcome @ (ExecutionOutcome::Timeout { .. } | ExecutionOutcome::CompileFailure) => {
            log::debug!("Discarding test after {outcome:?}");
            Verdict::Discard(outcome)
        }
        ExecutionOutcome::RaisedAt { position } => {
            test.chop(position + 1);
            test.set_changed(true);
            test.clear_last_execution();
            Verdict::Truncated(test)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutionContext, InProcessExecutor};
    use crate::testcase::Statement;
    use std::time::Duration;

    fn harness(statement: &Statement, _ctx: &mut ExecutionContext<()>) -> Result<(), String> {
        match statement.target.as_str() {
            "throw" => Err("IllegalState".to_string()),
            "hang" => {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn executor() -> impl Executor {
        InProcessExecutor::new(harness)
            .with_known_targets(["ok", "throw", "hang"])
            .with_timeout(Duration::from_millis(100))
    }

    fn test_of(targets: &[&str]) -> TestCase {
        TestCase::from_statements(targets.iter().map(|t| Statement::new(*t, vec![])).collect())
    }

    #[test]
    fn clean_test_passes_through_with_trace() {
        let original = test_of(&["ok", "ok", "ok"]);
        match sanitize(original.clone(), &mut executor()) {
            Verdict::Keep(test) => {
                assert_eq!(test.statements(), original.statements());
                assert!(test.fresh_execution().is_some());
            }
            other => panic!("Expected Keep, got {other:?}"),
        }
    }

    #[test]
    fn raised_exception_truncates_after_failing_statement() {
        for position in 0..4 {
            let mut targets = vec!["ok"; 5];
            targets[position] = "throw";
            let verdict = sanitize(test_of(&targets), &mut executor());
            match verdict {
                Verdict::Truncated(test) => {
                    assert_eq!(test.len(), position + 1);
                    assert_eq!(test.statements()[position].target, "throw");
                    assert!(test.is_changed());
                    assert!(test.last_execution().is_none());
                }
                other => panic!("Expected Truncated, got {other:?}"),
            }
        }
    }

    #[test]
    fn raised_exception_on_last_statement_keeps_everything() {
        match sanitize(test_of(&["ok", "throw"]), &mut executor()) {
            Verdict::Truncated(test) => assert_eq!(test.len(), 2),
            other => panic!("Expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn compile_failure_is_discarded() {
        let verdict = sanitize(test_of(&["ok", "missing"]), &mut executor());
        assert!(matches!(verdict, Verdict::Discard(ExecutionOutcome::CompileFailure)));
    }

    #[test]
    fn timeout_is_discarded() {
        let verdict = sanitize(test_of(&["ok", "hang", "throw"]), &mut executor());
        assert!(matches!(
            verdict,
            Verdict::Discard(ExecutionOutcome::Timeout { position: 1 })
        ));
    }

    #[test]
    fn empty_test_is_kept() {
        match sanitize(TestCase::new(), &mut executor()) {
            Verdict::Keep(test) => assert!(test.is_empty()),
            other => panic!("Expected Keep, got {other:?}"),
        }
    }
}
