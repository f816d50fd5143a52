// tests/task_machine.rs

use wrapngo::engine::{Decision, TaskMachine};
use wrapngo::errors::WrapError;
use wrapngo::types::{Phase, Stage};

fn op_failed(stage: Stage) -> WrapError {
    WrapError::OperationFailed {
        task: "t".to_string(),
        stage,
        reason: "exit status 1".to_string(),
    }
}

#[test]
fn happy_path_walks_every_phase() {
    let mut m = TaskMachine::new("t");
    assert_eq!(m.phase(), Phase::PreOps);

    assert_eq!(m.record(Stage::PreOperation(1), Ok(()), true), Decision::Continue);
    m.enter_job();
    assert_eq!(m.phase(), Phase::Job);
    assert_eq!(m.record(Stage::Job, Ok(()), true), Decision::Continue);
    assert_eq!(m.phase(), Phase::PostOps);
    assert_eq!(m.record(Stage::PostOperation(1), Ok(()), true), Decision::Continue);

    assert!(m.finish().is_ok());
}

#[test]
fn stop_flag_is_evaluated_per_unit() {
    let mut m = TaskMachine::new("t");
    assert_eq!(
        m.record(Stage::PreOperation(1), Err(op_failed(Stage::PreOperation(1))), false),
        Decision::Continue
    );
    assert_eq!(
        m.record(Stage::PreOperation(2), Err(op_failed(Stage::PreOperation(2))), true),
        Decision::Abort
    );
    assert_eq!(m.phase(), Phase::Aborted);
    assert_eq!(m.tolerated_failures(), 1);

    let err = m.finish().expect_err("aborted task reports its failure");
    assert_eq!(err.stage(), Some(Stage::PreOperation(2)));
}

#[test]
fn interrupt_aborts_regardless_of_stop_flag() {
    let mut m = TaskMachine::new("t");
    m.enter_job();
    let interrupt = WrapError::UserInterrupt {
        task: "t".to_string(),
        stage: Stage::Job,
    };

    assert_eq!(m.record(Stage::Job, Err(interrupt), false), Decision::Abort);
    assert!(matches!(m.finish(), Err(WrapError::UserInterrupt { .. })));
}

#[test]
fn tolerated_job_failure_moves_to_post_operations() {
    let mut m = TaskMachine::new("t");
    m.enter_job();
    let failed = WrapError::JobFailed {
        task: "t".to_string(),
        reason: "exit status 2".to_string(),
    };

    assert_eq!(m.record(Stage::Job, Err(failed), false), Decision::Continue);
    assert_eq!(m.phase(), Phase::PostOps);
    assert!(m.finish().is_ok());
}

#[test]
fn trailing_post_failure_is_cleared_by_a_later_success() {
    let mut m = TaskMachine::new("t");
    m.enter_job();
    m.record(Stage::Job, Ok(()), true);
    m.record(Stage::PostOperation(1), Err(op_failed(Stage::PostOperation(1))), false);
    m.record(Stage::PostOperation(2), Ok(()), false);
    assert!(m.finish().is_ok());

    let mut m = TaskMachine::new("t");
    m.enter_job();
    m.record(Stage::Job, Ok(()), true);
    m.record(Stage::PostOperation(1), Ok(()), false);
    m.record(Stage::PostOperation(2), Err(op_failed(Stage::PostOperation(2))), false);
    assert_eq!(m.finish().expect_err("last failure sticks").stage(), Some(Stage::PostOperation(2)));
}

#[test]
fn results_after_abort_are_ignored() {
    let mut m = TaskMachine::new("t");
    m.record(Stage::PreOperation(1), Err(op_failed(Stage::PreOperation(1))), true);

    assert_eq!(m.record(Stage::PreOperation(2), Ok(()), false), Decision::Abort);
    assert_eq!(
        m.record(Stage::PreOperation(3), Err(op_failed(Stage::PreOperation(3))), true),
        Decision::Abort
    );
    m.enter_job();
    assert_eq!(m.phase(), Phase::Aborted);

    assert_eq!(m.finish().expect_err("first abort wins").stage(), Some(Stage::PreOperation(1)));
}
