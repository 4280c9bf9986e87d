mod common;
use crate::common::fake_channel::{FakeChannel, Script};
use crate::common::{init_tracing, with_timeout};

use std::io;
use std::path::Path;
use std::time::Duration;

use proptest::prelude::*;

use projectstep::errors::{BuildFailure, ExecError, FailureKind};
use projectstep::exec::CancellationToken;
use projectstep::step::{BuildStep, START_MARKER};
use projectstep::types::ProjectSelection;

async fn run_with(
    channel: &FakeChannel,
    project: &str,
    cancel: &CancellationToken,
) -> (Result<(), BuildFailure>, String) {
    let mut log = Vec::new();
    let result = BuildStep::new()
        .run(
            &ProjectSelection::new(project),
            Path::new("/tmp/ws"),
            channel,
            &mut log,
            cancel,
        )
        .await;
    (result, String::from_utf8(log).expect("utf8 log"))
}

proptest! {
    #[test]
    fn blank_selection_never_launches(project in "[ \t\r\n]{0,8}") {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let channel = FakeChannel::new(Script::exit(0, "should not run\n"));

        let (result, log) = rt.block_on(run_with(&channel, &project, &CancellationToken::new()));

        prop_assert!(matches!(result, Err(BuildFailure::Configuration(_))));
        prop_assert_eq!(channel.launch_count(), 0);
        prop_assert!(log.is_empty());
    }

    #[test]
    fn non_zero_exit_carries_code_and_logs_output_first(code in prop_oneof![-255i32..0, 1i32..=255]) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let channel = FakeChannel::new(Script::exit(code, "diagnostic output\n"));

        let (result, log) = rt.block_on(run_with(&channel, "project1", &CancellationToken::new()));

        let failure = result.unwrap_err();
        prop_assert_eq!(failure.exit_code(), Some(code));
        prop_assert_eq!(failure.kind(), FailureKind::NonZeroExit);
        prop_assert!(log.contains("diagnostic output\n"));
    }
}

#[tokio::test]
async fn zero_exit_completes() {
    init_tracing();
    let channel = FakeChannel::new(Script::exit(0, "test\n"));

    let (result, log) = run_with(&channel, "project1", &CancellationToken::new()).await;

    result.expect("step should succeed");
    assert_eq!(log, format!("{START_MARKER}\ntest\n"));
    assert_eq!(channel.launch_count(), 1);
}

#[tokio::test]
async fn launch_request_carries_workspace_and_build_env() {
    init_tracing();
    let channel = FakeChannel::new(Script::exit(0, ""));

    let (result, _log) = run_with(&channel, "project2", &CancellationToken::new()).await;
    result.expect("step should succeed");

    let launches = channel.launches();
    assert_eq!(launches.len(), 1);
    let req = &launches[0];
    assert_eq!(req.argv, vec!["echo", "test"]);
    assert_eq!(req.cwd, Path::new("/tmp/ws"));
    assert_eq!(req.env.get("PROJECT").map(String::as_str), Some("project2"));
    assert_eq!(req.env.get("WORKSPACE").map(String::as_str), Some("/tmp/ws"));
    assert!(req.inherit_env);
}

#[tokio::test]
async fn launch_error_fails_the_build_instead_of_being_swallowed() {
    init_tracing();
    let channel = FakeChannel::new(Script::FailLaunch(io::ErrorKind::NotFound));

    let (result, log) = run_with(&channel, "project1", &CancellationToken::new()).await;

    match result {
        Err(BuildFailure::Execution(ExecError::Launch { program, node, .. })) => {
            assert_eq!(program, "echo");
            assert_eq!(node, "fake");
        }
        other => panic!("expected launch failure, got {other:?}"),
    }
    assert!(log.starts_with(START_MARKER));
    assert!(log.contains("ERROR: failed to launch 'echo' on fake"), "got: {log}");
}

#[tokio::test]
async fn cancellation_interrupts_and_kills() {
    init_tracing();
    let channel = FakeChannel::new(Script::Hang);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let (result, log) = with_timeout(run_with(&channel, "project1", &cancel)).await;

    let failure = result.unwrap_err();
    assert!(failure.is_interrupted(), "got {failure:?}");
    assert_eq!(failure.kind(), FailureKind::Execution);
    assert_eq!(channel.kill_count(), 1);
    assert!(log.contains("ERROR: interrupted"), "got: {log}");
}

#[tokio::test]
async fn already_aborted_job_launches_nothing() {
    init_tracing();
    let channel = FakeChannel::new(Script::exit(0, "x\n"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (result, _log) = run_with(&channel, "project1", &cancel).await;

    assert!(result.unwrap_err().is_interrupted());
    assert_eq!(channel.launch_count(), 0);
}
