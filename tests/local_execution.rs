#![cfg(unix)]

mod common;
use crate::common::fake_channel::{RecordingChannel, live_group_members, process_exists};
use crate::common::{init_tracing, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use projectstep::errors::{BuildFailure, ExecError};
use projectstep::exec::{CancellationToken, CommandExecutor, LocalChannel};
use projectstep::step::{BuildStep, PlaceholderCommand, START_MARKER};
use projectstep::types::{CommandSpec, ExecutionResult, ProjectSelection};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn echo_test_in_workspace() -> TestResult {
    init_tracing();
    let ws = tempfile::tempdir()?;

    let result = CommandExecutor::new()
        .execute(
            &CommandSpec::new("echo test", ws.path()),
            &LocalChannel::new(),
            &CancellationToken::new(),
        )
        .await?;
    assert_eq!(
        result,
        ExecutionResult {
            exit_code: 0,
            combined_output: b"test\n".to_vec(),
        }
    );

    let mut log = Vec::new();
    BuildStep::new()
        .run(
            &ProjectSelection::new("project1"),
            ws.path(),
            &LocalChannel::new(),
            &mut log,
            &CancellationToken::new(),
        )
        .await?;
    assert_eq!(String::from_utf8(log)?, format!("{START_MARKER}\ntest\n"));
    Ok(())
}

#[tokio::test]
async fn exit_seven_fails_with_code_seven() -> TestResult {
    init_tracing();
    let ws = tempfile::tempdir()?;

    let result = CommandExecutor::new()
        .execute(
            &CommandSpec::new("sh -c 'exit 7'", ws.path()),
            &LocalChannel::new(),
            &CancellationToken::new(),
        )
        .await?;
    assert_eq!(result.exit_code, 7);

    let step = BuildStep::with_resolver(Arc::new(PlaceholderCommand::new("sh -c 'exit 7'")));
    let mut log = Vec::new();
    let failure = step
        .run(
            &ProjectSelection::new("project1"),
            ws.path(),
            &LocalChannel::new(),
            &mut log,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(failure, BuildFailure::NonZeroExit { code: 7 }));
    assert!(String::from_utf8(log)?.contains("exit code 7"));
    Ok(())
}

#[tokio::test]
async fn stdout_and_stderr_tokens_all_captured() -> TestResult {
    init_tracing();
    let ws = tempfile::tempdir()?;
    let step = BuildStep::with_resolver(Arc::new(PlaceholderCommand::new(
        "sh -c 'echo alpha; echo beta 1>&2; echo gamma; echo delta 1>&2; exit 3'",
    )));

    let mut log = Vec::new();
    let failure = step
        .run(
            &ProjectSelection::new("project1"),
            ws.path(),
            &LocalChannel::new(),
            &mut log,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(failure.exit_code(), Some(3));

    let log = String::from_utf8(log)?;
    for token in ["alpha", "beta", "gamma", "delta"] {
        assert!(log.contains(token), "missing {token} in {log}");
    }
    Ok(())
}

#[tokio::test]
async fn cancelling_kills_the_child_process() -> TestResult {
    init_tracing();
    let ws = tempfile::tempdir()?;
    let channel = RecordingChannel::new();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = with_timeout(CommandExecutor::new().execute(
        &CommandSpec::new("sleep 30", ws.path()),
        &channel,
        &cancel,
    ))
    .await
    .unwrap_err();

    assert!(matches!(err, ExecError::Interrupted { .. }), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));

    let pids = channel.pids();
    assert_eq!(pids.len(), 1);
    assert!(!process_exists(pids[0]), "pid {} still alive", pids[0]);
    Ok(())
}

#[tokio::test]
async fn cancelling_kills_forked_grandchildren() -> TestResult {
    init_tracing();
    let ws = tempfile::tempdir()?;
    let channel = RecordingChannel::new();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    // `; true` keeps the shell from exec-ing sleep, so sleep is a grandchild.
    let err = with_timeout(CommandExecutor::new().execute(
        &CommandSpec::new("sh -c 'sleep 30; true'", ws.path()),
        &channel,
        &cancel,
    ))
    .await
    .unwrap_err();
    assert!(matches!(err, ExecError::Interrupted { .. }), "got {err:?}");

    let pgid = channel.pids()[0];
    let mut survivors = live_group_members(pgid);
    for _ in 0..50 {
        if survivors.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        survivors = live_group_members(pgid);
    }
    assert!(survivors.is_empty(), "group {pgid} still has {survivors:?}");
    Ok(())
}

#[tokio::test]
async fn concurrent_invocations_do_not_share_output() -> TestResult {
    init_tracing();
    let ws = tempfile::tempdir()?;
    let executor = CommandExecutor::new();
    let channel = LocalChannel::new();
    let cancel = CancellationToken::new();

    let spec_a = CommandSpec::new("sh -c 'echo one; sleep 0.1; echo two'", ws.path());
    let spec_b = CommandSpec::new("sh -c 'echo three; sleep 0.1; echo four'", ws.path());
    let (a, b) = tokio::join!(
        executor.execute(&spec_a, &channel, &cancel),
        executor.execute(&spec_b, &channel, &cancel),
    );

    assert_eq!(a?.output_lossy(), "one\ntwo\n");
    assert_eq!(b?.output_lossy(), "three\nfour\n");
    Ok(())
}
