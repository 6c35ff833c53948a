//! Cancellation: external tokens, kill(), chunk-iterator breaks, and the
//! exit codes they synthesize.

use std::time::Duration;

use command_stream::{Engine, RunOptions, Signal, StdinMode};
use tokio_util::sync::CancellationToken;

fn quiet() -> RunOptions {
    RunOptions::captured()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_external_token_cancels_virtual_sleep() {
    let engine = Engine::new();
    let token = CancellationToken::new();
    let options = quiet().with_signal(token.clone());
    let runner = engine.shell_with("sleep 5", options);
    runner.ensure_started();

    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    let result = runner.wait_unchecked().await;
    assert_eq!(result.code, 143);
    assert!(result.stderr.contains("Process killed with SIGTERM"));
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_external_token_cancels_external_child() {
    let engine = Engine::new();
    let token = CancellationToken::new();
    let options = quiet()
        .with_signal(token.clone())
        .with_stdin(StdinMode::Ignore);
    let runner = engine.exec_with("sleep", ["5"], options);
    runner.ensure_started();

    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();

    let start = std::time::Instant::now();
    let result = runner.wait_unchecked().await;
    assert_eq!(result.code, 143);
    assert!(result.stderr.contains("Process killed with SIGTERM"));
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_kill_named_sigint() {
    let engine = Engine::new();
    let runner = engine.shell_with("sleep 5", quiet());
    runner.ensure_started();
    tokio::time::sleep(Duration::from_millis(50)).await;
    runner.kill_named("SIGINT").unwrap();
    let result = runner.wait_unchecked().await;
    assert_eq!(result.code, 130);
    assert!(result.stderr.contains("SIGINT"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_kill_unknown_signal_is_usage_error() {
    let engine = Engine::new();
    let runner = engine.shell_with("sleep 5", quiet());
    assert!(runner.kill_named("SIGWHATEVER").is_err());
    runner.kill(Signal::Term);
    let result = runner.wait_unchecked().await;
    assert_eq!(result.code, 143);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_kill_before_start_finishes_synthetically() {
    let engine = Engine::new();
    let runner = engine.shell_with("sleep 5", quiet());
    runner.kill(Signal::Kill);
    let result = runner.wait_unchecked().await;
    assert_eq!(result.code, 137);
    assert!(result.stderr.contains("SIGKILL"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_kill_is_idempotent() {
    let engine = Engine::new();
    let runner = engine.shell_with("sleep 5", quiet());
    runner.ensure_started();
    tokio::time::sleep(Duration::from_millis(20)).await;
    runner.kill(Signal::Term);
    runner.kill(Signal::Kill);
    let result = runner.wait_unchecked().await;
    // First signal wins.
    assert_eq!(result.code, 143);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_break_chunk_iteration_cancels() {
    let engine = Engine::new();
    let runner = engine.shell_with("yes", quiet());
    {
        let mut chunks = runner.chunks();
        let mut seen = 0;
        while let Some(_chunk) = chunks.next().await {
            seen += 1;
            if seen >= 3 {
                break;
            }
        }
        assert_eq!(seen, 3);
        // Dropping the stream here is the break.
    }
    let result = runner.wait_unchecked().await;
    assert_eq!(result.code, 143);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancelled_runner_emits_no_chunks_after_finish() {
    let engine = Engine::new();
    let runner = engine.shell_with("yes", quiet());
    {
        let mut chunks = runner.chunks();
        let _ = chunks.next().await;
    }
    runner.wait_unchecked().await;
    // A fresh subscription after finish sees a closed stream.
    let mut late = runner.chunks();
    assert!(late.next().await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_virtual_stream_cancel_closes_source() {
    let engine = Engine::new();
    let token = CancellationToken::new();
    let options = quiet().with_signal(token.clone());
    let runner = engine.shell_with("yes spam", options);
    let mut chunks = runner.chunks();
    let first = chunks.next().await.expect("first chunk");
    assert!(first.text().starts_with("spam\n"));
    token.cancel();
    // The stream ends; no chunks after cancellation.
    while chunks.next().await.is_some() {}
    let result = runner.wait_unchecked().await;
    assert_eq!(result.code, 143);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_waiters_share_result() {
    let engine = Engine::new();
    let runner = engine.shell_with("seq 1 100", quiet());
    let a = runner.clone();
    let b = runner.clone();
    let (ra, rb) = tokio::join!(a.wait_unchecked(), b.wait_unchecked());
    assert_eq!(ra, rb);
    assert_eq!(ra.code, 0);
}
