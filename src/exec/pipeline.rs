//! Pipeline Orchestrator
//!
//! Wires heterogeneous stages through byte streams. All-external pipelines
//! chain native pipes; pipelines with virtual stages, redirects, or
//! streaming-hazard commands thread explicit byte streams (the tee
//! variant) so buffering is never observable. Only the last stage's
//! stdout/stderr surface live; intermediate stderr is attributed to the
//! final result.

use std::process::Stdio;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::external::{
    build_command, exit_code_of, fanout_reader, spawn_stdout_route, wait_with_cancel,
};
use super::{execute_ast, StageIo, StdinFeed, StdoutRoute};
use crate::ast::types::CommandAst;
use crate::runner::{ProcessRunner, RunnerEvent, RunnerInner, Signal, StdinMode, StreamKind};
use crate::stream::{self, safe_write};

/// Commands whose buffering behavior is observable; they force the tee
/// streaming variant even in all-external pipelines.
const STREAMING_HAZARDS: &[&str] = &["jq", "grep", "sed", "cat", "awk"];

fn is_streaming_hazard(name: &str) -> bool {
    STREAMING_HAZARDS.contains(&name)
}

/// Run the stages of a parsed pipeline.
pub(crate) async fn run_stages(
    inner: &Arc<RunnerInner>,
    stages: &[CommandAst],
    io: StageIo,
) -> i32 {
    if stages.is_empty() {
        return 0;
    }
    if inner.is_cancelled() {
        return inner.kill_code();
    }

    let codes = if native_chain_eligible(inner, stages, &io) {
        run_native_chain(inner, stages, io).await
    } else {
        run_streamed(inner, stages, io).await
    };

    if inner.is_cancelled() {
        return inner.kill_code();
    }
    final_code(inner, &codes)
}

/// pipefail picks the first failing stage's code; otherwise the last
/// stage decides.
fn final_code(inner: &Arc<RunnerInner>, codes: &[i32]) -> i32 {
    let settings = inner.effective_settings();
    if settings.pipefail {
        if let Some(code) = codes.iter().find(|c| **c != 0) {
            return *code;
        }
    }
    codes.last().copied().unwrap_or(0)
}

fn native_chain_eligible(inner: &Arc<RunnerInner>, stages: &[CommandAst], io: &StageIo) -> bool {
    if !matches!(io.stdin, StdinFeed::FromOptions | StdinFeed::Null) {
        return false;
    }
    stages.iter().all(|stage| match stage {
        CommandAst::Simple {
            cmd, redirects, ..
        } => {
            redirects.is_empty()
                && !is_streaming_hazard(cmd)
                && inner.engine.registry().lookup(cmd).is_none()
        }
        _ => false,
    })
}

/// All-external path: stage i+1's stdin IS stage i's stdout, courtesy of
/// the OS pipe.
async fn run_native_chain(
    inner: &Arc<RunnerInner>,
    stages: &[CommandAst],
    io: StageIo,
) -> Vec<i32> {
    let n = stages.len();
    let mut children = Vec::with_capacity(n);
    let mut side_tasks = Vec::new();
    let mut prev_stdout: Option<tokio::process::ChildStdout> = None;
    let mut codes = vec![0i32; n];

    for (i, stage) in stages.iter().enumerate() {
        let CommandAst::Simple { cmd: program, args, .. } = stage else {
            codes[i] = 1;
            continue;
        };
        let arg_values: Vec<String> = args.iter().map(|a| a.value.clone()).collect();
        super::trace_command(inner, &stage_display(program, &arg_values)).await;

        let last = i == n - 1;
        let mut cmd = build_command(inner, program, &arg_values, true);
        if i == 0 {
            wire_first_stdin(inner, &mut cmd, &io.stdin);
        } else {
            match prev_stdout.take().map(|s| TryInto::<Stdio>::try_into(s)) {
                Some(Ok(stdio)) => {
                    cmd.stdin(stdio);
                }
                _ => {
                    cmd.stdin(Stdio::null());
                }
            }
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let msg = format!("{}: {}\n", program, e);
                inner
                    .handle_chunk(StreamKind::Stderr, msg.as_bytes(), last && io.live_stderr)
                    .await;
                codes[i] = 1;
                // A broken link starts the next stage from EOF.
                prev_stdout = None;
                continue;
            }
        };
        let pid = child.id().unwrap_or(0);
        if pid != 0 {
            inner.add_child_pid(pid);
        }

        if i == 0 {
            if let Some(task) = spawn_first_stdin_task(inner, &mut child) {
                side_tasks.push(task);
            }
        }
        if let Some(stderr) = child.stderr.take() {
            let reader_inner = inner.clone();
            let live = last && io.live_stderr;
            side_tasks.push(tokio::spawn(async move {
                fanout_reader(reader_inner, stderr, StreamKind::Stderr, live).await;
            }));
        }
        if last {
            if let Some(stdout) = child.stdout.take() {
                side_tasks.push(spawn_stdout_route(inner, stdout, io.stdout.clone()));
            }
        } else {
            prev_stdout = child.stdout.take();
        }
        children.push((i, pid, child));
    }

    for (i, pid, mut child) in children {
        let status = wait_with_cancel(inner, &mut child, pid).await;
        codes[i] = exit_code_of(inner, status);
        if pid != 0 {
            inner.remove_child_pid(pid);
        }
    }
    for task in side_tasks {
        let _ = task.await;
    }
    codes
}

/// First-stage stdin wiring for the native chain. Complex host modes fall
/// back to a pumped pipe.
fn wire_first_stdin(inner: &Arc<RunnerInner>, cmd: &mut tokio::process::Command, feed: &StdinFeed) {
    match feed {
        StdinFeed::Null => {
            cmd.stdin(Stdio::null());
        }
        StdinFeed::FromOptions => match &inner.options.stdin {
            StdinMode::Ignore => {
                cmd.stdin(Stdio::null());
            }
            StdinMode::Inherit if super::host_stdin_is_tty() => {
                // A TTY feeding a pipeline's head is not forwarded; the
                // chain starts from EOF.
                cmd.stdin(Stdio::null());
            }
            _ => {
                cmd.stdin(Stdio::piped());
            }
        },
        _ => {
            cmd.stdin(Stdio::piped());
        }
    }
}

fn spawn_first_stdin_task(
    inner: &Arc<RunnerInner>,
    child: &mut tokio::process::Child,
) -> Option<tokio::task::JoinHandle<()>> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stdin = child.stdin.take()?;
    match &inner.options.stdin {
        StdinMode::Bytes(bytes) => {
            let bytes = bytes.clone();
            inner.capture_stdin(&bytes);
            Some(tokio::spawn(async move {
                let _ = safe_write(&mut stdin, &bytes).await;
                let _ = stdin.shutdown().await;
            }))
        }
        StdinMode::Pipe => {
            let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
            inner.set_stdin_sender(tx);
            Some(tokio::spawn(async move {
                while let Some(chunk) = rx.recv().await {
                    if !matches!(
                        safe_write(&mut stdin, &chunk).await,
                        Ok(stream::WriteOutcome::Written)
                    ) {
                        break;
                    }
                }
                let _ = stdin.shutdown().await;
            }))
        }
        StdinMode::Inherit => {
            let pump_inner = inner.clone();
            Some(tokio::spawn(async move {
                let mut host = tokio::io::stdin();
                let mut buf = vec![0u8; stream::CHUNK_SIZE];
                loop {
                    match host.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            pump_inner.capture_stdin(&buf[..n]);
                            if !matches!(
                                safe_write(&mut stdin, &buf[..n]).await,
                                Ok(stream::WriteOutcome::Written)
                            ) {
                                break;
                            }
                        }
                    }
                }
                let _ = stdin.shutdown().await;
            }))
        }
        StdinMode::Ignore => None,
    }
}

fn stage_display(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Mixed / tee path: every stage runs as its own task; a logical byte
/// stream threads stage i's output into stage i+1's input.
async fn run_streamed(inner: &Arc<RunnerInner>, stages: &[CommandAst], io: StageIo) -> Vec<i32> {
    let n = stages.len();
    let mut feed = io.stdin;
    let mut tasks = Vec::with_capacity(n);

    for (i, stage) in stages.iter().enumerate() {
        let last = i == n - 1;
        let (route, next_feed) = if last {
            (io.stdout.clone(), StdinFeed::Null)
        } else {
            let (tx, rx) = mpsc::channel::<Vec<u8>>(16);
            (StdoutRoute::Stream(tx), StdinFeed::Stream(rx))
        };
        let stage_io = StageIo {
            stdin: std::mem::replace(&mut feed, next_feed),
            stdout: route,
            live_stderr: last && io.live_stderr,
        };
        let stage_inner = inner.clone();
        let stage_ast = stage.clone();
        tasks.push(tokio::spawn(async move {
            execute_ast(&stage_inner, &stage_ast, stage_io).await
        }));
    }

    let mut codes = Vec::with_capacity(n);
    for task in tasks {
        codes.push(task.await.unwrap_or(1));
    }
    codes
}

/// Programmatic `source.pipe(dest)`: run the source to completion, feed
/// its stdout to a fresh runner built from the destination's spec, and
/// adopt that runner's result. The two stages' stderr is concatenated in
/// order.
pub(crate) async fn run_programmatic(
    inner: &Arc<RunnerInner>,
    source: &ProcessRunner,
    dest: &ProcessRunner,
) -> i32 {
    let src_result = source.wait_unchecked().await;
    if !src_result.stderr.is_empty() {
        inner
            .handle_chunk(StreamKind::Stderr, src_result.stderr.as_bytes(), false)
            .await;
    }
    if inner.is_cancelled() {
        return inner.kill_code();
    }

    let mut dest_options = dest.options_clone();
    dest_options.stdin = StdinMode::Bytes(src_result.stdout.into_bytes());
    let dest_run = inner
        .engine
        .spawn_spec(dest.spec().clone(), dest_options);

    // Cancelling the pipeline cancels the live destination stage.
    let cancel_link = {
        let token = inner.cancel.clone();
        let target = dest_run.clone();
        tokio::spawn(async move {
            token.cancelled().await;
            target.kill(Signal::Term);
        })
    };

    let mut events = dest_run.events();
    let forward_inner = inner.clone();
    let forward = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if let RunnerEvent::Chunk(chunk) = event {
                forward_inner.forward_chunk(chunk);
            }
        }
    });

    let dest_result = dest_run.wait_unchecked().await;
    let _ = forward.await;
    cancel_link.abort();

    if inner.is_cancelled() {
        return inner.kill_code();
    }
    dest_result.code
}
