//! Virtual Executor
//!
//! Runs registry handlers in-process with the same fan-out contract the
//! external executor provides. Value handlers race against cancellation;
//! stream handlers are driven chunk by chunk, with the source's close hook
//! invoked on cancellation so handler-side resources are released.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;

use super::{trace_command, StageIo, StdinFeed, StdoutRoute};
use crate::commands::{consumes_stdin, CommandContext, CommandResult, Handler, StreamOpen};
use crate::runner::{RunnerInner, StdinMode, StreamKind};
use crate::stream;

pub(crate) async fn run(
    inner: &Arc<RunnerInner>,
    handler: Handler,
    name: &str,
    args: Vec<String>,
    io: StageIo,
) -> i32 {
    let display = if args.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", name, args.join(" "))
    };
    trace_command(inner, &display).await;

    let stdin = match materialize_stdin(inner, name, io.stdin).await {
        Some(stdin) => stdin,
        None => return inner.kill_code(),
    };

    let ctx = CommandContext {
        args,
        stdin,
        cwd: context_cwd(inner),
        env: context_env(inner),
        cancel: inner.cancel.child_token(),
    };

    let mut sink = match StageSink::open(inner, io.stdout).await {
        Ok(sink) => sink,
        Err(msg) => {
            inner
                .handle_chunk(StreamKind::Stderr, msg.as_bytes(), io.live_stderr)
                .await;
            return 1;
        }
    };

    match handler {
        Handler::Value(cmd) => {
            let result = tokio::select! {
                result = cmd.execute(ctx) => result,
                _ = inner.cancel.cancelled() => return inner.kill_code(),
            };
            // A result racing the cancellation does not beat the kill.
            if inner.is_cancelled() {
                return inner.kill_code();
            }
            emit_result(inner, &mut sink, result, io.live_stderr).await
        }
        Handler::Stream(cmd) => {
            let opened = tokio::select! {
                opened = cmd.open(ctx) => opened,
                _ = inner.cancel.cancelled() => return inner.kill_code(),
            };
            match opened {
                StreamOpen::Immediate(result) => {
                    emit_result(inner, &mut sink, result, io.live_stderr).await
                }
                StreamOpen::Stream(mut source) => {
                    loop {
                        let chunk = tokio::select! {
                            chunk = source.next_chunk() => chunk,
                            _ = inner.cancel.cancelled() => {
                                source.close().await;
                                return inner.kill_code();
                            }
                        };
                        match chunk {
                            None => break,
                            Some(bytes) => {
                                if !sink.write(inner, &bytes).await {
                                    // Downstream is gone; stop producing.
                                    break;
                                }
                            }
                        }
                    }
                    source.close().await;
                    if inner.is_cancelled() {
                        return inner.kill_code();
                    }
                    0
                }
            }
        }
    }
}

async fn emit_result(
    inner: &Arc<RunnerInner>,
    sink: &mut StageSink,
    result: CommandResult,
    live_stderr: bool,
) -> i32 {
    if !result.stdout.is_empty() {
        sink.write(inner, result.stdout.as_bytes()).await;
    }
    if !result.stderr.is_empty() {
        inner
            .handle_chunk(StreamKind::Stderr, result.stderr.as_bytes(), live_stderr)
            .await;
    }
    result.exit_code
}

/// Handler stdout destination, mirroring the external executor's routes.
enum StageSink {
    Fanout,
    Stream(tokio::sync::mpsc::Sender<Vec<u8>>),
    File(tokio::fs::File),
}

impl StageSink {
    async fn open(_inner: &Arc<RunnerInner>, route: StdoutRoute) -> Result<Self, String> {
        match route {
            StdoutRoute::Fanout => Ok(StageSink::Fanout),
            StdoutRoute::Stream(tx) => Ok(StageSink::Stream(tx)),
            StdoutRoute::File { path, append } => {
                let mut opts = tokio::fs::OpenOptions::new();
                opts.create(true).write(true);
                if append {
                    opts.append(true);
                } else {
                    opts.truncate(true);
                }
                match opts.open(&path).await {
                    Ok(file) => Ok(StageSink::File(file)),
                    Err(e) => Err(format!("{}: {}\n", path.display(), e)),
                }
            }
        }
    }

    /// Returns false when the destination has gone away.
    async fn write(&mut self, inner: &Arc<RunnerInner>, bytes: &[u8]) -> bool {
        match self {
            StageSink::Fanout => {
                inner.handle_chunk(StreamKind::Stdout, bytes, true).await;
                true
            }
            StageSink::Stream(tx) => tx.send(bytes.to_vec()).await.is_ok(),
            StageSink::File(file) => file.write_all(bytes).await.is_ok(),
        }
    }
}

/// Produce the stdin string a handler receives.
///
/// Host stdin (`Inherit`) is consumed only for builtins that actually read
/// input; draining it for a handler that never looks at stdin would steal
/// bytes from the host and block on hosts whose stdin stays open.
async fn materialize_stdin(
    inner: &Arc<RunnerInner>,
    name: &str,
    feed: StdinFeed,
) -> Option<String> {
    match feed {
        StdinFeed::Null => Some(String::new()),
        StdinFeed::Bytes(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        StdinFeed::Stream(rx) => {
            let collected = tokio::select! {
                collected = stream::collect(rx) => collected,
                _ = inner.cancel.cancelled() => return None,
            };
            Some(String::from_utf8_lossy(&collected).into_owned())
        }
        StdinFeed::FromOptions => match &inner.options.stdin {
            StdinMode::Bytes(bytes) => {
                inner.capture_stdin(bytes);
                Some(String::from_utf8_lossy(bytes).into_owned())
            }
            StdinMode::Inherit if consumes_stdin(name) && !super::host_stdin_is_tty() => {
                let collected = tokio::select! {
                    collected = read_host_stdin() => collected,
                    _ = inner.cancel.cancelled() => return None,
                };
                inner.capture_stdin(&collected);
                Some(String::from_utf8_lossy(&collected).into_owned())
            }
            _ => Some(String::new()),
        },
    }
}

async fn read_host_stdin() -> Vec<u8> {
    use tokio::io::AsyncReadExt;
    let mut host = tokio::io::stdin();
    let mut out = Vec::new();
    let _ = host.read_to_end(&mut out).await;
    out
}

fn context_cwd(inner: &Arc<RunnerInner>) -> String {
    match &inner.options.cwd {
        Some(cwd) => cwd.to_string_lossy().into_owned(),
        None => std::env::current_dir()
            .map(|d| d.to_string_lossy().into_owned())
            .unwrap_or_else(|_| ".".to_string()),
    }
}

fn context_env(inner: &Arc<RunnerInner>) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    if let Some(extra) = &inner.options.env {
        for (key, value) in extra {
            env.insert(key.clone(), value.clone());
        }
    }
    env
}
