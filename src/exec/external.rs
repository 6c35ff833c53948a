//! External Executor
//!
//! Spawns child processes, either through the located system shell (shell
//! mode) or as a direct argv (exec mode). Children are placed in their own
//! process group on unix so signal delivery reaches the whole tree. One
//! read per child stream feeds capture, mirror, and events together.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};

use super::{all_streams_are_ttys, host_stdin_is_tty, trace_command, StageIo, StdinFeed, StdoutRoute};
use crate::runner::{RunnerInner, Signal, StdinMode, StreamKind};
use crate::stream::{self, forward_tty_stdin, safe_write, CHUNK_SIZE};

/// Grace period between the requested signal and SIGKILL escalation.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Delegate a raw command string to the system shell.
pub(crate) async fn run_via_shell(inner: &Arc<RunnerInner>, command: &str, io: StageIo) -> i32 {
    let shell = inner.engine.system_shell();
    let settings = inner.effective_settings();
    let raw = if settings.nounset {
        // The structured path never expands variables; nounset only has
        // meaning on the delegated side.
        format!("set -u; {}", command)
    } else {
        command.to_string()
    };
    let mut args = shell.args.clone();
    args.push(raw);
    run_child(inner, &shell.program, &args, io, command).await
}

/// Spawn `file args...` directly, no shell.
pub(crate) async fn run_argv(
    inner: &Arc<RunnerInner>,
    file: &str,
    args: &[String],
    io: StageIo,
) -> i32 {
    let display = if args.is_empty() {
        file.to_string()
    } else {
        format!("{} {}", file, args.join(" "))
    };
    run_child(inner, file, args, io, &display).await
}

/// Build the base command with cwd, env overlay, and process-group
/// placement.
pub(crate) fn build_command(
    inner: &Arc<RunnerInner>,
    program: &str,
    args: &[String],
    own_group: bool,
) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.kill_on_drop(true);
    if let Some(cwd) = &inner.options.cwd {
        cmd.current_dir(cwd);
    }
    if let Some(env) = &inner.options.env {
        for (key, value) in env {
            cmd.env(key, value);
        }
    }
    #[cfg(unix)]
    if own_group {
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }
    }
    #[cfg(not(unix))]
    let _ = own_group;
    cmd
}

enum StdinPlan {
    Null,
    InheritAll,
    HostPump,
    TtyForward,
    PipeChannel,
    WriteBytes { bytes: Vec<u8>, capture: bool },
    FromStream(mpsc::Receiver<Vec<u8>>),
}

fn stdin_plan(inner: &Arc<RunnerInner>, feed: StdinFeed, fanout_stdout: bool) -> StdinPlan {
    match feed {
        StdinFeed::Null => StdinPlan::Null,
        StdinFeed::Bytes(bytes) => StdinPlan::WriteBytes {
            bytes,
            capture: false,
        },
        StdinFeed::Stream(rx) => StdinPlan::FromStream(rx),
        StdinFeed::FromOptions => match &inner.options.stdin {
            StdinMode::Ignore => StdinPlan::Null,
            StdinMode::Pipe => StdinPlan::PipeChannel,
            StdinMode::Bytes(bytes) => StdinPlan::WriteBytes {
                bytes: bytes.clone(),
                capture: true,
            },
            StdinMode::Inherit => {
                if inner.options.interactive && fanout_stdout && all_streams_are_ttys() {
                    StdinPlan::InheritAll
                } else if host_stdin_is_tty() {
                    StdinPlan::TtyForward
                } else {
                    StdinPlan::HostPump
                }
            }
        },
    }
}

/// Spawn one child with full stdio wiring and drive it to completion.
async fn run_child(
    inner: &Arc<RunnerInner>,
    program: &str,
    args: &[String],
    io: StageIo,
    display: &str,
) -> i32 {
    trace_command(inner, display).await;

    let fanout_stdout = matches!(io.stdout, StdoutRoute::Fanout);
    let plan = stdin_plan(inner, io.stdin, fanout_stdout);
    let inherit_all = matches!(plan, StdinPlan::InheritAll);

    let mut cmd = build_command(inner, program, args, !inherit_all);
    if inherit_all {
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
    } else {
        if matches!(plan, StdinPlan::Null) {
            cmd.stdin(Stdio::null());
        } else {
            cmd.stdin(Stdio::piped());
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            let msg = format!("{}: {}\n", program, e);
            inner
                .handle_chunk(StreamKind::Stderr, msg.as_bytes(), io.live_stderr)
                .await;
            return 1;
        }
    };
    let pid = child.id().unwrap_or(0);
    if pid != 0 {
        inner.add_child_pid(pid);
    }
    tracing::trace!(runner = inner.id, pid, program, "spawned child");

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut stdin_task = None;
    let mut tty_thread = None;

    if !inherit_all {
        let child_stdin = child.stdin.take();
        match (plan, child_stdin) {
            (StdinPlan::WriteBytes { bytes, capture }, Some(mut stdin)) => {
                if capture {
                    inner.capture_stdin(&bytes);
                }
                stdin_task = Some(tokio::spawn(async move {
                    let _ = safe_write(&mut stdin, &bytes).await;
                    let _ = stdin.shutdown().await;
                }));
            }
            (StdinPlan::FromStream(mut rx), Some(mut stdin)) => {
                stdin_task = Some(tokio::spawn(async move {
                    while let Some(chunk) = rx.recv().await {
                        if !matches!(
                            safe_write(&mut stdin, &chunk).await,
                            Ok(stream::WriteOutcome::Written)
                        ) {
                            break;
                        }
                    }
                    let _ = stdin.shutdown().await;
                }));
            }
            (StdinPlan::PipeChannel, Some(mut stdin)) => {
                let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
                inner.set_stdin_sender(tx);
                stdin_task = Some(tokio::spawn(async move {
                    while let Some(chunk) = rx.recv().await {
                        if !matches!(
                            safe_write(&mut stdin, &chunk).await,
                            Ok(stream::WriteOutcome::Written)
                        ) {
                            break;
                        }
                    }
                    let _ = stdin.shutdown().await;
                }));
            }
            (StdinPlan::HostPump, Some(mut stdin)) => {
                let pump_inner = inner.clone();
                stdin_task = Some(tokio::spawn(async move {
                    let mut host = tokio::io::stdin();
                    let mut buf = vec![0u8; CHUNK_SIZE];
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
                }));
            }
            (StdinPlan::TtyForward, Some(mut stdin)) => {
                let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
                let forward_stop = stop_rx.clone();
                tty_thread = Some(tokio::task::spawn_blocking(move || {
                    forward_tty_stdin(tx, pid, forward_stop);
                }));
                stdin_task = Some(tokio::spawn(async move {
                    while let Some(chunk) = rx.recv().await {
                        if !matches!(
                            safe_write(&mut stdin, &chunk).await,
                            Ok(stream::WriteOutcome::Written)
                        ) {
                            break;
                        }
                    }
                    let _ = stdin.shutdown().await;
                }));
            }
            _ => {}
        }
    }

    let mut stdout_task = None;
    let mut stderr_task = None;
    if let Some(stdout) = child.stdout.take() {
        stdout_task = Some(spawn_stdout_route(inner, stdout, io.stdout.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        let reader_inner = inner.clone();
        let live = io.live_stderr;
        stderr_task = Some(tokio::spawn(async move {
            fanout_reader(reader_inner, stderr, StreamKind::Stderr, live).await;
        }));
    }

    let status = wait_with_cancel(inner, &mut child, pid).await;
    let _ = stop_tx.send(true);

    if let Some(task) = stdout_task {
        let _ = task.await;
    }
    if let Some(task) = stderr_task {
        let _ = task.await;
    }
    if let Some(task) = stdin_task {
        // A host-stdin pump may be blocked on a read that never ends once
        // the child is gone; abort rather than wait for host EOF.
        task.abort();
        let _ = task.await;
    }
    if let Some(thread) = tty_thread {
        let _ = thread.await;
    }
    if pid != 0 {
        inner.remove_child_pid(pid);
    }

    exit_code_of(inner, status)
}

/// Await the child, racing cancellation. On cancel the recorded signal is
/// delivered to the child's group, escalating to SIGKILL after a grace
/// period.
pub(crate) async fn wait_with_cancel(
    inner: &Arc<RunnerInner>,
    child: &mut Child,
    pid: u32,
) -> Option<std::process::ExitStatus> {
    tokio::select! {
        status = child.wait() => status.ok(),
        _ = inner.cancel.cancelled() => {
            kill_pid(pid, Signal::Term, inner);
            tokio::select! {
                status = child.wait() => status.ok(),
                _ = tokio::time::sleep(KILL_GRACE) => {
                    let _ = child.start_kill();
                    child.wait().await.ok()
                }
            }
        }
    }
}

fn kill_pid(pid: u32, fallback: Signal, inner: &Arc<RunnerInner>) {
    let signal = inner
        .kill_signal_or(fallback);
    #[cfg(unix)]
    {
        if pid != 0 {
            unsafe {
                if libc::kill(-(pid as i32), signal.number()) != 0 {
                    libc::kill(pid as i32, signal.number());
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (pid, signal);
    }
}

pub(crate) fn exit_code_of(inner: &Arc<RunnerInner>, status: Option<std::process::ExitStatus>) -> i32 {
    if let Some(status) = status {
        if let Some(code) = status.code() {
            return code;
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return 128 + signal;
            }
        }
    }
    if inner.is_cancelled() {
        inner.kill_code()
    } else {
        0
    }
}

/// Single-read fan-out for a child stream.
pub(crate) async fn fanout_reader<R>(
    inner: Arc<RunnerInner>,
    mut reader: R,
    kind: StreamKind,
    live: bool,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => inner.handle_chunk(kind, &buf[..n], live).await,
        }
    }
}

/// Route a child's stdout per the stage plan.
pub(crate) fn spawn_stdout_route<R>(
    inner: &Arc<RunnerInner>,
    reader: R,
    route: StdoutRoute,
) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let inner = inner.clone();
    tokio::spawn(async move {
        match route {
            StdoutRoute::Fanout => {
                fanout_reader(inner, reader, StreamKind::Stdout, true).await;
            }
            StdoutRoute::Stream(tx) => {
                stream::pump(reader, tx).await;
            }
            StdoutRoute::File { path, append } => {
                write_stream_to_file(inner, reader, path, append).await;
            }
        }
    })
}

async fn write_stream_to_file<R>(
    inner: Arc<RunnerInner>,
    mut reader: R,
    path: std::path::PathBuf,
    append: bool,
) where
    R: AsyncRead + Unpin,
{
    let mut opts = tokio::fs::OpenOptions::new();
    opts.create(true).write(true);
    if append {
        opts.append(true);
    } else {
        opts.truncate(true);
    }
    let mut file = match opts.open(&path).await {
        Ok(file) => file,
        Err(e) => {
            let msg = format!("{}: {}\n", path.display(), e);
            inner
                .handle_chunk(StreamKind::Stderr, msg.as_bytes(), true)
                .await;
            return;
        }
    };
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if file.write_all(&buf[..n]).await.is_err() {
                    break;
                }
            }
        }
    }
    let _ = file.flush().await;
}
