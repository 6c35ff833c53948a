//! ProcessRunner
//!
//! The engine's unit of execution. A runner is created idle, enters
//! `Started` exactly once on first observation (awaiting, iterating
//! chunks, or touching a stream view), and enters `Finished` exactly once.
//! On completion it performs, in order: publish result, emit `End`, emit
//! `Exit`, mark finished, then cleanup (subscriber clear, active-set
//! removal, child handle release).

pub mod events;
pub mod options;
pub mod result;
pub mod spec;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::ansi;
use crate::engine::Engine;
use crate::error::CommandError;
use crate::settings::ShellSettings;
use crate::stream::{safe_write, WriteOutcome};

pub use events::{Chunk, EventBus, RunnerEvent, StreamKind};
pub use options::{RunOptions, Signal, StdinMode};
pub use result::RunResult;
pub use spec::CommandSpec;

/// Observable lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Started,
    Finished,
}

pub(crate) struct RunnerInner {
    pub(crate) id: u64,
    pub(crate) engine: Engine,
    pub(crate) spec: CommandSpec,
    pub(crate) options: RunOptions,
    settings: OnceLock<ShellSettings>,

    started: AtomicBool,
    finishing: AtomicBool,
    finished: AtomicBool,
    cancelled: AtomicBool,

    events: EventBus,
    out_buf: Mutex<Vec<u8>>,
    err_buf: Mutex<Vec<u8>>,
    in_buf: Mutex<Vec<u8>>,
    result: Mutex<Option<RunResult>>,

    done: watch::Sender<bool>,
    pub(crate) cancel: CancellationToken,
    kill_signal: Mutex<Option<Signal>>,

    child_pids: Mutex<Vec<u32>>,
    stdin_tx: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    stdin_ready: watch::Sender<bool>,
}

/// Handle to one command execution. Cheap to clone; all clones share the
/// same lifecycle.
#[derive(Clone)]
pub struct ProcessRunner {
    inner: Arc<RunnerInner>,
}

impl ProcessRunner {
    pub(crate) fn new(engine: Engine, id: u64, spec: CommandSpec, options: RunOptions) -> Self {
        let (done, _) = watch::channel(false);
        let (stdin_ready, _) = watch::channel(false);
        Self {
            inner: Arc::new(RunnerInner {
                id,
                engine,
                spec,
                options,
                settings: OnceLock::new(),
                started: AtomicBool::new(false),
                finishing: AtomicBool::new(false),
                finished: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                events: EventBus::new(),
                out_buf: Mutex::new(Vec::new()),
                err_buf: Mutex::new(Vec::new()),
                in_buf: Mutex::new(Vec::new()),
                result: Mutex::new(None),
                done,
                cancel: CancellationToken::new(),
                kill_signal: Mutex::new(None),
                child_pids: Mutex::new(Vec::new()),
                stdin_tx: Mutex::new(None),
                stdin_ready,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.inner.spec
    }

    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    pub fn state(&self) -> LifecycleState {
        if self.inner.finished.load(Ordering::Acquire) {
            LifecycleState::Finished
        } else if self.inner.started.load(Ordering::Acquire) {
            LifecycleState::Started
        } else {
            LifecycleState::Created
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// First observation starts the runner; later calls are no-ops.
    pub fn ensure_started(&self) {
        if self.inner.finished.load(Ordering::Acquire) {
            return;
        }
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return;
        }
        let inner = self.inner.clone();
        tokio::spawn(drive(inner));
    }

    /// Await completion. With `errexit` set a non-zero result comes back
    /// as [`CommandError::NonZeroExit`], raised only after the `End`/`Exit`
    /// events have been emitted.
    pub async fn wait(&self) -> Result<RunResult, CommandError> {
        let result = self.wait_unchecked().await;
        let settings = self.inner.effective_settings();
        if settings.errexit && result.code != 0 {
            return Err(CommandError::NonZeroExit { result });
        }
        Ok(result)
    }

    /// Await completion without errexit conversion.
    pub async fn wait_unchecked(&self) -> RunResult {
        self.ensure_started();
        let mut done = self.inner.done.subscribe();
        loop {
            if *done.borrow_and_update() {
                break;
            }
            if done.changed().await.is_err() {
                break;
            }
        }
        self.inner.current_result()
    }

    /// Exit code once finished.
    pub async fn code(&self) -> i32 {
        self.wait_unchecked().await.code
    }

    pub async fn stdout_string(&self) -> String {
        self.wait_unchecked().await.stdout
    }

    pub async fn stderr_string(&self) -> String {
        self.wait_unchecked().await.stderr
    }

    pub async fn stdin_string(&self) -> String {
        self.wait_unchecked().await.stdin
    }

    /// Captured stdout bytes (post-filter representation).
    pub async fn stdout_bytes(&self) -> Vec<u8> {
        self.wait_unchecked().await;
        self.inner.out_buf.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub async fn stderr_bytes(&self) -> Vec<u8> {
        self.wait_unchecked().await;
        self.inner.err_buf.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Lazy chunk iteration. Dropping the stream mid-flight cancels the
    /// runner (SIGTERM), mirroring "break out of the loop to stop the
    /// command".
    pub fn chunks(&self) -> ChunkStream {
        // Subscribe before starting so no early chunk can slip past.
        let rx = self.inner.events.subscribe();
        self.ensure_started();
        ChunkStream {
            rx,
            runner: self.clone(),
            terminated: false,
        }
    }

    /// Raw event subscription including the terminal `End`/`Exit` pair.
    pub fn events(&self) -> EventStream {
        let rx = self.inner.events.subscribe();
        self.ensure_started();
        EventStream { rx }
    }

    /// Writer for `Pipe` stdin mode. Resolves once the child's stdin is
    /// wired; `None` for finished runners or non-Pipe modes.
    pub async fn stdin_writer(&self) -> Option<StdinWriter> {
        self.ensure_started();
        let mut ready = self.inner.stdin_ready.subscribe();
        loop {
            if let Some(tx) = self.inner.stdin_sender() {
                return Some(StdinWriter {
                    tx,
                    inner: self.inner.clone(),
                });
            }
            if self.inner.finished.load(Ordering::Acquire) {
                return None;
            }
            if ready.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Kill with an explicit signal. Idempotent; the first signal wins.
    pub fn kill(&self, signal: Signal) {
        self.inner.request_kill(signal);
        if !self.inner.started.load(Ordering::Acquire) {
            // Never observed: finish synthetically without driving.
            self.inner.started.store(true, Ordering::Release);
            let result = self.inner.build_result(signal.exit_code());
            self.inner.finish(result);
        }
    }

    /// Kill by signal name (`"SIGTERM"`, `"INT"`, ...).
    pub fn kill_named(&self, name: &str) -> Result<(), CommandError> {
        match Signal::from_name(name) {
            Some(signal) => {
                self.kill(signal);
                Ok(())
            }
            None => Err(CommandError::Usage(format!("unknown signal `{}`", name))),
        }
    }

    /// Build a programmatic pipeline runner: `self`'s stdout becomes
    /// `dest`'s stdin.
    pub fn pipe(&self, dest: &ProcessRunner) -> ProcessRunner {
        self.inner.engine.spawn_spec(
            CommandSpec::Pipeline {
                source: self.clone(),
                dest: dest.clone(),
            },
            RunOptions::default(),
        )
    }

    /// Convenience: pipe into a freshly specced shell command.
    pub fn pipe_shell(&self, command: &str) -> ProcessRunner {
        let dest = self.inner.engine.shell(command);
        self.pipe(&dest)
    }

    pub(crate) fn inner(&self) -> &Arc<RunnerInner> {
        &self.inner
    }

    pub(crate) fn options_clone(&self) -> RunOptions {
        self.inner.options.clone()
    }
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("id", &self.inner.id)
            .field("spec", &self.inner.spec)
            .field("state", &self.state())
            .finish()
    }
}

impl RunnerInner {
    pub(crate) fn effective_settings(&self) -> ShellSettings {
        self.settings
            .get()
            .copied()
            .unwrap_or_else(|| self.engine.settings())
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn kill_code(&self) -> i32 {
        self.kill_signal_or(Signal::Term).exit_code()
    }

    pub(crate) fn kill_signal_or(&self, fallback: Signal) -> Signal {
        self.kill_signal
            .lock()
            .ok()
            .and_then(|guard| *guard)
            .unwrap_or(fallback)
    }

    fn current_result(&self) -> RunResult {
        self.result
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Fan a chunk out to capture, mirror, and events. `live` is false for
    /// intermediate pipeline stderr, which is captured but not surfaced
    /// until the final result.
    pub(crate) async fn handle_chunk(&self, kind: StreamKind, bytes: &[u8], live: bool) {
        if bytes.is_empty() {
            return;
        }
        let filtered = ansi::filter_chunk(bytes, &self.options.ansi);
        if self.options.capture {
            let buf = match kind {
                StreamKind::Stdout => &self.out_buf,
                StreamKind::Stderr => &self.err_buf,
            };
            if let Ok(mut guard) = buf.lock() {
                guard.extend_from_slice(&filtered);
            }
        }
        if !live || filtered.is_empty() {
            return;
        }
        if self.options.mirror {
            self.mirror_chunk(kind, &filtered).await;
        }
        self.events.emit(RunnerEvent::Chunk(Chunk {
            kind,
            bytes: filtered,
        }));
    }

    async fn mirror_chunk(&self, kind: StreamKind, bytes: &[u8]) {
        let outcome = match kind {
            StreamKind::Stdout => safe_write(&mut tokio::io::stdout(), bytes).await,
            StreamKind::Stderr => safe_write(&mut tokio::io::stderr(), bytes).await,
        };
        if matches!(outcome, Ok(WriteOutcome::Closed)) {
            self.engine.notify_parent_stream_closed();
        }
    }

    /// Re-emit a chunk another runner already filtered and mirrored:
    /// capture it and publish the event, but do not mirror again.
    pub(crate) fn forward_chunk(&self, chunk: Chunk) {
        if self.options.capture {
            let buf = match chunk.kind {
                StreamKind::Stdout => &self.out_buf,
                StreamKind::Stderr => &self.err_buf,
            };
            if let Ok(mut guard) = buf.lock() {
                guard.extend_from_slice(&chunk.bytes);
            }
        }
        self.events.emit(RunnerEvent::Chunk(chunk));
    }

    pub(crate) fn capture_stdin(&self, bytes: &[u8]) {
        if !self.options.capture {
            return;
        }
        if let Ok(mut guard) = self.in_buf.lock() {
            guard.extend_from_slice(bytes);
        }
    }

    pub(crate) fn add_child_pid(&self, pid: u32) {
        if let Ok(mut pids) = self.child_pids.lock() {
            pids.push(pid);
        }
    }

    pub(crate) fn remove_child_pid(&self, pid: u32) {
        if let Ok(mut pids) = self.child_pids.lock() {
            pids.retain(|p| *p != pid);
        }
    }

    pub(crate) fn has_live_child(&self) -> bool {
        self.child_pids.lock().map(|p| !p.is_empty()).unwrap_or(false)
    }

    pub(crate) fn set_stdin_sender(&self, tx: mpsc::Sender<Vec<u8>>) {
        if let Ok(mut guard) = self.stdin_tx.lock() {
            *guard = Some(tx);
        }
        let _ = self.stdin_ready.send(true);
    }

    pub(crate) fn stdin_sender(&self) -> Option<mpsc::Sender<Vec<u8>>> {
        self.stdin_tx.lock().ok().and_then(|guard| guard.clone())
    }

    pub(crate) fn close_stdin(&self) {
        if let Ok(mut guard) = self.stdin_tx.lock() {
            guard.take();
        }
    }

    /// Deliver a signal to every live child, preferring the process group.
    pub(crate) fn deliver_signal(&self, signal: Signal) {
        let pids: Vec<u32> = self
            .child_pids
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default();
        for pid in pids {
            deliver_to_pid(pid, signal);
        }
    }

    /// Record the kill, cancel in-flight work, and signal children. First
    /// signal wins; repeats are no-ops.
    pub(crate) fn request_kill(&self, signal: Signal) {
        if let Ok(mut guard) = self.kill_signal.lock() {
            if guard.is_none() {
                *guard = Some(signal);
            }
        }
        self.cancelled.store(true, Ordering::Release);
        tracing::debug!(runner = self.id, signal = signal.name(), "kill requested");
        self.cancel.cancel();
        self.deliver_signal(signal);
    }

    /// Parent stdout/stderr closed: end child stdin, then, next tick,
    /// SIGTERM the subtree.
    pub(crate) async fn on_parent_stream_closed(self: Arc<Self>) {
        self.close_stdin();
        tokio::task::yield_now().await;
        self.request_kill(Signal::Term);
    }

    /// Assemble the final result from the capture buffers.
    pub(crate) fn build_result(&self, code: i32) -> RunResult {
        let stdout = self
            .out_buf
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();
        let mut stderr = self
            .err_buf
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();
        let stdin = self
            .in_buf
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();
        if let Ok(guard) = self.kill_signal.lock() {
            if let Some(signal) = *guard {
                stderr.push_str(&format!("Process killed with {}\n", signal.name()));
            }
        }
        RunResult {
            code,
            stdout,
            stderr,
            stdin,
        }
    }

    /// Terminal transition. Idempotent; the completion order is the
    /// lifecycle contract: result, `End`, `Exit`, finished flag, cleanup.
    pub(crate) fn finish(&self, result: RunResult) {
        if self.finishing.swap(true, Ordering::AcqRel) {
            return;
        }
        let code = result.code;
        if let Ok(mut guard) = self.result.lock() {
            *guard = Some(result.clone());
        }
        self.events.emit(RunnerEvent::End(result));
        self.events.emit(RunnerEvent::Exit(code));
        self.finished.store(true, Ordering::Release);

        // Cleanup: listeners cleared, active-set removal, handles dropped.
        self.events.close();
        self.engine.lifecycle().unregister(self.id);
        self.close_stdin();
        if let Ok(mut pids) = self.child_pids.lock() {
            pids.clear();
        }
        let _ = self.stdin_ready.send(true);
        let _ = self.done.send(true);
        tracing::debug!(runner = self.id, code, "runner finished");
    }

    pub(crate) fn snapshot_settings(&self) {
        let _ = self.settings.set(self.engine.settings());
    }
}

#[cfg(unix)]
fn deliver_to_pid(pid: u32, signal: Signal) {
    unsafe {
        if libc::kill(-(pid as i32), signal.number()) != 0 {
            libc::kill(pid as i32, signal.number());
        }
    }
}

#[cfg(not(unix))]
fn deliver_to_pid(_pid: u32, _signal: Signal) {}

/// Driver task: snapshots settings, registers with the lifecycle manager,
/// links the external cancel token, executes the spec, and finishes.
async fn drive(inner: Arc<RunnerInner>) {
    inner.snapshot_settings();
    inner.engine.lifecycle().register(&inner);
    tracing::debug!(runner = inner.id, spec = %inner.spec.display(), "runner started");

    if let Some(external) = inner.options.signal.clone() {
        let weak = Arc::downgrade(&inner);
        tokio::spawn(async move {
            external.cancelled().await;
            if let Some(inner) = weak.upgrade() {
                inner.request_kill(Signal::Term);
            }
        });
    }

    let code = crate::exec::execute_spec(&inner).await;
    let result = inner.build_result(code);
    inner.finish(result);
}

/// Lazy finite sequence of output chunks.
pub struct ChunkStream {
    rx: mpsc::UnboundedReceiver<RunnerEvent>,
    runner: ProcessRunner,
    terminated: bool,
}

impl ChunkStream {
    /// Next chunk, or `None` once the runner has exited.
    pub async fn next(&mut self) -> Option<Chunk> {
        if self.terminated {
            return None;
        }
        loop {
            match self.rx.recv().await {
                None => {
                    self.terminated = true;
                    return None;
                }
                Some(RunnerEvent::Chunk(chunk)) => return Some(chunk),
                Some(RunnerEvent::End(_)) => continue,
                Some(RunnerEvent::Exit(_)) => {
                    self.terminated = true;
                    return None;
                }
            }
        }
    }
}

impl Drop for ChunkStream {
    fn drop(&mut self) {
        if self.terminated || self.runner.state() == LifecycleState::Finished {
            return;
        }
        // Breaking out of iteration: discard the pending buffer and kill.
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        self.runner.inner.request_kill(Signal::Term);
    }
}

/// Raw event subscription; completion delivers `End` then `Exit`.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<RunnerEvent>,
}

impl EventStream {
    pub async fn next(&mut self) -> Option<RunnerEvent> {
        self.rx.recv().await
    }
}

/// Manual stdin handle for `Pipe` mode.
pub struct StdinWriter {
    tx: mpsc::Sender<Vec<u8>>,
    inner: Arc<RunnerInner>,
}

impl StdinWriter {
    /// Write bytes to the child. Returns false once the child is gone.
    pub async fn write(&self, bytes: &[u8]) -> bool {
        self.inner.capture_stdin(bytes);
        self.tx.send(bytes.to_vec()).await.is_ok()
    }

    /// Close the child's stdin, delivering EOF.
    pub fn close(self) {
        self.inner.close_stdin();
    }
}
