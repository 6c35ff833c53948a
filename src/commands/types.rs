// src/commands/types.rs
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of a virtual command invocation. Field layout mirrors
/// [`crate::runner::RunResult`] minus the stdin capture, which the
/// executor owns.
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    /// Full form, exit code first like `RunResult::new`.
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Silent success.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Success carrying stdout.
    pub fn out(stdout: impl Into<String>) -> Self {
        Self::new(0, stdout, "")
    }

    /// The usual failure shape: exit code 1 with a diagnostic on stderr.
    pub fn fail(stderr: impl Into<String>) -> Self {
        Self::new(1, "", stderr)
    }

    /// A bare exit code with no output, for predicate-style commands.
    pub fn code(exit_code: i32) -> Self {
        Self::new(exit_code, "", "")
    }
}

/// Invocation context handed to every handler.
pub struct CommandContext {
    pub args: Vec<String>,
    pub stdin: String,
    pub cwd: String,
    pub env: HashMap<String, String>,
    /// Cancelled when the owning runner is killed; handlers must tolerate
    /// cancellation at any await point.
    pub cancel: CancellationToken,
}

impl CommandContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolve a path argument against the context cwd.
    pub fn resolve(&self, path: &str) -> std::path::PathBuf {
        let p = std::path::Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            std::path::Path::new(&self.cwd).join(p)
        }
    }
}

/// Value handler: runs to completion and returns one result.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, ctx: CommandContext) -> CommandResult;
}

/// Outcome of opening a stream handler.
pub enum StreamOpen {
    /// A live chunk source to drive.
    Stream(Box<dyn ByteSource>),
    /// The handler finished (or failed) without streaming.
    Immediate(CommandResult),
}

/// Stream handler: produces a lazy, non-restartable chunk sequence.
#[async_trait]
pub trait StreamingCommand: Send + Sync {
    fn name(&self) -> &'static str;
    async fn open(&self, ctx: CommandContext) -> StreamOpen;
}

/// A cooperatively driven chunk producer. `close` must release any
/// handler-side resources; it is called on cancellation and after the
/// final chunk.
#[async_trait]
pub trait ByteSource: Send {
    async fn next_chunk(&mut self) -> Option<Vec<u8>>;
    async fn close(&mut self) {}
}

/// A registered handler, discriminated by invocation style.
#[derive(Clone)]
pub enum Handler {
    Value(Arc<dyn Command>),
    Stream(Arc<dyn StreamingCommand>),
}

impl Handler {
    pub fn name(&self) -> &'static str {
        match self {
            Handler::Value(cmd) => cmd.name(),
            Handler::Stream(cmd) => cmd.name(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_ctx(args: Vec<&str>) -> CommandContext {
    CommandContext {
        args: args.into_iter().map(String::from).collect(),
        stdin: String::new(),
        cwd: std::env::temp_dir().to_string_lossy().into_owned(),
        env: HashMap::new(),
        cancel: CancellationToken::new(),
    }
}

#[cfg(test)]
pub(crate) fn test_ctx_in(args: Vec<&str>, cwd: &std::path::Path) -> CommandContext {
    CommandContext {
        args: args.into_iter().map(String::from).collect(),
        stdin: String::new(),
        cwd: cwd.to_string_lossy().into_owned(),
        env: HashMap::new(),
        cancel: CancellationToken::new(),
    }
}
