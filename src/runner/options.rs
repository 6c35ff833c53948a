//! Run Options
//!
//! Per-runner configuration. Defaults mirror interactive expectations:
//! output is both mirrored to the host and captured into the result.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::ansi::AnsiOptions;

/// How the child's stdin is wired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StdinMode {
    /// Connect to the host's stdin (pumped, TTY-forwarded, or inherited
    /// depending on what the host's stdin is and whether `interactive` is
    /// set).
    #[default]
    Inherit,
    /// Close child stdin immediately.
    Ignore,
    /// Leave child stdin open for manual writes through the runner.
    Pipe,
    /// Write the buffer, then close.
    Bytes(Vec<u8>),
}

/// Per-runner execution options.
#[derive(Clone)]
pub struct RunOptions {
    /// Forward captured bytes to host stdout/stderr as they arrive.
    pub mirror: bool,
    /// Accumulate stdout/stderr into the result.
    pub capture: bool,
    pub stdin: StdinMode,
    pub cwd: Option<PathBuf>,
    /// Extra environment entries layered over the inherited environment.
    pub env: Option<HashMap<String, String>>,
    /// Request raw-mode TTY forwarding when all three host streams are
    /// TTYs.
    pub interactive: bool,
    /// Gate for the structured (in-core parsed) execution path.
    pub shell_operators: bool,
    /// Host-provided cancellation; aborting it kills the runner with
    /// SIGTERM.
    pub signal: Option<CancellationToken>,
    pub ansi: AnsiOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mirror: true,
            capture: true,
            stdin: StdinMode::default(),
            cwd: None,
            env: None,
            interactive: false,
            shell_operators: true,
            signal: None,
            ansi: AnsiOptions::default(),
        }
    }
}

impl RunOptions {
    /// Quiet variant: capture only, no host mirroring.
    pub fn captured() -> Self {
        Self {
            mirror: false,
            ..Self::default()
        }
    }

    pub fn with_stdin(mut self, stdin: StdinMode) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// Signals the engine can deliver to children and synthesize exit codes
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Int,
    Term,
    Kill,
}

impl Signal {
    pub fn number(self) -> i32 {
        match self {
            Signal::Int => 2,
            Signal::Term => 15,
            Signal::Kill => 9,
        }
    }

    /// Conventional `128 + signal` exit code.
    pub fn exit_code(self) -> i32 {
        128 + self.number()
    }

    pub fn name(self) -> &'static str {
        match self {
            Signal::Int => "SIGINT",
            Signal::Term => "SIGTERM",
            Signal::Kill => "SIGKILL",
        }
    }

    /// Accepts `SIGTERM`, `TERM`, and lowercase variants.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        match upper.trim_start_matches("SIG") {
            "INT" => Some(Signal::Int),
            "TERM" => Some(Signal::Term),
            "KILL" => Some(Signal::Kill),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RunOptions::default();
        assert!(options.mirror);
        assert!(options.capture);
        assert_eq!(options.stdin, StdinMode::Inherit);
        assert!(options.shell_operators);
        assert!(!options.interactive);
    }

    #[test]
    fn test_signal_exit_codes() {
        assert_eq!(Signal::Int.exit_code(), 130);
        assert_eq!(Signal::Term.exit_code(), 143);
        assert_eq!(Signal::Kill.exit_code(), 137);
    }

    #[test]
    fn test_signal_from_name() {
        assert_eq!(Signal::from_name("SIGTERM"), Some(Signal::Term));
        assert_eq!(Signal::from_name("term"), Some(Signal::Term));
        assert_eq!(Signal::from_name("INT"), Some(Signal::Int));
        assert_eq!(Signal::from_name("HUP"), None);
    }
}
