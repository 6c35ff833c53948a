//! command-stream - Programmatic shell-command execution engine
//!
//! Runs commands from literal shell strings or structured pipelines with
//! streaming I/O, precise cancellation, and an in-process virtual command
//! registry. Command strings the in-core parser can represent execute
//! without a shell; everything else delegates to the system shell.

pub mod ansi;
pub mod ast;
pub mod commands;
pub mod engine;
pub mod error;
mod exec;
mod lifecycle;
pub mod locator;
pub mod parser;
pub mod quote;
pub mod runner;
pub mod settings;
pub mod stream;

pub use ansi::AnsiOptions;
pub use ast::types::{Arg, CommandAst, Redirect, RedirectKind, SequenceOperator};
pub use commands::{
    ByteSource, Command, CommandContext, CommandRegistry, CommandResult, Handler, StreamOpen,
    StreamingCommand,
};
pub use engine::{global_engine, sh, Engine};
pub use error::CommandError;
pub use parser::{needs_real_shell, parse, ParseException};
pub use quote::{interpolate, quote, raw, Value};
pub use runner::{
    Chunk, ChunkStream, CommandSpec, EventStream, LifecycleState, ProcessRunner, RunOptions,
    RunResult, RunnerEvent, Signal, StdinMode, StdinWriter, StreamKind,
};
pub use settings::{ShellOption, ShellSettings};
