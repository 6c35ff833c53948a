//! Execution Dispatch
//!
//! Routes a runner's spec to the right executor: the structured path when
//! the in-core parser can represent the command, otherwise delegation to
//! the system shell. Stage I/O descriptors thread byte streams between
//! heterogeneous pipeline stages.

pub(crate) mod external;
pub(crate) mod pipeline;
pub(crate) mod sequence;
pub(crate) mod virt;

use std::future::Future;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::ast::types::{CommandAst, Redirect, RedirectKind};
use crate::commands::is_stdin_sensitive;
use crate::parser;
use crate::runner::{CommandSpec, RunnerInner, StdinMode, StreamKind};
use crate::stream::safe_write;

/// Where a stage's stdin comes from.
pub(crate) enum StdinFeed {
    /// Wire from the runner's `RunOptions::stdin` (top-level stages).
    FromOptions,
    /// A materialized buffer.
    Bytes(Vec<u8>),
    /// A live byte stream from the previous stage.
    Stream(mpsc::Receiver<Vec<u8>>),
    /// Nothing; immediate EOF.
    Null,
}

/// Where a stage's stdout goes.
#[derive(Clone)]
pub(crate) enum StdoutRoute {
    /// The runner's fan-out: capture + mirror + events.
    Fanout,
    /// The next stage's stdin.
    Stream(mpsc::Sender<Vec<u8>>),
    /// A file redirect target.
    File { path: PathBuf, append: bool },
}

pub(crate) struct StageIo {
    pub stdin: StdinFeed,
    pub stdout: StdoutRoute,
    /// Whether stderr is surfaced live (mirrored + emitted) or only
    /// captured for the final result.
    pub live_stderr: bool,
}

impl StageIo {
    pub(crate) fn top() -> Self {
        Self {
            stdin: StdinFeed::FromOptions,
            stdout: StdoutRoute::Fanout,
            live_stderr: true,
        }
    }
}

/// Execute the runner's spec to completion, returning the exit code. All
/// output has been routed through the runner's fan-out by the time this
/// returns.
pub(crate) async fn execute_spec(inner: &Arc<RunnerInner>) -> i32 {
    match inner.spec.clone() {
        CommandSpec::Shell { command } => run_shell_command(inner, &command, StageIo::top()).await,
        CommandSpec::Exec { file, args } => {
            external::run_argv(inner, &file, &args, StageIo::top()).await
        }
        CommandSpec::Pipeline { source, dest } => {
            pipeline::run_programmatic(inner, &source, &dest).await
        }
    }
}

/// Structured execution when possible, system-shell delegation otherwise.
pub(crate) async fn run_shell_command(inner: &Arc<RunnerInner>, command: &str, io: StageIo) -> i32 {
    if !inner.options.shell_operators || parser::needs_real_shell(command) {
        return external::run_via_shell(inner, command, io).await;
    }
    match parser::parse(command) {
        Err(e) => {
            tracing::trace!(command, error = %e, "parse failed, delegating to shell");
            external::run_via_shell(inner, command, io).await
        }
        Ok(ast) => {
            if has_unsupported_shape(&ast) {
                return external::run_via_shell(inner, command, io).await;
            }
            execute_ast(inner, &ast, io).await
        }
    }
}

/// Recursive AST execution. Boxed because sequences and subshells nest.
pub(crate) fn execute_ast<'a>(
    inner: &'a Arc<RunnerInner>,
    ast: &'a CommandAst,
    io: StageIo,
) -> Pin<Box<dyn Future<Output = i32> + Send + 'a>> {
    Box::pin(async move {
        match ast {
            CommandAst::Simple {
                cmd,
                args,
                redirects,
            } => run_simple(inner, cmd, args, redirects, io).await,
            CommandAst::Pipeline { stages } => pipeline::run_stages(inner, stages, io).await,
            CommandAst::Sequence {
                commands,
                operators,
            } => sequence::run(inner, commands, operators, io).await,
            CommandAst::Subshell { body } => sequence::run_subshell(inner, body, io).await,
        }
    })
}

/// One simple command: apply redirects, then dispatch virtual or external.
async fn run_simple(
    inner: &Arc<RunnerInner>,
    cmd: &str,
    args: &[crate::ast::types::Arg],
    redirects: &[Redirect],
    mut io: StageIo,
) -> i32 {
    for redirect in redirects {
        match redirect.kind {
            RedirectKind::In => {
                let path = resolve_path(inner, &redirect.target);
                match tokio::fs::read(&path).await {
                    Ok(bytes) => io.stdin = StdinFeed::Bytes(bytes),
                    Err(e) => {
                        let msg = format!("{}: {}\n", redirect.target, e);
                        inner
                            .handle_chunk(StreamKind::Stderr, msg.as_bytes(), io.live_stderr)
                            .await;
                        return 1;
                    }
                }
            }
            RedirectKind::Out | RedirectKind::Append => {
                io.stdout = StdoutRoute::File {
                    path: resolve_path(inner, &redirect.target),
                    append: redirect.kind == RedirectKind::Append,
                };
            }
        }
    }

    let arg_values: Vec<String> = args.iter().map(|a| a.value.clone()).collect();

    // Pipe stdin bypasses stdin-sensitive builtins so an externally
    // supplied stream is never dropped by a string-based handler.
    let bypass = matches!(io.stdin, StdinFeed::FromOptions)
        && inner.options.stdin == StdinMode::Pipe
        && is_stdin_sensitive(cmd);

    if !bypass {
        if let Some(handler) = inner.engine.registry().lookup(cmd) {
            return virt::run(inner, handler, cmd, arg_values, io).await;
        }
    }
    external::run_argv(inner, cmd, &arg_values, io).await
}

fn resolve_path(inner: &Arc<RunnerInner>, target: &str) -> PathBuf {
    let p = std::path::Path::new(target);
    if p.is_absolute() {
        return p.to_path_buf();
    }
    match &inner.options.cwd {
        Some(cwd) => cwd.join(p),
        None => std::env::current_dir()
            .map(|d| d.join(p))
            .unwrap_or_else(|_| p.to_path_buf()),
    }
}

/// Shapes the structured executor refuses: a redirect on a non-terminal
/// pipeline stage has no defined meaning here, so the whole string takes
/// the real-shell path.
fn has_unsupported_shape(ast: &CommandAst) -> bool {
    match ast {
        CommandAst::Simple { .. } => false,
        CommandAst::Pipeline { stages } => {
            let last = stages.len().saturating_sub(1);
            stages.iter().enumerate().any(|(i, stage)| match stage {
                CommandAst::Simple { redirects, .. } => i < last && !redirects.is_empty(),
                other => has_unsupported_shape(other),
            })
        }
        CommandAst::Sequence { commands, .. } => commands.iter().any(has_unsupported_shape),
        CommandAst::Subshell { body } => has_unsupported_shape(body),
    }
}

/// xtrace prints `+ cmd` to host stderr; verbose prints the command to
/// host stdout. Both fire once per command, before it runs.
pub(crate) async fn trace_command(inner: &Arc<RunnerInner>, display: &str) {
    let settings = inner.effective_settings();
    if settings.xtrace {
        let line = format!("+ {}\n", display);
        let _ = safe_write(&mut tokio::io::stderr(), line.as_bytes()).await;
    }
    if settings.verbose {
        let line = format!("{}\n", display);
        let _ = safe_write(&mut tokio::io::stdout(), line.as_bytes()).await;
    }
}

pub(crate) fn host_stdin_is_tty() -> bool {
    std::io::stdin().is_terminal()
}

pub(crate) fn all_streams_are_ttys() -> bool {
    std::io::stdin().is_terminal()
        && std::io::stdout().is_terminal()
        && std::io::stderr().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Arg;

    fn simple_with_redirect(kind: RedirectKind) -> CommandAst {
        CommandAst::Simple {
            cmd: "x".into(),
            args: vec![Arg::bare("a")],
            redirects: vec![Redirect {
                kind,
                target: "f".into(),
            }],
        }
    }

    #[test]
    fn test_nonterminal_redirect_is_unsupported() {
        let ast = CommandAst::Pipeline {
            stages: vec![
                simple_with_redirect(RedirectKind::Out),
                CommandAst::simple("y", vec![]),
            ],
        };
        assert!(has_unsupported_shape(&ast));
    }

    #[test]
    fn test_terminal_redirect_is_supported() {
        let ast = CommandAst::Pipeline {
            stages: vec![
                CommandAst::simple("y", vec![]),
                simple_with_redirect(RedirectKind::Out),
            ],
        };
        assert!(!has_unsupported_shape(&ast));
    }

    #[test]
    fn test_plain_shapes_supported() {
        assert!(!has_unsupported_shape(&CommandAst::simple("echo", vec![])));
        assert!(!has_unsupported_shape(&CommandAst::Subshell {
            body: Box::new(CommandAst::simple("echo", vec![])),
        }));
    }
}
