//! Sequence & Subshell Orchestrator
//!
//! `&&` / `||` / `;` short-circuit evaluation with outputs of non-skipped
//! commands concatenated in execution order, and subshell execution that
//! scopes working-directory changes.

use std::path::PathBuf;
use std::sync::Arc;

use super::{execute_ast, StageIo, StdinFeed};
use crate::ast::types::{CommandAst, SequenceOperator};
use crate::runner::RunnerInner;
use crate::stream;

pub(crate) async fn run(
    inner: &Arc<RunnerInner>,
    commands: &[CommandAst],
    operators: &[SequenceOperator],
    io: StageIo,
) -> i32 {
    // A live upstream feed is drained once so every member command can see
    // the same input buffer.
    let from_options = matches!(io.stdin, StdinFeed::FromOptions);
    let shared_stdin = match io.stdin {
        StdinFeed::Stream(rx) => Some(stream::collect(rx).await),
        StdinFeed::Bytes(bytes) => Some(bytes),
        StdinFeed::Null | StdinFeed::FromOptions => None,
    };

    let mut last_code = 0;
    for (i, command) in commands.iter().enumerate() {
        if i > 0 {
            match operators.get(i - 1) {
                Some(SequenceOperator::And) => {
                    if last_code != 0 {
                        continue;
                    }
                }
                Some(SequenceOperator::Or) => {
                    if last_code == 0 {
                        continue;
                    }
                }
                Some(SequenceOperator::Semi) | None => {}
            }
        }
        if inner.is_cancelled() {
            return inner.kill_code();
        }
        let stdin = match (&shared_stdin, from_options) {
            (Some(bytes), _) => StdinFeed::Bytes(bytes.clone()),
            (None, true) => StdinFeed::FromOptions,
            (None, false) => StdinFeed::Null,
        };
        let stage_io = StageIo {
            stdin,
            stdout: io.stdout.clone(),
            live_stderr: io.live_stderr,
        };
        last_code = execute_ast(inner, command, stage_io).await;
    }
    last_code
}

/// Execute a subshell body, restoring the process working directory
/// afterwards. Only cwd is scoped; environment and shell-option changes
/// are not isolated.
pub(crate) async fn run_subshell(
    inner: &Arc<RunnerInner>,
    body: &CommandAst,
    io: StageIo,
) -> i32 {
    let saved = std::env::current_dir().ok();
    let code = execute_ast(inner, body, io).await;
    restore_cwd(saved);
    code
}

fn restore_cwd(saved: Option<PathBuf>) {
    if let Some(dir) = saved {
        if std::env::set_current_dir(&dir).is_ok() {
            return;
        }
    }
    // The saved directory vanished; fall back through the usual homes.
    for fallback in [
        std::env::var("HOME").ok(),
        std::env::var("USERPROFILE").ok(),
        Some("/".to_string()),
    ]
    .into_iter()
    .flatten()
    {
        if std::env::set_current_dir(&fallback).is_ok() {
            return;
        }
    }
}
