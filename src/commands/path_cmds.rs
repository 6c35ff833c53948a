// src/commands/path_cmds.rs
//
// basename and dirname. Pure string manipulation, matching coreutils
// behavior for trailing slashes and root.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct BasenameCommand;

#[async_trait]
impl Command for BasenameCommand {
    fn name(&self) -> &'static str { "basename" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let Some(path) = ctx.args.first() else {
            return CommandResult::fail("basename: missing operand\n");
        };
        let mut base = basename_of(path);
        // Optional second operand strips a suffix.
        if let Some(suffix) = ctx.args.get(1) {
            if base.len() > suffix.len() && base.ends_with(suffix.as_str()) {
                base.truncate(base.len() - suffix.len());
            }
        }
        CommandResult::out(format!("{}\n", base))
    }
}

pub struct DirnameCommand;

#[async_trait]
impl Command for DirnameCommand {
    fn name(&self) -> &'static str { "dirname" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let Some(path) = ctx.args.first() else {
            return CommandResult::fail("dirname: missing operand\n");
        };
        CommandResult::out(format!("{}\n", dirname_of(path)))
    }
}

fn basename_of(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rsplit('/').next() {
        Some(base) => base.to_string(),
        None => trimmed.to_string(),
    }
}

fn dirname_of(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rfind('/') {
        None => ".".to_string(),
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].trim_end_matches('/').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::types::test_ctx;

    #[tokio::test]
    async fn test_basename() {
        let r = BasenameCommand.execute(test_ctx(vec!["/usr/bin/sort"])).await;
        assert_eq!(r.stdout, "sort\n");
        let r = BasenameCommand.execute(test_ctx(vec!["dir/"])).await;
        assert_eq!(r.stdout, "dir\n");
        let r = BasenameCommand.execute(test_ctx(vec!["/"])).await;
        assert_eq!(r.stdout, "/\n");
    }

    #[tokio::test]
    async fn test_basename_suffix() {
        let r = BasenameCommand.execute(test_ctx(vec!["src/main.rs", ".rs"])).await;
        assert_eq!(r.stdout, "main\n");
    }

    #[tokio::test]
    async fn test_dirname() {
        let r = DirnameCommand.execute(test_ctx(vec!["/usr/bin/sort"])).await;
        assert_eq!(r.stdout, "/usr/bin\n");
        let r = DirnameCommand.execute(test_ctx(vec!["plain"])).await;
        assert_eq!(r.stdout, ".\n");
        let r = DirnameCommand.execute(test_ctx(vec!["/usr"])).await;
        assert_eq!(r.stdout, "/\n");
    }
}
