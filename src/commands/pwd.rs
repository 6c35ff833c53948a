// src/commands/pwd.rs
use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct PwdCommand;

#[async_trait]
impl Command for PwdCommand {
    fn name(&self) -> &'static str { "pwd" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        CommandResult::out(format!("{}\n", ctx.cwd))
    }
}

pub struct CdCommand;

#[async_trait]
impl Command for CdCommand {
    fn name(&self) -> &'static str { "cd" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let target = match ctx.args.first() {
            Some(dir) if dir == "-" => match ctx.env.get("OLDPWD") {
                Some(prev) => prev.clone(),
                None => return CommandResult::fail("cd: OLDPWD not set\n"),
            },
            Some(dir) => ctx.resolve(dir).to_string_lossy().into_owned(),
            None => match ctx.env.get("HOME").cloned().or_else(|| std::env::var("HOME").ok()) {
                Some(home) => home,
                None => return CommandResult::fail("cd: HOME not set\n"),
            },
        };

        match std::env::set_current_dir(&target) {
            Ok(()) => CommandResult::ok(),
            Err(e) => CommandResult::fail(format!("cd: {}: {}\n", target, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::types::test_ctx;

    #[tokio::test]
    async fn test_pwd_reports_ctx_cwd() {
        let ctx = test_ctx(vec![]);
        let cwd = ctx.cwd.clone();
        let r = PwdCommand.execute(ctx).await;
        assert_eq!(r.stdout, format!("{}\n", cwd));
    }

    #[tokio::test]
    async fn test_cd_missing_dir_fails() {
        let r = CdCommand.execute(test_ctx(vec!["/definitely/not/here"])).await;
        assert_eq!(r.exit_code, 1);
        assert!(r.stderr.contains("cd:"));
    }
}
