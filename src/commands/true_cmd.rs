// src/commands/true_cmd.rs
use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct TrueCommand;

#[async_trait]
impl Command for TrueCommand {
    fn name(&self) -> &'static str { "true" }

    async fn execute(&self, _ctx: CommandContext) -> CommandResult {
        CommandResult::ok()
    }
}

pub struct FalseCommand;

#[async_trait]
impl Command for FalseCommand {
    fn name(&self) -> &'static str { "false" }

    async fn execute(&self, _ctx: CommandContext) -> CommandResult {
        CommandResult::code(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::types::test_ctx;

    #[tokio::test]
    async fn test_true_false() {
        assert_eq!(TrueCommand.execute(test_ctx(vec![])).await.exit_code, 0);
        assert_eq!(FalseCommand.execute(test_ctx(vec![])).await.exit_code, 1);
    }
}
