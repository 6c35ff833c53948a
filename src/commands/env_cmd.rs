// src/commands/env_cmd.rs
use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct EnvCommand;

#[async_trait]
impl Command for EnvCommand {
    fn name(&self) -> &'static str { "env" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut pairs: Vec<(&String, &String)> = ctx.env.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        let mut out = String::new();
        for (key, value) in pairs {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        CommandResult::out(out)
    }
}

pub struct ExitCommand;

#[async_trait]
impl Command for ExitCommand {
    fn name(&self) -> &'static str { "exit" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        match ctx.args.first() {
            None => CommandResult::ok(),
            Some(arg) => match arg.parse::<i32>() {
                // Shells reduce exit codes modulo 256.
                Ok(code) => CommandResult::code(code.rem_euclid(256)),
                Err(_) => CommandResult::new(
                    2,
                    "",
                    format!("exit: {}: numeric argument required\n", arg),
                ),
            },
        }
    }
}
