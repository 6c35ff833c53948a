// src/commands/echo.rs
use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct EchoCommand;

#[async_trait]
impl Command for EchoCommand {
    fn name(&self) -> &'static str { "echo" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut newline = true;
        let mut interpret_escapes = false;
        let mut i = 0;

        while i < ctx.args.len() {
            match ctx.args[i].as_str() {
                "-n" => newline = false,
                "-e" => interpret_escapes = true,
                "-E" => interpret_escapes = false,
                "-ne" | "-en" => {
                    newline = false;
                    interpret_escapes = true;
                }
                _ => break,
            }
            i += 1;
        }

        let joined = ctx.args[i..].join(" ");
        let mut out = if interpret_escapes {
            expand_escapes(&joined)
        } else {
            joined
        };
        if newline {
            out.push('\n');
        }
        CommandResult::out(out)
    }
}

fn expand_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('e') => out.push('\x1B'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
