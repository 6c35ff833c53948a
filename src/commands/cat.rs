// src/commands/cat.rs
use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct CatCommand;

#[async_trait]
impl Command for CatCommand {
    fn name(&self) -> &'static str { "cat" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let files: Vec<&String> = ctx.args.iter().filter(|a| !a.starts_with('-') || *a == "-").collect();

        if files.is_empty() {
            return CommandResult::out(ctx.stdin.clone());
        }

        let mut out = String::new();
        let mut code = 0;
        let mut errors = String::new();
        for file in files {
            if file == "-" {
                out.push_str(&ctx.stdin);
                continue;
            }
            let path = ctx.resolve(file);
            match tokio::fs::read(&path).await {
                Ok(bytes) => out.push_str(&String::from_utf8_lossy(&bytes)),
                Err(e) => {
                    errors.push_str(&format!("cat: {}: {}\n", file, describe_io_error(&e)));
                    code = 1;
                }
            }
        }
        CommandResult::new(code, out, errors)
    }
}

pub(crate) fn describe_io_error(e: &std::io::Error) -> &'static str {
    match e.kind() {
        std::io::ErrorKind::NotFound => "No such file or directory",
        std::io::ErrorKind::PermissionDenied => "Permission denied",
        _ => "I/O error",
    }
}
