// src/commands/which_cmd.rs
use async_trait::async_trait;
use std::sync::Weak;

use crate::commands::registry::CommandRegistry;
use crate::commands::{Command, CommandContext, CommandResult};

/// Reports virtual registrations by name and external binaries by path.
/// Holds a weak registry reference: the registry owns the handler, so a
/// strong pointer here would leak the pair.
pub struct WhichCommand {
    registry: Weak<CommandRegistry>,
}

impl WhichCommand {
    pub fn new(registry: Weak<CommandRegistry>) -> Self {
        Self { registry }
    }

    fn is_virtual(&self, name: &str) -> bool {
        self.registry
            .upgrade()
            .map(|r| r.contains(name))
            .unwrap_or(false)
    }
}

fn find_in_path(name: &str, path_var: Option<&str>) -> Option<std::path::PathBuf> {
    let path_var = path_var.map(String::from).or_else(|| std::env::var("PATH").ok())?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[async_trait]
impl Command for WhichCommand {
    fn name(&self) -> &'static str { "which" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.args.is_empty() {
            return CommandResult::code(1);
        }

        let mut out = String::new();
        let mut missing = false;
        for name in &ctx.args {
            if self.is_virtual(name) {
                out.push_str(name);
                out.push('\n');
            } else if let Some(path) = find_in_path(name, ctx.env.get("PATH").map(|s| s.as_str())) {
                out.push_str(&path.to_string_lossy());
                out.push('\n');
            } else {
                missing = true;
            }
        }
        CommandResult::new(if missing { 1 } else { 0 }, out, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::types::test_ctx;
    use crate::commands::Handler;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_which_finds_virtual() {
        let registry = Arc::new(CommandRegistry::new());
        registry.register(
            "echo",
            Handler::Value(Arc::new(crate::commands::echo::EchoCommand)),
        );
        let which = WhichCommand::new(Arc::downgrade(&registry));
        let r = which.execute(test_ctx(vec!["echo"])).await;
        assert_eq!(r.stdout, "echo\n");
        assert_eq!(r.exit_code, 0);
    }

    #[tokio::test]
    async fn test_which_missing() {
        let registry = Arc::new(CommandRegistry::new());
        let which = WhichCommand::new(Arc::downgrade(&registry));
        let r = which.execute(test_ctx(vec!["no-such-binary-xyz"])).await;
        assert_eq!(r.exit_code, 1);
        assert!(r.stdout.is_empty());
    }
}
