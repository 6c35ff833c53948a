// src/commands/mod.rs
pub mod cat;
pub mod echo;
pub mod env_cmd;
pub mod fs_cmds;
pub mod path_cmds;
pub mod pwd;
pub mod registry;
pub mod seq;
pub mod sleep_cmd;
pub mod test_cmd;
pub mod true_cmd;
pub mod types;
pub mod which_cmd;
pub mod yes_cmd;

use std::sync::Arc;

pub use registry::CommandRegistry;
pub use types::{
    ByteSource, Command, CommandContext, CommandResult, Handler, StreamOpen, StreamingCommand,
};

/// Builtins whose semantics depend on streaming input: with `Pipe` stdin
/// the virtual version is bypassed and the external binary runs instead,
/// so an externally supplied input stream is never silently dropped.
pub const STDIN_SENSITIVE_BUILTINS: &[&str] = &["sleep", "cat"];

pub fn is_stdin_sensitive(name: &str) -> bool {
    STDIN_SENSITIVE_BUILTINS.contains(&name)
}

/// Builtins that actually read their stdin string. Host stdin (`Inherit`)
/// is drained only for these; draining it for anything else would stall
/// commands that never look at input.
pub const STDIN_CONSUMING_BUILTINS: &[&str] = &["cat"];

pub fn consumes_stdin(name: &str) -> bool {
    STDIN_CONSUMING_BUILTINS.contains(&name)
}

/// Register the builtin set on a fresh registry.
pub fn register_builtins(registry: &Arc<CommandRegistry>) {
    registry.register("cd", Handler::Value(Arc::new(pwd::CdCommand)));
    registry.register("pwd", Handler::Value(Arc::new(pwd::PwdCommand)));
    registry.register("echo", Handler::Value(Arc::new(echo::EchoCommand)));
    registry.register("sleep", Handler::Value(Arc::new(sleep_cmd::SleepCommand)));
    registry.register("true", Handler::Value(Arc::new(true_cmd::TrueCommand)));
    registry.register("false", Handler::Value(Arc::new(true_cmd::FalseCommand)));
    registry.register(
        "which",
        Handler::Value(Arc::new(which_cmd::WhichCommand::new(Arc::downgrade(registry)))),
    );
    registry.register("exit", Handler::Value(Arc::new(env_cmd::ExitCommand)));
    registry.register("env", Handler::Value(Arc::new(env_cmd::EnvCommand)));
    registry.register("cat", Handler::Value(Arc::new(cat::CatCommand)));
    registry.register("ls", Handler::Value(Arc::new(fs_cmds::LsCommand)));
    registry.register("mkdir", Handler::Value(Arc::new(fs_cmds::MkdirCommand)));
    registry.register("rm", Handler::Value(Arc::new(fs_cmds::RmCommand)));
    registry.register("mv", Handler::Value(Arc::new(fs_cmds::MvCommand)));
    registry.register("cp", Handler::Value(Arc::new(fs_cmds::CpCommand)));
    registry.register("touch", Handler::Value(Arc::new(fs_cmds::TouchCommand)));
    registry.register("basename", Handler::Value(Arc::new(path_cmds::BasenameCommand)));
    registry.register("dirname", Handler::Value(Arc::new(path_cmds::DirnameCommand)));
    registry.register("yes", Handler::Stream(Arc::new(yes_cmd::YesCommand)));
    registry.register("seq", Handler::Stream(Arc::new(seq::SeqCommand)));
    registry.register("test", Handler::Value(Arc::new(test_cmd::TestCommand)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_builtins_covers_default_set() {
        let registry = Arc::new(CommandRegistry::new());
        register_builtins(&registry);
        for name in [
            "cd", "pwd", "echo", "sleep", "true", "false", "which", "exit", "env", "cat",
            "ls", "mkdir", "rm", "mv", "cp", "touch", "basename", "dirname", "yes", "seq",
            "test",
        ] {
            assert!(registry.contains(name), "missing builtin {}", name);
        }
    }

    #[test]
    fn test_stdin_sensitive_set() {
        assert!(is_stdin_sensitive("sleep"));
        assert!(is_stdin_sensitive("cat"));
        assert!(!is_stdin_sensitive("echo"));
    }
}
