//! Command Specifications
//!
//! What a runner executes: a literal shell string, a direct exec that
//! bypasses shell parsing, or a programmatic pipe between two existing
//! runners.

use std::fmt;

use super::ProcessRunner;

#[derive(Clone)]
pub enum CommandSpec {
    /// A literal shell command string.
    Shell { command: String },
    /// Direct argv execution, no shell involved.
    Exec { file: String, args: Vec<String> },
    /// Programmatic pipe built from prior runners.
    Pipeline {
        source: ProcessRunner,
        dest: ProcessRunner,
    },
}

impl CommandSpec {
    pub fn shell(command: impl Into<String>) -> Self {
        CommandSpec::Shell {
            command: command.into(),
        }
    }

    pub fn exec(file: impl Into<String>, args: Vec<String>) -> Self {
        CommandSpec::Exec {
            file: file.into(),
            args,
        }
    }

    /// Human-readable command text for xtrace/verbose printing.
    pub fn display(&self) -> String {
        match self {
            CommandSpec::Shell { command } => command.clone(),
            CommandSpec::Exec { file, args } => {
                let mut out = file.clone();
                for arg in args {
                    out.push(' ');
                    out.push_str(arg);
                }
                out
            }
            CommandSpec::Pipeline { source, dest } => {
                format!("{} | {}", source.spec().display(), dest.spec().display())
            }
        }
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSpec::Shell { command } => f.debug_struct("Shell").field("command", command).finish(),
            CommandSpec::Exec { file, args } => f
                .debug_struct("Exec")
                .field("file", file)
                .field("args", args)
                .finish(),
            CommandSpec::Pipeline { .. } => f.write_str("Pipeline { .. }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(CommandSpec::shell("echo hi").display(), "echo hi");
        assert_eq!(
            CommandSpec::exec("ls", vec!["-l".into(), "/tmp".into()]).display(),
            "ls -l /tmp"
        );
    }
}
