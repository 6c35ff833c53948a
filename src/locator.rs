//! System Shell Locator
//!
//! Probes a platform-specific list of shells once and caches the winner.
//! Unix shells are invoked `-l -c` so login-profile PATH augmentations are
//! honored. The cache lives in the engine and is cleared only by an
//! explicit engine reset.

use std::path::{Path, PathBuf};

/// A discovered shell invocation: the program plus the flags that make it
/// run one command string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellInvocation {
    fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Resolve a bare program name against `PATH`.
fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(windows)]
fn candidates() -> Vec<ShellInvocation> {
    let mut list = Vec::new();
    for root in ["C:\\Program Files\\Git", "C:\\Program Files (x86)\\Git"] {
        let bash = format!("{}\\bin\\bash.exe", root);
        list.push(ShellInvocation::new(bash, &["-l", "-c"]));
    }
    list.push(ShellInvocation::new("bash.exe", &["-l", "-c"]));
    list.push(ShellInvocation::new("wsl.exe", &["-e", "sh", "-l", "-c"]));
    list.push(ShellInvocation::new("powershell", &["-Command"]));
    list.push(ShellInvocation::new("pwsh", &["-Command"]));
    list.push(ShellInvocation::new("cmd", &["/c"]));
    list
}

#[cfg(not(windows))]
fn candidates() -> Vec<ShellInvocation> {
    let mut list = vec![
        ShellInvocation::new("/bin/sh", &["-l", "-c"]),
        ShellInvocation::new("/bin/bash", &["-l", "-c"]),
        ShellInvocation::new("/bin/zsh", &["-l", "-c"]),
    ];
    for name in ["sh", "bash", "zsh"] {
        list.push(ShellInvocation::new(name, &["-l", "-c"]));
    }
    list
}

#[cfg(windows)]
fn fallback() -> ShellInvocation {
    ShellInvocation::new("cmd.exe", &["/c"])
}

#[cfg(not(windows))]
fn fallback() -> ShellInvocation {
    ShellInvocation::new("/bin/sh", &["-l", "-c"])
}

fn resolves(program: &str) -> bool {
    let path = Path::new(program);
    if path.is_absolute() || program.contains(std::path::MAIN_SEPARATOR) {
        path.is_file()
    } else {
        find_in_path(program).is_some()
    }
}

/// Probe the candidate list and return the first shell that exists.
pub fn locate_shell() -> ShellInvocation {
    for candidate in candidates() {
        if resolves(&candidate.program) {
            tracing::debug!(shell = %candidate.program, "located system shell");
            return candidate;
        }
    }
    fallback()
}
