// src/commands/fs_cmds.rs
//
// Filesystem builtins: mkdir, rm, mv, cp, touch, ls. These run against the
// real filesystem; paths resolve relative to the context cwd.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::commands::cat::describe_io_error;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct MkdirCommand;

#[async_trait]
impl Command for MkdirCommand {
    fn name(&self) -> &'static str { "mkdir" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut recursive = false;
        let mut dirs: Vec<&String> = Vec::new();
        for arg in &ctx.args {
            match arg.as_str() {
                "-p" => recursive = true,
                _ => dirs.push(arg),
            }
        }
        if dirs.is_empty() {
            return CommandResult::fail("mkdir: missing operand\n");
        }

        let mut errors = String::new();
        for dir in dirs {
            let path = ctx.resolve(dir);
            let result = if recursive {
                tokio::fs::create_dir_all(&path).await
            } else {
                tokio::fs::create_dir(&path).await
            };
            if let Err(e) = result {
                errors.push_str(&format!("mkdir: cannot create directory '{}': {}\n", dir, describe_io_error(&e)));
            }
        }
        if errors.is_empty() {
            CommandResult::ok()
        } else {
            CommandResult::fail(errors)
        }
    }
}

pub struct RmCommand;

#[async_trait]
impl Command for RmCommand {
    fn name(&self) -> &'static str { "rm" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut recursive = false;
        let mut force = false;
        let mut targets: Vec<&String> = Vec::new();
        for arg in &ctx.args {
            match arg.as_str() {
                "-r" | "-R" => recursive = true,
                "-f" => force = true,
                "-rf" | "-fr" => {
                    recursive = true;
                    force = true;
                }
                _ => targets.push(arg),
            }
        }
        if targets.is_empty() {
            if force {
                return CommandResult::ok();
            }
            return CommandResult::fail("rm: missing operand\n");
        }

        let mut errors = String::new();
        for target in targets {
            let path = ctx.resolve(target);
            let meta = tokio::fs::symlink_metadata(&path).await;
            let result = match meta {
                Err(e) => Err(e),
                Ok(m) if m.is_dir() => {
                    if recursive {
                        tokio::fs::remove_dir_all(&path).await
                    } else {
                        errors.push_str(&format!("rm: cannot remove '{}': Is a directory\n", target));
                        continue;
                    }
                }
                Ok(_) => tokio::fs::remove_file(&path).await,
            };
            if let Err(e) = result {
                if !force {
                    errors.push_str(&format!("rm: cannot remove '{}': {}\n", target, describe_io_error(&e)));
                }
            }
        }
        if errors.is_empty() {
            CommandResult::ok()
        } else {
            CommandResult::fail(errors)
        }
    }
}

pub struct MvCommand;

#[async_trait]
impl Command for MvCommand {
    fn name(&self) -> &'static str { "mv" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let operands: Vec<&String> = ctx.args.iter().filter(|a| !a.starts_with('-')).collect();
        if operands.len() != 2 {
            return CommandResult::fail("mv: expected source and destination\n");
        }
        let src = ctx.resolve(operands[0]);
        let dst = resolve_into_dir(&ctx.resolve(operands[1]), &src).await;
        match tokio::fs::rename(&src, &dst).await {
            Ok(()) => CommandResult::ok(),
            Err(e) => CommandResult::fail(format!(
                "mv: cannot move '{}' to '{}': {}\n",
                operands[0],
                operands[1],
                describe_io_error(&e)
            )),
        }
    }
}

pub struct CpCommand;

#[async_trait]
impl Command for CpCommand {
    fn name(&self) -> &'static str { "cp" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut recursive = false;
        let mut operands: Vec<&String> = Vec::new();
        for arg in &ctx.args {
            match arg.as_str() {
                "-r" | "-R" | "-a" => recursive = true,
                _ => operands.push(arg),
            }
        }
        if operands.len() != 2 {
            return CommandResult::fail("cp: expected source and destination\n");
        }
        let src = ctx.resolve(operands[0]);
        let dst = resolve_into_dir(&ctx.resolve(operands[1]), &src).await;

        let is_dir = tokio::fs::metadata(&src).await.map(|m| m.is_dir()).unwrap_or(false);
        let result = if is_dir {
            if !recursive {
                return CommandResult::fail(format!("cp: -r not specified; omitting directory '{}'\n", operands[0]));
            }
            copy_tree(&src, &dst).await
        } else {
            tokio::fs::copy(&src, &dst).await.map(|_| ())
        };
        match result {
            Ok(()) => CommandResult::ok(),
            Err(e) => CommandResult::fail(format!(
                "cp: cannot copy '{}': {}\n",
                operands[0],
                describe_io_error(&e)
            )),
        }
    }
}

/// Copying `a` to an existing directory `d` targets `d/basename(a)`.
async fn resolve_into_dir(dst: &Path, src: &Path) -> PathBuf {
    let is_dir = tokio::fs::metadata(dst).await.map(|m| m.is_dir()).unwrap_or(false);
    if is_dir {
        if let Some(name) = src.file_name() {
            return dst.join(name);
        }
    }
    dst.to_path_buf()
}

/// Iterative recursive copy; avoids boxed async recursion.
async fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    let mut pending = vec![(src.to_path_buf(), dst.to_path_buf())];
    while let Some((from, to)) = pending.pop() {
        tokio::fs::create_dir_all(&to).await?;
        let mut entries = tokio::fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), target));
            } else {
                tokio::fs::copy(entry.path(), target).await?;
            }
        }
    }
    Ok(())
}

pub struct TouchCommand;

#[async_trait]
impl Command for TouchCommand {
    fn name(&self) -> &'static str { "touch" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.args.is_empty() {
            return CommandResult::fail("touch: missing file operand\n");
        }
        let mut errors = String::new();
        for arg in &ctx.args {
            let path = ctx.resolve(arg);
            match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => {
                    let _ = file.set_modified(std::time::SystemTime::now());
                }
                Err(e) => {
                    errors.push_str(&format!("touch: cannot touch '{}': {}\n", arg, describe_io_error(&e)));
                }
            }
        }
        if errors.is_empty() {
            CommandResult::ok()
        } else {
            CommandResult::fail(errors)
        }
    }
}

pub struct LsCommand;

#[async_trait]
impl Command for LsCommand {
    fn name(&self) -> &'static str { "ls" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut show_hidden = false;
        let mut paths: Vec<&String> = Vec::new();
        for arg in &ctx.args {
            match arg.as_str() {
                "-a" | "-A" => show_hidden = true,
                "-1" => {}
                _ => paths.push(arg),
            }
        }

        let cwd = ctx.cwd.clone();
        let target = paths.first().map(|p| ctx.resolve(p)).unwrap_or_else(|| PathBuf::from(cwd));

        let meta = match tokio::fs::metadata(&target).await {
            Ok(m) => m,
            Err(e) => {
                return CommandResult::new(
                    2,
                    "",
                    format!("ls: cannot access '{}': {}\n", target.display(), describe_io_error(&e)),
                );
            }
        };

        if !meta.is_dir() {
            let shown = paths.first().map(|s| s.as_str()).unwrap_or(".");
            return CommandResult::out(format!("{}\n", shown));
        }

        let mut entries = match tokio::fs::read_dir(&target).await {
            Ok(rd) => rd,
            Err(e) => {
                return CommandResult::new(
                    2,
                    "",
                    format!("ls: cannot open directory '{}': {}\n", target.display(), describe_io_error(&e)),
                );
            }
        };

        let mut names: Vec<String> = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            if show_hidden || !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();

        let mut out = String::new();
        for name in names {
            out.push_str(&name);
            out.push('\n');
        }
        CommandResult::out(out)
    }
}
