// src/commands/test_cmd.rs
//
// The `test` builtin. Exit code is the whole output: 0 for true, 1 for
// false, 2 for a usage error.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct TestCommand;

#[async_trait]
impl Command for TestCommand {
    fn name(&self) -> &'static str { "test" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let args: Vec<&str> = ctx.args.iter().map(|s| s.as_str()).collect();
        match evaluate(&args, &ctx) {
            Ok(true) => CommandResult::ok(),
            Ok(false) => CommandResult::code(1),
            Err(msg) => CommandResult::new(2, "", format!("test: {}\n", msg)),
        }
    }
}

fn evaluate(args: &[&str], ctx: &CommandContext) -> Result<bool, String> {
    match args {
        [] => Ok(false),
        ["!", rest @ ..] => evaluate(rest, ctx).map(|v| !v),
        [single] => Ok(!single.is_empty()),
        [op, operand] => unary(op, operand, ctx),
        [lhs, op, rhs] => binary(lhs, op, rhs),
        _ => Err("too many arguments".to_string()),
    }
}

fn unary(op: &str, operand: &str, ctx: &CommandContext) -> Result<bool, String> {
    let path = ctx.resolve(operand);
    match op {
        "-e" => Ok(path.exists()),
        "-f" => Ok(path.is_file()),
        "-d" => Ok(path.is_dir()),
        "-s" => Ok(std::fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false)),
        "-r" => Ok(std::fs::File::open(&path).is_ok()),
        "-z" => Ok(operand.is_empty()),
        "-n" => Ok(!operand.is_empty()),
        _ => Err(format!("{}: unary operator expected", op)),
    }
}

fn binary(lhs: &str, op: &str, rhs: &str) -> Result<bool, String> {
    match op {
        "=" | "==" => Ok(lhs == rhs),
        "!=" => Ok(lhs != rhs),
        "-eq" | "-ne" | "-lt" | "-le" | "-gt" | "-ge" => {
            let a: i64 = lhs.parse().map_err(|_| format!("{}: integer expression expected", lhs))?;
            let b: i64 = rhs.parse().map_err(|_| format!("{}: integer expression expected", rhs))?;
            Ok(match op {
                "-eq" => a == b,
                "-ne" => a != b,
                "-lt" => a < b,
                "-le" => a <= b,
                "-gt" => a > b,
                _ => a >= b,
            })
        }
        _ => Err(format!("{}: binary operator expected", op)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::types::{test_ctx, test_ctx_in};

    #[tokio::test]
    async fn test_string_comparisons() {
        assert_eq!(TestCommand.execute(test_ctx(vec!["a", "=", "a"])).await.exit_code, 0);
        assert_eq!(TestCommand.execute(test_ctx(vec!["a", "=", "b"])).await.exit_code, 1);
        assert_eq!(TestCommand.execute(test_ctx(vec!["a", "!=", "b"])).await.exit_code, 0);
    }

    #[tokio::test]
    async fn test_numeric_comparisons() {
        assert_eq!(TestCommand.execute(test_ctx(vec!["2", "-gt", "1"])).await.exit_code, 0);
        assert_eq!(TestCommand.execute(test_ctx(vec!["2", "-lt", "1"])).await.exit_code, 1);
        assert_eq!(TestCommand.execute(test_ctx(vec!["x", "-eq", "1"])).await.exit_code, 2);
    }

    #[tokio::test]
    async fn test_file_operators() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f"), "data").unwrap();
        assert_eq!(TestCommand.execute(test_ctx_in(vec!["-f", "f"], dir.path())).await.exit_code, 0);
        assert_eq!(TestCommand.execute(test_ctx_in(vec!["-d", "f"], dir.path())).await.exit_code, 1);
        assert_eq!(TestCommand.execute(test_ctx_in(vec!["-e", "ghost"], dir.path())).await.exit_code, 1);
        assert_eq!(TestCommand.execute(test_ctx_in(vec!["-s", "f"], dir.path())).await.exit_code, 0);
    }

    #[tokio::test]
    async fn test_negation_and_strings() {
        assert_eq!(TestCommand.execute(test_ctx(vec!["!", "-z", "x"])).await.exit_code, 0);
        assert_eq!(TestCommand.execute(test_ctx(vec!["-n", ""])).await.exit_code, 1);
        assert_eq!(TestCommand.execute(test_ctx(vec!["nonempty"])).await.exit_code, 0);
        assert_eq!(TestCommand.execute(test_ctx(vec![])).await.exit_code, 1);
    }

    #[tokio::test]
    async fn test_usage_error_reports_operator() {
        let r = TestCommand.execute(test_ctx(vec!["a", "-bogus", "b"])).await;
        assert_eq!(r.exit_code, 2);
        assert!(r.stderr.contains("binary operator expected"));
    }
}
