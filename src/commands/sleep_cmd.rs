// src/commands/sleep_cmd.rs
use async_trait::async_trait;
use std::time::Duration;

use crate::commands::{Command, CommandContext, CommandResult};

pub struct SleepCommand;

#[async_trait]
impl Command for SleepCommand {
    fn name(&self) -> &'static str { "sleep" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.args.is_empty() {
            return CommandResult::fail("sleep: missing operand\n");
        }

        let mut total = Duration::ZERO;
        for arg in &ctx.args {
            match parse_duration(arg) {
                Some(d) => total += d,
                None => {
                    return CommandResult::fail(format!("sleep: invalid time interval '{}'\n", arg));
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(total) => CommandResult::ok(),
            _ = ctx.cancel.cancelled() => CommandResult::code(130),
        }
    }
}

/// GNU-style interval: a float with an optional s/m/h/d suffix.
fn parse_duration(arg: &str) -> Option<Duration> {
    let (number, multiplier) = match arg.chars().last() {
        Some('s') => (&arg[..arg.len() - 1], 1.0),
        Some('m') => (&arg[..arg.len() - 1], 60.0),
        Some('h') => (&arg[..arg.len() - 1], 3600.0),
        Some('d') => (&arg[..arg.len() - 1], 86400.0),
        _ => (arg, 1.0),
    };
    let seconds: f64 = number.parse().ok()?;
    if seconds < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(seconds * multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::types::test_ctx;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_duration("0.5"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("1m"), Some(Duration::from_secs(60)));
        assert_eq!(parse_duration("nope"), None);
        assert_eq!(parse_duration("-1"), None);
    }

    #[tokio::test]
    async fn test_sleep_zero_completes() {
        let r = SleepCommand.execute(test_ctx(vec!["0"])).await;
        assert_eq!(r.exit_code, 0);
    }

    #[tokio::test]
    async fn test_sleep_cancelled() {
        let ctx = test_ctx(vec!["30"]);
        let cancel = ctx.cancel.clone();
        let task = tokio::spawn(async move { SleepCommand.execute(ctx).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        let r = task.await.unwrap();
        assert_eq!(r.exit_code, 130);
    }

    #[tokio::test]
    async fn test_sleep_missing_operand() {
        let r = SleepCommand.execute(test_ctx(vec![])).await;
        assert_eq!(r.exit_code, 1);
    }
}
