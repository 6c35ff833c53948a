// src/commands/yes_cmd.rs
use async_trait::async_trait;

use crate::commands::types::{ByteSource, CommandContext, StreamOpen, StreamingCommand};

/// `yes` never terminates on its own; consumers stop it by closing the
/// stream or cancelling the runner. Each chunk carries a batch of lines so
/// the per-chunk overhead stays reasonable.
pub struct YesCommand;

const LINES_PER_CHUNK: usize = 64;

struct YesSource {
    line: String,
    closed: bool,
}

#[async_trait]
impl ByteSource for YesSource {
    async fn next_chunk(&mut self) -> Option<Vec<u8>> {
        if self.closed {
            return None;
        }
        // Yield so an infinite consumer loop cannot starve the scheduler.
        tokio::task::yield_now().await;
        Some(self.line.repeat(LINES_PER_CHUNK).into_bytes())
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

#[async_trait]
impl StreamingCommand for YesCommand {
    fn name(&self) -> &'static str { "yes" }

    async fn open(&self, ctx: CommandContext) -> StreamOpen {
        let word = if ctx.args.is_empty() {
            "y".to_string()
        } else {
            ctx.args.join(" ")
        };
        StreamOpen::Stream(Box::new(YesSource {
            line: format!("{}\n", word),
            closed: false,
        }))
    }
}
