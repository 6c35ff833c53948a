// src/commands/seq.rs
use async_trait::async_trait;

use crate::commands::types::{ByteSource, CommandContext, CommandResult, StreamOpen, StreamingCommand};

/// `seq` is a stream handler: lines are produced lazily so a downstream
/// pipeline stage can start before the sequence finishes.
pub struct SeqCommand;

struct SeqSource {
    lines: std::vec::IntoIter<String>,
    separator: String,
    first: bool,
    done: bool,
}

#[async_trait]
impl ByteSource for SeqSource {
    async fn next_chunk(&mut self) -> Option<Vec<u8>> {
        match self.lines.next() {
            Some(line) => {
                let mut chunk = String::new();
                if !self.first {
                    chunk.push_str(&self.separator);
                }
                self.first = false;
                chunk.push_str(&line);
                if self.lines.as_slice().is_empty() {
                    chunk.push('\n');
                }
                Some(chunk.into_bytes())
            }
            None => {
                if self.done {
                    return None;
                }
                self.done = true;
                None
            }
        }
    }

    async fn close(&mut self) {
        self.done = true;
        // Nothing else to release; the iterator drops with the source.
    }
}

#[async_trait]
impl StreamingCommand for SeqCommand {
    fn name(&self) -> &'static str { "seq" }

    async fn open(&self, ctx: CommandContext) -> StreamOpen {
        let mut separator = "\n".to_string();
        let mut equalize_width = false;
        let mut nums: Vec<String> = Vec::new();
        let mut i = 0;
        let args = &ctx.args;

        while i < args.len() {
            let arg = &args[i];
            if arg == "-s" && i + 1 < args.len() {
                separator = args[i + 1].clone();
                i += 2;
                continue;
            }
            if arg == "-w" {
                equalize_width = true;
                i += 1;
                continue;
            }
            if let Some(rest) = arg.strip_prefix("-s") {
                if !rest.is_empty() {
                    separator = rest.to_string();
                    i += 1;
                    continue;
                }
            }
            nums.push(arg.clone());
            i += 1;
        }

        if nums.is_empty() {
            return StreamOpen::Immediate(CommandResult::fail("seq: missing operand\n"));
        }

        let parsed: Vec<f64> = nums.iter().map(|n| n.parse().unwrap_or(f64::NAN)).collect();
        if let Some(pos) = parsed.iter().position(|n| n.is_nan()) {
            return StreamOpen::Immediate(CommandResult::fail(format!(
                "seq: invalid floating point argument: '{}'\n",
                nums[pos]
            )));
        }

        let (first, increment, last) = match parsed.as_slice() {
            [last] => (1.0, 1.0, *last),
            [first, last] => (*first, 1.0, *last),
            [first, increment, last, ..] => (*first, *increment, *last),
            [] => (1.0, 1.0, 0.0),
        };

        if increment == 0.0 {
            return StreamOpen::Immediate(CommandResult::fail(
                "seq: invalid Zero increment value: '0'\n",
            ));
        }

        let precision = [first, increment, last]
            .iter()
            .map(|n| decimal_places(*n))
            .max()
            .unwrap_or(0);

        let mut lines: Vec<String> = Vec::new();
        let mut n = first;
        let ascending = increment > 0.0;
        // Tolerance soaks up float accumulation on fractional increments.
        while (ascending && n <= last + 1e-10) || (!ascending && n >= last - 1e-10) {
            if lines.len() >= 100_000 {
                break;
            }
            if precision > 0 {
                lines.push(format!("{:.prec$}", n, prec = precision));
            } else {
                lines.push(format!("{}", n.round() as i64));
            }
            n += increment;
        }

        if equalize_width && !lines.is_empty() {
            let max_len = lines.iter().map(|l| l.trim_start_matches('-').len()).max().unwrap_or(0);
            for line in lines.iter_mut() {
                let negative = line.starts_with('-');
                let digits = if negative { &line[1..] } else { &line[..] };
                let padded = format!("{:0>width$}", digits, width = max_len);
                *line = if negative { format!("-{}", padded) } else { padded };
            }
        }

        if lines.is_empty() {
            return StreamOpen::Immediate(CommandResult::ok());
        }

        StreamOpen::Stream(Box::new(SeqSource {
            lines: lines.into_iter(),
            separator,
            first: true,
            done: false,
        }))
    }
}

fn decimal_places(n: f64) -> usize {
    let s = format!("{}", n);
    match s.find('.') {
        Some(i) => s.len() - i - 1,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::types::test_ctx;

    async fn run_seq(args: Vec<&str>) -> CommandResult {
        match SeqCommand.open(test_ctx(args)).await {
            StreamOpen::Immediate(result) => result,
            StreamOpen::Stream(mut source) => {
                let mut out = Vec::new();
                while let Some(chunk) = source.next_chunk().await {
                    out.extend_from_slice(&chunk);
                }
                source.close().await;
                CommandResult::out(String::from_utf8_lossy(&out).into_owned())
            }
        }
    }

    #[tokio::test]
    async fn test_seq_1_to_5() {
        assert_eq!(run_seq(vec!["5"]).await.stdout, "1\n2\n3\n4\n5\n");
    }

    #[tokio::test]
    async fn test_seq_range() {
        assert_eq!(run_seq(vec!["3", "7"]).await.stdout, "3\n4\n5\n6\n7\n");
    }

    #[tokio::test]
    async fn test_seq_increment() {
        assert_eq!(run_seq(vec!["1", "2", "10"]).await.stdout, "1\n3\n5\n7\n9\n");
    }

    #[tokio::test]
    async fn test_seq_descending() {
        assert_eq!(run_seq(vec!["5", "-1", "1"]).await.stdout, "5\n4\n3\n2\n1\n");
    }

    #[tokio::test]
    async fn test_seq_float() {
        assert_eq!(run_seq(vec!["1", "0.5", "2"]).await.stdout, "1.0\n1.5\n2.0\n");
    }

    #[tokio::test]
    async fn test_seq_separator() {
        assert_eq!(run_seq(vec!["-s", ",", "3"]).await.stdout, "1,2,3\n");
    }

    #[tokio::test]
    async fn test_seq_width() {
        assert_eq!(run_seq(vec!["-w", "8", "10"]).await.stdout, "08\n09\n10\n");
    }

    #[tokio::test]
    async fn test_seq_empty_range() {
        let r = run_seq(vec!["5", "1"]).await;
        assert_eq!(r.stdout, "");
        assert_eq!(r.exit_code, 0);
    }

    #[tokio::test]
    async fn test_seq_errors() {
        assert_eq!(run_seq(vec![]).await.exit_code, 1);
        assert_eq!(run_seq(vec!["abc"]).await.exit_code, 1);
        assert_eq!(run_seq(vec!["1", "0", "5"]).await.exit_code, 1);
    }

    #[tokio::test]
    async fn test_seq_streams_per_line() {
        let StreamOpen::Stream(mut source) = SeqCommand.open(test_ctx(vec!["3"])).await else {
            panic!("expected stream");
        };
        assert_eq!(source.next_chunk().await, Some(b"1".to_vec()));
        assert_eq!(source.next_chunk().await, Some(b"\n2".to_vec()));
        assert_eq!(source.next_chunk().await, Some(b"\n3\n".to_vec()));
        assert_eq!(source.next_chunk().await, None);
    }
}
