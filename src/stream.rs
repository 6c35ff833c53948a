//! Stream Plumbing
//!
//! Byte pumps between child stdio and the engine, EPIPE-tolerant writes,
//! and raw-mode TTY stdin forwarding. Downstream closure is normal
//! pipeline behavior here, never an error: a closed sink reports
//! `WriteOutcome::Closed` and the caller winds down quietly.

use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};

/// Chunk size for stdio pumps.
pub const CHUNK_SIZE: usize = 8_192;

/// What happened to a write against a possibly-closed sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The far end is gone (EPIPE / closed handle); the bytes were dropped.
    Closed,
}

/// Read chunks from `reader` and send them into `tx` until EOF or error.
///
/// Receiver drop ends the pump early; that is how a downstream stage that
/// has finished tears down its upstream.
pub async fn pump<R>(mut reader: R, tx: mpsc::Sender<Vec<u8>>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    break;
                }
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}

/// Write to a sink, swallowing broken-pipe style failures.
pub async fn safe_write<W>(sink: &mut W, bytes: &[u8]) -> std::io::Result<WriteOutcome>
where
    W: AsyncWrite + Unpin,
{
    match sink.write_all(bytes).await {
        Ok(()) => {
            match sink.flush().await {
                Ok(()) => Ok(WriteOutcome::Written),
                Err(e) if is_closed_error(&e) => Ok(WriteOutcome::Closed),
                Err(e) => Err(e),
            }
        }
        Err(e) if is_closed_error(&e) => Ok(WriteOutcome::Closed),
        Err(e) => Err(e),
    }
}

fn is_closed_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::UnexpectedEof
    )
}

/// Send SIGINT to a child's process group, falling back to the pid.
#[cfg(unix)]
pub fn interrupt_child(pid: u32) {
    unsafe {
        if libc::kill(-(pid as i32), libc::SIGINT) != 0 {
            libc::kill(pid as i32, libc::SIGINT);
        }
    }
}

#[cfg(not(unix))]
pub fn interrupt_child(_pid: u32) {}

/// Forward host-TTY keystrokes to a child's stdin channel while the child
/// runs. A received Ctrl-C is not forwarded as a byte; it sends SIGINT to
/// the child's process group instead. Raw mode is enabled for the
/// duration and restored on exit.
///
/// Runs on a blocking thread; `stop` flips when the child finishes.
pub fn forward_tty_stdin(
    stdin_tx: mpsc::Sender<Vec<u8>>,
    child_pid: u32,
    mut stop: watch::Receiver<bool>,
) {
    use crossterm::event::{self, Event, KeyCode, KeyModifiers};
    use crossterm::terminal;

    if terminal::enable_raw_mode().is_err() {
        return;
    }

    while !*stop.borrow_and_update() {
        match event::poll(Duration::from_millis(50)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(_) => break,
        }
        let Ok(Event::Key(key)) = event::read() else {
            continue;
        };
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char(c) = key.code {
                if c == 'c' {
                    interrupt_child(child_pid);
                    continue;
                }
                // Other control chords map to their control bytes.
                let byte = (c.to_ascii_lowercase() as u8) & 0x1F;
                if stdin_tx.blocking_send(vec![byte]).is_err() {
                    break;
                }
                continue;
            }
        }
        let bytes: Vec<u8> = match key.code {
            KeyCode::Char(c) => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf).as_bytes().to_vec()
            }
            KeyCode::Enter => vec![b'\n'],
            KeyCode::Tab => vec![b'\t'],
            KeyCode::Backspace => vec![0x7F],
            KeyCode::Esc => vec![0x1B],
            _ => continue,
        };
        if stdin_tx.blocking_send(bytes).is_err() {
            break;
        }
    }

    let _ = terminal::disable_raw_mode();
}

/// Drain a chunk receiver into one buffer.
pub async fn collect(mut rx: mpsc::Receiver<Vec<u8>>) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = rx.recv().await {
        out.extend_from_slice(&chunk);
    }
    out
}
