//! Runner Events
//!
//! Ordered event fan-out to any number of subscribers. On completion each
//! subscriber sees exactly `End(result)` then `Exit(code)`; the subscriber
//! list is cleared after that fan-out, so late subscribers observe a
//! closed stream rather than stale events.

use std::sync::Mutex;

use tokio::sync::mpsc;

use super::result::RunResult;

/// Which child stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One emitted chunk of child output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: StreamKind,
    pub bytes: Vec<u8>,
}

impl Chunk {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Everything a runner publishes while running and on completion.
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    Chunk(Chunk),
    End(RunResult),
    Exit(i32),
}

/// Subscriber list with ordered, lock-free-for-readers delivery.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<RunnerEvent>>>,
    closed: std::sync::atomic::AtomicBool,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A receiver for subsequent events. After [`EventBus::close`] the
    /// receiver arrives already end-of-stream: late observers never see
    /// stale events.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RunnerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.closed.load(std::sync::atomic::Ordering::Acquire) {
            if let Ok(mut subs) = self.subscribers.lock() {
                subs.push(tx);
            }
        }
        rx
    }

    /// Deliver to every live subscriber, dropping the ones that went away.
    pub fn emit(&self, event: RunnerEvent) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Disconnect all subscribers and refuse new ones; receivers see
    /// end-of-stream.
    pub fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::Release);
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fanout_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(RunnerEvent::Chunk(Chunk {
            kind: StreamKind::Stdout,
            bytes: b"hi".to_vec(),
        }));
        bus.emit(RunnerEvent::End(RunResult::ok()));
        bus.emit(RunnerEvent::Exit(0));
        bus.close();

        assert!(matches!(rx.recv().await, Some(RunnerEvent::Chunk(_))));
        assert!(matches!(rx.recv().await, Some(RunnerEvent::End(_))));
        assert!(matches!(rx.recv().await, Some(RunnerEvent::Exit(0))));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_closed_stream() {
        let bus = EventBus::new();
        bus.emit(RunnerEvent::Exit(0));
        bus.close();
        let mut rx = bus.subscribe();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dead_subscriber_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);
        bus.emit(RunnerEvent::Exit(0));
        let count = bus.subscribers.lock().map(|s| s.len()).unwrap_or(99);
        assert_eq!(count, 0);
    }
}
