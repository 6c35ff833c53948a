//! Signal & Lifecycle Manager
//!
//! Tracks live runners, installs a SIGINT listener while any are active,
//! and propagates host-stream closure. The active set holds weak
//! references; a runner's membership lasts exactly from start to finish,
//! and a dropped runner never lingers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::runner::{RunnerInner, Signal};

pub(crate) struct LifecycleManager {
    active: Mutex<HashMap<u64, Weak<RunnerInner>>>,
    sigint_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    parent_closed: AtomicBool,
    exit_on_sigint: AtomicBool,
}

impl LifecycleManager {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            active: Mutex::new(HashMap::new()),
            sigint_task: Mutex::new(None),
            parent_closed: AtomicBool::new(false),
            exit_on_sigint: AtomicBool::new(true),
        })
    }

    pub(crate) fn set_exit_on_sigint(&self, enabled: bool) {
        self.exit_on_sigint.store(enabled, Ordering::Release);
    }

    pub(crate) fn active_count(&self) -> usize {
        self.active.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// Add a runner to the active set; the first arrival installs the
    /// SIGINT listener.
    pub(crate) fn register(self: &Arc<Self>, runner: &Arc<RunnerInner>) {
        let was_empty = {
            let Ok(mut active) = self.active.lock() else {
                return;
            };
            let was_empty = active.is_empty();
            active.insert(runner.id, Arc::downgrade(runner));
            was_empty
        };
        if was_empty {
            self.install_sigint();
        }
    }

    /// Remove a runner; the last departure uninstalls the listener.
    pub(crate) fn unregister(&self, id: u64) {
        let now_empty = {
            let Ok(mut active) = self.active.lock() else {
                return;
            };
            active.remove(&id);
            active.is_empty()
        };
        if now_empty {
            if let Ok(mut guard) = self.sigint_task.lock() {
                if let Some(task) = guard.take() {
                    task.abort();
                }
            }
        }
    }

    fn install_sigint(self: &Arc<Self>) {
        let Ok(mut guard) = self.sigint_task.lock() else {
            return;
        };
        if guard.is_some() {
            return;
        }
        let manager = Arc::clone(self);
        *guard = Some(tokio::spawn(sigint_loop(manager)));
    }

    /// Snapshot the set; the SIGINT callback iterates without holding the
    /// lock, tolerating concurrent mutation.
    fn snapshot(&self) -> Vec<Arc<RunnerInner>> {
        self.active
            .lock()
            .map(|active| active.values().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    /// Forward SIGINT to every active runner, then optionally exit the
    /// host with the conventional 130.
    pub(crate) fn handle_sigint(&self) {
        let runners = self.snapshot();
        tracing::debug!(count = runners.len(), "forwarding SIGINT to active runners");
        for runner in &runners {
            if runner.has_live_child() {
                runner.deliver_signal(Signal::Int);
            } else {
                runner.request_kill(Signal::Int);
            }
        }
        if self.exit_on_sigint.load(Ordering::Acquire) {
            std::process::exit(130);
        }
    }

    /// Host stdout/stderr closed. Fires at most once; every active runner
    /// ends its child's stdin and then terminates its subtree.
    pub(crate) fn notify_parent_closed(&self) {
        if self.parent_closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("host stream closed; shutting down active runners");
        for runner in self.snapshot() {
            tokio::spawn(runner.on_parent_stream_closed());
        }
    }

    pub(crate) fn reset_parent_closed(&self) {
        self.parent_closed.store(false, Ordering::Release);
    }
}

#[cfg(unix)]
async fn sigint_loop(manager: Arc<LifecycleManager>) {
    use tokio::signal::unix::{signal, SignalKind};
    let Ok(mut sigint) = signal(SignalKind::interrupt()) else {
        return;
    };
    // Repeated SIGINT re-delivers; the loop lives until the last runner
    // unregisters and aborts it.
    while sigint.recv().await.is_some() {
        manager.handle_sigint();
    }
}

#[cfg(not(unix))]
async fn sigint_loop(manager: Arc<LifecycleManager>) {
    while tokio::signal::ctrl_c().await.is_ok() {
        manager.handle_sigint();
    }
}
