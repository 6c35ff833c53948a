//! Engine Handle
//!
//! Packages every piece of process-wide state — shell settings, the
//! virtual registry, the shell-locator cache, and the active-runner set —
//! behind one handle, so hosts can run isolated engines side by side and
//! tests can reset atomically. A default global engine backs the `sh()`
//! convenience entry point.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;

use crate::commands::{register_builtins, CommandRegistry};
use crate::error::CommandError;
use crate::lifecycle::LifecycleManager;
use crate::locator::{locate_shell, ShellInvocation};
use crate::runner::{CommandSpec, ProcessRunner, RunOptions, RunResult};
use crate::settings::{ShellOption, ShellSettings};

struct EngineInner {
    settings: Mutex<ShellSettings>,
    registry: Arc<CommandRegistry>,
    shell_cache: Mutex<Option<ShellInvocation>>,
    lifecycle: Arc<LifecycleManager>,
    next_runner_id: AtomicU64,
}

/// Handle to one engine instance. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Build an engine with the builtin registry populated and settings
    /// initialized from `COMMAND_STREAM_TRACE` / `COMMAND_STREAM_VERBOSE`.
    pub fn new() -> Self {
        let registry = Arc::new(CommandRegistry::new());
        register_builtins(&registry);
        Self {
            inner: Arc::new(EngineInner {
                settings: Mutex::new(ShellSettings::from_env()),
                registry,
                shell_cache: Mutex::new(None),
                lifecycle: LifecycleManager::new(),
                next_runner_id: AtomicU64::new(1),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Runner construction
    // ------------------------------------------------------------------

    /// Runner for a literal shell command string, default options.
    pub fn shell(&self, command: impl Into<String>) -> ProcessRunner {
        self.spawn_spec(CommandSpec::shell(command), RunOptions::default())
    }

    /// Runner for a shell command string with explicit options.
    pub fn shell_with(&self, command: impl Into<String>, options: RunOptions) -> ProcessRunner {
        self.spawn_spec(CommandSpec::shell(command), options)
    }

    /// Runner that bypasses shell parsing: `file args...`.
    pub fn exec(
        &self,
        file: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> ProcessRunner {
        self.exec_with(file, args, RunOptions::default())
    }

    pub fn exec_with(
        &self,
        file: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
        options: RunOptions,
    ) -> ProcessRunner {
        let args = args.into_iter().map(Into::into).collect();
        self.spawn_spec(CommandSpec::exec(file, args), options)
    }

    /// Build a runner from any spec. The runner is idle until first
    /// observed.
    pub fn spawn_spec(&self, spec: CommandSpec, options: RunOptions) -> ProcessRunner {
        let id = self.inner.next_runner_id.fetch_add(1, Ordering::Relaxed);
        ProcessRunner::new(self.clone(), id, spec, options)
    }

    /// Run a command string to completion.
    pub async fn run(&self, command: impl Into<String>) -> Result<RunResult, CommandError> {
        self.shell(command).wait().await
    }

    // ------------------------------------------------------------------
    // Shell options
    // ------------------------------------------------------------------

    /// `set -e` / `set -o pipefail` style option enable. Takes effect for
    /// runners started afterwards.
    pub fn set_option(&self, name: &str) -> Result<(), CommandError> {
        let option = ShellOption::parse(name)?;
        if let Ok(mut settings) = self.inner.settings.lock() {
            settings.apply(option, true);
        }
        Ok(())
    }

    pub fn unset_option(&self, name: &str) -> Result<(), CommandError> {
        let option = ShellOption::parse(name)?;
        if let Ok(mut settings) = self.inner.settings.lock() {
            settings.apply(option, false);
        }
        Ok(())
    }

    pub fn settings(&self) -> ShellSettings {
        self.inner
            .settings
            .lock()
            .map(|s| *s)
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Collaborators
    // ------------------------------------------------------------------

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.inner.registry
    }

    /// The cached system shell, probing on first use.
    pub fn system_shell(&self) -> ShellInvocation {
        if let Ok(mut cache) = self.inner.shell_cache.lock() {
            if let Some(shell) = cache.as_ref() {
                return shell.clone();
            }
            let shell = locate_shell();
            *cache = Some(shell.clone());
            return shell;
        }
        locate_shell()
    }

    pub(crate) fn lifecycle(&self) -> &Arc<LifecycleManager> {
        &self.inner.lifecycle
    }

    /// Number of currently live runners.
    pub fn active_runners(&self) -> usize {
        self.inner.lifecycle.active_count()
    }

    /// Whether SIGINT fan-out ends with a host exit (code 130). On by
    /// default; hosts that install their own SIGINT handling opt out.
    pub fn set_exit_on_sigint(&self, enabled: bool) {
        self.inner.lifecycle.set_exit_on_sigint(enabled);
    }

    pub(crate) fn notify_parent_stream_closed(&self) {
        self.inner.lifecycle.notify_parent_closed();
    }

    /// Reset process-wide state: settings back to defaults, registry
    /// rebuilt with the builtins, shell cache cleared.
    pub fn reset(&self) {
        if let Ok(mut settings) = self.inner.settings.lock() {
            *settings = ShellSettings::default();
        }
        self.inner.registry.clear();
        register_builtins(&self.inner.registry);
        if let Ok(mut cache) = self.inner.shell_cache.lock() {
            *cache = None;
        }
        self.inner.lifecycle.reset_parent_closed();
    }

    /// Interpolate fragments and values into a runner, quoting values so
    /// they cannot escape their argument position.
    pub fn interpolate(
        &self,
        fragments: &[&str],
        values: &[crate::quote::Value],
    ) -> ProcessRunner {
        self.shell(crate::quote::interpolate(fragments, values))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref GLOBAL_ENGINE: Engine = Engine::new();
}

/// The process-wide default engine.
pub fn global_engine() -> Engine {
    GLOBAL_ENGINE.clone()
}

/// Convenience: a runner on the global engine.
///
/// ```no_run
/// # async fn example() -> Result<(), command_stream::CommandError> {
/// let result = command_stream::sh("echo hello").wait().await?;
/// assert_eq!(result.stdout, "hello\n");
/// # Ok(())
/// # }
/// ```
pub fn sh(command: impl Into<String>) -> ProcessRunner {
    GLOBAL_ENGINE.shell(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_isolated_settings() {
        let a = Engine::new();
        let b = Engine::new();
        a.set_option("pipefail").unwrap();
        assert!(a.settings().pipefail);
        assert!(!b.settings().pipefail);
    }

    #[test]
    fn test_set_unset_option() {
        let engine = Engine::new();
        engine.set_option("e").unwrap();
        assert!(engine.settings().errexit);
        engine.unset_option("errexit").unwrap();
        assert!(!engine.settings().errexit);
        assert!(engine.set_option("bogus").is_err());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let engine = Engine::new();
        engine.set_option("x").unwrap();
        engine.registry().unregister("echo");
        engine.reset();
        assert!(!engine.settings().xtrace);
        assert!(engine.registry().contains("echo"));
    }

    #[test]
    fn test_system_shell_cached() {
        let engine = Engine::new();
        let first = engine.system_shell();
        let second = engine.system_shell();
        assert_eq!(first, second);
    }

    #[test]
    fn test_registry_disable_gate() {
        let engine = Engine::new();
        engine.registry().disable();
        assert!(engine.registry().lookup("echo").is_none());
        engine.registry().enable();
        assert!(engine.registry().lookup("echo").is_some());
    }
}
