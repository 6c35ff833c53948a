// src/commands/registry.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::types::Handler;

/// Process-wide map of virtual command handlers.
///
/// Mutation is permitted at any time; a lookup racing a mutation observes
/// the old or new binding, never torn state. While disabled every lookup
/// returns `None` and commands fall through to external execution.
pub struct CommandRegistry {
    commands: Mutex<HashMap<String, Handler>>,
    enabled: AtomicBool,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Mutex::new(HashMap::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Insert or replace a handler.
    pub fn register(&self, name: impl Into<String>, handler: Handler) {
        if let Ok(mut map) = self.commands.lock() {
            map.insert(name.into(), handler);
        }
    }

    /// Remove a handler; returns whether it existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.commands
            .lock()
            .map(|mut map| map.remove(name).is_some())
            .unwrap_or(false)
    }

    /// Look up a handler. Returns `None` while the registry is disabled.
    pub fn lookup(&self, name: &str) -> Option<Handler> {
        if !self.enabled.load(Ordering::Acquire) {
            return None;
        }
        self.commands
            .lock()
            .ok()
            .and_then(|map| map.get(name).cloned())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands
            .lock()
            .map(|map| map.contains_key(name))
            .unwrap_or(false)
    }

    pub fn names(&self) -> Vec<String> {
        self.commands
            .lock()
            .map(|map| {
                let mut names: Vec<String> = map.keys().cloned().collect();
                names.sort();
                names
            })
            .unwrap_or_default()
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Drop every registered handler.
    pub fn clear(&self) {
        if let Ok(mut map) = self.commands.lock() {
            map.clear();
        }
        self.enabled.store(true, Ordering::Release);
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::types::{Command, CommandContext, CommandResult};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Nop;

    #[async_trait]
    impl Command for Nop {
        fn name(&self) -> &'static str { "nop" }
        async fn execute(&self, _ctx: CommandContext) -> CommandResult {
            CommandResult::ok()
        }
    }

    #[test]
    fn test_register_lookup_unregister() {
        let registry = CommandRegistry::new();
        registry.register("nop", Handler::Value(Arc::new(Nop)));
        assert!(registry.lookup("nop").is_some());
        assert!(registry.unregister("nop"));
        assert!(!registry.unregister("nop"));
        assert!(registry.lookup("nop").is_none());
    }

    #[test]
    fn test_disable_gates_lookup() {
        let registry = CommandRegistry::new();
        registry.register("nop", Handler::Value(Arc::new(Nop)));
        registry.disable();
        assert!(registry.lookup("nop").is_none());
        // Registration state survives the gate.
        assert!(registry.contains("nop"));
        registry.enable();
        assert!(registry.lookup("nop").is_some());
    }

    #[test]
    fn test_names_sorted() {
        let registry = CommandRegistry::new();
        registry.register("b", Handler::Value(Arc::new(Nop)));
        registry.register("a", Handler::Value(Arc::new(Nop)));
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
    }
}
