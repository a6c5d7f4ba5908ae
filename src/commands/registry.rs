//! Command handler registry
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.0.0: Initial implementation for handler dispatch

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::CommandHandler;

/// Registry mapping command names to handlers
///
/// Multiple command names can map to the same handler if they share logic.
#[derive(Clone)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry holding every built-in handler
    pub fn with_all_handlers() -> Self {
        let mut registry = Self::new();
        for handler in super::handlers::create_all_handlers() {
            registry.register(handler);
        }
        registry
    }

    /// Register a handler for all names returned by `command_names()`
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        for name in handler.command_names() {
            self.handlers.insert(*name, Arc::clone(&handler));
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered command names
    ///
    /// Note: This counts command names, not unique handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn command_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
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
    use crate::commands::context::CommandContext;
    use crate::commands::handler::CommandRequest;
    use crate::core::Reply;
    use anyhow::Result;
    use async_trait::async_trait;

    struct MockHandler {
        names: &'static [&'static str],
    }

    #[async_trait]
    impl CommandHandler for MockHandler {
        fn command_names(&self) -> &'static [&'static str] {
            self.names
        }

        async fn handle(
            &self,
            _ctx: Arc<CommandContext>,
            _req: &CommandRequest,
        ) -> Result<Vec<Reply>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_registry_new_is_empty() {
        let registry = CommandRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_registry_register_multiple_names() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(MockHandler {
            names: &["add_task", "my_tasks"],
        }));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("add_task"));
        assert!(registry.contains("my_tasks"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_registry_default() {
        assert!(CommandRegistry::default().is_empty());
    }

    #[test]
    fn test_all_handlers_cover_the_command_surface() {
        let registry = CommandRegistry::with_all_handlers();
        for name in [
            "start",
            "help",
            "cancel",
            "add_task",
            "my_tasks",
            "add_reminder",
            "my_reminders",
            "add_event",
            "calendar",
            "today_events",
            "stats",
            "admin",
            "grant_admin",
            "user_list",
            "broadcast",
            "users_stats",
            "system_info",
        ] {
            assert!(registry.contains(name), "missing handler for {name}");
        }
        assert_eq!(registry.len(), 17);
    }
}
