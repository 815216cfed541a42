//! Handler registry.
//!
//! Maps task-type strings to their processing handlers. The registry is
//! populated before the worker pool starts and is read-only afterwards, so
//! lookups take no lock.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::ports::TaskHandler;
use crate::domain::{EngineError, EngineResult};

/// Startup-populated map from task type to handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a task type. Replaces any previous handler
    /// for the same type.
    pub fn register(&mut self, task_type: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(task_type.into(), handler);
    }

    /// Look up the handler for a task type.
    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(task_type).cloned()
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.handlers.contains_key(task_type)
    }

    /// Registered task types.
    pub fn task_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Fail fast when a producer maps to an unregistered task type.
    ///
    /// Called at engine startup with every task type referenced by trigger
    /// and monitoring-rule definitions.
    pub fn validate_mappings<'a>(
        &self,
        mapped_types: impl IntoIterator<Item = &'a str>,
    ) -> EngineResult<()> {
        for task_type in mapped_types {
            if !self.contains(task_type) {
                return Err(EngineError::UnknownTaskType(task_type.to_string()));
            }
        }
        Ok(())
    }
}
