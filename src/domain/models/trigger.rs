//! Trigger definitions.
//!
//! A trigger is an external-event definition: when invoked with a valid
//! payload it produces a task of its mapped type. Definitions are created
//! at startup; only the firing statistics mutate at runtime.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a payload field must be present for the trigger to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRequirement {
    Required,
    Optional,
}

/// An external-event definition that produces tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub id: Uuid,
    /// Lookup name used by callers
    pub name: String,
    /// Payload fields and whether each is required
    pub required_fields: HashMap<String, FieldRequirement>,
    /// Task type produced when this trigger fires
    pub task_type: String,
    pub is_active: bool,
    /// Last time this trigger fired
    pub last_triggered: Option<DateTime<Utc>>,
    pub trigger_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Trigger {
    pub fn new(name: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            required_fields: HashMap::new(),
            task_type: task_type.into(),
            is_active: true,
            last_triggered: None,
            trigger_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Mark a payload field as required.
    pub fn with_required_field(mut self, field: impl Into<String>) -> Self {
        self.required_fields
            .insert(field.into(), FieldRequirement::Required);
        self
    }

    /// Mark a payload field as optional.
    pub fn with_optional_field(mut self, field: impl Into<String>) -> Self {
        self.required_fields
            .insert(field.into(), FieldRequirement::Optional);
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Names of fields that must be present in an invocation payload.
    pub fn required_field_names(&self) -> impl Iterator<Item = &str> {
        self.required_fields
            .iter()
            .filter(|(_, req)| **req == FieldRequirement::Required)
            .map(|(name, _)| name.as_str())
    }

    /// Record a firing.
    pub fn record_fired(&mut self) {
        self.trigger_count += 1;
        self.last_triggered = Some(Utc::now());
    }
}
