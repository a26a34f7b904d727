//! Reusable status payload with a field-grouped copy policy

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Condition, Phase};
use crate::resource::CopyStatus;

/// Maximum number of entries kept in `actions` and `errors`
pub const MAX_STATUS_LIST_LEN: usize = 10;

/// Which groups of fields [`ManagedStatus::copy_from`] carries over.
///
/// `whole_status` replaces the target outright and overrides the other flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusCopyOptions {
    /// Replace the entire status
    pub whole_status: bool,
    /// Copy phase, message, observed generation and conditions
    pub main_fields: bool,
    /// Copy the recent actions list
    pub actions: bool,
    /// Copy the recent errors list
    pub errors: bool,
}

impl Default for StatusCopyOptions {
    fn default() -> Self {
        Self::whole()
    }
}

impl StatusCopyOptions {
    /// Copy everything
    pub fn whole() -> Self {
        Self {
            whole_status: true,
            main_fields: false,
            actions: false,
            errors: false,
        }
    }

    /// Copy nothing; combine with the builder methods below
    pub fn none() -> Self {
        Self {
            whole_status: false,
            main_fields: false,
            actions: false,
            errors: false,
        }
    }

    /// Also copy the main fields
    pub fn with_main_fields(mut self) -> Self {
        self.main_fields = true;
        self
    }

    /// Also copy the actions list
    pub fn with_actions(mut self) -> Self {
        self.actions = true;
        self
    }

    /// Also copy the errors list
    pub fn with_errors(mut self) -> Self {
        self.errors = true;
        self
    }
}

/// Status reported by a controller for a managed resource
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedStatus {
    /// Current lifecycle phase
    #[serde(default)]
    pub phase: Phase,

    /// Human-readable message about the current state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// The generation of the spec that was last processed by the controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Conditions, at most one per type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Most recent actions taken by the controller, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,

    /// Most recent errors seen by the controller, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ManagedStatus {
    /// Create a status with the given phase
    pub fn with_phase(phase: Phase) -> Self {
        Self {
            phase,
            ..Default::default()
        }
    }

    /// Set the message and return self for chaining
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Set the observed generation and return self for chaining
    pub fn observed_generation(mut self, generation: i64) -> Self {
        self.observed_generation = Some(generation);
        self
    }

    /// Add or replace a condition and return self for chaining
    pub fn condition(mut self, condition: Condition) -> Self {
        // Remove existing condition of the same type
        self.conditions.retain(|c| c.type_ != condition.type_);
        self.conditions.push(condition);
        self
    }

    /// Record an action, dropping the oldest beyond [`MAX_STATUS_LIST_LEN`]
    pub fn push_action(&mut self, action: impl Into<String>) {
        self.actions.push(action.into());
        truncate_front(&mut self.actions);
    }

    /// Record an error, dropping the oldest beyond [`MAX_STATUS_LIST_LEN`]
    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        truncate_front(&mut self.errors);
    }
}

fn truncate_front(list: &mut Vec<String>) {
    if list.len() > MAX_STATUS_LIST_LEN {
        let excess = list.len() - MAX_STATUS_LIST_LEN;
        list.drain(..excess);
    }
}

impl CopyStatus for ManagedStatus {
    type Options = StatusCopyOptions;

    fn copy_from(&mut self, from: &Self, options: &StatusCopyOptions) {
        if options.whole_status {
            *self = from.clone();
            truncate_front(&mut self.actions);
            truncate_front(&mut self.errors);
            return;
        }

        if options.main_fields {
            self.phase = from.phase.clone();
            self.message = from.message.clone();
            self.observed_generation = from.observed_generation;
            self.conditions = from.conditions.clone();
        }

        if options.actions {
            self.actions = from.actions.clone();
            truncate_front(&mut self.actions);
        }

        if options.errors {
            self.errors = from.errors.clone();
            truncate_front(&mut self.errors);
        }
    }
}
