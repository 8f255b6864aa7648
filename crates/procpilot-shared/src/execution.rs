//! Results of executing actions against the process manager.

use serde::{Deserialize, Serialize};

/// Caller-supplied confirmation state for one execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteOptions {
    /// The user explicitly confirmed this action
    pub confirmed: bool,
    /// The caller decided confirmation is not needed (e.g. `--yes`)
    pub skip_confirmation: bool,
}

impl ExecuteOptions {
    pub fn confirmed() -> Self {
        Self {
            confirmed: true,
            skip_confirmation: false,
        }
    }

    pub fn may_proceed(&self) -> bool {
        self.confirmed || self.skip_confirmation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ExecutionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            requires_confirmation: false,
            confirmation_prompt: None,
            data: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            requires_confirmation: false,
            confirmation_prompt: None,
            data: None,
        }
    }

    /// Paused: nothing was executed
    pub fn needs_confirmation(prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        Self {
            success: false,
            message: prompt.clone(),
            requires_confirmation: true,
            confirmation_prompt: Some(prompt),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
