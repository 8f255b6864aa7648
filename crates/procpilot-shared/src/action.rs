//! Management actions and their safety tiers.
//!
//! The per-type safety table lives here and nowhere else: every component
//! that needs a safety tier goes through [`ActionType::safety_level`] or
//! [`Action::safety_for`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical action vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Restart,
    Stop,
    Start,
    Status,
    Logs,
    Metrics,
    Info,
}

impl ActionType {
    pub const ALL: [ActionType; 7] = [
        ActionType::Restart,
        ActionType::Stop,
        ActionType::Start,
        ActionType::Status,
        ActionType::Logs,
        ActionType::Metrics,
        ActionType::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Restart => "restart",
            ActionType::Stop => "stop",
            ActionType::Start => "start",
            ActionType::Status => "status",
            ActionType::Logs => "logs",
            ActionType::Metrics => "metrics",
            ActionType::Info => "info",
        }
    }

    /// Parse a vocabulary word. Anything outside the vocabulary is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "restart" => Some(ActionType::Restart),
            "stop" => Some(ActionType::Stop),
            "start" => Some(ActionType::Start),
            "status" => Some(ActionType::Status),
            "logs" => Some(ActionType::Logs),
            "metrics" => Some(ActionType::Metrics),
            "info" => Some(ActionType::Info),
            _ => None,
        }
    }

    /// Safety tier of the action type on its own
    pub fn safety_level(&self) -> SafetyLevel {
        match self {
            ActionType::Stop => SafetyLevel::Dangerous,
            ActionType::Restart | ActionType::Start => SafetyLevel::Caution,
            ActionType::Status | ActionType::Logs | ActionType::Metrics | ActionType::Info => {
                SafetyLevel::Safe
            }
        }
    }

    /// Does this action only read state?
    pub fn is_read_only(&self) -> bool {
        self.safety_level() == SafetyLevel::Safe
    }

    /// Does this action need a concrete target to run?
    pub fn requires_target(&self) -> bool {
        matches!(
            self,
            ActionType::Restart | ActionType::Stop | ActionType::Start | ActionType::Info
        )
    }

    /// Past tense, for result messages ("restarted")
    pub fn past_tense(&self) -> &'static str {
        match self {
            ActionType::Restart => "restarted",
            ActionType::Stop => "stopped",
            ActionType::Start => "started",
            ActionType::Status => "checked",
            ActionType::Logs => "read",
            ActionType::Metrics => "measured",
            ActionType::Info => "described",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Safety tier, ordered from least to most risky
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Dangerous,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::Caution => "caution",
            SafetyLevel::Dangerous => "dangerous",
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of an action: one named process or every process.
///
/// Serialized as a plain string, `"all"` being the batch target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionTarget {
    All,
    Process(String),
}

impl ActionTarget {
    pub fn process(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.eq_ignore_ascii_case("all") {
            ActionTarget::All
        } else {
            ActionTarget::Process(name)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, ActionTarget::All)
    }

    /// Name of the concrete process, `None` for the batch target
    pub fn process_name(&self) -> Option<&str> {
        match self {
            ActionTarget::All => None,
            ActionTarget::Process(name) => Some(name),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionTarget::All => "all",
            ActionTarget::Process(name) => name,
        }
    }
}

impl From<String> for ActionTarget {
    fn from(value: String) -> Self {
        ActionTarget::process(value)
    }
}

impl From<ActionTarget> for String {
    fn from(value: ActionTarget) -> Self {
        match value {
            ActionTarget::All => "all".to_string(),
            ActionTarget::Process(name) => name,
        }
    }
}

impl fmt::Display for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate management operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ActionTarget>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    pub safety: SafetyLevel,
    pub description: String,
}

impl Action {
    pub fn new(action_type: ActionType, target: Option<ActionTarget>) -> Self {
        let safety = Self::safety_for(action_type, target.as_ref());
        let description = describe(action_type, target.as_ref());
        Self {
            action_type,
            target,
            parameters: BTreeMap::new(),
            safety,
            description,
        }
    }

    /// Batch action on every process
    pub fn batch(action_type: ActionType) -> Self {
        Self::new(action_type, Some(ActionTarget::All))
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Safety of an action as a pure function of type and target.
    ///
    /// Mutating actions on `all` escalate to dangerous; read-only
    /// actions stay safe whatever the target.
    pub fn safety_for(action_type: ActionType, target: Option<&ActionTarget>) -> SafetyLevel {
        let base = action_type.safety_level();
        match target {
            Some(ActionTarget::All) if base != SafetyLevel::Safe => SafetyLevel::Dangerous,
            _ => base,
        }
    }

    pub fn is_batch(&self) -> bool {
        self.target.as_ref().map(ActionTarget::is_all).unwrap_or(false)
    }

    pub fn target_name(&self) -> Option<&str> {
        self.target.as_ref().and_then(ActionTarget::process_name)
    }

    /// Equivalent slash command, e.g. `/restart api`
    pub fn to_command(&self) -> String {
        match &self.target {
            Some(target) => format!("/{} {}", self.action_type, target),
            None => format!("/{}", self.action_type),
        }
    }
}

fn describe(action_type: ActionType, target: Option<&ActionTarget>) -> String {
    match (action_type, target) {
        (ActionType::Restart, Some(ActionTarget::All)) => "Restart all processes".to_string(),
        (ActionType::Stop, Some(ActionTarget::All)) => "Stop all processes".to_string(),
        (ActionType::Start, Some(ActionTarget::All)) => "Start all stopped processes".to_string(),
        (ActionType::Restart, Some(ActionTarget::Process(n))) => format!("Restart process '{}'", n),
        (ActionType::Stop, Some(ActionTarget::Process(n))) => format!("Stop process '{}'", n),
        (ActionType::Start, Some(ActionTarget::Process(n))) => format!("Start process '{}'", n),
        (ActionType::Restart, None) => "Restart a process".to_string(),
        (ActionType::Stop, None) => "Stop a process".to_string(),
        (ActionType::Start, None) => "Start a process".to_string(),
        (ActionType::Status, Some(ActionTarget::Process(n))) => format!("Show status of '{}'", n),
        (ActionType::Status, _) => "Show status of all processes".to_string(),
        (ActionType::Logs, Some(ActionTarget::Process(n))) => format!("Show logs for '{}'", n),
        (ActionType::Logs, _) => "Show recent logs".to_string(),
        (ActionType::Metrics, Some(ActionTarget::Process(n))) => format!("Show metrics for '{}'", n),
        (ActionType::Metrics, _) => "Show resource usage".to_string(),
        (ActionType::Info, Some(ActionTarget::Process(n))) => format!("Show details for '{}'", n),
        (ActionType::Info, _) => "Show process details".to_string(),
    }
}
