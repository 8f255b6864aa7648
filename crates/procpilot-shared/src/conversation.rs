//! Conversation records: turns, derived context, pending confirmations.

use crate::action::{Action, SafetyLevel};
use crate::analysis::InputAnalysis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome attached to a turn once it has been handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    pub success: bool,
    pub message: String,
}

impl TurnResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// One user turn. Never mutated after it is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Sequence number within the session, monotonic
    pub id: u64,
    pub input: String,
    pub analysis: InputAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TurnResult>,
    pub timestamp: DateTime<Utc>,
}

/// Rolling view derived from the turn history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub last_mentioned_process: Option<String>,
    /// Most recent first, no duplicates
    pub recent_processes: Vec<String>,
    /// Oldest first
    pub previous_commands: Vec<String>,
    pub last_response: Option<String>,
}

/// An action waiting for the user to reply with its number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    /// 1-based, as shown to the user
    pub id: usize,
    pub label: String,
    pub command: String,
    pub action: Action,
    pub analysis: InputAnalysis,
    pub safety: SafetyLevel,
}

impl PendingAction {
    pub fn new(id: usize, action: Action, analysis: InputAnalysis) -> Self {
        Self {
            id,
            label: action.description.clone(),
            command: action.to_command(),
            safety: action.safety,
            action,
            analysis,
        }
    }
}
