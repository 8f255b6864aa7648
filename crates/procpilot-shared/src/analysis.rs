//! Per-turn analysis results.

use crate::action::{Action, ActionTarget, ActionType};
use crate::entity::{EntityType, ExtractedEntity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified purpose of a user turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Command,
    Question,
    Hybrid,
    DirectAction,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Command => "command",
            Intent::Question => "question",
            Intent::Hybrid => "hybrid",
            Intent::DirectAction => "direct_action",
        }
    }

    /// Base confidence before entity and action boosts
    pub fn base_confidence(&self) -> f32 {
        match self {
            Intent::Command => 0.9,
            Intent::DirectAction => 0.85,
            Intent::Hybrid => 0.8,
            Intent::Question => 0.6,
        }
    }

    /// Is this turn asking for information rather than an operation?
    pub fn is_information_request(&self) -> bool {
        matches!(self, Intent::Question | Intent::Hybrid)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated result of the AI-assisted action detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiActionDetection {
    pub action: Option<ActionType>,
    pub target: Option<ActionTarget>,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
    pub original_text: String,
}

impl AiActionDetection {
    /// Sentinel for "nothing usable came back"
    pub fn none(original_text: impl Into<String>) -> Self {
        Self {
            action: None,
            target: None,
            confidence: 0.0,
            detected_language: None,
            original_text: original_text.into(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.action.is_none()
    }

    /// Usable action above a confidence threshold
    pub fn action_above(&self, threshold: f32) -> Option<ActionType> {
        if self.confidence > threshold {
            self.action
        } else {
            None
        }
    }
}

/// Everything learned about one user turn. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputAnalysis {
    pub intent: Intent,
    pub confidence: f32,
    pub entities: Vec<ExtractedEntity>,
    pub suggested_actions: Vec<Action>,
    /// Some suggested action is not safe. Execution pauses on a narrower
    /// rule (dangerous, or caution on every process).
    pub requires_confirmation: bool,
    pub original_input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_confidence: Option<f32>,
}

impl InputAnalysis {
    /// Analysis of an empty input
    pub fn empty(original_input: impl Into<String>) -> Self {
        Self {
            intent: Intent::Question,
            confidence: 0.0,
            entities: Vec::new(),
            suggested_actions: Vec::new(),
            requires_confirmation: false,
            original_input: original_input.into(),
            processed_command: None,
            action_confidence: None,
        }
    }

    pub fn entities_of(&self, entity_type: EntityType) -> impl Iterator<Item = &ExtractedEntity> {
        self.entities.iter().filter(move |e| e.entity_type == entity_type)
    }

    pub fn has_actions(&self) -> bool {
        !self.suggested_actions.is_empty()
    }
}
