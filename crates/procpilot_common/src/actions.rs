//! Action Detector - entities to candidate actions
//!
//! Builds the candidate Actions of a turn from extracted entities, or from
//! an AI detection when one is confident enough. Also owns the AI-assisted
//! detection call and the strict normalisation of its reply.

use crate::json_extract;
use crate::llm::AiProvider;
use crate::patterns::PatternMatcher;
use procpilot_shared::{
    Action, ActionTarget, ActionType, AiActionDetection, EntityType, ExtractedEntity, SafetyLevel,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// AI detections above this replace entity-based extraction
pub const AI_ACTION_THRESHOLD: f32 = 0.5;

pub struct ActionDetector {
    patterns: Arc<PatternMatcher>,
    ai: Option<Arc<dyn AiProvider>>,
}

impl ActionDetector {
    pub fn new(patterns: Arc<PatternMatcher>, ai: Option<Arc<dyn AiProvider>>) -> Self {
        Self { patterns, ai }
    }

    /// Is a configured provider available for detection?
    pub fn has_ai(&self) -> bool {
        self.ai.as_ref().is_some_and(|ai| ai.is_configured())
    }

    /// Per-type safety table shared by every caller
    pub fn get_safety_level(&self, action_type: ActionType) -> SafetyLevel {
        action_type.safety_level()
    }

    /// True iff any action is not safe.
    ///
    /// This is the analysis flag. Whether execution pauses is decided by
    /// `CommandExecutor::needs_confirmation`, which lets caution actions on
    /// a named process run directly.
    pub fn needs_confirmation(actions: &[Action]) -> bool {
        actions.iter().any(|a| a.safety != SafetyLevel::Safe)
    }

    pub fn extract_actions(
        &self,
        input: &str,
        entities: &[ExtractedEntity],
        ai_detection: Option<&AiActionDetection>,
    ) -> Vec<Action> {
        if let Some(detection) = ai_detection {
            if let Some(action_type) = detection.action_above(AI_ACTION_THRESHOLD) {
                return vec![Action::new(action_type, detection.target.clone())];
            }
        }

        let action_types = distinct_actions(entities);
        if action_types.is_empty() {
            return Vec::new();
        }

        // A batch request runs one operation: the first one mentioned
        if self.patterns.test_pattern("batch_operation", input) {
            if action_types.len() > 1 {
                debug!(
                    kept = action_types[0].as_str(),
                    dropped = action_types.len() - 1,
                    "batch request names several actions"
                );
            }
            return vec![Action::batch(action_types[0])];
        }

        let targets = distinct_processes(entities);
        if targets.is_empty() {
            return action_types
                .into_iter()
                .map(|action_type| Action::new(action_type, None))
                .collect();
        }

        action_types
            .iter()
            .flat_map(|action_type| {
                targets
                    .iter()
                    .map(move |name| Action::new(*action_type, Some(ActionTarget::process(*name))))
            })
            .collect()
    }

    /// Ask the provider for a structured detection.
    ///
    /// Never fails: an absent provider, a provider error or an unusable
    /// reply all yield the null detection.
    pub async fn detect_actions_with_ai(&self, input: &str) -> AiActionDetection {
        let Some(ai) = self.ai.as_ref().filter(|ai| ai.is_configured()) else {
            return AiActionDetection::none(input);
        };

        let reply = match ai.query(&detection_prompt(input), None).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("AI action detection failed: {}", e);
                return AiActionDetection::none(input);
            }
        };

        match json_extract::parse_object(&reply) {
            Some(parsed) => normalize_detection(&parsed, input),
            None => {
                debug!("AI action detection reply is not a JSON object");
                AiActionDetection::none(input)
            }
        }
    }
}

/// Validate an untrusted detection object.
///
/// Wrong field types and out-of-vocabulary actions degrade to the null
/// detection; confidence is clamped to `[0, 1]`.
pub fn normalize_detection(parsed: &Value, original_text: &str) -> AiActionDetection {
    let Some(obj) = parsed.as_object() else {
        return AiActionDetection::none(original_text);
    };

    let action = obj
        .get("action")
        .and_then(Value::as_str)
        .and_then(ActionType::parse);
    let Some(action) = action else {
        return AiActionDetection::none(original_text);
    };

    let target = obj
        .get("target")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty() && !is_null_word(t))
        .map(ActionTarget::process);

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| (c as f32).clamp(0.0, 1.0))
        .unwrap_or(0.0);

    let detected_language = obj
        .get("language")
        .or_else(|| obj.get("detectedLanguage"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string);

    AiActionDetection {
        action: Some(action),
        target,
        confidence,
        detected_language,
        original_text: original_text.to_string(),
    }
}

fn is_null_word(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "null" | "none" | "undefined")
}

fn detection_prompt(input: &str) -> String {
    let vocabulary: Vec<&str> = ActionType::ALL.iter().map(ActionType::as_str).collect();
    format!(
        "You classify process-management requests written in any language.\n\
         Reply with JSON only, no prose, in exactly this shape:\n\
         {{\"action\": <one of {actions} or null>, \"target\": <process name, \"all\", or null>, \
         \"confidence\": <number 0..1>, \"language\": <ISO 639-1 code>}}\n\
         Use \"all\" only when the user means every process. \
         Use null when the request is not an operation.\n\n\
         Request: {input}",
        actions = vocabulary.join(", "),
        input = input,
    )
}

/// Action types named by action entities, first mention first
fn distinct_actions(entities: &[ExtractedEntity]) -> Vec<ActionType> {
    let mut seen = HashSet::new();
    entities
        .iter()
        .filter(|e| e.is(EntityType::Action))
        .filter_map(|e| ActionType::parse(&e.value))
        .filter(|t| seen.insert(*t))
        .collect()
}

fn distinct_processes(entities: &[ExtractedEntity]) -> Vec<&str> {
    let mut seen = HashSet::new();
    entities
        .iter()
        .filter(|e| e.is(EntityType::Process))
        .map(|e| e.value.as_str())
        .filter(|v| seen.insert(*v))
        .collect()
}
