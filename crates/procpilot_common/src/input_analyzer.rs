//! Input Analyzer - intent classification and scoring
//!
//! Ordered rule cascade over the input, its entities and the optional AI
//! detection; first matching rule decides the intent.

use crate::patterns::PatternMatcher;
use procpilot_shared::{
    round2, Action, AiActionDetection, EntityType, ExtractedEntity, InputAnalysis, Intent,
    SafetyLevel,
};
use std::collections::HashSet;
use std::sync::Arc;

/// AI detections at or above this make the turn a direct action
pub const AI_DIRECT_ACTION_THRESHOLD: f32 = 0.8;

/// AI detections above this supply the action-confidence directly
pub const AI_TRUSTED_CONFIDENCE: f32 = 0.7;

const IMPERATIVES: &[&str] = &[
    "restart_imperative",
    "stop_imperative",
    "start_imperative",
    "show_imperative",
];

pub struct InputAnalyzer {
    patterns: Arc<PatternMatcher>,
}

impl InputAnalyzer {
    pub fn new(patterns: Arc<PatternMatcher>) -> Self {
        Self { patterns }
    }

    pub fn create_empty_analysis(&self, input: &str) -> InputAnalysis {
        InputAnalysis::empty(input)
    }

    /// Slash commands are taken verbatim
    pub fn analyze_slash_command(&self, input: &str) -> InputAnalysis {
        InputAnalysis {
            intent: Intent::Command,
            confidence: 1.0,
            processed_command: Some(input.to_string()),
            ..InputAnalysis::empty(input)
        }
    }

    pub fn determine_intent(
        &self,
        input: &str,
        entities: &[ExtractedEntity],
        ai_detection: Option<&AiActionDetection>,
    ) -> Intent {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Intent::Question;
        }
        if trimmed.starts_with('/') {
            return Intent::Command;
        }
        if ai_detection
            .and_then(|d| d.action.map(|_| d.confidence))
            .is_some_and(|c| c >= AI_DIRECT_ACTION_THRESHOLD)
        {
            return Intent::DirectAction;
        }
        if self.patterns.test_pattern("direct_command", trimmed) {
            return Intent::Command;
        }

        let has_action = entities.iter().any(|e| e.is(EntityType::Action));
        let has_process = entities.iter().any(|e| e.is(EntityType::Process));
        let has_question = self.patterns.test_pattern("question_words", trimmed);

        if has_process && self.patterns.test_any(IMPERATIVES, trimmed) {
            return Intent::DirectAction;
        }
        if has_action && has_process && !has_question {
            return Intent::DirectAction;
        }
        if has_action && !has_process {
            return Intent::Command;
        }
        if self
            .patterns
            .test_any(&["why_question", "help_question"], trimmed)
        {
            return Intent::Question;
        }
        if self
            .patterns
            .test_any(&["performance_question", "error_question"], trimmed)
        {
            return if has_action {
                Intent::Hybrid
            } else {
                Intent::Question
            };
        }
        if has_action && has_question {
            return Intent::Hybrid;
        }
        Intent::Question
    }

    /// Intent base, up to +0.2 from mean entity confidence, +0.1 when an
    /// action was resolved. Capped at 1.0, two decimals.
    pub fn calculate_confidence(
        &self,
        intent: Intent,
        entities: &[ExtractedEntity],
        actions: &[Action],
    ) -> f32 {
        let mut confidence = intent.base_confidence();
        if !entities.is_empty() {
            let mean = entities.iter().map(|e| e.confidence).sum::<f32>() / entities.len() as f32;
            confidence += 0.2 * mean.clamp(0.0, 1.0);
        }
        if !actions.is_empty() {
            confidence += 0.1;
        }
        round2(confidence.clamp(0.0, 1.0))
    }

    /// Confidence that the suggested actions are what the user wants.
    ///
    /// `None` when nothing was suggested.
    pub fn calculate_action_confidence(
        &self,
        input: &str,
        intent: Intent,
        actions: &[Action],
        ai_detection: Option<&AiActionDetection>,
    ) -> Option<f32> {
        if actions.is_empty() {
            return None;
        }

        if let Some(detection) = ai_detection {
            if detection.action.is_some() && detection.confidence > AI_TRUSTED_CONFIDENCE {
                return Some(round2(detection.confidence.clamp(0.0, 1.0)));
            }
        }

        let mut score: f32 = match intent {
            Intent::DirectAction => 0.7,
            Intent::Command => 0.6,
            Intent::Hybrid => 0.5,
            Intent::Question => 0.3,
        };

        if self.patterns.test_any(IMPERATIVES, input) {
            score += 0.15;
        }

        let targets: HashSet<&str> = actions.iter().filter_map(Action::target_name).collect();
        match targets.len() {
            0 => {}
            1 => score += 0.1,
            _ => score -= 0.2,
        }

        if self.patterns.test_pattern("question_words", input) {
            score -= 0.15;
        }

        Some(round2(score.clamp(0.2, 1.0)))
    }

    /// Any non-safe action marks the analysis as needing confirmation.
    ///
    /// Not the execution gate: `CommandExecutor::needs_confirmation` runs a
    /// caution action on a named process ("restart api") without pausing.
    pub fn needs_confirmation(&self, actions: &[Action]) -> bool {
        actions.iter().any(|a| a.safety != SafetyLevel::Safe)
    }

    /// Structured equivalent of the input, when one is unambiguous
    pub fn processed_command(&self, input: &str, intent: Intent, actions: &[Action]) -> Option<String> {
        if let [action] = actions {
            return Some(action.to_command());
        }
        let trimmed = input.trim();
        if intent == Intent::Command && self.patterns.test_pattern("direct_command", trimmed) {
            return Some(format!("/{}", trimmed.to_lowercase()));
        }
        None
    }
}
