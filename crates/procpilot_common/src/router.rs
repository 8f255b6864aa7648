//! AI Input Router - one `analyze` call per user turn
//!
//! Orchestrates pattern matching, entity extraction, action detection and
//! intent scoring. Holds no per-turn state, so independent inputs may be
//! analysed concurrently.

use crate::actions::ActionDetector;
use crate::entities::EntityExtractor;
use crate::input_analyzer::InputAnalyzer;
use crate::llm::AiProvider;
use crate::patterns::PatternMatcher;
use procpilot_shared::{AiActionDetection, InputAnalysis};
use std::sync::Arc;
use tracing::debug;

pub struct AiInputRouter {
    patterns: Arc<PatternMatcher>,
    extractor: EntityExtractor,
    detector: ActionDetector,
    analyzer: InputAnalyzer,
    ai_detection: bool,
}

impl AiInputRouter {
    pub fn new(patterns: Arc<PatternMatcher>, ai: Option<Arc<dyn AiProvider>>) -> Self {
        Self {
            extractor: EntityExtractor::new(),
            detector: ActionDetector::new(patterns.clone(), ai),
            analyzer: InputAnalyzer::new(patterns.clone()),
            patterns,
            ai_detection: true,
        }
    }

    /// Heuristics only, no provider
    pub fn heuristic(patterns: Arc<PatternMatcher>) -> Self {
        Self::new(patterns, None)
    }

    /// Toggle the AI-assisted detection step (`ai_action_detection` setting)
    pub fn with_ai_detection(mut self, enabled: bool) -> Self {
        self.ai_detection = enabled;
        self
    }

    pub fn detector(&self) -> &ActionDetector {
        &self.detector
    }

    pub async fn analyze(&self, input: &str) -> InputAnalysis {
        let input = input.trim();
        if input.is_empty() {
            return self.analyzer.create_empty_analysis(input);
        }
        if input.starts_with('/') {
            return self.analyzer.analyze_slash_command(input);
        }

        let ai = self.ai_detection(input).await;
        let ai = ai.as_ref();

        let entities = self.extractor.extract_entities(input, ai);
        let intent = self.analyzer.determine_intent(input, &entities, ai);
        let actions = self.detector.extract_actions(input, &entities, ai);
        let confidence = self.analyzer.calculate_confidence(intent, &entities, &actions);
        let action_confidence = self
            .analyzer
            .calculate_action_confidence(input, intent, &actions, ai);
        let requires_confirmation = self.analyzer.needs_confirmation(&actions);
        let processed_command = self.analyzer.processed_command(input, intent, &actions);

        debug!(
            intent = intent.as_str(),
            confidence,
            actions = actions.len(),
            "analysed input"
        );

        InputAnalysis {
            intent,
            confidence,
            entities,
            suggested_actions: actions,
            requires_confirmation,
            original_input: input.to_string(),
            processed_command,
            action_confidence,
        }
    }

    /// Detection from the provider when it is worth asking; bare-word
    /// commands never are.
    async fn ai_detection(&self, input: &str) -> Option<AiActionDetection> {
        if !self.ai_detection || !self.detector.has_ai() {
            return None;
        }
        if self.patterns.test_pattern("direct_command", input) {
            debug!("skipping AI detection for direct command");
            return None;
        }

        let detection = self.detector.detect_actions_with_ai(input).await;
        if detection.is_none() {
            None
        } else {
            Some(detection)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::CommandExecutor;
    use crate::llm::FakeAiProvider;
    use procpilot_shared::{ActionTarget, ActionType, Intent, SafetyLevel};

    fn heuristic() -> AiInputRouter {
        AiInputRouter::heuristic(Arc::new(PatternMatcher::new()))
    }

    #[tokio::test]
    async fn test_restart_named_process() {
        let analysis = heuristic().analyze("restart api-server").await;
        assert_eq!(analysis.intent, Intent::DirectAction);
        assert_eq!(analysis.suggested_actions.len(), 1);
        let action = &analysis.suggested_actions[0];
        assert_eq!(action.action_type, ActionType::Restart);
        assert_eq!(action.target, Some(ActionTarget::process("api-server")));
        assert_eq!(action.safety, SafetyLevel::Caution);
        assert!(analysis.requires_confirmation);
        assert!(!CommandExecutor::needs_confirmation(action));
        assert_eq!(analysis.processed_command.as_deref(), Some("/restart api-server"));
    }

    #[tokio::test]
    async fn test_stop_everything() {
        let analysis = heuristic().analyze("  stop everything ").await;
        assert_eq!(analysis.original_input, "stop everything");
        assert_eq!(analysis.suggested_actions.len(), 1);
        assert_eq!(analysis.suggested_actions[0].target, Some(ActionTarget::All));
        assert_eq!(analysis.suggested_actions[0].safety, SafetyLevel::Dangerous);
        assert!(analysis.requires_confirmation);
    }

    #[tokio::test]
    async fn test_empty_and_slash() {
        let empty = heuristic().analyze("   ").await;
        assert_eq!(empty.confidence, 0.0);
        assert!(empty.entities.is_empty());

        let slash = heuristic().analyze("/logs api").await;
        assert_eq!(slash.intent, Intent::Command);
        assert_eq!(slash.processed_command.as_deref(), Some("/logs api"));
    }

    #[tokio::test]
    async fn test_ai_detection_is_used() {
        let fake = Arc::new(FakeAiProvider::new().with_reply(
            r#"{"action": "restart", "target": "payments", "confidence": 0.93, "language": "es"}"#,
        ));
        let router = AiInputRouter::new(Arc::new(PatternMatcher::new()), Some(fake.clone()));
        let analysis = router.analyze("reinicia payments por favor").await;

        assert_eq!(analysis.intent, Intent::DirectAction);
        assert_eq!(analysis.suggested_actions.len(), 1);
        assert_eq!(analysis.suggested_actions[0].to_command(), "/restart payments");
        assert_eq!(analysis.action_confidence, Some(0.93));
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_heuristics() {
        let fake = Arc::new(FakeAiProvider::failing());
        let router = AiInputRouter::new(Arc::new(PatternMatcher::new()), Some(fake.clone()));
        let analysis = router.analyze("restart api-server").await;
        assert_eq!(analysis.suggested_actions[0].to_command(), "/restart api-server");
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn test_direct_commands_and_disabled_detection_skip_ai() {
        let fake = Arc::new(FakeAiProvider::new().with_reply("{}"));
        let router = AiInputRouter::new(Arc::new(PatternMatcher::new()), Some(fake.clone()));
        router.analyze("status").await;
        assert_eq!(fake.call_count(), 0);

        let router = AiInputRouter::new(Arc::new(PatternMatcher::new()), Some(fake.clone()))
            .with_ai_detection(false);
        router.analyze("restart api").await;
        assert_eq!(fake.call_count(), 0);
    }
}
