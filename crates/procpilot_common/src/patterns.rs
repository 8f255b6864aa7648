//! Pattern Matcher - named regex registry
//!
//! Fixed set of patterns used to recognise command forms, imperative verbs
//! and question forms. Built once at startup and shared by reference; the
//! registry is never mutated after construction.

use regex::Regex;
use std::collections::HashMap;

/// Leading politeness that may precede an imperative verb
const POLITE_PREFIX: &str = r"(?:please\s+|pls\s+|(?:can|could|would|will)\s+you\s+(?:please\s+)?)?";

/// Name → source of every built-in pattern
const PATTERN_SOURCES: &[(&str, &str)] = &[
    // Command detection
    ("slash_command", r"^/[A-Za-z][\w-]*"),
    (
        "direct_command",
        r"(?i)^\s*(?:list|ls|ps|status|monit|metrics|logs|errors|help|history|stats|clear|exit|quit)\s*$",
    ),
    // Imperatives
    ("restart_imperative", r"(?i)^\s*{polite}(?:restart|reboot|reload|relaunch|bounce)\b"),
    ("stop_imperative", r"(?i)^\s*{polite}(?:stop|kill|halt|terminate|shut\s*down)\b"),
    ("start_imperative", r"(?i)^\s*{polite}(?:start|launch|spin\s+up|boot\s+up)\b"),
    ("show_imperative", r"(?i)^\s*{polite}(?:show|display|list|get|check|tail|view|give\s+me)\b"),
    // Batch operations
    ("batch_operation", r"(?i)\b(?:all|everything|every\s+process(?:es)?)\b"),
    // Question forms
    ("why_question", r"(?i)\b(?:why|what|how)\b"),
    (
        "help_question",
        r"(?i)\b(?:help|explain|how\s+(?:do|can)\s+i|how\s+to|what\s+(?:is|does)|tell\s+me\s+about)\b",
    ),
    (
        "performance_question",
        r"(?i)\b(?:slow|slowly|sluggish|performance|perf|lag|laggy|latency|cpu|memory|ram|leak|leaking|usage|speed|heavy)\b",
    ),
    (
        "error_question",
        r"(?i)\b(?:error|errors|crash|crashes|crashing|crashed|fail|fails|failing|failed|failure|exception|broken|bug|issue|problem)\b",
    ),
    (
        "question_words",
        r"(?i)(?:\?\s*$|\b(?:why|what|how|when|where|which|who)\b|^\s*(?:is|are|does|do|did|can|could|should|would|will)\b)",
    ),
];

/// Lookup/testing facade over the built-in patterns
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    patterns: HashMap<String, Regex>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        let patterns = PATTERN_SOURCES
            .iter()
            .map(|(name, source)| {
                let source = source.replace("{polite}", POLITE_PREFIX);
                let regex = Regex::new(&source)
                    .unwrap_or_else(|e| panic!("built-in pattern '{}' is invalid: {}", name, e));
                (name.to_string(), regex)
            })
            .collect();
        Self { patterns }
    }

    /// Pattern by name, `None` for unknown names
    pub fn get_pattern(&self, name: &str) -> Option<&Regex> {
        self.patterns.get(name)
    }

    /// Test input against a named pattern. Unknown names never match.
    pub fn test_pattern(&self, name: &str, input: &str) -> bool {
        self.patterns
            .get(name)
            .map(|re| re.is_match(input))
            .unwrap_or(false)
    }

    /// True if any of the named patterns matches
    pub fn test_any(&self, names: &[&str], input: &str) -> bool {
        names.iter().any(|name| self.test_pattern(name, input))
    }

    /// Copy of the full registry. Changes to the copy never reach the canonical one.
    pub fn get_command_patterns(&self) -> HashMap<String, Regex> {
        self.patterns.clone()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.patterns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        let matcher = PatternMatcher::new();
        assert_eq!(matcher.names().len(), PATTERN_SOURCES.len());
    }

    #[test]
    fn test_unknown_pattern() {
        let matcher = PatternMatcher::new();
        assert!(matcher.get_pattern("no_such_pattern").is_none());
        assert!(!matcher.test_pattern("no_such_pattern", "anything"));
    }

    #[test]
    fn test_slash_and_direct_commands() {
        let matcher = PatternMatcher::new();
        assert!(matcher.test_pattern("slash_command", "/restart api"));
        assert!(!matcher.test_pattern("slash_command", "restart /tmp"));
        assert!(matcher.test_pattern("direct_command", "status"));
        assert!(matcher.test_pattern("direct_command", "  LIST "));
        assert!(!matcher.test_pattern("direct_command", "restart api-server"));
    }

    #[test]
    fn test_imperatives() {
        let matcher = PatternMatcher::new();
        assert!(matcher.test_pattern("restart_imperative", "restart api"));
        assert!(matcher.test_pattern("restart_imperative", "please reboot the worker"));
        assert!(matcher.test_pattern("stop_imperative", "could you kill api"));
        assert!(matcher.test_pattern("stop_imperative", "shut down api"));
        assert!(matcher.test_pattern("start_imperative", "spin up worker"));
        assert!(matcher.test_pattern("show_imperative", "show logs for api"));
        assert!(!matcher.test_pattern("start_imperative", "restart api"));
        assert!(!matcher.test_pattern("stop_imperative", "why did api stop"));
    }

    #[test]
    fn test_batch_operation() {
        let matcher = PatternMatcher::new();
        assert!(matcher.test_pattern("batch_operation", "stop everything"));
        assert!(matcher.test_pattern("batch_operation", "restart all"));
        assert!(matcher.test_pattern("batch_operation", "restart every process"));
        assert!(!matcher.test_pattern("batch_operation", "restart ballroom"));
    }

    #[test]
    fn test_question_forms() {
        let matcher = PatternMatcher::new();
        assert!(matcher.test_pattern("why_question", "why is api slow"));
        assert!(matcher.test_pattern("help_question", "how do I add a process"));
        assert!(matcher.test_pattern("performance_question", "api is using too much memory"));
        assert!(matcher.test_pattern("error_question", "worker keeps crashing"));
        assert!(matcher.test_pattern("question_words", "is api up?"));
        assert!(matcher.test_pattern("question_words", "can you restart api"));
        assert!(!matcher.test_pattern("question_words", "restart api"));
    }

    #[test]
    fn test_command_patterns_are_copies() {
        let matcher = PatternMatcher::new();
        let mut first = matcher.get_command_patterns();
        let second = matcher.get_command_patterns();

        let mut first_keys: Vec<_> = first.keys().cloned().collect();
        let mut second_keys: Vec<_> = second.keys().cloned().collect();
        first_keys.sort();
        second_keys.sort();
        assert_eq!(first_keys, second_keys);
        for (name, re) in &second {
            assert_eq!(first[name].as_str(), re.as_str());
        }

        first.remove("slash_command");
        first.insert("slash_command".to_string(), Regex::new("never").unwrap());
        assert!(matcher.test_pattern("slash_command", "/status"));
        assert_eq!(
            second["slash_command"].as_str(),
            matcher.get_pattern("slash_command").unwrap().as_str()
        );
    }
}
