//! Error Analysis Service - log entries to parsed errors and a diagnosis
//!
//! Parsing and classification are deterministic. The diagnosis and quick
//! fix come from the AI provider when one is configured and its reply
//! validates; otherwise from the per-category fallback table.

pub mod fallback;
pub mod parser;
pub mod prompts;
pub mod signatures;

use crate::json_extract;
use crate::llm::AiProvider;
use crate::process_manager::ProcessManager;
use procpilot_shared::error::Result;
use procpilot_shared::{Diagnosis, ErrorSeverity, LogAnalysis, LogEntry, ParsedError};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cap on suggestion and command lists taken from the AI
pub const MAX_LIST_ITEMS: usize = 5;

/// Maximum quick-fix length, in characters
pub const MAX_QUICK_FIX_CHARS: usize = 200;

pub struct ErrorAnalysisService {
    ai: Option<Arc<dyn AiProvider>>,
}

impl ErrorAnalysisService {
    pub fn new(ai: Option<Arc<dyn AiProvider>>) -> Self {
        Self { ai }
    }

    fn configured_ai(&self) -> Option<&Arc<dyn AiProvider>> {
        self.ai.as_ref().filter(|ai| ai.is_configured())
    }

    pub async fn analyze_log_errors(&self, logs: &[LogEntry]) -> LogAnalysis {
        let parsed_errors = parser::parse_entries(logs);
        if parsed_errors.is_empty() {
            debug!("No error-bearing entries in {} log lines", logs.len());
            return LogAnalysis::clean();
        }

        let diagnosis = match self.ai_diagnosis(&parsed_errors).await {
            Some(d) => Some(d),
            None => {
                info!("Using fallback diagnosis for {} errors", parsed_errors.len());
                fallback::diagnosis(&parsed_errors)
            }
        };

        let quick_fix = match self.ai_quick_fix(&parsed_errors).await {
            Some(fix) => Some(fix),
            None => fallback::quick_fix(&parsed_errors),
        };

        LogAnalysis {
            has_errors: true,
            error_count: parsed_errors.len(),
            parsed_errors,
            diagnosis,
            quick_fix,
        }
    }

    /// Fetch recent logs through the process manager and analyse them
    pub async fn diagnose_process(
        &self,
        pm: &dyn ProcessManager,
        process: Option<&str>,
        limit: usize,
    ) -> Result<LogAnalysis> {
        let logs = pm.error_logs(process, limit).await?;
        debug!(
            "Diagnosing {} log lines for {}",
            logs.len(),
            process.unwrap_or("all processes")
        );
        Ok(self.analyze_log_errors(&logs).await)
    }

    async fn ai_diagnosis(&self, errors: &[ParsedError]) -> Option<Diagnosis> {
        let ai = self.configured_ai()?;
        let reply = match ai.query(&prompts::diagnosis_prompt(errors), None).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("AI diagnosis failed: {}", e);
                return None;
            }
        };

        let fallback_severity = fallback::primary_error(errors)
            .map(|e| e.severity)
            .unwrap_or(ErrorSeverity::Medium);

        let diagnosis = json_extract::parse_object(&reply)
            .and_then(|parsed| normalize_diagnosis(&parsed, fallback_severity));
        if diagnosis.is_none() {
            debug!("AI diagnosis reply did not validate");
        }
        diagnosis
    }

    async fn ai_quick_fix(&self, errors: &[ParsedError]) -> Option<String> {
        let ai = self.configured_ai()?;
        let primary = fallback::primary_error(errors)?;
        match ai.query(&prompts::quick_fix_prompt(primary), None).await {
            Ok(reply) => first_line(&reply),
            Err(e) => {
                warn!("AI quick fix failed: {}", e);
                None
            }
        }
    }
}

/// Validate an untrusted diagnosis object.
///
/// `summary` and `rootCause` must be non-empty strings. Lists keep string
/// items only, capped at five. Unknown severity takes `fallback_severity`;
/// confidence is clamped to `[0, 1]`.
pub fn normalize_diagnosis(parsed: &Value, fallback_severity: ErrorSeverity) -> Option<Diagnosis> {
    let obj = parsed.as_object()?;

    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let summary = text("summary")?;
    let root_cause = text("rootCause").or_else(|| text("root_cause"))?;

    let list = |camel: &str, snake: &str| -> Vec<String> {
        obj.get(camel)
            .or_else(|| obj.get(snake))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .take(MAX_LIST_ITEMS)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    let severity = obj
        .get("severity")
        .and_then(Value::as_str)
        .and_then(ErrorSeverity::parse)
        .unwrap_or(fallback_severity);

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| (c as f32).clamp(0.0, 1.0))
        .unwrap_or(0.5);

    Some(Diagnosis {
        summary,
        root_cause,
        actionable_suggestions: list("actionableSuggestions", "actionable_suggestions"),
        follow_up_commands: list("followUpCommands", "follow_up_commands"),
        severity,
        confidence,
    })
}

/// First non-empty line of a reply, fences and bullets removed
fn first_line(reply: &str) -> Option<String> {
    let line = json_extract::strip_code_fences(reply)
        .lines()
        .map(|l| l.trim().trim_start_matches(['-', '*', '`']).trim())
        .find(|l| !l.is_empty())?;
    Some(line.chars().take(MAX_QUICK_FIX_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeAiProvider;
    use chrono::Utc;
    use procpilot_shared::{ErrorCategory, LogLevel};
    use serde_json::json;

    fn module_error_logs() -> Vec<LogEntry> {
        vec![LogEntry::new(
            Utc::now(),
            LogLevel::Error,
            "Error [ERR_MODULE_NOT_FOUND]: Cannot find module '/app/x.js'",
        )
        .for_process("api")]
    }

    #[test]
    fn test_normalize_diagnosis_validates_fields() {
        let parsed = json!({
            "summary": "Database is down",
            "rootCause": "Postgres refused connections",
            "actionableSuggestions": ["a", 3, "b", "c", "d", "e", "f"],
            "followUpCommands": "not a list",
            "severity": "catastrophic",
            "confidence": 4.2
        });
        let d = normalize_diagnosis(&parsed, ErrorSeverity::High).unwrap();
        assert_eq!(d.actionable_suggestions, vec!["a", "b", "c", "d", "e"]);
        assert!(d.follow_up_commands.is_empty());
        assert_eq!(d.severity, ErrorSeverity::High);
        assert_eq!(d.confidence, 1.0);

        assert!(normalize_diagnosis(&json!({"summary": "x"}), ErrorSeverity::Low).is_none());
        assert!(normalize_diagnosis(&json!([1, 2]), ErrorSeverity::Low).is_none());
    }

    #[test]
    fn test_first_line_is_bounded() {
        assert_eq!(first_line("\n\n- run npm install\nthen restart").as_deref(), Some("run npm install"));
        assert_eq!(first_line(&"x".repeat(500)).map(|s| s.len()), Some(MAX_QUICK_FIX_CHARS));
        assert_eq!(first_line("   \n"), None);
    }

    #[tokio::test]
    async fn test_clean_logs_have_no_diagnosis() {
        let service = ErrorAnalysisService::new(None);
        let logs = vec![LogEntry::new(Utc::now(), LogLevel::Info, "listening on 3000")];
        let analysis = service.analyze_log_errors(&logs).await;
        assert_eq!(analysis, LogAnalysis::clean());
    }

    #[tokio::test]
    async fn test_ai_diagnosis_used_when_valid() {
        let ai = Arc::new(
            FakeAiProvider::new()
                .with_reply(
                    "```json\n{\"summary\": \"Missing file\", \"rootCause\": \"x.js was not deployed\", \
                     \"actionableSuggestions\": [\"Redeploy\"], \"followUpCommands\": [\"ls /app\"], \
                     \"severity\": \"critical\", \"confidence\": 0.9}\n```",
                )
                .with_reply("Redeploy the missing x.js file"),
        );
        let service = ErrorAnalysisService::new(Some(ai.clone()));
        let analysis = service.analyze_log_errors(&module_error_logs()).await;

        let d = analysis.diagnosis.unwrap();
        assert_eq!(d.summary, "Missing file");
        assert_eq!(d.confidence, 0.9);
        assert_eq!(analysis.quick_fix.as_deref(), Some("Redeploy the missing x.js file"));
        assert_eq!(ai.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_ai_falls_back_to_table() {
        let service = ErrorAnalysisService::new(Some(Arc::new(FakeAiProvider::failing())));
        let analysis = service.analyze_log_errors(&module_error_logs()).await;

        assert!(analysis.has_errors);
        assert_eq!(analysis.error_count, 1);
        assert_eq!(analysis.parsed_errors[0].category, ErrorCategory::Module);
        let d = analysis.diagnosis.unwrap();
        assert_eq!(d.confidence, fallback::FALLBACK_CONFIDENCE);
        assert_eq!(d.severity, ErrorSeverity::Critical);
        assert_eq!(analysis.quick_fix.as_deref(), Some("Check if file exists: /app/x.js"));
    }

    #[tokio::test]
    async fn test_unparsable_ai_reply_falls_back() {
        let ai = Arc::new(FakeAiProvider::new().with_reply("I think it is broken."));
        let service = ErrorAnalysisService::new(Some(ai));
        let analysis = service.analyze_log_errors(&module_error_logs()).await;
        assert_eq!(
            analysis.diagnosis.map(|d| d.confidence),
            Some(fallback::FALLBACK_CONFIDENCE)
        );
    }
}
