//! Tests for log error analysis through the public service API

use chrono::{Duration, TimeZone, Utc};
use procpilot_common::error_analysis::fallback::FALLBACK_CONFIDENCE;
use procpilot_common::{ErrorAnalysisService, FakeAiProvider, FakeProcessManager};
use procpilot_shared::{ErrorCategory, ErrorSeverity, LogEntry, LogLevel, ProcessStatus};
use std::sync::Arc;

fn at(secs: i64, level: LogLevel, message: &str) -> LogEntry {
    let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    LogEntry::new(base + Duration::seconds(secs), level, message).for_process("api")
}

fn crash_logs() -> Vec<LogEntry> {
    vec![
        at(0, LogLevel::Info, "Server listening on port 3000"),
        at(5, LogLevel::Error, "Error: connect ECONNREFUSED 127.0.0.1:5432"),
        at(9, LogLevel::Error, "TypeError: Cannot read properties of undefined (reading 'rows')"),
        at(9, LogLevel::Error, "    at listUsers (/app/src/users.js:31:18)"),
        at(12, LogLevel::Warn, "(node:51) MaxListenersExceededWarning: Possible EventEmitter memory leak detected"),
    ]
}

#[tokio::test]
async fn module_error_example_is_classified() {
    let service = ErrorAnalysisService::new(None);
    let logs = vec![at(
        0,
        LogLevel::Error,
        "Error [ERR_MODULE_NOT_FOUND]: Cannot find module '/app/x.js'",
    )];

    let analysis = service.analyze_log_errors(&logs).await;
    let error = &analysis.parsed_errors[0];
    assert_eq!(error.error_type, "Module Not Found");
    assert_eq!(error.severity, ErrorSeverity::Critical);
    assert_eq!(error.category, ErrorCategory::Module);
    assert_eq!(error.file_path.as_deref(), Some("/app/x.js"));
}

#[tokio::test]
async fn errors_are_newest_first_with_folded_stack() {
    let service = ErrorAnalysisService::new(None);
    let analysis = service.analyze_log_errors(&crash_logs()).await;

    assert!(analysis.has_errors);
    assert_eq!(analysis.error_count, 3);
    let types: Vec<&str> = analysis
        .parsed_errors
        .iter()
        .map(|e| e.error_type.as_str())
        .collect();
    assert_eq!(types, vec!["Memory Leak Warning", "Type Error", "Connection Refused"]);

    let type_error = &analysis.parsed_errors[1];
    assert_eq!(type_error.line_number, Some(31));
    assert_eq!(type_error.context, "in listUsers");
}

#[tokio::test]
async fn always_failing_ai_still_yields_fallback_diagnosis() {
    let ai = Arc::new(FakeAiProvider::failing());
    let service = ErrorAnalysisService::new(Some(ai.clone()));
    let analysis = service.analyze_log_errors(&crash_logs()).await;

    let diagnosis = analysis.diagnosis.expect("fallback diagnosis");
    assert_eq!(diagnosis.confidence, FALLBACK_CONFIDENCE);
    // High ties between type and connection errors; the newer one leads
    assert_eq!(diagnosis.severity, ErrorSeverity::High);
    assert!(diagnosis.summary.contains("Type Error"));
    assert!(analysis.quick_fix.is_some());
    assert_eq!(ai.call_count(), 2);
}

#[tokio::test]
async fn unconfigured_ai_is_never_called() {
    let ai = Arc::new(FakeAiProvider::unconfigured());
    let service = ErrorAnalysisService::new(Some(ai.clone()));
    let analysis = service.analyze_log_errors(&crash_logs()).await;
    assert!(analysis.diagnosis.is_some());
    assert_eq!(ai.call_count(), 0);
}

#[tokio::test]
async fn diagnose_process_reads_logs_through_manager() {
    let pm = FakeProcessManager::new()
        .with("api", ProcessStatus::Errored)
        .with_logs(crash_logs())
        .with_logs(vec![LogEntry::new(Utc::now(), LogLevel::Error, "Error: boom").for_process("worker")]);
    let service = ErrorAnalysisService::new(None);

    let analysis = service.diagnose_process(&pm, Some("api"), 100).await.unwrap();
    assert_eq!(analysis.error_count, 3);

    let clean = service.diagnose_process(&pm, Some("nobody"), 100).await.unwrap();
    assert!(!clean.has_errors);
    assert!(clean.diagnosis.is_none());

    let failing = FakeProcessManager::new().failing_on("error_logs");
    assert!(service.diagnose_process(&failing, None, 10).await.is_err());
}
