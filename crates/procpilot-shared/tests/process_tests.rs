//! Tests for process records and diagnosis enums.

use procpilot_shared::diagnosis::{ErrorCategory, ErrorSeverity};
use procpilot_shared::execution::{ExecuteOptions, ExecutionResult};
use procpilot_shared::process::{LogLevel, ProcessInfo, ProcessStatus};

#[test]
fn test_process_status_parse() {
    assert_eq!(ProcessStatus::parse("online"), ProcessStatus::Online);
    assert_eq!(ProcessStatus::parse("ERRORED"), ProcessStatus::Errored);
    assert_eq!(
        ProcessStatus::parse("one-launch-status"),
        ProcessStatus::OneLaunchStatus
    );
    assert_eq!(ProcessStatus::parse("sleeping"), ProcessStatus::Unknown);
}

#[test]
fn test_process_status_groups() {
    assert!(ProcessStatus::Online.is_online());
    assert!(!ProcessStatus::Stopped.is_online());
    assert!(ProcessStatus::Stopped.is_down());
    assert!(ProcessStatus::Errored.is_down());
    assert!(!ProcessStatus::Online.is_down());
}

#[test]
fn test_memory_mb_rounding() {
    let mut info = ProcessInfo::new("api", 0, ProcessStatus::Online);
    info.memory = 52_428_800; // 50 MiB
    assert_eq!(info.memory_mb(), 50.0);
    info.memory = 1_572_864; // 1.5 MiB
    assert_eq!(info.memory_mb(), 1.5);
}

#[test]
fn test_log_level_ordering() {
    assert!(LogLevel::Error > LogLevel::Warn);
    assert!(LogLevel::Warn.is_warning_or_worse());
    assert!(!LogLevel::Info.is_warning_or_worse());
}

#[test]
fn test_severity_order_and_parse() {
    assert!(ErrorSeverity::Critical > ErrorSeverity::High);
    assert!(ErrorSeverity::Medium > ErrorSeverity::Low);
    assert_eq!(ErrorSeverity::parse("HIGH"), Some(ErrorSeverity::High));
    assert_eq!(ErrorSeverity::parse("severe"), None);
    assert_eq!(ErrorCategory::Permission.as_str(), "permission");
}

#[test]
fn test_execution_result_confirmation_has_no_success() {
    let result = ExecutionResult::needs_confirmation("Stop all processes?");
    assert!(!result.success);
    assert!(result.requires_confirmation);
    assert_eq!(result.confirmation_prompt.as_deref(), Some("Stop all processes?"));

    assert!(!ExecuteOptions::default().may_proceed());
    assert!(ExecuteOptions::confirmed().may_proceed());
}
