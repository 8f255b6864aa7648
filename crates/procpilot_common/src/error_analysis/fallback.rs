//! Deterministic diagnoses, used whenever the AI path is unavailable

use procpilot_shared::{Diagnosis, ErrorCategory, ErrorSeverity, ParsedError};

/// Confidence reported for table-based diagnoses
pub const FALLBACK_CONFIDENCE: f32 = 0.6;

struct FallbackRow {
    root_cause: &'static str,
    suggestions: &'static [&'static str],
}

fn row(category: ErrorCategory) -> FallbackRow {
    match category {
        ErrorCategory::Module => FallbackRow {
            root_cause: "A required module or file could not be resolved at startup",
            suggestions: &[
                "Run npm install to restore missing dependencies",
                "Check that the imported path exists and its case matches",
                "Verify the process working directory (cwd) in the ecosystem file",
            ],
        },
        ErrorCategory::Network => FallbackRow {
            root_cause: "The process cannot reach a network service it depends on",
            suggestions: &[
                "Check that the target service is running and listening",
                "Verify host, port and credentials in the environment",
                "Look for another process already bound to the same port",
            ],
        },
        ErrorCategory::Permission => FallbackRow {
            root_cause: "The process user lacks permission on a file, directory or port",
            suggestions: &[
                "Check ownership and mode of the path in the error",
                "Run the process as a user with access, or adjust the permissions",
                "Ports below 1024 need elevated privileges",
            ],
        },
        ErrorCategory::Syntax => FallbackRow {
            root_cause: "The code failed to parse, usually after a bad edit or deploy",
            suggestions: &[
                "Open the reported file and line and fix the syntax",
                "Check that the Node.js version supports the syntax used",
                "Redeploy from a known-good build",
            ],
        },
        ErrorCategory::Resource => FallbackRow {
            root_cause: "The process is exhausting memory or another system resource",
            suggestions: &[
                "Raise the heap limit with --max-old-space-size or max_memory_restart",
                "Look for unbounded caches, listeners or buffers",
                "Watch memory over time with /metrics",
            ],
        },
        ErrorCategory::Runtime | ErrorCategory::Other => FallbackRow {
            root_cause: "The application threw an unhandled error at runtime",
            suggestions: &[
                "Inspect the stack trace to find the failing call",
                "Add error handling around the failing code path",
                "Restart the process once the cause is fixed",
            ],
        },
    }
}

/// Most severe error; the newest wins ties
pub fn primary_error(errors: &[ParsedError]) -> Option<&ParsedError> {
    errors.iter().fold(None, |best: Option<&ParsedError>, e| match best {
        Some(b) if b.severity > e.severity => Some(b),
        Some(b) if b.severity == e.severity && b.timestamp >= e.timestamp => Some(b),
        _ => Some(e),
    })
}

pub fn diagnosis(errors: &[ParsedError]) -> Option<Diagnosis> {
    let primary = primary_error(errors)?;
    let fallback = row(primary.category);
    let process = primary.process.as_deref().unwrap_or("<process>");

    let summary = format!(
        "{} error{} found. Most severe: {} ({})",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" },
        primary.error_type,
        primary.severity
    );

    let mut root_cause = format!("{}: {}", fallback.root_cause, primary.message);
    if let Some(path) = &primary.file_path {
        root_cause.push_str(&format!(" ({})", path));
    }

    let mut follow_up_commands = vec![format!("/logs {}", process)];
    match primary.category {
        ErrorCategory::Module => follow_up_commands.push("npm install".to_string()),
        ErrorCategory::Resource => follow_up_commands.push(format!("/metrics {}", process)),
        _ => {}
    }
    follow_up_commands.push(format!("/restart {}", process));

    Some(Diagnosis {
        summary,
        root_cause,
        actionable_suggestions: fallback.suggestions.iter().map(|s| s.to_string()).collect(),
        follow_up_commands,
        severity: primary.severity,
        confidence: FALLBACK_CONFIDENCE,
    })
}

/// One-line fix for the primary error
pub fn quick_fix(errors: &[ParsedError]) -> Option<String> {
    let primary = primary_error(errors)?;
    let fix = match primary.category {
        ErrorCategory::Module => match &primary.file_path {
            Some(path) => format!("Check if file exists: {}", path),
            None => "Run npm install to restore missing dependencies".to_string(),
        },
        ErrorCategory::Network if primary.error_type == "Port In Use" => {
            "Stop the process holding the port or change the PORT setting".to_string()
        }
        ErrorCategory::Network => "Make sure the service the process connects to is up".to_string(),
        ErrorCategory::Permission => match &primary.file_path {
            Some(path) => format!("Fix permissions on {}", path),
            None => "Run the process as a user with the required permissions".to_string(),
        },
        ErrorCategory::Syntax => match (&primary.file_path, primary.line_number) {
            (Some(path), Some(line)) => format!("Fix the syntax error at {}:{}", path, line),
            (None, Some(line)) => format!("Fix the syntax error near line {}", line),
            _ => "Fix the syntax error reported at startup".to_string(),
        },
        ErrorCategory::Resource if primary.severity >= ErrorSeverity::Critical => {
            "Increase the memory limit (--max-old-space-size) and look for leaks".to_string()
        }
        ErrorCategory::Resource => "Remove listeners that are added repeatedly".to_string(),
        ErrorCategory::Runtime | ErrorCategory::Other => {
            format!("Inspect the stack trace of the {}", primary.error_type)
        }
    };
    Some(fix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn error(error_type: &str, severity: ErrorSeverity, category: ErrorCategory, age_secs: i64) -> ParsedError {
        ParsedError {
            error_type: error_type.to_string(),
            message: format!("{} happened", error_type),
            severity,
            category,
            file_path: None,
            line_number: None,
            stack_trace: None,
            context: String::new(),
            timestamp: Utc::now() - Duration::seconds(age_secs),
            process: Some("api".to_string()),
        }
    }

    #[test]
    fn test_primary_is_most_severe_then_newest() {
        let errors = vec![
            error("Timeout", ErrorSeverity::Medium, ErrorCategory::Network, 1),
            error("Type Error", ErrorSeverity::High, ErrorCategory::Runtime, 50),
            error("Connection Refused", ErrorSeverity::High, ErrorCategory::Network, 10),
        ];
        assert_eq!(primary_error(&errors).unwrap().error_type, "Connection Refused");
        assert!(primary_error(&[]).is_none());
    }

    #[test]
    fn test_diagnosis_uses_category_row() {
        let errors = vec![error("Permission Denied", ErrorSeverity::High, ErrorCategory::Permission, 0)];
        let d = diagnosis(&errors).unwrap();
        assert_eq!(d.summary, "1 error found. Most severe: Permission Denied (high)");
        assert_eq!(d.severity, ErrorSeverity::High);
        assert_eq!(d.confidence, FALLBACK_CONFIDENCE);
        assert!(d.actionable_suggestions[0].contains("ownership"));
        assert_eq!(d.follow_up_commands, vec!["/logs api", "/restart api"]);
    }

    #[test]
    fn test_quick_fix_for_module_path() {
        let mut e = error("Module Not Found", ErrorSeverity::Critical, ErrorCategory::Module, 0);
        e.file_path = Some("/app/x.js".to_string());
        assert_eq!(quick_fix(&[e]).as_deref(), Some("Check if file exists: /app/x.js"));
    }

    #[test]
    fn test_every_category_has_a_row() {
        for category in [
            ErrorCategory::Module,
            ErrorCategory::Network,
            ErrorCategory::Permission,
            ErrorCategory::Syntax,
            ErrorCategory::Runtime,
            ErrorCategory::Resource,
            ErrorCategory::Other,
        ] {
            let errors = vec![error("X", ErrorSeverity::Low, category, 0)];
            assert!(diagnosis(&errors).is_some());
            assert!(quick_fix(&errors).is_some());
        }
    }
}
