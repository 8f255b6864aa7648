//! Log entries → structured error records

use super::signatures;
use procpilot_shared::{ErrorCategory, LogEntry, ParsedError};
use regex::Regex;
use std::sync::LazyLock;

/// Maximum raw-message length used as context
const CONTEXT_CHARS: usize = 100;

static QUOTED_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"`]((?:/|\./|\.\./|~/|[A-Za-z]:\\)[^'"`\s]+)['"`]"#).unwrap()
});

static FILE_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"file://(/[^\s'"`)]+)"#).unwrap());

/// `path:line` or `path:line:col`, as in stack frames
static LINE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":\d+(?::\d+)?$").unwrap());

static FRAME_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[/\\][\w.\-/\\]*\.[A-Za-z][A-Za-z0-9]*:(\d+)(?::\d+)?").unwrap()
});

static IMPORTED_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:imported from|require stack:\s*-)\s*(\S+)").unwrap()
});

static FRAME_FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^at\s+(?:async\s+)?([^\s(]+)\s+\(").unwrap());

/// Error-bearing entries become ParsedErrors, newest first.
///
/// Stack-frame entries (`at ...`) right after an error are folded into
/// that error's stack trace and are not errors on their own.
pub fn parse_entries(logs: &[LogEntry]) -> Vec<ParsedError> {
    let mut errors: Vec<ParsedError> = Vec::new();
    let mut previous_was_error = false;

    for entry in logs {
        let first_line = entry.message.trim();
        if is_stack_frame(first_line) {
            if previous_was_error {
                if let Some(last) = errors.last_mut() {
                    append_frames(last, &entry.message);
                }
            }
            continue;
        }

        if !is_error_bearing(entry) {
            previous_was_error = false;
            continue;
        }

        errors.push(parse_entry(entry));
        previous_was_error = true;
    }

    // Ties keep the later log line first
    errors.reverse();
    errors.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    errors
}

pub fn is_error_bearing(entry: &LogEntry) -> bool {
    entry.level.is_warning_or_worse() || signatures::is_error_text(&entry.message)
}

pub fn parse_entry(entry: &LogEntry) -> ParsedError {
    let (message, frames) = split_message(&entry.message);
    let (error_type, severity, category) = signatures::classify(&message);

    let stack_trace = if frames.is_empty() {
        None
    } else {
        Some(frames.join("\n"))
    };

    let line_number = extract_line_number(&message)
        .or_else(|| stack_trace.as_deref().and_then(extract_line_number));

    let context = extract_context(&entry.message, &message, category, stack_trace.as_deref());

    ParsedError {
        error_type,
        file_path: extract_file_path(&message),
        line_number,
        stack_trace,
        context,
        timestamp: entry.timestamp,
        process: entry.process.clone(),
        message,
        severity,
        category,
    }
}

/// Quoted paths and `file://` URIs only. A candidate carrying a
/// `:line[:col]` suffix is a stack-frame location, not a file path.
pub fn extract_file_path(message: &str) -> Option<String> {
    let quoted = QUOTED_PATH
        .captures_iter(message)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str());
    let uris = FILE_URI
        .captures_iter(message)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str());

    quoted
        .chain(uris)
        .find(|candidate| !LINE_SUFFIX.is_match(candidate))
        .map(str::to_string)
}

/// Line of the first `path:line[:col]` location
pub fn extract_line_number(text: &str) -> Option<u32> {
    FRAME_LOCATION
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn is_stack_frame(line: &str) -> bool {
    line.starts_with("at ")
}

/// First non-frame line(s) as the message, `at` lines as frames
fn split_message(raw: &str) -> (String, Vec<String>) {
    let mut message_lines = Vec::new();
    let mut frames = Vec::new();
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_stack_frame(line) {
            frames.push(line.to_string());
        } else if frames.is_empty() {
            message_lines.push(line);
        }
    }
    (message_lines.join(" "), frames)
}

fn append_frames(error: &mut ParsedError, raw: &str) {
    let frames: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|l| is_stack_frame(l))
        .collect();
    if frames.is_empty() {
        return;
    }
    let joined = frames.join("\n");
    error.stack_trace = Some(match error.stack_trace.take() {
        Some(existing) => format!("{}\n{}", existing, joined),
        None => joined,
    });
    if error.line_number.is_none() {
        error.line_number = error.stack_trace.as_deref().and_then(extract_line_number);
    }
    if let Some(function) = error.stack_trace.as_deref().and_then(first_frame_function) {
        if error.category != ErrorCategory::Module {
            error.context = format!("in {}", function);
        }
    }
}

fn first_frame_function(stack: &str) -> Option<String> {
    let first = stack.lines().next()?;
    FRAME_FUNCTION
        .captures(first)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn extract_context(
    raw: &str,
    message: &str,
    category: ErrorCategory,
    stack: Option<&str>,
) -> String {
    if category == ErrorCategory::Module {
        if let Some(importer) = IMPORTED_FROM.captures(raw).and_then(|c| c.get(1)) {
            return format!("imported from {}", importer.as_str());
        }
    }
    if let Some(function) = stack.and_then(first_frame_function) {
        return format!("in {}", function);
    }
    truncate(message, CONTEXT_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use procpilot_shared::{ErrorSeverity, LogLevel};

    fn entry(secs: i64, level: LogLevel, message: &str) -> LogEntry {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs);
        LogEntry::new(ts, level, message)
    }

    #[test]
    fn test_module_not_found_record() {
        let parsed = parse_entry(&entry(
            0,
            LogLevel::Error,
            "Error [ERR_MODULE_NOT_FOUND]: Cannot find module '/app/x.js' imported from /app/index.js",
        ));
        assert_eq!(parsed.error_type, "Module Not Found");
        assert_eq!(parsed.severity, ErrorSeverity::Critical);
        assert_eq!(parsed.category, ErrorCategory::Module);
        assert_eq!(parsed.file_path.as_deref(), Some("/app/x.js"));
        assert_eq!(parsed.context, "imported from /app/index.js");
    }

    #[test]
    fn test_file_uri_is_stripped() {
        assert_eq!(
            extract_file_path("Error loading file:///srv/app/config.mjs failed").as_deref(),
            Some("/srv/app/config.mjs")
        );
    }

    #[test]
    fn test_stack_frame_location_is_not_a_file_path() {
        let message = "TypeError: x is not a function at /app/src/server.js:42:13";
        assert_eq!(extract_file_path(message), None);
        assert_eq!(extract_line_number(message), Some(42));

        assert_eq!(extract_file_path("failed to open '/app/src/server.js:42:13'"), None);
        assert_eq!(extract_file_path("uri file:///app/a.js:3:1"), None);
    }

    #[test]
    fn test_inline_stack_trace() {
        let parsed = parse_entry(&entry(
            0,
            LogLevel::Error,
            "TypeError: Cannot read properties of undefined (reading 'id')\n    at handleRequest (/app/src/routes.js:17:25)\n    at Layer.handle (/app/node_modules/express/lib/router/layer.js:95:5)",
        ));
        assert_eq!(parsed.message, "TypeError: Cannot read properties of undefined (reading 'id')");
        assert_eq!(parsed.line_number, Some(17));
        assert_eq!(parsed.context, "in handleRequest");
        assert_eq!(parsed.stack_trace.as_deref().map(|s| s.lines().count()), Some(2));
        assert_eq!(parsed.file_path, None);
    }

    #[test]
    fn test_context_truncation() {
        let long = format!("Error: {}", "x".repeat(150));
        let parsed = parse_entry(&entry(0, LogLevel::Error, &long));
        assert_eq!(parsed.context.chars().count(), CONTEXT_CHARS + 3);
        assert!(parsed.context.ends_with("..."));
    }

    #[test]
    fn test_frames_fold_into_previous_error() {
        let logs = vec![
            entry(0, LogLevel::Info, "server listening on 3000"),
            entry(1, LogLevel::Error, "ReferenceError: user is not defined"),
            entry(1, LogLevel::Error, "    at loadUser (/app/src/users.js:8:3)"),
            entry(1, LogLevel::Error, "    at processTicksAndRejections (node:internal/process/task_queues:95:5)"),
            entry(2, LogLevel::Info, "request served"),
            entry(3, LogLevel::Error, "    at orphan (/app/x.js:1:1)"),
        ];
        let errors = parse_entries(&logs);
        assert_eq!(errors.len(), 1);
        let error = &errors[0];
        assert_eq!(error.error_type, "Reference Error");
        assert_eq!(error.stack_trace.as_deref().map(|s| s.lines().count()), Some(2));
        assert_eq!(error.line_number, Some(8));
        assert_eq!(error.context, "in loadUser");
    }

    #[test]
    fn test_newest_first_and_warn_level_detection() {
        let logs = vec![
            entry(10, LogLevel::Error, "Error: connect ECONNREFUSED 127.0.0.1:5432"),
            entry(30, LogLevel::Warn, "deprecated option used"),
            entry(20, LogLevel::Info, "job failed after 3 attempts"),
            entry(40, LogLevel::Info, "all good"),
        ];
        let errors = parse_entries(&logs);
        let types: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "deprecated option used",
                "job failed after 3 attempts",
                "Error: connect ECONNREFUSED 127.0.0.1:5432"
            ]
        );
    }

    #[test]
    fn test_classification_is_order_independent() {
        let a = entry(0, LogLevel::Error, "Error: EACCES: permission denied, open '/var/log/app.log'");
        let b = entry(1, LogLevel::Error, "SyntaxError: Unexpected token '}'");
        let forward = parse_entries(&[a.clone(), b.clone()]);
        let backward = parse_entries(&[b, a]);
        for error in &forward {
            let twin = backward.iter().find(|e| e.message == error.message).unwrap();
            assert_eq!(twin.severity, error.severity);
            assert_eq!(twin.category, error.category);
        }
        let permission = forward.iter().find(|e| e.category == ErrorCategory::Permission).unwrap();
        assert_eq!(permission.file_path.as_deref(), Some("/var/log/app.log"));
    }
}
