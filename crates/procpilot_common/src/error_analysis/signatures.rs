//! Error signature table
//!
//! Ordered (needles → type, severity, category) rows, evaluated top to
//! bottom against the lowercased message. Earlier rows win, so specific
//! signatures sit above generic ones.

use procpilot_shared::{ErrorCategory, ErrorSeverity};
use regex::Regex;
use std::sync::LazyLock;

pub struct ErrorSignature {
    pub needles: &'static [&'static str],
    pub error_type: &'static str,
    pub severity: ErrorSeverity,
    pub category: ErrorCategory,
}

impl ErrorSignature {
    pub fn matches(&self, lower_message: &str) -> bool {
        self.needles.iter().any(|n| lower_message.contains(n))
    }
}

pub static SIGNATURES: &[ErrorSignature] = &[
    ErrorSignature {
        needles: &["err_module_not_found", "cannot find module", "module not found", "module_not_found"],
        error_type: "Module Not Found",
        severity: ErrorSeverity::Critical,
        category: ErrorCategory::Module,
    },
    ErrorSignature {
        needles: &["syntaxerror", "unexpected token", "unexpected end of input"],
        error_type: "Syntax Error",
        severity: ErrorSeverity::Critical,
        category: ErrorCategory::Syntax,
    },
    ErrorSignature {
        needles: &["heap out of memory", "enomem", "out of memory"],
        error_type: "Out Of Memory",
        severity: ErrorSeverity::Critical,
        category: ErrorCategory::Resource,
    },
    ErrorSignature {
        needles: &["eaddrinuse", "address already in use"],
        error_type: "Port In Use",
        severity: ErrorSeverity::High,
        category: ErrorCategory::Network,
    },
    ErrorSignature {
        needles: &["econnrefused", "connection refused"],
        error_type: "Connection Refused",
        severity: ErrorSeverity::High,
        category: ErrorCategory::Network,
    },
    ErrorSignature {
        needles: &["eacces", "eperm", "permission denied"],
        error_type: "Permission Denied",
        severity: ErrorSeverity::High,
        category: ErrorCategory::Permission,
    },
    ErrorSignature {
        needles: &["typeerror"],
        error_type: "Type Error",
        severity: ErrorSeverity::High,
        category: ErrorCategory::Runtime,
    },
    ErrorSignature {
        needles: &["referenceerror"],
        error_type: "Reference Error",
        severity: ErrorSeverity::High,
        category: ErrorCategory::Runtime,
    },
    ErrorSignature {
        needles: &["etimedout", "timed out", "timeout"],
        error_type: "Timeout",
        severity: ErrorSeverity::Medium,
        category: ErrorCategory::Network,
    },
    ErrorSignature {
        needles: &["enotfound", "getaddrinfo"],
        error_type: "Host Not Found",
        severity: ErrorSeverity::Medium,
        category: ErrorCategory::Network,
    },
    ErrorSignature {
        needles: &["unhandledpromiserejection", "unhandled promise rejection"],
        error_type: "Unhandled Promise Rejection",
        severity: ErrorSeverity::Medium,
        category: ErrorCategory::Runtime,
    },
    ErrorSignature {
        needles: &["maxlistenersexceededwarning", "memory leak"],
        error_type: "Memory Leak Warning",
        severity: ErrorSeverity::Low,
        category: ErrorCategory::Resource,
    },
];

/// Words that make an otherwise unmatched line error-bearing
const GENERIC_ERROR_WORDS: &[&str] = &["error", "exception", "failed", "not found", "fatal"];

static ERROR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:Uncaught\s+)?([A-Za-z]+Error)\b").unwrap());

/// First matching row, if any
pub fn lookup(message: &str) -> Option<&'static ErrorSignature> {
    let lower = message.to_lowercase();
    SIGNATURES.iter().find(|s| s.matches(&lower))
}

/// Does the text carry a known signature or a generic error word?
pub fn is_error_text(message: &str) -> bool {
    let lower = message.to_lowercase();
    SIGNATURES.iter().any(|s| s.matches(&lower))
        || GENERIC_ERROR_WORDS.iter().any(|w| lower.contains(w))
}

/// Type, severity and category of a message. Depends on the text only.
pub fn classify(message: &str) -> (String, ErrorSeverity, ErrorCategory) {
    if let Some(sig) = lookup(message) {
        return (sig.error_type.to_string(), sig.severity, sig.category);
    }

    let lower = message.to_lowercase();
    let category = if GENERIC_ERROR_WORDS.iter().any(|w| lower.contains(w)) {
        ErrorCategory::Runtime
    } else {
        ErrorCategory::Other
    };
    let error_type = ERROR_TOKEN
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| capitalize(m.as_str()))
        .unwrap_or_else(|| "Runtime Error".to_string());

    (error_type, ErrorSeverity::Medium, category)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_not_found_wins_over_generic() {
        let (t, sev, cat) =
            classify("Error [ERR_MODULE_NOT_FOUND]: Cannot find module '/app/x.js'");
        assert_eq!(t, "Module Not Found");
        assert_eq!(sev, ErrorSeverity::Critical);
        assert_eq!(cat, ErrorCategory::Module);
    }

    #[test]
    fn test_signature_rows() {
        let cases = [
            ("Error: connect ECONNREFUSED 127.0.0.1:5432", "Connection Refused", ErrorSeverity::High, ErrorCategory::Network),
            ("Error: listen EADDRINUSE: address already in use :::3000", "Port In Use", ErrorSeverity::High, ErrorCategory::Network),
            ("Error: EACCES: permission denied, open '/var/log/app.log'", "Permission Denied", ErrorSeverity::High, ErrorCategory::Permission),
            ("TypeError: Cannot read properties of undefined (reading 'id')", "Type Error", ErrorSeverity::High, ErrorCategory::Runtime),
            ("ReferenceError: foo is not defined", "Reference Error", ErrorSeverity::High, ErrorCategory::Runtime),
            ("SyntaxError: Unexpected token '}'", "Syntax Error", ErrorSeverity::Critical, ErrorCategory::Syntax),
            ("Error: getaddrinfo ENOTFOUND db.internal", "Host Not Found", ErrorSeverity::Medium, ErrorCategory::Network),
            ("Error: connect ETIMEDOUT 10.0.0.5:443", "Timeout", ErrorSeverity::Medium, ErrorCategory::Network),
            ("(node:42) UnhandledPromiseRejectionWarning: Error: boom", "Unhandled Promise Rejection", ErrorSeverity::Medium, ErrorCategory::Runtime),
            ("FATAL ERROR: Reached heap limit Allocation failed - JavaScript heap out of memory", "Out Of Memory", ErrorSeverity::Critical, ErrorCategory::Resource),
            ("(node:42) MaxListenersExceededWarning: Possible EventEmitter memory leak detected", "Memory Leak Warning", ErrorSeverity::Low, ErrorCategory::Resource),
        ];
        for (message, error_type, severity, category) in cases {
            let (t, sev, cat) = classify(message);
            assert_eq!(t, error_type, "{}", message);
            assert_eq!(sev, severity, "{}", message);
            assert_eq!(cat, category, "{}", message);
        }
    }

    #[test]
    fn test_unmatched_uses_error_token() {
        let (t, sev, cat) = classify("RangeError: Maximum call stack size exceeded");
        assert_eq!(t, "RangeError");
        assert_eq!(sev, ErrorSeverity::Medium);
        assert_eq!(cat, ErrorCategory::Runtime);

        let (t, _, cat) = classify("job failed after 3 attempts");
        assert_eq!(t, "Runtime Error");
        assert_eq!(cat, ErrorCategory::Runtime);

        let (t, _, cat) = classify("deprecated option used");
        assert_eq!(t, "Runtime Error");
        assert_eq!(cat, ErrorCategory::Other);
    }

    #[test]
    fn test_error_text_detection() {
        assert!(is_error_text("Error: something"));
        assert!(is_error_text("request to upstream failed"));
        assert!(is_error_text("connect ECONNREFUSED"));
        assert!(!is_error_text("server listening on 3000"));
    }
}
