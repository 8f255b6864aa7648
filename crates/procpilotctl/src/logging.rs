//! Tracing setup for procpilotctl
//!
//! Filter from $PROCPILOT_LOG, then $RUST_LOG, else `warn`. `-v` raises the
//! default to `debug`. Output goes to stderr so REPL output stays clean.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PROCPILOT_LOG";

/// Filter directive in effect for the given environment
pub fn filter_directive(verbose: bool, lookup: impl Fn(&str) -> Option<String>) -> String {
    if let Some(directive) = lookup(LOG_ENV).or_else(|| lookup("RUST_LOG")) {
        if !directive.trim().is_empty() {
            return directive;
        }
    }
    if verbose { "debug" } else { "warn" }.to_string()
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
    let directive = filter_directive(verbose, |key| std::env::var(key).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_levels() {
        assert_eq!(filter_directive(false, |_| None), "warn");
        assert_eq!(filter_directive(true, |_| None), "debug");
    }

    #[test]
    fn test_env_precedence() {
        let lookup = |key: &str| match key {
            LOG_ENV => Some("procpilot_common=trace".to_string()),
            "RUST_LOG" => Some("info".to_string()),
            _ => None,
        };
        assert_eq!(filter_directive(true, lookup), "procpilot_common=trace");

        let rust_log_only = |key: &str| (key == "RUST_LOG").then(|| "info".to_string());
        assert_eq!(filter_directive(false, rust_log_only), "info");
    }
}
