//! Display helpers for procpilotctl
//!
//! Everything is rendered to a `String` first so the output can be tested;
//! colour is decided once per run.

use crate::session::Reply;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use procpilot_common::config::ColorMode;
use procpilot_common::ConversationStats;
use procpilot_shared::{ErrorSeverity, ExecutionResult, LogAnalysis, PendingAction, SafetyLevel};
use std::time::Duration;

pub const HELP: &str = "\
Talk to me in plain language (\"restart api\", \"why is worker crashing?\")
or use a command:

  /status [name]           process table, or one process
  /restart <name|all>      restart a process
  /stop <name|all>         stop a process
  /start <name|all>        start a process
  /logs [name]             recent log lines
  /metrics [name]          CPU and memory
  /info <name>             process details
  /diagnose [name]         analyse recent errors
  /history                 what you asked so far
  /stats                   session statistics
  /clear                   forget the conversation
  /help                    this help
  /exit                    leave

When I ask for confirmation, reply with the number, or 'cancel'.";

#[derive(Debug, Clone, Copy)]
pub struct Display {
    color: bool,
}

impl Display {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Resolve the configured mode against the terminal and NO_COLOR
    pub fn from_mode(mode: ColorMode) -> Self {
        let color = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => {
                std::env::var_os("NO_COLOR").is_none() && console::Term::stdout().is_term()
            }
        };
        Self { color }
    }

    pub fn use_color(&self) -> bool {
        self.color
    }

    pub fn render(&self, reply: &Reply) -> Option<String> {
        let text = match reply {
            Reply::Silent | Reply::Exit => return None,
            Reply::Message(message) => message.clone(),
            Reply::Executed(results) => results
                .iter()
                .map(|r| self.result(r))
                .collect::<Vec<_>>()
                .join("\n"),
            Reply::Confirm(pending) => self.confirm(pending),
            Reply::Answer { text, suggestions } => {
                if suggestions.is_empty() {
                    text.clone()
                } else {
                    format!("{}\n\n{}", text, self.options(suggestions))
                }
            }
            Reply::Analysis(analysis) => self.analysis(analysis),
            Reply::History(inputs) if inputs.is_empty() => "No history yet.".to_string(),
            Reply::History(inputs) => inputs
                .iter()
                .enumerate()
                .map(|(i, input)| format!("{:>3}  {}", i + 1, input))
                .collect::<Vec<_>>()
                .join("\n"),
            Reply::Stats(stats) => self.stats(stats),
            Reply::Help => HELP.to_string(),
        };
        Some(text)
    }

    pub fn result(&self, result: &ExecutionResult) -> String {
        if result.requires_confirmation {
            return self.warn(&result.message);
        }
        if result.success {
            result.message.clone()
        } else {
            self.error(&result.message)
        }
    }

    fn confirm(&self, pending: &[PendingAction]) -> String {
        let header = if pending.len() == 1 {
            "This needs confirmation:"
        } else {
            "These need confirmation, pick one:"
        };
        format!(
            "{}\n{}\nReply with the number to run it, or 'cancel'.",
            self.warn(header),
            self.options(pending)
        )
    }

    fn options(&self, pending: &[PendingAction]) -> String {
        pending
            .iter()
            .map(|p| {
                format!(
                    "  {}. {}  {}  [{}]",
                    p.id,
                    p.label,
                    self.dim(&p.command),
                    self.safety(p.safety)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn analysis(&self, analysis: &LogAnalysis) -> String {
        if !analysis.has_errors {
            return self.ok("No errors found in recent logs.");
        }

        let mut out = vec![format!(
            "{} error{} found",
            analysis.error_count,
            if analysis.error_count == 1 { "" } else { "s" }
        )];
        for error in analysis.parsed_errors.iter().take(5) {
            out.push(format!(
                "  {} {} {}  {}",
                error.timestamp.format("%H:%M:%S"),
                self.severity(error.severity),
                error.error_type,
                self.dim(&error.context)
            ));
        }

        if let Some(d) = &analysis.diagnosis {
            out.push(String::new());
            out.push(format!("{} {}", self.bold("Summary:"), d.summary));
            out.push(format!("{} {}", self.bold("Root cause:"), d.root_cause));
            if !d.actionable_suggestions.is_empty() {
                out.push(self.bold("Suggestions:"));
                out.extend(d.actionable_suggestions.iter().map(|s| format!("  - {}", s)));
            }
            if !d.follow_up_commands.is_empty() {
                out.push(self.bold("Try:"));
                out.extend(d.follow_up_commands.iter().map(|c| format!("  {}", c)));
            }
            out.push(self.dim(&format!("confidence {:.0}%", d.confidence * 100.0)));
        }
        if let Some(fix) = &analysis.quick_fix {
            out.push(format!("{} {}", self.bold("Quick fix:"), fix));
        }
        out.join("\n")
    }

    fn stats(&self, stats: &ConversationStats) -> String {
        format!(
            "Turns: {}\nWith results: {} ({}% successful)\nLast 10 minutes: {}",
            stats.total_turns, stats.turns_with_results, stats.success_rate, stats.recent_activity
        )
    }

    /// Spinner shown while the engine waits on the model
    pub fn spinner(&self, message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        let style = if self.color {
            ProgressStyle::default_spinner()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "])
                .template("{spinner:.cyan} {msg}")
        } else {
            ProgressStyle::default_spinner()
                .tick_strings(&["|", "/", "-", "\\", " "])
                .template("{spinner} {msg}")
        };
        if let Ok(style) = style {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    pub fn prompt(&self) -> String {
        if self.color {
            format!("{} ", "procpilot>".bright_cyan())
        } else {
            "procpilot> ".to_string()
        }
    }

    // ========================================================================
    // Styling
    // ========================================================================

    fn safety(&self, level: SafetyLevel) -> String {
        if !self.color {
            return level.to_string();
        }
        match level {
            SafetyLevel::Safe => level.green().to_string(),
            SafetyLevel::Caution => level.yellow().to_string(),
            SafetyLevel::Dangerous => level.red().bold().to_string(),
        }
    }

    fn severity(&self, severity: ErrorSeverity) -> String {
        let label = format!("{:<8}", severity.as_str().to_uppercase());
        if !self.color {
            return label;
        }
        match severity {
            ErrorSeverity::Low => label.dimmed().to_string(),
            ErrorSeverity::Medium => label.yellow().to_string(),
            ErrorSeverity::High => label.red().to_string(),
            ErrorSeverity::Critical => label.bright_red().bold().to_string(),
        }
    }

    fn ok(&self, text: &str) -> String {
        if self.color { text.green().to_string() } else { text.to_string() }
    }

    fn warn(&self, text: &str) -> String {
        if self.color { text.yellow().to_string() } else { text.to_string() }
    }

    fn error(&self, text: &str) -> String {
        if self.color { text.red().to_string() } else { text.to_string() }
    }

    fn bold(&self, text: &str) -> String {
        if self.color { text.bold().to_string() } else { text.to_string() }
    }

    fn dim(&self, text: &str) -> String {
        if self.color { text.dimmed().to_string() } else { text.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procpilot_shared::{Action, ActionType, InputAnalysis};

    #[test]
    fn test_plain_confirmation_lists_numbers() {
        let action = Action::batch(ActionType::Stop);
        let pending = vec![PendingAction::new(1, action, InputAnalysis::empty("stop all"))];
        let text = Display::new(false).render(&Reply::Confirm(pending)).unwrap();
        assert!(text.contains("  1. "));
        assert!(text.contains("/stop all"));
        assert!(text.contains("[dangerous]"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_failed_result_is_plain_without_color() {
        let display = Display::new(false);
        let result = ExecutionResult::failed("Process 'x' not found");
        assert_eq!(display.result(&result), "Process 'x' not found");
    }

    #[test]
    fn test_silent_and_exit_render_nothing() {
        let display = Display::new(true);
        assert!(display.render(&Reply::Silent).is_none());
        assert!(display.render(&Reply::Exit).is_none());
        assert_eq!(display.render(&Reply::History(vec![])).as_deref(), Some("No history yet."));
    }

    #[test]
    fn test_clean_analysis() {
        let text = Display::new(false).analysis(&LogAnalysis::clean());
        assert_eq!(text, "No errors found in recent logs.");
    }
}
