//! Session - one user's conversation with the engine
//!
//! Turns a line of input into a [`Reply`]: confirmations of pending
//! actions, slash commands, and free text routed through the analyser.
//! The REPL and the one-shot subcommands both drive this type.

use procpilot_common::config::PilotConfig;
use procpilot_common::conversation::parse_selection;
use procpilot_common::executor::format_status;
use procpilot_common::{
    AiInputRouter, AiProvider, CommandExecutor, ConversationManager, ConversationStats,
    ErrorAnalysisService, PatternMatcher, ProcessManager,
};
use procpilot_shared::error::Result;
use procpilot_shared::{
    Action, ActionTarget, ActionType, EntityType, ExecuteOptions, ExecutionResult, InputAnalysis,
    Intent, LogAnalysis, PendingAction, SafetyLevel, TurnResult,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Entries shown by `/history`
const HISTORY_SHOWN: usize = 20;

const CANCEL_WORDS: &[&str] = &["cancel", "no", "n", "nevermind", "never mind", "abort"];

/// What the session produced for one line of input
#[derive(Debug, Clone)]
pub enum Reply {
    /// Nothing to show (blank line)
    Silent,
    Message(String),
    Executed(Vec<ExecutionResult>),
    /// Actions waiting for a numbered reply
    Confirm(Vec<PendingAction>),
    Answer {
        text: String,
        suggestions: Vec<PendingAction>,
    },
    Analysis(LogAnalysis),
    History(Vec<String>),
    Stats(ConversationStats),
    Help,
    Exit,
}

pub struct Session {
    patterns: Arc<PatternMatcher>,
    router: AiInputRouter,
    executor: CommandExecutor,
    errors: ErrorAnalysisService,
    conversation: ConversationManager,
    ai: Option<Arc<dyn AiProvider>>,
    log_lines: usize,
}

impl Session {
    pub fn new(
        pm: Arc<dyn ProcessManager>,
        ai: Option<Arc<dyn AiProvider>>,
        config: &PilotConfig,
    ) -> Self {
        let patterns = Arc::new(PatternMatcher::new());
        let assistant = &config.assistant;
        Self {
            router: AiInputRouter::new(patterns.clone(), ai.clone())
                .with_ai_detection(assistant.ai_action_detection),
            executor: CommandExecutor::new(pm).with_log_lines(assistant.log_lines),
            errors: ErrorAnalysisService::new(ai.clone()),
            conversation: ConversationManager::with_limits(
                assistant.history_limit,
                assistant.transcript_turns,
            ),
            log_lines: assistant.log_lines,
            patterns,
            ai,
        }
    }

    pub fn conversation(&self) -> &ConversationManager {
        &self.conversation
    }

    pub fn has_ai(&self) -> bool {
        self.ai.as_ref().is_some_and(|ai| ai.is_configured())
    }

    /// Teach the conversation which names are real processes
    pub async fn refresh_known_processes(&mut self) {
        match self.executor.process_manager().list().await {
            Ok(processes) => self
                .conversation
                .set_known_processes(processes.into_iter().map(|p| p.name)),
            Err(e) => debug!("Could not list processes: {}", e),
        }
    }

    /// Interactive turn
    pub async fn handle(&mut self, line: &str) -> Reply {
        let input = line.trim();
        if input.is_empty() {
            return Reply::Silent;
        }

        if self.conversation.has_pending_actions() {
            if let Some(reply) = self.handle_pending(input).await {
                return reply;
            }
        }

        if input.starts_with('/') {
            return self.handle_slash(input, ExecuteOptions::default()).await;
        }
        self.handle_text(input, ExecuteOptions::default()).await
    }

    /// One-shot request; `yes` pre-confirms risky actions
    pub async fn ask(&mut self, text: &str, yes: bool) -> Reply {
        let options = ExecuteOptions {
            confirmed: false,
            skip_confirmation: yes,
        };
        let input = text.trim();
        if input.starts_with('/') {
            self.handle_slash(input, options).await
        } else {
            self.handle_text(input, options).await
        }
    }

    /// Analysis only, nothing is executed
    pub async fn analyze(&self, text: &str) -> InputAnalysis {
        self.router.analyze(text).await
    }

    pub async fn diagnose(&self, process: Option<&str>, lines: usize) -> Result<LogAnalysis> {
        self.errors
            .diagnose_process(self.executor.process_manager().as_ref(), process, lines)
            .await
    }

    pub async fn status(&self) -> ExecutionResult {
        self.executor
            .execute_action(&Action::new(ActionType::Status, None), ExecuteOptions::default())
            .await
    }

    // ========================================================================
    // Pending confirmations
    // ========================================================================

    /// Numbers and cancel words answer the pending set; anything else is
    /// a new request and leaves the set alone.
    async fn handle_pending(&mut self, input: &str) -> Option<Reply> {
        if CANCEL_WORDS.contains(&input.to_lowercase().as_str()) {
            self.conversation.clear_pending_actions();
            return Some(Reply::Message("Cancelled.".to_string()));
        }

        let number = parse_selection(input)?;
        let Some(pending) = self.conversation.take_action_by_number(number) else {
            return Some(Reply::Message(format!(
                "No pending action {}. Reply 1-{} or 'cancel'.",
                number,
                self.conversation.pending_actions().len()
            )));
        };

        let result = self
            .executor
            .execute_action(&pending.action, ExecuteOptions::confirmed())
            .await;
        let results = vec![result];
        self.record(pending.command.clone(), pending.analysis, &results);
        if !pending.action.action_type.is_read_only() {
            self.refresh_known_processes().await;
        }
        Some(Reply::Executed(results))
    }

    // ========================================================================
    // Slash commands
    // ========================================================================

    async fn handle_slash(&mut self, input: &str, options: ExecuteOptions) -> Reply {
        let mut parts = input.trim_start_matches('/').split_whitespace();
        let verb = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next().map(str::to_string);

        match verb.as_str() {
            "exit" | "quit" | "q" => Reply::Exit,
            "help" | "?" => Reply::Help,
            "history" => {
                let skip = self.conversation.len().saturating_sub(HISTORY_SHOWN);
                Reply::History(
                    self.conversation
                        .turns()
                        .skip(skip)
                        .map(|t| t.input.clone())
                        .collect(),
                )
            }
            "stats" => Reply::Stats(self.conversation.get_statistics()),
            "clear" => {
                self.conversation.clear_history();
                self.conversation.clear_pending_actions();
                Reply::Message("History cleared.".to_string())
            }
            "diagnose" | "errors" => self.run_diagnosis(input, arg.as_deref()).await,
            _ => match slash_action(&verb) {
                Some(action_type) => {
                    let action = Action::new(action_type, arg.map(ActionTarget::process));
                    let analysis = InputAnalysis {
                        requires_confirmation: action.safety != SafetyLevel::Safe,
                        suggested_actions: vec![action],
                        ..self.router.analyze(input).await
                    };
                    self.run_actions(input, analysis, options).await
                }
                None => Reply::Message(format!("Unknown command '/{}'. Type /help.", verb)),
            },
        }
    }

    async fn run_diagnosis(&mut self, input: &str, process: Option<&str>) -> Reply {
        let analysis = self.router.analyze(input).await;
        match self.diagnose(process, self.log_lines).await {
            Ok(report) => {
                let summary = report
                    .diagnosis
                    .as_ref()
                    .map(|d| d.summary.clone())
                    .unwrap_or_else(|| "No errors found".to_string());
                self.conversation
                    .add_turn(input, analysis, Some(TurnResult::ok(summary)));
                Reply::Analysis(report)
            }
            Err(e) => {
                let message = format!("Failed to read logs: {}", e);
                self.conversation
                    .add_turn(input, analysis, Some(TurnResult::failed(message.clone())));
                Reply::Message(message)
            }
        }
    }

    // ========================================================================
    // Free text
    // ========================================================================

    async fn handle_text(&mut self, input: &str, options: ExecuteOptions) -> Reply {
        let context = self.conversation.get_context();
        let resolved = self.conversation.resolve_pronouns(input, &context);
        if resolved != input {
            debug!("resolved '{}' as '{}'", input, resolved);
        }

        let analysis = self.router.analyze(&resolved).await;
        match analysis.intent {
            Intent::Command | Intent::DirectAction if analysis.has_actions() => {
                self.run_actions(input, analysis, options).await
            }
            Intent::Command => match analysis.processed_command.clone() {
                Some(command) if command.starts_with('/') => {
                    self.handle_slash(&command, options).await
                }
                _ => self.answer(input, analysis).await,
            },
            _ => self.answer(input, analysis).await,
        }
    }

    /// Execute, or park for confirmation when any action needs it
    async fn run_actions(
        &mut self,
        input: &str,
        analysis: InputAnalysis,
        options: ExecuteOptions,
    ) -> Reply {
        let actions = analysis.suggested_actions.clone();
        let needs_pause = actions.iter().any(CommandExecutor::needs_confirmation);

        if needs_pause && !options.may_proceed() {
            self.conversation.set_pending_actions(&analysis);
            let pending = self.conversation.pending_actions().to_vec();
            self.conversation.add_turn(input, analysis, None);
            return Reply::Confirm(pending);
        }

        let results = self.executor.execute_multiple_actions(&actions, options).await;
        self.record(input.to_string(), analysis, &results);
        if actions.iter().any(|a| !a.action_type.is_read_only()) {
            self.refresh_known_processes().await;
        }
        Reply::Executed(results)
    }

    async fn answer(&mut self, input: &str, analysis: InputAnalysis) -> Reply {
        let Some(ai) = self.ai.clone().filter(|ai| ai.is_configured()) else {
            return self.answer_without_ai(input, analysis).await;
        };

        let processes = match self.executor.process_manager().list().await {
            Ok(processes) => format_status(&processes),
            Err(e) => format!("(process list unavailable: {})", e),
        };
        let history = self.conversation.get_messages_for_ai();

        match ai
            .query_with_history(&answer_prompt(input, &processes), &history)
            .await
        {
            Ok(text) => {
                let text = text.trim().to_string();
                let suggestions = self.offer(&analysis);
                self.conversation
                    .add_turn(input, analysis, Some(TurnResult::ok(text.clone())));
                Reply::Answer { text, suggestions }
            }
            Err(e) => {
                warn!("AI answer failed: {}", e);
                self.answer_without_ai(input, analysis).await
            }
        }
    }

    /// Heuristic help: offer the detected actions, or run the read-only
    /// command the question is about.
    async fn answer_without_ai(&mut self, input: &str, analysis: InputAnalysis) -> Reply {
        if analysis.has_actions() {
            let suggestions = self.offer(&analysis);
            self.conversation.add_turn(input, analysis, None);
            return Reply::Answer {
                text: "I can run one of these for you:".to_string(),
                suggestions,
            };
        }

        let target = self.known_target(&analysis).await;
        if self.patterns.test_pattern("error_question", input) {
            return self.run_diagnosis(input, target.as_deref()).await;
        }
        if self.patterns.test_pattern("performance_question", input) {
            let metrics = Action::new(ActionType::Metrics, target.map(ActionTarget::Process));
            let analysis = InputAnalysis {
                suggested_actions: vec![metrics],
                ..analysis
            };
            return self.run_actions(input, analysis, ExecuteOptions::default()).await;
        }

        let message = if self.has_ai() {
            "I couldn't get an answer right now. Try /help for commands.".to_string()
        } else {
            "No AI backend is configured, so I can only run commands. Try /help.".to_string()
        };
        self.conversation
            .add_turn(input, analysis, Some(TurnResult::failed(message.clone())));
        Reply::Message(message)
    }

    /// Park the analysis' actions as numbered suggestions
    fn offer(&mut self, analysis: &InputAnalysis) -> Vec<PendingAction> {
        if !analysis.has_actions() {
            return Vec::new();
        }
        self.conversation.set_pending_actions(analysis);
        self.conversation.pending_actions().to_vec()
    }

    /// First process entity that names a real process
    async fn known_target(&self, analysis: &InputAnalysis) -> Option<String> {
        for entity in analysis.entities_of(EntityType::Process) {
            if let Ok(Some(info)) = self.executor.process_manager().describe(&entity.value).await {
                return Some(info.name);
            }
        }
        None
    }

    fn record(&mut self, input: String, analysis: InputAnalysis, results: &[ExecutionResult]) {
        let message = results
            .iter()
            .map(|r| r.message.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let result = if results.iter().all(|r| r.success) {
            TurnResult::ok(message)
        } else {
            TurnResult::failed(message)
        };
        self.conversation.add_turn(input, analysis, Some(result));
    }
}

/// Slash verbs and their aliases
fn slash_action(verb: &str) -> Option<ActionType> {
    match verb {
        "list" | "ls" | "ps" => Some(ActionType::Status),
        "monit" => Some(ActionType::Metrics),
        "describe" => Some(ActionType::Info),
        other => ActionType::parse(other),
    }
}

fn answer_prompt(question: &str, processes: &str) -> String {
    format!(
        "You are procpilot, an assistant for Node.js applications managed by PM2.\n\
         Answer briefly and concretely. When an operation would help, suggest the \
         slash command for it (/restart <name>, /logs <name>, /diagnose <name>, /metrics).\n\n\
         CURRENT PROCESSES:\n{}\n\nQUESTION: {}",
        processes, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_aliases() {
        assert_eq!(slash_action("ls"), Some(ActionType::Status));
        assert_eq!(slash_action("restart"), Some(ActionType::Restart));
        assert_eq!(slash_action("describe"), Some(ActionType::Info));
        assert_eq!(slash_action("deploy"), None);
    }

    #[test]
    fn test_answer_prompt_carries_context() {
        let prompt = answer_prompt("why is api slow?", "api  online");
        assert!(prompt.contains("QUESTION: why is api slow?"));
        assert!(prompt.contains("api  online"));
    }
}
