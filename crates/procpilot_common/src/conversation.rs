//! Conversation Manager - turn history, derived context, pending actions
//!
//! Single-writer state owned by one session. Turns are append-only and
//! addressed by a monotonic sequence number; pending actions are addressed
//! by a 1-based number the user types to confirm.

use crate::llm::ChatMessage;
use chrono::{DateTime, Duration, Utc};
use procpilot_shared::{
    ConversationContext, ConversationTurn, EntityType, InputAnalysis, PendingAction, TurnResult,
};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;
use uuid::Uuid;

/// Default number of turns kept
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
/// Default number of information turns replayed to the AI
pub const DEFAULT_TRANSCRIPT_TURNS: usize = 5;
/// Length of `recent_processes` and `previous_commands`
pub const RECENT_WINDOW: usize = 5;
/// Window counted as recent activity
pub const RECENT_ACTIVITY_MINUTES: i64 = 10;

const PRONOUNS: &[&str] = &[
    "it", "them", "that", "this", "that one", "this one", "the same", "the same one",
];

/// Pronouns standing alone. Letters, digits, `_`, `-` and inner dots on
/// either side make the token part of a process name (`it-worker`).
static PRONOUN_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(^|[^\w.-])(?:(that one|this one|the same one|the same|it|them)($|[^\w.-]|\.(?:\s|$))|(that|this)(\s*[?.!]?\s*)$)",
    )
    .unwrap()
});

/// Usage summary of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStats {
    pub total_turns: usize,
    pub turns_with_results: usize,
    pub successful: usize,
    /// Percent of turns with results that succeeded
    pub success_rate: u32,
    /// Turns in the last ten minutes
    pub recent_activity: usize,
}

pub struct ConversationManager {
    session_id: Uuid,
    turns: VecDeque<ConversationTurn>,
    next_id: u64,
    history_limit: usize,
    transcript_turns: usize,
    pending: Vec<PendingAction>,
    known_processes: HashSet<String>,
}

impl ConversationManager {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_HISTORY_LIMIT, DEFAULT_TRANSCRIPT_TURNS)
    }

    pub fn with_limits(history_limit: usize, transcript_turns: usize) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            turns: VecDeque::new(),
            next_id: 1,
            history_limit: history_limit.max(1),
            transcript_turns,
            pending: Vec::new(),
            known_processes: HashSet::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    // ========================================================================
    // Turns
    // ========================================================================

    /// Record a turn; returns its sequence number
    pub fn add_turn(
        &mut self,
        input: impl Into<String>,
        analysis: InputAnalysis,
        result: Option<TurnResult>,
    ) -> u64 {
        self.add_turn_at(input, analysis, result, Utc::now())
    }

    pub fn add_turn_at(
        &mut self,
        input: impl Into<String>,
        analysis: InputAnalysis,
        result: Option<TurnResult>,
        timestamp: DateTime<Utc>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.turns.push_back(ConversationTurn {
            id,
            input: input.into(),
            analysis,
            result,
            timestamp,
        });
        while self.turns.len() > self.history_limit {
            self.turns.pop_front();
        }
        id
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear_history(&mut self) {
        self.turns.clear();
    }

    /// Names the user may refer to without them being action targets
    pub fn set_known_processes<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_processes = names.into_iter().map(Into::into).collect();
    }

    // ========================================================================
    // Context
    // ========================================================================

    pub fn get_context(&self) -> ConversationContext {
        let mut recent_processes: Vec<String> = Vec::new();
        for turn in self.turns.iter().rev() {
            for name in self.process_references(turn) {
                if !recent_processes.contains(&name) {
                    recent_processes.push(name);
                }
            }
            if recent_processes.len() >= RECENT_WINDOW {
                break;
            }
        }
        recent_processes.truncate(RECENT_WINDOW);

        let skip = self.turns.len().saturating_sub(RECENT_WINDOW);
        let previous_commands = self
            .turns
            .iter()
            .skip(skip)
            .map(|t| {
                t.analysis
                    .processed_command
                    .clone()
                    .unwrap_or_else(|| t.input.clone())
            })
            .collect();

        let last_response = self
            .turns
            .iter()
            .rev()
            .find_map(|t| t.result.as_ref().map(|r| r.message.clone()));

        ConversationContext {
            last_mentioned_process: recent_processes.first().cloned(),
            recent_processes,
            previous_commands,
            last_response,
        }
    }

    /// Concrete action targets, then entities naming a known process
    fn process_references(&self, turn: &ConversationTurn) -> Vec<String> {
        let mut names: Vec<String> = turn
            .analysis
            .suggested_actions
            .iter()
            .filter_map(|a| a.target_name().map(str::to_string))
            .collect();
        for entity in turn.analysis.entities_of(EntityType::Process) {
            if self.known_processes.contains(&entity.value) && !names.contains(&entity.value) {
                names.push(entity.value.clone());
            }
        }
        names
    }

    /// Map a pronoun to the last mentioned process
    pub fn resolve_pronoun(&self, word: &str, context: &ConversationContext) -> Option<String> {
        let word = word.trim().to_lowercase();
        if PRONOUNS.contains(&word.as_str()) {
            context.last_mentioned_process.clone()
        } else {
            None
        }
    }

    /// Rewrite pronouns in an input to the last mentioned process
    pub fn resolve_pronouns(&self, input: &str, context: &ConversationContext) -> String {
        let Some(name) = context.last_mentioned_process.as_deref() else {
            return input.to_string();
        };
        PRONOUN_TOKENS
            .replace_all(input, |caps: &Captures| {
                let lead = caps.get(1).map_or("", |m| m.as_str());
                let trail = caps
                    .get(3)
                    .or_else(|| caps.get(5))
                    .map_or("", |m| m.as_str());
                format!("{}{}{}", lead, name, trail)
            })
            .into_owned()
    }

    /// Transcript of recent information requests for the AI provider
    pub fn get_messages_for_ai(&self) -> Vec<ChatMessage> {
        let info_turns: Vec<&ConversationTurn> = self
            .turns
            .iter()
            .filter(|t| t.analysis.intent.is_information_request())
            .collect();
        let skip = info_turns.len().saturating_sub(self.transcript_turns);

        let mut messages = Vec::new();
        for turn in info_turns.into_iter().skip(skip) {
            messages.push(ChatMessage::user(turn.input.clone()));
            if let Some(result) = &turn.result {
                messages.push(ChatMessage::assistant(result.message.clone()));
            }
        }
        messages
    }

    pub fn get_statistics(&self) -> ConversationStats {
        self.statistics_at(Utc::now())
    }

    pub fn statistics_at(&self, now: DateTime<Utc>) -> ConversationStats {
        let with_results: Vec<&TurnResult> =
            self.turns.iter().filter_map(|t| t.result.as_ref()).collect();
        let successful = with_results.iter().filter(|r| r.success).count();
        let success_rate = if with_results.is_empty() {
            0
        } else {
            ((successful as f64 / with_results.len() as f64) * 100.0).round() as u32
        };
        let cutoff = now - Duration::minutes(RECENT_ACTIVITY_MINUTES);
        let recent_activity = self.turns.iter().filter(|t| t.timestamp >= cutoff).count();

        ConversationStats {
            total_turns: self.turns.len(),
            turns_with_results: with_results.len(),
            successful,
            success_rate,
            recent_activity,
        }
    }

    // ========================================================================
    // Pending actions
    // ========================================================================

    /// Replace the pending set with the suggested actions of an analysis
    pub fn set_pending_actions(&mut self, analysis: &InputAnalysis) {
        self.pending = analysis
            .suggested_actions
            .iter()
            .enumerate()
            .map(|(i, action)| PendingAction::new(i + 1, action.clone(), analysis.clone()))
            .collect();
    }

    pub fn pending_actions(&self) -> &[PendingAction] {
        &self.pending
    }

    pub fn has_pending_actions(&self) -> bool {
        !self.pending.is_empty()
    }

    /// A bare positive number while actions are pending
    pub fn is_numbered_selection(&self, text: &str) -> bool {
        self.has_pending_actions() && parse_selection(text).is_some()
    }

    pub fn get_action_by_number(&self, number: usize) -> Option<&PendingAction> {
        self.pending.iter().find(|p| p.id == number)
    }

    /// Take the selected action and clear the whole set.
    ///
    /// An out-of-range number leaves the set untouched.
    pub fn take_action_by_number(&mut self, number: usize) -> Option<PendingAction> {
        let index = self.pending.iter().position(|p| p.id == number)?;
        let selected = self.pending.swap_remove(index);
        self.pending.clear();
        Some(selected)
    }

    pub fn clear_pending_actions(&mut self) {
        self.pending.clear();
    }
}

impl Default for ConversationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a numbered reply ("2", " 1 ")
pub fn parse_selection(text: &str) -> Option<usize> {
    text.trim().parse::<usize>().ok().filter(|n| *n > 0)
}
