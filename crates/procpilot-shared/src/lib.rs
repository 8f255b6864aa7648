//! Shared types for procpilot components.
//!
//! Data model of the interpretation pipeline (entities, actions, analyses),
//! conversation records, process-manager records and error diagnoses.

pub mod action;
pub mod analysis;
pub mod conversation;
pub mod diagnosis;
pub mod entity;
pub mod error;
pub mod execution;
pub mod process;

pub use action::{Action, ActionTarget, ActionType, SafetyLevel};
pub use analysis::{AiActionDetection, InputAnalysis, Intent};
pub use conversation::{ConversationContext, ConversationTurn, PendingAction, TurnResult};
pub use diagnosis::{Diagnosis, ErrorCategory, ErrorSeverity, LogAnalysis, ParsedError};
pub use entity::{EntityType, ExtractedEntity};
pub use error::PilotError;
pub use execution::{ExecuteOptions, ExecutionResult};
pub use process::{LogEntry, LogLevel, ProcessInfo, ProcessStatus};

/// Round a score to two decimals.
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
