//! Procpilot Common - interpretation and execution engine
//!
//! Free text or slash commands in, process-manager operations and
//! diagnoses out. The model is optional everywhere; each AI path has a
//! deterministic fallback.

pub mod actions;
pub mod config;
pub mod conversation;
pub mod entities;
pub mod error_analysis;
pub mod executor;
pub mod input_analyzer;
pub mod json_extract;
pub mod llm;
pub mod patterns;
pub mod pm2;
pub mod process_manager;
pub mod router;

pub use actions::ActionDetector;
pub use config::{ColorMode, PilotConfig};
pub use conversation::{ConversationManager, ConversationStats};
pub use entities::EntityExtractor;
pub use error_analysis::ErrorAnalysisService;
pub use executor::CommandExecutor;
pub use input_analyzer::InputAnalyzer;
pub use llm::{AiProvider, ChatMessage, FakeAiProvider, HttpAiProvider, LlmConfig, LlmError};
pub use patterns::PatternMatcher;
pub use pm2::Pm2Client;
pub use process_manager::{FakeProcessManager, ProcessManager};
pub use router::AiInputRouter;
