//! Tests for the full turn pipeline: router, conversation and executor
//!
//! Runs against the in-memory process manager and the scripted provider.

use procpilot_common::{
    AiInputRouter, CommandExecutor, ConversationManager, FakeAiProvider, FakeProcessManager,
    PatternMatcher,
};
use procpilot_shared::{
    ActionTarget, ActionType, EntityType, ExecuteOptions, Intent, ProcessStatus, SafetyLevel,
    TurnResult,
};
use std::sync::Arc;

fn router() -> AiInputRouter {
    AiInputRouter::heuristic(Arc::new(PatternMatcher::new()))
}

fn pm() -> Arc<FakeProcessManager> {
    Arc::new(
        FakeProcessManager::new()
            .with("api", ProcessStatus::Online)
            .with("worker", ProcessStatus::Stopped),
    )
}

#[tokio::test]
async fn restart_named_process_runs_without_pause() {
    let pm = pm();
    let executor = CommandExecutor::new(pm.clone());

    let analysis = router().analyze("restart api").await;
    assert_eq!(analysis.intent, Intent::DirectAction);
    assert_eq!(analysis.suggested_actions.len(), 1);

    let action = &analysis.suggested_actions[0];
    assert_eq!(action.safety, SafetyLevel::Caution);
    assert!(!CommandExecutor::needs_confirmation(action));

    let result = executor.execute_action(action, ExecuteOptions::default()).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "Process 'api' restarted");
    assert_eq!(pm.calls(), vec!["restart api"]);
}

#[tokio::test]
async fn stop_everything_pauses_then_runs_once_confirmed() {
    let pm = pm();
    let executor = CommandExecutor::new(pm.clone());

    let analysis = router().analyze("stop everything").await;
    assert!(analysis.requires_confirmation);
    let action = &analysis.suggested_actions[0];
    assert_eq!(action.target, Some(ActionTarget::All));
    assert_eq!(action.safety, SafetyLevel::Dangerous);

    let paused = executor.execute_action(action, ExecuteOptions::default()).await;
    assert!(!paused.success);
    assert!(paused.requires_confirmation);
    assert!(pm.calls().is_empty());

    let done = executor.execute_action(action, ExecuteOptions::confirmed()).await;
    assert!(done.success);
    assert_eq!(done.message, "Stopped 1 process: api");
    assert_eq!(pm.calls(), vec!["stop all"]);
    assert_eq!(pm.status_of("api"), Some(ProcessStatus::Stopped));
}

#[tokio::test]
async fn numbered_reply_confirms_pending_action() {
    let pm = pm();
    let executor = CommandExecutor::new(pm.clone());
    let mut conversation = ConversationManager::new();

    let analysis = router().analyze("stop api").await;
    conversation.set_pending_actions(&analysis);
    conversation.add_turn("stop api", analysis, None);

    assert!(conversation.is_numbered_selection("1"));
    assert!(!conversation.is_numbered_selection("yes"));
    assert!(conversation.take_action_by_number(7).is_none());
    assert!(conversation.has_pending_actions());

    let pending = conversation.take_action_by_number(1).unwrap();
    assert!(!conversation.has_pending_actions());
    assert_eq!(pending.command, "/stop api");

    let result = executor
        .execute_action(&pending.action, ExecuteOptions::confirmed())
        .await;
    assert!(result.success);
    assert_eq!(pm.status_of("api"), Some(ProcessStatus::Stopped));
}

#[tokio::test]
async fn pronoun_follows_last_mentioned_process() {
    let router = router();
    let mut conversation = ConversationManager::new();

    let first = router.analyze("restart api").await;
    conversation.add_turn("restart api", first, Some(TurnResult::ok("Process 'api' restarted")));
    let second = router.analyze("status api").await;
    conversation.add_turn("status api", second, Some(TurnResult::ok("ok")));

    let context = conversation.get_context();
    assert_eq!(context.last_mentioned_process.as_deref(), Some("api"));
    assert_eq!(conversation.resolve_pronoun("it", &context).as_deref(), Some("api"));
    assert_eq!(context.last_response.as_deref(), Some("ok"));

    let rewritten = conversation.resolve_pronouns("restart it", &context);
    assert_eq!(rewritten, "restart api");
    let analysis = router.analyze(&rewritten).await;
    assert_eq!(analysis.suggested_actions[0].target_name(), Some("api"));
}

#[tokio::test]
async fn ai_detection_drives_multilingual_request() {
    let ai = Arc::new(
        FakeAiProvider::new()
            .with_reply(r#"{"action": "restart", "target": "all", "confidence": 0.9, "language": "es"}"#),
    );
    let router = AiInputRouter::new(Arc::new(PatternMatcher::new()), Some(ai.clone()));

    let analysis = router.analyze("reinicia todo").await;
    assert_eq!(ai.call_count(), 1);
    assert_eq!(analysis.intent, Intent::DirectAction);
    assert_eq!(analysis.action_confidence, Some(0.9));
    assert_eq!(analysis.suggested_actions.len(), 1);

    let action = &analysis.suggested_actions[0];
    assert_eq!(action.action_type, ActionType::Restart);
    assert_eq!(action.target, Some(ActionTarget::All));
    assert_eq!(action.safety, SafetyLevel::Dangerous);
}

#[tokio::test]
async fn failing_ai_falls_back_to_heuristics() {
    let router = AiInputRouter::new(
        Arc::new(PatternMatcher::new()),
        Some(Arc::new(FakeAiProvider::failing())),
    );
    let analysis = router.analyze("restart api-server").await;

    let actions: Vec<_> = analysis
        .entities_of(EntityType::Action)
        .map(|e| e.value.as_str())
        .collect();
    assert_eq!(actions, vec!["restart"]);
    assert_eq!(analysis.suggested_actions[0].target_name(), Some("api-server"));
}

#[tokio::test]
async fn batch_halts_after_failed_dangerous_action() {
    let pm = Arc::new(
        FakeProcessManager::new()
            .with("api", ProcessStatus::Online)
            .failing_on("stop"),
    );
    let executor = CommandExecutor::new(pm.clone());

    let stop = procpilot_shared::Action::new(ActionType::Stop, Some(ActionTarget::process("api")));
    let status = procpilot_shared::Action::new(ActionType::Status, None);

    let results = executor
        .execute_multiple_actions(&[stop, status], ExecuteOptions::confirmed())
        .await;
    assert_eq!(results.len(), 1);
    assert!(results[0].message.starts_with("Failed to execute stop"));
}

#[tokio::test]
async fn transcript_skips_action_turns() {
    let router = router();
    let mut conversation = ConversationManager::new();

    for (input, reply) in [
        ("why is api slow?", "CPU is high"),
        ("restart api", "Process 'api' restarted"),
        ("what is using memory?", "worker uses 900 MB"),
    ] {
        let analysis = router.analyze(input).await;
        conversation.add_turn(input, analysis, Some(TurnResult::ok(reply)));
    }

    let messages = conversation.get_messages_for_ai();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["why is api slow?", "CPU is high", "what is using memory?", "worker uses 900 MB"]
    );
    assert_eq!(conversation.get_statistics().success_rate, 100);
}
