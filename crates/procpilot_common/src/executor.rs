//! Command Executor - safety-gated dispatch to the process manager
//!
//! Per action: confirmation gate, dispatch by type, deterministic text
//! formatting of the outcome. Process-manager failures never escape; they
//! become `ExecutionResult { success: false, .. }`.

use crate::process_manager::ProcessManager;
use procpilot_shared::error::Result;
use procpilot_shared::{
    Action, ActionTarget, ActionType, ExecuteOptions, ExecutionResult, LogEntry, PilotError,
    ProcessInfo, ProcessStatus, SafetyLevel,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Default number of log lines shown by the logs action
pub const DEFAULT_LOG_LINES: usize = 20;

pub struct CommandExecutor {
    pm: Arc<dyn ProcessManager>,
    log_lines: usize,
}

impl CommandExecutor {
    pub fn new(pm: Arc<dyn ProcessManager>) -> Self {
        Self {
            pm,
            log_lines: DEFAULT_LOG_LINES,
        }
    }

    pub fn with_log_lines(mut self, lines: usize) -> Self {
        self.log_lines = lines.max(1);
        self
    }

    pub fn process_manager(&self) -> &Arc<dyn ProcessManager> {
        &self.pm
    }

    /// Dangerous actions, and caution-level actions on every process
    pub fn needs_confirmation(action: &Action) -> bool {
        match action.safety {
            SafetyLevel::Dangerous => true,
            SafetyLevel::Caution => action.is_batch(),
            SafetyLevel::Safe => false,
        }
    }

    pub async fn execute_action(&self, action: &Action, options: ExecuteOptions) -> ExecutionResult {
        if Self::needs_confirmation(action) && !options.may_proceed() {
            return ExecutionResult::needs_confirmation(confirmation_prompt(action));
        }

        if action.action_type.requires_target() && action.target.is_none() {
            return ExecutionResult::failed(format!(
                "Which process should I {}? Try '/{} <name>'.",
                action.action_type, action.action_type
            ));
        }

        match self.dispatch(action).await {
            Ok(result) => result,
            Err(e) => {
                warn!("{} failed: {}", action.to_command(), e);
                ExecutionResult::failed(format!("Failed to execute {}: {}", action.action_type, e))
            }
        }
    }

    /// Run actions in order. A dangerous action that does not succeed
    /// ends the run; later actions are not attempted.
    pub async fn execute_multiple_actions(
        &self,
        actions: &[Action],
        options: ExecuteOptions,
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            let result = self.execute_action(action, options).await;
            let halt = !result.success && action.safety == SafetyLevel::Dangerous;
            results.push(result);
            if halt {
                warn!(
                    "halting batch after failed dangerous action {}",
                    action.to_command()
                );
                break;
            }
        }
        results
    }

    async fn dispatch(&self, action: &Action) -> Result<ExecutionResult> {
        let target = action.target.as_ref();
        match action.action_type {
            ActionType::Restart | ActionType::Stop | ActionType::Start => match target {
                Some(ActionTarget::All) => self.lifecycle_all(action.action_type).await,
                Some(target) => self.lifecycle_one(action.action_type, target).await,
                None => Ok(ExecutionResult::failed(format!(
                    "Which process should I {}?",
                    action.action_type
                ))),
            },
            ActionType::Status => self.status(action.target_name()).await,
            ActionType::Logs => self.logs(action.target_name()).await,
            ActionType::Metrics => self.metrics(action.target_name()).await,
            ActionType::Info => match action.target_name() {
                Some(name) => self.info(name).await,
                None => Ok(ExecutionResult::failed(
                    "Which process should I describe? Try '/info <name>'.",
                )),
            },
        }
    }

    async fn call(&self, action_type: ActionType, target: &ActionTarget) -> Result<()> {
        match action_type {
            ActionType::Restart => self.pm.restart(target).await,
            ActionType::Stop => self.pm.stop(target).await,
            ActionType::Start => self.pm.start(target).await,
            other => Err(PilotError::ProcessManager(format!(
                "{} is not a lifecycle operation",
                other
            ))),
        }
    }

    async fn lifecycle_one(&self, action_type: ActionType, target: &ActionTarget) -> Result<ExecutionResult> {
        self.call(action_type, target).await?;
        info!("{} {}", action_type.past_tense(), target);
        Ok(ExecutionResult::ok(format!(
            "Process '{}' {}",
            target,
            action_type.past_tense()
        )))
    }

    /// Batch lifecycle; reports a zero-op instead of issuing one
    async fn lifecycle_all(&self, action_type: ActionType) -> Result<ExecutionResult> {
        let processes = self.pm.list().await?;
        let (filter, affected): (&str, Vec<&ProcessInfo>) = match action_type {
            ActionType::Stop => ("online", processes.iter().filter(|p| p.status.is_online()).collect()),
            ActionType::Start => ("stopped", processes.iter().filter(|p| p.status.is_down()).collect()),
            _ => ("managed", processes.iter().collect()),
        };

        if affected.is_empty() {
            return Ok(ExecutionResult::ok(format!(
                "No {} processes to {}",
                filter, action_type
            )));
        }

        self.call(action_type, &ActionTarget::All).await?;
        let names: Vec<&str> = affected.iter().map(|p| p.name.as_str()).collect();
        info!("{} {} processes", action_type.past_tense(), names.len());
        Ok(ExecutionResult::ok(format!(
            "{} {} process{}: {}",
            capitalize(action_type.past_tense()),
            names.len(),
            if names.len() == 1 { "" } else { "es" },
            names.join(", ")
        ))
        .with_data(serde_json::json!({ "processes": names })))
    }

    async fn status(&self, name: Option<&str>) -> Result<ExecutionResult> {
        let processes = match name {
            Some(name) => match self.pm.describe(name).await? {
                Some(info) => vec![info],
                None => return Ok(not_found(name)),
            },
            None => self.pm.list().await?,
        };
        Ok(ExecutionResult::ok(format_status(&processes))
            .with_data(serde_json::to_value(&processes)?))
    }

    async fn logs(&self, name: Option<&str>) -> Result<ExecutionResult> {
        let entries = self.pm.error_logs(name, self.log_lines).await?;
        if entries.is_empty() {
            return Ok(ExecutionResult::ok(match name {
                Some(name) => format!("No recent logs for '{}'", name),
                None => "No recent logs".to_string(),
            }));
        }
        Ok(ExecutionResult::ok(format_logs(&entries)))
    }

    async fn metrics(&self, name: Option<&str>) -> Result<ExecutionResult> {
        let processes = match name {
            Some(name) => match self.pm.describe(name).await? {
                Some(info) => vec![info],
                None => return Ok(not_found(name)),
            },
            None => self.pm.list().await?,
        };
        Ok(ExecutionResult::ok(format_metrics(&processes))
            .with_data(serde_json::to_value(&processes)?))
    }

    async fn info(&self, name: &str) -> Result<ExecutionResult> {
        match self.pm.describe(name).await? {
            Some(info) => Ok(ExecutionResult::ok(format_info(&info)).with_data(serde_json::to_value(&info)?)),
            None => Ok(not_found(name)),
        }
    }
}

fn not_found(name: &str) -> ExecutionResult {
    ExecutionResult::failed(PilotError::ProcessNotFound(name.to_string()).to_string())
}

fn confirmation_prompt(action: &Action) -> String {
    format!(
        "{}? This is a {} operation. Reply to confirm.",
        action.description, action.safety
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Formatting
// ============================================================================

pub fn format_status(processes: &[ProcessInfo]) -> String {
    if processes.is_empty() {
        return "No processes found".to_string();
    }
    let width = processes.iter().map(|p| p.name.len()).max().unwrap_or(0);
    let online = processes.iter().filter(|p| p.status == ProcessStatus::Online).count();

    let mut lines: Vec<String> = processes
        .iter()
        .map(|p| {
            format!(
                "{:<width$}  {:<10}  uptime {:<8}  restarts {}",
                p.name,
                p.status.as_str(),
                p.uptime_ms.map(format_uptime).unwrap_or_else(|| "-".to_string()),
                p.restarts,
                width = width
            )
        })
        .collect();
    lines.push(format!("{}/{} online", online, processes.len()));
    lines.join("\n")
}

pub fn format_metrics(processes: &[ProcessInfo]) -> String {
    if processes.is_empty() {
        return "No processes found".to_string();
    }
    let width = processes.iter().map(|p| p.name.len()).max().unwrap_or(0);
    let mut lines: Vec<String> = processes
        .iter()
        .map(|p| {
            format!(
                "{:<width$}  cpu {:>5.1}%  mem {:>7.1} MB",
                p.name,
                p.cpu,
                p.memory_mb(),
                width = width
            )
        })
        .collect();

    let total_cpu: f64 = processes.iter().map(|p| p.cpu).sum();
    let total_memory: u64 = processes.iter().map(|p| p.memory).sum();
    let total_mb = ((total_memory as f64 / (1024.0 * 1024.0)) * 10.0).round() / 10.0;
    lines.push(format!("Total: cpu {:.1}%, memory {:.1} MB", total_cpu, total_mb));
    lines.join("\n")
}

pub fn format_logs(entries: &[LogEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            format!(
                "[{}] {} {}",
                e.timestamp.format("%H:%M:%S"),
                e.level.as_str().to_uppercase(),
                e.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_info(info: &ProcessInfo) -> String {
    let mut lines = vec![
        format!("Name:      {}", info.name),
        format!("ID:        {}", info.pm_id),
        format!("Status:    {}", info.status),
        format!("PID:       {}", info.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())),
        format!("Uptime:    {}", info.uptime_ms.map(format_uptime).unwrap_or_else(|| "-".to_string())),
        format!("Restarts:  {}", info.restarts),
        format!("CPU:       {:.1}%", info.cpu),
        format!("Memory:    {:.1} MB", info.memory_mb()),
    ];
    if let Some(path) = &info.error_log_path {
        lines.push(format!("Error log: {}", path));
    }
    if let Some(path) = &info.out_log_path {
        lines.push(format!("Out log:   {}", path));
    }
    lines.join("\n")
}

/// Compact uptime, e.g. "3d 4h", "2h 5m", "42s"
pub fn format_uptime(ms: u64) -> String {
    let secs = ms / 1000;
    let (days, hours, mins) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_confirmation() {
        assert!(CommandExecutor::needs_confirmation(&Action::batch(ActionType::Stop)));
        assert!(CommandExecutor::needs_confirmation(&Action::new(
            ActionType::Stop,
            Some(ActionTarget::process("api"))
        )));
        assert!(CommandExecutor::needs_confirmation(&Action::batch(ActionType::Restart)));
        assert!(!CommandExecutor::needs_confirmation(&Action::new(
            ActionType::Restart,
            Some(ActionTarget::process("api"))
        )));
        assert!(!CommandExecutor::needs_confirmation(&Action::batch(ActionType::Status)));
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(42_000), "42s");
        assert_eq!(format_uptime(125_000), "2m 5s");
        assert_eq!(format_uptime(2 * 3_600_000 + 5 * 60_000), "2h 5m");
        assert_eq!(format_uptime(3 * 86_400_000 + 4 * 3_600_000), "3d 4h");
    }

    #[test]
    fn test_format_metrics_totals() {
        let mut api = ProcessInfo::new("api", 0, ProcessStatus::Online);
        api.cpu = 12.5;
        api.memory = 52_428_800;
        let mut worker = ProcessInfo::new("worker", 1, ProcessStatus::Online);
        worker.cpu = 2.3;
        worker.memory = 1_572_864;

        let text = format_metrics(&[api, worker]);
        assert!(text.contains("api     cpu  12.5%  mem    50.0 MB"));
        assert!(text.ends_with("Total: cpu 14.8%, memory 51.5 MB"));
    }

    #[test]
    fn test_format_status_summary() {
        let text = format_status(&[
            ProcessInfo::new("api", 0, ProcessStatus::Online),
            ProcessInfo::new("worker", 1, ProcessStatus::Errored),
        ]);
        assert!(text.contains("worker  errored"));
        assert!(text.ends_with("1/2 online"));
        assert_eq!(format_status(&[]), "No processes found");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("stopped"), "Stopped");
        assert_eq!(capitalize(""), "");
    }
}
