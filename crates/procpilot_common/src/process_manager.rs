//! Process Manager Trait Abstraction
//!
//! Interface over the process manager the assistant drives.
//!
//! Production code uses `Pm2Client` (see `pm2.rs`) which shells out to the
//! pm2 binary. Test code uses `FakeProcessManager` with a pre-configured
//! process table, log lines and failures.

use async_trait::async_trait;
use procpilot_shared::error::Result;
use procpilot_shared::{ActionTarget, LogEntry, PilotError, ProcessInfo, ProcessStatus};
use std::collections::HashSet;
use std::sync::Mutex;

// ============================================================================
// Process Manager Trait
// ============================================================================

#[async_trait]
pub trait ProcessManager: Send + Sync {
    async fn list(&self) -> Result<Vec<ProcessInfo>>;

    /// `None` when no process has that name
    async fn describe(&self, name: &str) -> Result<Option<ProcessInfo>>;

    async fn restart(&self, target: &ActionTarget) -> Result<()>;

    async fn stop(&self, target: &ActionTarget) -> Result<()>;

    async fn start(&self, target: &ActionTarget) -> Result<()>;

    async fn delete(&self, target: &ActionTarget) -> Result<()>;

    /// Most recent log entries, oldest first, at most `limit`
    async fn error_logs(&self, process: Option<&str>, limit: usize) -> Result<Vec<LogEntry>>;
}

// ============================================================================
// Fake Process Manager (Testing)
// ============================================================================

/// In-memory process manager that records every lifecycle call
#[derive(Default)]
pub struct FakeProcessManager {
    processes: Mutex<Vec<ProcessInfo>>,
    logs: Mutex<Vec<LogEntry>>,
    calls: Mutex<Vec<String>>,
    failing: HashSet<String>,
}

impl FakeProcessManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(self, info: ProcessInfo) -> Self {
        if let Ok(mut processes) = self.processes.lock() {
            processes.push(info);
        }
        self
    }

    /// Shorthand for a process with the given status
    pub fn with(self, name: &str, status: ProcessStatus) -> Self {
        let id = self.processes.lock().map(|p| p.len() as u32).unwrap_or(0);
        self.with_process(ProcessInfo::new(name, id, status))
    }

    pub fn with_logs(self, entries: Vec<LogEntry>) -> Self {
        if let Ok(mut logs) = self.logs.lock() {
            logs.extend(entries);
        }
        self
    }

    /// Make an operation fail ("list", "restart", "stop", "error_logs", ...)
    pub fn failing_on(mut self, operation: &str) -> Self {
        self.failing.insert(operation.to_string());
        self
    }

    /// Recorded lifecycle calls, e.g. `["stop api", "restart all"]`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn status_of(&self, name: &str) -> Option<ProcessStatus> {
        self.processes
            .lock()
            .ok()?
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.status)
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.failing.contains(operation) {
            return Err(PilotError::ProcessManager(format!(
                "simulated {} failure",
                operation
            )));
        }
        Ok(())
    }

    fn lifecycle(&self, verb: &str, target: &ActionTarget, status: ProcessStatus) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(format!("{} {}", verb, target));
        }
        self.check(verb)?;

        let mut processes = self
            .processes
            .lock()
            .map_err(|_| PilotError::ProcessManager("process table poisoned".to_string()))?;
        match target {
            ActionTarget::All => {
                for p in processes.iter_mut() {
                    p.status = status;
                }
                Ok(())
            }
            ActionTarget::Process(name) => match processes.iter_mut().find(|p| &p.name == name) {
                Some(p) => {
                    p.status = status;
                    Ok(())
                }
                None => Err(PilotError::ProcessNotFound(name.clone())),
            },
        }
    }
}

#[async_trait]
impl ProcessManager for FakeProcessManager {
    async fn list(&self) -> Result<Vec<ProcessInfo>> {
        self.check("list")?;
        Ok(self.processes.lock().map(|p| p.clone()).unwrap_or_default())
    }

    async fn describe(&self, name: &str) -> Result<Option<ProcessInfo>> {
        self.check("describe")?;
        Ok(self
            .processes
            .lock()
            .ok()
            .and_then(|p| p.iter().find(|p| p.name == name).cloned()))
    }

    async fn restart(&self, target: &ActionTarget) -> Result<()> {
        self.lifecycle("restart", target, ProcessStatus::Online)
    }

    async fn stop(&self, target: &ActionTarget) -> Result<()> {
        self.lifecycle("stop", target, ProcessStatus::Stopped)
    }

    async fn start(&self, target: &ActionTarget) -> Result<()> {
        self.lifecycle("start", target, ProcessStatus::Online)
    }

    async fn delete(&self, target: &ActionTarget) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(format!("delete {}", target));
        }
        self.check("delete")?;
        if let Ok(mut processes) = self.processes.lock() {
            match target {
                ActionTarget::All => processes.clear(),
                ActionTarget::Process(name) => processes.retain(|p| &p.name != name),
            }
        }
        Ok(())
    }

    async fn error_logs(&self, process: Option<&str>, limit: usize) -> Result<Vec<LogEntry>> {
        self.check("error_logs")?;
        let logs = self.logs.lock().map(|l| l.clone()).unwrap_or_default();
        let matching: Vec<LogEntry> = logs
            .into_iter()
            .filter(|entry| match process {
                Some(name) => entry.process.as_deref() == Some(name),
                None => true,
            })
            .collect();
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.into_iter().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use procpilot_shared::LogLevel;

    #[tokio::test]
    async fn test_fake_lifecycle_updates_status() {
        let pm = FakeProcessManager::new()
            .with("api", ProcessStatus::Online)
            .with("worker", ProcessStatus::Online);

        pm.stop(&ActionTarget::process("api")).await.unwrap();
        assert_eq!(pm.status_of("api"), Some(ProcessStatus::Stopped));
        assert_eq!(pm.status_of("worker"), Some(ProcessStatus::Online));

        pm.stop(&ActionTarget::All).await.unwrap();
        assert_eq!(pm.status_of("worker"), Some(ProcessStatus::Stopped));
        assert_eq!(pm.calls(), vec!["stop api", "stop all"]);
    }

    #[tokio::test]
    async fn test_fake_unknown_process() {
        let pm = FakeProcessManager::new();
        let err = pm.restart(&ActionTarget::process("ghost")).await.unwrap_err();
        assert_eq!(err.to_string(), "Process 'ghost' not found");
        assert!(pm.describe("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fake_failures_are_recorded() {
        let pm = FakeProcessManager::new()
            .with("api", ProcessStatus::Online)
            .failing_on("restart");
        assert!(pm.restart(&ActionTarget::process("api")).await.is_err());
        assert_eq!(pm.calls(), vec!["restart api"]);
    }

    #[tokio::test]
    async fn test_fake_logs_filter_and_limit() {
        let now = Utc::now();
        let pm = FakeProcessManager::new().with_logs(vec![
            LogEntry::new(now, LogLevel::Info, "one").for_process("api"),
            LogEntry::new(now, LogLevel::Error, "two").for_process("worker"),
            LogEntry::new(now, LogLevel::Error, "three").for_process("api"),
            LogEntry::new(now, LogLevel::Warn, "four").for_process("api"),
        ]);

        let logs = pm.error_logs(Some("api"), 2).await.unwrap();
        let messages: Vec<_> = logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["three", "four"]);
        assert_eq!(pm.error_logs(None, 10).await.unwrap().len(), 4);
    }
}
