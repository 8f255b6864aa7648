//! pm2 client - ProcessManager over the pm2 CLI
//!
//! `pm2 jlist` for the process table, `pm2 <verb> <name|all>` for
//! lifecycle operations, and direct tails of the per-process log files
//! for log retrieval.

use crate::process_manager::ProcessManager;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use procpilot_shared::error::Result;
use procpilot_shared::{ActionTarget, LogEntry, LogLevel, PilotError, ProcessInfo, ProcessStatus};
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default pm2 executable
pub const PM2_DEFAULT_BIN: &str = "pm2";

/// Client shelling out to the pm2 binary
#[derive(Debug, Clone)]
pub struct Pm2Client {
    bin: String,
}

impl Pm2Client {
    pub fn new() -> Self {
        Self::with_bin(PM2_DEFAULT_BIN)
    }

    pub fn with_bin(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!("Executing: {} {:?}", self.bin, args);

        let output = Command::new(&self.bin)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| PilotError::ProcessManager(format!("failed to run {}: {}", self.bin, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PilotError::ProcessManager(format!(
                "{} {} failed: {}",
                self.bin,
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn lifecycle(&self, verb: &str, target: &ActionTarget) -> Result<()> {
        self.run(&[verb, target.as_str()]).await.map_err(|e| match (e, target) {
            // pm2 reports unknown names on stderr with a non-zero exit
            (PilotError::ProcessManager(msg), ActionTarget::Process(name))
                if msg.contains("not found") =>
            {
                PilotError::ProcessNotFound(name.clone())
            }
            (other, _) => other,
        })?;
        Ok(())
    }
}

impl Default for Pm2Client {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessManager for Pm2Client {
    async fn list(&self) -> Result<Vec<ProcessInfo>> {
        let stdout = self.run(&["jlist"]).await?;
        parse_jlist(&stdout, Utc::now())
    }

    async fn describe(&self, name: &str) -> Result<Option<ProcessInfo>> {
        Ok(self.list().await?.into_iter().find(|p| p.name == name))
    }

    async fn restart(&self, target: &ActionTarget) -> Result<()> {
        self.lifecycle("restart", target).await
    }

    async fn stop(&self, target: &ActionTarget) -> Result<()> {
        self.lifecycle("stop", target).await
    }

    async fn start(&self, target: &ActionTarget) -> Result<()> {
        self.lifecycle("start", target).await
    }

    async fn delete(&self, target: &ActionTarget) -> Result<()> {
        self.lifecycle("delete", target).await
    }

    async fn error_logs(&self, process: Option<&str>, limit: usize) -> Result<Vec<LogEntry>> {
        let processes = self.list().await?;
        let selected: Vec<&ProcessInfo> = match process {
            Some(name) => {
                let found: Vec<&ProcessInfo> = processes.iter().filter(|p| p.name == name).collect();
                if found.is_empty() {
                    return Err(PilotError::ProcessNotFound(name.to_string()));
                }
                found
            }
            None => processes.iter().collect(),
        };

        let now = Utc::now();
        let mut entries = Vec::new();
        for info in selected {
            if let Some(path) = &info.error_log_path {
                entries.extend(tail_log(path, &info.name, Some(LogLevel::Error), limit, now).await);
            }
            if let Some(path) = &info.out_log_path {
                entries.extend(tail_log(path, &info.name, None, limit, now).await);
            }
        }

        entries.sort_by_key(|e| e.timestamp);
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.into_iter().skip(skip).collect())
    }
}

// ============================================================================
// jlist parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct JlistEntry {
    name: String,
    pm_id: u32,
    #[serde(default)]
    pid: Option<u32>,
    #[serde(default)]
    monit: Option<JlistMonit>,
    #[serde(default)]
    pm2_env: Option<JlistEnv>,
}

#[derive(Debug, Default, Deserialize)]
struct JlistMonit {
    #[serde(default)]
    memory: u64,
    #[serde(default)]
    cpu: f64,
}

#[derive(Debug, Default, Deserialize)]
struct JlistEnv {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    pm_uptime: Option<i64>,
    #[serde(default)]
    restart_time: Option<u32>,
    #[serde(default)]
    pm_err_log_path: Option<String>,
    #[serde(default)]
    pm_out_log_path: Option<String>,
}

/// Parse `pm2 jlist` output into process records
pub fn parse_jlist(json: &str, now: DateTime<Utc>) -> Result<Vec<ProcessInfo>> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<JlistEntry> = serde_json::from_str(trimmed)?;
    Ok(entries
        .into_iter()
        .map(|entry| {
            let env = entry.pm2_env.unwrap_or_default();
            let monit = entry.monit.unwrap_or_default();
            let status = env
                .status
                .as_deref()
                .map(ProcessStatus::parse)
                .unwrap_or(ProcessStatus::Unknown);
            let uptime_ms = match (status, env.pm_uptime) {
                (ProcessStatus::Online, Some(started)) => {
                    Some((now.timestamp_millis() - started).max(0) as u64)
                }
                _ => None,
            };

            ProcessInfo {
                name: entry.name,
                pm_id: entry.pm_id,
                status,
                cpu: monit.cpu,
                memory: monit.memory,
                restarts: env.restart_time.unwrap_or(0),
                uptime_ms,
                pid: entry.pid.filter(|pid| *pid > 0),
                error_log_path: env.pm_err_log_path,
                out_log_path: env.pm_out_log_path,
            }
        })
        .collect())
}

// ============================================================================
// Log tailing
// ============================================================================

async fn tail_log(
    path: &str,
    process: &str,
    level: Option<LogLevel>,
    limit: usize,
    fallback: DateTime<Utc>,
) -> Vec<LogEntry> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!("Cannot read log {}: {}", path, e);
            return Vec::new();
        }
    };

    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(limit);
    lines
        .into_iter()
        .skip(skip)
        .map(|line| parse_log_line(line, level, fallback).for_process(process))
        .collect()
}

/// Parse one log line, honouring pm2's optional `<date>: ` prefix.
///
/// With no fixed level the level is inferred from the text.
pub fn parse_log_line(line: &str, level: Option<LogLevel>, fallback: DateTime<Utc>) -> LogEntry {
    let (timestamp, message) = split_timestamp(line).unwrap_or((fallback, line));
    let level = level.unwrap_or_else(|| infer_level(message));
    LogEntry::new(timestamp, level, message)
}

fn split_timestamp(line: &str) -> Option<(DateTime<Utc>, &str)> {
    let (prefix, rest) = line.split_once(": ")?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(prefix) {
        return Some((ts.with_timezone(&Utc), rest));
    }
    let naive = NaiveDateTime::parse_from_str(prefix, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(prefix, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()?;
    Some((Utc.from_utc_datetime(&naive), rest))
}

fn infer_level(message: &str) -> LogLevel {
    let lower = message.to_lowercase();
    if lower.contains("error") || lower.contains("exception") || lower.contains("fatal") {
        LogLevel::Error
    } else if lower.contains("warn") {
        LogLevel::Warn
    } else if lower.contains("debug") {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}
