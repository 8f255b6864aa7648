//! Process-manager records: processes and log lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Online,
    Stopping,
    Stopped,
    Launching,
    Errored,
    OneLaunchStatus,
    #[serde(other)]
    Unknown,
}

impl ProcessStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "online" => ProcessStatus::Online,
            "stopping" => ProcessStatus::Stopping,
            "stopped" => ProcessStatus::Stopped,
            "launching" => ProcessStatus::Launching,
            "errored" => ProcessStatus::Errored,
            "one-launch-status" | "one_launch_status" => ProcessStatus::OneLaunchStatus,
            _ => ProcessStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Online => "online",
            ProcessStatus::Stopping => "stopping",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Launching => "launching",
            ProcessStatus::Errored => "errored",
            ProcessStatus::OneLaunchStatus => "one-launch-status",
            ProcessStatus::Unknown => "unknown",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, ProcessStatus::Online | ProcessStatus::Launching)
    }

    /// Stopped or crashed, i.e. a candidate for `start`
    pub fn is_down(&self) -> bool {
        matches!(self, ProcessStatus::Stopped | ProcessStatus::Errored)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One managed process as reported by the process manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub name: String,
    pub pm_id: u32,
    pub status: ProcessStatus,
    /// CPU usage in percent
    pub cpu: f64,
    /// Resident memory in bytes
    pub memory: u64,
    #[serde(default)]
    pub restarts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_log_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_log_path: Option<String>,
}

impl ProcessInfo {
    pub fn new(name: impl Into<String>, pm_id: u32, status: ProcessStatus) -> Self {
        Self {
            name: name.into(),
            pm_id,
            status,
            cpu: 0.0,
            memory: 0,
            restarts: 0,
            uptime_ms: None,
            pid: None,
            error_log_path: None,
            out_log_path: None,
        }
    }

    /// Memory in MB with one decimal
    pub fn memory_mb(&self) -> f64 {
        ((self.memory as f64 / (1024.0 * 1024.0)) * 10.0).round() / 10.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn is_warning_or_worse(&self) -> bool {
        matches!(self, LogLevel::Warn | LogLevel::Error)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
            process: None,
        }
    }

    pub fn for_process(mut self, process: impl Into<String>) -> Self {
        self.process = Some(process.into());
        self
    }
}
