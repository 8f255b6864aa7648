//! Procpilot Configuration
//!
//! Config file: $PROCPILOT_CONFIG, else ~/.config/procpilot/config.toml.
//! Missing file means defaults. Environment variables override the file.

use crate::llm::{LlmBackendKind, LlmConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "PROCPILOT_CONFIG";
pub const LLM_URL_ENV: &str = "PROCPILOT_LLM_URL";
pub const LLM_MODEL_ENV: &str = "PROCPILOT_LLM_MODEL";
pub const PM2_BIN_ENV: &str = "PROCPILOT_PM2_BIN";

/// Color display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Colour only when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Some(ColorMode::Auto),
            "always" | "on" => Some(ColorMode::Always),
            "never" | "off" | "none" => Some(ColorMode::Never),
            _ => None,
        }
    }
}

/// `[assistant]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Ask the model to classify free-text requests
    pub ai_action_detection: bool,
    /// Turns kept in memory
    pub history_limit: usize,
    /// Information turns replayed to the model
    pub transcript_turns: usize,
    /// Log lines fetched for logs and diagnosis
    pub log_lines: usize,
    pub pm2_bin: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            ai_action_detection: true,
            history_limit: 100,
            transcript_turns: 5,
            log_lines: 100,
            pm2_bin: "pm2".to_string(),
        }
    }
}

/// `[output]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub color: ColorMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PilotConfig {
    pub llm: LlmConfig,
    pub assistant: AssistantConfig,
    pub output: OutputConfig,
}

impl PilotConfig {
    /// ~/.config/procpilot/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Cannot determine config directory")?;
        Ok(dir.join("procpilot").join("config.toml"))
    }

    /// Path in effect: explicit, then $PROCPILOT_CONFIG, then the user path
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
            _ => Self::user_config_path(),
        }
    }

    /// Load with environment overrides applied.
    ///
    /// An explicit path must exist; the default location may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit)?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else if explicit.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: PilotConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        fs::write(path, toml_string).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Overrides from `lookup` (the process environment in production).
    ///
    /// A URL or model override on a disabled backend selects Ollama.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(LLM_URL_ENV) {
            self.llm.base_url = Some(url);
            self.enable_default_backend();
        }
        if let Some(model) = non_empty(LLM_MODEL_ENV) {
            self.llm.model = Some(model);
            self.enable_default_backend();
        }
        if let Some(bin) = non_empty(PM2_BIN_ENV) {
            self.assistant.pm2_bin = bin;
        }
    }

    fn enable_default_backend(&mut self) {
        if self.llm.backend == LlmBackendKind::Disabled {
            self.llm.backend = LlmBackendKind::Ollama;
        }
    }
}
