use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::info;

#[cfg(test)]
mod tests;

pub const CONFIG_FILE: &str = ".qna/config.toml";

/// Models accepted for the primary request.
pub const ALLOWED_MODELS: &[&str] = &["gpt-3.5-turbo", "gpt-4o-mini", "gpt-4o", "gpt-4"];

/// Cheaper substitute used once when the primary model is quota-exhausted.
pub const FALLBACK_MODEL: &str = "gpt-3.5-turbo";

pub const MAX_TOKENS_CEILING: u32 = 4096;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub log_level: String,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_backoff_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: 3,
            initial_backoff_secs: 1,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_secs(self.initial_backoff_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 150,
            log_level: "info".to_string(),
            llm: LlmConfig::default(),
        }
    }
}

/// Optional per-project overrides, every field absent by default.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub log_level: Option<String>,
    pub llm: Option<FileLlmConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileLlmConfig {
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub initial_backoff_secs: Option<u64>,
}

pub fn load_project_config(root: &Path) -> Result<FileConfig> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let text =
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FileConfig =
        toml::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    info!(path = %path.display(), "loaded project config");
    Ok(cfg)
}

impl AppConfig {
    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.model {
            self.model = v;
        }
        if let Some(v) = file.temperature {
            self.temperature = v;
        }
        if let Some(v) = file.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = file.log_level {
            self.log_level = v;
        }
        if let Some(llm) = file.llm {
            if let Some(v) = llm.timeout_secs {
                self.llm.timeout_secs = v;
            }
            if let Some(v) = llm.max_attempts {
                self.llm.max_attempts = v;
            }
            if let Some(v) = llm.initial_backoff_secs {
                self.llm.initial_backoff_secs = v;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !ALLOWED_MODELS.contains(&self.model.as_str()) {
            bail!(
                "model '{}' is not in the allowed set: {}",
                self.model,
                ALLOWED_MODELS.join(", ")
            );
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            bail!(
                "temperature {} out of range (expected 0.0 - 1.0)",
                self.temperature
            );
        }
        if self.max_tokens == 0 || self.max_tokens > MAX_TOKENS_CEILING {
            bail!(
                "max_tokens {} out of range (expected 1 - {MAX_TOKENS_CEILING})",
                self.max_tokens
            );
        }
        if self.llm.timeout_secs == 0 {
            bail!("timeout_secs must be positive");
        }
        if self.llm.max_attempts == 0 {
            bail!("max_attempts must be positive");
        }
        Ok(())
    }
}
