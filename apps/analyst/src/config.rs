use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::agent::{AgentConfig, DEFAULT_MAX_TURNS};
use crate::llm_client::{LlmSettings, ANTHROPIC_API_URL, DEFAULT_MODEL};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub model: String,
    pub port: u16,
    pub rust_log: String,
    pub max_turns: usize,
    /// Conversation window budget in characters.
    pub context_char_limit: usize,
    pub llm_max_tokens: u32,
    pub run_timeout: Duration,
    pub redact_document_text: bool,
    /// Served resumes are read from, and uploaded into, this directory.
    pub resume_dir: PathBuf,
    /// Idle sessions are dropped after this long.
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            model: std::env::var("RESUME_AGENT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_turns: parse_env("MAX_TURNS", DEFAULT_MAX_TURNS)?,
            context_char_limit: parse_env("CONTEXT_CHAR_LIMIT", 400_000)?,
            llm_max_tokens: parse_env("LLM_MAX_TOKENS", 4096)?,
            run_timeout: Duration::from_secs(parse_env("RUN_TIMEOUT_SECS", 300)?),
            redact_document_text: parse_bool_env("REDACT_DOCUMENT_TEXT", true)?,
            resume_dir: std::env::var("RESUME_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("resumes")),
            session_ttl: Duration::from_secs(parse_env("SESSION_TTL_SECS", 3600)?),
        };

        if config.max_turns == 0 {
            anyhow::bail!("MAX_TURNS must be at least 1");
        }
        if config.session_ttl.is_zero() {
            anyhow::bail!("SESSION_TTL_SECS must be at least 1");
        }
        Ok(config)
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_turns: self.max_turns,
            redact_documents: self.redact_document_text,
            document_root: None,
        }
    }

    /// Creates the resume directory if needed and returns its canonical path.
    pub fn prepare_resume_dir(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.resume_dir)
            .with_context(|| format!("creating {}", self.resume_dir.display()))?;
        std::fs::canonicalize(&self.resume_dir)
            .with_context(|| format!("resolving {}", self.resume_dir.display()))
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            api_key: self.anthropic_api_key.clone(),
            api_url: ANTHROPIC_API_URL.to_string(),
            model: self.model.clone(),
            max_tokens: self.llm_max_tokens,
            context_chars: self.context_char_limit,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool> {
    match std::env::var(key) {
        Ok(raw) => parse_flag(&raw).with_context(|| format!("{key} must be true or false, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
