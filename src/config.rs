use anyhow::{anyhow, Result};
use std::time::Duration;

const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Gemini,
    OpenAi,
}

impl AiProvider {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::OpenAi => "gpt-4o",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub ai: AiConfig,
    pub max_body_bytes: usize,
    pub cors_origins: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| {
            let port = get("PORT").unwrap_or_else(|| "3000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let provider = match get("AI_PROVIDER") {
            Some(raw) => AiProvider::parse(&raw).ok_or_else(|| anyhow!("unknown AI_PROVIDER: {raw}"))?,
            None => AiProvider::Gemini,
        };

        let timeout = get("AI_TIMEOUT_SECS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| anyhow!("AI_TIMEOUT_SECS must be a whole number of seconds"))
            })
            .transpose()?;

        let max_body_bytes = get("MAX_BODY_BYTES")
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| anyhow!("MAX_BODY_BYTES must be a byte count"))
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);

        let cors_origins = get("CORS_ORIGINS").map(|raw| {
            raw.split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect()
        });

        Ok(Self {
            bind_addr,
            ai: AiConfig {
                provider,
                api_key: get(provider.key_var()),
                model: get("AI_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
                timeout,
            },
            max_body_bytes,
            cors_origins,
        })
    }
}
