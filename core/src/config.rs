//! Process configuration, read once at startup.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::orchestrator::DEFAULT_QUALITY_THRESHOLD;
use crate::retry::RetryPolicy;

pub const DEFAULT_CHAT_URL: &str = "https://router.huggingface.co/v1/chat/completions";
pub const DEFAULT_LEGACY_URL: &str = "https://api-inference.huggingface.co/models/gpt2";
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.1-8B-Instruct";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Which request/response shape the upstream endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// `{model, messages, stream}` in, `choices[0].message.content` out.
    ChatCompletion,
    /// `{inputs, parameters}` in, `generated_text` out.
    LegacyGeneration,
}

impl ProviderKind {
    pub fn default_url(self) -> &'static str {
        match self {
            ProviderKind::ChatCompletion => DEFAULT_CHAT_URL,
            ProviderKind::LegacyGeneration => DEFAULT_LEGACY_URL,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" | "chat_completion" | "openai" => Ok(ProviderKind::ChatCompletion),
            "legacy" | "generation" | "inference" => Ok(ProviderKind::LegacyGeneration),
            _ => Err("expected 'chat' or 'legacy'".to_string()),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::ChatCompletion => f.write_str("chat"),
            ProviderKind::LegacyGeneration => f.write_str("legacy"),
        }
    }
}

/// What the orchestrator does when the provider gives nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationMode {
    /// Use the local template generator.
    #[default]
    Fallback,
    /// Return the `[Poem generation failed]` sentinel.
    AiOnly,
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(GenerationMode::Fallback),
            "ai_only" | "ai-only" => Ok(GenerationMode::AiOnly),
            _ => Err("expected 'fallback' or 'ai_only'".to_string()),
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::Fallback => f.write_str("fallback"),
            GenerationMode::AiOnly => f.write_str("ai_only"),
        }
    }
}

/// How the gateway talks to its MCP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Http,
    /// Line-delimited JSON-RPC on stdin/stdout.
    Stdio,
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Transport::Http),
            "stdio" => Ok(Transport::Stdio),
            _ => Err("expected 'http' or 'stdio'".to_string()),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Http => f.write_str("http"),
            Transport::Stdio => f.write_str("stdio"),
        }
    }
}

/// Settings for the upstream provider client.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry: RetryPolicy,
}

// Hand-written so the key never lands in logs.
impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ProviderSettings {
    /// Defaults for `kind` with the given credential.
    pub fn new(kind: ProviderKind, api_key: Option<String>) -> Self {
        Self {
            kind,
            url: kind.default_url().to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub mode: GenerationMode,
    pub quality_threshold: usize,
    pub fallback_seed: Option<u64>,
    pub auth_token: Option<String>,
    pub bind_addr: SocketAddr,
    pub transport: Transport,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("provider", &self.provider)
            .field("mode", &self.mode)
            .field("quality_threshold", &self.quality_threshold)
            .field("fallback_seed", &self.fallback_seed)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("bind_addr", &self.bind_addr)
            .field("transport", &self.transport)
            .finish()
    }
}

impl Settings {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let kind = match get("POEM_PROVIDER") {
            Some(v) => v
                .parse::<ProviderKind>()
                .map_err(|reason| ConfigError::invalid("POEM_PROVIDER", &v, reason))?,
            None => ProviderKind::ChatCompletion,
        };

        let api_key = get("POEM_API_KEY").or_else(|| get("HF_TOKEN"));
        let mut provider = ProviderSettings::new(kind, api_key);
        if let Some(url) = get("POEM_API_URL") {
            provider.url = url;
        }
        if let Some(model) = get("POEM_MODEL") {
            provider.model = model;
        }
        if let Some(v) = get("POEM_TIMEOUT_SECS") {
            let secs = parse_number::<u64>("POEM_TIMEOUT_SECS", &v)?;
            if secs == 0 {
                return Err(ConfigError::invalid("POEM_TIMEOUT_SECS", &v, "must be positive"));
            }
            provider.timeout = Duration::from_secs(secs);
        }
        if let Some(v) = get("POEM_MAX_RETRIES") {
            let retries = parse_number::<u32>("POEM_MAX_RETRIES", &v)?;
            if retries == 0 {
                return Err(ConfigError::invalid("POEM_MAX_RETRIES", &v, "must be at least 1"));
            }
            provider.max_retries = retries;
        }

        let mode = match get("POEM_GENERATION_MODE") {
            Some(v) => v
                .parse::<GenerationMode>()
                .map_err(|reason| ConfigError::invalid("POEM_GENERATION_MODE", &v, reason))?,
            None => GenerationMode::default(),
        };

        let quality_threshold = match get("POEM_QUALITY_THRESHOLD") {
            Some(v) => parse_number::<usize>("POEM_QUALITY_THRESHOLD", &v)?,
            None => DEFAULT_QUALITY_THRESHOLD,
        };

        let fallback_seed = get("POEM_FALLBACK_SEED")
            .map(|v| parse_number::<u64>("POEM_FALLBACK_SEED", &v))
            .transpose()?;

        let bind_addr = match (get("BIND_ADDR"), get("PORT")) {
            (Some(addr), _) => parse_number::<SocketAddr>("BIND_ADDR", &addr)?,
            (None, Some(port)) => {
                let port = parse_number::<u16>("PORT", &port)?;
                SocketAddr::from(([0, 0, 0, 0], port))
            }
            (None, None) => SocketAddr::from(([0, 0, 0, 0], 8000)),
        };

        let transport = match get("MCP_TRANSPORT") {
            Some(v) => v
                .parse::<Transport>()
                .map_err(|reason| ConfigError::invalid("MCP_TRANSPORT", &v, reason))?,
            None => Transport::default(),
        };

        Ok(Self {
            provider,
            mode,
            quality_threshold,
            fallback_seed,
            auth_token: get("MCP_AUTH_TOKEN"),
            bind_addr,
            transport,
        })
    }
}

fn parse_number<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::invalid(key, value, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.provider.kind, ProviderKind::ChatCompletion);
        assert_eq!(s.provider.url, DEFAULT_CHAT_URL);
        assert_eq!(s.provider.api_key, None);
        assert_eq!(s.provider.timeout, Duration::from_secs(30));
        assert_eq!(s.provider.max_retries, 3);
        assert_eq!(s.mode, GenerationMode::Fallback);
        assert_eq!(s.quality_threshold, DEFAULT_QUALITY_THRESHOLD);
        assert_eq!(DEFAULT_QUALITY_THRESHOLD, 20);
        assert_eq!(s.fallback_seed, None);
        assert_eq!(s.transport, Transport::Http);
        assert_eq!(s.auth_token, None);
        assert_eq!(s.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn legacy_provider_gets_its_own_default_url() {
        let s = settings(&[("POEM_PROVIDER", "legacy"), ("HF_TOKEN", "hf_abc")]).unwrap();
        assert_eq!(s.provider.kind, ProviderKind::LegacyGeneration);
        assert_eq!(s.provider.url, DEFAULT_LEGACY_URL);
        assert_eq!(s.provider.api_key.as_deref(), Some("hf_abc"));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let s = settings(&[
            ("POEM_API_KEY", "sk-1"),
            ("HF_TOKEN", "hf_ignored"),
            ("POEM_API_URL", "http://localhost:9000/v1/chat/completions"),
            ("POEM_MODEL", "tiny"),
            ("POEM_TIMEOUT_SECS", "10"),
            ("POEM_MAX_RETRIES", "5"),
            ("POEM_GENERATION_MODE", "ai_only"),
            ("POEM_QUALITY_THRESHOLD", "40"),
            ("POEM_FALLBACK_SEED", "42"),
            ("MCP_AUTH_TOKEN", "secret"),
            ("PORT", "9100"),
            ("MCP_TRANSPORT", "stdio"),
        ])
        .unwrap();
        assert_eq!(s.provider.api_key.as_deref(), Some("sk-1"));
        assert_eq!(s.provider.url, "http://localhost:9000/v1/chat/completions");
        assert_eq!(s.provider.model, "tiny");
        assert_eq!(s.provider.timeout, Duration::from_secs(10));
        assert_eq!(s.provider.max_retries, 5);
        assert_eq!(s.mode, GenerationMode::AiOnly);
        assert_eq!(s.quality_threshold, 40);
        assert_eq!(s.fallback_seed, Some(42));
        assert_eq!(s.auth_token.as_deref(), Some("secret"));
        assert_eq!(s.bind_addr.to_string(), "0.0.0.0:9100");
        assert_eq!(s.transport, Transport::Stdio);
    }

    #[test]
    fn blank_values_are_ignored() {
        let s = settings(&[("POEM_API_KEY", "   "), ("MCP_AUTH_TOKEN", "")]).unwrap();
        assert_eq!(s.provider.api_key, None);
        assert_eq!(s.auth_token, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(settings(&[("POEM_PROVIDER", "carrier-pigeon")]).is_err());
        assert!(settings(&[("POEM_MAX_RETRIES", "0")]).is_err());
        assert!(settings(&[("POEM_TIMEOUT_SECS", "soon")]).is_err());
        assert!(settings(&[("BIND_ADDR", "nowhere")]).is_err());
        assert!(settings(&[("MCP_TRANSPORT", "carrier-pigeon")]).is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let s = settings(&[("POEM_API_KEY", "sk-live-123"), ("MCP_AUTH_TOKEN", "tok-456")]).unwrap();
        let debug = format!("{s:?}");
        assert!(!debug.contains("sk-live-123"));
        assert!(!debug.contains("tok-456"));
        assert!(debug.contains("[REDACTED]"));
    }
}
