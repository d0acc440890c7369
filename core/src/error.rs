use thiserror::Error;

/// Failures of the upstream generation client.
///
/// None of these ever reach a tool caller directly: the orchestrator turns
/// every variant into a fallback poem or the error sentinel.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no upstream API credential configured")]
    MissingCredential,

    #[error("upstream provider rejected the credential (401)")]
    Unauthorized,

    #[error("upstream provider returned no usable text")]
    Malformed,

    #[error("upstream provider failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    #[error("could not build upstream request: {0}")]
    Request(String),
}

/// Problems with a tool call that are reported back as `isError` content.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool '{name}'. Valid tools: {}", valid.join(", "))]
    UnknownTool { name: String, valid: Vec<String> },

    #[error("Word '{word}' is too long for an acrostic ({len} characters, maximum {max})")]
    WordTooLong { word: String, len: usize, max: usize },

    #[error("Poem server is not configured: {0}")]
    NotConfigured(String),
}

impl ToolError {
    /// Caller mistakes, as opposed to server-side configuration faults.
    pub fn is_user_input(&self) -> bool {
        !matches!(self, ToolError::NotConfigured(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
