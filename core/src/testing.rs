//! In-process stand-ins for the upstream provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::llm::TextGenerator;
use crate::prompt::GenerationRequest;

enum Reply {
    Text(String),
    Fail(fn() -> UpstreamError),
}

/// Returns the same reply on every call and counts how often it was asked.
pub struct ScriptedGenerator {
    reply: Reply,
    configured: bool,
    calls: AtomicUsize,
    prompts: parking_lot::Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn build(reply: Reply, configured: bool) -> Arc<Self> {
        Arc::new(Self {
            reply,
            configured,
            calls: AtomicUsize::new(0),
            prompts: parking_lot::Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::build(Reply::Text(text.to_string()), true)
    }

    pub fn failing(error: fn() -> UpstreamError) -> Arc<Self> {
        Self::build(Reply::Fail(error), true)
    }

    /// Behaves like a client with no credential.
    pub fn unconfigured() -> Arc<Self> {
        Self::build(Reply::Fail(|| UpstreamError::MissingCredential), false)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_text(&self, request: &GenerationRequest) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(request.prompt.clone());
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(error) => Err(error()),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
