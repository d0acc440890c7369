//! Routes a tool call to the right prompt, fallback plan and formatting.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::acrostic;
use crate::config::{GenerationMode, ProviderSettings, Settings};
use crate::error::{ToolError, UpstreamError};
use crate::fallback::FallbackGenerator;
use crate::llm::UpstreamClient;
use crate::orchestrator::{FallbackPlan, GenerationResult, Orchestrator, Provenance};
use crate::prompt::{build_prompt, haiku_theme, Arguments, GenerationRequest, PoemTool};
use crate::registry::{Registry, ToolKind};

/// An inbound tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    pub tool_name: String,
    pub arguments: Arguments,
}

impl ToolRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Reads `{name, arguments}` from `tools/call` params.
    pub fn from_params(params: &Value) -> Result<Self, String> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "Missing tool name".to_string())?;
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => Arguments::new(),
            Some(args @ Value::Object(_)) => Arguments::from_json(args),
            Some(_) => return Err("Tool arguments must be an object".to_string()),
        };
        Ok(Self::new(name, arguments))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
}

/// The `tools/call` result body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ContentResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// All text blocks joined.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|Content::Text { text }| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    orchestrator: Orchestrator,
    max_retries: u32,
    provider: Option<ProviderSettings>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, orchestrator: Orchestrator, max_retries: u32) -> Self {
        Self {
            registry,
            orchestrator,
            max_retries: max_retries.max(1),
            provider: None,
        }
    }

    /// Wires the real upstream client, fallback generator and orchestrator
    /// from process settings.
    pub fn from_settings(
        settings: &Settings,
        registry: Arc<Registry>,
    ) -> Result<Self, UpstreamError> {
        let client = UpstreamClient::new(settings.provider.clone())?;
        let orchestrator = Orchestrator::new(
            Arc::new(client),
            FallbackGenerator::new(settings.fallback_seed),
        )
        .with_mode(settings.mode)
        .with_quality_threshold(settings.quality_threshold);

        Ok(Self::new(registry, orchestrator, settings.provider.max_retries)
            .with_provider(settings.provider.clone()))
    }

    /// Provider details reported by `debug_status`. The key itself is never shown.
    pub fn with_provider(mut self, provider: ProviderSettings) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_configured(&self) -> bool {
        self.orchestrator.is_configured()
    }

    pub async fn dispatch(&self, request: &ToolRequest) -> ContentResult {
        let kind = ToolKind::from_name(&request.tool_name)
            .filter(|kind| self.registry.get(kind.name()).is_some());
        let Some(kind) = kind else {
            let err = ToolError::UnknownTool {
                name: request.tool_name.clone(),
                valid: self.registry.names(),
            };
            debug!("Rejected tool call: {err}");
            return ContentResult::error(err.to_string());
        };

        match kind {
            ToolKind::DebugStatus => ContentResult::text(self.status_report()),
            ToolKind::Poem(tool) => match self.compose(tool, &request.arguments).await {
                Ok(result) => {
                    let text = format_poem(tool, &request.arguments, &result);
                    if result.provenance == Provenance::Error {
                        ContentResult::error(text)
                    } else {
                        ContentResult::text(text)
                    }
                }
                Err(err) => {
                    if err.is_user_input() {
                        debug!("Rejected {tool} call: {err}");
                    } else {
                        warn!("Refusing {tool} call: {err}");
                    }
                    ContentResult::error(err.to_string())
                }
            },
        }
    }

    /// Validates, prompts and generates, without formatting. Argument
    /// problems are caught before anything is sent upstream.
    pub async fn compose(
        &self,
        tool: PoemTool,
        args: &Arguments,
    ) -> Result<GenerationResult, ToolError> {
        let plan = fallback_plan(tool, args)?;
        if !self.orchestrator.is_configured() {
            return Err(ToolError::NotConfigured(
                "no upstream API credential (set POEM_API_KEY)".to_string(),
            ));
        }

        let request = GenerationRequest::new(build_prompt(tool, args), self.max_retries);
        Ok(self.orchestrator.generate(&request, &plan).await)
    }

    fn status_report(&self) -> String {
        let mut lines = vec!["Poem server status".to_string()];
        match &self.provider {
            Some(provider) => {
                lines.push(format!("Provider: {} ({})", provider.kind, provider.url));
                lines.push(format!("Model: {}", provider.model));
                lines.push(format!("Timeout: {}s", provider.timeout.as_secs()));
            }
            None => lines.push("Provider: custom".to_string()),
        }
        lines.push(format!(
            "Credential: {}",
            if self.is_configured() { "configured" } else { "missing" }
        ));
        lines.push(format!(
            "Generation mode: {}",
            match self.orchestrator.mode() {
                GenerationMode::Fallback => "fallback (templates when AI fails)",
                GenerationMode::AiOnly => "ai_only (no templates)",
            }
        ));
        lines.push(format!(
            "Quality threshold: {} characters",
            self.orchestrator.quality_threshold()
        ));
        lines.push(format!("Max attempts: {}", self.max_retries));
        lines.push(format!("Tools: {}", self.registry.names().join(", ")));
        lines.join("\n")
    }
}

fn fallback_plan(tool: PoemTool, args: &Arguments) -> Result<FallbackPlan, ToolError> {
    let plan = match tool {
        PoemTool::GeneratePoem => FallbackPlan::Poem {
            theme: args.theme().to_string(),
            style: args.style().to_string(),
            length: args.length().to_string(),
            mood: args.mood().to_string(),
        },
        PoemTool::QuickPoem => FallbackPlan::Poem {
            theme: args.theme().to_string(),
            style: "free_verse".to_string(),
            length: "short".to_string(),
            mood: "inspiring".to_string(),
        },
        PoemTool::HaikuGenerator => FallbackPlan::Poem {
            theme: haiku_theme(args),
            style: "haiku".to_string(),
            length: "short".to_string(),
            mood: args.mood().to_string(),
        },
        PoemTool::AcrosticPoem => FallbackPlan::Acrostic {
            word: acrostic::validate_word(&args.word())?,
            theme: args.get("theme").map(str::to_string),
        },
    };
    Ok(plan)
}

fn format_poem(tool: PoemTool, args: &Arguments, result: &GenerationResult) -> String {
    let title = match tool {
        PoemTool::GeneratePoem => format!(
            "A {} {} poem about {}",
            args.mood(),
            args.style().replace('_', " "),
            args.theme()
        ),
        PoemTool::QuickPoem => format!("A quick poem about {}", args.theme()),
        PoemTool::HaikuGenerator => format!("Haiku: {}", haiku_theme(args)),
        PoemTool::AcrosticPoem => format!("Acrostic: {}", args.word()),
    };
    format!(
        "{title}\n\n{}\n\n-- {}",
        result.text,
        result.provenance.marker()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::FAILURE_SENTINEL;
    use crate::testing::ScriptedGenerator;
    use serde_json::json;

    const AI_POEM: &str = "Morning opens like a letter\nwritten in a patient hand";

    fn dispatcher(upstream: Arc<ScriptedGenerator>) -> Dispatcher {
        let orchestrator = Orchestrator::new(upstream, FallbackGenerator::seeded(17));
        Dispatcher::new(Arc::new(Registry::load().unwrap()), orchestrator, 3)
    }

    fn failing() -> Arc<ScriptedGenerator> {
        ScriptedGenerator::failing(|| UpstreamError::Exhausted {
            attempts: 3,
            last: "HTTP 503".to_string(),
        })
    }

    fn body_of(text: &str) -> Vec<&str> {
        // title, blank, body..., blank, footer
        let lines: Vec<&str> = text.lines().collect();
        lines[2..lines.len() - 2].to_vec()
    }

    #[tokio::test]
    async fn every_poem_tool_succeeds_with_default_arguments() {
        for upstream in [ScriptedGenerator::replying(AI_POEM), failing()] {
            let dispatcher = dispatcher(upstream);
            for tool in PoemTool::ALL {
                let result = dispatcher
                    .dispatch(&ToolRequest::new(tool.name(), Arguments::new()))
                    .await;
                assert!(!result.is_error, "{tool}: {result:?}");
                let text = result.joined_text();
                assert!(
                    text.ends_with("-- AI Generated") || text.ends_with("-- Crafted with Care"),
                    "{tool}: {text}"
                );
                assert!(body_of(&text).iter().any(|l| !l.trim().is_empty()));
            }
        }
    }

    #[tokio::test]
    async fn ai_text_is_marked_ai_generated() {
        let upstream = ScriptedGenerator::replying(AI_POEM);
        let dispatcher = dispatcher(upstream.clone());
        let args = Arguments::new().with("theme", "morning");
        let result = dispatcher
            .dispatch(&ToolRequest::new("quick_poem", args.clone()))
            .await;
        let text = result.joined_text();
        assert!(text.starts_with("A quick poem about morning"));
        assert!(text.contains(AI_POEM));
        assert!(text.ends_with("-- AI Generated"));
        assert_eq!(
            upstream.prompts(),
            vec![build_prompt(PoemTool::QuickPoem, &args)]
        );
    }

    #[tokio::test]
    async fn long_acrostic_word_never_reaches_upstream() {
        let upstream = ScriptedGenerator::replying(AI_POEM);
        let dispatcher = dispatcher(upstream.clone());
        let args = Arguments::new().with("word", "extraordinarinesses");
        let result = dispatcher
            .dispatch(&ToolRequest::new("acrostic_poem", args))
            .await;
        assert!(result.is_error);
        assert!(result.joined_text().contains("too long"));
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn acrostic_with_a_space_gets_one_line_per_letter() {
        let dispatcher = dispatcher(failing());
        let args = Arguments::new().with("word", "new york");
        let result = dispatcher
            .dispatch(&ToolRequest::new("acrostic_poem", args))
            .await;
        assert!(!result.is_error);
        let text = result.joined_text();
        let firsts: String = body_of(&text)
            .iter()
            .filter_map(|l| l.chars().next())
            .collect();
        assert_eq!(firsts, "NEWYORK");
    }

    #[tokio::test]
    async fn poemgen_runs_as_generate_poem() {
        let upstream = ScriptedGenerator::replying(AI_POEM);
        let dispatcher = dispatcher(upstream.clone());
        let args = Arguments::new().with("theme", "rain");
        let result = dispatcher
            .dispatch(&ToolRequest::new("poemgen", args.clone()))
            .await;
        assert!(!result.is_error);
        assert!(result.joined_text().ends_with("-- AI Generated"));
        assert_eq!(
            upstream.prompts(),
            vec![build_prompt(PoemTool::GeneratePoem, &args)]
        );
    }

    #[tokio::test]
    async fn acrostic_fallback_spells_the_word() {
        let dispatcher = dispatcher(failing());
        let args = Arguments::new().with("word", "code").with("theme", "software");
        let result = dispatcher
            .dispatch(&ToolRequest::new("acrostic_poem", args))
            .await;
        assert!(!result.is_error);
        let text = result.joined_text();
        assert!(text.starts_with("Acrostic: CODE"));
        let body = body_of(&text);
        assert_eq!(body.len(), 4);
        for (line, letter) in body.iter().zip("CODE".chars()) {
            assert!(line.starts_with(letter), "{line}");
        }
    }

    #[tokio::test]
    async fn unknown_tool_names_the_valid_set() {
        let upstream = ScriptedGenerator::replying(AI_POEM);
        let dispatcher = dispatcher(upstream.clone());
        let result = dispatcher
            .dispatch(&ToolRequest::new("write_novel", Arguments::new()))
            .await;
        assert!(result.is_error);
        let text = result.joined_text();
        assert!(text.contains("Unknown tool 'write_novel'"));
        for kind in ToolKind::ALL {
            assert!(text.contains(kind.name()));
        }
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn every_catalog_name_is_accepted() {
        let dispatcher = dispatcher(ScriptedGenerator::replying(AI_POEM));
        for name in dispatcher.registry().names() {
            let result = dispatcher
                .dispatch(&ToolRequest::new(name.clone(), Arguments::new()))
                .await;
            assert!(!result.joined_text().contains("Unknown tool"), "{name}");
            assert!(!result.is_error, "{name}");
        }
    }

    #[tokio::test]
    async fn winter_ocean_haiku_falls_back_to_templates() {
        let dispatcher = dispatcher(failing());
        let args = Arguments::from_json(&json!({"subject": "ocean", "season": "winter"}));
        let result = dispatcher
            .dispatch(&ToolRequest::new("haiku_generator", args))
            .await;
        assert!(!result.is_error);
        let text = result.joined_text();
        assert!(text.starts_with("Haiku: winter ocean"));
        assert!(text.ends_with("-- Crafted with Care"));
        let body = body_of(&text);
        assert_eq!(body.len(), 3);
        assert!(body.join("\n").contains("winter ocean"));
    }

    #[tokio::test]
    async fn missing_credential_fails_closed() {
        let upstream = ScriptedGenerator::unconfigured();
        let dispatcher = dispatcher(upstream.clone());
        let result = dispatcher
            .dispatch(&ToolRequest::new("generate_poem", Arguments::new()))
            .await;
        assert!(result.is_error);
        assert!(result.joined_text().contains("not configured"));
        assert_eq!(upstream.calls(), 0);

        let status = dispatcher
            .dispatch(&ToolRequest::new("debug_status", Arguments::new()))
            .await;
        assert!(!status.is_error);
        assert!(status.joined_text().contains("Credential: missing"));
    }

    #[tokio::test]
    async fn ai_only_mode_flags_the_sentinel_as_an_error() {
        let orchestrator = Orchestrator::new(failing(), FallbackGenerator::seeded(1))
            .with_mode(GenerationMode::AiOnly);
        let dispatcher = Dispatcher::new(Arc::new(Registry::load().unwrap()), orchestrator, 3);
        let result = dispatcher
            .dispatch(&ToolRequest::new("quick_poem", Arguments::new()))
            .await;
        assert!(result.is_error);
        let text = result.joined_text();
        assert!(text.contains(FAILURE_SENTINEL));
        assert!(text.ends_with("-- Generation Failed"));
    }

    #[tokio::test]
    async fn debug_status_reports_provider_without_the_key() {
        let provider = ProviderSettings::new(
            crate::config::ProviderKind::ChatCompletion,
            Some("sk-very-secret".to_string()),
        );
        let dispatcher = dispatcher(ScriptedGenerator::replying(AI_POEM)).with_provider(provider);
        let text = dispatcher
            .dispatch(&ToolRequest::new("debug_status", Arguments::new()))
            .await
            .joined_text();
        assert!(text.contains("Provider: chat"));
        assert!(text.contains("Credential: configured"));
        assert!(text.contains("Generation mode: fallback"));
        assert!(!text.contains("sk-very-secret"));
    }

    #[test]
    fn tool_request_from_params() {
        let req = ToolRequest::from_params(&json!({
            "name": "haiku_generator",
            "arguments": {"subject": "moss"}
        }))
        .unwrap();
        assert_eq!(req.tool_name, "haiku_generator");
        assert_eq!(req.arguments.get("subject"), Some("moss"));

        let bare = ToolRequest::from_params(&json!({"name": "quick_poem"})).unwrap();
        assert_eq!(bare.arguments, Arguments::new());

        assert!(ToolRequest::from_params(&json!({"arguments": {}})).is_err());
        assert!(ToolRequest::from_params(&json!({"name": "quick_poem", "arguments": [1]})).is_err());
    }

    #[test]
    fn content_result_serialization() {
        let ok = serde_json::to_value(ContentResult::text("hello")).unwrap();
        assert_eq!(ok, json!({"content": [{"type": "text", "text": "hello"}]}));

        let err = serde_json::to_value(ContentResult::error("nope")).unwrap();
        assert_eq!(
            err,
            json!({"content": [{"type": "text", "text": "nope"}], "isError": true})
        );
    }
}
