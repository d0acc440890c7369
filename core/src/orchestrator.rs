//! AI first, local templates second.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::GenerationMode;
use crate::fallback::FallbackGenerator;
use crate::llm::TextGenerator;
use crate::prompt::GenerationRequest;

/// Text returned in [`GenerationMode::AiOnly`] when the provider fails.
pub const FAILURE_SENTINEL: &str = "[Poem generation failed]";

/// AI text shorter than this (trimmed, in characters) is not accepted.
pub const DEFAULT_QUALITY_THRESHOLD: usize = 20;

/// Where a poem came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    AiGenerated,
    Fallback,
    Error,
}

impl Provenance {
    /// The footer label shown to users.
    pub fn marker(self) -> &'static str {
        match self {
            Provenance::AiGenerated => "AI Generated",
            Provenance::Fallback => "Crafted with Care",
            Provenance::Error => "Generation Failed",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub text: String,
    pub provenance: Provenance,
}

/// What to generate locally if the provider comes back empty-handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackPlan {
    Poem {
        theme: String,
        style: String,
        length: String,
        mood: String,
    },
    Acrostic {
        word: String,
        theme: Option<String>,
    },
}

impl FallbackPlan {
    fn run(&self, generator: &FallbackGenerator) -> String {
        match self {
            FallbackPlan::Poem {
                theme,
                style,
                length,
                mood,
            } => generator.generate(theme, style, length, mood),
            FallbackPlan::Acrostic { word, theme } => {
                generator.generate_acrostic(word, theme.as_deref())
            }
        }
    }
}

pub struct Orchestrator {
    generator: Arc<dyn TextGenerator>,
    fallback: FallbackGenerator,
    mode: GenerationMode,
    quality_threshold: usize,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, fallback: FallbackGenerator) -> Self {
        Self {
            generator,
            fallback,
            mode: GenerationMode::default(),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
        }
    }

    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_quality_threshold(mut self, threshold: usize) -> Self {
        self.quality_threshold = threshold;
        self
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn quality_threshold(&self) -> usize {
        self.quality_threshold
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_configured()
    }

    /// Never fails: upstream errors end in a fallback poem or the sentinel.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        fallback: &FallbackPlan,
    ) -> GenerationResult {
        match self.generator.generate_text(request).await {
            Ok(text) if text.trim().chars().count() > self.quality_threshold => {
                info!("Using AI poem ({} characters)", text.len());
                return GenerationResult {
                    text: text.trim().to_string(),
                    provenance: Provenance::AiGenerated,
                };
            }
            Ok(text) => debug!(
                "AI poem too short ({} characters, need more than {})",
                text.trim().chars().count(),
                self.quality_threshold
            ),
            Err(e) => warn!("AI generation failed: {e}"),
        }

        match self.mode {
            GenerationMode::Fallback => {
                info!("Falling back to template generator");
                GenerationResult {
                    text: fallback.run(&self.fallback),
                    provenance: Provenance::Fallback,
                }
            }
            GenerationMode::AiOnly => GenerationResult {
                text: FAILURE_SENTINEL.to_string(),
                provenance: Provenance::Error,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::testing::ScriptedGenerator;

    const POEM: &str = "The lantern hums all night\nand the harbor listens";

    fn plan() -> FallbackPlan {
        FallbackPlan::Poem {
            theme: "harbor".to_string(),
            style: "haiku".to_string(),
            length: "short".to_string(),
            mood: "peaceful".to_string(),
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("Write a haiku about harbor.", 3)
    }

    #[tokio::test]
    async fn good_ai_text_is_used() {
        let upstream = ScriptedGenerator::replying(POEM);
        let orchestrator = Orchestrator::new(upstream.clone(), FallbackGenerator::seeded(1));
        let result = orchestrator.generate(&request(), &plan()).await;
        assert_eq!(result.provenance, Provenance::AiGenerated);
        assert_eq!(result.text, POEM);
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn short_ai_text_falls_back() {
        let upstream = ScriptedGenerator::replying("Hi.");
        let orchestrator = Orchestrator::new(upstream, FallbackGenerator::seeded(1));
        let result = orchestrator.generate(&request(), &plan()).await;
        assert_eq!(result.provenance, Provenance::Fallback);
        assert!(result.text.contains("harbor"));
        assert_ne!(result.text, "Hi.");
    }

    #[tokio::test]
    async fn threshold_is_exclusive() {
        let exactly_twenty = "abcdefghijklmnopqrst";
        let upstream = ScriptedGenerator::replying(exactly_twenty);
        let orchestrator = Orchestrator::new(upstream, FallbackGenerator::seeded(1));
        let result = orchestrator.generate(&request(), &plan()).await;
        assert_eq!(result.provenance, Provenance::Fallback);

        let upstream = ScriptedGenerator::replying("abcdefghijklmnopqrstu");
        let orchestrator = Orchestrator::new(upstream, FallbackGenerator::seeded(1));
        let result = orchestrator.generate(&request(), &plan()).await;
        assert_eq!(result.provenance, Provenance::AiGenerated);
    }

    #[tokio::test]
    async fn upstream_errors_fall_back() {
        let upstream = ScriptedGenerator::failing(|| UpstreamError::Exhausted {
            attempts: 3,
            last: "HTTP 503".to_string(),
        });
        let orchestrator = Orchestrator::new(upstream, FallbackGenerator::seeded(1));
        let result = orchestrator.generate(&request(), &plan()).await;
        assert_eq!(result.provenance, Provenance::Fallback);
        assert!(!result.text.is_empty());
    }

    #[tokio::test]
    async fn ai_only_mode_returns_the_sentinel() {
        let upstream = ScriptedGenerator::replying("Hi.");
        let orchestrator = Orchestrator::new(upstream, FallbackGenerator::seeded(1))
            .with_mode(GenerationMode::AiOnly);
        let result = orchestrator.generate(&request(), &plan()).await;
        assert_eq!(
            result,
            GenerationResult {
                text: FAILURE_SENTINEL.to_string(),
                provenance: Provenance::Error,
            }
        );
    }

    #[tokio::test]
    async fn acrostic_plan_uses_the_acrostic_generator() {
        let upstream = ScriptedGenerator::failing(|| UpstreamError::Unauthorized);
        let orchestrator = Orchestrator::new(upstream, FallbackGenerator::seeded(3));
        let plan = FallbackPlan::Acrostic {
            word: "CODE".to_string(),
            theme: Some("software".to_string()),
        };
        let result = orchestrator.generate(&request(), &plan).await;
        assert_eq!(result.provenance, Provenance::Fallback);
        assert_eq!(result.text.lines().count(), 4);
    }

    #[test]
    fn markers() {
        assert_eq!(Provenance::AiGenerated.marker(), "AI Generated");
        assert_eq!(Provenance::Fallback.to_string(), "Crafted with Care");
    }
}
