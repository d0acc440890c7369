//! Turns a tool name and its arguments into the natural-language prompt sent
//! upstream. Everything here is pure: same input, same prompt.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

/// Documented argument defaults.
pub mod defaults {
    pub const THEME: &str = "life";
    pub const STYLE: &str = "free_verse";
    pub const LENGTH: &str = "short";
    pub const MOOD: &str = "inspiring";
    pub const SUBJECT: &str = "nature";
    pub const SEASON: &str = "any";
    pub const WORD: &str = "POEM";
}

/// The four tools that produce a poem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoemTool {
    GeneratePoem,
    QuickPoem,
    HaikuGenerator,
    AcrosticPoem,
}

impl PoemTool {
    pub const ALL: [PoemTool; 4] = [
        PoemTool::GeneratePoem,
        PoemTool::QuickPoem,
        PoemTool::HaikuGenerator,
        PoemTool::AcrosticPoem,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PoemTool::GeneratePoem => "generate_poem",
            PoemTool::QuickPoem => "quick_poem",
            PoemTool::HaikuGenerator => "haiku_generator",
            PoemTool::AcrosticPoem => "acrostic_poem",
        }
    }
}

impl fmt::Display for PoemTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PoemTool {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PoemTool::ALL
            .into_iter()
            .find(|tool| tool.name() == s)
            .ok_or(())
    }
}

/// Tool arguments as plain strings. Blank values count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments(HashMap<String, String>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.0.insert(key.to_string(), value.to_string());
        }
    }

    /// Builds arguments from a JSON object. Strings are taken as-is, other
    /// scalars use their JSON text, `null` is dropped.
    pub fn from_json(value: &Value) -> Self {
        let mut args = Self::new();
        if let Some(map) = value.as_object() {
            for (key, v) in map {
                match v {
                    Value::Null => {}
                    Value::String(s) => args.insert(key, s),
                    other => args.insert(key, &other.to_string()),
                }
            }
        }
        args
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn theme(&self) -> &str {
        self.get_or("theme", defaults::THEME)
    }

    pub fn style(&self) -> &str {
        self.get_or("style", defaults::STYLE)
    }

    pub fn length(&self) -> &str {
        self.get_or("length", defaults::LENGTH)
    }

    pub fn mood(&self) -> &str {
        self.get_or("mood", defaults::MOOD)
    }

    /// The acrostic word, upper-cased.
    pub fn word(&self) -> String {
        self.get_or("word", defaults::WORD).to_uppercase()
    }
}

/// `"{season} {subject}"`, or just the subject when the season is "any".
pub fn haiku_theme(args: &Arguments) -> String {
    let subject = args.get_or("subject", defaults::SUBJECT);
    let season = args.get_or("season", defaults::SEASON);
    if season.eq_ignore_ascii_case(defaults::SEASON) {
        subject.to_string()
    } else {
        format!("{season} {subject}")
    }
}

pub fn build_prompt(tool: PoemTool, args: &Arguments) -> String {
    match tool {
        PoemTool::GeneratePoem => format!(
            "Write a beautiful {} {} {} poem about {}.",
            args.mood(),
            args.length(),
            args.style(),
            args.theme()
        ),
        PoemTool::QuickPoem => format!(
            "Write a short, inspiring free verse poem about {}.",
            args.theme()
        ),
        PoemTool::HaikuGenerator => format!(
            "Write a traditional 5-7-5 haiku about {}.",
            haiku_theme(args)
        ),
        PoemTool::AcrosticPoem => format!(
            "Write an acrostic poem for the word '{}' about {}.",
            args.word(),
            args.theme()
        ),
    }
}

/// A prompt plus the attempt budget for the upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_retries: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, max_retries: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_retries: max_retries.max(1),
        }
    }
}
