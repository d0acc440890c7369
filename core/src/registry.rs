use std::collections::HashSet;
use std::fmt;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::prompt::PoemTool;

// The catalog shipped with the server (tools/tools.json).
const CATALOG_JSON: &str = include_str!("../../tools/tools.json");

/// One entry of the `tools/list` catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub const LEGACY_POEM_TOOL: &str = "poemgen";

/// Every tool the dispatcher knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Poem(PoemTool),
    DebugStatus,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Poem(PoemTool::GeneratePoem),
        ToolKind::Poem(PoemTool::QuickPoem),
        ToolKind::Poem(PoemTool::HaikuGenerator),
        ToolKind::Poem(PoemTool::AcrosticPoem),
        ToolKind::DebugStatus,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Poem(tool) => tool.name(),
            ToolKind::DebugStatus => "debug_status",
        }
    }

    /// Resolves a catalog name. `poemgen`, the stdio bridge's single tool,
    /// is accepted as another name for `generate_poem` but is not listed.
    pub fn from_name(name: &str) -> Option<Self> {
        if name == LEGACY_POEM_TOOL {
            return Some(ToolKind::Poem(PoemTool::GeneratePoem));
        }
        ToolKind::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The read-only tool catalog, built once at startup.
#[derive(Debug, Clone)]
pub struct Registry {
    tools: Vec<ToolDefinition>,
}

impl Registry {
    /// Parses the bundled catalog and checks it lines up with [`ToolKind`].
    pub fn load() -> Result<Self> {
        Self::from_json(CATALOG_JSON).context("Failed to load bundled tool catalog")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let tools: Vec<ToolDefinition> =
            serde_json::from_str(json).context("Tool catalog is not valid JSON")?;

        let mut seen = HashSet::new();
        for tool in &tools {
            if !seen.insert(tool.name.as_str()) {
                bail!("Tool '{}' is defined more than once", tool.name);
            }
            let handled = ToolKind::from_name(&tool.name).is_some_and(|kind| kind.name() == tool.name);
            if !handled {
                bail!("Tool '{}' has no handler", tool.name);
            }
            if !tool.input_schema.is_object() {
                bail!("Tool '{}' has a non-object inputSchema", tool.name);
            }
        }
        for kind in ToolKind::ALL {
            if !seen.contains(kind.name()) {
                bail!("Tool '{}' is missing from the catalog", kind.name());
            }
        }

        tracing::debug!("Loaded {} tool definitions", tools.len());
        Ok(Self { tools })
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
