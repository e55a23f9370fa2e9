//! Tool descriptor catalog
//!
//! Loads tool descriptors from a TOML file and provides the read-only query
//! surface the compiler works against: lookup by name, by capability tag and
//! by category. Query results are ordered by (priority, name) so compilation
//! stays deterministic regardless of map iteration order.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::domain::descriptor::{CompatRef, ToolCategory, ToolDescriptor};
use crate::error::{Result, WeavrError};

/// TOML representation of a tool descriptor
#[derive(Debug, Deserialize)]
struct TomlTool {
    name: String,
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    compatible_with: Vec<String>,
    #[serde(default)]
    incompatible_with: Vec<String>,
    #[serde(default)]
    required_config: Vec<String>,
    #[serde(default)]
    priority: u32,
}

/// TOML file structure
#[derive(Debug, Deserialize)]
struct TomlCatalog {
    #[serde(rename = "tool")]
    tools: Vec<TomlTool>,
}

/// Catalog of tool descriptors loaded from TOML
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: HashMap<String, ToolDescriptor>,
}

impl ToolCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load catalog from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| WeavrError::Catalog(format!("failed to read catalog file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Load catalog from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let catalog: TomlCatalog = toml::from_str(content)
            .map_err(|e| WeavrError::Catalog(format!("failed to parse TOML: {}", e)))?;

        let mut tools = HashMap::new();
        for toml_tool in catalog.tools {
            let tool = Self::convert_toml_tool(toml_tool)?;
            if tools.insert(tool.name.clone(), tool.clone()).is_some() {
                return Err(WeavrError::Catalog(format!(
                    "duplicate tool name: {}",
                    tool.name
                )));
            }
        }

        Ok(Self { tools })
    }

    fn convert_toml_tool(toml_tool: TomlTool) -> Result<ToolDescriptor> {
        let category = ToolCategory::parse(&toml_tool.category).ok_or_else(|| {
            WeavrError::Catalog(format!(
                "invalid category '{}' for tool '{}'",
                toml_tool.category, toml_tool.name
            ))
        })?;

        let parse_refs = |refs: &[String], kind: &str| -> Result<Vec<CompatRef>> {
            refs.iter()
                .map(|s| {
                    CompatRef::parse(s).ok_or_else(|| {
                        WeavrError::Catalog(format!(
                            "invalid {} reference '{}' for tool '{}'",
                            kind, s, toml_tool.name
                        ))
                    })
                })
                .collect()
        };

        Ok(ToolDescriptor {
            name: toml_tool.name.clone(),
            category,
            description: toml_tool.description,
            capabilities: toml_tool.capabilities,
            compatibilities: parse_refs(&toml_tool.compatible_with, "compatibility")?,
            incompatibilities: parse_refs(&toml_tool.incompatible_with, "incompatibility")?,
            required_config: toml_tool.required_config,
            priority: toml_tool.priority,
        })
    }

    /// Get a descriptor by name
    pub fn by_name(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// All descriptors advertising the capability tag, ordered by
    /// (priority, name)
    pub fn by_capability(&self, tag: &str) -> Vec<&ToolDescriptor> {
        let mut matches: Vec<&ToolDescriptor> = self
            .tools
            .values()
            .filter(|t| t.has_capability(tag))
            .collect();
        Self::sort_deterministic(&mut matches);
        matches
    }

    /// All descriptors of the given category, ordered by (priority, name)
    pub fn by_category(&self, category: ToolCategory) -> Vec<&ToolDescriptor> {
        let mut matches: Vec<&ToolDescriptor> = self
            .tools
            .values()
            .filter(|t| t.category == category)
            .collect();
        Self::sort_deterministic(&mut matches);
        matches
    }

    fn sort_deterministic(tools: &mut [&ToolDescriptor]) {
        tools.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.name.cmp(&b.name)));
    }

    /// All descriptors, ordered by (priority, name)
    pub fn all(&self) -> Vec<&ToolDescriptor> {
        let mut tools: Vec<&ToolDescriptor> = self.tools.values().collect();
        Self::sort_deterministic(&mut tools);
        tools
    }

    /// Add a descriptor (for programmatic/test catalogs)
    pub fn add(&mut self, tool: ToolDescriptor) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
