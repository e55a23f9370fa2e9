//! Tool descriptors
//!
//! A ToolDescriptor is the catalog's view of one adapter: its category,
//! capability tags, declared (in)compatibilities and required configuration
//! keys. Descriptors are read-only data for the compiler; tool relationships
//! are an adjacency lookup over this data, never dispatch over tool types.

use serde::{Deserialize, Serialize};

/// Functional category of a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Plain HTTP fetcher
    Fetcher,
    /// Browser/JS renderer (also satisfies fetching when rendering is needed)
    Renderer,
    /// HTML/DOM parser and field extractor
    Parser,
    /// Anti-bot/anti-block service
    AntiBlock,
    /// Post-processing of extracted records (filtering, normalization)
    PostProcessor,
}

impl ToolCategory {
    /// Parse the catalog's string form ("fetcher", "renderer", ...)
    pub fn parse(s: &str) -> Option<ToolCategory> {
        match s {
            "fetcher" | "http_client" => Some(ToolCategory::Fetcher),
            "renderer" | "browser" => Some(ToolCategory::Renderer),
            "parser" => Some(ToolCategory::Parser),
            "anti_block" | "anti_bot_service" => Some(ToolCategory::AntiBlock),
            "post_processor" => Some(ToolCategory::PostProcessor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Fetcher => "fetcher",
            ToolCategory::Renderer => "renderer",
            ToolCategory::Parser => "parser",
            ToolCategory::AntiBlock => "anti_block",
            ToolCategory::PostProcessor => "post_processor",
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to another tool, by name or by whole category
///
/// Catalog files use the `type:` prefix for categories, e.g.
/// `incompatible_with = ["selenium", "type:renderer"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompatRef {
    Name(String),
    Category(ToolCategory),
}

impl CompatRef {
    /// Parse a catalog reference string, honoring the `type:` prefix
    pub fn parse(s: &str) -> Option<CompatRef> {
        if let Some(cat) = s.strip_prefix("type:") {
            ToolCategory::parse(cat).map(CompatRef::Category)
        } else {
            Some(CompatRef::Name(s.to_string()))
        }
    }

    /// Does this reference cover the given descriptor?
    pub fn covers(&self, descriptor: &ToolDescriptor) -> bool {
        match self {
            CompatRef::Name(name) => name == &descriptor.name,
            CompatRef::Category(cat) => *cat == descriptor.category,
        }
    }
}

/// Catalog entry describing one adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name, also the adapter registry key (e.g. "playwright")
    pub name: String,

    /// Functional category
    pub category: ToolCategory,

    /// Short description of the tool's purpose
    #[serde(default)]
    pub description: String,

    /// Capability tags (e.g. "javascript_rendering", "html_parsing")
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Tools this one is designed to work with
    #[serde(default)]
    pub compatibilities: Vec<CompatRef>,

    /// Tools this one cannot share a pipeline with
    #[serde(default)]
    pub incompatibilities: Vec<CompatRef>,

    /// Configuration/secret keys that must be present before this tool can
    /// be planned (validated at compile time, not execution time)
    #[serde(default)]
    pub required_config: Vec<String>,

    /// Catalog ordering for deterministic first-match selection; lower wins
    #[serde(default)]
    pub priority: u32,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, category: ToolCategory) -> Self {
        Self {
            name: name.into(),
            category,
            description: String::new(),
            capabilities: Vec::new(),
            compatibilities: Vec::new(),
            incompatibilities: Vec::new(),
            required_config: Vec::new(),
            priority: 0,
        }
    }

    pub fn with_capability(mut self, tag: impl Into<String>) -> Self {
        self.capabilities.push(tag.into());
        self
    }

    pub fn with_incompatibility(mut self, r: CompatRef) -> Self {
        self.incompatibilities.push(r);
        self
    }

    pub fn with_compatibility(mut self, r: CompatRef) -> Self {
        self.compatibilities.push(r);
        self
    }

    pub fn with_required_config(mut self, key: impl Into<String>) -> Self {
        self.required_config.push(key.into());
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// True if this descriptor advertises the capability tag
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities.iter().any(|c| c == tag)
    }

    /// True if this tool declares the other as incompatible
    ///
    /// Only this tool's own declaration; the compiler enforces the symmetric
    /// closure on top of it.
    pub fn excludes(&self, other: &ToolDescriptor) -> bool {
        self.incompatibilities.iter().any(|r| r.covers(other))
    }

    /// True if this tool declares any compatibilities at all and the other
    /// tool is covered by one of them
    pub fn declares_compatible_with(&self, other: &ToolDescriptor) -> bool {
        self.compatibilities.iter().any(|r| r.covers(other))
    }
}
