//! Execution plans
//!
//! A Plan is an ordered, immutable sequence of tool steps compiled from a
//! goal. Repair never edits a plan in place; recompilation mints a new plan
//! version so every attempt stays independently inspectable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::generate_plan_id;

/// The role a step fills in the pipeline, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
    /// Acquire access past anti-bot protection
    AntiBlock,
    /// Retrieve the raw document (plain fetch or rendered)
    Fetch,
    /// Extract the requested fields from the document
    Parse,
    /// Filter/normalize the extracted records
    PostProcess,
}

impl std::fmt::Display for StepRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepRole::AntiBlock => "anti_block",
            StepRole::Fetch => "fetch",
            StepRole::Parse => "parse",
            StepRole::PostProcess => "post_process",
        };
        f.write_str(s)
    }
}

/// One step of an execution plan: a tool plus its configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Tool descriptor name; also the adapter registry key
    pub tool: String,
    /// Role this step fills
    pub role: StepRole,
    /// Step parameters: selectors, wait conditions, timeout_ms, ...
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
}

impl Step {
    pub fn new(tool: impl Into<String>, role: StepRole) -> Self {
        Self {
            tool: tool.into(),
            role,
            config: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Configured timeout for this step, if any
    pub fn timeout_ms(&self) -> Option<u64> {
        self.config.get("timeout_ms").and_then(|v| v.as_u64())
    }
}

/// An ordered, immutable sequence of steps compiled from one goal version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Unique id for this plan version
    pub plan_id: String,
    /// Goal version this plan was compiled from
    pub goal_id: String,
    /// Which attempt produced this plan (1-based)
    pub attempt: u32,
    /// Steps in strict execution order
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(goal_id: impl Into<String>, attempt: u32, steps: Vec<Step>) -> Self {
        Self {
            plan_id: generate_plan_id(attempt),
            goal_id: goal_id.into(),
            attempt,
            steps,
        }
    }

    /// Tool name filling the given role, if planned
    pub fn tool_for_role(&self, role: StepRole) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| s.role == role)
            .map(|s| s.tool.as_str())
    }

    /// All tool names in execution order
    pub fn tool_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.tool.as_str()).collect()
    }
}
