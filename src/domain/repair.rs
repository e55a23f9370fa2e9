//! Repair directives
//!
//! A RepairDirective is the evaluator's instruction for the next attempt:
//! which component should act (compiler, engine, or the user via
//! clarification), the headline reason code, and concrete hints.

use serde::{Deserialize, Serialize};

use crate::domain::plan::StepRole;

/// Which component a directive is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepairTarget {
    /// Recompile the plan with the attached hints
    Compiler,
    /// Re-execute with adjusted engine parameters (timeout escalation)
    Engine,
    /// Surface outward: the goal itself needs new input
    GoalClarification,
}

/// A concrete, machine-actionable hint attached to a directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "hint")]
pub enum RepairHint {
    /// Do not plan this tool again
    ExcludeTool { name: String },
    /// The next plan must include a tool advertising this capability
    RequireCapability { tag: String },
    /// Substitute the step filling this role (or its configuration)
    ReplaceStep { role: StepRole, reason: String },
    /// Multiply the failing step's timeout by this factor
    ExtendTimeout { factor: u32 },
    /// Ask the user about this field
    ClarifyField { field: String },
    /// Prefer this tool when filling its role (prior success / history reuse)
    PreferTool { name: String },
}

/// Instruction produced by evaluation, driving the next attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairDirective {
    pub target: RepairTarget,
    /// Reason code, e.g. "selector-not-found", "missing-field"
    pub reason: String,
    #[serde(default)]
    pub hints: Vec<RepairHint>,
}

impl RepairDirective {
    pub fn new(target: RepairTarget, reason: impl Into<String>) -> Self {
        Self {
            target,
            reason: reason.into(),
            hints: Vec::new(),
        }
    }

    pub fn with_hint(mut self, hint: RepairHint) -> Self {
        self.hints.push(hint);
        self
    }

    /// All tool names this directive excludes
    pub fn excluded_tools(&self) -> Vec<&str> {
        self.hints
            .iter()
            .filter_map(|h| match h {
                RepairHint::ExcludeTool { name } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Timeout factor if this directive escalates the engine timeout
    pub fn timeout_factor(&self) -> Option<u32> {
        self.hints.iter().find_map(|h| match h {
            RepairHint::ExtendTimeout { factor } => Some(*factor),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_with_hints() {
        let d = RepairDirective::new(RepairTarget::Compiler, "selector-not-found")
            .with_hint(RepairHint::ReplaceStep {
                role: StepRole::Parse,
                reason: "selector-not-found".to_string(),
            })
            .with_hint(RepairHint::ExcludeTool {
                name: "soup".to_string(),
            });

        assert_eq!(d.target, RepairTarget::Compiler);
        assert_eq!(d.reason, "selector-not-found");
        assert_eq!(d.hints.len(), 2);
        assert_eq!(d.excluded_tools(), vec!["soup"]);
    }

    #[test]
    fn test_timeout_factor() {
        let d = RepairDirective::new(RepairTarget::Engine, "timeout")
            .with_hint(RepairHint::ExtendTimeout { factor: 2 });
        assert_eq!(d.timeout_factor(), Some(2));

        let none = RepairDirective::new(RepairTarget::Compiler, "missing-field");
        assert_eq!(none.timeout_factor(), None);
    }

    #[test]
    fn test_target_serde_names() {
        let v = serde_json::to_value(RepairTarget::GoalClarification).unwrap();
        assert_eq!(v, serde_json::json!("goal-clarification"));
    }

    #[test]
    fn test_directive_serde_round_trip() {
        let d = RepairDirective::new(RepairTarget::Compiler, "access-denied")
            .with_hint(RepairHint::RequireCapability {
                tag: "anti_block".to_string(),
            });
        let json = serde_json::to_string(&d).unwrap();
        let back: RepairDirective = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
